// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Minting of Stateless Reset tokens and the datagrams that carry them.

use crate::{packet::stateless_reset as wire, random, stateless_reset};
use ring::hmac;

/// Mints Stateless Reset tokens as `keyed_hash(salt, local_connection_id)`, truncated to
/// the token length, where `salt` is a random value chosen once per Binding.
///
/// Deterministic in the connection id so that a connection which loses its in-memory
/// state still answers with the same token it would have used before the loss, letting
/// the peer recognize the Reset.
pub struct Generator {
    key: hmac::Key,
}

impl Generator {
    pub fn new(random_generator: &mut dyn random::Generator) -> Self {
        let mut salt = [0u8; 32];
        random_generator.private_random_fill(&mut salt);
        Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, &salt),
        }
    }
}

impl stateless_reset::token::Generator for Generator {
    fn generate(&mut self, local_connection_id: &[u8]) -> stateless_reset::Token {
        let digest = hmac::sign(&self.key, local_connection_id);
        let mut bytes = [0u8; stateless_reset::token::LEN];
        bytes.copy_from_slice(&digest.as_ref()[..stateless_reset::token::LEN]);
        bytes.into()
    }
}

/// Encodes a Stateless Reset datagram answering a datagram that could not be matched to
/// any connection.
///
/// `inbound_destination_connection_id` is the connection id the inbound datagram carried;
/// the reply's token is minted deterministically from it. `inbound_key_phase` is the key
/// phase bit read off of the inbound short header packet, echoed back so the reply looks
/// like a packet belonging to the same connection.
pub fn encode_packet(
    generator: &mut dyn stateless_reset::token::Generator,
    inbound_destination_connection_id: &[u8],
    inbound_key_phase: bool,
    triggering_packet_len: usize,
    random_generator: &mut dyn random::Generator,
    packet_buf: &mut [u8],
) -> Option<usize> {
    let token = generator.generate(inbound_destination_connection_id);
    wire::encode_packet(
        token,
        triggering_packet_len,
        inbound_key_phase,
        random_generator,
        packet_buf,
    )
}
