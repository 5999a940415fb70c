// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Construction of Version Negotiation datagrams.

use crate::{
    packet::version_negotiation::VersionNegotiation,
    random,
};
use s2n_codec::{Encoder, EncoderBuffer, EncoderValue};

/// The only version this Binding actually speaks.
pub const SUPPORTED_VERSION: u32 = 0x0000_0001;

/// Upper bound on an encoded Version Negotiation datagram's length: the 1-byte tag, the
/// 4-byte version field, both connection ids at their maximum invariant length (each with
/// a 1-byte length prefix), the 4-byte random reserved version, and the 4-byte supported
/// version this implementation actually advertises.
pub const MAX_VER_NEG_PACKET_LENGTH: usize = 1
    + 4
    + 1
    + crate::packet::long::DESTINATION_CONNECTION_ID_MAX_LEN
    + 1
    + crate::packet::long::SOURCE_CONNECTION_ID_MAX_LEN
    + 4
    + 4;

/// The minimum datagram size a QUIC endpoint must be able to send without path MTU
/// discovery (RFC 9000 §14.1). Mirrors `QUIC_DEFAULT_PATH_MTU`.
const DEFAULT_PATH_MTU: usize = 1200;

// Make sure a Version Negotiation reply always fits comfortably within the smallest
// datagram every QUIC endpoint can receive, leaving room for the UDP/IP headers.
const _: () = assert!(DEFAULT_PATH_MTU - 48 >= MAX_VER_NEG_PACKET_LENGTH);

//= https://www.rfc-editor.org/rfc/rfc9000#section-15.3
//# Version numbers used to identify IETF drafts are reserved from the
//# range reserved for experimental use (0x?a?a?a?a for integer values
//# of ?).
const RESERVED_VERSION_MASK: u32 = 0x0a0a_0a0a;
const RESERVED_VERSION_PRESERVE: u32 = 0xf0f0_f0f0;

/// Draws a fresh `random_reserved_version` for a newly created Binding.
///
/// This is a per-binding constant, not a per-packet one: every Version
/// Negotiation reply sent by a given Binding advertises the same greased
/// version, while the `Unused` byte still varies per packet.
pub fn random_reserved_version(random_generator: &mut dyn random::Generator) -> u32 {
    let mut bytes = [0u8; 4];
    random_generator.public_random_fill(&mut bytes);
    let raw = u32::from_be_bytes(bytes);
    (raw & RESERVED_VERSION_PRESERVE) | RESERVED_VERSION_MASK
}

/// The fixed list of versions advertised in a Version Negotiation reply:
/// the binding's per-instance greased reserved version followed by every
/// version this implementation actually supports.
struct SupportedVersions {
    random_reserved_version: u32,
}

impl EncoderValue for SupportedVersions {
    fn encode<E: Encoder>(&self, encoder: &mut E) {
        self.random_reserved_version.encode(encoder);
        SUPPORTED_VERSION.encode(encoder);
    }
}

/// Encodes a Version Negotiation datagram replying to an inbound long-header
/// packet carrying an unsupported version.
///
/// `inbound_destination_connection_id`/`inbound_source_connection_id` are the
/// connection ids read off of that inbound packet. `random_reserved_version`
/// is the Binding's per-instance greasing constant (see
/// [`random_reserved_version`]). Returns `None` if `packet_buf` is too small.
pub fn encode_packet(
    inbound_destination_connection_id: &[u8],
    inbound_source_connection_id: &[u8],
    random_reserved_version: u32,
    random_generator: &mut dyn random::Generator,
    packet_buf: &mut [u8],
) -> Option<usize> {
    let mut unused_byte = [0u8; 1];
    random_generator.public_random_fill(&mut unused_byte);

    let packet = VersionNegotiation::from_header(
        inbound_destination_connection_id,
        inbound_source_connection_id,
        unused_byte[0],
        SupportedVersions {
            random_reserved_version,
        },
    );

    let mut buffer = EncoderBuffer::new(packet_buf);
    let before = buffer.remaining_capacity();
    packet.encode(&mut buffer);
    let written = before - buffer.remaining_capacity();

    if written == 0 {
        None
    } else {
        Some(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_version_matches_grease_pattern() {
        let mut generator = random::testing::Generator::default();
        let version = random_reserved_version(&mut generator);
        assert_eq!(version & 0x0f0f_0f0f, 0x0a0a_0a0a);
    }

    #[test]
    fn encodes_swapped_connection_ids() {
        let mut generator = random::testing::Generator::default();
        let inbound_dcid = [0xA1, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7, 0xA8];
        let inbound_scid = [0xB1, 0xB2];

        let mut buffer = [0u8; 128];
        let len = encode_packet(
            &inbound_dcid,
            &inbound_scid,
            random_reserved_version(&mut generator),
            &mut generator,
            &mut buffer,
        )
        .unwrap();

        // header form bit must be set
        assert_eq!(buffer[0] & 0x80, 0x80);
        // version field is the VN marker (all zero)
        assert_eq!(&buffer[1..5], &[0, 0, 0, 0]);
        // destination connection id = inbound source connection id
        assert_eq!(buffer[5] as usize, inbound_scid.len());
        assert_eq!(&buffer[6..6 + inbound_scid.len()], &inbound_scid);
        let offset = 6 + inbound_scid.len();
        // source connection id = inbound destination connection id
        assert_eq!(buffer[offset] as usize, inbound_dcid.len());
        assert_eq!(
            &buffer[offset + 1..offset + 1 + inbound_dcid.len()],
            &inbound_dcid
        );

        assert!(len > offset + 1 + inbound_dcid.len());
    }
}
