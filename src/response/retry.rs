// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Minting and validation of Retry tokens.
//!
//! Unlike RFC 9001's Retry Integrity Tag (a fixed, publicly known AEAD key used only to
//! catch off-path corruption), the Binding's Retry token is sealed with a private,
//! process-wide key so that the token itself proves address ownership. The new
//! server-chosen destination connection id doubles as the AEAD nonce, zero-padded out to
//! the cipher's nonce length, which is why the token can be validated from nothing more
//! than the inbound packet's destination connection id.

use crate::{connection, inet, random};
use ring::aead;
use s2n_codec::zerocopy::{FromBytes, Immutable, IntoBytes, Unaligned};

/// Length, in bytes, of the server-chosen connection id minted for a Retry. Also the
/// number of nonce bytes that are not zero-padding.
pub const MSQUIC_CONNECTION_ID_LENGTH: usize = 8;

const ALGORITHM: &aead::Algorithm = &aead::AES_128_GCM;

const ADDRESS_LEN: usize = 18; // enough for a v6 socket address (16-byte ip + 2-byte port)

#[derive(Clone, Copy, FromBytes, IntoBytes, Unaligned, Immutable)]
#[repr(C)]
struct TokenContents {
    address_family: u8,
    address: [u8; ADDRESS_LEN],
    orig_cid_len: u8,
    orig_cid: [u8; connection::id::MAX_LEN],
}

impl TokenContents {
    const LEN: usize = core::mem::size_of::<Self>();

    fn new(remote_address: &inet::SocketAddress, orig_cid: &[u8]) -> Self {
        let (address_family, address) = encode_address(remote_address);
        let mut orig_cid_bytes = [0u8; connection::id::MAX_LEN];
        orig_cid_bytes[..orig_cid.len()].copy_from_slice(orig_cid);

        Self {
            address_family,
            address,
            orig_cid_len: orig_cid.len() as u8,
            orig_cid: orig_cid_bytes,
        }
    }

    fn matches_remote_address(&self, remote_address: &inet::SocketAddress) -> bool {
        let (family, address) = encode_address(remote_address);
        family == self.address_family && address == self.address
    }
}

fn encode_address(addr: &inet::SocketAddress) -> (u8, [u8; ADDRESS_LEN]) {
    let mut out = [0u8; ADDRESS_LEN];
    match addr {
        inet::SocketAddress::IpV4(addr) => {
            let octets: [u8; 4] = (*addr.ip()).into();
            out[..4].copy_from_slice(&octets);
            out[4..6].copy_from_slice(&addr.port().to_be_bytes());
            (0, out)
        }
        inet::SocketAddress::IpV6(addr) => {
            for (i, segment) in addr.ip().segments().iter().enumerate() {
                out[i * 2..i * 2 + 2].copy_from_slice(&segment.to_be_bytes());
            }
            out[16..18].copy_from_slice(&addr.port().to_be_bytes());
            (1, out)
        }
    }
}

/// The on-the-wire length of a sealed Retry token (plaintext plus the AEAD tag).
pub const TOKEN_LEN: usize = TokenContents::LEN + 16;

/// A process-wide key used to seal and open Retry tokens.
///
/// The new destination connection id minted for each Retry acts as the AEAD nonce, so
/// this key is never used with a repeated nonce as long as connection ids are not reused
/// before the token is consumed.
pub struct RetryKey {
    key: aead::LessSafeKey,
}

impl RetryKey {
    /// Generates a fresh, process-local key from the given random source.
    pub fn new(random_generator: &mut dyn random::Generator) -> Self {
        let mut key_bytes = [0u8; 16];
        random_generator.private_random_fill(&mut key_bytes);
        let unbound = aead::UnboundKey::new(ALGORITHM, &key_bytes)
            .expect("AES_128_GCM key length matches the generated key material");
        Self {
            key: aead::LessSafeKey::new(unbound),
        }
    }

    fn nonce(new_connection_id: &[u8]) -> aead::Nonce {
        let mut nonce_bytes = [0u8; aead::NONCE_LEN];
        let len = new_connection_id.len().min(aead::NONCE_LEN);
        nonce_bytes[..len].copy_from_slice(&new_connection_id[..len]);
        aead::Nonce::assume_unique_for_key(nonce_bytes)
    }

    /// Mints a sealed Retry token bound to `new_connection_id` (the server-chosen
    /// destination connection id that will accompany this Retry).
    pub fn seal(
        &self,
        new_connection_id: &[u8],
        remote_address: &inet::SocketAddress,
        orig_cid: &[u8],
    ) -> [u8; TOKEN_LEN] {
        let contents = TokenContents::new(remote_address, orig_cid);
        let mut buffer = [0u8; TOKEN_LEN];
        buffer[..TokenContents::LEN].copy_from_slice(contents.as_bytes());

        let tag = self
            .key
            .seal_in_place_separate_tag(
                Self::nonce(new_connection_id),
                aead::Aad::empty(),
                &mut buffer[..TokenContents::LEN],
            )
            .expect("sealing a fixed-size in-memory buffer cannot fail");
        buffer[TokenContents::LEN..].copy_from_slice(tag.as_ref());
        buffer
    }

    /// Opens a Retry token previously minted with [`Self::seal`], validating that it was
    /// addressed to `remote_address`.
    ///
    /// `new_connection_id` is the inbound packet's destination connection id: the same
    /// value that was minted as the new CID when the token was sealed.
    pub fn open(
        &self,
        new_connection_id: &[u8],
        remote_address: &inet::SocketAddress,
        token: &[u8],
    ) -> Option<connection::id::UnboundedId> {
        if token.len() != TOKEN_LEN {
            return None;
        }

        let mut buffer = [0u8; TOKEN_LEN];
        buffer.copy_from_slice(token);

        let plaintext = self
            .key
            .open_in_place(Self::nonce(new_connection_id), aead::Aad::empty(), &mut buffer)
            .ok()?;

        let contents = TokenContents::read_from_bytes(plaintext).ok()?;

        if contents.orig_cid_len as usize > connection::id::MAX_LEN {
            return None;
        }

        if !contents.matches_remote_address(remote_address) {
            return None;
        }

        connection::id::UnboundedId::try_from_bytes(
            &contents.orig_cid[..contents.orig_cid_len as usize],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let mut generator = random::testing::Generator::default();
        let key = RetryKey::new(&mut generator);

        let new_cid = [0xab; MSQUIC_CONNECTION_ID_LENGTH];
        let remote_address = inet::SocketAddress::default();
        let orig_cid = [0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88];

        let token = key.seal(&new_cid, &remote_address, &orig_cid);
        let opened = key.open(&new_cid, &remote_address, &token).unwrap();

        assert_eq!(opened.as_bytes(), &orig_cid);
    }

    #[test]
    fn rejects_altered_nonce() {
        let mut generator = random::testing::Generator::default();
        let key = RetryKey::new(&mut generator);

        let new_cid = [0xab; MSQUIC_CONNECTION_ID_LENGTH];
        let remote_address = inet::SocketAddress::default();
        let orig_cid = [0x11, 0x22, 0x33, 0x44];

        let token = key.seal(&new_cid, &remote_address, &orig_cid);

        let mut altered_cid = new_cid;
        altered_cid[0] ^= 0xff;
        assert!(key.open(&altered_cid, &remote_address, &token).is_none());
    }

    #[test]
    fn rejects_remote_address_mismatch() {
        let mut generator = random::testing::Generator::default();
        let key = RetryKey::new(&mut generator);

        let new_cid = [0xab; MSQUIC_CONNECTION_ID_LENGTH];
        let orig_cid = [0x11, 0x22, 0x33, 0x44];

        let token = key.seal(&new_cid, &inet::SocketAddress::default(), &orig_cid);

        let mut other_address = inet::SocketAddress::default();
        other_address.set_port(4433);
        assert!(key.open(&new_cid, &other_address, &token).is_none());
    }
}
