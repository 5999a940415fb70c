// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Version-independent validation of inbound datagrams and the exclusive/shared binding
//! mode rules, ahead of connection-ID based demultiplexing.

use crate::{connection, packet::ProtectedPacket};
use s2n_codec::DecoderBufferMut;

/// The smallest destination connection ID a shared binding will accept. Anything
/// shorter gives an attacker too little entropy to spoof a remote address's share of
/// the binding's stateless-operation table.
pub const MIN_INITIAL_CID_LENGTH: usize = 8;

/// Whether a binding is dedicated to a single connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// The 4-tuple is dedicated to one connection: destination CIDs must be
    /// zero-length, and stateless reset is disabled.
    Exclusive,
    /// The binding is demultiplexed by destination CID across many connections.
    Shared,
}

/// The result of preprocessing one inbound datagram.
pub enum Decision<'a> {
    /// The datagram passed every version-independent check and may be handed to the
    /// demultiplexer.
    Accept(ProtectedPacket<'a>),
    /// A long-header packet carrying a version this implementation does not support.
    /// The caller decides whether to answer with Version Negotiation (if a listener is
    /// registered) or simply drop it.
    UnsupportedVersion {
        destination_connection_id: connection::id::UnboundedId,
        source_connection_id: connection::id::UnboundedId,
    },
    /// The datagram violated an invariant and must be dropped; `reason` is a static
    /// label suitable for a drop trace.
    Reject { reason: &'static str },
}

/// Validates one datagram against version-independent QUIC invariants and the
/// exclusive/shared mode rule, routing unsupported versions toward Version Negotiation.
pub fn preprocess<'a, Validator: connection::id::Validator>(
    buffer: DecoderBufferMut<'a>,
    connection_info: &connection::id::ConnectionInfo,
    connection_id_validator: &Validator,
    mode: Mode,
    is_version_supported: impl Fn(u32) -> bool,
) -> Decision<'a> {
    let packet = match ProtectedPacket::decode(buffer, connection_info, connection_id_validator) {
        Ok((packet, _remaining)) => packet,
        Err(_) => {
            return Decision::Reject {
                reason: "failed to decode packet invariants",
            }
        }
    };

    let destination_len = packet.destination_connection_id().len();
    match mode {
        Mode::Exclusive => {
            if destination_len != 0 {
                return Decision::Reject {
                    reason: "Non-zero length CID on exclusive binding",
                };
            }
        }
        Mode::Shared => {
            if destination_len < MIN_INITIAL_CID_LENGTH {
                return Decision::Reject {
                    reason: "destination CID shorter than the minimum initial length",
                };
            }
        }
    }

    // a VN-marker packet carries no version field of its own (`version()` returns
    // `None`); treat its implicit version as 0, which is never in the supported set, so
    // it takes the same listener-gated VN-or-drop path as any other unsupported version
    // rather than an unconditional reject
    let version_unsupported = match packet.version() {
        Some(version) => !is_version_supported(version),
        None => true,
    };

    if version_unsupported {
        let destination_connection_id =
            connection::id::UnboundedId::try_from_bytes(packet.destination_connection_id())
                .expect("destination CID length already validated by decode");
        let source_connection_id = connection::id::UnboundedId::try_from_bytes(
            packet.source_connection_id().unwrap_or(&[]),
        )
        .expect("source CID length already validated by decode");

        return Decision::UnsupportedVersion {
            destination_connection_id,
            source_connection_id,
        };
    }

    Decision::Accept(packet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{inet, response::vn::SUPPORTED_VERSION};
    use s2n_codec::{Encoder, EncoderBuffer, EncoderValue};

    fn connection_info(remote: &inet::SocketAddress) -> connection::id::ConnectionInfo<'_> {
        connection::id::ConnectionInfo::new(remote)
    }

    fn encode_long_header(version: u32, dcid: &[u8], scid: &[u8]) -> alloc::vec::Vec<u8> {
        struct Header<'a> {
            version: u32,
            dcid: &'a [u8],
            scid: &'a [u8],
        }
        impl EncoderValue for Header<'_> {
            fn encode<E: Encoder>(&self, encoder: &mut E) {
                // long header, fixed bit, initial type, arbitrary type-specific bits
                0b1100_0000u8.encode(encoder);
                self.version.encode(encoder);
                (self.dcid.len() as u8).encode(encoder);
                self.dcid.encode(encoder);
                (self.scid.len() as u8).encode(encoder);
                self.scid.encode(encoder);
                // token length (initial-specific) = 0, then a minimal payload len + packet number
                0u8.encode(encoder); // token length varint (0)
                20u8.encode(encoder); // payload length varint, large enough to look plausible
                0u8.encode(encoder); // 1-byte packet number
                encoder.write_repeated(32, 0); // payload padding
            }
        }

        let header = Header {
            version,
            dcid,
            scid,
        };
        let mut buffer = alloc::vec![0u8; 256];
        let mut encoder = EncoderBuffer::new(&mut buffer);
        header.encode(&mut encoder);
        let len = encoder.len();
        buffer.truncate(len);
        buffer
    }

    /// A long-header datagram whose version field is the Version Negotiation marker
    /// (`0`), which the decoder routes to `ProtectedPacket::VersionNegotiation` rather
    /// than `ProtectedPacket::Initial` regardless of the tag's type-specific bits.
    fn encode_version_negotiation_probe(dcid: &[u8], scid: &[u8]) -> alloc::vec::Vec<u8> {
        struct Header<'a> {
            dcid: &'a [u8],
            scid: &'a [u8],
        }
        impl EncoderValue for Header<'_> {
            fn encode<E: Encoder>(&self, encoder: &mut E) {
                0b1100_0000u8.encode(encoder);
                0u32.encode(encoder); // version negotiation marker
                (self.dcid.len() as u8).encode(encoder);
                self.dcid.encode(encoder);
                (self.scid.len() as u8).encode(encoder);
                self.scid.encode(encoder);
                // one placeholder supported-version entry so the trailing buffer is a
                // non-empty multiple of 4 bytes, as the decoder requires
                0u32.encode(encoder);
            }
        }

        let header = Header { dcid, scid };
        let mut buffer = alloc::vec![0u8; 256];
        let mut encoder = EncoderBuffer::new(&mut buffer);
        header.encode(&mut encoder);
        let len = encoder.len();
        buffer.truncate(len);
        buffer
    }

    #[test]
    fn unsupported_version_is_routed_for_vn() {
        let remote = inet::SocketAddress::default();
        let info = connection_info(&remote);
        let dcid = [0xA1, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7, 0xA8];
        let scid = [0xB1, 0xB2];
        let mut bytes = encode_long_header(0xdead_beef, &dcid, &scid);

        let decision = preprocess(
            DecoderBufferMut::new(&mut bytes),
            &info,
            &crate::packet::long::DESTINATION_CONNECTION_ID_MAX_LEN,
            Mode::Shared,
            |v| v == SUPPORTED_VERSION,
        );

        match decision {
            Decision::UnsupportedVersion {
                destination_connection_id,
                source_connection_id,
            } => {
                assert_eq!(destination_connection_id.as_bytes(), &dcid);
                assert_eq!(source_connection_id.as_bytes(), &scid);
            }
            _ => panic!("expected an UnsupportedVersion decision"),
        }
    }

    /// A Version Negotiation-marker packet must take the same listener-gated path as any
    /// other unsupported version, so the demultiplexer still gets a chance to reply with
    /// Version Negotiation rather than silently dropping it.
    #[test]
    fn vn_marker_version_is_routed_for_vn() {
        let remote = inet::SocketAddress::default();
        let info = connection_info(&remote);
        let dcid = [0xA1, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7, 0xA8];
        let scid = [0xB1, 0xB2];
        let mut bytes = encode_version_negotiation_probe(&dcid, &scid);

        let decision = preprocess(
            DecoderBufferMut::new(&mut bytes),
            &info,
            &crate::packet::long::DESTINATION_CONNECTION_ID_MAX_LEN,
            Mode::Shared,
            |v| v == SUPPORTED_VERSION,
        );

        match decision {
            Decision::UnsupportedVersion {
                destination_connection_id,
                source_connection_id,
            } => {
                assert_eq!(destination_connection_id.as_bytes(), &dcid);
                assert_eq!(source_connection_id.as_bytes(), &scid);
            }
            _ => panic!("expected an UnsupportedVersion decision"),
        }
    }

    #[test]
    fn exclusive_binding_rejects_nonzero_destination_cid() {
        let remote = inet::SocketAddress::default();
        let info = connection_info(&remote);
        let dcid = [0xA1; 8];
        let scid = [0xB1; 8];
        let mut bytes = encode_long_header(SUPPORTED_VERSION, &dcid, &scid);

        let decision = preprocess(
            DecoderBufferMut::new(&mut bytes),
            &info,
            &crate::packet::long::DESTINATION_CONNECTION_ID_MAX_LEN,
            Mode::Exclusive,
            |v| v == SUPPORTED_VERSION,
        );

        assert!(matches!(
            decision,
            Decision::Reject {
                reason: "Non-zero length CID on exclusive binding"
            }
        ));
    }

    #[test]
    fn shared_binding_rejects_short_destination_cid() {
        let remote = inet::SocketAddress::default();
        let info = connection_info(&remote);
        let dcid = [0xA1; 3];
        let scid = [0xB1; 8];
        let mut bytes = encode_long_header(SUPPORTED_VERSION, &dcid, &scid);

        let decision = preprocess(
            DecoderBufferMut::new(&mut bytes),
            &info,
            &crate::packet::long::DESTINATION_CONNECTION_ID_MAX_LEN,
            Mode::Shared,
            |v| v == SUPPORTED_VERSION,
        );

        assert!(matches!(decision, Decision::Reject { .. }));
    }
}
