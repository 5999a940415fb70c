// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::packet::{
    decoding::HeaderDecoder,
    long::{DestinationConnectionIdLen, SourceConnectionIdLen, Version},
    Tag,
};
use s2n_codec::{
    decoder_invariant, DecoderBufferMut, DecoderBufferMutResult, Encoder, EncoderValue,
};

//= https://www.rfc-editor.org/rfc/rfc9000#section-17.2.5
//# Retry Packet {
//#   Header Form (1) = 1,
//#   Fixed Bit (1) = 1,
//#   Long Packet Type (2) = 3,
//#   Unused (4),
//#   Version (32),
//#   Destination Connection ID Length (8),
//#   Destination Connection ID (0..160),
//#   Source Connection ID Length (8),
//#   Source Connection ID (0..160),
//#   Retry Token (..),
//# }
//
// Unlike RFC 9001's separate Retry Integrity Tag, the Binding authenticates a Retry
// by sealing the token itself with an AEAD keyed to the binding and bound to the new
// destination connection id (see `response::retry`). The wire layout therefore carries
// only the opaque, already-authenticated token.

//= https://www.rfc-editor.org/rfc/rfc9000#section-17.2.5
//# a Retry packet uses a long packet header with a type value of 0x03.
macro_rules! retry_tag {
    () => {
        0b1111u8
    };
}

#[derive(Debug)]
pub struct Retry<'a> {
    pub tag: Tag,
    pub version: Version,
    pub destination_connection_id: &'a [u8],
    pub source_connection_id: &'a [u8],
    pub retry_token: &'a [u8],
}

pub type ProtectedRetry<'a> = Retry<'a>;

impl<'a> Retry<'a> {
    /// The value in the Unused field is set to an arbitrary value by the server; a
    /// client MUST ignore these bits.
    pub const UNUSED_BITS: u8 = 0x0f;

    pub fn new(
        version: Version,
        destination_connection_id: &'a [u8],
        source_connection_id: &'a [u8],
        retry_token: &'a [u8],
    ) -> Self {
        Self {
            tag: (retry_tag!() << 4) | Self::UNUSED_BITS,
            version,
            destination_connection_id,
            source_connection_id,
            retry_token,
        }
    }

    #[inline]
    pub(crate) fn decode(
        tag: Tag,
        version: Version,
        buffer: DecoderBufferMut,
    ) -> DecoderBufferMutResult<Retry> {
        let mut decoder = HeaderDecoder::new_long(&buffer);

        let destination_connection_id = decoder.decode_destination_connection_id(&buffer)?;
        let source_connection_id = decoder.decode_source_connection_id(&buffer)?;

        let header_len = decoder.decoded_len();
        let (header, buffer) = buffer.decode_slice(header_len)?;
        let header: &[u8] = header.into_less_safe_slice();

        let destination_connection_id = destination_connection_id.get(header);
        let source_connection_id = source_connection_id.get(header);

        //= https://www.rfc-editor.org/rfc/rfc9000#section-17.2.5.2
        //# A client MUST discard a Retry packet with a zero-length
        //# Retry Token field.
        decoder_invariant!(!buffer.is_empty(), "Token cannot be empty");

        let retry_token: &[u8] = buffer.peek().into_less_safe_slice();
        let (retry_token, buffer) = buffer.decode_slice(retry_token.len())?;
        let retry_token: &[u8] = retry_token.into_less_safe_slice();

        let packet = Retry {
            tag,
            version,
            destination_connection_id,
            source_connection_id,
            retry_token,
        };

        Ok((packet, buffer))
    }

    #[inline]
    pub fn destination_connection_id(&self) -> &[u8] {
        self.destination_connection_id
    }

    #[inline]
    pub fn source_connection_id(&self) -> &[u8] {
        self.source_connection_id
    }

    #[inline]
    pub fn retry_token(&self) -> &[u8] {
        self.retry_token
    }
}

impl<'a> EncoderValue for Retry<'a> {
    fn encode<E: Encoder>(&self, encoder: &mut E) {
        let tag: u8 = self.tag;
        tag.encode(encoder);

        self.version.encode(encoder);

        self.destination_connection_id
            .encode_with_len_prefix::<DestinationConnectionIdLen, E>(encoder);
        self.source_connection_id
            .encode_with_len_prefix::<SourceConnectionIdLen, E>(encoder);
        self.retry_token.encode(encoder);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{connection, inet, packet};
    use s2n_codec::EncoderBuffer;

    #[test]
    fn round_trip() {
        let dcid = [0xaa; 8];
        let scid = [0xbb; 8];
        let token = [0x11u8; 36];

        let packet = Retry::new(1, &dcid, &scid, &token);
        let mut buf = [0u8; 128];
        let mut encoder = EncoderBuffer::new(&mut buf);
        packet.encode(&mut encoder);
        let len = encoder.len();

        let decoder = DecoderBufferMut::new(&mut buf[..len]);
        let remote_address = inet::ip::SocketAddress::default();
        let connection_info = connection::id::ConnectionInfo::new(&remote_address);
        let (decoded, _) =
            packet::ProtectedPacket::decode(decoder, &connection_info, &20).unwrap();
        let decoded = match decoded {
            packet::ProtectedPacket::Retry(retry) => retry,
            _ => panic!("expected retry packet type"),
        };

        assert_eq!(decoded.destination_connection_id, &dcid);
        assert_eq!(decoded.source_connection_id, &scid);
        assert_eq!(decoded.retry_token, &token);
        assert_eq!(decoded.version, 1);
    }

    #[test]
    fn rejects_empty_token() {
        let dcid = [0xaa; 8];
        let scid = [0xbb; 8];

        let packet = Retry::new(1, &dcid, &scid, &[]);
        let mut buf = [0u8; 64];
        let mut encoder = EncoderBuffer::new(&mut buf);
        packet.encode(&mut encoder);
        let len = encoder.len();

        let decoder = DecoderBufferMut::new(&mut buf[..len]);
        let remote_address = inet::ip::SocketAddress::default();
        let connection_info = connection::id::ConnectionInfo::new(&remote_address);
        assert!(packet::ProtectedPacket::decode(decoder, &connection_info, &20).is_err());
    }
}
