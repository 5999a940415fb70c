// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::{random, stateless_reset};

//= https://www.rfc-editor.org/rfc/rfc9000#section-10.3
//# Stateless Reset {
//#   Fixed Bits (2) = 1,
//#   Unpredictable Bits (38..),
//#   Stateless Reset Token (128),
//# }

//= https://www.rfc-editor.org/rfc/rfc9000#section-10.3
//# Endpoints MUST send Stateless Resets formatted as a packet
//# with a short header.
const TAG: u8 = 0b0100_0000;
const TAG_OFFSET: u8 = 2;

/// The size, in bytes, that a Stateless Reset packet targets when the
/// triggering datagram is large enough to allow it. Chosen independently of
/// any negotiated AEAD tag length; the only thing that matters is that the
/// result is indistinguishable from a short header packet.
pub const RECOMMENDED_STATELESS_RESET_PACKET_LENGTH: usize = 50;

/// The smallest Stateless Reset packet the Binding will ever send. Anything
/// shorter risks being distinguishable from a valid short header packet.
pub const MIN_STATELESS_RESET_PACKET_LENGTH: usize = 5 + stateless_reset::token::LEN;

const _: () = assert!(MIN_STATELESS_RESET_PACKET_LENGTH <= RECOMMENDED_STATELESS_RESET_PACKET_LENGTH);

/// Encodes a stateless reset packet into the given packet buffer.
///
/// `triggering_packet_len` is the length of the datagram that provoked this
/// reply; the reply must always be shorter than it, to avoid being used for
/// an amplification loop. Returns `None` if the triggering packet was too
/// small to safely answer.
pub fn encode_packet(
    token: stateless_reset::Token,
    triggering_packet_len: usize,
    key_phase: bool,
    random_generator: &mut dyn random::Generator,
    packet_buf: &mut [u8],
) -> Option<usize> {
    //= https://www.rfc-editor.org/rfc/rfc9000#section-10.3.3
    //# An endpoint MUST ensure that every Stateless Reset that it sends is
    //# smaller than the packet that triggered it, unless it maintains state
    //# sufficient to prevent looping.
    let max_len = triggering_packet_len
        .saturating_sub(1)
        .min(packet_buf.len());

    if max_len < MIN_STATELESS_RESET_PACKET_LENGTH {
        return None;
    }

    // Draw 8 random bits, keep the top 3, and add them to the recommended
    // length. This gives a small amount of size variance without requiring a
    // bounded random range, then clamp down to what the triggering packet
    // and buffer actually allow.
    let mut random_byte = [0u8; 1];
    random_generator.public_random_fill(&mut random_byte);
    let jitter = (random_byte[0] >> 5) as usize;

    let packet_len = (RECOMMENDED_STATELESS_RESET_PACKET_LENGTH + jitter)
        .min(max_len)
        .max(MIN_STATELESS_RESET_PACKET_LENGTH);

    debug_assert!(packet_len >= MIN_STATELESS_RESET_PACKET_LENGTH);
    debug_assert!(packet_len <= max_len);
    debug_assert!(packet_len < triggering_packet_len);

    let unpredictable_bits_len = packet_len - stateless_reset::token::LEN;

    //= https://www.rfc-editor.org/rfc/rfc9000#section-10.3
    //# The remainder of the first byte
    //# and an arbitrary number of bytes following it are set to values that
    //# SHOULD be indistinguishable from random.
    random_generator.public_random_fill(&mut packet_buf[..unpredictable_bits_len]);

    // Write the short header tag over the first two bits
    packet_buf[0] = packet_buf[0] >> TAG_OFFSET | TAG;

    //= https://www.rfc-editor.org/rfc/rfc9000#section-17.3.1
    //# The same value is used for the duration of the connection in order
    //# to allow a peer to detect when a key update has been applied.
    // A Stateless Reset has no connection state to consult, so it echoes the
    // triggering packet's key phase bit rather than inventing one.
    const KEY_PHASE_BIT: u8 = 0b0000_0100;
    if key_phase {
        packet_buf[0] |= KEY_PHASE_BIT;
    } else {
        packet_buf[0] &= !KEY_PHASE_BIT;
    }

    packet_buf[unpredictable_bits_len..packet_len].copy_from_slice(token.as_ref());

    Some(packet_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stateless_reset::token::testing::TEST_TOKEN_1;

    #[test]
    fn encode_packet_test() {
        let triggering_packet_len = 600;
        let mut generator = random::testing::Generator::default();

        let mut buffer = [0; 1500];

        let packet_len = encode_packet(
            TEST_TOKEN_1,
            triggering_packet_len,
            true,
            &mut generator,
            &mut buffer,
        )
        .unwrap();

        //= https://www.rfc-editor.org/rfc/rfc9000#section-10.3.3
        //= type=test
        //# An endpoint MUST ensure that every Stateless Reset that it sends is
        //# smaller than the packet that triggered it, unless it maintains state
        //# sufficient to prevent looping.
        assert!(packet_len < triggering_packet_len);

        //= https://www.rfc-editor.org/rfc/rfc9000#section-10.3
        //= type=test
        //# Endpoints MUST send Stateless Resets formatted as a packet
        //# with a short header.
        assert_eq!(buffer[0] & 0b1100_0000, TAG);

        assert_eq!(
            TEST_TOKEN_1.into_inner(),
            buffer[packet_len - stateless_reset::token::LEN..packet_len]
        );
    }

    #[test]
    fn min_packet_test() {
        let mut generator = random::testing::Generator::default();
        let mut buffer = [0; 1500];

        // A triggering packet exactly at the floor still produces a reply.
        let triggering_packet_len = MIN_STATELESS_RESET_PACKET_LENGTH + 1;
        let packet_len = encode_packet(
            TEST_TOKEN_1,
            triggering_packet_len,
            true,
            &mut generator,
            &mut buffer,
        );
        assert_eq!(packet_len, Some(MIN_STATELESS_RESET_PACKET_LENGTH));

        // Anything shorter can't be safely answered.
        let packet_len = encode_packet(
            TEST_TOKEN_1,
            MIN_STATELESS_RESET_PACKET_LENGTH,
            true,
            &mut generator,
            &mut buffer,
        );
        assert!(packet_len.is_none());

        let packet_len = encode_packet(TEST_TOKEN_1, 0, true, &mut generator, &mut buffer);
        assert!(packet_len.is_none());
    }

    #[test]
    fn max_packet_test() {
        let mut generator = random::testing::Generator::default();
        let mut buffer = [0; 1500];

        let triggering_packet_len = 1500;
        let packet_len = encode_packet(
            TEST_TOKEN_1,
            triggering_packet_len,
            true,
            &mut generator,
            &mut buffer,
        );

        assert!(packet_len.is_some());
        let packet_len = packet_len.unwrap();
        assert!(packet_len < triggering_packet_len);
        assert!(packet_len >= RECOMMENDED_STATELESS_RESET_PACKET_LENGTH);
    }

    #[test]
    fn packet_encoding_test() {
        bolero::check!()
            .with_type::<(u8, u16)>()
            .cloned()
            .for_each(|(seed, triggering_packet_len)| {
                let mut generator = random::testing::Generator {
                    seed,
                    ..Default::default()
                };
                let triggering_packet_len = triggering_packet_len as usize;
                let mut buffer = [0; 1500];
                let packet_len = encode_packet(
                    TEST_TOKEN_1,
                    triggering_packet_len,
                    seed & 1 == 0,
                    &mut generator,
                    &mut buffer,
                );

                let max_len = triggering_packet_len.saturating_sub(1).min(buffer.len());

                if max_len >= MIN_STATELESS_RESET_PACKET_LENGTH {
                    let packet_len = packet_len.unwrap();
                    assert!(packet_len <= max_len);
                    assert!(packet_len >= MIN_STATELESS_RESET_PACKET_LENGTH);
                    assert!(packet_len < triggering_packet_len);
                    assert_eq!(buffer[0] & 0b1100_0000, TAG);
                    assert_eq!(
                        TEST_TOKEN_1.into_inner(),
                        buffer[packet_len - stateless_reset::token::LEN..packet_len]
                    );
                } else {
                    assert!(packet_len.is_none());
                }
            })
    }
}
