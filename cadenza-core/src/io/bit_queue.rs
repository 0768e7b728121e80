// Cadenza
// Copyright (c) 2026 The Project Cadenza Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::VecDeque;
use std::io;

/// The maximum number of retired bytes a `BitQueue` remembers for rollback.
const MAX_RETIRED: usize = 2;

/// The maximum number of bits that may be restored with a single call to
/// [`BitQueue::restore_bits`].
pub const MAX_RESTORE_BITS: u32 = 8 * MAX_RETIRED as u32;

#[inline(always)]
fn end_of_bitstream_error<T>() -> io::Result<T> {
    Err(io::Error::new(io::ErrorKind::UnexpectedEof, "unexpected end of bitstream"))
}

/// `BitQueue` is a growable FIFO of bytes that is read, most-significant bit first, one bit at a
/// time.
///
/// Bytes are pushed onto the back of the queue and bits are popped from the front. A byte is only
/// removed from the queue once all 8 of its bits have been popped. The queue remembers the last
/// few bytes it removed so that a small over-read may be rolled back with
/// [`BitQueue::restore_bits`].
///
/// The queue also keeps a running count of the bits popped since the last call to
/// [`BitQueue::begin`]. This count may be compared against a target bit length to discard unread
/// bits, or restore over-read bits, at the end of a logical read.
#[derive(Default, Clone)]
pub struct BitQueue {
    buf: VecDeque<u8>,
    /// The number of bits consumed from the front byte, 0..=7.
    bit_pos: u32,
    /// The number of bits consumed since the last call to `begin`.
    consumed: u64,
    /// The most recently retired bytes, oldest first.
    retired: [u8; MAX_RETIRED],
    n_retired: usize,
}

impl BitQueue {
    /// Instantiate an empty `BitQueue`.
    pub fn new() -> Self {
        Default::default()
    }

    /// Instantiate an empty `BitQueue` able to hold `capacity` bytes without reallocating.
    pub fn with_capacity(capacity: usize) -> Self {
        BitQueue { buf: VecDeque::with_capacity(capacity), ..Default::default() }
    }

    /// Gets the number of bytes in the queue, including a partially consumed front byte.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` if the queue holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Gets the number of bits that may still be popped.
    pub fn bits_left(&self) -> u64 {
        8 * self.buf.len() as u64 - u64::from(self.bit_pos)
    }

    /// Returns `true` if the front of the queue is on a byte boundary.
    pub fn is_aligned(&self) -> bool {
        self.bit_pos == 0
    }

    /// Push a single byte onto the back of the queue.
    pub fn push_byte(&mut self, byte: u8) {
        self.buf.push_back(byte);
    }

    /// Push all bytes of `buf` onto the back of the queue.
    pub fn push_bytes(&mut self, buf: &[u8]) {
        self.buf.extend(buf.iter().copied());
    }

    /// Removes all bytes from the queue and forgets the rollback history. The transaction counter is
    /// not affected.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.bit_pos = 0;
        self.n_retired = 0;
    }

    /// Start a new transaction by resetting the consumed bit counter to 0.
    pub fn begin(&mut self) {
        self.consumed = 0;
    }

    /// Gets the number of bits consumed since the last call to `begin`.
    pub fn bits_consumed(&self) -> u64 {
        self.consumed
    }

    fn retire_front(&mut self) {
        if let Some(byte) = self.buf.pop_front() {
            if self.n_retired == MAX_RETIRED {
                self.retired.copy_within(1.., 0);
                self.n_retired -= 1;
            }
            self.retired[self.n_retired] = byte;
            self.n_retired += 1;
        }
        self.bit_pos = 0;
    }

    /// Pops a single bit from the front of the queue.
    #[inline(always)]
    pub fn pop_bit(&mut self) -> io::Result<bool> {
        let byte = match self.buf.front() {
            Some(&byte) => byte,
            None => return end_of_bitstream_error(),
        };

        let bit = (byte >> (7 - self.bit_pos)) & 1 == 1;

        self.bit_pos += 1;
        self.consumed += 1;

        if self.bit_pos == 8 {
            self.retire_front();
        }

        Ok(bit)
    }

    /// Pops up to 32 bits from the front of the queue and returns them as an unsigned integer, the
    /// first popped bit being the most-significant.
    ///
    /// If fewer than `bit_width` bits are available an error is returned and no bits are consumed.
    pub fn pop_bits(&mut self, bit_width: u32) -> io::Result<u32> {
        debug_assert!(bit_width <= u32::BITS);

        if u64::from(bit_width) > self.bits_left() {
            return end_of_bitstream_error();
        }

        let mut value = 0;

        for _ in 0..bit_width {
            value = (value << 1) | u32::from(self.pop_bit()?);
        }

        Ok(value)
    }

    /// Discards `num_bits` bits from the front of the queue.
    pub fn ignore_bits(&mut self, num_bits: u64) -> io::Result<()> {
        if num_bits > self.bits_left() {
            return end_of_bitstream_error();
        }

        let mut left = num_bits;

        // Finish the partial front byte, then drop whole bytes.
        while left > 0 && self.bit_pos != 0 {
            self.pop_bit()?;
            left -= 1;
        }

        while left >= 8 {
            self.retire_front();
            self.consumed += 8;
            left -= 8;
        }

        while left > 0 {
            self.pop_bit()?;
            left -= 1;
        }

        Ok(())
    }

    /// Discards the unconsumed remainder of a partially consumed front byte.
    pub fn align_to_byte(&mut self) {
        if !self.is_aligned() {
            self.consumed += u64::from(8 - self.bit_pos);
            self.retire_front();
        }
    }

    /// Drops `count` whole bytes from the front of the queue. A partially consumed front byte counts
    /// as one byte.
    pub fn discard_bytes(&mut self, count: usize) -> io::Result<()> {
        if count > self.buf.len() {
            return end_of_bitstream_error();
        }

        self.buf.drain(..count);
        self.bit_pos = 0;
        self.n_retired = 0;

        Ok(())
    }

    /// Rewinds the queue by `num_bits` bits so that they may be popped again.
    ///
    /// Only bits from the current front byte and the last [`MAX_RESTORE_BITS`] bits worth of
    /// retired bytes can be restored. Bytes removed with `drain`, `clear`, or `discard_bytes` are
    /// not restorable past the point they were removed.
    pub fn restore_bits(&mut self, num_bits: u32) -> io::Result<()> {
        let mut left = num_bits;

        if left <= self.bit_pos {
            self.bit_pos -= left;
        }
        else {
            left -= self.bit_pos;

            let bytes = ((left + 7) / 8) as usize;

            if bytes > self.n_retired {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "cannot restore more bits than were retired",
                ));
            }

            for _ in 0..bytes {
                self.n_retired -= 1;
                self.buf.push_front(self.retired[self.n_retired]);
            }

            self.bit_pos = 8 * bytes as u32 - left;
        }

        self.consumed = self.consumed.saturating_sub(u64::from(num_bits));

        Ok(())
    }
}

impl From<&[u8]> for BitQueue {
    fn from(buf: &[u8]) -> Self {
        BitQueue { buf: buf.iter().copied().collect(), ..Default::default() }
    }
}
