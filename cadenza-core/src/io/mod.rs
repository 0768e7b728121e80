// Cadenza
// Copyright (c) 2026 The Project Cadenza Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `io` module implements the bit-level queue used as a bit reservoir, a bit-serial Huffman
//! decoder, and the `Monitor` interface used by checksums.

mod bit_queue;
pub mod huffman;

pub use bit_queue::{BitQueue, MAX_RESTORE_BITS};

/// A `Monitor` observes a sequence of bytes, for example to compute a checksum over them.
pub trait Monitor {
    fn process_byte(&mut self, byte: u8);

    #[inline(always)]
    fn process_double_bytes(&mut self, buf: [u8; 2]) {
        self.process_byte(buf[0]);
        self.process_byte(buf[1]);
    }

    fn process_buf_bytes(&mut self, buf: &[u8]) {
        for &byte in buf {
            self.process_byte(byte);
        }
    }
}
