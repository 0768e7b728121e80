// Cadenza
// Copyright (c) 2026 The Project Cadenza Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::io::Monitor;

/// CRC-16 generator polynomial used by MPEG audio: x^16 + x^15 + x^2 + 1.
const CRC16_POLY: u16 = 0x8005;

const CRC16_TABLE: [u16; 256] = build_crc16_table();

const fn build_crc16_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;

    while i < 256 {
        let mut crc = (i as u16) << 8;
        let mut bit = 0;

        while bit < 8 {
            crc = if crc & 0x8000 != 0 { (crc << 1) ^ CRC16_POLY } else { crc << 1 };
            bit += 1;
        }

        table[i] = crc;
        i += 1;
    }

    table
}

/// `Crc16Mpeg` implements the non-reflected CRC-16 with polynomial 0x8005 as used to protect MPEG
/// audio frame headers and side information.
pub struct Crc16Mpeg {
    state: u16,
}

impl Crc16Mpeg {
    /// Instantiate a new CRC with the given initial state. MPEG audio uses `0xffff`.
    pub fn new(state: u16) -> Self {
        Crc16Mpeg { state }
    }

    /// Returns the computed CRC.
    pub fn crc(&self) -> u16 {
        self.state
    }
}

impl Monitor for Crc16Mpeg {
    #[inline(always)]
    fn process_byte(&mut self, byte: u8) {
        let index = ((self.state >> 8) as u8 ^ byte) as usize;
        self.state = (self.state << 8) ^ CRC16_TABLE[index];
    }
}
