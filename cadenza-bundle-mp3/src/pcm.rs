// Cadenza
// Copyright (c) 2026 The Project Cadenza Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::io;

/// A block of interleaved, signed 16-bit PCM samples decoded from one frame.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PcmBlock {
    /// The sample rate in Hz.
    pub sample_rate: u32,
    /// The number of interleaved channels.
    pub channels: usize,
    /// The interleaved samples.
    pub samples: Vec<i16>,
}

impl PcmBlock {
    /// Instantiate an empty block.
    pub fn empty(sample_rate: u32, channels: usize) -> Self {
        PcmBlock { sample_rate, channels, samples: Vec::new() }
    }

    /// Gets the number of samples per channel.
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        }
        else {
            self.samples.len() / self.channels
        }
    }

    /// Returns `true` if the block has no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Gets an iterator over the samples of a single channel.
    pub fn channel(&self, ch: usize) -> impl Iterator<Item = i16> + '_ {
        self.samples.iter().skip(ch).step_by(self.channels.max(1)).copied()
    }

    /// Gets the samples as little-endian byte pairs.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(2 * self.samples.len());

        for sample in &self.samples {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }

        bytes
    }

    /// Writes the samples as little-endian byte pairs.
    pub fn write_le<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.to_le_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_le_bytes() {
        let block = PcmBlock { sample_rate: 44_100, channels: 2, samples: vec![1, -1, 0x1234, -32768] };

        assert_eq!(block.frames(), 2);
        assert_eq!(block.to_le_bytes(), [0x01, 0x00, 0xff, 0xff, 0x34, 0x12, 0x00, 0x80]);

        let mut out = Vec::new();
        block.write_le(&mut out).unwrap();
        assert_eq!(out, block.to_le_bytes());
    }

    #[test]
    fn verify_channel_iter() {
        let block = PcmBlock { sample_rate: 32_000, channels: 2, samples: vec![1, 2, 3, 4, 5, 6] };

        assert_eq!(block.channel(0).collect::<Vec<_>>(), [1, 3, 5]);
        assert_eq!(block.channel(1).collect::<Vec<_>>(), [2, 4, 6]);

        let empty = PcmBlock::empty(32_000, 0);
        assert_eq!(empty.frames(), 0);
        assert!(empty.is_empty());
    }
}
