// Cadenza
// Copyright (c) 2026 The Project Cadenza Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::cmp::min;

use cadenza_core::checksum::Crc16Mpeg;
use cadenza_core::errors::{decode_error, Result};
use cadenza_core::io::Monitor;

use crate::common::FrameHeader;
use crate::header::{parse_frame_header, MPEG_HEADER_LEN};

/// The initial state of the CRC-16 protecting MPEG audio frames.
const CRC_INITIAL_STATE: u16 = 0xffff;

/// A single MPEG audio frame split into its sections.
///
/// The byte layout of a Layer 3 frame is:
///
/// ```text
/// [header: 4][crc: 0 or 2][side_info: 17 or 32][main_data: ...]
/// ```
#[derive(Clone, Debug)]
pub struct Frame {
    pub header: FrameHeader,
    /// The raw header word, as read from the stream.
    pub header_word: u32,
    /// The CRC of the frame, if it is protected.
    pub crc: Option<u16>,
    pub side_info: Box<[u8]>,
    /// The main data bytes carried by this frame. These do not necessarily belong to this frame's
    /// granules, see `main_data_begin`.
    pub main_data: Box<[u8]>,
}

impl Frame {
    /// Splits `buf`, a whole frame including the header, into its sections.
    ///
    /// The main data section is every byte after the side information up-to `frame_size`. If
    /// `buf` is shorter than `frame_size` the main data is truncated accordingly, but the header,
    /// CRC, and side information must be complete.
    pub fn from_bytes(header: FrameHeader, buf: &[u8]) -> Result<Frame> {
        let side_info_start = MPEG_HEADER_LEN + header.crc_len();
        let main_data_start = side_info_start + header.side_info_len();

        if buf.len() < main_data_start {
            return decode_error("mp3: frame is too short");
        }

        let header_word = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);

        let crc = if header.has_crc { Some(u16::from_be_bytes([buf[4], buf[5]])) } else { None };

        let main_data_end = min(buf.len(), header.frame_size);

        Ok(Frame {
            header,
            header_word,
            crc,
            side_info: Box::from(&buf[side_info_start..main_data_start]),
            main_data: Box::from(&buf[main_data_start..main_data_end]),
        })
    }

    /// Parses the frame header from the first 4 bytes of `buf`, then splits `buf` as per
    /// [`Frame::from_bytes`].
    pub fn parse(buf: &[u8]) -> Result<Frame> {
        if buf.len() < MPEG_HEADER_LEN {
            return decode_error("mp3: frame is too short");
        }

        let header = parse_frame_header(u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]))?;

        Frame::from_bytes(header, buf)
    }

    /// Gets the byte offset, backwards from the start of this frame's main data, at which the
    /// main data of this frame's granules begins.
    pub fn main_data_begin(&self) -> u16 {
        (u16::from(self.side_info[0]) << 1) | (u16::from(self.side_info[1]) >> 7)
    }

    /// Computes the CRC-16 of the protected bits of the frame: the last 2 bytes of the header,
    /// and the whole side information.
    pub fn compute_crc(&self) -> u16 {
        let header_bytes = self.header_word.to_be_bytes();

        let mut crc = Crc16Mpeg::new(CRC_INITIAL_STATE);
        crc.process_double_bytes([header_bytes[2], header_bytes[3]]);
        crc.process_buf_bytes(&self.side_info);
        crc.crc()
    }

    /// Returns `true` if the frame is not protected, or if its CRC matches the computed CRC.
    pub fn verify_crc(&self) -> bool {
        match self.crc {
            Some(expected) => expected == self.compute_crc(),
            None => true,
        }
    }
}
