// Cadenza
// Copyright (c) 2026 The Project Cadenza Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::io::{Read, Seek, SeekFrom};

use cadenza_core::errors::{decode_error, seek_error, Result, SeekErrorKind};

use log::{debug, warn};

use crate::common::FrameHeader;
use crate::frame::Frame;
use crate::header::{self, MPEG_HEADER_LEN};

/// The length of an ID3v2 tag header (and footer).
const ID3V2_HEADER_LEN: usize = 10;

/// The length of an ID3v1 tag.
const ID3V1_TAG_LEN: usize = 128;

/// The position of a frame in the stream.
#[derive(Copy, Clone, Debug)]
struct FramePos {
    pos: u64,
    header: FrameHeader,
}

/// MPEG1 Layer 3 elementary stream reader.
///
/// `Mp3Reader` scans the whole stream once when instantiated to build an index of every frame,
/// which then allows frames to be read in order, and seeked to, by index.
pub struct Mp3Reader<R: Read + Seek> {
    source: R,
    frames: Vec<FramePos>,
    /// The index of the next frame to read.
    cursor: usize,
    /// The current position of `source`, if known.
    source_pos: Option<u64>,
}

impl<R: Read + Seek> Mp3Reader<R> {
    /// Instantiate a reader and index the frames of `source`.
    pub fn try_new(mut source: R) -> Result<Self> {
        source.seek(SeekFrom::Start(0))?;

        let mut buf = Vec::new();
        source.read_to_end(&mut buf)?;

        let frames = scan_frames(&buf);

        if frames.is_empty() {
            return decode_error("mp3: no frames found");
        }

        debug!("mp3: indexed {} frames", frames.len());

        Ok(Mp3Reader { source, frames, cursor: 0, source_pos: None })
    }

    /// Gets the number of frames in the stream.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Gets the header of the first frame.
    pub fn first_header(&self) -> &FrameHeader {
        &self.frames[0].header
    }

    /// Gets the header of the frame at `index`.
    pub fn header(&self, index: usize) -> Option<&FrameHeader> {
        self.frames.get(index).map(|frame| &frame.header)
    }

    pub fn sample_rate(&self) -> u32 {
        self.first_header().sample_rate
    }

    pub fn channels(&self) -> usize {
        self.first_header().n_channels()
    }

    /// Gets the duration of a single frame in seconds.
    pub fn frame_duration(&self) -> f64 {
        self.first_header().duration()
    }

    /// Gets the duration of the stream in seconds.
    pub fn duration(&self) -> f64 {
        self.frames.iter().map(|frame| frame.header.duration()).sum()
    }

    /// Gets the index of the frame containing the given time in seconds. Times past the end of
    /// the stream yield the frame count.
    pub fn frame_for_time(&self, seconds: f64) -> usize {
        if seconds.is_nan() || seconds <= 0.0 {
            return 0;
        }

        let index = (seconds / self.frame_duration()).floor();

        if index >= self.frames.len() as f64 {
            self.frames.len()
        }
        else {
            index as usize
        }
    }

    /// Gets the index of the next frame to be read.
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Moves the cursor to the frame at `index`.
    pub fn seek(&mut self, index: usize) -> Result<()> {
        if index >= self.frames.len() {
            return seek_error(SeekErrorKind::OutOfRange);
        }

        self.cursor = index;
        Ok(())
    }

    /// Reads the frame at the cursor and advances the cursor. Returns `None` after the last frame.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(&FramePos { pos, header }) = self.frames.get(self.cursor)
        else {
            return Ok(None);
        };

        let mut buf = vec![0u8; header.frame_size];
        self.read_at(pos, &mut buf)?;

        self.cursor += 1;

        Ok(Some(Frame::from_bytes(header, &buf)?))
    }

    /// Reads the main_data_begin field of the frame at `index` without reading the whole frame.
    pub fn main_data_begin(&mut self, index: usize) -> Result<u16> {
        let Some(&FramePos { pos, header }) = self.frames.get(index)
        else {
            return seek_error(SeekErrorKind::OutOfRange);
        };

        // The side information follows the header and the optional CRC. Its first 9 bits are
        // main_data_begin.
        let mut buf = [0u8; 2];
        self.read_at(pos + (MPEG_HEADER_LEN + header.crc_len()) as u64, &mut buf)?;

        Ok((u16::from(buf[0]) << 1) | (u16::from(buf[1]) >> 7))
    }

    /// Consumes the reader and returns the underlying source.
    pub fn into_inner(self) -> R {
        self.source
    }

    fn read_at(&mut self, pos: u64, buf: &mut [u8]) -> Result<()> {
        if self.source_pos != Some(pos) {
            self.source.seek(SeekFrom::Start(pos))?;
        }

        // If the read fails, the source position is unknown.
        self.source_pos = None;
        self.source.read_exact(buf)?;
        self.source_pos = Some(pos + buf.len() as u64);

        Ok(())
    }
}

/// Gets the length of the ID3v2 tag at the start of `buf`, or 0 if there is none.
fn id3v2_len(buf: &[u8]) -> usize {
    if buf.len() < ID3V2_HEADER_LEN || &buf[..3] != b"ID3" {
        return 0;
    }

    // The tag size is a 28-bit sync-safe integer, and does not include the header, or the footer
    // if one is present.
    let size = buf[6..10].iter().fold(0usize, |size, &byte| (size << 7) | usize::from(byte & 0x7f));

    let has_footer = buf[5] & 0x10 != 0;

    ID3V2_HEADER_LEN + size + if has_footer { ID3V2_HEADER_LEN } else { 0 }
}

/// Gets the length of the ID3v1 tag at the end of `buf`, or 0 if there is none.
fn id3v1_len(buf: &[u8]) -> usize {
    if buf.len() >= ID3V1_TAG_LEN && &buf[buf.len() - ID3V1_TAG_LEN..][..3] == b"TAG" {
        ID3V1_TAG_LEN
    }
    else {
        0
    }
}

/// Reads and parses the frame header at `pos`, if there is a valid one.
fn header_at(buf: &[u8], pos: usize) -> Option<FrameHeader> {
    let bytes = buf.get(pos..pos + MPEG_HEADER_LEN)?;

    let word = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);

    // Random data can look like a sync word. Do a quick check to increase confidence that this
    // may be the start of a frame.
    if !header::is_frame_header_word_synced(word) || !header::check_header(word) {
        return None;
    }

    header::parse_frame_header(word).ok()
}

/// Scans `buf` for frames.
///
/// A candidate frame must fit in the stream. It is accepted if it is followed by another valid
/// frame header from the same stream, or if it directly follows the last accepted frame.
/// Everything else is junk and is skipped a byte at a time.
fn scan_frames(buf: &[u8]) -> Vec<FramePos> {
    let start = id3v2_len(buf);

    if start > 0 {
        debug!("mp3: skipping {} byte id3v2 tag", start);
    }

    let end = buf.len() - id3v1_len(buf);

    let mut frames: Vec<FramePos> = Vec::new();
    let mut pos = start;
    let mut junk = 0;

    while pos + MPEG_HEADER_LEN <= end {
        let header = match header_at(buf, pos) {
            Some(header) => header,
            None => {
                pos += 1;
                junk += 1;
                continue;
            }
        };

        let next = pos + header.frame_size;

        // A frame that is not confirmed by a following header must directly continue the accepted
        // frames, or start the data.
        let follows = match frames.last() {
            Some(last) => {
                last.pos as usize + last.header.frame_size == pos
                    && header::is_same_stream(&last.header, &header)
            }
            None => junk == 0,
        };

        let is_frame = if next <= end {
            let confirmed = next + MPEG_HEADER_LEN <= end
                && matches!(header_at(buf, next), Some(next) if header::is_same_stream(&header, &next));

            confirmed || follows
        }
        else {
            // The frame is cut short by the end of the stream.
            if follows {
                warn!(
                    "mp3: dropping truncated frame at {}, {} of {} bytes present",
                    pos,
                    end - pos,
                    header.frame_size
                );
                break;
            }

            false
        };

        if !is_frame {
            pos += 1;
            junk += 1;
            continue;
        }

        if junk > 0 {
            debug!("mp3: skipped {} bytes of junk before frame at {}", junk, pos);
            junk = 0;
        }

        frames.push(FramePos { pos: pos as u64, header });

        pos = next;
    }

    if junk > 0 {
        debug!("mp3: skipped {} bytes of junk at the end of the stream", junk);
    }

    frames
}
