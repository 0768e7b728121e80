// Cadenza
// Copyright (c) 2026 The Project Cadenza Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::io::{Read, Seek};

use cadenza_core::errors::{end_of_stream_error, seek_error, Result, SeekErrorKind};

use log::debug;

use crate::common::FrameHeader;
use crate::equalizer::Equalizer;
use crate::frame::Frame;
use crate::reader::Mp3Reader;
use crate::session::{DecoderOptions, DecoderSession, FrameOutcome};

/// MPEG1 Layer 3 decoder.
///
/// `Mp3Decoder` reads frames from an [`Mp3Reader`] and decodes them with a [`DecoderSession`].
pub struct Mp3Decoder<R: Read + Seek> {
    reader: Mp3Reader<R>,
    session: DecoderSession,
}

impl<R: Read + Seek> Mp3Decoder<R> {
    pub fn try_new(source: R, options: DecoderOptions) -> Result<Self> {
        let reader = Mp3Reader::try_new(source)?;

        Ok(Mp3Decoder { reader, session: DecoderSession::new(options) })
    }

    /// Decodes the next frame. Returns the index of the frame and the outcome of decoding it, or
    /// `None` after the last frame.
    ///
    /// An unhealthy frame is not an error. Errors are only returned if the underlying source
    /// fails.
    pub fn next_frame(&mut self) -> Result<Option<(usize, FrameOutcome)>> {
        let index = self.reader.position();

        match self.reader.next_frame()? {
            Some(frame) => Ok(Some((index, self.session.decode(&frame)))),
            None => Ok(None),
        }
    }

    /// Seeks such that the next decoded frame is the frame at `index`.
    ///
    /// The bit reservoir cannot be restored from the position of a frame alone. It is rebuilt by
    /// virtually decoding the frames preceding `index`, starting from the nearest frame that does
    /// not use the reservoir. The frame immediately preceding `index` is then fully decoded, and
    /// its PCM discarded, to restore the IMDCT overlap and polyphase filter state. After a seek,
    /// the PCM of frame `index` onwards is identical to decoding the stream from the beginning.
    pub fn seek(&mut self, index: usize) -> Result<()> {
        if index >= self.reader.frame_count() {
            return seek_error(SeekErrorKind::OutOfRange);
        }

        self.session.reset();

        if index == 0 {
            return self.reader.seek(0);
        }

        let pre_roll = index - 1;

        // Find the nearest frame at or before the pre-roll frame with a main_data_begin of 0.
        // From this frame onwards the reservoir does not depend on any earlier frame.
        let mut start = pre_roll;

        while start > 0 && self.reader.main_data_begin(start)? != 0 {
            start -= 1;
        }

        debug!(
            "mp3: seeking to frame {}, replaying {} frames from frame {}",
            index,
            pre_roll - start,
            start
        );

        self.reader.seek(start)?;

        for _ in start..pre_roll {
            let frame = self.read_frame()?;
            self.session.decode_virtual(&frame);
        }

        let frame = self.read_frame()?;
        self.session.decode(&frame);

        Ok(())
    }

    /// Seeks to the frame containing the given time in seconds, and returns the index of the frame.
    pub fn seek_time(&mut self, seconds: f64) -> Result<usize> {
        let index = self.reader.frame_for_time(seconds);
        self.seek(index)?;
        Ok(index)
    }

    fn read_frame(&mut self) -> Result<Frame> {
        match self.reader.next_frame()? {
            Some(frame) => Ok(frame),
            None => end_of_stream_error(),
        }
    }

    /// Replace the equalizer.
    pub fn set_equalizer(&mut self, equalizer: Equalizer) {
        self.session.set_equalizer(equalizer);
    }

    /// Gets the index of the next frame to be decoded.
    pub fn position(&self) -> usize {
        self.reader.position()
    }

    pub fn frame_count(&self) -> usize {
        self.reader.frame_count()
    }

    pub fn duration(&self) -> f64 {
        self.reader.duration()
    }

    pub fn frame_duration(&self) -> f64 {
        self.reader.frame_duration()
    }

    pub fn sample_rate(&self) -> u32 {
        self.reader.sample_rate()
    }

    pub fn channels(&self) -> usize {
        self.reader.channels()
    }

    pub fn first_header(&self) -> &FrameHeader {
        self.reader.first_header()
    }

    pub fn reader(&self) -> &Mp3Reader<R> {
        &self.reader
    }

    pub fn session(&self) -> &DecoderSession {
        &self.session
    }

    pub fn into_inner(self) -> R {
        self.reader.into_inner()
    }
}
