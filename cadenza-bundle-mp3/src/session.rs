// Cadenza
// Copyright (c) 2026 The Project Cadenza Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::error;
use std::fmt;

use cadenza_core::errors::{Error, Result};
use cadenza_core::io::BitQueue;

use log::{debug, warn};

use crate::common::*;
use crate::equalizer::Equalizer;
use crate::frame::Frame;
use crate::header::MAX_MPEG_FRAME_SIZE;
use crate::layer3::{self, FrameData, Spectrum, SynthesisState};
use crate::pcm::PcmBlock;
use crate::synthesis::DEFAULT_PCM_SCALE;

/// The largest number of bytes the bit reservoir can hold: the maximum main_data_begin (511)
/// plus the main data of the largest frame.
const RESERVOIR_CAPACITY: usize = 511 + MAX_MPEG_FRAME_SIZE;

/// `DecoderOptions` is a common set of options that all decoder sessions use.
#[derive(Copy, Clone, Debug)]
pub struct DecoderOptions {
    /// Verify the CRC of protected frames. Frames failing verification are unhealthy.
    pub verify: bool,
    /// The equalizer applied before polyphase synthesis.
    pub equalizer: Equalizer,
    /// The scale applied to synthesized samples before conversion to 16-bit PCM.
    pub scale: f64,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        DecoderOptions { verify: false, equalizer: Equalizer::default(), scale: DEFAULT_PCM_SCALE }
    }
}

/// The reason a frame could not be decoded.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FrameError {
    /// The side information is malformed.
    SideInfo(&'static str),
    /// The scale factors or spectral samples are malformed.
    MainData(&'static str),
    /// The bit reservoir ran out of bits.
    EndOfStream,
    /// The frame failed CRC verification.
    Crc,
    /// The main data of the frame begins in a frame that was not decoded. This is expected at the
    /// start of a stream, and after a seek or an unhealthy frame.
    ReservoirNotReady,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            FrameError::SideInfo(msg) => write!(f, "malformed side information: {}", msg),
            FrameError::MainData(msg) => write!(f, "malformed main data: {}", msg),
            FrameError::EndOfStream => write!(f, "bit reservoir exhausted"),
            FrameError::Crc => write!(f, "crc mismatch"),
            FrameError::ReservoirNotReady => write!(f, "bit reservoir not ready"),
        }
    }
}

impl error::Error for FrameError {}

impl FrameError {
    /// Returns `true` if the error is fatal to the session state, that is, the bit reservoir must
    /// be cleared and re-synchronized.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, FrameError::ReservoirNotReady)
    }

    fn from_side_info(err: Error) -> Self {
        match err {
            Error::DecodeError(msg) => FrameError::SideInfo(msg),
            err => FrameError::from_main_data(err),
        }
    }

    fn from_main_data(err: Error) -> Self {
        match err {
            err if err.is_end_of_stream() => FrameError::EndOfStream,
            Error::DecodeError(msg) | Error::Unsupported(msg) | Error::LimitError(msg) => {
                FrameError::MainData(msg)
            }
            _ => FrameError::MainData("mp3: bit reservoir error"),
        }
    }
}

/// The outcome of decoding a single frame.
#[derive(Clone, Debug, PartialEq)]
pub enum FrameOutcome {
    /// The frame was decoded.
    Healthy(PcmBlock),
    /// The main data of the frame reaches further back than the bit reservoir holds. The main data
    /// was banked, but no PCM was produced.
    Deferred,
    /// The frame could not be decoded.
    Unhealthy(FrameError),
}

impl FrameOutcome {
    /// Returns `true` if the frame was decoded or deferred.
    pub fn is_healthy(&self) -> bool {
        !matches!(self, FrameOutcome::Unhealthy(_))
    }

    /// Gets the decoded PCM, if any.
    pub fn pcm(&self) -> Option<&PcmBlock> {
        match self {
            FrameOutcome::Healthy(pcm) => Some(pcm),
            _ => None,
        }
    }

    /// Gets the error, if any.
    pub fn error(&self) -> Option<FrameError> {
        match self {
            FrameOutcome::Unhealthy(err) => Some(*err),
            _ => None,
        }
    }
}

/// The state of the bit reservoir after the main data of a frame was buffered.
enum Fill {
    /// The main data of the frame's granules is at the front of the reservoir.
    Ready,
    /// The reservoir does not yet hold enough bytes.
    Deferred,
    /// Waiting for a frame that does not use the reservoir.
    NotReady,
}

/// `DecoderSession` decodes a sequence of Layer 3 frames.
///
/// Layer 3 frames are not independent. The main data of a frame may begin in the bytes of
/// previous frames (the bit reservoir), and both the IMDCT overlap and the polyphase filter
/// history carry over from one frame to the next. A session owns all of this state, and frames
/// must therefore be presented to it in stream order.
pub struct DecoderSession {
    options: DecoderOptions,
    reservoir: BitQueue,
    /// If `true`, frames are not decoded until one with a main_data_begin of 0 is found.
    awaiting_zero: bool,
    spectrum: Box<Spectrum>,
    synthesis: Box<SynthesisState>,
}

impl Default for DecoderSession {
    fn default() -> Self {
        DecoderSession::new(Default::default())
    }
}

impl DecoderSession {
    pub fn new(options: DecoderOptions) -> Self {
        DecoderSession {
            options,
            reservoir: BitQueue::with_capacity(RESERVOIR_CAPACITY),
            awaiting_zero: true,
            spectrum: Box::new([[[0.0; SAMPLES_PER_GRANULE]; 2]; GRANULES_PER_FRAME]),
            synthesis: Box::new(SynthesisState::new(
                options.equalizer.factors(),
                options.scale,
            )),
        }
    }

    pub fn options(&self) -> &DecoderOptions {
        &self.options
    }

    /// Returns the session to its initial state: the bit reservoir is empty and waiting for a
    /// frame that does not use it, and all synthesis state is cleared.
    pub fn reset(&mut self) {
        self.reservoir.clear();
        self.awaiting_zero = true;
        self.synthesis.reset();
    }

    /// Replace the equalizer. Takes effect from the next decoded frame.
    pub fn set_equalizer(&mut self, equalizer: Equalizer) {
        self.options.equalizer = equalizer;
        self.synthesis.set_eq(equalizer.factors());
    }

    /// Returns `true` if the session is waiting for a frame with a main_data_begin of 0.
    pub fn is_awaiting_zero(&self) -> bool {
        self.awaiting_zero
    }

    /// Gets the number of bytes in the bit reservoir.
    pub fn reservoir_len(&self) -> usize {
        self.reservoir.len()
    }

    /// Decodes a frame into PCM.
    pub fn decode(&mut self, frame: &Frame) -> FrameOutcome {
        let header = &frame.header;

        if self.options.verify && !frame.verify_crc() {
            return self.fail(FrameError::Crc);
        }

        let mut frame_data = match self.begin_frame(frame) {
            Ok(Some(frame_data)) => frame_data,
            Ok(None) => return self.pending(frame),
            Err(err) => return self.fail(err),
        };

        if let Err(err) =
            layer3::read_main_data(header, &mut frame_data, &mut self.reservoir, &mut self.spectrum)
        {
            return self.fail(FrameError::from_main_data(err));
        }

        let mut samples = vec![0; SAMPLES_PER_FRAME * header.n_channels()];

        layer3::synthesize(header, &frame_data, &mut self.spectrum, &mut self.synthesis, &mut samples);

        FrameOutcome::Healthy(PcmBlock {
            sample_rate: header.sample_rate,
            channels: header.n_channels(),
            samples,
        })
    }

    /// Performs the bit reservoir bookkeeping of [`DecoderSession::decode`] without decoding the
    /// frame.
    ///
    /// The main data of the frame is skipped rather than decoded, and the synthesis state is not
    /// touched. After virtually decoding a run of frames, the bit reservoir is in the same state as
    /// if they were decoded. The PCM block of a healthy outcome is empty.
    pub fn decode_virtual(&mut self, frame: &Frame) -> FrameOutcome {
        let header = &frame.header;

        let frame_data = match self.begin_frame(frame) {
            Ok(Some(frame_data)) => frame_data,
            Ok(None) => return self.pending(frame),
            Err(err) => return self.fail(err),
        };

        if let Err(err) = self.reservoir.ignore_bits(frame_data.main_data_bits(header)) {
            return self.fail(FrameError::from_main_data(err.into()));
        }

        FrameOutcome::Healthy(PcmBlock::empty(header.sample_rate, header.n_channels()))
    }

    /// Reads the side information of the frame and buffers its main data. Returns the side
    /// information if the frame's granules can be decoded.
    fn begin_frame(&mut self, frame: &Frame) -> std::result::Result<Option<FrameData>, FrameError> {
        let frame_data = layer3::read_side_info(&frame.header, &frame.side_info)
            .map_err(FrameError::from_side_info)?;

        match self.fill_reservoir(frame_data.main_data_begin, &frame.main_data) {
            Ok(Fill::Ready) => Ok(Some(frame_data)),
            Ok(Fill::Deferred) | Ok(Fill::NotReady) => Ok(None),
            Err(err) => Err(FrameError::from_main_data(err)),
        }
    }

    /// Buffers the main data of a frame into the bit reservoir.
    fn fill_reservoir(&mut self, main_data_begin: u16, main_data: &[u8]) -> Result<Fill> {
        // The main data of each frame begins on a byte boundary. Any bits remaining in a partially
        // consumed byte are stuffing.
        self.reservoir.align_to_byte();

        let main_data_begin = usize::from(main_data_begin);
        let len = self.reservoir.len();

        // Bytes in the reservoir before main_data_begin are not referenced by any frame. They are
        // either stuffing, or belong to frames that were not decoded.
        if len > main_data_begin {
            self.reservoir.discard_bytes(len - main_data_begin)?;
        }

        if self.awaiting_zero {
            if main_data_begin != 0 {
                return Ok(Fill::NotReady);
            }
            self.awaiting_zero = false;
        }

        self.reservoir.push_bytes(main_data);

        if len < main_data_begin {
            return Ok(Fill::Deferred);
        }

        Ok(Fill::Ready)
    }

    /// Gets the outcome of a frame that was buffered but cannot be decoded yet.
    fn pending(&self, frame: &Frame) -> FrameOutcome {
        if self.awaiting_zero {
            debug!(
                "mp3: dropping frame, waiting for main_data_begin == 0 (main_data_begin={})",
                frame.main_data_begin()
            );
            FrameOutcome::Unhealthy(FrameError::ReservoirNotReady)
        }
        else {
            debug!(
                "mp3: deferring frame, bit reservoir holds {} bytes (main_data_begin={})",
                self.reservoir.len() - frame.main_data.len(),
                frame.main_data_begin()
            );
            FrameOutcome::Deferred
        }
    }

    /// Clears the bit reservoir after a failure so that decoding resumes at the next frame that
    /// does not use it.
    fn fail(&mut self, err: FrameError) -> FrameOutcome {
        warn!("mp3: unhealthy frame: {}", err);

        self.reservoir.clear();
        self.awaiting_zero = true;

        FrameOutcome::Unhealthy(err)
    }
}
