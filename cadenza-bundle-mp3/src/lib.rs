// Cadenza
// Copyright (c) 2026 The Project Cadenza Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A pure Rust MPEG-1 Audio Layer III decoder.
//!
//! [`Mp3Reader`] indexes the frames of an elementary stream, [`DecoderSession`] decodes frames
//! into PCM one at a time while carrying the bit reservoir and synthesis state between them, and
//! [`Mp3Decoder`] ties the two together with frame-accurate seeking.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]
// The following lints are allowed in all Cadenza crates. Please see the workspace Cargo.toml for
// their justification.
#![allow(clippy::excessive_precision)]
#![allow(clippy::identity_op)]
#![allow(clippy::manual_range_contains)]
#![allow(clippy::needless_range_loop)]

// Shared modules.
mod common;
mod header;

// Demuxer modules.
mod frame;
mod reader;

// Decoder modules.
mod decoder;
mod equalizer;
mod layer3;
mod pcm;
mod session;
mod synthesis;

pub use common::{ChannelMode, Emphasis, FrameHeader, StereoMode};
pub use common::{GRANULES_PER_FRAME, SAMPLES_PER_FRAME, SAMPLES_PER_GRANULE};
pub use decoder::Mp3Decoder;
pub use equalizer::{Equalizer, BAND_NOT_PRESENT, EQ_BANDS};
pub use frame::Frame;
pub use header::{parse_frame_header, MAX_MPEG_FRAME_SIZE, MPEG_HEADER_LEN};
pub use pcm::PcmBlock;
pub use reader::Mp3Reader;
pub use session::{DecoderOptions, DecoderSession, FrameError, FrameOutcome};
pub use synthesis::DEFAULT_PCM_SCALE;
