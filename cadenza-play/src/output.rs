// Cadenza
// Copyright (c) 2026 The Project Cadenza Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use cadenza_bundle_mp3::PcmBlock;
use cadenza_core::errors::{limit_error, Result};

use log::debug;

/// The length of the RIFF, fmt, and data chunk headers.
const WAV_HEADER_LEN: u32 = 44;

const WAV_FORMAT_PCM: u16 = 0x0001;

/// A sink for decoded audio. Files ending in `.wav` are written as RIFF/WAVE, and everything else
/// as raw interleaved signed 16-bit little-endian samples.
pub enum Output {
    Wav(WavWriter),
    Raw(BufWriter<File>),
}

impl Output {
    pub fn create(path: &Path, sample_rate: u32, channels: usize) -> Result<Output> {
        let file = BufWriter::new(File::create(path)?);

        let is_wav = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| ext.eq_ignore_ascii_case("wav"));

        if is_wav {
            Ok(Output::Wav(WavWriter::try_new(file, sample_rate, channels as u16)?))
        }
        else {
            Ok(Output::Raw(file))
        }
    }

    pub fn write(&mut self, pcm: &PcmBlock) -> Result<()> {
        match self {
            Output::Wav(wav) => wav.write(pcm),
            Output::Raw(file) => Ok(pcm.write_le(file)?),
        }
    }

    pub fn finish(self) -> Result<()> {
        match self {
            Output::Wav(wav) => wav.finish(),
            Output::Raw(mut file) => Ok(file.flush()?),
        }
    }
}

/// Writes 16-bit PCM WAVE files. The chunk sizes are patched in when the writer is finished.
pub struct WavWriter {
    file: BufWriter<File>,
    data_len: u64,
}

impl WavWriter {
    fn try_new(mut file: BufWriter<File>, sample_rate: u32, channels: u16) -> Result<Self> {
        let block_align = 2 * channels;
        let byte_rate = sample_rate * u32::from(block_align);

        // RIFF chunk, with a placeholder size.
        file.write_all(b"RIFF")?;
        file.write_all(&0u32.to_le_bytes())?;
        file.write_all(b"WAVE")?;

        // fmt chunk.
        file.write_all(b"fmt ")?;
        file.write_all(&16u32.to_le_bytes())?;
        file.write_all(&WAV_FORMAT_PCM.to_le_bytes())?;
        file.write_all(&channels.to_le_bytes())?;
        file.write_all(&sample_rate.to_le_bytes())?;
        file.write_all(&byte_rate.to_le_bytes())?;
        file.write_all(&block_align.to_le_bytes())?;
        file.write_all(&16u16.to_le_bytes())?;

        // data chunk header, with a placeholder size.
        file.write_all(b"data")?;
        file.write_all(&0u32.to_le_bytes())?;

        debug!("wav: {} Hz, {} channels, 16 bits", sample_rate, channels);

        Ok(WavWriter { file, data_len: 0 })
    }

    fn write(&mut self, pcm: &PcmBlock) -> Result<()> {
        pcm.write_le(&mut self.file)?;
        self.data_len += 2 * pcm.samples.len() as u64;
        Ok(())
    }

    fn finish(mut self) -> Result<()> {
        let data_len = match u32::try_from(self.data_len) {
            Ok(len) if len <= u32::MAX - WAV_HEADER_LEN => len,
            _ => return limit_error("wav: data chunk exceeds 4 GiB"),
        };

        // The RIFF chunk size excludes the RIFF tag and the size field itself.
        let riff_len = data_len + WAV_HEADER_LEN - 8;

        self.file.seek(SeekFrom::Start(4))?;
        self.file.write_all(&riff_len.to_le_bytes())?;

        self.file.seek(SeekFrom::Start(u64::from(WAV_HEADER_LEN) - 4))?;
        self.file.write_all(&data_len.to_le_bytes())?;

        self.file.flush()?;

        debug!("wav: wrote {} bytes of audio", data_len);

        Ok(())
    }
}
