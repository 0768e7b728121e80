// Cadenza
// Copyright (c) 2026 The Project Cadenza Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]
// Justification: Fields on DecoderOptions may change at any time, but cadenza-play doesn't want to
// be updated every time those fields change, therefore always fill in the remaining fields with
// default values.
#![allow(clippy::needless_update)]

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use cadenza_bundle_mp3::{DecoderOptions, Equalizer, FrameOutcome, Mp3Decoder, EQ_BANDS};
use cadenza_core::errors::{limit_error, Result};

use clap::Parser;
use log::{error, info, warn, LevelFilter};

mod output;

use output::Output;

#[derive(Parser, Debug)]
#[command(name = "cadenza-play", version, about = "Decode MPEG-1 Layer III audio with Cadenza")]
struct Args {
    /// The input file path
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Print information about the stream and exit
    #[arg(long)]
    info: bool,

    /// Write the decoded audio to a file. Paths ending in .wav are written as WAVE, everything
    /// else as raw signed 16-bit little-endian samples
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Start decoding at the frame with the given index
    #[arg(long, value_name = "N", conflicts_with = "seek")]
    seek_frame: Option<usize>,

    /// Start decoding at the time in seconds
    #[arg(short, long, value_name = "SECONDS")]
    seek: Option<f64>,

    /// Stop after decoding the given number of frames
    #[arg(long, value_name = "N")]
    frames: Option<usize>,

    /// Comma separated equalizer band settings in the range -1.0 to 1.0, lowest band first
    #[arg(long, value_name = "S,S,...", value_delimiter = ',', allow_negative_numbers = true)]
    eq: Vec<f32>,

    /// Verify the CRC of protected frames
    #[arg(long)]
    verify: bool,

    /// Increase the log level, may be repeated
    #[arg(short, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Frame health counters.
#[derive(Default)]
struct Tally {
    healthy: usize,
    deferred: usize,
    unhealthy: usize,
}

fn main() {
    let args = Args::parse();

    init_logger(args.verbose);

    // For any error, return an exit code -1. Otherwise return the exit code provided.
    let code = match run(&args) {
        Ok(code) => code,
        Err(err) => {
            error!("{}", err.to_string().to_lowercase());
            -1
        }
    };

    std::process::exit(code)
}

/// Installs the logger. `RUST_LOG` takes precedence over the verbosity flag.
fn init_logger(verbose: u8) {
    let mut builder = pretty_env_logger::formatted_builder();

    match std::env::var("RUST_LOG") {
        Ok(filters) => {
            builder.parse_filters(&filters);
        }
        Err(_) => {
            let level = match verbose {
                0 => LevelFilter::Info,
                1 => LevelFilter::Debug,
                _ => LevelFilter::Trace,
            };
            builder.filter_level(level);
        }
    }

    builder.init();
}

fn run(args: &Args) -> Result<i32> {
    if args.eq.len() > EQ_BANDS {
        return limit_error("too many equalizer bands");
    }

    let options = DecoderOptions {
        verify: args.verify,
        equalizer: Equalizer::from(&args.eq[..]),
        ..Default::default()
    };

    let source = BufReader::new(File::open(&args.input)?);

    let mut decoder = Mp3Decoder::try_new(source, options)?;

    if args.info {
        print_info(&decoder);
        return Ok(0);
    }

    if let Some(index) = args.seek_frame {
        decoder.seek(index)?;
    }
    else if let Some(seconds) = args.seek {
        let index = decoder.seek_time(seconds)?;
        info!("seeked to frame {} ({:.3}s)", index, index as f64 * decoder.frame_duration());
    }

    let mut output = match &args.output {
        Some(path) => Some(Output::create(path, decoder.sample_rate(), decoder.channels())?),
        None => None,
    };

    let limit = args.frames.unwrap_or(usize::MAX);

    let mut tally = Tally::default();

    while tally.healthy + tally.deferred + tally.unhealthy < limit {
        let Some((index, outcome)) = decoder.next_frame()?
        else {
            break;
        };

        match outcome {
            FrameOutcome::Healthy(pcm) => {
                tally.healthy += 1;

                if let Some(output) = output.as_mut() {
                    output.write(&pcm)?;
                }
            }
            FrameOutcome::Deferred => tally.deferred += 1,
            FrameOutcome::Unhealthy(err) => {
                tally.unhealthy += 1;
                warn!("frame {}: {}", index, err);
            }
        }
    }

    if let Some(output) = output {
        output.finish()?;
    }

    info!(
        "decoded {} frames: {} healthy, {} deferred, {} unhealthy",
        tally.healthy + tally.deferred + tally.unhealthy,
        tally.healthy,
        tally.deferred,
        tally.unhealthy
    );

    Ok(0)
}

fn print_info<R: std::io::Read + std::io::Seek>(decoder: &Mp3Decoder<R>) {
    let header = decoder.first_header();

    println!("+ Format:      MPEG-1 Layer III");
    println!("| Sample Rate: {} Hz", decoder.sample_rate());
    println!("| Channels:    {} ({:?})", decoder.channels(), header.channel_mode);
    println!("| Bit-rate:    {} kbps (first frame)", header.bitrate / 1000);
    println!("| Protected:   {}", if header.has_crc { "yes" } else { "no" });
    println!("| Frames:      {}", decoder.frame_count());
    println!("+ Duration:    {}", fmt_time(decoder.duration()));
}

fn fmt_time(seconds: f64) -> String {
    let total = seconds.max(0.0);

    let hours = (total / 3600.0).floor();
    let mins = ((total - 3600.0 * hours) / 60.0).floor();
    let secs = total - 3600.0 * hours - 60.0 * mins;

    format!("{}:{:0>2}:{:0>6.3}", hours as u64, mins as u64, secs)
}
