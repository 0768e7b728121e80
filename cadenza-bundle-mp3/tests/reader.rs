// Cadenza
// Copyright (c) 2026 The Project Cadenza Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod common;

use std::io::Cursor;

use cadenza_bundle_mp3::*;

use common::*;

fn decode_all(bytes: &[u8]) -> Vec<FrameOutcome> {
    let mut decoder = Mp3Decoder::try_new(Cursor::new(bytes), Default::default()).unwrap();

    let mut outcomes = Vec::new();
    while let Some((_, outcome)) = decoder.next_frame().unwrap() {
        outcomes.push(outcome);
    }
    outcomes
}

/// An ID3v2.4 tag with a footer, and `size` bytes of padding.
fn id3v2_tag(size: usize) -> Vec<u8> {
    let mut tag = b"ID3\x04\x00\x10".to_vec();
    tag.extend((0..4).rev().map(|i| ((size >> (7 * i)) & 0x7f) as u8));
    tag.resize(10 + size, 0);
    tag.extend(b"3DI\x04\x00\x10");
    tag.extend((0..4).rev().map(|i| ((size >> (7 * i)) & 0x7f) as u8));
    tag
}

fn id3v1_tag() -> Vec<u8> {
    let mut tag = b"TAG".to_vec();
    tag.resize(128, b' ');
    tag
}

#[test]
fn verify_resync_over_tags_and_junk() {
    let stream = generate_stream(JOINT_STEREO_MS, 30, 20);

    let mut bytes = id3v2_tag(300);

    // Junk, including a lone header that is not followed by another frame.
    bytes.extend([0x00, 0x13, 0x37, 0xff, 0xfb, 0x90, 0x64, 0x00, 0x00, 0xff]);

    bytes.extend(&stream.bytes);
    bytes.extend(id3v1_tag());

    let mut reader = Mp3Reader::try_new(Cursor::new(&bytes)).unwrap();
    assert_eq!(reader.frame_count(), 30);

    for info in &stream.frames {
        let frame = reader.next_frame().unwrap().unwrap();
        assert_eq!(u32::from(frame.main_data_begin()), info.main_data_begin);
    }
    assert!(reader.next_frame().unwrap().is_none());

    assert_eq!(decode_all(&bytes), decode_all(&stream.bytes));
}

#[test]
fn verify_truncated_last_frame() {
    let stream = generate_stream(STEREO, 12, 21);

    let frame_size = stream.bytes.len() / 12;
    let cut = &stream.bytes[..stream.bytes.len() - frame_size / 2];

    let reader = Mp3Reader::try_new(Cursor::new(cut)).unwrap();
    assert_eq!(reader.frame_count(), 11);

    let full = decode_all(&stream.bytes);
    let outcomes = decode_all(cut);

    assert_eq!(&full[..11], &outcomes[..]);
}

#[test]
fn verify_duration() {
    for (header_word, n_frames, sample_rate) in
        [(JOINT_STEREO_MS, 25, 44_100.0), (STEREO, 7, 44_100.0), (MONO_CRC, 40, 48_000.0)]
    {
        let stream = generate_stream(header_word, n_frames, 22);

        let decoder = Mp3Decoder::try_new(Cursor::new(&stream.bytes), Default::default()).unwrap();

        let expected = n_frames as f64 * 1152.0 / sample_rate;

        assert_eq!(decoder.frame_count(), n_frames);
        assert_eq!(decoder.sample_rate() as f64, sample_rate);
        assert!((decoder.duration() - expected).abs() < 1e-9);
    }
}

#[test]
fn verify_no_frames() {
    let mut bytes = id3v2_tag(64);
    bytes.extend((0..2000u32).map(|i| (i * 7 % 251) as u8));
    bytes.extend(id3v1_tag());

    let result = Mp3Reader::try_new(Cursor::new(&bytes));
    assert!(result.is_err());

    let result = Mp3Decoder::try_new(Cursor::new(&[][..]), Default::default());
    assert!(result.is_err());
}
