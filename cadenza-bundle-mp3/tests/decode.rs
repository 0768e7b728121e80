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

use rand::{rngs::SmallRng, SeedableRng};

/// Decodes every frame of a stream with a fresh session.
fn decode_all(bytes: &[u8], options: DecoderOptions) -> Vec<FrameOutcome> {
    let mut reader = Mp3Reader::try_new(Cursor::new(bytes)).unwrap();
    let mut session = DecoderSession::new(options);

    let mut outcomes = Vec::new();
    while let Some(frame) = reader.next_frame().unwrap() {
        outcomes.push(session.decode(&frame));
    }
    outcomes
}

/// Builds a frame with `main_data_begin == 0` from a frame specification. The unused main data
/// bytes are zero.
fn single_frame(header_word: u32, spec: &FrameSpec) -> Frame {
    let header = parse_frame_header(header_word).unwrap();

    let mut main_data = spec.main_data();
    assert!(main_data.len() <= header.main_data_len());
    main_data.resize(header.main_data_len(), 0);

    let buf = assemble_frame(header_word, &spec.side_info(&header, 0), &main_data);
    Frame::from_bytes(header, &buf).unwrap()
}

#[test]
fn verify_silent_frame() {
    // Every big_value is coded with table 0, and there is no count1 partition.
    let silent = ChannelSpec { table_select: [0; 3], big_values: Some(288), ..Default::default() };

    let spec = FrameSpec {
        scfsi: [[false; 4]; 2],
        granules: [vec![silent.clone(), silent.clone()], vec![silent.clone(), silent]],
    };

    assert_eq!(spec.part2_3_lengths(), [0, 0, 0, 0]);

    let frame = single_frame(JOINT_STEREO_MS, &spec);
    assert_eq!(frame.main_data_begin(), 0);

    let mut session = DecoderSession::default();

    let pcm = match session.decode(&frame) {
        FrameOutcome::Healthy(pcm) => pcm,
        outcome => panic!("unexpected outcome {:?}", outcome),
    };

    assert_eq!(pcm.sample_rate, 44_100);
    assert_eq!(pcm.channels, 2);
    assert_eq!(pcm.samples.len(), 2 * SAMPLES_PER_FRAME);
    assert!(pcm.samples.iter().all(|&s| s == 0));
    assert!(pcm.to_le_bytes().iter().all(|&b| b == 0));
}

#[test]
fn verify_bit_budget() {
    for (header_word, seed) in
        [(JOINT_STEREO_MS, 1), (JOINT_STEREO_MS_IS, 2), (STEREO, 3), (MONO_CRC, 4)]
    {
        let stream = generate_stream(header_word, 60, seed);

        let mut reader = Mp3Reader::try_new(Cursor::new(&stream.bytes)).unwrap();
        let mut session = DecoderSession::new(DecoderOptions { verify: true, ..Default::default() });

        assert_eq!(reader.frame_count(), stream.frames.len());

        for info in &stream.frames {
            let frame = reader.next_frame().unwrap().unwrap();
            assert_eq!(u32::from(frame.main_data_begin()), info.main_data_begin);

            let outcome = session.decode(&frame);
            let pcm = outcome.pcm().unwrap();
            assert_eq!(pcm.frames(), SAMPLES_PER_FRAME);

            // Exactly the bits claimed by the side information were consumed from the reservoir.
            assert_eq!(session.reservoir_len(), info.reservoir_after);
        }

        assert!(reader.next_frame().unwrap().is_none());
    }
}

#[test]
fn verify_generated_stream_is_audible() {
    let stream = generate_stream(JOINT_STEREO_MS, 20, 5);

    let outcomes = decode_all(&stream.bytes, Default::default());

    assert!(outcomes.iter().all(|outcome| outcome.pcm().is_some()));
    assert!(outcomes.iter().flat_map(|outcome| &outcome.pcm().unwrap().samples).any(|&s| s != 0));
}

#[test]
fn verify_truncated_main_data() {
    let header = parse_frame_header(STEREO).unwrap();
    let mut rng = SmallRng::seed_from_u64(6);

    let spec = random_frame(&mut rng, &header, 300);
    let main_data = spec.main_data();
    assert!(!main_data.is_empty());

    let frame = single_frame(STEREO, &spec);

    let mut session = DecoderSession::default();

    // The complete frame decodes.
    assert!(session.decode(&frame).pcm().is_some());

    // Cut the last byte of the granule data.
    session.reset();
    let truncated = Frame {
        main_data: Box::from(&frame.main_data[..main_data.len() - 1]),
        ..frame.clone()
    };

    assert_eq!(session.decode(&truncated), FrameOutcome::Unhealthy(FrameError::EndOfStream));
    assert!(session.is_awaiting_zero());
    assert_eq!(session.reservoir_len(), 0);

    // A frame that uses the reservoir cannot be decoded until a frame that doesn't arrives.
    let side_info = spec.side_info(&header, 10);
    let buf = assemble_frame(STEREO, &side_info, &vec![0; header.main_data_len()]);
    let borrowing = Frame::from_bytes(header, &buf).unwrap();

    assert_eq!(session.decode(&borrowing), FrameOutcome::Unhealthy(FrameError::ReservoirNotReady));
    assert!(session.decode(&frame).pcm().is_some());
    assert!(!session.is_awaiting_zero());
}

#[test]
fn verify_invalid_block_type() {
    let channel = ChannelSpec { pairs: vec![(1, -1); 20], ..Default::default() };

    let spec = FrameSpec {
        scfsi: [[false; 4]; 2],
        granules: [vec![channel.clone(), channel.clone()], vec![channel.clone(), channel]],
    };

    let mut frame = single_frame(STEREO, &spec);

    // Set window_switching_flag of the first channel of the first granule, leaving block_type 0.
    // The flag is preceded by main_data_begin, private_bits, 2 x scfsi, part2_3_length,
    // big_values, global_gain, and scalefac_compress.
    let bit = 9 + 3 + 8 + 12 + 9 + 8 + 4;
    frame.side_info[bit / 8] |= 0x80 >> (bit % 8);

    let mut session = DecoderSession::default();
    assert_eq!(
        session.decode(&frame),
        FrameOutcome::Unhealthy(FrameError::SideInfo("mp3: invalid block_type"))
    );
    assert!(session.is_awaiting_zero());
}

#[test]
fn verify_crc_mismatch() {
    let stream = generate_stream(MONO_CRC, 10, 8);

    // Flip a private bit in the side information of frame 4. Private bits do not affect decoding.
    let mut corrupt = stream.bytes.clone();
    corrupt[stream.frames[4].pos + 6 + 1] ^= 0x40;

    let outcomes = decode_all(&corrupt, DecoderOptions { verify: true, ..Default::default() });

    assert_eq!(outcomes[4], FrameOutcome::Unhealthy(FrameError::Crc));
    assert!(outcomes[..4].iter().all(|outcome| outcome.pcm().is_some()));

    // Without verification the corruption goes unnoticed.
    let clean = decode_all(&stream.bytes, Default::default());
    assert_eq!(decode_all(&corrupt, Default::default()), clean);
}

#[test]
fn verify_escape_tables() {
    // Tables 16 (1 linbit), 24 (4 linbits), and 7 over the three regions of a long block. The
    // regions hold 8, 10, and 6 pairs.
    let mut pairs = vec![(16, -15), (1, 0), (-3, 2), (15, 0), (0, 16), (2, 2), (-1, 1), (3, -16)];
    pairs.extend([(30, -15), (17, 22), (0, -30), (3, 15), (-2, 1)]);
    pairs.extend([(29, 0), (1, 1), (-15, 18), (0, 0), (2, -3)]);
    pairs.extend([(5, -4), (0, 3), (-2, 5), (4, 4), (1, -1), (0, 0)]);

    let channel =
        ChannelSpec { global_gain: 160, table_select: [16, 24, 7], pairs, ..Default::default() };

    let frame_with = |channel: &ChannelSpec| {
        let spec = FrameSpec {
            scfsi: [[false; 4]; 2],
            granules: [vec![channel.clone(), channel.clone()], vec![channel.clone(), channel.clone()]],
        };
        single_frame(STEREO, &spec)
    };

    let mut session = DecoderSession::default();

    let pcm = match session.decode(&frame_with(&channel)) {
        FrameOutcome::Healthy(pcm) => pcm,
        outcome => panic!("unexpected outcome {:?}", outcome),
    };
    assert!(pcm.samples.iter().any(|&s| s != 0));

    // The linbits of an escaped sample reach the output.
    let mut other = channel.clone();
    other.pairs[0] = (15, -15);

    session.reset();
    let other_pcm = match session.decode(&frame_with(&other)) {
        FrameOutcome::Healthy(pcm) => pcm,
        outcome => panic!("unexpected outcome {:?}", outcome),
    };
    assert_ne!(pcm.samples, other_pcm.samples);
}

#[test]
fn verify_mid_side_with_mixed_block_types() {
    let long = ChannelSpec { pairs: vec![(1, -1); 30], ..Default::default() };
    let short = ChannelSpec { block: Block::Short, pairs: vec![(0, 1); 30], ..Default::default() };

    let spec = FrameSpec {
        scfsi: [[false; 4]; 2],
        granules: [vec![long.clone(), short.clone()], vec![short, long]],
    };

    // Mid-side stereo does not care about the block types of the channels.
    let mut session = DecoderSession::default();
    assert!(session.decode(&single_frame(JOINT_STEREO_MS, &spec)).is_healthy());

    // Intensity stereo does.
    let mut session = DecoderSession::default();
    assert_eq!(
        session.decode(&single_frame(JOINT_STEREO_MS_IS, &spec)),
        FrameOutcome::Unhealthy(FrameError::MainData("mp3: stereo channel pair block_type mismatch"))
    );
}

#[test]
fn verify_equalizer() {
    let stream = generate_stream(STEREO, 8, 9);

    let flat = decode_all(&stream.bytes, Default::default());

    // Removing every band silences the output.
    let muted = Equalizer::from(&[BAND_NOT_PRESENT; EQ_BANDS][..]);
    let outcomes = decode_all(&stream.bytes, DecoderOptions { equalizer: muted, ..Default::default() });

    for (a, b) in flat.iter().zip(&outcomes) {
        assert_eq!(a.pcm().unwrap().frames(), b.pcm().unwrap().frames());
        assert!(b.pcm().unwrap().samples.iter().all(|&s| s == 0));
    }

    // Halving the scale roughly halves the output.
    let half = decode_all(&stream.bytes, DecoderOptions { scale: DEFAULT_PCM_SCALE / 2.0, ..Default::default() });

    for (a, b) in flat.iter().zip(&half) {
        for (&x, &y) in a.pcm().unwrap().samples.iter().zip(&b.pcm().unwrap().samples) {
            if x > -32768 && x < 32767 {
                assert!((i32::from(x) - 2 * i32::from(y)).abs() <= 2);
            }
        }
    }
}
