//! End-to-end write/read scenarios.
//!
use bmff::boxes::*;
use bmff::io::{MemBuffer, Mp4Mem};
use bmff::mp4box::{FullBox, MP4};
use bmff::sample_info::SampleGroupInfo;
use bmff::writer::{
    AvcConfig, CodecConfig, FragmentedMp4Writer, FragmentedSegmentWriter, MovieConfig, Mp4Writer,
    Mp4aConfig, SidxConfig, TrackConfig, VideoParams, WriteSample,
};
use bmff::{first_box, iter_box, Mp4Reader};

fn aac_track_config() -> TrackConfig {
    TrackConfig::new(
        48000,
        CodecConfig::Mp4a(Mp4aConfig {
            asc: vec![0x12, 0x10],
            channel_count: 2,
            sample_rate: 48000,
            ..Mp4aConfig::default()
        }),
    )
}

// A minimal but well-formed AVCDecoderConfigurationRecord.
fn avc_record() -> Vec<u8> {
    vec![0x01, 0x64, 0x00, 0x1f, 0xff, 0xe0, 0x00]
}

fn avc_track_config(timescale: u32) -> TrackConfig {
    TrackConfig::new(
        timescale,
        CodecConfig::Avc(AvcConfig {
            video: VideoParams {
                width: 320,
                height: 240,
                ..VideoParams::default()
            },
            config_record: avc_record(),
            ..AvcConfig::default()
        }),
    )
}

#[test]
fn one_audio_sample_round_trip() {
    let mut writer = Mp4Writer::new(MovieConfig::default());
    let track_id = writer.add_track(aac_track_config()).unwrap();
    writer
        .add_sample(track_id, &WriteSample::new(&[0xde, 0xad, 0xbe, 0xef], 1024))
        .unwrap();
    let bytes = writer.into_bytes().unwrap();

    let reader = Mp4Reader::from_input(Mp4Mem::new(bytes)).unwrap();
    assert_eq!(reader.track_count(), 1);

    let infos = reader.track_infos();
    assert_eq!(infos.len(), 1);
    assert_eq!(infos[0].sample_count, 1);
    assert_eq!(infos[0].max_sample_size, 4);
    assert_eq!(infos[0].media_timescale, 48000);
    assert_eq!(infos[0].media_duration, 1024);

    let movie = reader.movie_info();
    assert_eq!(movie.major_brand.to_string(), "isom");
    assert_eq!(movie.timescale, 600);
    // 1024 ticks at 48 kHz projected into the 600 Hz movie timescale.
    assert_eq!(movie.duration, 1024 * 600 / 48000);

    let mut track = reader.audio_track(0).unwrap();
    assert_eq!(track.channel_count(), 2);
    let mut buf = Vec::new();
    let sample = track.next_sample(&mut buf).unwrap();
    assert_eq!(sample.bytes, &[0xde, 0xad, 0xbe, 0xef]);
    assert_eq!(sample.duration, 1024);
    assert!(sample.is_sync);
    assert_eq!(sample.fragment_number, 0);

    // Past the end: empty sample, no error.
    let empty = track.next_sample(&mut buf).unwrap();
    assert!(empty.bytes.is_empty());
}

#[test]
fn parse_serialize_parse_is_identity() {
    let mut writer = Mp4Writer::new(MovieConfig::default());
    let track_id = writer.add_track(aac_track_config()).unwrap();
    for i in 0..10u8 {
        writer
            .add_sample(track_id, &WriteSample::new(&[i; 100], 1024))
            .unwrap();
    }
    let bytes = writer.into_bytes().unwrap();

    let mut input = Mp4Mem::new(bytes.clone());
    let mp4 = MP4::read(&mut input).unwrap();

    // Re-serializing each box yields exactly box.size() bytes, and the
    // whole tree reproduces the input.
    let mut out = MemBuffer::new();
    mp4.write(&mut out).unwrap();
    let bytes2 = out.into_vec();
    assert_eq!(bytes, bytes2);

    for b in &mp4.boxes {
        let mut out = MemBuffer::new();
        use bmff::serialize::ToBytes;
        b.to_bytes(&mut out).unwrap();
        assert_eq!(out.into_vec().len() as u64, b.size());
        // Size recomputation is idempotent.
        assert_eq!(b.size(), b.size());
    }
}

#[test]
fn ctts_goes_version_1_for_negative_offsets() {
    let mut writer = Mp4Writer::new(MovieConfig::default());
    let track_id = writer.add_track(avc_track_config(3000)).unwrap();
    for &cts in &[33i32, 0, -33] {
        let mut sample = WriteSample::new(&[0x00, 0x00, 0x00, 0x01, 0xab], 100);
        sample.cts_offset = cts;
        sample.is_sync = cts == 33;
        writer.add_sample(track_id, &sample).unwrap();
    }
    let bytes = writer.into_bytes().unwrap();

    let mut input = Mp4Mem::new(bytes);
    let mp4 = MP4::read(&mut input).unwrap();
    let movie = mp4.movie();
    let stbl = movie.tracks()[0].media().media_info().sample_table();
    let ctts = stbl.composition_time_to_sample().expect("no ctts box");
    assert_eq!(ctts.version(), Some(1));
    assert_eq!(ctts.entries.len(), 3);
    assert!(ctts.entries.iter().all(|e| e.count == 1));

    // Read-side view matches.
    let reader = Mp4Reader::from_input(Mp4Mem::new({
        let mut out = MemBuffer::new();
        mp4.write(&mut out).unwrap();
        out.into_vec()
    }))
    .unwrap();
    let mut track = reader.avc_track(0).unwrap();
    let mut buf = Vec::new();
    let offsets: Vec<i32> = (0..3)
        .map(|_| track.next_sample(&mut buf).unwrap().cts_offset)
        .collect();
    assert_eq!(offsets, vec![33, 0, -33]);
}

#[test]
fn absent_ctts_and_stss_defaults() {
    let mut writer = Mp4Writer::new(MovieConfig::default());
    let track_id = writer.add_track(aac_track_config()).unwrap();
    for _ in 0..4 {
        writer
            .add_sample(track_id, &WriteSample::new(&[1, 2, 3], 1024))
            .unwrap();
    }
    let bytes = writer.into_bytes().unwrap();

    let mut input = Mp4Mem::new(bytes.clone());
    let mp4 = MP4::read(&mut input).unwrap();
    let stbl = mp4.movie().tracks()[0].media().media_info().sample_table();
    // All-sync, all-zero-cts: both tables are omitted...
    assert!(stbl.sync_samples().is_none());
    assert!(stbl.composition_time_to_sample().is_none());
    // ...and constant sizes collapse the stsz table.
    let stsz = stbl.sample_size().unwrap();
    assert_eq!(stsz.size, 3);
    assert_eq!(stsz.count, 4);

    // ...and the read side exposes the defaults.
    let reader = Mp4Reader::from_input(Mp4Mem::new(bytes)).unwrap();
    let mut track = reader.track(0).unwrap();
    let mut buf = Vec::new();
    for _ in 0..4 {
        let sample = track.next_sample(&mut buf).unwrap();
        assert!(sample.is_sync);
        assert_eq!(sample.cts_offset, 0);
    }
}

#[test]
fn fragmented_two_fragments() {
    let mut writer = FragmentedMp4Writer::new_memory(MovieConfig::default()).unwrap();
    let track_id = writer.add_track(aac_track_config()).unwrap();
    for (i, frag) in [1u32, 1, 2, 2].iter().enumerate() {
        let bytes = [i as u8; 8];
        let mut sample = WriteSample::new(&bytes, 1024);
        sample.fragment_number = *frag;
        writer.add_sample(track_id, &sample).unwrap();
    }
    let bytes = writer.into_bytes().unwrap();

    // Exactly two moof+mdat pairs after the init fragment.
    let mut input = Mp4Mem::new(bytes.clone());
    let mp4 = MP4::read_skip_mdat(&mut input).unwrap();
    let moofs: Vec<_> = iter_box!(mp4.boxes, MovieFragmentBox).collect();
    assert_eq!(moofs.len(), 2);
    assert_eq!(moofs[0].sequence_number(), 1);
    assert_eq!(moofs[1].sequence_number(), 2);

    // The second fragment starts at decode time 2048.
    let traf = &moofs[1].track_fragments()[0];
    let tfdt = traf.track_fragment_decode_time().unwrap();
    assert_eq!(tfdt.base_media_decode_time, 2048);

    // trun data offsets point just past each moof's mdat header.
    for moof in &moofs {
        let moof_size = MP4Box::MovieFragmentBox((*moof).clone()).size();
        for traf in moof.track_fragments() {
            for trun in traf.track_run_boxes() {
                assert_eq!(trun.data_offset, Some((moof_size + 8) as i32));
            }
        }
    }

    // Reading back: payloads, fragment numbers, monotone decode times.
    let reader = Mp4Reader::from_input(Mp4Mem::new(bytes)).unwrap();
    let mut track = reader.track(0).unwrap();
    assert_eq!(track.sample_count(), 4);
    let mut buf = Vec::new();
    let mut fragments = Vec::new();
    for i in 0..4 {
        let sample = track.next_sample(&mut buf).unwrap();
        assert_eq!(sample.bytes, &[i as u8; 8]);
        assert_eq!(sample.duration, 1024);
        fragments.push(sample.fragment_number);
    }
    assert_eq!(fragments, vec![1, 1, 2, 2]);
}

#[test]
fn sidx_references_cover_all_fragments() {
    let mut config = MovieConfig::default();
    config.sidx = Some(SidxConfig { sap_type: 1 });
    let mut writer = FragmentedMp4Writer::new_memory(config).unwrap();
    let track_id = writer.add_track(aac_track_config()).unwrap();
    for frag in 1u32..=3 {
        for _ in 0..2 {
            let data = [frag as u8; 16];
            let mut sample = WriteSample::new(&data, 1024);
            sample.fragment_number = frag;
            writer.add_sample(track_id, &sample).unwrap();
        }
    }
    let bytes = writer.into_bytes().unwrap();

    let mut input = Mp4Mem::new(bytes);
    let mp4 = MP4::read_skip_mdat(&mut input).unwrap();

    // One sidx, positioned between the moov and the first moof.
    let positions: Vec<&str> = mp4
        .boxes
        .iter()
        .map(|b| match b {
            MP4Box::FileTypeBox(_) => "ftyp",
            MP4Box::MovieBox(_) => "moov",
            MP4Box::SegmentIndexBox(_) => "sidx",
            MP4Box::MovieFragmentBox(_) => "moof",
            MP4Box::MediaDataBox(_) => "mdat",
            _ => "?",
        })
        .collect();
    assert_eq!(
        positions,
        vec!["ftyp", "moov", "sidx", "moof", "mdat", "moof", "mdat", "moof", "mdat"]
    );

    let sidx = first_box!(&mp4.boxes, SegmentIndexBox).unwrap();
    assert_eq!(sidx.references.len(), 3);
    assert_eq!(sidx.timescale, 48000);

    // The reference sizes cover the whole media section.
    let media_bytes: u64 = mp4
        .boxes
        .iter()
        .filter(|b| {
            matches!(b, MP4Box::MovieFragmentBox(_)) || matches!(b, MP4Box::MediaDataBox(_))
        })
        .map(|b| b.size())
        .sum();
    let referenced: u64 = sidx.references.iter().map(|r| r.referenced_size as u64).sum();
    assert_eq!(referenced, media_bytes);

    // And the subsegment durations span the whole timeline.
    let total: u64 = sidx
        .references
        .iter()
        .map(|r| r.subsegment_duration as u64)
        .sum();
    assert_eq!(total, 6 * 1024);
    assert!(sidx.references.iter().all(|r| r.starts_with_sap));
    assert!(sidx.references.iter().all(|r| r.sap_type == 1));
}

#[test]
fn last_segment_gets_lmsg_brand() {
    let mut writer = FragmentedSegmentWriter::new(MovieConfig::default()).unwrap();
    let track_id = writer.add_track(aac_track_config()).unwrap();

    let mut init = MemBuffer::new();
    writer.write_init_segment(&mut init).unwrap();
    let mut input = Mp4Mem::new(init.into_vec());
    let init_mp4 = MP4::read(&mut input).unwrap();
    assert!(first_box!(&init_mp4.boxes, MovieBox).is_some());
    let mvex = first_box!(&init_mp4.boxes, MovieBox / MovieExtendsBox);
    assert!(mvex.is_some());

    let mut segments = Vec::new();
    for frag in 1u32..=2 {
        let mut sample = WriteSample::new(&[0u8; 32], 1024);
        sample.fragment_number = frag;
        writer.add_sample(track_id, &sample).unwrap();

        let mut out = MemBuffer::new();
        writer.write_media_segment(&mut out, frag == 2).unwrap();
        segments.push(out.into_vec());
    }

    for (idx, segment) in segments.iter().enumerate() {
        let mut input = Mp4Mem::new(segment.clone());
        let mp4 = MP4::read(&mut input).unwrap();
        let styp = first_box!(&mp4.boxes, SegmentTypeBox).expect("no styp");
        let has_lmsg = styp.compatible_brands.last().map(|b| b.to_string()) == Some("lmsg".to_string());
        assert_eq!(has_lmsg, idx == 1, "segment {}", idx);
        assert!(first_box!(&mp4.boxes, MovieFragmentBox).is_some());
    }
}

#[test]
fn chunk_offsets_promote_to_co64() {
    // The box-level law: offsets above 2^32 switch the table to the
    // 64-bit spelling and survive a round trip.
    use bmff::serialize::{FromBytes, ToBytes};

    let mut stco = ChunkOffsetBox::new();
    stco.entries.push(0x1_0000_0000u64);
    stco.check_sizes();
    assert!(stco.is_large());

    let mut out = MemBuffer::new();
    stco.to_bytes(&mut out).unwrap();
    let bytes = out.into_vec();
    assert_eq!(&bytes[4..8], b"co64");

    let mut input = Mp4Mem::new(bytes);
    let parsed = ChunkOffsetBox::from_bytes(&mut input).unwrap();
    assert_eq!(parsed.entries[0], 0x1_0000_0000u64);
}

#[test]
fn sample_groups_survive_round_trip() {
    let mut writer = Mp4Writer::new(MovieConfig::default());
    let track_id = writer.add_track(aac_track_config()).unwrap();
    for i in 0..3 {
        let mut sample = WriteSample::new(&[9u8; 4], 1024);
        if i == 0 {
            sample.group = SampleGroupInfo::Preroll(-1);
        }
        writer.add_sample(track_id, &sample).unwrap();
    }
    let bytes = writer.into_bytes().unwrap();

    let reader = Mp4Reader::from_input(Mp4Mem::new(bytes)).unwrap();
    let mut track = reader.track(0).unwrap();
    let mut buf = Vec::new();
    let first = track.next_sample(&mut buf).unwrap();
    assert_eq!(first.group, SampleGroupInfo::Preroll(-1));
    let second = track.next_sample(&mut buf).unwrap();
    assert_eq!(second.group, SampleGroupInfo::None);
}

#[test]
fn unknown_box_is_kept_verbatim() {
    // A file with a box we do not know: wide open passthrough.
    let mut writer = Mp4Writer::new(MovieConfig::default());
    let track_id = writer.add_track(aac_track_config()).unwrap();
    writer
        .add_sample(track_id, &WriteSample::new(&[1], 10))
        .unwrap();
    let mut bytes = writer.into_bytes().unwrap();

    // Append an unknown top-level box.
    let unknown = [0x00, 0x00, 0x00, 0x0c, b'w', b'e', b'i', b'r', 1, 2, 3, 4];
    bytes.extend_from_slice(&unknown);

    let mut input = Mp4Mem::new(bytes.clone());
    let mp4 = MP4::read(&mut input).unwrap();
    let last = mp4.boxes.last().unwrap();
    assert!(matches!(last, MP4Box::GenericBox(_)));

    let mut out = MemBuffer::new();
    mp4.write(&mut out).unwrap();
    assert_eq!(out.into_vec(), bytes);
}
