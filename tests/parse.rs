//! Parse-level behavior: header spellings, salvage sentinels.
//!
use bmff::boxes::*;
use bmff::io::{MemBuffer, Mp4Mem};
use bmff::mp4box::MP4;
use bmff::first_box;

fn push_box(out: &mut Vec<u8>, fourcc: &[u8; 4], payload: &[u8]) {
    out.extend_from_slice(&((payload.len() as u32) + 8).to_be_bytes());
    out.extend_from_slice(fourcc);
    out.extend_from_slice(payload);
}

#[test]
fn size_one_is_64_bit_extended() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&1u32.to_be_bytes());
    bytes.extend_from_slice(b"free");
    bytes.extend_from_slice(&24u64.to_be_bytes());
    bytes.extend_from_slice(&[0u8; 8]);

    let mut input = Mp4Mem::new(bytes);
    let mp4 = MP4::read(&mut input).unwrap();
    let free = first_box!(&mp4.boxes, FreeBox).expect("no free box");
    assert_eq!(free.size, 8);
}

#[test]
fn size_zero_runs_to_end_of_input() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&0u32.to_be_bytes());
    bytes.extend_from_slice(b"free");
    bytes.extend_from_slice(&[0u8; 40]);

    let mut input = Mp4Mem::new(bytes);
    let mp4 = MP4::read(&mut input).unwrap();
    assert_eq!(mp4.boxes.len(), 1);
    let free = first_box!(&mp4.boxes, FreeBox).expect("no free box");
    assert_eq!(free.size, 40);
}

#[test]
fn bad_mvhd_becomes_invalid_box_and_parsing_continues() {
    let mut bytes = Vec::new();

    // An mvhd with non-zero flags: the parser must reject it.
    let mut mvhd = Vec::new();
    mvhd.extend_from_slice(&[0x00, 0x00, 0x00, 0x01]); // version 0, flags 1
    mvhd.extend_from_slice(&[0u8; 96]);
    push_box(&mut bytes, b"mvhd", &mvhd);

    // Followed by a perfectly good sibling.
    let mut ftyp = Vec::new();
    ftyp.extend_from_slice(b"isom");
    ftyp.extend_from_slice(&0u32.to_be_bytes());
    push_box(&mut bytes, b"ftyp", &ftyp);

    let mut input = Mp4Mem::new(bytes.clone());
    let mp4 = MP4::read(&mut input).unwrap();

    assert_eq!(mp4.boxes.len(), 2);
    assert!(matches!(mp4.boxes[0], MP4Box::InvalidBox(_)));
    assert!(matches!(mp4.boxes[1], MP4Box::FileTypeBox(_)));

    // The invalid box keeps its bytes verbatim.
    let mut out = MemBuffer::new();
    mp4.write(&mut out).unwrap();
    assert_eq!(out.into_vec(), bytes);
}

#[test]
fn high_version_becomes_generic_box() {
    let mut bytes = Vec::new();
    // An stts claiming version 9.
    let mut stts = Vec::new();
    stts.extend_from_slice(&[0x09, 0x00, 0x00, 0x00]);
    stts.extend_from_slice(&0u32.to_be_bytes());
    push_box(&mut bytes, b"stts", &stts);

    let mut input = Mp4Mem::new(bytes.clone());
    let mp4 = MP4::read(&mut input).unwrap();
    assert!(matches!(mp4.boxes[0], MP4Box::GenericBox(_)));

    let mut out = MemBuffer::new();
    mp4.write(&mut out).unwrap();
    assert_eq!(out.into_vec(), bytes);
}

#[test]
fn truncated_declared_size_is_clamped() {
    let mut bytes = Vec::new();
    // A udta that claims 100 bytes but the input ends early.
    bytes.extend_from_slice(&100u32.to_be_bytes());
    bytes.extend_from_slice(b"udta");

    let mut inner = Vec::new();
    push_box(&mut inner, b"wxyz", &[1, 2, 3]);
    bytes.extend_from_slice(&inner);

    let mut input = Mp4Mem::new(bytes);
    let mp4 = MP4::read(&mut input).unwrap();
    let udta = first_box!(&mp4.boxes, UserDataBox).expect("no udta");
    assert_eq!(udta.boxes.len(), 1);
    assert!(matches!(udta.boxes[0], MP4Box::GenericBox(_)));
}

#[test]
fn loudness_box_round_trip() {
    use bmff::boxes::{LoudnessBaseSet, LoudnessMeasurement};
    use bmff::serialize::{FromBytes, ToBytes};
    use bmff::types::FourCC;

    let mut tlou = TrackLoudnessBox::new(FourCC::new("tlou"));
    tlou.loudness_base_sets.push(LoudnessBaseSet {
        eq_set_id: 1,
        downmix_id: 2,
        drc_set_id: 3,
        bs_sample_peak_level: -100,
        bs_true_peak_level: 80,
        measurement_system_for_tp: 2,
        reliability_for_tp: 3,
        measurements: vec![LoudnessMeasurement {
            method_definition: 1,
            method_value: 100,
            measurement_system: 2,
            reliability: 3,
        }],
    });

    let mut out = MemBuffer::new();
    tlou.to_bytes(&mut out).unwrap();
    let bytes = out.into_vec();

    let mut input = Mp4Mem::new(bytes);
    let parsed = TrackLoudnessBox::from_bytes(&mut input).unwrap();
    assert_eq!(parsed.loudness_base_sets.len(), 1);
    let set = &parsed.loudness_base_sets[0];
    assert_eq!(set.eq_set_id, 1);
    assert_eq!(set.bs_sample_peak_level, -100);
    assert_eq!(set.bs_true_peak_level, 80);
    assert_eq!(set.measurements.len(), 1);
    assert_eq!(set.measurements[0].method_value, 100);
}

#[test]
fn mmpu_round_trip() {
    use bmff::serialize::{FromBytes, ToBytes};
    use bmff::types::{Data, FourCC};

    let mmpu = MediaProcessingUnitBox {
        is_complete: true,
        is_adc_present: false,
        mpu_sequence_number: 42,
        asset_id_scheme: FourCC::new("uuid"),
        asset_id_value: Data(vec![1, 2, 3, 4]),
    };

    let mut out = MemBuffer::new();
    mmpu.to_bytes(&mut out).unwrap();
    let mut input = Mp4Mem::new(out.into_vec());
    let parsed = MediaProcessingUnitBox::from_bytes(&mut input).unwrap();
    assert!(parsed.is_complete);
    assert!(!parsed.is_adc_present);
    assert_eq!(parsed.mpu_sequence_number, 42);
    assert_eq!(parsed.asset_id_scheme.to_string(), "uuid");
    assert_eq!(parsed.asset_id_value.0, vec![1, 2, 3, 4]);
}

#[test]
fn specific_info_views() {
    use bmff::writer::{CodecConfig, FragmentedMp4Writer, MovieConfig, Mp4aConfig, SidxConfig, TrackConfig, WriteSample};
    use bmff::Mp4Reader;

    let mut config = MovieConfig::default();
    config.sidx = Some(SidxConfig { sap_type: 1 });
    config.iods = Some(bmff::writer::IodsConfig {
        audio_profile_level: 0x29,
        ..bmff::writer::IodsConfig::default()
    });
    let mut writer = FragmentedMp4Writer::new_memory(config).unwrap();
    let track_id = writer
        .add_track(TrackConfig::new(
            48000,
            CodecConfig::Mp4a(Mp4aConfig {
                asc: vec![0x12, 0x10],
                channel_count: 2,
                sample_rate: 48000,
                ..Mp4aConfig::default()
            }),
        ))
        .unwrap();
    for frag in 1u32..=2 {
        let mut sample = WriteSample::new(&[0u8; 8], 1024);
        sample.fragment_number = frag;
        writer.add_sample(track_id, &sample).unwrap();
    }
    let bytes = writer.into_bytes().unwrap();

    let reader = Mp4Reader::from_input(Mp4Mem::new(bytes)).unwrap();

    let dash = reader.dash_info();
    let sidx = dash.sidx.expect("no sidx info");
    assert_eq!(sidx.references.len(), 2);
    assert_eq!(dash.tfdt.len(), 2);
    assert_eq!(dash.tfdt[1].base_media_decode_time, 1024);

    let iods = reader.iods_info().expect("no iods info");
    assert_eq!(iods.audio_profile_level, 0x29);

    let mmtp = reader.mmtp_info();
    assert_eq!(mmtp.truns.len(), 2);
    assert_eq!(mmtp.truns[0].sample_count, 1);
}

#[test]
fn registry_rejects_nothing_at_startup() {
    // Building the registry (first parse) must not panic on
    // duplicates, and knows about containers.
    let spec = bmff::mp4box::registered(bmff::types::FourCC::new("moov")).unwrap();
    assert!(spec.container);
    let spec = bmff::mp4box::registered(bmff::types::FourCC::new("mvhd")).unwrap();
    assert!(!spec.container);
    assert_eq!(spec.max_version, Some(1));
    assert!(bmff::mp4box::registered(bmff::types::FourCC::new("zzzz")).is_none());
}
