//
// ISO/IEC 14496-12:2015(E) Amd.2, loudness boxes.
//
use std::io;

use crate::boxes::prelude::*;

def_box! {
    /// Track loudness container ('ludt').
    #[derive(Default)]
    LoudnessContainerBox {
        boxes:      Vec<MP4Box>,
    },
    fourcc => "ludt",
    version => [],
    impls => [ basebox, boxinfo, debug, fromtobytes ],
}

impl LoudnessContainerBox {
    /// All loudness base boxes ('tlou' and 'alou') in this container.
    pub fn loudness_bases(&self) -> Vec<&TrackLoudnessBox> {
        let mut v: Vec<&TrackLoudnessBox> = iter_box!(self.boxes, TrackLoudnessBox).collect();
        v.extend(iter_box!(self.boxes, AudioLoudnessBox));
        v
    }
}

/// TrackLoudnessBox ('tlou') / AudioLoudnessBox ('alou').
///
/// One or more loudness base sets, each with measurement entries.
#[derive(Clone, Debug, Default)]
pub struct TrackLoudnessBox {
    fourcc:               FourCC,
    pub loudness_base_sets: Vec<LoudnessBaseSet>,
}
pub type AudioLoudnessBox = TrackLoudnessBox;

impl TrackLoudnessBox {
    /// A 'tlou' or 'alou' box, depending on the fourcc given.
    pub fn new(fourcc: FourCC) -> TrackLoudnessBox {
        TrackLoudnessBox {
            fourcc,
            loudness_base_sets: Vec::new(),
        }
    }
}

/// One loudness base of a loudness box.
#[derive(Clone, Debug, Default)]
pub struct LoudnessBaseSet {
    pub eq_set_id:               u8,
    pub downmix_id:              u8,
    pub drc_set_id:              u8,
    pub bs_sample_peak_level:    i16,
    pub bs_true_peak_level:      i16,
    pub measurement_system_for_tp: u8,
    pub reliability_for_tp:      u8,
    pub measurements:            Vec<LoudnessMeasurement>,
}

def_struct! {
    /// One measurement of a loudness base set.
    #[derive(Default)]
    LoudnessMeasurement,
        method_definition:  u8,
        method_value:       u8,
        measurement_system: u8,
        reliability:        u8,
}

impl TrackLoudnessBox {
    fn parse_base_set<R: ReadBytes>(stream: &mut R) -> io::Result<LoudnessBaseSet> {
        // 3 + 3 + 6 bits.
        let b = u16::from_bytes(stream)? as u32;
        let eq_set_id = ((b >> 9) & 0x07) as u8;
        let downmix_id = ((b >> 6) & 0x07) as u8;
        let drc_set_id = (b & 0x3f) as u8;

        // Two packed 12-bit signed peak levels in 3 bytes.
        let b0 = u8::from_bytes(stream)? as u32;
        let b1 = u8::from_bytes(stream)? as u32;
        let b2 = u8::from_bytes(stream)? as u32;
        let packed = (b0 << 16) | (b1 << 8) | b2;
        let bs_sample_peak_level = sign_extend_12((packed >> 12) as u16);
        let bs_true_peak_level = sign_extend_12((packed & 0xfff) as u16);
        // measurement_system_for_tp (4) + reliability_for_tp (4).
        let b = u8::from_bytes(stream)?;
        let measurement_system_for_tp = b >> 4;
        let reliability_for_tp = b & 0x0f;

        let measurement_count = u8::from_bytes(stream)?;
        let mut measurements = Vec::new();
        for _ in 0..measurement_count {
            measurements.push(LoudnessMeasurement::from_bytes(stream)?);
        }

        Ok(LoudnessBaseSet {
            eq_set_id,
            downmix_id,
            drc_set_id,
            bs_sample_peak_level,
            bs_true_peak_level,
            measurement_system_for_tp,
            reliability_for_tp,
            measurements,
        })
    }

    fn write_base_set<W: WriteBytes>(set: &LoudnessBaseSet, stream: &mut W) -> io::Result<()> {
        let b = (((set.eq_set_id & 0x07) as u16) << 9)
            | (((set.downmix_id & 0x07) as u16) << 6)
            | ((set.drc_set_id & 0x3f) as u16);
        b.to_bytes(stream)?;

        let peaks = (((set.bs_sample_peak_level as u32) & 0xfff) << 12)
            | ((set.bs_true_peak_level as u32) & 0xfff);
        ((peaks >> 16) as u8).to_bytes(stream)?;
        ((peaks >> 8) as u8).to_bytes(stream)?;
        (peaks as u8).to_bytes(stream)?;

        let b = (set.measurement_system_for_tp << 4) | (set.reliability_for_tp & 0x0f);
        b.to_bytes(stream)?;

        (set.measurements.len() as u8).to_bytes(stream)?;
        for m in &set.measurements {
            m.to_bytes(stream)?;
        }
        Ok(())
    }
}

fn sign_extend_12(v: u16) -> i16 {
    if v & 0x800 > 0 {
        (v | 0xf000) as i16
    } else {
        v as i16
    }
}

impl FromBytes for TrackLoudnessBox {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<TrackLoudnessBox> {
        let mut reader = BoxReader::new(stream)?;
        let fourcc = reader.header.fourcc;
        let stream = &mut reader;

        let mut loudness_base_sets = Vec::new();
        if stream.version() == 0 {
            loudness_base_sets.push(TrackLoudnessBox::parse_base_set(stream)?);
        } else {
            let b = u8::from_bytes(stream)?;
            let count = b & 0x3f;
            for _ in 0..count {
                loudness_base_sets.push(TrackLoudnessBox::parse_base_set(stream)?);
            }
        }

        Ok(TrackLoudnessBox {
            fourcc,
            loudness_base_sets,
        })
    }

    fn min_size() -> usize {
        8
    }
}

impl ToBytes for TrackLoudnessBox {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        let mut writer = BoxWriter::new(stream, self)?;
        let stream = &mut writer;

        if self.loudness_base_sets.len() != 1 {
            (self.loudness_base_sets.len() as u8 & 0x3f).to_bytes(stream)?;
        }
        for set in &self.loudness_base_sets {
            TrackLoudnessBox::write_base_set(set, stream)?;
        }

        stream.finalize()
    }
}

impl BoxInfo for TrackLoudnessBox {
    const FOURCC: &'static str = "tlou";

    #[inline]
    fn fourcc(&self) -> FourCC {
        if self.fourcc == FourCC::default() {
            FourCC::new("tlou")
        } else {
            self.fourcc
        }
    }
    #[inline]
    fn max_version() -> Option<u8> {
        Some(1)
    }
}

impl FullBox for TrackLoudnessBox {
    fn version(&self) -> Option<u8> {
        if self.loudness_base_sets.len() == 1 {
            Some(0)
        } else {
            Some(1)
        }
    }
}
