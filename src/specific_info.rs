//! Aggregated views over boxes that live scattered across the tree:
//! DASH indexing, MMT metadata, loudness (DRC) data and the initial
//! object descriptor.
//!
use serde::Serialize;

use crate::boxes::ludt::LoudnessBaseSet;
use crate::boxes::*;
use crate::mp4box::MP4;
use crate::reader::Mp4Reader;
use crate::serialize::ToBytes;

/// One reference of a 'sidx' box.
#[derive(Debug, Clone, Serialize)]
pub struct SidxReferenceInfo {
    pub referenced_size:     u32,
    pub subsegment_duration: u32,
    pub starts_with_sap:     bool,
    pub sap_type:            u8,
    pub sap_delta_time:      u32,
}

/// The 'sidx' content of a stream.
#[derive(Debug, Default, Clone, Serialize)]
pub struct SidxInfo {
    pub reference_id:               u32,
    pub timescale:                  u32,
    pub earliest_presentation_time: u64,
    pub first_offset:               u64,
    pub references:                 Vec<SidxReferenceInfo>,
}

/// The decode time of one track fragment.
#[derive(Debug, Clone, Serialize)]
pub struct TfdtInfo {
    pub sequence_number:        u32,
    pub track_id:               u32,
    pub base_media_decode_time: u64,
}

/// DASH related info: segment index plus fragment decode times.
#[derive(Debug, Default, Clone, Serialize)]
pub struct DashInfo {
    pub sidx: Option<SidxInfo>,
    pub tfdt: Vec<TfdtInfo>,
}

/// MMT processing unit info.
#[derive(Debug, Clone, Serialize)]
pub struct MpuInfo {
    pub is_complete:         bool,
    pub is_adc_present:      bool,
    pub mpu_sequence_number: u32,
    pub asset_id_scheme:     String,
    pub asset_id_value:      Vec<u8>,
}

/// Per-trun statistics, for MMT payload mapping.
#[derive(Debug, Clone, Serialize)]
pub struct TrunInfo {
    pub sequence_number: u32,
    pub track_id:        u32,
    pub sample_count:    u32,
    pub data_offset:     Option<i32>,
}

/// MMT related info gathered across the tree.
#[derive(Debug, Default, Clone, Serialize)]
pub struct MmtpInfo {
    pub mpus:  Vec<MpuInfo>,
    pub truns: Vec<TrunInfo>,
}

/// Loudness info of one track.
#[derive(Debug, Default, Clone)]
pub struct TrackDrcInfo {
    pub track_id:     u32,
    /// Parsed 'tlou'/'alou' base sets from the track's 'ludt'.
    pub loudness:     Vec<LoudnessBaseSet>,
    /// Serialized 'ludt' payload, verbatim.
    pub ludt_data:    Vec<u8>,
    /// True when fragments carry 'ludt' updates.
    pub has_updates:  bool,
}

/// DRC / loudness info for all tracks.
#[derive(Debug, Default, Clone)]
pub struct DrcInfo {
    pub tracks: Vec<TrackDrcInfo>,
}

/// Fields of the initial object descriptor.
#[derive(Debug, Default, Clone, Serialize)]
pub struct IodsInfo {
    pub audio_profile_level:  u8,
    pub visual_profile_level: u8,
    pub od_profile_level:     u8,
    pub scene_profile_level:  u8,
    pub graphics_profile_level: u8,
}

fn ludt_of_track(track: &TrackBox) -> Option<&LoudnessContainerBox> {
    track
        .user_data()
        .and_then(|udta| first_box!(&udta.boxes, LoudnessContainerBox))
}

pub(crate) fn dash_info(mp4: &MP4) -> DashInfo {
    let mut info = DashInfo::default();

    if let Some(sidx) = first_box!(&mp4.boxes, SegmentIndexBox) {
        info.sidx = Some(SidxInfo {
            reference_id: sidx.reference_id,
            timescale: sidx.timescale,
            earliest_presentation_time: sidx.earliest_presentation_time.0,
            first_offset: sidx.first_offset.0,
            references: sidx
                .references
                .iter()
                .map(|r| SidxReferenceInfo {
                    referenced_size:     r.referenced_size,
                    subsegment_duration: r.subsegment_duration,
                    starts_with_sap:     r.starts_with_sap,
                    sap_type:            r.sap_type,
                    sap_delta_time:      r.sap_delta_time,
                })
                .collect(),
        });
    }

    for moof in iter_box!(mp4.boxes, MovieFragmentBox) {
        let seq = moof.sequence_number();
        for traf in moof.track_fragments() {
            let track_id = traf.track_fragment_header().map(|h| h.track_id).unwrap_or(0);
            if let Some(tfdt) = traf.track_fragment_decode_time() {
                info.tfdt.push(TfdtInfo {
                    sequence_number:        seq,
                    track_id,
                    base_media_decode_time: tfdt.base_media_decode_time,
                });
            }
        }
    }

    info
}

pub(crate) fn mmtp_info(mp4: &MP4) -> MmtpInfo {
    let mut info = MmtpInfo::default();

    for mmpu in iter_box!(mp4.boxes, MediaProcessingUnitBox) {
        info.mpus.push(MpuInfo {
            is_complete:         mmpu.is_complete,
            is_adc_present:      mmpu.is_adc_present,
            mpu_sequence_number: mmpu.mpu_sequence_number,
            asset_id_scheme:     mmpu.asset_id_scheme.to_string(),
            asset_id_value:      mmpu.asset_id_value.0.clone(),
        });
    }

    for moof in iter_box!(mp4.boxes, MovieFragmentBox) {
        let seq = moof.sequence_number();
        for traf in moof.track_fragments() {
            let track_id = traf.track_fragment_header().map(|h| h.track_id).unwrap_or(0);
            for trun in traf.track_run_boxes() {
                info.truns.push(TrunInfo {
                    sequence_number: seq,
                    track_id,
                    sample_count:    trun.entries.len() as u32,
                    data_offset:     trun.data_offset,
                });
            }
        }
    }

    info
}

pub(crate) fn drc_info(mp4: &MP4) -> DrcInfo {
    let mut info = DrcInfo::default();

    let movie = match mp4.movie_opt() {
        Some(movie) => movie,
        None => return info,
    };

    // 'ludt' updates inside fragments.
    let mut update_ids = Vec::new();
    for moof in iter_box!(mp4.boxes, MovieFragmentBox) {
        for traf in moof.track_fragments() {
            if first_box!(&traf.boxes, LoudnessContainerBox).is_some() {
                if let Some(tfhd) = traf.track_fragment_header() {
                    update_ids.push(tfhd.track_id);
                }
            }
        }
    }

    for track in movie.tracks() {
        let track_id = track.track_id();
        let mut track_info = TrackDrcInfo {
            track_id,
            has_updates: update_ids.contains(&track_id),
            ..TrackDrcInfo::default()
        };
        if let Some(ludt) = ludt_of_track(track) {
            for lb in ludt.loudness_bases() {
                track_info.loudness.extend(lb.loudness_base_sets.iter().cloned());
            }
            let mut buf = crate::io::MemBuffer::new();
            if ludt.clone().to_mp4box().to_bytes(&mut buf).is_ok() {
                track_info.ludt_data = buf.into_vec();
            }
        }
        if !track_info.loudness.is_empty() || track_info.has_updates {
            info.tracks.push(track_info);
        }
    }

    info
}

pub(crate) fn iods_info(mp4: &MP4) -> Option<IodsInfo> {
    let movie = mp4.movie_opt()?;
    let iods = first_box!(&movie.boxes, InitialObjectDescriptionBox)?;
    Some(IodsInfo {
        audio_profile_level:  iods.audio_profile_level,
        visual_profile_level: iods.visual_profile_level,
        od_profile_level:     iods.od_profile_level,
        scene_profile_level:  iods.scene_profile_level,
        graphics_profile_level: iods.graphics_profile_level,
    })
}

impl Mp4Reader {
    /// DASH view: the 'sidx' references and all fragment decode times.
    pub fn dash_info(&self) -> DashInfo {
        dash_info(self.mp4())
    }

    /// MMT view: 'mmpu' boxes and per-fragment run info.
    pub fn mmtp_info(&self) -> MmtpInfo {
        mmtp_info(self.mp4())
    }

    /// Loudness view: 'ludt' data per track, global and fragmented.
    pub fn drc_info(&self) -> DrcInfo {
        drc_info(self.mp4())
    }

    /// The initial object descriptor, when the movie carries one.
    pub fn iods_info(&self) -> Option<IodsInfo> {
        iods_info(self.mp4())
    }
}
