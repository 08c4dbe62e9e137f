//! General information about the movie and its tracks.
//!
use std::fmt::{self, Debug, Display};

use serde::{Serialize, Serializer};

use crate::boxes::*;
use crate::mp4box::MP4;
use crate::sample_info::track_sample_stats;
use crate::types::*;

/// The handler class of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackType {
    Audio,
    Video,
    Hint,
    Undefined,
}

impl Default for TrackType {
    fn default() -> TrackType {
        TrackType::Undefined
    }
}

impl From<FourCC> for TrackType {
    fn from(handler_type: FourCC) -> TrackType {
        match &handler_type.to_be_bytes() {
            b"soun" => TrackType::Audio,
            b"vide" => TrackType::Video,
            b"hint" => TrackType::Hint,
            _ => TrackType::Undefined,
        }
    }
}

impl Display for TrackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrackType::Audio => "audio",
            TrackType::Video => "video",
            TrackType::Hint => "hint",
            TrackType::Undefined => "undefined",
        };
        write!(f, "{}", s)
    }
}

/// The codec family of a track, derived from the coding name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Codec {
    Mp4a,
    MpeghMha,
    MpeghMhm,
    Avc,
    Hevc,
    Jxs,
    Vvc,
    Undefined,
}

impl Default for Codec {
    fn default() -> Codec {
        Codec::Undefined
    }
}

impl From<FourCC> for Codec {
    fn from(coding_name: FourCC) -> Codec {
        match &coding_name.to_be_bytes() {
            b"mp4a" => Codec::Mp4a,
            b"mha1" | b"mha2" => Codec::MpeghMha,
            b"mhm1" | b"mhm2" => Codec::MpeghMhm,
            b"avc1" | b"avc3" => Codec::Avc,
            b"hvc1" | b"hev1" => Codec::Hevc,
            b"jxsm" => Codec::Jxs,
            b"vvc1" | b"vvi1" => Codec::Vvc,
            _ => Codec::Undefined,
        }
    }
}

/// One edit of a track's edit list.
#[derive(Debug, Default, Clone, Serialize)]
pub struct EditInfo {
    pub segment_duration: u64,
    pub media_time:       i64,
    pub media_rate:       u16,
}

/// General movie information.
#[derive(Debug, Default, Serialize)]
pub struct MovieInfo {
    #[serde(serialize_with = "display")]
    pub major_brand:       FourCC,
    pub compatible_brands: Vec<String>,
    pub creation_time:     i64,
    pub modification_time: i64,
    pub timescale:         u32,
    pub duration:          u64,
    pub track_count:       u32,
    #[serde(skip)]
    pub user_data:         Vec<MP4Box>,
}

/// General track information.
#[derive(Debug, Default, Serialize)]
pub struct TrackInfo {
    pub track_id:        u32,
    pub track_type:      TrackType,
    #[serde(serialize_with = "display")]
    pub coding_name:     FourCC,
    pub codec:           Codec,
    pub media_timescale: u32,
    pub media_duration:  u64,
    #[serde(serialize_with = "display")]
    pub language:        IsoLanguageCode,
    pub sample_count:    u64,
    pub max_sample_size: u64,
    pub total_size:      u64,
    pub edit_list:       Vec<EditInfo>,
    #[serde(skip)]
    pub user_data:       Vec<MP4Box>,
}

/// Extract general movie information.
pub fn movie_info(mp4: &MP4) -> MovieInfo {
    let mut info = MovieInfo::default();

    if let Some(ftyp) = first_box!(&mp4.boxes, FileTypeBox) {
        info.major_brand = ftyp.major_brand;
        info.compatible_brands = ftyp.compatible_brands.iter().map(|b| b.to_string()).collect();
    }

    let movie = match mp4.movie_opt() {
        Some(movie) => movie,
        None => return info,
    };
    let mvhd = movie.movie_header();
    info.creation_time = mvhd.cr_time.to_unixtime();
    info.modification_time = mvhd.mod_time.to_unixtime();
    info.timescale = mvhd.timescale;
    info.duration = mvhd.duration.0;
    info.track_count = movie.tracks().len() as u32;
    if let Some(udta) = first_box!(&movie.boxes, UserDataBox) {
        info.user_data = udta.boxes.clone();
    }

    info
}

/// Extract general track information for all tracks in the movie.
pub fn track_info(mp4: &MP4) -> Vec<TrackInfo> {
    let movie = match mp4.movie_opt() {
        Some(movie) => movie,
        None => return Vec::new(),
    };

    let mut v = Vec::new();

    for track in &movie.tracks() {
        let mut info = TrackInfo::default();

        info.track_id = track.track_header().track_id;

        let mdia = track.media();
        let mdhd = mdia.media_header();
        info.media_timescale = mdhd.timescale;
        info.media_duration = mdhd.duration.0;
        info.language = mdhd.language;
        info.track_type = TrackType::from(mdia.handler().handler_type);

        let stbl = mdia.media_info().sample_table();
        if let Some(coding_name) = stbl.sample_description().coding_name() {
            info.coding_name = coding_name;
            info.codec = Codec::from(coding_name);
        }

        let stats = track_sample_stats(track);
        info.sample_count = stats.sample_count;
        info.max_sample_size = stats.max_sample_size as u64;
        info.total_size = stats.total_size;
        if info.media_duration == 0 {
            // A zero mdhd duration happens in fragmented files; fall
            // back to the summed sample durations.
            info.media_duration = stats.total_duration;
        }

        if let Some(elst) = track.edit_list() {
            info.edit_list = elst
                .entries
                .iter()
                .map(|e| EditInfo {
                    segment_duration: e.segment_duration,
                    media_time:       e.media_time,
                    media_rate:       e.media_rate,
                })
                .collect();
        }

        if let Some(udta) = track.user_data() {
            info.user_data = udta.boxes.clone();
        }

        v.push(info)
    }

    v
}

// Serialize helper.
fn display<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Display,
    S: Serializer,
{
    serializer.collect_str(value)
}
