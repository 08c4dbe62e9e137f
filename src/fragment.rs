//! Decode movie fragments into per-track sample lists.
//!
//! The `moof`/`traf`/`trun` run tables are fused into the same
//! [`SampleInfo`](crate::sample_info::SampleInfo) records the plain
//! sample tables produce, with the fragment sequence number attached.
//!
use std::io;

use crate::boxes::*;
use crate::mp4box::MP4;
use crate::sample_info::{SampleGroupInfo, SampleInfo};
use crate::types::SampleFlags;

// The sample fields of one trun entry after applying the
// tfhd / trex default chain.
fn resolve_entry(
    entry: &crate::boxes::trun::TrackRunEntry,
    is_first: bool,
    first_sample_flags: Option<&SampleFlags>,
    tfhd: &TrackFragmentHeaderBox,
    trex: Option<&TrackExtendsBox>,
) -> (u32, u32, bool, i32) {
    let duration = entry
        .sample_duration
        .or(tfhd.default_sample_duration)
        .or_else(|| trex.map(|t| t.default_sample_duration))
        .unwrap_or(0);
    let size = entry
        .sample_size
        .or(tfhd.default_sample_size)
        .or_else(|| trex.map(|t| t.default_sample_size))
        .unwrap_or(0);
    let flags = if is_first && first_sample_flags.is_some() {
        first_sample_flags.cloned()
    } else {
        entry
            .sample_flags
            .clone()
            .or_else(|| tfhd.default_sample_flags.clone())
            .or_else(|| trex.map(|t| t.default_sample_flags.clone()))
    };
    let is_sync = flags.map(|f| f.is_sync()).unwrap_or(true);
    let cts = entry.sample_composition_time_offset.unwrap_or(0);
    (duration, size, is_sync, cts)
}

// Group lookup for one sample in a fragment: fragment-local sgpd
// first (index base 0x10001), track sgpd otherwise.
fn fragment_group(
    index: u32,
    traf: &TrackFragmentBox,
    stbl_sgpd: &[&SampleGroupDescriptionBox],
    grouping_type: crate::types::FourCC,
) -> SampleGroupInfo {
    if index == 0 {
        return SampleGroupInfo::None;
    }
    if index > 0x10000 {
        let idx = (index - 0x10001) as usize;
        for sgpd in iter_box!(traf.boxes, SampleGroupDescriptionBox) {
            if sgpd.grouping_type == grouping_type {
                if let Some(item) = sgpd.entries.iter().nth(idx) {
                    return SampleGroupInfo::from_description(&item.entry);
                }
            }
        }
        return SampleGroupInfo::None;
    }
    let idx = (index - 1) as usize;
    for sgpd in stbl_sgpd {
        if sgpd.grouping_type == grouping_type {
            if let Some(item) = sgpd.entries.iter().nth(idx) {
                return SampleGroupInfo::from_description(&item.entry);
            }
        }
    }
    SampleGroupInfo::None
}

/// Decode all movie fragments of `track_id` into a sample list.
///
/// `base_media_decode_time` must be monotone non-decreasing across
/// fragments; a violation is an error.
pub fn fragment_samples(mp4: &MP4, track_id: u32) -> io::Result<Vec<SampleInfo>> {
    let mut samples = Vec::new();

    let movie = mp4.movie_opt();
    let trex = movie.and_then(|m| m.track_extends_by_id(track_id));
    let stbl_sgpd: Vec<&SampleGroupDescriptionBox> = movie
        .and_then(|m| m.track_by_id(track_id))
        .map(|t| t.media().media_info().sample_table().sample_group_descriptions())
        .unwrap_or_default();

    let mut prev_bmdt = 0u64;
    let mut prev_end = 0u64;

    for moof in iter_box!(mp4.boxes, MovieFragmentBox) {
        let seq = moof.sequence_number();

        for traf in moof.track_fragments() {
            let tfhd = match traf.track_fragment_header() {
                Some(tfhd) if tfhd.track_id == track_id => tfhd,
                _ => continue,
            };

            let bmdt = traf
                .track_fragment_decode_time()
                .map(|tfdt| tfdt.base_media_decode_time)
                .unwrap_or(prev_end);
            if bmdt < prev_bmdt {
                return Err(ioerr!(
                    InvalidData,
                    "moof {}: track {}: base_media_decode_time goes backwards",
                    seq,
                    track_id
                ));
            }
            prev_bmdt = bmdt;
            let mut decode_time = bmdt;

            // Where the sample data of the next run starts when the
            // trun carries no data_offset of its own.
            let base = if tfhd.default_base_is_moof || tfhd.base_data_offset.is_none() {
                moof.offset
            } else {
                tfhd.base_data_offset.unwrap_or(0)
            };
            let mut next_fpos = base;

            // The sbgp boxes in this traf describe this fragment's
            // samples; remember where this run of samples starts.
            let group_start = samples.len();

            for trun in traf.track_run_boxes() {
                let mut fpos = match trun.data_offset {
                    Some(offset) => base.wrapping_add(offset as i64 as u64),
                    None => next_fpos,
                };

                for (n, entry) in trun.entries.iter().enumerate() {
                    let (duration, size, is_sync, cts) = resolve_entry(
                        entry,
                        n == 0,
                        trun.first_sample_flags.as_ref(),
                        tfhd,
                        trex,
                    );
                    samples.push(SampleInfo {
                        fpos,
                        size,
                        duration,
                        decode_time,
                        composition_delta: cts,
                        is_sync,
                        chunk: 0,
                        fragment: seq,
                        group: SampleGroupInfo::None,
                    });
                    fpos += size as u64;
                    decode_time += duration as u64;
                }
                next_fpos = fpos;
            }

            for sbgp in traf.sample_to_groups() {
                let mut iter = sbgp.iter();
                for sample in samples[group_start..].iter_mut() {
                    let index = iter.next().unwrap_or(0);
                    if sample.group == SampleGroupInfo::None {
                        sample.group = fragment_group(index, traf, &stbl_sgpd, sbgp.grouping_type);
                    }
                }
            }

            prev_end = decode_time;
        }
    }

    Ok(samples)
}

/// The track ids that occur in any fragment of the file.
pub fn fragment_track_ids(mp4: &MP4) -> Vec<u32> {
    let mut ids = Vec::new();
    for moof in iter_box!(mp4.boxes, MovieFragmentBox) {
        for traf in moof.track_fragments() {
            if let Some(tfhd) = traf.track_fragment_header() {
                if !ids.contains(&tfhd.track_id) {
                    ids.push(tfhd.track_id);
                }
            }
        }
    }
    ids
}
