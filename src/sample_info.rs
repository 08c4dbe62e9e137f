//! Iterate over all samples in a track.
//!
use crate::boxes::ctts::CompositionOffsetIterator;
use crate::boxes::sbgp::SampleToGroupIterator;
use crate::boxes::sgpd::SampleGroupDescriptionEntry;
use crate::boxes::stsc::SampleToChunkIterator;
use crate::boxes::stss::SyncSampleIterator;
use crate::boxes::stsz::SampleSizeIterator;
use crate::boxes::stts::TimeToSampleIterator;
use crate::boxes::*;
use crate::types::FourCC;

/// Which sample group a sample belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleGroupInfo {
    None,
    /// 'roll': recovery roll distance.
    Roll(i16),
    /// 'prol': audio pre-roll distance.
    Preroll(i16),
    /// 'sap ': SAP type.
    Sap { dependent: bool, sap_type: u8 },
}

impl Default for SampleGroupInfo {
    fn default() -> SampleGroupInfo {
        SampleGroupInfo::None
    }
}

impl SampleGroupInfo {
    /// The grouping type fourcc, if the sample is in a group.
    pub fn grouping_type(&self) -> Option<FourCC> {
        match self {
            SampleGroupInfo::None => None,
            SampleGroupInfo::Roll(_) => Some(FourCC::new("roll")),
            SampleGroupInfo::Preroll(_) => Some(FourCC::new("prol")),
            SampleGroupInfo::Sap { .. } => Some(FourCC::new("sap ")),
        }
    }

    pub(crate) fn from_description(entry: &SampleGroupDescriptionEntry) -> SampleGroupInfo {
        match entry {
            SampleGroupDescriptionEntry::RollRecoveryEntry(e) => SampleGroupInfo::Roll(e.roll_distance),
            SampleGroupDescriptionEntry::AudioPreRollEntry(e) => SampleGroupInfo::Preroll(e.roll_distance),
            SampleGroupDescriptionEntry::SapEntry(e) => SampleGroupInfo::Sap {
                dependent: e.dependent_flag,
                sap_type:  e.sap_type,
            },
            SampleGroupDescriptionEntry::GenericSampleGroupEntry(_) => SampleGroupInfo::None,
        }
    }
}

/// Information about one sample.
#[derive(Default, Debug, Clone)]
pub struct SampleInfo {
    /// File position.
    pub fpos:              u64,
    /// Size.
    pub size:              u32,
    /// Duration.
    pub duration:          u32,
    /// Decode time.
    pub decode_time:       u64,
    /// Composition time delta.
    pub composition_delta: i32,
    /// Is it a sync sample.
    pub is_sync:           bool,
    /// What chunk is it in.
    pub chunk:             u32,
    /// Fragment sequence number; 0 for samples from the sample tables.
    pub fragment:          u32,
    /// Sample group membership.
    pub group:             SampleGroupInfo,
}

// One (sbgp, sgpd) pair being walked along the samples.
struct GroupIter<'a> {
    sbgp_iter: SampleToGroupIterator<'a>,
    sgpd:      &'a SampleGroupDescriptionBox,
}

/// Iterator that yields SampleInfo.
pub struct SampleInfoIterator<'a> {
    stsz_iter:       SampleSizeIterator<'a>,
    stts_iter:       TimeToSampleIterator<'a>,
    stsc_iter:       SampleToChunkIterator<'a>,
    ctts_iter:       Option<CompositionOffsetIterator<'a>>,
    stss_iter:       Option<SyncSampleIterator<'a>>,
    group_iters:     Vec<GroupIter<'a>>,
    chunk_offset:    &'a ChunkOffsetBox,
    media_timescale: u32,
    fpos:            u64,
    cur_sample:      u32,
    cur_chunk:       u32,
}

/// Return an iterator over the SampleTableBox of this track.
///
/// It iterates over multiple tables within the SampleTableBox, and
/// for each sample returns a SampleInfo.
pub fn sample_info_iter<'a>(trak: &'a TrackBox) -> SampleInfoIterator<'a> {
    use once_cell::sync::Lazy;
    static EMPTY_STCO: Lazy<ChunkOffsetBox> = Lazy::new(ChunkOffsetBox::new);
    static EMPTY_STTS: Lazy<TimeToSampleBox> = Lazy::new(TimeToSampleBox::default);
    static EMPTY_STSC: Lazy<SampleToChunkBox> = Lazy::new(SampleToChunkBox::default);

    let mdhd = trak.media().media_header();
    let stbl = trak.media().media_info().sample_table();

    // Pair up each sbgp with the sgpd of the same grouping type.
    let mut group_iters = Vec::new();
    for sbgp in stbl.sample_to_groups() {
        if let Some(sgpd) = stbl.sample_group_description(sbgp.grouping_type) {
            group_iters.push(GroupIter {
                sbgp_iter: sbgp.iter(),
                sgpd,
            });
        } else {
            warn!("track {}: sbgp {} without matching sgpd", trak.track_id(), sbgp.grouping_type);
        }
    }

    SampleInfoIterator {
        stsz_iter: stbl.sample_size_iter(),
        stts_iter: first_box!(&stbl.boxes, TimeToSampleBox).unwrap_or(&EMPTY_STTS).iter(),
        stsc_iter: first_box!(&stbl.boxes, SampleToChunkBox).unwrap_or(&EMPTY_STSC).iter(),
        ctts_iter: stbl.composition_time_to_sample().map(|ctts| ctts.iter()),
        stss_iter: stbl.sync_samples().map(|stss| stss.iter()),
        group_iters,
        chunk_offset: stbl.chunk_offset_table().unwrap_or(&EMPTY_STCO),
        media_timescale: mdhd.timescale,
        fpos: 0,
        cur_sample: 1,
        cur_chunk: 0,
    }
}

impl<'a> SampleInfoIterator<'a> {
    /// Timescale of the media being iterated over.
    pub fn timescale(&self) -> u32 {
        self.media_timescale
    }
}

impl<'a> Iterator for SampleInfoIterator<'a> {
    type Item = SampleInfo;

    fn next(&mut self) -> Option<Self::Item> {
        let size = self.stsz_iter.next()?;

        if let Some(chunk_info) = self.stsc_iter.next() {
            if self.cur_sample == chunk_info.first_sample {
                self.cur_chunk = chunk_info.cur_chunk;
                let idx = self.cur_chunk.saturating_sub(1) as usize;
                self.fpos = self.chunk_offset.entries.get(idx).cloned().unwrap_or(0);
            }
        }

        let mut sample = SampleInfo {
            fpos: self.fpos,
            size,
            chunk: self.cur_chunk,
            is_sync: true,
            ..SampleInfo::default()
        };
        self.fpos += size as u64;

        if let Some((duration, decode_time)) = self.stts_iter.next() {
            sample.duration = duration;
            sample.decode_time = decode_time;
        }

        if let Some(ctts_iter) = self.ctts_iter.as_mut() {
            if let Some(delta) = ctts_iter.next() {
                sample.composition_delta = delta;
            }
        }

        if let Some(stss_iter) = self.stss_iter.as_mut() {
            sample.is_sync = stss_iter.next().unwrap_or(true);
        }

        for group in self.group_iters.iter_mut() {
            let index = group.sbgp_iter.next().unwrap_or(0);
            if sample.group == SampleGroupInfo::None && index > 0 {
                // Indices above 0x10000 refer to fragment-local
                // descriptions, the rest to the sgpd in the stbl.
                let idx = (index as usize & 0xffff).wrapping_sub(1);
                if let Some(item) = group.sgpd.entries.iter().nth(idx) {
                    sample.group = SampleGroupInfo::from_description(&item.entry);
                }
            }
        }

        self.cur_sample += 1;

        Some(sample)
    }
}

/// Aggregate statistics over the sample tables of a track.
#[derive(Debug, Default, Clone)]
pub struct TrackSampleStats {
    pub sample_count:    u64,
    pub max_sample_size: u32,
    pub total_size:      u64,
    pub total_duration:  u64,
}

/// Collect the aggregates used to fill in track info.
pub fn track_sample_stats(trak: &TrackBox) -> TrackSampleStats {
    let stbl = trak.media().media_info().sample_table();
    let mut stats = TrackSampleStats {
        sample_count:   stbl.sample_count() as u64,
        total_duration: first_box!(&stbl.boxes, TimeToSampleBox)
            .map(|stts| stts.total_duration())
            .unwrap_or(0),
        ..TrackSampleStats::default()
    };
    if let Some(stsz) = stbl.sample_size() {
        stats.max_sample_size = stsz.max_sample_size();
        stats.total_size = stsz.total_size();
    } else if let Some(stz2) = stbl.compact_sample_size() {
        stats.max_sample_size = stz2.entries.iter().cloned().max().unwrap_or(0);
        stats.total_size = stz2.entries.iter().map(|&s| s as u64).sum();
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boxes::stts::TimeToSampleBox;

    #[test]
    fn stts_push_run_length() {
        let mut stts = TimeToSampleBox::default();
        for _ in 0..3 {
            stts.push(1024);
        }
        stts.push(512);
        assert_eq!(stts.entries.len(), 2);
        assert_eq!(stts.sample_count(), 4);
        assert_eq!(stts.total_duration(), 3 * 1024 + 512);

        let v: Vec<_> = stts.iter().collect();
        assert_eq!(v[2], (1024, 2048));
        assert_eq!(v[3], (512, 3072));
    }
}
