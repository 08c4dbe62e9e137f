use crate::boxes::prelude::*;
use crate::boxes::{ChunkLargeOffsetBox, ChunkOffsetBox};
use crate::boxes::{CompactSampleSizeBox, CompositionOffsetBox, SyncSampleBox};
use crate::boxes::{SampleDescriptionBox, SampleGroupDescriptionBox, SampleToGroupBox};
use crate::boxes::{SampleSizeBox, SampleToChunkBox, TimeToSampleBox};

def_box! {
    /// 8.5.1 Sample Table Box (ISO/IEC 14496-12:2015(E))
    ///
    /// It usually contains:
    ///
    /// - TimeToSampleBox, stts
    /// - CompositionOffsetBox, ctts
    /// - SampleDescriptionBox, stsd
    /// - SampleSizeBox, stsz, or CompactSampleSizeBox, stz2
    /// - SampleToChunkBox, stsc
    /// - ChunkOffsetBox, stco, or ChunkLargeOffsetBox, co64
    ///
    /// Optionally:
    ///
    /// - SyncSampleBox, stss
    /// - SampleToGroupBox, sbgp
    /// - SampleGroupDescriptionBox, sgpd
    ///
    #[derive(Default)]
    SampleTableBox {
        boxes:      Vec<MP4Box>,
    },
    fourcc => "stbl",
    version => [],
    impls => [ basebox, boxinfo, debug, fromtobytes ],
}

impl SampleTableBox {
    declare_box_methods!(SampleDescriptionBox, sample_description, sample_description_mut);
    declare_box_methods!(TimeToSampleBox, time_to_sample, time_to_sample_mut);
    declare_box_methods!(SampleToChunkBox, sample_to_chunk, sample_to_chunk_mut);
    declare_box_methods_opt!(CompositionOffsetBox, composition_time_to_sample, composition_time_to_sample_mut);
    declare_box_methods_opt!(SyncSampleBox, sync_samples, sync_samples_mut);
    declare_box_methods_opt!(CompactSampleSizeBox, compact_sample_size, compact_sample_size_mut);

    /// Get a reference to the SampleSizeBox.
    ///
    /// A track has either an stsz or an stz2 table; both are exposed
    /// through the sample-size iterator, see [`sample_size_iter`]
    /// (SampleTableBox::sample_size_iter).
    pub fn sample_size(&self) -> Option<&SampleSizeBox> {
        first_box!(&self.boxes, SampleSizeBox)
    }

    /// Iterator over the sample sizes, regardless of which of the
    /// two size tables the track carries.
    pub fn sample_size_iter(&self) -> crate::boxes::stsz::SampleSizeIterator<'_> {
        if let Some(stsz) = self.sample_size() {
            return stsz.iter();
        }
        if let Some(stz2) = self.compact_sample_size() {
            return stz2.iter();
        }
        crate::boxes::stsz::SampleSizeIterator::empty()
    }

    /// Number of samples in this track.
    pub fn sample_count(&self) -> u32 {
        if let Some(stsz) = self.sample_size() {
            return stsz.count;
        }
        if let Some(stz2) = self.compact_sample_size() {
            return stz2.entries.len() as u32;
        }
        0
    }

    /// Get a reference to the ChunkOffsetBox or ChunkLargeOffsetBox.
    pub fn chunk_offset_table(&self) -> Option<&ChunkOffsetBox> {
        if let Some(stco) = first_box!(&self.boxes, ChunkOffsetBox) {
            return Some(stco);
        }
        first_box!(&self.boxes, ChunkLargeOffsetBox)
    }

    /// Get a mutable reference to the ChunkOffsetBox or ChunkLargeOffsetBox.
    pub fn chunk_offset_table_mut(&mut self) -> Option<&mut ChunkOffsetBox> {
        for box_ in &mut self.boxes {
            match box_ {
                MP4Box::ChunkOffsetBox(ref mut stco) => return Some(stco),
                MP4Box::ChunkLargeOffsetBox(ref mut co64) => return Some(co64),
                _ => {},
            }
        }
        None
    }

    /// All the SampleToGroupBoxes in this table.
    pub fn sample_to_groups(&self) -> Vec<&SampleToGroupBox> {
        iter_box!(self.boxes, SampleToGroupBox).collect()
    }

    /// All the SampleGroupDescriptionBoxes in this table.
    pub fn sample_group_descriptions(&self) -> Vec<&SampleGroupDescriptionBox> {
        iter_box!(self.boxes, SampleGroupDescriptionBox).collect()
    }

    /// Find the SampleGroupDescriptionBox for a grouping type.
    pub fn sample_group_description(&self, grouping_type: FourCC) -> Option<&SampleGroupDescriptionBox> {
        iter_box!(self.boxes, SampleGroupDescriptionBox).find(|sgpd| sgpd.grouping_type == grouping_type)
    }

    /// Check if this SampleTableBox is complete.
    pub fn is_valid(&self) -> bool {
        let mut valid = true;

        match first_box!(&self.boxes, SampleDescriptionBox) {
            Some(stsd) => {
                if stsd.entries.is_empty() {
                    error!("SampleTableBox: SampleDescriptionBox: no entries");
                    valid = false;
                }
            },
            None => {
                error!("SampleTableBox: no SampleDescriptionBox present");
                valid = false;
            },
        }

        if first_box!(&self.boxes, TimeToSampleBox).is_none() {
            error!("SampleTableBox: no TimeToSampleBox present");
            valid = false;
        }
        if first_box!(&self.boxes, SampleToChunkBox).is_none() {
            error!("SampleTableBox: no SampleToChunkBox present");
            valid = false;
        }
        if first_box!(&self.boxes, ChunkOffsetBox).is_none()
            && first_box!(&self.boxes, ChunkLargeOffsetBox).is_none()
        {
            error!("SampleTableBox: no ChunkOffsetBox present");
            valid = false;
        }
        if first_box!(&self.boxes, SampleSizeBox).is_none()
            && first_box!(&self.boxes, CompactSampleSizeBox).is_none()
        {
            error!("SampleTableBox: no SampleSizeBox present");
            valid = false;
        }

        valid
    }
}
