use crate::boxes::prelude::*;

def_box! {
    /// 8.6.2 Sync Sample Box (ISO/IEC 14496-12:2015(E))
    ///
    /// Sample numbers are 1-based. If the box is absent, every sample
    /// is a sync sample.
    #[derive(Default)]
    SyncSampleBox {
        entries:        ArraySized32<u32>,
    },
    fourcc => "stss",
    version => [0],
    impls => [ boxinfo, debug, fromtobytes, fullbox ],
}

impl SyncSampleBox {
    /// Return an iterator that yields is_sync for every sample.
    pub fn iter(&self) -> SyncSampleIterator<'_> {
        SyncSampleIterator {
            entries: &self.entries,
            index:   0,
            sample:  1,
        }
    }
}

pub struct SyncSampleIterator<'a> {
    entries: &'a [u32],
    index:   usize,
    sample:  u32,
}

impl<'a> Iterator for SyncSampleIterator<'a> {
    type Item = bool;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        while self.entries.get(self.index).map(|&s| s < self.sample) == Some(true) {
            self.index += 1;
        }
        let is_sync = self.entries.get(self.index) == Some(&self.sample);
        self.sample += 1;
        Some(is_sync)
    }
}
