use std::io;

use crate::boxes::prelude::*;

def_box! {
    /// 8.9.2 Sample to Group Box (ISO/IEC 14496-12:2015(E))
    SampleToGroupBox {
        grouping_type:  FourCC,
        grouping_type_parameter: u32,
        entries:        ArraySized32<SampleToGroupEntry>,
    },
    fourcc => "sbgp",
    version => [1],
    impls => [ boxinfo, debug ],
}

def_struct! {
    /// Entry in SampleToGroupBox.
    #[derive(Default)]
    SampleToGroupEntry,
        sample_count:               u32,
        group_description_index:    u32,
}

impl SampleToGroupBox {
    pub fn new(grouping_type: FourCC) -> SampleToGroupBox {
        SampleToGroupBox {
            grouping_type,
            grouping_type_parameter: 0,
            entries: ArraySized32::new(),
        }
    }

    /// Return an iterator that yields the group_description_index for
    /// every sample (0 means: not in any group).
    pub fn iter(&self) -> SampleToGroupIterator<'_> {
        let mut iter = SampleToGroupIterator {
            entries: &self.entries,
            entry: SampleToGroupEntry::default(),
            index: 0,
        };
        if !iter.entries.is_empty() {
            iter.entry = iter.entries[0].clone();
        }
        iter
    }

    /// Append one sample's group index, run-length compressed.
    pub fn push(&mut self, group_description_index: u32) {
        if let Some(last) = self.entries.last_mut() {
            if last.group_description_index == group_description_index {
                last.sample_count += 1;
                return;
            }
        }
        self.entries.push(SampleToGroupEntry {
            sample_count: 1,
            group_description_index,
        });
    }
}

impl FromBytes for SampleToGroupBox {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<SampleToGroupBox> {
        let mut reader = BoxReader::new(stream)?;
        let stream = &mut reader;
        let grouping_type = FourCC::from_bytes(stream)?;
        let grouping_type_parameter = if stream.version() == 1 {
            u32::from_bytes(stream)?
        } else {
            0
        };
        let entries = ArraySized32::<SampleToGroupEntry>::from_bytes(stream)?;
        Ok(SampleToGroupBox {
            grouping_type,
            grouping_type_parameter,
            entries,
        })
    }

    fn min_size() -> usize {
        8
    }
}

impl ToBytes for SampleToGroupBox {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        let mut writer = BoxWriter::new(stream, self)?;
        let stream = &mut writer;

        self.grouping_type.to_bytes(stream)?;
        if self.grouping_type_parameter != 0 {
            self.grouping_type_parameter.to_bytes(stream)?;
        }
        self.entries.to_bytes(stream)?;

        stream.finalize()
    }
}

impl FullBox for SampleToGroupBox {
    fn version(&self) -> Option<u8> {
        if self.grouping_type_parameter != 0 {
            Some(1)
        } else {
            Some(0)
        }
    }
}

pub struct SampleToGroupIterator<'a> {
    entries: &'a [SampleToGroupEntry],
    entry:   SampleToGroupEntry,
    index:   usize,
}

impl<'a> Iterator for SampleToGroupIterator<'a> {
    type Item = u32;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.entry.sample_count > 0 {
                self.entry.sample_count -= 1;
                return Some(self.entry.group_description_index);
            }
            self.index += 1;
            if self.index >= self.entries.len() {
                return None;
            }
            self.entry = self.entries[self.index].clone();
        }
    }
}
