use crate::boxes::prelude::*;

def_box! {
    /// 8.7.4 Sample To Chunk Box (ISO/IEC 14496-12:2015(E))
    #[derive(Default)]
    SampleToChunkBox {
        entries:        ArraySized32<SampleToChunkEntry>,
    },
    fourcc => "stsc",
    version => [0],
    impls => [ boxinfo, debug, fromtobytes, fullbox ],
}

def_struct! {
    /// Entry in SampleToChunkBox.
    #[derive(Default)]
    SampleToChunkEntry,
        first_chunk:              u32,
        samples_per_chunk:        u32,
        sample_description_index: u32,
}

/// What the SampleToChunkIterator yields per sample.
#[derive(Clone, Debug, Default)]
pub struct SampleToChunkIterEntry {
    pub cur_chunk:    u32,
    pub first_sample: u32,
}

impl SampleToChunkBox {
    /// Return an iterator that iterates over every sample, yielding
    /// the chunk it lives in and the first sample of that chunk.
    pub fn iter(&self) -> SampleToChunkIterator<'_> {
        SampleToChunkIterator {
            entries: &self.entries,
            index: 0,
            cur_chunk: 0,
            first_sample: 1,
            sample: 0,
            left_in_chunk: 0,
        }
    }

    /// Total number of samples the runs describe over `num_chunks` chunks.
    pub fn sample_count(&self, num_chunks: u32) -> u64 {
        let mut count = 0u64;
        for (idx, entry) in self.entries.iter().enumerate() {
            let next_first = self
                .entries
                .get(idx + 1)
                .map(|e| e.first_chunk)
                .unwrap_or(num_chunks + 1);
            if next_first > entry.first_chunk {
                let chunks = (next_first - entry.first_chunk) as u64;
                count += chunks * entry.samples_per_chunk as u64;
            }
        }
        count
    }

    /// Append a chunk with `samples_per_chunk` samples, run-length
    /// compressed on samples_per_chunk.
    pub fn push_chunk(&mut self, chunk_number: u32, samples_per_chunk: u32) {
        if let Some(last) = self.entries.last() {
            if last.samples_per_chunk == samples_per_chunk {
                return;
            }
        }
        self.entries.push(SampleToChunkEntry {
            first_chunk: chunk_number,
            samples_per_chunk,
            sample_description_index: 1,
        });
    }
}

#[derive(Clone)]
pub struct SampleToChunkIterator<'a> {
    entries:       &'a [SampleToChunkEntry],
    index:         usize,
    cur_chunk:     u32,
    first_sample:  u32,
    sample:        u32,
    left_in_chunk: u32,
}

impl<'a> Iterator for SampleToChunkIterator<'a> {
    type Item = SampleToChunkIterEntry;

    fn next(&mut self) -> Option<Self::Item> {
        if self.left_in_chunk == 0 {
            // Move to the next chunk.
            self.cur_chunk += 1;
            self.first_sample = self.sample + 1;

            // Maybe move to the next run.
            if let Some(next) = self.entries.get(self.index + 1) {
                if next.first_chunk == self.cur_chunk {
                    self.index += 1;
                }
            }
            self.left_in_chunk = self.entries.get(self.index)?.samples_per_chunk;
            if self.left_in_chunk == 0 {
                return None;
            }
        }

        self.left_in_chunk -= 1;
        self.sample += 1;
        Some(SampleToChunkIterEntry {
            cur_chunk:    self.cur_chunk,
            first_sample: self.first_sample,
        })
    }
}
