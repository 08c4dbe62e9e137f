//! Buffering of samples on the writer side.
//!
//! A [`SampleStore`] holds the payload bytes in a sink (memory or a
//! temp file) plus the metadata the writers need to build the sample
//! tables. The [`interleave`] function turns the per-track streams
//! into a single time-aligned chunk order.
//!
use std::collections::HashMap;
use std::io;

use crate::io::{ReadAt, TempSpool};
use crate::sample_info::SampleGroupInfo;
use crate::serialize::WriteBytes;

/// Where the sample bytes are kept until the file is finalized.
pub enum SampleSink {
    Memory(Vec<u8>),
    /// Spill to a temp file, for movies that don't fit in memory.
    TempFile(TempSpool),
}

impl SampleSink {
    pub fn memory() -> SampleSink {
        SampleSink::Memory(Vec::new())
    }

    pub fn temp_file() -> io::Result<SampleSink> {
        Ok(SampleSink::TempFile(TempSpool::new()?))
    }

    fn append(&mut self, data: &[u8]) -> io::Result<u64> {
        match self {
            SampleSink::Memory(vec) => {
                let offset = vec.len() as u64;
                vec.extend_from_slice(data);
                Ok(offset)
            },
            SampleSink::TempFile(spool) => {
                let offset = spool.len();
                spool.write(data)?;
                Ok(offset)
            },
        }
    }

    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        match self {
            SampleSink::Memory(vec) => {
                let offset = offset as usize;
                if offset + buf.len() > vec.len() {
                    return Err(ioerr!(UnexpectedEof, "read past end of sample sink"));
                }
                buf.copy_from_slice(&vec[offset..offset + buf.len()]);
                Ok(())
            },
            SampleSink::TempFile(spool) => spool.read_exact_at(buf, offset),
        }
    }

    fn len(&self) -> u64 {
        match self {
            SampleSink::Memory(vec) => vec.len() as u64,
            SampleSink::TempFile(spool) => spool.len(),
        }
    }
}

/// Everything the writers need to know about one stored sample.
#[derive(Debug, Clone)]
pub struct MetaSample {
    pub track_id:   u32,
    /// Offset of the payload within the sink.
    pub offset:     u64,
    pub size:       u32,
    pub duration:   u32,
    pub cts_offset: i32,
    pub is_sync:    bool,
    pub fragment:   u32,
    pub group:      SampleGroupInfo,
    /// Accumulated decode time within the track, media timescale.
    pub dts:        u64,
}

/// Sample buffer shared by the writers.
pub struct SampleStore {
    sink:          SampleSink,
    samples:       Vec<MetaSample>,
    track_dts:     HashMap<u32, u64>,
    last_fragment: u32,
}

impl SampleStore {
    pub fn new(sink: SampleSink) -> SampleStore {
        SampleStore {
            sink,
            samples: Vec::new(),
            track_dts: HashMap::new(),
            last_fragment: 0,
        }
    }

    /// Append one sample.
    ///
    /// Fragment numbers must be non-decreasing over the whole stream.
    pub fn add_sample(
        &mut self,
        track_id: u32,
        fragment: u32,
        bytes: &[u8],
        duration: u32,
        cts_offset: i32,
        is_sync: bool,
        group: SampleGroupInfo,
    ) -> io::Result<()> {
        if fragment < self.last_fragment {
            return Err(ioerr!(
                InvalidInput,
                "track {}: fragment number {} after {}",
                track_id,
                fragment,
                self.last_fragment
            ));
        }
        self.last_fragment = fragment;

        let offset = self.sink.append(bytes)?;
        let dts = self.track_dts.entry(track_id).or_insert(0);
        self.samples.push(MetaSample {
            track_id,
            offset,
            size: bytes.len() as u32,
            duration,
            cts_offset,
            is_sync,
            fragment,
            group,
            dts: *dts,
        });
        *dts += duration as u64;
        Ok(())
    }

    pub fn samples(&self) -> &[MetaSample] {
        &self.samples
    }

    /// Total payload bytes stored.
    pub fn total_bytes(&self) -> u64 {
        self.sink.len()
    }

    /// Copy one sample's payload out of the sink.
    pub fn read_payload(&self, sample: &MetaSample, buf: &mut Vec<u8>) -> io::Result<()> {
        buf.resize(sample.size as usize, 0);
        self.sink.read_exact_at(buf, sample.offset)
    }

    /// Stream the payload of `samples` (store indices) to a writer,
    /// in bounded chunks.
    pub fn copy_samples<W: WriteBytes>(&self, indices: &[usize], out: &mut W) -> io::Result<u64> {
        let mut buf = Vec::new();
        let mut total = 0;
        for &idx in indices {
            let sample = &self.samples[idx];
            self.read_payload(sample, &mut buf)?;
            out.write(&buf)?;
            total += sample.size as u64;
        }
        Ok(total)
    }
}

/// A run of samples of one track that share a chunk.
#[derive(Debug, Default, Clone)]
pub struct Chunk {
    pub track_id: u32,
    /// Indices into the store's sample list.
    pub samples:  Vec<usize>,
    pub bytes:    u64,
}

/// Interleave the per-track sample streams into chunks.
///
/// Time-aligned policy: always pick the track whose next sample ends
/// earliest on the media timeline, ties broken by track id. A chunk
/// boundary falls whenever the selected track changes or the chunk
/// byte budget is exceeded.
pub fn interleave(
    samples: &[MetaSample],
    timescales: &HashMap<u32, u32>,
    chunk_bytes: u64,
) -> Vec<Chunk> {
    // Build per-track queues, in arrival order.
    let mut track_ids: Vec<u32> = Vec::new();
    let mut queues: HashMap<u32, std::collections::VecDeque<usize>> = HashMap::new();
    for (idx, sample) in samples.iter().enumerate() {
        if !track_ids.contains(&sample.track_id) {
            track_ids.push(sample.track_id);
        }
        queues.entry(sample.track_id).or_default().push_back(idx);
    }
    track_ids.sort_unstable();

    let end_time = |idx: usize| -> (u128, u32) {
        let s = &samples[idx];
        let ts = timescales.get(&s.track_id).cloned().unwrap_or(1).max(1);
        ((s.dts as u128 + s.duration as u128), ts)
    };

    let mut chunks: Vec<Chunk> = Vec::new();
    loop {
        // Select the track with the earliest next end-time.
        let mut best: Option<(u32, u128, u32)> = None;
        for &track_id in &track_ids {
            let head = match queues.get(&track_id).and_then(|q| q.front()) {
                Some(&idx) => idx,
                None => continue,
            };
            let (end, ts) = end_time(head);
            let better = match best {
                // Cross-multiply so we never divide; u128 keeps it exact.
                Some((_, b_end, b_ts)) => end * (b_ts as u128) < b_end * (ts as u128),
                None => true,
            };
            if better {
                best = Some((track_id, end, ts));
            }
        }
        let track_id = match best {
            Some((track_id, _, _)) => track_id,
            None => break,
        };

        let idx = queues.get_mut(&track_id).unwrap().pop_front().unwrap();
        let size = samples[idx].size as u64;

        let new_chunk = match chunks.last() {
            Some(chunk) => {
                chunk.track_id != track_id || (chunk_bytes > 0 && chunk.bytes + size > chunk_bytes)
            },
            None => true,
        };
        if new_chunk {
            chunks.push(Chunk {
                track_id,
                samples: Vec::new(),
                bytes: 0,
            });
        }
        let chunk = chunks.last_mut().unwrap();
        chunk.samples.push(idx);
        chunk.bytes += size;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(samples: &[(u32, u32, u32)]) -> SampleStore {
        // (track_id, size, duration)
        let mut store = SampleStore::new(SampleSink::memory());
        for &(track_id, size, duration) in samples {
            let bytes = vec![track_id as u8; size as usize];
            store
                .add_sample(track_id, 0, &bytes, duration, 0, true, SampleGroupInfo::None)
                .unwrap();
        }
        store
    }

    #[test]
    fn interleave_is_time_aligned() {
        // Track 1: 3 samples of 10 ticks; track 2: one long sample.
        let store = store_with(&[(1, 4, 10), (1, 4, 10), (1, 4, 10), (2, 4, 25)]);
        let mut timescales = HashMap::new();
        timescales.insert(1, 100);
        timescales.insert(2, 100);

        let chunks = interleave(store.samples(), &timescales, 0);
        // t1 ends 10, 20 -> both before t2's 25; then t2, then t1's 30.
        let order: Vec<u32> = chunks.iter().map(|c| c.track_id).collect();
        assert_eq!(order, vec![1, 2, 1]);
        assert_eq!(chunks[0].samples.len(), 2);
    }

    #[test]
    fn chunk_budget_splits() {
        let store = store_with(&[(1, 100, 10), (1, 100, 10), (1, 100, 10)]);
        let mut timescales = HashMap::new();
        timescales.insert(1, 100);

        let chunks = interleave(store.samples(), &timescales, 200);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].samples.len(), 2);
        assert_eq!(chunks[1].samples.len(), 1);
    }

    #[test]
    fn fragment_numbers_must_not_decrease() {
        let mut store = SampleStore::new(SampleSink::memory());
        store
            .add_sample(1, 2, b"x", 1, 0, true, SampleGroupInfo::None)
            .unwrap();
        let err = store
            .add_sample(1, 1, b"y", 1, 0, true, SampleGroupInfo::None)
            .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
    }
}
