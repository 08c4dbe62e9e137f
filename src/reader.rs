//! Reading MP4 files: per-track sample access on top of the box tree.
//!
use std::io;

use once_cell::sync::OnceCell;

use crate::boxes::*;
use crate::fragment::fragment_samples;
use crate::io::{Mp4File, Mp4Input};
use crate::mp4box::MP4;
use crate::sample_info::{SampleGroupInfo, SampleInfo};
use crate::track::{movie_info, track_info, Codec, MovieInfo, TrackInfo};
use crate::types::FourCC;

/// One sample as handed out by a track reader.
///
/// `bytes` is one access unit: for audio codecs the raw AU, for the
/// NALU based video codecs the length-prefixed NALUs of one picture.
#[derive(Debug, Default)]
pub struct Sample<'b> {
    pub bytes:           &'b [u8],
    pub duration:        u32,
    pub cts_offset:      i32,
    pub is_sync:         bool,
    /// 0 for samples from the sample tables, the moof sequence
    /// number for samples from fragments.
    pub fragment_number: u32,
    pub group:           SampleGroupInfo,
}

struct TrackState {
    track_id: u32,
    samples:  OnceCell<Vec<SampleInfo>>,
}

/// Reads an MP4 file or segment stream.
///
/// The box tree is parsed once up front; per-track sample lists are
/// built lazily on first access. The reader is read-only after
/// construction and can be shared across threads.
pub struct Mp4Reader {
    mp4:    MP4,
    input:  Box<dyn Mp4Input>,
    tracks: Vec<TrackState>,
}

impl Mp4Reader {
    /// Open a file.
    pub fn open(path: impl AsRef<str>) -> io::Result<Mp4Reader> {
        Mp4Reader::from_input(Mp4File::open(path)?)
    }

    /// Open any input, e.g. an [`Mp4Mem`](crate::io::Mp4Mem) buffer.
    pub fn from_input(mut input: impl Mp4Input + 'static) -> io::Result<Mp4Reader> {
        let mp4 = MP4::read_skip_mdat(&mut input)?;
        let mut tracks = Vec::new();
        if let Some(movie) = mp4.movie_opt() {
            for track in movie.tracks() {
                tracks.push(TrackState {
                    track_id: track.track_id(),
                    samples:  OnceCell::new(),
                });
            }
        }
        Ok(Mp4Reader {
            mp4,
            input: Box::new(input),
            tracks,
        })
    }

    /// The parsed box tree.
    pub fn mp4(&self) -> &MP4 {
        &self.mp4
    }

    /// General movie information.
    pub fn movie_info(&self) -> MovieInfo {
        movie_info(&self.mp4)
    }

    /// Per-track information, in track order.
    pub fn track_infos(&self) -> Vec<TrackInfo> {
        let mut infos = track_info(&self.mp4);
        // Complete the numbers with what the fragments carry.
        for info in infos.iter_mut() {
            if let Some(idx) = self.track_index_by_id(info.track_id) {
                let samples = self.samples(idx);
                if samples.len() as u64 != info.sample_count {
                    info.sample_count = samples.len() as u64;
                    info.max_sample_size =
                        samples.iter().map(|s| s.size as u64).max().unwrap_or(0);
                    info.total_size = samples.iter().map(|s| s.size as u64).sum();
                }
                if info.media_duration == 0 {
                    info.media_duration = samples.iter().map(|s| s.duration as u64).sum();
                }
            }
        }
        infos
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    fn track_index_by_id(&self, track_id: u32) -> Option<usize> {
        self.tracks.iter().position(|t| t.track_id == track_id)
    }

    fn track_box(&self, index: usize) -> &TrackBox {
        self.mp4.movie().tracks()[index]
    }

    // The fused plain + fragmented sample list of a track.
    fn samples(&self, index: usize) -> &[SampleInfo] {
        let state = &self.tracks[index];
        state.samples.get_or_init(|| {
            let track = self.track_box(index);
            let mut samples: Vec<SampleInfo> = track.sample_info_iter().collect();
            match fragment_samples(&self.mp4, state.track_id) {
                Ok(mut frag) => samples.append(&mut frag),
                Err(e) => warn!("track {}: {}", state.track_id, e),
            }
            samples
        })
    }

    fn sample_entry(&self, index: usize) -> Option<&MP4Box> {
        self.track_box(index)
            .media()
            .media_info()
            .sample_table()
            .sample_description()
            .sample_entry()
    }

    /// A generic track reader for any track.
    pub fn track(&self, index: usize) -> io::Result<GenericTrackReader<'_>> {
        if index >= self.tracks.len() {
            return Err(ioerr!(InvalidInput, "track index {} out of range", index));
        }
        Ok(GenericTrackReader {
            reader: self,
            index,
            cursor: 0,
            warned_realloc: false,
        })
    }

    fn codec(&self, index: usize) -> Codec {
        self.sample_entry(index)
            .map(|e| Codec::from(crate::mp4box::BoxInfo::fourcc(e)))
            .unwrap_or(Codec::Undefined)
    }

    fn checked_track(&self, index: usize, wanted: &[Codec]) -> io::Result<GenericTrackReader<'_>> {
        let codec = self.codec(index);
        if !wanted.contains(&codec) {
            return Err(ioerr!(
                InvalidInput,
                "track {}: codec {:?} does not match requested reader",
                index,
                codec
            ));
        }
        self.track(index)
    }

    /// An audio track reader (any audio codec).
    pub fn audio_track(&self, index: usize) -> io::Result<AudioTrackReader<'_>> {
        let inner = self.checked_track(index, &[Codec::Mp4a, Codec::MpeghMha, Codec::MpeghMhm])?;
        Ok(AudioTrackReader { inner })
    }

    /// An AAC track reader.
    pub fn mp4a_track(&self, index: usize) -> io::Result<AudioTrackReader<'_>> {
        let inner = self.checked_track(index, &[Codec::Mp4a])?;
        Ok(AudioTrackReader { inner })
    }

    /// An MPEG-H track reader (mha or mhm flavour).
    pub fn mpegh_track(&self, index: usize) -> io::Result<AudioTrackReader<'_>> {
        let inner = self.checked_track(index, &[Codec::MpeghMha, Codec::MpeghMhm])?;
        Ok(AudioTrackReader { inner })
    }

    /// An H.264/AVC track reader.
    pub fn avc_track(&self, index: usize) -> io::Result<VideoTrackReader<'_>> {
        VideoTrackReader::new(self.checked_track(index, &[Codec::Avc])?)
    }

    /// An H.265/HEVC track reader.
    pub fn hevc_track(&self, index: usize) -> io::Result<VideoTrackReader<'_>> {
        VideoTrackReader::new(self.checked_track(index, &[Codec::Hevc])?)
    }

    /// An H.266/VVC track reader.
    pub fn vvc_track(&self, index: usize) -> io::Result<VideoTrackReader<'_>> {
        VideoTrackReader::new(self.checked_track(index, &[Codec::Vvc])?)
    }

    /// A JPEG-XS track reader.
    pub fn jxs_track(&self, index: usize) -> io::Result<VideoTrackReader<'_>> {
        VideoTrackReader::new(self.checked_track(index, &[Codec::Jxs])?)
    }
}

/// Streaming sample cursor over one track.
pub struct GenericTrackReader<'a> {
    reader:         &'a Mp4Reader,
    index:          usize,
    cursor:         usize,
    warned_realloc: bool,
}

impl<'a> GenericTrackReader<'a> {
    /// The coding name from the sample entry ("mp4a", "avc1", ...).
    pub fn coding_name(&self) -> FourCC {
        self.reader
            .sample_entry(self.index)
            .map(crate::mp4box::BoxInfo::fourcc)
            .unwrap_or_default()
    }

    /// The raw decoder configuration record bytes.
    pub fn decoder_config(&self) -> Option<Vec<u8>> {
        match self.reader.sample_entry(self.index)? {
            MP4Box::AacSampleEntry(e) => e.decoder_config().map(|d| d.to_vec()),
            MP4Box::MpeghSampleEntry(e)
            | MP4Box::Mha2SampleEntry(e)
            | MP4Box::Mhm1SampleEntry(e)
            | MP4Box::Mhm2SampleEntry(e) => e.decoder_config().map(|d| d.to_vec()),
            MP4Box::AvcSampleEntry(e) | MP4Box::Avc3SampleEntry(e) => {
                e.decoder_config().map(|d| d.to_vec())
            },
            MP4Box::HevcSampleEntry(e) | MP4Box::Hev1SampleEntry(e) => {
                e.decoder_config().map(|d| d.to_vec())
            },
            MP4Box::VvcSampleEntry(e) | MP4Box::Vvi1SampleEntry(e) => e.decoder_config(),
            MP4Box::JxsSampleEntry(e) => e.decoder_config().map(|d| d.to_vec()),
            _ => None,
        }
    }

    /// Number of samples in this track.
    pub fn sample_count(&self) -> u64 {
        self.reader.samples(self.index).len() as u64
    }

    /// Largest sample in the track; size your reusable buffer with this.
    pub fn max_sample_size(&self) -> u64 {
        self.reader
            .samples(self.index)
            .iter()
            .map(|s| s.size as u64)
            .max()
            .unwrap_or(0)
    }

    /// The timing/size info of sample `index`.
    pub fn sample_info(&self, index: usize) -> Option<&SampleInfo> {
        self.reader.samples(self.index).get(index)
    }

    fn read_sample<'b>(&mut self, index: usize, buf: &'b mut Vec<u8>) -> io::Result<Sample<'b>> {
        let info = match self.reader.samples(self.index).get(index) {
            Some(info) => info.clone(),
            // Reading past the end yields an empty sample.
            None => return Ok(Sample::default()),
        };

        let size = info.size as usize;
        if buf.len() < size {
            if !self.warned_realloc && buf.capacity() < size {
                warn!(
                    "track {}: sample buffer smaller than max_sample_size, reallocating",
                    self.reader.tracks[self.index].track_id
                );
                self.warned_realloc = true;
            }
            buf.resize(size, 0);
        }
        self.reader.input.read_exact_at(&mut buf[..size], info.fpos)?;

        Ok(Sample {
            bytes:           &buf[..size],
            duration:        info.duration,
            cts_offset:      info.composition_delta,
            is_sync:         info.is_sync,
            fragment_number: info.fragment,
            group:           info.group,
        })
    }

    /// Read the next sample into `buf` and return a view on it.
    ///
    /// After the last sample this keeps returning empty samples.
    pub fn next_sample<'b>(&mut self, buf: &'b mut Vec<u8>) -> io::Result<Sample<'b>> {
        let cursor = self.cursor;
        if cursor < self.reader.samples(self.index).len() {
            self.cursor += 1;
        }
        self.read_sample(cursor, buf)
    }

    /// Random access by sample index (0-based).
    pub fn sample_by_index<'b>(&mut self, index: usize, buf: &'b mut Vec<u8>) -> io::Result<Sample<'b>> {
        self.read_sample(index, buf)
    }

    /// Reset the cursor to the first sample.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }
}

/// Track reader for audio tracks.
pub struct AudioTrackReader<'a> {
    inner: GenericTrackReader<'a>,
}

impl<'a> AudioTrackReader<'a> {
    pub fn sample_rate(&self) -> u32 {
        match self.inner.reader.sample_entry(self.inner.index) {
            Some(MP4Box::AacSampleEntry(e)) => e.sample_rate(),
            Some(MP4Box::MpeghSampleEntry(e))
            | Some(MP4Box::Mha2SampleEntry(e))
            | Some(MP4Box::Mhm1SampleEntry(e))
            | Some(MP4Box::Mhm2SampleEntry(e)) => e.sample_rate_hi as u32,
            _ => 0,
        }
    }

    pub fn channel_count(&self) -> u16 {
        match self.inner.reader.sample_entry(self.inner.index) {
            Some(MP4Box::AacSampleEntry(e)) => e.channel_count,
            Some(MP4Box::MpeghSampleEntry(e))
            | Some(MP4Box::Mha2SampleEntry(e))
            | Some(MP4Box::Mhm1SampleEntry(e))
            | Some(MP4Box::Mhm2SampleEntry(e)) => e.channel_count,
            _ => 0,
        }
    }
}

impl<'a> std::ops::Deref for AudioTrackReader<'a> {
    type Target = GenericTrackReader<'a>;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<'a> std::ops::DerefMut for AudioTrackReader<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

/// Track reader for video tracks.
///
/// For the NALU based codecs, [`nalus`](VideoTrackReader::nalus)
/// splits a sample into its NAL units.
pub struct VideoTrackReader<'a> {
    inner:       GenericTrackReader<'a>,
    length_size: Option<u8>,
}

impl<'a> VideoTrackReader<'a> {
    fn new(inner: GenericTrackReader<'a>) -> io::Result<VideoTrackReader<'a>> {
        let length_size = match inner.reader.sample_entry(inner.index) {
            Some(MP4Box::AvcSampleEntry(e)) | Some(MP4Box::Avc3SampleEntry(e)) => {
                e.avcc().map(|b| b.record.length_size_minus_one + 1)
            },
            Some(MP4Box::HevcSampleEntry(e)) | Some(MP4Box::Hev1SampleEntry(e)) => {
                e.hvcc().map(|b| b.record.length_size_minus_one + 1)
            },
            Some(MP4Box::VvcSampleEntry(e)) | Some(MP4Box::Vvi1SampleEntry(e)) => {
                e.vvcc().map(|b| b.record.length_size_minus_one + 1)
            },
            _ => None,
        };
        Ok(VideoTrackReader { inner, length_size })
    }

    /// Width and height from the sample entry.
    pub fn dimensions(&self) -> (u16, u16) {
        match self.inner.reader.sample_entry(self.inner.index) {
            Some(MP4Box::AvcSampleEntry(e)) | Some(MP4Box::Avc3SampleEntry(e)) => {
                (e.visual.width, e.visual.height)
            },
            Some(MP4Box::HevcSampleEntry(e)) | Some(MP4Box::Hev1SampleEntry(e)) => {
                (e.visual.width, e.visual.height)
            },
            Some(MP4Box::VvcSampleEntry(e)) | Some(MP4Box::Vvi1SampleEntry(e)) => {
                (e.visual.width, e.visual.height)
            },
            Some(MP4Box::JxsSampleEntry(e)) => (e.visual.width, e.visual.height),
            _ => (0, 0),
        }
    }

    /// Split a sample payload into NAL units.
    ///
    /// The length prefix size comes from the codec's decoder
    /// configuration record.
    pub fn nalus<'b>(&self, sample: &'b [u8]) -> io::Result<NaluIterator<'b>> {
        let length_size = self
            .length_size
            .ok_or_else(|| ioerr!(InvalidInput, "track has no NALU length size"))?;
        Ok(NaluIterator {
            data: sample,
            length_size,
        })
    }
}

impl<'a> std::ops::Deref for VideoTrackReader<'a> {
    type Target = GenericTrackReader<'a>;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<'a> std::ops::DerefMut for VideoTrackReader<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

/// Iterator over the NAL units of one video sample.
pub struct NaluIterator<'b> {
    data:        &'b [u8],
    length_size: u8,
}

impl<'b> Iterator for NaluIterator<'b> {
    type Item = &'b [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let ls = self.length_size as usize;
        if self.data.len() < ls {
            return None;
        }
        let mut len = 0usize;
        for &b in &self.data[..ls] {
            len = (len << 8) | b as usize;
        }
        if self.data.len() < ls + len {
            return None;
        }
        let nalu = &self.data[ls..ls + len];
        self.data = &self.data[ls + len..];
        Some(nalu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nalu_iterator_cuts_on_length_prefix() {
        let data = [0x00, 0x02, 0xaa, 0xbb, 0x00, 0x01, 0xcc];
        let mut iter = NaluIterator {
            data:        &data,
            length_size: 2,
        };
        assert_eq!(iter.next(), Some(&[0xaa, 0xbb][..]));
        assert_eq!(iter.next(), Some(&[0xcc][..]));
        assert_eq!(iter.next(), None);
    }
}
