//! Writing MP4 files: plain, fragmented, and segmented.
//!
//! A writer is configured with a [`MovieConfig`] plus one
//! [`TrackConfig`] per track, then fed samples, and finalized with
//! `close` (or `into_bytes` for in-memory output).
//!
use std::collections::HashMap;
use std::io;

use crate::boxes::mpegh::MhaDecoderConfigRecord;
use crate::boxes::vvcc::VvcDecoderConfigRecord;
use crate::boxes::*;
use crate::io::{CountBytes, FileWriter, MemBuffer, Mp4Mem, TempSpool};
use crate::sample_info::SampleGroupInfo;
use crate::serialize::BoxBytes;
use crate::sample_store::{interleave, MetaSample, SampleSink, SampleStore};
use crate::serialize::{FromBytes, ToBytes, WriteBytes};
use crate::types::*;

/// Configuration of the optional 'sidx' box in fragmented mode.
#[derive(Debug, Clone)]
pub struct SidxConfig {
    /// The SAP type advertised for every reference.
    pub sap_type: u8,
}

/// Configuration of the optional 'iods' box.
#[derive(Debug, Clone, Default)]
pub struct IodsConfig {
    pub audio_profile_level:    u8,
    pub visual_profile_level:   u8,
    pub od_profile_level:       u8,
    pub scene_profile_level:    u8,
    pub graphics_profile_level: u8,
}

/// Movie-level configuration, shared by all writer variants.
#[derive(Clone)]
pub struct MovieConfig {
    pub major_brand:       FourCC,
    pub minor_version:     u32,
    pub compatible_brands: Vec<FourCC>,
    pub movie_timescale:   u32,
    /// Unix time stamped into the creation/modification fields.
    pub creation_time:     u64,
    /// Always write tfdt version 1, even for small decode times.
    pub force_tfdt_v1:     bool,
    /// Chunk byte budget for the interleaver; 0 means chunks only
    /// break on track changes.
    pub chunk_bytes:       u64,
    pub sidx:              Option<SidxConfig>,
    pub iods:              Option<IodsConfig>,
    /// Raw box buffers placed in the movie's 'udta'.
    pub user_data:         Vec<Vec<u8>>,
}

impl Default for MovieConfig {
    fn default() -> MovieConfig {
        MovieConfig {
            major_brand:       FourCC::new("isom"),
            minor_version:     0,
            compatible_brands: vec![FourCC::new("isom"), FourCC::new("mp42")],
            movie_timescale:   600,
            creation_time:     0,
            force_tfdt_v1:     false,
            chunk_bytes:       1024 * 1024,
            sidx:              None,
            iods:              None,
            user_data:         Vec::new(),
        }
    }
}

/// AAC ('mp4a').
#[derive(Clone, Default)]
pub struct Mp4aConfig {
    /// The AudioSpecificConfig (required).
    pub asc:           Vec<u8>,
    pub channel_count: u16,
    pub sample_rate:   u32,
    pub buffer_size:   u32,
    pub max_bitrate:   u32,
    pub avg_bitrate:   u32,
}

/// MPEG-H ('mha1'/'mha2' raw AUs, 'mhm1'/'mhm2' MHAS).
#[derive(Clone)]
pub struct MpeghConfig {
    pub flavour:       FourCC,
    /// Required for mha flavours, recommended for mhm.
    pub config_record: Option<MhaDecoderConfigRecord>,
    /// Generates an 'mhaP' box when non-empty.
    pub profile_level_compatible_sets: Vec<u8>,
    pub channel_count: u16,
    pub sample_rate:   u32,
}

impl Default for MpeghConfig {
    fn default() -> MpeghConfig {
        MpeghConfig {
            flavour:       FourCC::new("mhm1"),
            config_record: None,
            profile_level_compatible_sets: Vec::new(),
            channel_count: 0,
            sample_rate:   48000,
        }
    }
}

/// Pixel metadata shared by the video configs.
#[derive(Clone, Default)]
pub struct VideoParams {
    pub width:           u16,
    pub height:          u16,
    pub compressor_name: String,
}

/// H.264/AVC ('avc1'/'avc3').
#[derive(Clone, Default)]
pub struct AvcConfig {
    pub flavour:       FourCC,
    pub video:         VideoParams,
    /// The raw AVCDecoderConfigurationRecord (required).
    pub config_record: Vec<u8>,
}

/// H.265/HEVC ('hvc1'/'hev1').
#[derive(Clone, Default)]
pub struct HevcConfig {
    pub flavour:       FourCC,
    pub video:         VideoParams,
    /// The raw HEVCDecoderConfigurationRecord (required).
    pub config_record: Vec<u8>,
}

/// H.266/VVC ('vvc1'/'vvi1').
#[derive(Clone, Default)]
pub struct VvcConfig {
    pub flavour: FourCC,
    pub video:   VideoParams,
    pub record:  VvcDecoderConfigRecord,
}

/// JPEG-XS ('jxsm').
#[derive(Clone, Default)]
pub struct JxsConfig {
    pub video:             VideoParams,
    /// The Codestream_Header (required).
    pub codestream_header: Vec<u8>,
    pub brat:              u32,
    pub frat:              u32,
    pub schar:             u16,
    pub tcod:              u32,
    pub ppih:              u16,
    pub plev:              u16,
}

/// Per-codec track configuration.
#[derive(Clone)]
pub enum CodecConfig {
    Mp4a(Mp4aConfig),
    Mpegh(MpeghConfig),
    Avc(AvcConfig),
    Hevc(HevcConfig),
    Vvc(VvcConfig),
    Jxs(JxsConfig),
}

/// Track-level configuration.
#[derive(Clone)]
pub struct TrackConfig {
    /// 0 means: auto-assign.
    pub track_id:        u32,
    pub media_timescale: u32,
    pub language:        IsoLanguageCode,
    /// When set, an out-of-line 'sgpd' is written in the track and
    /// fragments only reference it instead of repeating it.
    pub default_sample_group: SampleGroupInfo,
    pub codec:           CodecConfig,
}

impl TrackConfig {
    pub fn new(media_timescale: u32, codec: CodecConfig) -> TrackConfig {
        TrackConfig {
            track_id: 0,
            media_timescale,
            language: IsoLanguageCode::default(),
            default_sample_group: SampleGroupInfo::None,
            codec,
        }
    }

    /// The fourcc of the sample entry this track writes.
    pub fn coding_name(&self) -> FourCC {
        match &self.codec {
            CodecConfig::Mp4a(_) => FourCC::new("mp4a"),
            CodecConfig::Mpegh(c) => c.flavour,
            CodecConfig::Avc(c) => default_fourcc(c.flavour, "avc1"),
            CodecConfig::Hevc(c) => default_fourcc(c.flavour, "hvc1"),
            CodecConfig::Vvc(c) => default_fourcc(c.flavour, "vvc1"),
            CodecConfig::Jxs(_) => FourCC::new("jxsm"),
        }
    }

    pub fn is_audio(&self) -> bool {
        matches!(self.codec, CodecConfig::Mp4a(_) | CodecConfig::Mpegh(_))
    }

    // Reject configurations the writers cannot express.
    fn validate(&self) -> io::Result<()> {
        if self.media_timescale == 0 {
            return Err(ioerr!(InvalidInput, "track config: media_timescale is zero"));
        }
        match &self.codec {
            CodecConfig::Mp4a(c) => {
                if c.asc.is_empty() {
                    return Err(ioerr!(InvalidInput, "mp4a: missing AudioSpecificConfig"));
                }
            },
            CodecConfig::Mpegh(c) => {
                let f = c.flavour.to_be_bytes();
                match &f {
                    b"mha1" | b"mha2" => {
                        if c.config_record.is_none() {
                            return Err(ioerr!(InvalidInput, "mha: missing decoder config record"));
                        }
                    },
                    b"mhm1" | b"mhm2" => {
                        if c.channel_count != 0 {
                            return Err(ioerr!(InvalidInput, "mhm: channel count must be 0"));
                        }
                    },
                    _ => return Err(ioerr!(InvalidInput, "mpegh: bad coding name {}", c.flavour)),
                }
            },
            CodecConfig::Avc(c) => {
                crate::boxes::avcc::AvcDecoderConfigRecord::parse(c.config_record.clone())
                    .map_err(|e| ioerr!(InvalidInput, "avc: bad decoder config record: {}", e))?;
            },
            CodecConfig::Hevc(c) => {
                crate::boxes::hvcc::HevcDecoderConfigRecord::parse(c.config_record.clone())
                    .map_err(|e| ioerr!(InvalidInput, "hevc: bad decoder config record: {}", e))?;
            },
            CodecConfig::Vvc(c) => match c.record.length_size_minus_one {
                0 | 1 | 3 => {},
                n => return Err(ioerr!(InvalidInput, "vvc: length_size_minus_one {} invalid", n)),
            },
            CodecConfig::Jxs(c) => {
                if c.codestream_header.is_empty() {
                    return Err(ioerr!(InvalidInput, "jxs: missing codestream header"));
                }
            },
        }
        Ok(())
    }

    // The stsd sample entry for this track.
    fn build_sample_entry(&self) -> io::Result<MP4Box> {
        let entry = match &self.codec {
            CodecConfig::Mp4a(c) => {
                let esds = ESDescriptorBox {
                    es_descriptor: ESDescriptor {
                        decoder_config: DecoderConfigDescriptor {
                            object_type: 0x40,
                            stream_type: 0x05,
                            buffer_size: c.buffer_size,
                            max_bitrate: c.max_bitrate,
                            avg_bitrate: c.avg_bitrate,
                            specific_info: DecoderSpecificInfo::from_asc(c.asc.clone()),
                            ..DecoderConfigDescriptor::default()
                        },
                        ..ESDescriptor::default()
                    },
                };
                AacSampleEntry {
                    data_reference_index: 1,
                    channel_count: c.channel_count,
                    sample_size: 16,
                    sample_rate_hi: c.sample_rate as u16,
                    sample_rate_lo: 0,
                    boxes: vec![esds.to_mp4box()],
                }
                .to_mp4box()
            },
            CodecConfig::Mpegh(c) => {
                let mut entry = MpeghSampleEntry::new(c.flavour);
                entry.channel_count = c.channel_count;
                entry.sample_rate_hi = c.sample_rate as u16;
                if let Some(record) = c.config_record.clone() {
                    entry.boxes.push(MhaConfigurationBox { record }.to_mp4box());
                }
                if !c.profile_level_compatible_sets.is_empty() {
                    let compatible_sets = c.profile_level_compatible_sets.iter().cloned().collect();
                    entry
                        .boxes
                        .push(MhaProfileLevelCompatibilityBox { compatible_sets }.to_mp4box());
                }
                entry.to_mp4box()
            },
            CodecConfig::Avc(c) => {
                let record =
                    crate::boxes::avcc::AvcDecoderConfigRecord::parse(c.config_record.clone())?;
                let mut entry = AvcSampleEntry::new(default_fourcc(c.flavour, "avc1"));
                fill_visual(&mut entry.visual, &c.video, "AVC Coding");
                entry.boxes.push(AvcConfigurationBox { record }.to_mp4box());
                entry.to_mp4box()
            },
            CodecConfig::Hevc(c) => {
                let record =
                    crate::boxes::hvcc::HevcDecoderConfigRecord::parse(c.config_record.clone())?;
                let mut entry = HevcSampleEntry::new(default_fourcc(c.flavour, "hvc1"));
                fill_visual(&mut entry.visual, &c.video, "HEVC Coding");
                entry.boxes.push(HevcConfigurationBox { record }.to_mp4box());
                entry.to_mp4box()
            },
            CodecConfig::Vvc(c) => {
                let mut entry = VvcSampleEntry::new(default_fourcc(c.flavour, "vvc1"));
                fill_visual(&mut entry.visual, &c.video, "VVC Coding");
                entry
                    .boxes
                    .push(VvcConfigurationBox { record: c.record.clone() }.to_mp4box());
                entry.to_mp4box()
            },
            CodecConfig::Jxs(c) => {
                let mut entry = JxsSampleEntry::default();
                fill_visual(&mut entry.visual, &c.video, "JXS Coding");
                entry.boxes.push(
                    JxsConfigurationBox {
                        record: JxsDecoderConfigRecord {
                            codestream_header: Data(c.codestream_header.clone()),
                        },
                    }
                    .to_mp4box(),
                );
                entry.boxes.push(
                    JxsVideoInformationBox {
                        brat:  c.brat,
                        frat:  c.frat,
                        schar: c.schar,
                        tcod:  c.tcod,
                    }
                    .to_mp4box(),
                );
                entry.boxes.push(
                    JxsProfileBox {
                        ppih: c.ppih,
                        plev: c.plev,
                    }
                    .to_mp4box(),
                );
                entry.to_mp4box()
            },
        };
        Ok(entry)
    }
}

fn default_fourcc(fourcc: FourCC, dfl: &str) -> FourCC {
    if fourcc == FourCC::default() {
        FourCC::new(dfl)
    } else {
        fourcc
    }
}

fn fill_visual(
    visual: &mut crate::boxes::sample_entry::VisualSampleFields,
    params: &VideoParams,
    default_compressor: &str,
) {
    visual.width = params.width;
    visual.height = params.height;
    visual.compressor_name = if params.compressor_name.is_empty() {
        CompressorName(default_compressor.to_string())
    } else {
        CompressorName(params.compressor_name.clone())
    };
}

/// One sample handed to a writer.
pub struct WriteSample<'a> {
    pub bytes:           &'a [u8],
    pub duration:        u32,
    pub cts_offset:      i32,
    pub is_sync:         bool,
    /// 0 for plain files; >= 1 and non-decreasing for fragmented
    /// streams.
    pub fragment_number: u32,
    pub group:           SampleGroupInfo,
}

impl<'a> WriteSample<'a> {
    pub fn new(bytes: &'a [u8], duration: u32) -> WriteSample<'a> {
        WriteSample {
            bytes,
            duration,
            cts_offset: 0,
            is_sync: true,
            fragment_number: 0,
            group: SampleGroupInfo::None,
        }
    }
}

// One track being written.
struct Track {
    id:        u32,
    config:    TrackConfig,
    edits:     Vec<crate::boxes::edts::EditListEntry>,
    user_data: Vec<MP4Box>,
}

// Shared movie-building state of all writer variants.
struct MovieBuilder {
    config:        MovieConfig,
    tracks:        Vec<Track>,
    store:         SampleStore,
    next_track_id: u32,
}

impl MovieBuilder {
    fn new(config: MovieConfig, sink: SampleSink) -> MovieBuilder {
        MovieBuilder {
            config,
            tracks: Vec::new(),
            store: SampleStore::new(sink),
            next_track_id: 1,
        }
    }

    fn add_track(&mut self, config: TrackConfig) -> io::Result<u32> {
        config.validate()?;
        let id = if config.track_id != 0 {
            if self.tracks.iter().any(|t| t.id == config.track_id) {
                return Err(ioerr!(InvalidInput, "track id {} already in use", config.track_id));
            }
            config.track_id
        } else {
            while self.tracks.iter().any(|t| t.id == self.next_track_id) {
                self.next_track_id += 1;
            }
            self.next_track_id
        };
        self.next_track_id = std::cmp::max(self.next_track_id, id + 1);
        self.tracks.push(Track {
            id,
            config,
            edits: Vec::new(),
            user_data: Vec::new(),
        });
        Ok(id)
    }

    fn track(&self, track_id: u32) -> io::Result<&Track> {
        self.tracks
            .iter()
            .find(|t| t.id == track_id)
            .ok_or_else(|| ioerr!(InvalidInput, "no such track: {}", track_id))
    }

    fn track_mut(&mut self, track_id: u32) -> io::Result<&mut Track> {
        self.tracks
            .iter_mut()
            .find(|t| t.id == track_id)
            .ok_or_else(|| ioerr!(InvalidInput, "no such track: {}", track_id))
    }

    fn add_sample(&mut self, track_id: u32, sample: &WriteSample) -> io::Result<()> {
        let track = self.track(track_id)?;
        // A sample group that disagrees with the track default is a
        // config error, we do not reconcile.
        if track.config.default_sample_group != SampleGroupInfo::None
            && sample.group != SampleGroupInfo::None
            && sample.group != track.config.default_sample_group
        {
            return Err(ioerr!(
                InvalidInput,
                "track {}: sample group differs from the track default",
                track_id
            ));
        }
        self.store.add_sample(
            track_id,
            sample.fragment_number,
            sample.bytes,
            sample.duration,
            sample.cts_offset,
            sample.is_sync,
            sample.group.clone(),
        )
    }

    fn add_edit_list_entry(
        &mut self,
        track_id: u32,
        segment_duration: u64,
        media_time: i64,
        media_rate: u16,
    ) -> io::Result<()> {
        let track = self.track_mut(track_id)?;
        track.edits.push(crate::boxes::edts::EditListEntry {
            segment_duration,
            media_time,
            media_rate,
            media_rate_fraction: 0,
        });
        Ok(())
    }

    fn add_user_data(&mut self, track_id: u32, data: &[u8]) -> io::Result<()> {
        let b = parse_user_data_box(data)?;
        self.track_mut(track_id)?.user_data.push(b);
        Ok(())
    }

    fn timescales(&self) -> HashMap<u32, u32> {
        self.tracks
            .iter()
            .map(|t| (t.id, t.config.media_timescale))
            .collect()
    }

    fn file_type_box(&self) -> FileTypeBox {
        FileTypeBox {
            major_brand:       self.config.major_brand,
            minor_version:     self.config.minor_version,
            compatible_brands: self.config.compatible_brands.clone(),
        }
    }

    // Movie duration = the longest track, projected into the movie
    // timescale; an edit list overrides a track's contribution.
    fn movie_duration(&self, media_durations: &HashMap<u32, u64>) -> u64 {
        let mut duration = 0u64;
        for track in &self.tracks {
            let d = if track.edits.is_empty() {
                let media = media_durations.get(&track.id).cloned().unwrap_or(0);
                project_duration(media, track.config.media_timescale, self.config.movie_timescale)
            } else {
                track.edits.iter().map(|e| e.segment_duration).sum()
            };
            duration = std::cmp::max(duration, d);
        }
        duration
    }

    // Build the trak for one track.
    fn build_trak(
        &self,
        track: &Track,
        media_duration: u64,
        stbl_boxes: Vec<MP4Box>,
    ) -> io::Result<TrackBox> {
        let cfg = &track.config;
        let creation = Time::from_unix(self.config.creation_time);

        let mut tkhd = TrackHeaderBox::default();
        tkhd.cr_time = creation;
        tkhd.mod_time = creation;
        tkhd.track_id = track.id;
        tkhd.duration = Duration_(project_duration(
            media_duration,
            cfg.media_timescale,
            self.config.movie_timescale,
        ));
        if cfg.is_audio() {
            tkhd.volume = FixedFloat8_8::from(1.0);
        } else if let Some((width, height)) = video_dimensions(&cfg.codec) {
            tkhd.width = FixedFloat16_16((width as u32) << 16);
            tkhd.height = FixedFloat16_16((height as u32) << 16);
        }

        let mut boxes = vec![tkhd.to_mp4box()];

        if !track.edits.is_empty() {
            let mut elst = EditListBox::default();
            for e in &track.edits {
                elst.entries.push(e.clone());
            }
            boxes.push(
                EditBox {
                    boxes: vec![elst.to_mp4box()],
                }
                .to_mp4box(),
            );
        }

        let mdhd = MediaHeaderBox {
            cr_time:   creation,
            mod_time:  creation,
            timescale: cfg.media_timescale,
            duration:  Duration_(media_duration),
            language:  cfg.language,
            quality:   0,
        };

        let hdlr = if cfg.is_audio() {
            HandlerBox::new("soun", "SoundHandler")
        } else {
            HandlerBox::new("vide", "VideoHandler")
        };

        let header = if cfg.is_audio() {
            SoundMediaHeaderBox::default().to_mp4box()
        } else {
            VideoMediaHeaderBox::default().to_mp4box()
        };

        let mut stbl = vec![SampleDescriptionBox {
            entries: std::iter::once(cfg.build_sample_entry()?).collect(),
        }
        .to_mp4box()];
        stbl.extend(stbl_boxes);

        let minf = MediaInformationBox {
            boxes: vec![
                header,
                DataInformationBox::default().to_mp4box(),
                SampleTableBox { boxes: stbl }.to_mp4box(),
            ],
        };

        let mdia = MediaBox {
            boxes: vec![mdhd.to_mp4box(), hdlr.to_mp4box(), minf.to_mp4box()],
        };
        boxes.push(mdia.to_mp4box());

        if !track.user_data.is_empty() {
            boxes.push(
                UserDataBox {
                    boxes: track.user_data.clone(),
                }
                .to_mp4box(),
            );
        }

        Ok(TrackBox { boxes })
    }

    fn build_mvhd(&self, duration: u64) -> MovieHeaderBox {
        let creation = Time::from_unix(self.config.creation_time);
        let mut mvhd = MovieHeaderBox::default();
        mvhd.cr_time = creation;
        mvhd.mod_time = creation;
        mvhd.timescale = self.config.movie_timescale;
        mvhd.duration = Duration_(duration);
        mvhd.next_track_id = self.tracks.iter().map(|t| t.id).max().unwrap_or(0) + 1;
        mvhd
    }

    fn movie_user_data(&self) -> io::Result<Option<UserDataBox>> {
        if self.config.user_data.is_empty() {
            return Ok(None);
        }
        let mut udta = UserDataBox::default();
        for raw in &self.config.user_data {
            udta.boxes.push(parse_user_data_box(raw)?);
        }
        Ok(Some(udta))
    }
}

fn parse_user_data_box(data: &[u8]) -> io::Result<MP4Box> {
    if data.len() < 8 {
        return Err(ioerr!(InvalidInput, "user data: buffer too short for a box"));
    }
    let mut input = Mp4Mem::new(data.to_vec());
    MP4Box::from_bytes(&mut input)
        .map_err(|e| ioerr!(InvalidInput, "user data: not a valid box: {}", e))
}

fn video_dimensions(codec: &CodecConfig) -> Option<(u16, u16)> {
    match codec {
        CodecConfig::Avc(c) => Some((c.video.width, c.video.height)),
        CodecConfig::Hevc(c) => Some((c.video.width, c.video.height)),
        CodecConfig::Vvc(c) => Some((c.video.width, c.video.height)),
        CodecConfig::Jxs(c) => Some((c.video.width, c.video.height)),
        _ => None,
    }
}

// Project a duration between timescales, widening before rounding.
fn project_duration(duration: u64, from_timescale: u32, to_timescale: u32) -> u64 {
    if from_timescale == 0 {
        return 0;
    }
    ((duration as u128 * to_timescale as u128) / from_timescale as u128) as u64
}

// The sgpd description item for one group kind.
fn group_description_item(group: &SampleGroupInfo) -> Option<SampleGroupDescriptionItem> {
    let entry = match group {
        SampleGroupInfo::None => return None,
        SampleGroupInfo::Roll(d) => {
            SampleGroupDescriptionEntry::RollRecoveryEntry(RollRecoveryEntry { roll_distance: *d })
        },
        SampleGroupInfo::Preroll(d) => {
            SampleGroupDescriptionEntry::AudioPreRollEntry(AudioPreRollEntry { roll_distance: *d })
        },
        SampleGroupInfo::Sap { dependent, sap_type } => {
            SampleGroupDescriptionEntry::SapEntry(SapEntry {
                dependent_flag: *dependent,
                sap_type:       *sap_type,
            })
        },
    };
    Some(SampleGroupDescriptionItem::new(entry))
}

fn group_entry_length(group: &SampleGroupInfo) -> u32 {
    match group {
        SampleGroupInfo::Sap { .. } => 1,
        _ => 2,
    }
}

// Build the (sbgp, sgpd) pairs for a run of samples. Samples whose
// group equals `default_group` point at entry 1 of the out-of-line
// sgpd; any other group gets a local description with indices from
// `local_base` up.
fn build_sample_groups(
    samples: &[&MetaSample],
    default_group: &SampleGroupInfo,
    local_base: u32,
) -> Vec<MP4Box> {
    let mut boxes = Vec::new();

    // Gather the grouping types present.
    let mut types: Vec<FourCC> = Vec::new();
    for sample in samples {
        if let Some(gt) = sample.group.grouping_type() {
            if !types.contains(&gt) {
                types.push(gt);
            }
        }
    }

    for gt in types {
        let mut sbgp = SampleToGroupBox::new(gt);
        let mut sgpd = SampleGroupDescriptionBox::new(gt);
        let mut local_groups: Vec<SampleGroupInfo> = Vec::new();

        for sample in samples {
            let index = if sample.group.grouping_type() != Some(gt) {
                0
            } else if sample.group == *default_group {
                // Points into the out-of-line sgpd of the track.
                1
            } else {
                let pos = match local_groups.iter().position(|g| g == &sample.group) {
                    Some(pos) => pos,
                    None => {
                        local_groups.push(sample.group.clone());
                        if let Some(item) = group_description_item(&sample.group) {
                            sgpd.default_length = Some(group_entry_length(&sample.group));
                            sgpd.entries.push(item);
                        }
                        local_groups.len() - 1
                    },
                };
                local_base + pos as u32
            };
            sbgp.push(index);
        }

        if !sgpd.entries.is_empty() {
            boxes.push(sgpd.to_mp4box());
        }
        boxes.push(sbgp.to_mp4box());
    }

    boxes
}

fn build_iods(config: &IodsConfig) -> InitialObjectDescriptionBox {
    InitialObjectDescriptionBox {
        audio_profile_level:    config.audio_profile_level,
        visual_profile_level:   config.visual_profile_level,
        od_profile_level:       config.od_profile_level,
        scene_profile_level:    config.scene_profile_level,
        graphics_profile_level: config.graphics_profile_level,
        ..InitialObjectDescriptionBox::default()
    }
}

//
//
// The non-fragmented writer.
//
//

/// Writes a plain `ftyp` + `moov` + `mdat` file.
pub struct Mp4Writer {
    builder: MovieBuilder,
}

impl Mp4Writer {
    /// Samples buffered in memory until `close`.
    pub fn new(config: MovieConfig) -> Mp4Writer {
        Mp4Writer {
            builder: MovieBuilder::new(config, SampleSink::memory()),
        }
    }

    /// Samples spooled to a temp file until `close`.
    pub fn new_spooled(config: MovieConfig) -> io::Result<Mp4Writer> {
        Ok(Mp4Writer {
            builder: MovieBuilder::new(config, SampleSink::temp_file()?),
        })
    }

    pub fn add_track(&mut self, config: TrackConfig) -> io::Result<u32> {
        self.builder.add_track(config)
    }

    /// Add a sample. `fragment_number` must be 0.
    pub fn add_sample(&mut self, track_id: u32, sample: &WriteSample) -> io::Result<()> {
        if sample.fragment_number != 0 {
            return Err(ioerr!(InvalidInput, "plain writer: fragment number must be 0"));
        }
        self.builder.add_sample(track_id, sample)
    }

    pub fn add_edit_list_entry(
        &mut self,
        track_id: u32,
        segment_duration: u64,
        media_time: i64,
        media_rate: u16,
    ) -> io::Result<()> {
        self.builder
            .add_edit_list_entry(track_id, segment_duration, media_time, media_rate)
    }

    pub fn add_user_data(&mut self, track_id: u32, data: &[u8]) -> io::Result<()> {
        self.builder.add_user_data(track_id, data)
    }

    /// Finalize into a file.
    pub fn close(self, path: impl AsRef<str>) -> io::Result<()> {
        let mut out = FileWriter::create(path)?;
        self.finish(&mut out)
    }

    /// Finalize into memory.
    pub fn into_bytes(self) -> io::Result<Vec<u8>> {
        let mut out = MemBuffer::new();
        self.finish(&mut out)?;
        Ok(out.into_vec())
    }

    /// Finalize into any output.
    pub fn finish<W: WriteBytes>(self, out: &mut W) -> io::Result<()> {
        let builder = self.builder;
        if builder.tracks.is_empty() {
            return Err(ioerr!(InvalidInput, "writer: no tracks"));
        }
        let timescales = builder.timescales();
        let chunks = interleave(builder.store.samples(), &timescales, builder.config.chunk_bytes);

        // Payload order and relative chunk offsets within the mdat.
        let mut payload_order = Vec::new();
        let mut chunk_rel_offsets = Vec::new();
        let mut pos = 0u64;
        for chunk in &chunks {
            chunk_rel_offsets.push(pos);
            pos += chunk.bytes;
            payload_order.extend_from_slice(&chunk.samples);
        }
        let payload_size = pos;

        // Per-track sample tables.
        let mut media_durations = HashMap::new();
        let mut trak_boxes = Vec::new();

        for track in &builder.tracks {
            let samples: Vec<&MetaSample> = builder
                .store
                .samples()
                .iter()
                .filter(|s| s.track_id == track.id)
                .collect();

            let mut stbl_boxes = Vec::new();

            // stts.
            let mut stts = TimeToSampleBox::default();
            for s in &samples {
                stts.push(s.duration);
            }
            let media_duration = stts.total_duration();
            media_durations.insert(track.id, media_duration);
            stbl_boxes.push(stts.to_mp4box());

            // ctts, only when any offset is non-zero.
            if samples.iter().any(|s| s.cts_offset != 0) {
                let mut ctts = CompositionOffsetBox::default();
                for s in &samples {
                    ctts.push(s.cts_offset);
                }
                stbl_boxes.push(ctts.to_mp4box());
            }

            // stsc + stco from this track's chunks.
            let mut stsc = SampleToChunkBox::default();
            let mut stco = ChunkOffsetBox::new();
            let mut chunk_no = 0;
            for (idx, chunk) in chunks.iter().enumerate() {
                if chunk.track_id != track.id {
                    continue;
                }
                chunk_no += 1;
                stsc.push_chunk(chunk_no, chunk.samples.len() as u32);
                stco.entries.push(chunk_rel_offsets[idx]);
            }
            stbl_boxes.push(stsc.to_mp4box());

            // stsz; collapse to a constant size when possible.
            let mut stsz = SampleSizeBox::default();
            stsz.count = samples.len() as u32;
            let first_size = samples.first().map(|s| s.size).unwrap_or(0);
            if !samples.is_empty() && samples.iter().all(|s| s.size == first_size) {
                stsz.size = first_size;
            } else {
                for s in &samples {
                    stsz.entries.push(s.size);
                }
            }
            stbl_boxes.push(stsz.to_mp4box());

            stbl_boxes.push(MP4Box::ChunkOffsetBox(stco));

            // stss, omitted when everything is sync.
            if samples.iter().any(|s| !s.is_sync) {
                let mut stss = SyncSampleBox::default();
                for (idx, s) in samples.iter().enumerate() {
                    if s.is_sync {
                        stss.entries.push(idx as u32 + 1);
                    }
                }
                stbl_boxes.push(stss.to_mp4box());
            }

            // Sample groups: one (sbgp, sgpd) pair per grouping type.
            stbl_boxes.extend(build_sample_groups(&samples, &SampleGroupInfo::None, 1));

            let trak = builder.build_trak(track, media_duration, stbl_boxes)?;
            trak_boxes.push(trak.to_mp4box());
        }

        // moov: mvhd, iods, traks, udta.
        let duration = builder.movie_duration(&media_durations);
        let mut movie_boxes = vec![builder.build_mvhd(duration).to_mp4box()];
        if let Some(iods) = builder.config.iods.as_ref() {
            movie_boxes.push(build_iods(iods).to_mp4box());
        }
        movie_boxes.extend(trak_boxes);
        if let Some(udta) = builder.movie_user_data()? {
            movie_boxes.push(udta.to_mp4box());
        }

        let ftyp = builder.file_type_box();
        let mut moov = MovieBox { boxes: movie_boxes };

        // Back-patch: every chunk offset moves by the size of what
        // precedes the mdat payload. A promotion to co64 changes that
        // size, so settle it iteratively.
        let mdat_header: u64 = if payload_size + 8 > u32::MAX as u64 { 16 } else { 8 };
        let mut prefix = header_bytes(&ftyp, &moov)? + mdat_header;
        loop {
            let mut promoted = false;
            for trak in moov.tracks_mut() {
                let stbl = trak.media_mut().media_info_mut().sample_table_mut();
                if let Some(stco) = stbl.chunk_offset_table_mut() {
                    if !stco.is_large()
                        && stco.entries.iter().any(|&rel| rel + prefix > u32::MAX as u64)
                    {
                        stco.set_large();
                        promoted = true;
                    }
                }
            }
            if !promoted {
                break;
            }
            prefix = header_bytes(&ftyp, &moov)? + mdat_header;
        }
        for trak in moov.tracks_mut() {
            let stbl = trak.media_mut().media_info_mut().sample_table_mut();
            if let Some(stco) = stbl.chunk_offset_table_mut() {
                for e in stco.entries.iter_mut() {
                    *e += prefix;
                }
            }
        }

        // One forward pass: header boxes, mdat header, then payload
        // streamed out of the store.
        ftyp.to_bytes(out)?;
        moov.to_bytes(out)?;
        let mdat = MediaDataBox {
            location: Some((0, payload_size)),
            data:     Data(Vec::new()),
        };
        mdat.write_header(out)?;
        builder.store.copy_samples(&payload_order, out)?;

        Ok(())
    }
}

fn header_bytes(ftyp: &FileTypeBox, moov: &MovieBox) -> io::Result<u64> {
    let mut cb = CountBytes::new();
    ftyp.to_bytes(&mut cb)?;
    moov.to_bytes(&mut cb)?;
    Ok(cb.size())
}

//
//
// The fragmented writer.
//
//

// Everything remembered about a flushed fragment, for the sidx.
struct FragmentMeta {
    bytes:           u64,
    earliest_pts:    u64,
    end_pts:         u64,
    starts_with_sap: bool,
    sap_delta_time:  u32,
}

// State shared by the fragmented writer variants.
struct Fragmenter {
    builder:          MovieBuilder,
    // Per-track accumulated base media decode time.
    bmdt:             HashMap<u32, u64>,
    current_fragment: u32,
    flushed_upto:     usize,
    fragment_meta:    Vec<FragmentMeta>,
}

impl Fragmenter {
    fn new(config: MovieConfig) -> Fragmenter {
        Fragmenter {
            builder: MovieBuilder::new(config, SampleSink::memory()),
            bmdt: HashMap::new(),
            current_fragment: 0,
            flushed_upto: 0,
            fragment_meta: Vec::new(),
        }
    }

    fn overwrite_base_media_decode_time(&mut self, track_id: u32, value: u64) {
        self.bmdt.insert(track_id, value);
    }

    // The init fragment: ftyp + moov with empty sample tables and
    // the mvex/trex defaults.
    fn write_init<W: WriteBytes>(&self, out: &mut W) -> io::Result<()> {
        if self.builder.tracks.is_empty() {
            return Err(ioerr!(InvalidInput, "fragmented writer: no tracks"));
        }
        if self.builder.config.sidx.is_some() && self.builder.tracks.len() != 1 {
            return Err(ioerr!(
                InvalidInput,
                "sidx is only supported for single-track streams"
            ));
        }

        self.builder.file_type_box().to_bytes(out)?;

        let mut movie_boxes = vec![self.builder.build_mvhd(0).to_mp4box()];
        if let Some(iods) = self.builder.config.iods.as_ref() {
            movie_boxes.push(build_iods(iods).to_mp4box());
        }

        let mut mvex = MovieExtendsBox::default();
        for track in &self.builder.tracks {
            let mut stbl_boxes = vec![
                TimeToSampleBox::default().to_mp4box(),
                SampleToChunkBox::default().to_mp4box(),
                SampleSizeBox::default().to_mp4box(),
                MP4Box::ChunkOffsetBox(ChunkOffsetBox::new()),
            ];

            // The out-of-line default sample group description.
            if let Some(item) = group_description_item(&track.config.default_sample_group) {
                let gt = track.config.default_sample_group.grouping_type().unwrap();
                let mut sgpd = SampleGroupDescriptionBox::new(gt);
                sgpd.default_length = Some(group_entry_length(&track.config.default_sample_group));
                sgpd.entries.push(item);
                stbl_boxes.push(sgpd.to_mp4box());
            }

            let trak = self.builder.build_trak(track, 0, stbl_boxes)?;
            movie_boxes.push(trak.to_mp4box());

            let mut trex = TrackExtendsBox::default();
            trex.track_id = track.id;
            mvex.boxes.push(trex.to_mp4box());
        }
        movie_boxes.push(mvex.to_mp4box());
        if let Some(udta) = self.builder.movie_user_data()? {
            movie_boxes.push(udta.to_mp4box());
        }

        MovieBox { boxes: movie_boxes }.to_bytes(out)
    }

    fn add_sample(&mut self, track_id: u32, sample: &WriteSample) -> io::Result<()> {
        if sample.fragment_number == 0 {
            return Err(ioerr!(
                InvalidInput,
                "fragmented writer: fragment number must be >= 1"
            ));
        }
        self.current_fragment = std::cmp::max(self.current_fragment, sample.fragment_number);
        self.builder.add_sample(track_id, sample)
    }

    // True when samples of a fragment lower than the current one are
    // still buffered.
    fn has_complete_fragments(&self) -> bool {
        self.builder.store.samples()[self.flushed_upto..]
            .iter()
            .any(|s| s.fragment < self.current_fragment)
    }

    fn has_pending(&self) -> bool {
        self.flushed_upto < self.builder.store.samples().len()
    }

    // Flush buffered fragments. With `keep_open` the fragment that is
    // still accumulating (the current one) stays buffered.
    fn flush_pending<W: WriteBytes>(&mut self, out: &mut W, keep_open: bool) -> io::Result<()> {
        loop {
            let pending = &self.builder.store.samples()[self.flushed_upto..];
            let seq = match pending.first() {
                Some(s) => s.fragment,
                None => break,
            };
            if keep_open && seq == self.current_fragment {
                break;
            }
            self.flush_one(out, seq)?;
        }
        Ok(())
    }

    // Build and emit the moof + mdat pair for fragment `seq`.
    fn flush_one<W: WriteBytes>(&mut self, out: &mut W, seq: u32) -> io::Result<()> {
        let start = self.flushed_upto;
        let all = self.builder.store.samples();
        let mut end = start;
        while end < all.len() && all[end].fragment == seq {
            end += 1;
        }
        if end == start {
            return Ok(());
        }

        let mut moof = MovieFragmentBox::default();
        moof.boxes.push(
            MovieFragmentHeaderBox {
                sequence_number: seq,
            }
            .to_mp4box(),
        );

        // One traf per track that has samples in this fragment, in
        // track declaration order. Each track's payload is laid out
        // in the mdat in the same order.
        let mut mdat_offsets = Vec::new();
        let mut mdat_size = 0u64;
        let mut payload_indices = Vec::new();

        let track_ids: Vec<u32> = self.builder.tracks.iter().map(|t| t.id).collect();
        for &track_id in &track_ids {
            let track_samples: Vec<&MetaSample> = self.builder.store.samples()[start..end]
                .iter()
                .filter(|s| s.track_id == track_id)
                .collect();
            if track_samples.is_empty() {
                continue;
            }
            mdat_offsets.push((track_id, mdat_size));
            for pos in start..end {
                if self.builder.store.samples()[pos].track_id == track_id {
                    payload_indices.push(pos);
                }
            }
            mdat_size += track_samples.iter().map(|s| s.size as u64).sum::<u64>();

            let track = self.builder.track(track_id)?;
            let traf = build_traf(
                track,
                &track_samples,
                self.bmdt.get(&track_id).cloned().unwrap_or(0),
                self.builder.config.force_tfdt_v1,
            );
            moof.boxes.push(traf.to_mp4box());
        }

        // Now that the moof is final, patch the trun data offsets:
        // moof size + mdat header, plus where the track's payload
        // starts inside the mdat.
        let moof_size = MP4Box::MovieFragmentBox(moof.clone()).size();
        if moof_size > i32::MAX as u64 {
            return Err(ioerr!(InvalidData, "moof too large: {}", moof_size));
        }
        for traf in iter_box_mut!(moof.boxes, TrackFragmentBox) {
            let track_id = traf.track_fragment_header().map(|h| h.track_id).unwrap_or(0);
            let base = mdat_offsets
                .iter()
                .find(|(id, _)| *id == track_id)
                .map(|(_, off)| *off)
                .unwrap_or(0);
            for trun in iter_box_mut!(traf.boxes, TrackRunBox) {
                trun.data_offset = Some((moof_size + 8 + base) as i32);
            }
        }

        // Collect what the sidx needs.
        let samples = &self.builder.store.samples()[start..end];
        let mut earliest_pts = u64::MAX;
        let mut end_pts = 0u64;
        let mut first_sap_pts = None;
        for s in samples {
            let pts = (s.dts as i64 + s.cts_offset as i64).max(0) as u64;
            if s.is_sync && first_sap_pts.is_none() {
                first_sap_pts = Some(pts);
            }
            earliest_pts = earliest_pts.min(pts);
            end_pts = end_pts.max(s.dts + s.duration as u64);
        }

        // Emit moof + mdat.
        moof.to_bytes(out)?;
        let mdat = MediaDataBox {
            location: Some((0, mdat_size)),
            data:     Data(Vec::new()),
        };
        mdat.write_header(out)?;
        self.builder.store.copy_samples(&payload_indices, out)?;

        self.fragment_meta.push(FragmentMeta {
            bytes: moof_size + mdat.header_size() + mdat_size,
            earliest_pts,
            end_pts,
            starts_with_sap: first_sap_pts == Some(earliest_pts),
            sap_delta_time: match first_sap_pts {
                Some(sap) if sap > earliest_pts => (sap - earliest_pts) as u32,
                _ => 0,
            },
        });

        // Advance the per-track decode times.
        let mut durations: HashMap<u32, u64> = HashMap::new();
        for s in samples {
            *durations.entry(s.track_id).or_insert(0) += s.duration as u64;
        }
        for (track_id, duration) in durations {
            *self.bmdt.entry(track_id).or_insert(0) += duration;
        }
        self.flushed_upto = end;

        Ok(())
    }

    // The single sidx covering all flushed fragments.
    fn build_sidx(&self) -> io::Result<SegmentIndexBox> {
        let track = &self.builder.tracks[0];
        let sap_type = self
            .builder
            .config
            .sidx
            .as_ref()
            .map(|s| s.sap_type)
            .unwrap_or(1);

        let mut sidx = SegmentIndexBox::default();
        sidx.reference_id = track.id;
        sidx.timescale = track.config.media_timescale;
        sidx.earliest_presentation_time = VersionSizedUint(
            self.fragment_meta
                .iter()
                .map(|f| f.earliest_pts)
                .min()
                .unwrap_or(0),
        );
        sidx.first_offset = VersionSizedUint(0);

        for (idx, meta) in self.fragment_meta.iter().enumerate() {
            // The duration of a fragment runs up to the next
            // fragment's earliest time; the last one uses its own span.
            let subsegment_duration = match self.fragment_meta.get(idx + 1) {
                Some(next) => (next.earliest_pts - meta.earliest_pts) as u32,
                None => (meta.end_pts - meta.earliest_pts) as u32,
            };
            sidx.references.push(SegmentReference {
                reference_type: 0,
                referenced_size: meta.bytes as u32,
                subsegment_duration,
                starts_with_sap: meta.starts_with_sap,
                sap_type,
                sap_delta_time: meta.sap_delta_time,
            });
        }

        Ok(sidx)
    }
}

// Build one traf: tfhd defaults elected from the run, tfdt, the
// fragment-local sample groups, and the trun.
fn build_traf(
    track: &Track,
    samples: &[&MetaSample],
    base_media_decode_time: u64,
    force_tfdt_v1: bool,
) -> TrackFragmentBox {
    let mut traf = TrackFragmentBox::default();

    let first = samples[0];
    let flags_of = |s: &MetaSample| SampleFlags::from_sync(s.is_sync);
    let all_same_duration = samples.iter().all(|s| s.duration == first.duration);
    let all_same_size = samples.iter().all(|s| s.size == first.size);
    let all_same_flags = samples.iter().all(|s| s.is_sync == first.is_sync);
    // Everything after the first sample uniform: the classic
    // sync-sample-then-deltas pattern.
    let rest_uniform = samples.len() > 1
        && samples[1..].iter().all(|s| s.is_sync == samples[1].is_sync);

    let mut tfhd = TrackFragmentHeaderBox::default();
    tfhd.track_id = track.id;
    tfhd.default_base_is_moof = true;
    tfhd.sample_description_index = Some(1);
    if all_same_duration {
        tfhd.default_sample_duration = Some(first.duration);
    }
    if all_same_size {
        tfhd.default_sample_size = Some(first.size);
    }
    let mut first_sample_flags = None;
    if all_same_flags {
        tfhd.default_sample_flags = Some(flags_of(first));
    } else if rest_uniform {
        tfhd.default_sample_flags = Some(flags_of(samples[1]));
        first_sample_flags = Some(flags_of(first));
    }
    let per_sample_flags = tfhd.default_sample_flags.is_none();
    traf.boxes.push(tfhd.to_mp4box());

    let tfdt = TrackFragmentBaseMediaDecodeTimeBox {
        base_media_decode_time,
        force_v1: force_tfdt_v1,
    };
    traf.boxes.push(tfdt.to_mp4box());

    // Fragment-local sample groups, relative to the track default.
    if samples.iter().any(|s| s.group != SampleGroupInfo::None) {
        traf.boxes.extend(build_sample_groups(
            samples,
            &track.config.default_sample_group,
            0x10001,
        ));
    }

    // The trun: presence bits reflect what varies over the run.
    let any_cts = samples.iter().any(|s| s.cts_offset != 0);
    let mut trun = TrackRunBox {
        data_offset: Some(0),
        first_sample_flags,
        entries: ArrayUnsized::new(),
    };
    for s in samples {
        trun.entries.push(TrackRunEntry {
            sample_duration: if all_same_duration { None } else { Some(s.duration) },
            sample_size: if all_same_size { None } else { Some(s.size) },
            sample_flags: if per_sample_flags { Some(flags_of(s)) } else { None },
            sample_composition_time_offset: if any_cts { Some(s.cts_offset) } else { None },
        });
    }
    traf.boxes.push(trun.to_mp4box());

    traf
}

/// Writes a fragmented stream: init fragment plus a `moof`+`mdat`
/// pair per fragment, optionally indexed by a single `sidx`.
pub struct FragmentedMp4Writer<W: WriteBytes> {
    fragmenter:   Fragmenter,
    out:          W,
    spool:        Option<TempSpool>,
    init_written: bool,
}

impl FragmentedMp4Writer<FileWriter> {
    /// Fragmented file writer.
    pub fn create(path: impl AsRef<str>, config: MovieConfig) -> io::Result<Self> {
        FragmentedMp4Writer::new(FileWriter::create(path)?, config)
    }
}

impl FragmentedMp4Writer<MemBuffer> {
    /// Fragmented writer with in-memory output.
    pub fn new_memory(config: MovieConfig) -> io::Result<Self> {
        FragmentedMp4Writer::new(MemBuffer::new(), config)
    }

    /// Finalize and return the serialized stream.
    pub fn into_bytes(self) -> io::Result<Vec<u8>> {
        let out = self.close_inner()?;
        Ok(out.into_vec())
    }
}

impl<W: WriteBytes> FragmentedMp4Writer<W> {
    pub fn new(out: W, config: MovieConfig) -> io::Result<Self> {
        let spool = if config.sidx.is_some() {
            Some(TempSpool::new()?)
        } else {
            None
        };
        Ok(FragmentedMp4Writer {
            fragmenter: Fragmenter::new(config),
            out,
            spool,
            init_written: false,
        })
    }

    pub fn add_track(&mut self, config: TrackConfig) -> io::Result<u32> {
        if self.init_written {
            return Err(ioerr!(InvalidInput, "tracks must be added before samples"));
        }
        self.fragmenter.builder.add_track(config)
    }

    pub fn add_edit_list_entry(
        &mut self,
        track_id: u32,
        segment_duration: u64,
        media_time: i64,
        media_rate: u16,
    ) -> io::Result<()> {
        self.fragmenter
            .builder
            .add_edit_list_entry(track_id, segment_duration, media_time, media_rate)
    }

    pub fn add_user_data(&mut self, track_id: u32, data: &[u8]) -> io::Result<()> {
        self.fragmenter.builder.add_user_data(track_id, data)
    }

    /// Overwrite the accumulated base media decode time of a track
    /// (advanced use).
    pub fn overwrite_base_media_decode_time(&mut self, track_id: u32, value: u64) {
        self.fragmenter.overwrite_base_media_decode_time(track_id, value);
    }

    fn ensure_init(&mut self) -> io::Result<()> {
        if !self.init_written {
            self.fragmenter.write_init(&mut self.out)?;
            self.init_written = true;
        }
        Ok(())
    }

    /// Add a sample; `fragment_number` >= 1, non-decreasing. A new
    /// fragment number flushes the previous `moof`+`mdat` pair.
    pub fn add_sample(&mut self, track_id: u32, sample: &WriteSample) -> io::Result<()> {
        self.ensure_init()?;
        self.fragmenter.add_sample(track_id, sample)?;
        if self.fragmenter.has_complete_fragments() {
            match self.spool.as_mut() {
                Some(spool) => self.fragmenter.flush_pending(spool, true)?,
                None => self.fragmenter.flush_pending(&mut self.out, true)?,
            }
        }
        Ok(())
    }

    fn close_inner(mut self) -> io::Result<W> {
        self.ensure_init()?;
        if let Some(mut spool) = self.spool.take() {
            self.fragmenter.flush_pending(&mut spool, false)?;
            // The sidx goes between the init fragment and the
            // spooled fragments.
            let sidx = self.fragmenter.build_sidx()?;
            sidx.to_bytes(&mut self.out)?;
            spool.copy_to(&mut self.out)?;
        } else {
            self.fragmenter.flush_pending(&mut self.out, false)?;
        }
        Ok(self.out)
    }

    /// Flush the last fragment and finalize the stream.
    pub fn close(self) -> io::Result<()> {
        self.close_inner()?;
        Ok(())
    }
}

/// Writes a segmented stream: one init segment plus a media segment
/// per `write_media_segment` call, each starting with a `styp`. The
/// last segment advertises the "lmsg" brand.
pub struct FragmentedSegmentWriter {
    fragmenter: Fragmenter,
    have_init:  bool,
}

impl FragmentedSegmentWriter {
    pub fn new(config: MovieConfig) -> io::Result<FragmentedSegmentWriter> {
        if config.sidx.is_some() {
            return Err(ioerr!(InvalidInput, "sidx is not supported in segment mode"));
        }
        Ok(FragmentedSegmentWriter {
            fragmenter: Fragmenter::new(config),
            have_init:  false,
        })
    }

    pub fn add_track(&mut self, config: TrackConfig) -> io::Result<u32> {
        if self.have_init {
            return Err(ioerr!(InvalidInput, "tracks must be added before the init segment"));
        }
        self.fragmenter.builder.add_track(config)
    }

    pub fn add_edit_list_entry(
        &mut self,
        track_id: u32,
        segment_duration: u64,
        media_time: i64,
        media_rate: u16,
    ) -> io::Result<()> {
        self.fragmenter
            .builder
            .add_edit_list_entry(track_id, segment_duration, media_time, media_rate)
    }

    pub fn add_user_data(&mut self, track_id: u32, data: &[u8]) -> io::Result<()> {
        self.fragmenter.builder.add_user_data(track_id, data)
    }

    /// Write the init segment (`ftyp` + `moov`) to its own output.
    pub fn write_init_segment<W: WriteBytes>(&mut self, out: &mut W) -> io::Result<()> {
        self.fragmenter.write_init(out)?;
        self.have_init = true;
        Ok(())
    }

    /// Buffer a sample for the next media segment.
    pub fn add_sample(&mut self, track_id: u32, sample: &WriteSample) -> io::Result<()> {
        self.fragmenter.add_sample(track_id, sample)
    }

    /// Emit all buffered fragments as one media segment.
    pub fn write_media_segment<W: WriteBytes>(
        &mut self,
        out: &mut W,
        is_last_segment: bool,
    ) -> io::Result<()> {
        if !self.have_init {
            return Err(ioerr!(InvalidInput, "write the init segment first"));
        }
        if !self.fragmenter.has_pending() {
            return Err(ioerr!(InvalidInput, "media segment without samples"));
        }
        let ftyp = self.fragmenter.builder.file_type_box();
        SegmentTypeBox::from_file_type(&ftyp, is_last_segment).to_bytes(out)?;
        self.fragmenter.flush_pending(out, false)
    }
}
