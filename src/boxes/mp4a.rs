//
// ISO/IEC 14496-12:2015(E), 12.2.3 audio sample entry, and the
// ISO/IEC 14496-1 descriptors carried by the 'esds' box.
//
use std::io;

use crate::bitreader::BitReader;
use crate::boxes::prelude::*;
use crate::io::CountBytes;

def_box! {
    /// AAC sample entry (AudioSampleEntry).
    #[derive(Default)]
    AacSampleEntry {
        skip:                   6,
        data_reference_index:   u16,
        skip:                   8,
        // (mono = 1 ; stereo = 2)
        channel_count: u16,
        // audio sample number of bits 8 or 16
        sample_size: u16,
        skip:                   4,
        sample_rate_hi: u16,
        sample_rate_lo: u16,
        // sub boxes, probably only esds.
        boxes: Vec<MP4Box>,
    },
    fourcc => "mp4a",
    version => [],
    impls => [ basebox, boxinfo, debug, fromtobytes ],
}

impl AacSampleEntry {
    /// The ESDescriptorBox in this entry.
    pub fn esds(&self) -> Option<&ESDescriptorBox> {
        first_box!(&self.boxes, ESDescriptorBox)
    }

    /// The raw AudioSpecificConfig bytes.
    pub fn decoder_config(&self) -> Option<&[u8]> {
        self.esds()
            .map(|esds| &esds.es_descriptor.decoder_config.specific_info.data.0[..])
    }

    /// Sample rate, preferring the AudioSpecificConfig over the
    /// sample entry field.
    pub fn sample_rate(&self) -> u32 {
        if let Some(esds) = self.esds() {
            if let Some(audio) = esds.es_descriptor.decoder_config.specific_info.audio.as_ref() {
                if let Some(rate) = audio.sample_rate() {
                    return rate;
                }
            }
        }
        self.sample_rate_hi as u32
    }
}

// Every descriptor starts with a tag and a length.
#[derive(Clone, Debug)]
struct BaseDescriptor {
    size: u32,
    tag:  u8,
}

impl FromBytes for BaseDescriptor {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<BaseDescriptor> {
        let tag = u8::from_bytes(stream)?;
        let size = read_descriptor_size(stream)?;
        Ok(BaseDescriptor { size, tag })
    }

    fn min_size() -> usize {
        0
    }
}

impl ToBytes for BaseDescriptor {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        self.tag.to_bytes(stream)?;
        write_descriptor_size(stream, self.size)
    }
}

/// Read the expandable size field: 7 bits per byte, high bit is the
/// continuation flag, at most 4 bytes.
pub(crate) fn read_descriptor_size<R: ReadBytes>(stream: &mut R) -> io::Result<u32> {
    let mut size = 0;
    for i in 1..=4 {
        let b = u8::from_bytes(stream)?;
        size = (size << 7) | ((b & 0x7f) as u32);
        if b & 0x80 == 0 {
            break;
        }
        if i == 4 {
            return Err(ioerr!(InvalidData, "descriptor: length field > 4 bytes"));
        }
    }
    Ok(size)
}

/// Write the size in the fixed 4-byte spelling of the expandable
/// format, so that a descriptor's size does not depend on its content.
pub(crate) fn write_descriptor_size<W: WriteBytes>(stream: &mut W, size: u32) -> io::Result<()> {
    if size >= 1 << 28 {
        return Err(ioerr!(InvalidData, "descriptor: length does not fit in 28 bits"));
    }
    let mut buf = [0u8; 4];
    let mut size = size;
    for idx in (0..=3).rev() {
        let mut b = (size & 0x7f) as u8;
        size >>= 7;
        if idx != 3 {
            b |= 0x80;
        }
        buf[idx] = b;
    }
    stream.write(&buf[..])
}

// Stream Descriptors. We implement:
const ESDESCRIPTOR_TAG: u8 = 0x03;
const DECODER_CONFIG_DESCRIPTOR_TAG: u8 = 0x04;
const DECODER_SPECIFIC_INFO_TAG: u8 = 0x05;
const SLCONFIG_DESCRIPTOR_TAG: u8 = 0x06;

def_box! {
    /// MPEG4 ESDescriptor box.
    #[derive(Default)]
    ESDescriptorBox {
        es_descriptor:   ESDescriptor,
    },
    fourcc => "esds",
    version => [0],
    impls => [ boxinfo, debug, fromtobytes, fullbox ],
}

/// Elementary Stream Descriptor, tag 0x03.
///
/// In an MP4 file, depends_on_es_id, url, and ocr_es_id are always None.
#[derive(Clone, Debug, Default)]
pub struct ESDescriptor {
    // lower 16 bits of Track Id, or 0.
    pub es_id:            u16,
    pub stream_priority:  u8,
    pub depends_on_es_id: Option<u16>,
    pub url:              Option<PString>,
    pub ocr_es_id:        Option<u16>,
    pub decoder_config:   DecoderConfigDescriptor,
    pub sl_config:        SLConfigDescriptor,
}

impl FromBytes for ESDescriptor {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<ESDescriptor> {
        let base = BaseDescriptor::from_bytes(stream)?;
        if base.tag != ESDESCRIPTOR_TAG {
            return Err(ioerr!(InvalidData, "esds: expected ES descriptor, got tag {}", base.tag));
        }
        let es_id = u16::from_bytes(stream)?;
        let flags = u8::from_bytes(stream)?;
        let stream_priority = flags & 0x1f;
        let depends_on_es_id = if flags & 0x80 > 0 {
            Some(u16::from_bytes(stream)?)
        } else {
            None
        };
        let url = if flags & 0x40 > 0 {
            Some(PString::from_bytes(stream)?)
        } else {
            None
        };
        let ocr_es_id = if flags & 0x20 > 0 {
            Some(u16::from_bytes(stream)?)
        } else {
            None
        };
        let decoder_config = DecoderConfigDescriptor::from_bytes(stream)?;
        let sl_config = SLConfigDescriptor::from_bytes(stream)?;

        Ok(ESDescriptor {
            es_id,
            stream_priority,
            depends_on_es_id,
            url,
            ocr_es_id,
            decoder_config,
            sl_config,
        })
    }
    fn min_size() -> usize {
        0
    }
}

impl ESDescriptor {
    fn to_bytes_partial<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        self.es_id.to_bytes(stream)?;
        let flags: u8 = self.depends_on_es_id.as_ref().map(|_| 0x80).unwrap_or(0)
            | self.url.as_ref().map(|_| 0x40).unwrap_or(0)
            | self.ocr_es_id.as_ref().map(|_| 0x20).unwrap_or(0)
            | self.stream_priority;
        flags.to_bytes(stream)?;
        if let Some(ref x) = self.depends_on_es_id {
            x.to_bytes(stream)?;
        }
        if let Some(ref x) = self.url {
            x.to_bytes(stream)?;
        }
        if let Some(ref x) = self.ocr_es_id {
            x.to_bytes(stream)?;
        }
        self.decoder_config.to_bytes(stream)?;
        self.sl_config.to_bytes(stream)
    }
}

impl ToBytes for ESDescriptor {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        let mut cnt = CountBytes::new();
        self.to_bytes_partial(&mut cnt)?;

        let base = BaseDescriptor {
            tag:  ESDESCRIPTOR_TAG,
            size: cnt.size() as u32,
        };
        base.to_bytes(stream)?;
        self.to_bytes_partial(stream)
    }
}

/// Decoder config, tag 0x04.
///
/// stream_type:
///   0x05 Audio
///
/// object_type:
///   0x40 Audio ISO/IEC 14496-3
///   0x66..0x6b the mpeg2 audio family.
#[derive(Clone, Debug, Default)]
pub struct DecoderConfigDescriptor {
    pub object_type:   u8,
    pub stream_type:   u8,
    pub upstream:      bool,
    pub buffer_size:   u32,
    pub max_bitrate:   u32,
    pub avg_bitrate:   u32,
    pub specific_info: DecoderSpecificInfo,
}

impl FromBytes for DecoderConfigDescriptor {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<DecoderConfigDescriptor> {
        let base = BaseDescriptor::from_bytes(stream)?;
        if base.tag != DECODER_CONFIG_DESCRIPTOR_TAG {
            return Err(ioerr!(InvalidData, "esds: expected DecoderConfig, got tag {}", base.tag));
        }
        let object_type = u8::from_bytes(stream)?;
        let b = u32::from_bytes(stream)?;
        let b1 = ((b & 0xff000000) >> 24) as u8;
        let stream_type = b1 >> 2;
        let upstream = (b1 & 0x02) > 0;
        let buffer_size = b & 0x00ffffff;
        let max_bitrate = u32::from_bytes(stream)?;
        let avg_bitrate = u32::from_bytes(stream)?;
        let specific_info = DecoderSpecificInfo::from_bytes(stream, object_type)?;
        Ok(DecoderConfigDescriptor {
            object_type,
            stream_type,
            upstream,
            buffer_size,
            max_bitrate,
            avg_bitrate,
            specific_info,
        })
    }
    fn min_size() -> usize {
        0
    }
}

impl DecoderConfigDescriptor {
    fn to_bytes_partial<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        self.object_type.to_bytes(stream)?;
        let b = (self.stream_type << 2) | ((self.upstream as u8) << 1) | 0x01;
        let c = self.buffer_size | ((b as u32) << 24);
        c.to_bytes(stream)?;
        self.max_bitrate.to_bytes(stream)?;
        self.avg_bitrate.to_bytes(stream)?;
        self.specific_info.to_bytes(stream)
    }
}

impl ToBytes for DecoderConfigDescriptor {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        let mut cnt = CountBytes::new();
        self.to_bytes_partial(&mut cnt)?;

        let base = BaseDescriptor {
            tag:  DECODER_CONFIG_DESCRIPTOR_TAG,
            size: cnt.size() as u32,
        };
        base.to_bytes(stream)?;
        self.to_bytes_partial(stream)
    }
}

/// Decoder specific info, tag 0x05. The raw bytes are the
/// AudioSpecificConfig; for mpeg4 audio a parsed view is kept as well.
#[derive(Clone, Debug, Default)]
pub struct DecoderSpecificInfo {
    pub data:  Data,
    pub audio: Option<AudioSpecificConfig>,
}

/// For mp4a.40.<profile>.
///
/// Common profiles:
/// 2:  AAC-LC
/// 5:  HE-AAC   (AAC-LC + SBR)
/// 29: HE-AACv2 (AAC-LC + SBR + PS)
#[derive(Clone, Debug, Default)]
pub struct AudioSpecificConfig {
    pub profile:                  u8,
    pub sampling_frequency_index: u8,
    pub sampling_frequency:       u32,
    pub channel_config:           u8,
}

impl AudioSpecificConfig {
    pub fn sample_rate(&self) -> Option<u32> {
        const RATES: [u32; 12] = [
            96000, 88200, 64000, 48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000,
        ];
        if (self.sampling_frequency_index as usize) < RATES.len() {
            return Some(RATES[self.sampling_frequency_index as usize]);
        }
        if self.sampling_frequency_index == 0xf && self.sampling_frequency > 0 {
            return Some(self.sampling_frequency);
        }
        None
    }
}

impl DecoderSpecificInfo {
    fn from_bytes<R: ReadBytes>(stream: &mut R, object_type: u8) -> io::Result<DecoderSpecificInfo> {
        let base = BaseDescriptor::from_bytes(stream)?;
        if base.tag != DECODER_SPECIFIC_INFO_TAG {
            return Err(ioerr!(InvalidData, "esds: expected DecoderSpecificInfo, got tag {}", base.tag));
        }

        let data = Data::read(stream, base.size as usize)?;

        let audio = if object_type == 0x40 && data.len() >= 2 {
            let mut b = BitReader::new(&data.0);

            let mut profile = b.read_bits(5)? as u8;
            if profile == 31 {
                profile = 32 + b.read_bits(6)? as u8;
            }
            let sampling_frequency_index = b.read_bits(4)? as u8;
            let mut sampling_frequency = 0;
            if sampling_frequency_index == 0xf {
                sampling_frequency = b.read_bits(24)?;
            }
            let channel_config = b.read_bits(4)? as u8;

            Some(AudioSpecificConfig {
                profile,
                sampling_frequency_index,
                sampling_frequency,
                channel_config,
            })
        } else {
            None
        };

        Ok(DecoderSpecificInfo { data, audio })
    }

    /// Build from raw AudioSpecificConfig bytes.
    pub fn from_asc(asc: Vec<u8>) -> DecoderSpecificInfo {
        let data = Data(asc);
        let audio = if data.len() >= 2 {
            let mut b = BitReader::new(&data.0);
            let profile = b.read_bits(5).unwrap_or(0) as u8;
            let sampling_frequency_index = b.read_bits(4).unwrap_or(0) as u8;
            let mut sampling_frequency = 0;
            if sampling_frequency_index == 0xf {
                sampling_frequency = b.read_bits(24).unwrap_or(0);
            }
            let channel_config = b.read_bits(4).unwrap_or(0) as u8;
            Some(AudioSpecificConfig {
                profile,
                sampling_frequency_index,
                sampling_frequency,
                channel_config,
            })
        } else {
            None
        };
        DecoderSpecificInfo { data, audio }
    }
}

impl ToBytes for DecoderSpecificInfo {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        let base = BaseDescriptor {
            tag:  DECODER_SPECIFIC_INFO_TAG,
            size: self.data.len() as u32,
        };
        base.to_bytes(stream)?;
        self.data.to_bytes(stream)
    }
}

/// SL config, tag 0x06. For MP4 files this is always config_type 2.
#[derive(Clone, Debug)]
pub struct SLConfigDescriptor {
    pub config_type: u8,
    pub data:        Data,
}

impl Default for SLConfigDescriptor {
    fn default() -> SLConfigDescriptor {
        SLConfigDescriptor {
            config_type: 2,
            data:        Data::default(),
        }
    }
}

impl FromBytes for SLConfigDescriptor {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<SLConfigDescriptor> {
        let base = BaseDescriptor::from_bytes(stream)?;
        if base.tag != SLCONFIG_DESCRIPTOR_TAG {
            return Err(ioerr!(InvalidData, "esds: expected SLConfig, got tag {}", base.tag));
        }

        let config_type = u8::from_bytes(stream)?;
        let data = if base.size > 1 {
            Data::read(stream, (base.size - 1) as usize)?
        } else {
            Data::default()
        };

        Ok(SLConfigDescriptor { config_type, data })
    }
    fn min_size() -> usize {
        0
    }
}

impl ToBytes for SLConfigDescriptor {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        let base = BaseDescriptor {
            tag:  SLCONFIG_DESCRIPTOR_TAG,
            size: 1 + self.data.len() as u32,
        };
        base.to_bytes(stream)?;
        self.config_type.to_bytes(stream)?;
        self.data.to_bytes(stream)
    }
}
