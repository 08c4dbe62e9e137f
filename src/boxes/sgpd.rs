use std::io;

use crate::boxes::prelude::*;

/// 8.9.3 Sample Group Description Box (ISO/IEC 14496-12:2015(E))
///
/// Always paired with the SampleToGroupBox of the same grouping_type.
#[derive(Clone, Debug)]
pub struct SampleGroupDescriptionBox {
    pub grouping_type:  FourCC,
    pub default_length: Option<u32>,
    pub default_sample_description_index: Option<u32>,
    pub entries:        ArrayUnsized<SampleGroupDescriptionItem>,
}

impl SampleGroupDescriptionBox {
    pub fn new(grouping_type: FourCC) -> SampleGroupDescriptionBox {
        SampleGroupDescriptionBox {
            grouping_type,
            default_length: None,
            default_sample_description_index: None,
            entries: ArrayUnsized::new(),
        }
    }
}

impl FromBytes for SampleGroupDescriptionBox {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<SampleGroupDescriptionBox> {
        let mut reader = BoxReader::new(stream)?;
        let stream = &mut reader;

        let version = stream.version();

        let grouping_type = FourCC::from_bytes(stream)?;
        let default_length = if version == 1 {
            Some(u32::from_bytes(stream)?)
        } else {
            None
        };
        let default_sample_description_index = if version >= 2 {
            Some(u32::from_bytes(stream)?)
        } else {
            None
        };

        let num_entries = u32::from_bytes(stream)? as usize;
        let mut entries = ArrayUnsized::new();
        while entries.len() < num_entries && stream.left() > 0 {
            let entry = SampleGroupDescriptionItem::from_bytes(stream, grouping_type, default_length)?;
            entries.push(entry);
        }

        Ok(SampleGroupDescriptionBox {
            grouping_type,
            default_length,
            default_sample_description_index,
            entries,
        })
    }

    fn min_size() -> usize {
        8
    }
}

impl ToBytes for SampleGroupDescriptionBox {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        let mut writer = BoxWriter::new(stream, self)?;
        let stream = &mut writer;

        let version = stream.version();

        self.grouping_type.to_bytes(stream)?;
        if version == 1 {
            self.default_length.unwrap_or(0).to_bytes(stream)?;
        }
        if version >= 2 {
            self.default_sample_description_index.unwrap_or(0).to_bytes(stream)?;
        }

        (self.entries.len() as u32).to_bytes(stream)?;
        for e in &self.entries {
            e.to_bytes(stream, self.default_length)?;
        }

        stream.finalize()
    }
}

impl FullBox for SampleGroupDescriptionBox {
    fn version(&self) -> Option<u8> {
        if self.default_sample_description_index.is_some() {
            return Some(2);
        }
        if self.default_length.is_some() {
            return Some(1);
        }
        Some(0)
    }
}

impl BoxInfo for SampleGroupDescriptionBox {
    const FOURCC: &'static str = "sgpd";

    #[inline]
    fn fourcc(&self) -> FourCC {
        FourCC::new("sgpd")
    }
    #[inline]
    fn max_version() -> Option<u8> {
        Some(2)
    }
}

/// One description entry, with its length prefix when lengths vary.
#[derive(Clone, Debug)]
pub struct SampleGroupDescriptionItem {
    pub description_length: Option<u32>,
    pub entry: SampleGroupDescriptionEntry,
}

impl SampleGroupDescriptionItem {
    pub fn new(entry: SampleGroupDescriptionEntry) -> SampleGroupDescriptionItem {
        SampleGroupDescriptionItem {
            description_length: None,
            entry,
        }
    }

    fn from_bytes<R: ReadBytes>(
        stream: &mut R,
        grouping_type: FourCC,
        default_length: Option<u32>,
    ) -> io::Result<SampleGroupDescriptionItem> {
        let mut description_length = None;
        if stream.version() == 1 && default_length.unwrap_or(0) == 0 {
            description_length = Some(u32::from_bytes(stream)?);
        }
        let entry = SampleGroupDescriptionEntry::from_bytes(stream, grouping_type)?;
        Ok(SampleGroupDescriptionItem {
            description_length,
            entry,
        })
    }

    fn to_bytes<W: WriteBytes>(&self, stream: &mut W, default_length: Option<u32>) -> io::Result<()> {
        if stream.version() == 1 && default_length.unwrap_or(0) == 0 {
            self.description_length.unwrap_or(0).to_bytes(stream)?;
        }
        self.entry.to_bytes(stream)
    }
}

/// Generic (i.e. unrecognized) sample group entry.
#[derive(Clone, Debug)]
pub struct GenericSampleGroupEntry {
    pub data: Data,
}

impl GenericSampleGroupEntry {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<GenericSampleGroupEntry> {
        let data = Data::from_bytes(stream)?;
        Ok(GenericSampleGroupEntry { data })
    }
}

impl ToBytes for GenericSampleGroupEntry {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        self.data.to_bytes(stream)
    }
}

macro_rules! sample_group_description_entries {
    ($($fourcc:expr => $name:ident,)*) => {

        #[derive(Clone, Debug)]
        pub enum SampleGroupDescriptionEntry {
            $(
                $name($name),
            )*
            GenericSampleGroupEntry(GenericSampleGroupEntry),
        }

        impl SampleGroupDescriptionEntry {
            fn from_bytes<R: ReadBytes>(stream: &mut R, grouping_type: FourCC) -> io::Result<SampleGroupDescriptionEntry> {
                let b = grouping_type.to_be_bytes();
                let e = match &b {
                    $(
                        $fourcc => {
                            SampleGroupDescriptionEntry::$name($name::from_bytes(stream)?)
                        },
                    )*
                    _ => SampleGroupDescriptionEntry::GenericSampleGroupEntry(GenericSampleGroupEntry::from_bytes(stream)?),
                };
                Ok(e)
            }
        }

        impl ToBytes for SampleGroupDescriptionEntry {
            fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
                match self {
                    $(
                        &SampleGroupDescriptionEntry::$name(ref b) => b.to_bytes(stream),
                    )*
                    &SampleGroupDescriptionEntry::GenericSampleGroupEntry(ref b) => b.to_bytes(stream),
                }
            }
        }
    };
}

sample_group_description_entries! {
    b"roll" => RollRecoveryEntry,
    b"prol" => AudioPreRollEntry,
    b"sap " => SapEntry,
}

def_struct! {
    /// AudioRollRecoveryEntry or VisualRollRecoveryEntry
    #[derive(Default)]
    RollRecoveryEntry,
        roll_distance: i16,
}

def_struct! {
    /// AudioPreRollEntry, same layout as the roll entry.
    #[derive(Default)]
    AudioPreRollEntry,
        roll_distance: i16,
}

/// SAPEntry (ISO/IEC 14496-12, "sap " grouping).
#[derive(Clone, Debug, Default)]
pub struct SapEntry {
    pub dependent_flag: bool,
    pub sap_type:       u8,
}

impl FromBytes for SapEntry {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<SapEntry> {
        let b = u8::from_bytes(stream)?;
        Ok(SapEntry {
            dependent_flag: b & 0x80 > 0,
            sap_type:       b & 0x0f,
        })
    }
    fn min_size() -> usize {
        1
    }
}

impl ToBytes for SapEntry {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        let b = ((self.dependent_flag as u8) << 7) | (self.sap_type & 0x0f);
        b.to_bytes(stream)
    }
}
