use crate::boxes::prelude::*;

def_box! {
    /// 8.7.1 Data Information Box (ISO/IEC 14496-12:2015(E))
    DataInformationBox {
        boxes:      Vec<MP4Box>,
    },
    fourcc => "dinf",
    version => [],
    impls => [ basebox, boxinfo, debug, fromtobytes ],
}

impl Default for DataInformationBox {
    /// An all-in-this-file data reference.
    fn default() -> DataInformationBox {
        DataInformationBox {
            boxes: vec![DataReferenceBox::default().to_mp4box()],
        }
    }
}

def_box! {
    /// 8.7.2 Data Reference Box (ISO/IEC 14496-12:2015(E))
    DataReferenceBox {
        entries:    ArraySized32<MP4Box>,
    },
    fourcc => "dref",
    version => [0],
    impls => [ boxinfo, debug, fromtobytes, fullbox ],
}

impl Default for DataReferenceBox {
    fn default() -> DataReferenceBox {
        let mut entries = ArraySized32::new();
        entries.push(DataEntryUrlBox::default().to_mp4box());
        DataReferenceBox { entries }
    }
}

def_box! {
    /// 8.7.2 Data Entry Url Box (ISO/IEC 14496-12:2015(E))
    DataEntryUrlBox {
        flags:      Flags,
        location:   ZString,
    },
    fourcc => "url ",
    version => [0, flags],
    impls => [ boxinfo, debug, fullbox ],
}

impl Default for DataEntryUrlBox {
    fn default() -> DataEntryUrlBox {
        // flag 0x01: media data is in the same file.
        DataEntryUrlBox {
            flags:    Flags(0x01),
            location: ZString::default(),
        }
    }
}

impl FromBytes for DataEntryUrlBox {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> std::io::Result<DataEntryUrlBox> {
        let mut reader = BoxReader::new(stream)?;
        let stream = &mut reader;
        let flags = Flags(stream.flags());
        // No location string when the data is self-contained.
        let location = if stream.left() > 0 {
            ZString::from_bytes(stream)?
        } else {
            ZString::default()
        };
        Ok(DataEntryUrlBox { flags, location })
    }
    fn min_size() -> usize {
        0
    }
}

impl ToBytes for DataEntryUrlBox {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> std::io::Result<()> {
        let mut writer = BoxWriter::new(stream, self)?;
        let stream = &mut writer;
        if self.flags.0 & 0x01 == 0 {
            self.location.to_bytes(stream)?;
        }
        stream.finalize()
    }
}
