//
// ISO/IEC 23008-1, MMT Processing Unit box.
//
use std::io;

use crate::boxes::prelude::*;

/// MMT Processing Unit box ('mmpu', ISO/IEC 23008-1).
#[derive(Clone, Debug, Default)]
pub struct MediaProcessingUnitBox {
    pub is_complete:         bool,
    pub is_adc_present:      bool,
    pub mpu_sequence_number: u32,
    pub asset_id_scheme:     FourCC,
    pub asset_id_value:      Data,
}

impl FromBytes for MediaProcessingUnitBox {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<MediaProcessingUnitBox> {
        let mut reader = BoxReader::new(stream)?;
        let stream = &mut reader;

        let b = u8::from_bytes(stream)?;
        let is_complete = b & 0x80 > 0;
        let is_adc_present = b & 0x20 > 0;
        let mpu_sequence_number = u32::from_bytes(stream)?;

        // Embedded AssetIdentifier: scheme, length, value.
        let asset_id_scheme = FourCC::from_bytes(stream)?;
        let asset_id_length = u32::from_bytes(stream)?;
        let asset_id_value = Data::read(stream, asset_id_length as usize)?;

        Ok(MediaProcessingUnitBox {
            is_complete,
            is_adc_present,
            mpu_sequence_number,
            asset_id_scheme,
            asset_id_value,
        })
    }

    fn min_size() -> usize {
        13
    }
}

impl ToBytes for MediaProcessingUnitBox {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        let mut writer = BoxWriter::new(stream, self)?;
        let stream = &mut writer;

        let b = ((self.is_complete as u8) << 7) | ((self.is_adc_present as u8) << 5);
        b.to_bytes(stream)?;
        self.mpu_sequence_number.to_bytes(stream)?;
        self.asset_id_scheme.to_bytes(stream)?;
        (self.asset_id_value.len() as u32).to_bytes(stream)?;
        self.asset_id_value.to_bytes(stream)?;

        stream.finalize()
    }
}

impl BoxInfo for MediaProcessingUnitBox {
    const FOURCC: &'static str = "mmpu";

    #[inline]
    fn fourcc(&self) -> FourCC {
        FourCC::new("mmpu")
    }
    #[inline]
    fn max_version() -> Option<u8> {
        Some(0)
    }
}

impl FullBox for MediaProcessingUnitBox {
    fn version(&self) -> Option<u8> {
        Some(0)
    }
}
