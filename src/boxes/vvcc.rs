//! VVC decoder configuration.
//!
use std::collections::BTreeMap;
use std::io;

use crate::bitreader::{BitReader, BitWriter};
use crate::boxes::prelude::*;

def_box! {
    /// VvcConfigurationBox (ISO/IEC 14496-15, 11.3.2)
    #[derive(Default)]
    VvcConfigurationBox {
        record: VvcDecoderConfigRecord,
    },
    fourcc => "vvcC",
    version => [0],
    impls => [ boxinfo, debug, fromtobytes, fullbox ],
}

/// NALU types allowed in the config record
/// (ISO/IEC 14496-15, 11.2.4.2.2): OPI, DCI, VPS, SPS, PPS,
/// prefix APS, prefix SEI.
pub const ALLOWED_VVC_NALU_TYPES: [u8; 7] = [12, 13, 14, 15, 16, 17, 23];

const OPI_NUT: u8 = 12;
const DCI_NUT: u8 = 13;

/// A run of non-VCL NALUs of one type in the config record.
#[derive(Clone, Debug, Default)]
pub struct VvcNaluArray {
    pub array_completeness: bool,
    pub nalu_type:          u8,
    pub nalus:              Vec<Vec<u8>>,
}

/// VvcPTLRecord (ISO/IEC 14496-15, 11.2.4.1).
#[derive(Clone, Debug, Default)]
pub struct VvcPtlRecord {
    pub general_profile_idc:           u8,
    pub general_tier_flag:             bool,
    pub general_level_idc:             u8,
    pub ptl_frame_only_constraint_flag: bool,
    pub ptl_multilayer_enabled_flag:   bool,
    /// The general_constraint_info() bits (ISO/IEC 23090-3, 7.3.3.2),
    /// MSB-first, zero-filled to a byte boundary.
    pub general_constraint_info:       Vec<u8>,
    /// Byte count as carried in the record. Zero means: compute it
    /// from the gci_present_flag chain when serializing.
    pub num_bytes_constraint_info:     u8,
    /// Sublayer index to sublayer_level_idc; not every sublayer has
    /// an explicit entry.
    pub sublayer_level_idcs:           BTreeMap<u8, u8>,
    pub general_sub_profile_idcs:      Vec<u32>,
}

/// The PTL part of the config record, present when ptl_present_flag
/// is set.
#[derive(Clone, Debug, Default)]
pub struct VvcPtl {
    pub ols_idx:             u16,
    pub num_sublayers:       u8,
    pub constant_frame_rate: u8,
    pub chroma_format_idc:   u8,
    pub bit_depth_minus8:    u8,
    pub native_ptl:          VvcPtlRecord,
    pub max_picture_width:   u16,
    pub max_picture_height:  u16,
    pub avg_frame_rate:      u16,
}

/// VVC Decoder Configuration Record (ISO/IEC 14496-15, 11.2.4.2).
#[derive(Clone, Debug, Default)]
pub struct VvcDecoderConfigRecord {
    pub length_size_minus_one: u8,
    pub ptl:                   Option<VvcPtl>,
    pub non_vcl_arrays:        Vec<VvcNaluArray>,
}

/// Walk the gci_present_flag chain of a general_constraint_info()
/// structure and return its length in bits, before byte alignment
/// (ISO/IEC 23090-3, 7.3.3.2).
pub fn gci_bit_length(data: &[u8]) -> io::Result<u32> {
    if data.is_empty() {
        return Ok(0);
    }
    let mut b = BitReader::new(data);
    let gci_present_flag = b.read_bit()?;
    if !gci_present_flag {
        return Ok(1);
    }
    // 71 fixed constraint flags, then gci_num_additional_bits.
    if b.left() < 71 + 8 {
        return Err(ioerr!(InvalidData, "general_constraint_info: truncated"));
    }
    b.pos += 71;
    let additional = b.read_bits(8)?;
    Ok(1 + 71 + 8 + additional)
}

impl VvcPtlRecord {
    fn parse(b: &mut BitReader, num_sublayers: u8) -> io::Result<VvcPtlRecord> {
        // reserved(2) + num_bytes_constraint_info(6).
        b.read_bits(2)?;
        let num_bytes_constraint_info = b.read_bits(6)? as usize;
        let general_profile_idc = b.read_bits(7)? as u8;
        let general_tier_flag = b.read_bit()?;
        let general_level_idc = b.read_bits(8)? as u8;
        let ptl_frame_only_constraint_flag = b.read_bit()?;
        let ptl_multilayer_enabled_flag = b.read_bit()?;

        if num_bytes_constraint_info == 0 {
            return Err(ioerr!(InvalidData, "vvcC: num_bytes_constraint_info is zero"));
        }
        let gci_bits = 8 * num_bytes_constraint_info - 2;
        let mut general_constraint_info = Vec::new();
        let mut left = gci_bits;
        while left > 0 {
            let n = std::cmp::min(left, 8);
            let bits = b.read_bits(n as u8)?;
            general_constraint_info.push((bits << (8 - n)) as u8);
            left -= n;
        }

        let mut present = Vec::new();
        if num_sublayers > 1 {
            for _ in 0..(num_sublayers - 1) {
                present.push(b.read_bit()?);
            }
            for _ in num_sublayers..=8 {
                b.read_bit()?;
            }
        }
        let mut sublayer_level_idcs = BTreeMap::new();
        if num_sublayers > 1 {
            // present[] is stored high-to-low: i = num_sublayers-2 .. 0.
            for (n, &is_present) in present.iter().enumerate() {
                let idx = num_sublayers - 2 - n as u8;
                if is_present {
                    sublayer_level_idcs.insert(idx, b.read_bits(8)? as u8);
                }
            }
        }

        let ptl_num_sub_profiles = b.read_bits(8)? as usize;
        let mut general_sub_profile_idcs = Vec::new();
        for _ in 0..ptl_num_sub_profiles {
            general_sub_profile_idcs.push(b.read_bits(32)?);
        }

        Ok(VvcPtlRecord {
            general_profile_idc,
            general_tier_flag,
            general_level_idc,
            ptl_frame_only_constraint_flag,
            ptl_multilayer_enabled_flag,
            general_constraint_info,
            num_bytes_constraint_info: num_bytes_constraint_info as u8,
            sublayer_level_idcs,
            general_sub_profile_idcs,
        })
    }

    fn write(&self, b: &mut BitWriter, num_sublayers: u8) -> io::Result<()> {
        // The constraint info plus the two ptl flags fill
        // num_bytes_constraint_info bytes.
        let num_bytes_constraint_info = if self.num_bytes_constraint_info > 0 {
            self.num_bytes_constraint_info as usize
        } else {
            let gci_bits = gci_bit_length(&self.general_constraint_info)?;
            ((gci_bits + 7) / 8) as usize + 1
        };
        if num_bytes_constraint_info > 0x3f {
            return Err(ioerr!(InvalidData, "vvcC: general_constraint_info too large"));
        }

        b.write_bits(0, 2);
        b.write_bits(num_bytes_constraint_info as u32, 6);
        b.write_bits(self.general_profile_idc as u32, 7);
        b.write_bit(self.general_tier_flag);
        b.write_bits(self.general_level_idc as u32, 8);
        b.write_bit(self.ptl_frame_only_constraint_flag);
        b.write_bit(self.ptl_multilayer_enabled_flag);

        let mut left = 8 * num_bytes_constraint_info - 2;
        let mut reader = BitReader::new(&self.general_constraint_info);
        while left > 0 && reader.left() > 0 {
            b.write_bit(reader.read_bit()?);
            left -= 1;
        }
        while left > 0 {
            b.write_bit(false);
            left -= 1;
        }

        if num_sublayers > 1 {
            for n in 0..(num_sublayers - 1) {
                let idx = num_sublayers - 2 - n;
                b.write_bit(self.sublayer_level_idcs.contains_key(&idx));
            }
            for _ in num_sublayers..=8 {
                b.write_bit(false);
            }
            for n in 0..(num_sublayers - 1) {
                let idx = num_sublayers - 2 - n;
                if let Some(&idc) = self.sublayer_level_idcs.get(&idx) {
                    b.write_bits(idc as u32, 8);
                }
            }
        }

        b.write_bits(self.general_sub_profile_idcs.len() as u32, 8);
        for &idc in &self.general_sub_profile_idcs {
            b.write_bits(idc, 32);
        }
        Ok(())
    }
}

impl VvcDecoderConfigRecord {
    /// Parse from the raw record bytes.
    pub fn parse(raw: &[u8]) -> io::Result<VvcDecoderConfigRecord> {
        let mut b = BitReader::new(raw);

        b.read_bits(5)?;
        let length_size_minus_one = b.read_bits(2)? as u8;
        let ptl_present_flag = b.read_bit()?;

        let ptl = if ptl_present_flag {
            let ols_idx = b.read_bits(9)? as u16;
            let num_sublayers = b.read_bits(3)? as u8;
            let constant_frame_rate = b.read_bits(2)? as u8;
            let chroma_format_idc = b.read_bits(2)? as u8;
            let bit_depth_minus8 = b.read_bits(3)? as u8;
            b.read_bits(5)?;
            let native_ptl = VvcPtlRecord::parse(&mut b, num_sublayers)?;
            let max_picture_width = b.read_bits(16)? as u16;
            let max_picture_height = b.read_bits(16)? as u16;
            let avg_frame_rate = b.read_bits(16)? as u16;
            Some(VvcPtl {
                ols_idx,
                num_sublayers,
                constant_frame_rate,
                chroma_format_idc,
                bit_depth_minus8,
                native_ptl,
                max_picture_width,
                max_picture_height,
                avg_frame_rate,
            })
        } else {
            None
        };

        let num_of_arrays = b.read_bits(8)? as usize;
        let mut non_vcl_arrays = Vec::new();
        for _ in 0..num_of_arrays {
            let array_completeness = b.read_bit()?;
            b.read_bits(2)?;
            let nalu_type = b.read_bits(5)? as u8;
            if !ALLOWED_VVC_NALU_TYPES.contains(&nalu_type) {
                return Err(ioerr!(InvalidData, "vvcC: NALU type {} not allowed", nalu_type));
            }
            let num_nalus = if nalu_type != DCI_NUT && nalu_type != OPI_NUT {
                b.read_bits(16)? as usize
            } else {
                1
            };
            let mut nalus = Vec::new();
            for _ in 0..num_nalus {
                let len = b.read_bits(16)? as usize;
                let mut nalu = Vec::with_capacity(len);
                for _ in 0..len {
                    nalu.push(b.read_bits(8)? as u8);
                }
                nalus.push(nalu);
            }
            non_vcl_arrays.push(VvcNaluArray {
                array_completeness,
                nalu_type,
                nalus,
            });
        }

        Ok(VvcDecoderConfigRecord {
            length_size_minus_one,
            ptl,
            non_vcl_arrays,
        })
    }

    /// Serialize the record.
    pub fn write_record(&self) -> io::Result<Vec<u8>> {
        let mut b = BitWriter::new();

        b.write_bits(0x1f, 5);
        b.write_bits(self.length_size_minus_one as u32, 2);
        b.write_bit(self.ptl.is_some());

        if let Some(ptl) = self.ptl.as_ref() {
            b.write_bits(ptl.ols_idx as u32, 9);
            b.write_bits(ptl.num_sublayers as u32, 3);
            b.write_bits(ptl.constant_frame_rate as u32, 2);
            b.write_bits(ptl.chroma_format_idc as u32, 2);
            b.write_bits(ptl.bit_depth_minus8 as u32, 3);
            b.write_bits(0x1f, 5);
            ptl.native_ptl.write(&mut b, ptl.num_sublayers)?;
            b.write_bits(ptl.max_picture_width as u32, 16);
            b.write_bits(ptl.max_picture_height as u32, 16);
            b.write_bits(ptl.avg_frame_rate as u32, 16);
        }

        b.write_bits(self.non_vcl_arrays.len() as u32, 8);
        for array in &self.non_vcl_arrays {
            b.write_bit(array.array_completeness);
            b.write_bits(0, 2);
            b.write_bits(array.nalu_type as u32, 5);
            if array.nalu_type != DCI_NUT && array.nalu_type != OPI_NUT {
                b.write_bits(array.nalus.len() as u32, 16);
            }
            for nalu in &array.nalus {
                b.write_bits(nalu.len() as u32, 16);
                for &byte in nalu {
                    b.write_bits(byte as u32, 8);
                }
            }
        }

        Ok(b.into_vec())
    }

    /// The raw record bytes, as they go into the 'vvcC' box.
    pub fn raw(&self) -> Vec<u8> {
        self.write_record().unwrap_or_default()
    }
}

impl FromBytes for VvcDecoderConfigRecord {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<VvcDecoderConfigRecord> {
        let data = Data::from_bytes(stream)?;
        VvcDecoderConfigRecord::parse(&data.0)
    }

    fn min_size() -> usize {
        2
    }
}

impl ToBytes for VvcDecoderConfigRecord {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        let data = self.write_record()?;
        stream.write(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> VvcDecoderConfigRecord {
        let mut sublayer_level_idcs = BTreeMap::new();
        sublayer_level_idcs.insert(1, 51);
        VvcDecoderConfigRecord {
            length_size_minus_one: 3,
            ptl: Some(VvcPtl {
                ols_idx: 0,
                num_sublayers: 3,
                constant_frame_rate: 1,
                chroma_format_idc: 1,
                bit_depth_minus8: 2,
                native_ptl: VvcPtlRecord {
                    general_profile_idc: 1,
                    general_tier_flag: false,
                    general_level_idc: 83,
                    ptl_frame_only_constraint_flag: true,
                    ptl_multilayer_enabled_flag: false,
                    general_constraint_info: vec![0x00],
                    num_bytes_constraint_info: 0,
                    sublayer_level_idcs,
                    general_sub_profile_idcs: vec![0xdeadbeef],
                },
                max_picture_width: 1920,
                max_picture_height: 1080,
                avg_frame_rate: 0,
            }),
            non_vcl_arrays: vec![VvcNaluArray {
                array_completeness: true,
                nalu_type: 15,
                nalus: vec![vec![0x42, 0x01, 0x02]],
            }],
        }
    }

    #[test]
    fn record_round_trip() {
        let record = sample_record();
        let raw = record.write_record().unwrap();
        let back = VvcDecoderConfigRecord::parse(&raw).unwrap();
        assert_eq!(back.length_size_minus_one, 3);
        let ptl = back.ptl.as_ref().unwrap();
        assert_eq!(ptl.num_sublayers, 3);
        assert_eq!(ptl.native_ptl.general_level_idc, 83);
        assert_eq!(ptl.native_ptl.sublayer_level_idcs.get(&1), Some(&51));
        assert_eq!(ptl.max_picture_width, 1920);
        assert_eq!(back.non_vcl_arrays.len(), 1);
        assert_eq!(back.non_vcl_arrays[0].nalus[0], vec![0x42, 0x01, 0x02]);

        // Writing again must produce identical bytes.
        assert_eq!(back.write_record().unwrap(), raw);
    }

    #[test]
    fn gci_chain_lengths() {
        // present flag off.
        assert_eq!(gci_bit_length(&[0x00]).unwrap(), 1);
        // present flag on, no additional bits: 1 + 71 + 8.
        let mut gci = vec![0u8; 10];
        gci[0] = 0x80;
        assert_eq!(gci_bit_length(&gci).unwrap(), 80);
    }
}
