use crate::boxes::prelude::*;

def_box! {
    /// 4.3 File Type Box (ISO/IEC 14496-12:2015(E))
    #[derive(Default)]
    FileTypeBox {
        major_brand:        FourCC,
        minor_version:      u32,
        compatible_brands:  Vec<FourCC>,
    },
    fourcc => "ftyp",
    version => [],
    impls => [ basebox, boxinfo, debug, fromtobytes ],
}

def_box! {
    /// 8.16.2 Segment Type Box (ISO/IEC 14496-12:2015(E))
    #[derive(Default)]
    SegmentTypeBox {
        major_brand:        FourCC,
        minor_version:      u32,
        compatible_brands:  Vec<FourCC>,
    },
    fourcc => "styp",
    version => [],
    impls => [ basebox, boxinfo, debug, fromtobytes ],
}

impl SegmentTypeBox {
    /// Build a `styp` from the movie's `ftyp`. The last segment of a
    /// stream advertises this with an extra "lmsg" brand.
    pub fn from_file_type(ftyp: &FileTypeBox, is_last_segment: bool) -> SegmentTypeBox {
        let mut compatible_brands = ftyp.compatible_brands.clone();
        if is_last_segment {
            compatible_brands.push(FourCC::new("lmsg"));
        }
        SegmentTypeBox {
            major_brand: ftyp.major_brand,
            minor_version: ftyp.minor_version,
            compatible_brands,
        }
    }
}
