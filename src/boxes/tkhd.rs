use crate::boxes::prelude::*;

def_box! {
    /// 8.3.2 Track Header Box (ISO/IEC 14496-12:2015(E))
    ///
    /// Flags: enabled (bit 0), in_movie (1), in_preview (2),
    /// size_is_aspect_ratio (3).
    TrackHeaderBox {
        flags:      TrackFlags,
        cr_time:    Time,
        mod_time:   Time,
        track_id:   u32,
        skip:       4,
        duration:   Duration_,
        skip:       8,
        layer:      u16,
        alt_group:  u16,
        volume:     FixedFloat8_8,
        skip:       2,
        matrix:     Matrix,
        width:      FixedFloat16_16,
        height:     FixedFloat16_16,
    },
    fourcc => "tkhd",
    version => [1, flags, cr_time, mod_time, duration],
    impls => [ boxinfo, debug, fromtobytes, fullbox ],
}

impl Default for TrackHeaderBox {
    fn default() -> TrackHeaderBox {
        TrackHeaderBox {
            flags:     TrackFlags::default(),
            cr_time:   Time::default(),
            mod_time:  Time::default(),
            track_id:  0,
            duration:  Duration_::default(),
            layer:     0,
            alt_group: 0,
            volume:    FixedFloat8_8::default(),
            matrix:    Matrix::default(),
            width:     FixedFloat16_16::default(),
            height:    FixedFloat16_16::default(),
        }
    }
}

impl TrackHeaderBox {
    /// Pixel width; only the integer part of the 16.16 value.
    pub fn width_px(&self) -> u16 {
        (self.width.0 >> 16) as u16
    }

    /// Pixel height; only the integer part of the 16.16 value.
    pub fn height_px(&self) -> u16 {
        (self.height.0 >> 16) as u16
    }
}
