use crate::boxes::prelude::*;

def_box! {
    /// 8.10.1 User Data Box (ISO/IEC 14496-12:2015(E))
    #[derive(Default)]
    UserDataBox {
        boxes:      Vec<MP4Box>,
    },
    fourcc => "udta",
    version => [],
    impls => [ basebox, boxinfo, debug, fromtobytes ],
}

def_box! {
    /// 8.4.2 Media Header Box (ISO/IEC 14496-12:2015(E))
    #[derive(Default)]
    MediaHeaderBox {
        cr_time:    Time,
        mod_time:   Time,
        timescale:  u32,
        duration:   Duration_,
        language:   IsoLanguageCode,
        quality:    u16,
    },
    fourcc => "mdhd",
    version => [1, cr_time, mod_time, duration],
    impls => [ boxinfo, debug, fromtobytes, fullbox ],
}

def_box! {
    /// 12.2.2 Sound Media Header Box (ISO/IEC 14496-12:2015(E))
    #[derive(Default)]
    SoundMediaHeaderBox {
        balance:        u16,
        skip:           2,
    },
    fourcc => "smhd",
    version => [0],
    impls => [ boxinfo, debug, fromtobytes, fullbox ],
}

def_box! {
    /// 8.8.1 Movie Extends Box (ISO/IEC 14496-12:2015(E))
    #[derive(Default)]
    MovieExtendsBox {
        boxes:      Vec<MP4Box>,
    },
    fourcc => "mvex",
    version => [],
    impls => [ basebox, boxinfo, debug, fromtobytes ],
}

def_box! {
    /// 8.8.3 Track Extends Box (ISO/IEC 14496-12:2015(E))
    TrackExtendsBox {
        track_id:       u32,
        default_sample_description_index:   u32,
        default_sample_duration:    u32,
        default_sample_size:        u32,
        default_sample_flags:       SampleFlags,
    },
    fourcc => "trex",
    version => [0],
    impls => [ boxinfo, debug, fromtobytes, fullbox ],
}

// Default needs to set sample_description_index to 1.
impl Default for TrackExtendsBox {
    fn default() -> TrackExtendsBox {
        TrackExtendsBox {
            track_id: 0,
            default_sample_description_index: 1,
            default_sample_duration: 0,
            default_sample_size: 0,
            default_sample_flags: SampleFlags::default(),
        }
    }
}

def_box! {
    /// 8.8.5 Movie Fragment Header Box (ISO/IEC 14496-12:2015(E))
    #[derive(Default)]
    MovieFragmentHeaderBox {
        sequence_number:    u32,
    },
    fourcc => "mfhd",
    version => [0],
    impls => [ boxinfo, debug, fromtobytes, fullbox ],
}

def_box! {
    /// 8.5.2.2 BitRateBox (ISO/IEC 14496-12:2015(E))
    #[derive(Default)]
    BtrtBox {
        decoding_buffer_size: u32,
        max_bitrate: u32,
        avg_bitrate: u32,
    },
    fourcc => "btrt",
    version => [],
    impls => [ basebox, boxinfo, debug, fromtobytes ],
}
