use crate::boxes::prelude::*;

def_struct! {
    /// Red/green/blue, 16 bits each.
    #[derive(Default)]
    OpColor,
        red:    u16,
        green:  u16,
        blue:   u16,
}

def_box! {
    /// 12.1.2 Video Media Header Box (ISO/IEC 14496-12:2015(E))
    #[derive(Default)]
    VideoMediaHeaderBox {
        graphics_mode:  u16,
        opcolor:        OpColor,
    },
    fourcc => "vmhd",
    version => [0],
    impls => [ boxinfo, debug, fromtobytes ],
}

// The spec says flags = 1 for this box.
impl FullBox for VideoMediaHeaderBox {
    fn version(&self) -> Option<u8> {
        Some(0)
    }
    fn flags(&self) -> u32 {
        1
    }
}
