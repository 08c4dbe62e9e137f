use crate::boxes::prelude::*;

def_box! {
    /// 8.5.2 Sample Description Box (ISO/IEC 14496-12:2015(E))
    #[derive(Default)]
    SampleDescriptionBox {
        entries:    ArraySized32<MP4Box>,
    },
    fourcc => "stsd",
    version => [0],
    impls => [ boxinfo, debug, fromtobytes, fullbox ],
}

impl SampleDescriptionBox {
    /// The first sample entry.
    pub fn sample_entry(&self) -> Option<&MP4Box> {
        self.entries.iter().next()
    }

    /// The coding name of the first sample entry.
    pub fn coding_name(&self) -> Option<FourCC> {
        self.sample_entry().map(|e| e.fourcc())
    }
}
