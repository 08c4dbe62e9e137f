use crate::boxes::prelude::*;
use crate::boxes::{
    MovieFragmentHeaderBox, SampleToGroupBox, TrackFragmentBaseMediaDecodeTimeBox,
    TrackFragmentHeaderBox, TrackRunBox,
};

/// 8.8.4 Movie Fragment Box (ISO/IEC 14496-12:2015(E))
///
/// The position the box had in the input is recorded during parse;
/// trun data offsets are relative to it.
#[derive(Clone, Debug, Default)]
pub struct MovieFragmentBox {
    pub offset: u64,
    pub boxes:  Vec<MP4Box>,
}

impl FromBytes for MovieFragmentBox {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> std::io::Result<MovieFragmentBox> {
        let offset = stream.pos();
        let mut reader = BoxReader::new(stream)?;
        let boxes = Vec::<MP4Box>::from_bytes(&mut reader)?;
        Ok(MovieFragmentBox { offset, boxes })
    }
    fn min_size() -> usize {
        8
    }
}

impl ToBytes for MovieFragmentBox {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> std::io::Result<()> {
        let mut writer = BoxWriter::new(stream, self)?;
        self.boxes.to_bytes(&mut writer)?;
        writer.finalize()
    }
}

impl BoxInfo for MovieFragmentBox {
    const FOURCC: &'static str = "moof";

    #[inline]
    fn fourcc(&self) -> FourCC {
        FourCC::new("moof")
    }
}

impl FullBox for MovieFragmentBox {}

impl MovieFragmentBox {
    declare_box_methods!(MovieFragmentHeaderBox, movie_fragment_header, movie_fragment_header_mut);

    /// Sequence number from the mfhd.
    pub fn sequence_number(&self) -> u32 {
        self.movie_fragment_header().sequence_number
    }

    /// Get a reference to the track fragments.
    pub fn track_fragments(&self) -> Vec<&TrackFragmentBox> {
        iter_box!(self.boxes, TrackFragmentBox).collect()
    }
}

def_box! {
    /// 8.8.6 Track Fragment Box (ISO/IEC 14496-12:2015(E))
    #[derive(Default)]
    TrackFragmentBox {
        boxes:      Vec<MP4Box>,
    },
    fourcc => "traf",
    version => [],
    impls => [ basebox, boxinfo, debug, fromtobytes ],
}

impl TrackFragmentBox {
    declare_box_methods_opt!(TrackFragmentHeaderBox, track_fragment_header, track_fragment_header_mut);
    declare_box_methods_opt!(TrackFragmentBaseMediaDecodeTimeBox, track_fragment_decode_time, track_fragment_decode_time_mut);

    /// Get a reference to the track run boxes.
    pub fn track_run_boxes(&self) -> Vec<&TrackRunBox> {
        iter_box!(self.boxes, TrackRunBox).collect()
    }

    /// The SampleToGroupBoxes local to this fragment.
    pub fn sample_to_groups(&self) -> Vec<&SampleToGroupBox> {
        iter_box!(self.boxes, SampleToGroupBox).collect()
    }
}
