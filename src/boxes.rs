//! All the boxes we know.
//!
//! This module does not only contain boxes, but also the types that
//! are used in the boxes, and helper types like iterators.
//!
use std::fmt::Debug;

pub(crate) mod misc;
pub(crate) mod prelude;
pub(crate) mod sample_entry;

pub use self::misc::*;
use self::prelude::*;

use crate::mp4box::{GenericBox, InvalidBox};

def_boxes! {
    FileTypeBox, b"ftyp" => ftyp;
    SegmentTypeBox, b"styp";

    MovieBox, b"moov", container => moov;
    TrackBox, b"trak", container => trak;
    MediaBox, b"mdia", container => mdia;
    MediaInformationBox, b"minf", container;
    SampleTableBox, b"stbl", container => stbl;
    DataInformationBox, b"dinf", container => dinf;
    DataReferenceBox, b"dref";
    DataEntryUrlBox, b"url ";
    EditBox, b"edts", container => edts;
    EditListBox, b"elst";
    UserDataBox, b"udta", container;
    MovieExtendsBox, b"mvex", container;
    MovieFragmentBox, b"moof", container => moof;
    TrackFragmentBox, b"traf", container;

    MovieHeaderBox, b"mvhd" => mvhd;
    TrackHeaderBox, b"tkhd" => tkhd;
    MediaHeaderBox, b"mdhd";
    HandlerBox, b"hdlr" => hdlr;
    SoundMediaHeaderBox, b"smhd";
    VideoMediaHeaderBox, b"vmhd" => vmhd;

    SampleDescriptionBox, b"stsd" => stsd;

    AacSampleEntry, b"mp4a" => mp4a;
    ESDescriptorBox, b"esds";

    MpeghSampleEntry, b"mha1" => mpegh;
    Mha2SampleEntry, b"mha2";
    Mhm1SampleEntry, b"mhm1";
    Mhm2SampleEntry, b"mhm2";
    MhaConfigurationBox, b"mhaC";
    MhaProfileLevelCompatibilityBox, b"mhaP";

    AvcSampleEntry, b"avc1" => avc1;
    Avc3SampleEntry, b"avc3";
    AvcConfigurationBox, b"avcC" => avcc;

    HevcSampleEntry, b"hvc1" => hvc1;
    Hev1SampleEntry, b"hev1";
    HevcConfigurationBox, b"hvcC" => hvcc;

    VvcSampleEntry, b"vvc1" => vvc1;
    Vvi1SampleEntry, b"vvi1";
    VvcConfigurationBox, b"vvcC" => vvcc;

    JxsSampleEntry, b"jxsm" => jxs;
    JxsConfigurationBox, b"jxsH";
    JxsVideoInformationBox, b"jpvi";
    JxsProfileBox, b"jxpl";
    ColourInformationBox, b"colr";

    BtrtBox, b"btrt";

    TimeToSampleBox, b"stts" => stts;
    CompositionOffsetBox, b"ctts" => ctts;
    SampleToChunkBox, b"stsc" => stsc;
    SampleSizeBox, b"stsz" => stsz;
    CompactSampleSizeBox, b"stz2";
    ChunkOffsetBox, b"stco" => stco;
    ChunkLargeOffsetBox, b"co64";
    SyncSampleBox, b"stss" => stss;

    SampleToGroupBox, b"sbgp" => sbgp;
    SampleGroupDescriptionBox, b"sgpd" => sgpd;

    MovieFragmentHeaderBox, b"mfhd";
    TrackFragmentHeaderBox, b"tfhd" => tfhd;
    TrackFragmentBaseMediaDecodeTimeBox, b"tfdt" => tfdt;
    TrackRunBox, b"trun" => trun;
    TrackExtendsBox, b"trex";

    SegmentIndexBox, b"sidx" => sidx;
    InitialObjectDescriptionBox, b"iods" => iods;
    MediaProcessingUnitBox, b"mmpu" => mmpu;

    LoudnessContainerBox, b"ludt", container => ludt;
    TrackLoudnessBox, b"tlou";
    AudioLoudnessBox, b"alou";

    MediaDataBox, b"mdat" => mdat;
    FreeBox, b"free" => free;
    SkipBox, b"skip";
}

pub(crate) use self::mdat::set_mdat_skip;
