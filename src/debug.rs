//! Debug helpers: the indented box-tree dump and the overhead report.
//!
use std::io::{self, Write};

use crate::boxes::*;
use crate::mp4box::{BoxInfo, MP4};

// Children of a container box, if it is one.
fn children(b: &MP4Box) -> Option<&[MP4Box]> {
    let boxes = match b {
        MP4Box::MovieBox(b) => &b.boxes,
        MP4Box::TrackBox(b) => &b.boxes,
        MP4Box::MediaBox(b) => &b.boxes,
        MP4Box::MediaInformationBox(b) => &b.boxes,
        MP4Box::SampleTableBox(b) => &b.boxes,
        MP4Box::DataInformationBox(b) => &b.boxes,
        MP4Box::EditBox(b) => &b.boxes,
        MP4Box::UserDataBox(b) => &b.boxes,
        MP4Box::LoudnessContainerBox(b) => &b.boxes,
        MP4Box::MovieExtendsBox(b) => &b.boxes,
        MP4Box::MovieFragmentBox(b) => &b.boxes,
        MP4Box::TrackFragmentBox(b) => &b.boxes,
        MP4Box::SampleDescriptionBox(b) => return Some(&b.entries),
        MP4Box::AacSampleEntry(b) => &b.boxes,
        MP4Box::MpeghSampleEntry(b)
        | MP4Box::Mha2SampleEntry(b)
        | MP4Box::Mhm1SampleEntry(b)
        | MP4Box::Mhm2SampleEntry(b) => &b.boxes,
        MP4Box::AvcSampleEntry(b) | MP4Box::Avc3SampleEntry(b) => &b.boxes,
        MP4Box::HevcSampleEntry(b) | MP4Box::Hev1SampleEntry(b) => &b.boxes,
        MP4Box::VvcSampleEntry(b) | MP4Box::Vvi1SampleEntry(b) => &b.boxes,
        MP4Box::JxsSampleEntry(b) => &b.boxes,
        _ => return None,
    };
    Some(boxes)
}

/// Visit every box in the tree, pre-order. The callback gets the
/// nesting depth; returning false prunes the subtree.
pub fn visit<F>(boxes: &[MP4Box], mut f: F)
where
    F: FnMut(&MP4Box, usize) -> bool,
{
    fn walk<F>(boxes: &[MP4Box], depth: usize, f: &mut F)
    where
        F: FnMut(&MP4Box, usize) -> bool,
    {
        for b in boxes {
            if !f(b, depth) {
                continue;
            }
            if let Some(kids) = children(b) {
                walk(kids, depth + 1, f);
            }
        }
    }
    walk(boxes, 0, &mut f)
}

/// Print the box tree with indentation and per-box attributes.
pub fn dump_boxes<W: Write>(mp4: &MP4, out: &mut W) -> io::Result<()> {
    let mut result = Ok(());
    visit(&mp4.boxes, |b, depth| {
        if result.is_err() {
            return false;
        }
        let indent = "  ".repeat(depth);
        let line = if children(b).is_some() {
            format!("{}[{}] size {}", indent, b.fourcc(), b.size())
        } else {
            format!("{}[{}] size {} {:?}", indent, b.fourcc(), b.size(), b)
        };
        result = writeln!(out, "{}", line);
        result.is_ok()
    });
    result
}

/// Byte-accounting of a parsed file.
#[derive(Debug, Default, Clone)]
pub struct OverheadReport {
    pub total:    u64,
    pub payload:  u64,
    pub overhead: u64,
    pub percent:  f64,
}

/// Sum up how much of the file is mdat payload and how much is
/// structure.
pub fn overhead_report(mp4: &MP4) -> OverheadReport {
    let mut payload = 0u64;
    visit(&mp4.boxes, |b, _depth| {
        if let MP4Box::MediaDataBox(mdat) = b {
            payload += mdat.payload_size();
        }
        true
    });
    let total = mp4.size();
    let overhead = total.saturating_sub(payload);
    let percent = if total > 0 {
        (overhead as f64 / total as f64) * 100.0
    } else {
        0.0
    };
    OverheadReport {
        total,
        payload,
        overhead,
        percent,
    }
}

/// Dump sample information of a track.
pub fn dump_track_samples<W: Write>(
    reader: &crate::reader::Mp4Reader,
    track_index: usize,
    out: &mut W,
) -> io::Result<()> {
    let track = reader.track(track_index)?;
    writeln!(
        out,
        "{:>8}  {:>10}  {:>6}  {:>10}  {:>6}  {:>5}  {:>5}",
        "#", "dtime", "size", "duration", "cdelta", "sync", "frag"
    )?;
    for idx in 0..track.sample_count() as usize {
        let info = match track.sample_info(idx) {
            Some(info) => info.clone(),
            None => break,
        };
        writeln!(
            out,
            "{:>8}  {:>10}  {:>6}  {:>10}  {:>6}  {:>5}  {:>5}",
            idx + 1,
            info.decode_time,
            info.size,
            info.duration,
            info.composition_delta,
            if info.is_sync { "sync" } else { "" },
            info.fragment,
        )?;
    }
    Ok(())
}
