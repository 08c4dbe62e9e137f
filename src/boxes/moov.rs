use crate::boxes::prelude::*;
use crate::boxes::{MovieExtendsBox, MovieHeaderBox, TrackBox, TrackExtendsBox};

def_box! {
    /// 8.2.1 Movie Box (ISO/IEC 14496-12:2015(E))
    #[derive(Default)]
    MovieBox {
        boxes:      Vec<MP4Box>,
    },
    fourcc => "moov",
    version => [],
    impls => [ basebox, boxinfo, debug, fromtobytes ],
}

impl MovieBox {
    /// Get a reference to the list of tracks.
    pub fn tracks(&self) -> Vec<&TrackBox> {
        iter_box!(self.boxes, TrackBox).collect()
    }

    /// Get a mutable reference to the list of tracks.
    pub fn tracks_mut(&mut self) -> Vec<&mut TrackBox> {
        iter_box_mut!(self.boxes, TrackBox).collect()
    }

    declare_box_methods!(MovieHeaderBox, movie_header, movie_header_mut);

    /// Get the track by id.
    pub fn track_by_id(&self, track_id: u32) -> Option<&TrackBox> {
        self.tracks().into_iter().find(|t| t.track_id() == track_id)
    }

    /// Get the track index by id.
    pub fn track_idx_by_id(&self, track_id: u32) -> Option<usize> {
        self.tracks()
            .iter()
            .position(|t| t.track_id() == track_id)
    }

    /// Get the Track Extends box for this track.
    pub fn track_extends_by_id(&self, track_id: u32) -> Option<&TrackExtendsBox> {
        first_box!(&self.boxes, MovieExtendsBox)
            .and_then(|mvex| iter_box!(mvex, TrackExtendsBox).find(|t| t.track_id == track_id))
    }

    pub fn is_valid(&self) -> bool {
        let mut valid = true;
        if self.tracks().is_empty() {
            error!("MovieBox: no TrackBoxes present");
            valid = false;
        }
        if first_box!(&self.boxes, MovieHeaderBox).is_none() {
            error!("MovieBox: no MovieHeaderBox present");
            valid = false;
        }
        for t in &self.tracks() {
            if !t.is_valid() {
                valid = false;
            }
        }
        valid
    }
}
