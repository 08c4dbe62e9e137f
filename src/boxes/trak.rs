use crate::boxes::prelude::*;
use crate::boxes::{EditBox, EditListBox, MediaBox, TrackHeaderBox, UserDataBox};
use crate::sample_info::{sample_info_iter, SampleInfoIterator};

def_box! {
    /// 8.3.1 Track Box (ISO/IEC 14496-12:2015(E))
    #[derive(Default)]
    TrackBox {
        boxes:      Vec<MP4Box>,
    },
    fourcc => "trak",
    version => [],
    impls => [ basebox, boxinfo, debug, fromtobytes ],
}

impl TrackBox {
    declare_box_methods!(TrackHeaderBox, track_header, track_header_mut);
    declare_box_methods!(MediaBox, media, media_mut);
    declare_box_methods_opt!(UserDataBox, user_data, user_data_mut);

    /// Get the track id.
    pub fn track_id(&self) -> u32 {
        self.track_header().track_id
    }

    /// Get the edit list, if it is present and has at least one entry.
    pub fn edit_list(&self) -> Option<&EditListBox> {
        if let Some(edts) = first_box!(&self.boxes, EditBox) {
            if let Some(elst) = first_box!(&edts.boxes, EditListBox) {
                if !elst.entries.is_empty() {
                    return Some(elst);
                }
            }
        }
        None
    }

    /// Check the editlist to see if there's an initial composition
    /// time shift (see 8.6.1.3.1).
    pub fn composition_time_shift(&self) -> Option<i64> {
        let elst = self.edit_list()?;
        let entry = &elst.entries[0];
        if entry.media_time > 0 {
            Some(entry.media_time)
        } else {
            None
        }
    }

    /// Return an iterator over the SampleTableBox of this track.
    ///
    /// It iterates over multiple tables within the SampleTableBox, and
    /// for each sample returns a SampleInfo.
    pub fn sample_info_iter(&self) -> SampleInfoIterator<'_> {
        sample_info_iter(self)
    }

    /// Check if this track is usable (has header, media and sample table).
    pub fn is_valid(&self) -> bool {
        let mut valid = true;
        let track_id = match first_box!(&self.boxes, TrackHeaderBox) {
            Some(th) => th.track_id,
            None => {
                error!("TrackBox: no TrackHeaderBox present");
                return false;
            },
        };

        match first_box!(&self.boxes, MediaBox) {
            Some(m) => {
                if !m.is_valid() {
                    valid = false;
                }
            },
            None => {
                error!("TrackBox(id {}): no MediaBox present", track_id);
                valid = false;
            },
        }

        valid
    }
}
