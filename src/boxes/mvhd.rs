use std::io;

use crate::boxes::prelude::*;

def_box! {
    /// 8.2.2 Movie Header Box (ISO/IEC 14496-12:2015(E))
    MovieHeaderBox {
        cr_time:    Time,
        mod_time:   Time,
        timescale:  u32,
        duration:   Duration_,
        pref_rate:  FixedFloat16_16,
        pref_vol:   FixedFloat8_8,
        skip:       10,
        matrix:     Matrix,
        // The next 6 32-bit values are "pre_defined" in
        // ISO/IEC 14496-12:2015, often used as below by Quicktime.
        preview_time:       u32,
        preview_duration:   u32,
        poster_time:        u32,
        selection_time:     u32,
        selection_duration: u32,
        current_time:       u32,
        //
        next_track_id: u32,
    },
    fourcc => "mvhd",
    version => [1, cr_time, mod_time, duration],
    impls => [ boxinfo, debug, fullbox ],
}

impl Default for MovieHeaderBox {
    fn default() -> MovieHeaderBox {
        MovieHeaderBox {
            cr_time:    Time::default(),
            mod_time:   Time::default(),
            timescale:  600,
            duration:   Duration_::default(),
            pref_rate:  FixedFloat16_16::from(1.0),
            pref_vol:   FixedFloat8_8::from(1.0),
            matrix:     Matrix::default(),
            preview_time: 0,
            preview_duration: 0,
            poster_time: 0,
            selection_time: 0,
            selection_duration: 0,
            current_time: 0,
            next_track_id: 1,
        }
    }
}

impl FromBytes for MovieHeaderBox {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<MovieHeaderBox> {
        let mut reader = BoxReader::new(stream)?;
        let stream = &mut reader;

        match stream.header.version {
            Some(0) | Some(1) => {},
            v => return Err(ioerr!(InvalidData, "mvhd: no support for version {:?}", v)),
        }
        if stream.header.flags != 0 {
            return Err(ioerr!(InvalidData, "mvhd: flags must be zero"));
        }

        let cr_time = Time::from_bytes(stream)?;
        let mod_time = Time::from_bytes(stream)?;
        let timescale = u32::from_bytes(stream)?;
        let duration = Duration_::from_bytes(stream)?;
        let pref_rate = FixedFloat16_16::from_bytes(stream)?;
        let pref_vol = FixedFloat8_8::from_bytes(stream)?;
        stream.skip(10)?;
        let matrix = Matrix::from_bytes(stream)?;
        let preview_time = u32::from_bytes(stream)?;
        let preview_duration = u32::from_bytes(stream)?;
        let poster_time = u32::from_bytes(stream)?;
        let selection_time = u32::from_bytes(stream)?;
        let selection_duration = u32::from_bytes(stream)?;
        let current_time = u32::from_bytes(stream)?;
        let next_track_id = u32::from_bytes(stream)?;

        if next_track_id == 0 {
            return Err(ioerr!(InvalidData, "mvhd: next_track_id is zero"));
        }

        Ok(MovieHeaderBox {
            cr_time,
            mod_time,
            timescale,
            duration,
            pref_rate,
            pref_vol,
            matrix,
            preview_time,
            preview_duration,
            poster_time,
            selection_time,
            selection_duration,
            current_time,
            next_track_id,
        })
    }

    fn min_size() -> usize {
        96
    }
}

impl ToBytes for MovieHeaderBox {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        let mut writer = BoxWriter::new(stream, self)?;
        let stream = &mut writer;

        self.cr_time.to_bytes(stream)?;
        self.mod_time.to_bytes(stream)?;
        self.timescale.to_bytes(stream)?;
        self.duration.to_bytes(stream)?;
        self.pref_rate.to_bytes(stream)?;
        self.pref_vol.to_bytes(stream)?;
        stream.skip(10)?;
        self.matrix.to_bytes(stream)?;
        self.preview_time.to_bytes(stream)?;
        self.preview_duration.to_bytes(stream)?;
        self.poster_time.to_bytes(stream)?;
        self.selection_time.to_bytes(stream)?;
        self.selection_duration.to_bytes(stream)?;
        self.current_time.to_bytes(stream)?;
        self.next_track_id.to_bytes(stream)?;

        stream.finalize()
    }
}
