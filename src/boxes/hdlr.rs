use std::io;

use crate::boxes::prelude::*;

def_box! {
    /// 8.4.3 Handler Reference Box (ISO/IEC 14496-12:2015(E))
    #[derive(Default)]
    HandlerBox {
        handler_type:   FourCC,
        name:           ZString,
    },
    fourcc => "hdlr",
    version => [0],
    impls => [ boxinfo, debug, fullbox ],
}

impl HandlerBox {
    pub fn new(handler_type: &str, name: &str) -> HandlerBox {
        HandlerBox {
            handler_type: FourCC::new(handler_type),
            name:         ZString::from(name),
        }
    }

    pub fn is_audio(&self) -> bool {
        self.handler_type == b"soun"
    }

    pub fn is_video(&self) -> bool {
        self.handler_type == b"vide"
    }

    pub fn is_hint(&self) -> bool {
        self.handler_type == b"hint"
    }
}

impl FromBytes for HandlerBox {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<HandlerBox> {
        let mut reader = BoxReader::new(stream)?;
        let stream = &mut reader;

        stream.skip(4)?;
        let handler_type = FourCC::from_bytes(stream)?;
        stream.skip(12)?;
        let name = if stream.left() > 0 {
            ZString::from_bytes(stream)?
        } else {
            ZString::default()
        };

        Ok(HandlerBox { handler_type, name })
    }

    fn min_size() -> usize {
        20
    }
}

impl ToBytes for HandlerBox {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        let mut writer = BoxWriter::new(stream, self)?;
        let stream = &mut writer;

        stream.skip(4)?;
        self.handler_type.to_bytes(stream)?;
        stream.skip(12)?;
        self.name.to_bytes(stream)?;

        stream.finalize()
    }
}
