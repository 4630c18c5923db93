// codec/ - Source decoders
//
// Each decoder turns a byte stream into a `CanonicalImageBuffer`.
// The decoder is picked from the file extension alone.

pub mod normalize;
pub mod png;
pub mod tga;

use std::io::Read;
use std::path::Path;

use crate::canonical::CanonicalImageBuffer;
use crate::error::{Error, Result};

/// Recognized source formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceFormat {
    Tga,
    Png,
}

impl SourceFormat {
    /// Match an extension token, case-insensitively, without the leading dot.
    pub fn from_extension(ext: &str) -> Result<Self> {
        if ext.eq_ignore_ascii_case("tga") {
            Ok(SourceFormat::Tga)
        } else if ext.eq_ignore_ascii_case("png") {
            Ok(SourceFormat::Png)
        } else {
            Err(Error::UnsupportedFormat { extension: ext.to_string() })
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        Self::from_extension(ext)
    }

    pub fn decode<R: Read>(self, reader: R, capacity: usize) -> Result<CanonicalImageBuffer> {
        self.decode_within(reader, capacity, usize::MAX)
    }

    /// Decode with both a byte bound and a pixel-count bound.
    pub fn decode_within<R: Read>(
        self,
        reader: R,
        capacity: usize,
        cells: usize,
    ) -> Result<CanonicalImageBuffer> {
        match self {
            SourceFormat::Tga => self::tga::decode_within(reader, capacity, cells),
            SourceFormat::Png => self::png::decode_within(reader, capacity, cells),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn extensions_are_case_insensitive() {
        assert_eq!(SourceFormat::from_path(Path::new("a/b.PNG")).unwrap(), SourceFormat::Png);
        assert_eq!(SourceFormat::from_path(Path::new("b.Tga")).unwrap(), SourceFormat::Tga);
        assert_eq!(SourceFormat::from_extension("png").unwrap(), SourceFormat::Png);
    }

    #[test]
    fn other_extensions_rejected() {
        for path in ["x.bmp", "x", "x.png.gz", "png"] {
            let err = SourceFormat::from_path(Path::new(path)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Format, "{path}");
        }
    }
}
