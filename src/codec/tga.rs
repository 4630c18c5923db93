// tga.rs - TGA decoding into the canonical buffer
//
// TGA has no magic number, so the 18-byte header is validated field by
// field instead. Pixel decoding (RLE, BGR order, origin) is left to the
// image crate; we only promote gray to the uniform channel model.

use std::io::{Cursor, Read};

use image::codecs::tga::TgaDecoder;
use image::ImageDecoder;

use crate::canonical::{check_capacity, check_cells, CanonicalImageBuffer};
use crate::error::{Error, Result};

pub const HEADER_LEN: usize = 18;

// Bytes that may follow the pixel data or precede it besides the header:
// id field, largest color map, extension area and footer
const MAX_ANCILLARY_BYTES: u64 = 255 + 65_536 * 4 + 495 + 26;

/// Parsed and validated TGA header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TgaHeader {
    pub color_map_type: u8,
    pub image_type: u8,
    pub color_map_depth: u8,
    pub width: u16,
    pub height: u16,
    pub pixel_depth: u8,
}

impl TgaHeader {
    pub fn parse(bytes: &[u8; HEADER_LEN]) -> Result<Self> {
        let le16 = |i: usize| u16::from_le_bytes([bytes[i], bytes[i + 1]]);
        let header = Self {
            color_map_type: bytes[1],
            image_type: bytes[2],
            color_map_depth: bytes[7],
            width: le16(12),
            height: le16(14),
            pixel_depth: bytes[16],
        };

        let valid = header.color_map_type <= 1
            && matches!(header.image_type, 1 | 2 | 3 | 9 | 10 | 11)
            && matches!(header.pixel_depth, 8 | 15 | 16 | 24 | 32)
            && header.width > 0
            && header.height > 0;
        if !valid {
            return Err(Error::NotRecognized { format: "TGA" });
        }
        Ok(header)
    }

    fn is_gray(&self) -> bool {
        matches!(self.image_type, 3 | 11)
    }

    fn is_color_mapped(&self) -> bool {
        matches!(self.image_type, 1 | 9)
    }

    /// Channels after promotion to the canonical model.
    pub fn canonical_channels(&self) -> usize {
        let depth = if self.is_color_mapped() { self.color_map_depth } else { self.pixel_depth };
        match (self.is_gray(), depth) {
            (true, 16) | (false, 32) => 4,
            _ => 3,
        }
    }

    /// Upper bound on the encoded size, RLE worst case included.
    fn max_stream_len(&self) -> u64 {
        let pixels = self.width as u64 * self.height as u64;
        HEADER_LEN as u64 + pixels * 5 + MAX_ANCILLARY_BYTES
    }
}

fn read_header<R: Read>(reader: &mut R) -> Result<[u8; HEADER_LEN]> {
    let mut header = [0u8; HEADER_LEN];
    match reader.read_exact(&mut header) {
        Ok(()) => Ok(header),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            Err(Error::NotRecognized { format: "TGA" })
        }
        Err(e) => Err(Error::Read(e)),
    }
}

/// Copy one decoded row into the canonical row: L -> LLL, LA -> LLLA.
fn promote_row(src: &[u8], src_channels: usize, dst: &mut [u8]) {
    match src_channels {
        1 => {
            for (px, out) in src.iter().zip(dst.chunks_exact_mut(3)) {
                out.fill(*px);
            }
        }
        2 => {
            for (px, out) in src.chunks_exact(2).zip(dst.chunks_exact_mut(4)) {
                out[..3].fill(px[0]);
                out[3] = px[1];
            }
        }
        _ => dst.copy_from_slice(src),
    }
}

/// Decode a whole TGA stream into a buffer of at most `capacity` bytes.
pub fn decode<R: Read>(reader: R, capacity: usize) -> Result<CanonicalImageBuffer> {
    decode_within(reader, capacity, usize::MAX)
}

/// Like [`decode`], also refusing images of more than `cells` pixels
/// before the pixel data is read.
pub fn decode_within<R: Read>(mut reader: R, capacity: usize, cells: usize) -> Result<CanonicalImageBuffer> {
    let raw_header = read_header(&mut reader)?;
    let header = TgaHeader::parse(&raw_header)?;
    tracing::debug!(?header, "tga header");

    check_cells(header.width as u32, header.height as u32, cells)?;

    check_capacity(
        header.width as u32,
        header.height as u32,
        header.canonical_channels(),
        capacity,
    )?;

    let mut stream = raw_header.to_vec();
    reader
        .take(header.max_stream_len() - HEADER_LEN as u64)
        .read_to_end(&mut stream)
        .map_err(Error::Read)?;

    let decoder = TgaDecoder::new(Cursor::new(stream))?;
    let (width, height) = decoder.dimensions();
    let color = decoder.color_type();
    let src_channels = color.channel_count() as usize;
    if color.bytes_per_pixel() as usize != src_channels {
        return Err(Error::decode(format!("unsupported TGA color type {color:?}")));
    }

    let out_channels = match src_channels {
        1 => 3,
        2 => 4,
        c => c,
    };
    let mut buffer = CanonicalImageBuffer::allocate(width, height, out_channels, capacity)?;

    let raw_len = usize::try_from(decoder.total_bytes())
        .map_err(|_| Error::TooLarge { width, height, channels: src_channels, capacity })?;
    let mut raw = Vec::new();
    raw.try_reserve_exact(raw_len)
        .map_err(|_| Error::TooLarge { width, height, channels: src_channels, capacity })?;
    raw.resize(raw_len, 0);
    decoder.read_image(&mut raw)?;

    let src_stride = width as usize * src_channels;
    for (y, src) in raw.chunks_exact(src_stride).enumerate() {
        promote_row(src, src_channels, buffer.row_mut(y));
    }

    tracing::debug!(width, height, channels = out_channels, "tga decoded");
    Ok(buffer)
}
