// png.rs - PNG decoding into the canonical buffer
//
// The `png` crate is run with the identity transformation so samples arrive
// at their native depth; `normalize` does the conversion. The signature is
// checked before the decoder is built, the canonical size before any pixel
// memory is committed.

use std::io::{Cursor, Read};

use ::png::{BitDepth, ColorType, Decoder, Limits, Transformations};

use super::normalize::{ColorModel, Normalizer, SourceEncoding};
use crate::canonical::{check_cells, CanonicalImageBuffer};
use crate::error::{Error, Result};

pub const SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

// Floor for the decoder's own transient allocations (the png crate default)
const MIN_DECODER_LIMIT: usize = 64 * 1024 * 1024;

fn color_model(color: ColorType) -> ColorModel {
    match color {
        ColorType::Grayscale => ColorModel::Grayscale,
        ColorType::GrayscaleAlpha => ColorModel::GrayscaleAlpha,
        ColorType::Rgb => ColorModel::Truecolor,
        ColorType::Rgba => ColorModel::TruecolorAlpha,
        ColorType::Indexed => ColorModel::Indexed,
    }
}

fn bit_depth(depth: BitDepth) -> u8 {
    match depth {
        BitDepth::One => 1,
        BitDepth::Two => 2,
        BitDepth::Four => 4,
        BitDepth::Eight => 8,
        BitDepth::Sixteen => 16,
    }
}

/// Read the leading signature bytes. A source too short to hold one is not a PNG.
fn read_signature<R: Read>(reader: &mut R) -> Result<[u8; 8]> {
    let mut sig = [0u8; 8];
    match reader.read_exact(&mut sig) {
        Ok(()) => Ok(sig),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            Err(Error::NotRecognized { format: "PNG" })
        }
        Err(e) => Err(Error::Read(e)),
    }
}

/// Decode a whole PNG stream into a buffer of at most `capacity` bytes.
pub fn decode<R: Read>(reader: R, capacity: usize) -> Result<CanonicalImageBuffer> {
    decode_within(reader, capacity, usize::MAX)
}

/// Like [`decode`], also refusing images of more than `cells` pixels
/// before any pixel data is read.
pub fn decode_within<R: Read>(mut reader: R, capacity: usize, cells: usize) -> Result<CanonicalImageBuffer> {
    let sig = read_signature(&mut reader)?;
    if sig != SIGNATURE {
        return Err(Error::NotRecognized { format: "PNG" });
    }

    let mut decoder = Decoder::new(Cursor::new(sig).chain(reader));
    decoder.set_transformations(Transformations::IDENTITY);
    let transient_limit = capacity.saturating_mul(2).max(MIN_DECODER_LIMIT);
    decoder.set_limits(Limits { bytes: transient_limit });
    let mut reader = decoder.read_info()?;

    let (width, height, interlaced, normalizer) = {
        let info = reader.info();
        check_cells(info.width, info.height, cells)?;
        let encoding = SourceEncoding::new(color_model(info.color_type), bit_depth(info.bit_depth))?;
        let normalizer = Normalizer::new(encoding, info.palette.as_deref(), info.trns.as_deref())?;
        (info.width, info.height, info.interlaced, normalizer)
    };
    tracing::debug!(
        width,
        height,
        interlaced,
        encoding = ?normalizer.encoding(),
        plan = ?normalizer.plan(),
        "png header"
    );

    let mut buffer =
        CanonicalImageBuffer::allocate(width, height, normalizer.output_channels(), capacity)?;
    let w = width as usize;

    if interlaced {
        // Adam7 passes only make sense once the whole frame is assembled
        let frame_len = reader.output_buffer_size();
        let too_large = || Error::TooLarge {
            width,
            height,
            channels: normalizer.output_channels(),
            capacity: transient_limit,
        };
        if frame_len > transient_limit {
            return Err(too_large());
        }
        let mut frame = Vec::new();
        frame.try_reserve_exact(frame_len).map_err(|_| too_large())?;
        frame.resize(frame_len, 0);

        let out = reader.next_frame(&mut frame)?;
        for (y, raw) in frame.chunks_exact(out.line_size).take(height as usize).enumerate() {
            normalizer.normalize_row(raw, w, buffer.row_mut(y))?;
        }
    } else {
        for y in 0..height as usize {
            let row = reader
                .next_row()?
                .ok_or_else(|| Error::decode(format!("image data ended at row {y} of {height}")))?;
            normalizer.normalize_row(row.data(), w, buffer.row_mut(y))?;
        }
    }

    tracing::debug!(width, height, channels = buffer.channels(), "png decoded");
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn encode(
        width: u32,
        height: u32,
        color: ColorType,
        depth: BitDepth,
        palette: Option<Vec<u8>>,
        trns: Option<Vec<u8>>,
        data: &[u8],
    ) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut encoder = ::png::Encoder::new(&mut out, width, height);
            encoder.set_color(color);
            encoder.set_depth(depth);
            if let Some(p) = palette {
                encoder.set_palette(p);
            }
            if let Some(t) = trns {
                encoder.set_trns(t);
            }
            let mut writer = encoder.write_header().unwrap();
            writer.write_image_data(data).unwrap();
            writer.finish().unwrap();
        }
        out
    }

    #[test]
    fn rgb8_round_trips_samples() {
        let data: Vec<u8> = (0..2 * 2 * 3).map(|i| i * 10).collect();
        let bytes = encode(2, 2, ColorType::Rgb, BitDepth::Eight, None, None, &data);

        let buf = decode(bytes.as_slice(), 1 << 20).unwrap();
        assert_eq!((buf.width(), buf.height(), buf.channels()), (2, 2, 3));
        assert_eq!(buf.samples(), data.as_slice());
    }

    #[test]
    fn one_bit_gray_expands_to_extremes() {
        // 8x1, alternating 0/1
        let bytes = encode(8, 1, ColorType::Grayscale, BitDepth::One, None, None, &[0b0101_0101]);
        let buf = decode(bytes.as_slice(), 1 << 20).unwrap();

        assert_eq!(buf.channels(), 3);
        let mut seen: Vec<u8> = buf.samples().to_vec();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen, vec![0, 255]);
    }

    #[test]
    fn palette_with_trns_gets_alpha() {
        let palette = vec![255, 0, 0, 0, 0, 255];
        let bytes = encode(2, 1, ColorType::Indexed, BitDepth::Eight, Some(palette), Some(vec![0]), &[0, 1]);
        let buf = decode(bytes.as_slice(), 1 << 20).unwrap();

        assert_eq!(buf.channels(), 4);
        assert_eq!(buf.samples(), &[255, 0, 0, 0, 0, 0, 255, 255]);
    }

    #[test]
    fn sixteen_bit_gray_alpha_strips() {
        let data = [0xab, 0xcd, 0x01, 0x02];
        let bytes = encode(1, 1, ColorType::GrayscaleAlpha, BitDepth::Sixteen, None, None, &data);
        let buf = decode(bytes.as_slice(), 1 << 20).unwrap();
        assert_eq!(buf.samples(), &[0xab, 0xab, 0xab, 0x01]);
    }

    #[test]
    fn gray_key_materializes_alpha() {
        let bytes = encode(2, 1, ColorType::Grayscale, BitDepth::Eight, None, Some(vec![0, 50]), &[50, 60]);
        let buf = decode(bytes.as_slice(), 1 << 20).unwrap();
        assert_eq!(buf.samples(), &[50, 50, 50, 0, 60, 60, 60, 255]);
    }

    #[test]
    fn rgb_key_materializes_alpha() {
        let data = [10, 20, 30, 10, 20, 31];
        let bytes = encode(2, 1, ColorType::Rgb, BitDepth::Eight, None, Some(vec![0, 10, 0, 20, 0, 30]), &data);
        let buf = decode(bytes.as_slice(), 1 << 20).unwrap();

        assert_eq!(buf.channels(), 4);
        assert_eq!(buf.samples(), &[10, 20, 30, 0, 10, 20, 31, 255]);
    }

    #[test]
    fn sixteen_bit_gray_key_materializes_alpha() {
        let data = [0x80, 0x01, 0x80, 0x02];
        let bytes = encode(2, 1, ColorType::Grayscale, BitDepth::Sixteen, None, Some(vec![0x80, 0x01]), &data);
        let buf = decode(bytes.as_slice(), 1 << 20).unwrap();

        assert_eq!(buf.samples(), &[0x80, 0x80, 0x80, 0, 0x80, 0x80, 0x80, 0xff]);
    }

    // 7x5 Adam7 fixtures: every pass is non-empty and most are partial
    const RGB8_ADAM7: &[u8] = include_bytes!("testdata/rgb8_7x5_adam7.png");
    const GRAY1_ADAM7: &[u8] = include_bytes!("testdata/gray1_7x5_adam7.png");

    #[test]
    fn adam7_rgb_matches_progressive() {
        let data: Vec<u8> = (0..5u8)
            .flat_map(|y| (0..7u8).flat_map(move |x| [x * 30, y * 50, (x + y) * 10]))
            .collect();
        let progressive = encode(7, 5, ColorType::Rgb, BitDepth::Eight, None, None, &data);

        let interlaced = decode(RGB8_ADAM7, 1 << 20).unwrap();
        assert_eq!(interlaced, decode(progressive.as_slice(), 1 << 20).unwrap());
        assert_eq!(interlaced.samples(), data.as_slice());
    }

    #[test]
    fn adam7_one_bit_gray() {
        let buf = decode(GRAY1_ADAM7, 1 << 20).unwrap();
        assert_eq!((buf.width(), buf.height(), buf.channels()), (7, 5, 3));

        for (i, px) in buf.pixels().enumerate() {
            let (x, y) = (i % 7, i / 7);
            let expected = if (x + 2 * y) % 3 == 0 { 255 } else { 0 };
            assert_eq!(px, &[expected; 3], "pixel ({x}, {y})");
        }
    }

    #[test]
    fn cell_bound_checked_before_image_data() {
        let data = vec![7u8; 32 * 32];
        let bytes = encode(32, 32, ColorType::Grayscale, BitDepth::Eight, None, None, &data);
        // keep the headers, drop almost all of the image data
        let idat = bytes.windows(4).position(|w| w == b"IDAT").unwrap();
        let cut = &bytes[..idat + 6];

        let err = decode_within(cut, 1 << 20, 32 * 31).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Capacity);
        assert!(decode_within(cut, 1 << 20, 32 * 32).is_err());
        assert!(decode_within(bytes.as_slice(), 1 << 20, 32 * 32).is_ok());
    }

    #[test]
    fn corrupted_signature_not_recognized() {
        let mut bytes = encode(1, 1, ColorType::Rgb, BitDepth::Eight, None, None, &[1, 2, 3]);
        bytes[1] = b'X';
        let err = decode(bytes.as_slice(), 1 << 20).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn short_input_not_recognized() {
        let err = decode(&SIGNATURE[..4], 1 << 20).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn truncated_stream_is_decode_error() {
        let data: Vec<u8> = (0..32 * 32 * 3).map(|i| (i * 7 % 251) as u8).collect();
        let bytes = encode(32, 32, ColorType::Rgb, BitDepth::Eight, None, None, &data);
        let cut = &bytes[..bytes.len() / 2];
        let err = decode(cut, 1 << 20).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[test]
    fn capacity_checked_before_pixels() {
        let data = vec![0u8; 64 * 64 * 4];
        let bytes = encode(64, 64, ColorType::Rgba, BitDepth::Eight, None, None, &data);
        let err = decode(bytes.as_slice(), 64 * 64 * 4 - 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Capacity);
    }
}
