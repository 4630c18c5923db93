// normalize.rs - Row normalization into the canonical 8-bit channel model
//
// A decoded row moves through an ordered list of steps, each a pure
// transform from one `SampleRow` to the next:
//
//   Unpack -> ExpandPalette -> KeyToAlpha -> ScaleTo8 -> GrayToRgb
//
// Only the steps that apply to the source encoding are planned. The output
// is always 3 channels (RGB) or 4 (RGBA) at 8 bits per sample.

use crate::error::{Error, Result};

/// Color model of the source, before normalization.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorModel {
    Indexed,
    Grayscale,
    GrayscaleAlpha,
    Truecolor,
    TruecolorAlpha,
}

impl ColorModel {
    pub fn samples_per_pixel(self) -> usize {
        match self {
            ColorModel::Indexed | ColorModel::Grayscale => 1,
            ColorModel::GrayscaleAlpha => 2,
            ColorModel::Truecolor => 3,
            ColorModel::TruecolorAlpha => 4,
        }
    }

    fn is_gray(self) -> bool {
        matches!(self, ColorModel::Grayscale | ColorModel::GrayscaleAlpha)
    }
}

/// Color model plus sample bit depth. Only legal pairs can be built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceEncoding {
    color: ColorModel,
    bit_depth: u8,
}

impl SourceEncoding {
    pub fn new(color: ColorModel, bit_depth: u8) -> Result<Self> {
        let legal = match color {
            ColorModel::Indexed => matches!(bit_depth, 1 | 2 | 4 | 8),
            ColorModel::Grayscale => matches!(bit_depth, 1 | 2 | 4 | 8 | 16),
            _ => matches!(bit_depth, 8 | 16),
        };
        if !legal {
            return Err(Error::decode(format!(
                "unsupported combination: {color:?} at {bit_depth} bits"
            )));
        }
        Ok(Self { color, bit_depth })
    }

    pub fn color(&self) -> ColorModel { self.color }
    pub fn bit_depth(&self) -> u8 { self.bit_depth }

    /// Packed bytes per row at the native depth.
    pub fn raw_row_bytes(&self, width: usize) -> Option<usize> {
        let bits = width
            .checked_mul(self.color.samples_per_pixel())?
            .checked_mul(self.bit_depth as usize)?;
        Some(bits.div_ceil(8))
    }
}

/// Transparency declared outside the pixel data (PNG tRNS).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transparency {
    Opaque,
    /// Alpha per palette entry; missing entries are opaque.
    Palette(Vec<u8>),
    /// Color key at the native depth, one value per source channel.
    Key(Vec<u16>),
}

impl Transparency {
    /// Interpret a tRNS payload as the `png` decoder reports it: palette
    /// alphas, or a color key of one sample per channel, stored big-endian
    /// at 16 bits and as a single byte below that. Payloads that don't fit
    /// the color model are ignored.
    pub fn from_trns(encoding: SourceEncoding, trns: Option<&[u8]>) -> Self {
        let Some(trns) = trns else { return Transparency::Opaque };
        let key = |channels: usize| -> Option<Vec<u16>> {
            if encoding.bit_depth == 16 {
                let bytes = trns.get(..channels * 2)?;
                Some(bytes.chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]])).collect())
            } else {
                let bytes = trns.get(..channels)?;
                Some(bytes.iter().map(|&b| b as u16).collect())
            }
        };

        let parsed = match encoding.color {
            ColorModel::Indexed if !trns.is_empty() => Some(Transparency::Palette(trns.to_vec())),
            ColorModel::Grayscale => key(1).map(Transparency::Key),
            ColorModel::Truecolor => key(3).map(Transparency::Key),
            _ => None,
        };
        parsed.unwrap_or_else(|| {
            tracing::warn!(len = trns.len(), ?encoding, "ignoring invalid tRNS chunk");
            Transparency::Opaque
        })
    }
}

/// One normalization step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    ExpandPalette,
    KeyToAlpha,
    ScaleTo8,
    GrayToRgb,
}

/// One row of unpacked samples, `channels` per pixel, at `depth` bits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SampleRow {
    pub channels: usize,
    pub depth: u8,
    pub samples: Vec<u16>,
}

/// Split a packed row into one sample per value (16-bit is big-endian).
pub fn unpack(raw: &[u8], width: usize, encoding: SourceEncoding) -> Result<SampleRow> {
    let channels = encoding.color.samples_per_pixel();
    let depth = encoding.bit_depth as usize;
    let count = width * channels;
    let needed = encoding
        .raw_row_bytes(width)
        .ok_or_else(|| Error::decode("row size overflow"))?;
    if raw.len() < needed {
        return Err(Error::decode(format!("short row: {} of {needed} bytes", raw.len())));
    }

    let samples = match depth {
        16 => raw[..needed]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect(),
        8 => raw[..needed].iter().map(|&b| b as u16).collect(),
        _ => {
            let per_byte = 8 / depth;
            let mask = (1u16 << depth) - 1;
            (0..count)
                .map(|i| {
                    let shift = 8 - depth * (1 + i % per_byte);
                    (raw[i / per_byte] as u16 >> shift) & mask
                })
                .collect()
        }
    };

    Ok(SampleRow { channels, depth: encoding.bit_depth, samples })
}

/// Replace palette indices with RGB, plus alpha when the palette has one.
pub fn expand_palette(row: SampleRow, palette: &[[u8; 3]], alpha: Option<&[u8]>) -> Result<SampleRow> {
    let channels = if alpha.is_some() { 4 } else { 3 };
    let mut samples = Vec::with_capacity(row.samples.len() * channels);

    for &index in &row.samples {
        let i = index as usize;
        let rgb = palette
            .get(i)
            .ok_or_else(|| Error::decode(format!("palette index {i} out of range ({})", palette.len())))?;
        samples.extend(rgb.iter().map(|&c| c as u16));
        if let Some(alpha) = alpha {
            samples.push(alpha.get(i).copied().unwrap_or(255) as u16);
        }
    }

    Ok(SampleRow { channels, depth: 8, samples })
}

/// Append an alpha channel: 0 where the pixel equals `key`, opaque elsewhere.
pub fn key_to_alpha(row: SampleRow, key: &[u16]) -> SampleRow {
    let opaque = if row.depth == 16 { u16::MAX } else { (1u16 << row.depth) - 1 };
    let channels = row.channels + 1;
    let mut samples = Vec::with_capacity(row.samples.len() / row.channels * channels);

    for px in row.samples.chunks_exact(row.channels) {
        samples.extend_from_slice(px);
        samples.push(if px == key { 0 } else { opaque });
    }

    SampleRow { channels, depth: row.depth, samples }
}

/// Bring every sample to 8 bits: exact bit replication below 8, top byte at 16.
pub fn scale_to_8(row: SampleRow) -> SampleRow {
    let scale = |v: u16| match row.depth {
        1 => v * 0xff,
        2 => v * 0x55,
        4 => v * 0x11,
        16 => v >> 8,
        _ => v,
    };
    let samples = row.samples.iter().map(|&v| scale(v)).collect();
    SampleRow { channels: row.channels, depth: 8, samples }
}

/// G -> GGG, GA -> GGGA.
pub fn gray_to_rgb(row: SampleRow) -> SampleRow {
    let has_alpha = row.channels == 2;
    let channels = if has_alpha { 4 } else { 3 };
    let mut samples = Vec::with_capacity(row.samples.len() / row.channels * channels);

    for px in row.samples.chunks_exact(row.channels) {
        samples.extend_from_slice(&[px[0], px[0], px[0]]);
        if has_alpha {
            samples.push(px[1]);
        }
    }

    SampleRow { channels, depth: row.depth, samples }
}

/// Planned normalization for one source encoding.
#[derive(Clone, Debug)]
pub struct Normalizer {
    encoding: SourceEncoding,
    palette: Vec<[u8; 3]>,
    transparency: Transparency,
    steps: Vec<Step>,
    out_channels: usize,
}

impl Normalizer {
    /// `palette` is a packed RGB PLTE payload, `trns` the raw tRNS payload.
    pub fn new(encoding: SourceEncoding, palette: Option<&[u8]>, trns: Option<&[u8]>) -> Result<Self> {
        let palette: Vec<[u8; 3]> = palette
            .unwrap_or_default()
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect();
        if encoding.color == ColorModel::Indexed && palette.is_empty() {
            return Err(Error::decode("indexed image without a palette"));
        }

        let transparency = Transparency::from_trns(encoding, trns);

        let mut steps = Vec::new();
        if encoding.color == ColorModel::Indexed {
            steps.push(Step::ExpandPalette);
        }
        if matches!(transparency, Transparency::Key(_)) {
            steps.push(Step::KeyToAlpha);
        }
        if encoding.color != ColorModel::Indexed && encoding.bit_depth != 8 {
            steps.push(Step::ScaleTo8);
        }
        if encoding.color.is_gray() {
            steps.push(Step::GrayToRgb);
        }

        let has_alpha = matches!(
            encoding.color,
            ColorModel::GrayscaleAlpha | ColorModel::TruecolorAlpha
        ) || transparency != Transparency::Opaque;
        let out_channels = if has_alpha { 4 } else { 3 };

        Ok(Self { encoding, palette, transparency, steps, out_channels })
    }

    pub fn encoding(&self) -> SourceEncoding { self.encoding }
    pub fn plan(&self) -> &[Step] { &self.steps }
    pub fn output_channels(&self) -> usize { self.out_channels }

    /// Run one packed source row through the plan into `out` (one canonical row).
    pub fn normalize_row(&self, raw: &[u8], width: usize, out: &mut [u8]) -> Result<()> {
        let mut row = unpack(raw, width, self.encoding)?;

        for step in &self.steps {
            row = match step {
                Step::ExpandPalette => {
                    let alpha = match &self.transparency {
                        Transparency::Palette(a) => Some(a.as_slice()),
                        _ => None,
                    };
                    expand_palette(row, &self.palette, alpha)?
                }
                Step::KeyToAlpha => match &self.transparency {
                    Transparency::Key(key) => key_to_alpha(row, key),
                    _ => row,
                },
                Step::ScaleTo8 => scale_to_8(row),
                Step::GrayToRgb => gray_to_rgb(row),
            };
        }

        if row.channels != self.out_channels || row.samples.len() != out.len() {
            return Err(Error::decode(format!(
                "normalized row has {} samples ({} channels), expected {}",
                row.samples.len(),
                row.channels,
                out.len()
            )));
        }

        // every sample is 8-bit by now
        for (dst, &v) in out.iter_mut().zip(&row.samples) {
            *dst = v as u8;
        }
        Ok(())
    }
}
