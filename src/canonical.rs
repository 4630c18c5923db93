// canonical.rs - Uniform 8-bit pixel buffer produced by every decoder
//
// Layout: row-major, `channels` interleaved u8 samples per pixel,
// stride = width * channels. Allocation is checked against a fixed
// capacity bound before any memory is committed.

use crate::error::{Error, Result};

// Capacity limits
pub const MAX_IMAGE_DIMENSION: usize = 8192;
pub const MAX_IMAGE_CHANNELS: usize = 4;
pub const CAPACITY_BOUND: usize = MAX_IMAGE_DIMENSION * MAX_IMAGE_DIMENSION * MAX_IMAGE_CHANNELS;

/// Decoded image with a fixed sample width of 8 bits.
#[derive(Clone, Debug, PartialEq)]
pub struct CanonicalImageBuffer {
    width: u32,
    height: u32,
    channels: usize,
    data: Vec<u8>,
}

/// Bytes needed for a `width x height x channels` buffer, or `None` on overflow.
pub fn required_bytes(width: u32, height: u32, channels: usize) -> Option<usize> {
    (width as usize)
        .checked_mul(channels)?
        .checked_mul(height as usize)
}

/// Fails with `TooLarge` unless the buffer fits in `capacity` bytes.
pub fn check_capacity(width: u32, height: u32, channels: usize, capacity: usize) -> Result<usize> {
    match required_bytes(width, height, channels) {
        Some(n) if n <= capacity => Ok(n),
        _ => Err(Error::TooLarge { width, height, channels, capacity }),
    }
}

/// Fails with `TooLarge` unless `width * height` fits in `cells`.
pub fn check_cells(width: u32, height: u32, cells: usize) -> Result<()> {
    match (width as usize).checked_mul(height as usize) {
        Some(n) if n <= cells => Ok(()),
        _ => Err(Error::TooLarge { width, height, channels: 1, capacity: cells }),
    }
}

impl CanonicalImageBuffer {
    /// Zero-filled buffer, validated against `capacity` before allocating.
    pub fn allocate(width: u32, height: u32, channels: usize, capacity: usize) -> Result<Self> {
        if !(1..=MAX_IMAGE_CHANNELS).contains(&channels) {
            return Err(Error::decode(format!("unsupported channel count {channels}")));
        }
        let len = check_capacity(width, height, channels, capacity)?;

        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| Error::TooLarge { width, height, channels, capacity })?;
        data.resize(len, 0);

        Ok(Self { width, height, channels, data })
    }

    /// Wrap existing samples. Length must match the dimensions exactly.
    pub fn from_samples(width: u32, height: u32, channels: usize, data: Vec<u8>) -> Result<Self> {
        if !(1..=MAX_IMAGE_CHANNELS).contains(&channels) {
            return Err(Error::decode(format!("unsupported channel count {channels}")));
        }
        let len = check_capacity(width, height, channels, CAPACITY_BOUND)?;
        if data.len() != len {
            return Err(Error::decode(format!(
                "expected {len} samples for {width}x{height}x{channels}, got {}",
                data.len()
            )));
        }
        Ok(Self { width, height, channels, data })
    }

    pub fn width(&self) -> u32 { self.width }
    pub fn height(&self) -> u32 { self.height }
    pub fn channels(&self) -> usize { self.channels }
    pub fn stride(&self) -> usize { self.width as usize * self.channels }
    pub fn samples(&self) -> &[u8] { &self.data }

    pub fn row(&self, y: usize) -> &[u8] {
        let s = self.stride();
        &self.data[y * s..(y + 1) * s]
    }

    pub fn row_mut(&mut self, y: usize) -> &mut [u8] {
        let s = self.stride();
        &mut self.data[y * s..(y + 1) * s]
    }

    /// Per-pixel sample runs in row-major order.
    pub fn pixels(&self) -> std::slice::ChunksExact<'_, u8> {
        self.data.chunks_exact(self.channels)
    }
}
