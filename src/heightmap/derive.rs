// derive.rs - Canonical pixels to heightmap values
//
// Height is the plain mean of a pixel's channel samples: no perceptual
// weighting, no rescaling. Channel order doesn't matter.

use ndarray::Array2;

use super::HeightmapGrid;
use crate::canonical::{check_cells, CanonicalImageBuffer};
use crate::error::{Error, Result};

/// Mean of one pixel's samples.
#[inline]
pub fn channel_mean(px: &[u8]) -> f32 {
    let sum = px.iter().fold(0.0f32, |acc, &s| acc + s as f32);
    sum / px.len() as f32
}

/// Average every pixel of `buffer` into a grid of at most `cell_capacity` cells.
pub fn derive_heightmap(buffer: &CanonicalImageBuffer, cell_capacity: usize) -> Result<HeightmapGrid> {
    check_cells(buffer.width(), buffer.height(), cell_capacity)?;
    let (w, h) = (buffer.width() as usize, buffer.height() as usize);

    let values: Vec<f32> = buffer.pixels().map(channel_mean).collect();
    let values = Array2::from_shape_vec((h, w), values)
        .map_err(|e| Error::decode(format!("heightmap shape {w}x{h}: {e}")))?;

    tracing::debug!(width = w, height = h, channels = buffer.channels(), "heightmap derived");
    Ok(HeightmapGrid::from_array(values))
}
