// heightmap/ - Scalar elevation grid
//
// One f32 per source pixel, row-major, indexed [y, x]. Derived from the
// canonical buffer by channel averaging, then box smoothed in place.

mod derive;
mod smooth;

pub use self::derive::*;
pub use self::smooth::*;

use ndarray::Array2;

use crate::error::{Error, Result};

// Heightmap bound: at most MAX_HEIGHTMAP_DIMENSION^2 cells
pub const MAX_HEIGHTMAP_DIMENSION: usize = 2048;
pub const HEIGHTMAP_CAPACITY: usize = MAX_HEIGHTMAP_DIMENSION * MAX_HEIGHTMAP_DIMENSION;

#[derive(Clone, Debug, PartialEq)]
pub struct HeightmapGrid {
    values: Array2<f32>,
}

impl HeightmapGrid {
    /// Grid from row-major values; `values.len()` must equal `width * height`.
    pub fn from_values(width: usize, height: usize, values: Vec<f32>) -> Result<Self> {
        let values = Array2::from_shape_vec((height, width), values)
            .map_err(|e| Error::decode(format!("heightmap shape {width}x{height}: {e}")))?;
        Ok(Self { values })
    }

    pub(crate) fn from_array(values: Array2<f32>) -> Self {
        Self { values }
    }

    pub fn width(&self) -> usize { self.values.ncols() }
    pub fn height(&self) -> usize { self.values.nrows() }

    /// Value at column `x`, row `y`.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        self.values.get((y, x)).copied()
    }

    pub fn values(&self) -> &Array2<f32> { &self.values }

    pub(crate) fn values_mut(&mut self) -> &mut Array2<f32> { &mut self.values }

    /// Row-major view, None only if the layout isn't standard.
    pub fn as_slice(&self) -> Option<&[f32]> {
        self.values.as_slice()
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.values.iter().copied().collect()
    }

    /// (min, max, mean) over all cells.
    pub fn stats(&self) -> (f32, f32, f32) {
        let (min, max) = self
            .values
            .iter()
            .fold((f32::MAX, f32::MIN), |(mn, mx), &v| (mn.min(v), mx.max(v)));
        let mean = self.values.mean().unwrap_or(0.0);
        (min, max, mean)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexing_is_x_then_y() {
        let grid = HeightmapGrid::from_values(3, 2, vec![0., 1., 2., 3., 4., 5.]).unwrap();
        assert_eq!((grid.width(), grid.height()), (3, 2));
        assert_eq!(grid.get(2, 0), Some(2.0));
        assert_eq!(grid.get(0, 1), Some(3.0));
        assert_eq!(grid.get(3, 0), None);
        assert_eq!(grid.as_slice().unwrap().len(), 6);
    }

    #[test]
    fn wrong_length_rejected() {
        assert!(HeightmapGrid::from_values(3, 2, vec![0.0; 5]).is_err());
    }

    #[test]
    fn stats_cover_all_cells() {
        let grid = HeightmapGrid::from_values(2, 2, vec![1., 3., 5., 7.]).unwrap();
        assert_eq!(grid.stats(), (1.0, 7.0, 4.0));
    }
}
