// smooth.rs - 3x3 box smoothing
//
// Each pass reads only from a snapshot of the grid taken at the start of
// the pass, so no cell sees a neighbor's update from the same pass.
// Border cells are never written and indices never wrap.

use ndarray::{s, Zip};

use super::HeightmapGrid;

pub const DEFAULT_SMOOTHING_PASSES: u32 = 2;

/// Apply `passes` smoothing passes in place. Zero passes leaves the grid untouched.
pub fn smooth(grid: &mut HeightmapGrid, passes: u32) {
    for _ in 0..passes {
        smooth_pass(grid);
    }
    if passes > 0 {
        tracing::debug!(passes, "heightmap smoothed");
    }
}

/// One pass: every interior cell becomes the mean of its 3x3 neighborhood.
pub fn smooth_pass(grid: &mut HeightmapGrid) {
    let (h, w) = grid.values().dim();
    if h < 3 || w < 3 {
        return;
    }

    let snapshot = grid.values().to_owned();
    let interior = grid.values_mut().slice_mut(s![1..h - 1, 1..w - 1]);

    Zip::from(interior)
        .and(snapshot.windows((3, 3)))
        .for_each(|cell, window| {
            *cell = window.iter().fold(0.0f32, |acc, &v| acc + v) / 9.0;
        });
}
