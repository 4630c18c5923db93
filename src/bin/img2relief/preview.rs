// preview.rs - Heightmap summary and grayscale preview output
//
// Stands in for the mesh stage: receives the finished heightmap, reports
// its size and range, and optionally saves it as an 8-bit PNG.

use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result};
use image::{GrayImage, Luma};

use relief_engine::{HeightmapGrid, HeightmapSink, MeshParams};

pub struct Summary {
    width: usize,
    height: usize,
    min: f32,
    max: f32,
    mean: f32,
    model_size: (f32, f32, f32),
    preview: Option<PathBuf>,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (mx, my, mz) = self.model_size;
        writeln!(f, "heightmap {}x{}", self.width, self.height)?;
        writeln!(f, "  height range {:.2}..{:.2} (mean {:.2})", self.min, self.max, self.mean)?;
        write!(f, "  model extent {mx:.3} x {my:.3} x {mz:.3} in")?;
        if let Some(path) = &self.preview {
            write!(f, "\n  preview written to {}", path.display())?;
        }
        Ok(())
    }
}

pub struct Report {
    preview: Option<PathBuf>,
}

impl Report {
    pub fn new(preview: Option<PathBuf>) -> Self {
        Self { preview }
    }
}

/// Heights are already in 0..=255; round to the nearest shade.
fn to_gray(grid: &HeightmapGrid) -> GrayImage {
    let (w, h) = (grid.width() as u32, grid.height() as u32);
    GrayImage::from_fn(w, h, |x, y| {
        let v = grid.get(x as usize, y as usize).unwrap_or(0.0);
        Luma([v.round().clamp(0.0, 255.0) as u8])
    })
}

impl HeightmapSink for Report {
    type Output = Result<Summary>;

    fn accept(&mut self, grid: HeightmapGrid, params: &MeshParams) -> Result<Summary> {
        let (min, max, mean) = grid.stats();
        let model_size = (
            grid.width() as f32 * params.xy_scale(),
            grid.height() as f32 * params.xy_scale(),
            max * params.z_scale(),
        );

        if let Some(path) = &self.preview {
            tracing::info!(path = %path.display(), "saving preview");
            to_gray(&grid)
                .save(path)
                .with_context(|| format!("unable to write preview {}", path.display()))?;
        }

        Ok(Summary {
            width: grid.width(),
            height: grid.height(),
            min,
            max,
            mean,
            model_size,
            preview: self.preview.clone(),
        })
    }
}
