// pipeline.rs - Image file to smoothed heightmap
//
// Pipeline:
//   1. Pick the decoder from the file extension (tga, png)
//   2. Decode into a canonical 8-bit buffer
//   3. Average channels into a heightmap, drop the buffer
//   4. Smooth K passes
//   5. Hand the grid to a sink (the mesh generator)
//
// Any failure stops the run and is returned as-is.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::canonical::CAPACITY_BOUND;
use crate::codec::SourceFormat;
use crate::error::{Error, Result};
use crate::heightmap::{derive_heightmap, smooth, HeightmapGrid, DEFAULT_SMOOTHING_PASSES, HEIGHTMAP_CAPACITY};

pub const DEFAULT_THRESHOLD: f32 = 0.1;
pub const DEFAULT_HORIZONTAL_SCALE: u32 = 128; // pixels per inch
pub const DEFAULT_VERTICAL_SCALE: u32 = 256; // shades per inch

/// Parameters for the mesh generator. Passed through untouched.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeshParams {
    /// Maximum mesh/heightmap error.
    pub threshold: f32,
    /// Pixels per inch.
    pub horizontal_scale: u32,
    /// Intensity steps per inch.
    pub vertical_scale: u32,
}

impl MeshParams {
    /// Model units per pixel.
    pub fn xy_scale(&self) -> f32 {
        1.0 / self.horizontal_scale as f32
    }

    /// Model units per intensity step.
    pub fn z_scale(&self) -> f32 {
        1.0 / self.vertical_scale as f32
    }
}

impl Default for MeshParams {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            horizontal_scale: DEFAULT_HORIZONTAL_SCALE,
            vertical_scale: DEFAULT_VERTICAL_SCALE,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub smoothing_passes: u32,
    /// Byte bound for the canonical pixel buffer.
    pub capacity: usize,
    /// Cell bound for the heightmap.
    pub heightmap_capacity: usize,
    pub mesh: MeshParams,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            smoothing_passes: DEFAULT_SMOOTHING_PASSES,
            capacity: CAPACITY_BOUND,
            heightmap_capacity: HEIGHTMAP_CAPACITY,
            mesh: MeshParams::default(),
        }
    }
}

/// Consumer of the finished heightmap, typically the mesh generator.
pub trait HeightmapSink {
    type Output;

    fn accept(&mut self, grid: HeightmapGrid, params: &MeshParams) -> Self::Output;
}

pub struct Pipeline {
    config: Config,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Decode, derive and smooth the image at `path`.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<HeightmapGrid> {
        let path = path.as_ref();
        let format = SourceFormat::from_path(path)?;

        tracing::info!(path = %path.display(), ?format, "loading");
        let file = File::open(path).map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })?;

        self.process(format, BufReader::new(file))
    }

    /// Same as [`Pipeline::load`] for an image already in memory.
    pub fn load_bytes(&self, bytes: &[u8], format: SourceFormat) -> Result<HeightmapGrid> {
        self.process(format, bytes)
    }

    /// Load `path` and hand the grid to `sink`.
    pub fn run<P, S>(&self, path: P, sink: &mut S) -> Result<S::Output>
    where
        P: AsRef<Path>,
        S: HeightmapSink,
    {
        let grid = self.load(path)?;
        tracing::info!(width = grid.width(), height = grid.height(), "handing off heightmap");
        Ok(sink.accept(grid, &self.config.mesh))
    }

    fn process<R: std::io::Read>(&self, format: SourceFormat, reader: R) -> Result<HeightmapGrid> {
        let buffer = format.decode_within(reader, self.config.capacity, self.config.heightmap_capacity)?;
        tracing::info!(
            width = buffer.width(),
            height = buffer.height(),
            channels = buffer.channels(),
            "generating heightmap from pixel data"
        );

        let mut grid = derive_heightmap(&buffer, self.config.heightmap_capacity)?;
        drop(buffer);

        smooth(&mut grid, self.config.smoothing_passes);
        Ok(grid)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn defaults_match_tool_defaults() {
        let config = Config::default();
        assert_eq!(config.smoothing_passes, 2);
        assert_eq!(config.capacity, 8192 * 8192 * 4);
        assert_eq!(config.heightmap_capacity, 2048 * 2048);
        assert_eq!(config.mesh.horizontal_scale, 128);
        assert_eq!(config.mesh.vertical_scale, 256);
        assert_eq!(config.mesh.xy_scale(), 1.0 / 128.0);
        assert_eq!(config.mesh.z_scale(), 1.0 / 256.0);
    }

    #[test]
    fn unsupported_extension_fails_before_open() {
        // the file doesn't exist: a FileError here would mean we tried to read it
        let err = Pipeline::default().load("does/not/exist.bmp").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(matches!(err, Error::UnsupportedFormat { .. }));
    }

    #[test]
    fn missing_file_is_file_error() {
        let err = Pipeline::default().load("does/not/exist.png").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::File);
    }

    #[test]
    fn heightmap_bound_checked_before_decoding() {
        // 4096x4096 gray TGA header with no pixel data behind it
        let mut header = [0u8; 18];
        header[2] = 3;
        header[12..14].copy_from_slice(&4096u16.to_le_bytes());
        header[14..16].copy_from_slice(&4096u16.to_le_bytes());
        header[16] = 8;

        let err = Pipeline::default().load_bytes(&header, SourceFormat::Tga).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Capacity);

        let unbounded = Pipeline::new(Config { heightmap_capacity: usize::MAX, ..Config::default() });
        let err = unbounded.load_bytes(&header, SourceFormat::Tga).unwrap_err();
        assert_ne!(err.kind(), ErrorKind::Capacity);
    }

    #[test]
    fn bytes_with_wrong_signature() {
        let err = Pipeline::default()
            .load_bytes(b"GIF89a..........", SourceFormat::Png)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }
}
