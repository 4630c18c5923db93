// relief-engine - Image to heightmap front end for solid-model generation
//
// PNG or TGA in, smoothed f32 heightmap out. Every source encoding is
// first normalized into one bounded 8-bit buffer, then averaged per pixel
// and box smoothed. Meshing and STL output live downstream.

pub mod canonical;
pub mod codec;
pub mod error;
pub mod heightmap;
pub mod pipeline;
pub mod web;

pub use canonical::{CanonicalImageBuffer, CAPACITY_BOUND};
pub use codec::SourceFormat;
pub use error::{Error, ErrorKind, Result};
pub use heightmap::{derive_heightmap, smooth, HeightmapGrid};
pub use pipeline::{Config, HeightmapSink, MeshParams, Pipeline};
pub use web::HeightmapView;
