//! CPU-side assets for the shell renderer.
//! - `fur`: procedural density textures (fur-strand dot patterns).
//! - `sphere` / `obj`: the two mesh providers behind [`MeshSource`].
//! - `texture`: RGBA8 diffuse maps.

pub mod fur;
pub mod mesh;
pub mod obj;
pub mod source;
pub mod sphere;
pub mod texture;

pub use fur::{DensityTexture, DotDensity, FurError, FurLayerSet, FurParams};
pub use mesh::{MeshData, MeshVertex};
pub use source::{MeshSource, ObjSource, SphereSource};
pub use sphere::SphereParams;
pub use texture::TextureData;
