//! Diffuse texture data (RGBA8) prior to GPU upload.

use std::path::Path;

use anyhow::{Context, Result};

/// Texture data in CPU-friendly format before GPU upload.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureData {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl TextureData {
    pub const BYTES_PER_PIXEL: u32 = 4;

    /// Wrap RGBA8 pixels; fails when the buffer does not match the dimensions.
    pub fn new_rgba8(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * Self::BYTES_PER_PIXEL as usize;
        anyhow::ensure!(
            data.len() == expected && width > 0 && height > 0,
            "RGBA8 buffer of {} bytes does not match {}x{}",
            data.len(),
            width,
            height
        );
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// 1x1 texture of a single colour; used when a mesh has no diffuse map.
    pub fn solid(rgba: [u8; 4]) -> Self {
        Self {
            data: rgba.to_vec(),
            width: 1,
            height: 1,
        }
    }

    /// Load an image file and convert it to RGBA8.
    pub fn load_png<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        log::info!("Loading texture from {}", path.display());

        let img = image::open(path)
            .with_context(|| format!("Failed to open image {}", path.display()))?;
        // GL-style bottom-left origin for uv (v = 0 at the bottom row).
        let rgba = image::imageops::flip_vertical(&img.to_rgba8());
        let (width, height) = rgba.dimensions();
        let data = rgba.into_raw();

        log::info!("Loaded texture {}x{} with {} bytes", width, height, data.len());
        Self::new_rgba8(width, height, data)
    }

    pub fn bytes_per_row(&self) -> u32 {
        self.width * Self::BYTES_PER_PIXEL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solid_texture_is_one_pixel() {
        let t = TextureData::solid([255, 255, 255, 255]);
        assert_eq!((t.width, t.height), (1, 1));
        assert_eq!(t.bytes_per_row(), 4);
    }

    #[test]
    fn rejects_mismatched_buffer() {
        assert!(TextureData::new_rgba8(2, 2, vec![0; 15]).is_err());
        assert!(TextureData::new_rgba8(0, 0, vec![]).is_err());
        assert!(TextureData::new_rgba8(2, 1, vec![0; 8]).is_ok());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = TextureData::load_png("does/not/exist.png").expect_err("must fail");
        assert!(format!("{err:#}").contains("does/not/exist.png"));
    }
}
