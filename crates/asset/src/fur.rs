//! Procedural fur density textures.
//!
//! A density texture is a tileable single-channel image made of soft round
//! "dots"; each dot is the cross-section of a strand. The shell renderer
//! samples it per layer and discards fragments whose density falls below the
//! layer height, so strands taper towards the tips.
//!
//! Generation is deterministic for a fixed parameter set and random source.
//! The random source is always supplied by the caller, so several textures can
//! be generated independently (and in parallel) from distinct seeds.

use std::path::Path;

use anyhow::Context;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use thiserror::Error;

/// Dot sizes used by the demo, largest first.
pub const DEFAULT_DOT_SIZES: [f32; 5] = [0.016, 0.012, 0.008, 0.004, 0.0008];

#[derive(Debug, Error, PartialEq)]
pub enum FurError {
    #[error("texture dimensions must be non-zero, got {width}x{height}")]
    ZeroDimensions { width: u32, height: u32 },

    #[error("dot size must be in (0, 1], got {0}")]
    DotSize(f32),

    #[error("pixels per dot must be non-zero")]
    ZeroDensity,

    #[error("at least one dot size is required")]
    NoLayers,
}

/// How many dots a texture receives, as one dot per N pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DotDensity {
    /// One dot per 1000 pixels.
    #[default]
    Sparse,
    /// One dot per 100 pixels.
    Medium,
    /// One dot per 10 pixels.
    Dense,
    /// One dot per the given number of pixels.
    PixelsPerDot(u32),
}

impl DotDensity {
    pub fn pixels_per_dot(self) -> u32 {
        match self {
            DotDensity::Sparse => 1000,
            DotDensity::Medium => 100,
            DotDensity::Dense => 10,
            DotDensity::PixelsPerDot(n) => n,
        }
    }
}

/// Parameters for one density texture.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FurParams {
    pub width: u32,
    pub height: u32,
    /// Dot diameter as a fraction of `min(width, height)`.
    pub dot_size: f32,
    pub density: DotDensity,
}

impl FurParams {
    pub fn new(width: u32, height: u32, dot_size: f32) -> Self {
        Self {
            width,
            height,
            dot_size,
            density: DotDensity::default(),
        }
    }

    pub fn with_density(mut self, density: DotDensity) -> Self {
        self.density = density;
        self
    }

    pub fn validate(&self) -> Result<(), FurError> {
        if self.width == 0 || self.height == 0 {
            return Err(FurError::ZeroDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if !(self.dot_size > 0.0 && self.dot_size <= 1.0) {
            return Err(FurError::DotSize(self.dot_size));
        }
        if self.density.pixels_per_dot() == 0 {
            return Err(FurError::ZeroDensity);
        }
        Ok(())
    }

    pub fn dot_count(&self) -> usize {
        let pixels = self.width as u64 * self.height as u64;
        (pixels / self.density.pixels_per_dot().max(1) as u64) as usize
    }

    /// Radius before per-dot jitter, in pixels.
    pub fn base_radius(&self) -> f32 {
        self.dot_size * self.width.min(self.height) as f32 / 2.0
    }
}

/// A single dot: integer centre inside the texture and radius in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dot {
    pub cx: u32,
    pub cy: u32,
    pub radius: u32,
}

/// Single-channel 8-bit texture with toroidal addressing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DensityTexture {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl DensityTexture {
    /// All-zero texture.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize],
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row-major texels, `width` bytes per row.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Sample with wraparound on both axes.
    #[inline]
    pub fn get(&self, x: i64, y: i64) -> u8 {
        self.data[self.wrapped_index(x, y)]
    }

    pub fn max_value(&self) -> u8 {
        self.data.iter().copied().max().unwrap_or(0)
    }

    /// Fraction of texels that are non-zero.
    pub fn coverage(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().filter(|&&v| v > 0).count() as f32 / self.data.len() as f32
    }

    #[inline]
    fn wrap(&self, x: i64, y: i64) -> (u32, u32) {
        (
            x.rem_euclid(self.width as i64) as u32,
            y.rem_euclid(self.height as i64) as u32,
        )
    }

    #[inline]
    fn wrapped_index(&self, x: i64, y: i64) -> usize {
        let (px, py) = self.wrap(x, y);
        py as usize * self.width as usize + px as usize
    }

    /// Write the texture as an 8-bit grayscale PNG.
    pub fn save_png(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let img = image::GrayImage::from_raw(self.width, self.height, self.data.clone())
            .context("Density texture buffer does not match its dimensions")?;
        img.save(path)
            .with_context(|| format!("Failed to write density texture {}", path.display()))?;
        log::info!("Wrote density texture {}x{} to {}", self.width, self.height, path.display());
        Ok(())
    }
}

/// Draw the dot list for one texture from `rng`.
///
/// Each dot consumes three draws: centre x, centre y, size jitter.
pub fn generate_dots<R: Rng>(params: &FurParams, rng: &mut R) -> Vec<Dot> {
    let base = params.base_radius();
    (0..params.dot_count())
        .map(|_| {
            let cx = rng.random_range(0..params.width);
            let cy = rng.random_range(0..params.height);
            // ±20% jitter in 1% steps.
            let jitter = 0.8 + 0.4 * rng.random_range(0..100u32) as f32 / 100.0;
            Dot {
                cx,
                cy,
                radius: (base * jitter) as u32,
            }
        })
        .collect()
}

/// Rasterise one dot with radial falloff and MAX compositing.
///
/// Intensity is `1 - (d/r)^2`, attenuated by `1 - 0.5 * y/height` where `y` is
/// the wrapped row. Existing texels are only ever raised.
pub fn stamp_dot(texture: &mut DensityTexture, dot: Dot) {
    let r = dot.radius as i64;
    let r2 = r * r;
    let height = texture.height as f32;

    for dy in -r..=r {
        for dx in -r..=r {
            let d2 = dx * dx + dy * dy;
            if d2 > r2 {
                continue;
            }
            let (px, py) = texture.wrap(dot.cx as i64 + dx, dot.cy as i64 + dy);

            let falloff = if r == 0 { 1.0 } else { 1.0 - d2 as f32 / r2 as f32 };
            let value = falloff * (1.0 - 0.5 * py as f32 / height);
            let quantised = (value.clamp(0.0, 1.0) * 255.0) as u8;

            let idx = py as usize * texture.width as usize + px as usize;
            let texel = &mut texture.data[idx];
            *texel = (*texel).max(quantised);
        }
    }
}

/// Generate one density texture from a caller-supplied random source.
pub fn generate<R: Rng>(params: &FurParams, rng: &mut R) -> Result<DensityTexture, FurError> {
    params.validate()?;
    let mut texture = DensityTexture::new(params.width, params.height);
    for dot in generate_dots(params, rng) {
        stamp_dot(&mut texture, dot);
    }
    Ok(texture)
}

/// Generate one density texture from a fresh ChaCha8 stream seeded with `seed`.
pub fn generate_seeded(params: &FurParams, seed: u64) -> Result<DensityTexture, FurError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    generate(params, &mut rng)
}

/// Ordered set of density textures sharing one size, one per dot size.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FurLayerSet {
    width: u32,
    height: u32,
    layers: Vec<DensityTexture>,
}

impl FurLayerSet {
    /// Generate one texture per entry of `dot_sizes`, in that order.
    ///
    /// Layer `i` uses its own stream seeded with `seed + i`, so layers are
    /// independent of each other and of generation order.
    pub fn generate(
        width: u32,
        height: u32,
        dot_sizes: &[f32],
        density: DotDensity,
        seed: u64,
    ) -> Result<Self, FurError> {
        if dot_sizes.is_empty() {
            return Err(FurError::NoLayers);
        }
        let layers = dot_sizes
            .par_iter()
            .enumerate()
            .map(|(i, &dot_size)| {
                let params = FurParams::new(width, height, dot_size).with_density(density);
                generate_seeded(&params, seed.wrapping_add(i as u64))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            width,
            height,
            layers,
        })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    #[inline]
    pub fn layers(&self) -> &[DensityTexture] {
        &self.layers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stamped(width: u32, height: u32, dot: Dot) -> DensityTexture {
        let mut tex = DensityTexture::new(width, height);
        stamp_dot(&mut tex, dot);
        tex
    }

    #[test]
    fn rejects_invalid_parameters() {
        assert_eq!(
            FurParams::new(0, 16, 0.5).validate(),
            Err(FurError::ZeroDimensions { width: 0, height: 16 })
        );
        assert_eq!(FurParams::new(16, 16, 0.0).validate(), Err(FurError::DotSize(0.0)));
        assert_eq!(FurParams::new(16, 16, 1.5).validate(), Err(FurError::DotSize(1.5)));
        assert_eq!(
            FurParams::new(16, 16, 0.5)
                .with_density(DotDensity::PixelsPerDot(0))
                .validate(),
            Err(FurError::ZeroDensity)
        );
        assert!(FurParams::new(16, 16, 1.0).validate().is_ok());
    }

    #[test]
    fn dot_count_follows_density() {
        let p = FurParams::new(2048, 2048, 0.016);
        assert_eq!(p.dot_count(), 2048 * 2048 / 1000);
        assert_eq!(p.with_density(DotDensity::Dense).dot_count(), 2048 * 2048 / 10);
    }

    #[test]
    fn jittered_radius_stays_within_twenty_percent() {
        let p = FurParams::new(512, 256, 0.25).with_density(DotDensity::Medium);
        let base = p.base_radius();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let dots = generate_dots(&p, &mut rng);
        assert_eq!(dots.len(), p.dot_count());
        for d in dots {
            assert!(d.cx < 512 && d.cy < 256);
            assert!(d.radius as f32 >= (base * 0.8).floor());
            assert!(d.radius as f32 <= base * 1.2);
        }
    }

    #[test]
    fn centre_value_follows_vertical_gradient() {
        let tex = stamped(64, 64, Dot { cx: 10, cy: 32, radius: 4 });
        // 1 - 0.5 * 32/64 = 0.75
        assert_eq!(tex.get(10, 32), (0.75f32 * 255.0) as u8);
        // Outside the disc nothing is painted.
        assert_eq!(tex.get(10, 37), 0);
        assert_eq!(tex.get(15, 32), 0);
        // Falloff: edge texels are dimmer than the centre.
        assert!(tex.get(13, 32) < tex.get(11, 32));
    }

    #[test]
    fn zero_radius_paints_single_texel() {
        let tex = stamped(8, 8, Dot { cx: 3, cy: 0, radius: 0 });
        assert_eq!(tex.get(3, 0), 255);
        assert_eq!(tex.as_bytes().iter().filter(|&&v| v > 0).count(), 1);
    }

    #[test]
    fn samples_stay_in_byte_range_for_full_size_dots() {
        let p = FurParams::new(32, 24, 1.0).with_density(DotDensity::Dense);
        let tex = generate_seeded(&p, 11).expect("valid params");
        assert_eq!(tex.as_bytes().len(), 32 * 24);
        assert!(tex.max_value() > 0);
        assert!(tex.coverage() > 0.5);
    }

    #[test]
    fn max_blend_is_idempotent() {
        let p = FurParams::new(128, 128, 0.1).with_density(DotDensity::Medium);
        let dots = generate_dots(&p, &mut ChaCha8Rng::seed_from_u64(5));

        let mut once = DensityTexture::new(128, 128);
        for &d in &dots {
            stamp_dot(&mut once, d);
        }
        let mut twice = once.clone();
        for &d in &dots {
            stamp_dot(&mut twice, d);
        }
        assert_eq!(once, twice);
    }

    #[test]
    fn overlapping_dots_never_darken() {
        let mut tex = DensityTexture::new(32, 32);
        stamp_dot(&mut tex, Dot { cx: 10, cy: 10, radius: 5 });
        let before = tex.clone();
        stamp_dot(&mut tex, Dot { cx: 13, cy: 10, radius: 5 });
        for (a, b) in before.as_bytes().iter().zip(tex.as_bytes()) {
            assert!(b >= a);
        }
    }

    #[test]
    fn dot_on_left_edge_wraps_to_right_columns() {
        let (w, h) = (64u32, 32u32);
        let edge = stamped(w, h, Dot { cx: 0, cy: 12, radius: 6 });
        let centred = stamped(w, h, Dot { cx: w / 2, cy: 12, radius: 6 });

        // Column w-1 is one step left of the edge dot's centre.
        assert!(edge.get(w as i64 - 1, 12) > 0);
        for y in 0..h as i64 {
            for x in 0..w as i64 {
                assert_eq!(edge.get(x, y), centred.get(x + (w / 2) as i64, y), "at ({x}, {y})");
            }
        }
    }

    #[test]
    fn dot_on_top_edge_wraps_to_bottom_rows() {
        let tex = stamped(16, 16, Dot { cx: 8, cy: 0, radius: 3 });
        assert!(tex.get(8, 15) > 0);
        assert!(tex.get(8, 14) > 0);
        // Rim texels have zero falloff; beyond the rim nothing is painted.
        assert_eq!(tex.get(8, 13), 0);
        assert_eq!(tex.get(8, 12), 0);
    }

    #[test]
    fn same_seed_reproduces_layer_set() {
        let a = FurLayerSet::generate(96, 96, &DEFAULT_DOT_SIZES, DotDensity::Medium, 42)
            .expect("generate");
        let b = FurLayerSet::generate(96, 96, &DEFAULT_DOT_SIZES, DotDensity::Medium, 42)
            .expect("generate");
        assert_eq!(a.len(), 5);
        assert_eq!(a, b);
    }

    #[test]
    fn layers_are_independent_streams() {
        let set = FurLayerSet::generate(128, 128, &[0.05, 0.05], DotDensity::Medium, 7)
            .expect("generate");
        assert_ne!(set.layers()[0], set.layers()[1]);

        // Layer 1 equals a standalone texture seeded with seed + 1.
        let p = FurParams::new(128, 128, 0.05).with_density(DotDensity::Medium);
        assert_eq!(set.layers()[1], generate_seeded(&p, 8).expect("generate"));
    }

    #[test]
    fn layer_set_propagates_errors() {
        assert_eq!(
            FurLayerSet::generate(16, 16, &[], DotDensity::Sparse, 0),
            Err(FurError::NoLayers)
        );
        assert_eq!(
            FurLayerSet::generate(16, 16, &[0.1, 2.0], DotDensity::Sparse, 0),
            Err(FurError::DotSize(2.0))
        );
    }
}
