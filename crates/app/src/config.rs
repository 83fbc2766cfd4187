//! Demo configuration: defaults, CLI overrides, validation.

use std::path::PathBuf;

use asset::{DotDensity, SphereParams, fur::DEFAULT_DOT_SIZES};
use corelib::{CoreError, CoreResult, Vec3};
use platform::RunConfig;
use renderer::{BudgetPolicy, MAX_SHELL_LAYERS, ShellParameters};

use crate::cli::{BudgetArg, CliArgs, DensityPreset, GpuBackend};

#[derive(Clone, Debug, PartialEq)]
pub struct DemoConfig {
    pub width: u32,
    pub height: u32,
    pub backend: GpuBackend,

    pub texture_size: u32,
    pub dot_sizes: Vec<f32>,
    pub density: DotDensity,
    pub seed: u64,

    pub layers: u32,
    pub fur_length: f32,
    pub object_color: Vec3,
    pub light_pos: Vec3,
    pub light_color: Vec3,
    pub clear_color: f64,
    pub spin_rate: f32,

    pub sphere: SphereParams,
    pub mesh: Option<PathBuf>,
    pub diffuse: Option<PathBuf>,
    pub shader: Option<PathBuf>,
    pub dump_textures: Option<PathBuf>,
    pub budget_policy: BudgetPolicy,

    pub show_ui: bool,
    pub show_fps: bool,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            backend: GpuBackend::Auto,
            texture_size: 2048,
            dot_sizes: DEFAULT_DOT_SIZES.to_vec(),
            density: DotDensity::Sparse,
            seed: 0,
            layers: 128,
            fur_length: 0.5,
            object_color: Vec3::new(0.2, 0.9, 0.3),
            light_pos: Vec3::new(5.0, 5.0, 5.0),
            light_color: Vec3::ONE,
            clear_color: 0.05,
            spin_rate: 0.3,
            sphere: SphereParams::default(),
            mesh: None,
            diffuse: None,
            shader: None,
            dump_textures: None,
            budget_policy: BudgetPolicy::Clamp,
            show_ui: false,
            show_fps: false,
        }
    }
}

impl DemoConfig {
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(b) = args.gpu_backend {
            self.backend = b;
        }
        if let Some(w) = args.width {
            self.width = w;
        }
        if let Some(h) = args.height {
            self.height = h;
        }
        if let Some(n) = args.layers {
            self.layers = n;
        }
        if let Some(len) = args.fur_length {
            self.fur_length = len;
        }
        if let Some(size) = args.texture_size {
            self.texture_size = size;
        }
        if let Some(ref sizes) = args.dot_sizes {
            self.dot_sizes = sizes.clone();
        }
        if let Some(preset) = args.density {
            self.density = match preset {
                DensityPreset::Sparse => DotDensity::Sparse,
                DensityPreset::Medium => DotDensity::Medium,
                DensityPreset::Dense => DotDensity::Dense,
            };
        }
        if let Some(n) = args.pixels_per_dot {
            self.density = DotDensity::PixelsPerDot(n);
        }
        if let Some(seed) = args.seed {
            self.seed = seed;
        }
        if let Some(ref path) = args.mesh {
            self.mesh = Some(path.clone());
        }
        if let Some(ref path) = args.diffuse {
            self.diffuse = Some(path.clone());
        }
        if let Some(ref path) = args.shader {
            self.shader = Some(path.clone());
        }
        if let Some(ref dir) = args.dump_textures {
            self.dump_textures = Some(dir.clone());
        }
        if let Some(policy) = args.texture_budget {
            self.budget_policy = match policy {
                BudgetArg::Clamp => BudgetPolicy::Clamp,
                BudgetArg::Refuse => BudgetPolicy::Refuse,
            };
        }
        if let Some(rate) = args.spin_rate {
            self.spin_rate = rate;
        }
        self.show_ui |= args.show_ui;
        self.show_fps |= args.show_fps;
    }

    /// Reject settings that cannot produce a picture. Zero layers is allowed.
    pub fn validate(&self) -> CoreResult<()> {
        let invalid = |msg: String| Err(CoreError::InvalidConfig(msg));

        if self.width == 0 || self.height == 0 {
            return invalid(format!("window size {}x{}", self.width, self.height));
        }
        if self.layers > MAX_SHELL_LAYERS {
            return invalid(format!("{} layers exceed the maximum of {MAX_SHELL_LAYERS}", self.layers));
        }
        if self.texture_size == 0 {
            return invalid("texture size must be non-zero".to_owned());
        }
        if self.dot_sizes.is_empty() {
            return invalid("at least one dot size is required".to_owned());
        }
        if let Some(bad) = self.dot_sizes.iter().find(|&&s| !(s > 0.0 && s <= 1.0)) {
            return invalid(format!("dot size {bad} outside (0, 1]"));
        }
        if self.density.pixels_per_dot() == 0 {
            return invalid("pixels per dot must be non-zero".to_owned());
        }
        if !(self.fur_length >= 0.0 && self.fur_length.is_finite()) {
            return invalid(format!("fur length {} must be a finite value >= 0", self.fur_length));
        }
        Ok(())
    }

    pub fn shell_parameters(&self) -> ShellParameters {
        ShellParameters {
            layer_count: self.layers,
            fur_length: self.fur_length,
            base_color: self.object_color,
            light_pos: self.light_pos,
            light_color: self.light_color,
            ..ShellParameters::default()
        }
    }

    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            width: self.width,
            height: self.height,
            backends: self.backend.backends(),
            show_ui: self.show_ui,
            show_fps: self.show_fps,
            params: self.shell_parameters(),
            spin_rate: self.spin_rate,
            clear_color: wgpu::Color {
                r: self.clear_color,
                g: self.clear_color,
                b: self.clear_color,
                a: 1.0,
            },
            budget_policy: self.budget_policy,
            ..RunConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("furshell").chain(args.iter().copied()))
            .expect("args parse")
    }

    #[test]
    fn defaults_describe_the_demo_scene() {
        let cfg = DemoConfig::default();
        assert_eq!((cfg.width, cfg.height), (800, 600));
        assert_eq!(cfg.dot_sizes, vec![0.016, 0.012, 0.008, 0.004, 0.0008]);
        assert_eq!(cfg.density.pixels_per_dot(), 1000);
        assert_eq!(cfg.layers, 128);
        assert_eq!(cfg.texture_size, 2048);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn cli_overrides_only_given_fields() {
        let mut cfg = DemoConfig::default();
        cfg.apply_cli_overrides(&parse(&[
            "--layers",
            "64",
            "--fur-length",
            "0.25",
            "--dot-sizes",
            "0.02,0.01",
            "--density",
            "dense",
            "--gpu-backend",
            "vulkan",
            "--show-ui",
        ]));
        assert_eq!(cfg.layers, 64);
        assert_eq!(cfg.fur_length, 0.25);
        assert_eq!(cfg.dot_sizes, vec![0.02, 0.01]);
        assert_eq!(cfg.density, DotDensity::Dense);
        assert_eq!(cfg.backend.backends(), wgpu::Backends::VULKAN);
        assert!(cfg.show_ui);
        // Untouched
        assert_eq!(cfg.texture_size, 2048);
        assert_eq!(cfg.seed, 0);
        assert!(!cfg.show_fps);
    }

    #[test]
    fn no_args_leaves_defaults() {
        let mut cfg = DemoConfig::default();
        cfg.apply_cli_overrides(&parse(&[]));
        assert_eq!(cfg, DemoConfig::default());
    }

    #[test]
    fn pixels_per_dot_beats_preset() {
        let mut cfg = DemoConfig::default();
        cfg.apply_cli_overrides(&parse(&["--density", "medium", "--pixels-per-dot", "42"]));
        assert_eq!(cfg.density, DotDensity::PixelsPerDot(42));
    }

    #[test]
    fn validation_rejects_unusable_settings() {
        let cases: [fn(&mut DemoConfig); 7] = [
            |c| c.layers = MAX_SHELL_LAYERS + 1,
            |c| c.texture_size = 0,
            |c| c.dot_sizes.clear(),
            |c| c.dot_sizes = vec![0.01, 1.5],
            |c| c.density = DotDensity::PixelsPerDot(0),
            |c| c.fur_length = -0.1,
            |c| c.width = 0,
        ];
        for mutate in cases {
            let mut cfg = DemoConfig::default();
            mutate(&mut cfg);
            assert!(matches!(cfg.validate(), Err(CoreError::InvalidConfig(_))), "{cfg:?}");
        }
    }

    #[test]
    fn zero_layers_and_fur_length_are_valid() {
        let mut cfg = DemoConfig::default();
        cfg.apply_cli_overrides(&parse(&["--layers", "0", "--fur-length", "0"]));
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.shell_parameters().layer_count, 0);
    }

    #[test]
    fn layer_count_is_bounded() {
        let mut cfg = DemoConfig::default();
        cfg.apply_cli_overrides(&parse(&["--layers", "3000000000"]));
        assert!(matches!(cfg.validate(), Err(CoreError::InvalidConfig(_))));

        cfg.layers = MAX_SHELL_LAYERS;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn run_config_carries_scene_settings() {
        let mut cfg = DemoConfig::default();
        cfg.apply_cli_overrides(&parse(&["--texture-budget", "refuse", "--spin-rate", "0"]));
        let run = cfg.run_config();
        assert_eq!(run.params.layer_count, 128);
        assert_eq!(run.params.base_color, Vec3::new(0.2, 0.9, 0.3));
        assert_eq!(run.budget_policy, BudgetPolicy::Refuse);
        assert_eq!(run.spin_rate, 0.0);
        assert_eq!(run.clear_color.r, 0.05);
    }
}
