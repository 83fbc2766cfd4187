//! Entry point for furshell.
//! Logging + CLI, fur texture generation, mesh loading, then the render loop.

mod cli;
mod config;

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use asset::{FurLayerSet, MeshSource, ObjSource, SphereSource, TextureData};
use clap::Parser;
use platform::SceneAssets;
use renderer::ShaderProgram;

use cli::CliArgs;
use config::DemoConfig;

fn dump_textures(fur: &FurLayerSet, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    for (i, layer) in fur.layers().iter().enumerate() {
        layer.save_png(dir.join(format!("fur_{i}.png")))?;
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = CliArgs::parse();
    let mut config = DemoConfig::default();
    config.apply_cli_overrides(&args);
    config.validate()?;
    log::info!(
        "Starting furshell. Backend: {:?}, window {}x{}, {} layers, {} textures of {}px",
        config.backend,
        config.width,
        config.height,
        config.layers,
        config.dot_sizes.len(),
        config.texture_size
    );

    let started = Instant::now();
    let fur = FurLayerSet::generate(
        config.texture_size,
        config.texture_size,
        &config.dot_sizes,
        config.density,
        config.seed,
    )?;
    log::info!("Generated {} fur textures in {:.2?}", fur.len(), started.elapsed());

    if let Some(dir) = &config.dump_textures {
        dump_textures(&fur, dir)?;
    }

    let source: Box<dyn MeshSource> = match &config.mesh {
        Some(path) => Box::new(ObjSource::new(path).with_diffuse(config.diffuse.clone())),
        None => Box::new(SphereSource(config.sphere)),
    };
    let (mesh, mut diffuse) = source
        .provide_textured()
        .with_context(|| format!("Failed to load {}", source.describe()))?;
    // The sphere has no material; --diffuse applies to it directly.
    if diffuse.is_none() && config.mesh.is_none() {
        diffuse = config.diffuse.as_ref().map(TextureData::load_png).transpose()?;
    }
    log::info!(
        "Mesh: {} ({} triangles, diffuse: {})",
        source.describe(),
        mesh.triangle_count(),
        if diffuse.is_some() { "yes" } else { "no" }
    );

    let program = match &config.shader {
        Some(path) => ShaderProgram::from_path(path),
        None => ShaderProgram::builtin(),
    };

    platform::run_with_renderer(
        config.run_config(),
        SceneAssets {
            fur,
            mesh,
            diffuse,
            program,
        },
    )?;

    log::info!("Graceful shutdown. Bye!");
    Ok(())
}
