use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("no suitable GPU adapter")]
    NoAdapter,

    #[error("failed to request device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("{requested} fur textures requested but only {limit} can be bound")]
    TextureBudget { requested: u32, limit: u32 },

    #[error("no fur textures to bind")]
    NoFurLayers,

    #[error("mesh has no triangles or indices out of range")]
    InvalidMesh,
}

pub type RenderResult<T> = Result<T, RenderError>;
