use ash::vk;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Vulkan error: {0}")]
    Vk(#[from] vk::Result),
    #[error("GPU allocation failed: {0}")]
    Allocation(#[from] gpu_allocator::AllocationError),
    #[error("Failed to find a suitable GPU!")]
    NoSuitableDevice,
    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
    #[error("surface has zero area")]
    ZeroExtent,
    #[error("failed to read asset {path:?}: {source}")]
    Asset {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to load OBJ {path}: {source}")]
    Obj {
        path: String,
        #[source]
        source: tobj::LoadError,
    },
    #[error("invalid SPIR-V in {path}: {reason}")]
    InvalidSpirv { path: String, reason: String },
    #[error("buffer '{0}' is not host visible")]
    NotMapped(&'static str),
    #[error("SDL error: {0}")]
    Sdl(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
