//! Renderer error types.

use manaburn_resources::ResourceError;
use manaburn_rhi::RhiError;
use thiserror::Error;

/// Error type for renderer setup and frame execution.
#[derive(Error, Debug)]
pub enum RendererError {
    /// GPU-level failure
    #[error(transparent)]
    Rhi(#[from] RhiError),

    /// Mesh loading failure
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Window, surface or configuration failure
    #[error(transparent)]
    Core(#[from] manaburn_core::Error),
}

/// Result type alias for renderer operations.
pub type RendererResult<T> = std::result::Result<T, RendererError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_rhi_error_is_transparent() {
        let err: RendererError = RhiError::FenceTimeout { timeout_ns: 100 }.into();
        assert_eq!(err.to_string(), "Fence wait timed out after 100 ns");
    }

    #[test]
    fn test_resource_error_conversion() {
        let err: RendererError = ResourceError::FileNotFound(PathBuf::from("a.obj")).into();
        assert!(matches!(err, RendererError::Resource(_)));
    }

    #[test]
    fn test_core_error_conversion() {
        let err: RendererError = manaburn_core::Error::Config("bad".to_string()).into();
        assert!(matches!(err, RendererError::Core(_)));
    }
}
