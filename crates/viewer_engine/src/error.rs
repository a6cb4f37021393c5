//! Top-level error type for the viewer

use thiserror::Error;

use crate::assets::AssetError;
use crate::config::ConfigError;
use crate::render::shader::ShaderError;
use crate::render::vulkan::VulkanError;
use crate::render::window::WindowError;

/// Any failure that stops the viewer from starting or running
#[derive(Error, Debug)]
pub enum ViewerError {
    /// Configuration file problem
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Window or GLFW failure
    #[error("Window error: {0}")]
    Window(#[from] WindowError),

    /// Vulkan failure outside shader and model setup
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] VulkanError),

    /// Shader compile or link failure
    #[error("Shader error: {0}")]
    Shader(#[from] ShaderError),

    /// Model or texture failure
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),
}

/// Result type for viewer operations
pub type ViewerResult<T> = Result<T, ViewerError>;
