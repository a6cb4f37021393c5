//! GLSL shader programs with a typed, name-keyed uniform contract
//!
//! Sources are compiled at startup with naga (GLSL front end, validator,
//! SPIR-V back end). The reflected IR drives linking and gives every uniform
//! in the frame block a cached byte slot, so uploads never ask the driver
//! for a location.

pub mod compiler;
pub mod program;
pub mod uniforms;

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::render::vulkan::VulkanError;

pub use compiler::{CompiledStage, InterfaceType, InterfaceVariable, ProgramInterface, ResourceSlot, StageInterface};
pub use program::{ActiveProgram, ShaderProgram};
pub use uniforms::{UniformBlock, UniformField, UniformKind, UniformLayout, UniformSink, UniformStatus, UniformValue};

/// Programmable pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Per-vertex stage
    Vertex,
    /// Per-fragment stage
    Fragment,
}

impl ShaderStage {
    pub(crate) fn naga(self) -> naga::ShaderStage {
        match self {
            Self::Vertex => naga::ShaderStage::Vertex,
            Self::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex => f.write_str("vertex"),
            Self::Fragment => f.write_str("fragment"),
        }
    }
}

/// Shader program build failures; all of them are fatal at startup
#[derive(Error, Debug)]
pub enum ShaderError {
    /// A stage could not be read, parsed or validated
    #[error("{stage} shader {} failed to compile:\n{log}", .path.display())]
    Compile {
        /// Failing stage
        stage: ShaderStage,
        /// Source file
        path: PathBuf,
        /// Diagnostic text
        log: String,
    },

    /// Both stages compiled but do not form a valid program
    #[error("shader program failed to link:\n{log}")]
    Link {
        /// One line per interface problem
        log: String,
    },

    /// GPU object creation failed
    #[error(transparent)]
    Gpu(#[from] VulkanError),
}
