//! Asset loading
//!
//! CPU-side parsing and decoding only: OBJ geometry, MTL materials and
//! texture images. Uploading to the GPU happens in [`crate::render::Model`].

pub mod image_loader;
pub mod mtl_parser;
pub mod obj_loader;

pub use image_loader::ImageData;
pub use mtl_parser::{MtlData, MtlParser};
pub use obj_loader::{MaterialData, ModelData, ObjLoader, SubMeshData};

use std::path::PathBuf;

use thiserror::Error;

use crate::render::vulkan::VulkanError;

/// A syntax problem at a specific line of a text asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIssue {
    /// 1-based line number
    pub line: usize,
    /// What went wrong
    pub message: String,
}

impl ParseIssue {
    pub(crate) fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn at(self, path: impl Into<PathBuf>) -> AssetError {
        AssetError::Parse {
            path: path.into(),
            line: self.line,
            message: self.message,
        }
    }
}

/// Errors raised while loading a model and its textures
#[derive(Error, Debug)]
pub enum AssetError {
    /// File could not be read
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Malformed statement in an OBJ or MTL file
    #[error("{}:{line}: {message}", .path.display())]
    Parse {
        /// File containing the statement
        path: PathBuf,
        /// 1-based line number
        line: usize,
        /// What went wrong
        message: String,
    },

    /// The OBJ file has no faces
    #[error("{} contains no faces", .path.display())]
    Empty {
        /// OBJ file
        path: PathBuf,
    },

    /// An `mtllib` statement names a file that does not exist
    #[error("{} references missing material library {}", .path.display(), .library.display())]
    MissingMaterialLibrary {
        /// OBJ file
        path: PathBuf,
        /// Resolved library path
        library: PathBuf,
    },

    /// A `usemtl` statement names a material no library defines
    #[error("{} uses unknown material '{name}'", .path.display())]
    UnknownMaterial {
        /// OBJ file
        path: PathBuf,
        /// Material name
        name: String,
    },

    /// A sub-mesh index points outside its own vertex buffer
    #[error("Sub-mesh '{mesh}' index {index} is out of range for {vertex_count} vertices")]
    InvalidIndex {
        /// Sub-mesh name
        mesh: String,
        /// Offending index
        index: u32,
        /// Vertices in the sub-mesh
        vertex_count: usize,
    },

    /// A texture could not be decoded
    #[error("Failed to decode texture {}: {source}", .path.display())]
    Texture {
        /// Image file
        path: PathBuf,
        /// Decoder error
        #[source]
        source: image::ImageError,
    },

    /// GPU upload failed
    #[error("Failed to upload model: {0}")]
    Upload(#[from] VulkanError),
}
