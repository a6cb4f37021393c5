//! # Rendering
//!
//! Everything between the loaded assets and pixels on screen.
//!
//! ## Architecture
//!
//! - **Camera**: free-fly view and projection driven by pointer, scroll and keys
//! - **Shader program**: GLSL compiled to SPIR-V at startup, with a name-keyed
//!   uniform block checked against the reflected layout
//! - **Model**: sub-meshes and their material descriptor sets, drawn in load order
//! - **Vulkan backend**: context, swapchain and per-frame recording
//!
//! The frame loop hands a [`vulkan::Frame`] to the application, which activates
//! the program, uploads [`FrameUniforms`] and draws the model into it.

pub mod camera;
pub mod frame_uniforms;
pub mod material;
pub mod mesh;
pub mod model;
pub mod shader;
pub mod vulkan;
pub mod window;

pub use camera::{Camera, Movement};
pub use frame_uniforms::{ClipPlanes, FrameUniforms, ModelMotion, SceneLighting, SceneSettings};
pub use material::TextureRole;
pub use mesh::Vertex;
pub use model::{DrawStats, DrawTarget, Model, SubMesh};
pub use shader::{ActiveProgram, ShaderError, ShaderProgram, ShaderStage, UniformSink};
pub use vulkan::{Frame, FrameOutcome, GpuContext, Renderer, VulkanError};
pub use window::{Window, WindowError};
