//! # Viewer Engine
//!
//! A free-fly viewer for Wavefront OBJ models, rendered with Vulkan.
//!
//! ## Features
//!
//! - **OBJ/MTL loading**: sub-meshes in file order, with diffuse, specular and
//!   normal texture maps
//! - **GLSL at runtime**: shaders compile from source at startup and their
//!   uniform block layout is reflected, not hard-coded
//! - **Free-fly camera**: mouse-look, scroll zoom and WASD movement
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use viewer_engine::prelude::*;
//!
//! fn main() -> Result<(), ViewerError> {
//!     let config = ViewerConfig::default();
//!     let mut window = Window::new(&config.window)?;
//!     let mut renderer = Renderer::new(&mut window, &config.renderer, "viewer")?;
//!     let mut program = ShaderProgram::compile_and_link(
//!         &config.shaders.vertex_shader_path,
//!         &config.shaders.fragment_shader_path,
//!         renderer.gpu(),
//!     )?;
//!     let model = Model::load(&config.model.path, renderer.gpu())?;
//!     let camera = config.camera.build();
//!     let scene = config.scene();
//!     let timer = FrameTimer::starting_at(window.time());
//!
//!     renderer.render_frame(|frame| {
//!         let mut active = program.activate(frame);
//!         FrameUniforms::compose(&camera, &timer, &scene, frame.aspect_ratio()).upload(&mut active);
//!         model.draw(frame);
//!     })?;
//!     renderer.wait_idle()?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod assets;
pub mod config;
pub mod error;
pub mod foundation;
pub mod input;
pub mod render;

pub use error::{ViewerError, ViewerResult};

/// Common imports for viewer applications
pub mod prelude {
    pub use crate::{
        assets::{AssetError, ModelData},
        config::{Config, ViewerConfig},
        error::{ViewerError, ViewerResult},
        foundation::{
            math::{Mat4, Vec3},
            time::FrameTimer,
        },
        input::{dispatch_event, InputEffect, KeyBindings},
        render::{
            Camera, FrameOutcome, FrameUniforms, Model, Movement, Renderer, SceneSettings,
            ShaderProgram, UniformSink, Window,
        },
    };
}
