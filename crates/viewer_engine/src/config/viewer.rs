//! Viewer settings tree

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{Config, ConfigError};
use crate::foundation::math::Vec3;
use crate::render::camera::{Camera, MAX_FOV, MIN_FOV};
use crate::render::frame_uniforms::{ClipPlanes, ModelMotion, SceneLighting, SceneSettings};

/// File names tried in the working directory, in order
pub const CONFIG_FILE_NAMES: [&str; 2] = ["viewer.toml", "viewer.ron"];

/// Top-level viewer configuration
///
/// Every section has defaults, so a file only needs the keys it changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Window creation
    pub window: WindowConfig,
    /// GLSL sources for the shader program
    pub shaders: ShaderConfig,
    /// Model to load and how it moves
    pub model: ModelConfig,
    /// Starting camera state and clip planes
    pub camera: CameraConfig,
    /// Scene lights
    pub lighting: LightingConfig,
    /// Swapchain and frame pacing
    pub renderer: RendererConfig,
}

impl Config for ViewerConfig {}

impl ViewerConfig {
    /// Look for a config file in `dir`
    ///
    /// Returns `Ok(None)` when no candidate file exists. A file that exists but
    /// fails to parse or validate is an error.
    pub fn discover(dir: &Path) -> Result<Option<(PathBuf, Self)>, ConfigError> {
        for name in CONFIG_FILE_NAMES {
            let path = dir.join(name);
            if path.is_file() {
                let config = Self::load_from_file(&path)?;
                config.validate()?;
                return Ok(Some((path, config)));
            }
        }
        Ok(None)
    }

    /// Reject values the renderer cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size {}x{} must be non-zero",
                self.window.width, self.window.height
            )));
        }
        let camera = &self.camera;
        if !(camera.near > 0.0 && camera.near < camera.far) {
            return Err(ConfigError::Invalid(format!(
                "clip planes near={} far={} need 0 < near < far",
                camera.near, camera.far
            )));
        }
        if !(MIN_FOV..=MAX_FOV).contains(&camera.fov) {
            return Err(ConfigError::Invalid(format!(
                "fov {} outside [{MIN_FOV}, {MAX_FOV}]",
                camera.fov
            )));
        }
        if camera.movement_speed < 0.0 || camera.mouse_sensitivity < 0.0 {
            return Err(ConfigError::Invalid(
                "camera speed and sensitivity must not be negative".to_string(),
            ));
        }
        if !(1..=8).contains(&self.renderer.max_frames_in_flight) {
            return Err(ConfigError::Invalid(format!(
                "max_frames_in_flight {} outside 1..=8",
                self.renderer.max_frames_in_flight
            )));
        }
        Ok(())
    }

    /// Per-frame scene values derived from the lighting, model and camera sections
    pub fn scene(&self) -> SceneSettings {
        SceneSettings {
            lighting: SceneLighting {
                ambient_color: Vec3::from(self.lighting.ambient_color),
                diffuse_color: Vec3::from(self.lighting.diffuse_color),
                diffuse_position: Vec3::from(self.lighting.diffuse_position),
            },
            motion: ModelMotion {
                translation: Vec3::from(self.model.translation),
                spin_degrees_per_second: self.model.spin_degrees_per_second,
            },
            clip: ClipPlanes {
                near: self.camera.near,
                far: self.camera.far,
            },
        }
    }
}

/// Window creation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Title bar text
    pub title: String,
    /// Initial width in screen coordinates
    pub width: u32,
    /// Initial height in screen coordinates
    pub height: u32,
    /// Hide and lock the cursor for mouse-look
    pub capture_cursor: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "OBJ Viewer".to_string(),
            width: 800,
            height: 600,
            capture_cursor: true,
        }
    }
}

/// GLSL source locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderConfig {
    /// Path to the vertex shader GLSL source
    pub vertex_shader_path: String,
    /// Path to the fragment shader GLSL source
    pub fragment_shader_path: String,
}

impl ShaderConfig {
    /// Create a new shader configuration
    pub fn new(vertex_path: impl Into<String>, fragment_path: impl Into<String>) -> Self {
        Self {
            vertex_shader_path: vertex_path.into(),
            fragment_shader_path: fragment_path.into(),
        }
    }

    /// Create shader config with automatic path resolution
    ///
    /// Tries the usual shader directories so the viewer runs from either the
    /// workspace root or the app directory.
    pub fn with_path_resolution(base_vertex: &str, base_fragment: &str) -> Self {
        let shader_dirs = ["shaders/", "viewer_app/shaders/", "../shaders/", "./"];

        let find = |file: &str| {
            shader_dirs
                .iter()
                .map(|dir| format!("{dir}{file}"))
                .find(|candidate| Path::new(candidate).exists())
                .unwrap_or_else(|| format!("shaders/{file}"))
        };

        Self {
            vertex_shader_path: find(base_vertex),
            fragment_shader_path: find(base_fragment),
        }
    }
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self::with_path_resolution("vertex.glsl", "fragment.glsl")
    }
}

/// Model source and motion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// OBJ file to load
    pub path: String,
    /// World-space translation applied before drawing
    pub translation: [f32; 3],
    /// Spin about +Y in degrees per second
    pub spin_degrees_per_second: f32,
    /// Draw a unit cube when the model fails to load instead of exiting
    pub fallback_on_error: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: "resources/cube/cube.obj".to_string(),
            translation: [0.0, 0.0, -2.0],
            spin_degrees_per_second: 20.0,
            fallback_on_error: true,
        }
    }
}

/// Starting camera state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// World-space start position
    pub position: [f32; 3],
    /// Degrees; -90 looks down -Z
    pub yaw: f32,
    /// Degrees
    pub pitch: f32,
    /// Vertical field of view in degrees
    pub fov: f32,
    /// Units per second
    pub movement_speed: f32,
    /// Degrees per pixel
    pub mouse_sensitivity: f32,
    /// Near clip plane
    pub near: f32,
    /// Far clip plane
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 3.0],
            yaw: -90.0,
            pitch: 0.0,
            fov: 45.0,
            movement_speed: 2.5,
            mouse_sensitivity: 0.1,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl CameraConfig {
    /// Build the camera described by this section
    pub fn build(&self) -> Camera {
        Camera::new(Vec3::from(self.position), self.yaw, self.pitch)
            .with_fov(self.fov)
            .with_movement_speed(self.movement_speed)
            .with_mouse_sensitivity(self.mouse_sensitivity)
    }
}

/// Scene lights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    /// Ambient light colour
    pub ambient_color: [f32; 3],
    /// Point light colour
    pub diffuse_color: [f32; 3],
    /// Point light world position
    pub diffuse_position: [f32; 3],
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            ambient_color: [0.1, 0.1, 0.1],
            diffuse_color: [1.0, 1.0, 1.0],
            diffuse_position: [0.0, 15.0, 10.0],
        }
    }
}

/// Renderer tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Colour the frame is cleared to
    pub clear_color: [f32; 3],
    /// Maximum frames in flight (1..=8)
    pub max_frames_in_flight: usize,
    /// Whether to enable Vulkan validation layers (None = debug builds only)
    pub enable_validation: Option<bool>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            clear_color: [0.2, 0.3, 0.3],
            max_frames_in_flight: 2,
            enable_validation: None,
        }
    }
}

impl RendererConfig {
    /// Resolve the validation toggle against the build type
    pub fn validation_enabled(&self) -> bool {
        self.enable_validation.unwrap_or(cfg!(debug_assertions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(ViewerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_default_model_ships_with_the_app() {
        let app_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../viewer_app");
        let model = ModelConfig::default();

        assert!(app_dir.join(&model.path).is_file(), "missing {}", model.path);
    }

    #[test]
    fn test_defaults_match_shipped_config() {
        let app_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../viewer_app");
        let shipped = ViewerConfig::load_from_file(&app_dir.join("viewer.toml")).unwrap();

        assert_eq!(shipped.model, ModelConfig::default());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ViewerConfig = toml::from_str(
            r#"
            [window]
            width = 1280

            [camera]
            fov = 30.0
            "#,
        )
        .unwrap();

        assert_eq!(config.window.width, 1280);
        assert_eq!(config.window.height, 600);
        assert_eq!(config.camera.fov, 30.0);
        assert_eq!(config.camera.movement_speed, 2.5);
        assert_eq!(config.lighting, LightingConfig::default());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ViewerConfig::default();
        config.window.height = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = ViewerConfig::default();
        config.camera.near = 200.0;
        assert!(config.validate().is_err());

        let mut config = ViewerConfig::default();
        config.camera.fov = 60.0;
        assert!(config.validate().is_err());

        let mut config = ViewerConfig::default();
        config.renderer.max_frames_in_flight = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_and_ron_round_trip() {
        let mut config = ViewerConfig::default();
        config.model.path = "assets/suit.obj".to_string();
        config.renderer.enable_validation = Some(false);

        let dir = tempfile::tempdir().unwrap();
        for extension in ["toml", "ron"] {
            let path = dir.path().join(format!("round_trip.{extension}"));
            config.save_to_file(&path).unwrap();
            let loaded = ViewerConfig::load_from_file(&path).unwrap();
            assert_eq!(loaded, config);
        }
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let result = ViewerConfig::default().save_to_file(Path::new("viewer.yaml"));
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_discover_without_files_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ViewerConfig::discover(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_camera_section_builds_camera() {
        let section = CameraConfig {
            fov: 30.0,
            ..CameraConfig::default()
        };
        let camera = section.build();
        assert_eq!(camera.fov(), 30.0);
        assert_eq!(camera.yaw(), -90.0);
    }
}
