//! Per-frame uniform composition
//!
//! Turns camera state, elapsed time and scene settings into the nine values
//! the shaders consume, then pushes them through a [`UniformSink`].

use crate::foundation::math::{utils, Mat4, Mat4Ext, Vec3};
use crate::foundation::time::FrameTimer;
use crate::render::camera::Camera;
use crate::render::shader::{UniformSink, UniformStatus};

/// Uniform names shared between the frame loop and the GLSL sources
pub mod names {
    /// `float`: seconds since start
    pub const TOTAL_TIME: &str = "total_time";
    /// `float`: seconds since the previous frame
    pub const DELTA_TIME: &str = "delta_time";
    /// `vec3`
    pub const AMBIENT_LIGHT_COLOR: &str = "ambient_light_color";
    /// `vec3`
    pub const DIFFUSE_LIGHT_COLOR: &str = "diffuse_light_color";
    /// `vec3`, world space
    pub const DIFFUSE_LIGHT_POSITION: &str = "diffuse_light_position";
    /// `mat4`
    pub const MODEL: &str = "model";
    /// `mat4`
    pub const NORMAL_MAT: &str = "normal_mat";
    /// `mat4`
    pub const VIEW: &str = "view";
    /// `mat4`
    pub const PROJECTION: &str = "projection";
}

/// Ambient plus one point light
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneLighting {
    /// Ambient colour
    pub ambient_color: Vec3,
    /// Point light colour
    pub diffuse_color: Vec3,
    /// Point light position in world space
    pub diffuse_position: Vec3,
}

impl Default for SceneLighting {
    fn default() -> Self {
        Self {
            ambient_color: Vec3::new(0.1, 0.1, 0.1),
            diffuse_color: Vec3::new(1.0, 1.0, 1.0),
            diffuse_position: Vec3::new(0.0, 15.0, 10.0),
        }
    }
}

/// Where the model sits and how fast it spins about +Y
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelMotion {
    /// World-space offset
    pub translation: Vec3,
    /// Spin rate
    pub spin_degrees_per_second: f32,
}

impl ModelMotion {
    fn rotation(&self, total_time: f32) -> Mat4 {
        Mat4::rotation_y(utils::deg_to_rad(total_time * self.spin_degrees_per_second))
    }

    /// translate · rotate_y at `total_time`
    pub fn model_matrix(&self, total_time: f32) -> Mat4 {
        Mat4::new_translation(&self.translation) * self.rotation(total_time)
    }

    /// Normal transform: the rotation alone (no scale, so no inverse-transpose)
    pub fn normal_matrix(&self, total_time: f32) -> Mat4 {
        self.rotation(total_time)
    }
}

impl Default for ModelMotion {
    fn default() -> Self {
        Self {
            translation: Vec3::new(0.0, 0.0, -2.0),
            spin_degrees_per_second: 20.0,
        }
    }
}

/// Near and far clip distances
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipPlanes {
    /// Near plane distance
    pub near: f32,
    /// Far plane distance
    pub far: f32,
}

impl Default for ClipPlanes {
    fn default() -> Self {
        Self { near: 0.1, far: 100.0 }
    }
}

/// Scene constants that feed every frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SceneSettings {
    /// Lights
    pub lighting: SceneLighting,
    /// Model placement
    pub motion: ModelMotion,
    /// Projection clip planes
    pub clip: ClipPlanes,
}

/// Every uniform value for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameUniforms {
    /// Seconds since start
    pub total_time: f32,
    /// Seconds since the previous frame
    pub delta_time: f32,
    /// Ambient light colour
    pub ambient_light_color: Vec3,
    /// Point light colour
    pub diffuse_light_color: Vec3,
    /// Point light position
    pub diffuse_light_position: Vec3,
    /// Model matrix
    pub model: Mat4,
    /// Normal matrix
    pub normal_mat: Mat4,
    /// View matrix
    pub view: Mat4,
    /// Projection matrix
    pub projection: Mat4,
}

impl FrameUniforms {
    /// Compose this frame's values
    pub fn compose(camera: &Camera, timer: &FrameTimer, scene: &SceneSettings, aspect_ratio: f32) -> Self {
        let total_time = timer.total_time();
        Self {
            total_time,
            delta_time: timer.delta_time(),
            ambient_light_color: scene.lighting.ambient_color,
            diffuse_light_color: scene.lighting.diffuse_color,
            diffuse_light_position: scene.lighting.diffuse_position,
            model: scene.motion.model_matrix(total_time),
            normal_mat: scene.motion.normal_matrix(total_time),
            view: camera.view_matrix(),
            projection: camera.projection_matrix(aspect_ratio, scene.clip.near, scene.clip.far),
        }
    }

    /// Push every value into `sink`; returns how many were written
    ///
    /// Names the program does not use are skipped silently.
    pub fn upload<S: UniformSink + ?Sized>(&self, sink: &mut S) -> usize {
        let vec3 = |sink: &mut S, name: &str, v: &Vec3| sink.set_vec3(name, v.x, v.y, v.z);
        let statuses = [
            sink.set_scalar(names::TOTAL_TIME, self.total_time),
            sink.set_scalar(names::DELTA_TIME, self.delta_time),
            vec3(sink, names::AMBIENT_LIGHT_COLOR, &self.ambient_light_color),
            vec3(sink, names::DIFFUSE_LIGHT_COLOR, &self.diffuse_light_color),
            vec3(sink, names::DIFFUSE_LIGHT_POSITION, &self.diffuse_light_position),
            sink.set_mat4(names::MODEL, &self.model),
            sink.set_mat4(names::NORMAL_MAT, &self.normal_mat),
            sink.set_mat4(names::VIEW, &self.view),
            sink.set_mat4(names::PROJECTION, &self.projection),
        ];
        statuses
            .iter()
            .filter(|&&status| status == UniformStatus::Written)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[derive(Default)]
    struct Recorder {
        scalars: Vec<(String, f32)>,
        vec3s: Vec<(String, [f32; 3])>,
        mat4s: Vec<String>,
    }

    impl UniformSink for Recorder {
        fn set_scalar(&mut self, name: &str, value: f32) -> UniformStatus {
            self.scalars.push((name.to_string(), value));
            UniformStatus::Written
        }

        fn set_vec3(&mut self, name: &str, x: f32, y: f32, z: f32) -> UniformStatus {
            self.vec3s.push((name.to_string(), [x, y, z]));
            UniformStatus::Written
        }

        fn set_mat4(&mut self, name: &str, _matrix: &Mat4) -> UniformStatus {
            if name == names::VIEW {
                return UniformStatus::Absent;
            }
            self.mat4s.push(name.to_string());
            UniformStatus::Written
        }
    }

    #[test]
    fn test_upload_sends_every_name_and_counts_writes() {
        let mut timer = FrameTimer::starting_at(10.0);
        timer.advance(10.5);
        let uniforms = FrameUniforms::compose(&Camera::default(), &timer, &SceneSettings::default(), 4.0 / 3.0);

        let mut recorder = Recorder::default();
        assert_eq!(uniforms.upload(&mut recorder), 8);
        assert_eq!(
            recorder.scalars,
            vec![("total_time".to_string(), 0.5), ("delta_time".to_string(), 0.5)]
        );
        assert_eq!(recorder.vec3s[2], ("diffuse_light_position".to_string(), [0.0, 15.0, 10.0]));
        assert_eq!(recorder.mat4s, vec!["model", "normal_mat", "projection"]);
    }

    #[test]
    fn test_model_spins_about_y_after_translation() {
        let motion = ModelMotion {
            translation: Vec3::new(1.0, 2.0, 3.0),
            spin_degrees_per_second: 90.0,
        };
        let model = motion.model_matrix(1.0);

        // +X rotated 90 degrees about +Y lands on -Z, then gets translated
        let p = model.transform_point(&nalgebra::Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p.coords, Vec3::new(1.0, 2.0, 2.0), epsilon = 1e-5);

        let n = motion.normal_matrix(1.0).transform_vector(&Vec3::x());
        assert_relative_eq!(n, Vec3::new(0.0, 0.0, -1.0), epsilon = 1e-5);
    }

    #[test]
    fn test_zero_time_gives_pure_translation() {
        let motion = ModelMotion::default();
        assert_relative_eq!(motion.model_matrix(0.0), Mat4::new_translation(&motion.translation));
        assert_relative_eq!(motion.normal_matrix(0.0), Mat4::identity());
    }

    #[test]
    fn test_view_and_projection_come_from_camera() {
        let camera = Camera::default();
        let timer = FrameTimer::starting_at(0.0);
        let scene = SceneSettings::default();
        let uniforms = FrameUniforms::compose(&camera, &timer, &scene, 2.0);

        assert_eq!(uniforms.view, camera.view_matrix());
        assert_eq!(uniforms.projection, camera.projection_matrix(2.0, 0.1, 100.0));
    }
}
