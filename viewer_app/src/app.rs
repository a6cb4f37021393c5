//! The viewer's frame loop

use viewer_engine::config::{ModelConfig, ViewerConfig};
use viewer_engine::foundation::time::FrameTimer;
use viewer_engine::input::{dispatch_event, InputEffect, KeyBindings};
use viewer_engine::render::{
    Camera, FrameOutcome, FrameUniforms, GpuContext, Model, Renderer, SceneSettings,
    ShaderProgram, Window,
};
use viewer_engine::{assets::AssetError, ViewerResult};

/// Seconds between FPS reports
const FPS_REPORT_INTERVAL: f32 = 5.0;

/// Window, GPU state and scene for one viewing session
///
/// Fields drop top to bottom: GPU resources go before the renderer that owns
/// the device, and the renderer goes before the window its surface belongs to.
pub struct ViewerApp {
    model: Model,
    program: ShaderProgram,
    renderer: Renderer,
    window: Window,
    camera: Camera,
    bindings: KeyBindings,
    scene: SceneSettings,
    timer: FrameTimer,
    next_fps_report: f32,
}

impl ViewerApp {
    /// Open the window, compile the shaders and load the model
    pub fn new(config: &ViewerConfig) -> ViewerResult<Self> {
        let mut window = Window::new(&config.window)?;
        let renderer = Renderer::new(&mut window, &config.renderer, &config.window.title)?;
        log::info!("Vulkan renderer created");

        let shaders = &config.shaders;
        let program = ShaderProgram::compile_and_link(
            &shaders.vertex_shader_path,
            &shaders.fragment_shader_path,
            renderer.gpu(),
        )?;
        log::info!(
            "Shader program linked from {} and {}",
            shaders.vertex_shader_path,
            shaders.fragment_shader_path
        );

        let model = load_model(&config.model, renderer.gpu())?;
        log::info!(
            "Model ready: {} sub-meshes, {} indices",
            model.meshes().len(),
            model.index_count()
        );

        let timer = FrameTimer::starting_at(window.time());
        Ok(Self {
            model,
            program,
            renderer,
            window,
            camera: config.camera.build(),
            bindings: KeyBindings::default(),
            scene: config.scene(),
            timer,
            next_fps_report: FPS_REPORT_INTERVAL,
        })
    }

    /// Run until Escape or the window is closed
    pub fn run(&mut self) -> ViewerResult<()> {
        log::info!("Entering frame loop");

        while !self.window.should_close() {
            self.window.poll_events();
            for event in self.window.drain_events() {
                match dispatch_event(&mut self.camera, &self.bindings, &event) {
                    InputEffect::Quit => self.window.set_should_close(true),
                    InputEffect::Resized(width, height) => self.renderer.resize(width, height),
                    InputEffect::None => {}
                }
            }

            self.timer.advance(self.window.time());
            let window = &self.window;
            let held = self.bindings.held(|key| window.is_key_pressed(key));
            self.camera.on_key_state(held, self.timer.delta_time());

            self.render()?;
            self.report_fps();
        }

        self.renderer.wait_idle()?;
        log::info!(
            "Frame loop finished after {} frames ({:.1} FPS average)",
            self.timer.frame_count(),
            self.timer.average_fps()
        );
        Ok(())
    }

    fn render(&mut self) -> ViewerResult<()> {
        let Self {
            model,
            program,
            renderer,
            camera,
            scene,
            timer,
            ..
        } = self;

        let outcome = renderer.render_frame(|frame| {
            let mut active = program.activate(frame);
            let uniforms = FrameUniforms::compose(camera, timer, scene, frame.aspect_ratio());
            let written = uniforms.upload(&mut active);
            let stats = model.draw(frame);

            if timer.frame_count() == 1 {
                log::debug!(
                    "First frame: {written} uniforms written, {} draw calls, {} empty sub-meshes skipped",
                    stats.draw_calls,
                    stats.skipped
                );
            }
        })?;

        if outcome == FrameOutcome::Skipped {
            log::trace!("Frame {} skipped", self.timer.frame_count());
        }
        Ok(())
    }

    fn report_fps(&mut self) {
        if self.timer.total_time() >= self.next_fps_report {
            log::debug!(
                "FPS: {:.1} (average {:.1})",
                self.timer.current_fps(),
                self.timer.average_fps()
            );
            self.next_fps_report = self.timer.total_time() + FPS_REPORT_INTERVAL;
        }
    }
}

fn load_model(config: &ModelConfig, gpu: GpuContext<'_>) -> Result<Model, AssetError> {
    match Model::load(&config.path, gpu) {
        Ok(model) => Ok(model),
        Err(e) if config.fallback_on_error => {
            log::error!("Failed to load {}: {e}; drawing the fallback cube", config.path);
            Model::fallback_cube(gpu)
        }
        Err(e) => Err(e),
    }
}
