/// Terminal front end for the objview geometry viewer
use crossterm::{
    cursor,
    event::{
        self, DisableMouseCapture, EnableMouseCapture, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, ClearType},
};
use nalgebra::{Matrix4, Vector3};
use objview_core::{
    load_geometry, Camera, FrameUniforms, GeometryBuffer, ModelSlot, Projection, Transform,
    ViewerConfig,
};
use std::io::{self, stdout, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

pub mod input;
pub mod renderer;

pub use input::{InputAction, InputState};
pub use renderer::{AsciiRenderer, MeshHandle};

/// Terminal cells are roughly twice as tall as they are wide
pub(crate) const CELL_ASPECT: f32 = 2.0;

/// Upper bound on a single frame's delta time, so a stall does not teleport
/// the camera
const MAX_FRAME_DELTA: f32 = 0.25;

/// Frame timing and FPS counter
#[derive(Debug)]
pub struct FrameClock {
    last_tick: Instant,
    window_start: Instant,
    frame_count: u32,
    fps: f32,
}

impl FrameClock {
    pub fn new(now: Instant) -> Self {
        Self {
            last_tick: now,
            window_start: now,
            frame_count: 0,
            fps: 0.0,
        }
    }

    /// Seconds since the previous tick, capped at [`MAX_FRAME_DELTA`]
    pub fn tick(&mut self, now: Instant) -> f32 {
        let delta = now.duration_since(self.last_tick).as_secs_f32().min(MAX_FRAME_DELTA);
        self.last_tick = now;

        // Update FPS counter
        self.frame_count += 1;
        let window = now.duration_since(self.window_start);
        if window >= Duration::from_secs(1) {
            self.fps = self.frame_count as f32 / window.as_secs_f32();
            self.frame_count = 0;
            self.window_start = now;
        }

        delta
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }
}

/// Mutable per-frame state, owned by the app and handed to update and render
#[derive(Debug)]
pub struct FrameContext {
    pub camera: Camera,
    pub input: InputState,
    pub clock: FrameClock,
}

/// Main application struct for terminal 3D viewing
pub struct TerminalApp {
    source: PathBuf,
    config: ViewerConfig,
    renderer: AsciiRenderer,
    model: ModelSlot<MeshHandle>,
    model_matrix: Matrix4<f32>,
    projection: Projection,
    context: FrameContext,
    running: bool,
}

impl TerminalApp {
    pub fn new(source: PathBuf, geometry: &GeometryBuffer, config: ViewerConfig) -> io::Result<Self> {
        let (width, height) = terminal::size()?;
        Ok(Self::with_size(source, geometry, config, width, height))
    }

    /// Build the app for a fixed viewport without touching the terminal
    pub fn with_size(
        source: PathBuf,
        geometry: &GeometryBuffer,
        config: ViewerConfig,
        width: u16,
        height: u16,
    ) -> Self {
        let config = config.sanitized();
        let mut projection = Projection::new(width as u32, height as u32, config.camera.near, config.camera.far);
        projection.resize(f32::from(width), f32::from(height) * CELL_ASPECT);

        let mut app = Self {
            source,
            renderer: AsciiRenderer::new(width as usize, height as usize),
            model: ModelSlot::new(),
            model_matrix: Matrix4::identity(),
            projection,
            context: FrameContext {
                camera: Camera::from_options(&config.camera),
                input: InputState::new(false),
                clock: FrameClock::new(Instant::now()),
            },
            config,
            running: true,
        };
        app.set_geometry(geometry);
        app
    }

    pub fn context(&self) -> &FrameContext {
        &self.context
    }

    pub fn renderer(&self) -> &AsciiRenderer {
        &self.renderer
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn loaded_index_count(&self) -> usize {
        self.model.index_count()
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide, EnableMouseCapture)?;

        let enhanced = terminal::supports_keyboard_enhancement().unwrap_or(false);
        if enhanced {
            execute!(
                stdout(),
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
        }
        self.context.input = InputState::new(enhanced);
        self.context.clock = FrameClock::new(Instant::now());

        let result = self.main_loop();

        // Cleanup runs every step; the first error wins
        let pop = if enhanced {
            execute!(stdout(), PopKeyboardEnhancementFlags)
        } else {
            Ok(())
        };
        let restore = execute!(stdout(), DisableMouseCapture, terminal::LeaveAlternateScreen, cursor::Show);
        let raw = terminal::disable_raw_mode();

        result.and(pop).and(restore).and(raw)
    }

    fn main_loop(&mut self) -> io::Result<()> {
        let target_frame_time = Duration::from_secs(1) / self.config.render.target_fps.max(1);

        while self.running {
            let frame_start = Instant::now();

            // Handle input
            while event::poll(Duration::ZERO)? {
                let event = event::read()?;
                if let Some(action) = self.context.input.handle_event(&event, Instant::now()) {
                    self.handle_action(action);
                }
            }

            // Update
            let delta_time = self.context.clock.tick(Instant::now());
            self.update(delta_time, Instant::now());

            // Render
            self.render_frame();
            self.present()?;

            // Frame timing
            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }
        }

        Ok(())
    }

    pub fn handle_action(&mut self, action: InputAction) {
        match action {
            InputAction::Quit => self.running = false,
            InputAction::Reload => self.reload(),
            InputAction::ResetCamera => {
                self.context.camera = Camera::from_options(&self.config.camera);
            }
            InputAction::Resize(width, height) => {
                self.renderer.resize(width as usize, height as usize);
                self.projection.resize(f32::from(width), f32::from(height) * CELL_ASPECT);
            }
        }
    }

    pub fn update(&mut self, delta_time: f32, now: Instant) {
        let FrameContext { camera, input, .. } = &mut self.context;
        input.apply(camera, &self.config.camera, delta_time, now);
    }

    /// Clear the frame and draw the current model
    pub fn render_frame(&mut self) {
        let [r, g, b] = self.config.render.color;
        let uniforms = FrameUniforms {
            model: self.model_matrix,
            view: self.context.camera.view_matrix(),
            projection: self.projection.matrix(self.context.camera.zoom()),
            color: Vector3::new(f32::from(r), f32::from(g), f32::from(b)) / 255.0,
        };

        self.renderer.clear();
        self.model.draw(&mut self.renderer, &uniforms);
    }

    fn present(&mut self) -> io::Result<()> {
        let mut stdout = stdout();
        self.renderer.present(&mut stdout)?;

        // Draw UI overlay
        let camera = &self.context.camera;
        let status = format!(
            "pos ({:.2}, {:.2}, {:.2}) | yaw {:.1} | pitch {:.1} | fov {:.1} | {} tris",
            camera.position.x,
            camera.position.y,
            camera.position.z,
            camera.yaw(),
            camera.pitch(),
            camera.zoom(),
            self.model.index_count() / 3
        );
        let last_row = self.renderer.height().saturating_sub(1) as u16;
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            SetForegroundColor(Color::Yellow),
            Print(format!(
                "objview | FPS: {:.1} | WASD=Move Arrows/Drag=Look Wheel=Zoom R=Reload C=Reset Q=Quit",
                self.context.clock.fps()
            )),
            cursor::MoveTo(0, last_row),
            terminal::Clear(ClearType::CurrentLine),
            Print(status),
            ResetColor
        )?;

        stdout.flush()
    }

    /// Re-read the source file. On failure the current model stays loaded.
    pub fn reload(&mut self) {
        match load_geometry(&self.source, self.config.load.face_policy) {
            Ok(geometry) => self.set_geometry(&geometry),
            Err(err) => log::error!("reload failed, keeping current model: {}", err),
        }
    }

    fn set_geometry(&mut self, geometry: &GeometryBuffer) {
        self.model.load(&mut self.renderer, geometry);
        self.model_matrix = geometry
            .bounds()
            .map(|bounds| Transform::fit_to_unit_cube(&bounds))
            .unwrap_or_else(Matrix4::identity);
    }
}

impl Drop for TerminalApp {
    fn drop(&mut self) {
        self.model.unload(&mut self.renderer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use objview_core::{FacePolicy, GeometryBuilder};

    const TRIANGLE: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
    const QUAD: &str = "v -1 -1 0\nv 1 -1 0\nv 1 1 0\nv -1 1 0\nf 1 2 3\nf 1 3 4\n";

    fn geometry(text: &str) -> GeometryBuffer {
        GeometryBuilder::default()
            .build(&objview_core::wavefront::parse_str(text))
            .unwrap()
    }

    fn temp_obj(name: &str, text: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("objview-{}-{}.obj", name, std::process::id()));
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_frame_clock_caps_delta() {
        let start = Instant::now();
        let mut clock = FrameClock::new(start);
        let dt = clock.tick(start + Duration::from_millis(16));
        assert!((dt - 0.016).abs() < 1e-3);
        let dt = clock.tick(start + Duration::from_secs(10));
        assert_eq!(dt, MAX_FRAME_DELTA);
        assert!(clock.fps() > 0.0);
    }

    #[test]
    fn test_render_frame_draws_model() {
        let mut app = TerminalApp::with_size(PathBuf::from("unused.obj"), &geometry(QUAD), ViewerConfig::default(), 40, 20);
        app.render_frame();
        assert_ne!(app.renderer().glyph_at(20, 10), ' ');
    }

    #[test]
    fn test_reload_replaces_model() {
        let path = temp_obj("reload", TRIANGLE);
        let mut app = TerminalApp::with_size(path.clone(), &geometry(QUAD), ViewerConfig::default(), 40, 20);
        assert_eq!(app.loaded_index_count(), 6);

        app.handle_action(InputAction::Reload);
        assert_eq!(app.loaded_index_count(), 3);
        assert_eq!(app.renderer().live_meshes(), 1);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_failed_reload_keeps_model() {
        let path = temp_obj("broken", "v 0 0 0\nf 1 2 3\n");
        let mut config = ViewerConfig::default();
        config.load.face_policy = FacePolicy::Reject;
        let mut app = TerminalApp::with_size(path.clone(), &geometry(QUAD), config, 40, 20);

        app.reload();
        assert_eq!(app.loaded_index_count(), 6);
        assert_eq!(app.renderer().live_meshes(), 1);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_unsanitized_config_is_repaired() {
        let mut config = ViewerConfig::default();
        config.camera.zoom_min = 50.0;
        config.camera.zoom_max = 10.0;
        config.camera.pitch = f32::NAN;
        config.camera.near = 1.0;
        config.camera.far = 1.0;
        config.render.target_fps = 0;

        let mut app = TerminalApp::with_size(PathBuf::from("unused.obj"), &geometry(TRIANGLE), config, 40, 20);
        assert_eq!(app.context().camera.pitch(), 0.0);
        assert_eq!(app.context().camera.zoom(), 45.0);
        assert_eq!(app.config.render.target_fps, 1);
        app.render_frame();
    }

    #[test]
    fn test_quit_and_reset_actions() {
        let mut app = TerminalApp::with_size(PathBuf::from("unused.obj"), &geometry(TRIANGLE), ViewerConfig::default(), 40, 20);
        app.context.camera.set_euler_angles(30.0, 10.0);
        app.handle_action(InputAction::ResetCamera);
        assert_eq!(app.context().camera.yaw(), -90.0);
        assert_eq!(app.context().camera.pitch(), 0.0);

        app.handle_action(InputAction::Resize(100, 30));
        assert_eq!(app.renderer().width(), 100);

        assert!(app.is_running());
        app.handle_action(InputAction::Quit);
        assert!(!app.is_running());
    }
}
