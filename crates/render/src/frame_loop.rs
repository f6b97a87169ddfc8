use crate::Renderer;
use glyphfield_input::Controls;
use glyphfield_scene::{PerspectiveCamera, Scene};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Cloneable flag that ends a [`RenderLoop`].
#[derive(Debug, Clone, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Counters for the frames a loop has driven.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frames: u64,
    pub controls_updates: u64,
    pub renders: u64,
    /// Frames in which the controls moved the camera.
    pub camera_moves: u64,
}

/// Result of asking the loop for one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome<T> {
    /// The frame was rendered; schedule the next one.
    Continue(T),
    Stopped,
}

impl<T> FrameOutcome<T> {
    pub fn is_stopped(&self) -> bool {
        matches!(self, FrameOutcome::Stopped)
    }
}

/// Drives controls and rendering, one frame at a time.
///
/// The host calls [`run_frame`](RenderLoop::run_frame) whenever it is time to
/// draw and reschedules while the outcome is `Continue`.
#[derive(Debug)]
pub struct RenderLoop {
    stop: StopToken,
    stats: FrameStats,
    started: Instant,
    last_frame: Option<Instant>,
}

impl Default for RenderLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderLoop {
    pub fn new() -> Self {
        Self {
            stop: StopToken::new(),
            stats: FrameStats::default(),
            started: Instant::now(),
            last_frame: None,
        }
    }

    pub fn stop_token(&self) -> StopToken {
        self.stop.clone()
    }

    pub fn stop(&self) {
        self.stop.stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_stopped()
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Time since the loop was created.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Update the controls, then call `render` with the updated camera.
    pub fn run_frame<C, T, F>(
        &mut self,
        controls: &mut C,
        camera: &mut PerspectiveCamera,
        render: F,
    ) -> FrameOutcome<T>
    where
        C: Controls + ?Sized,
        F: FnOnce(&PerspectiveCamera) -> T,
    {
        if self.stop.is_stopped() {
            return FrameOutcome::Stopped;
        }

        let now = Instant::now();
        if let Some(last) = self.last_frame.replace(now) {
            tracing::trace!(
                frame = self.stats.frames,
                dt_ms = (now - last).as_secs_f64() * 1000.0,
                "frame"
            );
        }

        let moved = controls.update(camera);
        self.stats.controls_updates += 1;
        if moved {
            self.stats.camera_moves += 1;
        }

        let output = render(camera);
        self.stats.renders += 1;
        self.stats.frames += 1;
        FrameOutcome::Continue(output)
    }

    /// One frame through a [`Renderer`].
    pub fn render_frame<C, R>(
        &mut self,
        controls: &mut C,
        camera: &mut PerspectiveCamera,
        scene: &Scene,
        renderer: &mut R,
    ) -> FrameOutcome<R::Output>
    where
        C: Controls + ?Sized,
        R: Renderer + ?Sized,
    {
        self.run_frame(controls, camera, |camera| renderer.render(scene, camera))
    }

    /// Run up to `frames` frames, stopping early if the token fires.
    /// Returns the last frame's output.
    pub fn run_for<C, T, F>(
        &mut self,
        frames: u64,
        controls: &mut C,
        camera: &mut PerspectiveCamera,
        mut render: F,
    ) -> Option<T>
    where
        C: Controls + ?Sized,
        F: FnMut(&PerspectiveCamera) -> T,
    {
        let mut last = None;
        for _ in 0..frames {
            match self.run_frame(controls, camera, &mut render) {
                FrameOutcome::Continue(output) => last = Some(output),
                FrameOutcome::Stopped => break,
            }
        }
        tracing::debug!(
            frames = self.stats.frames,
            camera_moves = self.stats.camera_moves,
            "frame run finished"
        );
        last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DebugTextRenderer;
    use crate::test_scene::triangle_scene;
    use glyphfield_input::OrbitControls;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records the order of control updates and renders.
    struct Recording {
        log: Rc<RefCell<Vec<&'static str>>>,
    }

    impl Controls for Recording {
        fn update(&mut self, _camera: &mut PerspectiveCamera) -> bool {
            self.log.borrow_mut().push("update");
            false
        }
    }

    #[test]
    fn one_update_then_one_render_per_frame() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut controls = Recording { log: log.clone() };
        let mut camera = PerspectiveCamera::default();
        let mut frame_loop = RenderLoop::new();

        let last = frame_loop.run_for(3, &mut controls, &mut camera, |_| {
            log.borrow_mut().push("render");
        });

        assert!(last.is_some());
        assert_eq!(
            *log.borrow(),
            ["update", "render", "update", "render", "update", "render"]
        );
        let stats = frame_loop.stats();
        assert_eq!(stats.frames, 3);
        assert_eq!(stats.controls_updates, 3);
        assert_eq!(stats.renders, 3);
        assert_eq!(stats.camera_moves, 0);
    }

    #[test]
    fn stop_token_ends_the_loop() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut controls = Recording { log: log.clone() };
        let mut camera = PerspectiveCamera::default();
        let mut frame_loop = RenderLoop::new();
        let token = frame_loop.stop_token();

        let mut renders = 0;
        frame_loop.run_for(100, &mut controls, &mut camera, |_| {
            log.borrow_mut().push("render");
            renders += 1;
            if renders == 5 {
                token.stop();
            }
        });

        assert_eq!(renders, 5);
        assert!(frame_loop.is_stopped());
        assert_eq!(frame_loop.stats().controls_updates, 5);
        let outcome = frame_loop.run_frame(&mut controls, &mut camera, |_| ());
        assert!(outcome.is_stopped());
        assert_eq!(log.borrow().len(), 10);
    }

    #[test]
    fn renders_with_the_updated_camera() {
        let mut camera = PerspectiveCamera::default();
        let mut controls = OrbitControls::new(&camera);
        controls.enable_damping = false;
        controls.set_viewport_height(100.0);
        controls.handle(glyphfield_input::Action::Rotate(glam::Vec2::new(10.0, 0.0)), &camera);
        let before = camera.position;

        let mut frame_loop = RenderLoop::new();
        let seen = frame_loop.run_frame(&mut controls, &mut camera, |cam| cam.position);

        assert_eq!(seen, FrameOutcome::Continue(camera.position));
        assert_ne!(camera.position, before);
        assert_eq!(frame_loop.stats().camera_moves, 1);
    }

    #[test]
    fn render_frame_uses_renderer() {
        let scene = triangle_scene(4);
        let mut camera = PerspectiveCamera::default();
        let mut controls = OrbitControls::new(&camera);
        let mut renderer = DebugTextRenderer::new();
        let mut frame_loop = RenderLoop::new();

        for _ in 0..2 {
            let out = frame_loop.render_frame(&mut controls, &mut camera, &scene, &mut renderer);
            match out {
                FrameOutcome::Continue(text) => assert!(text.contains("Meshes: 4")),
                FrameOutcome::Stopped => panic!("loop stopped early"),
            }
        }
        assert_eq!(renderer.frames(), 2);
        assert_eq!(frame_loop.stats().renders, 2);
    }

    #[test]
    fn token_clones_share_state() {
        let a = StopToken::new();
        let b = a.clone();
        assert!(!b.is_stopped());
        a.stop();
        assert!(b.is_stopped());
    }
}
