//! The engine handle and its main loop.
//!
//! [`Engine`] is a cheap, cloneable handle over the shared world, physics
//! registry, camera and input bindings. Any thread may create entities,
//! register force generators or move the camera through it. [`Engine::run`]
//! takes over the calling thread with the window event loop. Each frame it
//!
//! 1. stops if [`Engine::shutdown`] was called,
//! 2. finalizes queued entities and uploads their models,
//! 3. fires held-key bindings,
//! 4. steps physics once the update period has elapsed,
//! 5. renders the geometry and composite passes and presents.
//!
//! Physics and rendering share the entity lock, so they never observe each
//! other's partial state.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};

use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::PhysicalKey,
    window::Window,
};

use crate::{
    camera::Camera,
    config::EngineConfig,
    data_structures::model::ModelDescriptor,
    input::{InputBindings, InputEvent, Key},
    physics::{PhysicsEngine, body::Body},
    render::Renderer,
    sync::lock,
    world::{Entity, EntityId, World},
};

/// Longest physics step taken after a stall, in seconds.
const MAX_STEP: f64 = 0.25;

struct Shared {
    config: EngineConfig,
    world: World,
    physics: PhysicsEngine,
    camera: Mutex<Camera>,
    input: Mutex<InputBindings>,
    stopped: AtomicBool,
}

#[derive(Clone)]
pub struct Engine {
    shared: Arc<Shared>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                world: World::new(),
                physics: PhysicsEngine::new(),
                camera: Mutex::new(Camera::default()),
                input: Mutex::new(InputBindings::new()),
                stopped: AtomicBool::new(false),
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    pub fn world(&self) -> &World {
        &self.shared.world
    }

    pub fn physics(&self) -> &PhysicsEngine {
        &self.shared.physics
    }

    /// Queue an entity. It joins physics and rendering at the next frame.
    pub fn create_entity(&self, model: Arc<ModelDescriptor>, body: Body) -> EntityId {
        self.shared.world.enqueue(Entity::new(model, body))
    }

    pub fn with_body<R>(&self, id: EntityId, f: impl FnOnce(&mut Body) -> R) -> Option<R> {
        self.shared.world.with_body(id, f)
    }

    /// Remove an entity and every force registration bound to it.
    pub fn remove_entity(&self, id: EntityId) -> bool {
        self.shared.physics.forget_entity(id);
        self.shared.world.remove(id)
    }

    pub fn camera(&self) -> Camera {
        *lock(&self.shared.camera)
    }

    pub fn set_camera(&self, camera: Camera) {
        *lock(&self.shared.camera) = camera;
    }

    /// Edit the input bindings. Callbacks must not call back into the
    /// camera accessors of this handle; they receive the camera directly.
    pub fn with_input<R>(&self, f: impl FnOnce(&mut InputBindings) -> R) -> R {
        f(&mut lock(&self.shared.input))
    }

    /// Feed one input event through the bindings.
    pub fn dispatch_input(&self, event: &InputEvent) {
        let mut input = lock(&self.shared.input);
        let mut camera = lock(&self.shared.camera);
        input.handle(event, &mut camera);
    }

    /// Finalize queued entities and run one physics step, without rendering.
    ///
    /// For driving the simulation without a window. While [`Engine::run`] is
    /// active the loop already steps physics every update period, so calling
    /// this as well advances the simulation twice. Entities finalized here get
    /// their models uploaded on the next rendered frame.
    pub fn step(&self, dt: f64) {
        self.shared.world.finalize_pending(|_| {});
        self.shared.physics.step(&self.shared.world, dt);
    }

    /// Ask the loop to stop before its next frame. Safe from any thread.
    pub fn shutdown(&self) {
        self.shared.stopped.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.stopped.load(Ordering::Acquire)
    }

    /// Open the window and run until it closes or [`Engine::shutdown`].
    ///
    /// Errors acquiring the GPU, compiling shaders or creating the G-buffer
    /// end the loop and are returned here.
    pub fn run(self) -> anyhow::Result<()> {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };

        let event_loop = EventLoop::new()?;
        let runtime = tokio::runtime::Runtime::new()?;
        let mut app = App::new(self.clone(), runtime);
        event_loop.run_app(&mut app)?;

        self.shutdown();
        match app.failure.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

struct FrameCounter {
    frames: u32,
    since: Instant,
}

impl FrameCounter {
    fn new() -> Self {
        Self {
            frames: 0,
            since: Instant::now(),
        }
    }

    fn tick(&mut self) {
        self.frames += 1;
        let elapsed = self.since.elapsed();
        if elapsed >= Duration::from_secs(1) {
            log::debug!("{:.1} fps", self.frames as f64 / elapsed.as_secs_f64());
            self.frames = 0;
            self.since = Instant::now();
        }
    }
}

struct App {
    engine: Engine,
    async_runtime: tokio::runtime::Runtime,
    renderer: Option<Renderer>,
    failure: Option<anyhow::Error>,
    last_time: Instant,
    time_since_tick: Duration,
    next_frame: Instant,
    fps: FrameCounter,
}

impl App {
    fn new(engine: Engine, async_runtime: tokio::runtime::Runtime) -> Self {
        Self {
            engine,
            async_runtime,
            renderer: None,
            failure: None,
            last_time: Instant::now(),
            time_since_tick: Duration::from_millis(0),
            next_frame: Instant::now(),
            fps: FrameCounter::new(),
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{:#}", error);
        self.failure = Some(error);
        event_loop.exit();
    }

    fn frame(&mut self) {
        let shared = &self.engine.shared;
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        if shared.stopped.load(Ordering::Acquire) {
            return;
        }

        shared.world.finalize_pending(|entity| renderer.prepare(entity));

        let dt = self.last_time.elapsed();
        self.last_time = Instant::now();
        {
            let mut input = lock(&shared.input);
            let mut camera = lock(&shared.camera);
            input.dispatch_held(&mut camera);
        }

        self.time_since_tick += dt;
        if self.time_since_tick >= shared.config.update_period() {
            let step = self.time_since_tick.as_secs_f64().min(MAX_STEP);
            shared.physics.step(&shared.world, step);
            self.time_since_tick = Duration::from_millis(0);
        }

        let camera = *lock(&shared.camera);
        match renderer.render_frame(&shared.world, &camera) {
            Ok(()) => self.fps.tick(),
            // Reconfigure the surface if it's lost or outdated
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => renderer.reconfigure(),
            Err(e) => log::error!("Unable to render {}", e),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.is_some() {
            return;
        }
        let config = &self.engine.shared.config;
        let window_attributes = Window::default_attributes()
            .with_title(config.title.clone())
            .with_inner_size(winit::dpi::PhysicalSize::new(config.width, config.height));

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, e.into()),
        };

        match self
            .async_runtime
            .block_on(Renderer::new(window, &self.engine.shared.config))
        {
            Ok(renderer) => {
                log::info!("renderer ready");
                self.renderer = Some(renderer);
                self.last_time = Instant::now();
            }
            Err(e) => self.fail(event_loop, e.into()),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        if self.renderer.is_none() {
            return;
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                let resized = self
                    .renderer
                    .as_mut()
                    .map(|r| r.resize(size.width, size.height));
                if let Some(Err(e)) = resized {
                    self.fail(event_loop, e.into());
                }
            }
            WindowEvent::Focused(false) => lock(&self.engine.shared.input).release_all(),
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key
                    && let Some(key) = Key::from_key_code(code)
                    && !event.repeat
                {
                    self.engine.dispatch_input(&InputEvent::key(key, event.state));
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let event = lock(&self.engine.shared.input).cursor_moved(position.x, position.y);
                self.engine.dispatch_input(&event);
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.engine
                    .dispatch_input(&InputEvent::mouse_button(button.into(), state));
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.engine.dispatch_input(&InputEvent::wheel(delta));
            }
            WindowEvent::RedrawRequested => self.frame(),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.engine.is_stopped() {
            event_loop.exit();
            return;
        }
        let Some(renderer) = self.renderer.as_ref() else {
            return;
        };
        let now = Instant::now();
        if now >= self.next_frame {
            renderer.context().window().request_redraw();
            self.next_frame = now + self.engine.shared.config.render_period();
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_frame));
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        // GPU objects go before the window and event loop
        self.renderer = None;
        log::info!("engine stopped");
    }
}
