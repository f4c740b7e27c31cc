mod audio;
mod controls;
mod gpu;
mod score;

use std::path::PathBuf;
use std::time::Duration;

use glam::{Quat, Vec3};
use scene_core::{
    rgb, AudioTransport, Camera, InstanceRenderer, MeshKind, OrbitCamera, Scheduler,
    SessionConfig, SessionController, WallClock, LISTENER_UPDATES_PER_SEC,
};
use winit::{event::*, event_loop::EventLoop, window::WindowBuilder};

use audio::{ScorePlayer, ToneSchedule, WallClockTransport};
use controls::Command;
use gpu::{GpuState, InstanceBatches};

const DEMO_SEED: u64 = 42;
const GROUND_SIZE: f32 = 800.0;
const GROUND_COLOR: [f32; 3] = [0.04, 0.04, 0.05];

/// Everything the scheduled callbacks operate on.
struct App {
    session: SessionController,
    transport: Box<dyn AudioTransport>,
    scene: InstanceBatches,
    camera: Camera,
    orbit: OrbitCamera,
}

impl App {
    fn update(&mut self, delta_time: f32) {
        self.session.poll(&mut *self.transport, &mut self.scene);
        let elapsed = self.session.elapsed(&*self.transport);
        self.orbit.update(&mut self.camera, elapsed as f32);
        self.session.frame(
            &*self.transport,
            delta_time,
            self.camera.position(),
            &mut self.scene,
        );
    }

    fn listener_tick(&mut self) {
        let world = self.camera.world_matrix();
        self.session.listener_tick(&world, &mut *self.transport);
    }

    fn command(&mut self, command: Command) {
        if command.moves_camera() {
            self.orbit.release("keyboard input detected");
        }
        match command {
            Command::TogglePause if self.session.is_paused() => {
                self.session.resume(&mut *self.transport)
            }
            Command::TogglePause => self.session.pause(&mut *self.transport),
            other => controls::apply_to_camera(&mut self.camera, other),
        }
    }
}

fn add_ground(scene: &mut InstanceBatches) {
    let ground = scene.allocate_instances(MeshKind::Ground, 1);
    for h in ground {
        scene.set_instance_transform(
            h,
            glam::Mat4::from_scale_rotation_translation(
                Vec3::new(GROUND_SIZE, GROUND_SIZE, 1.0),
                Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2),
                Vec3::ZERO,
            ),
        );
        scene.set_instance_color(h, rgb(GROUND_COLOR));
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let score_path = std::env::args().nth(1).map(PathBuf::from);
    let score = score::load_score(score_path.as_deref(), DEMO_SEED)?;
    let config = SessionConfig::default();

    let schedule = ToneSchedule::from_score(&score, &config.echo);
    let end_time = schedule.end_time();
    let transport: Box<dyn AudioTransport> = match ScorePlayer::start(schedule) {
        Ok(player) => Box::new(player),
        Err(err) => {
            log::warn!("[audio] {err:#}; continuing without sound");
            Box::new(WallClockTransport::new(end_time))
        }
    };

    let mut scene = InstanceBatches::new();
    add_ground(&mut scene);
    let mut app = App {
        session: SessionController::new(score, config),
        transport,
        scene,
        camera: Camera::default(),
        orbit: OrbitCamera::default(),
    };

    let mut scheduler = Scheduler::<App>::new();
    scheduler
        .on_every_frame(|app, frame| app.update(frame.delta_time))
        .on_fixed_interval(
            Duration::from_secs_f64(1.0 / LISTENER_UPDATES_PER_SEC as f64),
            |app| app.listener_tick(),
        );
    let clock = WallClock::new();

    let event_loop = EventLoop::new()?;
    let window = WindowBuilder::new()
        .with_title("Installation scene (native)")
        .build(&event_loop)?;
    let mut state = pollster::block_on(GpuState::new(&window))?;
    app.camera.aspect = state.aspect();

    event_loop.run(move |event, elwt| match event {
        Event::WindowEvent {
            event: WindowEvent::Resized(size),
            ..
        } => {
            state.resize(size);
            app.camera.aspect = state.aspect();
        }
        Event::WindowEvent {
            event: WindowEvent::CloseRequested,
            ..
        } => elwt.exit(),
        Event::WindowEvent {
            event:
                WindowEvent::KeyboardInput {
                    event:
                        KeyEvent {
                            logical_key,
                            state: ElementState::Pressed,
                            ..
                        },
                    ..
                },
            ..
        } => match controls::command_for_key(&logical_key) {
            Some(Command::Quit) => elwt.exit(),
            Some(command) => app.command(command),
            None => {}
        },
        Event::WindowEvent {
            event:
                WindowEvent::MouseInput {
                    state: ElementState::Pressed,
                    ..
                },
            ..
        } => app.orbit.release("mouse input detected"),
        Event::AboutToWait => {
            scheduler.tick(&mut app, clock.now_sec());
            match state.render(&app.scene, &app.camera) {
                Ok(_) => state.window.request_redraw(),
                Err(wgpu::SurfaceError::Lost) => state.resize(state.window.inner_size()),
                Err(wgpu::SurfaceError::OutOfMemory) => elwt.exit(),
                Err(err) => log::debug!("[gpu] frame skipped: {err:?}"),
            }
        }
        _ => {}
    })?;
    Ok(())
}
