//! The windowed viewer: one winit window, one GPU context, one stereo
//! pipeline, all driven frame-synchronously from the event loop thread.

use std::time::Instant;

use anyhow::{anyhow, Result};
use glam::Vec3;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget};
use winit::window::{Window, WindowBuilder};

use hmd::HmdDevice;
use shadertoy::VariableTable;

use crate::chassis::ChassisPose;
use crate::context::GpuContext;
use crate::input::{InputState, ViewerCommand};
use crate::pipeline::StereoRenderPipeline;
use crate::scene::{SceneId, SceneRegistry, ShaderWorld};
use crate::scenes::cue::CueScene;
use crate::scenes::dashboard::DashboardScene;
use crate::scenes::floor::FloorScene;
use crate::scenes::gallery::GalleryScene;
use crate::scenes::raymarch::RaymarchScene;
use crate::types::ViewerOptions;

/// Caps a frame's simulation step so a long stall does not turn into a
/// teleport on the next frame.
const MAX_FRAME_DT: f32 = 0.1;

/// Failures that abort the viewer before or while the event loop runs.
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("failed to set up the viewer window")]
    Window(#[source] anyhow::Error),
    #[error("failed to initialise the GPU")]
    Gpu(#[source] anyhow::Error),
    #[error("viewer event loop failed")]
    EventLoop(#[source] anyhow::Error),
}

struct SceneIds {
    raymarch: SceneId,
    gallery: SceneId,
    floor: SceneId,
    dashboard: SceneId,
}

/// Registers the fixed scene roster. Registration order is draw order:
/// worlds first, then the floor, then the chassis-anchored overlays.
fn build_registry(options: &ViewerOptions) -> (SceneRegistry, SceneIds) {
    let mut registry = SceneRegistry::default();
    let raymarch = registry.register(Box::new(RaymarchScene::new()), true, false);
    let gallery = registry.register(
        Box::new(GalleryScene::new(
            &options.shader_dir,
            options.initial_shader.as_deref(),
        )),
        false,
        false,
    );
    let floor = registry.register(Box::new(FloorScene::default()), true, false);
    registry.register(Box::new(CueScene::default()), true, true);
    let dashboard = registry.register(Box::new(DashboardScene::default()), false, true);
    registry.set_shader_worlds(raymarch, gallery);
    (
        registry,
        SceneIds {
            raymarch,
            gallery,
            floor,
            dashboard,
        },
    )
}

struct Viewer {
    context: GpuContext,
    pipeline: StereoRenderPipeline,
    hmd: Box<dyn HmdDevice>,
    chassis: ChassisPose,
    input: InputState,
    ids: SceneIds,
    options: ViewerOptions,
    selected_var: usize,
    start: Instant,
    last_frame: Instant,
}

impl Viewer {
    fn new(window: &Window, options: ViewerOptions) -> Result<Self> {
        let hmd = hmd::detect(options.sway);
        let context = GpuContext::new(window, window.inner_size(), options.vsync)?;
        let (registry, ids) = build_registry(&options);
        let pipeline = StereoRenderPipeline::new(&context, hmd.as_ref(), &options, registry);

        let now = Instant::now();
        let mut viewer = Self {
            context,
            pipeline,
            hmd,
            chassis: ChassisPose::default(),
            input: InputState::default(),
            ids,
            options,
            selected_var: 0,
            start: now,
            last_frame: now,
        };
        viewer.enter_world(ShaderWorld::Raymarch);
        Ok(viewer)
    }

    /// Moves the chassis to the world's declared spawn point and applies
    /// its head scale and floor policy. The head pose itself is untouched.
    fn place_in_world(&mut self, world: ShaderWorld) {
        let registry = self.pipeline.registry_mut();
        let (spawn, head_size) = match world {
            ShaderWorld::Raymarch => registry
                .scene_mut::<RaymarchScene>(self.ids.raymarch)
                .map(|scene| (scene.head_pos(), scene.head_size())),
            ShaderWorld::Gallery => registry
                .scene_mut::<GalleryScene>(self.ids.gallery)
                .map(|scene| (scene.head_pos(), scene.head_size())),
        }
        .unwrap_or((Vec3::new(0.0, 1.6, 0.0), 1.0));

        self.chassis.position = spawn;
        self.pipeline.set_head_size(head_size);
        // The grid floor belongs to the raymarch world; gallery shaders
        // paint their own ground.
        let registry = self.pipeline.registry_mut();
        registry.set_visible(self.ids.floor, world == ShaderWorld::Raymarch);
        self.selected_var = 0;
    }

    fn enter_world(&mut self, world: ShaderWorld) {
        self.place_in_world(world);
        info!(world = ?world, "entered shader world");
    }

    fn active_table_mut(&mut self) -> Option<&mut VariableTable> {
        let world = self.pipeline.registry_mut().active_world()?;
        let registry = self.pipeline.registry_mut();
        match world {
            ShaderWorld::Raymarch => registry
                .scene_mut::<RaymarchScene>(self.ids.raymarch)
                .map(|scene| scene.table_mut()),
            ShaderWorld::Gallery => registry
                .scene_mut::<GalleryScene>(self.ids.gallery)
                .map(|scene| scene.table_mut()),
        }
    }

    fn active_world_fulldome_ready(&mut self) -> bool {
        let Some(world) = self.pipeline.registry_mut().active_world() else {
            return true;
        };
        let registry = self.pipeline.registry_mut();
        match world {
            ShaderWorld::Raymarch => registry
                .scene_mut::<RaymarchScene>(self.ids.raymarch)
                .is_some_and(|scene| scene.fulldome_ready()),
            ShaderWorld::Gallery => registry
                .scene_mut::<GalleryScene>(self.ids.gallery)
                .is_some_and(|scene| scene.fulldome_ready()),
        }
    }

    fn select_variable(&mut self, delta: isize) {
        let Some(count) = self.active_table_mut().map(|table| table.len()) else {
            return;
        };
        if count == 0 {
            debug!("active scene declares no shader variables");
            return;
        }
        self.selected_var =
            (self.selected_var as isize + delta).rem_euclid(count as isize) as usize;
        let index = self.selected_var;
        if let Some(table) = self.active_table_mut() {
            if let Some((name, var)) = table.vars().nth(index) {
                info!(
                    variable = name,
                    value = ?var.as_uniform().truncate(),
                    "selected shader variable"
                );
            }
        }
    }

    fn nudge_variable(&mut self, steps: f32) {
        let index = self.selected_var;
        let Some(table) = self.active_table_mut() else {
            return;
        };
        let Some(name) = table.names().nth(index).map(str::to_owned) else {
            return;
        };
        if let Some(var) = table.get_mut(&name) {
            var.nudge(steps);
            info!(
                variable = %name,
                value = ?var.as_uniform().truncate(),
                "nudged shader variable"
            );
        }
    }

    fn apply_command(&mut self, command: ViewerCommand, elwt: &EventLoopWindowTarget<()>) {
        match command {
            ViewerCommand::ToggleWorld => {
                if let Some(entering) = self.pipeline.registry_mut().toggle_shader_world() {
                    self.enter_world(entering);
                }
            }
            ViewerCommand::NextShader | ViewerCommand::PrevShader => {
                let forward = matches!(command, ViewerCommand::NextShader);
                let gallery_id = self.ids.gallery;
                self.pipeline.with_scenes(&self.context, |ctx, registry| {
                    if let Some(gallery) = registry.scene_mut::<GalleryScene>(gallery_id) {
                        gallery.advance(ctx, forward);
                    }
                });
                self.selected_var = 0;
                if self.pipeline.registry_mut().active_world() == Some(ShaderWorld::Gallery) {
                    self.place_in_world(ShaderWorld::Gallery);
                }
            }
            ViewerCommand::ResetVariables => {
                if let Some(table) = self.active_table_mut() {
                    table.reset_values();
                    info!("shader variables reset to their declared defaults");
                }
            }
            ViewerCommand::SaveSettings => {
                match self.pipeline.registry_mut().active_world() {
                    Some(ShaderWorld::Gallery) => {
                        let gallery_id = self.ids.gallery;
                        if let Some(gallery) = self
                            .pipeline
                            .registry_mut()
                            .scene_mut::<GalleryScene>(gallery_id)
                        {
                            gallery.save_settings();
                        }
                    }
                    _ => debug!("active world keeps no settings file; nothing saved"),
                }
            }
            ViewerCommand::Recenter => {
                self.hmd.recenter();
                info!("head pose recentred");
            }
            ViewerCommand::ResetChassis => {
                self.chassis.reset();
                info!("chassis transformations reset");
            }
            ViewerCommand::ToggleFulldome => {
                let fulldome = self.pipeline.toggle_fulldome();
                info!(fulldome, "fulldome projection toggled");
                if fulldome && !self.active_world_fulldome_ready() {
                    warn!("active scene has no fulldome shader variant; keeping the flat projection");
                }
            }
            ViewerCommand::ToggleDashboard => {
                let registry = self.pipeline.registry_mut();
                let visible = !registry.is_visible(self.ids.dashboard);
                registry.set_visible(self.ids.dashboard, visible);
                info!(visible, "dashboard toggled");
            }
            ViewerCommand::FboScaleUp => self.pipeline.nudge_fbo_scale(1.0),
            ViewerCommand::FboScaleDown => self.pipeline.nudge_fbo_scale(-1.0),
            ViewerCommand::SelectPrevVariable => self.select_variable(-1),
            ViewerCommand::SelectNextVariable => self.select_variable(1),
            ViewerCommand::NudgeVariable(steps) => self.nudge_variable(steps),
            ViewerCommand::Quit => elwt.exit(),
        }
    }

    fn redraw(&mut self, elwt: &EventLoopWindowTarget<()>) {
        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32().min(MAX_FRAME_DT);
        self.last_frame = now;
        let time = (now - self.start).as_secs_f32();

        let inputs = self
            .input
            .drain(dt, self.options.speed, self.options.mouse_sensitivity);
        self.chassis.walk(inputs.step);
        self.chassis.turn(inputs.look.0, inputs.look.1);
        for command in inputs.commands {
            self.apply_command(command, elwt);
        }

        match self
            .pipeline
            .render_frame(&self.context, self.hmd.as_mut(), &self.chassis, time, dt)
        {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let size = self.context.size;
                self.context.resize(size);
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                error!("surface out of memory; shutting down");
                elwt.exit();
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("surface timeout; retrying next frame");
            }
            Err(other) => {
                warn!(error = ?other, "surface error; retrying next frame");
            }
        }
    }
}

pub fn run(options: ViewerOptions) -> Result<(), ViewerError> {
    let event_loop = EventLoop::new()
        .map_err(|err| ViewerError::Window(anyhow!("failed to create event loop: {err}")))?;
    let window = WindowBuilder::new()
        .with_title("Parallax")
        .with_inner_size(PhysicalSize::new(
            options.window_size.0,
            options.window_size.1,
        ))
        .build(&event_loop)
        .map_err(|err| ViewerError::Window(anyhow!("failed to create viewer window: {err}")))?;

    let mut viewer = Viewer::new(&window, options).map_err(ViewerError::Gpu)?;

    event_loop
        .run(move |event, elwt| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                    elwt.exit();
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    viewer.input.handle_key(
                        &event.logical_key,
                        event.state == ElementState::Pressed,
                        event.repeat,
                    );
                }
                WindowEvent::CursorMoved { position, .. } => {
                    viewer.input.cursor_moved(position.x, position.y);
                }
                WindowEvent::MouseInput { state, button, .. } => {
                    if button == MouseButton::Left {
                        viewer.input.mouse_button(state == ElementState::Pressed);
                    }
                }
                WindowEvent::MouseWheel { delta, .. } => {
                    let vertical = match delta {
                        MouseScrollDelta::LineDelta(_, y) => y,
                        MouseScrollDelta::PixelDelta(position) => position.y as f32,
                    };
                    viewer.input.scroll(vertical);
                }
                WindowEvent::Resized(new_size) => {
                    viewer.context.resize(new_size);
                }
                WindowEvent::ScaleFactorChanged {
                    mut inner_size_writer,
                    ..
                } => {
                    let _ = inner_size_writer.request_inner_size(viewer.context.size);
                }
                WindowEvent::RedrawRequested => {
                    viewer.redraw(elwt);
                }
                _ => {}
            },
            Event::AboutToWait => {
                elwt.set_control_flow(ControlFlow::Poll);
                window.request_redraw();
            }
            _ => {}
        })
        .map_err(|err| ViewerError::EventLoop(anyhow!("event loop stopped unexpectedly: {err}")))
}
