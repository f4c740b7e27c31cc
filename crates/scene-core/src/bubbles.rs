//! Ground bubble effect.
//!
//! A fixed grid of particles lies on the ground. A trigger note starts the
//! particle in its cell rising; from then on its motion is integrated every
//! frame until it has shrunk away near the top, after which it regrows at its
//! resting place and can be triggered again.
//!
//! Per cell: at rest -> rising -> fading out -> at rest. A session restart
//! snaps every cell back to rest from whatever state it is in.

use crate::constants::*;
use crate::cursor::{NoteTimelineCursor, TimelineEntry};
use crate::notes::{is_preallocation_time, BubbleNote};
use crate::render::{InstanceHandle, InstanceRenderer, MeshKind};
use glam::{Mat4, Quat, Vec3};
use std::f32::consts::FRAC_PI_2;

#[derive(Clone, Debug)]
pub struct BubbleConfig {
    pub columns: usize,
    pub rows: usize,
    pub spacing: f32,
    pub start_y: f32,
    pub speed_y: f32,
    pub tilt_height: f32,
    pub fade_start_y: f32,
    pub fade_range_y: f32,
    pub regrow_per_sec: f32,
    pub scale: f32,
    pub rest_color: Vec3,
    pub lit_color: Vec3,
}

impl Default for BubbleConfig {
    fn default() -> Self {
        Self {
            columns: BUBBLE_GRID_COLUMNS,
            rows: BUBBLE_GRID_ROWS,
            spacing: BUBBLE_GRID_SPACING,
            start_y: BUBBLE_START_Y,
            speed_y: BUBBLE_SPEED_Y,
            tilt_height: BUBBLE_TILT_HEIGHT,
            fade_start_y: BUBBLE_FADE_START_Y,
            fade_range_y: BUBBLE_FADE_RANGE_Y,
            regrow_per_sec: BUBBLE_REGROW_PER_SEC,
            scale: BUBBLE_SCALE,
            rest_color: rgb(BUBBLE_REST_COLOR),
            lit_color: rgb(BUBBLE_LIT_COLOR),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridParticleState {
    pub started: bool,
    pub x: f32,
    pub z: f32,
    pub y: f32,
    pub scale: f32,
    pub color: Vec3,
    pub rotation: Quat,
}

impl GridParticleState {
    pub fn position(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

pub struct GroundGridBubbleAnimator {
    config: BubbleConfig,
    cursor: NoteTimelineCursor<TimelineEntry<(usize, usize)>>,
    particles: Vec<GridParticleState>,
    handles: Vec<InstanceHandle>,
    is_resetting: bool,
}

impl GroundGridBubbleAnimator {
    pub fn new<R: InstanceRenderer + ?Sized>(
        events: &[BubbleNote],
        config: BubbleConfig,
        renderer: &mut R,
    ) -> Self {
        let entries = events
            .iter()
            .map(|e| TimelineEntry::new(e.time, e.time, (e.extra.column, e.extra.row)))
            .collect::<Vec<_>>();
        let cursor = NoteTimelineCursor::without(entries, |e| is_preallocation_time(e.on));

        let half_w = (config.columns.saturating_sub(1)) as f32 / 2.0;
        let half_h = (config.rows.saturating_sub(1)) as f32 / 2.0;
        let mut particles = Vec::with_capacity(config.columns * config.rows);
        for row in 0..config.rows {
            for column in 0..config.columns {
                particles.push(GridParticleState {
                    started: false,
                    x: (column as f32 - half_w) * config.spacing,
                    z: (row as f32 - half_h) * config.spacing,
                    y: config.start_y,
                    scale: 1.0,
                    color: config.rest_color,
                    rotation: resting_rotation(),
                });
            }
        }
        let handles = renderer.allocate_instances(MeshKind::Bubble, particles.len());
        let mut animator = Self {
            config,
            cursor,
            particles,
            handles,
            is_resetting: false,
        };
        animator.commit(renderer);

        log::info!(
            "[bubbles] cells={} triggers={}",
            animator.particles.len(),
            animator.cursor.len()
        );
        animator
    }

    /// Start newly triggered cells, then integrate every cell by `delta_time`.
    pub fn render<R: InstanceRenderer + ?Sized>(
        &mut self,
        time: f64,
        delta_time: f32,
        camera_position: Vec3,
        renderer: &mut R,
    ) {
        if self.is_resetting {
            for p in &mut self.particles {
                snap_to_rest(p, &self.config);
            }
            self.is_resetting = false;
        }

        for i in self.cursor.advance_on(time) {
            let (column, row) = self.cursor.events()[i].data;
            if column >= self.config.columns || row >= self.config.rows {
                log::debug!("[bubbles] trigger for cell ({column}, {row}) is outside the grid");
                continue;
            }
            self.particles[row * self.config.columns + column].started = true;
        }

        for p in &mut self.particles {
            update_particle(p, &self.config, delta_time, camera_position);
        }
        self.commit(renderer);
    }

    /// Rewind triggers; particles snap back to rest on the next frame.
    pub fn reset(&mut self) {
        self.cursor.reset();
        self.is_resetting = true;
    }

    pub fn particle(&self, column: usize, row: usize) -> Option<&GridParticleState> {
        if column >= self.config.columns {
            return None;
        }
        self.particles.get(row * self.config.columns + column)
    }

    pub fn particles(&self) -> &[GridParticleState] {
        &self.particles
    }

    pub fn is_resetting(&self) -> bool {
        self.is_resetting
    }

    pub fn config(&self) -> &BubbleConfig {
        &self.config
    }

    fn commit<R: InstanceRenderer + ?Sized>(&self, renderer: &mut R) {
        for (p, &h) in self.particles.iter().zip(&self.handles) {
            let m = Mat4::from_scale_rotation_translation(
                Vec3::splat(p.scale * self.config.scale),
                p.rotation,
                p.position(),
            );
            renderer.set_instance_transform(h, m);
            renderer.set_instance_color(h, p.color);
        }
        renderer.commit(MeshKind::Bubble);
    }
}

/// Lying flat on the ground, facing up.
fn resting_rotation() -> Quat {
    Quat::from_rotation_x(-FRAC_PI_2)
}

/// Face the camera. The immersive render path has no native billboard mode,
/// so the rotation is computed here.
fn billboard_rotation(position: Vec3, camera_position: Vec3) -> Quat {
    match (camera_position - position).try_normalize() {
        Some(dir) => Quat::from_rotation_arc(Vec3::Z, dir),
        None => Quat::IDENTITY,
    }
}

fn snap_to_rest(p: &mut GridParticleState, config: &BubbleConfig) {
    p.started = false;
    p.y = config.start_y;
    p.scale = 1.0;
    p.color = config.rest_color;
    p.rotation = resting_rotation();
}

fn update_particle(p: &mut GridParticleState, config: &BubbleConfig, dt: f32, camera: Vec3) {
    if !p.started {
        p.scale = (p.scale + config.regrow_per_sec * dt).min(1.0);
        p.color = config.rest_color;
        p.rotation = resting_rotation();
        return;
    }

    p.y += config.speed_y * dt;
    let facing = billboard_rotation(p.position(), camera);
    let rise = p.y - config.start_y;
    if rise < config.tilt_height {
        let t = (rise / config.tilt_height).clamp(0.0, 1.0);
        p.rotation = resting_rotation().slerp(facing, t);
        p.color = config.rest_color.lerp(config.lit_color, t);
    } else {
        p.rotation = facing;
        p.color = config.lit_color;
    }

    if p.y <= config.fade_start_y {
        p.scale = (p.scale + config.regrow_per_sec * dt).min(1.0);
        return;
    }
    p.scale = (1.0 - (p.y - config.fade_start_y) / config.fade_range_y).max(0.0);
    if p.scale <= 0.0 {
        p.started = false;
        p.y = config.start_y;
        p.rotation = resting_rotation();
    }
}
