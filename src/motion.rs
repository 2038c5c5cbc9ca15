use crate::request::TableId;
use crate::scene::TableLayout;
use std::collections::VecDeque;
use std::time::Duration;

/// Minimal 3D vector for waiter positioning. Y is up; travel happens in
/// the horizontal (x/z) plane only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Distance to `other` ignoring the vertical component.
    pub fn horizontal_distance(&self, other: &Self) -> f32 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        (dx * dx + dz * dz).sqrt()
    }
}

/// Animates the waiter toward resolved tables, one at a time. Owns the
/// travel queue and the agent position; advanced once per render tick.
#[derive(Debug)]
pub struct WaiterMotion {
    position: Vec3,
    travel: VecDeque<TableId>,
    target: Option<Vec3>,
    layout: TableLayout,
    speed: f32,
    epsilon: f32,
}

impl WaiterMotion {
    pub fn new(layout: TableLayout, speed: f32, epsilon: f32) -> Self {
        Self {
            position: layout.waiter_spawn(),
            travel: VecDeque::new(),
            target: None,
            layout,
            speed,
            epsilon,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn moving(&self) -> bool {
        self.target.is_some()
    }

    pub fn travel_len(&self) -> usize {
        self.travel.len()
    }

    /// Queue a visit to `table`. Called once per successful resolution.
    pub fn enqueue(&mut self, table: TableId) {
        self.travel.push_back(table);
    }

    /// Drop all queued travel and stop in place. Used on session teardown
    /// so no stale target survives a restart.
    pub fn clear_travel(&mut self) {
        self.travel.clear();
        self.target = None;
    }

    /// Advance one render tick of `dt`.
    ///
    /// Idle: peek the travel queue and aim at that table, keeping the
    /// current height. Moving: step `speed * dt` along the horizontal
    /// direction; inside `epsilon` of the target, snap to its x/z, consume
    /// the queue head, and go idle again.
    pub fn tick(&mut self, dt: Duration) {
        match self.target {
            None => {
                if let Some(&table) = self.travel.front() {
                    match self.layout.position(table) {
                        Some(world) => {
                            self.target = Some(Vec3::new(world.x, self.position.y, world.z));
                        }
                        None => {
                            // Unknown table id; nothing to walk to.
                            self.travel.pop_front();
                        }
                    }
                }
            }
            Some(target) => {
                let dx = target.x - self.position.x;
                let dz = target.z - self.position.z;
                let dist = (dx * dx + dz * dz).sqrt();
                let step = self.speed * dt.as_secs_f32();
                if dist < self.epsilon || step >= dist {
                    self.position.x = target.x;
                    self.position.z = target.z;
                    self.travel.pop_front();
                    self.target = None;
                } else {
                    self.position.x += dx / dist * step;
                    self.position.z += dz / dist * step;
                }
            }
        }
    }
}
