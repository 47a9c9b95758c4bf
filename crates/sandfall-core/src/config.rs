//! Configuration types for the simulation.

use serde::{Deserialize, Serialize};

/// Grid dimension parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GridConfig {
    /// Width of the grid in cells
    pub width: i32,
    /// Height of the grid in cells
    pub height: i32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: 200,
            height: 150,
        }
    }
}

/// Per-material physics tuning.
///
/// These are the knobs the simulation rules read every tick; none of them
/// are hard-coded in the update logic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PhysicsConfig {
    /// Downward acceleration per tick for falling materials
    pub gravity: f32,
    /// Cap on downward velocity magnitude
    pub max_fall_speed: f32,
    /// Upward acceleration per tick for Gas
    pub gas_buoyancy: f32,
    /// Upward acceleration per tick for Fire (stronger than gas)
    pub fire_buoyancy: f32,
    /// Cap on upward velocity magnitude
    pub max_rise_speed: f32,
    /// Maximum random horizontal impulse added to Gas each tick
    pub gas_drift_impulse: f32,
    /// Maximum random horizontal impulse added to Fire each tick
    pub fire_drift_impulse: f32,
    /// Damping factor applied to horizontal drift each tick (< 1.0)
    pub drift_friction: f32,
    /// Cap on horizontal drift magnitude
    pub max_drift: f32,
    /// Per-tick probability that Fire ignites an adjacent Sand cell
    pub ignition_chance: f64,
    /// Minimum lifetime (ticks) for a freshly spawned Fire cell
    pub fire_lifetime_min: i32,
    /// Maximum lifetime (ticks) for a freshly spawned Fire cell
    pub fire_lifetime_max: i32,
    /// Initial upward velocity given to a freshly spawned Fire cell
    pub fire_spawn_lift: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: 0.1,
            max_fall_speed: 3.0,
            gas_buoyancy: 0.05,
            fire_buoyancy: 0.12,
            max_rise_speed: 2.0,
            gas_drift_impulse: 0.2,
            fire_drift_impulse: 0.4,
            drift_friction: 0.9,
            max_drift: 1.0,
            ignition_chance: 0.05,
            fire_lifetime_min: 40,
            fire_lifetime_max: 90,
            fire_spawn_lift: 0.3,
        }
    }
}

/// Full simulation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Grid dimensions
    pub grid: GridConfig,
    /// Physics tuning
    pub physics: PhysicsConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            grid: GridConfig::default(),
            physics: PhysicsConfig::default(),
        }
    }
}
