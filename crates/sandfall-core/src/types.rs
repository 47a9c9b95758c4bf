//! Core type definitions for the simulation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The substance occupying a single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Material {
    Empty,
    Sand,
    Wall,
    Water,
    Gas,
    Fire,
}

impl Material {
    /// Relative density used for displacement decisions.
    ///
    /// Wall sits above everything so no comparison ever lets it be
    /// displaced; the remaining ordering is Sand > Water > Fire > Gas >
    /// Empty.
    pub fn density(&self) -> u8 {
        match self {
            Material::Wall => u8::MAX,
            Material::Sand => 4,
            Material::Water => 3,
            Material::Fire => 2,
            Material::Gas => 1,
            Material::Empty => 0,
        }
    }

    /// Whether this material moves at all during a tick.
    pub fn is_mobile(&self) -> bool {
        matches!(
            self,
            Material::Sand | Material::Water | Material::Gas | Material::Fire
        )
    }

    /// Whether a cell of this material may enter a cell holding `occupant`.
    ///
    /// Empty cells are open to any mobile material. Wall is never displaced.
    /// Otherwise only the massive movers (Sand, Water) push things aside,
    /// and only strictly less dense occupants; the displaced material is
    /// swapped into the vacated cell, never destroyed.
    pub fn displaces(&self, occupant: Material) -> bool {
        match occupant {
            Material::Empty => self.is_mobile(),
            Material::Wall => false,
            _ => {
                matches!(self, Material::Sand | Material::Water)
                    && self.density() > occupant.density()
            }
        }
    }

    /// Human-readable material name for UI layers.
    pub fn name(&self) -> &'static str {
        match self {
            Material::Empty => "Empty",
            Material::Sand => "Sand",
            Material::Wall => "Wall",
            Material::Water => "Water",
            Material::Gas => "Gas",
            Material::Fire => "Fire",
        }
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Sub-cell momentum carried across ticks. `y` is positive downward.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Velocity {
    pub x: f32,
    pub y: f32,
}

impl Velocity {
    pub const ZERO: Velocity = Velocity { x: 0.0, y: 0.0 };
}

/// One grid location: a material plus the physics state that goes with it.
///
/// Velocity is only meaningful for the mobile materials and lifetime only
/// for Fire; both are reset on every material transition so they never
/// carry stale state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub material: Material,
    pub velocity: Velocity,
    pub lifetime: i32,
}

impl Cell {
    /// A cell of the given material with zeroed velocity and lifetime.
    pub fn new(material: Material) -> Self {
        Self {
            material,
            velocity: Velocity::ZERO,
            lifetime: 0,
        }
    }

    pub fn empty() -> Self {
        Self::new(Material::Empty)
    }

    pub fn is_empty(&self) -> bool {
        self.material == Material::Empty
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::empty()
    }
}

/// 2D position in the grid. `x` is the column, `y` the row; `y` grows
/// downward. Out-of-range positions are rejected at the API boundary,
/// never wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn add(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}
