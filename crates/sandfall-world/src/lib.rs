//! Falling-sand simulation engine.
//!
//! This crate owns the 2D grid of material cells and the per-tick update
//! that makes sand fall, water flow, gas rise, and fire burn. There is no
//! rendering, input, or window code here; a presentation shell is expected
//! to call [`Simulation::step`] once per frame, paint with
//! [`Simulation::set_cell`], and read cells back for drawing (the `render`
//! module provides the color/glyph/coordinate mapping it needs).

pub mod grid;
pub mod render;
pub mod simulation;

pub use grid::Grid;
pub use render::{color, glyph, pointer_to_cell, Rgb, Tool};
pub use simulation::{Census, Simulation};
