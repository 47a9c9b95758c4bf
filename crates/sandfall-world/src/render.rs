//! Shell-facing mapping helpers.
//!
//! The engine itself never draws or reads input; these are the pure
//! mappings a presentation shell needs: cell to color, cell to glyph for
//! text UIs, pointer pixels to grid coordinates, and the paint-tool
//! selector.

use sandfall_core::{Cell, Material, Position};
use serde::{Deserialize, Serialize};

/// 8-bit RGB color for one rendered cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Color for a cell. Fire fades from near-yellow toward deep red as its
/// remaining lifetime runs down, so the shell gets flicker for free.
pub fn color(cell: &Cell) -> Rgb {
    match cell.material {
        Material::Empty => Rgb::new(0, 0, 0),
        Material::Sand => Rgb::new(194, 178, 128),
        Material::Wall => Rgb::new(100, 100, 100),
        Material::Water => Rgb::new(48, 96, 214),
        Material::Gas => Rgb::new(150, 150, 160),
        Material::Fire => {
            let heat = (cell.lifetime.clamp(0, 90) as f32) / 90.0;
            Rgb::new(255, 80 + (120.0 * heat) as u8, 20)
        }
    }
}

/// ASCII glyph for a cell, for terminal front ends.
pub fn glyph(cell: &Cell) -> char {
    match cell.material {
        Material::Empty => ' ',
        Material::Sand => '.',
        Material::Wall => '#',
        Material::Water => '~',
        Material::Gas => '^',
        Material::Fire => '*',
    }
}

/// Map a pointer position in pixels to a grid coordinate, or `None` when
/// the pointer is outside the grid.
pub fn pointer_to_cell(
    px: f32,
    py: f32,
    cell_pixel_size: f32,
    width: i32,
    height: i32,
) -> Option<Position> {
    if cell_pixel_size <= 0.0 {
        return None;
    }
    let x = (px / cell_pixel_size).floor() as i32;
    let y = (py / cell_pixel_size).floor() as i32;
    if x < 0 || x >= width || y < 0 || y >= height {
        return None;
    }
    Some(Position::new(x, y))
}

/// The shell's current paint tool. Exactly one is active at a time; Sand
/// is selected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Tool {
    #[default]
    Sand,
    Wall,
    Water,
    Gas,
    Fire,
    Erase,
}

impl Tool {
    /// Material this tool paints; Erase paints Empty.
    pub fn material(&self) -> Material {
        match self {
            Tool::Sand => Material::Sand,
            Tool::Wall => Material::Wall,
            Tool::Water => Material::Water,
            Tool::Gas => Material::Gas,
            Tool::Fire => Material::Fire,
            Tool::Erase => Material::Empty,
        }
    }

    /// Tool bound to a key press, if any.
    pub fn from_key(key: char) -> Option<Tool> {
        match key.to_ascii_lowercase() {
            's' => Some(Tool::Sand),
            'w' => Some(Tool::Wall),
            'a' => Some(Tool::Water),
            'g' => Some(Tool::Gas),
            'f' => Some(Tool::Fire),
            'e' => Some(Tool::Erase),
            _ => None,
        }
    }
}
