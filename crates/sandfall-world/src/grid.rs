//! 2D grid of material cells.

use sandfall_core::{Cell, Error, Material, Position, Result};
use serde::{Deserialize, Serialize};

/// A fixed-size 2D grid stored row-major (`y * width + x`).
///
/// `x` is the column and `y` the row, with `y` growing downward. The grid
/// is bounded: out-of-range coordinates are rejected, never wrapped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub width: i32,
    pub height: i32,
    cells: Vec<Cell>,
}

impl Grid {
    /// Create a grid with every cell Empty.
    pub fn new(width: i32, height: i32) -> Result<Self> {
        if width <= 0 || height <= 0 {
            return Err(Error::InvalidDimensions { width, height });
        }
        let size = (width as usize) * (height as usize);
        Ok(Self {
            width,
            height,
            cells: vec![Cell::empty(); size],
        })
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.width && y >= 0 && y < self.height
    }

    /// Cell at (x, y), or `None` outside the grid.
    pub fn get(&self, x: i32, y: i32) -> Option<&Cell> {
        if !self.in_bounds(x, y) {
            return None;
        }
        Some(&self.cells[self.index(x, y)])
    }

    /// Overwrite the cell at (x, y). Out-of-range coordinates error.
    pub fn set(&mut self, x: i32, y: i32, cell: Cell) -> Result<()> {
        if !self.in_bounds(x, y) {
            return Err(Error::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        let index = self.index(x, y);
        self.cells[index] = cell;
        Ok(())
    }

    /// Flat index of an in-bounds coordinate.
    pub(crate) fn index(&self, x: i32, y: i32) -> usize {
        debug_assert!(self.in_bounds(x, y));
        (y as usize) * (self.width as usize) + (x as usize)
    }

    pub(crate) fn cell_at_index(&self, index: usize) -> Cell {
        self.cells[index]
    }

    pub(crate) fn set_index(&mut self, index: usize, cell: Cell) {
        self.cells[index] = cell;
    }

    pub(crate) fn swap(&mut self, a: usize, b: usize) {
        self.cells.swap(a, b);
    }

    pub(crate) fn len(&self) -> usize {
        self.cells.len()
    }

    /// Position from a flat index.
    pub fn index_to_pos(&self, index: usize) -> Position {
        let x = (index as i32) % self.width;
        let y = (index as i32) / self.width;
        Position::new(x, y)
    }

    /// Iterator over all cells with their positions.
    pub fn iter(&self) -> impl Iterator<Item = (Position, &Cell)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, cell)| (self.index_to_pos(i), cell))
    }

    /// Number of cells currently holding `material`.
    pub fn count(&self, material: Material) -> usize {
        self.cells.iter().filter(|c| c.material == material).count()
    }
}
