//! Core grid type.

use std::collections::HashMap;
use std::hash::Hash;

use habitat_common::{GridFrame, HabitatError, HabitatResult};

/// An immutable raster where each cell is either set or unset.
///
/// Cells are stored row-major, top-to-bottom, matching [`GridFrame::index`].
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    frame: GridFrame,
    cells: Vec<Option<T>>,
}

impl<T: Copy> Grid<T> {
    /// Create a grid from per-cell values.
    pub fn new(frame: GridFrame, cells: Vec<Option<T>>) -> HabitatResult<Self> {
        if cells.len() != frame.len() {
            return Err(HabitatError::CellCount {
                grid: "grid".to_string(),
                expected: frame.len(),
                actual: cells.len(),
            });
        }
        Ok(Self { frame, cells })
    }

    /// Assemble a grid whose cell count is known to match its frame.
    pub(crate) fn from_parts(frame: GridFrame, cells: Vec<Option<T>>) -> Self {
        debug_assert_eq!(cells.len(), frame.len());
        Self { frame, cells }
    }

    /// Create a fully set grid from dense values.
    pub fn from_values(frame: GridFrame, values: Vec<T>) -> HabitatResult<Self> {
        Self::new(frame, values.into_iter().map(Some).collect())
    }

    /// A grid with every cell set to `value`.
    pub fn filled(frame: GridFrame, value: T) -> Self {
        let cells = vec![Some(value); frame.len()];
        Self { frame, cells }
    }

    /// A grid with every cell unset.
    pub fn empty(frame: GridFrame) -> Self {
        let cells = vec![None; frame.len()];
        Self { frame, cells }
    }

    pub fn frame(&self) -> &GridFrame {
        &self.frame
    }

    pub fn width(&self) -> usize {
        self.frame.width
    }

    pub fn height(&self) -> usize {
        self.frame.height
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> &[Option<T>] {
        &self.cells
    }

    /// Value at a cell; `None` when unset or out of range.
    pub fn get(&self, col: usize, row: usize) -> Option<T> {
        if col >= self.frame.width || row >= self.frame.height {
            return None;
        }
        self.cells[self.frame.index(col, row)]
    }

    /// Number of set cells.
    pub fn count_set(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Check that `other` shares this grid's frame.
    pub fn check_aligned<U>(&self, other: &Grid<U>, left: &str, right: &str) -> HabitatResult<()> {
        self.frame.check_aligned(&other.frame, left, right)
    }

    /// Apply `f` to every set cell. `f` may unset a cell by returning `None`.
    pub fn map<U: Copy>(&self, f: impl Fn(T) -> Option<U>) -> Grid<U> {
        Grid {
            frame: self.frame.clone(),
            cells: self.cells.iter().map(|c| c.and_then(&f)).collect(),
        }
    }

    /// Combine two aligned grids cell by cell. Cells unset in either input
    /// stay unset.
    pub fn zip_with<U: Copy, V: Copy>(
        &self,
        other: &Grid<U>,
        f: impl Fn(T, U) -> Option<V>,
    ) -> HabitatResult<Grid<V>> {
        self.check_aligned(other, "left", "right")?;
        let cells = self
            .cells
            .iter()
            .zip(other.cells.iter())
            .map(|(a, b)| match (a, b) {
                (Some(a), Some(b)) => f(*a, *b),
                _ => None,
            })
            .collect();
        Ok(Grid {
            frame: self.frame.clone(),
            cells,
        })
    }

    /// Keep cells only where `mask` is set and true.
    pub fn update_mask(&self, mask: &Grid<bool>) -> HabitatResult<Grid<T>> {
        self.check_aligned(mask, "grid", "mask")?;
        let cells = self
            .cells
            .iter()
            .zip(mask.cells.iter())
            .map(|(c, m)| if *m == Some(true) { *c } else { None })
            .collect();
        Ok(Grid {
            frame: self.frame.clone(),
            cells,
        })
    }
}

impl<T: Copy + Eq + Hash> Grid<T> {
    /// Replace each value through `lookup`; values without an entry become
    /// unset.
    pub fn remap<U: Copy>(&self, lookup: &HashMap<T, U>) -> Grid<U> {
        self.map(|v| lookup.get(&v).copied())
    }

    /// Boolean grid that is true where the cell equals `value`.
    pub fn eq_mask(&self, value: T) -> Grid<bool> {
        self.map(|v| Some(v == value))
    }
}

impl Grid<bool> {
    /// Unset every false cell, leaving only true cells set.
    pub fn self_mask(&self) -> Grid<bool> {
        self.map(|v| if v { Some(true) } else { None })
    }

    /// Cell-wise logical OR where an unset cell is the identity.
    ///
    /// Only cells unset in both inputs stay unset.
    pub fn or(&self, other: &Grid<bool>) -> HabitatResult<Grid<bool>> {
        self.check_aligned(other, "left", "right")?;
        let cells = self
            .cells
            .iter()
            .zip(other.cells.iter())
            .map(|(a, b)| match (a, b) {
                (Some(a), Some(b)) => Some(*a || *b),
                (Some(v), None) | (None, Some(v)) => Some(*v),
                (None, None) => None,
            })
            .collect();
        Ok(Grid {
            frame: self.frame.clone(),
            cells,
        })
    }

    /// Number of cells set to true.
    pub fn count_true(&self) -> usize {
        self.cells.iter().filter(|c| **c == Some(true)).count()
    }
}
