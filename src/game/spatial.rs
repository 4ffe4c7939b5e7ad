//! Toroidal spatial grid for per-frame collision candidate search
//!
//! The playfield is divided into fixed-size cells. Each cell keeps an
//! intrusive singly-linked list of the objects currently inside it; the
//! "next" links live in a side table owned by the grid and indexed by object
//! slot, so no object carries a pointer into another. Cells are stored in a
//! flat arena and refer to their neighbours by index, wired so that edge
//! cells wrap to the opposite edge.

use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::game::constants::grid::{INITIAL_LINK_CAPACITY, MAX_CELLS};
use crate::util::vec2::Vec2;

/// Index of a cell in the grid arena (`row * columns + column`)
pub type CellIndex = usize;

/// Arena slot of an object; the grid only ever sees slots
pub type Slot = usize;

/// Errors raised while building a grid
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GridError {
    #[error("Playfield must be finite and non-empty, got {0}x{1}")]
    InvalidPlayfield(f32, f32),
    #[error("Cell size must be finite and > 0, got {0}")]
    InvalidCellSize(f32),
    #[error("Grid of {0}x{1} cells exceeds the cell limit")]
    TooManyCells(usize, usize),
}

/// Translation applied when testing an object's wrapped ghost.
/// Only boundary cells carry offsets; corner cells carry both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WrapOffset {
    /// `+width` on the left column, `-width` on the right column
    pub horizontal: Option<f32>,
    /// `+height` on the top row, `-height` on the bottom row
    pub vertical: Option<f32>,
}

impl WrapOffset {
    pub fn is_none(&self) -> bool {
        self.horizontal.is_none() && self.vertical.is_none()
    }
}

/// One bucket of the grid
#[derive(Debug, Clone)]
pub struct GridCell {
    /// Head of this cell's intrusive list
    head: Option<Slot>,
    /// Number of linked objects
    len: usize,
    pub column: usize,
    pub row: usize,
    pub north: CellIndex,
    pub south: CellIndex,
    pub east: CellIndex,
    pub west: CellIndex,
    pub wrap: WrapOffset,
}

impl GridCell {
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }
}

/// Per-slot link: the intrusive "next" pointer plus the owning cell
#[derive(Debug, Clone, Copy, Default)]
struct Link {
    next: Option<Slot>,
    cell: Option<CellIndex>,
}

fn divides(extent: f32, cell_size: f32) -> bool {
    (extent / cell_size).fract() == 0.0
}

/// Fixed-shape toroidal grid sized to the playfield
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cell_size: f32,
    inv_cell_size: f32,
    columns: usize,
    rows: usize,
    width: f32,
    height: f32,
    cells: Vec<GridCell>,
    links: Vec<Link>,
}

impl SpatialGrid {
    /// Build a grid of `ceil(width / cell) x ceil(height / cell)` cells and
    /// wire the neighbour indices and wrap offsets once.
    pub fn new(width: f32, height: f32, cell_size: f32) -> Result<Self, GridError> {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(GridError::InvalidPlayfield(width, height));
        }
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(GridError::InvalidCellSize(cell_size));
        }

        // Float to int casts saturate, so a huge ratio lands on usize::MAX
        let columns = ((width / cell_size).ceil() as usize).max(1);
        let rows = ((height / cell_size).ceil() as usize).max(1);
        let cell_count = match columns.checked_mul(rows) {
            Some(count) if count <= MAX_CELLS => count,
            _ => return Err(GridError::TooManyCells(columns, rows)),
        };

        let mut cells = Vec::with_capacity(cell_count);
        for row in 0..rows {
            for column in 0..columns {
                let west_col = (column + columns - 1) % columns;
                let east_col = (column + 1) % columns;
                let north_row = (row + rows - 1) % rows;
                let south_row = (row + 1) % rows;

                // Right/bottom assignment comes last so a single-column or
                // single-row grid ends up with the negative offset
                let mut wrap = WrapOffset::default();
                if column == 0 {
                    wrap.horizontal = Some(width);
                }
                if column == columns - 1 {
                    wrap.horizontal = Some(-width);
                }
                if row == 0 {
                    wrap.vertical = Some(height);
                }
                if row == rows - 1 {
                    wrap.vertical = Some(-height);
                }

                cells.push(GridCell {
                    head: None,
                    len: 0,
                    column,
                    row,
                    north: north_row * columns + column,
                    south: south_row * columns + column,
                    east: row * columns + east_col,
                    west: row * columns + west_col,
                    wrap,
                });
            }
        }

        debug!(
            "Spatial grid built: {}x{} cells of {} over {}x{} playfield",
            columns, rows, cell_size, width, height
        );
        if !divides(width, cell_size) || !divides(height, cell_size) {
            warn!(
                "Cell size {} does not divide the {}x{} playfield; last column is {} wide, last row {} tall",
                cell_size,
                width,
                height,
                width - (columns - 1) as f32 * cell_size,
                height - (rows - 1) as f32 * cell_size
            );
        }

        Ok(Self {
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            columns,
            rows,
            width,
            height,
            cells,
            links: Vec::with_capacity(INITIAL_LINK_CAPACITY),
        })
    }

    /// Whether every column and row is a full cell wide. Partial edge cells
    /// are narrower, so the 3x3 search stays complete but less even.
    pub fn is_evenly_divided(&self) -> bool {
        divides(self.width, self.cell_size) && divides(self.height, self.cell_size)
    }

    #[inline]
    pub fn columns(&self) -> usize {
        self.columns
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Playfield dimensions the grid was built for
    #[inline]
    pub fn playfield(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn cell(&self, index: CellIndex) -> &GridCell {
        &self.cells[index]
    }

    /// Arena index of the cell at `(column, row)`, wrapping out-of-range values
    #[inline]
    pub fn index_of(&self, column: i64, row: i64) -> CellIndex {
        let c = column.rem_euclid(self.columns as i64) as usize;
        let r = row.rem_euclid(self.rows as i64) as usize;
        r * self.columns + c
    }

    /// Map a world position to its cell: `floor(p / cell) mod dimension`
    ///
    /// Positions outside the playfield resolve to the wrapped cell, so an
    /// object that has not yet been wrapped still lands in the right bucket.
    /// Non-finite coordinates saturate and still yield a valid index.
    #[inline]
    pub fn cell_for(&self, position: Vec2) -> CellIndex {
        let column = (position.x * self.inv_cell_size).floor() as i64;
        let row = (position.y * self.inv_cell_size).floor() as i64;
        self.index_of(column, row)
    }

    /// The cell itself and its 8 neighbours: self, N, S, E, W, NE, NW, SE, SW.
    /// Diagonals are composed from two single steps.
    pub fn neighborhood(&self, index: CellIndex) -> [CellIndex; 9] {
        let cell = &self.cells[index];
        let north = &self.cells[cell.north];
        let south = &self.cells[cell.south];
        [
            index,
            cell.north,
            cell.south,
            cell.east,
            cell.west,
            north.east,
            north.west,
            south.east,
            south.west,
        ]
    }

    /// Neighbourhood with repeated cells removed (grids narrower than 3 cells)
    pub fn unique_neighborhood(&self, index: CellIndex) -> smallvec::SmallVec<[CellIndex; 9]> {
        let mut unique = smallvec::SmallVec::new();
        for cell in self.neighborhood(index) {
            if !unique.contains(&cell) {
                unique.push(cell);
            }
        }
        unique
    }

    /// Cell currently holding `slot`, if any
    #[inline]
    pub fn membership(&self, slot: Slot) -> Option<CellIndex> {
        self.links.get(slot).and_then(|link| link.cell)
    }

    /// Push `slot` onto the head of `cell`'s list in O(1)
    ///
    /// An object already linked somewhere is an invariant violation: it
    /// panics in debug builds and is moved instead of duplicated in release.
    pub fn enter(&mut self, cell: CellIndex, slot: Slot) {
        if slot >= self.links.len() {
            self.links.resize(slot + 1, Link::default());
        }
        if let Some(current) = self.links[slot].cell {
            debug_assert!(false, "slot {} entered cell {} while linked in {}", slot, cell, current);
            warn!("Slot {} entered cell {} while still in cell {}, relinking", slot, cell, current);
            self.leave(current, slot);
        }

        let target = &mut self.cells[cell];
        self.links[slot] = Link {
            next: target.head,
            cell: Some(cell),
        };
        target.head = Some(slot);
        target.len += 1;
    }

    /// Unlink `slot` from `cell`, walking the list. Returns false (after a
    /// debug assertion) when the slot is not in that cell.
    pub fn leave(&mut self, cell: CellIndex, slot: Slot) -> bool {
        let mut prev: Option<Slot> = None;
        let mut cursor = self.cells[cell].head;

        while let Some(current) = cursor {
            let next = self.links[current].next;
            if current == slot {
                match prev {
                    Some(p) => self.links[p].next = next,
                    None => self.cells[cell].head = next,
                }
                self.cells[cell].len -= 1;
                self.links[slot] = Link::default();
                return true;
            }
            prev = Some(current);
            cursor = next;
        }

        debug_assert!(false, "slot {} is not linked in cell {}", slot, cell);
        warn!("Slot {} not found in cell {}, ignoring leave", slot, cell);
        false
    }

    /// Move `slot` to `cell` if it is not already there.
    /// Returns true when the membership changed.
    pub fn relocate(&mut self, slot: Slot, cell: CellIndex) -> bool {
        match self.membership(slot) {
            Some(current) if current == cell => false,
            Some(current) => {
                self.leave(current, slot);
                self.enter(cell, slot);
                trace!("Slot {} moved from cell {} to cell {}", slot, current, cell);
                true
            }
            None => {
                self.enter(cell, slot);
                true
            }
        }
    }

    /// Unlink `slot` from whatever cell holds it. No-op when unlinked.
    pub fn remove(&mut self, slot: Slot) -> bool {
        match self.membership(slot) {
            Some(cell) => self.leave(cell, slot),
            None => false,
        }
    }

    /// Iterate the slots linked in `cell`, head first
    pub fn slots_in(&self, cell: CellIndex) -> CellIter<'_> {
        CellIter {
            links: &self.links,
            cursor: self.cells[cell].head,
        }
    }

    /// True iff no object in `cell` blocks, as judged by `blocks`.
    ///
    /// The world supplies the predicate (visible and tag in the set) since
    /// the grid knows nothing about object state.
    pub fn is_empty_by<F>(&self, cell: CellIndex, mut blocks: F) -> bool
    where
        F: FnMut(Slot) -> bool,
    {
        self.slots_in(cell).all(|slot| !blocks(slot))
    }

    /// Get statistics about the grid
    pub fn stats(&self) -> SpatialGridStats {
        let non_empty_cells = self.cells.iter().filter(|c| !c.is_empty()).count();
        let total_linked = self.cells.iter().map(|c| c.len).sum();
        let max_per_cell = self.cells.iter().map(|c| c.len).max().unwrap_or(0);

        SpatialGridStats {
            columns: self.columns,
            rows: self.rows,
            non_empty_cells,
            total_linked,
            max_per_cell,
        }
    }

    /// Walk every list and check that each slot appears exactly once and
    /// agrees with its recorded membership
    pub fn check_links(&self) -> Result<(), String> {
        let mut seen = vec![None::<CellIndex>; self.links.len()];
        for (index, cell) in self.cells.iter().enumerate() {
            let mut count = 0;
            for slot in self.slots_in(index) {
                if slot >= seen.len() {
                    return Err(format!("cell {} links unknown slot {}", index, slot));
                }
                if let Some(other) = seen[slot] {
                    return Err(format!("slot {} linked in cells {} and {}", slot, other, index));
                }
                seen[slot] = Some(index);
                count += 1;
            }
            if count != cell.len {
                return Err(format!("cell {} length {} but {} linked", index, cell.len, count));
            }
        }
        for (slot, link) in self.links.iter().enumerate() {
            if link.cell != seen[slot] {
                return Err(format!(
                    "slot {} records cell {:?} but is linked in {:?}",
                    slot, link.cell, seen[slot]
                ));
            }
        }
        Ok(())
    }
}

/// Iterator over one cell's intrusive list
pub struct CellIter<'a> {
    links: &'a [Link],
    cursor: Option<Slot>,
}

impl Iterator for CellIter<'_> {
    type Item = Slot;

    fn next(&mut self) -> Option<Slot> {
        let current = self.cursor?;
        self.cursor = self.links[current].next;
        Some(current)
    }
}

/// Statistics about the spatial grid
#[derive(Debug, Clone, Serialize)]
pub struct SpatialGridStats {
    pub columns: usize,
    pub rows: usize,
    pub non_empty_cells: usize,
    pub total_linked: usize,
    pub max_per_cell: usize,
}
