//! Flat-grid input state: prefix accumulation and the 3x3 subgrid.

use std::sync::Arc;

use crate::config::GridConfig;
use crate::geometry::{Point, Rect};
use crate::ports::{GridCellDraw, GridDraw, SubgridDraw};

use super::Grid;

/// Subgrid dimensions are fixed.
const SUBGRID_COLS: usize = 3;
const SUBGRID_ROWS: usize = 3;

/// Outcome of feeding one input to the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridEvent {
    /// State changed; redraw.
    Updated,
    /// A subgrid key committed this point.
    Committed { point: Point },
    /// Input did not match anything.
    Ignored,
}

#[derive(Debug, Clone)]
struct SubgridState {
    /// Full label of the cell hosting the subgrid, restored on backspace.
    parent_label: String,
    /// Screen-absolute bounds of the host cell.
    bounds: Rect,
}

/// Tracks the typed prefix over a shared [`Grid`] layout and the open
/// subgrid, translating the origin-relative layout into screen space.
pub struct GridManager {
    grid: Arc<Grid>,
    screen: Rect,
    input: String,
    subgrid: Option<SubgridState>,
    sublayer_keys: Vec<char>,
    hide_unmatched: bool,
}

impl GridManager {
    pub fn new(config: &GridConfig, screen: Rect) -> Self {
        Self {
            grid: Grid::layout(&config.characters, screen.width, screen.height),
            screen,
            input: String::new(),
            subgrid: None,
            sublayer_keys: config
                .effective_sublayer_keys()
                .chars()
                .map(|c| c.to_ascii_lowercase())
                .take(SUBGRID_COLS * SUBGRID_ROWS)
                .collect(),
            hide_unmatched: config.hide_unmatched,
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn subgrid_active(&self) -> bool {
        self.subgrid.is_some()
    }

    fn cell_screen_bounds(&self, rel: &Rect) -> Rect {
        Rect::new(
            self.screen.x + rel.x,
            self.screen.y + rel.y,
            rel.width,
            rel.height,
        )
    }

    /// Feed a printable key. In the main grid the key must extend the prefix
    /// of some label; the completing key opens the subgrid. In the subgrid
    /// one key commits the subcell center.
    pub fn handle_char(&mut self, c: char) -> GridEvent {
        if let Some(subgrid) = &self.subgrid {
            let key = c.to_ascii_lowercase();
            let Some(index) = self.sublayer_keys.iter().position(|&k| k == key) else {
                return GridEvent::Ignored;
            };
            let point = subcell_bounds(subgrid.bounds, index).center();
            return GridEvent::Committed { point };
        }

        let mut candidate = self.input.clone();
        candidate.push(c.to_ascii_uppercase());
        if !self.grid.has_prefix(&candidate) {
            return GridEvent::Ignored;
        }
        if let Some(cell) = self.grid.cell(&candidate) {
            self.subgrid = Some(SubgridState {
                parent_label: candidate.clone(),
                bounds: self.cell_screen_bounds(&cell.bounds),
            });
            self.input.clear();
        } else {
            self.input = candidate;
        }
        GridEvent::Updated
    }

    /// Backspace: exit an open subgrid back to the main grid (restoring the
    /// prior prefix), or shorten the prefix by one.
    pub fn backspace(&mut self) -> GridEvent {
        if let Some(subgrid) = self.subgrid.take() {
            self.input = subgrid.parent_label;
            return GridEvent::Updated;
        }
        if self.input.pop().is_some() {
            GridEvent::Updated
        } else {
            GridEvent::Ignored
        }
    }

    /// Reset key: clear the prefix and any open subgrid.
    pub fn reset(&mut self) -> GridEvent {
        self.input.clear();
        self.subgrid = None;
        GridEvent::Updated
    }

    /// Current frame for the overlay.
    pub fn draw(&self) -> GridDraw {
        let cells = self
            .grid
            .cells()
            .iter()
            .map(|cell| {
                let matches = cell.label.starts_with(&self.input);
                GridCellDraw {
                    label: cell.label.clone(),
                    matched: if matches { self.input.len() } else { 0 },
                    bounds: self.cell_screen_bounds(&cell.bounds),
                    visible: matches || !self.hide_unmatched,
                }
            })
            .collect();
        GridDraw {
            bounds: self.screen,
            cells,
            subgrid: self.subgrid.as_ref().map(|s| SubgridDraw {
                bounds: s.bounds,
                keys: self.sublayer_keys.clone(),
            }),
        }
    }
}

/// Bounds of the `index`-th subcell (row-major) of a 3x3 split; the first
/// columns and rows absorb the pixel remainder like the main grid.
fn subcell_bounds(parent: Rect, index: usize) -> Rect {
    let col = (index % SUBGRID_COLS) as i32;
    let row = (index / SUBGRID_COLS) as i32;
    let cols = SUBGRID_COLS as i32;
    let rows = SUBGRID_ROWS as i32;
    let base_w = parent.width / cols;
    let extra_w = parent.width % cols;
    let base_h = parent.height / rows;
    let extra_h = parent.height % rows;
    let x = parent.x + col * base_w + col.min(extra_w);
    let y = parent.y + row * base_h + row.min(extra_h);
    Rect::new(
        x,
        y,
        base_w + if col < extra_w { 1 } else { 0 },
        base_h + if row < extra_h { 1 } else { 0 },
    )
}
