//! Recursive subdividing grid: a selection tree with backtracking.
//!
//! The active screen is split into `cols x rows` cells, each addressed by one
//! key of the configured key string (row-major). Selecting a cell either
//! descends into it or, when the cell can no longer be divided, commits at
//! its center. Backspace pops the selection history; `len(history) == depth`
//! holds at all times and every ancestor contains its successor.
//!
//! Division is integer arithmetic; the last column and row absorb the
//! remainder so cells exactly tile the current bounds.

use crate::config::RecursiveGridConfig;
use crate::geometry::{remap_rect, Point, Rect};

/// Outcome of feeding one input to the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Descended into the selected cell; redraw and move the cursor.
    Descended { bounds: Rect, cursor: Point },
    /// The selected cell cannot divide further; commit at its center.
    Committed { point: Point },
    /// Backspace restored the previous bounds.
    Backtracked { bounds: Rect, cursor: Point },
    /// Reset key returned to the initial bounds.
    Reset { bounds: Rect, cursor: Point },
    /// Unmapped key, or backspace with empty history.
    Ignored,
}

#[derive(Debug, Clone)]
pub struct RecursiveGrid {
    initial: Rect,
    current: Rect,
    depth: u32,
    max_depth: u32,
    min_width: i32,
    min_height: i32,
    cols: u32,
    rows: u32,
    history: Vec<Rect>,
    keys: Vec<char>,
}

impl RecursiveGrid {
    pub fn new(bounds: Rect, config: &RecursiveGridConfig) -> Self {
        Self {
            initial: bounds,
            current: bounds,
            depth: 0,
            max_depth: config.max_depth,
            min_width: config.min_width(),
            min_height: config.min_height(),
            cols: config.grid_cols,
            rows: config.grid_rows,
            history: Vec::new(),
            keys: config.keys.chars().map(|c| c.to_ascii_lowercase()).collect(),
        }
    }

    pub fn initial_bounds(&self) -> Rect {
        self.initial
    }

    pub fn current_bounds(&self) -> Rect {
        self.current
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn key_string(&self) -> String {
        self.keys.iter().collect()
    }

    #[cfg(test)]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Bounds of the `index`-th cell (row-major) of the current bounds.
    fn cell_bounds(&self, index: usize) -> Rect {
        let cols = self.cols as i32;
        let rows = self.rows as i32;
        let col = index as i32 % cols;
        let row = index as i32 / cols;
        let base_w = self.current.width / cols;
        let base_h = self.current.height / rows;
        let width = if col == cols - 1 {
            self.current.width - base_w * (cols - 1)
        } else {
            base_w
        };
        let height = if row == rows - 1 {
            self.current.height - base_h * (rows - 1)
        } else {
            base_h
        };
        Rect::new(
            self.current.x + col * base_w,
            self.current.y + row * base_h,
            width,
            height,
        )
    }

    /// All cells of the current bounds, row-major.
    pub fn cells(&self) -> Vec<Rect> {
        (0..(self.cols * self.rows) as usize)
            .map(|i| self.cell_bounds(i))
            .collect()
    }

    /// A rectangle divides when depth allows it and every resulting cell
    /// meets the minimum size on both axes.
    fn can_divide(&self, bounds: &Rect, depth: u32) -> bool {
        depth < self.max_depth
            && bounds.width / self.cols as i32 >= self.min_width
            && bounds.height / self.rows as i32 >= self.min_height
    }

    /// Feed a printable key. Unmapped keys are ignored.
    pub fn select(&mut self, key: char) -> Step {
        let key = key.to_ascii_lowercase();
        let Some(index) = self.keys.iter().position(|&k| k == key) else {
            return Step::Ignored;
        };
        let child = self.cell_bounds(index);
        if self.can_divide(&child, self.depth + 1) {
            self.history.push(self.current);
            self.current = child;
            self.depth += 1;
            Step::Descended {
                bounds: child,
                cursor: child.center(),
            }
        } else {
            Step::Committed {
                point: child.center(),
            }
        }
    }

    /// Backspace: restore the previous bounds, if any.
    pub fn backtrack(&mut self) -> Step {
        match self.history.pop() {
            Some(bounds) => {
                self.current = bounds;
                self.depth -= 1;
                Step::Backtracked {
                    bounds,
                    cursor: bounds.center(),
                }
            }
            None => Step::Ignored,
        }
    }

    /// Reset key: back to the initial bounds at depth 0.
    pub fn reset(&mut self) -> Step {
        self.current = self.initial;
        self.depth = 0;
        self.history.clear();
        Step::Reset {
            bounds: self.initial,
            cursor: self.initial.center(),
        }
    }

    /// The active screen changed: proportionally remap every rectangle
    /// (current and each history entry) from the old initial bounds into the
    /// new ones. Depth and relative progress are preserved.
    pub fn remap(&mut self, new_bounds: Rect) {
        if new_bounds == self.initial {
            return;
        }
        let old = self.initial;
        self.current = remap_rect(&self.current, &old, &new_bounds);
        for entry in &mut self.history {
            *entry = remap_rect(entry, &old, &new_bounds);
        }
        self.initial = new_bounds;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCREEN: Rect = Rect::new(0, 0, 1920, 1080);

    fn config(keys: &str, min_size: i32, max_depth: u32) -> RecursiveGridConfig {
        RecursiveGridConfig {
            keys: keys.to_string(),
            min_size: Some(min_size),
            max_depth,
            ..Default::default()
        }
    }

    #[test]
    fn two_by_two_descent_backtrack_reset() {
        let mut grid = RecursiveGrid::new(SCREEN, &config("uijk", 25, 10));

        // u selects the top-left quadrant.
        assert_eq!(
            grid.select('u'),
            Step::Descended {
                bounds: Rect::new(0, 0, 960, 540),
                cursor: Point::new(480, 270),
            }
        );
        assert_eq!(grid.depth(), 1);
        assert_eq!(grid.history_len(), 1);

        // k selects the bottom-right quadrant of the quadrant.
        assert_eq!(
            grid.select('k'),
            Step::Descended {
                bounds: Rect::new(480, 270, 480, 270),
                cursor: Point::new(720, 405),
            }
        );
        assert_eq!(grid.depth(), 2);

        // Backspace restores the previous bounds and cursor.
        assert_eq!(
            grid.backtrack(),
            Step::Backtracked {
                bounds: Rect::new(0, 0, 960, 540),
                cursor: Point::new(480, 270),
            }
        );
        assert_eq!(grid.depth(), 1);

        // Reset returns to the full screen.
        assert_eq!(
            grid.reset(),
            Step::Reset {
                bounds: SCREEN,
                cursor: Point::new(960, 540),
            }
        );
        assert_eq!(grid.depth(), 0);
        assert_eq!(grid.history_len(), 0);
    }

    #[test]
    fn history_length_always_equals_depth() {
        let mut grid = RecursiveGrid::new(SCREEN, &config("uijk", 25, 10));
        for key in ['u', 'k', 'i', 'j'] {
            grid.select(key);
            assert_eq!(grid.history_len(), grid.depth() as usize);
            assert!(grid.initial_bounds().contains_rect(&grid.current_bounds()));
        }
        while grid.depth() > 0 {
            grid.backtrack();
            assert_eq!(grid.history_len(), grid.depth() as usize);
        }
        assert_eq!(grid.backtrack(), Step::Ignored);
    }

    #[test]
    fn undividable_cell_commits_at_center() {
        let mut grid = RecursiveGrid::new(Rect::new(0, 0, 50, 50), &config("uijk", 25, 10));
        // The selected child is 25x25; 25/2 = 12 < 25, so the press commits.
        assert_eq!(
            grid.select('u'),
            Step::Committed {
                point: Point::new(12, 12),
            }
        );
        // State is untouched by a commit; the mode tears the grid down.
        assert_eq!(grid.depth(), 0);
    }

    #[test]
    fn max_depth_forces_commit() {
        let mut grid = RecursiveGrid::new(SCREEN, &config("uijk", 1, 2));
        assert!(matches!(grid.select('u'), Step::Descended { .. }));
        assert!(matches!(grid.select('u'), Step::Descended { .. }));
        assert!(matches!(grid.select('u'), Step::Committed { .. }));
    }

    #[test]
    fn unmapped_key_is_ignored() {
        let mut grid = RecursiveGrid::new(SCREEN, &config("uijk", 25, 10));
        assert_eq!(grid.select('z'), Step::Ignored);
        assert_eq!(grid.depth(), 0);
    }

    #[test]
    fn keys_match_case_insensitively() {
        let mut grid = RecursiveGrid::new(SCREEN, &config("uijk", 25, 10));
        assert!(matches!(grid.select('U'), Step::Descended { .. }));
    }

    #[test]
    fn cells_exactly_tile_bounds_with_last_cell_absorbing_remainder() {
        let bounds = Rect::new(3, 7, 1001, 777);
        let grid = RecursiveGrid::new(
            bounds,
            &RecursiveGridConfig {
                keys: "uiojkl".to_string(),
                grid_cols: 3,
                grid_rows: 2,
                ..Default::default()
            },
        );
        let cells = grid.cells();
        assert_eq!(cells.len(), 6);

        // No gaps, no overlap: total area matches and edges line up.
        let total: i64 = cells
            .iter()
            .map(|c| c.width as i64 * c.height as i64)
            .sum();
        assert_eq!(total, bounds.width as i64 * bounds.height as i64);
        // 1001 / 3 = 333; the last column is 335 wide.
        assert_eq!(cells[0].width, 333);
        assert_eq!(cells[2].width, 335);
        assert_eq!(cells[2].right(), bounds.right());
        // 777 / 2 = 388; the last row is 389 tall.
        assert_eq!(cells[0].height, 388);
        assert_eq!(cells[5].height, 389);
        assert_eq!(cells[5].bottom(), bounds.bottom());
    }

    #[test]
    fn screen_change_remaps_progress() {
        let mut grid = RecursiveGrid::new(SCREEN, &config("uijk", 25, 10));
        grid.select('u');
        grid.select('u');
        assert_eq!(grid.current_bounds(), Rect::new(0, 0, 480, 270));

        let screen_b = Rect::new(1920, 0, 1920, 1080);
        grid.remap(screen_b);
        assert_eq!(grid.initial_bounds(), screen_b);
        assert_eq!(grid.current_bounds(), Rect::new(1920, 0, 480, 270));
        assert_eq!(grid.depth(), 2);
        assert!(screen_b.contains_rect(&grid.current_bounds()));

        // Progress continues inside the new screen.
        let before = grid.current_bounds();
        assert!(matches!(grid.select('u'), Step::Descended { .. }));
        assert_eq!(
            grid.backtrack(),
            Step::Backtracked {
                bounds: before,
                cursor: before.center(),
            }
        );
    }

    #[test]
    fn remap_round_trip_is_identity_within_one_pixel() {
        let mut grid = RecursiveGrid::new(SCREEN, &config("uijk", 25, 10));
        grid.select('k');
        grid.select('i');
        let original = grid.current_bounds();

        let screen_b = Rect::new(-500, 200, 2560, 1440);
        grid.remap(screen_b);
        grid.remap(SCREEN);

        let back = grid.current_bounds();
        assert!((back.x - original.x).abs() <= 1);
        assert!((back.y - original.y).abs() <= 1);
        assert!((back.width - original.width).abs() <= 1);
        assert!((back.height - original.height).abs() <= 1);
    }
}
