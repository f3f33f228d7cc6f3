//! Flat coordinate grid: cell layout, labelling, and the layout cache.
//!
//! The screen is tiled by labelled cells. Label length is minimal for the
//! cell count (2-4 characters); labels are the fixed-length base-`n` encoding
//! of the row-major cell index, so the leading letter names a contiguous band
//! of cells and trailing letters cycle column-first inside it. Typing a full
//! label opens a 3x3 subgrid inside the cell (see [`manager`]).

pub mod manager;

pub use manager::{GridEvent, GridManager};

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;

use crate::geometry::Rect;

/// Cached layouts keyed by `(alphabet, width, height)`.
const LAYOUT_CACHE_CAPACITY: usize = 8;

/// One labelled cell, positioned relative to the grid origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub label: String,
    pub bounds: Rect,
}

/// An immutable grid layout for one `(alphabet, width, height)` triple.
///
/// Cell rectangles are origin-relative so the layout can be shared across
/// screens of the same size; [`GridManager`] translates into screen space.
#[derive(Debug)]
pub struct Grid {
    alphabet: Vec<char>,
    width: i32,
    height: i32,
    cols: u32,
    rows: u32,
    label_len: usize,
    cells: Vec<Cell>,
    index: HashMap<String, usize>,
}

impl Grid {
    /// Build or fetch the layout for `alphabet` over a `width x height` area.
    pub fn layout(alphabet: &str, width: i32, height: i32) -> Arc<Grid> {
        static CACHE: Mutex<Option<LruCache<(String, i32, i32), Arc<Grid>>>> = Mutex::new(None);

        let key = (alphabet.to_ascii_uppercase(), width, height);
        let mut cache = CACHE.lock();
        let cache = cache.get_or_insert_with(|| {
            LruCache::new(NonZeroUsize::new(LAYOUT_CACHE_CAPACITY).unwrap())
        });
        if let Some(grid) = cache.get(&key) {
            return grid.clone();
        }
        let grid = Arc::new(Grid::build(&key.0, width, height));
        cache.put(key, grid.clone());
        grid
    }

    fn build(alphabet: &str, width: i32, height: i32) -> Grid {
        let alphabet: Vec<char> = alphabet.chars().collect();
        let n = alphabet.len().max(2);
        let (cols, rows) = choose_dimensions(width, height, n);
        let cell_count = (cols * rows) as usize;
        let label_len = label_length(n, cell_count);

        let xs = axis_offsets(width, cols);
        let ys = axis_offsets(height, rows);

        let mut cells = Vec::with_capacity(cell_count);
        let mut index = HashMap::with_capacity(cell_count);
        for row in 0..rows as usize {
            for col in 0..cols as usize {
                let i = row * cols as usize + col;
                let label = encode_label(&alphabet, i, label_len);
                index.insert(label.clone(), cells.len());
                cells.push(Cell {
                    label,
                    bounds: Rect::new(
                        xs[col],
                        ys[row],
                        xs[col + 1] - xs[col],
                        ys[row + 1] - ys[row],
                    ),
                });
            }
        }

        Grid {
            alphabet,
            width,
            height,
            cols,
            rows,
            label_len,
            cells,
            index,
        }
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn label_len(&self) -> usize {
        self.label_len
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn alphabet(&self) -> &[char] {
        &self.alphabet
    }

    /// Constant-time label lookup.
    pub fn cell(&self, label: &str) -> Option<&Cell> {
        self.index.get(label).map(|&i| &self.cells[i])
    }

    /// True when at least one label starts with `prefix`.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        if prefix.len() > self.label_len {
            return false;
        }
        // The labels are the base-n encoding of 0..cell_count, so a prefix is
        // valid iff the smallest index it covers is in range.
        let mut base_index = 0usize;
        for c in prefix.chars() {
            let Some(digit) = self.alphabet.iter().position(|&a| a == c) else {
                return false;
            };
            base_index = base_index * self.alphabet.len() + digit;
        }
        base_index * self.alphabet.len().pow((self.label_len - prefix.len()) as u32)
            < self.cells.len()
    }
}

/// Pixel offsets for `count` cells over `total` pixels; the first
/// `total % count` cells are one pixel larger. Returns `count + 1` edges.
fn axis_offsets(total: i32, count: u32) -> Vec<i32> {
    let count = count as i32;
    let base = total / count;
    let extra = total % count;
    let mut offsets = Vec::with_capacity(count as usize + 1);
    let mut pos = 0;
    offsets.push(0);
    for i in 0..count {
        pos += base + if i < extra { 1 } else { 0 };
        offsets.push(pos);
    }
    offsets
}

/// Minimal label length in {2, 3, 4} covering `cell_count` indices.
fn label_length(n: usize, cell_count: usize) -> usize {
    for len in 2..=4usize {
        if n.pow(len as u32) >= cell_count {
            return len;
        }
    }
    4
}

/// Fixed-length base-`n` encoding of `index`.
fn encode_label(alphabet: &[char], index: usize, len: usize) -> String {
    let n = alphabet.len();
    let mut digits = vec![0usize; len];
    let mut rest = index;
    for slot in digits.iter_mut().rev() {
        *slot = rest % n;
        rest /= n;
    }
    digits.iter().map(|&d| alphabet[d]).collect()
}

/// Side band (min, max) in pixels, adapted to the screen's pixel area:
/// small screens get 30-60 px cells, very large ones 50-120 px.
fn size_band(area: i64) -> (i32, i32) {
    if area <= 1_600_000 {
        (30, 60)
    } else if area <= 3_700_000 {
        (40, 90)
    } else {
        (50, 120)
    }
}

/// Choose `(cols, rows)`: cell aspect ratio closest to 1:1, sides inside the
/// adaptive band, ties broken by higher cell count. Candidates beyond the
/// 3-character label capacity are rejected so labels stay short; when even
/// the sparsest in-band candidate exceeds that (tiny alphabets on large
/// screens), the band is abandoned and the densest layout fitting 4-character
/// labels is used.
fn choose_dimensions(width: i32, height: i32, n: usize) -> (u32, u32) {
    let area = width as i64 * height as i64;
    let (side_min, side_max) = size_band(area);

    let cols_range = axis_range(width, side_min, side_max);
    let rows_range = axis_range(height, side_min, side_max);

    let capacity3 = n.pow(3);
    let mut best: Option<(f64, usize, (u32, u32))> = None;
    for cols in cols_range.clone() {
        for rows in rows_range.clone() {
            let count = cols as usize * rows as usize;
            if count > capacity3 {
                continue;
            }
            let aspect = aspect_penalty(width, height, cols, rows);
            let candidate = (aspect, count, (cols, rows));
            best = Some(match best {
                None => candidate,
                Some(current) => {
                    let (cur_aspect, cur_count, _) = current;
                    if aspect + 1e-9 < cur_aspect
                        || ((aspect - cur_aspect).abs() <= 1e-9 && count > cur_count)
                    {
                        candidate
                    } else {
                        current
                    }
                }
            });
        }
    }
    if let Some((_, _, dims)) = best {
        return dims;
    }

    // Band impossible for this alphabet: keep halving density until the cell
    // count fits 4-character labels.
    let capacity4 = n.pow(4);
    let (mut cols, mut rows) = (
        *cols_range.start().max(&1),
        *rows_range.start().max(&1),
    );
    while cols as usize * rows as usize > capacity4 && (cols > 1 || rows > 1) {
        if cols >= rows {
            cols = (cols / 2).max(1);
        } else {
            rows = (rows / 2).max(1);
        }
    }
    (cols.max(1), rows.max(1))
}

fn axis_range(total: i32, side_min: i32, side_max: i32) -> std::ops::RangeInclusive<u32> {
    let min = ((total + side_max - 1) / side_max).max(1) as u32;
    let max = (total / side_min).max(min as i32) as u32;
    min..=max
}

fn aspect_penalty(width: i32, height: i32, cols: u32, rows: u32) -> f64 {
    let cell_w = width as f64 / cols as f64;
    let cell_h = height as f64 / rows as f64;
    (cell_w / cell_h).ln().abs()
}
