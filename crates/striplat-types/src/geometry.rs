//! Window geometry and the pure index functions over it.
//!
//! The resident window is `2N` columns wide, split into a left and a right
//! half of `N` columns each. A local column `xx` in `[0, 2N)` selects a half
//! and a column inside it; `y` always lives in `[0, L)`. None of this
//! touches storage, so it is tested independently of the pager.

use serde::{Deserialize, Serialize};
use striplat_error::{Result, StripError};

/// One of the four lattice neighbours of a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// `y + 1 (mod L)`.
    Up,
    /// `y - 1 (mod L)`.
    Down,
    /// `x - 1`.
    Left,
    /// `x + 1`.
    Right,
}

impl Direction {
    pub const ALL: [Self; 4] = [Self::Up, Self::Down, Self::Left, Self::Right];

}

/// Which resident page a local column falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Half {
    Left,
    Right,
}

/// Circumference and page width of a lattice window.
///
/// Invariants: `circumference > 0` and `page_width >= MIN_PAGE_WIDTH`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Geometry {
    circumference: u16,
    page_width: usize,
}

impl Geometry {
    /// Narrowest page for which a shift always leaves the cursor resting.
    pub const MIN_PAGE_WIDTH: usize = 3;

    pub fn new(circumference: u16, page_width: usize) -> Result<Self> {
        if circumference == 0 {
            return Err(StripError::ZeroCircumference);
        }
        if page_width < Self::MIN_PAGE_WIDTH {
            return Err(StripError::WindowTooSmall {
                page_width,
                circumference,
            });
        }
        Ok(Self {
            circumference,
            page_width,
        })
    }

    /// Derive the page width `N = ram / (2 * cell_size * L)`.
    pub fn from_ram_budget(circumference: u16, ram_budget_bytes: u64, cell_size: usize) -> Result<Self> {
        if circumference == 0 {
            return Err(StripError::ZeroCircumference);
        }
        if ram_budget_bytes == 0 {
            return Err(StripError::ZeroRamBudget);
        }
        let ram = usize::try_from(ram_budget_bytes).map_err(|_| StripError::RamBudgetTooLarge {
            bytes: ram_budget_bytes,
        })?;
        let column_pair_bytes = cell_size
            .max(1)
            .checked_mul(2 * usize::from(circumference))
            .ok_or(StripError::RamBudgetTooLarge {
                bytes: ram_budget_bytes,
            })?;
        Self::new(circumference, ram / column_pair_bytes)
    }

    #[inline]
    #[must_use]
    pub const fn circumference(&self) -> u16 {
        self.circumference
    }

    /// `N`, the number of columns in one page.
    #[inline]
    #[must_use]
    pub const fn page_width(&self) -> usize {
        self.page_width
    }

    /// `2N`, the number of resident columns.
    #[inline]
    #[must_use]
    pub const fn window_width(&self) -> usize {
        2 * self.page_width
    }

    #[inline]
    #[must_use]
    pub const fn cells_per_page(&self) -> usize {
        self.page_width * self.circumference as usize
    }

    /// `N` as a signed x offset.
    #[inline]
    #[must_use]
    pub const fn page_span(&self) -> i64 {
        self.page_width as i64
    }

    /// Reduce any `y` into `[0, L)`.
    #[inline]
    #[must_use]
    pub fn wrap_y(&self, y: i64) -> u16 {
        y.rem_euclid(i64::from(self.circumference)) as u16
    }

    #[inline]
    #[must_use]
    pub fn up(&self, y: u16) -> u16 {
        let next = u32::from(y) + 1;
        if next == u32::from(self.circumference) {
            0
        } else {
            next as u16
        }
    }

    #[inline]
    #[must_use]
    pub fn down(&self, y: u16) -> u16 {
        if y == 0 { self.circumference - 1 } else { y - 1 }
    }

    /// Flat index of `(col, y)` inside one page: `col * L + y`.
    #[inline]
    #[must_use]
    pub const fn flat_index(&self, col: usize, y: u16) -> usize {
        col * self.circumference as usize + y as usize
    }

    /// Map a local window column to its half and the column inside it.
    #[inline]
    #[must_use]
    pub const fn split_local(&self, xx: usize) -> (Half, usize) {
        if xx < self.page_width {
            (Half::Left, xx)
        } else {
            (Half::Right, xx - self.page_width)
        }
    }

    /// Smallest local column the cursor may rest on.
    #[inline]
    #[must_use]
    pub const fn first_resting(&self) -> usize {
        1
    }

    /// Largest local column the cursor may rest on.
    #[inline]
    #[must_use]
    pub const fn last_resting(&self) -> usize {
        2 * self.page_width - 2
    }

    #[inline]
    #[must_use]
    pub const fn is_resting(&self, xx: usize) -> bool {
        xx >= self.first_resting() && xx <= self.last_resting()
    }

    /// Leftward moves from `xx` that cannot trigger a shift.
    #[inline]
    #[must_use]
    pub const fn guaranteed_left(&self, xx: usize) -> usize {
        xx.saturating_sub(self.first_resting())
    }

    /// Rightward moves from `xx` that cannot trigger a shift.
    #[inline]
    #[must_use]
    pub const fn guaranteed_right(&self, xx: usize) -> usize {
        self.last_resting().saturating_sub(xx)
    }
}

/// Number of pages the swap budget may hold; capacities under 3 disable swapping.
#[must_use]
pub fn swap_capacity(ram_budget_bytes: u64, swap_budget_bytes: u64) -> usize {
    let pages = swap_budget_bytes.checked_div(ram_budget_bytes).unwrap_or(0);
    if pages < 3 {
        return 0;
    }
    usize::try_from(pages).unwrap_or(usize::MAX)
}
