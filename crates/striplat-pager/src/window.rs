//! The two pages held in RAM, addressed as one `2N`-column buffer.
//!
//! Invariant between calls: `right.origin() == left.origin() + N`.
//! A shift exchanges the two buffers by ownership and refills the stale one,
//! so no cell is copied between halves.

use std::mem;

use striplat_error::Result;
use striplat_types::{Cell, CellValue, Geometry, Half};

use crate::page::{Materializer, Page};

#[derive(Debug)]
pub struct ResidentWindow<V> {
    geometry: Geometry,
    left: Page<V>,
    right: Page<V>,
}

impl<V: CellValue> ResidentWindow<V> {
    /// Allocate both page buffers. They are reused for the window's lifetime.
    pub fn try_new(geometry: Geometry) -> Result<Self> {
        Ok(Self {
            geometry,
            left: Page::try_alloc(&geometry)?,
            right: Page::try_alloc(&geometry)?,
        })
    }

    #[inline]
    #[must_use]
    pub const fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Absolute x of local column 0.
    #[inline]
    #[must_use]
    pub const fn origin(&self) -> i64 {
        self.left.origin()
    }

    #[inline]
    #[must_use]
    pub const fn half(&self, half: Half) -> &Page<V> {
        match half {
            Half::Left => &self.left,
            Half::Right => &self.right,
        }
    }

    #[inline]
    pub fn half_mut(&mut self, half: Half) -> &mut Page<V> {
        match half {
            Half::Left => &mut self.left,
            Half::Right => &mut self.right,
        }
    }

    /// Cell at local column `xx` in `[0, 2N)` and row `y` in `[0, L)`.
    #[inline]
    #[must_use]
    pub fn cell(&self, xx: usize, y: u16) -> &Cell<V> {
        let (half, col) = self.geometry.split_local(xx);
        let index = self.geometry.flat_index(col, y);
        self.half(half).cell(index)
    }

    #[inline]
    pub fn cell_mut(&mut self, xx: usize, y: u16) -> &mut Cell<V> {
        let (half, col) = self.geometry.split_local(xx);
        let index = self.geometry.flat_index(col, y);
        self.half_mut(half).cell_mut(index)
    }

    /// Materialize both halves so that local column 0 sits at `origin`.
    pub fn materialize_all(&mut self, origin: i64, materializer: &Materializer<V>) {
        let span = self.geometry.page_span();
        self.left.materialize(origin, &self.geometry, materializer);
        self.right
            .materialize(origin + span, &self.geometry, materializer);
    }

    /// Exchange the two buffers.
    ///
    /// Afterwards the half that must be refilled is `Left` for a leftward
    /// shift and `Right` for a rightward one; the other half already holds
    /// the page that stays resident.
    pub fn swap_halves(&mut self) {
        mem::swap(&mut self.left, &mut self.right);
    }

    #[must_use]
    pub fn is_contiguous(&self) -> bool {
        self.right.origin() == self.left.origin() + self.geometry.page_span()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position_materializer(x: i64, y: u16) -> (i64, i64) {
        (x, i64::from(y))
    }

    fn window() -> ResidentWindow<i64> {
        let geometry = Geometry::new(2, 3).expect("valid geometry");
        let mut window = ResidentWindow::try_new(geometry).expect("alloc");
        window.materialize_all(-3, &position_materializer);
        window
    }

    #[test]
    fn local_columns_span_both_halves() {
        let w = window();
        assert_eq!(w.origin(), -3);
        assert!(w.is_contiguous(), "case=fresh_window_contiguous");
        for xx in 0..6_usize {
            assert_eq!(w.cell(xx, 1).vertical, -3 + xx as i64, "case=abs_x xx={xx}");
            assert_eq!(w.cell(xx, 1).horizontal, 1);
        }
    }

    #[test]
    fn writes_land_in_selected_half() {
        let mut w = window();
        w.cell_mut(4, 0).horizontal = 42;
        let index = w.geometry().flat_index(1, 0);
        assert_eq!(w.half(Half::Right).cell(index).horizontal, 42);
        assert_ne!(w.half(Half::Left).cell(index).horizontal, 42);
    }

    #[test]
    fn leftward_shift_by_swap_and_refill() {
        let mut w = window();
        w.cell_mut(1, 0).vertical = 99;
        let left_ptr = w.half(Half::Left).cells().as_ptr();

        w.swap_halves();
        let geometry = *w.geometry();
        w.half_mut(Half::Left)
            .materialize(-6, &geometry, &position_materializer);

        assert!(w.is_contiguous(), "case=contiguous_after_shift_left");
        assert_eq!(w.origin(), -6);
        // The old left half moved to the right slot without copying.
        assert_eq!(w.half(Half::Right).cells().as_ptr(), left_ptr);
        assert_eq!(w.cell(4, 0).vertical, 99, "case=mutation_follows_page");
    }

    #[test]
    fn rightward_shift_by_swap_and_refill() {
        let mut w = window();
        w.swap_halves();
        let geometry = *w.geometry();
        w.half_mut(Half::Right)
            .materialize(3, &geometry, &position_materializer);

        assert!(w.is_contiguous(), "case=contiguous_after_shift_right");
        assert_eq!(w.origin(), 0);
        assert_eq!(w.cell(5, 1).vertical, 5);
    }
}
