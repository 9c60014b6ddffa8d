//! One half of the resident window: `N` columns of `L` cells.
//!
//! A page buffer is allocated once and then refilled in place, either by
//! the materializer on a first visit or from a validated swap image.

use striplat_error::{Result, StripError};
use striplat_types::{Cell, CellValue, Geometry};

/// Caller-supplied initial value for a never-visited point.
///
/// Must be a pure function of `(x, y)`.
pub type Materializer<V> = dyn Fn(i64, u16) -> (V, V);

/// A contiguous `N * L` block of cells starting at absolute column `origin`.
#[derive(Debug)]
pub struct Page<V> {
    origin: i64,
    cells: Vec<Cell<V>>,
}

impl<V: CellValue> Page<V> {
    /// Reserve room for one page without initializing any cell.
    pub fn try_alloc(geometry: &Geometry) -> Result<Self> {
        let len = geometry.cells_per_page();
        let mut cells = Vec::new();
        cells
            .try_reserve_exact(len)
            .map_err(|_| StripError::OutOfMemory {
                bytes: len.saturating_mul(std::mem::size_of::<Cell<V>>()),
            })?;
        Ok(Self { origin: 0, cells })
    }

    #[inline]
    #[must_use]
    pub const fn origin(&self) -> i64 {
        self.origin
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn cells(&self) -> &[Cell<V>] {
        &self.cells
    }

    #[inline]
    #[must_use]
    pub fn cell(&self, index: usize) -> &Cell<V> {
        &self.cells[index]
    }

    #[inline]
    pub fn cell_mut(&mut self, index: usize) -> &mut Cell<V> {
        &mut self.cells[index]
    }

    /// Refill every cell from the materializer, column by column.
    pub fn materialize(&mut self, origin: i64, geometry: &Geometry, materializer: &Materializer<V>) {
        let circumference = geometry.circumference();
        self.cells.clear();
        self.cells
            .extend((0..geometry.page_span()).flat_map(|col| {
                let x = origin + col;
                (0..circumference).map(move |y| Cell::from(materializer(x, y)))
            }));
        self.origin = origin;
    }

    /// Size in bytes of this page's swap image.
    #[inline]
    #[must_use]
    pub fn image_len(geometry: &Geometry) -> usize {
        geometry.cells_per_page() * Cell::<V>::ENCODED_LEN
    }

    /// Serialize all cells in `(col, y)` order into `out`, replacing its contents.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        out.clear();
        out.resize(self.cells.len() * Cell::<V>::ENCODED_LEN, 0);
        for (cell, chunk) in self
            .cells
            .iter()
            .zip(out.chunks_exact_mut(Cell::<V>::ENCODED_LEN))
        {
            cell.encode_into(chunk);
        }
    }

    /// Refill from a swap image whose length the caller has already verified.
    pub fn decode_from(&mut self, origin: i64, image: &[u8]) {
        self.cells.clear();
        self.cells
            .extend(image.chunks_exact(Cell::<V>::ENCODED_LEN).map(Cell::decode));
        self.origin = origin;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry() -> Geometry {
        Geometry::new(3, 4).expect("valid geometry")
    }

    fn coordinates(x: i64, y: u16) -> (i64, i64) {
        (x, i64::from(y))
    }

    #[test]
    fn materialize_visits_every_cell_in_column_major_order() {
        let g = geometry();
        let mut page = Page::<i64>::try_alloc(&g).expect("alloc");
        assert!(page.is_empty(), "case=fresh_alloc_is_empty");

        page.materialize(-4, &g, &coordinates);
        assert_eq!(page.len(), 12);
        assert_eq!(page.origin(), -4);
        for col in 0..4_usize {
            for y in 0..3_u16 {
                let cell = page.cell(g.flat_index(col, y));
                assert_eq!(cell.vertical, -4 + col as i64, "case=vertical_is_x col={col}");
                assert_eq!(cell.horizontal, i64::from(y), "case=horizontal_is_y y={y}");
            }
        }
    }

    #[test]
    fn refill_reuses_buffer() {
        let g = geometry();
        let mut page = Page::<i64>::try_alloc(&g).expect("alloc");
        page.materialize(0, &g, &coordinates);
        let before = page.cells().as_ptr();
        page.materialize(100, &g, &coordinates);
        assert_eq!(page.cells().as_ptr(), before, "case=no_reallocation");
        assert_eq!(page.cell(0).vertical, 100);
    }

    #[test]
    fn image_round_trip_preserves_mutations() {
        let g = geometry();
        let mut page = Page::<f64>::try_alloc(&g).expect("alloc");
        page.materialize(8, &g, &|_, _| (0.0, 0.0));
        page.cell_mut(g.flat_index(2, 1)).horizontal = 6.5;

        let mut image = Vec::new();
        page.encode_into(&mut image);
        assert_eq!(image.len(), Page::<f64>::image_len(&g));

        let mut other = Page::<f64>::try_alloc(&g).expect("alloc");
        other.decode_from(8, &image);
        assert_eq!(other.origin(), 8);
        assert_eq!(other.cells(), page.cells(), "case=decoded_matches_source");
    }
}
