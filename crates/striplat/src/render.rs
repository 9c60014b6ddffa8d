//! Text rendering of the resident neighbourhood of the cursor.
//!
//! Reads cells through [`StripLattice::peek`] only, so rendering never moves
//! the cursor or widens the visited extent.
//!
//! Each lattice row produces two lines: the vertical edges leaving the row
//! upwards, then the vertices with the horizontal edges to their right.
//! The cursor vertex is drawn as `@`, other vertices as `+`.

use std::fmt::Write as _;

use striplat_types::CellValue;

use crate::lattice::StripLattice;

pub struct RenderOptions<'a, V> {
    /// Columns drawn on each side of the cursor (clipped to the window).
    pub radius: usize,
    /// Glyph for a vertical slot; `|` when absent.
    pub vertical_glyph: Option<&'a dyn Fn(&V) -> char>,
    /// Glyph for a horizontal slot; `-` when absent.
    pub horizontal_glyph: Option<&'a dyn Fn(&V) -> char>,
}

impl<V> Default for RenderOptions<'_, V> {
    fn default() -> Self {
        Self {
            radius: 3,
            vertical_glyph: None,
            horizontal_glyph: None,
        }
    }
}

impl<V> RenderOptions<'_, V> {
    #[must_use]
    pub const fn with_radius(mut self, radius: usize) -> Self {
        self.radius = radius;
        self
    }
}

impl<'a, V> RenderOptions<'a, V> {
    #[must_use]
    pub fn with_glyphs(
        mut self,
        vertical: &'a dyn Fn(&V) -> char,
        horizontal: &'a dyn Fn(&V) -> char,
    ) -> Self {
        self.vertical_glyph = Some(vertical);
        self.horizontal_glyph = Some(horizontal);
        self
    }
}

impl<V: CellValue> StripLattice<V> {
    /// Row offsets to draw, top to bottom.
    fn render_rows(&self, radius: usize) -> Vec<i64> {
        let circumference = i64::from(self.geometry().circumference());
        let y = i64::from(self.y());
        let radius = i64::try_from(radius).unwrap_or(i64::MAX);
        if radius.saturating_mul(2).saturating_add(1) >= circumference {
            // Whole circumference, absolute rows L-1 down to 0.
            ((-y)..circumference - y).rev().collect()
        } else {
            (-radius..=radius).rev().collect()
        }
    }

    /// Render the neighbourhood of the cursor as text.
    #[must_use]
    pub fn render(&self, options: &RenderOptions<'_, V>) -> String {
        let radius = i64::try_from(options.radius).unwrap_or(i64::MAX);
        let (low, high) = self.peek_bounds();
        let columns = low.max(-radius)..=high.min(radius);
        let vertical_glyph = |value: &V| options.vertical_glyph.map_or('|', |glyph| glyph(value));
        let horizontal_glyph =
            |value: &V| options.horizontal_glyph.map_or('-', |glyph| glyph(value));

        let mut out = String::new();
        let _ = writeln!(
            out,
            "x={}..={} y={} (cursor x={})",
            self.x() + columns.start(),
            self.x() + columns.end(),
            self.y(),
            self.x()
        );

        let geometry = *self.geometry();
        for dy in self.render_rows(options.radius) {
            let row = geometry.wrap_y(i64::from(self.y()) + dy);

            out.push_str("      ");
            for dx in columns.clone() {
                if let Some(cell) = self.peek(dx, dy) {
                    out.push(vertical_glyph(&cell.vertical));
                    out.push(' ');
                }
            }
            out.push('\n');

            let _ = write!(out, "{row:>5} ");
            for dx in columns.clone() {
                if let Some(cell) = self.peek(dx, dy) {
                    out.push(if dx == 0 && dy == 0 { '@' } else { '+' });
                    out.push(horizontal_glyph(&cell.horizontal));
                }
            }
            out.push('\n');
        }
        out
    }
}
