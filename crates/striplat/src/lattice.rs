//! Cursor, extent tracking and the shift state machine.
//!
//! The cursor rests on a local column `xx` in `[1, 2N-2]` of the resident
//! window. Reaching column 1 going left or `2N-2` going right shifts the
//! window by one page before the move completes, so the four neighbours of
//! the cursor are always resident.
//!
//! A shift first settles where the incoming page comes from, reading and
//! validating its swap image if it has one, and only then persists the
//! departing page and rotates the window. When the incoming page cannot be obtained the window,
//! cursor and extent are untouched, and the lattice refuses further
//! horizontal moves until [`reset`](StripLattice::reset).

use std::fmt;

use striplat_error::{Result, StripError};
use striplat_pager::instrumentation::{record_materialized, record_shift};
use striplat_pager::{Materializer, Page, PageSource, ResidentWindow, ShiftDirection, SwapStore};
use striplat_types::{Cell, CellValue, Direction, Geometry, Half};
use tracing::{debug, error, info, warn};

use crate::config::StripConfig;

/// Default materializer: both slots `V::default()`.
pub fn zero_fill<V: Default>(_x: i64, _y: u16) -> (V, V) {
    (V::default(), V::default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Vertical,
    Horizontal,
}

pub struct StripLattice<V> {
    window: ResidentWindow<V>,
    swap: SwapStore,
    materializer: Box<Materializer<V>>,
    xx: usize,
    y: u16,
    min_x: i64,
    max_x: i64,
    usable: bool,
}

impl<V: CellValue> StripLattice<V> {
    /// Build a lattice with the cursor at `(0, 0)`.
    pub fn new<F>(config: &StripConfig, materializer: F) -> Result<Self>
    where
        F: Fn(i64, u16) -> (V, V) + 'static,
    {
        let geometry = config.validate::<V>()?;
        let window = ResidentWindow::try_new(geometry)?;
        let swap = SwapStore::new(&config.swap_dir, config.max_swap_pages());

        let mut lattice = Self {
            window,
            swap,
            materializer: Box::new(materializer),
            xx: geometry.page_width(),
            y: 0,
            min_x: 0,
            max_x: 0,
            usable: true,
        };
        lattice.reset(0, 0)?;

        info!(
            circumference = geometry.circumference(),
            page_width = geometry.page_width(),
            max_swap_pages = lattice.swap.max_pages(),
            swap_dir = %config.swap_dir.display(),
            "strip lattice created"
        );
        Ok(lattice)
    }

    /// Build a lattice whose never-visited cells start at `V::default()`.
    pub fn zero_filled(config: &StripConfig) -> Result<Self>
    where
        V: Default,
    {
        Self::new(config, zero_fill::<V>)
    }

    /// Delete all swap files, forget every visited page and re-center the
    /// window on `(start_x, start_y mod L)` with both halves freshly
    /// materialized.
    pub fn reset(&mut self, start_x: i64, start_y: i64) -> Result<()> {
        let geometry = *self.window.geometry();
        let span = geometry.page_span();
        let origin = start_x
            .checked_sub(span)
            .filter(|origin| origin.checked_add(2 * span).is_some())
            .ok_or_else(|| StripError::internal(format!("start column {start_x} out of range")))?;

        self.swap.clear();
        self.window.materialize_all(origin, &*self.materializer);
        self.swap.mark_visited(origin);
        self.swap.mark_visited(origin + span);
        record_materialized(2);

        self.xx = geometry.page_width();
        self.y = geometry.wrap_y(start_y);
        self.min_x = start_x;
        self.max_x = start_x;
        self.usable = true;
        info!(start_x, y = self.y, origin, "strip lattice reset");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    #[inline]
    #[must_use]
    pub const fn geometry(&self) -> &Geometry {
        self.window.geometry()
    }

    #[inline]
    #[must_use]
    pub const fn x(&self) -> i64 {
        self.window.origin() + self.xx as i64
    }

    #[inline]
    #[must_use]
    pub const fn y(&self) -> u16 {
        self.y
    }

    #[inline]
    #[must_use]
    pub const fn position(&self) -> (i64, u16) {
        (self.x(), self.y)
    }

    /// Smallest x reached since the last reset.
    #[inline]
    #[must_use]
    pub const fn min_x(&self) -> i64 {
        self.min_x
    }

    /// Largest x reached since the last reset.
    #[inline]
    #[must_use]
    pub const fn max_x(&self) -> i64 {
        self.max_x
    }

    /// Leftward moves that are certain not to touch disk, and so cannot fail.
    #[inline]
    #[must_use]
    pub const fn guaranteed_left_moves(&self) -> usize {
        self.window.geometry().guaranteed_left(self.xx)
    }

    /// Rightward moves that are certain not to touch disk, and so cannot fail.
    #[inline]
    #[must_use]
    pub const fn guaranteed_right_moves(&self) -> usize {
        self.window.geometry().guaranteed_right(self.xx)
    }

    #[inline]
    #[must_use]
    pub fn guaranteed_moves(&self) -> usize {
        self.guaranteed_left_moves()
            .min(self.guaranteed_right_moves())
    }

    #[inline]
    #[must_use]
    pub const fn max_swap_files(&self) -> usize {
        self.swap.max_pages()
    }

    #[inline]
    #[must_use]
    pub fn swap_file_count(&self) -> usize {
        self.swap.len()
    }

    /// Origins of the pages currently in swap, ascending.
    pub fn swapped_pages(&self) -> impl Iterator<Item = i64> + '_ {
        self.swap.labels()
    }

    /// Smallest and largest page origin ever materialized since the last reset.
    #[must_use]
    pub fn visited_pages(&self) -> Option<(i64, i64)> {
        self.swap.visited_range()
    }

    /// False after a failed shift, until the next reset.
    #[inline]
    #[must_use]
    pub const fn is_usable(&self) -> bool {
        self.usable
    }

    // -----------------------------------------------------------------------
    // Moves
    // -----------------------------------------------------------------------

    /// Step to `y + 1 (mod L)`. Never touches disk.
    pub fn move_up(&mut self) {
        self.y = self.window.geometry().up(self.y);
    }

    /// Step to `y - 1 (mod L)`. Never touches disk.
    pub fn move_down(&mut self) {
        self.y = self.window.geometry().down(self.y);
    }

    /// Jump to row `y mod L` in the current column.
    pub fn set_vertical(&mut self, y: i64) {
        self.y = self.window.geometry().wrap_y(y);
    }

    /// Step to `x - 1`, shifting the window first when the cursor sits on
    /// its leftmost resting column.
    ///
    /// A failed shift leaves position and extent unchanged and makes further
    /// horizontal moves return [`StripError::Unusable`] until
    /// [`reset`](Self::reset).
    pub fn move_left(&mut self) -> Result<()> {
        if !self.usable {
            return Err(StripError::Unusable);
        }
        if self.xx == self.window.geometry().first_resting() {
            self.shift(ShiftDirection::Left)?;
        }
        self.xx -= 1;
        debug_assert!(self.window.geometry().is_resting(self.xx));
        self.min_x = self.min_x.min(self.x());
        Ok(())
    }

    /// Step to `x + 1`; mirror image of [`move_left`](Self::move_left).
    pub fn move_right(&mut self) -> Result<()> {
        if !self.usable {
            return Err(StripError::Unusable);
        }
        if self.xx == self.window.geometry().last_resting() {
            self.shift(ShiftDirection::Right)?;
        }
        self.xx += 1;
        debug_assert!(self.window.geometry().is_resting(self.xx));
        self.max_x = self.max_x.max(self.x());
        Ok(())
    }

    /// One move in `direction`. Only horizontal steps can fail.
    pub fn step(&mut self, direction: Direction) -> Result<()> {
        match direction {
            Direction::Up => {
                self.move_up();
                Ok(())
            }
            Direction::Down => {
                self.move_down();
                Ok(())
            }
            Direction::Left => self.move_left(),
            Direction::Right => self.move_right(),
        }
    }

    /// Move `dy` rows then `dx` columns, one step at a time.
    ///
    /// Stops at the first failing horizontal step; the steps taken before it
    /// stay taken.
    pub fn move_by(&mut self, dx: i64, dy: i64) -> Result<()> {
        let dy = self.window.geometry().wrap_y(dy);
        self.set_vertical(i64::from(self.y) + i64::from(dy));
        let direction = if dx < 0 {
            Direction::Left
        } else {
            Direction::Right
        };
        for _ in 0..dx.unsigned_abs() {
            self.step(direction)?;
        }
        Ok(())
    }

    fn shift(&mut self, direction: ShiftDirection) -> Result<()> {
        let geometry = *self.window.geometry();
        let span = geometry.page_span();
        let origin = self.window.origin();
        let x = self.x();
        // The incoming page and the whole shifted window must stay inside i64.
        let incoming = match direction {
            ShiftDirection::Left => origin.checked_sub(span),
            ShiftDirection::Right => span
                .checked_mul(2)
                .and_then(|width| origin.checked_add(width))
                .filter(|incoming| incoming.checked_add(span).is_some()),
        };
        let (departing, refill) = match direction {
            ShiftDirection::Left => (Half::Right, Half::Left),
            ShiftDirection::Right => (Half::Left, Half::Right),
        };

        let staged = incoming
            .ok_or(StripError::OutOfRange { near: x })
            .and_then(|incoming| {
                let source = self.swap.stage(incoming, Page::<V>::image_len(&geometry))?;
                Ok((incoming, source))
            });
        let (incoming, source) = match staged {
            Ok(staged) => staged,
            Err(err) => {
                self.usable = false;
                error!(
                    direction = direction.as_str(),
                    x,
                    error = %err,
                    "shift failed; lattice unusable until reset"
                );
                return Err(err);
            }
        };

        let (new_origin, cursor_after) = match direction {
            ShiftDirection::Left => (incoming, x - 1),
            ShiftDirection::Right => (origin + span, x + 1),
        };

        let departing_page = self.window.half(departing);
        if let Err(err) = self.swap.persist(departing_page, cursor_after) {
            warn!(
                label = departing_page.origin(),
                error = %err,
                "departing page not swapped out; it cannot be revisited"
            );
        }

        // The half that stays resident moves into the other slot; the freed
        // buffer takes the incoming page.
        self.window.swap_halves();
        let page = self.window.half_mut(refill);
        match source {
            PageSource::Fresh => {
                page.materialize(incoming, &geometry, &*self.materializer);
                self.swap.mark_visited(incoming);
                record_materialized(1);
            }
            PageSource::Staged => page.decode_from(incoming, self.swap.staged()),
        }

        match direction {
            ShiftDirection::Left => self.xx += geometry.page_width(),
            ShiftDirection::Right => self.xx -= geometry.page_width(),
        }
        debug_assert!(self.window.is_contiguous());
        debug_assert_eq!(self.window.origin(), new_origin);
        record_shift(direction, new_origin);
        debug!(
            direction = direction.as_str(),
            new_origin,
            source = ?source,
            swapped = self.swap.len(),
            "window shifted"
        );
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Cell access
    // -----------------------------------------------------------------------

    /// Local coordinates of the neighbour in `direction`.
    fn neighbor_coords(&self, direction: Direction) -> (usize, u16) {
        let geometry = self.window.geometry();
        match direction {
            Direction::Up => (self.xx, geometry.up(self.y)),
            Direction::Down => (self.xx, geometry.down(self.y)),
            Direction::Left => (self.xx - 1, self.y),
            Direction::Right => (self.xx + 1, self.y),
        }
    }

    /// Cell and slot holding the edge from the cursor in `direction`.
    fn edge_coords(&self, direction: Direction) -> (usize, u16, Slot) {
        match direction {
            Direction::Up => (self.xx, self.y, Slot::Vertical),
            Direction::Right => (self.xx, self.y, Slot::Horizontal),
            Direction::Down => {
                let (xx, y) = self.neighbor_coords(Direction::Down);
                (xx, y, Slot::Vertical)
            }
            Direction::Left => {
                let (xx, y) = self.neighbor_coords(Direction::Left);
                (xx, y, Slot::Horizontal)
            }
        }
    }

    /// Cell under the cursor. Valid until the next horizontal move.
    #[inline]
    #[must_use]
    pub fn cell(&self) -> &Cell<V> {
        self.window.cell(self.xx, self.y)
    }

    #[inline]
    pub fn cell_mut(&mut self) -> &mut Cell<V> {
        self.window.cell_mut(self.xx, self.y)
    }

    #[must_use]
    pub fn neighbor(&self, direction: Direction) -> &Cell<V> {
        let (xx, y) = self.neighbor_coords(direction);
        self.window.cell(xx, y)
    }

    pub fn neighbor_mut(&mut self, direction: Direction) -> &mut Cell<V> {
        let (xx, y) = self.neighbor_coords(direction);
        self.window.cell_mut(xx, y)
    }

    /// Vertical slot of the cursor cell.
    #[inline]
    #[must_use]
    pub fn vertical(&self) -> &V {
        &self.cell().vertical
    }

    #[inline]
    pub fn vertical_mut(&mut self) -> &mut V {
        &mut self.cell_mut().vertical
    }

    /// Horizontal slot of the cursor cell.
    #[inline]
    #[must_use]
    pub fn horizontal(&self) -> &V {
        &self.cell().horizontal
    }

    #[inline]
    pub fn horizontal_mut(&mut self) -> &mut V {
        &mut self.cell_mut().horizontal
    }

    /// Edge from the cursor towards `direction`.
    ///
    /// Up and Right are the cursor cell's own slots; Down and Left are the
    /// vertical slot below and the horizontal slot to the left. With `L = 1`
    /// the Up and Down edges are the same storage.
    #[must_use]
    pub fn edge(&self, direction: Direction) -> &V {
        let (xx, y, slot) = self.edge_coords(direction);
        let cell = self.window.cell(xx, y);
        match slot {
            Slot::Vertical => &cell.vertical,
            Slot::Horizontal => &cell.horizontal,
        }
    }

    pub fn edge_mut(&mut self, direction: Direction) -> &mut V {
        let (xx, y, slot) = self.edge_coords(direction);
        let cell = self.window.cell_mut(xx, y);
        match slot {
            Slot::Vertical => &mut cell.vertical,
            Slot::Horizontal => &mut cell.horizontal,
        }
    }

    /// Any resident cell at `(x + dx, y + dy)`, or `None` outside the window.
    #[must_use]
    pub fn peek(&self, dx: i64, dy: i64) -> Option<&Cell<V>> {
        let geometry = self.window.geometry();
        let xx = i64::try_from(self.xx).ok()?.checked_add(dx)?;
        let xx = usize::try_from(xx).ok()?;
        if xx >= geometry.window_width() {
            return None;
        }
        let y = geometry.wrap_y(i64::from(self.y) + i64::from(geometry.wrap_y(dy)));
        Some(self.window.cell(xx, y))
    }

    /// Leftmost and rightmost `dx` for which [`peek`](Self::peek) succeeds.
    #[must_use]
    pub fn peek_bounds(&self) -> (i64, i64) {
        let xx = self.xx as i64;
        (-xx, self.window.geometry().window_width() as i64 - 1 - xx)
    }
}

impl<V: CellValue> fmt::Display for StripLattice<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let geometry = self.window.geometry();
        write!(
            f,
            "StripLattice(x={}, y={}, L={}, N={}, extent=[{}, {}], swap={}/{}{})",
            self.x(),
            self.y,
            geometry.circumference(),
            geometry.page_width(),
            self.min_x,
            self.max_x,
            self.swap.len(),
            self.swap.max_pages(),
            if self.usable { "" } else { ", unusable" },
        )
    }
}

impl<V: CellValue> fmt::Debug for StripLattice<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StripLattice")
            .field("geometry", self.window.geometry())
            .field("origin", &self.window.origin())
            .field("xx", &self.xx)
            .field("y", &self.y)
            .field("min_x", &self.min_x)
            .field("max_x", &self.max_x)
            .field("usable", &self.usable)
            .field("swap", &self.swap)
            .finish_non_exhaustive()
    }
}
