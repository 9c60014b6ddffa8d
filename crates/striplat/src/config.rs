//! Construction parameters for a [`StripLattice`](crate::StripLattice).
//!
//! Budgets are in bytes. The page width `N` and the swap capacity are
//! derived from them; nothing is allocated until the lattice is built.

use std::mem;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use striplat_error::Result;
use striplat_types::{Cell, Geometry, swap_capacity};

fn default_swap_dir() -> PathBuf {
    std::env::temp_dir()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StripConfig {
    /// `L`, the number of rows around the cylinder.
    pub circumference: u16,
    /// Bytes available for the two resident pages.
    pub ram_budget_bytes: u64,
    /// Bytes available for swap files; under three pages' worth disables swapping.
    #[serde(default)]
    pub swap_budget_bytes: u64,
    /// Directory receiving swap files.
    #[serde(default = "default_swap_dir")]
    pub swap_dir: PathBuf,
}

impl StripConfig {
    /// Swapping disabled, swap directory the system temp dir.
    #[must_use]
    pub fn new(circumference: u16, ram_budget_bytes: u64) -> Self {
        Self {
            circumference,
            ram_budget_bytes,
            swap_budget_bytes: 0,
            swap_dir: default_swap_dir(),
        }
    }

    #[must_use]
    pub const fn with_swap_budget(mut self, swap_budget_bytes: u64) -> Self {
        self.swap_budget_bytes = swap_budget_bytes;
        self
    }

    #[must_use]
    pub fn with_swap_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.swap_dir = dir.into();
        self
    }

    /// RAM budget that yields exactly `page_width` columns per page for `V`.
    #[must_use]
    pub const fn ram_budget_for<V>(circumference: u16, page_width: usize) -> u64 {
        (2 * mem::size_of::<Cell<V>>() * circumference as usize * page_width) as u64
    }

    /// Check the parameters and derive the window geometry for cells of `V`.
    pub fn validate<V>(&self) -> Result<Geometry> {
        Geometry::from_ram_budget(
            self.circumference,
            self.ram_budget_bytes,
            mem::size_of::<Cell<V>>(),
        )
    }

    /// Swap file limit derived from the budgets.
    #[must_use]
    pub fn max_swap_pages(&self) -> usize {
        swap_capacity(self.ram_budget_bytes, self.swap_budget_bytes)
    }
}
