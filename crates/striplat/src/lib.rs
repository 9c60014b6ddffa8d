//! A cylinder lattice `(x, y)`, `x` in ℤ and `y` in ℤ/Lℤ, that behaves as if
//! the whole infinite strip were addressable while only two pages of columns
//! around a cursor live in RAM. Pages leaving RAM go to per-page swap files
//! and come back on demand; never-visited pages are produced by a caller
//! supplied materializer.
//!
//! ```no_run
//! use striplat::{StripConfig, StripLattice};
//!
//! let config = StripConfig::new(16, 1 << 20).with_swap_budget(16 << 20);
//! let mut lattice = StripLattice::<f64>::new(&config, |x, y| (x as f64, f64::from(y)))?;
//! while lattice.guaranteed_right_moves() > 0 {
//!     lattice.move_right()?;
//! }
//! *lattice.horizontal_mut() = 1.5;
//! # Ok::<(), striplat::StripError>(())
//! ```

pub mod config;
pub mod lattice;
pub mod render;

pub use config::StripConfig;
pub use lattice::{StripLattice, zero_fill};
pub use render::RenderOptions;
pub use striplat_error::{Result, StripError};
pub use striplat_pager::{PagerMetricsSnapshot, pager_metrics_snapshot};
pub use striplat_types::{Cell, CellValue, Direction, Geometry};
