//! Paging layer of the strip lattice.
//!
//! [`ResidentWindow`] holds the two pages of columns in RAM, [`Page`] is the
//! unit of materialization and disk transfer, and [`SwapStore`] keeps the
//! capacity-bounded set of per-page swap files. Counters recording shifts
//! and swap traffic live in [`instrumentation`].

pub mod instrumentation;
pub mod page;
pub mod swap_store;
pub mod window;

pub use instrumentation::{PagerMetricsSnapshot, ShiftDirection, pager_metrics_snapshot};
pub use page::{Materializer, Page};
pub use swap_store::{PageSource, SwapStore};
pub use window::ResidentWindow;
