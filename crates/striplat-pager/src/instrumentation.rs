//! Pager observability counters.
//!
//! Process-local, lock-free totals shared by every lattice instance, plus
//! `trace_span!`s on each shift. Counters only grow; tests compare
//! snapshots taken before and after the operation under test.

use std::sync::atomic::{AtomicU64, Ordering};

/// Direction of a window shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShiftDirection {
    Left,
    Right,
}

impl ShiftDirection {
    /// Stable label used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

/// Snapshot of pager metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PagerMetricsSnapshot {
    /// Completed leftward shifts.
    pub striplat_shifts_left_total: u64,
    /// Completed rightward shifts.
    pub striplat_shifts_right_total: u64,
    /// Pages produced by the materializer.
    pub striplat_pages_materialized_total: u64,
    /// Pages written to swap.
    pub striplat_pages_persisted_total: u64,
    /// Pages read back from swap.
    pub striplat_pages_loaded_total: u64,
    /// Swap files deleted to respect capacity.
    pub striplat_evictions_total: u64,
    /// Shifts that could not obtain their page.
    pub striplat_load_failures_total: u64,
    /// Swap writes that failed and were discarded.
    pub striplat_persist_failures_total: u64,
    pub striplat_swap_bytes_written_total: u64,
    pub striplat_swap_bytes_read_total: u64,
}

static SHIFTS_LEFT_TOTAL: AtomicU64 = AtomicU64::new(0);
static SHIFTS_RIGHT_TOTAL: AtomicU64 = AtomicU64::new(0);
static PAGES_MATERIALIZED_TOTAL: AtomicU64 = AtomicU64::new(0);
static PAGES_PERSISTED_TOTAL: AtomicU64 = AtomicU64::new(0);
static PAGES_LOADED_TOTAL: AtomicU64 = AtomicU64::new(0);
static EVICTIONS_TOTAL: AtomicU64 = AtomicU64::new(0);
static LOAD_FAILURES_TOTAL: AtomicU64 = AtomicU64::new(0);
static PERSIST_FAILURES_TOTAL: AtomicU64 = AtomicU64::new(0);
static SWAP_BYTES_WRITTEN_TOTAL: AtomicU64 = AtomicU64::new(0);
static SWAP_BYTES_READ_TOTAL: AtomicU64 = AtomicU64::new(0);

fn bytes_u64(bytes: usize) -> u64 {
    u64::try_from(bytes).unwrap_or(u64::MAX)
}

/// Record a completed shift and emit a tracing span.
pub fn record_shift(direction: ShiftDirection, new_origin: i64) {
    let counter = match direction {
        ShiftDirection::Left => &SHIFTS_LEFT_TOTAL,
        ShiftDirection::Right => &SHIFTS_RIGHT_TOTAL,
    };
    counter.fetch_add(1, Ordering::Relaxed);
    let _span = tracing::trace_span!(
        "window_shift",
        direction = direction.as_str(),
        new_origin,
    )
    .entered();
}

pub fn record_materialized(pages: u64) {
    PAGES_MATERIALIZED_TOTAL.fetch_add(pages, Ordering::Relaxed);
}

pub(crate) fn record_persisted(bytes: usize) {
    PAGES_PERSISTED_TOTAL.fetch_add(1, Ordering::Relaxed);
    SWAP_BYTES_WRITTEN_TOTAL.fetch_add(bytes_u64(bytes), Ordering::Relaxed);
}

pub(crate) fn record_loaded(bytes: usize) {
    PAGES_LOADED_TOTAL.fetch_add(1, Ordering::Relaxed);
    SWAP_BYTES_READ_TOTAL.fetch_add(bytes_u64(bytes), Ordering::Relaxed);
}

pub(crate) fn record_eviction(label: i64) {
    EVICTIONS_TOTAL.fetch_add(1, Ordering::Relaxed);
    let _span = tracing::trace_span!("swap_evict", label).entered();
}

pub(crate) fn record_load_failure() {
    LOAD_FAILURES_TOTAL.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn record_persist_failure() {
    PERSIST_FAILURES_TOTAL.fetch_add(1, Ordering::Relaxed);
}

/// Read every counter.
#[must_use]
pub fn pager_metrics_snapshot() -> PagerMetricsSnapshot {
    PagerMetricsSnapshot {
        striplat_shifts_left_total: SHIFTS_LEFT_TOTAL.load(Ordering::Relaxed),
        striplat_shifts_right_total: SHIFTS_RIGHT_TOTAL.load(Ordering::Relaxed),
        striplat_pages_materialized_total: PAGES_MATERIALIZED_TOTAL.load(Ordering::Relaxed),
        striplat_pages_persisted_total: PAGES_PERSISTED_TOTAL.load(Ordering::Relaxed),
        striplat_pages_loaded_total: PAGES_LOADED_TOTAL.load(Ordering::Relaxed),
        striplat_evictions_total: EVICTIONS_TOTAL.load(Ordering::Relaxed),
        striplat_load_failures_total: LOAD_FAILURES_TOTAL.load(Ordering::Relaxed),
        striplat_persist_failures_total: PERSIST_FAILURES_TOTAL.load(Ordering::Relaxed),
        striplat_swap_bytes_written_total: SWAP_BYTES_WRITTEN_TOTAL.load(Ordering::Relaxed),
        striplat_swap_bytes_read_total: SWAP_BYTES_READ_TOTAL.load(Ordering::Relaxed),
    }
}
