//! Capacity-bounded on-disk page cache.
//!
//! Each evicted-from-RAM page is written to its own flat file holding the
//! raw `N * L` cell image, no header. The store remembers, per label (page
//! origin), the image length and its xxh3 digest, and the contiguous range of
//! labels that have ever been materialized. A label inside that range which
//! is not on disk cannot be reconstructed: the materializer is only ever
//! invoked on never-visited pages.
//!
//! Eviction looks at the two extreme labels only and drops whichever lies
//! further from the cursor (the larger label on a tie). The window slides
//! one page at a time, so the resident set stays contiguous enough for the
//! extremes to be the only candidates worth considering.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use striplat_error::{Result, StripError};
use striplat_types::CellValue;
use tracing::{debug, warn};
use xxhash_rust::xxh3::xxh3_64;

use crate::instrumentation::{
    record_eviction, record_load_failure, record_loaded, record_persist_failure, record_persisted,
};
use crate::page::Page;

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// Where the page for a label comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSource {
    /// Never visited: run the materializer.
    Fresh,
    /// Read back from swap; the validated image is in [`SwapStore::staged`].
    Staged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SwapEntry {
    len: usize,
    xxh3: u64,
}

#[derive(Debug)]
pub struct SwapStore {
    dir: PathBuf,
    file_stem: String,
    max_pages: usize,
    resident: BTreeMap<i64, SwapEntry>,
    visited: Option<(i64, i64)>,
    /// Image read by the last `stage`.
    staging: Vec<u8>,
    /// Image being written by `persist`; kept apart so a persist between
    /// staging and decoding leaves the staged image intact.
    encoding: Vec<u8>,
}

impl SwapStore {
    /// Create a store writing into `dir`. `max_pages == 0` disables swapping.
    pub fn new(dir: impl Into<PathBuf>, max_pages: usize) -> Self {
        let instance = NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed);
        let created_ns = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_nanos());
        Self {
            dir: dir.into(),
            file_stem: format!("striplat-{}-{instance}-{created_ns}", std::process::id()),
            max_pages,
            resident: BTreeMap::new(),
            visited: None,
            staging: Vec::new(),
            encoding: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.max_pages > 0
    }

    #[inline]
    #[must_use]
    pub const fn max_pages(&self) -> usize {
        self.max_pages
    }

    /// Number of pages currently on disk.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.resident.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resident.is_empty()
    }

    /// Labels on disk, ascending.
    pub fn labels(&self) -> impl Iterator<Item = i64> + '_ {
        self.resident.keys().copied()
    }

    #[must_use]
    pub fn contains(&self, label: i64) -> bool {
        self.resident.contains_key(&label)
    }

    /// Smallest and largest label ever materialized since the last clear.
    #[must_use]
    pub const fn visited_range(&self) -> Option<(i64, i64)> {
        self.visited
    }

    #[must_use]
    pub fn has_visited(&self, label: i64) -> bool {
        self.visited
            .is_some_and(|(low, high)| (low..=high).contains(&label))
    }

    /// Widen the visited range to cover `label`.
    pub fn mark_visited(&mut self, label: i64) {
        self.visited = Some(match self.visited {
            None => (label, label),
            Some((low, high)) => (low.min(label), high.max(label)),
        });
    }

    /// Backing file for `label`. Unique per store instance.
    #[must_use]
    pub fn path_for(&self, label: i64) -> PathBuf {
        self.dir.join(format!("{}_{label}.page", self.file_stem))
    }

    /// Decide where the page at `label` comes from, reading and validating
    /// its swap image if needed. Nothing outside the store's staging buffer
    /// changes on failure.
    pub fn stage(&mut self, label: i64, image_len: usize) -> Result<PageSource> {
        if !self.has_visited(label) {
            return Ok(PageSource::Fresh);
        }
        let Some(entry) = self.resident.get(&label).copied() else {
            record_load_failure();
            return Err(StripError::PageUnavailable { origin: label });
        };

        let path = self.path_for(label);
        if let Err(err) = read_image(&path, &mut self.staging) {
            record_load_failure();
            self.discard(label);
            return Err(StripError::PageCorrupt {
                origin: label,
                detail: format!("read {} failed: {err}", path.display()),
            });
        }

        let got = self.staging.len();
        if got != image_len || got != entry.len {
            record_load_failure();
            self.discard(label);
            return Err(StripError::PageCorrupt {
                origin: label,
                detail: format!("expected {image_len} bytes, found {got}"),
            });
        }
        if xxh3_64(&self.staging) != entry.xxh3 {
            record_load_failure();
            self.discard(label);
            return Err(StripError::PageCorrupt {
                origin: label,
                detail: "xxh3 digest mismatch".to_owned(),
            });
        }

        record_loaded(got);
        debug!(label, bytes = got, "swap page staged");
        Ok(PageSource::Staged)
    }

    /// Image read by the last successful [`stage`](Self::stage).
    #[must_use]
    pub fn staged(&self) -> &[u8] {
        &self.staging
    }

    /// Write `page` to its backing file, evicting the extreme label furthest
    /// from `cursor_x` first when the store is full. A no-op when disabled.
    ///
    /// On write failure the partial file is removed and the label forgotten,
    /// so a later reload of it fails instead of returning stale cells.
    pub fn persist<V: CellValue>(&mut self, page: &Page<V>, cursor_x: i64) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }
        let label = page.origin();
        if !self.contains(label) && self.resident.len() >= self.max_pages {
            self.evict_furthest(cursor_x);
        }

        page.encode_into(&mut self.encoding);
        let path = self.path_for(label);
        if let Err(err) = fs::write(&path, &self.encoding) {
            record_persist_failure();
            warn!(label, path = %path.display(), error = %err, "swap write failed; discarding page image");
            self.discard(label);
            return Err(err.into());
        }

        let entry = SwapEntry {
            len: self.encoding.len(),
            xxh3: xxh3_64(&self.encoding),
        };
        self.resident.insert(label, entry);
        record_persisted(entry.len);
        debug!(label, bytes = entry.len, resident = self.resident.len(), "swap page persisted");
        Ok(())
    }

    /// Label that would be evicted for a cursor at `cursor_x`.
    #[must_use]
    pub fn eviction_candidate(&self, cursor_x: i64) -> Option<i64> {
        let (&first, _) = self.resident.first_key_value()?;
        let (&last, _) = self.resident.last_key_value()?;
        if first.abs_diff(cursor_x) > last.abs_diff(cursor_x) {
            Some(first)
        } else {
            Some(last)
        }
    }

    fn evict_furthest(&mut self, cursor_x: i64) {
        if let Some(label) = self.eviction_candidate(cursor_x) {
            self.discard(label);
            record_eviction(label);
            debug!(label, cursor_x, "swap page evicted");
        }
    }

    /// Forget `label` and delete its file.
    fn discard(&mut self, label: i64) {
        let _ = self.resident.remove(&label);
        remove_quietly(&self.path_for(label));
    }

    /// Delete every backing file and forget the visited range.
    pub fn clear(&mut self) {
        let labels: Vec<i64> = self.labels().collect();
        for label in labels {
            self.discard(label);
        }
        self.visited = None;
    }
}

impl Drop for SwapStore {
    fn drop(&mut self) {
        self.clear();
    }
}

fn read_image(path: &Path, out: &mut Vec<u8>) -> io::Result<()> {
    out.clear();
    let mut file = File::open(path)?;
    file.read_to_end(out)?;
    Ok(())
}

fn remove_quietly(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => warn!(path = %path.display(), error = %err, "failed to delete swap file"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use striplat_types::Geometry;
    use tempfile::tempdir;

    fn geometry() -> Geometry {
        Geometry::new(2, 3).expect("valid geometry")
    }

    fn page_at(origin: i64, fill: i32) -> Page<i32> {
        let g = geometry();
        let mut page = Page::try_alloc(&g).expect("alloc");
        page.materialize(origin, &g, &move |_, _| (fill, fill));
        page
    }

    #[test]
    fn unvisited_labels_are_fresh() {
        let dir = tempdir().expect("tempdir");
        let mut store = SwapStore::new(dir.path(), 3);
        assert_eq!(store.stage(0, 24).expect("fresh"), PageSource::Fresh);
        store.mark_visited(0);
        store.mark_visited(6);
        assert_eq!(store.visited_range(), Some((0, 6)));
        assert!(store.has_visited(3), "case=interior_label_visited");
        assert_eq!(store.stage(9, 24).expect("fresh"), PageSource::Fresh);
    }

    #[test]
    fn visited_but_absent_label_is_unavailable() {
        let dir = tempdir().expect("tempdir");
        let mut store = SwapStore::new(dir.path(), 0);
        store.mark_visited(-3);
        let err = store.stage(-3, 24).expect_err("discarded page");
        assert!(matches!(err, StripError::PageUnavailable { origin: -3 }));
    }

    #[test]
    fn disabled_store_never_writes() {
        let dir = tempdir().expect("tempdir");
        let mut store = SwapStore::new(dir.path(), 0);
        store.persist(&page_at(0, 1), 0).expect("no-op");
        assert!(store.is_empty());
        assert_eq!(fs::read_dir(dir.path()).expect("list").count(), 0, "case=no_files");
    }

    #[test]
    fn persist_then_stage_returns_same_image() {
        let g = geometry();
        let dir = tempdir().expect("tempdir");
        let mut store = SwapStore::new(dir.path(), 3);
        let page = page_at(3, 17);
        store.mark_visited(3);
        store.persist(&page, 0).expect("persist");
        assert!(store.path_for(3).exists());

        let len = Page::<i32>::image_len(&g);
        assert_eq!(store.stage(3, len).expect("staged"), PageSource::Staged);
        let mut back = Page::<i32>::try_alloc(&g).expect("alloc");
        back.decode_from(3, store.staged());
        assert_eq!(back.cells(), page.cells());
        assert!(store.contains(3), "case=reload_keeps_file");
    }

    #[test]
    fn persist_after_stage_keeps_staged_image() {
        let g = geometry();
        let dir = tempdir().expect("tempdir");
        let mut store = SwapStore::new(dir.path(), 3);
        let page = page_at(0, 11);
        store.mark_visited(0);
        store.persist(&page, 0).expect("persist");

        let len = Page::<i32>::image_len(&g);
        store.stage(0, len).expect("staged");
        store.persist(&page_at(6, 99), 1).expect("persist departing");

        let mut back = Page::<i32>::try_alloc(&g).expect("alloc");
        back.decode_from(0, store.staged());
        assert_eq!(back.cells(), page.cells(), "case=staged_image_intact");
    }

    #[test]
    fn eviction_drops_extreme_furthest_from_cursor() {
        let dir = tempdir().expect("tempdir");
        let mut store = SwapStore::new(dir.path(), 3);
        for label in [-6, -3, 0] {
            store.mark_visited(label);
            store.persist(&page_at(label, 0), 0).expect("persist");
        }
        // Cursor at 4: -6 is furthest.
        store.persist(&page_at(3, 0), 4).expect("persist");
        assert_eq!(store.labels().collect::<Vec<_>>(), vec![-3, 0, 3]);
        assert!(!store.path_for(-6).exists(), "case=evicted_file_deleted");

        // Cursor at -4: 3 is furthest.
        store.persist(&page_at(-9, 0), -4).expect("persist");
        assert_eq!(store.labels().collect::<Vec<_>>(), vec![-9, -3, 0]);
        assert_eq!(store.len(), store.max_pages(), "case=capacity_respected");
    }

    #[test]
    fn eviction_tie_removes_larger_label() {
        let dir = tempdir().expect("tempdir");
        let mut store = SwapStore::new(dir.path(), 3);
        for label in [-6, 0, 6] {
            store.persist(&page_at(label, 0), 0).expect("persist");
        }
        assert_eq!(store.eviction_candidate(0), Some(6));
        assert_eq!(store.eviction_candidate(-1), Some(6));
        assert_eq!(store.eviction_candidate(1), Some(-6));
    }

    #[test]
    fn rewriting_resident_label_does_not_evict() {
        let dir = tempdir().expect("tempdir");
        let mut store = SwapStore::new(dir.path(), 3);
        for label in [0, 3, 6] {
            store.persist(&page_at(label, 0), 0).expect("persist");
        }
        store.persist(&page_at(6, 5), 100).expect("persist");
        assert_eq!(store.labels().collect::<Vec<_>>(), vec![0, 3, 6], "case=overwrite_in_place");
    }

    #[test]
    fn corrupt_image_is_rejected_and_deleted() {
        let g = geometry();
        let dir = tempdir().expect("tempdir");
        let mut store = SwapStore::new(dir.path(), 3);
        store.mark_visited(0);
        store.persist(&page_at(0, 3), 0).expect("persist");

        let path = store.path_for(0);
        let mut bytes = fs::read(&path).expect("read");
        bytes[0] ^= 0xFF;
        fs::write(&path, &bytes).expect("tamper");

        let err = store
            .stage(0, Page::<i32>::image_len(&g))
            .expect_err("digest mismatch");
        assert!(matches!(err, StripError::PageCorrupt { origin: 0, .. }));
        assert!(!store.contains(0), "case=corrupt_label_forgotten");
        assert!(!path.exists(), "case=corrupt_file_deleted");
    }

    #[test]
    fn truncated_image_is_rejected() {
        let g = geometry();
        let dir = tempdir().expect("tempdir");
        let mut store = SwapStore::new(dir.path(), 3);
        store.mark_visited(0);
        store.persist(&page_at(0, 3), 0).expect("persist");
        fs::write(store.path_for(0), [1_u8, 2, 3]).expect("truncate");

        let err = store
            .stage(0, Page::<i32>::image_len(&g))
            .expect_err("short image");
        assert!(matches!(err, StripError::PageCorrupt { .. }));
    }

    #[test]
    fn missing_file_is_a_load_failure() {
        let g = geometry();
        let dir = tempdir().expect("tempdir");
        let mut store = SwapStore::new(dir.path(), 3);
        store.mark_visited(0);
        store.persist(&page_at(0, 3), 0).expect("persist");
        fs::remove_file(store.path_for(0)).expect("remove");

        assert!(store.stage(0, Page::<i32>::image_len(&g)).is_err());
        assert!(!store.contains(0));
    }

    #[test]
    fn write_failure_forgets_label() {
        let dir = tempdir().expect("tempdir");
        let missing = dir.path().join("does-not-exist");
        let mut store = SwapStore::new(&missing, 3);
        let err = store.persist(&page_at(0, 1), 0).expect_err("no such dir");
        assert!(matches!(err, StripError::Io(_)));
        assert!(store.is_empty(), "case=failed_write_not_tracked");
    }

    #[test]
    fn clear_and_drop_delete_all_files() {
        let dir = tempdir().expect("tempdir");
        {
            let mut store = SwapStore::new(dir.path(), 4);
            for label in [0, 3, 6] {
                store.mark_visited(label);
                store.persist(&page_at(label, 0), 0).expect("persist");
            }
            assert_eq!(fs::read_dir(dir.path()).expect("list").count(), 3);
            store.clear();
            assert_eq!(store.visited_range(), None);
            assert_eq!(fs::read_dir(dir.path()).expect("list").count(), 0, "case=clear_deletes");

            store.persist(&page_at(9, 0), 0).expect("persist");
        }
        assert_eq!(fs::read_dir(dir.path()).expect("list").count(), 0, "case=drop_deletes");
    }

    proptest::proptest! {
        #![proptest_config(proptest::prelude::ProptestConfig::with_cases(32))]

        #[test]
        fn capacity_bound_holds_for_any_persist_sequence(
            capacity in 3_usize..6,
            writes in proptest::collection::vec((-8_i64..8, -30_i64..30), 1..40),
        ) {
            let dir = tempdir().expect("tempdir");
            let mut store = SwapStore::new(dir.path(), capacity);
            for (page_index, cursor_x) in writes {
                store.persist(&page_at(page_index * 3, 0), cursor_x).expect("persist");
                proptest::prop_assert!(store.len() <= capacity);
                proptest::prop_assert!(store.contains(page_index * 3), "case=just_written_kept");
                let on_disk = fs::read_dir(dir.path()).expect("list").count();
                proptest::prop_assert_eq!(on_disk, store.len());
            }
        }
    }

    #[test]
    fn concurrent_instances_use_distinct_files() {
        let dir = tempdir().expect("tempdir");
        let a = SwapStore::new(dir.path(), 3);
        let b = SwapStore::new(dir.path(), 3);
        assert_ne!(a.path_for(0), b.path_for(0));
    }
}
