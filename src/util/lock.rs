use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

/// Acquire a read guard, continuing with the inner value if a writer panicked.
pub(crate) fn read_recovering<'a, T>(lock: &'a RwLock<T>, op: &'static str) -> RwLockReadGuard<'a, T> {
    lock.read().unwrap_or_else(|poisoned| {
        report_poisoned(op, "rwlock.read");
        poisoned.into_inner()
    })
}

/// Acquire a write guard, continuing with the inner value if a writer panicked.
pub(crate) fn write_recovering<'a, T>(
    lock: &'a RwLock<T>,
    op: &'static str,
) -> RwLockWriteGuard<'a, T> {
    lock.write().unwrap_or_else(|poisoned| {
        report_poisoned(op, "rwlock.write");
        poisoned.into_inner()
    })
}

fn report_poisoned(op: &'static str, lock_kind: &'static str) {
    warn!(
        target = "taccuino::util::lock",
        op,
        lock_kind,
        result = "poisoned_recovered",
        "Recovered from poisoned lock; state may predate a panic in another task"
    );
}
