use std::sync::{Mutex, MutexGuard};

/// Lock a shared collection. A panic on another thread while holding the
/// lock does not invalidate entity or registry data, so poisoning is ignored.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
