//! Per-path lock table (`SPEC_FULL.md` §4.2): at most one holder per path, FIFO
//! release order, full parallelism across distinct paths.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::path::RelativePath;

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("path '{0}' is not locked")]
    NotLocked(RelativePath),
}

/// A held lock on a single path. Dropping it without calling [`LockTable::release`]
/// is a bug the table cannot detect; callers are expected to release explicitly
/// (e.g. in a `finally`-style guard) the way the orchestrator's operation loop does.
pub struct LockHandle {
    path: RelativePath,
}

impl LockHandle {
    pub fn path(&self) -> &RelativePath {
        &self.path
    }
}

#[derive(Default)]
struct PathState {
    held: bool,
    waiters: VecDeque<oneshot::Sender<()>>,
}

#[derive(Clone, Default)]
pub struct LockTable {
    inner: Arc<Mutex<HashMap<RelativePath, PathState>>>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suspends until the caller owns the lock for `path`, then returns a handle.
    pub async fn wait_for_lock(&self, path: RelativePath) -> LockHandle {
        let rx = {
            let mut table = self.inner.lock();
            let state = table.entry(path.clone()).or_default();
            if !state.held {
                state.held = true;
                None
            } else {
                let (tx, rx) = oneshot::channel();
                state.waiters.push_back(tx);
                Some(rx)
            }
        };

        if let Some(rx) = rx {
            // The sender is dropped only after marking us the holder; a recv error
            // here would mean the table was dropped mid-wait, which never happens
            // since `self` is held by the caller across the await.
            let _ = rx.await;
        }

        LockHandle { path }
    }

    /// Attempts to acquire the lock without waiting; `true` on success.
    pub fn try_lock(&self, path: &RelativePath) -> Option<LockHandle> {
        let mut table = self.inner.lock();
        let state = table.entry(path.clone()).or_default();
        if state.held {
            None
        } else {
            state.held = true;
            Some(LockHandle { path: path.clone() })
        }
    }

    /// Releases `handle`, handing the lock to the next FIFO waiter if any, or
    /// freeing the path entirely.
    pub fn release(&self, handle: LockHandle) -> Result<(), LockError> {
        let mut table = self.inner.lock();
        let Some(state) = table.get_mut(&handle.path) else {
            return Err(LockError::NotLocked(handle.path));
        };
        if !state.held {
            return Err(LockError::NotLocked(handle.path));
        }
        match state.waiters.pop_front() {
            Some(next) => {
                // state.held stays true: ownership transfers directly to `next`.
                let _ = next.send(());
            }
            None => {
                state.held = false;
                table.remove(&handle.path);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> RelativePath {
        RelativePath::new(s).unwrap()
    }

    #[tokio::test]
    async fn mutual_exclusion_and_release() {
        let table = LockTable::new();
        let h1 = table.wait_for_lock(path("a")).await;
        assert!(table.try_lock(&path("a")).is_none());
        table.release(h1).unwrap();
        assert!(table.try_lock(&path("a")).is_some());
    }

    #[tokio::test]
    async fn release_without_lock_errors() {
        let table = LockTable::new();
        let h = table.wait_for_lock(path("a")).await;
        table.release(h).unwrap();
        let dangling = LockHandle { path: path("a") };
        assert!(matches!(table.release(dangling), Err(LockError::NotLocked(_))));
    }

    #[tokio::test]
    async fn fifo_ordering() {
        let table = LockTable::new();
        let h1 = table.wait_for_lock(path("a")).await;

        let order = Arc::new(Mutex::new(Vec::new()));
        let t2 = {
            let table = table.clone();
            let order = order.clone();
            tokio::spawn(async move {
                let h = table.wait_for_lock(path("a")).await;
                order.lock().push(2);
                table.release(h).unwrap();
            })
        };
        tokio::task::yield_now().await;
        let t3 = {
            let table = table.clone();
            let order = order.clone();
            tokio::spawn(async move {
                let h = table.wait_for_lock(path("a")).await;
                order.lock().push(3);
                table.release(h).unwrap();
            })
        };
        tokio::task::yield_now().await;

        table.release(h1).unwrap();
        t2.await.unwrap();
        t3.await.unwrap();

        assert_eq!(*order.lock(), vec![2, 3]);
    }

    #[tokio::test]
    async fn independent_paths_do_not_block() {
        let table = LockTable::new();
        let h1 = table.wait_for_lock(path("a")).await;
        let h2 = table.wait_for_lock(path("b")).await;
        table.release(h1).unwrap();
        table.release(h2).unwrap();
    }
}
