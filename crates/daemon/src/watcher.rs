//! Filesystem watcher translating OS events into sync-relevant changes.
//!
//! Generalizes the debounced, channel-fed watcher idiom (watch once, poll/drain a
//! channel of coalesced changes) to continuous async consumption: a background
//! task drains raw `notify` events into a short debounce window per path, then
//! forwards one coalesced [`WatchEvent`] per path per window to an async receiver.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use vaultsync_core::path::RelativePath;

const DEBOUNCE_WINDOW: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Created(RelativePath),
    Modified(RelativePath),
    Removed(RelativePath),
    Renamed { from: RelativePath, to: RelativePath },
}

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("failed to watch vault root: {0}")]
    Init(String),
}

/// Watches `root` recursively and yields coalesced, debounced [`WatchEvent`]s.
pub struct VaultWatcher {
    events_rx: mpsc::UnboundedReceiver<WatchEvent>,
    _watcher: RecommendedWatcher,
}

impl VaultWatcher {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, WatchError> {
        let root = root.into();
        let (raw_tx, raw_rx) = mpsc::unbounded_channel::<Event>();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                if let Ok(event) = res {
                    let _ = raw_tx.send(event);
                }
            },
            notify::Config::default(),
        )
        .map_err(|e| WatchError::Init(e.to_string()))?;

        if root.exists() {
            watcher.watch(&root, RecursiveMode::Recursive).map_err(|e| WatchError::Init(e.to_string()))?;
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        tokio::spawn(debounce_loop(root, raw_rx, events_tx));

        Ok(Self { events_rx, _watcher: watcher })
    }

    /// Awaits the next coalesced event. Returns `None` once the watcher is dropped.
    pub async fn recv(&mut self) -> Option<WatchEvent> {
        self.events_rx.recv().await
    }
}

/// Pending change state for a single path within the current debounce window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingKind {
    Created,
    Modified,
    Removed,
}

async fn debounce_loop(root: PathBuf, mut raw_rx: mpsc::UnboundedReceiver<Event>, events_tx: mpsc::UnboundedSender<WatchEvent>) {
    let mut pending: HashMap<RelativePath, PendingKind> = HashMap::new();
    let mut ticker = tokio::time::interval(DEBOUNCE_WINDOW);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            event = raw_rx.recv() => {
                match event {
                    Some(event) => {
                        // A two-path rename event carries definitive old/new paths and is
                        // forwarded immediately rather than folded into the debounce map,
                        // which can only track one pending kind per path.
                        if let Some((from, to)) = rename_paths(&root, &event) {
                            pending.remove(&from);
                            pending.remove(&to);
                            if events_tx.send(WatchEvent::Renamed { from, to }).is_err() {
                                break;
                            }
                        } else {
                            classify_into(&root, event, &mut pending);
                        }
                    }
                    None => break,
                }
            }
            _ = ticker.tick() => {
                for (path, kind) in pending.drain() {
                    let mapped = match kind {
                        PendingKind::Created => WatchEvent::Created(path),
                        PendingKind::Modified => WatchEvent::Modified(path),
                        PendingKind::Removed => WatchEvent::Removed(path),
                    };
                    if events_tx.send(mapped).is_err() {
                        return;
                    }
                }
            }
        }
    }
}

/// Renames arrive from `notify` as a two-path event on platforms that support it
/// (`RenameMode::Both`); elsewhere they surface as a separate remove + create,
/// which the debounce window coalesces into independent events instead.
fn rename_paths(root: &Path, event: &Event) -> Option<(RelativePath, RelativePath)> {
    if event.paths.len() != 2 {
        return None;
    }
    if !matches!(event.kind, EventKind::Modify(notify::event::ModifyKind::Name(notify::event::RenameMode::Both))) {
        return None;
    }
    let from = to_relative(root, &event.paths[0])?;
    let to = to_relative(root, &event.paths[1])?;
    Some((from, to))
}

fn classify_into(root: &Path, event: Event, pending: &mut HashMap<RelativePath, PendingKind>) {
    let kind = match event.kind {
        EventKind::Create(_) => PendingKind::Created,
        EventKind::Modify(_) => PendingKind::Modified,
        EventKind::Remove(_) => PendingKind::Removed,
        _ => return,
    };

    for raw_path in event.paths {
        if let Some(relative) = to_relative(root, &raw_path) {
            pending
                .entry(relative)
                .and_modify(|existing| {
                    // A later remove always wins; otherwise keep the earliest non-remove kind.
                    if kind == PendingKind::Removed {
                        *existing = PendingKind::Removed;
                    }
                })
                .or_insert(kind);
        }
    }
}

fn to_relative(root: &Path, path: &Path) -> Option<RelativePath> {
    let relative = path.strip_prefix(root).ok()?;
    let s = relative.to_str()?.replace(std::path::MAIN_SEPARATOR, "/");
    RelativePath::new(s).ok()
}
