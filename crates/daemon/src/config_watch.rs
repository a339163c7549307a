//! Watches a single config file for changes, debounced the same way
//! [`crate::watcher::VaultWatcher`] debounces vault events.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

const DEBOUNCE_WINDOW: Duration = Duration::from_millis(300);

/// Fires once, debounced, per burst of writes to the watched file. Carries no
/// payload; the receiver re-reads the file itself.
pub struct ConfigWatcher {
    events_rx: mpsc::UnboundedReceiver<()>,
    _watcher: Option<RecommendedWatcher>,
}

impl ConfigWatcher {
    /// Watches `path`'s parent directory (the file itself may not exist yet, and
    /// editors commonly replace it via rename-into-place rather than in-place write).
    /// If neither the file nor its parent directory exists, returns a watcher that
    /// never fires rather than erroring, since a config file is always optional.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let Some(parent) = path.parent().filter(|p| p.exists()) else {
            let (_tx, events_rx) = mpsc::unbounded_channel();
            return Self { events_rx, _watcher: None };
        };

        let (raw_tx, mut raw_rx) = mpsc::unbounded_channel::<notify::Event>();
        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| {
                if let Ok(event) = res {
                    let _ = raw_tx.send(event);
                }
            },
            notify::Config::default(),
        )
        .ok();

        let mut watcher = watcher;
        if let Some(w) = watcher.as_mut() {
            if w.watch(parent, RecursiveMode::NonRecursive).is_err() {
                watcher = None;
            }
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let target = path;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(DEBOUNCE_WINDOW);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            let mut dirty = false;
            loop {
                tokio::select! {
                    event = raw_rx.recv() => {
                        match event {
                            Some(event) if touches(&event, &target) => dirty = true,
                            Some(_) => {}
                            None => break,
                        }
                    }
                    _ = ticker.tick() => {
                        if dirty {
                            dirty = false;
                            if events_tx.send(()).is_err() {
                                break;
                            }
                        }
                    }
                }
            }
        });

        Self { events_rx, _watcher: watcher }
    }

    /// Awaits the next debounced change notification. Never resolves if the config
    /// file's directory did not exist at construction time.
    pub async fn recv(&mut self) -> Option<()> {
        self.events_rx.recv().await
    }
}

fn touches(event: &notify::Event, target: &Path) -> bool {
    event.paths.iter().any(|p| p == target)
}
