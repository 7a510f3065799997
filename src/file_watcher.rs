//! Restart the game whenever the spec file on disk changes.

use std::path::{Path, PathBuf};

use bevy::prelude::*;
use crossbeam_channel::{Receiver, Sender};
use notify::{Event as NotifyEvent, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::scene::{PendingSpec, StartOptions};
use crate::spec::GameSpec;

pub struct FileWatcherPlugin {
    pub spec_path: PathBuf,
    /// Options every reload is started with.
    pub options: StartOptions,
}

/// Raw contents of the spec file after a change.
pub struct SpecChanged(pub String);

#[derive(Resource)]
pub struct FileWatcherReceiver(pub Receiver<SpecChanged>);

#[derive(Resource, Clone)]
struct ReloadOptions(StartOptions);

impl Plugin for FileWatcherPlugin {
    fn build(&self, app: &mut App) {
        let (tx, rx) = crossbeam_channel::unbounded::<SpecChanged>();
        app.insert_resource(FileWatcherReceiver(rx))
            .insert_resource(ReloadOptions(self.options.clone()))
            .add_systems(Update, process_spec_changes);

        let spec_path = self.spec_path.clone();
        std::thread::spawn(move || {
            run_watcher(tx, spec_path);
        });
    }
}

fn run_watcher(tx: Sender<SpecChanged>, spec_path: PathBuf) {
    let watched = spec_path.clone();
    let mut watcher: RecommendedWatcher =
        match notify::recommended_watcher(move |res: Result<NotifyEvent, notify::Error>| {
            if let Ok(event) = res {
                handle_fs_event(event, &tx, &watched);
            }
        }) {
            Ok(w) => w,
            Err(e) => {
                eprintln!("[Playspec FileWatcher] Failed to create watcher: {e}");
                return;
            }
        };

    // notify needs a directory to see editors that replace the file on save
    let dir = match spec_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if let Err(e) = watcher.watch(&dir, RecursiveMode::NonRecursive) {
        eprintln!("[Playspec FileWatcher] Failed to watch {}: {e}", dir.display());
        return;
    }
    println!("[Playspec FileWatcher] Watching spec: {}", spec_path.display());

    // The watcher stops when dropped.
    loop {
        std::thread::sleep(std::time::Duration::from_secs(60));
    }
}

fn handle_fs_event(event: NotifyEvent, tx: &Sender<SpecChanged>, spec_path: &Path) {
    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
        return;
    }
    if !event.paths.iter().any(|p| path_matches(p, spec_path)) {
        return;
    }
    if let Ok(content) = std::fs::read_to_string(spec_path) {
        let _ = tx.send(SpecChanged(content));
    }
}

fn path_matches(a: &Path, b: &Path) -> bool {
    let ca = std::fs::canonicalize(a).unwrap_or_else(|_| a.to_path_buf());
    let cb = std::fs::canonicalize(b).unwrap_or_else(|_| b.to_path_buf());
    ca == cb
}

fn process_spec_changes(
    mut commands: Commands,
    watcher: Option<Res<FileWatcherReceiver>>,
    options: Option<Res<ReloadOptions>>,
) {
    let Some(watcher) = watcher else { return };

    // A single save often arrives as several events. Only the newest matters.
    let Some(SpecChanged(content)) = watcher.0.try_iter().take(16).last() else {
        return;
    };
    println!("[Playspec FileWatcher] Spec changed, reloading...");
    match GameSpec::from_json(&content) {
        Ok(spec) => {
            commands.insert_resource(PendingSpec {
                spec,
                options: options.map(|o| o.0.clone()).unwrap_or_default(),
            });
        }
        Err(e) => {
            eprintln!("[Playspec FileWatcher] Spec parse error, keeping current game: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::fixtures::{rect, spec_with};
    use crate::spec::CustomLogic;

    fn watcher_app() -> (App, Sender<SpecChanged>) {
        let (tx, rx) = crossbeam_channel::unbounded::<SpecChanged>();
        let mut app = App::new();
        app.insert_resource(FileWatcherReceiver(rx))
            .insert_resource(ReloadOptions(StartOptions {
                scene: None,
                seed: Some(5),
            }))
            .add_systems(Update, process_spec_changes);
        (app, tx)
    }

    #[test]
    fn newest_valid_change_becomes_pending() {
        let (mut app, tx) = watcher_app();
        let mut first = spec_with(vec![rect("a", 0.0, 0.0)], CustomLogic::default());
        first.title = "first".to_string();
        let mut second = first.clone();
        second.title = "second".to_string();
        for spec in [first, second] {
            let json = serde_json::to_string(&spec).expect("serialize");
            tx.send(SpecChanged(json)).expect("send");
        }

        app.update();

        let pending = app.world().resource::<PendingSpec>();
        assert_eq!(pending.spec.title, "second");
        assert_eq!(pending.options.seed, Some(5));
    }

    #[test]
    fn broken_spec_is_ignored() {
        let (mut app, tx) = watcher_app();
        tx.send(SpecChanged("{ \"title\": ".to_string()))
            .expect("send");
        app.update();
        assert!(app.world().get_resource::<PendingSpec>().is_none());
    }
}
