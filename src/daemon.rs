//! Daemon module - main event loop
//!
//! Everything that changes playback goes through one `tokio::select!` loop,
//! so hotkeys, settings reloads and shutdown are handled strictly one after
//! another.
//!
//! The CLI never talks to the daemon directly. It edits the JSON files and
//! the daemon notices through a filesystem watcher.

use crate::audio::{self, Player, SoundBackend};
use crate::config::{Config, LibraryPaths};
use crate::error::{MurmurError, Result};
use crate::hotkey::matcher::{HotkeyMatcher, MatchOutcome};
use crate::hotkey::{self, HotkeyAction, KeyEvent};
use crate::library::PresetLibrary;
use crate::settings::hotkeys::HotkeyBindings;
use crate::settings::SettingsFile;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use pidlock::Pidlock;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Quiet period after the last file event before reloading
const RELOAD_DEBOUNCE: Duration = Duration::from_millis(200);

/// Whether a process with this pid exists
#[cfg(unix)]
pub fn process_alive(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    // 0 and negative values address process groups
    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    if raw <= 0 {
        return false;
    }
    match kill(Pid::from_raw(raw), None) {
        Ok(()) | Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
pub fn process_alive(_pid: u32) -> bool {
    true
}

/// The pid written to a lock or marker file
fn read_pid(path: &Path) -> Option<u32> {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|contents| contents.trim().parse().ok())
}

/// What the lock file says about the daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonStatus {
    Running(u32),
    /// The lock names a process that no longer exists
    StaleLock(u32),
    Stopped,
}

pub fn daemon_status(lock_path: &Path) -> DaemonStatus {
    match read_pid(lock_path) {
        Some(pid) if process_alive(pid) => DaemonStatus::Running(pid),
        Some(pid) => DaemonStatus::StaleLock(pid),
        None => DaemonStatus::Stopped,
    }
}

/// Marks a hotkey capture in progress for as long as it is held.
///
/// `murmur hotkey capture` records keys in its own process. A running daemon
/// sees the same keys, so it checks this marker and ignores its bindings
/// while a live process holds it.
#[derive(Debug)]
pub struct CaptureMarker {
    path: PathBuf,
}

impl CaptureMarker {
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, std::process::id().to_string())?;
        tracing::debug!("Created capture marker {:?}", path);
        Ok(Self { path })
    }
}

impl Drop for CaptureMarker {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!("Failed to remove capture marker {:?}: {}", self.path, e);
        }
    }
}

/// Whether a live process holds the capture marker at `path`
pub fn capture_in_progress(path: &Path) -> bool {
    read_pid(path).is_some_and(process_alive)
}

/// Take the single-instance lock
fn acquire_lock() -> Result<Pidlock> {
    let lock_path = Config::lock_path();
    if let Some(parent) = lock_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if let DaemonStatus::StaleLock(pid) = daemon_status(&lock_path) {
        tracing::warn!("Removing stale lock left by pid {}", pid);
        std::fs::remove_file(&lock_path)?;
    }

    let mut lock = Pidlock::new(&lock_path.to_string_lossy());
    lock.acquire().map_err(|_| {
        MurmurError::Config(format!(
            "Another murmur daemon is already running (lock: {:?})",
            lock_path
        ))
    })?;
    tracing::debug!("Acquired daemon lock {:?}", lock_path);
    Ok(lock)
}

/// Resolves on Ctrl-C, or SIGTERM on unix
async fn shutdown_signal() -> &'static str {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => "SIGINT",
                    _ = sigterm.recv() => "SIGTERM",
                }
            }
            Err(e) => {
                tracing::warn!("Failed to set up SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
                "SIGINT"
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        "Ctrl-C"
    }
}

/// Whether a watcher event concerns one of our JSON files
fn is_settings_event(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) && event
        .paths
        .iter()
        .any(|path| path.extension().is_some_and(|ext| ext == "json"))
}

/// Watch the data and presets directories, sending a tick for each relevant
/// change
fn watch_settings(paths: &LibraryPaths) -> Result<(RecommendedWatcher, mpsc::Receiver<()>)> {
    let (tx, rx) = mpsc::channel(16);
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) if is_settings_event(&event) => {
                // A full queue already guarantees a reload
                let _ = tx.try_send(());
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("Watch error: {:?}", e),
        },
        notify::Config::default(),
    )
    .map_err(|e| MurmurError::Config(format!("Failed to start file watcher: {}", e)))?;

    let mut dirs = vec![paths.data_dir.as_path(), paths.presets_dir.as_path()];
    dirs.dedup();
    for dir in dirs {
        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|e| MurmurError::Config(format!("Failed to watch {:?}: {}", dir, e)))?;
        tracing::debug!("Watching {:?}", dir);
    }

    Ok((watcher, rx))
}

/// Completes at the reload deadline, or never when none is set
async fn reload_due(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// State shared by every loop iteration
pub struct Session<B: SoundBackend> {
    library: PresetLibrary,
    matcher: HotkeyMatcher,
    player: Option<Player<B>>,
    capture_marker: Option<PathBuf>,
    reload_at: Option<Instant>,
}

impl<B: SoundBackend> Session<B> {
    pub fn new(library: PresetLibrary, bindings: HotkeyBindings, player: Option<Player<B>>) -> Self {
        Self {
            library,
            matcher: HotkeyMatcher::new(bindings),
            player,
            capture_marker: None,
            reload_at: None,
        }
    }

    /// Ignore bindings while a capture marker exists at `path`
    pub fn with_capture_marker(mut self, path: impl Into<PathBuf>) -> Self {
        self.capture_marker = Some(path.into());
        self
    }

    pub fn library(&self) -> &PresetLibrary {
        &self.library
    }

    pub fn player(&self) -> Option<&Player<B>> {
        self.player.as_ref()
    }

    /// Make the player match the current preset
    pub fn sync(&mut self) {
        let Some(player) = self.player.as_mut() else {
            return;
        };
        match self.library.current() {
            Ok(preset) => {
                for (sound, e) in player.sync(preset) {
                    tracing::error!("Cannot play {} from {}: {}", sound, preset.name, e);
                }
            }
            Err(e) => tracing::error!("{}", e),
        }
    }

    /// Run one key event through the matcher and act on the result
    pub fn handle_key(&mut self, event: &KeyEvent) -> Option<HotkeyAction> {
        match self.matcher.handle(event)? {
            MatchOutcome::Triggered(action) => {
                if self.capture_marker.as_deref().is_some_and(capture_in_progress) {
                    tracing::debug!("Hotkey capture in progress, ignoring {}", action);
                    return None;
                }
                // Saving over an edit the watcher has not delivered yet would lose it
                if self.reload_at.is_some() {
                    self.reload();
                }
                self.apply(action);
                Some(action)
            }
            outcome => {
                tracing::debug!("Ignoring {:?}", outcome);
                None
            }
        }
    }

    /// Perform a hotkey action on the library
    pub fn apply(&mut self, action: HotkeyAction) {
        let result = match action {
            HotkeyAction::Next => self.library.next_preset().map(|name| {
                tracing::info!("Next preset: {}", name);
            }),
            HotkeyAction::Previous => self.library.previous_preset().map(|name| {
                tracing::info!("Previous preset: {}", name);
            }),
            HotkeyAction::Mute => {
                let name = self.library.current_name().to_string();
                self.library.toggle_mute(&name).map(|mute| {
                    tracing::info!("{} {}", if mute { "Muted" } else { "Unmuted" }, name);
                })
            }
        };

        match result {
            Ok(()) => self.sync(),
            Err(e) => tracing::warn!("Hotkey '{}' failed: {}", action, e),
        }
    }

    /// Note a file event and push the reload back by the debounce period
    pub fn settings_changed(&mut self) {
        self.reload_at = Some(Instant::now() + RELOAD_DEBOUNCE);
    }

    /// When the pending reload is due, if one is pending
    pub fn reload_deadline(&self) -> Option<Instant> {
        self.reload_at
    }

    /// Re-read the library and hotkey files after an external edit
    pub fn reload(&mut self) {
        self.reload_at = None;
        if let Err(e) = self.library.reload() {
            tracing::warn!("Keeping previous presets, reload failed: {}", e);
        }

        match SettingsFile::<HotkeyBindings>::load(&self.library.paths().hotkeys_file) {
            Ok(bindings) => {
                if &*bindings != self.matcher.bindings() {
                    tracing::info!(
                        "Hotkeys: next={} previous={} mute={}",
                        bindings.next,
                        bindings.previous,
                        bindings.mute
                    );
                }
                self.matcher.set_bindings(bindings.into_inner());
            }
            Err(e) => tracing::warn!("Keeping previous hotkeys, reload failed: {}", e),
        }

        self.sync();
    }

    pub fn stop(&mut self) {
        if let Some(player) = self.player.as_mut() {
            player.stop_all();
        }
    }
}

/// Main daemon that ties the listener, watcher and player together
pub struct Daemon {
    config: Config,
}

impl Daemon {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run the daemon main loop
    pub async fn run(&mut self) -> Result<()> {
        tracing::info!("Starting murmur daemon");

        let mut lock = acquire_lock()?;
        let result = self.run_locked().await;
        if let Err(e) = lock.release() {
            tracing::warn!("Failed to release daemon lock: {:?}", e);
        }
        result
    }

    async fn run_locked(&mut self) -> Result<()> {
        let paths = self.config.library_paths();
        let library = PresetLibrary::open(paths.clone())?;
        tracing::info!("Data directory: {:?}", paths.data_dir);

        let bindings =
            SettingsFile::open_or_create(&paths.hotkeys_file, HotkeyBindings::default)?.into_inner();

        let player = if self.config.audio.enabled {
            Some(audio::create_player(&self.config.audio)?)
        } else {
            tracing::info!("Audio disabled, presets will be tracked but not played");
            None
        };

        let mut session =
            Session::new(library, bindings, player).with_capture_marker(Config::capture_marker_path());
        session.sync();
        tracing::info!("Playing preset: {}", session.library().current_name());

        let (_watcher, mut file_rx) = watch_settings(&paths)?;

        let mut hotkey_listener = if self.config.hotkeys.enabled {
            Some(hotkey::create_listener())
        } else {
            tracing::info!("Built-in hotkeys disabled, use 'murmur preset next' and friends");
            None
        };
        let mut hotkey_rx = match hotkey_listener {
            Some(ref mut listener) => Some(listener.start().await?),
            None => None,
        };
        if hotkey_rx.is_some() {
            let bindings = session.matcher.bindings();
            tracing::info!(
                "Listening for hotkeys: next={} previous={} mute={}",
                bindings.next,
                bindings.previous,
                bindings.mute
            );
        }

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            let deadline = session.reload_deadline();
            tokio::select! {
                Some(event) = async {
                    match &mut hotkey_rx {
                        Some(rx) => rx.recv().await,
                        None => std::future::pending().await,
                    }
                } => {
                    session.handle_key(&event);
                }

                Some(()) = file_rx.recv() => {
                    session.settings_changed();
                }

                _ = reload_due(deadline) => {
                    tracing::debug!("Settings changed on disk, reloading");
                    session.reload();
                }

                signal = &mut shutdown => {
                    tracing::info!("Received {}, shutting down...", signal);
                    break;
                }
            }
        }

        session.stop();
        if let Some(mut listener) = hotkey_listener {
            listener.stop().await?;
        }

        tracing::info!("Daemon stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::fake::FakeBackend;
    use crate::hotkey::keys::KeyName;
    use tempfile::TempDir;

    fn session() -> (TempDir, Session<FakeBackend>) {
        let dir = tempfile::tempdir().unwrap();
        let paths = LibraryPaths::under(dir.path());
        let mut library = PresetLibrary::open(paths).unwrap();
        library.add_preset("Rain", None).unwrap();

        let sound = dir.path().join("sounds/rain.ogg");
        std::fs::write(&sound, b"OggS").unwrap();
        library.add_sound("Rain", &sound).unwrap();

        let player = Player::new(FakeBackend::default(), 8);
        (
            dir,
            Session::new(library, HotkeyBindings::default(), Some(player)),
        )
    }

    fn press(session: &mut Session<FakeBackend>, name: &str) -> Option<HotkeyAction> {
        let key = KeyName::parse(name).unwrap();
        let action = session.handle_key(&KeyEvent::Pressed(key.clone()));
        session.handle_key(&KeyEvent::Released(key));
        action
    }

    fn loaded(session: &Session<FakeBackend>) -> Vec<String> {
        session
            .player()
            .unwrap()
            .loaded()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_settings_event_filter() {
        let json = Event::new(EventKind::Modify(notify::event::ModifyKind::Any))
            .add_path("/data/presets_settings.json".into());
        assert!(is_settings_event(&json));

        let tmp = Event::new(EventKind::Create(notify::event::CreateKind::File))
            .add_path("/data/.tmpXYZ".into());
        assert!(!is_settings_event(&tmp));

        let access = Event::new(EventKind::Access(notify::event::AccessKind::Any))
            .add_path("/data/hotkey_settings.json".into());
        assert!(!is_settings_event(&access));
    }

    #[test]
    fn test_hotkeys_cycle_and_sync() {
        let (_dir, mut session) = session();
        session.sync();
        assert!(loaded(&session).is_empty());

        assert_eq!(press(&mut session, "Up"), Some(HotkeyAction::Next));
        assert_eq!(session.library().current_name(), "Rain");
        assert_eq!(loaded(&session), ["rain.ogg"]);

        assert_eq!(press(&mut session, "Down"), Some(HotkeyAction::Previous));
        assert_eq!(session.library().current_name(), "Preset_0");
        assert!(loaded(&session).is_empty());
    }

    #[test]
    fn test_mute_hotkey_toggles_current_preset() {
        let (_dir, mut session) = session();
        assert!(session.library().current().unwrap().mute);
        assert_eq!(press(&mut session, "Left"), Some(HotkeyAction::Mute));
        assert!(!session.library().current().unwrap().mute);
    }

    #[test]
    fn test_unbound_key_does_nothing() {
        let (_dir, mut session) = session();
        assert_eq!(press(&mut session, "Right"), None);
        assert_eq!(session.library().current_name(), "Preset_0");
    }

    #[test]
    fn test_reload_picks_up_cli_edits() {
        let (dir, mut session) = session();
        let paths = LibraryPaths::under(dir.path());

        // Another process edits the files
        let mut cli = PresetLibrary::open(paths.clone()).unwrap();
        cli.set_current_preset("Rain").unwrap();
        let mut hotkeys =
            SettingsFile::open_or_create(&paths.hotkeys_file, HotkeyBindings::default).unwrap();
        hotkeys
            .set_hotkey(HotkeyAction::Next, "F8".parse().unwrap())
            .unwrap();
        hotkeys.save().unwrap();

        session.reload();
        assert_eq!(session.library().current_name(), "Rain");
        assert_eq!(loaded(&session), ["rain.ogg"]);

        assert_eq!(press(&mut session, "F8"), Some(HotkeyAction::Next));
        assert_eq!(press(&mut session, "Up"), None);
    }

    #[test]
    fn test_reload_keeps_state_on_corrupt_files() {
        let (dir, mut session) = session();
        let paths = LibraryPaths::under(dir.path());
        std::fs::write(&paths.library_file, "{").unwrap();
        std::fs::write(&paths.hotkeys_file, "nonsense").unwrap();

        session.reload();
        assert_eq!(session.library().current_name(), "Preset_0");
        assert_eq!(press(&mut session, "Up"), Some(HotkeyAction::Next));
    }

    #[test]
    fn test_stop_releases_voices() {
        let (_dir, mut session) = session();
        press(&mut session, "Up");
        session.stop();
        assert!(session.player().unwrap().is_empty());
    }

    #[test]
    fn test_daemon_status() {
        let dir = tempfile::tempdir().unwrap();
        let lock = dir.path().join("murmur.lock");
        assert_eq!(daemon_status(&lock), DaemonStatus::Stopped);

        let pid = std::process::id();
        std::fs::write(&lock, pid.to_string()).unwrap();
        assert_eq!(daemon_status(&lock), DaemonStatus::Running(pid));

        std::fs::write(&lock, "garbage").unwrap();
        assert_eq!(daemon_status(&lock), DaemonStatus::Stopped);
    }

    #[cfg(unix)]
    #[test]
    fn test_daemon_status_reports_stale_lock() {
        let dir = tempfile::tempdir().unwrap();
        let lock = dir.path().join("murmur.lock");
        // Above any Linux pid_max
        std::fs::write(&lock, "99999999").unwrap();
        assert_eq!(daemon_status(&lock), DaemonStatus::StaleLock(99999999));
        assert!(!process_alive(0));
    }

    #[test]
    fn test_capture_marker_suspends_hotkeys() {
        let (dir, session) = session();
        let marker_path = dir.path().join("murmur.capture");
        let mut session = session.with_capture_marker(&marker_path);

        let marker = CaptureMarker::create(&marker_path).unwrap();
        assert_eq!(press(&mut session, "Left"), None);
        assert_eq!(press(&mut session, "Up"), None);
        assert!(session.library().current().unwrap().mute);
        assert_eq!(session.library().current_name(), "Preset_0");

        drop(marker);
        assert!(!marker_path.exists());
        assert_eq!(press(&mut session, "Left"), Some(HotkeyAction::Mute));
        assert!(!session.library().current().unwrap().mute);
    }

    #[cfg(unix)]
    #[test]
    fn test_stale_capture_marker_is_ignored() {
        let (dir, session) = session();
        let marker_path = dir.path().join("murmur.capture");
        std::fs::write(&marker_path, "99999999").unwrap();
        let mut session = session.with_capture_marker(&marker_path);

        assert_eq!(press(&mut session, "Up"), Some(HotkeyAction::Next));
    }

    #[test]
    fn test_hotkey_applies_pending_edits_first() {
        let (dir, mut session) = session();
        let paths = LibraryPaths::under(dir.path());

        let mut cli = PresetLibrary::open(paths.clone()).unwrap();
        cli.add_preset("Cafe", None).unwrap();
        session.settings_changed();

        assert_eq!(press(&mut session, "Up"), Some(HotkeyAction::Next));
        assert_eq!(session.library().current_name(), "Rain");
        assert!(session.reload_deadline().is_none());

        let on_disk = SettingsFile::<crate::settings::library::LibrarySettings>::load(
            &paths.library_file,
        )
        .unwrap();
        assert_eq!(on_disk.presets_order, ["Preset_0", "Rain", "Cafe"]);
        assert_eq!(on_disk.current_preset, "Rain");
    }

    #[tokio::test(start_paused = true)]
    async fn test_reload_waits_for_quiet_period() {
        let (_dir, mut session) = session();
        assert!(session.reload_deadline().is_none());
        assert!(
            tokio::time::timeout(Duration::from_secs(1), reload_due(None))
                .await
                .is_err()
        );

        session.settings_changed();
        tokio::time::advance(Duration::from_millis(150)).await;
        // A second event restarts the wait
        session.settings_changed();
        let deadline = session.reload_deadline().unwrap();

        assert!(
            tokio::time::timeout(Duration::from_millis(199), reload_due(Some(deadline)))
                .await
                .is_err()
        );
        assert!(
            tokio::time::timeout(Duration::from_millis(2), reload_due(Some(deadline)))
                .await
                .is_ok()
        );

        session.reload();
        assert!(session.reload_deadline().is_none());
    }
}
