//! Murmur - looping ambient-noise mixer
//!
//! Run with `murmur` or `murmur daemon` to start the daemon.
//! Use `murmur preset`, `murmur sound` and `murmur group` to edit presets.
//! Use `murmur hotkey capture <action>` to rebind a hotkey.

use clap::Parser;
use murmur::cli::{GroupAction, HotkeyCommand, PresetAction, SoundAction};
use murmur::config::{self, Config};
use murmur::daemon::{self, CaptureMarker, DaemonStatus};
use murmur::error::HotkeyError;
use murmur::hotkey::{self, HotkeyAction};
use murmur::settings::hotkeys::HotkeyBindings;
use murmur::settings::SettingsFile;
use murmur::{Cli, Commands, PresetLibrary};
use std::fs::OpenOptions;
use std::sync::Mutex;
use std::time::Duration;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let file_layer = match cli.log_file {
        Some(ref path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("murmur={},warn", log_level))),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .init();

    // Load configuration
    let mut config = config::load_config(cli.config.as_deref())?;

    // Apply CLI overrides
    if let Some(dir) = cli.data_dir {
        config.library.data_dir = Some(dir);
    }

    // Run the appropriate command
    match cli.command.unwrap_or(Commands::Daemon) {
        Commands::Daemon => {
            if cli.config.is_none() {
                if let Some(path) = Config::default_path() {
                    if config::write_default_config(&path)? {
                        tracing::info!("Wrote default config to {:?}", path);
                    }
                }
            }
            let mut daemon = murmur::Daemon::new(config);
            daemon.run().await?;
        }

        Commands::Status => {
            show_status(&config)?;
        }

        Commands::Config => {
            show_config(&config)?;
        }

        Commands::Preset { action } => {
            let mut library = PresetLibrary::open(config.library_paths())?;
            run_preset(&mut library, action)?;
        }

        Commands::Sound { action, preset } => {
            let mut library = PresetLibrary::open(config.library_paths())?;
            let preset = preset.unwrap_or_else(|| library.current_name().to_string());
            run_sound(&mut library, &preset, action)?;
        }

        Commands::Group { action } => {
            let mut library = PresetLibrary::open(config.library_paths())?;
            run_group(&mut library, action)?;
        }

        Commands::Hotkey { action } => {
            run_hotkey(&config, action).await?;
        }
    }

    Ok(())
}

/// Format a 0.0..=1.0 gain as a percentage
fn percent(volume: f32) -> String {
    format!("{:>3.0}%", volume * 100.0)
}

fn mute_label(mute: bool) -> &'static str {
    if mute {
        "muted"
    } else {
        "on"
    }
}

fn run_preset(library: &mut PresetLibrary, action: PresetAction) -> anyhow::Result<()> {
    match action {
        PresetAction::List => {
            let current = library.current_name().to_string();
            for preset in library.presets() {
                let marker = if preset.name == current { "*" } else { " " };
                println!(
                    "{} {:<24} volume {:>3}  {:<5}  {} sounds",
                    marker,
                    preset.name,
                    preset.volume,
                    mute_label(preset.mute),
                    preset.sounds.len()
                );
            }
        }
        PresetAction::Select { name } => {
            library.set_current_preset(&name)?;
            println!("Current preset: {}", name);
        }
        PresetAction::Next => {
            println!("Current preset: {}", library.next_preset()?);
        }
        PresetAction::Previous => {
            println!("Current preset: {}", library.previous_preset()?);
        }
        PresetAction::Add { name, after } => {
            library.add_preset(&name, after.as_deref())?;
            println!("Added preset {}", name);
        }
        PresetAction::Remove { name } => {
            library.remove_preset(&name)?;
            println!("Removed preset {}", name);
        }
        PresetAction::Rename { old, new } => {
            library.rename_preset(&old, &new)?;
            println!("Renamed {} to {}", old, new);
        }
        PresetAction::Move { name, after } => {
            library.move_preset(&name, after.as_deref())?;
            let order = &library.settings().presets_order;
            println!("Order: {}", order.join(", "));
        }
        PresetAction::Volume { volume, name } => {
            let name = name.unwrap_or_else(|| library.current_name().to_string());
            library.set_preset_volume(&name, volume)?;
            println!("{} volume: {}", name, volume);
        }
        PresetAction::Mute { state, name } => {
            let name = name.unwrap_or_else(|| library.current_name().to_string());
            let current = library.preset(&name)?.mute;
            let mute = library.set_preset_mute(&name, state.apply(current))?;
            println!("{}: {}", name, mute_label(mute));
        }
    }
    Ok(())
}

fn run_sound(library: &mut PresetLibrary, preset: &str, action: SoundAction) -> anyhow::Result<()> {
    match action {
        SoundAction::List => {
            let p = library.preset(preset)?;
            if p.sounds.is_empty() {
                println!("{} has no sounds. Add one with: murmur sound add <file>", preset);
            }
            for (name, sound) in &p.sounds {
                println!(
                    "{:<24} volume {:>3}  {:<5}  {}",
                    name,
                    sound.volume,
                    mute_label(sound.mute),
                    sound.path.display()
                );
            }
        }
        SoundAction::Add { files } => {
            for name in library.add_sounds(preset, &files)? {
                println!("Added {} to {} (muted, volume 50)", name, preset);
            }
        }
        SoundAction::Remove { sound } => {
            library.remove_sound(preset, &sound)?;
            println!("Removed {} from {}", sound, preset);
        }
        SoundAction::Volume { sound, volume } => {
            library.set_sound_volume(preset, &sound, volume)?;
            println!("{} volume: {}", sound, volume);
        }
        SoundAction::Mute { sound, state } => {
            let current = library
                .preset(preset)?
                .sounds
                .get(&sound)
                .map(|s| s.mute)
                .unwrap_or(false);
            let mute = library.set_sound_mute(preset, &sound, state.apply(current))?;
            println!("{}: {}", sound, mute_label(mute));
        }
    }
    Ok(())
}

fn run_group(library: &mut PresetLibrary, action: GroupAction) -> anyhow::Result<()> {
    match action {
        GroupAction::List => {
            let groups = &library.settings().groups;
            if groups.groups_order.is_empty() {
                println!("No groups. Create one with: murmur group create <name> <presets...>");
            }
            for name in &groups.groups_order {
                let marker = if groups.current_group.as_deref() == Some(name.as_str()) {
                    "*"
                } else {
                    " "
                };
                let members = groups.members(name).unwrap_or_default();
                println!("{} {:<16} {}", marker, name, members.join(", "));
            }
        }
        GroupAction::Create { name, presets } => {
            library.create_group(&name, presets)?;
            println!("Created group {}", name);
        }
        GroupAction::Remove { name } => {
            library.remove_group(&name)?;
            println!("Removed group {}", name);
        }
        GroupAction::Select { name } => {
            library.set_current_group(Some(&name))?;
            println!("Cycling through group {}", name);
        }
        GroupAction::Clear => {
            library.set_current_group(None)?;
            println!("Cycling through all presets");
        }
        GroupAction::Rename { old, new } => {
            library.rename_group(&old, &new)?;
            println!("Renamed group {} to {}", old, new);
        }
        GroupAction::Move { name, after } => {
            library.move_group(&name, after.as_deref())?;
            println!("Order: {}", library.settings().groups.groups_order.join(", "));
        }
    }
    Ok(())
}

fn print_bindings(bindings: &HotkeyBindings) {
    for action in HotkeyAction::ALL {
        println!("  {:<9} {}", action, bindings.get(action));
    }
}

async fn run_hotkey(config: &Config, action: HotkeyCommand) -> anyhow::Result<()> {
    let paths = config.library_paths();
    paths.ensure_directories()?;
    let mut bindings = SettingsFile::open_or_create(&paths.hotkeys_file, HotkeyBindings::default)?;

    match action {
        HotkeyCommand::Show => {
            println!("Hotkeys ({}):", paths.hotkeys_file.display());
            print_bindings(&bindings);
        }
        HotkeyCommand::Set { action, combo } => {
            let action: HotkeyAction = action.parse()?;
            bindings.set_hotkey(action, combo.parse()?)?;
            bindings.save()?;
            println!("{} = {}", action, bindings.get(action));
        }
        HotkeyCommand::Capture { action } => {
            let action: HotkeyAction = action.parse()?;
            let timeout = Duration::from_secs(config.hotkeys.capture_timeout_secs);

            // Keeps a running daemon from acting on the keys typed here
            let marker = CaptureMarker::create(Config::capture_marker_path())?;
            let mut listener = hotkey::create_listener();
            let mut events = listener.start().await?;
            println!(
                "Press the new combination for '{}' (Escape cancels, {}s timeout)...",
                action,
                timeout.as_secs()
            );
            let captured = tokio::select! {
                result = hotkey::capture_combo(&mut events, (*bindings).clone(), action, timeout) => result,
                _ = tokio::signal::ctrl_c() => Err(HotkeyError::CaptureCancelled),
            };
            listener.stop().await?;
            drop(marker);

            let combo = captured?;
            bindings.set_hotkey(action, combo)?;
            bindings.save()?;
            println!("{} = {}", action, bindings.get(action));
        }
    }
    Ok(())
}

fn show_status(config: &Config) -> anyhow::Result<()> {
    match daemon::daemon_status(&Config::lock_path()) {
        DaemonStatus::Running(pid) => println!("Daemon: running (pid {})", pid),
        DaemonStatus::StaleLock(pid) => {
            println!("Daemon: stopped (stale lock from pid {})", pid)
        }
        DaemonStatus::Stopped => println!("Daemon: stopped"),
    }

    let paths = config.library_paths();
    let library = PresetLibrary::open(paths.clone())?;
    let preset = library.current()?;

    println!();
    println!(
        "Preset: {} (volume {}, {})",
        preset.name,
        preset.volume,
        mute_label(preset.mute)
    );
    if let Some(group) = library.settings().groups.current_group.as_deref() {
        println!("Group:  {}", group);
    }
    for name in preset.sounds.keys() {
        let effective = preset.effective_volume(name).unwrap_or(0.0);
        println!("  {} {}", percent(effective), name);
    }

    let bindings = match SettingsFile::<HotkeyBindings>::load(&paths.hotkeys_file) {
        Ok(file) => file.into_inner(),
        Err(e) => {
            tracing::debug!("Showing default hotkeys: {}", e);
            HotkeyBindings::default()
        }
    };
    println!();
    println!("Hotkeys:");
    print_bindings(&bindings);
    Ok(())
}

/// Show current configuration
fn show_config(config: &Config) -> anyhow::Result<()> {
    println!("Current Configuration\n");
    println!("=====================\n");

    println!("{}", toml::to_string_pretty(config)?);

    let paths = config.library_paths();
    println!("[paths]");
    println!("  data_dir = {:?}", paths.data_dir);
    println!("  presets_dir = {:?}", paths.presets_dir);
    println!("  sounds_dir = {:?}", paths.sounds_dir);
    println!("  library_file = {:?}", paths.library_file);
    println!("  hotkeys_file = {:?}", paths.hotkeys_file);
    println!("  lock_file = {:?}", Config::lock_path());

    if let Some(config_path) = Config::default_path() {
        println!("\n---");
        println!("Config file: {:?}", config_path);
    }

    Ok(())
}
