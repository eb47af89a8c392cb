mod app;
mod cli;
mod input;
mod tui;
mod ui;

use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ledpanel_client::{
    load_state, DeviceApi, DeviceMessage, FileConfigStorage, LiveEvent, Session, SessionEvent,
    SetCommand, WriteOutcome,
};
use ledpanel_core::{ConfigStorage, ControlRegistry, FieldValue, PanelSettings};

use crate::cli::{Args, Command};

fn init_tracing(args: &Args, command: &Command) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info,ledpanel_client=debug".into()),
    );

    if *command == Command::Tui {
        // stdout belongs to the terminal UI
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&args.log_file)
            .with_context(|| format!("Failed to open log file {}", args.log_file.display()))?;
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
    Ok(())
}

fn storage_for(args: &Args) -> FileConfigStorage {
    match &args.config {
        Some(path) => FileConfigStorage::for_file(path),
        None => FileConfigStorage::default_location(),
    }
}

/// Settings from the file, overridden by command line flags.
fn load_settings(args: &Args, storage: &FileConfigStorage) -> Result<PanelSettings> {
    let mut settings = storage
        .load_settings_or_default()
        .with_context(|| format!("Failed to read settings from {}", storage.dir().display()))?;

    if let Some(host) = &args.host {
        settings.host = host.clone();
    }
    if let Some(mode) = args.sections {
        settings.section_mode = mode;
    }
    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let command = args.command.clone().unwrap_or(Command::Tui);
    init_tracing(&args, &command)?;

    let storage = storage_for(&args);
    let settings = load_settings(&args, &storage)?;
    tracing::debug!(?settings, "Settings loaded");

    match command {
        Command::Tui => tui::run(settings).await,
        Command::Dump => dump(&settings).await,
        Command::Set { name, value } => set(&settings, &name, &value).await,
        Command::Watch => watch(&settings).await,
        Command::Config { save } => show_config(&settings, &storage, save),
    }
}

async fn dump(settings: &PanelSettings) -> Result<()> {
    let api = DeviceApi::new(settings)?;
    let state = load_state(&api, settings, |message| tracing::info!("{message}"))
        .await
        .with_context(|| format!("Failed to load the settings form from {}", api.base_url()))?;

    for handle in state.registry().iter() {
        let field_type = handle.control.field_type();
        if field_type.is_editable() {
            println!(
                "  {:<20} {:<24} {}",
                handle.name,
                handle.label,
                ui::value_text(&handle.control)
            );
        } else {
            println!("\n{}", handle.label);
        }
    }
    Ok(())
}

async fn set(settings: &PanelSettings, name: &str, value: &str) -> Result<()> {
    let api = DeviceApi::new(settings)?;
    let fields = api
        .fetch_schema()
        .await
        .with_context(|| format!("Failed to load the field schema from {}", api.base_url()))?;

    let field = fields
        .iter()
        .find(|f| f.name == name)
        .with_context(|| format!("Unknown field {name:?}"))?;
    let text = Value::String(value.to_string());
    let parsed = FieldValue::from_json(field.field_type, &text, field.options())
        .with_context(|| {
            format!("{value:?} is not a valid value for {name} ({:?})", field.field_type)
        })?;

    let mut registry = ControlRegistry::build(&fields);
    let value = form_value(&mut registry, name, parsed);

    let response = api
        .set(&SetCommand::new(name, value))
        .await
        .context("Error sending the value!")?;

    match response.current_state {
        Some(state) => println!("success setting {state}"),
        None => println!("success setting {name}: {value}"),
    }
    Ok(())
}

/// The value the form would send for `parsed`: numbers are clamped and
/// snapped to the field's step.
fn form_value(registry: &mut ControlRegistry, name: &str, parsed: FieldValue) -> FieldValue {
    match parsed {
        FieldValue::Number(n) => registry
            .set_number(name, n)
            .map(|edit| edit.value)
            .unwrap_or(parsed),
        other => {
            registry.apply_value(name, other);
            registry.value(name).unwrap_or(other)
        }
    }
}

async fn watch(settings: &PanelSettings) -> Result<()> {
    let mut session = Session::connect(settings, |message| tracing::info!("{message}"))
        .await
        .with_context(|| {
            format!("Failed to load the settings form from {}", settings.http_base())
        })?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C, shutting down...");
                break;
            }
            event = session.next_event() => match event {
                Some(SessionEvent::Live(LiveEvent::Opened)) => {
                    tracing::info!("WebSocket connected")
                }
                Some(SessionEvent::Live(LiveEvent::Closed)) => tracing::warn!("WebSocket closed"),
                Some(SessionEvent::Live(LiveEvent::Message(DeviceMessage::FieldUpdate(u)))) => {
                    println!("{} = {}", u.name, u.value);
                }
                Some(SessionEvent::Write(WriteOutcome::Failed { write, error })) => {
                    tracing::warn!(name = %write.name, %error, "Write failed");
                }
                Some(_) => {}
                None => {
                    tracing::warn!("Session ended");
                    break;
                }
            },
        }
    }
    Ok(())
}

fn show_config(settings: &PanelSettings, storage: &FileConfigStorage, save: bool) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(settings)?);
    if save {
        storage
            .save_settings(settings)
            .context("Failed to save settings")?;
        tracing::info!(path = %storage.path_for("settings").display(), "Settings saved");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledpanel_core::{FieldDescriptor, FieldType};

    fn registry() -> ControlRegistry {
        ControlRegistry::build(&[
            FieldDescriptor {
                min: Some(0),
                max: Some(100),
                step: Some(5),
                ..FieldDescriptor::new("speed", "Speed", FieldType::Number)
            },
            FieldDescriptor::new("power", "On/Off", FieldType::Boolean),
        ])
    }

    #[test]
    fn test_form_value_snaps_numbers_to_step() {
        let mut registry = registry();
        assert_eq!(
            form_value(&mut registry, "speed", FieldValue::Number(13)),
            FieldValue::Number(15)
        );
        assert_eq!(
            form_value(&mut registry, "speed", FieldValue::Number(400)),
            FieldValue::Number(100)
        );
    }

    #[test]
    fn test_form_value_passes_other_types() {
        let mut registry = registry();
        assert_eq!(
            form_value(&mut registry, "power", FieldValue::Boolean(true)),
            FieldValue::Boolean(true)
        );
    }
}
