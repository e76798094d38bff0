use crate::commands::router::{Invocation, Routed};
use crate::moderation::CommandError;
use crate::{COMMAND_TARGET, CONSOLE_TARGET, Data, ERROR_TARGET, EVENT_TARGET, Error};
use poise::FrameworkError;
use std::error::Error as _;
use std::path::Path;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Log directory name
pub const LOG_DIR: &str = "logs";
/// Command log file name
pub const COMMAND_LOG_FILE: &str = "commands";

/// Initialize the logging system with console and file outputs
pub fn init() -> Result<(), Error> {
    if !Path::new(LOG_DIR).exists() {
        std::fs::create_dir_all(LOG_DIR)?;
    }

    let command_file = RollingFileAppender::new(Rotation::DAILY, LOG_DIR, COMMAND_LOG_FILE);

    // Human-readable console output
    let console_layer = fmt::layer()
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true)
        .with_ansi(true);

    // JSON command log, rotated daily
    let command_layer = fmt::layer()
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true)
        .with_ansi(false)
        .json()
        .with_writer(command_file);

    // RUST_LOG wins; otherwise INFO with serenity's gateway chatter silenced
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("info").add_directive("serenity=error".parse()?),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(command_layer)
        .try_init()?;

    info!("Logging system initialized");
    Ok(())
}

fn guild_label(invocation: &Invocation) -> String {
    invocation
        .guild_id
        .map_or_else(|| "DM".to_string(), |id| id.get().to_string())
}

/// Log the start of a command execution
pub fn log_command_start(routed: &Routed, invocation: &Invocation) {
    info!(
        target: COMMAND_TARGET,
        command = %routed.kind.name(),
        guild_id = %guild_label(invocation),
        channel_id = %invocation.channel_id,
        user_id = %invocation.actor.id,
        arguments = ?routed.args,
        event = "start",
        "Command execution started"
    );
}

/// Log the end of a command execution
pub fn log_command_end(routed: &Routed, invocation: &Invocation, elapsed: Duration) {
    let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or_default();
    info!(
        target: COMMAND_TARGET,
        command = %routed.kind.name(),
        guild_id = %guild_label(invocation),
        user_id = %invocation.actor.id,
        duration_ms = duration_ms,
        event = "end",
        "Command execution completed"
    );
}

/// Log a failed command. Denials and bad input are routine; platform and
/// storage failures carry their underlying cause.
pub fn log_command_error(routed: &Routed, invocation: &Invocation, error: &CommandError) {
    let cause = error
        .source()
        .map_or_else(String::new, ToString::to_string);

    match error {
        CommandError::PermissionDenied(_) | CommandError::Validation(_) => {
            warn!(
                target: COMMAND_TARGET,
                command = %routed.kind.name(),
                guild_id = %guild_label(invocation),
                user_id = %invocation.actor.id,
                kind = error.kind(),
                notice = %error,
                "Command rejected"
            );
        }
        _ => {
            error!(
                target: ERROR_TARGET,
                command = %routed.kind.name(),
                guild_id = %guild_label(invocation),
                user_id = %invocation.actor.id,
                kind = error.kind(),
                notice = %error,
                error = %cause,
                "Command error"
            );
        }
    }
}

/// Log errors surfaced by the framework itself
pub fn log_framework_error(error: &FrameworkError<'_, Data, Error>) {
    match error {
        FrameworkError::EventHandler { error, event, .. } => {
            error!(
                target: ERROR_TARGET,
                event = %event.snake_case_name(),
                error = %error,
                "Event handler error"
            );
        }
        FrameworkError::Setup { error, .. } => {
            error!(
                target: ERROR_TARGET,
                error = %error,
                "Framework setup failed"
            );
        }
        err => {
            error!(
                target: ERROR_TARGET,
                error_type = %std::any::type_name::<FrameworkError<'_, Data, Error>>(),
                error = ?err,
                "Other framework error"
            );
        }
    }
}

/// Log a best-effort failure that was swallowed, such as an undeliverable
/// log mirror message
pub fn log_event_failure(event: &str, error: &dyn std::fmt::Display) {
    warn!(
        target: EVENT_TARGET,
        event = %event,
        error = %error,
        "Event handling failed"
    );
}

pub fn log_console(message: String) {
    info!(
        target: CONSOLE_TARGET,
        message = %message,
        event = "console",
    );
}
