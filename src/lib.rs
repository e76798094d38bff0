pub mod commands;
pub mod config;
pub mod data;
pub mod discord;
pub mod handlers;
pub mod liveness;
pub mod logging;
pub mod mirror;
pub mod moderation;
pub mod store;

// Log targets, shared by the library and the binary
pub const COMMAND_TARGET: &str = "strike_warden::command";
pub const ERROR_TARGET: &str = "strike_warden::error";
pub const EVENT_TARGET: &str = "strike_warden::handlers";
pub const CONSOLE_TARGET: &str = "strike_warden";

pub use config::BotConfig;
pub use data::{Data, DataInner};
pub type Error = Box<dyn std::error::Error + Send + Sync>;
