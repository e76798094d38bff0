//! Text command surface
//!
//! [`router`] turns a message into a command name and arguments;
//! [`dispatch`] runs it and returns the replies to post.

pub mod dispatch;
pub mod router;

pub use dispatch::{CommandDispatcher, Reply};
pub use router::{CommandKind, Invocation, ParsedCommand};
