pub mod log;
pub mod play;
pub mod session;
pub mod status;

pub use log::show_log;
pub use play::play_session;
pub use session::{handle_session_command, SessionCommands};
pub use status::show_status;

use anyhow::{Context, Result};
use dicepoker_core::SessionId;
use std::str::FromStr;

pub(crate) fn parse_session(id: &str) -> Result<SessionId> {
    SessionId::from_str(id.trim()).with_context(|| format!("Invalid session id '{}'", id))
}
