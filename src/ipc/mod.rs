//! JSON-lines bridge to the host process.
//!
//! The host owns the realtime websocket. It drives livetray with commands on
//! stdin and receives media chunks, tray state and errors on stdout.
//!
//! Architecture:
//! - Stdin reader thread: parses commands, sends them to the driver via channel
//! - Driver loop: selects over commands, audio events and the next tick deadline
//!
//! Protocol:
//! - Each line is a JSON object
//! - Events (livetray → host): {"event": "...", ...}
//! - Commands (host → livetray): {"cmd": "...", ...}

mod protocol;
mod session;

#[cfg(test)]
mod tests;

#[cfg(test)]
pub(crate) use protocol::CapturedLines;
pub use protocol::{parse_command, EventWriter, IpcCommand, IpcEvent};
pub use session::run_bridge;
