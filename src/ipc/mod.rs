//! IPC listener that accepts commands over a Unix socket.
//!
//! Scripts and key-bind helpers outside the compositor can connect to the
//! socket and send newline-delimited JSON commands.

pub mod listener;
