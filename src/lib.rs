//! **vswitch**: animated workspace switching and window groups.
//!
//! An output owns a fixed `width × height` grid of workspaces.  Moving to a
//! neighbouring workspace slides the viewport there over a short animation
//! instead of jumping; further requests during the slide redirect it
//! smoothly.  The focused window can be carried along, and windows can be
//! collected into groups that are sent away or fetched as a unit.
//!
//! # Architecture
//!
//! The crate is organised around two core traits:
//!
//! * [`traits::Compositor`]: abstracts the output, its views, input
//!   bindings, frame hooks and events so the switching logic is not coupled
//!   to any specific compositor.
//! * [`traits::CommandSource`]: abstracts the transport that delivers
//!   user intent from outside the compositor (a Unix socket, a test
//!   harness, …).
//!
//! [`switcher::GridSwitcher`] is the state machine built on top of them.
//! [`headless`] implements [`traits::Compositor`] in memory and backs the
//! `vswitch-headless` daemon; [`ipc`] is the Unix-socket command listener.

pub mod binding;
pub mod command;
pub mod config;
pub mod easing;
pub mod events;
pub mod exclusive;
pub mod grid;
pub mod groups;
pub mod headless;
pub mod ipc;
pub mod switcher;
pub mod timeline;
pub mod traits;
