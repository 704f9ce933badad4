//! Core traits that decouple vswitch from any specific compositor or
//! transport mechanism.
//!
//! The [`GridSwitcher`](crate::switcher::GridSwitcher) only talks to the
//! output it runs on through [`Compositor`], and only receives remote
//! commands through [`CommandSource`].

use crate::binding::Activator;
use crate::command::Command;
use crate::events::{Channel, ViewWorkspaceChanged};
use crate::exclusive::ExclusiveSlot;
use crate::grid::{WorkspaceGrid, WorkspacePoint};
use std::fmt;
use std::hash::Hash;
use std::ops::BitOr;
use std::sync::mpsc;
use std::time::Instant;

/// Role of a view as the host classifies it.  Only top-level windows can
/// be carried across workspaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewRole {
    Toplevel,
    Unmanaged,
    ShellView,
}

/// Set of stacking layers to query views from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerMask(u32);

impl LayerMask {
    pub const BACKGROUND: LayerMask = LayerMask(1 << 0);
    pub const BOTTOM: LayerMask = LayerMask(1 << 1);
    /// Regular application windows.
    pub const WORKSPACE: LayerMask = LayerMask(1 << 2);
    pub const TOP: LayerMask = LayerMask(1 << 3);
    pub const FULLSCREEN: LayerMask = LayerMask(1 << 4);

    pub fn contains(self, other: LayerMask) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for LayerMask {
    type Output = LayerMask;

    fn bitor(self, rhs: LayerMask) -> LayerMask {
        LayerMask(self.0 | rhs.0)
    }
}

/// Window geometry in output-local pixels, relative to the current
/// workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Handle returned by the host for a registered activator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(pub u64);

/// The output a switcher instance runs on.
///
/// Methods take `&self`: an implementation is a handle onto compositor
/// state it does not own.  Queries that the host answers from its own
/// bookkeeping are infallible; operations that change window or workspace
/// state may fail.
///
/// The host calls back into the switcher for everything registered here:
/// activators fire [`GridSwitcher::on_activator`], the frame hook fires
/// [`GridSwitcher::on_frame`], subscribed channels fire the matching
/// `on_*` handler.
///
/// [`GridSwitcher::on_activator`]: crate::switcher::GridSwitcher::on_activator
/// [`GridSwitcher::on_frame`]: crate::switcher::GridSwitcher::on_frame
pub trait Compositor {
    /// Identity-comparable window handle.
    type View: Clone + Eq + Hash + fmt::Debug;

    /// The error type produced by this compositor.
    type Error: std::error::Error + Send + 'static;

    //  Workspaces

    fn grid_size(&self) -> WorkspaceGrid;

    fn current_workspace(&self) -> WorkspacePoint;

    /// Make `workspace` the active one, shifting every view accordingly.
    fn set_workspace(&self, workspace: WorkspacePoint) -> Result<(), Self::Error>;

    /// Views on `workspace` in the given layers, topmost first.
    fn views_on_workspace(
        &self,
        workspace: WorkspacePoint,
        layers: LayerMask,
    ) -> Result<Vec<Self::View>, Self::Error>;

    fn move_to_workspace(
        &self,
        view: &Self::View,
        workspace: WorkspacePoint,
    ) -> Result<(), Self::Error>;

    /// Raise `view` to the top of its layer.
    fn bring_to_front(&self, view: &Self::View) -> Result<(), Self::Error>;

    //  Output

    /// Output size in pixels, `(width, height)`.
    fn output_size(&self) -> (i32, i32);

    /// The output's exclusivity slot.
    fn exclusive_slot(&self) -> ExclusiveSlot;

    /// Start calling `on_frame` before every frame, and keep redrawing while
    /// the hook is installed.
    fn add_frame_hook(&self);

    fn remove_frame_hook(&self);

    fn add_activator(
        &self,
        activator: &Activator,
        command: Command,
    ) -> Result<BindingId, Self::Error>;

    fn remove_activator(&self, id: BindingId);

    fn subscribe(&self, channel: Channel);

    fn unsubscribe(&self, channel: Channel);

    fn emit_view_workspace_changed(&self, event: ViewWorkspaceChanged<Self::View>);

    /// Clock used for animations.
    fn now(&self) -> Instant {
        Instant::now()
    }

    //  Views

    fn view_role(&self, view: &Self::View) -> ViewRole;

    fn view_geometry(&self, view: &Self::View) -> Geometry;

    /// Move `view` to `(x, y)` relative to the current workspace.
    fn move_view(&self, view: &Self::View, x: i32, y: i32) -> Result<(), Self::Error>;

    /// Attach (or update) the temporary render-only offset of `view`.
    fn set_view_offset(&self, view: &Self::View, dx: f64, dy: f64);

    fn remove_view_offset(&self, view: &Self::View);

    /// Give keyboard focus to `view`, or to nothing.
    fn focus_view(&self, view: Option<&Self::View>) -> Result<(), Self::Error>;

    /// Topmost regular or fullscreen view on the current workspace.
    fn top_view(&self) -> Result<Option<Self::View>, Self::Error> {
        let views = self.views_on_workspace(
            self.current_workspace(),
            LayerMask::WORKSPACE | LayerMask::FULLSCREEN,
        )?;
        Ok(views.into_iter().next())
    }
}

//  Command Source

/// A source of [`Command`]s.
///
/// Implementations listen on some transport (a Unix socket, a test
/// harness, …) and forward parsed commands into the provided
/// [`mpsc::Sender`].
///
/// # Contract
///
/// * [`run`](CommandSource::run) **blocks** until the source is exhausted or
///   an unrecoverable error occurs.
/// * Each received command must be sent through `sink` exactly once.
/// * Implementations must be [`Send`] so they can run on a dedicated thread.
pub trait CommandSource: Send {
    /// The error type produced by this source.
    type Error: std::error::Error + Send + 'static;

    /// Start listening and forward every incoming [`Command`] into `sink`.
    fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), Self::Error>;
}
