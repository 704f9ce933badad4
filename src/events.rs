//! Typed event channels shared with the host.
//!
//! The host publishes [`ViewRemoved`] and [`WorkspaceChangeRequested`] to
//! subscribers; the switcher publishes [`ViewWorkspaceChanged`] once a slide
//! that carried a window has landed.  Subscription is per [`Channel`].

use crate::grid::WorkspacePoint;
use std::fmt;

/// The closed set of channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    ViewRemoved,
    WorkspaceChangeRequested,
    ViewWorkspaceChanged,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::ViewRemoved => write!(f, "view-removed"),
            Channel::WorkspaceChangeRequested => write!(f, "workspace-change-requested"),
            Channel::ViewWorkspaceChanged => write!(f, "view-workspace-changed"),
        }
    }
}

/// Why a view left the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalReason {
    /// Moved to another output.
    Detached,
    /// Unmapped or destroyed.
    Disappeared,
}

/// A view is gone from this output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewRemoved<V> {
    pub view: V,
    pub reason: RemovalReason,
}

/// Some other part of the host wants the output to jump workspaces.
///
/// A subscriber that takes over the change sets `carried_out`; otherwise the
/// host performs its default instant jump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceChangeRequested {
    pub old_workspace: WorkspacePoint,
    pub new_workspace: WorkspacePoint,
    pub carried_out: bool,
}

impl WorkspaceChangeRequested {
    pub fn new(old_workspace: WorkspacePoint, new_workspace: WorkspacePoint) -> Self {
        Self {
            old_workspace,
            new_workspace,
            carried_out: false,
        }
    }

    /// Requested `(dx, dy)` in cells.
    pub fn delta(&self) -> (i32, i32) {
        (
            self.new_workspace.x - self.old_workspace.x,
            self.new_workspace.y - self.old_workspace.y,
        )
    }
}

/// A grabbed view was carried to another workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewWorkspaceChanged<V> {
    pub view: V,
    pub from: WorkspacePoint,
    pub to: WorkspacePoint,
}
