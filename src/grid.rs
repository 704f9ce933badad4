//! Workspace grid coordinates.
//!
//! An output owns a fixed `width × height` grid of workspaces.  Every
//! [`WorkspacePoint`] handed out by this crate lies inside that grid; the
//! helpers here are the only place where out-of-range coordinates are
//! folded back in.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single cell of the workspace grid, 0-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct WorkspacePoint {
    pub x: i32,
    pub y: i32,
}

impl WorkspacePoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Component-wise offset, unclamped.
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

impl fmt::Display for WorkspacePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Dimensions of an output's workspace grid.
///
/// Fixed for the lifetime of the output; the switcher never grows or
/// shrinks it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkspaceGrid {
    pub width: i32,
    pub height: i32,
}

impl WorkspaceGrid {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Number of cells in the grid.
    pub fn cells(&self) -> i32 {
        self.width * self.height
    }

    /// Whether `point` is a valid cell.
    pub fn contains(&self, point: WorkspacePoint) -> bool {
        (0..self.width).contains(&point.x) && (0..self.height).contains(&point.y)
    }

    /// Whether `index` is a valid 1-based configuration index.
    pub fn contains_index(&self, index: i32) -> bool {
        index >= 1 && index <= self.cells()
    }

    /// Convert a 1-based, row-major configuration index into grid
    /// coordinates.
    ///
    /// Callers must reject indices outside `[1, width * height]` first (see
    /// [`contains_index`](Self::contains_index)); binding setup skips them.
    pub fn index_to_coords(&self, index: i32) -> WorkspacePoint {
        let i = index - 1;
        WorkspacePoint {
            x: i % self.width,
            y: i / self.width,
        }
    }

    /// Clamp `point` component-wise to `[0, width-1] × [0, height-1]`.
    pub fn clamp(&self, point: WorkspacePoint) -> WorkspacePoint {
        WorkspacePoint {
            x: point.x.clamp(0, (self.width - 1).max(0)),
            y: point.y.clamp(0, (self.height - 1).max(0)),
        }
    }
}

impl fmt::Display for WorkspaceGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

//  Tests
