//! In-memory [`Compositor`] for the headless daemon and for tests.
//!
//! [`HeadlessOutput`] models one output: a workspace grid, a stack of
//! views positioned on the *workspace plane* (the whole grid laid out side
//! by side, one output-size tile per workspace), keyboard focus, the
//! exclusivity slot, registered activators and event subscriptions.
//!
//! A view's workspace is derived from where its centre falls on the plane,
//! so switching workspaces never touches view positions: it only moves
//! the viewport, the same way a real compositor does.
//!
//! The clock is either the wall clock or a manual one advanced with
//! [`HeadlessOutput::advance`], which keeps animation tests deterministic.

use crate::binding::Activator;
use crate::command::Command;
use crate::events::{
    Channel, RemovalReason, ViewRemoved, ViewWorkspaceChanged, WorkspaceChangeRequested,
};
use crate::exclusive::ExclusiveSlot;
use crate::grid::{WorkspaceGrid, WorkspacePoint};
use crate::traits::{BindingId, Compositor, Geometry, LayerMask, ViewRole};
use log::{debug, trace};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Handle of a view on a [`HeadlessOutput`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(pub u32);

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view#{}", self.0)
    }
}

/// Errors from the headless output.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HeadlessError {
    #[error("{0} does not exist")]
    UnknownView(ViewId),
    #[error("workspace {0} is outside the grid")]
    OutOfGrid(WorkspacePoint),
    #[error("workspace changes are locked")]
    Locked,
}

#[derive(Debug, Clone)]
struct ViewState {
    role: ViewRole,
    layer: LayerMask,
    /// Absolute position on the workspace plane.
    geometry: Geometry,
    offset: Option<(f64, f64)>,
}

#[derive(Debug, Clone, Copy)]
enum Clock {
    Wall,
    Manual(Instant),
}

#[derive(Debug)]
struct State {
    grid: WorkspaceGrid,
    current: WorkspacePoint,
    output: (i32, i32),
    views: BTreeMap<ViewId, ViewState>,
    /// Index 0 is the top of the stack.
    stacking: Vec<ViewId>,
    focus: Option<ViewId>,
    slot: ExclusiveSlot,
    frame_hook: bool,
    workspace_locked: bool,
    bindings: BTreeMap<BindingId, (Activator, Command)>,
    subscriptions: HashSet<Channel>,
    emitted: Vec<ViewWorkspaceChanged<ViewId>>,
    clock: Clock,
    next_view: u32,
    next_binding: u64,
}

impl State {
    fn view(&self, id: ViewId) -> Result<&ViewState, HeadlessError> {
        self.views.get(&id).ok_or(HeadlessError::UnknownView(id))
    }

    fn view_mut(&mut self, id: ViewId) -> Result<&mut ViewState, HeadlessError> {
        self.views.get_mut(&id).ok_or(HeadlessError::UnknownView(id))
    }

    fn origin(&self, ws: WorkspacePoint) -> (i32, i32) {
        (ws.x * self.output.0, ws.y * self.output.1)
    }

    fn workspace_of(&self, view: &ViewState) -> WorkspacePoint {
        let (w, h) = self.output;
        let g = view.geometry;
        let cx = g.x + g.width / 2;
        let cy = g.y + g.height / 2;
        self.grid
            .clamp(WorkspacePoint::new(cx.div_euclid(w.max(1)), cy.div_euclid(h.max(1))))
    }
}

/// Cheap, cloneable handle onto one simulated output.
#[derive(Debug, Clone)]
pub struct HeadlessOutput {
    state: Rc<RefCell<State>>,
}

impl HeadlessOutput {
    /// A new output on workspace `(0, 0)` with a manual clock.
    pub fn new(grid: WorkspaceGrid, output: (i32, i32)) -> Self {
        Self::with_clock(grid, output, Clock::Manual(Instant::now()))
    }

    /// A new output driven by the wall clock.
    pub fn realtime(grid: WorkspaceGrid, output: (i32, i32)) -> Self {
        Self::with_clock(grid, output, Clock::Wall)
    }

    fn with_clock(grid: WorkspaceGrid, output: (i32, i32), clock: Clock) -> Self {
        Self {
            state: Rc::new(RefCell::new(State {
                grid,
                current: WorkspacePoint::default(),
                output,
                views: BTreeMap::new(),
                stacking: Vec::new(),
                focus: None,
                slot: ExclusiveSlot::new(),
                frame_hook: false,
                workspace_locked: false,
                bindings: BTreeMap::new(),
                subscriptions: HashSet::new(),
                emitted: Vec::new(),
                clock,
                next_view: 1,
                next_binding: 1,
            })),
        }
    }

    /// Move the manual clock forward.  No-op on a wall clock.
    pub fn advance(&self, by: Duration) {
        let mut s = self.state.borrow_mut();
        if let Clock::Manual(t) = s.clock {
            s.clock = Clock::Manual(t + by);
        }
    }

    //  Views

    /// Map a new 800x600 regular-layer view at `(100, 100)` on `ws`, on top
    /// of the stack.
    pub fn spawn_view(&self, ws: WorkspacePoint, role: ViewRole) -> ViewId {
        self.spawn_in_layer(ws, role, LayerMask::WORKSPACE)
    }

    pub fn spawn_in_layer(&self, ws: WorkspacePoint, role: ViewRole, layer: LayerMask) -> ViewId {
        let mut s = self.state.borrow_mut();
        let id = ViewId(s.next_view);
        s.next_view += 1;
        let (ox, oy) = s.origin(ws);
        s.views.insert(
            id,
            ViewState {
                role,
                layer,
                geometry: Geometry {
                    x: ox + 100,
                    y: oy + 100,
                    width: 800,
                    height: 600,
                },
                offset: None,
            },
        );
        s.stacking.insert(0, id);
        debug!("mapped {} on {}", id, ws);
        id
    }

    /// Unmap `view`.  Returns the event to deliver when someone subscribed
    /// to [`Channel::ViewRemoved`].
    pub fn close_view(&self, view: ViewId, reason: RemovalReason) -> Option<ViewRemoved<ViewId>> {
        let mut s = self.state.borrow_mut();
        s.views.remove(&view)?;
        s.stacking.retain(|v| *v != view);
        if s.focus == Some(view) {
            s.focus = None;
        }
        debug!("unmapped {} ({:?})", view, reason);
        s.subscriptions
            .contains(&Channel::ViewRemoved)
            .then_some(ViewRemoved { view, reason })
    }

    pub fn workspace_of(&self, view: ViewId) -> Option<WorkspacePoint> {
        let s = self.state.borrow();
        s.views.get(&view).map(|v| s.workspace_of(v))
    }

    pub fn focused(&self) -> Option<ViewId> {
        self.state.borrow().focus
    }

    /// Render offset currently attached to `view`.
    pub fn view_offset(&self, view: ViewId) -> Option<(f64, f64)> {
        self.state.borrow().views.get(&view).and_then(|v| v.offset)
    }

    //  Output

    pub fn has_frame_hook(&self) -> bool {
        self.state.borrow().frame_hook
    }

    pub fn is_subscribed(&self, channel: Channel) -> bool {
        self.state.borrow().subscriptions.contains(&channel)
    }

    /// Registered activators and the commands they fire.
    pub fn bindings(&self) -> Vec<(Activator, Command)> {
        self.state.borrow().bindings.values().cloned().collect()
    }

    /// Command bound to `activator`, as if its input had just happened.
    pub fn fire(&self, activator: &str) -> Option<Command> {
        let activator: Activator = activator.parse().ok()?;
        self.state
            .borrow()
            .bindings
            .values()
            .find(|(a, _)| *a == activator)
            .map(|(_, cmd)| *cmd)
    }

    /// Every [`ViewWorkspaceChanged`] delivered so far.  Events published
    /// while nobody subscribed to [`Channel::ViewWorkspaceChanged`] are
    /// dropped.
    pub fn emitted(&self) -> Vec<ViewWorkspaceChanged<ViewId>> {
        self.state.borrow().emitted.clone()
    }

    /// Drain the delivered [`ViewWorkspaceChanged`] events.
    pub fn take_emitted(&self) -> Vec<ViewWorkspaceChanged<ViewId>> {
        std::mem::take(&mut self.state.borrow_mut().emitted)
    }

    /// Refuse every workspace change while `locked`, the way a host does
    /// under a lock screen.
    pub fn lock_workspace(&self, locked: bool) {
        self.state.borrow_mut().workspace_locked = locked;
    }

    /// Ask for a jump to `ws`.  Returns the request to deliver when someone
    /// subscribed to [`Channel::WorkspaceChangeRequested`].
    pub fn request_workspace(&self, ws: WorkspacePoint) -> Option<WorkspaceChangeRequested> {
        let s = self.state.borrow();
        s.subscriptions
            .contains(&Channel::WorkspaceChangeRequested)
            .then(|| WorkspaceChangeRequested::new(s.current, ws))
    }

    /// Default handling of a request nobody carried out: jump instantly.
    pub fn complete_request(&self, req: &WorkspaceChangeRequested) -> Result<(), HeadlessError> {
        if req.carried_out {
            return Ok(());
        }
        self.set_workspace(req.new_workspace)
    }
}

impl Compositor for HeadlessOutput {
    type View = ViewId;
    type Error = HeadlessError;

    fn grid_size(&self) -> WorkspaceGrid {
        self.state.borrow().grid
    }

    fn current_workspace(&self) -> WorkspacePoint {
        self.state.borrow().current
    }

    fn set_workspace(&self, workspace: WorkspacePoint) -> Result<(), HeadlessError> {
        let mut s = self.state.borrow_mut();
        if !s.grid.contains(workspace) {
            return Err(HeadlessError::OutOfGrid(workspace));
        }
        if s.workspace_locked {
            return Err(HeadlessError::Locked);
        }
        debug!("workspace {} -> {}", s.current, workspace);
        s.current = workspace;
        Ok(())
    }

    fn views_on_workspace(
        &self,
        workspace: WorkspacePoint,
        layers: LayerMask,
    ) -> Result<Vec<ViewId>, HeadlessError> {
        let s = self.state.borrow();
        Ok(s.stacking
            .iter()
            .filter(|id| {
                s.views
                    .get(*id)
                    .is_some_and(|v| layers.contains(v.layer) && s.workspace_of(v) == workspace)
            })
            .copied()
            .collect())
    }

    fn move_to_workspace(&self, view: &ViewId, workspace: WorkspacePoint) -> Result<(), HeadlessError> {
        let mut s = self.state.borrow_mut();
        if !s.grid.contains(workspace) {
            return Err(HeadlessError::OutOfGrid(workspace));
        }
        let from = s.workspace_of(s.view(*view)?);
        let (fx, fy) = s.origin(from);
        let (tx, ty) = s.origin(workspace);
        let v = s.view_mut(*view)?;
        v.geometry.x += tx - fx;
        v.geometry.y += ty - fy;
        debug!("{} moved {} -> {}", view, from, workspace);
        Ok(())
    }

    fn bring_to_front(&self, view: &ViewId) -> Result<(), HeadlessError> {
        let mut s = self.state.borrow_mut();
        s.view(*view)?;
        s.stacking.retain(|v| v != view);
        s.stacking.insert(0, *view);
        Ok(())
    }

    fn output_size(&self) -> (i32, i32) {
        self.state.borrow().output
    }

    fn exclusive_slot(&self) -> ExclusiveSlot {
        self.state.borrow().slot.clone()
    }

    fn add_frame_hook(&self) {
        self.state.borrow_mut().frame_hook = true;
    }

    fn remove_frame_hook(&self) {
        self.state.borrow_mut().frame_hook = false;
    }

    fn add_activator(&self, activator: &Activator, command: Command) -> Result<BindingId, HeadlessError> {
        let mut s = self.state.borrow_mut();
        let id = BindingId(s.next_binding);
        s.next_binding += 1;
        debug!("bound {} to {}", activator, command);
        s.bindings.insert(id, (activator.clone(), command));
        Ok(id)
    }

    fn remove_activator(&self, id: BindingId) {
        self.state.borrow_mut().bindings.remove(&id);
    }

    fn subscribe(&self, channel: Channel) {
        self.state.borrow_mut().subscriptions.insert(channel);
    }

    fn unsubscribe(&self, channel: Channel) {
        self.state.borrow_mut().subscriptions.remove(&channel);
    }

    fn emit_view_workspace_changed(&self, event: ViewWorkspaceChanged<ViewId>) {
        let mut s = self.state.borrow_mut();
        if !s.subscriptions.contains(&Channel::ViewWorkspaceChanged) {
            return;
        }
        debug!("{}: {} -> {}", event.view, event.from, event.to);
        s.emitted.push(event);
    }

    fn now(&self) -> Instant {
        match self.state.borrow().clock {
            Clock::Wall => Instant::now(),
            Clock::Manual(t) => t,
        }
    }

    fn view_role(&self, view: &ViewId) -> ViewRole {
        self.state
            .borrow()
            .views
            .get(view)
            .map_or(ViewRole::Unmanaged, |v| v.role)
    }

    fn view_geometry(&self, view: &ViewId) -> Geometry {
        let s = self.state.borrow();
        let (ox, oy) = s.origin(s.current);
        s.views.get(view).map_or_else(Geometry::default, |v| Geometry {
            x: v.geometry.x - ox,
            y: v.geometry.y - oy,
            ..v.geometry
        })
    }

    fn move_view(&self, view: &ViewId, x: i32, y: i32) -> Result<(), HeadlessError> {
        let mut s = self.state.borrow_mut();
        let (ox, oy) = s.origin(s.current);
        let v = s.view_mut(*view)?;
        v.geometry.x = ox + x;
        v.geometry.y = oy + y;
        Ok(())
    }

    fn set_view_offset(&self, view: &ViewId, dx: f64, dy: f64) {
        if let Some(v) = self.state.borrow_mut().views.get_mut(view) {
            trace!("{} offset ({:.1}, {:.1})", view, dx, dy);
            v.offset = Some((dx, dy));
        }
    }

    fn remove_view_offset(&self, view: &ViewId) {
        if let Some(v) = self.state.borrow_mut().views.get_mut(view) {
            v.offset = None;
        }
    }

    fn focus_view(&self, view: Option<&ViewId>) -> Result<(), HeadlessError> {
        let mut s = self.state.borrow_mut();
        if let Some(v) = view {
            s.view(*v)?;
        }
        s.focus = view.copied();
        Ok(())
    }
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;

    fn ws(x: i32, y: i32) -> WorkspacePoint {
        WorkspacePoint::new(x, y)
    }

    fn output() -> HeadlessOutput {
        HeadlessOutput::new(WorkspaceGrid::new(3, 3), (1920, 1080))
    }

    #[test]
    fn views_are_listed_topmost_first() {
        let out = output();
        let a = out.spawn_view(ws(0, 0), ViewRole::Toplevel);
        let b = out.spawn_view(ws(0, 0), ViewRole::Toplevel);
        let _elsewhere = out.spawn_view(ws(1, 0), ViewRole::Toplevel);
        assert_eq!(
            out.views_on_workspace(ws(0, 0), LayerMask::WORKSPACE).unwrap(),
            vec![b, a]
        );
        out.bring_to_front(&a).unwrap();
        assert_eq!(out.top_view().unwrap(), Some(a));
    }

    #[test]
    fn layer_filter_applies() {
        let out = output();
        let bg = out.spawn_in_layer(ws(0, 0), ViewRole::ShellView, LayerMask::BACKGROUND);
        let fs = out.spawn_in_layer(ws(0, 0), ViewRole::Toplevel, LayerMask::FULLSCREEN);
        assert_eq!(out.top_view().unwrap(), Some(fs));
        assert_eq!(
            out.views_on_workspace(ws(0, 0), LayerMask::BACKGROUND).unwrap(),
            vec![bg]
        );
        assert!(out
            .views_on_workspace(ws(0, 0), LayerMask::WORKSPACE)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn panels_and_docks_are_never_the_top_view() {
        let out = output();
        let v = out.spawn_view(ws(0, 0), ViewRole::Toplevel);
        let panel = out.spawn_in_layer(ws(0, 0), ViewRole::ShellView, LayerMask::TOP);
        let dock = out.spawn_in_layer(ws(0, 0), ViewRole::ShellView, LayerMask::BOTTOM);
        assert_eq!(out.top_view().unwrap(), Some(v));
        assert_eq!(
            out.views_on_workspace(ws(0, 0), LayerMask::TOP | LayerMask::BOTTOM)
                .unwrap(),
            vec![dock, panel]
        );
    }

    #[test]
    fn workspace_changed_events_reach_only_subscribers() {
        let out = output();
        let v = out.spawn_view(ws(0, 0), ViewRole::Toplevel);
        let event = ViewWorkspaceChanged {
            view: v,
            from: ws(0, 0),
            to: ws(1, 0),
        };
        out.emit_view_workspace_changed(event.clone());
        assert!(out.emitted().is_empty());

        out.subscribe(Channel::ViewWorkspaceChanged);
        out.emit_view_workspace_changed(event.clone());
        assert_eq!(out.take_emitted(), vec![event]);
        assert!(out.emitted().is_empty());
    }

    #[test]
    fn locked_output_refuses_workspace_changes() {
        let out = output();
        out.lock_workspace(true);
        assert_eq!(out.set_workspace(ws(1, 0)), Err(HeadlessError::Locked));
        out.lock_workspace(false);
        out.set_workspace(ws(1, 0)).unwrap();
        assert_eq!(out.current_workspace(), ws(1, 0));
    }

    #[test]
    fn switching_workspace_shifts_local_geometry() {
        let out = output();
        let v = out.spawn_view(ws(0, 0), ViewRole::Toplevel);
        assert_eq!(out.view_geometry(&v).x, 100);
        out.set_workspace(ws(1, 0)).unwrap();
        assert_eq!(out.view_geometry(&v).x, 100 - 1920);
        assert_eq!(out.workspace_of(v), Some(ws(0, 0)));
        assert!(out.set_workspace(ws(3, 0)).is_err());
    }

    #[test]
    fn move_to_workspace_keeps_local_position() {
        let out = output();
        let v = out.spawn_view(ws(0, 0), ViewRole::Toplevel);
        out.move_to_workspace(&v, ws(2, 1)).unwrap();
        assert_eq!(out.workspace_of(v), Some(ws(2, 1)));
        out.set_workspace(ws(2, 1)).unwrap();
        let g = out.view_geometry(&v);
        assert_eq!((g.x, g.y), (100, 100));
    }

    #[test]
    fn close_view_reports_only_to_subscribers() {
        let out = output();
        let a = out.spawn_view(ws(0, 0), ViewRole::Toplevel);
        let b = out.spawn_view(ws(0, 0), ViewRole::Toplevel);
        assert_eq!(out.close_view(a, RemovalReason::Disappeared), None);
        out.subscribe(Channel::ViewRemoved);
        assert_eq!(
            out.close_view(b, RemovalReason::Detached),
            Some(ViewRemoved {
                view: b,
                reason: RemovalReason::Detached
            })
        );
        assert_eq!(out.close_view(b, RemovalReason::Detached), None);
    }

    #[test]
    fn unhandled_request_jumps_instantly() {
        let out = output();
        assert!(out.request_workspace(ws(1, 1)).is_none());
        out.subscribe(Channel::WorkspaceChangeRequested);
        let req = out.request_workspace(ws(1, 1)).unwrap();
        assert_eq!(req.delta(), (1, 1));
        out.complete_request(&req).unwrap();
        assert_eq!(out.current_workspace(), ws(1, 1));
    }

    #[test]
    fn manual_clock_only_moves_when_advanced() {
        let out = output();
        let t0 = out.now();
        assert_eq!(out.now(), t0);
        out.advance(Duration::from_millis(16));
        assert_eq!(out.now() - t0, Duration::from_millis(16));
    }

    #[test]
    fn bindings_fire_their_command() {
        use crate::command::Direction;
        let out = output();
        let a: Activator = "<super> KEY_LEFT | swipe right 4".parse().unwrap();
        let id = out.add_activator(&a, Command::Go(Direction::Left)).unwrap();
        assert_eq!(
            out.fire("<super> KEY_LEFT | swipe right 4"),
            Some(Command::Go(Direction::Left))
        );
        out.remove_activator(id);
        assert_eq!(out.fire("<super> KEY_LEFT | swipe right 4"), None);
    }
}
