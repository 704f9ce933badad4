//! The main orchestrator that ties the grid, the animation and the groups
//! together.
//!
//! [`GridSwitcher`] reacts to [`Command`]s and host events by driving a
//! [`SlideAnimation`] across the workspace grid of one output, and commits
//! the workspace change once the slide has landed.
//!
//! # Lifecycle
//!
//! ```text
//!            directional request / change request
//!   Idle  ─────────────────────────────────────────▶  Switching
//!    ▲      (exclusive slot acquired, frame hook on)      │  ▲
//!    │                                                    │  │ further requests
//!    │   frame with finished animation: commit            │  │ redirect the slide
//!    └────────────────────────────────────────────────────┘──┘
//! ```
//!
//! While switching, the frame hook applies the live offset to the grabbed
//! view (if any).  Removing the grabbed view aborts the switch without a
//! commit.

use crate::binding::{Activator, BindingParseError};
use crate::command::{Command, SwitchToTarget};
use crate::config::Config;
use crate::events::{Channel, ViewRemoved, ViewWorkspaceChanged, WorkspaceChangeRequested};
use crate::exclusive::ExclusiveGrant;
use crate::grid::WorkspacePoint;
use crate::groups::{GroupError, GroupRegistry};
use crate::timeline::SlideAnimation;
use crate::traits::{BindingId, Compositor, ViewRole};
use log::{debug, info, warn};

/// Name under which the switcher holds the output's exclusive slot.
pub const OWNER: &str = "vswitch";

/// Possible errors from the switcher.
#[derive(Debug, thiserror::Error)]
pub enum SwitcherError {
    /// The compositor returned an error.
    #[error("compositor error: {0}")]
    Host(String),
    #[error(transparent)]
    Group(#[from] GroupError),
    #[error("invalid binding {binding:?}: {source}")]
    Binding {
        binding: String,
        #[source]
        source: BindingParseError,
    },
}

fn host_err<E: std::error::Error>(e: E) -> SwitcherError {
    SwitcherError::Host(e.to_string())
}

/// Observable state of the switcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchState {
    Idle,
    Switching,
}

/// An in-flight switch.  Holding the grant keeps other extensions off the
/// output until the session is dropped.
#[derive(Debug)]
struct SwitchSession<V> {
    _grant: ExclusiveGrant,
    grabbed: Option<V>,
    animation: SlideAnimation,
}

impl<V> SwitchSession<V> {
    /// Whole-cell delta the slide is heading to.
    fn target_delta(&self) -> (i32, i32) {
        let (x, y) = self.animation.target();
        (x.round() as i32, y.round() as i32)
    }
}

/// Animated workspace switcher for one output.
///
/// Generic over any [`Compositor`], so it runs the same against a real
/// compositor binding and against
/// [`HeadlessOutput`](crate::headless::HeadlessOutput).
///
/// # Typical usage
///
/// ```ignore
/// let host = HeadlessOutput::realtime(WorkspaceGrid::new(3, 3), (1920, 1080));
/// let mut switcher = GridSwitcher::new(host.clone(), &Config::default());
/// switcher.init()?;
/// switcher.handle(Command::Go(Direction::Right))?;
/// // then, once per frame while the hook is installed:
/// switcher.on_frame();
/// ```
pub struct GridSwitcher<H: Compositor> {
    host: H,
    config: Config,
    session: Option<SwitchSession<H::View>>,
    groups: GroupRegistry<H::View>,
    bindings: Vec<BindingId>,
    subscriptions: Vec<Channel>,
}

impl<H: Compositor> GridSwitcher<H> {
    /// Create a switcher.  Nothing is registered with the host until
    /// [`init`](Self::init).
    pub fn new(host: H, config: &Config) -> Self {
        Self {
            host,
            config: config.clone(),
            session: None,
            groups: GroupRegistry::new(),
            bindings: Vec::new(),
            subscriptions: Vec::new(),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn groups(&self) -> &GroupRegistry<H::View> {
        &self.groups
    }

    pub fn state(&self) -> SwitchState {
        if self.session.is_some() {
            SwitchState::Switching
        } else {
            SwitchState::Idle
        }
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// The view travelling with the viewport, if any.
    pub fn grabbed_view(&self) -> Option<&H::View> {
        self.session.as_ref().and_then(|s| s.grabbed.as_ref())
    }

    /// Live viewport offset in workspace cells, while switching.
    pub fn view_offset(&self) -> Option<(f64, f64)> {
        let now = self.host.now();
        self.session.as_ref().map(|s| s.animation.offset(now))
    }

    //  Setup / teardown

    /// Register bindings, declare groups and subscribe to host events.
    ///
    /// On failure everything registered so far is torn down again.
    pub fn init(&mut self) -> Result<(), SwitcherError> {
        if let Err(e) = self.register() {
            self.fini();
            return Err(e);
        }
        info!(
            "vswitch ready on a {} grid: {} binding(s), {} group(s)",
            self.host.grid_size(),
            self.bindings.len(),
            self.groups.len()
        );
        Ok(())
    }

    fn register(&mut self) -> Result<(), SwitcherError> {
        let vswitch = self.config.vswitch.clone();
        for (dir, go, carry) in vswitch.directional_bindings() {
            self.bind(go, Command::Go(dir))?;
            self.bind(carry, Command::MoveWindowAndGo(dir))?;
        }

        let grid = self.host.grid_size();
        let groups = self.config.groups.clone();
        for (id, key) in groups.group_keys() {
            if !grid.contains_index(id.0) {
                warn!("{} is outside the {} grid, skipping", id, grid);
                continue;
            }
            if key.is_empty() {
                warn!("{} has no key, skipping", id);
                continue;
            }
            self.groups.declare(id, grid.index_to_coords(id.0));
            self.bind(&groups.add_binding(&key), Command::AddToGroup(id))?;
            self.bind(&groups.toggle_binding(&key), Command::ToggleGroup(id))?;
        }

        for channel in [Channel::ViewRemoved, Channel::WorkspaceChangeRequested] {
            self.host.subscribe(channel);
            self.subscriptions.push(channel);
        }
        Ok(())
    }

    fn bind(&mut self, binding: &str, command: Command) -> Result<(), SwitcherError> {
        let activator: Activator = binding.parse().map_err(|source| SwitcherError::Binding {
            binding: binding.to_string(),
            source,
        })?;
        if activator.is_unbound() {
            debug!("{} is unbound", command);
            return Ok(());
        }
        let id = self
            .host
            .add_activator(&activator, command)
            .map_err(host_err)?;
        self.bindings.push(id);
        Ok(())
    }

    /// Undo [`init`](Self::init).  Aborts a running switch.  Safe to call
    /// more than once.
    pub fn fini(&mut self) {
        if self.session.is_some() {
            self.abort();
        }
        for id in self.bindings.drain(..) {
            self.host.remove_activator(id);
        }
        for channel in self.subscriptions.drain(..) {
            self.host.unsubscribe(channel);
        }
        self.groups.clear();
    }

    //  Commands

    /// Process a single [`Command`].
    ///
    /// Returns whether the command was handled.  Requests that cannot run
    /// right now (no top view, the exclusive slot is taken) are not errors.
    pub fn handle(&mut self, cmd: Command) -> Result<bool, SwitcherError> {
        match cmd {
            Command::Go(dir) => {
                debug!("go {}", dir);
                let (dx, dy) = dir.delta();
                self.add_direction(dx, dy, None)
            }

            Command::MoveWindowAndGo(dir) => {
                debug!("move window and go {}", dir);
                let (dx, dy) = dir.delta();
                let top = self.host.top_view().map_err(host_err)?;
                self.add_direction(dx, dy, top)
            }

            Command::SwitchTo(SwitchToTarget { x, y }) => {
                debug!("switch to ({}, {})", x, y);
                let target = self.host.grid_size().clamp(WorkspacePoint::new(x, y));
                let from = self.logical_workspace();
                self.add_direction(target.x - from.x, target.y - from.y, None)
            }

            Command::AddToGroup(id) => Ok(self.groups.add_to_group(&self.host, id)?),

            Command::ToggleGroup(id) => Ok(self.groups.toggle_group(&self.host, id)?),
        }
    }

    /// Activator callback: like [`handle`](Self::handle), but errors are
    /// logged and reported as "not handled".
    pub fn on_activator(&mut self, cmd: Command) -> bool {
        match self.handle(cmd) {
            Ok(handled) => handled,
            Err(e) => {
                warn!("{}: {}", cmd, e);
                false
            }
        }
    }

    /// Where the output will be once the running slide lands.
    fn logical_workspace(&self) -> WorkspacePoint {
        let current = self.host.current_workspace();
        match &self.session {
            Some(s) => {
                let (dx, dy) = s.target_delta();
                current.offset(dx, dy)
            }
            None => current,
        }
    }

    /// Start a slide by `(dx, dy)` cells, or extend the running one.
    ///
    /// `grab` is carried along if it is a top-level view and nothing is
    /// carried yet.  Returns `false` if the request was dropped.
    pub fn add_direction(
        &mut self,
        dx: i32,
        dy: i32,
        grab: Option<H::View>,
    ) -> Result<bool, SwitcherError> {
        if dx == 0 && dy == 0 {
            return Ok(false);
        }

        let now = self.host.now();
        let current = self.host.current_workspace();
        let grid = self.host.grid_size();

        if self.session.is_none() {
            let grant = match self.host.exclusive_slot().try_acquire(OWNER) {
                Ok(grant) => grant,
                Err(busy) => {
                    debug!("switch request dropped: {}", busy);
                    return Ok(false);
                }
            };
            self.host.add_frame_hook();
            info!("switch started on {}", current);
            let vswitch = &self.config.vswitch;
            self.session = Some(SwitchSession {
                _grant: grant,
                grabbed: None,
                animation: SlideAnimation::started(vswitch.duration(), vswitch.easing, now),
            });
        }
        let Some(session) = self.session.as_mut() else {
            return Ok(false);
        };

        if let Some(view) = grab {
            if session.grabbed.is_none() && self.host.view_role(&view) == ViewRole::Toplevel {
                debug!("grabbed {:?}", view);
                session.grabbed = Some(view);
            }
        }

        let (ex, ey) = session.target_delta();
        let target = grid.clamp(current.offset(ex + dx, ey + dy));
        session.animation.redirect(
            f64::from(target.x - current.x),
            f64::from(target.y - current.y),
            now,
        );
        debug!(
            "heading to {} (progress reset, start {:?})",
            target,
            (session.animation.dx.start, session.animation.dy.start)
        );
        Ok(true)
    }

    //  Frames

    /// Frame hook: move the grabbed view with the viewport and land the
    /// slide once the animation has run out.
    pub fn on_frame(&mut self) {
        let now = self.host.now();
        let Some(session) = &self.session else {
            return;
        };

        let (ox, oy) = session.animation.offset(now);
        if let Some(view) = &session.grabbed {
            let (w, h) = self.host.output_size();
            self.host
                .set_view_offset(view, ox * f64::from(w), oy * f64::from(h));
        }

        if !session.animation.running(now) {
            if let Err(e) = self.finish() {
                warn!("failed to finish switch: {}", e);
            }
        }
    }

    /// The host revoked the exclusive grab.  Land the slide right away on
    /// its current target.
    pub fn on_grab_cancel(&mut self) {
        if self.session.is_none() {
            return;
        }
        debug!("grab cancelled, finishing now");
        if let Err(e) = self.finish() {
            warn!("failed to finish switch: {}", e);
        }
    }

    /// Commit the target workspace and end the session.  The frame hook is
    /// removed and the slot released even if the commit fails.
    fn finish(&mut self) -> Result<(), SwitcherError> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };
        let (dx, dy) = session.target_delta();
        let result = self.commit(dx, dy, session.grabbed.as_ref());
        self.host.remove_frame_hook();
        drop(session);
        info!("switch finished on {}", self.host.current_workspace());
        result
    }

    fn commit(&self, dx: i32, dy: i32, grabbed: Option<&H::View>) -> Result<(), SwitcherError> {
        let from = self.host.current_workspace();
        let to = self.host.grid_size().clamp(from.offset(dx, dy));
        let switched = self.host.set_workspace(to).map_err(host_err);

        let Some(view) = grabbed else {
            return switched;
        };
        let carried = switched.and_then(|()| self.carry(view, dx, dy));
        self.host.remove_view_offset(view);
        carried?;
        self.host.emit_view_workspace_changed(ViewWorkspaceChanged {
            view: view.clone(),
            from,
            to: self.host.current_workspace(),
        });
        Ok(())
    }

    /// Move `view` by whole outputs so it lands where it was on screen,
    /// then focus and raise it.
    fn carry(&self, view: &H::View, dx: i32, dy: i32) -> Result<(), SwitcherError> {
        let (w, h) = self.host.output_size();
        let g = self.host.view_geometry(view);
        self.host
            .move_view(view, g.x + dx * w, g.y + dy * h)
            .map_err(host_err)?;
        self.host.focus_view(Some(view)).map_err(host_err)?;
        self.host.bring_to_front(view).map_err(host_err)?;
        Ok(())
    }

    /// Drop the session without committing.
    fn abort(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        if let Some(view) = &session.grabbed {
            self.host.remove_view_offset(view);
        }
        self.host.remove_frame_hook();
        info!("switch aborted on {}", self.host.current_workspace());
    }

    //  Host events

    /// A view left the output.
    pub fn on_view_removed(&mut self, event: &ViewRemoved<H::View>) {
        let purged = self.groups.remove_view(&event.view);
        if purged > 0 {
            debug!("{:?} removed from {} group(s)", event.view, purged);
        }
        if self.grabbed_view() == Some(&event.view) {
            warn!("grabbed view {:?} went away ({:?})", event.view, event.reason);
            self.abort();
        }
    }

    /// Someone else asked the output to change workspace.  Take it over
    /// with a slide when idle; leave it to the host otherwise.
    pub fn on_workspace_change_request(&mut self, request: &mut WorkspaceChangeRequested) {
        if self.is_active() {
            debug!("change request to {} while switching, ignored", request.new_workspace);
            return;
        }
        let target = self.host.grid_size().clamp(request.new_workspace);
        let current = self.host.current_workspace();
        match self.add_direction(target.x - current.x, target.y - current.y, None) {
            Ok(started) => request.carried_out = started,
            Err(e) => warn!("change request to {}: {}", target, e),
        }
    }
}

impl<H: Compositor> Drop for GridSwitcher<H> {
    fn drop(&mut self) {
        self.fini();
    }
}

//  Tests
