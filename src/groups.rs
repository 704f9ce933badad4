//! Window groups.
//!
//! A group is a set of views that is sent to, or fetched from, its own
//! workspace as a unit.  The [`GroupRegistry`] owns every group declared at
//! startup, keyed by [`GroupId`], together with the workspace the group
//! lives on.  Groups only ever hold handles; the views belong to the host.
//!
//! A view may be in several groups at once.  Nothing here enforces
//! exclusivity between groups.

use crate::command::GroupId;
use crate::grid::WorkspacePoint;
use crate::traits::{Compositor, LayerMask};
use log::{debug, info};
use std::collections::BTreeMap;

/// Errors from group operations.
#[derive(Debug, thiserror::Error)]
pub enum GroupError {
    /// The group has no members, so there is nothing to bring here.
    #[error("{0} is empty")]
    Empty(GroupId),
    /// No group with this id was declared.
    #[error("{0} is not configured")]
    Unknown(GroupId),
    /// The compositor returned an error.
    #[error("compositor error: {0}")]
    Host(String),
}

fn host_err<E: std::error::Error>(e: E) -> GroupError {
    GroupError::Host(e.to_string())
}

/// Unique-membership set of views.
///
/// Iteration order is insertion order, so the representative member used
/// when fetching a group is the one that joined first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group<V> {
    members: Vec<V>,
}

impl<V> Default for Group<V> {
    fn default() -> Self {
        Self {
            members: Vec::new(),
        }
    }
}

impl<V: PartialEq> Group<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, view: &V) -> bool {
        self.members.contains(view)
    }

    /// Insert `view`; returns `false` if it was already a member.
    pub fn insert(&mut self, view: V) -> bool {
        if self.contains(&view) {
            return false;
        }
        self.members.push(view);
        true
    }

    /// Remove `view`; returns `false` if it was not a member.
    pub fn remove(&mut self, view: &V) -> bool {
        let before = self.members.len();
        self.members.retain(|m| m != view);
        self.members.len() != before
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &V> {
        self.members.iter()
    }

    /// The first member in iteration order.
    pub fn representative(&self) -> Option<&V> {
        self.members.first()
    }
}

#[derive(Debug, Clone)]
struct GroupEntry<V> {
    target: WorkspacePoint,
    members: Group<V>,
}

/// All groups of one output.
#[derive(Debug, Clone)]
pub struct GroupRegistry<V> {
    groups: BTreeMap<GroupId, GroupEntry<V>>,
}

impl<V> Default for GroupRegistry<V> {
    fn default() -> Self {
        Self {
            groups: BTreeMap::new(),
        }
    }
}

impl<V: Clone + PartialEq + std::fmt::Debug> GroupRegistry<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a group living on `target`.  Redeclaring an id keeps its
    /// members and only updates the target.
    pub fn declare(&mut self, id: GroupId, target: WorkspacePoint) {
        self.groups
            .entry(id)
            .and_modify(|e| e.target = target)
            .or_insert_with(|| GroupEntry {
                target,
                members: Group::new(),
            });
    }

    pub fn group(&self, id: GroupId) -> Option<&Group<V>> {
        self.groups.get(&id).map(|e| &e.members)
    }

    pub fn target(&self, id: GroupId) -> Option<WorkspacePoint> {
        self.groups.get(&id).map(|e| e.target)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Drop `view` from every group.  Returns how many groups held it.
    pub fn remove_view(&mut self, view: &V) -> usize {
        let mut held = 0;
        for entry in self.groups.values_mut() {
            if entry.members.remove(view) {
                held += 1;
            }
        }
        held
    }

    /// Forget every group.
    pub fn clear(&mut self) {
        self.groups.clear();
    }

    /// Toggle the top view's membership in group `id`.
    ///
    /// Joining moves the view to the group's workspace and focuses whatever
    /// is now on top of the current workspace.  Leaving only drops the
    /// membership.  Returns `Ok(false)` when the current workspace has no
    /// top view.
    pub fn add_to_group<H>(&mut self, host: &H, id: GroupId) -> Result<bool, GroupError>
    where
        H: Compositor<View = V>,
    {
        let entry = self.groups.get_mut(&id).ok_or(GroupError::Unknown(id))?;
        let Some(view) = host.top_view().map_err(host_err)? else {
            debug!("{}: no top view", id);
            return Ok(false);
        };

        if entry.members.remove(&view) {
            info!("{}: removed {:?}", id, view);
            return Ok(true);
        }

        entry.members.insert(view.clone());
        info!("{}: added {:?}, sending to {}", id, view, entry.target);
        host.move_to_workspace(&view, entry.target).map_err(host_err)?;
        let top = host.top_view().map_err(host_err)?;
        host.focus_view(top.as_ref()).map_err(host_err)?;
        Ok(true)
    }

    /// Send group `id` away or bring it here.
    ///
    /// If every member is on the current workspace, all of them go to the
    /// group's workspace and the new top view is focused.  Otherwise all
    /// members are pulled onto the current workspace and the representative
    /// member is focused and raised.
    pub fn toggle_group<H>(&mut self, host: &H, id: GroupId) -> Result<bool, GroupError>
    where
        H: Compositor<View = V>,
    {
        let entry = self.groups.get(&id).ok_or(GroupError::Unknown(id))?;
        let Some(representative) = entry.members.representative().cloned() else {
            return Err(GroupError::Empty(id));
        };

        let current = host.current_workspace();
        let here = host
            .views_on_workspace(current, LayerMask::WORKSPACE)
            .map_err(host_err)?;
        let all_here = entry.members.iter().all(|m| here.contains(m));

        let destination = if all_here { entry.target } else { current };
        info!(
            "{}: {} {} member(s) to {}",
            id,
            if all_here { "sending" } else { "bringing" },
            entry.members.len(),
            destination
        );
        for view in entry.members.iter() {
            host.move_to_workspace(view, destination).map_err(host_err)?;
        }

        if all_here {
            let top = host.top_view().map_err(host_err)?;
            host.focus_view(top.as_ref()).map_err(host_err)?;
        } else {
            host.focus_view(Some(&representative)).map_err(host_err)?;
            host.bring_to_front(&representative).map_err(host_err)?;
        }
        Ok(true)
    }
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::WorkspaceGrid;
    use crate::headless::{HeadlessOutput, ViewId};
    use crate::traits::ViewRole;

    fn ws(x: i32, y: i32) -> WorkspacePoint {
        WorkspacePoint::new(x, y)
    }

    fn setup() -> (HeadlessOutput, GroupRegistry<ViewId>) {
        let host = HeadlessOutput::new(WorkspaceGrid::new(3, 3), (1920, 1080));
        let mut reg = GroupRegistry::new();
        reg.declare(GroupId(2), ws(1, 0));
        (host, reg)
    }

    #[test]
    fn group_membership_is_unique() {
        let mut g = Group::new();
        assert!(g.insert(1));
        assert!(!g.insert(1));
        assert!(g.insert(2));
        assert_eq!(g.len(), 2);
        assert_eq!(g.representative(), Some(&1));
        assert!(g.remove(&1));
        assert!(!g.remove(&1));
        assert_eq!(g.representative(), Some(&2));
    }

    #[test]
    fn add_to_group_without_top_view_is_not_handled() {
        let (host, mut reg) = setup();
        assert!(!reg.add_to_group(&host, GroupId(2)).unwrap());
        assert!(reg.group(GroupId(2)).unwrap().is_empty());
    }

    #[test]
    fn add_to_group_moves_view_and_focuses_next() {
        let (host, mut reg) = setup();
        let below = host.spawn_view(ws(0, 0), ViewRole::Toplevel);
        let top = host.spawn_view(ws(0, 0), ViewRole::Toplevel);

        assert!(reg.add_to_group(&host, GroupId(2)).unwrap());
        assert!(reg.group(GroupId(2)).unwrap().contains(&top));
        assert_eq!(host.workspace_of(top), Some(ws(1, 0)));
        assert_eq!(host.focused(), Some(below));
    }

    #[test]
    fn add_to_group_twice_restores_membership() {
        let (host, mut reg) = setup();
        let v = host.spawn_view(ws(0, 0), ViewRole::Toplevel);
        // Keep `v` on top of the current workspace for the second call.
        reg.declare(GroupId(1), ws(0, 0));

        assert!(reg.add_to_group(&host, GroupId(1)).unwrap());
        assert!(reg.group(GroupId(1)).unwrap().contains(&v));
        assert!(reg.add_to_group(&host, GroupId(1)).unwrap());
        assert!(!reg.group(GroupId(1)).unwrap().contains(&v));
        assert_eq!(host.workspace_of(v), Some(ws(0, 0)));
    }

    #[test]
    fn toggle_sends_group_away_when_all_members_are_here() {
        let (host, mut reg) = setup();
        let other = host.spawn_view(ws(0, 0), ViewRole::Toplevel);
        let a = host.spawn_view(ws(0, 0), ViewRole::Toplevel);
        let b = host.spawn_view(ws(0, 0), ViewRole::Toplevel);
        reg.declare(GroupId(5), ws(1, 0));
        // Fill the group directly; add_to_group would move them away.
        reg.groups.get_mut(&GroupId(5)).unwrap().members.insert(a);
        reg.groups.get_mut(&GroupId(5)).unwrap().members.insert(b);

        assert!(reg.toggle_group(&host, GroupId(5)).unwrap());
        assert_eq!(host.workspace_of(a), Some(ws(1, 0)));
        assert_eq!(host.workspace_of(b), Some(ws(1, 0)));
        assert_eq!(host.focused(), Some(other));
    }

    #[test]
    fn toggle_brings_group_here_when_a_member_is_elsewhere() {
        let (host, mut reg) = setup();
        let a = host.spawn_view(ws(0, 0), ViewRole::Toplevel);
        let b = host.spawn_view(ws(2, 2), ViewRole::Toplevel);
        let c = host.spawn_view(ws(0, 0), ViewRole::Toplevel);
        {
            let members = &mut reg.groups.get_mut(&GroupId(2)).unwrap().members;
            members.insert(a);
            members.insert(b);
        }

        assert!(reg.toggle_group(&host, GroupId(2)).unwrap());
        assert_eq!(host.workspace_of(a), Some(ws(0, 0)));
        assert_eq!(host.workspace_of(b), Some(ws(0, 0)));
        assert_eq!(host.focused(), Some(a));
        assert_eq!(host.top_view().unwrap(), Some(a));
        assert_eq!(host.workspace_of(c), Some(ws(0, 0)));
    }

    #[test]
    fn toggle_empty_group_is_an_error() {
        let (host, mut reg) = setup();
        assert!(matches!(
            reg.toggle_group(&host, GroupId(2)),
            Err(GroupError::Empty(GroupId(2)))
        ));
    }

    #[test]
    fn unknown_group_is_an_error() {
        let (host, mut reg) = setup();
        host.spawn_view(ws(0, 0), ViewRole::Toplevel);
        assert!(matches!(
            reg.add_to_group(&host, GroupId(9)),
            Err(GroupError::Unknown(GroupId(9)))
        ));
        assert!(matches!(
            reg.toggle_group(&host, GroupId(9)),
            Err(GroupError::Unknown(GroupId(9)))
        ));
    }

    #[test]
    fn remove_view_purges_every_group() {
        let mut reg: GroupRegistry<u32> = GroupRegistry::new();
        reg.declare(GroupId(1), ws(0, 0));
        reg.declare(GroupId(2), ws(1, 0));
        reg.groups.get_mut(&GroupId(1)).unwrap().members.insert(7);
        reg.groups.get_mut(&GroupId(2)).unwrap().members.insert(7);
        reg.groups.get_mut(&GroupId(2)).unwrap().members.insert(8);

        assert_eq!(reg.remove_view(&7), 2);
        assert!(!reg.group(GroupId(1)).unwrap().contains(&7));
        assert!(!reg.group(GroupId(2)).unwrap().contains(&7));
        assert!(reg.group(GroupId(2)).unwrap().contains(&8));
        assert_eq!(reg.remove_view(&7), 0);
    }

    #[test]
    fn redeclare_keeps_members() {
        let mut reg: GroupRegistry<u32> = GroupRegistry::new();
        reg.declare(GroupId(1), ws(0, 0));
        reg.groups.get_mut(&GroupId(1)).unwrap().members.insert(3);
        reg.declare(GroupId(1), ws(2, 0));
        assert_eq!(reg.target(GroupId(1)), Some(ws(2, 0)));
        assert!(reg.group(GroupId(1)).unwrap().contains(&3));
    }
}
