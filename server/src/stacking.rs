//! Pairwise stacking constraints between zone co-members.
//!
//! Constraints are derived from layers alone: a member stacks below every co-member
//! with a higher layer, and equal layers leave the pair unconstrained. The engine keeps
//! no constraint graph of its own. It re-derives the edges touching the changed item and
//! hands them to the host, retracting the stale direction of each pair first.

use std::cmp::Ordering;
use std::ops::{Deref, DerefMut};

use wayland_protocols::xdg::shell::server::xdg_toplevel::XdgToplevel;

use crate::{handler::ZonesHandler, item::ItemId, zone::ZoneId};

/// Scoped batch of constraint changes.
///
/// Opening tells the host to defer visible re-stacking; dropping closes the batch on
/// every exit path, so all edges from one change land as a single transition.
struct Batch<'a, D: ZonesHandler>(&'a mut D);

impl<'a, D: ZonesHandler> Batch<'a, D> {
    fn new(state: &'a mut D) -> Self {
        state.begin_stacking_update();
        Self(state)
    }
}

impl<D: ZonesHandler> Drop for Batch<'_, D> {
    fn drop(&mut self) {
        self.0.end_stacking_update();
    }
}

impl<D: ZonesHandler> Deref for Batch<'_, D> {
    type Target = D;

    fn deref(&self) -> &D {
        self.0
    }
}

impl<D: ZonesHandler> DerefMut for Batch<'_, D> {
    fn deref_mut(&mut self) -> &mut D {
        self.0
    }
}

/// Rebuild the constraints between `subject` and every other member of `zone`.
///
/// Called after `subject`'s layer or membership changed. A subject or peer whose window
/// no longer resolves takes part in no new constraints; its bookkeeping was still
/// updated by the caller, and whatever edges it holds fall when it leaves.
pub(crate) fn apply<D: ZonesHandler>(state: &mut D, zone: ZoneId, subject: ItemId) {
    let Some(entry) = state.zones_state().items.get(subject) else {
        return;
    };
    let toplevel = entry.toplevel.clone();
    let layer = entry.layer;

    if state.window_geometry(&toplevel).is_none() {
        return;
    }

    let mut peers = peers(state, zone, subject);
    peers.retain(|(peer, _)| state.window_geometry(peer).is_some());
    if peers.is_empty() {
        return;
    }

    let mut batch = Batch::new(state);
    for (peer, peer_layer) in &peers {
        match layer.cmp(peer_layer) {
            Ordering::Less => {
                batch.unconstrain(peer, &toplevel);
                batch.constrain(&toplevel, peer);
            }
            Ordering::Greater => {
                batch.unconstrain(&toplevel, peer);
                batch.constrain(peer, &toplevel);
            }
            Ordering::Equal => {
                batch.unconstrain(&toplevel, peer);
                batch.unconstrain(peer, &toplevel);
            }
        }
    }
}

/// Retract every constraint between `subject` and the remaining members of `zone`.
///
/// Runs after `subject` left the member list. Retraction is unconditional in both
/// directions, even for windows the host no longer resolves; the host treats unknown
/// pairs as a no-op.
pub(crate) fn retract<D: ZonesHandler>(state: &mut D, zone: ZoneId, subject: ItemId) {
    let Some(entry) = state.zones_state().items.get(subject) else {
        return;
    };
    let toplevel = entry.toplevel.clone();

    let peers = peers(state, zone, subject);
    if peers.is_empty() {
        return;
    }

    let mut batch = Batch::new(state);
    for (peer, _) in &peers {
        batch.unconstrain(&toplevel, peer);
        batch.unconstrain(peer, &toplevel);
    }
}

/// Retract every pairwise constraint among `members`. Used when a whole zone goes away.
///
/// Like [`retract`], this does not consult the host about the windows first: an edge
/// installed while both ends resolved must fall even if one end stopped resolving since.
pub(crate) fn retract_all<D: ZonesHandler>(state: &mut D, members: &[ItemId]) {
    let mut toplevels = Vec::with_capacity(members.len());
    for &member in members {
        let Some(entry) = state.zones_state().items.get(member) else {
            continue;
        };
        toplevels.push(entry.toplevel.clone());
    }

    if toplevels.len() < 2 {
        return;
    }

    let mut batch = Batch::new(state);
    for (index, below) in toplevels.iter().enumerate() {
        for above in &toplevels[index + 1..] {
            batch.unconstrain(below, above);
            batch.unconstrain(above, below);
        }
    }
}

/// Toplevel and layer of every member of `zone` but `subject`.
fn peers<D: ZonesHandler>(state: &mut D, zone: ZoneId, subject: ItemId) -> Vec<(XdgToplevel, i32)> {
    let members = match state.zones_state().zones.get(zone) {
        Some(zone) => zone.members.clone(),
        None => return Vec::new(),
    };

    let mut peers = Vec::with_capacity(members.len());
    for member in members {
        if member == subject {
            continue;
        }
        let Some(entry) = state.zones_state().items.get(member) else {
            continue;
        };
        peers.push((entry.toplevel.clone(), entry.layer));
    }

    peers
}
