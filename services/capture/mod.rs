/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Per-node media-capture capability.
//!
//! Core structures:
//! - `CaptureLedger`: workspace-owned record of which nodes hold a stream
//! - `CaptureLease`: RAII guard a host acquires when it mounts a capture
//!   node and drops when the node unmounts
//!
//! The actual stream (camera, microphone, screen share) lives entirely in
//! the host shell; the ledger only scopes its lifetime to one node. A lease
//! releases its slot on drop, and deleting the node force-releases it, so a
//! stream can never outlive the node it was granted to.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use uuid::Uuid;

/// Active leases by node id. Each acquisition gets a fresh generation and
/// the counter never resets, so a stale lease whose slot was force-released
/// and re-granted cannot release the replacement.
#[derive(Debug, Default)]
struct LedgerState {
    active: HashMap<Uuid, u64>,
    next_generation: u64,
}

/// Tracks which node ids currently hold a capture capability.
///
/// Handles clone cheaply and share one ledger, so a host layer can acquire
/// leases while the workspace keeps the canonical handle for force-release
/// on node deletion.
#[derive(Clone, Default)]
pub struct CaptureLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl CaptureLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant the capture capability for `node_id`.
    ///
    /// Returns `None` while another lease for the same node is outstanding;
    /// each node carries at most one stream.
    pub fn acquire(&self, node_id: Uuid) -> Option<CaptureLease> {
        let mut state = self.state.lock();
        if state.active.contains_key(&node_id) {
            return None;
        }
        let generation = state.next_generation;
        state.next_generation += 1;
        state.active.insert(node_id, generation);
        Some(CaptureLease {
            node_id,
            generation,
            state: Arc::downgrade(&self.state),
        })
    }

    pub fn is_captured(&self, node_id: Uuid) -> bool {
        self.state.lock().active.contains_key(&node_id)
    }

    pub fn active_count(&self) -> usize {
        self.state.lock().active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().active.is_empty()
    }

    /// Revoke any capability held for `node_id`, used when the node is
    /// deleted out from under a mounted component. The outstanding lease
    /// becomes inert; its later drop is a no-op.
    pub(crate) fn release_for_node(&self, node_id: Uuid) -> bool {
        self.state.lock().active.remove(&node_id).is_some()
    }

    /// Revoke every capability, used when another project is restored into
    /// the workspace. Outstanding leases become inert.
    pub(crate) fn release_all(&self) {
        self.state.lock().active.clear();
    }
}

/// Guard tying one capture stream to one node's lifetime.
///
/// Dropping the lease releases the node's slot in the ledger. The host keeps
/// the lease alongside the stream it opened and lets both fall together.
#[derive(Debug)]
pub struct CaptureLease {
    node_id: Uuid,
    generation: u64,
    state: Weak<Mutex<LedgerState>>,
}

impl CaptureLease {
    pub fn node_id(&self) -> Uuid {
        self.node_id
    }
}

impl Drop for CaptureLease {
    fn drop(&mut self) {
        let Some(state) = self.state.upgrade() else {
            return;
        };
        let mut state = state.lock();
        // Only release the slot this lease was granted; after a force-release
        // and re-acquire the slot belongs to a newer lease.
        if state.active.get(&self.node_id) == Some(&self.generation) {
            state.active.remove(&self.node_id);
        }
    }
}
