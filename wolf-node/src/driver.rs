//! RSM driver: turns local intents into committed log entries.
//!
//! The driver holds at most one pending command. When a decided slot turns
//! out to carry a competitor's value, the pending command is immediately
//! re-proposed into the next free slot. Decisions may arrive out of slot
//! order; the driver records them all but releases commands for application
//! only in contiguous ascending order.

use std::collections::BTreeMap;

use slot_paxos::Slot;
use tracing::{debug, trace};

/// What the caller must do after the driver observes a decision.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Observed {
    /// Commands now applicable, in contiguous slot order.
    pub apply: Vec<(Slot, String)>,
    /// The pending command was displaced; re-propose it into this slot.
    pub retry: Option<(Slot, String)>,
    /// The pending command reached the log.
    pub committed: bool,
}

/// Drives one local pending value at a time into the replicated log.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Driver {
    log: BTreeMap<Slot, String>,
    next_open_slot: Slot,
    applied_through: Slot,
    pending: Option<String>,
}

impl Driver {
    #[must_use]
    pub fn new() -> Self {
        Self {
            log: BTreeMap::new(),
            next_open_slot: 1,
            applied_through: 0,
            pending: None,
        }
    }

    /// The smallest slot this node targets for its own proposals.
    #[must_use]
    pub fn next_open_slot(&self) -> Slot {
        self.next_open_slot
    }

    #[must_use]
    pub fn pending(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    #[must_use]
    pub fn log(&self) -> &BTreeMap<Slot, String> {
        &self.log
    }

    /// Stage a command and return the slot to propose it into.
    ///
    /// Returns `None` while another command is still in flight; the caller
    /// surfaces that as a local error.
    pub fn submit(&mut self, command: String) -> Option<(Slot, String)> {
        if self.pending.is_some() {
            return None;
        }
        trace!(slot = self.next_open_slot, %command, "staging command");
        self.pending = Some(command.clone());
        Some((self.next_open_slot, command))
    }

    /// Record a decided slot and work out the consequences.
    pub fn observe_decided(&mut self, slot: Slot, value: String) -> Observed {
        if self.log.contains_key(&slot) {
            trace!(slot, "duplicate decision, ignoring");
            return Observed::default();
        }
        debug!(slot, %value, "slot decided");
        self.log.insert(slot, value.clone());
        if slot >= self.next_open_slot {
            self.next_open_slot = slot + 1;
        }

        let mut apply = Vec::new();
        while let Some(command) = self.log.get(&(self.applied_through + 1)) {
            self.applied_through += 1;
            apply.push((self.applied_through, command.clone()));
        }

        let mut observed = Observed {
            apply,
            ..Observed::default()
        };
        if let Some(pending) = &self.pending {
            if *pending == value {
                debug!(slot, "pending command committed");
                self.pending = None;
                observed.committed = true;
            } else {
                debug!(
                    slot,
                    retry_slot = self.next_open_slot,
                    "slot taken by a competitor, retrying"
                );
                observed.retry = Some((self.next_open_slot, pending.clone()));
            }
        }
        observed
    }
}
