//! Per-window single-occupancy process slots.
//!
//! [`SlotManager`] owns every detached process of one window. Each [`Slot`]
//! holds at most one live [`LongRunningProcess`]; starting a session in an
//! occupied slot terminates the previous one before the new child is spawned.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::RunError;
use crate::events::EventSink;
use crate::process::{LongRunningProcess, ProcessRunner};
use crate::session::{ProcessSession, SessionId, next_session_id};

/// Logical execution context of a detached process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Long-running page script.
    Script,
    /// Interactive debugger session.
    Debugger,
    /// Syntax-highlighting formatter for the debugger's current source.
    Formatter,
}

impl Slot {
    pub fn name(&self) -> &'static str {
        match self {
            Slot::Script => "script",
            Slot::Debugger => "debugger",
            Slot::Formatter => "formatter",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Detached processes of a single window, keyed by slot.
pub struct SlotManager {
    runner: ProcessRunner,
    events: Arc<dyn EventSink>,
    slots: HashMap<Slot, LongRunningProcess>,
}

impl SlotManager {
    pub fn new(runner: ProcessRunner, events: Arc<dyn EventSink>) -> Self {
        Self {
            runner,
            events,
            slots: HashMap::new(),
        }
    }

    pub fn runner(&self) -> &ProcessRunner {
        &self.runner
    }

    /// Start `session` detached in `slot`, terminating the slot's previous
    /// occupant first.
    ///
    /// # Errors
    /// Returns the spawn error; the slot is left empty in that case.
    pub fn start(&mut self, slot: Slot, session: ProcessSession) -> Result<SessionId, RunError> {
        if let Some(previous) = self.stop(slot) {
            log::info!("Slot {}: session {} superseded", slot, previous);
        }
        let id = next_session_id();
        let process = self
            .runner
            .spawn_long_running(id, session, Arc::clone(&self.events))?;
        self.slots.insert(slot, process);
        Ok(id)
    }

    /// Session currently occupying `slot`, alive or not yet reaped.
    pub fn current(&self, slot: Slot) -> Option<SessionId> {
        self.slots.get(&slot).map(LongRunningProcess::id)
    }

    /// Slot that `session` occupies, `None` for superseded sessions.
    pub fn slot_of(&self, session: SessionId) -> Option<Slot> {
        self.slots
            .iter()
            .find(|(_, process)| process.id() == session)
            .map(|(slot, _)| *slot)
    }

    pub fn is_running(&self, slot: Slot) -> bool {
        self.slots.get(&slot).is_some_and(LongRunningProcess::is_running)
    }

    /// Number of occupied slots.
    ///
    /// A slot stays occupied after its child exits until the `Finished`
    /// event has been routed through [`SlotManager::finish`], so a zero count
    /// means every session's output has been delivered.
    pub fn live_count(&self) -> usize {
        self.slots.len()
    }

    /// Send one line to the stdin of the process in `slot`.
    pub fn send_line(&mut self, slot: Slot, line: &str) -> Result<(), RunError> {
        self.slots
            .get_mut(&slot)
            .ok_or(RunError::NotRunning(slot.name()))?
            .send_line(line)
    }

    /// Forget a session whose process has exited on its own.
    ///
    /// Returns the slot it occupied, or `None` when it was already superseded.
    pub fn finish(&mut self, session: SessionId) -> Option<Slot> {
        let slot = self.slot_of(session)?;
        if let Some(mut process) = self.slots.remove(&slot) {
            process.terminate();
        }
        Some(slot)
    }

    /// Terminate the occupant of `slot`, returning its id.
    pub fn stop(&mut self, slot: Slot) -> Option<SessionId> {
        let mut process = self.slots.remove(&slot)?;
        let id = process.id();
        process.terminate();
        Some(id)
    }

    /// Terminate every process owned by this manager.
    pub fn stop_all(&mut self) {
        for (slot, mut process) in self.slots.drain() {
            log::debug!("Stopping {} session {}", slot, process.id());
            process.terminate();
        }
    }
}

impl Drop for SlotManager {
    fn drop(&mut self) {
        self.stop_all();
    }
}
