//! Typed events emitted by running child processes.
//!
//! Child-process activity is never polled by the shell. Reader tasks push
//! [`ScriptEvent`]s into an [`EventSink`]; the shell drains them on its own
//! thread and routes each one by [`SessionId`] to the window and slot that
//! own the session.

use crate::session::SessionId;

/// Which child stream a chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Something happened to a detached child process.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptEvent {
    /// A long-running session's process was started.
    Started { session: SessionId },

    /// A chunk of output is available.
    OutputReady {
        session: SessionId,
        stream: OutputStream,
        chunk: String,
    },

    /// The process exited, or was killed when `killed` is set. Emitted after
    /// every output chunk of the session.
    Finished {
        session: SessionId,
        exit_code: Option<i32>,
        killed: bool,
    },
}

impl ScriptEvent {
    pub fn session(&self) -> SessionId {
        match self {
            ScriptEvent::Started { session }
            | ScriptEvent::OutputReady { session, .. }
            | ScriptEvent::Finished { session, .. } => *session,
        }
    }
}

/// Dispatch point for script events.
///
/// Implemented for an unbounded tokio channel; the shell wraps its own
/// event type around it.
pub trait EventSink: Send + Sync + 'static {
    fn emit(&self, event: ScriptEvent);
}

impl EventSink for tokio::sync::mpsc::UnboundedSender<ScriptEvent> {
    fn emit(&self, event: ScriptEvent) {
        if self.send(event).is_err() {
            log::debug!("Script event dropped: receiver closed");
        }
    }
}
