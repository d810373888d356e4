//! Script execution for the Perl Executing Browser shell.
//!
//! Spawns interpreter processes with a scoped CGI-style environment, either
//! blocking until exit or detached with output streamed as events, and
//! bridges an interactive line debugger plus its source formatter.

pub mod debugger;
pub mod environment;
pub mod error;
pub mod events;
pub mod formatter;
pub mod frame;
pub mod manager;
pub mod pipeline;
pub mod process;
pub mod session;

pub use debugger::{DebuggerBridge, DebuggerPhase, DebuggerState};
pub use environment::{PendingSignals, RequestMethod, RequestVars, ScriptEnvironment};
pub use error::RunError;
pub use events::{EventSink, OutputStream, ScriptEvent};
pub use frame::{FrameId, FrameRef, WindowId};
pub use manager::{Slot, SlotManager};
pub use pipeline::{DispatchOutcome, InvocationState, OutputTarget, ScriptPipeline, ScriptRequest};
pub use process::{BlockingOutput, LongRunningProcess, ProcessRunner, RunOutcome};
pub use session::{ExecutionMode, OutputSink, ProcessSession, SessionId, StdinMode};
