//! Interpreter process management.
//!
//! [`ProcessRunner`] starts an interpreter for a [`ProcessSession`] in one of
//! two modes:
//!
//! - **Blocking**: stdout goes to a temp file, stderr to a second file or
//!   nowhere, and the caller waits until the child exits or the timeout
//!   elapses. A timed-out child is killed and its partial output removed.
//! - **Long-running**: the child is detached. Background tasks read stdout
//!   and stderr as data arrives and emit [`ScriptEvent`]s; there is no
//!   timeout. The returned [`LongRunningProcess`] kills the child when it is
//!   terminated or dropped.
//!
//! In both modes the child's environment is exactly the session's
//! [`ScriptEnvironment`](crate::environment::ScriptEnvironment).

use std::ffi::OsStr;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::RunError;
use crate::events::{EventSink, OutputStream, ScriptEvent};
use crate::session::{ExecutionMode, OutputSink, ProcessSession, SessionId, StdinMode};

/// How long stream readers may keep draining after the child has exited.
const READER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

const READ_BUFFER_SIZE: usize = 8192;

/// Result of a blocking run that exited on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockingOutput {
    /// Fully written stdout of the script, ready to be loaded.
    pub stdout: PathBuf,
    pub stderr: Option<PathBuf>,
    pub exit_code: Option<i32>,
    pub elapsed: Duration,
}

impl BlockingOutput {
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// What [`ProcessRunner::run`] produced.
#[derive(Debug)]
pub enum RunOutcome {
    Completed(BlockingOutput),
    Detached(LongRunningProcess),
}

/// Locate an interpreter binary.
///
/// Names with a directory component must point at an existing file and are
/// taken relative to `root` unless absolute. Bare names are looked up along
/// `search_path` (the child's own search path).
pub fn resolve_interpreter(
    interpreter: &str,
    root: &Path,
    search_path: Option<&OsStr>,
) -> Result<PathBuf, RunError> {
    let missing = || RunError::InterpreterMissing {
        interpreter: interpreter.to_string(),
    };
    if interpreter.trim().is_empty() {
        return Err(missing());
    }

    let candidate = Path::new(interpreter);
    if candidate.is_absolute() || candidate.components().count() > 1 {
        let full = root.join(candidate);
        return if full.is_file() { Ok(full) } else { Err(missing()) };
    }

    let search_path = search_path.ok_or_else(missing)?;
    for dir in std::env::split_paths(search_path) {
        let full = dir.join(candidate);
        if full.is_file() {
            return Ok(full);
        }
        #[cfg(windows)]
        if candidate.extension().is_none() {
            let exe = full.with_extension("exe");
            if exe.is_file() {
                return Ok(exe);
            }
        }
    }
    Err(missing())
}

/// Starts interpreter processes on a shared tokio runtime.
///
/// The runtime must be multi-threaded: blocking runs are driven with
/// [`Handle::block_on`] from the caller's (non-runtime) thread.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    runtime: Handle,
    timeout: Duration,
}

impl ProcessRunner {
    pub fn new(runtime: Handle, timeout: Duration) -> Self {
        Self { runtime, timeout }
    }

    pub fn runtime(&self) -> &Handle {
        &self.runtime
    }

    /// Run a session in the mode it asks for.
    pub fn run(
        &self,
        id: SessionId,
        session: ProcessSession,
        sink: Arc<dyn EventSink>,
    ) -> Result<RunOutcome, RunError> {
        match session.mode {
            ExecutionMode::Blocking => self.run_blocking(&session).map(RunOutcome::Completed),
            ExecutionMode::LongRunning => self
                .spawn_long_running(id, session, sink)
                .map(RunOutcome::Detached),
        }
    }

    fn command(session: &ProcessSession) -> Command {
        let mut command = Command::new(&session.interpreter);
        command
            .args(&session.interpreter_args)
            .arg(&session.script)
            .current_dir(&session.working_dir)
            .env_clear()
            .envs(session.environment.iter())
            .kill_on_drop(true);
        command
    }

    fn spawn_failed(session: &ProcessSession) -> impl FnOnce(std::io::Error) -> RunError + '_ {
        move |source| RunError::SpawnFailed {
            interpreter: session.interpreter.clone(),
            source,
        }
    }

    /// Start the child and wait for it, killing it on timeout.
    pub fn run_blocking(&self, session: &ProcessSession) -> Result<BlockingOutput, RunError> {
        let OutputSink::TempFile { stdout, stderr } = &session.sink else {
            return Err(RunError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "blocking sessions need a temp-file sink",
            )));
        };

        let stdout_file = File::create(stdout)?;
        let stderr_stdio = match stderr {
            Some(path) => Stdio::from(File::create(path)?),
            None => Stdio::null(),
        };
        let payload = match &session.stdin {
            StdinMode::Payload(body) => Some(body.clone()),
            StdinMode::Closed | StdinMode::Interactive => None,
        };

        let mut command = Self::command(session);
        command
            .stdout(stdout_file)
            .stderr(stderr_stdio)
            .stdin(if payload.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            });

        log::info!(
            "Starting blocking script {:?} with {:?} in {:?}",
            session.script,
            session.interpreter,
            session.working_dir
        );
        let started = Instant::now();
        let timeout = self.timeout;

        let status = self.runtime.block_on(async {
            let mut child = command.spawn().map_err(Self::spawn_failed(session))?;
            let finished = tokio::time::timeout(timeout, feed_and_wait(&mut child, payload)).await;
            match finished {
                Ok(status) => Ok(status?),
                Err(_) => {
                    log::warn!(
                        "Script {:?} exceeded {}s, killing it",
                        session.script,
                        timeout.as_secs()
                    );
                    if let Err(e) = child.kill().await {
                        log::warn!("Failed to kill timed-out script: {}", e);
                    }
                    Err(RunError::Timeout {
                        script: session.script.clone(),
                        after: timeout,
                    })
                }
            }
        });

        let status = match status {
            Ok(status) => status,
            Err(e) => {
                if matches!(e, RunError::Timeout { .. })
                    && let Err(remove_err) = std::fs::remove_file(stdout)
                {
                    log::debug!("Could not remove partial output {:?}: {}", stdout, remove_err);
                }
                return Err(e);
            }
        };

        let output = BlockingOutput {
            stdout: stdout.clone(),
            stderr: stderr.clone(),
            exit_code: status.code(),
            elapsed: started.elapsed(),
        };
        if output.succeeded() {
            log::info!(
                "Script {:?} finished in {:?}",
                session.script,
                output.elapsed
            );
        } else {
            log::warn!(
                "Script {:?} exited with {:?}",
                session.script,
                output.exit_code
            );
        }
        Ok(output)
    }

    /// Start the child detached and stream its output as events.
    ///
    /// On Unix the child leads a new session without a controlling terminal,
    /// so interactive interpreters talk to the pipes instead of the shell's tty.
    pub fn spawn_long_running(
        &self,
        id: SessionId,
        session: ProcessSession,
        sink: Arc<dyn EventSink>,
    ) -> Result<LongRunningProcess, RunError> {
        let mut command = Self::command(&session);
        command
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(match session.stdin {
                StdinMode::Closed => Stdio::null(),
                StdinMode::Payload(_) | StdinMode::Interactive => Stdio::piped(),
            });
        #[cfg(unix)]
        detach_from_terminal(&mut command);

        log::info!(
            "Starting long-running session {} for {:?} with {:?}",
            id,
            session.script,
            session.interpreter
        );

        let _guard = self.runtime.enter();
        let mut child = command.spawn().map_err(Self::spawn_failed(&session))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let mut stdin = child.stdin.take();
        if let StdinMode::Payload(body) = &session.stdin
            && let Some(mut writer) = stdin.take()
        {
            let body = body.clone();
            self.runtime.spawn(async move {
                if let Err(e) = writer.write_all(&body).await {
                    log::warn!("Failed to write stdin payload to session {}: {}", id, e);
                }
            });
        }

        let running = Arc::new(AtomicBool::new(true));
        let (kill_tx, kill_rx) = oneshot::channel();

        sink.emit(ScriptEvent::Started { session: id });
        let supervisor = self.runtime.spawn(supervise(
            id,
            child,
            stdout,
            stderr,
            kill_rx,
            sink,
            Arc::clone(&running),
        ));

        Ok(LongRunningProcess {
            id,
            runtime: self.runtime.clone(),
            stdin,
            kill: Some(kill_tx),
            supervisor: Some(supervisor),
            running,
        })
    }
}

async fn feed_and_wait(
    child: &mut Child,
    payload: Option<Vec<u8>>,
) -> std::io::Result<std::process::ExitStatus> {
    if let Some(body) = payload
        && let Some(mut stdin) = child.stdin.take()
    {
        if let Err(e) = stdin.write_all(&body).await {
            // The script may exit without reading its body.
            log::debug!("Script closed stdin before reading the request body: {}", e);
        }
        drop(stdin);
    }
    child.wait().await
}

async fn supervise(
    id: SessionId,
    mut child: Child,
    stdout: Option<tokio::process::ChildStdout>,
    stderr: Option<tokio::process::ChildStderr>,
    kill_rx: oneshot::Receiver<()>,
    sink: Arc<dyn EventSink>,
    running: Arc<AtomicBool>,
) {
    let readers: Vec<JoinHandle<()>> = [
        stdout.map(|s| tokio::spawn(forward(id, OutputStream::Stdout, s, Arc::clone(&sink)))),
        stderr.map(|s| tokio::spawn(forward(id, OutputStream::Stderr, s, Arc::clone(&sink)))),
    ]
    .into_iter()
    .flatten()
    .collect();

    // A dropped sender means the owning handle went away: kill as well.
    let (exit_code, killed) = tokio::select! {
        status = child.wait() => match status {
            Ok(status) => (status.code(), false),
            Err(e) => {
                log::warn!("Session {}: failed to wait for child: {}", id, e);
                (None, false)
            }
        },
        _ = kill_rx => {
            log::info!("Session {}: killing child", id);
            if let Err(e) = child.kill().await {
                log::warn!("Session {}: kill failed: {}", id, e);
            }
            (None, true)
        }
    };

    for reader in readers {
        let abort = reader.abort_handle();
        if killed {
            abort.abort();
        }
        if tokio::time::timeout(READER_DRAIN_TIMEOUT, reader).await.is_err() {
            log::debug!("Session {}: output reader still busy, aborting", id);
            abort.abort();
        }
    }

    running.store(false, Ordering::SeqCst);
    log::info!(
        "Session {} finished (exit code {:?}, killed: {})",
        id,
        exit_code,
        killed
    );
    sink.emit(ScriptEvent::Finished {
        session: id,
        exit_code,
        killed,
    });
}

async fn forward<R>(id: SessionId, stream: OutputStream, mut reader: R, sink: Arc<dyn EventSink>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    let mut pending = Vec::new();
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                pending.extend_from_slice(&buf[..n]);
                let chunk = take_utf8_prefix(&mut pending);
                if !chunk.is_empty() {
                    sink.emit(ScriptEvent::OutputReady {
                        session: id,
                        stream,
                        chunk,
                    });
                }
            }
            Err(e) => {
                log::warn!("Session {}: error reading {:?}: {}", id, stream, e);
                break;
            }
        }
    }
    if !pending.is_empty() {
        sink.emit(ScriptEvent::OutputReady {
            session: id,
            stream,
            chunk: String::from_utf8_lossy(&pending).into_owned(),
        });
    }
}

/// Split off the longest prefix of `pending` that is complete UTF-8.
///
/// A multi-byte character cut by a read boundary stays in `pending`.
/// Genuinely invalid bytes are decoded lossily so the stream never stalls.
fn take_utf8_prefix(pending: &mut Vec<u8>) -> String {
    match std::str::from_utf8(pending) {
        Ok(text) => {
            let text = text.to_string();
            pending.clear();
            text
        }
        Err(e) if e.error_len().is_none() => {
            let valid = e.valid_up_to();
            let text = String::from_utf8_lossy(&pending[..valid]).into_owned();
            pending.drain(..valid);
            text
        }
        Err(_) => {
            let text = String::from_utf8_lossy(pending).into_owned();
            pending.clear();
            text
        }
    }
}

/// Handle to a detached interpreter process.
#[derive(Debug)]
pub struct LongRunningProcess {
    id: SessionId,
    runtime: Handle,
    stdin: Option<ChildStdin>,
    kill: Option<oneshot::Sender<()>>,
    supervisor: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
}

impl LongRunningProcess {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Write one command line to the child's stdin.
    pub fn send_line(&mut self, line: &str) -> Result<(), RunError> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or(RunError::NotRunning("stdin is closed"))?;
        let data = format!("{}\n", line.trim_end_matches(['\r', '\n']));
        self.runtime.block_on(async {
            stdin.write_all(data.as_bytes()).await?;
            stdin.flush().await
        })?;
        Ok(())
    }

    /// Kill the child and wait until its supervisor has finished.
    ///
    /// After this returns the process is gone and its `Finished` event has
    /// been emitted.
    pub fn terminate(&mut self) {
        self.stdin.take();
        if let Some(kill) = self.kill.take() {
            // Err means the supervisor already finished.
            let _ = kill.send(());
        }
        if let Some(supervisor) = self.supervisor.take()
            && let Err(e) = self.runtime.block_on(supervisor)
        {
            log::warn!("Session {}: supervisor task failed: {}", self.id, e);
        }
    }
}

impl Drop for LongRunningProcess {
    fn drop(&mut self) {
        // Never block here; dropping the sender makes the supervisor kill the child.
        self.stdin.take();
        self.kill.take();
    }
}

/// Run the child in a new session so it cannot open the shell's `/dev/tty`.
#[cfg(unix)]
fn detach_from_terminal(command: &mut Command) {
    // SAFETY: setsid is async-signal-safe and touches no memory of the parent.
    unsafe {
        command.pre_exec(|| {
            if libc::setsid() == -1 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }
}
