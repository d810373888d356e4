//! Debugger bridge tests with a shell script standing in for the line debugger,
//! plus one run against the system perl when it is installed.
#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use peb_config::{Config, DebuggerConfig, RuntimeSettings, SettingsStore};
use peb_scripting::{
    DebuggerBridge, DebuggerPhase, FrameRef, ProcessRunner, RunError, ScriptEvent, SessionId,
    SlotManager,
};
use tempfile::TempDir;
use tokio::runtime::Runtime;
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};

/// Prints a location and a prompt after start-up and after every command.
const FAKE_DEBUGGER: &str = r#"i=1
printf 'main::(target.pl:%d):\n  DB<%d> ' "$i" "$i"
while read -r cmd; do
  i=$((i+1))
  if [ "$cmd" = q ]; then exit 0; fi
  printf 'cmd=%s\nmain::(target.pl:%d):\n  DB<%d> ' "$cmd" "$i" "$i"
done
"#;

const TARGET_SOURCE: &str = "my $x = 1;\n$x++;\nprint $x;\n";

struct Harness {
    slots: SlotManager,
    events: UnboundedReceiver<ScriptEvent>,
    config: Config,
    settings: RuntimeSettings,
    script: PathBuf,
    _dir: TempDir,
    runtime: Runtime,
}

impl Harness {
    fn new() -> Self {
        let runtime = Runtime::new().expect("tokio runtime");
        let dir = TempDir::new().expect("temp dir");
        let script = dir.path().join("fake-debugger.sh");
        std::fs::write(&script, FAKE_DEBUGGER).expect("write fake debugger");
        std::fs::write(dir.path().join("target.pl"), TARGET_SOURCE).expect("write target");

        let mut config = Config::default().with_base_dir(dir.path());
        config.debugger.interpreter = "/bin/sh".to_string();
        config.debugger.interpreter_args = Vec::new();
        config.debugger.formatter = None;
        let settings = SettingsStore::in_memory(&config).current().clone();

        let (tx, events) = unbounded_channel();
        let slots = SlotManager::new(
            ProcessRunner::new(runtime.handle().clone(), Duration::from_secs(10)),
            Arc::new(tx),
        );
        Self {
            slots,
            events,
            config,
            settings,
            script,
            _dir: dir,
            runtime,
        }
    }

    fn bridge(&self) -> DebuggerBridge {
        DebuggerBridge::new(&self.config)
            .expect("bridge")
            .with_host_env(vec![("PATH".to_string(), "/usr/bin:/bin".to_string())])
    }

    /// Pump debugger events until the bridge produces a page.
    fn next_page(&mut self, bridge: &mut DebuggerBridge) -> String {
        loop {
            let events = &mut self.events;
            let event = self
                .runtime
                .block_on(async {
                    tokio::time::timeout(Duration::from_secs(10), events.recv()).await
                })
                .expect("timed out waiting for debugger output")
                .expect("event channel closed");
            match event {
                ScriptEvent::OutputReady { session, chunk, .. } => {
                    let page = bridge
                        .on_output(session, &chunk, &self.settings, &mut self.slots)
                        .expect("debugger output");
                    if let Some(page) = page {
                        return page;
                    }
                }
                ScriptEvent::Finished { session, .. } => {
                    if let Some(page) = bridge.on_debugger_finished(session) {
                        return page;
                    }
                }
                ScriptEvent::Started { .. } => {}
            }
        }
    }

    fn start(&mut self, bridge: &mut DebuggerBridge) -> SessionId {
        bridge
            .start(
                &self.config,
                &self.settings,
                &self.script,
                FrameRef::top(1),
                &mut self.slots,
            )
            .expect("start debugger")
    }
}

#[test]
fn test_first_prompt_renders_highlighted_source() {
    let mut h = Harness::new();
    let mut bridge = h.bridge();
    h.start(&mut bridge);
    assert_eq!(bridge.phase(), DebuggerPhase::AwaitingOutput);

    let page = h.next_page(&mut bridge);

    assert_eq!(bridge.phase(), DebuggerPhase::Ready);
    assert_eq!(bridge.state().source_line, Some(1));
    assert!(
        bridge
            .state()
            .source_highlight_path
            .as_ref()
            .is_some_and(|p| p.ends_with("target.pl"))
    );
    assert!(page.contains("<tr class=\"current\"><td class=\"line-number\">1</td>"));
    assert!(page.contains("my $x = 1;"));
}

#[test]
fn test_commands_sent_while_busy_are_queued_in_order() {
    let mut h = Harness::new();
    let mut bridge = h.bridge();
    h.start(&mut bridge);
    h.next_page(&mut bridge);

    bridge.submit("n", &mut h.slots).expect("first command");
    bridge.submit("s", &mut h.slots).expect("second command");
    assert_eq!(bridge.queued(), 1);

    h.next_page(&mut bridge);
    assert_eq!(bridge.state().source_line, Some(2));
    let page = h.next_page(&mut bridge);

    assert_eq!(bridge.queued(), 0);
    assert_eq!(bridge.state().last_command, "s");
    assert_eq!(bridge.state().source_line, Some(3));
    let transcript = &bridge.state().transcript;
    let n_at = transcript.find("cmd=n").expect("n in transcript");
    let s_at = transcript.find("cmd=s").expect("s in transcript");
    assert!(n_at < s_at);
    assert!(page.contains("value=\"s\""));
}

#[test]
fn test_restart_clears_state_and_replaces_session() {
    let mut h = Harness::new();
    let mut bridge = h.bridge();
    let first = h.start(&mut bridge);
    h.next_page(&mut bridge);
    bridge.submit("n", &mut h.slots).expect("command");
    h.next_page(&mut bridge);
    assert!(!bridge.state().last_output_line.is_empty());

    let second = bridge
        .restart(&h.config, &h.settings, &mut h.slots)
        .expect("restart");

    assert_ne!(first, second);
    assert_eq!(bridge.state().source_highlight_path, None);
    assert!(bridge.state().last_output_line.is_empty());
    assert!(bridge.state().transcript.is_empty());
    assert_eq!(bridge.state().script_to_debug.as_ref(), Some(&h.script));
    assert_eq!(h.slots.live_count(), 1);

    // Output of the first session is still in the channel and must be ignored.
    let page = h.next_page(&mut bridge);
    assert_eq!(bridge.session(), Some(second));
    assert!(!page.contains("cmd=n"));
}

#[test]
fn test_submit_without_session_fails() {
    let mut h = Harness::new();
    let mut bridge = h.bridge();
    let err = bridge.submit("n", &mut h.slots).unwrap_err();
    assert!(matches!(err, RunError::NotRunning(_)));

    let err = bridge
        .restart(&h.config, &h.settings, &mut h.slots)
        .unwrap_err();
    assert!(matches!(err, RunError::NoDebugTarget));
}

#[test]
fn test_quit_command_ends_session() {
    let mut h = Harness::new();
    let mut bridge = h.bridge();
    h.start(&mut bridge);
    h.next_page(&mut bridge);

    bridge.submit("q", &mut h.slots).expect("quit");
    let page = h.next_page(&mut bridge);

    assert!(page.contains("Debugger session ended."));
    assert_eq!(bridge.phase(), DebuggerPhase::Idle);
    assert_eq!(bridge.session(), None);
}

// ── Real perl5db ─────────────────────────────────────────────────────────────

fn system_perl() -> Option<&'static str> {
    ["/usr/bin/perl", "/bin/perl"]
        .into_iter()
        .find(|path| Path::new(path).is_file())
}

#[test]
fn test_perl_debugger_talks_over_pipes() {
    let Some(perl) = system_perl() else {
        eprintln!("perl not installed, skipping");
        return;
    };
    let mut h = Harness::new();
    h.config.debugger = DebuggerConfig::default();
    h.settings.interpreters.perl = perl.to_string();
    h.script = h.script.with_file_name("target.pl");
    let mut bridge = h.bridge();
    h.start(&mut bridge);

    let page = h.next_page(&mut bridge);
    assert_eq!(bridge.phase(), DebuggerPhase::Ready);
    assert_eq!(bridge.state().source_line, Some(1));
    assert!(page.contains("my $x = 1;"));

    bridge.submit("n", &mut h.slots).expect("step");
    h.next_page(&mut bridge);
    assert_eq!(bridge.state().source_line, Some(2));

    bridge.submit("q", &mut h.slots).expect("quit");
    let page = h.next_page(&mut bridge);
    assert!(page.contains("Debugger session ended."));
}
