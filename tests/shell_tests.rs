//! End-to-end navigation tests: classifier, enactor and event routing with
//! recording renderer and desktop doubles and a real `/bin/sh`.
#![cfg(unix)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use peb::desktop::Desktop;
use peb::frames::{FrameManager, PrintMode};
use peb::navigation::NavigationRequest;
use peb::{Shell, ShellError};
use peb_config::{Config, SettingsStore};
use peb_scripting::{FrameRef, InvocationState, WindowId};
use tempfile::TempDir;
use tokio::runtime::Runtime;
use url::Url;

const EVENT_TIMEOUT: Duration = Duration::from_secs(10);

// ── Test doubles ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum FrameOp {
    CreateWindow(WindowId),
    CloseWindow(WindowId),
    LoadUrl(FrameRef, String),
    /// Path plus its contents at load time.
    LoadFile(FrameRef, PathBuf, String),
    SetHtml(FrameRef, String),
    Append(FrameRef, String),
    Reload(FrameRef),
    ClearCaches,
    Print(FrameRef, PrintMode),
}

struct RecordingFrames(Rc<RefCell<Vec<FrameOp>>>);

impl FrameManager for RecordingFrames {
    fn create_window(&mut self, window: WindowId) {
        self.0.borrow_mut().push(FrameOp::CreateWindow(window));
    }

    fn close_window(&mut self, window: WindowId) {
        self.0.borrow_mut().push(FrameOp::CloseWindow(window));
    }

    fn load_url(&mut self, frame: FrameRef, url: &Url) {
        self.0
            .borrow_mut()
            .push(FrameOp::LoadUrl(frame, url.to_string()));
    }

    fn load_file(&mut self, frame: FrameRef, path: &Path) {
        let contents = std::fs::read_to_string(path).unwrap_or_default();
        self.0
            .borrow_mut()
            .push(FrameOp::LoadFile(frame, path.to_path_buf(), contents));
    }

    fn set_html(&mut self, frame: FrameRef, html: &str) {
        self.0
            .borrow_mut()
            .push(FrameOp::SetHtml(frame, html.to_string()));
    }

    fn append_output(&mut self, frame: FrameRef, text: &str) {
        self.0
            .borrow_mut()
            .push(FrameOp::Append(frame, text.to_string()));
    }

    fn reload(&mut self, frame: FrameRef) {
        self.0.borrow_mut().push(FrameOp::Reload(frame));
    }

    fn clear_memory_caches(&mut self) {
        self.0.borrow_mut().push(FrameOp::ClearCaches);
    }

    fn print(&mut self, frame: FrameRef, mode: PrintMode) {
        self.0.borrow_mut().push(FrameOp::Print(frame, mode));
    }
}

#[derive(Debug, Default)]
struct DesktopLog {
    opened: Vec<String>,
    launched: Vec<String>,
    notices: Vec<(String, String)>,
    errors: Vec<(String, String)>,
    /// Answers for the next file, folder and save pickers.
    picks: VecDeque<Option<PathBuf>>,
}

struct RecordingDesktop(Rc<RefCell<DesktopLog>>);

impl RecordingDesktop {
    fn pick(&self) -> Option<PathBuf> {
        self.0.borrow_mut().picks.pop_front().flatten()
    }
}

impl Desktop for RecordingDesktop {
    fn open_url(&self, url: &str) -> io::Result<()> {
        self.0.borrow_mut().opened.push(url.to_string());
        Ok(())
    }

    fn launch(&self, command: &str) -> io::Result<()> {
        self.0.borrow_mut().launched.push(command.to_string());
        Ok(())
    }

    fn notify(&self, title: &str, message: &str) {
        self.0
            .borrow_mut()
            .notices
            .push((title.to_string(), message.to_string()));
    }

    fn pick_file(&self, _title: &str, _start_dir: &Path) -> Option<PathBuf> {
        self.pick()
    }

    fn pick_folder(&self, _title: &str, _start_dir: &Path) -> Option<PathBuf> {
        self.pick()
    }

    fn pick_save_file(&self, _title: &str, _start_dir: &Path) -> Option<PathBuf> {
        self.pick()
    }

    fn show_error(&self, title: &str, message: &str) {
        self.0
            .borrow_mut()
            .errors
            .push((title.to_string(), message.to_string()));
    }
}

// ── Harness ─────────────────────────────────────────────────────────────

/// Prints a location and a prompt after start-up and after every command.
const FAKE_DEBUGGER: &str = r#"i=1
printf 'main::(target.pl:%d):\n  DB<%d> ' "$i" "$i"
while read -r cmd; do
  i=$((i+1))
  if [ "$cmd" = q ]; then exit 0; fi
  printf 'cmd=%s\nmain::(target.pl:%d):\n  DB<%d> ' "$cmd" "$i" "$i"
done
"#;

struct Harness {
    // Field order matters: the shell must drop before the runtime.
    shell: Shell,
    frames: Rc<RefCell<Vec<FrameOp>>>,
    desktop: Rc<RefCell<DesktopLog>>,
    dir: TempDir,
    _runtime: Runtime,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(|_| {})
    }

    fn with_config(adjust: impl FnOnce(&mut Config)) -> Self {
        let runtime = Runtime::new().expect("tokio runtime");
        let dir = TempDir::new().expect("temp dir");
        std::fs::write(dir.path().join("index.htm"), "<h1>Start</h1>\n").expect("start page");

        let mut config = Config::default()
            .with_base_dir(dir.path())
            .with_pseudo_domain("peb-domain");
        config
            .scripts
            .extensions
            .insert("sh".to_string(), "sh".to_string());
        config
            .interpreters
            .extra
            .insert("sh".to_string(), "/bin/sh".to_string());
        config.scripts.timeout_secs = 10;
        config.debugger.interpreter = "/bin/sh".to_string();
        config.debugger.interpreter_args = Vec::new();
        config.debugger.formatter = None;
        adjust(&mut config);

        let frames = Rc::new(RefCell::new(Vec::new()));
        let desktop = Rc::new(RefCell::new(DesktopLog::default()));
        let settings = SettingsStore::in_memory(&config);
        let mut shell = Shell::new(
            config,
            settings,
            runtime.handle().clone(),
            Box::new(RecordingFrames(Rc::clone(&frames))),
            Box::new(RecordingDesktop(Rc::clone(&desktop))),
        )
        .expect("shell")
        .with_host_env(vec![("PATH".to_string(), "/usr/bin:/bin".to_string())])
        .with_temp_dir(dir.path());
        shell.start().expect("start page");
        frames.borrow_mut().clear();

        Self {
            shell,
            frames,
            desktop,
            dir,
            _runtime: runtime,
        }
    }

    fn write(&self, relative: &str, body: &str) -> PathBuf {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create dirs");
        }
        std::fs::write(&path, body).expect("write file");
        path
    }

    fn click(&mut self, url: &str, origin: FrameRef) -> bool {
        let request = NavigationRequest::link(url, origin).expect("valid url");
        self.shell.navigate(&request)
    }

    fn ops(&self) -> Vec<FrameOp> {
        self.frames.borrow().clone()
    }

    /// Text appended to `frame` so far.
    fn appended(&self, frame: FrameRef) -> String {
        self.frames
            .borrow()
            .iter()
            .filter_map(|op| match op {
                FrameOp::Append(f, text) if *f == frame => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    fn pages(&self, frame: FrameRef) -> Vec<String> {
        self.frames
            .borrow()
            .iter()
            .filter_map(|op| match op {
                FrameOp::SetHtml(f, html) if *f == frame => Some(html.clone()),
                _ => None,
            })
            .collect()
    }

    /// Route script events until `done` holds.
    fn pump_until(&mut self, done: impl Fn(&Harness) -> bool) {
        while !done(self) {
            let event = self
                .shell
                .wait_event(EVENT_TIMEOUT)
                .expect("timed out waiting for a script event");
            self.shell.handle_event(event);
        }
    }
}

fn main_frame() -> FrameRef {
    FrameRef::top(1)
}

fn child_frame() -> FrameRef {
    FrameRef::new(1, 2)
}

// ── Scripts ─────────────────────────────────────────────────────────────

#[test]
fn test_blocking_script_output_is_loaded_into_origin_frame() {
    let mut h = Harness::new();
    h.write("cgi/hello.sh", "echo \"hello $QUERY_STRING via $REQUEST_METHOD\"\n");

    let proceed = h.click("http://peb-domain/cgi/hello.sh?name=Ada", main_frame());

    assert!(!proceed);
    let ops = h.ops();
    assert_eq!(ops.len(), 2, "{ops:?}");
    assert_eq!(ops[0], FrameOp::ClearCaches);
    match &ops[1] {
        FrameOp::LoadFile(frame, _, contents) => {
            assert_eq!(*frame, main_frame());
            assert_eq!(contents, "hello name=Ada via GET\n");
        }
        other => panic!("expected a file load, got {other:?}"),
    }
    assert!(h.desktop.borrow().errors.is_empty());
}

#[test]
fn test_relative_interpreter_path_is_taken_from_the_root() {
    let mut h = Harness::with_config(|config| {
        config
            .interpreters
            .extra
            .insert("sh".to_string(), "bin/sh-link".to_string());
    });
    std::fs::create_dir_all(h.dir.path().join("bin")).expect("bin dir");
    std::os::unix::fs::symlink("/bin/sh", h.dir.path().join("bin/sh-link")).expect("symlink");
    h.write("cgi/hello.sh", "echo linked\n");

    h.click("http://peb-domain/cgi/hello.sh", main_frame());

    assert!(h.desktop.borrow().errors.is_empty());
    assert!(h.ops().iter().any(|op| matches!(
        op,
        FrameOp::LoadFile(_, _, contents) if contents == "linked\n"
    )));
}

#[test]
fn test_long_running_script_streams_into_child_frame() {
    let mut h = Harness::new();
    h.write("tools/monitor-longrun.sh", "echo tick\necho tock\n");

    let proceed = h.click("http://peb-domain/tools/monitor-longrun.sh", child_frame());
    assert!(!proceed);
    assert_eq!(h.desktop.borrow().notices.len(), 1);
    assert_eq!(
        h.desktop.borrow().notices[0].0,
        "Long-running script started"
    );

    h.pump_until(|h| h.shell.live_sessions() == 0);

    assert_eq!(h.appended(child_frame()), "tick\ntock\n");
    assert!(
        !h.ops().iter().any(|op| matches!(op, FrameOp::CreateWindow(_))),
        "child-frame output must not open a window"
    );
    let window = h.shell.window(1).expect("main window");
    assert_eq!(window.pipeline.running(), None);
    assert_eq!(window.pipeline.state(), InvocationState::Idle);
}

#[test]
fn test_long_running_script_from_top_frame_gets_its_own_window() {
    let mut h = Harness::new();
    h.write("longrun/report.sh", "echo report\n");

    h.click("http://peb-domain/longrun/report.sh", main_frame());

    assert!(h.ops().contains(&FrameOp::CreateWindow(2)));
    h.pump_until(|h| h.shell.live_sessions() == 0);
    assert_eq!(h.appended(FrameRef::top(2)), "report\n");
    assert_eq!(h.appended(main_frame()), "");
}

#[test]
fn test_missing_script_is_reported_without_spawning() {
    let mut h = Harness::new();

    let proceed = h.click("http://peb-domain/cgi/absent.sh", main_frame());

    assert!(!proceed);
    let errors = h.desktop.borrow().errors.clone();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].0, "Missing file");
    assert!(h.ops().is_empty());
    assert_eq!(h.shell.live_sessions(), 0);
    assert_eq!(h.shell.window_ids(), vec![1]);
}

#[test]
fn test_picked_file_reaches_only_the_next_script() {
    let mut h = Harness::new();
    h.write("cgi/show.sh", "echo \"file=$FILE_TO_OPEN\"\n");
    let picked = h.dir.path().join("notes.txt");
    h.desktop.borrow_mut().picks.push_back(Some(picked.clone()));

    h.click("openfile:", main_frame());
    assert_eq!(h.desktop.borrow().notices[0].0, "File selected");

    h.click("http://peb-domain/cgi/show.sh?a=1", main_frame());
    h.click("http://peb-domain/cgi/show.sh?a=2", main_frame());

    let loaded: Vec<String> = h
        .ops()
        .into_iter()
        .filter_map(|op| match op {
            FrameOp::LoadFile(_, _, contents) => Some(contents),
            _ => None,
        })
        .collect();
    assert_eq!(
        loaded,
        vec![format!("file={}\n", picked.display()), "file=\n".to_string()]
    );
}

// ── Remote links and files ──────────────────────────────────────────────

#[test]
fn test_unlisted_domain_goes_to_system_browser() {
    let mut h = Harness::new();

    let proceed = h.click("http://example.com/", main_frame());

    assert!(!proceed);
    assert_eq!(h.desktop.borrow().opened, vec!["http://example.com/"]);
    assert!(h.ops().is_empty(), "renderer must not navigate");
}

#[test]
fn test_allowed_domain_opens_by_frame() {
    let mut h = Harness::with_config(|config| {
        config.network.allowed_domains = vec!["docs.example.org".to_string()];
    });

    h.click("https://docs.example.org/a", child_frame());
    h.click("https://docs.example.org/b", main_frame());

    assert_eq!(
        h.ops(),
        vec![
            FrameOp::LoadUrl(child_frame(), "https://docs.example.org/a".to_string()),
            FrameOp::CreateWindow(2),
            FrameOp::LoadUrl(FrameRef::top(2), "https://docs.example.org/b".to_string()),
        ]
    );
}

#[test]
fn test_missing_local_file_is_reported() {
    let mut h = Harness::new();
    let url = Url::from_file_path(h.dir.path().join("gone.pdf")).expect("file url");

    let proceed = h.click(url.as_str(), main_frame());

    assert!(!proceed);
    assert_eq!(h.desktop.borrow().errors.len(), 1);
    assert!(h.desktop.borrow().opened.is_empty());
}

#[test]
fn test_unmatched_navigation_proceeds() {
    let mut h = Harness::new();
    assert!(h.click("ftp://files.example.com/readme", main_frame()));
    assert!(h.ops().is_empty());
}

// ── Pseudo-commands ─────────────────────────────────────────────────────

#[test]
fn test_settings_page_shows_current_values_without_spawning() {
    let mut h = Harness::new();

    assert!(!h.click("about:config", main_frame()));

    let pages = h.pages(main_frame());
    assert_eq!(pages.len(), 1);
    assert!(pages[0].contains("perl/bin"));
    assert!(pages[0].contains("name=\"interpreters.perl\""));
    assert_eq!(h.shell.live_sessions(), 0);
}

#[test]
fn test_settings_form_updates_the_store() {
    let mut h = Harness::new();
    let submit = NavigationRequest::form_get(
        "about:config?interpreters.perl=%2Fopt%2Fperl%2Fbin%2Fperl&environment.lib_path=lib",
        main_frame(),
    )
    .expect("valid url");

    h.shell.navigate(&submit);

    let settings = h.shell.settings().current();
    assert_eq!(settings.interpreters.perl, "/opt/perl/bin/perl");
    assert_eq!(settings.lib_path, "lib");
    let pages = h.pages(main_frame());
    assert!(pages[0].contains("Settings saved."));
    assert!(pages[0].contains("/opt/perl/bin/perl"));
}

#[test]
fn test_set_theme_copies_persists_and_reloads() {
    let mut h = Harness::new();
    h.write("resources/themes/dark.css", "body { color: white; }\n");
    h.write("resources/themes/light.css", "body { color: black; }\n");

    h.click("selecttheme:", main_frame());
    let pages = h.pages(main_frame());
    assert!(pages[0].contains("settheme:dark"));
    assert!(pages[0].contains("settheme:light"));

    h.click("settheme:dark", main_frame());

    let current = std::fs::read_to_string(h.dir.path().join("resources/themes/current.css"))
        .expect("current theme");
    assert_eq!(current, "body { color: white; }\n");
    assert_eq!(h.shell.settings().current().theme, "dark");
    let ops = h.ops();
    assert_eq!(
        &ops[ops.len() - 2..],
        &[FrameOp::ClearCaches, FrameOp::Reload(main_frame())]
    );
}

#[test]
fn test_interpreter_selection_updates_settings_and_cancel_keeps_them() {
    let mut h = Harness::new();
    h.desktop
        .borrow_mut()
        .picks
        .push_back(Some(PathBuf::from("/usr/local/bin/python3")));

    h.click("selectpython:", main_frame());
    assert_eq!(
        h.shell.settings().current().interpreters.python,
        "/usr/local/bin/python3"
    );

    h.desktop.borrow_mut().picks.push_back(None);
    h.click("selectpython:", main_frame());
    assert_eq!(
        h.shell.settings().current().interpreters.python,
        "/usr/local/bin/python3"
    );
    assert!(h.desktop.borrow().errors.is_empty());
}

#[test]
fn test_print_commands_target_the_main_frame() {
    let mut h = Harness::new();
    h.desktop
        .borrow_mut()
        .picks
        .push_back(Some(h.dir.path().join("page")));

    h.click("http://peb-domain/print", child_frame());
    h.click("pdf:", main_frame());

    assert_eq!(
        h.ops(),
        vec![
            FrameOp::Print(main_frame(), PrintMode::Print),
            FrameOp::Print(main_frame(), PrintMode::Pdf(h.dir.path().join("page.pdf"))),
        ]
    );
}

#[test]
fn test_external_command_is_launched_and_announced() {
    let mut h = Harness::new();

    h.click("external:gedit%20notes.txt", main_frame());

    let log = h.desktop.borrow();
    assert_eq!(log.launched, vec!["gedit notes.txt"]);
    assert_eq!(log.notices[0].1, "gedit notes.txt");
}

// ── Windows and shutdown ────────────────────────────────────────────────

#[test]
fn test_quit_terminates_running_scripts() {
    let mut h = Harness::new();
    h.write("longrun/sleeper.sh", "exec sleep 30\n");
    h.click("http://peb-domain/longrun/sleeper.sh", child_frame());
    assert_eq!(h.shell.live_sessions(), 1);

    h.click("quit:", main_frame());

    assert!(h.shell.is_quitting());
    assert_eq!(h.shell.live_sessions(), 0);
    assert!(h.shell.window_ids().is_empty());
    assert!(h.ops().contains(&FrameOp::CloseWindow(1)));
}

#[test]
fn test_closing_output_window_stops_its_script() {
    let mut h = Harness::new();
    h.write("longrun/sleeper.sh", "exec sleep 30\n");
    h.click("http://peb-domain/longrun/sleeper.sh", main_frame());
    assert_eq!(h.shell.window_ids(), vec![1, 2]);
    assert_eq!(h.shell.live_sessions(), 1);

    h.shell.close_window(2);

    assert_eq!(h.shell.live_sessions(), 0);
    let window = h.shell.window(1).expect("main window");
    assert_eq!(window.pipeline.running(), None);
    assert!(!h.shell.is_quitting());
}

#[test]
fn test_run_delivers_output_of_scripts_started_before_input_closed() {
    for _ in 0..5 {
        let mut h = Harness::new();
        h.write("longrun/out.sh", "echo tick\n");
        let (tx, mut lines) = tokio::sync::mpsc::unbounded_channel();
        tx.send("/longrun/out.sh".to_string()).expect("queue line");
        drop(tx);

        h.shell.run(&mut lines);

        assert!(h.shell.is_quitting());
        assert_eq!(h.appended(FrameRef::top(2)), "tick\n");
    }
}

#[test]
fn test_start_requires_the_start_page() {
    let runtime = Runtime::new().expect("tokio runtime");
    let dir = TempDir::new().expect("temp dir");
    let config = Config::default().with_base_dir(dir.path());
    let settings = SettingsStore::in_memory(&config);
    let frames = Rc::new(RefCell::new(Vec::new()));
    let desktop = Rc::new(RefCell::new(DesktopLog::default()));
    let mut shell = Shell::new(
        config,
        settings,
        runtime.handle().clone(),
        Box::new(RecordingFrames(frames)),
        Box::new(RecordingDesktop(desktop)),
    )
    .expect("shell");

    let err = shell.start().expect_err("start page is missing");
    assert!(matches!(err, ShellError::ConfigurationMissing(_)));
    assert!(err.is_fatal());
    drop(shell);
}

// ── Debugger ────────────────────────────────────────────────────────────

#[test]
fn test_debugger_command_starts_session_and_renders_steps() {
    let mut h = Harness::new();
    h.write("fake-debugger.sh", FAKE_DEBUGGER);
    h.write("target.pl", "my $x = 1;\n$x++;\nprint $x;\n");

    h.click(
        "http://peb-domain/perl-debugger?script=fake-debugger.sh&command=n",
        main_frame(),
    );
    assert_eq!(h.shell.live_sessions(), 1);

    h.pump_until(|h| h.pages(main_frame()).len() >= 2);

    let pages = h.pages(main_frame());
    assert!(pages[0].contains("<tr class=\"current\"><td class=\"line-number\">1</td>"));
    assert!(pages[1].contains("cmd=n"));
    assert!(pages[1].contains("<tr class=\"current\"><td class=\"line-number\">2</td>"));

    h.click("http://peb-domain/perl-debugger?command=q", main_frame());
    h.pump_until(|h| h.shell.live_sessions() == 0);
    let pages = h.pages(main_frame());
    assert!(pages.last().expect("final page").contains("Debugger session ended."));
}

#[test]
fn test_debugger_command_without_session_is_reported() {
    let mut h = Harness::new();

    h.click("http://peb-domain/perl-debugger?command=n", main_frame());

    assert_eq!(h.desktop.borrow().errors.len(), 1);
    assert_eq!(h.shell.live_sessions(), 0);
}
