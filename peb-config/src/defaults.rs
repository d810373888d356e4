//! Default value functions for configuration.
//!
//! Each function is used as a `#[serde(default = "crate::defaults::...")]`
//! attribute on a config field so that a minimal settings file loads.

use std::collections::BTreeMap;

// ── Root ───────────────────────────────────────────────────────────────────

pub fn root_directory() -> String {
    ".".to_string()
}

pub fn start_page() -> String {
    "index.htm".to_string()
}

// ── GUI ────────────────────────────────────────────────────────────────────

pub fn icon() -> String {
    "icons/camel.png".to_string()
}

pub fn browser_title() -> String {
    "dynamic".to_string()
}

pub fn theme() -> String {
    "default".to_string()
}

pub fn themes_directory() -> String {
    "resources/themes".to_string()
}

// ── Network ────────────────────────────────────────────────────────────────

pub fn pseudo_domain() -> String {
    "perl-executing-browser-pseudodomain".to_string()
}

pub fn allowed_domains() -> Vec<String> {
    vec!["localhost".to_string(), "www.youtube.com".to_string()]
}

// ── Scripts ────────────────────────────────────────────────────────────────

/// Script extension → interpreter key (looked up in `interpreters`).
pub fn script_extensions() -> BTreeMap<String, String> {
    [("pl", "perl"), ("py", "python"), ("php", "php")]
        .into_iter()
        .map(|(ext, key)| (ext.to_string(), key.to_string()))
        .collect()
}

pub fn static_extensions() -> Vec<String> {
    ["htm", "html"].into_iter().map(String::from).collect()
}

pub fn long_running_marker() -> String {
    "longrun".to_string()
}

/// Blocking scripts are killed after this many seconds.
pub fn script_timeout_secs() -> u64 {
    30
}

// ── Interpreters ───────────────────────────────────────────────────────────

pub fn perl_interpreter() -> String {
    if cfg!(windows) { "perl.exe" } else { "perl" }.to_string()
}

pub fn python_interpreter() -> String {
    if cfg!(windows) { "python.exe" } else { "python" }.to_string()
}

pub fn php_interpreter() -> String {
    if cfg!(windows) { "php-cgi.exe" } else { "php" }.to_string()
}

// ── Environment ────────────────────────────────────────────────────────────

/// Name of the search-path variable on this platform.
pub fn path_variable() -> String {
    if cfg!(windows) { "Path" } else { "PATH" }.to_string()
}

pub fn lib_variable() -> String {
    "PERL5LIB".to_string()
}

pub fn lib_path() -> String {
    "perl/lib".to_string()
}

pub fn path_additions() -> Vec<String> {
    vec!["perl/bin".to_string()]
}

/// The only variables a spawned script may inherit or receive besides the
/// per-request CGI variables.
pub fn allowed_env_vars() -> Vec<String> {
    vec![path_variable(), "DOCUMENT_ROOT".to_string(), lib_variable()]
}

// ── Debugger ───────────────────────────────────────────────────────────────

pub fn debugger_function_name() -> String {
    "perl-debugger".to_string()
}

pub fn debugger_interpreter() -> String {
    "perl".to_string()
}

pub fn debugger_interpreter_args() -> Vec<String> {
    vec!["-d".to_string()]
}

/// Matches the `DB<12>` prompt the Perl debugger prints when it waits for input.
pub fn debugger_prompt_pattern() -> String {
    r"DB<+\d+>+".to_string()
}

/// Matches `main::(path/to/file.pl:12):` location lines.
pub fn debugger_location_pattern() -> String {
    r"\(([^()]+):(\d+)\):".to_string()
}

/// Keeps perl5db on the child's pipes: no Term::ReadLine, and the debugger
/// console reads stdin and writes stderr instead of opening `/dev/tty`.
pub fn debugger_environment() -> BTreeMap<String, String> {
    [(
        "PERLDB_OPTS".to_string(),
        "ReadLine=0 TTY=/dev/stdin,/dev/stderr".to_string(),
    )]
        .into_iter()
        .collect()
}

// ── Logging ────────────────────────────────────────────────────────────────

pub fn log_prefix() -> String {
    "peb".to_string()
}

pub fn log_directory() -> String {
    "logs".to_string()
}

// ── Generic ────────────────────────────────────────────────────────────────

pub fn bool_true() -> bool {
    true
}

pub fn bool_false() -> bool {
    false
}
