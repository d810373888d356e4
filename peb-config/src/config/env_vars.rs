//! Environment variable allow-list for spawned scripts.
//!
//! A script sees only the variables named in `environment.allowed` plus the
//! per-request CGI variables. Everything else in the shell's own environment
//! is withheld.

/// Variables the script pipeline sets per request. They are never copied
/// from the shell's environment.
pub const PER_REQUEST_VARS: &[&str] = &[
    "REQUEST_METHOD",
    "QUERY_STRING",
    "CONTENT_LENGTH",
    "FILE_TO_OPEN",
    "FOLDER_TO_OPEN",
    "FILE_TO_CREATE",
];

/// Check whether a variable name is on the allow-list.
///
/// Windows spells the search path `Path`, so names compare
/// case-insensitively there and exactly everywhere else.
pub fn is_env_var_allowed(var_name: &str, allowed: &[String]) -> bool {
    if cfg!(windows) {
        allowed.iter().any(|name| name.eq_ignore_ascii_case(var_name))
    } else {
        allowed.iter().any(|name| name == var_name)
    }
}

/// Filter an environment down to allow-listed names.
pub fn filter_allowed<I, K, V>(vars: I, allowed: &[String]) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    vars.into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .filter(|(k, _)| is_env_var_allowed(k, allowed))
        .collect()
}
