//! The `about:config` settings page.

use peb_config::{ConfigError, RuntimeSettings, SettingKey, SettingsStore};
use peb_scripting::formatter::html_escape;
use std::fmt::Write;

pub const SETTINGS_URL: &str = "about:config";

fn text_field(html: &mut String, key: SettingKey, label: &str, value: &str) {
    let _ = writeln!(
        html,
        "<p><label>{label}<br>\
         <input type=\"text\" size=\"60\" name=\"{name}\" value=\"{value}\"></label></p>",
        name = key.as_str(),
        value = html_escape(value),
    );
}

/// Render the page with the current runtime settings.
pub fn render(settings: &RuntimeSettings, message: Option<&str>) -> String {
    let mut html = String::from(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>Settings</title>\n\
         <link rel=\"stylesheet\" href=\"/current.css\">\n</head>\n<body>\n<h1>Settings</h1>\n",
    );
    if let Some(message) = message {
        let _ = writeln!(html, "<p class=\"status\">{}</p>", html_escape(message));
    }
    let _ = writeln!(html, "<form action=\"{SETTINGS_URL}\" method=\"get\">");

    text_field(
        &mut html,
        SettingKey::PerlInterpreter,
        "Perl interpreter",
        &settings.interpreters.perl,
    );
    text_field(
        &mut html,
        SettingKey::PythonInterpreter,
        "Python interpreter",
        &settings.interpreters.python,
    );
    text_field(
        &mut html,
        SettingKey::PhpInterpreter,
        "PHP interpreter",
        &settings.interpreters.php,
    );
    text_field(&mut html, SettingKey::LibPath, "Library path", &settings.lib_path);
    let _ = writeln!(
        html,
        "<p><label>PATH additions (one per line)<br>\
         <textarea name=\"{}\" rows=\"5\" cols=\"60\">{}</textarea></label></p>",
        SettingKey::PathAdditions.as_str(),
        html_escape(&settings.path_additions.join("\n")),
    );
    text_field(
        &mut html,
        SettingKey::DebugFormatter,
        "Debugger source formatter",
        settings.debug_formatter.as_deref().unwrap_or(""),
    );

    html.push_str("<p><input type=\"submit\" value=\"Save\"></p>\n</form>\n</body>\n</html>\n");
    html
}

/// Apply a submitted settings form (`key=value&...`) through the store.
///
/// Returns the keys that were submitted. Stops at the first unknown key or
/// failed update; earlier updates stay applied.
pub fn apply_form(store: &mut SettingsStore, form: &str) -> Result<Vec<SettingKey>, ConfigError> {
    let mut applied = Vec::new();
    for (name, value) in url::form_urlencoded::parse(form.as_bytes()) {
        let key: SettingKey = name.parse()?;
        store.update(key, &value)?;
        applied.push(key);
    }
    Ok(applied)
}
