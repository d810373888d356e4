//! CSS theme selection.
//!
//! Themes are `<name>.css` files in the themes directory. The active theme is
//! a copy named `current.css`, which every page links to.

use peb_scripting::formatter::html_escape;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use std::fmt::Write;
use std::io;
use std::path::{Path, PathBuf};

pub const CURRENT_THEME_FILE: &str = "current.css";

#[derive(Debug, Clone)]
pub struct ThemeManager {
    dir: PathBuf,
}

impl ThemeManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Names of the available themes, sorted.
    pub fn list(&self) -> io::Result<Vec<String>> {
        let mut themes = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.file_name().and_then(|n| n.to_str()) == Some(CURRENT_THEME_FILE) {
                continue;
            }
            if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("css"))
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
            {
                themes.push(stem.to_string());
            }
        }
        themes.sort();
        Ok(themes)
    }

    /// Make `name` the current theme. Returns the written `current.css`.
    pub fn apply(&self, name: &str) -> io::Result<PathBuf> {
        let valid = !name.is_empty()
            && name != "current"
            && !name.contains(['/', '\\'])
            && !name.contains("..");
        if !valid {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid theme name '{name}'"),
            ));
        }
        let source = self.dir.join(format!("{name}.css"));
        let current = self.dir.join(CURRENT_THEME_FILE);
        std::fs::copy(&source, &current)?;
        log::info!("Theme '{}' applied", name);
        Ok(current)
    }

    /// Page listing the themes as `settheme:` links.
    pub fn selection_page(&self, themes: &[String]) -> String {
        let mut html = String::from(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
             <title>Select Theme</title>\n<link rel=\"stylesheet\" href=\"/current.css\">\n\
             </head>\n<body>\n<h1>Select Theme</h1>\n<ul>\n",
        );
        for theme in themes {
            let _ = writeln!(
                html,
                "<li><a href=\"settheme:{}\">{}</a></li>",
                utf8_percent_encode(theme, NON_ALPHANUMERIC),
                html_escape(theme)
            );
        }
        html.push_str("</ul>\n</body>\n</html>\n");
        html
    }
}
