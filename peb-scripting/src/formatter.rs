//! HTML assembly for debugger pages.

use std::fmt::Write;

/// Escape text for inclusion in HTML element content or attribute values.
pub fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Numbered source listing with `current_line` (1-based) marked.
///
/// Used when no external formatter is configured.
pub fn highlight_listing(source: &str, current_line: usize) -> String {
    let mut html = String::from("<table class=\"source\">\n");
    for (index, line) in source.lines().enumerate() {
        let number = index + 1;
        let class = if number == current_line {
            " class=\"current\""
        } else {
            ""
        };
        let _ = writeln!(
            html,
            "<tr{class}><td class=\"line-number\">{number}</td><td><pre>{}</pre></td></tr>",
            html_escape(line)
        );
    }
    html.push_str("</table>\n");
    html
}

/// One debugger page: transcript and highlighted source side by side.
#[derive(Debug, Clone, Default)]
pub struct DebuggerPage<'a> {
    /// Address the command form submits to.
    pub action: &'a str,
    pub script: &'a str,
    pub last_command: &'a str,
    pub transcript: &'a str,
    /// Already-formatted HTML of the current source, if any.
    pub source_html: &'a str,
    pub status: Option<&'a str>,
}

impl DebuggerPage<'_> {
    pub fn render(&self) -> String {
        let mut html = String::new();
        let _ = write!(
            html,
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
             <title>Debugger: {script}</title>\n\
             <link rel=\"stylesheet\" href=\"/current.css\">\n</head>\n<body>\n",
            script = html_escape(self.script)
        );
        let _ = writeln!(
            html,
            "<form action=\"{}\" method=\"get\">\
             <input type=\"text\" name=\"command\" value=\"{}\" autofocus>\
             <input type=\"submit\" value=\"Send\"></form>",
            html_escape(self.action),
            html_escape(self.last_command)
        );
        if let Some(status) = self.status {
            let _ = writeln!(html, "<p class=\"status\">{}</p>", html_escape(status));
        }
        if !self.source_html.is_empty() {
            let _ = writeln!(html, "<div class=\"source\">\n{}</div>", self.source_html);
        }
        let _ = writeln!(
            html,
            "<pre class=\"transcript\">{}</pre>",
            html_escape(self.transcript)
        );
        html.push_str("</body>\n</html>\n");
        html
    }
}
