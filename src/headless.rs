//! Headless renderer adapter.
//!
//! Without an embedded renderer, each frame operation is written as one
//! line to an output stream, e.g. `[w1/f0] load /app/index.html`. Streamed
//! script output is forwarded verbatim after a frame prefix.

use std::io::Write;
use std::path::Path;

use peb_scripting::{FrameRef, WindowId};
use url::Url;

use crate::frames::{FrameManager, PrintMode};

pub struct HeadlessFrames<W: Write> {
    out: W,
}

impl<W: Write> HeadlessFrames<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, frame: impl std::fmt::Display, text: &str) {
        if let Err(e) = writeln!(self.out, "[{frame}] {text}").and_then(|_| self.out.flush()) {
            log::warn!("Headless output failed: {}", e);
        }
    }
}

impl<W: Write> FrameManager for HeadlessFrames<W> {
    fn create_window(&mut self, window: WindowId) {
        self.line(format_args!("w{window}"), "window opened");
    }

    fn close_window(&mut self, window: WindowId) {
        self.line(format_args!("w{window}"), "window closed");
    }

    fn load_url(&mut self, frame: FrameRef, url: &Url) {
        self.line(frame, &format!("load {url}"));
    }

    fn load_file(&mut self, frame: FrameRef, path: &Path) {
        self.line(frame, &format!("load {}", path.display()));
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                for text in contents.lines() {
                    self.line(frame, &format!("| {text}"));
                }
            }
            Err(e) => log::warn!("Cannot read {:?}: {}", path, e),
        }
    }

    fn set_html(&mut self, frame: FrameRef, html: &str) {
        self.line(frame, &format!("html ({} bytes)", html.len()));
    }

    fn append_output(&mut self, frame: FrameRef, text: &str) {
        for text in text.lines() {
            self.line(frame, &format!("> {text}"));
        }
    }

    fn reload(&mut self, frame: FrameRef) {
        self.line(frame, "reload");
    }

    fn clear_memory_caches(&mut self) {
        log::debug!("Memory caches cleared");
    }

    fn print(&mut self, frame: FrameRef, mode: PrintMode) {
        let text = match mode {
            PrintMode::Print => "print".to_string(),
            PrintMode::Preview => "print preview".to_string(),
            PrintMode::Pdf(path) => format!("print to {}", path.display()),
        };
        self.line(frame, &text);
    }
}
