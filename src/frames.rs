//! Renderer boundary.
//!
//! The shell never renders anything itself. Everything it wants shown goes
//! through a [`FrameManager`], which owns the renderer windows and frames.

use peb_scripting::{FrameRef, WindowId};
use std::path::{Path, PathBuf};
use url::Url;

/// How a frame should be printed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrintMode {
    Print,
    Preview,
    Pdf(PathBuf),
}

/// Windows and frames of the embedded renderer.
pub trait FrameManager {
    fn create_window(&mut self, window: WindowId);

    fn close_window(&mut self, window: WindowId);

    fn load_url(&mut self, frame: FrameRef, url: &Url);

    /// Load a fully written local file as the frame's document.
    fn load_file(&mut self, frame: FrameRef, path: &Path);

    /// Replace the frame's document with generated HTML.
    fn set_html(&mut self, frame: FrameRef, html: &str);

    /// Append streamed script output to the frame's document.
    fn append_output(&mut self, frame: FrameRef, text: &str);

    fn reload(&mut self, frame: FrameRef);

    /// Drop cached pages and resources so regenerated files are re-read.
    fn clear_memory_caches(&mut self);

    fn print(&mut self, frame: FrameRef, mode: PrintMode);
}
