//! Identity of the renderer frames that script output is sent to.

use std::fmt;

pub type WindowId = u64;
pub type FrameId = u64;

/// A frame inside a window. Frame `0` is always the window's top-level frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRef {
    pub window: WindowId,
    pub frame: FrameId,
}

impl FrameRef {
    pub const TOP_FRAME: FrameId = 0;

    pub fn top(window: WindowId) -> Self {
        Self {
            window,
            frame: Self::TOP_FRAME,
        }
    }

    pub fn new(window: WindowId, frame: FrameId) -> Self {
        Self { window, frame }
    }

    pub fn is_top(&self) -> bool {
        self.frame == Self::TOP_FRAME
    }
}

impl fmt::Display for FrameRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}/f{}", self.window, self.frame)
    }
}
