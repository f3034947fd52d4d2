//! Console device capability
//!
//! The operating system's console subsystem is treated as an opaque provider
//! of handle-based query and mutate operations. `ConsoleDevice` is that seam:
//! the native Win32 backend, the portable ANSI backend and the test double all
//! implement it, and everything above it only ever talks to the trait.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("console call failed: {0}")]
    Os(#[source] io::Error),

    #[error("{0} is not supported by this console")]
    Unsupported(&'static str),
}

impl From<io::Error> for DeviceError {
    fn from(err: io::Error) -> Self {
        DeviceError::Os(err)
    }
}

pub type DeviceResult<T> = std::result::Result<T, DeviceError>;

/// A cell coordinate in the screen buffer (zero-based column, row)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Coord {
    pub x: i16,
    pub y: i16,
}

impl Coord {
    pub const ORIGIN: Coord = Coord { x: 0, y: 0 };

    pub const fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }
}

/// Inclusive rectangle of the visible window inside the screen buffer
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WindowRect {
    pub left: i16,
    pub top: i16,
    pub right: i16,
    pub bottom: i16,
}

impl WindowRect {
    pub fn width(&self) -> i16 {
        self.right - self.left + 1
    }

    pub fn height(&self) -> i16 {
        self.bottom - self.top + 1
    }
}

/// Snapshot of the screen buffer state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScreenBufferInfo {
    /// Full buffer size, scrollback included
    pub size: Coord,
    /// Cursor position, for devices that report it here. Read the cursor
    /// through `ConsoleDevice::cursor_position` instead.
    pub cursor: Coord,
    /// Current attribute word
    pub attributes: u16,
    pub window: WindowRect,
}

impl ScreenBufferInfo {
    /// Number of cells in the whole buffer
    pub fn cell_count(&self) -> u32 {
        let width = self.size.x.max(0) as u32;
        let height = self.size.y.max(0) as u32;
        width * height
    }

    /// Cells from `position` to the end of its row
    pub fn cells_to_line_end(&self, position: Coord) -> u32 {
        (self.size.x - position.x).max(0) as u32
    }
}

/// Cursor appearance; `size` is a fill percentage (1-100)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CursorInfo {
    pub size: u32,
    pub visible: bool,
}

/// Handle-based access to a console output device.
///
/// Every call is a direct, blocking request to the device. Implementations
/// must not cache anything; memoization is the caller's concern.
pub trait ConsoleDevice {
    /// Opaque reference to an output device
    type Handle: Copy;

    /// Current standard output capability
    fn std_output(&self) -> DeviceResult<Self::Handle>;

    /// Whether the handle refers to a character device rather than a pipe or file
    fn is_character_device(&self, handle: Self::Handle) -> bool;

    /// Attach to the console owned by the parent process
    fn attach_parent_console(&self) -> DeviceResult<()>;

    /// Create a new console for this process
    fn allocate_console(&self) -> DeviceResult<()>;

    /// Detach from the current console
    fn free_console(&self) -> DeviceResult<()>;

    /// Console mode flags; failure means the handle is not a native console
    fn console_mode(&self, handle: Self::Handle) -> DeviceResult<u32>;

    fn screen_buffer_info(&self, handle: Self::Handle) -> DeviceResult<ScreenBufferInfo>;

    /// Current cursor position. Devices whose buffer query carries the
    /// cursor can rely on the default.
    fn cursor_position(&self, handle: Self::Handle) -> DeviceResult<Coord> {
        self.screen_buffer_info(handle).map(|info| info.cursor)
    }

    fn set_text_attribute(&self, handle: Self::Handle, attributes: u16) -> DeviceResult<()>;

    fn set_cursor_position(&self, handle: Self::Handle, position: Coord) -> DeviceResult<()>;

    /// Write `ch` into `len` consecutive cells starting at `start`.
    /// Returns the number of cells written.
    fn fill_character(
        &self,
        handle: Self::Handle,
        ch: char,
        len: u32,
        start: Coord,
    ) -> DeviceResult<u32>;

    /// Write `attributes` into `len` consecutive cells starting at `start`.
    /// Returns the number of cells written.
    fn fill_attribute(
        &self,
        handle: Self::Handle,
        attributes: u16,
        len: u32,
        start: Coord,
    ) -> DeviceResult<u32>;

    fn set_title(&self, title: &str) -> DeviceResult<()>;

    fn cursor_info(&self, handle: Self::Handle) -> DeviceResult<CursorInfo>;

    fn set_cursor_info(&self, handle: Self::Handle, info: CursorInfo) -> DeviceResult<()>;
}
