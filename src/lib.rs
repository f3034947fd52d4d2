//! simple-console - colorized, cursor-addressable console output
//!
//! A small layer over the process's text console: text colors, cursor
//! position and visibility, clearing, the window title, and detection of
//! whether a real interactive console is attached at all.
//!
//! # Architecture
//!
//! ```text
//! Console<D: ConsoleDevice>        (context: one per process or per test)
//! ├── HandleManager   lazy output handle, attach/allocate fallback
//! ├── AttributeState  default colors, captured once
//! └── D               WinConsole (Win32) | AnsiConsole (crossterm)
//! ```
//!
//! `ffi` exposes the same operations as flat `sc_*` C functions over one
//! process-wide context, for host runtimes that link the library directly.
//!
//! # Example
//!
//! ```no_run
//! use simple_console::{system_console, Color, ConsoleConfig};
//!
//! let console = system_console(&ConsoleConfig::load());
//! if console.has_real_console() {
//!     console.set_foreground(Color::Yellow.code()).ok();
//!     println!("warning");
//!     console.reset_color().ok();
//! }
//! ```

pub mod ansi;
pub mod attributes;
pub mod config;
pub mod console;
pub mod device;
pub mod error;
pub mod ffi;
pub mod handle;
#[cfg(windows)]
pub mod native;

#[cfg(test)]
mod mock;

pub use attributes::{Attributes, Color, LvbFlags};
pub use config::ConsoleConfig;
pub use console::{Console, ConsoleSize};
pub use device::{ConsoleDevice, Coord, CursorInfo, DeviceError, ScreenBufferInfo, WindowRect};
pub use error::{ConsoleError, Result};
pub use handle::{Acquisition, FallbackPolicy};

/// The console device of the current platform
#[cfg(windows)]
pub type SystemDevice = native::WinConsole;
#[cfg(not(windows))]
pub type SystemDevice = ansi::AnsiConsole;

pub type SystemConsole = Console<SystemDevice>;

/// Context over the current platform's console
pub fn system_console(config: &ConsoleConfig) -> SystemConsole {
    Console::with_config(SystemDevice::new(), config)
}
