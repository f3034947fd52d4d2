//! C ABI
//!
//! Flat `sc_*` functions over a single process-wide console context, for
//! embedding runtimes that call through a foreign-function interface.
//! Conventions:
//!
//! - mutations return `1` on success and `0` on failure
//! - numeric queries return the value, or `-1` when it cannot be read
//! - `sc_is_cursor_visible` returns `1` when visibility cannot be read
//!
//! The context is created on first call from `ConsoleConfig::load()` and is
//! never torn down. Calls from several threads are serialized.

use std::ffi::CStr;
use std::os::raw::{c_char, c_int};
use std::sync::{Mutex, OnceLock, PoisonError};

use crate::config::ConsoleConfig;
use crate::{system_console, SystemConsole};

pub const SC_BLACK: c_int = 0;
pub const SC_DARK_BLUE: c_int = 1;
pub const SC_DARK_GREEN: c_int = 2;
pub const SC_DARK_CYAN: c_int = 3;
pub const SC_DARK_RED: c_int = 4;
pub const SC_DARK_MAGENTA: c_int = 5;
pub const SC_DARK_YELLOW: c_int = 6;
pub const SC_GRAY: c_int = 7;
pub const SC_DARK_GRAY: c_int = 8;
pub const SC_BLUE: c_int = 9;
pub const SC_GREEN: c_int = 10;
pub const SC_CYAN: c_int = 11;
pub const SC_RED: c_int = 12;
pub const SC_MAGENTA: c_int = 13;
pub const SC_YELLOW: c_int = 14;
pub const SC_WHITE: c_int = 15;

static CONSOLE: OnceLock<Mutex<SystemConsole>> = OnceLock::new();

fn with_console<R>(f: impl FnOnce(&SystemConsole) -> R) -> R {
    let console = CONSOLE.get_or_init(|| Mutex::new(system_console(&ConsoleConfig::load())));
    let guard = console.lock().unwrap_or_else(PoisonError::into_inner);
    f(&guard)
}

fn status<T, E>(result: Result<T, E>) -> c_int {
    result.is_ok() as c_int
}

fn value<T: Into<c_int>, E>(result: Result<T, E>) -> c_int {
    result.map_or(-1, Into::into)
}

/// Set the full attribute word (foreground + background * 16)
#[no_mangle]
pub extern "C" fn sc_set_color(color: c_int) -> c_int {
    with_console(|c| status(c.set_color(color as u16)))
}

#[no_mangle]
pub extern "C" fn sc_set_foreground(color: c_int) -> c_int {
    with_console(|c| status(c.set_foreground((color & 0x0F) as u8)))
}

#[no_mangle]
pub extern "C" fn sc_set_background(color: c_int) -> c_int {
    with_console(|c| status(c.set_background((color & 0x0F) as u8)))
}

#[no_mangle]
pub extern "C" fn sc_reset_color() -> c_int {
    with_console(|c| status(c.reset_color()))
}

#[no_mangle]
pub extern "C" fn sc_get_color() -> c_int {
    with_console(|c| value(c.color().map(|attrs| attrs.bits())))
}

/// Zero-based position; coordinates that do not fit the device's range fail
#[no_mangle]
pub extern "C" fn sc_set_cursor(x: c_int, y: c_int) -> c_int {
    match (i16::try_from(x), i16::try_from(y)) {
        (Ok(x), Ok(y)) => with_console(|c| status(c.set_cursor(x, y))),
        _ => 0,
    }
}

#[no_mangle]
pub extern "C" fn sc_get_cursor_x() -> c_int {
    with_console(|c| value(c.cursor_x()))
}

#[no_mangle]
pub extern "C" fn sc_get_cursor_y() -> c_int {
    with_console(|c| value(c.cursor_y()))
}

#[no_mangle]
pub extern "C" fn sc_get_width() -> c_int {
    with_console(|c| value(c.width()))
}

#[no_mangle]
pub extern "C" fn sc_get_height() -> c_int {
    with_console(|c| value(c.height()))
}

#[no_mangle]
pub extern "C" fn sc_clear() -> c_int {
    with_console(|c| status(c.clear()))
}

#[no_mangle]
pub extern "C" fn sc_clear_line() -> c_int {
    with_console(|c| status(c.clear_line()))
}

/// Set the console window title.
///
/// # Safety
///
/// `title` must be null or point to a NUL-terminated string that stays
/// valid for the duration of the call.
#[no_mangle]
pub unsafe extern "C" fn sc_set_title(title: *const c_char) -> c_int {
    if title.is_null() {
        return 0;
    }
    let title = CStr::from_ptr(title).to_string_lossy();
    with_console(|c| status(c.set_title(&title)))
}

#[no_mangle]
pub extern "C" fn sc_show_cursor(visible: c_int) -> c_int {
    with_console(|c| status(c.show_cursor(visible != 0)))
}

#[no_mangle]
pub extern "C" fn sc_is_cursor_visible() -> c_int {
    with_console(|c| c.is_cursor_visible() as c_int)
}

/// Whether output reaches a native console rather than a pipe or an emulator
#[no_mangle]
pub extern "C" fn sc_has_real_console() -> c_int {
    with_console(|c| c.has_real_console() as c_int)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::Color;
    use crate::error::ConsoleError;

    #[test]
    fn test_color_constants_match_palette() {
        let constants = [
            SC_BLACK, SC_DARK_BLUE, SC_DARK_GREEN, SC_DARK_CYAN, SC_DARK_RED, SC_DARK_MAGENTA,
            SC_DARK_YELLOW, SC_GRAY, SC_DARK_GRAY, SC_BLUE, SC_GREEN, SC_CYAN, SC_RED, SC_MAGENTA,
            SC_YELLOW, SC_WHITE,
        ];
        for (constant, color) in constants.iter().zip(Color::ALL) {
            assert_eq!(*constant, color.code() as c_int);
        }
    }

    #[test]
    fn test_result_conventions() {
        assert_eq!(status::<(), ConsoleError>(Ok(())), 1);
        assert_eq!(status::<(), _>(Err(ConsoleError::EmptyTitle)), 0);
        assert_eq!(value::<i16, ConsoleError>(Ok(80)), 80);
        assert_eq!(value::<u16, _>(Err(ConsoleError::NoHandle)), -1);
    }

    #[test]
    fn test_null_title_is_rejected() {
        assert_eq!(unsafe { sc_set_title(std::ptr::null()) }, 0);
    }

    #[test]
    fn test_unrepresentable_cursor_position_fails() {
        assert_eq!(sc_set_cursor(70_000, 0), 0);
        assert_eq!(sc_set_cursor(0, -40_000), 0);
    }
}
