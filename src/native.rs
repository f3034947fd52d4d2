//! Win32 console backend
//!
//! Thin wrapper around the Win32 console API. Each method is a single system
//! call (two for the title, which needs a wide string first).

use std::io;

use windows::core::PCWSTR;
use windows::Win32::Foundation::{BOOL, HANDLE};
use windows::Win32::Storage::FileSystem::{GetFileType, FILE_TYPE_CHAR};
use windows::Win32::System::Console::{
    AllocConsole, AttachConsole, FillConsoleOutputAttribute, FillConsoleOutputCharacterW,
    FreeConsole, GetConsoleCursorInfo, GetConsoleMode, GetConsoleScreenBufferInfo, GetStdHandle,
    SetConsoleCursorInfo, SetConsoleCursorPosition, SetConsoleTextAttribute, SetConsoleTitleW,
    ATTACH_PARENT_PROCESS, CONSOLE_CHARACTER_ATTRIBUTES, CONSOLE_CURSOR_INFO, CONSOLE_MODE,
    CONSOLE_SCREEN_BUFFER_INFO, COORD, STD_OUTPUT_HANDLE,
};

use crate::device::{
    ConsoleDevice, Coord, CursorInfo, DeviceError, DeviceResult, ScreenBufferInfo, WindowRect,
};

/// Console output handle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConsoleHandle(HANDLE);

// Safety: console handles are process-wide and the console API serializes access
unsafe impl Send for ConsoleHandle {}

fn os_error(e: windows::core::Error) -> DeviceError {
    DeviceError::Os(io::Error::from_raw_os_error(e.code().0))
}

fn to_coord(c: Coord) -> COORD {
    COORD { X: c.x, Y: c.y }
}

fn from_coord(c: COORD) -> Coord {
    Coord::new(c.X, c.Y)
}

/// The calling process's Win32 console
#[derive(Debug, Default)]
pub struct WinConsole;

impl WinConsole {
    pub fn new() -> Self {
        Self
    }
}

impl ConsoleDevice for WinConsole {
    type Handle = ConsoleHandle;

    fn std_output(&self) -> DeviceResult<ConsoleHandle> {
        let handle = unsafe { GetStdHandle(STD_OUTPUT_HANDLE) }.map_err(os_error)?;
        if handle.is_invalid() {
            return Err(DeviceError::Os(io::Error::new(
                io::ErrorKind::NotFound,
                "process has no standard output",
            )));
        }
        Ok(ConsoleHandle(handle))
    }

    fn is_character_device(&self, handle: ConsoleHandle) -> bool {
        unsafe { GetFileType(handle.0) == FILE_TYPE_CHAR }
    }

    fn attach_parent_console(&self) -> DeviceResult<()> {
        unsafe { AttachConsole(ATTACH_PARENT_PROCESS) }.map_err(os_error)
    }

    fn allocate_console(&self) -> DeviceResult<()> {
        unsafe { AllocConsole() }.map_err(os_error)
    }

    fn free_console(&self) -> DeviceResult<()> {
        unsafe { FreeConsole() }.map_err(os_error)
    }

    fn console_mode(&self, handle: ConsoleHandle) -> DeviceResult<u32> {
        let mut mode = CONSOLE_MODE::default();
        unsafe { GetConsoleMode(handle.0, &mut mode) }.map_err(os_error)?;
        Ok(mode.0)
    }

    fn screen_buffer_info(&self, handle: ConsoleHandle) -> DeviceResult<ScreenBufferInfo> {
        let mut csbi = CONSOLE_SCREEN_BUFFER_INFO::default();
        unsafe { GetConsoleScreenBufferInfo(handle.0, &mut csbi) }.map_err(os_error)?;

        Ok(ScreenBufferInfo {
            size: from_coord(csbi.dwSize),
            cursor: from_coord(csbi.dwCursorPosition),
            attributes: csbi.wAttributes.0,
            window: WindowRect {
                left: csbi.srWindow.Left,
                top: csbi.srWindow.Top,
                right: csbi.srWindow.Right,
                bottom: csbi.srWindow.Bottom,
            },
        })
    }

    fn set_text_attribute(&self, handle: ConsoleHandle, attributes: u16) -> DeviceResult<()> {
        unsafe { SetConsoleTextAttribute(handle.0, CONSOLE_CHARACTER_ATTRIBUTES(attributes)) }
            .map_err(os_error)
    }

    fn set_cursor_position(&self, handle: ConsoleHandle, position: Coord) -> DeviceResult<()> {
        unsafe { SetConsoleCursorPosition(handle.0, to_coord(position)) }.map_err(os_error)
    }

    fn fill_character(
        &self,
        handle: ConsoleHandle,
        ch: char,
        len: u32,
        start: Coord,
    ) -> DeviceResult<u32> {
        let mut unit = [0u16; 2];
        let unit = ch.encode_utf16(&mut unit);
        if unit.len() != 1 {
            return Err(DeviceError::Unsupported("filling with characters outside the BMP"));
        }

        let mut written: u32 = 0;
        unsafe {
            FillConsoleOutputCharacterW(handle.0, unit[0], len, to_coord(start), &mut written)
        }
        .map_err(os_error)?;
        Ok(written)
    }

    fn fill_attribute(
        &self,
        handle: ConsoleHandle,
        attributes: u16,
        len: u32,
        start: Coord,
    ) -> DeviceResult<u32> {
        let mut written: u32 = 0;
        unsafe {
            FillConsoleOutputAttribute(handle.0, attributes, len, to_coord(start), &mut written)
        }
        .map_err(os_error)?;
        Ok(written)
    }

    fn set_title(&self, title: &str) -> DeviceResult<()> {
        let wide: Vec<u16> = title.encode_utf16().chain(std::iter::once(0)).collect();
        unsafe { SetConsoleTitleW(PCWSTR(wide.as_ptr())) }.map_err(os_error)
    }

    fn cursor_info(&self, handle: ConsoleHandle) -> DeviceResult<CursorInfo> {
        let mut cci = CONSOLE_CURSOR_INFO::default();
        unsafe { GetConsoleCursorInfo(handle.0, &mut cci) }.map_err(os_error)?;
        Ok(CursorInfo {
            size: cci.dwSize,
            visible: cci.bVisible.as_bool(),
        })
    }

    fn set_cursor_info(&self, handle: ConsoleHandle, info: CursorInfo) -> DeviceResult<()> {
        let cci = CONSOLE_CURSOR_INFO {
            dwSize: info.size,
            bVisible: BOOL::from(info.visible),
        };
        unsafe { SetConsoleCursorInfo(handle.0, &cci) }.map_err(os_error)
    }
}
