//! Portable console backend over ANSI terminals
//!
//! Terminals driven by escape sequences cannot be asked for their colors or
//! cursor shape, so this backend remembers what it last wrote. It starts out
//! assuming the terminal's own default colors, which it reports as gray on
//! black; writing that word back emits a plain color reset so the terminal's
//! real defaults come back. There is no console to attach to or allocate.
//!
//! Buffer queries only ask the terminal for its size. The cursor position
//! needs a round trip through the terminal's input, so it is only requested
//! by the cursor operations. Nothing is written unless the output is a
//! terminal.

use std::cell::{Cell, Ref, RefCell};
use std::io::{self, Write};

use crossterm::cursor::{self, Hide, MoveTo, RestorePosition, SavePosition, Show};
use crossterm::execute;
use crossterm::style::{
    Attribute, Color as TermColor, Print, ResetColor, SetAttribute, SetBackgroundColor,
    SetForegroundColor,
};
use crossterm::terminal::{self, Clear, ClearType, SetTitle};
use crossterm::tty::IsTty;

use crate::attributes::{Attributes, Color, LvbFlags};
use crate::device::{
    ConsoleDevice, Coord, CursorInfo, DeviceError, DeviceResult, ScreenBufferInfo, WindowRect,
};

/// Standard output of the process
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stdout;

/// Map a console color to the matching ANSI color
pub fn term_color(color: Color) -> TermColor {
    match color {
        Color::Black => TermColor::Black,
        Color::DarkBlue => TermColor::DarkBlue,
        Color::DarkGreen => TermColor::DarkGreen,
        Color::DarkCyan => TermColor::DarkCyan,
        Color::DarkRed => TermColor::DarkRed,
        Color::DarkMagenta => TermColor::DarkMagenta,
        Color::DarkYellow => TermColor::DarkYellow,
        Color::Gray => TermColor::Grey,
        Color::DarkGray => TermColor::DarkGrey,
        Color::Blue => TermColor::Blue,
        Color::Green => TermColor::Green,
        Color::Cyan => TermColor::Cyan,
        Color::Red => TermColor::Red,
        Color::Magenta => TermColor::Magenta,
        Color::Yellow => TermColor::Yellow,
        Color::White => TermColor::White,
    }
}

fn coord_to_u16(value: i16) -> DeviceResult<u16> {
    u16::try_from(value).map_err(|_| {
        DeviceError::Os(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("negative coordinate {}", value),
        ))
    })
}

fn stdout_is_tty() -> bool {
    io::stdout().is_tty()
}

/// Questions the backend asks about the terminal behind its output
#[derive(Clone, Copy, Debug)]
pub struct TerminalQueries {
    pub is_tty: fn() -> bool,
    /// Columns and rows
    pub size: fn() -> io::Result<(u16, u16)>,
    /// Zero-based column and row
    pub cursor: fn() -> io::Result<(u16, u16)>,
}

impl TerminalQueries {
    /// The terminal on the process's standard output
    pub const STDOUT: TerminalQueries = TerminalQueries {
        is_tty: stdout_is_tty,
        size: terminal::size,
        cursor: cursor::position,
    };
}

#[derive(Debug)]
pub struct AnsiConsole<W: Write = io::Stdout> {
    out: RefCell<W>,
    terminal: TerminalQueries,
    attributes: Cell<u16>,
    cursor_visible: Cell<bool>,
}

impl Default for AnsiConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl AnsiConsole {
    pub fn new() -> Self {
        Self::with_output(io::stdout(), TerminalQueries::STDOUT)
    }
}

impl<W: Write> AnsiConsole<W> {
    /// Word reported before any color was written
    pub const INITIAL_ATTRIBUTES: Attributes = Attributes::FALLBACK;

    pub fn with_output(out: W, terminal: TerminalQueries) -> Self {
        Self {
            out: RefCell::new(out),
            terminal,
            attributes: Cell::new(Self::INITIAL_ATTRIBUTES.bits()),
            cursor_visible: Cell::new(true),
        }
    }

    /// Everything written so far
    pub fn output(&self) -> Ref<'_, W> {
        self.out.borrow()
    }

    fn is_terminal(&self) -> bool {
        (self.terminal.is_tty)()
    }

    fn size(&self) -> DeviceResult<(i16, i16)> {
        let (cols, rows) = (self.terminal.size)()?;
        Ok((cols.min(i16::MAX as u16) as i16, rows.min(i16::MAX as u16) as i16))
    }

    /// Run `f` against the output, refusing when it is not a terminal
    fn write_terminal(
        &self,
        what: &'static str,
        f: impl FnOnce(&mut W) -> io::Result<()>,
    ) -> DeviceResult<()> {
        if !self.is_terminal() {
            return Err(DeviceError::Unsupported(what));
        }
        let mut out = self.out.borrow_mut();
        f(&mut *out)?;
        Ok(())
    }
}

impl<W: Write> ConsoleDevice for AnsiConsole<W> {
    type Handle = Stdout;

    fn std_output(&self) -> DeviceResult<Stdout> {
        Ok(Stdout)
    }

    fn is_character_device(&self, _handle: Stdout) -> bool {
        self.is_terminal()
    }

    fn attach_parent_console(&self) -> DeviceResult<()> {
        Err(DeviceError::Unsupported("attaching to a parent console"))
    }

    fn allocate_console(&self) -> DeviceResult<()> {
        Err(DeviceError::Unsupported("allocating a console"))
    }

    fn free_console(&self) -> DeviceResult<()> {
        Err(DeviceError::Unsupported("releasing a console"))
    }

    fn console_mode(&self, _handle: Stdout) -> DeviceResult<u32> {
        if self.is_terminal() {
            Ok(0)
        } else {
            Err(DeviceError::Unsupported("console mode on a non-terminal"))
        }
    }

    fn screen_buffer_info(&self, _handle: Stdout) -> DeviceResult<ScreenBufferInfo> {
        let (width, height) = self.size()?;

        Ok(ScreenBufferInfo {
            size: Coord::new(width, height),
            cursor: Coord::ORIGIN,
            attributes: self.attributes.get(),
            window: WindowRect {
                left: 0,
                top: 0,
                right: width - 1,
                bottom: height - 1,
            },
        })
    }

    fn cursor_position(&self, _handle: Stdout) -> DeviceResult<Coord> {
        let (x, y) = (self.terminal.cursor)()?;
        Ok(Coord::new(x.min(i16::MAX as u16) as i16, y.min(i16::MAX as u16) as i16))
    }

    fn set_text_attribute(&self, _handle: Stdout, attributes: u16) -> DeviceResult<()> {
        let attrs = Attributes::from_bits(attributes);
        let flags = attrs.flags();
        let reverse = if flags.contains(LvbFlags::REVERSE_VIDEO) {
            Attribute::Reverse
        } else {
            Attribute::NoReverse
        };
        let underline = if flags.contains(LvbFlags::UNDERSCORE) {
            Attribute::Underlined
        } else {
            Attribute::NoUnderline
        };

        self.write_terminal("colors on a non-terminal", |out| {
            if attrs == Self::INITIAL_ATTRIBUTES {
                execute!(out, ResetColor)?;
            } else {
                execute!(
                    out,
                    SetForegroundColor(term_color(attrs.foreground())),
                    SetBackgroundColor(term_color(attrs.background()))
                )?;
            }
            execute!(out, SetAttribute(reverse), SetAttribute(underline))
        })?;

        self.attributes.set(attributes);
        Ok(())
    }

    fn set_cursor_position(&self, _handle: Stdout, position: Coord) -> DeviceResult<()> {
        let x = coord_to_u16(position.x)?;
        let y = coord_to_u16(position.y)?;
        self.write_terminal("moving the cursor on a non-terminal", |out| {
            execute!(out, MoveTo(x, y))
        })
    }

    fn fill_character(
        &self,
        _handle: Stdout,
        ch: char,
        len: u32,
        start: Coord,
    ) -> DeviceResult<u32> {
        let (cols, rows) = self.size()?;
        let (cols, rows) = (cols.max(0) as u32, rows.max(0) as u32);
        let mut col = coord_to_u16(start.x)? as u32;
        let mut row = coord_to_u16(start.y)? as u32;

        if ch == ' ' && col == 0 && row == 0 && len >= cols * rows {
            self.write_terminal("clearing a non-terminal", |out| {
                execute!(out, Clear(ClearType::All))
            })?;
            return Ok(cols * rows);
        }

        let mut written = 0;
        self.write_terminal("filling cells on a non-terminal", |out| {
            // Cell fills never move the cursor
            execute!(out, SavePosition)?;
            let mut remaining = len;
            while remaining > 0 && row < rows && col < cols {
                let n = remaining.min(cols - col);
                execute!(out, MoveTo(col as u16, row as u16))?;
                if ch == ' ' && n == cols - col {
                    execute!(out, Clear(ClearType::UntilNewLine))?;
                } else {
                    execute!(out, Print(ch.to_string().repeat(n as usize)))?;
                }
                written += n;
                remaining -= n;
                col = 0;
                row += 1;
            }
            execute!(out, RestorePosition)
        })?;
        Ok(written)
    }

    fn fill_attribute(
        &self,
        _handle: Stdout,
        attributes: u16,
        len: u32,
        _start: Coord,
    ) -> DeviceResult<u32> {
        // Erased cells already carry the current colors
        if attributes == self.attributes.get() {
            Ok(len)
        } else {
            Err(DeviceError::Unsupported("recoloring existing cells"))
        }
    }

    fn set_title(&self, title: &str) -> DeviceResult<()> {
        self.write_terminal("titles on a non-terminal", |out| execute!(out, SetTitle(title)))
    }

    fn cursor_info(&self, _handle: Stdout) -> DeviceResult<CursorInfo> {
        Ok(CursorInfo {
            size: 25,
            visible: self.cursor_visible.get(),
        })
    }

    fn set_cursor_info(&self, _handle: Stdout, info: CursorInfo) -> DeviceResult<()> {
        self.write_terminal("cursor visibility on a non-terminal", |out| {
            if info.visible {
                execute!(out, Show)
            } else {
                execute!(out, Hide)
            }
        })?;
        self.cursor_visible.set(info.visible);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::Console;
    use crate::error::ConsoleError;
    use crate::handle::Acquisition;

    fn no_cursor_report() -> io::Result<(u16, u16)> {
        Err(io::Error::new(io::ErrorKind::Other, "no cursor report"))
    }

    const TERMINAL: TerminalQueries = TerminalQueries {
        is_tty: || true,
        size: || Ok((80, 24)),
        cursor: || Ok((5, 3)),
    };

    const PIPE: TerminalQueries = TerminalQueries {
        is_tty: || false,
        ..TERMINAL
    };

    fn console(terminal: TerminalQueries) -> Console<AnsiConsole<Vec<u8>>> {
        Console::new(AnsiConsole::with_output(Vec::new(), terminal))
    }

    fn written(console: &Console<AnsiConsole<Vec<u8>>>) -> String {
        String::from_utf8_lossy(&console.device().output()).into_owned()
    }

    #[test]
    fn test_color_mapping_covers_palette() {
        assert_eq!(term_color(Color::Gray), TermColor::Grey);
        assert_eq!(term_color(Color::DarkGray), TermColor::DarkGrey);
        assert_eq!(term_color(Color::DarkYellow), TermColor::DarkYellow);
        assert_eq!(term_color(Color::White), TermColor::White);

        let mapped: std::collections::HashSet<String> = Color::ALL
            .iter()
            .map(|c| format!("{:?}", term_color(*c)))
            .collect();
        assert_eq!(mapped.len(), 16);
    }

    #[test]
    fn test_starts_with_default_colors_and_visible_cursor() {
        let device = AnsiConsole::with_output(Vec::new(), TERMINAL);
        assert_eq!(device.attributes.get(), 0x07);
        assert_eq!(device.cursor_info(Stdout).unwrap(), CursorInfo { size: 25, visible: true });
    }

    #[test]
    fn test_no_console_to_attach_or_allocate() {
        let device = AnsiConsole::with_output(Vec::new(), TERMINAL);
        assert!(matches!(device.attach_parent_console(), Err(DeviceError::Unsupported(_))));
        assert!(matches!(device.allocate_console(), Err(DeviceError::Unsupported(_))));
    }

    #[test]
    fn test_attribute_fill_only_for_current_colors() {
        let device = AnsiConsole::with_output(Vec::new(), TERMINAL);
        assert_eq!(device.fill_attribute(Stdout, 0x07, 10, Coord::ORIGIN).unwrap(), 10);
        assert!(device.fill_attribute(Stdout, 0x1F, 10, Coord::ORIGIN).is_err());
    }

    #[test]
    fn test_negative_coordinates_rejected() {
        assert!(coord_to_u16(-1).is_err());
        assert_eq!(coord_to_u16(7).unwrap(), 7);
    }

    #[test]
    fn test_geometry_and_colors_without_cursor_report() {
        let console = console(TerminalQueries {
            cursor: no_cursor_report,
            ..TERMINAL
        });

        assert_eq!(console.width().unwrap(), 80);
        assert_eq!(console.height().unwrap(), 24);
        console.set_foreground(Color::Red.code()).unwrap();
        assert_eq!(console.color().unwrap().foreground(), Color::Red);
        console.clear().unwrap();

        assert!(console.cursor_x().is_err());
        assert!(console.clear_line().is_err());
    }

    #[test]
    fn test_cursor_comes_from_terminal_report() {
        let console = console(TERMINAL);
        assert_eq!(console.cursor_position().unwrap(), Coord::new(5, 3));
    }

    #[test]
    fn test_colors_reach_the_terminal() {
        let console = console(TERMINAL);
        console.set_color(0x1F).unwrap();
        assert!(written(&console).contains('\x1b'));
        assert_eq!(console.color().unwrap().bits(), 0x1F);

        console.device().out.borrow_mut().clear();
        console.reset_color().unwrap();
        assert!(written(&console).starts_with("\x1b[0m"));
    }

    #[test]
    fn test_nothing_written_to_a_pipe() {
        let console = console(PIPE);

        assert!(matches!(
            console.set_color(0x1F),
            Err(ConsoleError::Device { source: DeviceError::Unsupported(_), .. })
        ));
        assert!(console.set_foreground(Color::Red.code()).is_err());
        assert!(console.set_cursor(1, 1).is_err());
        assert!(console.set_title("build").is_err());
        assert!(console.show_cursor(false).is_err());
        assert!(console.clear().is_err());

        assert_eq!(console.acquisition(), Some(Acquisition::Redirected));
        assert!(!console.has_real_console());
        assert!(console.is_cursor_visible());
        assert_eq!(console.color().unwrap().bits(), 0x07);
        assert!(written(&console).is_empty());
    }
}
