//! Console context
//!
//! `Console` owns a device plus the two pieces of cached state everything
//! depends on: the resolved output handle and the captured default colors.
//! Every operation resolves the handle first (once per context), color
//! mutations additionally make sure the default colors were captured, and
//! then the operation issues its device calls.
//!
//! The cached state lives in `OnceCell`, so a context is `!Sync`. Share one
//! across threads only behind a lock.

use tracing::{debug, warn};

use crate::attributes::{AttributeState, Attributes};
use crate::config::ConsoleConfig;
use crate::device::{ConsoleDevice, Coord, DeviceError, ScreenBufferInfo};
use crate::error::{ConsoleError, Result};
use crate::handle::{Acquisition, HandleManager};

/// Visible window size in cells
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConsoleSize {
    pub width: i16,
    pub height: i16,
}

pub struct Console<D: ConsoleDevice> {
    device: D,
    handles: HandleManager<D::Handle>,
    attributes: AttributeState,
}

impl<D: ConsoleDevice> Console<D> {
    pub fn new(device: D) -> Self {
        Self::with_config(device, &ConsoleConfig::default())
    }

    pub fn with_config(device: D, config: &ConsoleConfig) -> Self {
        Self {
            device,
            handles: HandleManager::new(config.fallback_policy()),
            attributes: AttributeState::new(config.fallback_attributes()),
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// How the output handle was obtained; `None` until first use
    pub fn acquisition(&self) -> Option<Acquisition> {
        self.handles.acquisition()
    }

    /// The captured default colors; `None` until the first color change
    pub fn default_attributes(&self) -> Option<Attributes> {
        self.attributes.default_attributes()
    }

    fn handle(&self) -> Result<D::Handle> {
        self.handles
            .resolve(&self.device)
            .ok_or(ConsoleError::NoHandle)
    }

    fn buffer_info(&self, handle: D::Handle) -> Result<ScreenBufferInfo> {
        self.device
            .screen_buffer_info(handle)
            .map_err(ConsoleError::device("query screen buffer"))
    }

    /// Resolve the handle and capture the default colors before a mutation
    fn prepare_color_change(&self) -> Result<(D::Handle, Attributes)> {
        let handle = self.handles.resolve(&self.device);
        let default = self.attributes.ensure_captured(|| match handle {
            Some(h) => self.device.screen_buffer_info(h).map(|info| info.attributes),
            None => Err(DeviceError::Unsupported("reading colors without a handle")),
        });
        handle.map(|h| (h, default)).ok_or(ConsoleError::NoHandle)
    }

    fn write_attributes(&self, handle: D::Handle, attrs: Attributes) -> Result<()> {
        self.device
            .set_text_attribute(handle, attrs.bits())
            .map_err(ConsoleError::device("set text attributes"))
    }

    // Colors

    /// Write a full attribute word as is, device-specific high bits included
    pub fn set_color(&self, word: u16) -> Result<()> {
        let (handle, _) = self.prepare_color_change()?;
        self.write_attributes(handle, Attributes::from_bits(word))
    }

    /// Change the foreground (low 4 bits of `color`), keeping the background
    pub fn set_foreground(&self, color: u8) -> Result<()> {
        let (handle, _) = self.prepare_color_change()?;
        let current = Attributes::from_bits(self.buffer_info(handle)?.attributes);
        self.write_attributes(handle, current.with_foreground(color))
    }

    /// Change the background (low 4 bits of `color`), keeping the foreground
    pub fn set_background(&self, color: u8) -> Result<()> {
        let (handle, _) = self.prepare_color_change()?;
        let current = Attributes::from_bits(self.buffer_info(handle)?.attributes);
        self.write_attributes(handle, current.with_background(color))
    }

    /// Restore the colors the console had before the first change
    pub fn reset_color(&self) -> Result<()> {
        let (handle, default) = self.prepare_color_change()?;
        self.write_attributes(handle, default)
    }

    pub fn color(&self) -> Result<Attributes> {
        let handle = self.handle()?;
        Ok(Attributes::from_bits(self.buffer_info(handle)?.attributes))
    }

    // Cursor and geometry

    /// Move the cursor; range checking is left to the device
    pub fn set_cursor(&self, x: i16, y: i16) -> Result<()> {
        let handle = self.handle()?;
        self.device
            .set_cursor_position(handle, Coord::new(x, y))
            .map_err(ConsoleError::device("set cursor position"))
    }

    pub fn cursor_position(&self) -> Result<Coord> {
        let handle = self.handle()?;
        self.device
            .cursor_position(handle)
            .map_err(ConsoleError::device("query cursor position"))
    }

    pub fn cursor_x(&self) -> Result<i16> {
        self.cursor_position().map(|pos| pos.x)
    }

    pub fn cursor_y(&self) -> Result<i16> {
        self.cursor_position().map(|pos| pos.y)
    }

    /// Size of the visible window, not of the whole scrollback buffer
    pub fn size(&self) -> Result<ConsoleSize> {
        let handle = self.handle()?;
        let window = self.buffer_info(handle)?.window;
        Ok(ConsoleSize {
            width: window.width(),
            height: window.height(),
        })
    }

    pub fn width(&self) -> Result<i16> {
        self.size().map(|size| size.width)
    }

    pub fn height(&self) -> Result<i16> {
        self.size().map(|size| size.height)
    }

    // Clearing

    /// Blank the whole buffer with the current colors and home the cursor.
    ///
    /// Only the buffer query and the character fill can fail the call. The
    /// attribute fill and the final cursor move are best-effort.
    pub fn clear(&self) -> Result<()> {
        let handle = self.handle()?;
        let info = self.buffer_info(handle)?;
        let cells = info.cell_count();

        self.device
            .fill_character(handle, ' ', cells, Coord::ORIGIN)
            .map_err(ConsoleError::device("fill screen with blanks"))?;

        if let Err(e) = self.device.fill_attribute(handle, info.attributes, cells, Coord::ORIGIN) {
            warn!("Clear: attribute fill failed: {}", e);
        }
        if let Err(e) = self.device.set_cursor_position(handle, Coord::ORIGIN) {
            warn!("Clear: could not home cursor: {}", e);
        }

        debug!("Cleared {} cells", cells);
        Ok(())
    }

    /// Blank from the cursor to the end of its row; the cursor stays put.
    ///
    /// Same failure policy as `clear`.
    pub fn clear_line(&self) -> Result<()> {
        let handle = self.handle()?;
        let info = self.buffer_info(handle)?;
        let cursor = self
            .device
            .cursor_position(handle)
            .map_err(ConsoleError::device("query cursor position"))?;
        let cells = info.cells_to_line_end(cursor);

        self.device
            .fill_character(handle, ' ', cells, cursor)
            .map_err(ConsoleError::device("fill line with blanks"))?;

        if let Err(e) = self.device.fill_attribute(handle, info.attributes, cells, cursor) {
            warn!("Clear line: attribute fill failed: {}", e);
        }
        Ok(())
    }

    // Window and cursor appearance

    pub fn set_title(&self, title: &str) -> Result<()> {
        if title.is_empty() {
            return Err(ConsoleError::EmptyTitle);
        }
        self.device
            .set_title(title)
            .map_err(ConsoleError::device("set console title"))
    }

    /// Show or hide the cursor, keeping its size
    pub fn show_cursor(&self, visible: bool) -> Result<()> {
        let handle = self.handle()?;
        let mut info = self
            .device
            .cursor_info(handle)
            .map_err(ConsoleError::device("query cursor"))?;
        info.visible = visible;
        self.device
            .set_cursor_info(handle, info)
            .map_err(ConsoleError::device("set cursor visibility"))
    }

    /// Cursor visibility; reports visible when it cannot be determined
    pub fn is_cursor_visible(&self) -> bool {
        self.handle()
            .ok()
            .and_then(|handle| self.device.cursor_info(handle).ok())
            .map_or(true, |info| info.visible)
    }

    /// Whether output goes to a native interactive console
    pub fn has_real_console(&self) -> bool {
        self.handles.is_real_console(&self.device)
    }
}

impl<D: ConsoleDevice> Drop for Console<D> {
    fn drop(&mut self) {
        if self.handles.acquisition().map_or(false, Acquisition::owns_console) {
            debug!("Releasing console obtained by this context");
            if let Err(e) = self.device.free_console() {
                warn!("Failed to release console: {}", e);
            }
        }
    }
}
