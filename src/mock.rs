//! In-memory console device for tests

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::io;
use std::rc::Rc;

use crate::device::{
    ConsoleDevice, Coord, CursorInfo, DeviceError, DeviceResult, ScreenBufferInfo, WindowRect,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MockHandle(u8);

impl MockHandle {
    /// Standard output as handed to the process
    pub const STDOUT: MockHandle = MockHandle(1);
    /// Standard output after attaching or allocating a console
    pub const ACQUIRED: MockHandle = MockHandle(2);
}

/// Device operations that can be told to fail
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    StdOutput,
    AttachParent,
    Allocate,
    Free,
    ConsoleMode,
    ScreenBufferInfo,
    SetTextAttribute,
    SetCursorPosition,
    FillCharacter,
    FillAttribute,
    SetTitle,
    CursorInfo,
    SetCursorInfo,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    StdOutput,
    AttachParent,
    Allocate,
    Free,
    ConsoleMode,
    ScreenBufferInfo,
    SetTextAttribute(u16),
    SetCursorPosition(Coord),
    FillCharacter { ch: char, len: u32, start: Coord },
    FillAttribute { attributes: u16, len: u32, start: Coord },
    SetTitle(String),
    CursorInfo,
    SetCursorInfo(CursorInfo),
}

fn failure(message: String) -> DeviceError {
    DeviceError::Os(io::Error::new(io::ErrorKind::Other, message))
}

pub struct MockDevice {
    character_device: bool,
    acquired: Cell<bool>,
    info: Cell<ScreenBufferInfo>,
    cursor: Cell<CursorInfo>,
    failing: RefCell<HashSet<Op>>,
    calls: Rc<RefCell<Vec<Call>>>,
}

impl MockDevice {
    /// An interactive console: 80x300 buffer showing rows 0-24, gray on black
    pub fn console() -> Self {
        Self::new(true)
    }

    /// Standard output redirected to a pipe
    pub fn redirected() -> Self {
        Self::new(false)
    }

    fn new(character_device: bool) -> Self {
        Self {
            character_device,
            acquired: Cell::new(false),
            info: Cell::new(ScreenBufferInfo {
                size: Coord::new(80, 300),
                cursor: Coord::ORIGIN,
                attributes: 0x07,
                window: WindowRect { left: 0, top: 0, right: 79, bottom: 24 },
            }),
            cursor: Cell::new(CursorInfo { size: 25, visible: true }),
            failing: RefCell::new(HashSet::new()),
            calls: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn fail(&self, op: Op) {
        self.failing.borrow_mut().insert(op);
    }

    pub fn succeed(&self, op: Op) {
        self.failing.borrow_mut().remove(&op);
    }

    pub fn info(&self) -> ScreenBufferInfo {
        self.info.get()
    }

    pub fn set_info(&self, info: ScreenBufferInfo) {
        self.info.set(info);
    }

    pub fn update_info(&self, f: impl FnOnce(&mut ScreenBufferInfo)) {
        let mut info = self.info.get();
        f(&mut info);
        self.info.set(info);
    }

    pub fn attributes(&self) -> u16 {
        self.info.get().attributes
    }

    pub fn cursor(&self) -> CursorInfo {
        self.cursor.get()
    }

    pub fn set_cursor(&self, cursor: CursorInfo) {
        self.cursor.set(cursor);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// Call log that outlives the device, for observing drops
    pub fn shared_calls(&self) -> Rc<RefCell<Vec<Call>>> {
        Rc::clone(&self.calls)
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.borrow().iter().filter(|c| pred(c)).count()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    fn record(&self, call: Call, op: Op) -> DeviceResult<()> {
        self.calls.borrow_mut().push(call);
        if self.failing.borrow().contains(&op) {
            Err(failure(format!("{:?} failed", op)))
        } else {
            Ok(())
        }
    }
}

impl ConsoleDevice for MockDevice {
    type Handle = MockHandle;

    fn std_output(&self) -> DeviceResult<MockHandle> {
        self.record(Call::StdOutput, Op::StdOutput)?;
        if self.acquired.get() {
            Ok(MockHandle::ACQUIRED)
        } else {
            Ok(MockHandle::STDOUT)
        }
    }

    fn is_character_device(&self, handle: MockHandle) -> bool {
        handle == MockHandle::ACQUIRED || self.character_device
    }

    fn attach_parent_console(&self) -> DeviceResult<()> {
        self.record(Call::AttachParent, Op::AttachParent)?;
        self.acquired.set(true);
        Ok(())
    }

    fn allocate_console(&self) -> DeviceResult<()> {
        self.record(Call::Allocate, Op::Allocate)?;
        self.acquired.set(true);
        Ok(())
    }

    fn free_console(&self) -> DeviceResult<()> {
        self.record(Call::Free, Op::Free)?;
        self.acquired.set(false);
        Ok(())
    }

    fn console_mode(&self, _handle: MockHandle) -> DeviceResult<u32> {
        self.record(Call::ConsoleMode, Op::ConsoleMode)?;
        Ok(0x0003)
    }

    fn screen_buffer_info(&self, _handle: MockHandle) -> DeviceResult<ScreenBufferInfo> {
        self.record(Call::ScreenBufferInfo, Op::ScreenBufferInfo)?;
        Ok(self.info.get())
    }

    fn set_text_attribute(&self, _handle: MockHandle, attributes: u16) -> DeviceResult<()> {
        self.record(Call::SetTextAttribute(attributes), Op::SetTextAttribute)?;
        self.update_info(|info| info.attributes = attributes);
        Ok(())
    }

    fn set_cursor_position(&self, _handle: MockHandle, position: Coord) -> DeviceResult<()> {
        self.record(Call::SetCursorPosition(position), Op::SetCursorPosition)?;
        let size = self.info.get().size;
        if position.x < 0 || position.y < 0 || position.x >= size.x || position.y >= size.y {
            return Err(failure("position out of range".to_string()));
        }
        self.update_info(|info| info.cursor = position);
        Ok(())
    }

    fn fill_character(
        &self,
        _handle: MockHandle,
        ch: char,
        len: u32,
        start: Coord,
    ) -> DeviceResult<u32> {
        self.record(Call::FillCharacter { ch, len, start }, Op::FillCharacter)?;
        Ok(len)
    }

    fn fill_attribute(
        &self,
        _handle: MockHandle,
        attributes: u16,
        len: u32,
        start: Coord,
    ) -> DeviceResult<u32> {
        self.record(Call::FillAttribute { attributes, len, start }, Op::FillAttribute)?;
        Ok(len)
    }

    fn set_title(&self, title: &str) -> DeviceResult<()> {
        self.record(Call::SetTitle(title.to_string()), Op::SetTitle)
    }

    fn cursor_info(&self, _handle: MockHandle) -> DeviceResult<CursorInfo> {
        self.record(Call::CursorInfo, Op::CursorInfo)?;
        Ok(self.cursor.get())
    }

    fn set_cursor_info(&self, _handle: MockHandle, info: CursorInfo) -> DeviceResult<()> {
        self.record(Call::SetCursorInfo(info), Op::SetCursorInfo)?;
        self.cursor.set(info);
        Ok(())
    }
}
