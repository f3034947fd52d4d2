//! Output handle resolution
//!
//! The console output handle is resolved on first use and cached for the
//! lifetime of the owning context. When standard output is not a character
//! device (redirected to a pipe or file, or the process was started by a GUI
//! launcher or a pseudo-terminal host) the manager tries to attach to the
//! parent's console, then to allocate a fresh one, so color and cursor calls
//! still reach a real console. Whatever comes out of that, failure included,
//! is final.

use std::cell::OnceCell;

use tracing::{debug, info, warn};

use crate::device::ConsoleDevice;

/// How the cached handle was obtained
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Acquisition {
    /// Standard output already was a console
    Inherited,
    /// Standard output is a pipe or file and no console could be obtained
    Redirected,
    /// Attached to the parent process's console
    Attached,
    /// Allocated a new console
    Allocated,
    /// No usable handle at all
    Unavailable,
}

impl Acquisition {
    /// Whether this process attached or allocated the console itself
    pub fn owns_console(self) -> bool {
        matches!(self, Acquisition::Attached | Acquisition::Allocated)
    }
}

/// Which recovery steps to try when standard output is not a console
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FallbackPolicy {
    pub attach_parent: bool,
    pub allocate: bool,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            attach_parent: true,
            allocate: true,
        }
    }
}

/// Lazily resolved, memoized console output handle
pub struct HandleManager<H> {
    slot: OnceCell<(Option<H>, Acquisition)>,
    policy: FallbackPolicy,
}

impl<H: Copy> HandleManager<H> {
    pub fn new(policy: FallbackPolicy) -> Self {
        Self {
            slot: OnceCell::new(),
            policy,
        }
    }

    /// The cached handle, resolving it on the first call only
    pub fn resolve<D>(&self, device: &D) -> Option<H>
    where
        D: ConsoleDevice<Handle = H>,
    {
        self.slot.get_or_init(|| acquire(device, self.policy)).0
    }

    /// How the handle was obtained, or `None` before resolution
    pub fn acquisition(&self) -> Option<Acquisition> {
        self.slot.get().map(|(_, how)| *how)
    }

    /// Whether the resolved handle answers native console queries.
    ///
    /// Pipes and third-party terminal emulators that proxy a pipe fail the
    /// console-mode query, which lets callers skip color output.
    pub fn is_real_console<D>(&self, device: &D) -> bool
    where
        D: ConsoleDevice<Handle = H>,
    {
        match self.resolve(device) {
            Some(handle) => device.console_mode(handle).is_ok(),
            None => false,
        }
    }
}

fn acquire<D: ConsoleDevice>(
    device: &D,
    policy: FallbackPolicy,
) -> (Option<D::Handle>, Acquisition) {
    let original = match device.std_output() {
        Ok(handle) if device.is_character_device(handle) => {
            debug!("Standard output is a console");
            return (Some(handle), Acquisition::Inherited);
        }
        Ok(handle) => {
            debug!("Standard output is not a character device");
            Some(handle)
        }
        Err(e) => {
            debug!("No standard output handle: {}", e);
            None
        }
    };

    let acquired = if policy.attach_parent && try_step(device.attach_parent_console(), "attach") {
        Some(Acquisition::Attached)
    } else if policy.allocate && try_step(device.allocate_console(), "allocate") {
        Some(Acquisition::Allocated)
    } else {
        None
    };

    match acquired {
        Some(how) => {
            info!("Obtained console output ({:?})", how);
            match device.std_output() {
                Ok(handle) => (Some(handle), how),
                Err(e) => {
                    warn!("Console obtained but output handle unavailable: {}", e);
                    (None, how)
                }
            }
        }
        None => match original {
            Some(handle) => (Some(handle), Acquisition::Redirected),
            None => (None, Acquisition::Unavailable),
        },
    }
}

fn try_step<E: std::fmt::Display>(result: Result<(), E>, step: &str) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            debug!("Console {} failed: {}", step, e);
            false
        }
    }
}
