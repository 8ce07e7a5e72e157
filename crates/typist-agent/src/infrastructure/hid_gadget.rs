//! Linux USB HID gadget keyboard writer.
//!
//! # How does the HID gadget work? (for beginners)
//!
//! Boards with a USB On-The-Go port (Raspberry Pi Zero, Pi 4 via USB-C) can
//! act as a USB *device* instead of a host.  Once the `libcomposite` gadget
//! is configured with a keyboard function, the kernel exposes a character
//! device, usually `/dev/hidg0`.  Every 8 bytes written to it are sent to the
//! host PC as one keyboard report, exactly as if a physical keyboard had
//! sent them.
//!
//! A key press is therefore two writes: the press report, then the all-zero
//! release report.  Forgetting the release makes the host see the key held
//! down.
//!
//! While the host PC is unplugged, powered off or rebooting, writes fail
//! with `ESHUTDOWN`.  The sink then drops its file handle and reopens the
//! node on the next press, so typing resumes once the host is back.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, info, warn};
use typist_core::report::{KeyboardReport, RELEASE_REPORT};
use typist_core::Keystroke;

use crate::application::typist::{KeystrokeSink, SinkError};

/// Default gadget device node.
pub const DEFAULT_HID_DEVICE: &str = "/dev/hidg0";

/// Writes keyboard reports to a HID gadget device node.
pub struct HidGadgetSink {
    path: PathBuf,
    /// `None` after a failed write, until the next press reopens the node.
    device: Mutex<Option<File>>,
}

impl HidGadgetSink {
    /// Opens the gadget device for writing.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::DeviceMissing`] if `path` does not exist, and
    /// [`SinkError::Write`] for other open failures (e.g. permissions).
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        let device = open_device(&path)?;
        info!(device = %path.display(), "opened HID gadget");
        Ok(Self {
            path,
            device: Mutex::new(Some(device)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_report(&self, device: &mut File, report: &[u8]) -> Result<(), SinkError> {
        device
            .write_all(report)
            .and_then(|()| device.flush())
            .map_err(|source| classify(&self.path, source))
    }
}

impl KeystrokeSink for HidGadgetSink {
    fn press(&self, keystroke: Keystroke) -> Result<(), SinkError> {
        let report = KeyboardReport::press(keystroke).to_bytes();
        let mut slot = self
            .device
            .lock()
            .map_err(|_| SinkError::Rejected("HID device lock poisoned".to_string()))?;
        let mut device = match slot.take() {
            Some(device) => device,
            None => {
                let device = open_device(&self.path)?;
                info!(device = %self.path.display(), "reopened HID gadget");
                device
            }
        };

        debug!(?report, "writing HID report");
        let written = self
            .write_report(&mut device, &report)
            .and_then(|()| self.write_report(&mut device, &RELEASE_REPORT));
        match &written {
            Ok(()) => *slot = Some(device),
            Err(e) => warn!(
                device = %self.path.display(),
                "HID write failed, reopening on next press: {e}"
            ),
        }
        written
    }
}

fn open_device(path: &Path) -> Result<File, SinkError> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|source| classify(path, source))
}

fn classify(path: &Path, source: io::Error) -> SinkError {
    if source.kind() == io::ErrorKind::NotFound {
        SinkError::DeviceMissing {
            path: path.to_path_buf(),
        }
    } else {
        SinkError::Write {
            path: path.to_path_buf(),
            source,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
