//! In-memory keystroke sink for tests and `--dry-run`.
//!
//! # Why a recording sink?
//!
//! The real [`HidGadgetSink`](super::hid_gadget::HidGadgetSink) needs a Linux
//! board configured as a USB gadget and a host PC on the other end.  The
//! `RecordingSink` instead keeps every report in a `Mutex<Vec<...>>` so tests
//! can assert on exactly what would have been sent, and so an operator can
//! try a configuration against the live sheet without typing anything.
//!
//! # `should_fail` flag
//!
//! Call [`RecordingSink::set_should_fail`] to make every press fail with
//! [`SinkError::Rejected`].  The flag is atomic so a test can flip it between
//! polling passes while the loop holds the sink behind an `Arc`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tracing::debug;
use typist_core::report::{KeyboardReport, RELEASE_REPORT, REPORT_LEN};
use typist_core::{decode, Keystroke};

use crate::application::typist::{KeystrokeSink, SinkError};

/// A sink that records presses instead of writing to a device.
#[derive(Default)]
pub struct RecordingSink {
    /// Each keystroke passed to `press`.
    pub presses: Mutex<Vec<Keystroke>>,
    /// The wire reports that would have been written, releases included.
    pub reports: Mutex<Vec<[u8; REPORT_LEN]>>,
    should_fail: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    /// Recorded presses rendered as text.
    ///
    /// Printable keys decode to their character.  Tab and Enter render as
    /// `<TAB>` and `<ENTER>`; other keys as `<code>`.
    pub fn rendered(&self) -> String {
        self.snapshot()
            .into_iter()
            .map(|k| match decode(k) {
                Some('\t') => "<TAB>".to_string(),
                Some('\n') => "<ENTER>".to_string(),
                Some(c) => c.to_string(),
                None => format!("<{}>", k.key_code),
            })
            .collect()
    }

    /// A copy of the recorded presses.
    pub fn snapshot(&self) -> Vec<Keystroke> {
        self.presses
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut p) = self.presses.lock() {
            p.clear();
        }
        if let Ok(mut r) = self.reports.lock() {
            r.clear();
        }
    }
}

impl KeystrokeSink for RecordingSink {
    fn press(&self, keystroke: Keystroke) -> Result<(), SinkError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(SinkError::Rejected("injected failure".to_string()));
        }
        debug!(
            modifiers = keystroke.modifiers.bits(),
            code = keystroke.key_code,
            "recorded key press"
        );
        let poisoned = || SinkError::Rejected("recording lock poisoned".to_string());
        self.presses.lock().map_err(|_| poisoned())?.push(keystroke);
        let mut reports = self.reports.lock().map_err(|_| poisoned())?;
        reports.push(KeyboardReport::press(keystroke).to_bytes());
        reports.push(RELEASE_REPORT);
        Ok(())
    }
}
