//! AutomationLoop: the Polling/Idle cycle that types new sheet rows.
//!
//! # State machine
//!
//! ```text
//!         ┌──────────── step() ────────────┐
//!         ▼                                │
//!     Polling ── fetch, dedup, type ──▶  Idle ── sleep(check_interval)
//! ```
//!
//! A polling pass always ends in `Idle`, whether it succeeded or failed.  Any
//! failure inside a pass (network, ledger I/O, HID writes while the host is
//! unplugged) is logged and the next pass retries, so [`AutomationLoop::run`]
//! never returns.  A missing device at startup is handled by the caller.
//!
//! # One polling pass
//!
//! 1. Reload the ledger.
//! 2. Fetch the sheet.
//! 3. Transform every row and derive its identifier.
//! 4. Drop rows already in the ledger, and repeats within this fetch.
//! 5. For each remaining row, in sheet order: type it, then append its
//!    identifier to the ledger.
//!
//! A row's identifier is appended only after all of its keystrokes were
//! written.  If a write fails part-way the row stays unrecorded and is typed
//! again from the start on the next pass.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use typist_core::{EntryId, EntryTransformer, Row};

use super::ports::{EntryLedger, LedgerError, RowSource, Sleeper, SourceError};
use super::typist::{SinkError, Typist};

/// Error type for one polling pass.
#[derive(Debug, Error)]
pub enum AutomationError {
    #[error("fetch failed: {0}")]
    Source(#[from] SourceError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("typing failed: {0}")]
    Sink(#[from] SinkError),
}

/// One key of the end-of-entry sequence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EndKey {
    #[serde(default = "default_end_key")]
    pub key: String,
    #[serde(default = "default_times")]
    pub times: u32,
}

fn default_end_key() -> String {
    "enter".to_string()
}
fn default_times() -> u32 {
    1
}

/// What to type for each entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPlan {
    /// Fields typed, in order.  Fields absent from a row are skipped.
    pub fields_to_type: Vec<String>,
    /// Fields whose values form the dedup identifier.
    pub id_fields: Vec<String>,
    /// Key pressed after every typed field.
    pub between_fields_key: String,
    /// Keys pressed after the last field.
    pub end_entry_keys: Vec<EndKey>,
}

/// Delays applied by the loop and the typist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// After each typed character.
    pub type_delay: Duration,
    /// After each field's between-fields key.
    pub field_delay: Duration,
    /// Between consecutive new entries in one pass.
    pub entry_delay: Duration,
    /// Before the first keystroke of each entry.
    pub initial_delay: Duration,
    /// Idle time between passes.
    pub check_interval: Duration,
}

/// Which half of the cycle runs on the next [`AutomationLoop::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Polling,
    Idle,
}

/// Outcome of one successful polling pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Data rows returned by the sheet.
    pub fetched: usize,
    /// Rows not yet in the ledger.
    pub new_entries: usize,
    /// Rows typed and recorded.
    pub typed: usize,
}

/// The orchestrator.  Owns every row for the duration of a pass.
pub struct AutomationLoop {
    source: Arc<dyn RowSource>,
    ledger: Arc<dyn EntryLedger>,
    sleeper: Arc<dyn Sleeper>,
    typist: Typist,
    transformer: EntryTransformer,
    plan: EntryPlan,
    pacing: Pacing,
    state: LoopState,
    cycles: u64,
}

impl AutomationLoop {
    pub fn new(
        source: Arc<dyn RowSource>,
        ledger: Arc<dyn EntryLedger>,
        sleeper: Arc<dyn Sleeper>,
        typist: Typist,
        transformer: EntryTransformer,
        plan: EntryPlan,
        pacing: Pacing,
    ) -> Self {
        Self {
            source,
            ledger,
            sleeper,
            typist,
            transformer,
            plan,
            pacing,
            state: LoopState::Polling,
            cycles: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Number of polling passes started so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Performs one state transition.
    ///
    /// From `Polling` runs a pass and moves to `Idle`, returning the report,
    /// or `None` if the pass failed.  The failure is logged and the next
    /// pass retries.  From `Idle` sleeps `check_interval` and moves to
    /// `Polling`, returning `None`.
    pub async fn step(&mut self) -> Option<CycleReport> {
        match self.state {
            LoopState::Polling => {
                self.state = LoopState::Idle;
                match self.poll_once().await {
                    Ok(report) => Some(report),
                    Err(e) => {
                        error!(
                            retry_in = ?self.pacing.check_interval,
                            "polling pass failed: {e}"
                        );
                        None
                    }
                }
            }
            LoopState::Idle => {
                debug!(wait = ?self.pacing.check_interval, "idle");
                self.sleeper.sleep(self.pacing.check_interval).await;
                self.state = LoopState::Polling;
                None
            }
        }
    }

    /// Steps until the task is cancelled.
    pub async fn run(&mut self) {
        loop {
            self.step().await;
        }
    }

    /// Runs one polling pass without touching the state machine.
    ///
    /// # Errors
    ///
    /// Returns the first ledger, fetch, or typing error.  Rows typed before
    /// the error stay recorded.
    pub async fn poll_once(&mut self) -> Result<CycleReport, AutomationError> {
        self.cycles += 1;
        info!(cycle = self.cycles, "checking for new entries");

        let processed = self.ledger.load()?;
        debug!(processed = processed.len(), "ledger loaded");

        let snapshot = self.source.fetch_rows().await?;
        let mut report = CycleReport {
            fetched: snapshot.rows.len(),
            ..CycleReport::default()
        };
        if snapshot.is_empty() {
            warn!("no entries found in the sheet");
            return Ok(report);
        }

        self.warn_missing_fields(&snapshot.header_row());

        let mut seen = HashSet::new();
        let mut pending: Vec<(Row, EntryId)> = Vec::new();
        for raw in &snapshot.rows {
            let row = self.transformer.transform(raw);
            let id = EntryId::derive(&row, &self.plan.id_fields);
            if processed.contains(&id) {
                debug!(%id, "skipping existing entry");
                continue;
            }
            if !seen.insert(id.clone()) {
                debug!(%id, "skipping repeated row within this fetch");
                continue;
            }
            pending.push((row, id));
        }
        report.new_entries = pending.len();

        if pending.is_empty() {
            info!("no new entries");
            return Ok(report);
        }
        info!(count = pending.len(), "found new entries");

        let total = pending.len();
        for (index, (row, id)) in pending.iter().enumerate() {
            if index > 0 {
                self.sleeper.sleep(self.pacing.entry_delay).await;
            }
            info!(entry = index + 1, total, %id, "typing entry");
            self.type_entry(row).await?;
            self.ledger.append(id)?;
            report.typed += 1;
        }

        info!(typed = report.typed, "cycle complete");
        Ok(report)
    }

    async fn type_entry(&self, row: &Row) -> Result<(), SinkError> {
        self.sleeper.sleep(self.pacing.initial_delay).await;

        for field in &self.plan.fields_to_type {
            let Some(value) = row.get(field) else {
                debug!(field = %field, "field not in entry, skipping");
                continue;
            };
            let value = self.transformer.display_value(field, value);
            debug!(field = %field, value, "typing field");
            self.typist.type_text(value, self.pacing.type_delay).await?;
            self.typist
                .press_key_by_name(&self.plan.between_fields_key, 1)
                .await?;
            self.sleeper.sleep(self.pacing.field_delay).await;
        }

        for end in &self.plan.end_entry_keys {
            self.typist.press_key_by_name(&end.key, end.times).await?;
        }
        Ok(())
    }

    fn warn_missing_fields(&self, header_row: &Row) {
        let shape = self.transformer.shape(header_row);
        let missing: Vec<&str> = self
            .plan
            .fields_to_type
            .iter()
            .chain(&self.plan.id_fields)
            .filter(|f| !shape.contains(f))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            warn!(?missing, "configured fields are not in the sheet header");
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{LedgerSnapshot, MockRowSource};
    use crate::application::typist::KeystrokeSink;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use typist_core::{decode, Keystroke, SheetSnapshot};

    // ── Fakes ─────────────────────────────────────────────────────────────────

    #[derive(Default)]
    struct RecordingSink {
        presses: Mutex<Vec<Keystroke>>,
        should_fail: bool,
    }

    impl RecordingSink {
        /// Decodes the presses back to text; named keys show as `<code>`.
        fn text(&self) -> String {
            self.presses
                .lock()
                .unwrap()
                .iter()
                .map(|k| match decode(*k) {
                    Some('\t') => "<TAB>".to_string(),
                    Some('\n') => "<ENTER>".to_string(),
                    Some(c) => c.to_string(),
                    None => format!("<{}>", k.key_code),
                })
                .collect()
        }
    }

    impl KeystrokeSink for RecordingSink {
        fn press(&self, keystroke: Keystroke) -> Result<(), SinkError> {
            if self.should_fail {
                return Err(SinkError::Rejected("injected failure".to_string()));
            }
            self.presses.lock().unwrap().push(keystroke);
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemoryLedger {
        ids: Mutex<Vec<EntryId>>,
    }

    impl EntryLedger for MemoryLedger {
        fn load(&self) -> Result<LedgerSnapshot, LedgerError> {
            Ok(self.ids.lock().unwrap().iter().cloned().collect())
        }

        fn append(&self, id: &EntryId) -> Result<(), LedgerError> {
            self.ids.lock().unwrap().push(id.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct InstantSleeper {
        sleeps: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for InstantSleeper {
        async fn sleep(&self, duration: Duration) {
            self.sleeps.lock().unwrap().push(duration);
        }
    }

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn strings(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn snapshot(lines: &[&[&str]]) -> SheetSnapshot {
        SheetSnapshot::from_grid(lines.iter().map(|l| strings(l)).collect())
    }

    fn plan() -> EntryPlan {
        EntryPlan {
            fields_to_type: strings(&["Date", "Material"]),
            id_fields: strings(&["Date", "Time", "Material"]),
            between_fields_key: "tab".to_string(),
            end_entry_keys: vec![EndKey {
                key: "enter".to_string(),
                times: 2,
            }],
        }
    }

    fn pacing() -> Pacing {
        Pacing {
            type_delay: Duration::from_millis(1),
            field_delay: Duration::from_millis(20),
            entry_delay: Duration::from_millis(300),
            initial_delay: Duration::from_millis(4000),
            check_interval: Duration::from_secs(60),
        }
    }

    struct Harness {
        automation: AutomationLoop,
        sink: Arc<RecordingSink>,
        ledger: Arc<MemoryLedger>,
        sleeper: Arc<InstantSleeper>,
    }

    fn harness(source: MockRowSource, sink: RecordingSink) -> Harness {
        let sink = Arc::new(sink);
        let ledger = Arc::new(MemoryLedger::default());
        let sleeper = Arc::new(InstantSleeper::default());
        let typist = Typist::new(sink.clone(), sleeper.clone()).with_key_press_delay(Duration::ZERO);
        let automation = AutomationLoop::new(
            Arc::new(source),
            ledger.clone(),
            sleeper.clone(),
            typist,
            EntryTransformer::default(),
            plan(),
            pacing(),
        );
        Harness {
            automation,
            sink,
            ledger,
            sleeper,
        }
    }

    fn source_returning(snap: SheetSnapshot) -> MockRowSource {
        let mut source = MockRowSource::new();
        source
            .expect_fetch_rows()
            .returning(move || Ok(snap.clone()));
        source
    }

    fn weighbridge() -> SheetSnapshot {
        snapshot(&[
            &["Timestamp", "Vehicle Type", "Material"],
            &["03/14/2024 13:05:00", "RMC TRUCK 250", "Sand"],
        ])
    }

    // ── Polling pass ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_new_row_is_typed_then_recorded() {
        // Arrange
        let mut h = harness(source_returning(weighbridge()), RecordingSink::default());

        // Act
        let report = h.automation.poll_once().await.unwrap();

        // Assert
        assert_eq!(
            report,
            CycleReport {
                fetched: 1,
                new_entries: 1,
                typed: 1
            }
        );
        assert_eq!(h.sink.text(), "2024-03-14<TAB>Sand<TAB><ENTER><ENTER>");
        assert_eq!(
            *h.ledger.ids.lock().unwrap(),
            vec![EntryId::from("2024-03-14|13:05:00|Sand")]
        );
    }

    #[tokio::test]
    async fn test_second_pass_types_nothing() {
        let mut h = harness(source_returning(weighbridge()), RecordingSink::default());

        h.automation.poll_once().await.unwrap();
        let presses_after_first = h.sink.presses.lock().unwrap().len();
        let second = h.automation.poll_once().await.unwrap();

        assert_eq!(second.new_entries, 0);
        assert_eq!(second.typed, 0);
        assert_eq!(h.sink.presses.lock().unwrap().len(), presses_after_first);
        assert_eq!(h.ledger.ids.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_repeated_row_in_one_fetch_is_typed_once() {
        let snap = snapshot(&[
            &["Timestamp", "Material"],
            &["03/14/2024 13:05:00", "Sand"],
            &["03/14/2024 13:05:00", "Sand"],
        ]);
        let mut h = harness(source_returning(snap), RecordingSink::default());

        let report = h.automation.poll_once().await.unwrap();

        assert_eq!(report.fetched, 2);
        assert_eq!(report.new_entries, 1);
        assert_eq!(h.ledger.ids.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fields_absent_from_row_are_skipped() {
        // `Material` is not in the sheet, so only `Date` is typed.
        let snap = snapshot(&[&["Timestamp"], &["03/14/2024 13:05:00"]]);
        let mut h = harness(source_returning(snap), RecordingSink::default());

        h.automation.poll_once().await.unwrap();

        assert_eq!(h.sink.text(), "2024-03-14<TAB><ENTER><ENTER>");
    }

    #[tokio::test]
    async fn test_entry_delay_only_between_entries() {
        // Arrange
        let snap = snapshot(&[
            &["Timestamp", "Material"],
            &["03/14/2024 13:05:00", "Sand"],
            &["03/14/2024 13:06:00", "Gravel"],
        ]);
        let mut h = harness(source_returning(snap), RecordingSink::default());

        // Act
        h.automation.poll_once().await.unwrap();

        // Assert
        let sleeps = h.sleeper.sleeps.lock().unwrap();
        let entry_delays = sleeps.iter().filter(|d| **d == pacing().entry_delay).count();
        let focus_delays = sleeps.iter().filter(|d| **d == pacing().initial_delay).count();
        assert_eq!(entry_delays, 1);
        assert_eq!(focus_delays, 2);
        assert_eq!(sleeps[0], pacing().initial_delay);
    }

    #[tokio::test]
    async fn test_empty_sheet_is_not_an_error() {
        let mut h = harness(source_returning(SheetSnapshot::default()), RecordingSink::default());
        let report = h.automation.poll_once().await.unwrap();
        assert_eq!(report, CycleReport::default());
    }

    // ── Failure handling ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_fetch_failure_leaves_ledger_untouched() {
        let mut source = MockRowSource::new();
        source
            .expect_fetch_rows()
            .returning(|| Err(SourceError::Request("connection refused".to_string())));
        let mut h = harness(source, RecordingSink::default());

        let err = h.automation.poll_once().await.unwrap_err();

        assert!(matches!(err, AutomationError::Source(_)));
        assert!(!err.is_fatal());
        assert!(h.ledger.ids.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_typing_failure_does_not_record_entry() {
        let sink = RecordingSink {
            should_fail: true,
            ..RecordingSink::default()
        };
        let mut h = harness(source_returning(weighbridge()), sink);

        let err = h.automation.poll_once().await.unwrap_err();

        assert!(matches!(err, AutomationError::Sink(_)));
        assert!(h.ledger.ids.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unparseable_timestamp_is_typed_and_recorded() {
        // Arrange
        let snap = snapshot(&[&["Timestamp", "Material"], &["yesterday-ish", "Sand"]]);
        let mut h = harness(source_returning(snap), RecordingSink::default());

        // Act
        let report = h.automation.poll_once().await.unwrap();

        // Assert: empty Date still gets its between-fields key.
        assert_eq!(report.typed, 1);
        assert_eq!(h.sink.text(), "<TAB>Sand<TAB><ENTER><ENTER>");
        assert_eq!(*h.ledger.ids.lock().unwrap(), vec![EntryId::from("||Sand")]);
    }

    #[tokio::test]
    async fn test_sheet_with_own_date_and_time_columns() {
        let snap = snapshot(&[
            &["Date", "Time", "Timestamp", "Material"],
            &["stale", "stale", "03/14/2024 13:05:00", "Sand"],
        ]);
        let mut h = harness(source_returning(snap), RecordingSink::default());

        let report = h.automation.poll_once().await.unwrap();

        assert_eq!(report.typed, 1);
        assert_eq!(h.sink.text(), "2024-03-14<TAB>Sand<TAB><ENTER><ENTER>");
        assert_eq!(
            *h.ledger.ids.lock().unwrap(),
            vec![EntryId::from("2024-03-14|13:05:00|Sand")]
        );
    }

    // ── State machine ─────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_step_alternates_polling_and_idle() {
        // Arrange
        let mut h = harness(source_returning(weighbridge()), RecordingSink::default());
        assert_eq!(h.automation.state(), LoopState::Polling);

        // Act / Assert
        let report = h.automation.step().await;
        assert_eq!(report.map(|r| r.typed), Some(1));
        assert_eq!(h.automation.state(), LoopState::Idle);

        let idle = h.automation.step().await;
        assert!(idle.is_none());
        assert_eq!(h.automation.state(), LoopState::Polling);
        assert_eq!(
            h.sleeper.sleeps.lock().unwrap().last(),
            Some(&pacing().check_interval)
        );
    }

    #[tokio::test]
    async fn test_step_swallows_recoverable_errors() {
        let mut source = MockRowSource::new();
        source
            .expect_fetch_rows()
            .returning(|| Err(SourceError::Status {
                status: 503,
                body: "unavailable".to_string(),
            }));
        let mut h = harness(source, RecordingSink::default());

        let outcome = h.automation.step().await;

        assert!(outcome.is_none());
        assert_eq!(h.automation.state(), LoopState::Idle);
    }

    #[tokio::test]
    async fn test_host_disconnect_is_retried_on_next_pass() {
        // Arrange: writes fail as they do while the host is powered off.
        struct UnpluggedOnce {
            failed: Mutex<bool>,
            inner: RecordingSink,
        }
        impl KeystrokeSink for UnpluggedOnce {
            fn press(&self, keystroke: Keystroke) -> Result<(), SinkError> {
                let mut failed = self.failed.lock().unwrap();
                if !*failed {
                    *failed = true;
                    return Err(SinkError::Write {
                        path: "/dev/hidg0".into(),
                        source: std::io::Error::from_raw_os_error(108),
                    });
                }
                self.inner.press(keystroke)
            }
        }
        let sink = Arc::new(UnpluggedOnce {
            failed: Mutex::new(false),
            inner: RecordingSink::default(),
        });
        let ledger = Arc::new(MemoryLedger::default());
        let sleeper = Arc::new(InstantSleeper::default());
        let mut automation = AutomationLoop::new(
            Arc::new(source_returning(weighbridge())),
            ledger.clone(),
            sleeper.clone(),
            Typist::new(sink.clone(), sleeper).with_key_press_delay(Duration::ZERO),
            EntryTransformer::default(),
            plan(),
            pacing(),
        );

        // Act
        let failed_pass = automation.step().await;
        automation.step().await;
        let retried_pass = automation.step().await;

        // Assert
        assert!(failed_pass.is_none());
        assert_eq!(retried_pass.map(|r| r.typed), Some(1));
        assert_eq!(automation.cycles(), 2);
        assert_eq!(sink.inner.text(), "2024-03-14<TAB>Sand<TAB><ENTER><ENTER>");
        assert_eq!(ledger.ids.lock().unwrap().len(), 1);
    }
}
