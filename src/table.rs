//! The task table: one row per ingest task, rendered idempotently.
//!
//! Rows are display-agnostic values; a widget (or the bundled terminal
//! view) reads them and draws what it likes. The table owns the two
//! invariants everything else leans on: a task identifier maps to at most
//! one row, and a refresh result is only applied if the row it was started
//! for is still the current one.

use chrono::{DateTime, Utc};

use crate::model::Task;
use crate::timefmt;

/// Placeholder shown when a linked thing exists but carries no name.
const UNNAMED: &str = "UNDEFINED";

/// A cell linking to a named resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkCell {
    pub url: String,
    pub text: String,
}

/// A timestamp cell. The raw timestamp materializes once, on the first
/// update that carries one, and later refreshes only recompute the
/// displayed age; re-rendering never stacks a second copy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimestampCell {
    raw: Option<String>,
    display: Option<String>,
}

impl TimestampCell {
    /// Fold a refresh into the cell. An absent timestamp leaves the cell
    /// exactly as it was.
    pub fn update(&mut self, timestamp: Option<&str>, now: DateTime<Utc>) {
        let Some(timestamp) = timestamp else { return };

        if self.raw.is_none() {
            self.raw = Some(timestamp.to_string());
        }
        self.display = Some(timefmt::render_age(timestamp, now));
    }

    /// The wire timestamp the cell was created with (hover metadata).
    pub fn raw(&self) -> Option<&str> {
        self.raw.as_deref()
    }

    /// The rendered relative-age text.
    pub fn display(&self) -> Option<&str> {
        self.display.as_deref()
    }
}

/// Compose the label shown inside a progress cell. A missing fraction
/// means the task hasn't started; a non-empty status prefixes the running
/// percentage but never the terminal labels.
pub fn progress_label(factor: Option<f64>, status: Option<&str>) -> String {
    let Some(factor) = factor else {
        return "Init...".to_string();
    };

    let value = (factor * 100.0).floor() as i64;
    if value == 100 {
        return "Done".to_string();
    }

    match status.unwrap_or_default() {
        "" => format!("{value}%"),
        message => format!("{message} {value}%"),
    }
}

/// A progress-bar cell: the percentage (absent while unstarted) plus its
/// label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressCell {
    pub percent: Option<i64>,
    pub label: String,
}

impl ProgressCell {
    /// Fold a refresh into the cell; returns whether the task is done.
    pub fn update(&mut self, factor: Option<f64>, status: Option<&str>) -> bool {
        self.percent = factor.map(|factor| (factor * 100.0).floor() as i64);
        self.label = progress_label(factor, status);
        self.percent == Some(100)
    }

    pub fn is_done(&self) -> bool {
        self.percent == Some(100)
    }
}

/// One row of the task table.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRow {
    pub id: String,
    /// Absent when the task record carried no submitter at all.
    pub submitter: Option<LinkCell>,
    /// Absent when the task has no target object; a present target with a
    /// missing name renders the placeholder instead of a broken link.
    pub target: Option<LinkCell>,
    pub start: TimestampCell,
    pub progress: ProgressCell,
    pub end: TimestampCell,
    /// Blank until the service reports a created asset.
    pub asset: Option<LinkCell>,
    /// Ticket of the refresh currently allowed to update this row.
    pending: Option<u64>,
}

fn link_cell(url: Option<&str>, name: Option<&str>) -> LinkCell {
    LinkCell {
        url: url.unwrap_or_default().to_string(),
        text: name.unwrap_or(UNNAMED).to_string(),
    }
}

/// Tabular view of ingest tasks, keyed by task identifier. Rows keep their
/// insertion order, the way the page appended them.
#[derive(Debug, Clone, Default)]
pub struct TaskTable {
    rows: Vec<TaskRow>,
    tickets: u64,
    revision: u64,
}

impl TaskTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render one task as a row. Idempotent: if a row for the identifier
    /// already exists it is returned unchanged, whatever the new record
    /// says.
    pub fn render(&mut self, task: &Task, now: DateTime<Utc>) -> &TaskRow {
        if let Some(position) = self.position(&task.id) {
            return &self.rows[position];
        }

        let mut start = TimestampCell::default();
        start.update(task.start_time.as_deref(), now);
        let mut end = TimestampCell::default();
        end.update(task.end_time.as_deref(), now);
        let mut progress = ProgressCell::default();
        progress.update(task.progress, task.status.as_deref());

        self.rows.push(TaskRow {
            id: task.id.clone(),
            submitter: task
                .submitter
                .as_ref()
                .map(|user| link_cell(user.url.as_deref(), user.name.as_deref())),
            target: task.target().map(|(url, name)| link_cell(url, name)),
            start,
            progress,
            end,
            asset: task.created_asset.as_deref().map(asset_cell),
            pending: None,
        });
        self.revision += 1;

        self.rows.last().expect("row was just pushed")
    }

    /// Mark the start of a refresh for a row, returning the ticket that a
    /// later [`TaskTable::apply_refresh`] must present. `None` when the row
    /// is already gone.
    pub fn begin_refresh(&mut self, id: &str) -> Option<u64> {
        let position = self.position(id)?;
        self.tickets += 1;
        self.rows[position].pending = Some(self.tickets);
        Some(self.tickets)
    }

    /// Fold a fetched record into the row the ticket was issued for. The
    /// result is discarded (returning `false`) if the row was deleted,
    /// re-rendered, or superseded by a newer refresh in the meantime.
    pub fn apply_refresh(
        &mut self,
        id: &str,
        ticket: u64,
        task: &Task,
        now: DateTime<Utc>,
    ) -> bool {
        let Some(position) = self.current(id, ticket) else {
            return false;
        };

        let row = &mut self.rows[position];
        row.start.update(task.start_time.as_deref(), now);
        row.progress.update(task.progress, task.status.as_deref());
        row.end.update(task.end_time.as_deref(), now);
        if let Some(url) = task.created_asset.as_deref() {
            row.asset = Some(asset_cell(url));
        }
        row.pending = None;
        self.revision += 1;

        true
    }

    /// Drop the row for a refresh that failed, unless the ticket is no
    /// longer current.
    pub fn remove_failed(&mut self, id: &str, ticket: u64) -> bool {
        match self.current(id, ticket) {
            Some(position) => {
                self.rows.remove(position);
                self.revision += 1;
                true
            }
            None => false,
        }
    }

    /// Remove a row outright (explicit deletion).
    pub fn remove(&mut self, id: &str) -> bool {
        match self.position(id) {
            Some(position) => {
                self.rows.remove(position);
                self.revision += 1;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &str) -> Option<&TaskRow> {
        self.position(id).map(|position| &self.rows[position])
    }

    /// Identifiers of all rendered rows, in display order. The poller
    /// snapshots this before fetching.
    pub fn ids(&self) -> Vec<String> {
        self.rows.iter().map(|row| row.id.clone()).collect()
    }

    pub fn rows(&self) -> &[TaskRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Bumped on every visible change; cheap to poll for redraw decisions.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.rows.iter().position(|row| row.id == id)
    }

    fn current(&self, id: &str, ticket: u64) -> Option<usize> {
        let position = self.position(id)?;
        (self.rows[position].pending == Some(ticket)).then_some(position)
    }
}

fn asset_cell(url: &str) -> LinkCell {
    LinkCell {
        url: url.to_string(),
        text: "Asset".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 6, 12, 0, 0).unwrap()
    }

    fn task(id: &str) -> Task {
        serde_json::from_str(&format!(
            r#"{{
                "id": "{id}",
                "submitter": {{"url": "u/7", "name": "Alice"}},
                "assay": {{"url": "a/1", "name": "Assay one"}},
                "start-time": "2026-08-06T11:58:00Z",
                "progress": 0.5
            }}"#
        ))
        .unwrap()
    }

    #[test]
    fn progress_labels() {
        assert_eq!(progress_label(None, None), "Init...");
        assert_eq!(progress_label(Some(0.0), None), "0%");
        assert_eq!(progress_label(Some(0.5), None), "50%");
        assert_eq!(progress_label(Some(1.0), None), "Done");
        assert_eq!(progress_label(Some(0.42), Some("scanning")), "scanning 42%");
        // The status never decorates the terminal labels.
        assert_eq!(progress_label(Some(1.0), Some("scanning")), "Done");
        assert_eq!(progress_label(None, Some("scanning")), "Init...");
    }

    #[test]
    fn render_is_idempotent() {
        let mut table = TaskTable::new();
        table.render(&task("t1"), now());

        let mut changed = task("t1");
        changed.submitter = None;
        table.render(&changed, now());

        assert_eq!(table.len(), 1);
        // The second record did not touch the existing cells.
        let row = table.get("t1").unwrap();
        assert_eq!(row.submitter.as_ref().unwrap().text, "Alice");
    }

    #[test]
    fn missing_target_renders_an_empty_cell() {
        let mut table = TaskTable::new();
        let mut bare = task("t1");
        bare.assay = None;
        let row = table.render(&bare, now()).clone();
        assert_eq!(row.target, None);

        let unnamed: Task = serde_json::from_str(
            r#"{"id": "t2", "study": {"url": "s/1"}}"#,
        )
        .unwrap();
        let row = table.render(&unnamed, now()).clone();
        assert_eq!(row.target.as_ref().unwrap().text, "UNDEFINED");
        assert_eq!(row.target.as_ref().unwrap().url, "s/1");
    }

    #[test]
    fn timestamp_cells_materialize_once() {
        let mut table = TaskTable::new();
        table.render(&task("t1"), now());

        let mut moved = task("t1");
        moved.start_time = Some("2026-08-06T11:00:00Z".to_string());
        let ticket = table.begin_refresh("t1").unwrap();
        assert!(table.apply_refresh("t1", ticket, &moved, now()));

        let row = table.get("t1").unwrap();
        // The original wire timestamp sticks; only the age text follows.
        assert_eq!(row.start.raw(), Some("2026-08-06T11:58:00Z"));
        assert_eq!(row.start.display(), Some("60 mins ago"));
    }

    #[test]
    fn refresh_updates_progress_and_asset() {
        let mut table = TaskTable::new();
        table.render(&task("t1"), now());

        let done: Task = serde_json::from_str(
            r#"{
                "id": "t1",
                "progress": 1.0,
                "end-time": "2026-08-06T11:59:30Z",
                "created-asset": "https://seek.example/assets/12"
            }"#,
        )
        .unwrap();

        let ticket = table.begin_refresh("t1").unwrap();
        assert!(table.apply_refresh("t1", ticket, &done, now()));

        let row = table.get("t1").unwrap();
        assert!(row.progress.is_done());
        assert_eq!(row.progress.label, "Done");
        assert_eq!(row.end.display(), Some("30 secs ago"));
        assert_eq!(row.asset.as_ref().unwrap().text, "Asset");
    }

    #[test]
    fn stale_refresh_results_are_discarded() {
        let mut table = TaskTable::new();
        table.render(&task("t1"), now());

        let ticket = table.begin_refresh("t1").unwrap();
        table.remove("t1");

        assert!(!table.apply_refresh("t1", ticket, &task("t1"), now()));
        assert!(table.get("t1").is_none());
    }

    #[test]
    fn stale_failure_does_not_remove_a_recreated_row() {
        let mut table = TaskTable::new();
        table.render(&task("t1"), now());

        let ticket = table.begin_refresh("t1").unwrap();
        table.remove("t1");
        table.render(&task("t1"), now());

        // The failed refresh belonged to the old row; the new one stays.
        assert!(!table.remove_failed("t1", ticket));
        assert!(table.get("t1").is_some());
    }

    #[test]
    fn newer_refresh_supersedes_an_older_ticket() {
        let mut table = TaskTable::new();
        table.render(&task("t1"), now());

        let stale = table.begin_refresh("t1").unwrap();
        let fresh = table.begin_refresh("t1").unwrap();

        let mut record = task("t1");
        record.progress = Some(0.9);
        assert!(!table.apply_refresh("t1", stale, &record, now()));
        assert!(table.apply_refresh("t1", fresh, &record, now()));
    }
}
