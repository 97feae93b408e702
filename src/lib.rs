#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

mod api;
mod error;
mod model;
mod options;
mod paths;
pub mod poll;
mod selection;
mod table;
mod term;
mod timefmt;
mod tree;

use std::time::{Duration, Instant};

use chrono::Utc;
use console::style;
use indicatif::ProgressBar;
use url::Url;

pub use crate::api::{Api, Endpoints};
pub use crate::error::*;
pub use crate::model::{
    Assay, Description, DirRef, DirectoryEntry, LinkRef, Project, Study, Task, TaskRequest, User,
};
pub use crate::options::{ListOption, OptionList};
pub use crate::paths::{
    DirectoryInfo, MIN_SOURCE_SEGMENTS, classify, is_ingest_source, option_label,
};
pub use crate::poll::PollerHandle;
pub use crate::selection::{Selection, SelectionEvent, Target};
pub use crate::table::{
    LinkCell, ProgressCell, TaskRow, TaskTable, TimestampCell, progress_label,
};
pub use crate::term::render_table;
pub use crate::timefmt::{render_age, time_since};
pub use crate::tree::{Level, ROOT, Tree, TreeNode, merge_directories, merge_targets};

/// Where the creation flow currently stands. The flow always comes back to
/// `Idle`: validation failures, network failures, and successes alike end
/// with the dialog closed and the selection reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Dialog {
    /// No dialog; the table keeps refreshing on its own.
    #[default]
    Idle,
    /// Collecting a selection.
    Open,
    /// Checking the selection against the creation preconditions.
    Validating,
    /// Creation request in flight.
    Submitting,
}

/// One client session against a capture service: the pickers built from
/// its reference lists, the table of its tasks, and the selection being
/// assembled for the next task.
pub struct Session {
    api: Api,
    users: OptionList,
    projects: OptionList,
    directories: Tree,
    targets: Tree,
    table: TaskTable,
    selection: Selection,
    dialog: Dialog,
    task_interval: Duration,
    reference_every: u64,
}

impl Session {
    pub fn config() -> Config {
        Config::new()
    }

    /// Wrap an already-configured [`Api`] with default intervals.
    pub fn with_api(api: Api) -> Self {
        Self {
            api,
            users: OptionList::new(),
            projects: OptionList::new(),
            directories: Tree::new(),
            targets: Tree::new(),
            table: TaskTable::new(),
            selection: Selection::default(),
            dialog: Dialog::default(),
            task_interval: poll::TASK_INTERVAL,
            reference_every: poll::REFERENCE_EVERY,
        }
    }

    /// Fetch the reference lists and the existing tasks, build the pickers,
    /// and render the initial rows. The six collections are independent, so
    /// they are fetched in parallel.
    pub fn load(&mut self) -> Result<(), CapstanError> {
        let s = Instant::now();
        let bar = term::step_bar(6);
        bar.set_message("Loading reference data...");

        let api = &self.api;

        let ((users, projects), ((assays, studies), (directories, tasks))) = rayon::join(
            || {
                rayon::join(
                    || step(&bar, api.users()),
                    || step(&bar, api.projects()),
                )
            },
            || {
                rayon::join(
                    || rayon::join(|| step(&bar, api.assays()), || step(&bar, api.studies())),
                    || rayon::join(|| step(&bar, api.directories()), || step(&bar, api.tasks())),
                )
            },
        );

        bar.finish_with_message(format!("Loaded reference data {}", term::as_overhead(s)));

        let (users, projects) = (users?, projects?);
        let (assays, studies) = (assays?, studies?);
        let (directories, tasks) = (directories?, tasks?);

        let user_records: Vec<_> = users.iter().map(as_option).collect();
        merge_options(&mut self.users, &user_records);

        let project_records: Vec<_> = projects
            .iter()
            .map(|project| (project.id, project.url.clone(), project.name.clone()))
            .collect();
        merge_options(&mut self.projects, &project_records);

        self.merge_references(&directories, &assays, &studies);

        let now = Utc::now();
        for task in &tasks {
            self.table.render(task, now);
        }
        tracing::info!("rendered {} existing tasks", self.table.len());

        Ok(())
    }

    /// Fold freshly fetched reference lists into the pickers. Insertion is
    /// idempotent, so calling this on every refresh cadence is safe.
    pub fn merge_references(
        &mut self,
        directories: &[DirectoryEntry],
        assays: &[Assay],
        studies: &[Study],
    ) {
        tree::merge_directories(&mut self.directories, directories);
        tree::merge_targets(&mut self.targets, assays, studies);
    }

    /// Re-fetch the directory and target reference lists once and merge
    /// them into the pickers.
    pub fn refresh_references(&mut self) -> Result<(), ApiError> {
        let directories = self.api.directories()?;
        let assays = self.api.assays()?;
        let studies = self.api.studies()?;
        self.merge_references(&directories, &assays, &studies);

        Ok(())
    }

    /// One synchronous polling pass: re-fetch every rendered row and fold
    /// the result in, dropping rows whose fetch failed.
    pub fn poll_once(&mut self) {
        let now = Utc::now();

        for id in self.table.ids() {
            let Some(ticket) = self.table.begin_refresh(&id) else {
                continue;
            };

            match self.api.task(&id) {
                Ok(task) => {
                    self.table.apply_refresh(&id, ticket, &task, now);
                }
                Err(err) => {
                    tracing::warn!("couldn't refresh task {id}, dropping its row: {err}");
                    self.table.remove_failed(&id, ticket);
                }
            }
        }
    }

    pub fn open_dialog(&mut self) {
        self.dialog = Dialog::Open;
    }

    /// Close the creation dialog without submitting.
    pub fn cancel_dialog(&mut self) {
        self.close_dialog();
    }

    fn close_dialog(&mut self) {
        self.dialog = Dialog::Idle;
        self.selection = Selection::default();
    }

    /// Feed one picker event through the selection reducer.
    pub fn update(&mut self, event: SelectionEvent) {
        self.selection = self.selection.apply(event, &self.directories);
    }

    /// Enabled-state of the create action; recompute after every
    /// [`Session::update`].
    pub fn can_submit(&self) -> bool {
        self.selection.can_submit()
    }

    /// Validate the selection and create the task. Whatever happens, the
    /// dialog ends up closed and the selection reset; only a successful
    /// creation renders a new row. Returns the new task's identifier.
    pub fn submit(&mut self) -> Result<String, CapstanError> {
        self.dialog = Dialog::Validating;

        let request = match self.selection.build_request(&self.directories) {
            Ok(request) => request,
            Err(err) => {
                self.close_dialog();
                return Err(err.into());
            }
        };

        self.dialog = Dialog::Submitting;
        let result = self.api.create_task(&request);
        self.close_dialog();

        match result {
            Ok(task) => {
                tracing::info!("created task {}", task.id);
                let row = self.table.render(&task, Utc::now());
                Ok(row.id.clone())
            }
            Err(err) => {
                tracing::error!("couldn't create the task: {err}");
                Err(CapstanError::Create(err))
            }
        }
    }

    /// Ask the service to drop a task and remove its row. The row goes
    /// away even when the service refuses; the refusal is only logged.
    pub fn delete_task(&mut self, id: &str) {
        if let Err(err) = self.api.delete_task(id) {
            tracing::warn!("couldn't delete task {id} on the service: {err}");
        }

        self.table.remove(id);
    }

    /// Run the bundled terminal view: poll forever, redrawing the table
    /// whenever it changes.
    pub fn watch(&mut self) -> Result<(), CapstanError> {
        eprintln!(
            "Running {} in {} mode.",
            style("Capstan").red(),
            style("watch").blue()
        );

        self.watch_with(|table| {
            eprintln!("{}", term::render_table(table));
            Ok(())
        })
    }

    /// Like [`Session::watch`], but with a caller-supplied redraw hook.
    /// The hook runs once up front and then after every tick that changed
    /// the table; an error from it ends the loop.
    pub fn watch_with<F>(&mut self, mut redraw: F) -> Result<(), CapstanError>
    where
        F: FnMut(&TaskTable) -> anyhow::Result<()>,
    {
        redraw(&self.table).map_err(CapstanError::Redraw)?;
        let mut seen = self.table.revision();
        let mut tick: u64 = 0;

        loop {
            std::thread::sleep(self.task_interval);
            tick += 1;

            self.poll_once();

            if tick.is_multiple_of(self.reference_every) {
                if let Err(err) = self.refresh_references() {
                    tracing::warn!("couldn't refresh reference lists: {err}");
                }
            }

            if self.table.revision() != seen {
                seen = self.table.revision();
                redraw(&self.table).map_err(CapstanError::Redraw)?;
            }
        }
    }

    pub fn api(&self) -> &Api {
        &self.api
    }

    /// The submitter picker.
    pub fn users(&self) -> &OptionList {
        &self.users
    }

    /// The project picker.
    pub fn projects(&self) -> &OptionList {
        &self.projects
    }

    /// The source-directory picker tree.
    pub fn directories(&self) -> &Tree {
        &self.directories
    }

    /// The target picker tree (projects, investigations, studies, assays).
    pub fn targets(&self) -> &Tree {
        &self.targets
    }

    pub fn table(&self) -> &TaskTable {
        &self.table
    }

    pub(crate) fn table_mut(&mut self) -> &mut TaskTable {
        &mut self.table
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn dialog(&self) -> Dialog {
        self.dialog
    }

    pub fn task_interval(&self) -> Duration {
        self.task_interval
    }
}

/// Tick one segment of the load progress bar as a fetch completes.
fn step<T>(bar: &ProgressBar, result: T) -> T {
    bar.inc(1);
    result
}

/// Insert `(id, value, text)` records into a picker list and re-sort it.
/// Records without a submit value are skipped; a missing display name
/// falls back to the value.
fn merge_options(list: &mut OptionList, records: &[(Option<i64>, Option<String>, Option<String>)]) {
    for (id, value, name) in records {
        let Some(value) = value else { continue };
        let id = id.map(|id| id.to_string()).unwrap_or_else(|| value.clone());
        let text = name.as_deref().unwrap_or(value);
        list.insert(&id, value, text);
    }

    list.sort();
}

fn as_option(user: &User) -> (Option<i64>, Option<String>, Option<String>) {
    (user.id, user.url.clone(), user.name.clone())
}

/// A builder for a [`Session`] with specified endpoints and intervals.
pub struct Config {
    base: Option<Url>,
    endpoints: Option<Endpoints>,
    task_interval: Duration,
    reference_every: u64,
}

impl Config {
    fn new() -> Self {
        Self {
            base: None,
            endpoints: None,
            task_interval: poll::TASK_INTERVAL,
            reference_every: poll::REFERENCE_EVERY,
        }
    }

    /// Discover the endpoint set from the service description at `base`
    /// when the session is finished.
    pub fn base_url(mut self, base: impl AsRef<str>) -> Result<Self, ApiError> {
        self.base = Some(Url::parse(base.as_ref())?);
        Ok(self)
    }

    /// Use an explicit endpoint set; takes precedence over discovery.
    pub fn endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    /// How often the poller re-fetches task rows.
    pub fn task_interval(mut self, interval: Duration) -> Self {
        self.task_interval = interval;
        self
    }

    /// Refresh the reference lists every `ticks` polling ticks.
    pub fn reference_every(mut self, ticks: u64) -> Self {
        self.reference_every = ticks.max(1);
        self
    }

    pub fn finish(self) -> Result<Session, CapstanError> {
        let api = match (self.endpoints, self.base) {
            (Some(endpoints), _) => Api::new(endpoints),
            (None, Some(base)) => Api::discover(&base)?,
            (None, None) => return Err(CapstanError::Unconfigured),
        };

        let mut session = Session::with_api(api);
        session.task_interval = self.task_interval;
        session.reference_every = self.reference_every;

        Ok(session)
    }
}

/// Install a stderr `tracing` subscriber honoring `RUST_LOG`, for binaries
/// that don't bring their own.
#[cfg(feature = "logging")]
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_session() -> Session {
        // Port 9 is the discard port; nothing answers there, so any actual
        // network call fails fast.
        let base = Url::parse("http://127.0.0.1:9/api/").unwrap();
        let endpoints = Endpoints {
            users: base.join("users").unwrap(),
            projects: base.join("projects").unwrap(),
            assays: base.join("assays").unwrap(),
            studies: base.join("studies").unwrap(),
            directories: base.join("dir").unwrap(),
            tasks: base.join("tasks").unwrap(),
        };
        Session::with_api(Api::new(endpoints))
    }

    fn seeded_session() -> Session {
        let mut session = offline_session();
        session.merge_references(
            &[
                DirectoryEntry {
                    name: "root/inst/INST1/alice/run1".to_string(),
                    ..Default::default()
                },
                DirectoryEntry {
                    name: "root/inst/INST1/run2".to_string(),
                    ..Default::default()
                },
            ],
            &[Assay {
                url: Some("a/1".to_string()),
                name: Some("Assay one".to_string()),
                ..Default::default()
            }],
            &[],
        );
        session
    }

    #[test]
    fn a_config_without_endpoints_is_rejected() {
        assert!(matches!(
            Session::config().finish(),
            Err(CapstanError::Unconfigured)
        ));
    }

    #[test]
    fn the_dialog_opens_and_cancelling_resets_the_selection() {
        let mut session = seeded_session();
        assert_eq!(session.dialog(), Dialog::Idle);

        session.open_dialog();
        assert_eq!(session.dialog(), Dialog::Open);

        session.update(SelectionEvent::Submitter(Some("u/7".to_string())));
        assert!(session.selection().submitter.is_some());

        session.cancel_dialog();
        assert_eq!(session.dialog(), Dialog::Idle);
        assert_eq!(*session.selection(), Selection::default());
    }

    #[test]
    fn submit_rejects_an_incomplete_selection_without_a_network_call() {
        let mut session = seeded_session();
        session.open_dialog();
        session.update(SelectionEvent::Submitter(Some("u/7".to_string())));

        // Validation fails before anything touches the wire, so this works
        // against the unreachable endpoint set.
        let err = session.submit().unwrap_err();
        assert!(matches!(
            err,
            CapstanError::Validation(ValidationError::NoTarget)
        ));
        assert_eq!(session.dialog(), Dialog::Idle);
        assert!(session.table().is_empty());
    }

    #[test]
    fn selecting_an_instrument_does_not_arm_the_create_action() {
        let mut session = seeded_session();
        session.open_dialog();
        session.update(SelectionEvent::Submitter(Some("u/7".to_string())));
        session.update(SelectionEvent::Target(Some(Target::Assay {
            url: "a/1".to_string(),
        })));
        session.update(SelectionEvent::Directory(Some("root/inst/INST1".to_string())));

        assert!(!session.can_submit());
        assert!(matches!(
            session.submit().unwrap_err(),
            CapstanError::Validation(ValidationError::NoDirectory)
        ));
        assert!(session.table().is_empty());
    }

    #[test]
    fn a_failed_creation_resets_the_dialog_and_renders_nothing() {
        let mut session = seeded_session();
        session.open_dialog();
        session.update(SelectionEvent::Submitter(Some("u/7".to_string())));
        session.update(SelectionEvent::Target(Some(Target::Assay {
            url: "a/1".to_string(),
        })));
        session.update(SelectionEvent::Directory(Some(
            "root/inst/INST1/run2".to_string(),
        )));
        assert!(session.can_submit());

        // The endpoint set points at a closed port: the POST itself fails.
        let err = session.submit().unwrap_err();
        assert!(matches!(err, CapstanError::Create(_)));
        assert_eq!(session.dialog(), Dialog::Idle);
        assert_eq!(*session.selection(), Selection::default());
        assert!(session.table().is_empty());
    }

    #[test]
    fn deletion_is_optimistic_about_the_local_row() {
        let mut session = seeded_session();
        let task: Task = serde_json::from_str(r#"{"id": "t1"}"#).unwrap();
        session.table_mut().render(&task, Utc::now());

        // The service is unreachable, so the delete call fails; the row
        // must disappear anyway.
        session.delete_task("t1");
        assert!(session.table().is_empty());
    }

    #[test]
    fn merging_options_skips_records_without_a_value() {
        let mut list = OptionList::new();
        merge_options(
            &mut list,
            &[
                (Some(2), Some("u/2".to_string()), Some("Bob".to_string())),
                (Some(3), None, Some("No URL".to_string())),
                (None, Some("u/9".to_string()), None),
            ],
        );

        assert_eq!(list.len(), 2);
        // The nameless record shows its value and sorts by it.
        assert_eq!(list.get("u/9").unwrap().text, "u/9");
    }
}
