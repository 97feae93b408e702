//! The current-selection value and the creation request built from it.
//!
//! Widget adapters translate their change events into [`SelectionEvent`]s
//! and feed them through [`Selection::apply`]; nothing else writes the
//! selection. `can_submit` and `build_request` are pure functions of the
//! resulting value, so the create action's enabled state can be recomputed
//! on every event without consulting any widget.

use crate::error::ValidationError;
use crate::model::{DirRef, LinkRef, TaskRequest};
use crate::paths;
use crate::tree::Tree;

/// The thing a new task should archive into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Assay { url: String },
    Study { url: String },
    Project { url: String },
}

impl Target {
    pub fn url(&self) -> &str {
        match self {
            Target::Assay { url } | Target::Study { url } | Target::Project { url } => url,
        }
    }
}

/// Immutable snapshot of the picker choices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// URL of the chosen submitter.
    pub submitter: Option<String>,
    pub target: Option<Target>,
    /// Full path of the chosen source directory leaf.
    pub directory: Option<String>,
    pub notes: Option<String>,
}

/// A change event emitted by one of the pickers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionEvent {
    Submitter(Option<String>),
    Target(Option<Target>),
    /// A directory-tree activation carrying the node identifier. Activating
    /// anything that isn't a usable data leaf clears the directory choice.
    Directory(Option<String>),
    Notes(Option<String>),
    /// Dialog closed; drop everything.
    Clear,
}

impl Selection {
    /// Reduce one event into the next selection value. `directories`
    /// supplies the leaf test for directory activations.
    pub fn apply(&self, event: SelectionEvent, directories: &Tree) -> Selection {
        let mut next = self.clone();

        match event {
            SelectionEvent::Submitter(submitter) => next.submitter = submitter,
            SelectionEvent::Target(target) => next.target = target,
            SelectionEvent::Directory(directory) => {
                next.directory =
                    directory.filter(|id| directory_usable(directories, id));
            }
            SelectionEvent::Notes(notes) => {
                next.notes = notes.filter(|text| !text.is_empty());
            }
            SelectionEvent::Clear => next = Selection::default(),
        }

        next
    }

    /// Pure enabled-state for the create action: all three pickers hold a
    /// value.
    pub fn can_submit(&self) -> bool {
        self.submitter.is_some() && self.target.is_some() && self.directory.is_some()
    }

    /// Check the creation preconditions, naming the first unmet one.
    pub fn validate(&self, directories: &Tree) -> Result<(), ValidationError> {
        if self.submitter.is_none() {
            return Err(ValidationError::NoSubmitter);
        }
        if self.target.is_none() {
            return Err(ValidationError::NoTarget);
        }
        let Some(directory) = &self.directory else {
            return Err(ValidationError::NoDirectory);
        };
        if !directory_usable(directories, directory) {
            return Err(ValidationError::DirectoryTooCoarse);
        }

        Ok(())
    }

    /// Build the creation request, re-checking the preconditions first.
    pub fn build_request(&self, directories: &Tree) -> Result<TaskRequest, ValidationError> {
        self.validate(directories)?;

        let submitter = self.submitter.clone().expect("validated above");
        let target = self.target.clone().expect("validated above");
        let directory = self.directory.clone().expect("validated above");

        let link = LinkRef { url: target.url().to_string() };
        let (assay, study, project) = match target {
            Target::Assay { .. } => (Some(link), None, None),
            Target::Study { .. } => (None, Some(link), None),
            Target::Project { .. } => (None, None, Some(link)),
        };

        Ok(TaskRequest {
            submitter: LinkRef { url: submitter },
            directory: vec![DirRef { name: directory }],
            assay,
            study,
            project,
            notes: self.notes.clone(),
        })
    }
}

/// Whether a directory identifier is a usable ingest source. Identifiers
/// the tree knows must be selectable leaves; identifiers it has never seen
/// fall back to the path-depth rule.
fn directory_usable(directories: &Tree, id: &str) -> bool {
    match directories.contains(id) {
        true => directories.is_selectable(id),
        false => paths::is_ingest_source(id),
    }
}
