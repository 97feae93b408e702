//! Wire-format records exchanged with the capture service.
//!
//! Every collection endpoint wraps its items in an object with a single
//! field whose value may be an array, a bare object, or absent entirely.
//! The [`one_or_many`] deserializer restores the uniform list shape before
//! anything iterates, so the rest of the crate never sees the raw form.

use serde::{Deserialize, Serialize};

/// Deserialize a field that may be absent, a single object, or an array of
/// objects. Absent means empty; a bare object means a one-element list.
pub(crate) mod one_or_many {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        Many(Vec<T>),
        One(T),
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Ok(match Option::<OneOrMany<T>>::deserialize(deserializer)? {
            None => Vec::new(),
            Some(OneOrMany::One(item)) => vec![item],
            Some(OneOrMany::Many(items)) => items,
        })
    }
}

/// Deserialize an identifier that the service may serialize as either a
/// JSON string or a bare number.
pub(crate) mod lax_id {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(text) => text,
            Raw::Number(number) => number.to_string(),
        })
    }
}

/// A person who may submit archiving work.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: Option<i64>,
    pub url: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Project {
    pub id: Option<i64>,
    pub url: Option<String>,
    pub name: Option<String>,
}

/// A study, carrying whatever ancestors the service knows about. Any of
/// the ancestor fields may be absent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Study {
    pub id: Option<i64>,
    pub url: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "project-url")]
    pub project_url: Option<String>,
    #[serde(rename = "project-name")]
    pub project_name: Option<String>,
    #[serde(rename = "investigation-url")]
    pub investigation_url: Option<String>,
    #[serde(rename = "investigation-name")]
    pub investigation_name: Option<String>,
}

/// An assay, carrying whatever ancestors the service knows about. Any of
/// the ancestor fields may be absent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Assay {
    pub id: Option<i64>,
    pub url: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "project-url")]
    pub project_url: Option<String>,
    #[serde(rename = "project-name")]
    pub project_name: Option<String>,
    #[serde(rename = "investigation-url")]
    pub investigation_url: Option<String>,
    #[serde(rename = "investigation-name")]
    pub investigation_name: Option<String>,
    #[serde(rename = "study-url")]
    pub study_url: Option<String>,
    #[serde(rename = "study-name")]
    pub study_name: Option<String>,
}

/// One entry of the source-directory listing. `name` is the slash-delimited
/// path; `id` and `@id` are opaque identifiers minted by the service.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DirectoryEntry {
    pub id: Option<String>,
    #[serde(rename = "@id")]
    pub at_id: Option<String>,
    pub name: String,
    #[serde(rename = "modification-time")]
    pub modified: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub uri: Option<String>,
}

impl DirectoryEntry {
    /// The identifier used for picker options: `@id` when present, plain
    /// `id` otherwise, the path itself as a last resort.
    pub fn option_id(&self) -> &str {
        self.at_id
            .as_deref()
            .or(self.id.as_deref())
            .unwrap_or(&self.name)
    }
}

/// One ingest task as reported by the service. Progress is a fraction in
/// `[0, 1]`; `None` means the task has not started yet. Timestamps stay in
/// their ISO-8601 wire form and are only interpreted at display time.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Task {
    #[serde(deserialize_with = "lax_id::deserialize")]
    pub id: String,
    pub url: Option<String>,
    pub status: Option<String>,
    pub progress: Option<f64>,
    #[serde(rename = "start-time")]
    pub start_time: Option<String>,
    #[serde(rename = "end-time")]
    pub end_time: Option<String>,
    pub submitter: Option<User>,
    pub assay: Option<Assay>,
    pub study: Option<Study>,
    pub project: Option<Project>,
    #[serde(with = "one_or_many")]
    pub directory: Vec<DirectoryEntry>,
    #[serde(rename = "created-asset")]
    pub created_asset: Option<String>,
    #[serde(rename = "created-openbis-experiment")]
    pub created_experiment: Option<String>,
    pub notes: Option<String>,
}

impl Task {
    /// The named thing this task archives into. Assay takes precedence over
    /// study, study over project, matching the alternatives accepted by the
    /// creation request.
    pub fn target(&self) -> Option<(Option<&str>, Option<&str>)> {
        if let Some(assay) = &self.assay {
            return Some((assay.url.as_deref(), assay.name.as_deref()));
        }
        if let Some(study) = &self.study {
            return Some((study.url.as_deref(), study.name.as_deref()));
        }
        if let Some(project) = &self.project {
            return Some((project.url.as_deref(), project.name.as_deref()));
        }
        None
    }
}

/// The service description served at the API root, listing where each
/// collection lives. Older deployments omit some of the fields.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Description {
    pub users: Option<String>,
    pub projects: Option<String>,
    pub assays: Option<String>,
    pub studies: Option<String>,
    pub directories: Option<String>,
    pub tasks: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserList {
    #[serde(default, with = "one_or_many", rename = "user")]
    pub users: Vec<User>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProjectList {
    #[serde(default, with = "one_or_many", rename = "project")]
    pub projects: Vec<Project>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StudyList {
    #[serde(default, with = "one_or_many", rename = "study")]
    pub studies: Vec<Study>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AssayList {
    #[serde(default, with = "one_or_many", rename = "assay")]
    pub assays: Vec<Assay>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DirectoryList {
    #[serde(default, with = "one_or_many", rename = "directory")]
    pub directories: Vec<DirectoryEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TaskList {
    #[serde(default, with = "one_or_many", rename = "task")]
    pub tasks: Vec<Task>,
}

/// Reference to a linkable resource in a creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkRef {
    pub url: String,
}

/// Reference to a source directory in a creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirRef {
    pub name: String,
}

/// Body of `POST tasks`. Exactly one of `assay`, `study`, `project` is
/// expected to be set; absent alternatives are left out of the JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskRequest {
    pub submitter: LinkRef,
    pub directory: Vec<DirRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assay: Option<LinkRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub study: Option<LinkRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<LinkRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}
