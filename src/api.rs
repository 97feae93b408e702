//! Blocking JSON client for the capture service.
//!
//! One method per REST operation, each returning a single typed `Result`.
//! The service is plain JSON over HTTP; there is nothing clever here
//! beyond keeping every call site on the same error path.

use reqwest::blocking::{Client, Response};
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::ApiError;
use crate::model::{
    Assay, AssayList, Description, DirectoryEntry, DirectoryList, Project, ProjectList, Study,
    StudyList, Task, TaskList, TaskRequest, User, UserList,
};

/// Resolved locations of the service's collections.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub users: Url,
    pub projects: Url,
    pub assays: Url,
    pub studies: Url,
    pub directories: Url,
    pub tasks: Url,
}

impl Endpoints {
    /// Resolve every endpoint from the service description at `base`.
    pub fn discover(client: &Client, base: &Url) -> Result<Self, ApiError> {
        let description: Description = get_json(client, base.clone())?;
        Self::from_description(base, &description)
    }

    /// Resolve the endpoint set from an already-fetched description.
    pub fn from_description(base: &Url, description: &Description) -> Result<Self, ApiError> {
        Ok(Self {
            users: resolve_endpoint(base, "users", &description.users)?,
            projects: resolve_endpoint(base, "projects", &description.projects)?,
            assays: resolve_endpoint(base, "assays", &description.assays)?,
            studies: resolve_endpoint(base, "studies", &description.studies)?,
            directories: resolve_endpoint(base, "directories", &description.directories)?,
            tasks: resolve_endpoint(base, "tasks", &description.tasks)?,
        })
    }
}

/// Join one advertised endpoint against the base the description came from.
fn resolve_endpoint(base: &Url, name: &'static str, uri: &Option<String>) -> Result<Url, ApiError> {
    let uri = uri.as_deref().ok_or(ApiError::MissingEndpoint(name))?;
    Ok(base.join(uri)?)
}

/// Typed wrapper over the service's REST operations.
#[derive(Debug, Clone)]
pub struct Api {
    client: Client,
    endpoints: Endpoints,
}

impl Api {
    /// Wrap an explicitly configured endpoint set.
    pub fn new(endpoints: Endpoints) -> Self {
        Self {
            client: Client::new(),
            endpoints,
        }
    }

    /// Discover the endpoint set from the description resource at `base`.
    pub fn discover(base: &Url) -> Result<Self, ApiError> {
        let client = Client::new();
        let endpoints = Endpoints::discover(&client, base)?;

        Ok(Self { client, endpoints })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn users(&self) -> Result<Vec<User>, ApiError> {
        let list: UserList = get_json(&self.client, self.endpoints.users.clone())?;
        Ok(list.users)
    }

    pub fn projects(&self) -> Result<Vec<Project>, ApiError> {
        let list: ProjectList = get_json(&self.client, self.endpoints.projects.clone())?;
        Ok(list.projects)
    }

    pub fn assays(&self) -> Result<Vec<Assay>, ApiError> {
        let list: AssayList = get_json(&self.client, self.endpoints.assays.clone())?;
        Ok(list.assays)
    }

    pub fn studies(&self) -> Result<Vec<Study>, ApiError> {
        let list: StudyList = get_json(&self.client, self.endpoints.studies.clone())?;
        Ok(list.studies)
    }

    pub fn directories(&self) -> Result<Vec<DirectoryEntry>, ApiError> {
        let list: DirectoryList = get_json(&self.client, self.endpoints.directories.clone())?;
        Ok(list.directories)
    }

    pub fn tasks(&self) -> Result<Vec<Task>, ApiError> {
        let list: TaskList = get_json(&self.client, self.endpoints.tasks.clone())?;
        Ok(list.tasks)
    }

    /// Fetch one task by identifier.
    pub fn task(&self, id: &str) -> Result<Task, ApiError> {
        get_json(&self.client, item_url(&self.endpoints.tasks, id)?)
    }

    /// Create an ingest task; the response is the full task record.
    pub fn create_task(&self, request: &TaskRequest) -> Result<Task, ApiError> {
        let url = self.endpoints.tasks.clone();
        let response = self
            .client
            .post(url.clone())
            .header(ACCEPT, "application/json")
            .json(request)
            .send()?;

        decode(&url, response)
    }

    /// Ask the service to drop a task. The response body, if any, is
    /// discarded.
    pub fn delete_task(&self, id: &str) -> Result<(), ApiError> {
        let url = item_url(&self.endpoints.tasks, id)?;
        let response = self.client.delete(url.clone()).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(url.as_str().into(), status.as_u16()));
        }

        tracing::debug!("deleted task at {url}");
        Ok(())
    }
}

/// Append one path segment to a collection URL.
fn item_url(collection: &Url, segment: &str) -> Result<Url, ApiError> {
    let mut url = collection.clone();
    url.path_segments_mut()
        .map_err(|()| ApiError::Opaque(collection.as_str().into()))?
        .pop_if_empty()
        .push(segment);

    Ok(url)
}

fn get_json<T: DeserializeOwned>(client: &Client, url: Url) -> Result<T, ApiError> {
    let response = client
        .get(url.clone())
        .header(ACCEPT, "application/json")
        .send()?;

    decode(&url, response)
}

fn decode<T: DeserializeOwned>(url: &Url, response: Response) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::Status(url.as_str().into(), status.as_u16()));
    }

    let body = response.text()?;
    serde_json::from_str(&body).map_err(|err| ApiError::Decode(url.as_str().into(), err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_urls_extend_the_collection_path() {
        let tasks = Url::parse("https://capture.example/api/tasks").unwrap();
        let url = item_url(&tasks, "t17").unwrap();
        assert_eq!(url.as_str(), "https://capture.example/api/tasks/t17");

        // A trailing slash must not produce a double separator.
        let slashed = Url::parse("https://capture.example/api/tasks/").unwrap();
        let url = item_url(&slashed, "t17").unwrap();
        assert_eq!(url.as_str(), "https://capture.example/api/tasks/t17");
    }

    #[test]
    fn endpoints_resolve_relative_to_the_description_base() {
        let base = Url::parse("https://capture.example/api/").unwrap();
        let description = Description {
            users: Some("users".to_string()),
            projects: Some("projects".to_string()),
            assays: Some("assays".to_string()),
            studies: Some("studies".to_string()),
            directories: Some("dir".to_string()),
            tasks: Some("https://other.example/tasks".to_string()),
        };

        let endpoints = Endpoints::from_description(&base, &description).unwrap();
        assert_eq!(endpoints.users.as_str(), "https://capture.example/api/users");
        assert_eq!(endpoints.directories.as_str(), "https://capture.example/api/dir");
        // Absolute URIs in the description stand on their own.
        assert_eq!(endpoints.tasks.as_str(), "https://other.example/tasks");
    }

    #[test]
    fn discovery_fails_cleanly_on_a_partial_description() {
        let base = Url::parse("https://capture.example/api/").unwrap();
        let description = Description {
            users: Some("users".to_string()),
            ..Default::default()
        };

        assert!(matches!(
            Endpoints::from_description(&base, &description),
            Err(ApiError::MissingEndpoint("projects"))
        ));
    }
}
