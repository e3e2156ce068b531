use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use parking_lot::Mutex;
use planner_shared::{
    AdminUserRow, ErrorResponse, LoginRequest, LoginResponse, LoginUser, RegisterRequest,
    RegisterResponse, SaveTasksRequest, StatusResponse, TaskPayload, TaskRow,
};
use reqwest::{Response, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::mode::PlannerMode;
use crate::task::Task;

pub const DEFAULT_API_URL: &str = "http://localhost:3000/api";

/// Tasks of one user in one planner, loaded and saved as a unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Partition {
    pub user: String,
    pub mode: PlannerMode,
}

impl Partition {
    pub fn new(user: impl Into<String>, mode: PlannerMode) -> Self {
        Self {
            user: user.into(),
            mode,
        }
    }
}

/// Durable mirror of a partition. `save` replaces everything stored for
/// the partition with `tasks`.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn load(&self, partition: &Partition) -> anyhow::Result<Vec<Task>>;
    async fn save(&self, partition: &Partition, tasks: &[Task]) -> anyhow::Result<()>;
}

#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with an error body; `message` is shown verbatim.
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base: Url,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let base = Url::parse(base_url.trim())
            .with_context(|| format!("invalid api url `{base_url}`"))?;
        if base.cannot_be_a_base() {
            return Err(anyhow!("api url cannot carry paths: {base_url}"));
        }
        Ok(Self {
            base,
            http: reqwest::Client::new(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow!("api url cannot carry paths: {}", self.base))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<RegisterResponse, ClientError> {
        let body = RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        let resp = self
            .http
            .post(self.endpoint(&["register"])?)
            .json(&body)
            .send()
            .await?;
        decode(resp).await
    }

    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginUser, ClientError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let resp = self
            .http
            .post(self.endpoint(&["login"])?)
            .json(&body)
            .send()
            .await?;
        let parsed: LoginResponse = decode(resp).await?;
        Ok(parsed.user)
    }

    #[instrument(skip(self))]
    pub async fn fetch_rows(&self, partition: &Partition) -> Result<Vec<TaskRow>, ClientError> {
        let url = self.endpoint(&["tasks", &partition.user, partition.mode.as_key()])?;
        let resp = self.http.get(url).send().await?;
        decode(resp).await
    }

    #[instrument(skip(self, tasks), fields(count = tasks.len()))]
    pub async fn save_tasks(
        &self,
        partition: &Partition,
        tasks: Vec<TaskPayload>,
    ) -> Result<StatusResponse, ClientError> {
        let body = SaveTasksRequest {
            email: Some(partition.user.clone()),
            planner_type: Some(partition.mode.as_key().to_string()),
            tasks: Some(tasks),
        };
        let resp = self
            .http
            .post(self.endpoint(&["tasks", "save"])?)
            .json(&body)
            .send()
            .await?;
        decode(resp).await
    }

    #[instrument(skip(self))]
    pub async fn admin_users(&self) -> Result<Vec<AdminUserRow>, ClientError> {
        let resp = self
            .http
            .get(self.endpoint(&["admin", "users"])?)
            .send()
            .await?;
        decode(resp).await
    }

    #[instrument(skip(self))]
    pub async fn admin_user_tasks(&self, email: &str) -> Result<Vec<TaskRow>, ClientError> {
        let resp = self
            .http
            .get(self.endpoint(&["admin", "tasks", email])?)
            .send()
            .await?;
        decode(resp).await
    }

    #[instrument(skip(self))]
    pub async fn admin_delete_user(&self, email: &str) -> Result<StatusResponse, ClientError> {
        let resp = self
            .http
            .delete(self.endpoint(&["admin", "user", email])?)
            .send()
            .await?;
        decode(resp).await
    }
}

#[async_trait]
impl RemoteStore for ApiClient {
    async fn load(&self, partition: &Partition) -> anyhow::Result<Vec<Task>> {
        let rows = self.fetch_rows(partition).await?;
        debug!(count = rows.len(), "fetched task rows");
        rows.into_iter().map(Task::from_row).collect()
    }

    async fn save(&self, partition: &Partition, tasks: &[Task]) -> anyhow::Result<()> {
        let payloads = tasks.iter().map(Task::to_payload).collect();
        let status = self.save_tasks(partition, payloads).await?;
        if !status.success {
            return Err(anyhow!("server refused save: {}", status.message));
        }
        Ok(())
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json::<T>().await?);
    }

    let message = match resp.json::<ErrorResponse>().await {
        Ok(body) => body.error,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    };
    Err(ClientError::Rejected {
        status: status.as_u16(),
        message,
    })
}

/// Process-local remote store. Partitions are kept as serialized save
/// payloads so loads go through the same wire conversion as the HTTP
/// client.
#[derive(Debug, Default)]
pub struct MemoryRemote {
    partitions: Mutex<HashMap<Partition, String>>,
    fail_loads: AtomicBool,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn seed(&self, partition: &Partition, tasks: &[Task]) -> anyhow::Result<()> {
        let payloads: Vec<TaskPayload> = tasks.iter().map(Task::to_payload).collect();
        let raw = serde_json::to_string(&payloads)?;
        self.partitions.lock().insert(partition.clone(), raw);
        Ok(())
    }

    pub fn stored(&self, partition: &Partition) -> anyhow::Result<Vec<Task>> {
        let raw = self.partitions.lock().get(partition).cloned();
        let Some(raw) = raw else {
            return Ok(vec![]);
        };
        let payloads: Vec<TaskPayload> =
            serde_json::from_str(&raw).context("corrupt in-memory partition")?;
        payloads.into_iter().map(Task::from_payload).collect()
    }

    /// Stores a raw body for a partition, bypassing serialization.
    pub fn seed_raw(&self, partition: &Partition, raw: &str) {
        self.partitions
            .lock()
            .insert(partition.clone(), raw.to_string());
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn load(&self, partition: &Partition) -> anyhow::Result<Vec<Task>> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(anyhow!("remote unavailable"));
        }
        self.stored(partition)
    }

    async fn save(&self, partition: &Partition, tasks: &[Task]) -> anyhow::Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(anyhow!("remote unavailable"));
        }
        self.seed(partition, tasks)?;
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_append_encoded_segments() {
        let client = ApiClient::new("http://localhost:3000/api/").expect("valid url");
        let url = client
            .endpoint(&["tasks", "ana maria@example.com", "study"])
            .expect("endpoint");
        assert_eq!(
            url.as_str(),
            "http://localhost:3000/api/tasks/ana%20maria@example.com/study"
        );
    }

    #[test]
    fn rejects_non_base_urls() {
        assert!(ApiClient::new("mailto:ana@example.com").is_err());
        assert!(ApiClient::new("not a url").is_err());
    }

    #[tokio::test]
    async fn memory_remote_replaces_whole_partition() {
        let remote = MemoryRemote::new();
        let partition = Partition::new("ana@example.com", PlannerMode::Generic);
        let other = Partition::new("ana@example.com", PlannerMode::Study);

        remote
            .save(&partition, &[])
            .await
            .expect("empty save succeeds");
        assert!(remote.load(&partition).await.expect("load").is_empty());
        assert!(remote.load(&other).await.expect("load other").is_empty());
        assert_eq!(remote.save_count(), 1);

        remote.set_fail_saves(true);
        assert!(remote.save(&partition, &[]).await.is_err());
        assert_eq!(remote.save_count(), 1);
    }
}
