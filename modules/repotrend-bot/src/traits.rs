// Trait abstractions for the two external collaborators.
//
// RepoSearcher wraps the search provider — one method, the raw search call.
// ChatTransport wraps the chat gateway — send a message, list joined groups.
//
// These enable deterministic testing with MockSearcher and MockTransport:
// no network, no gateway session. `cargo test` in seconds.

use anyhow::Result;
use async_trait::async_trait;

use github_client::{GithubClient, Repo, SortKey, SortOrder};
use waha_client::WahaClient;

// ---------------------------------------------------------------------------
// RepoSearcher — replaces GithubClient
// ---------------------------------------------------------------------------

#[async_trait]
pub trait RepoSearcher: Send + Sync {
    /// Run one repository search with qualifier syntax.
    async fn search(
        &self,
        query: &str,
        sort: SortKey,
        order: SortOrder,
        per_page: u32,
    ) -> Result<Vec<Repo>>;
}

#[async_trait]
impl RepoSearcher for GithubClient {
    async fn search(
        &self,
        query: &str,
        sort: SortKey,
        order: SortOrder,
        per_page: u32,
    ) -> Result<Vec<Repo>> {
        Ok(self
            .search_repositories(query, sort, order, per_page)
            .await?)
    }
}

// ---------------------------------------------------------------------------
// ChatTransport — replaces WahaClient
// ---------------------------------------------------------------------------

/// A group chat as seen by the pipeline, independent of the gateway's wire shape.
#[derive(Debug, Clone)]
pub struct GroupInfo {
    pub id: String,
    pub name: Option<String>,
    pub participant_count: usize,
    pub description: Option<String>,
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Deliver one text message to a chat. Best-effort; the caller decides
    /// what a failure means.
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<()>;

    /// List the groups the chat identity currently participates in.
    async fn list_groups(&self) -> Result<Vec<GroupInfo>>;
}

#[async_trait]
impl ChatTransport for WahaClient {
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<()> {
        Ok(self.send_text(chat_id, text).await?)
    }

    async fn list_groups(&self) -> Result<Vec<GroupInfo>> {
        let groups = self.groups().await?;
        Ok(groups
            .into_iter()
            .map(|g| GroupInfo {
                id: g.id.serialized,
                name: g.name,
                participant_count: g.participants.len(),
                description: g.description,
            })
            .collect())
    }
}
