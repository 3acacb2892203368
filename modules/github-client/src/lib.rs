pub mod error;
pub mod types;

pub use error::{GithubError, Result};
pub use types::{Repo, SearchResponse, SortKey, SortOrder};

const BASE_URL: &str = "https://api.github.com";

/// Search results per page accepted by the API; requests above this are capped.
pub const MAX_PER_PAGE: u32 = 100;

const USER_AGENT: &str = concat!("repotrend/", env!("CARGO_PKG_VERSION"));

pub struct GithubClient {
    client: reqwest::Client,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
        }
    }

    /// Run a repository search. `query` uses GitHub's search qualifier syntax
    /// (e.g. `rust stars:>=100 pushed:>2024-01-01`).
    pub async fn search_repositories(
        &self,
        query: &str,
        sort: SortKey,
        order: SortOrder,
        per_page: u32,
    ) -> Result<Vec<Repo>> {
        let per_page = per_page.min(MAX_PER_PAGE);
        let url = format!("{}/search/repositories", BASE_URL);

        let mut req = self
            .client
            .get(&url)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/vnd.github+json")
            .query(&[("q", query)])
            .query(&[("order", order.as_query_param())])
            .query(&[("per_page", per_page.to_string())]);

        if let Some(sort) = sort.as_query_param() {
            req = req.query(&[("sort", sort)]);
        }
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        tracing::debug!(query, per_page, "GitHub repository search");
        let resp = req.send().await?;

        let status = resp.status();
        if status.as_u16() == 403 || status.as_u16() == 429 {
            let retry_after_secs = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(GithubError::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GithubError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let search: SearchResponse = resp.json().await?;
        tracing::debug!(
            total = search.total_count,
            returned = search.items.len(),
            incomplete = search.incomplete_results,
            "GitHub search complete"
        );
        Ok(search.items)
    }
}
