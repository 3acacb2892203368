//! Tiered repository discovery.
//!
//! Three tiers tried in fixed order — new, trending, popular — stopping at
//! the first whose post-dedup result is non-empty. A search failure at any
//! tier is logged and treated as an empty tier; all three empty is a normal
//! outcome, not an error.

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use github_client::{Repo, SortKey, SortOrder, MAX_PER_PAGE};

use crate::ledger::PostedLedger;
use crate::traits::RepoSearcher;

/// The fixed keyword set driving every broadcast run. Declared order is the
/// posting order.
pub const KEYWORDS: &[&str] = &["AI", "LLM", "agent", "rust", "self-hosted"];

/// Minimum star floor for the new tier, regardless of the configured threshold.
const NEW_TIER_STAR_FLOOR: u32 = 10;

/// Recency window for the new tier.
const NEW_TIER_DAYS: i64 = 7;

/// Recency window for the trending tier.
const TRENDING_TIER_DAYS: i64 = 30;

/// One search-provider call, derived per tier per keyword. Never persisted.
#[derive(Debug, Clone)]
pub struct DiscoveryQuery {
    pub query: String,
    pub sort: SortKey,
    pub order: SortOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Created within the last 7 days, low star floor.
    New,
    /// Pushed within the last 30 days, full star threshold.
    Trending,
    /// No recency filter, full star threshold, most-starred first.
    Popular,
}

impl Tier {
    /// Fallthrough order.
    pub const ORDER: [Tier; 3] = [Tier::New, Tier::Trending, Tier::Popular];

    pub fn label(&self) -> &'static str {
        match self {
            Tier::New => "new",
            Tier::Trending => "trending",
            Tier::Popular => "popular",
        }
    }

    /// Build the provider query for this tier.
    pub fn query(&self, keyword: &str, star_threshold: u32, now: DateTime<Utc>) -> DiscoveryQuery {
        match self {
            Tier::New => {
                let cutoff = (now - Duration::days(NEW_TIER_DAYS)).format("%Y-%m-%d");
                let floor = NEW_TIER_STAR_FLOOR.max(star_threshold / 10);
                DiscoveryQuery {
                    query: format!("{keyword} created:>{cutoff} stars:>={floor}"),
                    sort: SortKey::BestMatch,
                    order: SortOrder::Desc,
                }
            }
            Tier::Trending => {
                let cutoff = (now - Duration::days(TRENDING_TIER_DAYS)).format("%Y-%m-%d");
                DiscoveryQuery {
                    query: format!("{keyword} pushed:>{cutoff} stars:>={star_threshold}"),
                    sort: SortKey::Updated,
                    order: SortOrder::Desc,
                }
            }
            Tier::Popular => DiscoveryQuery {
                query: format!("{keyword} stars:>={star_threshold}"),
                sort: SortKey::Stars,
                order: SortOrder::Desc,
            },
        }
    }
}

/// Discover repos for one keyword: first tier whose post-dedup result is
/// non-empty wins. Later tiers are never queried once a tier yields.
pub async fn discover(
    searcher: &dyn RepoSearcher,
    ledger: &PostedLedger,
    keyword: &str,
    star_threshold: u32,
    results_per_keyword: u32,
) -> Vec<Repo> {
    let per_page = results_per_keyword.min(MAX_PER_PAGE);
    let now = Utc::now();

    for tier in Tier::ORDER {
        let q = tier.query(keyword, star_threshold, now);
        let results = match searcher.search(&q.query, q.sort, q.order, per_page).await {
            Ok(repos) => repos,
            Err(e) => {
                warn!(keyword, tier = tier.label(), error = %e, "Search failed, treating tier as empty");
                Vec::new()
            }
        };

        let fresh = ledger.filter_unposted(&results);
        if !fresh.is_empty() {
            info!(
                keyword,
                tier = tier.label(),
                found = results.len(),
                unposted = fresh.len(),
                "Discovery tier yielded"
            );
            return fresh;
        }
    }

    info!(keyword, "All discovery tiers empty or already posted");
    Vec::new()
}
