//! crates/share_link_core/src/domain.rs
//!
//! Defines the pure, core data structures for share-link management.
//! These structs are independent of any wire or serialization format.

use chrono::{DateTime, Utc};

/// A single share-creation call against the backend.
/// Built fresh per call and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareCreateRequest {
    pub source_item_id: String,
    pub requesting_user_id: String,
    pub expires_in_minutes: u32,
    pub password: Option<String>,
    pub max_total_plays: Option<u32>,
    pub max_concurrent_viewers: Option<u32>,
}

/// What the backend hands back after creating a share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedShare {
    pub share_id: String,
    pub public_url: String,
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// A share as listed by the backend. Consumed read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareRecord {
    pub share_id: String,
    pub public_token: String,
    pub title: String,
    pub item_type: String,
    pub total_plays: u64,
    pub current_concurrent_viewers: u64,
    pub max_total_plays: Option<u64>,
    pub max_concurrent_viewers: Option<u64>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub has_password: bool,
}

impl ShareRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// The public link viewers open, e.g. `https://share.example/s/abc123`.
    pub fn public_url(&self, backend_base_url: &str) -> String {
        public_url_for(backend_base_url, &self.public_token)
    }
}

/// Joins a backend base URL and a public token into a viewer link.
pub fn public_url_for(backend_base_url: &str, token: &str) -> String {
    format!("{}/s/{}", backend_base_url.trim_end_matches('/'), token)
}

/// The backend's list response: one page of shares plus the overall count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareListing {
    pub shares: Vec<ShareRecord>,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyViews {
    pub date: String,
    pub views: u64,
}

/// Viewing statistics for one share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareAnalytics {
    pub total_views: u64,
    pub unique_viewers: u64,
    pub avg_watch_time_seconds: u64,
    pub views_by_day: Vec<DailyViews>,
}

/// An entry in the media catalog (a movie, an episode, a season...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogItem {
    pub id: String,
    pub name: String,
    pub item_type: String,
    /// Natural sequence position, e.g. the episode number within a season.
    pub index_number: Option<i32>,
}

/// The per-child outcome of a batch creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItemResult {
    pub item_id: String,
    pub item_name: String,
    pub index_number: Option<i32>,
    pub success: bool,
    pub public_url: Option<String>,
    pub token: Option<String>,
    pub error: Option<String>,
}

impl BatchItemResult {
    pub fn succeeded(item: &CatalogItem, share: CreatedShare) -> Self {
        Self {
            item_id: item.id.clone(),
            item_name: item.name.clone(),
            index_number: item.index_number,
            success: true,
            public_url: Some(share.public_url),
            token: Some(share.token),
            error: None,
        }
    }

    pub fn failed(item: &CatalogItem, error: impl Into<String>) -> Self {
        Self {
            item_id: item.id.clone(),
            item_name: item.name.clone(),
            index_number: item.index_number,
            success: false,
            public_url: None,
            token: None,
            error: Some(error.into()),
        }
    }
}

/// Aggregated outcome of one batch call.
/// `success_count + fail_count == results.len()` always holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub results: Vec<BatchItemResult>,
    pub success_count: usize,
    pub fail_count: usize,
}

impl BatchReport {
    pub fn from_results(results: Vec<BatchItemResult>) -> Self {
        let success_count = results.iter().filter(|r| r.success).count();
        let fail_count = results.len() - success_count;
        Self {
            results,
            success_count,
            fail_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(expires_in: Duration, revoked: bool) -> ShareRecord {
        let now = Utc::now();
        ShareRecord {
            share_id: "s1".to_string(),
            public_token: "tok".to_string(),
            title: "Pilot".to_string(),
            item_type: "Episode".to_string(),
            total_plays: 0,
            current_concurrent_viewers: 0,
            max_total_plays: None,
            max_concurrent_viewers: None,
            expires_at: now + expires_in,
            created_at: now,
            revoked_at: revoked.then_some(now),
            has_password: false,
        }
    }

    #[test]
    fn revoked_share_is_inactive_even_before_expiry() {
        let share = record(Duration::hours(1), true);
        let now = Utc::now();
        assert!(!share.is_expired(now));
        assert!(share.is_revoked());
    }

    #[test]
    fn expired_share_is_flagged() {
        let share = record(Duration::hours(-1), false);
        assert!(share.is_expired(Utc::now()));
        assert!(!share.is_revoked());
    }

    #[test]
    fn public_url_trims_trailing_slash() {
        let share = record(Duration::hours(1), false);
        assert_eq!(share.public_url("https://share.example/"), "https://share.example/s/tok");
        assert_eq!(share.public_url("https://share.example"), "https://share.example/s/tok");
    }

    #[test]
    fn report_counts_partition_results() {
        let item = CatalogItem {
            id: "a".to_string(),
            name: "A".to_string(),
            item_type: "Episode".to_string(),
            index_number: Some(1),
        };
        let created = CreatedShare {
            share_id: "s".to_string(),
            public_url: "u".to_string(),
            token: "t".to_string(),
            expires_at: None,
        };
        let report = BatchReport::from_results(vec![
            BatchItemResult::succeeded(&item, created),
            BatchItemResult::failed(&item, "boom"),
            BatchItemResult::failed(&item, "boom"),
        ]);
        assert_eq!(report.success_count, 1);
        assert_eq!(report.fail_count, 2);
        assert_eq!(report.success_count + report.fail_count, report.results.len());
    }
}
