//! crates/share_link_core/src/policy.rs
//!
//! Merges per-request overrides with the process-wide defaults into the one
//! policy a share is created with.

use crate::domain::ShareCreateRequest;

/// Process-wide defaults, fixed at startup.
/// A cap of `0` means "unlimited".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShareDefaults {
    pub expiry_minutes: u32,
    pub max_total_plays: u32,
    pub max_concurrent_viewers: u32,
}

impl Default for ShareDefaults {
    fn default() -> Self {
        Self {
            expiry_minutes: 24 * 60,
            max_total_plays: 0,
            max_concurrent_viewers: 0,
        }
    }
}

/// What a caller asked for. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyOverrides {
    pub expires_in_minutes: Option<i64>,
    pub password: Option<String>,
    pub max_total_plays: Option<u32>,
    pub max_concurrent_viewers: Option<u32>,
}

/// The fully-resolved limits for one share. `None` caps mean unlimited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectivePolicy {
    pub expires_in_minutes: u32,
    pub password: Option<String>,
    pub max_total_plays: Option<u32>,
    pub max_concurrent_viewers: Option<u32>,
}

impl EffectivePolicy {
    /// Builds the backend request for sharing `item_id` under this policy.
    pub fn to_request(&self, item_id: &str, user_id: &str) -> ShareCreateRequest {
        ShareCreateRequest {
            source_item_id: item_id.to_string(),
            requesting_user_id: user_id.to_string(),
            expires_in_minutes: self.expires_in_minutes,
            password: self.password.clone(),
            max_total_plays: self.max_total_plays,
            max_concurrent_viewers: self.max_concurrent_viewers,
        }
    }
}

/// Resolves each field independently. Total over any input.
pub fn resolve(overrides: &PolicyOverrides, defaults: &ShareDefaults) -> EffectivePolicy {
    let expires_in_minutes = overrides
        .expires_in_minutes
        .filter(|minutes| *minutes > 0)
        .map(|minutes| u32::try_from(minutes).unwrap_or(u32::MAX))
        .unwrap_or(defaults.expiry_minutes);

    EffectivePolicy {
        expires_in_minutes,
        password: overrides.password.clone(),
        max_total_plays: overrides
            .max_total_plays
            .or_else(|| limited(defaults.max_total_plays)),
        max_concurrent_viewers: overrides
            .max_concurrent_viewers
            .or_else(|| limited(defaults.max_concurrent_viewers)),
    }
}

/// A configured cap of zero resolves to "no cap", never to a literal 0.
fn limited(configured: u32) -> Option<u32> {
    (configured > 0).then_some(configured)
}
