//! services/bot/src/adapters/slack_directory.rs
//!
//! Resolves presence display names to Slack member ids for mentions.
//! Implements the `IdentityResolver` port on top of a cached copy of `users.list`.

use async_trait::async_trait;
use attendance_core::{IdentityResolver, PortError, PortResult};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::adapters::slack::api_error;

const PAGE_LIMIT: u32 = 200;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryMember {
    pub id: String,
    /// Normalized profile display name.
    pub display_name: String,
    /// Normalized profile real name.
    pub real_name: String,
}

#[derive(Default)]
struct DirectoryCache {
    members: Vec<DirectoryMember>,
    refreshed_at: Option<Instant>,
}

/// An adapter that implements the `IdentityResolver` port using Slack's member directory.
pub struct SlackDirectory {
    client: reqwest::Client,
    api_base: String,
    token: String,
    /// Keyed by normalized display name.
    overrides: HashMap<String, String>,
    refresh_interval: Duration,
    cache: RwLock<DirectoryCache>,
}

impl SlackDirectory {
    /// Creates a new `SlackDirectory` with an empty cache.
    pub fn new(
        client: reqwest::Client,
        api_base: String,
        token: String,
        overrides: HashMap<String, String>,
        refresh_interval: Duration,
    ) -> Self {
        Self {
            client,
            api_base,
            token,
            overrides: overrides
                .into_iter()
                .map(|(name, id)| (normalize(&name), id))
                .collect(),
            refresh_interval,
            cache: RwLock::new(DirectoryCache::default()),
        }
    }

    async fn refresh(&self) -> PortResult<()> {
        let members = self.fetch_members().await?;
        info!(count = members.len(), "Slack member directory refreshed");
        let mut cache = self.cache.write().await;
        cache.members = members;
        cache.refreshed_at = Some(Instant::now());
        Ok(())
    }

    async fn fetch_members(&self) -> PortResult<Vec<DirectoryMember>> {
        let mut members = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut query = vec![("limit", PAGE_LIMIT.to_string())];
            if let Some(cursor) = &cursor {
                query.push(("cursor", cursor.clone()));
            }

            let page: UsersListResponse = self
                .client
                .get(format!("{}/users.list", self.api_base))
                .bearer_auth(&self.token)
                .query(&query)
                .send()
                .await
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .error_for_status()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .json()
                .await
                .map_err(|e| PortError::Unexpected(e.to_string()))?;

            if !page.ok {
                return Err(api_error(page.error));
            }

            members.extend(
                page.members
                    .into_iter()
                    .filter(|member| !member.deleted)
                    .map(|member| DirectoryMember {
                        id: member.id,
                        display_name: normalize(&member.profile.display_name),
                        real_name: normalize(&member.profile.real_name),
                    }),
            );

            match page.response_metadata.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }

        Ok(members)
    }

    async fn lookup_cached(&self, display_name: &str) -> Option<String> {
        let cache = self.cache.read().await;
        find_member(&cache.members, display_name).map(|member| member.id.clone())
    }

    async fn refresh_due(&self) -> bool {
        let cache = self.cache.read().await;
        match cache.refreshed_at {
            Some(at) => at.elapsed() >= self.refresh_interval,
            None => true,
        }
    }
}

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Deserialize, Debug)]
struct UsersListResponse {
    ok: bool,
    #[serde(default)]
    members: Vec<SlackMember>,
    #[serde(default)]
    response_metadata: ResponseMetadata,
    error: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct ResponseMetadata {
    next_cursor: Option<String>,
}

#[derive(Deserialize, Debug)]
struct SlackMember {
    id: String,
    #[serde(default)]
    deleted: bool,
    #[serde(default)]
    profile: SlackProfile,
}

#[derive(Deserialize, Debug, Default)]
struct SlackProfile {
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    real_name: String,
}

//=========================================================================================
// Name Matching
//=========================================================================================

/// Lower-cases a name and folds full-width spaces and middle dots into plain spaces.
pub fn normalize(name: &str) -> String {
    name.to_lowercase()
        .replace(['\u{3000}', '・'], " ")
        .trim()
        .to_string()
}

/// Finds the first member whose display or real name contains, or is contained in, `name`.
pub fn find_member<'a>(members: &'a [DirectoryMember], name: &str) -> Option<&'a DirectoryMember> {
    let wanted = normalize(name);
    if wanted.is_empty() {
        return None;
    }
    members.iter().find(|member| {
        [&member.display_name, &member.real_name]
            .into_iter()
            .filter(|candidate| !candidate.is_empty())
            .any(|candidate| wanted.contains(candidate.as_str()) || candidate.contains(&wanted))
    })
}

//=========================================================================================
// `IdentityResolver` Trait Implementation
//=========================================================================================

#[async_trait]
impl IdentityResolver for SlackDirectory {
    async fn resolve(&self, display_name: &str) -> PortResult<Option<String>> {
        if let Some(id) = self.overrides.get(&normalize(display_name)) {
            return Ok(Some(id.clone()));
        }

        if let Some(id) = self.lookup_cached(display_name).await {
            return Ok(Some(id));
        }

        if !self.refresh_due().await {
            debug!(display_name, "Directory miss; refresh not yet due");
            return Ok(None);
        }

        self.refresh().await?;
        Ok(self.lookup_cached(display_name).await)
    }

    async fn warm(&self) -> PortResult<()> {
        self.refresh().await
    }
}
