//! Invalidation Broadcaster.
//!
//! Owns the three global markers (force-logout timestamp, lockdown flag,
//! maintenance flag) and the process-local bounded-staleness cache every
//! request reads them through. Writes go straight to the store and invalidate
//! the local cache, so the writing instance enforces its own flip
//! immediately; other instances converge within the cache TTL.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::ServiceError;
use crate::models::{AuditAction, AuditEntry, MaintenanceMarker, MarkerState};
use crate::store::ProfileStore;

struct CachedMarkers {
    fetched_at: Instant,
    state: MarkerState,
}

#[derive(Clone)]
pub struct MarkerService {
    store: Arc<dyn ProfileStore>,
    ttl: Duration,
    cache: Arc<RwLock<Option<CachedMarkers>>>,
}

impl MarkerService {
    pub fn new(store: Arc<dyn ProfileStore>, cache_ttl: Duration) -> Self {
        Self {
            store,
            ttl: cache_ttl,
            cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Current marker snapshot, at most `ttl` stale.
    ///
    /// Reads fail open: if the store is unreachable the last cached snapshot
    /// is served regardless of age, and with no cache at all the default
    /// (everything off) state is returned. A transient store outage must not
    /// lock every operator out of the portal.
    pub async fn current(&self) -> MarkerState {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.fetched_at.elapsed() < self.ttl {
                    return cached.state.clone();
                }
            }
        }

        match self.store.read_markers().await {
            Ok(state) => {
                let mut cache = self.cache.write().await;
                *cache = Some(CachedMarkers {
                    fetched_at: Instant::now(),
                    state: state.clone(),
                });
                state
            }
            Err(e) => {
                let cache = self.cache.read().await;
                match cache.as_ref() {
                    Some(cached) => {
                        tracing::warn!(error = %e, "Marker refresh failed, serving stale snapshot");
                        cached.state.clone()
                    }
                    None => {
                        tracing::warn!(error = %e, "Marker read failed with empty cache, failing open");
                        MarkerState::default()
                    }
                }
            }
        }
    }

    /// Drop the cached snapshot so the next read hits the store.
    pub async fn invalidate(&self) {
        let mut cache = self.cache.write().await;
        *cache = None;
    }

    /// Kill every session issued before now. Coarse by design: there is no
    /// per-session registry, only this global watermark.
    pub async fn set_force_logout(&self, actor_id: &str) -> Result<DateTime<Utc>, ServiceError> {
        let since = Utc::now();
        self.store.set_force_logout_since(since).await?;
        self.invalidate().await;

        tracing::warn!(actor = %actor_id, since = %since, "Force-logout broadcast");
        self.append_audit(
            AuditEntry::new(AuditAction::ForceLogout, actor_id, None)
                .with_details(format!("sessions issued before {} invalidated", since)),
        )
        .await;
        Ok(since)
    }

    pub async fn set_lockdown(&self, actor_id: &str, enabled: bool) -> Result<(), ServiceError> {
        self.store.set_lockdown(enabled).await?;
        self.invalidate().await;

        tracing::warn!(actor = %actor_id, enabled, "Lockdown toggled");
        self.append_audit(
            AuditEntry::new(AuditAction::Lockdown, actor_id, None)
                .with_details(if enabled { "enabled" } else { "disabled" }),
        )
        .await;
        Ok(())
    }

    pub async fn set_maintenance(
        &self,
        actor_id: &str,
        marker: MaintenanceMarker,
    ) -> Result<(), ServiceError> {
        self.store.set_maintenance(&marker).await?;
        self.invalidate().await;

        tracing::info!(actor = %actor_id, enabled = marker.enabled, "Maintenance mode toggled");
        self.append_audit(
            AuditEntry::new(AuditAction::Maintenance, actor_id, None)
                .with_details(if marker.enabled { "enabled" } else { "disabled" }),
        )
        .await;
        Ok(())
    }

    /// Audit appends never fail the mutation they describe.
    async fn append_audit(&self, entry: AuditEntry) {
        if let Err(e) = self.store.append_audit(&entry).await {
            tracing::error!(error = %e, action = entry.action.as_str(), "Failed to append audit entry");
        }
    }
}
