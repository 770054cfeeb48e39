//! Cache Engine
//!
//! Holds the current snapshot of the tracker projection and refreshes it
//! atomically. A snapshot is mutated only by wholesale replacement behind a
//! pointer swap; readers clone the `Arc` once at call entry and never observe
//! a torn state.
//!
//! Refreshes are singleton: a refresh requested while one is in flight joins
//! the in-flight work instead of starting a second fetch. A read past TTL
//! returns the current snapshot immediately and revalidates in the
//! background.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tracing::{info, warn};

use crate::config::GatewayConfig;
use crate::models::{EndpointError, Snapshot, SnapshotMeta};
use crate::services::tracker::{IssueQuery, TrackerClient, TrackerError};
use crate::utils::error::{AppError, AppResult};

/// Row counts per snapshot table.
#[derive(Debug, Clone, Serialize)]
pub struct TableCounts {
    pub issues: usize,
    pub projects: usize,
    pub users: usize,
    pub versions: usize,
}

/// Refresh bookkeeping carried in status output.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RefreshStats {
    pub total_refreshes: u64,
    pub last_refresh_duration_ms: u64,
}

/// Wire shape of `status()`, embedded as `cache_info` in the control
/// endpoint's response.
#[derive(Debug, Clone, Serialize)]
pub struct CacheInfo {
    pub enabled: bool,
    pub initialized: bool,
    pub last_updated: Option<String>,
    pub age_seconds: Option<i64>,
    pub is_stale: bool,
    pub ttl_seconds: u64,
    pub issues_truncated: bool,
    pub counts: TableCounts,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub endpoint_errors: Vec<EndpointError>,
    pub stats: RefreshStats,
}

pub struct CacheEngine {
    config: Arc<GatewayConfig>,
    tracker: Arc<TrackerClient>,
    enabled: AtomicBool,
    snapshot: RwLock<Option<Arc<Snapshot>>>,
    /// `None` when idle; a receiver to join while a refresh is in flight.
    inflight: AsyncMutex<Option<watch::Receiver<bool>>>,
    stats: Mutex<RefreshStats>,
}

impl CacheEngine {
    pub fn new(config: Arc<GatewayConfig>, tracker: Arc<TrackerClient>) -> Self {
        Self {
            config,
            tracker,
            enabled: AtomicBool::new(false),
            snapshot: RwLock::new(None),
            inflight: AsyncMutex::new(None),
            stats: Mutex::new(RefreshStats::default()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn is_initialized(&self) -> bool {
        self.snapshot.read().expect("snapshot lock").is_some()
    }

    /// Enable the cache and ensure a snapshot exists. Idempotent: enabling an
    /// already-initialized cache is a no-op beyond the status report.
    pub async fn enable(self: &Arc<Self>) -> AppResult<CacheInfo> {
        self.enabled.store(true, Ordering::SeqCst);
        if !self.is_initialized() {
            self.refresh().await?;
        }
        Ok(self.status())
    }

    /// Drop the snapshot and clear the enabled flag.
    pub fn disable(&self) -> CacheInfo {
        self.enabled.store(false, Ordering::SeqCst);
        *self.snapshot.write().expect("snapshot lock") = None;
        self.status()
    }

    /// Build a new snapshot and swap it in. Joins an in-flight refresh when
    /// one exists. A failed refresh leaves the previous snapshot intact and
    /// returns the error.
    pub async fn refresh(self: &Arc<Self>) -> AppResult<CacheInfo> {
        if !self.is_enabled() {
            return Err(AppError::cache_unavailable(
                "cache is disabled; enable it first with action 'on'",
            ));
        }

        // Join a refresh already in flight instead of starting another.
        let tx = {
            let mut guard = self.inflight.lock().await;
            if let Some(rx) = guard.as_ref() {
                let mut rx = rx.clone();
                drop(guard);
                let _ = rx.changed().await;
                return if self.is_initialized() {
                    Ok(self.status())
                } else {
                    Err(AppError::cache_unavailable(
                        "refresh did not produce a snapshot",
                    ))
                };
            }
            let (tx, rx) = watch::channel(false);
            *guard = Some(rx);
            tx
        };

        let started = Instant::now();
        let result = self.build_snapshot().await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let outcome = match result {
            Ok(mut snapshot) => {
                snapshot.meta.refresh_duration_ms = duration_ms;
                // A disable that raced the refresh wins: do not resurrect.
                if self.is_enabled() {
                    info!(
                        issues = snapshot.issues.len(),
                        projects = snapshot.projects.len(),
                        versions = snapshot.versions.len(),
                        users = snapshot.users.len(),
                        duration_ms,
                        "cache refresh complete"
                    );
                    *self.snapshot.write().expect("snapshot lock") = Some(Arc::new(snapshot));
                }
                {
                    let mut stats = self.stats.lock().expect("stats lock");
                    stats.total_refreshes += 1;
                    stats.last_refresh_duration_ms = duration_ms;
                }
                Ok(self.status())
            }
            Err(err) => {
                warn!(error = %err, "cache refresh failed; keeping previous snapshot");
                Err(AppError::from(err))
            }
        };

        let mut guard = self.inflight.lock().await;
        *guard = None;
        let _ = tx.send(true);
        outcome
    }

    /// Current snapshot for an aggregation call. Past TTL the current value
    /// is still returned and a background refresh is kicked off
    /// (stale-while-revalidate). Errors when disabled or never initialized.
    pub fn read(self: &Arc<Self>) -> AppResult<Arc<Snapshot>> {
        if !self.is_enabled() {
            return Err(AppError::cache_unavailable(
                "cache is disabled; enable it first with action 'on'",
            ));
        }
        let snapshot = self
            .snapshot
            .read()
            .expect("snapshot lock")
            .clone()
            .ok_or_else(|| AppError::cache_unavailable("cache has no snapshot yet"))?;

        if snapshot.is_stale(Utc::now()) {
            let engine = Arc::clone(self);
            tokio::spawn(async move {
                if let Err(err) = engine.refresh().await {
                    warn!(error = %err, "background revalidation failed");
                }
            });
        }
        Ok(snapshot)
    }

    /// Current snapshot without freshness side effects.
    pub fn peek(&self) -> Option<Arc<Snapshot>> {
        self.snapshot.read().expect("snapshot lock").clone()
    }

    pub fn status(&self) -> CacheInfo {
        let snapshot = self.peek();
        let now = Utc::now();
        let (counts, meta) = match snapshot.as_deref() {
            Some(s) => (
                TableCounts {
                    issues: s.issues.len(),
                    projects: s.projects.len(),
                    users: s.users.len(),
                    versions: s.versions.len(),
                },
                Some(&s.meta),
            ),
            None => (
                TableCounts {
                    issues: 0,
                    projects: 0,
                    users: 0,
                    versions: 0,
                },
                None,
            ),
        };

        CacheInfo {
            enabled: self.is_enabled(),
            initialized: snapshot.is_some(),
            last_updated: meta.map(|m| m.last_updated.to_rfc3339()),
            age_seconds: snapshot.as_deref().map(|s| s.age_seconds(now)),
            is_stale: snapshot.as_deref().map_or(true, |s| s.is_stale(now)),
            ttl_seconds: self.config.cache_ttl_seconds,
            issues_truncated: meta.map_or(false, |m| m.issues_truncated),
            counts,
            endpoint_errors: meta.map(|m| m.endpoint_errors.clone()).unwrap_or_default(),
            stats: self.stats.lock().expect("stats lock").clone(),
        }
    }

    /// Fetch all four tables. The issues table is required; projects,
    /// versions, and users degrade to empty tables with endpoint markers so a
    /// 403 on `/users.json` never fails cache initialization.
    async fn build_snapshot(&self) -> Result<Snapshot, TrackerError> {
        let mut endpoint_errors = Vec::new();

        let (issues, issues_truncated) = self
            .tracker
            .list_issues(
                &IssueQuery::new().status("*"),
                self.config.cache_max_issues,
            )
            .await?;

        let projects = match self.tracker.list_projects().await {
            Ok(projects) => projects,
            Err(err) => {
                record_endpoint_error(&mut endpoint_errors, "projects", &err);
                Vec::new()
            }
        };

        let mut versions = Vec::new();
        for project in &projects {
            match self.tracker.list_versions(project.id).await {
                Ok(mut project_versions) => versions.append(&mut project_versions),
                Err(err) => record_endpoint_error(&mut endpoint_errors, "versions", &err),
            }
        }

        let users = match self.tracker.list_users().await {
            Ok(users) => users,
            Err(err) => {
                record_endpoint_error(&mut endpoint_errors, "users", &err);
                Vec::new()
            }
        };

        Ok(Snapshot {
            issues,
            projects,
            versions,
            users,
            meta: SnapshotMeta {
                last_updated: Utc::now(),
                ttl_seconds: self.config.cache_ttl_seconds,
                issues_truncated,
                endpoint_errors,
                refresh_duration_ms: 0,
            },
        })
    }
}

fn record_endpoint_error(errors: &mut Vec<EndpointError>, endpoint: &str, err: &TrackerError) {
    let status = match err {
        TrackerError::Unauthorized => 401,
        TrackerError::Forbidden(_) => 403,
        TrackerError::NotFound(_) => 404,
        TrackerError::RateLimited { .. } => 429,
        TrackerError::Unreachable(_) => 503,
        TrackerError::Malformed(_) => 502,
    };
    // One marker per endpoint is enough for status output.
    if !errors.iter().any(|e| e.endpoint == endpoint) {
        warn!(endpoint, status, "endpoint unavailable during refresh");
        errors.push(EndpointError {
            endpoint: endpoint.to_string(),
            status,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Arc<CacheEngine> {
        let config = Arc::new(GatewayConfig::for_tests("http://127.0.0.1:1"));
        let tracker = Arc::new(TrackerClient::new(&config));
        Arc::new(CacheEngine::new(config, tracker))
    }

    #[tokio::test]
    async fn test_disabled_cache_rejects_reads() {
        let engine = engine();
        let err = engine.read().unwrap_err();
        assert_eq!(err.kind(), "cache_unavailable");
    }

    #[tokio::test]
    async fn test_refresh_requires_enabled() {
        let engine = engine();
        let err = engine.refresh().await.unwrap_err();
        assert_eq!(err.kind(), "cache_unavailable");
    }

    #[tokio::test]
    async fn test_enable_against_unreachable_tracker_stays_uninitialized() {
        // Port 1 refuses connections, so the initial refresh fails; the cache
        // must end up enabled but not initialized.
        let engine = engine();
        let result = engine.enable().await;
        assert!(result.is_err());
        assert!(engine.is_enabled());
        assert!(!engine.is_initialized());
        let err = engine.read().unwrap_err();
        assert_eq!(err.kind(), "cache_unavailable");
    }

    #[tokio::test]
    async fn test_disable_clears_snapshot_and_flag() {
        let engine = engine();
        engine.enabled.store(true, Ordering::SeqCst);
        let info = engine.disable();
        assert!(!info.enabled);
        assert!(!info.initialized);
        assert!(!engine.is_enabled());
    }

    #[test]
    fn test_status_on_empty_engine() {
        let engine = engine();
        let info = engine.status();
        assert!(!info.enabled);
        assert!(!info.initialized);
        assert!(info.last_updated.is_none());
        assert!(info.age_seconds.is_none());
        assert!(info.is_stale);
        assert_eq!(info.counts.issues, 0);
        assert_eq!(info.stats.total_refreshes, 0);
    }

    #[test]
    fn test_endpoint_error_dedup() {
        let mut errors = Vec::new();
        let err = TrackerError::Forbidden("/users.json".into());
        record_endpoint_error(&mut errors, "users", &err);
        record_endpoint_error(&mut errors, "users", &err);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].status, 403);
    }
}
