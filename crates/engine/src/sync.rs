use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use ruleengine_common::{Prom, PromRules};
use serde::Serialize;

use crate::client::{ApiClient, ClientError};
use crate::config::EngineConfig;
use crate::reload::{ReloadError, Reloader};
use crate::writer::{RuleFileWriter, WriteError, WriteOutcome};

#[derive(Debug)]
pub enum SyncError {
    Client(ClientError),
    Write(WriteError),
    Reload(ReloadError),
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Client(e) => write!(f, "client: {e}"),
            Self::Write(e) => write!(f, "write: {e}"),
            Self::Reload(e) => write!(f, "reload: {e}"),
        }
    }
}

impl std::error::Error for SyncError {}

impl From<ClientError> for SyncError {
    fn from(e: ClientError) -> Self {
        Self::Client(e)
    }
}

impl From<WriteError> for SyncError {
    fn from(e: WriteError) -> Self {
        Self::Write(e)
    }
}

impl From<ReloadError> for SyncError {
    fn from(e: ReloadError) -> Self {
        Self::Reload(e)
    }
}

/// What one sync cycle did, by instance id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub written: Vec<i64>,
    pub unchanged: Vec<i64>,
    /// Instances that own rules but are unknown to the API.
    pub skipped: Vec<i64>,
    pub removed: Vec<i64>,
    pub reloaded: Vec<i64>,
    pub reload_failed: Vec<i64>,
}

impl SyncReport {
    pub fn changed(&self) -> bool {
        !self.written.is_empty() || !self.removed.is_empty()
    }
}

pub struct Syncer {
    client: ApiClient,
    writer: RuleFileWriter,
    reloader: Option<Reloader>,
    prom_ids: Option<Vec<i64>>,
    interval: Duration,
    /// Instances whose last reload failed; retried even if their file is
    /// unchanged.
    pending_reload: Mutex<BTreeSet<i64>>,
}

impl Syncer {
    pub fn from_config(cfg: &EngineConfig) -> Result<Self, SyncError> {
        let timeout = Duration::from_secs(cfg.request_timeout_seconds);
        let reloader = if cfg.reload {
            Some(Reloader::new(timeout)?)
        } else {
            None
        };
        Ok(Self {
            client: ApiClient::new(&cfg.server, timeout)?,
            writer: RuleFileWriter::new(&cfg.rules_dir, cfg.file_suffix.as_str()),
            reloader,
            prom_ids: cfg.prom_ids.clone(),
            interval: Duration::from_secs(cfg.interval_seconds),
            pending_reload: Mutex::new(BTreeSet::new()),
        })
    }

    fn in_scope(&self, prom_id: i64) -> bool {
        self.prom_ids
            .as_ref()
            .map_or(true, |ids| ids.contains(&prom_id))
    }

    pub async fn run_once(&self) -> Result<SyncReport, SyncError> {
        let proms = self.client.fetch_proms().await?;
        let mut rules = self.client.fetch_rules().await?;
        if let Some(ref ids) = self.prom_ids {
            rules.retain_proms(ids);
        }

        let directory: HashMap<i64, Prom> = proms
            .into_iter()
            .filter(|p| self.in_scope(p.id))
            .map(|p| (p.id, p))
            .collect();

        let mut report = SyncReport::default();
        let mut keep = Vec::new();

        for part in rules.prom_rules() {
            let Some(prom) = directory.get(&part.prom.id) else {
                tracing::warn!(
                    prom_id = part.prom.id,
                    rules = part.rules.len(),
                    "rules reference unknown prom, skipping"
                );
                report.skipped.push(part.prom.id);
                keep.push(part.prom.id);
                continue;
            };

            let part = PromRules {
                prom: prom.clone(),
                rules: part.rules,
            };
            keep.push(part.prom.id);

            match self.writer.write(&part)? {
                WriteOutcome::Written => {
                    report.written.push(part.prom.id);
                    self.reload(&part.prom, &mut report).await;
                }
                WriteOutcome::Unchanged => {
                    report.unchanged.push(part.prom.id);
                    if self.is_pending(part.prom.id) {
                        self.reload(&part.prom, &mut report).await;
                    }
                }
            }
        }

        report.removed = self
            .writer
            .remove_stale(&keep, self.prom_ids.as_deref())?;
        for id in report.removed.clone() {
            if let Some(prom) = directory.get(&id) {
                self.reload(prom, &mut report).await;
            }
        }
        for id in self.pending_ids() {
            if keep.contains(&id) || report.removed.contains(&id) {
                continue;
            }
            match directory.get(&id) {
                Some(prom) => self.reload(prom, &mut report).await,
                None => self.clear_pending(id),
            }
        }

        tracing::info!(
            written = report.written.len(),
            unchanged = report.unchanged.len(),
            skipped = report.skipped.len(),
            removed = report.removed.len(),
            "sync cycle complete"
        );
        Ok(report)
    }

    async fn reload(&self, prom: &Prom, report: &mut SyncReport) {
        let Some(ref reloader) = self.reloader else {
            return;
        };
        match reloader.reload(prom).await {
            Ok(()) => {
                self.clear_pending(prom.id);
                report.reloaded.push(prom.id);
            }
            Err(e) => {
                tracing::warn!(prom_id = prom.id, error = %e, "reload failed, will retry next cycle");
                self.pending().insert(prom.id);
                report.reload_failed.push(prom.id);
            }
        }
    }

    fn pending(&self) -> std::sync::MutexGuard<'_, BTreeSet<i64>> {
        self.pending_reload
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_pending(&self, prom_id: i64) -> bool {
        self.pending().contains(&prom_id)
    }

    fn pending_ids(&self) -> Vec<i64> {
        self.pending().iter().copied().collect()
    }

    fn clear_pending(&self, prom_id: i64) {
        self.pending().remove(&prom_id);
    }

    /// Syncs every interval until `shutdown` resolves. A failed cycle is
    /// logged and retried on the next tick.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        tracing::info!(
            server = %self.client.base_url(),
            interval_s = self.interval.as_secs(),
            "rule sync running"
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("rule sync stopping");
                    return;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once().await {
                        tracing::error!(error = %e, "sync cycle failed");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(dir: &str) -> EngineConfig {
        crate::config::load_from_str(&format!(
            "server: http://127.0.0.1:1\nrules_dir: {dir}\nrequest_timeout_seconds: 1\nprom_ids: [1, 2]\n"
        ))
        .unwrap()
    }

    #[test]
    fn scope_follows_prom_ids() {
        let syncer = Syncer::from_config(&config("/tmp/r")).unwrap();
        assert!(syncer.in_scope(1));
        assert!(!syncer.in_scope(3));
    }

    #[test]
    fn report_changed() {
        let mut report = SyncReport::default();
        assert!(!report.changed());
        report.unchanged.push(1);
        assert!(!report.changed());
        report.removed.push(2);
        assert!(report.changed());
    }

    #[tokio::test]
    async fn unreachable_api_fails_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let syncer = Syncer::from_config(&config(&dir.path().display().to_string())).unwrap();
        let err = syncer.run_once().await.unwrap_err();
        assert!(matches!(err, SyncError::Client(_)));
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let syncer = Syncer::from_config(&config(&dir.path().display().to_string())).unwrap();
        tokio::time::timeout(Duration::from_secs(5), syncer.run(async {}))
            .await
            .unwrap();
    }
}
