//! Retention policy enforcement
//!
//! Selection is a pure function of the listed records, the policy and the
//! clock, shared by real cleanup and dry runs so the two never disagree.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::registry::{BackupRegistry, ListedBackup};
use crate::config::RetentionPolicy;
use crate::error::ArchivistResult;

/// Why a backup was selected for removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionReason {
    /// Beyond the `max_count` newest backups
    ExcessCount,
    /// Older than `retention_days`
    Expired,
}

impl EvictionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvictionReason::ExcessCount => "excess_count",
            EvictionReason::Expired => "expired",
        }
    }
}

impl fmt::Display for EvictionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A backup selected for removal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Eviction {
    pub name: String,
    pub reason: EvictionReason,
}

/// Outcome of a cleanup run
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupReport {
    pub removed_count: usize,
    pub removed: Vec<Eviction>,
    pub errors: Vec<String>,
}

/// Pick the backups `policy` evicts from a newest-first listing
///
/// The count cap runs first; the age cap only sees the survivors.
pub fn select_evictions(
    backups: &[ListedBackup],
    policy: &RetentionPolicy,
    now: DateTime<Utc>,
) -> Vec<Eviction> {
    let keep = policy.max_count.min(backups.len());
    let (kept, excess) = backups.split_at(keep);

    let mut evictions: Vec<Eviction> = excess
        .iter()
        .map(|b| Eviction {
            name: b.record.name.clone(),
            reason: EvictionReason::ExcessCount,
        })
        .collect();

    // A cutoff before the representable calendar expires nothing
    let cutoff = Duration::try_days(i64::from(policy.retention_days))
        .and_then(|window| now.checked_sub_signed(window));
    if let Some(cutoff) = cutoff {
        evictions.extend(
            kept.iter()
                .filter(|b| b.record.created_at < cutoff)
                .map(|b| Eviction {
                    name: b.record.name.clone(),
                    reason: EvictionReason::Expired,
                }),
        );
    }

    evictions
}

/// Applies retention policies to a registry
pub struct RetentionManager {
    registry: BackupRegistry,
}

impl RetentionManager {
    pub fn new(registry: BackupRegistry) -> Self {
        Self { registry }
    }

    /// Backups `policy` would remove at `now`, without touching anything
    pub fn plan(&self, policy: &RetentionPolicy, now: DateTime<Utc>) -> ArchivistResult<Vec<Eviction>> {
        Ok(select_evictions(&self.registry.list()?, policy, now))
    }

    /// Report what `cleanup` would remove right now
    pub fn dry_run(&self, policy: &RetentionPolicy) -> ArchivistResult<CleanupReport> {
        let removed = self.plan(policy, Utc::now())?;
        Ok(CleanupReport {
            removed_count: removed.len(),
            removed,
            errors: Vec::new(),
        })
    }

    /// Remove every backup `policy` evicts
    ///
    /// A failed removal is recorded and the remaining evictions still run.
    pub fn cleanup(&self, policy: &RetentionPolicy) -> ArchivistResult<CleanupReport> {
        let mut report = CleanupReport::default();

        for eviction in self.plan(policy, Utc::now())? {
            // Someone else may have removed it since listing
            if !self.registry.exists(&eviction.name) {
                continue;
            }

            match self.registry.delete(&eviction.name) {
                Ok(true) => {
                    info!("Backup {} removed ({})", eviction.name, eviction.reason);
                    report.removed.push(eviction);
                }
                Ok(false) => {}
                Err(e) => {
                    warn!("Failed to remove backup {}: {}", eviction.name, e);
                    report
                        .errors
                        .push(format!("Failed to remove {}: {}", eviction.name, e));
                }
            }
        }

        report.removed_count = report.removed.len();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::record::BackupRecord;
    use crate::config::BackupLayout;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_manager() -> (RetentionManager, BackupRegistry, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let layout = BackupLayout::new(temp_dir.path().join("backups"));
        layout.ensure_root().unwrap();
        let registry = BackupRegistry::new(layout);
        (RetentionManager::new(registry.clone()), registry, temp_dir)
    }

    fn saved_record(registry: &BackupRegistry, age: Duration) -> BackupRecord {
        let mut record = BackupRecord::begin(Utc::now() - age);
        let artifact = registry.layout().artifact_path(&record.name);
        fs::write(&artifact, b"PK").unwrap();
        record.artifact_path = Some(artifact.display().to_string());
        record.artifact_size_bytes = Some(2);
        record.success = true;
        registry.save(&record).unwrap();
        record
    }

    fn policy(max_count: usize, retention_days: u32) -> RetentionPolicy {
        RetentionPolicy {
            max_count,
            retention_days,
        }
    }

    #[test]
    fn test_count_cap_removes_oldest() {
        let (manager, registry, _temp) = create_test_manager();
        let records: Vec<BackupRecord> = (0..12)
            .map(|i| saved_record(&registry, Duration::minutes(i * 10)))
            .collect();

        let report = manager.cleanup(&policy(10, 365)).unwrap();

        assert_eq!(report.removed_count, 2);
        assert!(report.errors.is_empty());
        let expected = vec![
            Eviction {
                name: records[10].name.clone(),
                reason: EvictionReason::ExcessCount,
            },
            Eviction {
                name: records[11].name.clone(),
                reason: EvictionReason::ExcessCount,
            },
        ];
        assert_eq!(report.removed, expected);
        assert_eq!(registry.list().unwrap().len(), 10);
        assert!(!registry.layout().artifact_path(&records[11].name).exists());
    }

    #[test]
    fn test_age_cap_removes_expired() {
        let (manager, registry, _temp) = create_test_manager();
        for days in [31, 45, 90] {
            saved_record(&registry, Duration::days(days));
        }

        let report = manager.cleanup(&policy(10, 30)).unwrap();

        assert_eq!(report.removed_count, 3);
        assert!(report
            .removed
            .iter()
            .all(|e| e.reason == EvictionReason::Expired));
        assert!(registry.list().unwrap().is_empty());
    }

    #[test]
    fn test_age_cap_only_sees_survivors() {
        let (manager, registry, _temp) = create_test_manager();
        saved_record(&registry, Duration::days(1));
        saved_record(&registry, Duration::days(40));
        saved_record(&registry, Duration::days(50));

        let plan = manager.plan(&policy(2, 30), Utc::now()).unwrap();

        let reasons: Vec<EvictionReason> = plan.iter().map(|e| e.reason).collect();
        assert_eq!(
            reasons,
            vec![EvictionReason::ExcessCount, EvictionReason::Expired]
        );
    }

    #[test]
    fn test_cleanup_is_idempotent() {
        let (manager, registry, _temp) = create_test_manager();
        for i in 0..5 {
            saved_record(&registry, Duration::days(i * 20));
        }

        let first = manager.cleanup(&policy(3, 30)).unwrap();
        assert!(first.removed_count > 0);

        let second = manager.cleanup(&policy(3, 30)).unwrap();
        assert_eq!(second.removed_count, 0);
        assert!(second.errors.is_empty());
    }

    #[test]
    fn test_dry_run_matches_cleanup_and_deletes_nothing() {
        let (manager, registry, _temp) = create_test_manager();
        for i in 0..6 {
            saved_record(&registry, Duration::days(i * 10));
        }

        let preview = manager.dry_run(&policy(4, 35)).unwrap();
        assert_eq!(registry.list().unwrap().len(), 6);

        let report = manager.cleanup(&policy(4, 35)).unwrap();
        assert_eq!(preview.removed, report.removed);
        assert_eq!(preview.removed_count, report.removed_count);
    }

    #[test]
    fn test_failed_removal_does_not_block_others() {
        let (manager, registry, _temp) = create_test_manager();
        let stuck = saved_record(&registry, Duration::days(60));
        saved_record(&registry, Duration::days(70));

        // An artifact that cannot be removed as a file
        let artifact = registry.layout().artifact_path(&stuck.name);
        fs::remove_file(&artifact).unwrap();
        fs::create_dir_all(artifact.join("inner")).unwrap();

        let report = manager.cleanup(&policy(10, 30)).unwrap();

        assert_eq!(report.removed_count, 1);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains(&stuck.name));
    }

    #[test]
    fn test_huge_retention_window_expires_nothing() {
        let (manager, registry, _temp) = create_test_manager();
        saved_record(&registry, Duration::days(400));
        saved_record(&registry, Duration::days(4000));

        let planned = manager.plan(&policy(10, u32::MAX), Utc::now()).unwrap();
        assert!(planned.is_empty());

        let report = manager.cleanup(&policy(10, u32::MAX)).unwrap();
        assert_eq!(report.removed_count, 0);
        assert_eq!(registry.list().unwrap().len(), 2);
    }

    #[test]
    fn test_nothing_to_do() {
        let (manager, registry, _temp) = create_test_manager();
        saved_record(&registry, Duration::hours(2));

        let report = manager.cleanup(&RetentionPolicy::default()).unwrap();
        assert_eq!(report.removed_count, 0);
        assert_eq!(registry.list().unwrap().len(), 1);
    }

    #[test]
    fn test_reason_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(EvictionReason::ExcessCount).unwrap(),
            "excess_count"
        );
        assert_eq!(serde_json::to_value(EvictionReason::Expired).unwrap(), "expired");
    }
}
