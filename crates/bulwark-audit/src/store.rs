//! Per-diagram audit storage.
//!
//! Each diagram owns a directory of day partitions, so reading a diagram's
//! history never touches another diagram's records:
//! ```text
//! {root}/
//!   {diagram_id}/
//!     2026-10-18/
//!       {record_id}.json
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{AuditId, AuditRecord};

const DAY_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("No audit record {id} for diagram {diagram_id}")]
    NotFound { diagram_id: Uuid, id: AuditId },

    #[error("Audit record {0} does not match its content hash")]
    IntegrityViolation(AuditId),

    #[error("Audit record {0} is not finalized")]
    NotFinalized(AuditId),

    #[error("Audit I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed audit record at {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode audit record: {0}")]
    Encode(#[from] serde_json::Error),
}

fn io_at(path: &Path) -> impl FnOnce(io::Error) -> AuditError + '_ {
    move |source| AuditError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Time window and size cap for a history read.
#[derive(Debug, Default, Clone)]
pub struct AuditQuery {
    /// Only records started at or after this time.
    pub from: Option<DateTime<Utc>>,
    /// Only records started at or before this time.
    pub to: Option<DateTime<Utc>>,
    /// Keep only the newest `limit` records.
    pub limit: Option<usize>,
}

impl AuditQuery {
    fn covers_day(&self, day: NaiveDate) -> bool {
        self.from.map_or(true, |from| day >= from.date_naive())
            && self.to.map_or(true, |to| day <= to.date_naive())
    }

    fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| at >= from) && self.to.map_or(true, |to| at <= to)
    }
}

/// A stored record and whether it still matches its content hash.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub intact: bool,
    pub record: AuditRecord,
}

pub trait AuditStore {
    /// Persist a finalized record, returning where it was written.
    fn save(&self, record: &AuditRecord) -> Result<PathBuf, AuditError>;

    /// Fetch one record of a diagram. Tampered records are an error.
    fn get(&self, diagram_id: Uuid, id: AuditId) -> Result<AuditRecord, AuditError>;

    /// A diagram's records, newest first, each checked against its hash.
    /// Tampered records are reported, not dropped.
    fn history(&self, diagram_id: Uuid, query: &AuditQuery) -> Result<Vec<AuditEntry>, AuditError>;
}

/// JSON files partitioned by diagram, then by day.
pub struct FileAuditStore {
    root: PathBuf,
}

impl FileAuditStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, AuditError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(io_at(&root))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn diagram_dir(&self, diagram_id: Uuid) -> PathBuf {
        self.root.join(diagram_id.to_string())
    }

    fn record_path(&self, record: &AuditRecord) -> PathBuf {
        self.diagram_dir(record.diagram_id)
            .join(record.started_at.format(DAY_FORMAT).to_string())
            .join(format!("{}.json", record.id))
    }

    /// Day partitions of a diagram inside the query window, newest first.
    fn days(&self, diagram_id: Uuid, query: &AuditQuery) -> Result<Vec<PathBuf>, AuditError> {
        let dir = self.diagram_dir(diagram_id);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut days = Vec::new();
        for entry in fs::read_dir(&dir).map_err(io_at(&dir))? {
            let path = entry.map_err(io_at(&dir))?.path();
            let day = path
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| NaiveDate::parse_from_str(name, DAY_FORMAT).ok());
            if let Some(day) = day {
                if path.is_dir() && query.covers_day(day) {
                    days.push((day, path));
                }
            }
        }

        days.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(days.into_iter().map(|(_, path)| path).collect())
    }
}

fn read_record(path: &Path) -> Result<AuditRecord, AuditError> {
    let raw = fs::read_to_string(path).map_err(io_at(path))?;
    serde_json::from_str(&raw).map_err(|source| AuditError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

impl AuditStore for FileAuditStore {
    fn save(&self, record: &AuditRecord) -> Result<PathBuf, AuditError> {
        if record.content_hash.is_none() {
            return Err(AuditError::NotFinalized(record.id));
        }

        let path = self.record_path(record);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_at(parent))?;
        }

        // Write then rename so readers never see a half-written record.
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, serde_json::to_vec_pretty(record)?).map_err(io_at(&staging))?;
        fs::rename(&staging, &path).map_err(io_at(&path))?;

        tracing::debug!(
            audit_id = %record.id,
            diagram_id = %record.diagram_id,
            path = %path.display(),
            "Audit record saved"
        );

        Ok(path)
    }

    fn get(&self, diagram_id: Uuid, id: AuditId) -> Result<AuditRecord, AuditError> {
        let filename = format!("{id}.json");
        let path = self
            .days(diagram_id, &AuditQuery::default())?
            .into_iter()
            .map(|day| day.join(&filename))
            .find(|path| path.is_file())
            .ok_or(AuditError::NotFound { diagram_id, id })?;

        let record = read_record(&path)?;
        if !record.verify_integrity() {
            return Err(AuditError::IntegrityViolation(id));
        }
        Ok(record)
    }

    fn history(&self, diagram_id: Uuid, query: &AuditQuery) -> Result<Vec<AuditEntry>, AuditError> {
        let mut entries = Vec::new();

        for day in self.days(diagram_id, query)? {
            for entry in fs::read_dir(&day).map_err(io_at(&day))? {
                let path = entry.map_err(io_at(&day))?.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                let record = read_record(&path)?;
                if query.contains(record.started_at) {
                    entries.push(AuditEntry {
                        intact: record.verify_integrity(),
                        record,
                    });
                }
            }
            // Days are newest first, so a full page never needs older days.
            if query.limit.is_some_and(|limit| entries.len() >= limit) {
                break;
            }
        }

        entries.sort_by(|a, b| b.record.started_at.cmp(&a.record.started_at));
        if let Some(limit) = query.limit {
            entries.truncate(limit);
        }

        let tampered = entries.iter().filter(|e| !e.intact).count();
        if tampered > 0 {
            tracing::warn!(%diagram_id, tampered, "Audit history contains tampered records");
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::AuditSession;
    use chrono::{Duration, TimeZone};

    fn sealed_at(diagram_id: Uuid, started_at: DateTime<Utc>) -> AuditRecord {
        let mut session = AuditSession::new(diagram_id, Uuid::new_v4(), 2, "fingerprint");
        session.record_step(
            "quantify",
            "Impact score 66",
            serde_json::json!({"impact_score": 66}),
            true,
        );
        session.set_outcome(serde_json::json!({"impact_score": 66}));
        let mut record = session.finalize();
        record.started_at = started_at;
        record.content_hash = Some(record.compute_hash());
        record
    }

    fn sealed(diagram_id: Uuid) -> AuditRecord {
        sealed_at(diagram_id, Utc::now())
    }

    fn store() -> (tempfile::TempDir, FileAuditStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileAuditStore::new(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn records_land_under_their_diagram() {
        let (_dir, store) = store();
        let diagram = Uuid::new_v4();
        let at = Utc.with_ymd_and_hms(2026, 3, 9, 12, 0, 0).unwrap();
        let record = sealed_at(diagram, at);

        let path = store.save(&record).unwrap();
        assert_eq!(
            path,
            store
                .root()
                .join(diagram.to_string())
                .join("2026-03-09")
                .join(format!("{}.json", record.id))
        );
        assert_eq!(store.get(diagram, record.id).unwrap(), record);
    }

    #[test]
    fn get_is_scoped_to_the_diagram() {
        let (_dir, store) = store();
        let record = sealed(Uuid::new_v4());
        store.save(&record).unwrap();

        let other = Uuid::new_v4();
        assert!(matches!(
            store.get(other, record.id),
            Err(AuditError::NotFound { diagram_id, .. }) if diagram_id == other
        ));
    }

    #[test]
    fn tampered_record_fails_get_and_is_flagged_in_history() {
        let (_dir, store) = store();
        let diagram = Uuid::new_v4();
        let record = sealed(diagram);
        let path = store.save(&record).unwrap();

        let mut forged = record.clone();
        forged.outcome = serde_json::json!({"impact_score": 0});
        fs::write(&path, serde_json::to_vec_pretty(&forged).unwrap()).unwrap();

        assert!(matches!(
            store.get(diagram, record.id),
            Err(AuditError::IntegrityViolation(_))
        ));
        let history = store.history(diagram, &AuditQuery::default()).unwrap();
        assert_eq!(history.len(), 1);
        assert!(!history[0].intact);
    }

    #[test]
    fn unfinalized_record_is_rejected() {
        let (_dir, store) = store();
        let mut record = sealed(Uuid::new_v4());
        record.content_hash = None;
        assert!(matches!(store.save(&record), Err(AuditError::NotFinalized(_))));
    }

    #[test]
    fn corrupt_file_reports_its_path() {
        let (_dir, store) = store();
        let diagram = Uuid::new_v4();
        let path = store.save(&sealed(diagram)).unwrap();
        fs::write(&path, b"not json").unwrap();

        match store.history(diagram, &AuditQuery::default()) {
            Err(AuditError::Malformed { path: bad, .. }) => assert_eq!(bad, path),
            other => panic!("expected malformed record error, got {other:?}"),
        }
    }

    #[test]
    fn history_is_newest_first_and_per_diagram() {
        let (_dir, store) = store();
        let diagram = Uuid::new_v4();
        let base = Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap();
        let older = sealed_at(diagram, base);
        let same_day = sealed_at(diagram, base + Duration::hours(3));
        let newest = sealed_at(diagram, base + Duration::days(2));
        for record in [&older, &same_day, &newest] {
            store.save(record).unwrap();
        }
        store.save(&sealed(Uuid::new_v4())).unwrap();

        let history = store.history(diagram, &AuditQuery::default()).unwrap();
        let ids: Vec<_> = history.iter().map(|e| e.record.id).collect();
        assert_eq!(ids, [newest.id, same_day.id, older.id]);
        assert!(history.iter().all(|e| e.intact));
    }

    #[test]
    fn history_honours_window_and_limit() {
        let (_dir, store) = store();
        let diagram = Uuid::new_v4();
        let base = Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap();
        let records: Vec<_> = (0..4)
            .map(|day| sealed_at(diagram, base + Duration::days(day)))
            .collect();
        for record in &records {
            store.save(record).unwrap();
        }

        let window = AuditQuery {
            from: Some(base + Duration::days(1)),
            to: Some(base + Duration::days(2)),
            ..Default::default()
        };
        let ids: Vec<_> = store
            .history(diagram, &window)
            .unwrap()
            .into_iter()
            .map(|e| e.record.id)
            .collect();
        assert_eq!(ids, [records[2].id, records[1].id]);

        let latest = AuditQuery {
            limit: Some(1),
            ..Default::default()
        };
        let page = store.history(diagram, &latest).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].record.id, records[3].id);
    }

    #[test]
    fn unknown_diagram_has_empty_history() {
        let (_dir, store) = store();
        assert!(store
            .history(Uuid::new_v4(), &AuditQuery::default())
            .unwrap()
            .is_empty());
    }
}
