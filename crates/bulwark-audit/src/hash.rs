//! BLAKE3 hashing for audit tamper evidence and snapshot fingerprints.

use serde::Serialize;

use crate::AuditRecord;

/// Hashable view of an audit record (excludes `content_hash`).
#[derive(Serialize)]
struct HashableRecord<'a> {
    id: &'a crate::AuditId,
    diagram_id: &'a uuid::Uuid,
    project_id: &'a uuid::Uuid,
    diagram_version: u64,
    snapshot_fingerprint: &'a str,
    steps: &'a [crate::AuditStep],
    outcome: &'a serde_json::Value,
    started_at: &'a chrono::DateTime<chrono::Utc>,
    completed_at: &'a Option<chrono::DateTime<chrono::Utc>>,
}

/// Compute the hex BLAKE3 hash of a record's content.
pub fn compute_record_hash(record: &AuditRecord) -> String {
    let hashable = HashableRecord {
        id: &record.id,
        diagram_id: &record.diagram_id,
        project_id: &record.project_id,
        diagram_version: record.diagram_version,
        snapshot_fingerprint: &record.snapshot_fingerprint,
        steps: &record.steps,
        outcome: &record.outcome,
        started_at: &record.started_at,
        completed_at: &record.completed_at,
    };

    let json = serde_json::to_vec(&hashable).unwrap_or_default();
    blake3::hash(&json).to_hex().to_string()
}

/// Fingerprint any serializable snapshot.
///
/// Serializes to JSON with object keys sorted at every level, so equal
/// snapshots hash equally regardless of attribute insertion order, then
/// hashes with BLAKE3.
pub fn fingerprint<T: Serialize + ?Sized>(snapshot: &T) -> Result<String, serde_json::Error> {
    let value = canonicalize(serde_json::to_value(snapshot)?);
    let bytes = serde_json::to_vec(&value)?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

fn canonicalize(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut entries: Vec<_> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            serde_json::Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, canonicalize(v)))
                    .collect(),
            )
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.into_iter().map(canonicalize).collect())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::AuditSession;
    use uuid::Uuid;

    #[test]
    fn fingerprint_ignores_key_order() {
        let mut a = serde_json::Map::new();
        a.insert("exposure".into(), "Public".into());
        a.insert("authType".into(), "None".into());

        let mut b = serde_json::Map::new();
        b.insert("authType".into(), "None".into());
        b.insert("exposure".into(), "Public".into());

        assert_eq!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
    }

    #[test]
    fn fingerprint_changes_with_content() {
        let a = serde_json::json!({"nodes": [{"id": "a"}]});
        let b = serde_json::json!({"nodes": [{"id": "b"}]});
        assert_ne!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
    }

    #[test]
    fn record_hash_excludes_content_hash() {
        let mut record = AuditSession::new(Uuid::new_v4(), Uuid::new_v4(), 3, "abc").finalize();
        let before = record.compute_hash();
        record.content_hash = Some("something else".to_string());
        assert_eq!(before, record.compute_hash());
    }
}
