use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::db::sqlite::to_db_timestamp;
use crate::db::DatabaseError;

/// One row of the audit trail.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub timestamp: String,
    pub actor: String,
    pub action: String,
    pub entity: String,
    pub detail: Option<String>,
}

pub fn insert_audit_entry(
    conn: &Connection,
    at: &DateTime<Utc>,
    actor: &str,
    action: &str,
    entity: &str,
    detail: Option<&str>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO audit_log (timestamp, actor, action, entity, detail) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![to_db_timestamp(at), actor, action, entity, detail],
    )?;
    Ok(())
}

/// Audit entries for an entity, newest first.
pub fn query_audit_by_entity(conn: &Connection, entity: &str) -> Result<Vec<AuditEntry>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT timestamp, actor, action, entity, detail FROM audit_log
         WHERE entity = ?1
         ORDER BY timestamp DESC, id DESC",
    )?;
    let rows = stmt
        .query_map(params![entity], |row| {
            Ok(AuditEntry {
                timestamp: row.get(0)?,
                actor: row.get(1)?,
                action: row.get(2)?,
                entity: row.get(3)?,
                detail: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
