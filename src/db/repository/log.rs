use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::CyclePhase;
use crate::models::{Log, LOG_SCHEMA_VERSION};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const LOG_COLUMNS: &str = "id, created_at, symptom_type, severity, cycle_phase, notes, tags, \
                           triggers, medications, duration_mins, schema_version";

/// Raw column values of a `logs` row before schema migration.
#[derive(Debug, Clone)]
pub struct LogRow {
    pub id: String,
    pub created_at: String,
    pub symptom_type: String,
    pub severity: i32,
    pub cycle_phase: Option<String>,
    pub notes: Option<String>,
    pub tags: String,
    pub triggers: String,
    pub medications: String,
    pub duration_mins: Option<i64>,
    pub schema_version: u32,
}

pub fn insert_log(conn: &Connection, log: &Log) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO logs (id, created_at, symptom_type, severity, cycle_phase, notes, tags,
         triggers, medications, duration_mins, schema_version)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            log.id.to_string(),
            log.created_at.format(DATETIME_FORMAT).to_string(),
            log.symptom_type,
            log.severity,
            log.cycle_phase.map(|p| p.as_str()),
            log.notes,
            serde_json::to_string(&log.tags)?,
            serde_json::to_string(&log.triggers)?,
            serde_json::to_string(&log.medications)?,
            log.duration_mins,
            LOG_SCHEMA_VERSION,
        ],
    )?;
    Ok(())
}

pub fn get_all_logs(conn: &Connection) -> Result<Vec<Log>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {LOG_COLUMNS} FROM logs ORDER BY created_at DESC"
    ))?;
    let rows = stmt.query_map([], read_row)?;
    rows_to_logs(rows)
}

pub fn get_logs_by_ids(conn: &Connection, ids: &[Uuid]) -> Result<Vec<Log>, DatabaseError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = (1..=ids.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let mut stmt = conn.prepare(&format!(
        "SELECT {LOG_COLUMNS} FROM logs WHERE id IN ({placeholders}) ORDER BY created_at DESC"
    ))?;
    let rows = stmt.query_map(params_from_iter(ids.iter().map(|id| id.to_string())), read_row)?;
    rows_to_logs(rows)
}

pub fn delete_log(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let affected = conn.execute("DELETE FROM logs WHERE id = ?1", params![id.to_string()])?;
    if affected == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "log".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<LogRow> {
    Ok(LogRow {
        id: row.get(0)?,
        created_at: row.get(1)?,
        symptom_type: row.get(2)?,
        severity: row.get(3)?,
        cycle_phase: row.get(4)?,
        notes: row.get(5)?,
        tags: row.get(6)?,
        triggers: row.get(7)?,
        medications: row.get(8)?,
        duration_mins: row.get(9)?,
        schema_version: row.get(10)?,
    })
}

fn rows_to_logs<I>(rows: I) -> Result<Vec<Log>, DatabaseError>
where
    I: Iterator<Item = rusqlite::Result<LogRow>>,
{
    let mut logs = Vec::new();
    for row in rows {
        logs.push(migrate_log_row(row?)?);
    }
    Ok(logs)
}

/// Convert a stored row of any schema version into the current `Log` shape.
///
/// Version 0 rows were written before list columns were JSON encoded: lists
/// are comma separated, and phases may be blank or capitalised.
pub fn migrate_log_row(row: LogRow) -> Result<Log, DatabaseError> {
    let id = Uuid::parse_str(&row.id).map_err(|_| DatabaseError::ConstraintViolation(
        format!("log id is not a UUID: {}", row.id),
    ))?;
    let created_at = NaiveDateTime::parse_from_str(&row.created_at, DATETIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(&row.created_at, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|_| DatabaseError::ConstraintViolation(
            format!("log {id} has an unreadable timestamp"),
        ))?;

    let (tags, triggers, medications, cycle_phase) = if row.schema_version == 0 {
        (
            split_legacy_list(&row.tags),
            split_legacy_list(&row.triggers),
            split_legacy_list(&row.medications),
            match row.cycle_phase.as_deref().map(str::trim) {
                None | Some("") => None,
                Some(p) => Some(CyclePhase::from_str(&p.to_lowercase())?),
            },
        )
    } else {
        (
            serde_json::from_str(&row.tags)?,
            serde_json::from_str(&row.triggers)?,
            serde_json::from_str(&row.medications)?,
            row.cycle_phase.as_deref().map(CyclePhase::from_str).transpose()?,
        )
    };

    Ok(Log {
        id,
        created_at,
        symptom_type: row.symptom_type,
        severity: row.severity,
        cycle_phase,
        notes: row.notes,
        tags,
        triggers,
        medications,
        duration_mins: row.duration_mins.and_then(|d| u32::try_from(d).ok()),
    })
}

fn split_legacy_list(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') {
        if let Ok(list) = serde_json::from_str::<Vec<String>>(trimmed) {
            return list;
        }
    }
    trimmed
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
