use chrono::Local;
use rusqlite::{params, params_from_iter, Connection, Row};

use crate::db::DatabaseError;
use crate::models::{parse_kb_seed, KbDocument};

pub fn upsert_kb_document(conn: &Connection, doc: &KbDocument) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO kb_documents (id, title, source, url, tags, text, seeded_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            source = excluded.source,
            url = excluded.url,
            tags = excluded.tags,
            text = excluded.text,
            seeded_at = excluded.seeded_at",
        params![
            doc.id,
            doc.title,
            doc.source,
            doc.url,
            serde_json::to_string(&doc.tags)?,
            doc.text,
            Local::now().naive_local().format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_all_kb_documents(conn: &Connection) -> Result<Vec<KbDocument>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, title, source, url, tags, text FROM kb_documents ORDER BY id",
    )?;
    let rows = stmt.query_map([], read_row)?;
    rows_to_documents(rows)
}

pub fn get_kb_documents_by_ids(
    conn: &Connection,
    ids: &[String],
) -> Result<Vec<KbDocument>, DatabaseError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = (1..=ids.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let mut stmt = conn.prepare(&format!(
        "SELECT id, title, source, url, tags, text FROM kb_documents WHERE id IN ({placeholders})"
    ))?;
    let rows = stmt.query_map(params_from_iter(ids.iter()), read_row)?;
    let mut found = rows_to_documents(rows)?;
    // Preserve the caller's id order.
    found.sort_by_key(|d| ids.iter().position(|id| id == &d.id).unwrap_or(usize::MAX));
    Ok(found)
}

/// Load a bundled seed dataset. Re-seeding with the same ids updates the
/// existing rows instead of duplicating them. Returns the number of
/// documents written.
pub fn seed_kb_documents(conn: &Connection, json: &str) -> Result<usize, DatabaseError> {
    let seed = parse_kb_seed(json)?;
    let tx = conn.unchecked_transaction()?;
    for doc in &seed.documents {
        upsert_kb_document(&tx, doc)?;
    }
    tx.commit()?;
    tracing::info!(
        documents = seed.documents.len(),
        schema_version = seed.schema_version,
        "Knowledge base seeded"
    );
    Ok(seed.documents.len())
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<(String, String, String, String, String, String)> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn rows_to_documents<I>(rows: I) -> Result<Vec<KbDocument>, DatabaseError>
where
    I: Iterator<Item = rusqlite::Result<(String, String, String, String, String, String)>>,
{
    let mut docs = Vec::new();
    for row in rows {
        let (id, title, source, url, tags_json, text) = row?;
        docs.push(KbDocument {
            id,
            title,
            source,
            url,
            tags: serde_json::from_str(&tags_json)?,
            text,
        });
    }
    Ok(docs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    const SEED: &str = r#"[
        {"id":"kb-cramps","title":"Period pain","source":"NHS","url":"https://www.nhs.uk/conditions/period-pain/","tags":["menstrual","cramps"],"text":"Period pain is common."},
        {"id":"kb-pcos","title":"Polycystic ovary syndrome","source":"NHS","url":"https://www.nhs.uk/conditions/polycystic-ovary-syndrome-pcos/","tags":["pcos"],"text":"PCOS affects how the ovaries work."}
    ]"#;

    #[test]
    fn seed_inserts_documents() {
        let conn = open_memory_database().unwrap();
        assert_eq!(seed_kb_documents(&conn, SEED).unwrap(), 2);

        let docs = get_all_kb_documents(&conn).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id, "kb-cramps");
        assert_eq!(docs[0].tags, vec!["menstrual", "cramps"]);
    }

    #[test]
    fn reseeding_updates_instead_of_duplicating() {
        let conn = open_memory_database().unwrap();
        seed_kb_documents(&conn, SEED).unwrap();

        let updated = SEED.replace("Period pain is common.", "Period pain is very common.");
        seed_kb_documents(&conn, &updated).unwrap();

        let docs = get_all_kb_documents(&conn).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].text, "Period pain is very common.");
    }

    #[test]
    fn lookup_by_ids_keeps_requested_order() {
        let conn = open_memory_database().unwrap();
        seed_kb_documents(&conn, SEED).unwrap();

        let docs = get_kb_documents_by_ids(
            &conn,
            &["kb-pcos".to_string(), "missing".to_string(), "kb-cramps".to_string()],
        )
        .unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["kb-pcos", "kb-cramps"]);
    }

    #[test]
    fn malformed_seed_is_rejected_without_writes() {
        let conn = open_memory_database().unwrap();
        assert!(seed_kb_documents(&conn, "{not json").is_err());
        assert!(get_all_kb_documents(&conn).unwrap().is_empty());
    }
}
