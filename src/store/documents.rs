//! Document metadata rows

use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use crate::store::applications::parsed;
use crate::store::db::Store;
use crate::store::error::{StoreError, StoreResult};
use crate::store::types::Document;

const DOCUMENT_COLUMNS: &str =
    "id, application_id, uploaded_by, file_name, content_type, size_bytes, storage_key, created_at";

fn document_from_row(row: &Row<'_>) -> rusqlite::Result<Document> {
    Ok(Document {
        id: parsed(row, 0)?,
        application_id: parsed(row, 1)?,
        uploaded_by: parsed(row, 2)?,
        file_name: row.get(3)?,
        content_type: row.get(4)?,
        size_bytes: row.get::<_, i64>(5)? as u64,
        storage_key: row.get(6)?,
        created_at: row.get(7)?,
    })
}

impl Store {
    pub fn insert_document(&self, document: &Document) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            &format!(
                "INSERT INTO documents ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                DOCUMENT_COLUMNS
            ),
            params![
                document.id.to_string(),
                document.application_id.to_string(),
                document.uploaded_by.to_string(),
                document.file_name,
                document.content_type,
                document.size_bytes as i64,
                document.storage_key,
                document.created_at
            ],
        )?;
        Ok(())
    }

    pub fn get_document(&self, id: Uuid) -> StoreResult<Document> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM documents WHERE id = ?1", DOCUMENT_COLUMNS),
            params![id.to_string()],
            document_from_row,
        )
        .optional()?
        .ok_or_else(|| StoreError::NotFound(format!("Document {}", id)))
    }

    pub fn list_documents(&self, application_id: Uuid) -> StoreResult<Vec<Document>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM documents WHERE application_id = ?1 ORDER BY created_at, id",
            DOCUMENT_COLUMNS
        ))?;
        let rows = stmt.query_map(params![application_id.to_string()], document_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::applications::tests::{sample_application, seeded_store};
    use crate::store::types::now_millis;

    #[test]
    fn test_document_metadata_round_trip() {
        let (store, borrower, _) = seeded_store();
        let app = store
            .insert_application(sample_application(borrower, 25_000.0))
            .unwrap();

        let doc = Document {
            id: Uuid::new_v4(),
            application_id: app.id,
            uploaded_by: borrower,
            file_name: "bank-statement.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            size_bytes: 2048,
            storage_key: format!("{}/x-bank-statement.pdf", app.id),
            created_at: now_millis(),
        };
        store.insert_document(&doc).unwrap();

        assert_eq!(store.get_document(doc.id).unwrap(), doc);
        assert_eq!(store.list_documents(app.id).unwrap(), vec![doc]);
        assert!(matches!(
            store.get_document(Uuid::new_v4()),
            Err(StoreError::NotFound(_))
        ));
    }
}
