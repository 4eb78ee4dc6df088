use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::Database;
use crate::error::StoreError;
use crate::query::{DocumentQuery, SUMMARY_COLUMNS};

/// Listing view of a document. Never carries the payload.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DocumentSummary {
    pub id: String,
    pub name: String,
    pub mime: String,
    /// Whether a binary payload is stored.
    pub file: bool,
    pub public: bool,
    pub created: DateTime<Utc>,
    pub grant: Vec<String>,
    pub owner: String,
}

#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub summary: DocumentSummary,
    pub json: Option<Value>,
    pub payload: Option<Vec<u8>>,
}

/// Everything needed to insert a document. `has_file` is derived from
/// `payload`, never supplied separately.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub id: String,
    pub name: String,
    pub mime: String,
    pub public: bool,
    pub grant: Vec<String>,
    pub owner: String,
    pub json: Option<Value>,
    pub payload: Option<Vec<u8>>,
}

fn summary_from_row(row: &SqliteRow) -> Result<DocumentSummary, StoreError> {
    let id: String = row.try_get("id")?;

    let grant_raw: String = row.try_get("grant_login")?;
    let grant: Vec<String> = serde_json::from_str(&grant_raw)
        .map_err(|e| StoreError::Corrupt(format!("grant list of {id}: {e}")))?;

    let created_micros: i64 = row.try_get("created")?;
    let created = DateTime::<Utc>::from_timestamp_micros(created_micros)
        .ok_or_else(|| StoreError::Corrupt(format!("created timestamp of {id}")))?;

    Ok(DocumentSummary {
        name: row.try_get("name")?,
        mime: row.try_get("mime")?,
        file: row.try_get("has_file")?,
        public: row.try_get("public")?,
        owner: row.try_get("owner")?,
        created,
        grant,
        id,
    })
}

impl Database {
    /// Inserts a document in a single statement. A reused id fails with
    /// [`StoreError::Duplicate`].
    pub async fn insert_document(&self, doc: &NewDocument) -> Result<(), StoreError> {
        let grant = serde_json::to_string(&doc.grant)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let json = doc.json.as_ref().map(Value::to_string);

        sqlx::query(
            r#"
            INSERT INTO documents
                (id, name, mime, has_file, public, grant_login, owner, created, json, file)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.name)
        .bind(&doc.mime)
        .bind(doc.payload.is_some())
        .bind(doc.public)
        .bind(grant)
        .bind(&doc.owner)
        .bind(Utc::now().timestamp_micros())
        .bind(json)
        .bind(doc.payload.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::from_insert(e, &doc.id))?;
        Ok(())
    }

    pub async fn list_documents(
        &self,
        query: &DocumentQuery,
    ) -> Result<Vec<DocumentSummary>, StoreError> {
        let mut builder = query.to_builder();
        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(summary_from_row).collect()
    }

    /// Direct lookup by id, payload included.
    pub async fn get_document(&self, id: &str) -> Result<Option<StoredDocument>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {SUMMARY_COLUMNS}, json, file FROM documents WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let json = row
            .try_get::<Option<String>, _>("json")?
            .map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(|e| StoreError::Corrupt(format!("json of {id}: {e}")))?;

        Ok(Some(StoredDocument {
            summary: summary_from_row(&row)?,
            json,
            payload: row.try_get("file")?,
        }))
    }

    /// Deletes by id whether or not the row exists. Returns the number of
    /// rows removed.
    pub async fn delete_document(&self, id: &str) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ListParams;
    use serde_json::json;

    fn doc(id: &str, name: &str, owner: &str) -> NewDocument {
        NewDocument {
            id: id.into(),
            name: name.into(),
            mime: "text/plain".into(),
            public: false,
            grant: vec![],
            owner: owner.into(),
            json: None,
            payload: None,
        }
    }

    fn list_params(pairs: &[(&str, &str)]) -> ListParams {
        let get = |k: &str| {
            pairs
                .iter()
                .find(|(key, _)| *key == k)
                .map(|(_, v)| v.to_string())
        };
        ListParams {
            login: get("login"),
            key: get("key"),
            value: get("value"),
            limit: get("limit"),
        }
    }

    async fn list(db: &Database, caller: &str, pairs: &[(&str, &str)]) -> Vec<String> {
        let query = DocumentQuery::for_caller(caller, &list_params(pairs)).unwrap();
        db.list_documents(&query)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect()
    }

    #[tokio::test]
    async fn insert_and_fetch_round_trip() {
        let db = Database::in_memory().await.unwrap();
        let mut new = doc("doc1", "report", "alice12345");
        new.public = true;
        new.grant = vec!["bobby12345".into(), "carol12345".into()];
        new.json = Some(json!({"pages": 3}));
        new.payload = Some(vec![0, 159, 146, 150]);
        db.insert_document(&new).await.unwrap();

        let stored = db.get_document("doc1").await.unwrap().unwrap();
        assert_eq!(stored.summary.name, "report");
        assert!(stored.summary.file);
        assert!(stored.summary.public);
        assert_eq!(stored.summary.grant, vec!["bobby12345", "carol12345"]);
        assert_eq!(stored.summary.owner, "alice12345");
        assert_eq!(stored.json, Some(json!({"pages": 3})));
        assert_eq!(stored.payload, Some(vec![0, 159, 146, 150]));
    }

    #[tokio::test]
    async fn has_file_follows_payload() {
        let db = Database::in_memory().await.unwrap();
        db.insert_document(&doc("plain", "plain", "alice12345")).await.unwrap();
        let stored = db.get_document("plain").await.unwrap().unwrap();
        assert!(!stored.summary.file);
        assert!(stored.payload.is_none());
        assert!(stored.summary.grant.is_empty());
    }

    #[tokio::test]
    async fn duplicate_id_fails() {
        let db = Database::in_memory().await.unwrap();
        db.insert_document(&doc("doc1", "a", "alice12345")).await.unwrap();
        let err = db
            .insert_document(&doc("doc1", "b", "bobby12345"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(id) if id == "doc1"));
        assert_eq!(
            db.get_document("doc1").await.unwrap().unwrap().summary.name,
            "a"
        );
    }

    #[tokio::test]
    async fn listing_is_scoped_and_ordered() {
        let db = Database::in_memory().await.unwrap();
        db.insert_document(&doc("a2", "beta", "alice12345")).await.unwrap();
        db.insert_document(&doc("a1", "alpha", "alice12345")).await.unwrap();
        db.insert_document(&doc("a3", "alpha", "alice12345")).await.unwrap();
        db.insert_document(&doc("b1", "alpha", "bobby12345")).await.unwrap();

        assert_eq!(list(&db, "alice12345", &[]).await, vec!["a1", "a3", "a2"]);
        assert_eq!(list(&db, "bobby12345", &[]).await, vec!["b1"]);
        assert_eq!(
            list(&db, "bobby12345", &[("login", "alice12345")]).await,
            vec!["a1", "a3", "a2"]
        );
        assert!(list(&db, "carol12345", &[]).await.is_empty());
    }

    #[tokio::test]
    async fn listing_filters_and_limits() {
        let db = Database::in_memory().await.unwrap();
        for i in 0..8 {
            let mut new = doc(&format!("d{i}"), &format!("n{i}"), "alice12345");
            if i % 2 == 0 {
                new.payload = Some(vec![i as u8]);
                new.mime = "application/octet-stream".into();
            }
            db.insert_document(&new).await.unwrap();
        }

        assert_eq!(list(&db, "alice12345", &[("limit", "5")]).await.len(), 5);
        assert_eq!(
            list(&db, "alice12345", &[("key", "file"), ("value", "true")]).await,
            vec!["d0", "d2", "d4", "d6"]
        );
        assert_eq!(
            list(&db, "alice12345", &[("key", "mime"), ("value", "text/plain"), ("limit", "2")])
                .await,
            vec!["d1", "d3"]
        );
        assert_eq!(
            list(&db, "alice12345", &[("key", "name"), ("value", "' OR '1'='1")]).await,
            Vec::<String>::new()
        );
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let db = Database::in_memory().await.unwrap();
        db.insert_document(&doc("doc1", "a", "alice12345")).await.unwrap();
        assert_eq!(db.delete_document("doc1").await.unwrap(), 1);
        assert_eq!(db.delete_document("doc1").await.unwrap(), 0);
        assert!(db.get_document("doc1").await.unwrap().is_none());
    }
}
