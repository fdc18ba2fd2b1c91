//! Entry and partition CRUD on the SQLite backend.
//!
//! Entries keep the insertion sequence they were first written with:
//! replacing an existing key updates the stored response in place, so
//! eviction order is unaffected by rewrites.

use super::connection::CacheDb;
use super::hash::request_key;
use crate::Error;
use crate::http::{Request, Response};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A stored (request, response) pair.
#[derive(Debug)]
pub struct CachedEntry {
    pub partition: String,
    pub request_key: String,
    pub method: String,
    pub url: String,
    pub stored_at: String,
    pub response: Response,
}

/// Row image before headers are decoded.
struct RawEntry {
    partition: String,
    request_key: String,
    method: String,
    url: String,
    status: i64,
    headers_json: String,
    body: Vec<u8>,
    final_url: Option<String>,
    stored_at: String,
}

const ENTRY_COLUMNS: &str =
    "partition, request_key, method, url, status, headers_json, body, final_url, stored_at";

impl RawEntry {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            partition: row.get(0)?,
            request_key: row.get(1)?,
            method: row.get(2)?,
            url: row.get(3)?,
            status: row.get(4)?,
            headers_json: row.get(5)?,
            body: row.get(6)?,
            final_url: row.get(7)?,
            stored_at: row.get(8)?,
        })
    }

    fn decode(self) -> Result<CachedEntry, Error> {
        let status = u16::try_from(self.status)
            .map_err(|_| Error::CorruptEntry(format!("status {} out of range", self.status)))?;
        let headers: Vec<(String, String)> = serde_json::from_str(&self.headers_json)?;

        Ok(CachedEntry {
            partition: self.partition,
            request_key: self.request_key,
            method: self.method,
            url: self.url,
            stored_at: self.stored_at,
            response: Response { status, headers, body: self.body.into(), url: self.final_url },
        })
    }
}

impl CacheDb {
    /// Create an empty partition.
    ///
    /// Returns false if the partition already existed.
    pub async fn create_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let created = conn.execute(
                    "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
                    params![name, now],
                )?;
                Ok(created == 1)
            })
            .await
            .map_err(Error::from)
    }

    /// List partition names in creation order.
    pub async fn list_partitions(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY rowid ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a partition and every entry in it.
    ///
    /// Returns false if the partition did not exist.
    pub async fn drop_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM entries WHERE partition = ?1", params![name])?;
                let deleted = tx.execute("DELETE FROM partitions WHERE name = ?1", params![name])?;
                tx.commit()?;
                Ok(deleted == 1)
            })
            .await
            .map_err(Error::from)
    }

    /// Request keys of a partition, oldest first.
    pub async fn entry_keys(&self, partition: &str) -> Result<Vec<String>, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT request_key FROM entries WHERE partition = ?1 ORDER BY seq ASC")?;
                let keys = stmt
                    .query_map(params![partition], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in a partition.
    pub async fn count_entries(&self, partition: &str) -> Result<usize, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<usize, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE partition = ?1", params![partition], |row| {
                        row.get(0)
                    })?;
                Ok(count as usize)
            })
            .await
            .map_err(Error::from)
    }

    /// Get an entry by request key.
    ///
    /// Returns None if the key doesn't exist in the partition.
    pub async fn get_entry(&self, partition: &str, key: &str) -> Result<Option<CachedEntry>, Error> {
        let partition = partition.to_string();
        let key = key.to_string();
        let raw = self
            .conn
            .call(move |conn| -> Result<Option<RawEntry>, Error> {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {ENTRY_COLUMNS} FROM entries WHERE partition = ?1 AND request_key = ?2"
                ))?;

                match stmt.query_row(params![partition, key], RawEntry::from_row) {
                    Ok(raw) => Ok(Some(raw)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        raw.map(RawEntry::decode).transpose()
    }

    /// Every entry stored for a URL, across all partitions, oldest first.
    ///
    /// Entries are stored under their URL without fragment.
    pub async fn entries_for_url(&self, url: &str) -> Result<Vec<CachedEntry>, Error> {
        let url = url.to_string();
        let raws = self
            .conn
            .call(move |conn| -> Result<Vec<RawEntry>, Error> {
                let mut stmt = conn.prepare(&format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE url = ?1 ORDER BY seq"))?;
                let raws = stmt
                    .query_map(params![url], RawEntry::from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(raws)
            })
            .await
            .map_err(Error::from)?;

        raws.into_iter().map(RawEntry::decode).collect()
    }

    /// Insert or replace the entry for a request.
    ///
    /// Creates the partition on first write. Replacing an existing key keeps
    /// its original insertion sequence.
    pub async fn put_entry(&self, partition: &str, request: &Request, response: &Response) -> Result<(), Error> {
        let partition = partition.to_string();
        let key = request_key(request);
        let method = request.method.clone();
        let mut url = request.url.clone();
        url.set_fragment(None);
        let url = url.to_string();
        let status = i64::from(response.status);
        let headers_json = serde_json::to_string(&response.headers)?;
        let body = response.body.to_vec();
        let final_url = response.url.clone();
        let now = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
                    params![&partition, &now],
                )?;
                tx.execute(
                    "INSERT INTO entries (
                        partition, request_key, method, url, status, headers_json, body, final_url, stored_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                    ON CONFLICT(partition, request_key) DO UPDATE SET
                        method = excluded.method,
                        url = excluded.url,
                        status = excluded.status,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        final_url = excluded.final_url,
                        stored_at = excluded.stored_at",
                    params![&partition, &key, &method, &url, status, &headers_json, &body, &final_url, &now],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Delete an entry by request key.
    ///
    /// Returns false if there was nothing to delete.
    pub async fn delete_entry(&self, partition: &str, key: &str) -> Result<bool, Error> {
        let partition = partition.to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute(
                    "DELETE FROM entries WHERE partition = ?1 AND request_key = ?2",
                    params![partition, key],
                )?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(path: &str) -> Request {
        Request::get(url::Url::parse(&format!("https://example.com{path}")).unwrap())
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let request = get("/logo.png");
        let response = Response::new(200, "png-bytes").with_header("Content-Type", "image/png");

        db.put_entry("v1/app/images", &request, &response).await.unwrap();

        let entry = db
            .get_entry("v1/app/images", &request_key(&request))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.url, "https://example.com/logo.png");
        assert_eq!(entry.method, "GET");
        assert_eq!(entry.response.status, 200);
        assert_eq!(entry.response.content_type(), Some("image/png"));
        assert_eq!(entry.response.text(), "png-bytes");
    }

    #[tokio::test]
    async fn test_get_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let result = db.get_entry("v1/app/images", "nonexistent").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_put_creates_partition() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(db.list_partitions().await.unwrap().is_empty());

        db.put_entry("v1/app/pages", &get("/"), &Response::new(200, "<html>"))
            .await
            .unwrap();

        assert_eq!(db.list_partitions().await.unwrap(), vec!["v1/app/pages".to_string()]);
        assert!(!db.create_partition("v1/app/pages").await.unwrap());
    }

    #[tokio::test]
    async fn test_rewrite_keeps_count_and_order() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let p = "v1/app/pages";
        db.put_entry(p, &get("/a"), &Response::new(200, "a1")).await.unwrap();
        db.put_entry(p, &get("/b"), &Response::new(200, "b1")).await.unwrap();
        db.put_entry(p, &get("/a"), &Response::new(200, "a2")).await.unwrap();

        assert_eq!(db.count_entries(p).await.unwrap(), 2);
        let keys = db.entry_keys(p).await.unwrap();
        assert_eq!(keys, vec![request_key(&get("/a")), request_key(&get("/b"))]);

        let a = db.get_entry(p, &keys[0]).await.unwrap().unwrap();
        assert_eq!(a.response.text(), "a2");
    }

    #[tokio::test]
    async fn test_drop_partition_removes_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_entry("v1/app/images", &get("/x.png"), &Response::new(200, "x"))
            .await
            .unwrap();

        assert!(db.drop_partition("v1/app/images").await.unwrap());
        assert!(!db.drop_partition("v1/app/images").await.unwrap());
        assert_eq!(db.count_entries("v1/app/images").await.unwrap(), 0);
        assert!(db.entries_for_url("https://example.com/x.png").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_entries_for_url_across_partitions() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let request = get("/shared.svg");
        db.put_entry("v1/app/static", &request, &Response::new(200, "s")).await.unwrap();
        db.put_entry("v1/app/images", &request, &Response::new(200, "i")).await.unwrap();

        let entries = db.entries_for_url("https://example.com/shared.svg").await.unwrap();
        let partitions: Vec<&str> = entries.iter().map(|e| e.partition.as_str()).collect();
        assert_eq!(partitions, vec!["v1/app/static", "v1/app/images"]);
    }

    #[tokio::test]
    async fn test_entries_for_url_ignores_fragment() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_entry("v1/app/pages", &get("/post#comments"), &Response::new(200, "p"))
            .await
            .unwrap();

        let entries = db.entries_for_url("https://example.com/post").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].url, "https://example.com/post");
    }

    #[tokio::test]
    async fn test_delete_entry() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let request = get("/gone");
        db.put_entry("v1/app/pages", &request, &Response::new(200, "")).await.unwrap();

        assert!(db.delete_entry("v1/app/pages", &request_key(&request)).await.unwrap());
        assert!(!db.delete_entry("v1/app/pages", &request_key(&request)).await.unwrap());
    }
}
