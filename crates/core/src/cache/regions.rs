//! Region and entry CRUD operations.
//!
//! Regions are versioned, isolated cache namespaces. Callers treat exactly
//! one region tag as current; superseded regions are swept out at
//! activation via [`CacheDb::evict_all_except`].

use super::connection::CacheDb;
use super::key::RequestIdentity;
use super::snapshot::ResponseSnapshot;
use crate::Error;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

impl CacheDb {
    /// Ensure the region for a version tag exists.
    ///
    /// Idempotent: opening an existing region is a no-op.
    pub async fn open_region(&self, tag: &str) -> Result<(), Error> {
        let tag = tag.to_string();
        let created_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO regions (tag, created_at) VALUES (?1, ?2)",
                    params![tag, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Store a response snapshot under a request identity.
    ///
    /// Uses UPSERT semantics: an existing entry with the same identity is
    /// overwritten. The snapshot is cloned before the write so the caller's
    /// copy stays consumable.
    pub async fn put_entry(&self, tag: &str, identity: &RequestIdentity, snapshot: &ResponseSnapshot) -> Result<(), Error> {
        let tag = tag.to_string();
        let identity = identity.clone();
        let snapshot = snapshot.clone();
        let headers_json = snapshot
            .headers_json()
            .map_err(|e| Error::CorruptEntry(e.to_string()))?;
        let stored_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO entries (
                        region_tag, identity, method, url, status, status_text,
                        headers_json, body, stored_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                    ON CONFLICT(region_tag, identity) DO UPDATE SET
                        method = excluded.method,
                        url = excluded.url,
                        status = excluded.status,
                        status_text = excluded.status_text,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![
                        &tag,
                        identity.key(),
                        &identity.method,
                        &identity.url,
                        snapshot.status as i64,
                        &snapshot.status_text,
                        &headers_json,
                        &snapshot.body,
                        &stored_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up a cached snapshot by request identity.
    ///
    /// Returns None on a miss. Never touches the network.
    pub async fn get_entry(&self, tag: &str, identity: &RequestIdentity) -> Result<Option<ResponseSnapshot>, Error> {
        let tag = tag.to_string();
        let key = identity.key();
        self.conn
            .call(move |conn| -> Result<Option<ResponseSnapshot>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT status, status_text, headers_json, body
                     FROM entries WHERE region_tag = ?1 AND identity = ?2",
                )?;

                let result = stmt.query_row(params![tag, key], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Vec<u8>>(3)?,
                    ))
                });

                match result {
                    Ok((status, status_text, headers_json, body)) => {
                        let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)
                            .map_err(|e| Error::CorruptEntry(e.to_string()))?;
                        Ok(Some(ResponseSnapshot::new(status as u16, status_text, headers, body)))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// List all known region tags.
    pub async fn list_regions(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT tag FROM regions ORDER BY tag")?;
                let tags = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(tags)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every region whose tag differs from `current`.
    ///
    /// Best-effort, all-settle: a failed per-region delete is logged and the
    /// sweep continues. Entries go with their region (ON DELETE CASCADE).
    /// Returns the number of regions removed.
    pub async fn evict_all_except(&self, current: &str) -> Result<u64, Error> {
        let stale: Vec<String> = self
            .list_regions()
            .await?
            .into_iter()
            .filter(|tag| tag != current)
            .collect();

        let mut deleted = 0u64;
        for tag in stale {
            let tag_param = tag.clone();
            let result = self
                .conn
                .call(move |conn| -> Result<usize, Error> {
                    Ok(conn.execute("DELETE FROM regions WHERE tag = ?1", params![tag_param])?)
                })
                .await
                .map_err(Error::from);

            match result {
                Ok(n) => deleted += n as u64,
                Err(e) => tracing::warn!(region = %tag, error = %e, "failed to evict stale region"),
            }
        }

        Ok(deleted)
    }

    /// Number of entries stored in a region.
    pub async fn count_entries(&self, tag: &str) -> Result<u64, Error> {
        let tag = tag.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE region_tag = ?1", params![tag], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_snapshot(body: &str) -> ResponseSnapshot {
        ResponseSnapshot::new(
            200,
            "OK",
            vec![("Content-Type".to_string(), "text/html".to_string())],
            body.as_bytes().to_vec(),
        )
    }

    #[tokio::test]
    async fn test_open_region_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_region("vigil-v1").await.unwrap();
        db.open_region("vigil-v1").await.unwrap();
        assert_eq!(db.list_regions().await.unwrap(), vec!["vigil-v1".to_string()]);
    }

    #[tokio::test]
    async fn test_put_and_get_entry() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_region("vigil-v1").await.unwrap();

        let identity = RequestIdentity::get("https://app.example/index.html");
        let snapshot = make_snapshot("<html>shell</html>");
        db.put_entry("vigil-v1", &identity, &snapshot).await.unwrap();

        let cached = db.get_entry("vigil-v1", &identity).await.unwrap().unwrap();
        assert_eq!(cached, snapshot);
    }

    #[tokio::test]
    async fn test_get_entry_miss() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_region("vigil-v1").await.unwrap();
        let identity = RequestIdentity::get("https://app.example/missing");
        assert!(db.get_entry("vigil-v1", &identity).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_entry_overwrites() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_region("vigil-v1").await.unwrap();

        let identity = RequestIdentity::get("https://app.example/data");
        db.put_entry("vigil-v1", &identity, &make_snapshot("old")).await.unwrap();
        db.put_entry("vigil-v1", &identity, &make_snapshot("new")).await.unwrap();

        let cached = db.get_entry("vigil-v1", &identity).await.unwrap().unwrap();
        assert_eq!(cached.body, b"new");
        assert_eq!(db.count_entries("vigil-v1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_regions_are_isolated() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_region("vigil-v1").await.unwrap();
        db.open_region("vigil-v2").await.unwrap();

        let identity = RequestIdentity::get("https://app.example/index.html");
        db.put_entry("vigil-v1", &identity, &make_snapshot("v1")).await.unwrap();

        assert!(db.get_entry("vigil-v2", &identity).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_evict_all_except_keeps_current() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_region("vigil-v1").await.unwrap();
        db.open_region("vigil-v2").await.unwrap();
        db.open_region("vigil-v3").await.unwrap();

        let identity = RequestIdentity::get("https://app.example/index.html");
        db.put_entry("vigil-v1", &identity, &make_snapshot("old")).await.unwrap();
        db.put_entry("vigil-v3", &identity, &make_snapshot("current")).await.unwrap();

        let deleted = db.evict_all_except("vigil-v3").await.unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(db.list_regions().await.unwrap(), vec!["vigil-v3".to_string()]);

        // entries cascade with their region
        let cached = db.get_entry("vigil-v3", &identity).await.unwrap().unwrap();
        assert_eq!(cached.body, b"current");
        assert!(db.get_entry("vigil-v1", &identity).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_evict_all_except_no_stale_regions() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_region("vigil-v1").await.unwrap();
        assert_eq!(db.evict_all_except("vigil-v1").await.unwrap(), 0);
    }
}
