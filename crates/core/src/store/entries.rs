//! Entry CRUD for a single named SQLite store.

use async_trait::async_trait;
use bytes::Bytes;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;
use url::Url;

use super::connection::CacheDb;
use super::{KeyValueStore, RequestKey};
use crate::Error;
use crate::response::ResponseSnapshot;

/// One row of the `entries` table before decoding.
struct EntryRow {
    url: String,
    status_code: i64,
    headers_json: String,
    body: Vec<u8>,
    fetched_at: String,
}

impl EntryRow {
    fn decode(self) -> Result<ResponseSnapshot, Error> {
        let url = Url::parse(&self.url).map_err(|e| Error::CorruptEntry(format!("url {}: {e}", self.url)))?;
        let status = u16::try_from(self.status_code)
            .map_err(|_| Error::CorruptEntry(format!("status {}", self.status_code)))?;
        let headers: Vec<(String, String)> =
            serde_json::from_str(&self.headers_json).map_err(|e| Error::CorruptEntry(format!("headers: {e}")))?;

        Ok(ResponseSnapshot { url, status, headers, body: Bytes::from(self.body), fetched_at: self.fetched_at })
    }
}

/// A named store inside a [`CacheDb`].
#[derive(Clone, Debug)]
pub struct SqliteStore {
    db: CacheDb,
    name: String,
}

impl SqliteStore {
    pub(crate) fn new(db: CacheDb, name: &str) -> Self {
        Self { db, name: name.to_string() }
    }

    /// Number of entries in this store.
    pub async fn count(&self) -> Result<u64, Error> {
        let name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE store_name = ?1", params![name], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &RequestKey) -> Result<Option<ResponseSnapshot>, Error> {
        let name = self.name.clone();
        let hash = key.hash();
        let row = self
            .db
            .conn
            .call(move |conn| -> Result<Option<EntryRow>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT url, status_code, headers_json, body, fetched_at
                     FROM entries WHERE store_name = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![name, hash], |row| {
                    Ok(EntryRow {
                        url: row.get(0)?,
                        status_code: row.get(1)?,
                        headers_json: row.get(2)?,
                        body: row.get(3)?,
                        fetched_at: row.get(4)?,
                    })
                });

                match result {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        row.map(EntryRow::decode).transpose()
    }

    /// Upsert an entry. Writes into a store that has been deleted are
    /// dropped rather than recreating the store.
    async fn put(&self, key: &RequestKey, response: &ResponseSnapshot) -> Result<(), Error> {
        let name = self.name.clone();
        let hash = key.hash();
        let request_key = key.as_str().to_string();
        let url = response.url.to_string();
        let status = i64::from(response.status);
        let headers_json = serde_json::to_string(&response.headers)
            .map_err(|e| Error::InvalidInput(format!("failed to encode headers: {e}")))?;
        let body = response.body.to_vec();
        let fetched_at = response.fetched_at.clone();
        let stored_at = chrono::Utc::now().to_rfc3339();

        let written = self
            .db
            .conn
            .call(move |conn| -> Result<usize, Error> {
                let count = conn.execute(
                    "INSERT INTO entries (
                        store_name, key_hash, request_key, url, status_code,
                        headers_json, body, fetched_at, stored_at
                    )
                    SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9
                    WHERE EXISTS (SELECT 1 FROM stores WHERE name = ?1)
                    ON CONFLICT(store_name, key_hash) DO UPDATE SET
                        request_key = excluded.request_key,
                        url = excluded.url,
                        status_code = excluded.status_code,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        fetched_at = excluded.fetched_at,
                        stored_at = excluded.stored_at",
                    params![name, hash, request_key, url, status, headers_json, body, fetched_at, stored_at],
                )?;
                Ok(count)
            })
            .await
            .map_err(Error::from)?;

        if written == 0 {
            tracing::debug!(store = %self.name, key = %key, "store no longer exists; write dropped");
        }

        Ok(())
    }

    async fn delete(&self, key: &RequestKey) -> Result<bool, Error> {
        let name = self.name.clone();
        let hash = key.hash();
        self.db
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let count =
                    conn.execute("DELETE FROM entries WHERE store_name = ?1 AND key_hash = ?2", params![name, hash])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        let name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT request_key FROM entries WHERE store_name = ?1")?;
                let keys = stmt
                    .query_map(params![name], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    async fn clear(&self) -> Result<u64, Error> {
        let name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM entries WHERE store_name = ?1", params![name])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
