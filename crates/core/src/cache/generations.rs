//! SQLite-backed cache generations.

use async_trait::async_trait;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension};

use super::connection::CacheDb;
use super::key::compute_entry_key;
use super::storage::{CacheRequest, CacheStorage, MatchOptions, StoredResponse};
use crate::Error;

const SELECT_ENTRY: &str = "SELECT method, url, status, headers_json, body, stored_at FROM entries";

fn row_to_response(row: &rusqlite::Row<'_>) -> rusqlite::Result<(StoredResponse, String)> {
    let headers_json: String = row.get(3)?;
    Ok((
        StoredResponse {
            method: row.get(0)?,
            url: row.get(1)?,
            status: row.get(2)?,
            headers: Vec::new(),
            body: row.get(4)?,
            stored_at: row.get(5)?,
        },
        headers_json,
    ))
}

fn decode(pair: Option<(StoredResponse, String)>) -> Result<Option<StoredResponse>, Error> {
    match pair {
        Some((mut response, headers_json)) => {
            response.headers = serde_json::from_str(&headers_json)?;
            Ok(Some(response))
        }
        None => Ok(None),
    }
}

#[async_trait]
impl CacheStorage for CacheDb {
    async fn open(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let inserted = conn.execute(
                    "INSERT INTO generations (name, created_at) VALUES (?1, ?2)
                     ON CONFLICT(name) DO NOTHING",
                    params![name, now],
                )?;
                Ok(inserted > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn add_all(&self, name: &str, responses: Vec<StoredResponse>) -> Result<(), Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        let rows = responses
            .into_iter()
            .map(|r| {
                let headers_json = serde_json::to_string(&r.headers)?;
                Ok::<_, Error>((r, headers_json))
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT INTO generations (name, created_at) VALUES (?1, ?2)
                     ON CONFLICT(name) DO NOTHING",
                    params![name, now],
                )?;
                {
                    let mut stmt = tx.prepare(
                        "INSERT INTO entries (
                            key_hash, generation, method, url, search_free_url,
                            status, headers_json, body, stored_at
                        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                        ON CONFLICT(key_hash) DO UPDATE SET
                            status = excluded.status,
                            headers_json = excluded.headers_json,
                            body = excluded.body,
                            stored_at = excluded.stored_at",
                    )?;
                    for (response, headers_json) in &rows {
                        let request = response.request();
                        stmt.execute(params![
                            compute_entry_key(&name, &request.method, &request.url),
                            &name,
                            &request.method,
                            &request.url,
                            request.search_free_url(),
                            response.status,
                            headers_json,
                            &response.body,
                            &response.stored_at,
                        ])?;
                    }
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn match_request(
        &self, name: &str, request: &CacheRequest, options: MatchOptions,
    ) -> Result<Option<StoredResponse>, Error> {
        let name = name.to_string();
        let request = request.clone();
        let pair = self
            .conn
            .call(move |conn| -> Result<Option<(StoredResponse, String)>, Error> {
                let found = if options.ignore_search {
                    conn.query_row(
                        &format!(
                            "{SELECT_ENTRY} WHERE generation = ?1 AND method = ?2 AND search_free_url = ?3
                             ORDER BY (url = ?4) DESC, url LIMIT 1"
                        ),
                        params![name, request.method, request.search_free_url(), request.url],
                        row_to_response,
                    )
                } else {
                    conn.query_row(
                        &format!("{SELECT_ENTRY} WHERE key_hash = ?1"),
                        params![compute_entry_key(&name, &request.method, &request.url)],
                        row_to_response,
                    )
                };
                Ok(found.optional()?)
            })
            .await
            .map_err(Error::from)?;

        decode(pair)
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM generations WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM generations ORDER BY name")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn requests(&self, name: &str) -> Result<Vec<CacheRequest>, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<CacheRequest>, Error> {
                let mut stmt = conn.prepare("SELECT method, url FROM entries WHERE generation = ?1 ORDER BY url")?;
                let requests = stmt
                    .query_map(params![name], |row| {
                        Ok(CacheRequest { method: row.get(0)?, url: row.get(1)? })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(requests)
            })
            .await
            .map_err(Error::from)
    }
}
