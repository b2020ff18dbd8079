use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::from_value;
use tracing::{debug, warn};

use crate::dao::{
    kv_store::{KvListing, KvStore, KvValue, ListedKey, PutOptions, memory::DEFAULT_LIST_LIMIT},
    models::now_millis,
    storage::StorageResult,
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{AllDocsResponse, AllDocsRow, CouchKvDocument, END_SUFFIX, encode_doc_id},
};

/// KV store persisting every key as a CouchDB document.
#[derive(Clone)]
pub struct CouchKvStore {
    client: Client,
    base_url: Arc<str>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
    list_limit: usize,
}

impl CouchKvStore {
    /// Establish a connection to CouchDB and ensure the database exists.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let base_url = Arc::<str>::from(config.base_url.trim_end_matches('/'));
        let database = Arc::<str>::from(config.database);
        let auth = config
            .username
            .zip(config.password)
            .map(|(u, p)| (Arc::<str>::from(u), Arc::<str>::from(p)));

        let store = Self {
            client,
            base_url,
            database,
            auth,
            list_limit: DEFAULT_LIST_LIMIT,
        };

        store.ensure_database().await?;
        Ok(store)
    }

    /// Return at most `list_limit` keys per listing call.
    pub fn with_list_limit(mut self, list_limit: usize) -> Self {
        self.list_limit = list_limit.max(1);
        self
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}/{}", self.base_url, self.database, path);
        let builder = self.client.request(method, url);
        if let Some((ref user, ref pass)) = self.auth {
            builder.basic_auth(user.as_ref(), Some(pass.as_ref()))
        } else {
            builder
        }
    }

    fn database_request(&self, method: Method) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.base_url, self.database);
        let builder = self.client.request(method, url);
        if let Some((ref user, ref pass)) = self.auth {
            builder.basic_auth(user.as_ref(), Some(pass.as_ref()))
        } else {
            builder
        }
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.database.to_string();
        let response = self
            .database_request(Method::GET)
            .send()
            .await
            .map_err(|source| CouchDaoError::DatabaseQuery {
                database: database.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let create = self
                    .database_request(Method::PUT)
                    .send()
                    .await
                    .map_err(|source| CouchDaoError::DatabaseCreate {
                        database: database.clone(),
                        source,
                    })?;
                if create.status().is_success() {
                    Ok(())
                } else {
                    Err(CouchDaoError::DatabaseStatus {
                        database,
                        status: create.status(),
                    })
                }
            }
            other => Err(CouchDaoError::DatabaseStatus {
                database,
                status: other,
            }),
        }
    }

    async fn get_document<T>(&self, key: &str) -> CouchResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let doc_id = encode_doc_id(key);
        let response = self
            .request(Method::GET, &doc_id)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .json::<T>()
                .await
                .map(Some)
                .map_err(|source| CouchDaoError::DecodeResponse {
                    path: doc_id,
                    source,
                }),
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id,
                status: other,
            }),
        }
    }

    /// Fetch a live document; expired documents read as absent and are purged.
    async fn get_live(&self, key: &str) -> CouchResult<Option<CouchKvDocument>> {
        match self.get_document::<CouchKvDocument>(key).await? {
            Some(doc) if doc.is_expired(now_millis()) => {
                self.purge(&doc).await;
                Ok(None)
            }
            doc => Ok(doc),
        }
    }

    /// Best-effort removal of an expired document. A concurrent purge or rewrite wins.
    async fn purge(&self, doc: &CouchKvDocument) {
        let Some(rev) = doc.rev.as_deref() else {
            return;
        };
        match self.delete_revision(&doc.id, rev).await {
            Ok(()) => debug!(key = %doc.id, "purged expired document"),
            Err(err) => warn!(key = %doc.id, error = %err, "failed to purge expired document"),
        }
    }

    async fn put_document<T>(&self, key: &str, document: &T) -> CouchResult<()>
    where
        T: ?Sized + Serialize,
    {
        let doc_id = encode_doc_id(key);
        let response = self
            .request(Method::PUT, &doc_id)
            .json(document)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.clone(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(CouchDaoError::RequestStatus {
                path: doc_id,
                status: response.status(),
            })
        }
    }

    async fn put_entry(&self, key: String, value: String, options: PutOptions) -> CouchResult<()> {
        let rev = self
            .get_document::<CouchKvDocument>(&key)
            .await?
            .and_then(|existing| existing.rev);
        let expires_at = options
            .expiration_ttl
            .map(|ttl| now_millis().saturating_add(ttl.as_millis()));
        let mut doc = CouchKvDocument {
            id: key.clone(),
            rev,
            value,
            metadata: options.metadata,
            expires_at,
        };

        match self.put_document(&key, &doc).await {
            // Another writer updated the key between our read and write; last write wins.
            Err(CouchDaoError::RequestStatus { status, .. }) if status == StatusCode::CONFLICT => {
                debug!(%key, "revision conflict; retrying with the current revision");
                doc.rev = self
                    .get_document::<CouchKvDocument>(&key)
                    .await?
                    .and_then(|existing| existing.rev);
                self.put_document(&key, &doc).await
            }
            result => result,
        }
    }

    async fn delete_entry(&self, key: &str) -> CouchResult<()> {
        let Some(rev) = self
            .get_document::<CouchKvDocument>(key)
            .await?
            .and_then(|existing| existing.rev)
        else {
            return Ok(());
        };
        self.delete_revision(key, &rev).await
    }

    async fn delete_revision(&self, key: &str, rev: &str) -> CouchResult<()> {
        let doc_id = encode_doc_id(key);
        let response = self
            .request(Method::DELETE, &doc_id)
            .query(&[("rev", rev)])
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(()),
            status if status.is_success() => Ok(()),
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id,
                status: other,
            }),
        }
    }

    /// Rows of `_all_docs` under `prefix`, starting at `start` inclusive.
    async fn fetch_rows(
        &self,
        prefix: &str,
        start: &str,
        limit: usize,
    ) -> CouchResult<Vec<AllDocsRow>> {
        const ALL_DOCS: &str = "_all_docs";
        let query = [
            ("include_docs", "true".to_string()),
            ("startkey", json_key(start)),
            ("endkey", json_key(&format!("{prefix}{END_SUFFIX}"))),
            ("limit", limit.to_string()),
        ];

        let response = self
            .request(Method::GET, ALL_DOCS)
            .query(&query)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: ALL_DOCS.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(CouchDaoError::RequestStatus {
                path: ALL_DOCS.to_string(),
                status: response.status(),
            });
        }

        response
            .json::<AllDocsResponse>()
            .await
            .map(|payload| payload.rows)
            .map_err(|source| CouchDaoError::DecodeResponse {
                path: ALL_DOCS.to_string(),
                source,
            })
    }

    /// Collect live keys after `cursor`, paging past expired documents and purging them.
    async fn list_entries(&self, prefix: &str, cursor: Option<&str>) -> CouchResult<KvListing> {
        // One extra live key tells us whether the listing was truncated.
        let page_size = self.list_limit + 1;
        let mut after = cursor.map(str::to_string);
        let mut keys = Vec::new();

        loop {
            let start = after.as_deref().unwrap_or(prefix);
            let rows = self.fetch_rows(prefix, start, page_size).await?;
            let exhausted = rows.len() < page_size;
            let now = now_millis();

            for row in rows {
                if after.as_deref() == Some(row.id.as_str()) {
                    continue;
                }
                after = Some(row.id.clone());
                let Some(doc) = row.doc else {
                    continue;
                };
                let doc: CouchKvDocument =
                    from_value(doc).map_err(|source| CouchDaoError::DeserializeValue {
                        path: row.id,
                        source,
                    })?;
                if doc.is_expired(now) {
                    self.purge(&doc).await;
                    continue;
                }
                keys.push(ListedKey {
                    name: doc.id,
                    metadata: doc.metadata,
                });
            }

            if exhausted || keys.len() > self.list_limit {
                break;
            }
        }

        let list_complete = keys.len() <= self.list_limit;
        keys.truncate(self.list_limit);
        let cursor = if list_complete {
            None
        } else {
            keys.last().map(|key| key.name.clone())
        };

        Ok(KvListing {
            keys,
            list_complete,
            cursor,
        })
    }
}

fn json_key(key: &str) -> String {
    serde_json::Value::String(key.to_string()).to_string()
}

impl KvStore for CouchKvStore {
    fn get(&self, key: String) -> BoxFuture<'static, StorageResult<Option<String>>> {
        let store = self.clone();
        Box::pin(async move {
            let doc = store.get_live(&key).await?;
            Ok(doc.map(|doc| doc.value))
        })
    }

    fn get_with_metadata(&self, key: String) -> BoxFuture<'static, StorageResult<Option<KvValue>>> {
        let store = self.clone();
        Box::pin(async move {
            let doc = store.get_live(&key).await?;
            Ok(doc.map(|doc| KvValue {
                value: doc.value,
                metadata: doc.metadata,
            }))
        })
    }

    fn put(
        &self,
        key: String,
        value: String,
        options: PutOptions,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.put_entry(key, value, options).await.map_err(Into::into) })
    }

    fn list(
        &self,
        prefix: String,
        cursor: Option<String>,
    ) -> BoxFuture<'static, StorageResult<KvListing>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_entries(&prefix, cursor.as_deref())
                .await
                .map_err(Into::into)
        })
    }

    fn delete(&self, key: String) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.delete_entry(&key).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let url = format!("{}/{}", store.base_url, store.database);
            let response = store
                .database_request(Method::GET)
                .send()
                .await
                .map_err(|source| CouchDaoError::RequestSend {
                    path: url.clone(),
                    source,
                })?;

            if response.status().is_success() {
                Ok(())
            } else {
                Err(CouchDaoError::RequestStatus {
                    path: url,
                    status: response.status(),
                }
                .into())
            }
        })
    }
}
