//! # Document Store Module
//!
//! Revisioned key/value access to the external document store. Every document
//! read comes back wrapped in [`Versioned`], and every write of an existing
//! document must present the revision that was read. A stale revision is
//! reported as [`RelayError::Conflict`]: another writer got there first, and
//! the caller decides what to tell the user. Nothing here retries.

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::errors::RelayError;
use crate::http_client::ExternalService;
use crate::records::Collection;

const SERVICE: &str = "document-store";

/// Opaque revision token issued by the store on every read and write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision(String);

impl Revision {
    /// Wrap a token issued by a store implementation
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A document value together with the revision it was read at
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    revision: Revision,
    pub value: T,
}

impl<T> Versioned<T> {
    pub fn new(revision: Revision, value: T) -> Self {
        Self { revision, value }
    }

    pub fn revision(&self) -> &Revision {
        &self.revision
    }

    /// Keep the revision, transform the value
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Versioned<U> {
        Versioned {
            revision: self.revision,
            value: f(self.value),
        }
    }
}

/// Revisioned document store
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Current value and revision, `None` when the document does not exist
    async fn fetch(&self, collection: Collection, id: &str) -> Result<Option<Versioned<Value>>, RelayError>;

    /// Create a document; `Conflict` when the id is already taken
    async fn create(&self, collection: Collection, id: &str, doc: Value) -> Result<Revision, RelayError>;

    /// Overwrite a document, accepted only if `revision` is still current
    async fn update(
        &self,
        collection: Collection,
        id: &str,
        doc: Value,
        revision: &Revision,
    ) -> Result<Revision, RelayError>;
}

/// Fetch and decode a typed record
pub async fn fetch_record<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: Collection,
    id: &str,
) -> Result<Option<Versioned<T>>, RelayError> {
    let Some(versioned) = store.fetch(collection, id).await? else {
        return Ok(None);
    };
    let revision = versioned.revision().clone();
    let value = serde_json::from_value(versioned.value)
        .map_err(|e| RelayError::decode(SERVICE, format!("{collection}/{id}: {e}")))?;
    Ok(Some(Versioned::new(revision, value)))
}

/// Create a typed record
pub async fn create_record<T: Serialize + Sync>(
    store: &dyn DocumentStore,
    collection: Collection,
    id: &str,
    record: &T,
) -> Result<Revision, RelayError> {
    let doc = serde_json::to_value(record).map_err(|e| RelayError::decode(SERVICE, e.to_string()))?;
    store.create(collection, id, doc).await
}

/// Write back a record read earlier, guarded by the revision it was read at
pub async fn update_record<T: Serialize + Sync>(
    store: &dyn DocumentStore,
    collection: Collection,
    id: &str,
    record: &Versioned<T>,
) -> Result<Revision, RelayError> {
    let doc = serde_json::to_value(&record.value).map_err(|e| RelayError::decode(SERVICE, e.to_string()))?;
    store.update(collection, id, doc, record.revision()).await
}

#[derive(Debug, Deserialize)]
struct WriteResponse {
    #[serde(default)]
    ok: bool,
    rev: Option<String>,
}

/// Cloudant/CouchDB-style store reached over HTTP with basic auth
#[derive(Debug)]
pub struct CloudantStore {
    service: ExternalService,
    base_url: Url,
    auth: String,
}

impl CloudantStore {
    pub fn new(service: ExternalService, base_url: &str, auth: &str) -> Result<Self, RelayError> {
        let base_url = Url::parse(base_url).map_err(|e| RelayError::decode(SERVICE, format!("bad store url: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(RelayError::decode(SERVICE, "store url cannot be a base"));
        }
        Ok(Self {
            service,
            base_url,
            auth: format!("Basic {auth}"),
        })
    }

    fn document_url(&self, collection: Collection, id: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(collection.as_str());
            if let Some(id) = id {
                segments.push(id);
            }
        }
        url
    }

    async fn read_write_response(
        &self,
        response: reqwest::Response,
        collection: Collection,
        id: &str,
    ) -> Result<Revision, RelayError> {
        if response.status() == StatusCode::CONFLICT {
            tracing::info!(collection = %collection, id = %id, "Document store reported a revision conflict");
            return Err(RelayError::Conflict {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        let response = self.service.ensure_success(response).await?;
        let body: WriteResponse = response
            .json()
            .await
            .map_err(|e| RelayError::decode(SERVICE, e.to_string()))?;
        match (body.ok, body.rev) {
            (true, Some(rev)) => Ok(Revision::new(rev)),
            _ => Err(RelayError::decode(SERVICE, format!("write to {collection}/{id} not acknowledged"))),
        }
    }
}

#[async_trait]
impl DocumentStore for CloudantStore {
    async fn fetch(&self, collection: Collection, id: &str) -> Result<Option<Versioned<Value>>, RelayError> {
        let request = self
            .service
            .http()
            .get(self.document_url(collection, Some(id)))
            .header(reqwest::header::AUTHORIZATION, &self.auth);
        let response = self.service.execute(request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = self.service.ensure_success(response).await?;
        let mut doc: Value = response
            .json()
            .await
            .map_err(|e| RelayError::decode(SERVICE, e.to_string()))?;
        let revision = doc
            .as_object_mut()
            .and_then(|obj| obj.remove("_rev"))
            .and_then(|rev| rev.as_str().map(Revision::new))
            .ok_or_else(|| RelayError::decode(SERVICE, format!("{collection}/{id} has no _rev")))?;
        Ok(Some(Versioned::new(revision, doc)))
    }

    async fn create(&self, collection: Collection, id: &str, mut doc: Value) -> Result<Revision, RelayError> {
        if let Some(obj) = doc.as_object_mut() {
            obj.insert("_id".to_string(), Value::String(id.to_string()));
            obj.remove("_rev");
        }
        let request = self
            .service
            .http()
            .post(self.document_url(collection, None))
            .header(reqwest::header::AUTHORIZATION, &self.auth)
            .json(&doc);
        let response = self.service.execute(request).await?;
        self.read_write_response(response, collection, id).await
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        mut doc: Value,
        revision: &Revision,
    ) -> Result<Revision, RelayError> {
        if let Some(obj) = doc.as_object_mut() {
            obj.insert("_id".to_string(), Value::String(id.to_string()));
            obj.insert("_rev".to_string(), Value::String(revision.to_string()));
        }
        let request = self
            .service
            .http()
            .put(self.document_url(collection, Some(id)))
            .header(reqwest::header::AUTHORIZATION, &self.auth)
            .json(&doc);
        let response = self.service.execute(request).await?;
        self.read_write_response(response, collection, id).await
    }
}

/// In-process store with the same revision semantics as the HTTP store.
/// Selected with `DB_URL=memory://` and used throughout the tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: Mutex<HashMap<(Collection, String), (u64, Value)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a document without any revision check, as an
    /// external writer would (e.g. person records)
    pub fn seed(&self, collection: Collection, id: &str, doc: Value) -> Revision {
        let mut docs = self.lock();
        let generation = docs
            .get(&(collection, id.to_string()))
            .map(|(generation, _)| generation + 1)
            .unwrap_or(1);
        docs.insert((collection, id.to_string()), (generation, doc));
        Self::revision(generation)
    }

    /// Number of documents in a collection
    pub fn count(&self, collection: Collection) -> usize {
        self.lock().keys().filter(|(c, _)| *c == collection).count()
    }

    fn revision(generation: u64) -> Revision {
        Revision::new(format!("{generation}-memory"))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(Collection, String), (u64, Value)>> {
        self.docs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn conflict(collection: Collection, id: &str) -> RelayError {
        RelayError::Conflict {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn fetch(&self, collection: Collection, id: &str) -> Result<Option<Versioned<Value>>, RelayError> {
        Ok(self
            .lock()
            .get(&(collection, id.to_string()))
            .map(|(generation, doc)| Versioned::new(Self::revision(*generation), doc.clone())))
    }

    async fn create(&self, collection: Collection, id: &str, doc: Value) -> Result<Revision, RelayError> {
        let mut docs = self.lock();
        let key = (collection, id.to_string());
        if docs.contains_key(&key) {
            return Err(Self::conflict(collection, id));
        }
        docs.insert(key, (1, doc));
        Ok(Self::revision(1))
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        doc: Value,
        revision: &Revision,
    ) -> Result<Revision, RelayError> {
        let mut docs = self.lock();
        let Some((generation, current)) = docs.get_mut(&(collection, id.to_string())) else {
            return Err(Self::conflict(collection, id));
        };
        if Self::revision(*generation) != *revision {
            return Err(Self::conflict(collection, id));
        }
        *generation += 1;
        *current = doc;
        Ok(Self::revision(*generation))
    }
}
