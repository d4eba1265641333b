use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode};
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    dao::{
        models::{Revision, StoredRoom},
        room_store::RoomStore,
        storage::{StorageError, StorageResult},
    },
    state::room::Room,
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{
        AllDocsResponse, CouchPublicMarker, CouchRoomDocument, END_SUFFIX, PUBLIC_PREFIX,
        RevisionOnly, WriteResponse, public_doc_id, room_doc_id,
    },
};

/// Attempts made to delete a document that keeps being rewritten underneath us.
const DELETE_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub struct CouchRoomStore {
    client: Client,
    base_url: Arc<str>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
}

impl CouchRoomStore {
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
        };

        store.ensure_database().await?;
        Ok(store)
    }

    fn database_url(&self) -> String {
        format!("{}/{}", self.base_url, self.database)
    }

    fn with_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.auth {
            Some((ref user, ref pass)) => builder.basic_auth(user.as_ref(), Some(pass.as_ref())),
            None => builder,
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.database_url(), path);
        self.with_auth(self.client.request(method, url))
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.database.to_string();
        let url = self.database_url();

        let response = self
            .with_auth(self.client.get(&url))
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
                    .with_auth(self.client.put(&url))
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

    async fn get_document<T>(&self, doc_id: &str) -> CouchResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::GET, doc_id)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                response.json::<T>().await.map(Some).map_err(|source| {
                    CouchDaoError::DecodeResponse {
                        path: doc_id.to_string(),
                        source,
                    }
                })
            }
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    /// PUT a document; CouchDB rejects it with 409 when its `_rev` is stale.
    async fn put_document<T>(&self, doc_id: &str, document: &T) -> CouchResult<String>
    where
        T: ?Sized + Serialize,
    {
        let response = self
            .request(Method::PUT, doc_id)
            .json(document)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::CONFLICT => Err(CouchDaoError::Conflict {
                path: doc_id.to_string(),
            }),
            status if status.is_success() => response
                .json::<WriteResponse>()
                .await
                .map(|body| body.rev)
                .map_err(|source| CouchDaoError::DecodeResponse {
                    path: doc_id.to_string(),
                    source,
                }),
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    /// Delete whatever revision of the document is current; absent documents are fine.
    async fn delete_document(&self, doc_id: &str) -> CouchResult<()> {
        for _ in 0..DELETE_ATTEMPTS {
            let Some(current) = self.get_document::<RevisionOnly>(doc_id).await? else {
                return Ok(());
            };

            let response = self
                .request(Method::DELETE, doc_id)
                .query(&[("rev", current.rev)])
                .send()
                .await
                .map_err(|source| CouchDaoError::RequestSend {
                    path: doc_id.to_string(),
                    source,
                })?;

            match response.status() {
                StatusCode::CONFLICT => continue,
                StatusCode::NOT_FOUND => return Ok(()),
                status if status.is_success() => return Ok(()),
                other => {
                    return Err(CouchDaoError::RequestStatus {
                        path: doc_id.to_string(),
                        status: other,
                    });
                }
            }
        }
        Err(CouchDaoError::Conflict {
            path: doc_id.to_string(),
        })
    }

    async fn list_document_ids(&self, prefix: &str) -> CouchResult<Vec<String>> {
        const ALL_DOCS: &str = "_all_docs";
        let query = [
            ("startkey", format!("\"{}\"", prefix)),
            ("endkey", format!("\"{}{}\"", prefix, END_SUFFIX)),
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

        let payload = response.json::<AllDocsResponse>().await.map_err(|source| {
            CouchDaoError::DecodeResponse {
                path: ALL_DOCS.to_string(),
                source,
            }
        })?;

        Ok(payload.rows.into_iter().map(|row| row.id).collect())
    }
}

impl RoomStore for CouchRoomStore {
    fn load(&self, room_id: &str) -> BoxFuture<'static, StorageResult<Option<StoredRoom>>> {
        let store = self.clone();
        let doc_id = room_doc_id(room_id);
        Box::pin(async move {
            let maybe_doc = store.get_document::<CouchRoomDocument>(&doc_id).await?;
            Ok(maybe_doc.map(|doc| StoredRoom {
                revision: Revision::new(doc.rev.unwrap_or_default()),
                room: doc.room,
            }))
        })
    }

    fn save(
        &self,
        room: Room,
        expected: Option<Revision>,
    ) -> BoxFuture<'static, StorageResult<Revision>> {
        let store = self.clone();
        Box::pin(async move {
            let room_id = room.id.clone();
            let doc_id = room_doc_id(&room_id);
            let doc = CouchRoomDocument {
                id: doc_id.clone(),
                rev: expected.map(|revision| revision.as_str().to_string()),
                room,
            };
            match store.put_document(&doc_id, &doc).await {
                Ok(rev) => Ok(Revision::new(rev)),
                Err(CouchDaoError::Conflict { .. }) => Err(StorageError::Conflict { room_id }),
                Err(other) => Err(other.into()),
            }
        })
    }

    fn delete(&self, room_id: &str) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let room_id = room_id.to_string();
        Box::pin(async move {
            store.delete_document(&room_doc_id(&room_id)).await?;
            store
                .delete_document(&public_doc_id(&room_id))
                .await
                .map_err(Into::into)
        })
    }

    fn add_public(&self, room_id: &str) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let room_id = room_id.to_string();
        Box::pin(async move {
            let marker = CouchPublicMarker {
                id: public_doc_id(&room_id),
                room_id,
            };
            match store.put_document(&marker.id, &marker).await {
                // Already listed.
                Ok(_) | Err(CouchDaoError::Conflict { .. }) => Ok(()),
                Err(other) => Err(other.into()),
            }
        })
    }

    fn remove_public(&self, room_id: &str) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let doc_id = public_doc_id(room_id);
        Box::pin(async move { store.delete_document(&doc_id).await.map_err(Into::into) })
    }

    fn list_public(&self) -> BoxFuture<'static, StorageResult<Vec<String>>> {
        let store = self.clone();
        Box::pin(async move {
            let ids = store.list_document_ids(PUBLIC_PREFIX).await?;
            Ok(ids
                .into_iter()
                .filter_map(|id| id.strip_prefix(PUBLIC_PREFIX).map(str::to_string))
                .collect())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let url = store.database_url();
            let response = store
                .with_auth(store.client.get(&url))
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
