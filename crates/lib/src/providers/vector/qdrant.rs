//! # Qdrant Knowledge Store
//!
//! Stores question/SQL pairs, DDL and documentation in three Qdrant collections,
//! talking to the REST API directly. Point ids are UUID v5 of the stored content,
//! so training on the same material twice overwrites instead of duplicating.

use crate::{
    config::VectorStoreConfig,
    constants::{
        DDL_COLLECTION, DDL_ID_SUFFIX, DOCUMENTATION_COLLECTION, DOCUMENTATION_ID_SUFFIX,
        SQL_COLLECTION, SQL_ID_SUFFIX,
    },
    errors::ChatError,
    providers::{ai::Embedder, vector::KnowledgeStore},
    types::{QuestionSql, TrainingData, TrainingDataKind},
};
use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Map, Value};
use std::{
    collections::HashSet,
    fmt::{self, Debug},
    sync::Arc,
};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

const SCROLL_PAGE_SIZE: usize = 100;

// --- Qdrant response envelopes ---

#[derive(Deserialize, Debug)]
struct QdrantResponse<T> {
    result: T,
}

#[derive(Deserialize, Debug)]
struct ScoredPoint {
    #[serde(default)]
    payload: Map<String, Value>,
}

#[derive(Deserialize, Debug)]
struct ScrollResult {
    points: Vec<RecordPoint>,
    #[serde(default)]
    next_page_offset: Option<Value>,
}

#[derive(Deserialize, Debug)]
struct RecordPoint {
    id: Value,
    #[serde(default)]
    payload: Map<String, Value>,
}

// --- Qdrant store implementation ---

/// A knowledge store backed by a Qdrant server.
#[derive(Clone)]
pub struct QdrantStore {
    client: ReqwestClient,
    base_url: String,
    api_key: Option<String>,
    embedder: Arc<dyn Embedder>,
    n_results: usize,
    /// Collections known to exist, so creation is attempted once per process.
    ready_collections: Arc<RwLock<HashSet<String>>>,
}

impl QdrantStore {
    /// Creates a new `QdrantStore`.
    ///
    /// Fails with [`ChatError::VectorStoreConnection`] if no host is configured.
    pub fn new(
        config: &VectorStoreConfig,
        embedder: Arc<dyn Embedder>,
        n_results: usize,
    ) -> Result<Self, ChatError> {
        let base_url = config
            .url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                ChatError::VectorStoreConnection(
                    "QDRANT_HOST is not set; cannot reach the vector store.".to_string(),
                )
            })?
            .trim_end_matches('/')
            .to_string();
        let client = ReqwestClient::builder()
            .build()
            .map_err(ChatError::ReqwestClientBuild)?;
        info!("Configured Qdrant knowledge store at {base_url}");
        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone().filter(|key| !key.trim().is_empty()),
            embedder,
            n_results,
            ready_collections: Arc::new(RwLock::new(HashSet::new())),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(key) = &self.api_key {
            builder = builder.header("api-key", key);
        }
        builder
    }

    /// Sends a request, returning `None` when the collection does not exist.
    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<Option<T>, ChatError> {
        let response = builder
            .send()
            .await
            .map_err(ChatError::VectorStoreRequest)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ChatError::VectorStoreApi(error_text));
        }
        let body: QdrantResponse<T> = response
            .json()
            .await
            .map_err(ChatError::VectorStoreRequest)?;
        Ok(Some(body.result))
    }

    async fn ensure_collection(&self, collection: &str, dimension: usize) -> Result<(), ChatError> {
        if self.ready_collections.read().await.contains(collection) {
            return Ok(());
        }

        #[derive(Deserialize)]
        struct Exists {
            exists: bool,
        }

        let exists = self
            .send::<Exists>(self.request(
                reqwest::Method::GET,
                &format!("/collections/{collection}/exists"),
            ))
            .await?
            .is_some_and(|e| e.exists);

        if !exists {
            info!(collection, dimension, "Creating Qdrant collection.");
            let body = json!({ "vectors": { "size": dimension, "distance": "Cosine" } });
            self.send::<Value>(
                self.request(reqwest::Method::PUT, &format!("/collections/{collection}"))
                    .json(&body),
            )
            .await?
            .ok_or_else(|| {
                ChatError::VectorStoreApi(format!("Could not create collection '{collection}'"))
            })?;
        }

        self.ready_collections
            .write()
            .await
            .insert(collection.to_string());
        Ok(())
    }

    async fn upsert(
        &self,
        collection: &str,
        id_suffix: &str,
        text_to_embed: &str,
        identity: &str,
        payload: Value,
    ) -> Result<String, ChatError> {
        let vector = self.embedder.embed(text_to_embed).await?;
        self.ensure_collection(collection, vector.len()).await?;

        let point_id = Uuid::new_v5(&Uuid::NAMESPACE_OID, identity.as_bytes());
        let body = json!({
            "points": [{ "id": point_id.to_string(), "vector": vector, "payload": payload }]
        });
        debug!(collection, %point_id, "--> Upserting point into Qdrant");
        self.send::<Value>(
            self.request(
                reqwest::Method::PUT,
                &format!("/collections/{collection}/points?wait=true"),
            )
            .json(&body),
        )
        .await?
        .ok_or_else(|| {
            ChatError::VectorStoreApi(format!("Collection '{collection}' disappeared during upsert"))
        })?;

        Ok(format!("{point_id}{id_suffix}"))
    }

    async fn search(&self, collection: &str, question: &str) -> Result<Vec<Map<String, Value>>, ChatError> {
        // Hosted embedding APIs reject empty text; an empty query takes the first stored points.
        if question.trim().is_empty() {
            return self.first_points(collection).await;
        }
        let vector = self.embedder.embed(question).await?;
        let body = json!({ "vector": vector, "limit": self.n_results, "with_payload": true });
        let points = self
            .send::<Vec<ScoredPoint>>(
                self.request(
                    reqwest::Method::POST,
                    &format!("/collections/{collection}/points/search"),
                )
                .json(&body),
            )
            .await?
            .unwrap_or_default();
        debug!(collection, hits = points.len(), "<-- Qdrant search results");
        Ok(points.into_iter().map(|p| p.payload).collect())
    }

    async fn first_points(&self, collection: &str) -> Result<Vec<Map<String, Value>>, ChatError> {
        let body = json!({ "limit": self.n_results, "with_payload": true, "with_vector": false });
        let points = self
            .send::<ScrollResult>(
                self.request(
                    reqwest::Method::POST,
                    &format!("/collections/{collection}/points/scroll"),
                )
                .json(&body),
            )
            .await?
            .map(|page| page.points)
            .unwrap_or_default();
        debug!(collection, points = points.len(), "<-- Qdrant points for an empty query");
        Ok(points.into_iter().map(|p| p.payload).collect())
    }

    async fn scroll_all(&self, collection: &str) -> Result<Vec<RecordPoint>, ChatError> {
        let mut all = Vec::new();
        let mut offset: Option<Value> = None;
        loop {
            let mut body = json!({
                "limit": SCROLL_PAGE_SIZE,
                "with_payload": true,
                "with_vector": false
            });
            if let Some(next) = offset.take() {
                body["offset"] = next;
            }
            let Some(page) = self
                .send::<ScrollResult>(
                    self.request(
                        reqwest::Method::POST,
                        &format!("/collections/{collection}/points/scroll"),
                    )
                    .json(&body),
                )
                .await?
            else {
                break;
            };
            all.extend(page.points);
            match page.next_page_offset {
                Some(next) if !next.is_null() => offset = Some(next),
                _ => break,
            }
        }
        Ok(all)
    }
}

impl Debug for QdrantStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QdrantStore")
            .field("base_url", &self.base_url)
            .field("n_results", &self.n_results)
            .finish_non_exhaustive()
    }
}

fn payload_str(payload: &Map<String, Value>, key: &str) -> Option<String> {
    payload.get(key).and_then(Value::as_str).map(String::from)
}

fn point_id_text(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl KnowledgeStore for QdrantStore {
    async fn add_question_sql(&self, question: &str, sql: &str) -> Result<String, ChatError> {
        let identity = json!({ "question": question, "sql": sql }).to_string();
        self.upsert(
            SQL_COLLECTION,
            SQL_ID_SUFFIX,
            &format!("{question} {sql}"),
            &identity,
            json!({ "question": question, "sql": sql }),
        )
        .await
    }

    async fn add_ddl(&self, ddl: &str) -> Result<String, ChatError> {
        self.upsert(DDL_COLLECTION, DDL_ID_SUFFIX, ddl, ddl, json!({ "ddl": ddl }))
            .await
    }

    async fn add_documentation(&self, documentation: &str) -> Result<String, ChatError> {
        self.upsert(
            DOCUMENTATION_COLLECTION,
            DOCUMENTATION_ID_SUFFIX,
            documentation,
            documentation,
            json!({ "documentation": documentation }),
        )
        .await
    }

    async fn get_similar_question_sql(
        &self,
        question: &str,
    ) -> Result<Vec<QuestionSql>, ChatError> {
        let payloads = self.search(SQL_COLLECTION, question).await?;
        Ok(payloads
            .iter()
            .filter_map(|p| {
                Some(QuestionSql {
                    question: payload_str(p, "question")?,
                    sql: payload_str(p, "sql")?,
                })
            })
            .collect())
    }

    async fn get_related_ddl(&self, question: &str) -> Result<Vec<String>, ChatError> {
        let payloads = self.search(DDL_COLLECTION, question).await?;
        Ok(payloads.iter().filter_map(|p| payload_str(p, "ddl")).collect())
    }

    async fn get_related_documentation(&self, question: &str) -> Result<Vec<String>, ChatError> {
        let payloads = self.search(DOCUMENTATION_COLLECTION, question).await?;
        Ok(payloads
            .iter()
            .filter_map(|p| payload_str(p, "documentation"))
            .collect())
    }

    async fn get_training_data(&self) -> Result<Vec<TrainingData>, ChatError> {
        let mut data = Vec::new();

        for point in self.scroll_all(SQL_COLLECTION).await? {
            data.push(TrainingData {
                id: format!("{}{SQL_ID_SUFFIX}", point_id_text(&point.id)),
                kind: TrainingDataKind::Sql,
                question: payload_str(&point.payload, "question"),
                content: payload_str(&point.payload, "sql").unwrap_or_default(),
            });
        }
        for point in self.scroll_all(DDL_COLLECTION).await? {
            data.push(TrainingData {
                id: format!("{}{DDL_ID_SUFFIX}", point_id_text(&point.id)),
                kind: TrainingDataKind::Ddl,
                question: None,
                content: payload_str(&point.payload, "ddl").unwrap_or_default(),
            });
        }
        for point in self.scroll_all(DOCUMENTATION_COLLECTION).await? {
            data.push(TrainingData {
                id: format!("{}{DOCUMENTATION_ID_SUFFIX}", point_id_text(&point.id)),
                kind: TrainingDataKind::Documentation,
                question: None,
                content: payload_str(&point.payload, "documentation").unwrap_or_default(),
            });
        }

        Ok(data)
    }

    async fn remove_training_data(&self, id: &str) -> Result<bool, ChatError> {
        let routed = [
            (SQL_ID_SUFFIX, SQL_COLLECTION),
            (DDL_ID_SUFFIX, DDL_COLLECTION),
            (DOCUMENTATION_ID_SUFFIX, DOCUMENTATION_COLLECTION),
        ]
        .into_iter()
        .find_map(|(suffix, collection)| id.strip_suffix(suffix).map(|uuid| (uuid, collection)));

        let Some((point_id, collection)) = routed else {
            return Ok(false);
        };

        info!(collection, point_id, "Removing training data from Qdrant.");
        let deleted = self
            .send::<Value>(
                self.request(
                    reqwest::Method::POST,
                    &format!("/collections/{collection}/points/delete?wait=true"),
                )
                .json(&json!({ "points": [point_id] })),
            )
            .await?;
        Ok(deleted.is_some())
    }
}
