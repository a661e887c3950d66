/*
 * Copyright 2024 Thaddeus Treloar
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 *
 */

use std::{sync::Arc, time::Duration};

use apache_avro::Schema;
use dashmap::DashMap;
use tracing::debug;

use crate::error::SchemaRegistryError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Resolves writer schemas by their registry id.
pub trait SchemaRegistry {
    fn schema_by_id(&self, id: u32) -> Result<Arc<Schema>, SchemaRegistryError>;
}

impl<R> SchemaRegistry for Arc<R>
where
    R: SchemaRegistry + ?Sized,
{
    fn schema_by_id(&self, id: u32) -> Result<Arc<Schema>, SchemaRegistryError> {
        (**self).schema_by_id(id)
    }
}

#[derive(Debug, serde::Deserialize)]
struct SchemaResponse {
    schema: String,
}

/// Registry client speaking the Confluent REST API. Schema ids are immutable
/// once assigned, so parsed schemas are kept for the lifetime of the client.
#[derive(Debug)]
pub struct HttpSchemaRegistry {
    base_url: String,
    http: reqwest::blocking::Client,
    schemas: DashMap<u32, Arc<Schema>>,
}

impl HttpSchemaRegistry {
    /// Accepts a single url or a comma separated list, in which case the
    /// first entry is used.
    pub fn new(url: &str) -> Result<Self, SchemaRegistryError> {
        let base_url = url
            .split(',')
            .map(str::trim)
            .find(|candidate| !candidate.is_empty())
            .ok_or(SchemaRegistryError::MissingUrl)?
            .trim_end_matches('/')
            .to_owned();

        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(SchemaRegistryError::HttpClientError)?;

        Ok(Self {
            base_url,
            http,
            schemas: Default::default(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn fetch_schema(&self, id: u32) -> Result<Schema, SchemaRegistryError> {
        let url = format!("{}/schemas/ids/{}", self.base_url, id);

        debug!("Fetching schema {} from {}", id, url);

        let response = self
            .http
            .get(&url)
            .send()
            .map_err(|err| SchemaRegistryError::TransportError {
                url: url.clone(),
                err,
            })?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SchemaRegistryError::SchemaNotFound(id));
        }

        if !status.is_success() {
            return Err(SchemaRegistryError::StatusError {
                id,
                status: status.as_u16(),
            });
        }

        let body: SchemaResponse = response
            .json()
            .map_err(|err| SchemaRegistryError::TransportError { url, err })?;

        Schema::parse_str(&body.schema)
            .map_err(|err| SchemaRegistryError::SchemaParseError { id, err })
    }
}

impl SchemaRegistry for HttpSchemaRegistry {
    fn schema_by_id(&self, id: u32) -> Result<Arc<Schema>, SchemaRegistryError> {
        if let Some(schema) = self.schemas.get(&id).map(|entry| Arc::clone(entry.value())) {
            return Ok(schema);
        }

        let schema = Arc::new(self.fetch_schema(id)?);

        self.schemas.insert(id, Arc::clone(&schema));

        Ok(schema)
    }
}

/// Registry backed by a fixed set of schemas.
#[derive(Debug, Default)]
pub struct InMemorySchemaRegistry {
    schemas: DashMap<u32, Arc<Schema>>,
}

impl InMemorySchemaRegistry {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_schema(self, id: u32, schema: Schema) -> Self {
        self.register(id, schema);

        self
    }

    pub fn register(&self, id: u32, schema: Schema) {
        self.schemas.insert(id, Arc::new(schema));
    }
}

impl SchemaRegistry for InMemorySchemaRegistry {
    fn schema_by_id(&self, id: u32) -> Result<Arc<Schema>, SchemaRegistryError> {
        self.schemas
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(SchemaRegistryError::SchemaNotFound(id))
    }
}
