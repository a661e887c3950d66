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

use std::{collections::HashMap, time::Duration};

use rdkafka::ClientConfig;
use tracing::warn;

use super::ConsumerConfig;

pub(super) const BOOTSTRAP_SERVERS: &str = "bootstrap.servers";
pub(super) const CLIENT_ID: &str = "client.id";
pub(super) const ENABLE_AUTO_COMMIT: &str = "enable.auto.commit";
pub(super) const GROUP_ID: &str = "group.id";
pub(super) const SCHEMA_REGISTRY_URL: &str = "schema.registry.url";

pub const DEFAULT_TOPIC: &str = "transfers";
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(100);
pub const DEFAULT_MAX_POLL_RECORDS: usize = 500;

const REQUIRED_FIELDS: [&str; 3] = [BOOTSTRAP_SERVERS, GROUP_ID, CLIENT_ID];

const DEFAULT_FIELDS: [(&str, &str); 3] = [
    (GROUP_ID, "transfers-recording-service-group-01"),
    (CLIENT_ID, "transfers-recording-service-client-consumer-01"),
    (ENABLE_AUTO_COMMIT, "true"),
];

#[derive(Debug, Clone, Default)]
pub struct ConsumerConfigBuilder {
    pub(crate) client_config: ClientConfig,
    schema_registry_url: Option<String>,
    topic: Option<String>,
    poll_timeout: Option<Duration>,
    max_poll_records: Option<usize>,
    rewind_max_attempts: Option<usize>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConsumerConfigError {
    #[error("ConsumerConfigError::MissingConfig: {}", configs.join(", "))]
    MissingConfig { configs: Vec<&'static str> },
    #[error("ConsumerConfigError::EmptyConfig: {}", configs.join(", "))]
    EmptyConfig { configs: Vec<&'static str> },
    #[error("ConsumerConfigError::InvalidMaxPollRecords: max poll records must be positive")]
    InvalidMaxPollRecords,
}

impl ConsumerConfigBuilder {
    pub fn new() -> Self {
        Self {
            ..Default::default()
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.client_config.get(key)
    }

    /// Sets a raw librdkafka property. The registry url is accepted here under
    /// `schema.registry.url` so that flat property maps can be used as-is.
    pub fn set<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) -> &mut Self {
        let key = key.into();

        if key == SCHEMA_REGISTRY_URL {
            self.schema_registry_url = Some(value.into());
        } else {
            self.client_config.set(key, value);
        }

        self
    }

    pub fn bootstrap_servers<V: Into<String>>(&mut self, servers: V) -> &mut Self {
        self.set(BOOTSTRAP_SERVERS, servers)
    }

    pub fn group_id<V: Into<String>>(&mut self, group_id: V) -> &mut Self {
        self.set(GROUP_ID, group_id)
    }

    pub fn client_id<V: Into<String>>(&mut self, client_id: V) -> &mut Self {
        self.set(CLIENT_ID, client_id)
    }

    pub fn schema_registry_url<V: Into<String>>(&mut self, url: V) -> &mut Self {
        self.schema_registry_url = Some(url.into());

        self
    }

    pub fn topic<V: Into<String>>(&mut self, topic: V) -> &mut Self {
        self.topic = Some(topic.into());

        self
    }

    pub fn poll_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.poll_timeout = Some(timeout);

        self
    }

    pub fn max_poll_records(&mut self, max: usize) -> &mut Self {
        self.max_poll_records = Some(max);

        self
    }

    /// Bounds the number of polls spent waiting for a partition assignment
    /// before rewinding. Unbounded when unset.
    pub fn rewind_max_attempts(&mut self, attempts: usize) -> &mut Self {
        self.rewind_max_attempts = Some(attempts);

        self
    }

    fn set_missing_defaults(mut self) -> Self {
        let missing_defaults = DEFAULT_FIELDS
            .into_iter()
            .filter(|(name, _)| self.client_config.get(name).is_none())
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect::<Vec<_>>();

        self.client_config.extend(missing_defaults);

        self
    }

    fn warn_on_manual_commit(self) -> Self {
        if self.client_config.get(ENABLE_AUTO_COMMIT) == Some("false") {
            warn!("'{}' disabled in client config, offsets will not be committed by this consumer", ENABLE_AUTO_COMMIT);
        }

        self
    }

    fn check_missing_required(self) -> Result<Self, ConsumerConfigError> {
        let mut missing_fields: Vec<_> = REQUIRED_FIELDS
            .into_iter()
            .filter(|field| self.client_config.get(field).is_none())
            .collect();

        if self.schema_registry_url.is_none() {
            missing_fields.push(SCHEMA_REGISTRY_URL);
        }

        if !missing_fields.is_empty() {
            return Err(ConsumerConfigError::MissingConfig {
                configs: missing_fields,
            });
        }

        Ok(self)
    }

    fn check_empty_required(self) -> Result<Self, ConsumerConfigError> {
        let mut empty_fields: Vec<_> = REQUIRED_FIELDS
            .into_iter()
            .filter(|field| {
                self.client_config
                    .get(field)
                    .is_some_and(|value| value.trim().is_empty())
            })
            .collect();

        if self
            .schema_registry_url
            .as_deref()
            .is_some_and(|url| url.trim().is_empty())
        {
            empty_fields.push(SCHEMA_REGISTRY_URL);
        }

        if !empty_fields.is_empty() {
            return Err(ConsumerConfigError::EmptyConfig {
                configs: empty_fields,
            });
        }

        Ok(self)
    }

    pub fn build(self) -> Result<ConsumerConfig, ConsumerConfigError> {
        let builder = self
            .set_missing_defaults()
            .warn_on_manual_commit()
            .check_missing_required()?
            .check_empty_required()?;

        let ConsumerConfigBuilder {
            client_config,
            schema_registry_url,
            topic,
            poll_timeout,
            max_poll_records,
            rewind_max_attempts,
        } = builder;

        let max_poll_records = max_poll_records.unwrap_or(DEFAULT_MAX_POLL_RECORDS);

        if max_poll_records == 0 {
            return Err(ConsumerConfigError::InvalidMaxPollRecords);
        }

        Ok(ConsumerConfig {
            client_config,
            schema_registry_url: schema_registry_url.unwrap_or_default(),
            topic: topic.unwrap_or_else(|| DEFAULT_TOPIC.to_owned()),
            poll_timeout: poll_timeout.unwrap_or(DEFAULT_POLL_TIMEOUT),
            max_poll_records,
            rewind_max_attempts,
        })
    }
}

impl From<&ClientConfig> for ConsumerConfigBuilder {
    fn from(client_config: &ClientConfig) -> Self {
        let mut builder = Self::new();

        client_config
            .config_map()
            .iter()
            .for_each(|(key, value)| {
                builder.set(key, value);
            });

        builder
    }
}

impl From<&HashMap<String, String>> for ConsumerConfigBuilder {
    fn from(config_map: &HashMap<String, String>) -> Self {
        let mut builder = Self::new();

        config_map.iter().for_each(|(key, value)| {
            builder.set(key, value);
        });

        builder
    }
}
