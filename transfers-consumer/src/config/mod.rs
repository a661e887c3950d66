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

use std::time::Duration;

use rdkafka::ClientConfig;

use self::builder::{ConsumerConfigBuilder, ConsumerConfigError, BOOTSTRAP_SERVERS};

pub mod builder;

#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    client_config: ClientConfig,
    schema_registry_url: String,
    topic: String,
    poll_timeout: Duration,
    max_poll_records: usize,
    rewind_max_attempts: Option<usize>,
}

impl ConsumerConfig {
    /// Assembles a config for the given endpoints. Nothing is contacted here,
    /// unreachable addresses only surface once the consumer starts.
    pub fn configure(
        bootstrap_servers: &str,
        schema_registry_url: &str,
        group_id: &str,
        client_id: &str,
    ) -> Result<Self, ConsumerConfigError> {
        let mut builder = ConsumerConfigBuilder::new();

        builder
            .bootstrap_servers(bootstrap_servers)
            .schema_registry_url(schema_registry_url)
            .group_id(group_id)
            .client_id(client_id);

        builder.build()
    }

    pub fn client_config(&self) -> &ClientConfig {
        &self.client_config
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.client_config.get(key)
    }

    pub fn bootstrap_servers(&self) -> &str {
        self.get(BOOTSTRAP_SERVERS).unwrap_or_default()
    }

    pub fn schema_registry_url(&self) -> &str {
        &self.schema_registry_url
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn poll_timeout(&self) -> Duration {
        self.poll_timeout
    }

    pub fn max_poll_records(&self) -> usize {
        self.max_poll_records
    }

    pub fn rewind_max_attempts(&self) -> Option<usize> {
        self.rewind_max_attempts
    }
}

impl TryFrom<&ClientConfig> for ConsumerConfig {
    type Error = ConsumerConfigError;

    fn try_from(client_config: &ClientConfig) -> Result<Self, Self::Error> {
        ConsumerConfigBuilder::from(client_config).build()
    }
}
