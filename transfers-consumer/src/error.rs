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

use std::error::Error;

use rdkafka::error::KafkaError;

pub type BoxedError = Box<dyn Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("ClientError::CreateConsumerError: Failed to create consumer -> {0}")]
    CreateConsumerError(KafkaError),
    #[error("ClientError::SubscribeError: Failed to subscribe consumer to topic '{}' caused by: {}", topic, err)]
    SubscribeError { topic: String, err: KafkaError },
    #[error("ClientError::FetchTopicMetadataError: Failed to fetch topic metadata for '{}' caused by: {}", topic, err)]
    FetchTopicMetadataError { topic: String, err: KafkaError },
    #[error("ClientError::PollError: Failed to poll consumer caused by: {}", err)]
    PollError { err: KafkaError },
    #[error("ClientError::AssignmentError: Failed to fetch consumer assignment caused by: {}", err)]
    AssignmentError { err: KafkaError },
    #[error(
        "ClientError::SeekError: Failed to seek {}:{} to beginning caused by: {}",
        topic,
        partition,
        err
    )]
    SeekError {
        topic: String,
        partition: i32,
        err: KafkaError,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaRegistryError {
    #[error("SchemaRegistryError::MissingUrl: no schema registry url configured")]
    MissingUrl,
    #[error("SchemaRegistryError::HttpClientError: failed to build http client -> {0}")]
    HttpClientError(reqwest::Error),
    #[error("SchemaRegistryError::TransportError: request to '{}' failed caused by: {}", url, err)]
    TransportError { url: String, err: reqwest::Error },
    #[error("SchemaRegistryError::StatusError: registry responded {} for schema id {}", status, id)]
    StatusError { id: u32, status: u16 },
    #[error("SchemaRegistryError::SchemaNotFound: {0}")]
    SchemaNotFound(u32),
    #[error("SchemaRegistryError::SchemaParseError: failed to parse schema {} caused by: {}", id, err)]
    SchemaParseError { id: u32, err: apache_avro::Error },
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("DecodeError::EmptyPayload")]
    EmptyPayload,
    #[error("DecodeError::UnknownMagicByte: {0:#04x}")]
    UnknownMagicByte(u8),
    #[error("DecodeError::TruncatedHeader: payload of {0} bytes is shorter than the wire header")]
    TruncatedHeader(usize),
    #[error(transparent)]
    SchemaRegistry(#[from] SchemaRegistryError),
    #[error("DecodeError::AvroError: {0}")]
    AvroError(#[from] apache_avro::Error),
    #[error("DecodeError::JsonError: {0}")]
    JsonError(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum TopicConsumerError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("TopicConsumerError::NotStarted: poll called without an active session")]
    NotStarted,
    #[error("TopicConsumerError::MissingPayload: record {}-{}@{} has no value", topic, partition, offset)]
    MissingPayload {
        topic: String,
        partition: i32,
        offset: i64,
    },
    #[error(
        "TopicConsumerError::DecodeError: failed to decode record {}-{}@{} caused by: {}",
        topic,
        partition,
        offset,
        source
    )]
    DecodeError {
        topic: String,
        partition: i32,
        offset: i64,
        #[source]
        source: BoxedError,
    },
    #[error("TopicConsumerError::ProcessorError: {0}")]
    ProcessorError(#[source] BoxedError),
    #[error("TopicConsumerError::AssignmentTimeout: no partitions assigned after {attempts} polls")]
    AssignmentTimeout { attempts: usize },
}
