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

use rdkafka::{
    consumer::{BaseConsumer, Consumer},
    error::{KafkaError, KafkaResult, RDKafkaErrorCode},
    message::{BorrowedMessage, Message},
    Offset,
};
use rdkafka_sys::RDKafkaRespErr;
use tracing::{debug, error, warn};

use crate::{config::ConsumerConfig, error::ClientError};

use super::{
    context::TransfersConsumerContext, ConsumedRecord, Connector, ConsumerClient, PartitionInfo,
    TopicPartition,
};

const METADATA_TIMEOUT: Duration = Duration::from_millis(2500);
const SEEK_TIMEOUT: Duration = Duration::from_millis(2500);

pub type TransfersConsumer = BaseConsumer<TransfersConsumerContext>;

#[derive(Debug, Default, Clone, Copy)]
pub struct KafkaConnector;

impl Connector for KafkaConnector {
    type Client = KafkaClient;

    fn connect(&self, config: &ConsumerConfig) -> Result<Self::Client, ClientError> {
        KafkaClient::from_config(config)
    }
}

pub struct KafkaClient {
    consumer: TransfersConsumer,
    max_poll_records: usize,
    pending_error: Option<KafkaError>,
}

impl KafkaClient {
    pub fn from_config(config: &ConsumerConfig) -> Result<Self, ClientError> {
        let consumer = config
            .client_config()
            .create_with_context(TransfersConsumerContext)
            .map_err(ClientError::CreateConsumerError)?;

        Ok(Self {
            consumer,
            max_poll_records: config.max_poll_records(),
            pending_error: None,
        })
    }
}

fn detach(message: BorrowedMessage<'_>) -> ConsumedRecord {
    ConsumedRecord {
        topic: message.topic().to_owned(),
        partition: message.partition(),
        offset: message.offset(),
        key: message.key().map(<[u8]>::to_vec),
        payload: message.payload().map(<[u8]>::to_vec),
    }
}

/// Records gathered in one poll cycle, plus the error that cut it short.
#[derive(Debug)]
struct Batch<T> {
    records: Vec<T>,
    error: Option<KafkaError>,
}

/// Waits up to `timeout` for the first record, then drains whatever is
/// already buffered without waiting again, up to `max_records`.
fn poll_batch<T, F>(mut poll: F, timeout: Duration, max_records: usize) -> Batch<T>
where
    F: FnMut(Duration) -> Option<KafkaResult<T>>,
{
    let mut records = Vec::new();
    let mut wait = timeout;

    while records.len() < max_records {
        match poll(wait) {
            None => break,
            Some(Ok(record)) => {
                records.push(record);
                wait = Duration::ZERO;
            }
            Some(Err(err)) => {
                return Batch {
                    records,
                    error: Some(err),
                }
            }
        }
    }

    Batch {
        records,
        error: None,
    }
}

/// librdkafka reports most consumer errors (broker down, transport failures,
/// partition EOF) as informational and retries internally. Only a fatal error
/// leaves the client unusable.
fn is_fatal(err: &KafkaError) -> bool {
    matches!(err.rdkafka_error_code(), Some(RDKafkaErrorCode::Fatal))
}

impl ConsumerClient for KafkaClient {
    fn subscribe(&mut self, topic: &str) -> Result<(), ClientError> {
        self.consumer
            .subscribe(&[topic])
            .map_err(|err| ClientError::SubscribeError {
                topic: topic.to_owned(),
                err,
            })
    }

    fn partitions_for(&self, topic: &str) -> Result<Vec<PartitionInfo>, ClientError> {
        let metadata = self
            .consumer
            .client()
            .fetch_metadata(Some(topic), METADATA_TIMEOUT)
            .map_err(|err| ClientError::FetchTopicMetadataError {
                topic: topic.to_owned(),
                err,
            })?;

        let partitions = metadata
            .topics()
            .iter()
            .filter(|meta| meta.name() == topic)
            .inspect(|meta| {
                if let Some(error) = meta.error() {
                    match error {
                        RDKafkaRespErr::RD_KAFKA_RESP_ERR_UNKNOWN_TOPIC_OR_PART => {
                            warn!("Topic '{}' not found on cluster", meta.name())
                        }
                        e => warn!(
                            "Encountered error while fetching metadata for topic: {}, error: {:?}",
                            meta.name(),
                            e
                        ),
                    }
                }
            })
            .flat_map(|meta| {
                meta.partitions().iter().map(move |partition| PartitionInfo {
                    topic: meta.name().to_owned(),
                    partition: partition.id(),
                    leader: partition.leader(),
                    replicas: partition.replicas().to_vec(),
                    isr: partition.isr().to_vec(),
                })
            })
            .collect();

        Ok(partitions)
    }

    fn poll(&mut self, timeout: Duration) -> Result<Vec<ConsumedRecord>, ClientError> {
        if let Some(err) = self.pending_error.take() {
            return Err(ClientError::PollError { err });
        }

        let consumer = &self.consumer;
        let batch = poll_batch(
            |wait| consumer.poll(wait).map(|result| result.map(detach)),
            timeout,
            self.max_poll_records,
        );

        if let Some(err) = batch.error {
            let fatal = is_fatal(&err) || self.consumer.client().fatal_error().is_some();

            if !fatal {
                warn!("Consumer error while polling, client will recover: {}", err);
            } else if batch.records.is_empty() {
                return Err(ClientError::PollError { err });
            } else {
                // Hand out what was already fetched, fail on the next cycle.
                error!("Fatal consumer error while draining: {}", err);
                self.pending_error = Some(err);
            }
        }

        Ok(batch.records)
    }

    fn assignment(&self) -> Result<Vec<TopicPartition>, ClientError> {
        let assignment = self
            .consumer
            .assignment()
            .map_err(|err| ClientError::AssignmentError { err })?;

        Ok(assignment
            .elements()
            .into_iter()
            .map(TopicPartition::from)
            .collect())
    }

    fn seek_to_beginning(&mut self, partitions: &[TopicPartition]) -> Result<(), ClientError> {
        for tp in partitions {
            debug!("Seeking {} to beginning", tp);

            self.consumer
                .seek(&tp.topic, tp.partition, Offset::Beginning, SEEK_TIMEOUT)
                .map_err(|err| ClientError::SeekError {
                    topic: tp.topic.clone(),
                    partition: tp.partition,
                    err,
                })?;
        }

        Ok(())
    }

    fn close(self) -> Result<(), ClientError> {
        self.consumer.unsubscribe();

        // Dropping the handle leaves the group and destroys the client.
        drop(self.consumer);

        Ok(())
    }
}
