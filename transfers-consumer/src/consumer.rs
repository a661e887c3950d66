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

use std::{fmt::Debug, sync::Arc};

use crossbeam::atomic::AtomicCell;
use tracing::{debug, error, info, trace};

use crate::{
    client::{Connector, ConsumerClient},
    config::ConsumerConfig,
    decode::RecordDeserializer,
    error::TopicConsumerError,
    processor::RecordProcessor,
};

/// Cross thread stop signal for a running [`TopicConsumer`].
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    stopped: Arc<AtomicCell<bool>>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.stopped.store(true);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load()
    }

    fn reset(&self) {
        self.stopped.store(false);
    }
}

/// Consumes a single topic, handing each decoded value to a processor until
/// stopped. Decode and processor failures end the session.
pub struct TopicConsumer<K, D, P>
where
    K: Connector,
{
    config: ConsumerConfig,
    connector: K,
    deserializer: D,
    processor: P,
    stop: StopHandle,
    seek_from_beginning: bool,
    client: Option<K::Client>,
}

impl<K, D, P> TopicConsumer<K, D, P>
where
    K: Connector,
    D: RecordDeserializer,
    P: RecordProcessor<D::Output>,
{
    pub fn new(config: ConsumerConfig, connector: K, deserializer: D, processor: P) -> Self {
        Self {
            config,
            connector,
            deserializer,
            processor,
            stop: Default::default(),
            seek_from_beginning: false,
            client: None,
        }
    }

    /// Shares an externally created stop handle with this consumer.
    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = stop;

        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn config(&self) -> &ConsumerConfig {
        &self.config
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }

    /// Rewinds every assigned partition to its earliest offset once the
    /// group assigns them. Only read by the next call to [`Self::start`].
    pub fn request_rewind_to_beginning(&mut self) {
        self.seek_from_beginning = true;
    }

    pub fn stop(&self) {
        info!("We have been told to stop.");
        self.stop.stop();
    }

    /// Runs the consumer on the calling thread until [`Self::stop`] is
    /// observed. The client is closed before returning, on success or error.
    pub fn start(&mut self) -> Result<(), TopicConsumerError> {
        self.stop.reset();

        let client = self.connector.connect(&self.config)?;
        self.client = Some(client);

        let result = self.run();

        if let Some(client) = self.client.take() {
            info!("Going to close the \"{}\" topic Kafka consumer.", self.config.topic());

            let closed = client.close();

            if let Err(e) = &closed {
                error!("Failed to close consumer: {}", e);
            }

            // A session error takes precedence over a close error.
            return result.and(closed.map_err(Into::into));
        }

        result
    }

    fn run(&mut self) -> Result<(), TopicConsumerError> {
        let topic = self.config.topic().to_owned();
        let client = self.client_mut()?;

        client.subscribe(&topic)?;

        let partitions = client.partitions_for(&topic)?;
        info!(
            "Partitions for \"{}\" topic: [{}]",
            topic,
            partitions
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );

        if self.seek_from_beginning {
            self.seek_from_beginning()?;
        }

        info!("\"{}\" topic consumer started", topic);

        while !self.stop.is_stopped() {
            self.poll()?;
        }

        Ok(())
    }

    /// Runs a single fetch cycle, forwarding every fetched record to the
    /// processor in fetch order.
    pub fn poll(&mut self) -> Result<(), TopicConsumerError> {
        trace!("Going to poll for messages.");

        let timeout = self.config.poll_timeout();
        let records = self.client_mut()?.poll(timeout)?;

        if !records.is_empty() {
            debug!("Number of records polled: {}", records.len());
        }

        for record in records {
            trace!(
                "Processing record {}-{}@{} key: {:?}",
                record.topic,
                record.partition,
                record.offset,
                record.key_str()
            );

            let payload = record
                .payload()
                .ok_or_else(|| TopicConsumerError::MissingPayload {
                    topic: record.topic.clone(),
                    partition: record.partition,
                    offset: record.offset,
                })?;

            let value = self.deserializer.deserialize(payload).map_err(|e| {
                TopicConsumerError::DecodeError {
                    topic: record.topic.clone(),
                    partition: record.partition,
                    offset: record.offset,
                    source: Box::new(e),
                }
            })?;

            self.processor
                .process(value)
                .map_err(|e| TopicConsumerError::ProcessorError(e.into()))?;
        }

        Ok(())
    }

    fn seek_from_beginning(&mut self) -> Result<(), TopicConsumerError> {
        let timeout = self.config.poll_timeout();
        let max_attempts = self.config.rewind_max_attempts();
        let mut attempts = 0;

        loop {
            let client = self.client_mut()?;
            let assignment = client.assignment()?;

            if !assignment.is_empty() {
                client.seek_to_beginning(&assignment)?;

                info!(
                    "Rewound {} partition(s) to beginning: {:?}",
                    assignment.len(),
                    assignment
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                );

                return Ok(());
            }

            if self.stop.is_stopped() {
                info!("Stopped while waiting for partition assignment, skipping rewind");

                return Ok(());
            }

            if max_attempts.is_some_and(|max| attempts >= max) {
                return Err(TopicConsumerError::AssignmentTimeout { attempts });
            }

            trace!("Going to perform a dummy poll");

            let discarded = self.client_mut()?.poll(timeout)?;
            attempts += 1;

            if !discarded.is_empty() {
                trace!("Discarded {} records while awaiting assignment", discarded.len());
            }
        }
    }

    fn client_mut(&mut self) -> Result<&mut K::Client, TopicConsumerError> {
        self.client.as_mut().ok_or(TopicConsumerError::NotStarted)
    }
}

impl<K, D, P> Debug for TopicConsumer<K, D, P>
where
    K: Connector,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopicConsumer")
            .field("processor", &std::any::type_name::<P>())
            .field("bootstrap_servers", &self.config.bootstrap_servers())
            .field("schema_registry_url", &self.config.schema_registry_url())
            .field("stop", &self.stop.is_stopped())
            .field("seek_from_beginning", &self.seek_from_beginning)
            .finish()
    }
}
