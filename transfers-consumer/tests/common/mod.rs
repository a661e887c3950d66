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

#![allow(dead_code)]

use std::{
    collections::VecDeque,
    io,
    sync::{Arc, Mutex},
    time::Duration,
};

use rdkafka::error::KafkaError;
use transfers_consumer::{
    client::{ConsumedRecord, Connector, ConsumerClient, PartitionInfo, TopicPartition},
    error::ClientError,
    ConsumerConfig, RecordProcessor, StopHandle,
};

pub const TOPIC: &str = "transfers";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Subscribe(String),
    Poll,
    Seek(Vec<TopicPartition>),
    Processed(String),
    Close,
}

#[derive(Debug)]
pub struct ClusterState {
    pub batches: VecDeque<Vec<ConsumedRecord>>,
    pub assigned: Vec<TopicPartition>,
    pub assign_after_polls: usize,
    pub polls: usize,
    pub connects: usize,
    pub closes: usize,
    pub fail_connect: bool,
    pub events: Vec<Event>,
}

impl Default for ClusterState {
    fn default() -> Self {
        Self {
            batches: Default::default(),
            assigned: vec![TopicPartition::new(TOPIC, 0), TopicPartition::new(TOPIC, 1)],
            assign_after_polls: 0,
            polls: 0,
            connects: 0,
            closes: 0,
            fail_connect: false,
            events: Default::default(),
        }
    }
}

/// In-memory stand-in for a broker. Serves scripted poll batches and signals
/// the consumer to stop once the script runs out.
#[derive(Debug, Clone, Default)]
pub struct MockCluster {
    pub state: Arc<Mutex<ClusterState>>,
    stop_when_drained: Option<StopHandle>,
}

impl MockCluster {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_batches<I>(self, batches: I) -> Self
    where
        I: IntoIterator<Item = Vec<ConsumedRecord>>,
    {
        self.state.lock().unwrap().batches.extend(batches);

        self
    }

    pub fn stop_when_drained(mut self, stop: StopHandle) -> Self {
        self.stop_when_drained = Some(stop);

        self
    }

    pub fn with_state(self, f: impl FnOnce(&mut ClusterState)) -> Self {
        f(&mut self.state.lock().unwrap());

        self
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn polls(&self) -> usize {
        self.state.lock().unwrap().polls
    }

    pub fn connects(&self) -> usize {
        self.state.lock().unwrap().connects
    }

    pub fn closes(&self) -> usize {
        self.state.lock().unwrap().closes
    }

    pub fn processor(&self) -> RecordingProcessor {
        RecordingProcessor {
            state: self.state.clone(),
            fail_on: None,
        }
    }
}

impl Connector for MockCluster {
    type Client = MockClient;

    fn connect(&self, _config: &ConsumerConfig) -> Result<Self::Client, ClientError> {
        let mut state = self.state.lock().unwrap();

        if state.fail_connect {
            return Err(ClientError::CreateConsumerError(KafkaError::ClientCreation(
                "broker unreachable".to_owned(),
            )));
        }

        state.connects += 1;

        Ok(MockClient {
            state: self.state.clone(),
            stop_when_drained: self.stop_when_drained.clone(),
        })
    }
}

pub struct MockClient {
    state: Arc<Mutex<ClusterState>>,
    stop_when_drained: Option<StopHandle>,
}

impl ConsumerClient for MockClient {
    fn subscribe(&mut self, topic: &str) -> Result<(), ClientError> {
        self.state
            .lock()
            .unwrap()
            .events
            .push(Event::Subscribe(topic.to_owned()));

        Ok(())
    }

    fn partitions_for(&self, topic: &str) -> Result<Vec<PartitionInfo>, ClientError> {
        Ok((0..2)
            .map(|partition| PartitionInfo {
                topic: topic.to_owned(),
                partition,
                leader: 1,
                replicas: vec![1],
                isr: vec![1],
            })
            .collect())
    }

    fn poll(&mut self, _timeout: Duration) -> Result<Vec<ConsumedRecord>, ClientError> {
        let mut state = self.state.lock().unwrap();

        state.polls += 1;
        state.events.push(Event::Poll);

        let batch = state.batches.pop_front().unwrap_or_default();

        if state.batches.is_empty() {
            if let Some(stop) = &self.stop_when_drained {
                stop.stop();
            }
        }

        Ok(batch)
    }

    fn assignment(&self) -> Result<Vec<TopicPartition>, ClientError> {
        let state = self.state.lock().unwrap();

        if state.polls >= state.assign_after_polls {
            Ok(state.assigned.clone())
        } else {
            Ok(vec![])
        }
    }

    fn seek_to_beginning(&mut self, partitions: &[TopicPartition]) -> Result<(), ClientError> {
        self.state
            .lock()
            .unwrap()
            .events
            .push(Event::Seek(partitions.to_vec()));

        Ok(())
    }

    fn close(self) -> Result<(), ClientError> {
        let mut state = self.state.lock().unwrap();

        state.closes += 1;
        state.events.push(Event::Close);

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("refusing to process {0}")]
pub struct Rejected(pub String);

pub struct RecordingProcessor {
    state: Arc<Mutex<ClusterState>>,
    fail_on: Option<String>,
}

impl RecordingProcessor {
    pub fn fail_on(mut self, value: &str) -> Self {
        self.fail_on = Some(value.to_owned());

        self
    }
}

impl RecordProcessor<String> for RecordingProcessor {
    type Error = Rejected;

    fn process(&mut self, value: String) -> Result<(), Self::Error> {
        if self.fail_on.as_deref() == Some(value.as_str()) {
            return Err(Rejected(value));
        }

        self.state
            .lock()
            .unwrap()
            .events
            .push(Event::Processed(value));

        Ok(())
    }
}

pub fn json_record(offset: i64, value: &str) -> ConsumedRecord {
    ConsumedRecord::new(TOPIC, 0, offset)
        .with_key(format!("key-{}", offset))
        .with_payload(format!("\"{}\"", value))
}

pub fn config() -> ConsumerConfig {
    ConsumerConfig::configure(
        "localhost:9092",
        "http://localhost:8081",
        "transfers-test-group",
        "transfers-test-client",
    )
    .unwrap()
}

#[derive(Debug, Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Runs `f` with every event at trace level and above written to the
/// returned buffer.
pub fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, CapturedLogs) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    let result = tracing::subscriber::with_default(subscriber, f);

    (result, logs)
}
