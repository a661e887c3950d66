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

use std::{fmt::Display, time::Duration};

use rdkafka::topic_partition_list::TopicPartitionListElem;

use crate::{config::ConsumerConfig, error::ClientError};

pub mod context;
pub mod kafka;

/// The subset of a broker client the consumer loop relies on. Offsets,
/// group membership and fetch buffers stay inside the implementation.
pub trait ConsumerClient {
    fn subscribe(&mut self, topic: &str) -> Result<(), ClientError>;

    fn partitions_for(&self, topic: &str) -> Result<Vec<PartitionInfo>, ClientError>;

    /// Waits up to `timeout` for records and returns everything fetched in
    /// this cycle, in fetch order. An empty batch means the wait elapsed.
    fn poll(&mut self, timeout: Duration) -> Result<Vec<ConsumedRecord>, ClientError>;

    fn assignment(&self) -> Result<Vec<TopicPartition>, ClientError>;

    fn seek_to_beginning(&mut self, partitions: &[TopicPartition]) -> Result<(), ClientError>;

    fn close(self) -> Result<(), ClientError>;
}

/// Creates a client from config. Invoked once per consumer session.
pub trait Connector {
    type Client: ConsumerClient;

    fn connect(&self, config: &ConsumerConfig) -> Result<Self::Client, ClientError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
#[display(fmt = "{}-{}", topic, partition)]
pub struct TopicPartition {
    pub topic: String,
    pub partition: i32,
}

impl TopicPartition {
    pub fn new(topic: impl Into<String>, partition: i32) -> Self {
        Self {
            topic: topic.into(),
            partition,
        }
    }
}

impl<'a> From<TopicPartitionListElem<'a>> for TopicPartition {
    fn from(elem: TopicPartitionListElem<'a>) -> Self {
        TopicPartition {
            topic: elem.topic().to_owned(),
            partition: elem.partition(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionInfo {
    pub topic: String,
    pub partition: i32,
    pub leader: i32,
    pub replicas: Vec<i32>,
    pub isr: Vec<i32>,
}

impl Display for PartitionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Partition(topic = {}, partition = {}, leader = {}, replicas = {:?}, isr = {:?})",
            self.topic, self.partition, self.leader, self.replicas, self.isr
        )
    }
}

/// A fetched record, detached from the client that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumedRecord {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<Vec<u8>>,
    pub payload: Option<Vec<u8>>,
}

impl ConsumedRecord {
    pub fn new(topic: impl Into<String>, partition: i32, offset: i64) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
            key: None,
            payload: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.key = Some(key.into());

        self
    }

    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = Some(payload.into());

        self
    }

    pub fn payload(&self) -> Option<&[u8]> {
        self.payload.as_deref()
    }

    /// Keys are written as plain strings by the producers of this topic.
    pub fn key_str(&self) -> Option<&str> {
        self.key
            .as_deref()
            .and_then(|key| std::str::from_utf8(key).ok())
    }
}
