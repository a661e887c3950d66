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

use std::fmt::Display;

use rdkafka::{
    config::RDKafkaLogLevel,
    consumer::{ConsumerContext, Rebalance},
    error::{KafkaError, KafkaResult},
    ClientContext, TopicPartitionList,
};
use tracing::{debug, error, info, trace, warn};

use super::TopicPartition;

#[derive(Debug, Clone)]
pub enum OwnedRebalance {
    Assign(Vec<TopicPartition>),
    Revoke(Vec<TopicPartition>),
    Error(KafkaError),
}

impl Display for OwnedRebalance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OwnedRebalance::Assign(partitions) => write!(f, "Assign: {:?}", partitions),
            OwnedRebalance::Revoke(partitions) => write!(f, "Revoke: {:?}", partitions),
            OwnedRebalance::Error(e) => write!(f, "Error: {:?}", e),
        }
    }
}

fn partitions_of(tp_list: &TopicPartitionList) -> Vec<TopicPartition> {
    tp_list.elements().into_iter().map(TopicPartition::from).collect()
}

impl From<&Rebalance<'_>> for OwnedRebalance {
    fn from(rebalance: &Rebalance<'_>) -> Self {
        match rebalance {
            Rebalance::Assign(tp_list) => OwnedRebalance::Assign(partitions_of(tp_list)),
            Rebalance::Revoke(tp_list) => OwnedRebalance::Revoke(partitions_of(tp_list)),
            Rebalance::Error(e) => OwnedRebalance::Error(e.clone()),
        }
    }
}

/// Routes librdkafka callbacks into tracing. Assignment itself is left to
/// the client's default rebalance handling.
#[derive(Debug, Clone, Default)]
pub struct TransfersConsumerContext;

impl ClientContext for TransfersConsumerContext {
    fn log(&self, level: RDKafkaLogLevel, fac: &str, log_message: &str) {
        match level {
            RDKafkaLogLevel::Emerg
            | RDKafkaLogLevel::Alert
            | RDKafkaLogLevel::Critical
            | RDKafkaLogLevel::Error => error!(target: "librdkafka", "{} {}", fac, log_message),
            RDKafkaLogLevel::Warning => warn!(target: "librdkafka", "{} {}", fac, log_message),
            RDKafkaLogLevel::Notice | RDKafkaLogLevel::Info => {
                info!(target: "librdkafka", "{} {}", fac, log_message)
            }
            RDKafkaLogLevel::Debug => debug!(target: "librdkafka", "{} {}", fac, log_message),
        }
    }

    fn error(&self, error: KafkaError, reason: &str) {
        error!(target: "librdkafka", "{}: {}", error, reason);
    }
}

impl ConsumerContext for TransfersConsumerContext {
    fn pre_rebalance<'a>(&self, rebalance: &Rebalance<'a>) {
        let owned_rebalance: OwnedRebalance = rebalance.into();

        debug!("Context: pre rebalance, {}", &owned_rebalance);
    }

    fn post_rebalance<'a>(&self, rebalance: &Rebalance<'a>) {
        let owned_rebalance: OwnedRebalance = rebalance.into();

        match &owned_rebalance {
            OwnedRebalance::Error(_) => error!("Context: post rebalance, {}", &owned_rebalance),
            _ => info!("Context: post rebalance, {}", &owned_rebalance),
        }
    }

    fn commit_callback(&self, result: KafkaResult<()>, offsets: &TopicPartitionList) {
        match result {
            Ok(_) => {
                for elem in offsets.elements() {
                    trace!(
                        "Committed offset: {}-{}:{:?}",
                        elem.topic(),
                        elem.partition(),
                        elem.offset()
                    );
                }
            }
            Err(e) => {
                error!("Failed to commit offsets: {}", e);
            }
        }
    }
}
