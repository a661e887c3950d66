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

//! Single topic consumer that decodes schema registry framed Avro records
//! and forwards them to a processor.

pub mod client;
pub mod config;
pub mod consumer;
pub mod decode;
pub mod error;
pub mod init;
pub mod processor;

pub use client::kafka::KafkaConnector;
pub use config::{builder::ConsumerConfigBuilder, ConsumerConfig};
pub use consumer::{StopHandle, TopicConsumer};
pub use processor::{process_fn, RecordProcessor};
