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

use clap::{Parser, ValueEnum};
use tracing::{info, level_filters::LevelFilter};
use transfers_consumer::{
    decode::{avro::ConfluentAvro, registry::HttpSchemaRegistry},
    init::{init_json_tracing, init_tracing},
    ConsumerConfigBuilder, KafkaConnector, StopHandle, TopicConsumer,
};

use crate::transfer::{Transfer, TransferLogger};

mod transfer;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(about = "Records transfers consumed from the \"transfers\" topic")]
struct Args {
    #[arg(long, env = "BOOTSTRAP_SERVERS", default_value = "localhost:9092")]
    bootstrap_servers: String,

    #[arg(long, env = "SCHEMA_REGISTRY_URL", default_value = "http://localhost:8081")]
    schema_registry_url: String,

    #[arg(long, env = "GROUP_ID", default_value = "transfers-recording-service-group-01")]
    group_id: String,

    #[arg(
        long,
        env = "CLIENT_ID",
        default_value = "transfers-recording-service-client-consumer-01"
    )]
    client_id: String,

    /// Rewind all assigned partitions to the earliest offset on startup.
    #[arg(long, env = "SEEK_FROM_BEGINNING")]
    seek_from_beginning: bool,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: LevelFilter,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();

    match args.log_format {
        LogFormat::Text => init_tracing(args.log_level)?,
        LogFormat::Json => init_json_tracing(args.log_level)?,
    }

    let mut builder = ConsumerConfigBuilder::new();

    builder
        .bootstrap_servers(args.bootstrap_servers)
        .schema_registry_url(args.schema_registry_url)
        .group_id(args.group_id)
        .client_id(args.client_id);

    let config = builder.build()?;
    let stop = StopHandle::default();
    let loop_stop = stop.clone();
    let seek_from_beginning = args.seek_from_beginning;

    // The registry client blocks, so everything touching it lives on the
    // consumer thread.
    let mut consumer_task = tokio::task::spawn_blocking(move || -> Result<(), anyhow::Error> {
        let registry = HttpSchemaRegistry::new(config.schema_registry_url())?;

        let mut consumer = TopicConsumer::new(
            config,
            KafkaConnector,
            ConfluentAvro::<Transfer, _>::new(registry),
            TransferLogger::default(),
        )
        .with_stop_handle(loop_stop);

        if seek_from_beginning {
            consumer.request_rewind_to_beginning();
        }

        info!("Starting {:?}", consumer);

        consumer.start()?;

        info!("Recorded {} transfers", consumer.processor().recorded());

        Ok(())
    });

    tokio::select! {
        result = &mut consumer_task => return result?,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Received interrupt, stopping consumer");
            stop.stop();
        }
    }

    consumer_task.await?
}
