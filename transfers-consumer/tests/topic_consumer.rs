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

mod common;

use apache_avro::{to_avro_datum, to_value, Schema};
use common::{config, json_record, Event, MockCluster, TOPIC};
use transfers_consumer::{
    client::{ConsumedRecord, TopicPartition},
    config::builder::ConsumerConfigBuilder,
    decode::{
        avro::{frame, ConfluentAvro},
        json::Json,
        registry::InMemorySchemaRegistry,
    },
    error::TopicConsumerError,
    process_fn, StopHandle, TopicConsumer,
};

fn processed(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::Processed(value) => Some(value.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_records_processed_in_order_across_polls() {
    let stop = StopHandle::default();
    let cluster = MockCluster::new()
        .with_batches([
            vec![json_record(0, "R1"), json_record(1, "R2")],
            vec![json_record(2, "R3")],
        ])
        .stop_when_drained(stop.clone());

    let mut consumer = TopicConsumer::new(
        config(),
        cluster.clone(),
        Json::<String>::new(),
        cluster.processor(),
    )
    .with_stop_handle(stop);

    consumer.start().unwrap();

    assert_eq!(
        cluster.events(),
        vec![
            Event::Subscribe(TOPIC.to_owned()),
            Event::Poll,
            Event::Processed("R1".to_owned()),
            Event::Processed("R2".to_owned()),
            Event::Poll,
            Event::Processed("R3".to_owned()),
            Event::Close,
        ]
    );
    assert_eq!(cluster.polls(), 2);
}

#[test]
fn test_empty_poll_processes_nothing() {
    let stop = StopHandle::default();
    let cluster = MockCluster::new()
        .with_batches([vec![]])
        .stop_when_drained(stop.clone());

    let mut consumer = TopicConsumer::new(
        config(),
        cluster.clone(),
        Json::<String>::new(),
        cluster.processor(),
    )
    .with_stop_handle(stop);

    consumer.start().unwrap();

    assert_eq!(cluster.polls(), 1);
    assert!(processed(&cluster.events()).is_empty());
}

#[test]
fn test_client_closed_once_after_stop() {
    let stop = StopHandle::default();
    let cluster = MockCluster::new()
        .with_batches([vec![json_record(0, "R1")]])
        .stop_when_drained(stop.clone());

    let mut consumer = TopicConsumer::new(
        config(),
        cluster.clone(),
        Json::<String>::new(),
        cluster.processor(),
    )
    .with_stop_handle(stop);

    consumer.start().unwrap();

    assert_eq!(cluster.connects(), 1);
    assert_eq!(cluster.closes(), 1);
    assert_eq!(cluster.events().last(), Some(&Event::Close));

    // The session is gone once start returns.
    assert!(matches!(consumer.poll(), Err(TopicConsumerError::NotStarted)));
}

#[test]
fn test_stop_before_start_does_not_prevent_start() {
    let stop = StopHandle::default();
    let cluster = MockCluster::new()
        .with_batches([vec![json_record(0, "R1")]])
        .stop_when_drained(stop.clone());

    let mut consumer = TopicConsumer::new(
        config(),
        cluster.clone(),
        Json::<String>::new(),
        cluster.processor(),
    )
    .with_stop_handle(stop);

    consumer.stop();
    assert!(consumer.stop_handle().is_stopped());

    consumer.start().unwrap();

    assert_eq!(cluster.polls(), 1);
    assert_eq!(processed(&cluster.events()), vec!["R1".to_owned()]);
}

#[test]
fn test_rewind_waits_for_assignment_before_processing() {
    let stop = StopHandle::default();
    let cluster = MockCluster::new()
        .with_batches([vec![json_record(0, "R0")], vec![json_record(1, "R1")]])
        .with_state(|state| state.assign_after_polls = 1)
        .stop_when_drained(stop.clone());

    let mut consumer = TopicConsumer::new(
        config(),
        cluster.clone(),
        Json::<String>::new(),
        cluster.processor(),
    )
    .with_stop_handle(stop);

    consumer.request_rewind_to_beginning();
    consumer.start().unwrap();

    let assigned = vec![TopicPartition::new(TOPIC, 0), TopicPartition::new(TOPIC, 1)];

    assert_eq!(
        cluster.events(),
        vec![
            Event::Subscribe(TOPIC.to_owned()),
            // Dummy poll, its record is discarded.
            Event::Poll,
            Event::Seek(assigned),
            Event::Poll,
            Event::Processed("R1".to_owned()),
            Event::Close,
        ]
    );
}

#[test]
fn test_rewind_with_immediate_assignment_skips_dummy_poll() {
    let stop = StopHandle::default();
    let cluster = MockCluster::new()
        .with_batches([vec![json_record(0, "R0")]])
        .stop_when_drained(stop.clone());

    let mut consumer = TopicConsumer::new(
        config(),
        cluster.clone(),
        Json::<String>::new(),
        cluster.processor(),
    )
    .with_stop_handle(stop);

    consumer.request_rewind_to_beginning();
    consumer.start().unwrap();

    let events = cluster.events();
    assert!(matches!(events[1], Event::Seek(_)));
    assert_eq!(processed(&events), vec!["R0".to_owned()]);
}

#[test]
fn test_rewind_gives_up_after_max_attempts() {
    let cluster = MockCluster::new().with_state(|state| state.assign_after_polls = usize::MAX);

    let mut builder = ConsumerConfigBuilder::new();
    builder
        .bootstrap_servers("localhost:9092")
        .schema_registry_url("http://localhost:8081")
        .rewind_max_attempts(3);

    let mut consumer = TopicConsumer::new(
        builder.build().unwrap(),
        cluster.clone(),
        Json::<String>::new(),
        cluster.processor(),
    );

    consumer.request_rewind_to_beginning();

    assert!(matches!(
        consumer.start(),
        Err(TopicConsumerError::AssignmentTimeout { attempts: 3 })
    ));
    assert_eq!(cluster.polls(), 3);
    assert_eq!(cluster.closes(), 1);
}

#[test]
fn test_stop_while_awaiting_assignment() {
    let stop = StopHandle::default();
    let cluster = MockCluster::new()
        .with_state(|state| state.assign_after_polls = usize::MAX)
        .stop_when_drained(stop.clone());

    let mut consumer = TopicConsumer::new(
        config(),
        cluster.clone(),
        Json::<String>::new(),
        cluster.processor(),
    )
    .with_stop_handle(stop);

    consumer.request_rewind_to_beginning();
    consumer.start().unwrap();

    assert_eq!(
        cluster.events(),
        vec![Event::Subscribe(TOPIC.to_owned()), Event::Poll, Event::Close]
    );
}

#[test]
fn test_processor_error_aborts_loop() {
    let stop = StopHandle::default();
    let cluster = MockCluster::new()
        .with_batches([
            vec![json_record(0, "R1"), json_record(1, "bad"), json_record(2, "R3")],
            vec![json_record(3, "R4")],
        ])
        .stop_when_drained(stop.clone());

    let mut consumer = TopicConsumer::new(
        config(),
        cluster.clone(),
        Json::<String>::new(),
        cluster.processor().fail_on("bad"),
    )
    .with_stop_handle(stop);

    let err = consumer.start().unwrap_err();

    assert!(matches!(err, TopicConsumerError::ProcessorError(_)));
    assert_eq!(err.to_string(), "TopicConsumerError::ProcessorError: refusing to process bad");
    assert_eq!(processed(&cluster.events()), vec!["R1".to_owned()]);
    assert_eq!(cluster.polls(), 1);
    assert_eq!(cluster.closes(), 1);
}

#[test]
fn test_malformed_record_aborts_loop() {
    let stop = StopHandle::default();
    let cluster = MockCluster::new()
        .with_batches([vec![
            json_record(0, "R1"),
            ConsumedRecord::new(TOPIC, 1, 5).with_payload("not json"),
            json_record(2, "R3"),
        ]])
        .stop_when_drained(stop.clone());

    let mut consumer = TopicConsumer::new(
        config(),
        cluster.clone(),
        Json::<String>::new(),
        cluster.processor(),
    )
    .with_stop_handle(stop);

    match consumer.start() {
        Err(TopicConsumerError::DecodeError {
            topic,
            partition,
            offset,
            ..
        }) => {
            assert_eq!(topic, TOPIC);
            assert_eq!(partition, 1);
            assert_eq!(offset, 5);
        }
        other => panic!("unexpected result: {:?}", other),
    }

    assert_eq!(processed(&cluster.events()), vec!["R1".to_owned()]);
    assert_eq!(cluster.closes(), 1);
}

#[test]
fn test_missing_payload_aborts_loop() {
    let stop = StopHandle::default();
    let cluster = MockCluster::new()
        .with_batches([vec![ConsumedRecord::new(TOPIC, 0, 9)]])
        .stop_when_drained(stop.clone());

    let mut consumer = TopicConsumer::new(
        config(),
        cluster.clone(),
        Json::<String>::new(),
        cluster.processor(),
    )
    .with_stop_handle(stop);

    assert!(matches!(
        consumer.start(),
        Err(TopicConsumerError::MissingPayload { offset: 9, .. })
    ));
}

#[test]
fn test_connect_failure_propagates() {
    let cluster = MockCluster::new().with_state(|state| state.fail_connect = true);

    let mut consumer = TopicConsumer::new(
        config(),
        cluster.clone(),
        Json::<String>::new(),
        cluster.processor(),
    );

    assert!(matches!(consumer.start(), Err(TopicConsumerError::Client(_))));
    assert_eq!(cluster.connects(), 0);
    assert_eq!(cluster.closes(), 0);
}

#[test]
fn test_poll_before_start() {
    let cluster = MockCluster::new();

    let mut consumer = TopicConsumer::new(
        config(),
        cluster.clone(),
        Json::<String>::new(),
        cluster.processor(),
    );

    assert!(matches!(consumer.poll(), Err(TopicConsumerError::NotStarted)));
    assert_eq!(cluster.polls(), 0);
}

#[test]
fn test_debug_output() {
    let cluster = MockCluster::new();

    let mut consumer = TopicConsumer::new(
        config(),
        cluster.clone(),
        Json::<String>::new(),
        cluster.processor(),
    );
    consumer.request_rewind_to_beginning();

    let rendered = format!("{:?}", consumer);

    assert!(rendered.contains("RecordingProcessor"));
    assert!(rendered.contains("bootstrap_servers: \"localhost:9092\""));
    assert!(rendered.contains("schema_registry_url: \"http://localhost:8081\""));
    assert!(rendered.contains("seek_from_beginning: true"));
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
struct Transfer {
    id: String,
    amount: i64,
}

const TRANSFER_SCHEMA: &str = r#"
{
    "type": "record",
    "name": "Transfer",
    "fields": [
        {"name": "id", "type": "string"},
        {"name": "amount", "type": "long"}
    ]
}
"#;

#[test]
fn test_avro_records_reach_processor() {
    let schema = Schema::parse_str(TRANSFER_SCHEMA).unwrap();
    let registry = InMemorySchemaRegistry::new().with_schema(41, schema.clone());

    let transfers = vec![
        Transfer {
            id: "t-1".to_owned(),
            amount: 100,
        },
        Transfer {
            id: "t-2".to_owned(),
            amount: -40,
        },
    ];

    let records = transfers
        .iter()
        .enumerate()
        .map(|(offset, transfer)| {
            let value = to_value(transfer).unwrap().resolve(&schema).unwrap();
            let datum = to_avro_datum(&schema, value).unwrap();

            ConsumedRecord::new(TOPIC, 0, offset as i64)
                .with_key(transfer.id.as_str())
                .with_payload(frame(41, &datum))
        })
        .collect::<Vec<_>>();

    let stop = StopHandle::default();
    let cluster = MockCluster::new()
        .with_batches([records])
        .stop_when_drained(stop.clone());

    let mut received = Vec::new();

    let mut consumer = TopicConsumer::new(
        config(),
        cluster.clone(),
        ConfluentAvro::<Transfer, _>::new(registry),
        process_fn(|transfer: Transfer| {
            received.push(transfer);
            Ok::<_, std::convert::Infallible>(())
        }),
    )
    .with_stop_handle(stop);

    consumer.start().unwrap();
    drop(consumer);

    assert_eq!(received, transfers);
}
