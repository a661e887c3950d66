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

use std::marker::PhantomData;

use apache_avro::{from_avro_datum, from_value, types::Value};
use serde::de::DeserializeOwned;

use crate::error::DecodeError;

use super::{registry::SchemaRegistry, RecordDeserializer};

pub const MAGIC_BYTE: u8 = 0;
const HEADER_LEN: usize = 5;

/// Splits a registry framed payload into its schema id and Avro datum.
///
/// The frame is a zero magic byte followed by the schema id as a big endian
/// u32, then the binary encoded datum.
pub fn split_frame(bytes: &[u8]) -> Result<(u32, &[u8]), DecodeError> {
    match bytes {
        [] => Err(DecodeError::EmptyPayload),
        [MAGIC_BYTE, a, b, c, d, datum @ ..] => Ok((u32::from_be_bytes([*a, *b, *c, *d]), datum)),
        [MAGIC_BYTE, ..] => Err(DecodeError::TruncatedHeader(bytes.len())),
        [magic, ..] => Err(DecodeError::UnknownMagicByte(*magic)),
    }
}

pub fn frame(schema_id: u32, datum: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(HEADER_LEN + datum.len());

    bytes.push(MAGIC_BYTE);
    bytes.extend_from_slice(&schema_id.to_be_bytes());
    bytes.extend_from_slice(datum);

    bytes
}

fn read_value<R>(registry: &R, bytes: &[u8]) -> Result<Value, DecodeError>
where
    R: SchemaRegistry,
{
    let (schema_id, mut datum) = split_frame(bytes)?;

    let schema = registry.schema_by_id(schema_id)?;

    Ok(from_avro_datum(&schema, &mut datum, None)?)
}

/// Decodes registry framed Avro into `T`.
pub struct ConfluentAvro<T, R> {
    registry: R,
    _type: PhantomData<fn() -> T>,
}

impl<T, R> ConfluentAvro<T, R> {
    pub fn new(registry: R) -> Self {
        ConfluentAvro {
            registry,
            _type: Default::default(),
        }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }
}

impl<T, R> RecordDeserializer for ConfluentAvro<T, R>
where
    T: DeserializeOwned,
    R: SchemaRegistry,
{
    type Output = T;
    type Error = DecodeError;

    fn deserialize(&self, bytes: &[u8]) -> Result<Self::Output, Self::Error> {
        let value = read_value(&self.registry, bytes)?;

        Ok(from_value(&value)?)
    }
}

/// Decodes registry framed Avro without binding to a target type.
pub struct GenericAvro<R> {
    registry: R,
}

impl<R> GenericAvro<R> {
    pub fn new(registry: R) -> Self {
        GenericAvro { registry }
    }
}

impl<R> RecordDeserializer for GenericAvro<R>
where
    R: SchemaRegistry,
{
    type Output = Value;
    type Error = DecodeError;

    fn deserialize(&self, bytes: &[u8]) -> Result<Self::Output, Self::Error> {
        read_value(&self.registry, bytes)
    }
}
