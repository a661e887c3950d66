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

pub mod avro;
pub mod json;
pub mod registry;

/// Turns a record value into a typed object. Implementations may hold state,
/// such as a schema registry handle.
pub trait RecordDeserializer {
    type Output;
    type Error: Error + Send + Sync + 'static;

    fn deserialize(&self, bytes: &[u8]) -> Result<Self::Output, Self::Error>;
}
