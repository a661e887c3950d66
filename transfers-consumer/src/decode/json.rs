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

use serde::de::DeserializeOwned;

use crate::error::DecodeError;

use super::RecordDeserializer;

pub struct Json<T> {
    _type: PhantomData<fn() -> T>,
}

impl<T> Json<T> {
    pub fn new() -> Self {
        Json {
            _type: Default::default(),
        }
    }
}

impl<T> Default for Json<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RecordDeserializer for Json<T>
where
    T: DeserializeOwned,
{
    type Output = T;
    type Error = DecodeError;

    fn deserialize(&self, bytes: &[u8]) -> Result<Self::Output, Self::Error> {
        if bytes.is_empty() {
            return Err(DecodeError::EmptyPayload);
        }

        Ok(serde_json::from_slice(bytes)?)
    }
}
