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

use crate::error::BoxedError;

/// Receives each decoded record. Called synchronously from the poll loop,
/// an error stops the consumer.
pub trait RecordProcessor<T> {
    type Error: Into<BoxedError>;

    fn process(&mut self, value: T) -> Result<(), Self::Error>;
}

pub struct ProcessFn<F, T> {
    f: F,
    _type: PhantomData<fn(T)>,
}

/// Wraps a closure as a [`RecordProcessor`].
pub fn process_fn<F, T, E>(f: F) -> ProcessFn<F, T>
where
    F: FnMut(T) -> Result<(), E>,
    E: Into<BoxedError>,
{
    ProcessFn {
        f,
        _type: PhantomData,
    }
}

impl<F, T, E> RecordProcessor<T> for ProcessFn<F, T>
where
    F: FnMut(T) -> Result<(), E>,
    E: Into<BoxedError>,
{
    type Error = E;

    fn process(&mut self, value: T) -> Result<(), Self::Error> {
        (self.f)(value)
    }
}
