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

use std::{convert::Infallible, fmt::Display};

use tracing::info;
use transfers_consumer::RecordProcessor;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    pub id: String,
    pub account_id: String,
    pub amount: i64,
    #[serde(rename = "transferTS")]
    pub transfer_ts: i64,
}

impl Display for Transfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Transfer {{ id: {}, account_id: {}, amount: {}, transfer_ts: {} }}",
            self.id, self.account_id, self.amount, self.transfer_ts
        )
    }
}

/// Records transfers by writing them to the log.
#[derive(Debug, Default)]
pub struct TransferLogger {
    recorded: u64,
}

impl TransferLogger {
    pub fn recorded(&self) -> u64 {
        self.recorded
    }
}

impl RecordProcessor<Transfer> for TransferLogger {
    type Error = Infallible;

    fn process(&mut self, transfer: Transfer) -> Result<(), Self::Error> {
        self.recorded += 1;

        info!("Recording {}", transfer);

        Ok(())
    }
}
