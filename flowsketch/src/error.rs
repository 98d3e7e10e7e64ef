// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Crate error type.
//!
//! The sketch operations themselves are total: `insert`, `query` and
//! `heavy_flows` cannot fail. Errors arise only at the edges, when keys are
//! built from external input such as raw trace records or user strings.

use std::fmt;

/// Error raised while constructing a key from external input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A byte slice had the wrong length for the key schema.
    InvalidKeyLength {
        /// Length the schema requires.
        expected: usize,
        /// Length that was supplied.
        actual: usize,
    },
    /// A string could not be packed into a compact string key.
    InvalidStringKey(String),
}

impl Error {
    pub(crate) fn invalid_key_length(expected: usize, actual: usize) -> Self {
        Error::InvalidKeyLength { expected, actual }
    }

    pub(crate) fn invalid_string_key(message: impl Into<String>) -> Self {
        Error::InvalidStringKey(message.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidKeyLength { expected, actual } => {
                write!(f, "invalid key length: expected {expected} bytes, got {actual}")
            }
            Error::InvalidStringKey(message) => {
                write!(f, "invalid string key: {message}")
            }
        }
    }
}

impl std::error::Error for Error {}
