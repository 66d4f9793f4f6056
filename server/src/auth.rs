//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Credential and account collaborators.
//!
//! The connection core treats credentials as opaque: a stored string, a
//! plaintext attempt, and a yes/no comparison. The scheme behind the
//! stored string is the implementation's business, not the state
//! machine's.

use std::collections::HashMap;
use tracing::warn;

/// Opaque credential comparison and digestion.
pub trait CredentialCheck: Send {
    /// Does `plaintext` match the `stored` credential?
    fn matches(&self, stored: &str, plaintext: &str) -> bool;

    /// Produce the stored form of a new plaintext credential. `None` means
    /// the plaintext could not be digested and nothing should be stored.
    fn digest(&self, plaintext: &str) -> Option<String>;
}

/// bcrypt-backed credentials, used by the server binary.
pub struct BcryptCredentials;

impl CredentialCheck for BcryptCredentials {
    fn matches(&self, stored: &str, plaintext: &str) -> bool {
        bcrypt::verify(plaintext, stored).unwrap_or(false)
    }

    fn digest(&self, plaintext: &str) -> Option<String> {
        match bcrypt::hash(plaintext, bcrypt::DEFAULT_COST) {
            Ok(digest) => Some(digest),
            Err(err) => {
                warn!(error = %err, "bcrypt digest failed");
                None
            }
        }
    }
}

/// Plaintext-equality credentials for tests and development.
pub struct PlainCredentials;

impl CredentialCheck for PlainCredentials {
    fn matches(&self, stored: &str, plaintext: &str) -> bool {
        stored == plaintext
    }

    fn digest(&self, plaintext: &str) -> Option<String> {
        Some(plaintext.to_string())
    }
}

/// Name-keyed account secret storage.
pub trait AccountStore: Send {
    /// The stored credential for `name`, if the account exists.
    fn secret(&self, name: &str) -> Option<String>;

    /// Store (or replace) the credential for `name`.
    fn store_secret(&mut self, name: &str, secret: &str);

    /// Whether an account exists under `name`.
    fn contains(&self, name: &str) -> bool {
        self.secret(name).is_some()
    }
}

/// In-memory account store.
#[derive(Debug, Default)]
pub struct MemoryAccounts {
    secrets: HashMap<String, String>,
}

impl MemoryAccounts {
    /// Create an empty store.
    pub fn new() -> Self {
        MemoryAccounts::default()
    }

    /// Builder-style seeding, handy in tests.
    pub fn with_account(mut self, name: &str, secret: &str) -> Self {
        self.secrets.insert(name.to_string(), secret.to_string());
        self
    }
}

impl AccountStore for MemoryAccounts {
    fn secret(&self, name: &str) -> Option<String> {
        self.secrets.get(name).cloned()
    }

    fn store_secret(&mut self, name: &str, secret: &str) {
        self.secrets.insert(name.to_string(), secret.to_string());
    }
}
