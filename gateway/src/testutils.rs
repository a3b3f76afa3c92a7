use crate::bot::{BotCore, CoreAuth, CoreError, CorePayload};
use crate::store::{KvStore, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// In-memory configuration store for tests.
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        MemoryStore {
            values: entries
                .into_iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        }
    }

    pub fn from_entries(entries: Vec<(&str, String)>) -> Self {
        MemoryStore {
            values: entries
                .into_iter()
                .map(|(key, value)| (key.to_string(), value))
                .collect(),
        }
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.get(key).cloned())
    }
}

/// Scripted bot core that records every invocation.
pub struct ScriptedCore {
    outcome: Result<String, CoreError>,
    invocations: AtomicUsize,
    pub seen: Mutex<Vec<(CorePayload, CoreAuth)>>,
}

impl ScriptedCore {
    pub fn succeeding(result: &str) -> Self {
        ScriptedCore {
            outcome: Ok(result.to_string()),
            invocations: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: CoreError) -> Self {
        ScriptedCore {
            outcome: Err(error),
            invocations: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn invocation_count(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BotCore for ScriptedCore {
    async fn invoke(&self, payload: CorePayload, auth: CoreAuth) -> Result<String, CoreError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push((payload, auth));
        self.outcome.clone()
    }
}
