//! Debounced, loop-guarded persistence of UI state
//!
//! [`PersistenceGuard::load`] never fails: missing, malformed, unmigratable or
//! invalid data all degrade to the caller's defaults, with the failure sent
//! to the error callback. Saves are coalesced per key by a trailing
//! [`Debouncer`] and written when the owner calls [`PersistenceGuard::tick`].
//! A per-key [`SaveBreaker`] stops runaway save loops.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::error::PersistenceError;
use crate::scheduler::{Clock, Debouncer};
use crate::storage::KeyValueStore;

pub const DEFAULT_DEBOUNCE_MS: u64 = 300;
pub const DEFAULT_BREAKER_THRESHOLD: usize = 10;
pub const DEFAULT_BREAKER_WINDOW_MS: u64 = 100;
pub const DEFAULT_BREAKER_COOLDOWN_MS: u64 = 5_000;

pub type ErrorCallback = Box<dyn Fn(&PersistenceError) + Send + Sync>;
pub type MigrateFn = Box<dyn Fn(Value) -> Result<Value, String> + Send + Sync>;
pub type ValidateFn = Box<dyn Fn(&Value) -> bool + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistenceConfig {
    pub debounce: Duration,
    /// Attempts allowed inside `breaker_window`; one more trips the breaker.
    pub breaker_threshold: usize,
    pub breaker_window: Duration,
    pub breaker_cooldown: Duration,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            breaker_threshold: DEFAULT_BREAKER_THRESHOLD,
            breaker_window: Duration::from_millis(DEFAULT_BREAKER_WINDOW_MS),
            breaker_cooldown: Duration::from_millis(DEFAULT_BREAKER_COOLDOWN_MS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerDecision {
    Allowed,
    /// This attempt opened the breaker.
    Tripped,
    /// The breaker was already open; carries the remaining cooldown.
    Open(Duration),
}

#[derive(Debug, Clone)]
pub struct SaveBreaker {
    threshold: usize,
    window: Duration,
    cooldown: Duration,
    attempts: VecDeque<Instant>,
    open_until: Option<Instant>,
}

impl SaveBreaker {
    pub fn new(config: &PersistenceConfig) -> Self {
        Self {
            threshold: config.breaker_threshold,
            window: config.breaker_window,
            cooldown: config.breaker_cooldown,
            attempts: VecDeque::new(),
            open_until: None,
        }
    }

    pub fn is_open(&self, now: Instant) -> bool {
        self.open_until.is_some_and(|until| now < until)
    }

    pub fn record_attempt(&mut self, now: Instant) -> BreakerDecision {
        if let Some(until) = self.open_until {
            if now < until {
                return BreakerDecision::Open(until - now);
            }
            debug!("save breaker cooldown elapsed; closing");
            self.open_until = None;
            self.attempts.clear();
        }

        while let Some(oldest) = self.attempts.front() {
            if now.duration_since(*oldest) >= self.window {
                self.attempts.pop_front();
            } else {
                break;
            }
        }
        self.attempts.push_back(now);

        if self.attempts.len() > self.threshold {
            self.open_until = Some(now + self.cooldown);
            self.attempts.clear();
            return BreakerDecision::Tripped;
        }
        BreakerDecision::Allowed
    }
}

pub struct PersistenceGuard {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    config: PersistenceConfig,
    migrate: Option<MigrateFn>,
    validate: Option<ValidateFn>,
    on_error: Option<ErrorCallback>,
    breakers: HashMap<String, SaveBreaker>,
    pending: HashMap<String, Debouncer<String>>,
}

impl PersistenceGuard {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            config: PersistenceConfig::default(),
            migrate: None,
            validate: None,
            on_error: None,
            breakers: HashMap::new(),
            pending: HashMap::new(),
        }
    }

    pub fn with_config(mut self, config: PersistenceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_migration(
        mut self,
        migrate: impl Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    ) -> Self {
        self.migrate = Some(Box::new(migrate));
        self
    }

    pub fn with_validation(
        mut self,
        validate: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.validate = Some(Box::new(validate));
        self
    }

    pub fn on_error(
        mut self,
        callback: impl Fn(&PersistenceError) + Send + Sync + 'static,
    ) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }

    /// Reads `key` from storage and merges it over `defaults`.
    pub fn load<T>(&self, key: &str, defaults: T) -> T
    where
        T: Serialize + DeserializeOwned,
    {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return defaults,
            Err(source) => {
                self.report(&PersistenceError::Storage {
                    key: key.to_string(),
                    source,
                });
                return defaults;
            }
        };
        self.decode(key, &raw, defaults)
    }

    /// Like [`load`](Self::load), but sees a pending unwritten save first.
    pub fn current<T>(&self, key: &str, defaults: T) -> T
    where
        T: Serialize + DeserializeOwned,
    {
        match self.pending.get(key).and_then(Debouncer::pending) {
            Some(raw) => self.decode(key, raw, defaults),
            None => self.load(key, defaults),
        }
    }

    /// Queues a write of `state`, replacing any pending write for `key`.
    pub fn save<T: Serialize>(&mut self, key: &str, state: &T) -> Result<(), PersistenceError> {
        let now = self.clock.now();
        let breaker = self
            .breakers
            .entry(key.to_string())
            .or_insert_with(|| SaveBreaker::new(&self.config));

        match breaker.record_attempt(now) {
            BreakerDecision::Allowed => {}
            BreakerDecision::Open(retry_after) => {
                debug!(key, "save rejected while breaker is open");
                return Err(PersistenceError::InfiniteLoopDetected {
                    key: key.to_string(),
                    retry_after,
                });
            }
            BreakerDecision::Tripped => {
                if let Some(debouncer) = self.pending.get_mut(key) {
                    debouncer.cancel();
                }
                let err = PersistenceError::InfiniteLoopDetected {
                    key: key.to_string(),
                    retry_after: self.config.breaker_cooldown,
                };
                error!(
                    key,
                    threshold = self.config.breaker_threshold,
                    window_ms = self.config.breaker_window.as_millis() as u64,
                    "save loop detected; pausing persistence"
                );
                self.report(&err);
                return Err(err);
            }
        }

        let serialized = match serde_json::to_string(state) {
            Ok(serialized) => serialized,
            Err(source) => {
                let err = PersistenceError::Serialization {
                    key: key.to_string(),
                    message: source.to_string(),
                };
                self.report(&err);
                return Err(err);
            }
        };

        let debounce = self.config.debounce;
        self.pending
            .entry(key.to_string())
            .or_insert_with(|| Debouncer::new(debounce))
            .schedule(serialized, now);
        Ok(())
    }

    /// Writes every pending save whose debounce window has elapsed.
    pub fn tick(&mut self) -> usize {
        let now = self.clock.now();
        let due: Vec<(String, String)> = self
            .pending
            .iter_mut()
            .filter_map(|(key, debouncer)| debouncer.poll(now).map(|value| (key.clone(), value)))
            .collect();
        self.write_all(due)
    }

    /// Writes every pending save immediately.
    pub fn flush(&mut self) -> usize {
        let due: Vec<(String, String)> = self
            .pending
            .iter_mut()
            .filter_map(|(key, debouncer)| debouncer.flush().map(|value| (key.clone(), value)))
            .collect();
        self.write_all(due)
    }

    pub fn has_pending(&self, key: &str) -> bool {
        self.pending.get(key).is_some_and(Debouncer::is_pending)
    }

    /// Earliest instant at which [`tick`](Self::tick) has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().filter_map(Debouncer::deadline).min()
    }

    pub fn is_breaker_open(&self, key: &str) -> bool {
        let now = self.clock.now();
        self.breakers
            .get(key)
            .is_some_and(|breaker| breaker.is_open(now))
    }

    /// Drops pending writes and stored data for `key`.
    pub fn reset<T>(&mut self, key: &str, defaults: T) -> T {
        if let Some(debouncer) = self.pending.get_mut(key) {
            debouncer.cancel();
        }
        if let Err(source) = self.store.remove(key) {
            self.report(&PersistenceError::Storage {
                key: key.to_string(),
                source,
            });
        }
        defaults
    }

    pub fn get_property<T>(&self, key: &str, defaults: T, name: &str) -> Option<Value>
    where
        T: Serialize + DeserializeOwned,
    {
        let state = self.current(key, defaults);
        match serde_json::to_value(&state) {
            Ok(Value::Object(map)) => map.get(name).cloned(),
            Ok(_) => None,
            Err(err) => {
                warn!(key, error = %err, "failed to serialize state for property lookup");
                None
            }
        }
    }

    /// Replaces one top-level field and queues a save of the result.
    pub fn set_property<T>(
        &mut self,
        key: &str,
        defaults: T,
        name: &str,
        value: Value,
    ) -> Result<T, PersistenceError>
    where
        T: Serialize + DeserializeOwned,
    {
        let state = self.current(key, defaults);
        let mut object = match serde_json::to_value(&state) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                return Err(PersistenceError::Validation {
                    key: key.to_string(),
                    message: "state is not a JSON object".to_string(),
                });
            }
            Err(source) => {
                return Err(PersistenceError::Serialization {
                    key: key.to_string(),
                    message: source.to_string(),
                });
            }
        };
        object.insert(name.to_string(), value);

        let updated: T = serde_json::from_value(Value::Object(object)).map_err(|source| {
            PersistenceError::Validation {
                key: key.to_string(),
                message: format!("property '{name}': {source}"),
            }
        })?;
        self.save(key, &updated)?;
        Ok(updated)
    }

    fn decode<T>(&self, key: &str, raw: &str, defaults: T) -> T
    where
        T: Serialize + DeserializeOwned,
    {
        let parsed: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(source) => {
                self.report(&PersistenceError::Parse {
                    key: key.to_string(),
                    message: source.to_string(),
                });
                return defaults;
            }
        };

        let migrated = match &self.migrate {
            Some(migrate) => match migrate(parsed) {
                Ok(value) => value,
                Err(message) => {
                    self.report(&PersistenceError::Migration {
                        key: key.to_string(),
                        message,
                    });
                    return defaults;
                }
            },
            None => parsed,
        };

        if let Some(validate) = &self.validate
            && !validate(&migrated)
        {
            self.report(&PersistenceError::Validation {
                key: key.to_string(),
                message: "stored state rejected by validator".to_string(),
            });
            return defaults;
        }

        let base = match serde_json::to_value(&defaults) {
            Ok(value) => value,
            Err(source) => {
                self.report(&PersistenceError::Serialization {
                    key: key.to_string(),
                    message: source.to_string(),
                });
                return defaults;
            }
        };

        let merged = match merge_shallow(base, migrated) {
            Ok(value) => value,
            Err(message) => {
                self.report(&PersistenceError::Validation {
                    key: key.to_string(),
                    message,
                });
                return defaults;
            }
        };

        match serde_json::from_value(merged) {
            Ok(state) => state,
            Err(source) => {
                self.report(&PersistenceError::Validation {
                    key: key.to_string(),
                    message: source.to_string(),
                });
                defaults
            }
        }
    }

    fn write_all(&self, due: Vec<(String, String)>) -> usize {
        let mut written = 0;
        for (key, value) in due {
            match self.store.set(&key, &value) {
                Ok(()) => {
                    debug!(key = key.as_str(), bytes = value.len(), "persisted state");
                    written += 1;
                }
                Err(source) => self.report(&PersistenceError::Storage { key, source }),
            }
        }
        written
    }

    fn report(&self, err: &PersistenceError) {
        match err {
            PersistenceError::InfiniteLoopDetected { .. } => {}
            _ => warn!(key = err.key(), kind = err.kind(), error = %err, "persistence failure"),
        }
        if let Some(callback) = &self.on_error {
            callback(err);
        }
    }
}

/// Top-level keys of `stored` replace those of `defaults` wholesale.
pub fn merge_shallow(defaults: Value, stored: Value) -> Result<Value, String> {
    match (defaults, stored) {
        (Value::Object(mut base), Value::Object(overrides)) => {
            for (key, value) in overrides {
                base.insert(key, value);
            }
            Ok(Value::Object(base))
        }
        (Value::Object(_), other) => Err(format!(
            "expected a JSON object, found {}",
            json_type_name(&other)
        )),
        (_, other) => Ok(other),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
