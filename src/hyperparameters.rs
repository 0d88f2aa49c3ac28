use std::{collections::BTreeMap, sync::Arc};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Checkpointing interval applied when the customer does not pick one.
pub const DEFAULT_SAVE_CHECKPOINTS_SECS: u64 = 300;

/// Run-configuration keys forwarded from the hyperparameters when present.
pub const RUN_CONFIG_KEYS: [&str; 6] = [
    "save_checkpoints_secs",
    "save_summary_steps",
    "save_checkpoints_steps",
    "keep_checkpoint_max",
    "keep_checkpoint_every_n_hours",
    "log_step_count_steps",
];

/// Evaluation-tuning keys forwarded to the eval spec when present.
pub const EVAL_TUNING_KEYS: [&str; 2] = ["throttle_secs", "start_delay_secs"];

/// Customer hyperparameters, name to primitive value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hyperparameters(BTreeMap<String, Value>);

impl Hyperparameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(Value::as_u64)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Inserts `value` under `key`, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Inserts `value` only when `key` is not set yet.
    pub fn set_default(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.entry(key.into()).or_insert_with(|| value.into());
    }

    /// Merges the default table into these hyperparameters, keeping every
    /// value already present.
    pub fn apply_defaults(&mut self) {
        self.set_default("save_checkpoints_secs", DEFAULT_SAVE_CHECKPOINTS_SECS);
    }

    /// Copies out the entries whose key is one of `keys`. Absent keys are
    /// skipped, not defaulted.
    pub fn pick(&self, keys: &[&str]) -> Self {
        keys.iter()
            .filter_map(|&k| self.get(k).map(|v| (k.to_string(), v.clone())))
            .collect()
    }

    /// Drops every entry whose key satisfies `pred`.
    pub fn remove_where(&mut self, mut pred: impl FnMut(&str) -> bool) {
        self.0.retain(|k, _| !pred(k));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Value)> for Hyperparameters {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<K: Into<String>, V: Into<Value>> Extend<(K, V)> for Hyperparameters {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

/// A live, shared handle to the customer hyperparameters.
///
/// Input adapters handed to the framework keep a clone of this handle and
/// read it when they are called, so edits made after a spec was built are
/// still observed by the customer's functions.
#[derive(Debug, Clone, Default)]
pub struct SharedHyperparameters(Arc<RwLock<Hyperparameters>>);

impl SharedHyperparameters {
    pub fn new(params: Hyperparameters) -> Self {
        Self(Arc::new(RwLock::new(params)))
    }

    /// Clones the current contents.
    pub fn snapshot(&self) -> Hyperparameters {
        self.0.read().clone()
    }

    /// Runs `f` against the current contents without cloning them.
    pub fn with<T>(&self, f: impl FnOnce(&Hyperparameters) -> T) -> T {
        f(&self.0.read())
    }

    /// Runs `f` with exclusive access to the contents.
    pub fn update<T>(&self, f: impl FnOnce(&mut Hyperparameters) -> T) -> T {
        f(&mut self.0.write())
    }
}
