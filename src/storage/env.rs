use std::collections::BTreeMap;

use parking_lot::Mutex;

/// Where process-wide settings for the framework's clients are written.
pub trait EnvSink {
    fn set(&self, key: &str, value: &str);
}

/// Writes straight into the process environment.
///
/// Settings persist for the rest of the process and are only visible to code
/// that reads the environment after they were written.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvSink for ProcessEnv {
    fn set(&self, key: &str, value: &str) {
        std::env::set_var(key, value);
    }
}

/// Keeps settings in memory instead of touching the process environment.
#[derive(Debug, Default)]
pub struct RecordingEnv {
    vars: Mutex<BTreeMap<String, String>>,
}

impl RecordingEnv {
    pub fn get(&self, key: &str) -> Option<String> {
        self.vars.lock().get(key).cloned()
    }

    /// Every recorded setting, ordered by key.
    pub fn vars(&self) -> BTreeMap<String, String> {
        self.vars.lock().clone()
    }
}

impl EnvSink for RecordingEnv {
    fn set(&self, key: &str, value: &str) {
        self.vars.lock().insert(key.to_string(), value.to_string());
    }
}

impl<T: EnvSink + ?Sized> EnvSink for std::sync::Arc<T> {
    fn set(&self, key: &str, value: &str) {
        (**self).set(key, value);
    }
}
