use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use log::{debug, warn};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;

use crate::{
    error::{Result, TrainerError},
    hyperparameters::Hyperparameters,
};

/// Root of the platform's container layout.
pub const DEFAULT_BASE_DIR: &str = "/opt/ml";

/// Prefix of hyperparameters the platform reserves for itself.
const PLATFORM_PREFIX: &str = "sagemaker_";
const TRAINING_STEPS: &str = "training_steps";
const EVALUATION_STEPS: &str = "evaluation_steps";
const CHECKPOINT_PATH: &str = "checkpoint_path";

#[derive(Debug, Deserialize)]
struct ResourceConfig {
    current_host: String,
    hosts: Vec<String>,
}

/// Everything the platform tells a training container about its job.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerEnvironment {
    pub base_dir: PathBuf,
    pub current_host: String,
    pub hosts: Vec<String>,
    pub model_path: String,
    /// Channel name to the directory its data was downloaded to.
    pub input_channels: BTreeMap<String, PathBuf>,
    /// Customer hyperparameters, without the platform's own keys.
    pub hyperparameters: Hyperparameters,
    pub train_steps: Option<u64>,
    pub eval_steps: Option<u64>,
}

impl ContainerEnvironment {
    /// Loads the layout under [`DEFAULT_BASE_DIR`].
    pub fn from_default_dir() -> Result<Self> {
        Self::load(DEFAULT_BASE_DIR)
    }

    /// Loads the container layout rooted at `base_dir`.
    ///
    /// # Arguments
    /// * `base_dir` - Directory holding `input/` and `model/`.
    ///
    /// # Returns
    /// The environment, or an error if a required config file is missing or
    /// malformed.
    pub fn load(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_dir = base_dir.join("input").join("config");

        let resources: ResourceConfig = read_json(&config_dir.join("resourceconfig.json"))?;

        let hps_path = config_dir.join("hyperparameters.json");
        let raw: BTreeMap<String, Value> = if hps_path.exists() {
            read_json(&hps_path)?
        } else {
            warn!("{} not found, assuming no hyperparameters", hps_path.display());
            BTreeMap::new()
        };
        let mut hyperparameters: Hyperparameters = raw
            .into_iter()
            .map(|(k, v)| (k, decode_hyperparameter(v)))
            .collect();
        hyperparameters.remove_where(|k| k.starts_with(PLATFORM_PREFIX));

        let train_steps = take_steps(&mut hyperparameters, TRAINING_STEPS, &hps_path)?;
        let eval_steps = take_steps(&mut hyperparameters, EVALUATION_STEPS, &hps_path)?;

        let model_path = match hyperparameters.get(CHECKPOINT_PATH) {
            Some(Value::String(path)) => path.clone(),
            _ => base_dir.join("model").to_string_lossy().into_owned(),
        };

        let channels_path = config_dir.join("inputdataconfig.json");
        let input_channels = if channels_path.exists() {
            let channels: BTreeMap<String, Value> = read_json(&channels_path)?;
            let data_dir = base_dir.join("input").join("data");
            channels
                .into_keys()
                .map(|name| {
                    let dir = data_dir.join(&name);
                    (name, dir)
                })
                .collect()
        } else {
            BTreeMap::new()
        };

        debug!(
            "loaded container environment: host={} hosts={:?} channels={:?}",
            resources.current_host,
            resources.hosts,
            input_channels.keys().collect::<Vec<_>>()
        );

        Ok(Self {
            base_dir,
            current_host: resources.current_host,
            hosts: resources.hosts,
            model_path,
            input_channels,
            hyperparameters,
            train_steps,
            eval_steps,
        })
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = fs::read_to_string(path).map_err(|e| TrainerError::InvalidConfig {
        path: path.to_path_buf(),
        msg: e.to_string(),
    })?;
    serde_json::from_str(&contents).map_err(|e| TrainerError::InvalidConfig {
        path: path.to_path_buf(),
        msg: e.to_string(),
    })
}

/// The platform hands every hyperparameter over as a string; values that are
/// valid JSON are decoded, anything else stays a plain string.
fn decode_hyperparameter(value: Value) -> Value {
    match value {
        Value::String(s) => serde_json::from_str(&s).unwrap_or(Value::String(s)),
        other => other,
    }
}

fn take_steps(params: &mut Hyperparameters, key: &str, path: &Path) -> Result<Option<u64>> {
    match params.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .map(Some)
            .ok_or_else(|| TrainerError::InvalidConfig {
                path: path.to_path_buf(),
                msg: format!("{key} must be a non-negative integer, got {value}"),
            }),
    }
}
