use std::{collections::BTreeMap, path::PathBuf};

use log::{debug, info};

use crate::{
    cluster::{TaskType, TfConfig},
    environment::ContainerEnvironment,
    error::{Result, TrainerError},
    framework::{EvalSpecArgs, Framework, InputFn, RunConfigArgs, SERVING_EXPORTER_NAME},
    hyperparameters::{Hyperparameters, SharedHyperparameters, EVAL_TUNING_KEYS, RUN_CONFIG_KEYS},
    script::{CustomerScript, DataInputFn, EstimatorSource, ESTIMATOR_FUNCTIONS},
    storage::{self, BucketLocator, EnvSink, HttpBucketLocator, ProcessEnv, S3Location},
};

/// Channel the train and eval input functions read from.
pub const TRAINING_CHANNEL: &str = "training";
/// Evaluation steps used when none are configured.
pub const DEFAULT_EVAL_STEPS: u64 = 100;
/// Environment entry the cluster descriptor is exported to.
pub const TF_CONFIG: &str = "TF_CONFIG";

/// Turns the platform's view of a training job into the framework's
/// estimator, run configuration and train/eval specs.
pub struct Trainer<F: Framework> {
    framework: F,
    pub customer_script: CustomerScript<F>,
    pub current_host: String,
    pub hosts: Vec<String>,
    pub model_path: String,
    pub input_channels: BTreeMap<String, PathBuf>,
    pub train_steps: Option<u64>,
    pub eval_steps: Option<u64>,
    customer_params: SharedHyperparameters,
    task_type: Option<TaskType>,
}

/// Collects a `Trainer`'s inputs.
pub struct TrainerBuilder<F: Framework> {
    customer_script: CustomerScript<F>,
    current_host: String,
    hosts: Vec<String>,
    model_path: String,
    input_channels: BTreeMap<String, PathBuf>,
    customer_params: Hyperparameters,
    train_steps: Option<u64>,
    eval_steps: Option<u64>,
    locator: Option<Box<dyn BucketLocator>>,
    env: Option<Box<dyn EnvSink>>,
}

impl<F: Framework> TrainerBuilder<F> {
    /// Creates a new `TrainerBuilder` with the required inputs.
    ///
    /// # Arguments
    /// * `customer_script` - The functions the customer's script defines.
    /// * `current_host` - The host this process runs on.
    /// * `hosts` - Every host of the job, master first.
    /// * `model_path` - Local directory or `s3://` URI for checkpoints.
    pub fn new(
        customer_script: CustomerScript<F>,
        current_host: impl Into<String>,
        hosts: Vec<String>,
        model_path: impl Into<String>,
    ) -> Self {
        Self {
            customer_script,
            current_host: current_host.into(),
            hosts,
            model_path: model_path.into(),
            input_channels: BTreeMap::new(),
            customer_params: Hyperparameters::new(),
            train_steps: None,
            eval_steps: None,
            locator: None,
            env: None,
        }
    }

    /// Seeds a builder from the platform's container layout.
    pub fn from_environment(customer_script: CustomerScript<F>, env: ContainerEnvironment) -> Self {
        Self::new(customer_script, env.current_host, env.hosts, env.model_path)
            .input_channels(env.input_channels)
            .customer_params(env.hyperparameters)
            .train_steps(env.train_steps)
            .eval_steps(env.eval_steps)
    }

    pub fn input_channels<K, P>(mut self, channels: impl IntoIterator<Item = (K, P)>) -> Self
    where
        K: Into<String>,
        P: Into<PathBuf>,
    {
        self.input_channels = channels
            .into_iter()
            .map(|(k, p)| (k.into(), p.into()))
            .collect();
        self
    }

    pub fn customer_params(mut self, params: Hyperparameters) -> Self {
        self.customer_params = params;
        self
    }

    pub fn train_steps(mut self, steps: Option<u64>) -> Self {
        self.train_steps = steps;
        self
    }

    pub fn eval_steps(mut self, steps: Option<u64>) -> Self {
        self.eval_steps = steps;
        self
    }

    /// Overrides how bucket regions are looked up for `s3://` model paths.
    pub fn bucket_locator(mut self, locator: impl BucketLocator + 'static) -> Self {
        self.locator = Some(Box::new(locator));
        self
    }

    /// Overrides where storage client settings are written.
    pub fn env_sink(mut self, env: impl EnvSink + 'static) -> Self {
        self.env = Some(Box::new(env));
        self
    }

    /// Builds the `Trainer`, configuring object storage access first when
    /// the model path needs it.
    ///
    /// # Returns
    /// The trainer, or an error if the model path is an invalid `s3://` URI
    /// or its bucket cannot be located.
    pub fn build(self, framework: F) -> Result<Trainer<F>> {
        let mut customer_params = self.customer_params;
        customer_params.apply_defaults();

        if S3Location::is_s3(&self.model_path) {
            let locator: Box<dyn BucketLocator> = match self.locator {
                Some(locator) => locator,
                None => Box::new(HttpBucketLocator::new().map_err(|source| {
                    TrainerError::BucketLocation {
                        bucket: self.model_path.clone(),
                        source: source.into(),
                    }
                })?),
            };
            let env: Box<dyn EnvSink> = match self.env {
                Some(env) => env,
                None => Box::new(ProcessEnv),
            };
            storage::configure_s3_file_system(&self.model_path, locator.as_ref(), env.as_ref())?;
        }

        info!(
            "trainer ready: host={} hosts={} model_path={} script={:?}",
            self.current_host,
            self.hosts.len(),
            self.model_path,
            self.customer_script
        );

        Ok(Trainer {
            framework,
            customer_script: self.customer_script,
            current_host: self.current_host,
            hosts: self.hosts,
            model_path: self.model_path,
            input_channels: self.input_channels,
            train_steps: self.train_steps,
            eval_steps: self.eval_steps,
            customer_params: SharedHyperparameters::new(customer_params),
            task_type: None,
        })
    }
}

impl<F: Framework> Trainer<F> {
    pub fn framework(&self) -> &F {
        &self.framework
    }

    /// The live hyperparameters. Edits are seen by input functions that were
    /// already handed to the framework.
    pub fn customer_params(&self) -> &SharedHyperparameters {
        &self.customer_params
    }

    /// The role resolved by the last [`Trainer::build_tf_config`] call.
    pub fn task_type(&self) -> Option<TaskType> {
        self.task_type
    }

    /// Lays out the cluster and records this host's role.
    pub fn build_tf_config(&mut self) -> Result<TfConfig> {
        let config = TfConfig::build(&self.hosts, &self.current_host)?;
        info!(
            "{} is {} {} of {} host(s)",
            self.current_host,
            config.task.task_type,
            config.task.index,
            self.hosts.len()
        );
        self.task_type = Some(config.task.task_type);
        Ok(config)
    }

    /// Writes the cluster descriptor to `TF_CONFIG`.
    pub fn export_tf_config(&mut self, env: &dyn EnvSink) -> Result<TfConfig> {
        let config = self.build_tf_config()?;
        env.set(TF_CONFIG, &config.to_json()?);
        Ok(config)
    }

    pub fn build_run_config(&self) -> F::RunConfig {
        let options = self.customer_params.with(|p| p.pick(&RUN_CONFIG_KEYS));
        debug!("creating run config with {options:?}");
        self.framework.run_config(RunConfigArgs {
            model_dir: self.model_path.clone(),
            options,
        })
    }

    /// Builds the estimator the customer's script asks for, trying
    /// `estimator_fn`, `keras_model_fn` and `model_fn` in that order.
    pub fn build_estimator(&self, config: &F::RunConfig) -> Result<F::Estimator> {
        let source = self
            .customer_script
            .estimator_source()
            .ok_or_else(|| TrainerError::MissingFunction(ESTIMATOR_FUNCTIONS.to_vec()))?;
        info!("building estimator from {}", source.name());

        let params = self.customer_params.snapshot();
        let estimator = match source {
            EstimatorSource::EstimatorFn(estimator_fn) => estimator_fn(config, &params)?,
            EstimatorSource::KerasModelFn(keras_model_fn) => {
                let model = keras_model_fn(&params)?;
                self.framework.model_to_estimator(model, config)?
            }
            EstimatorSource::ModelFn(model_fn) => {
                self.framework.estimator(model_fn.clone(), params, config)?
            }
        };
        Ok(estimator)
    }

    pub fn build_train_spec(&self) -> Result<F::TrainSpec> {
        let input_fn = self.data_input_fn(&self.customer_script.train_input_fn, "train_input_fn")?;
        debug!("creating train spec with max_steps={:?}", self.train_steps);
        Ok(self.framework.train_spec(input_fn, self.train_steps))
    }

    /// Builds the eval spec, exporting a `Servo` model when the script
    /// defines `serving_input_fn`.
    pub fn build_eval_spec(&self) -> Result<F::EvalSpec> {
        let input_fn = self.data_input_fn(&self.customer_script.eval_input_fn, "eval_input_fn")?;

        let exporters = self.customer_script.serving_input_fn.as_ref().map(|serving_fn| {
            let serving_fn = serving_fn.clone();
            let params = self.customer_params.clone();
            let receiver_fn: InputFn<F::ServingReceiver> =
                Box::new(move || serving_fn(&params.snapshot()));
            self.framework.latest_exporter(SERVING_EXPORTER_NAME, receiver_fn)
        });

        let args = EvalSpecArgs {
            steps: self.eval_steps.unwrap_or(DEFAULT_EVAL_STEPS),
            exporters,
            tuning: self.customer_params.with(|p| p.pick(&EVAL_TUNING_KEYS)),
        };
        debug!(
            "creating eval spec with steps={} exporter={} tuning={:?}",
            args.steps,
            args.exporters.is_some(),
            args.tuning
        );
        Ok(self.framework.eval_spec(input_fn, args))
    }

    /// Builds everything and hands it to the framework.
    ///
    /// # Returns
    /// The trained estimator.
    pub fn train(&self) -> Result<F::Estimator> {
        let run_config = self.build_run_config();
        let estimator = self.build_estimator(&run_config)?;
        let train_spec = self.build_train_spec()?;
        let eval_spec = self.build_eval_spec()?;

        info!("starting training");
        self.framework
            .train_and_evaluate(&estimator, train_spec, eval_spec)?;
        info!("training finished");
        Ok(estimator)
    }

    /// Wraps one of the customer's data input functions so the framework can
    /// call it without arguments. The hyperparameters are read on each call;
    /// a missing training channel only fails once the framework calls it.
    fn data_input_fn(
        &self,
        input_fn: &Option<DataInputFn<F>>,
        name: &'static str,
    ) -> Result<InputFn<F::Input>> {
        let input_fn = input_fn
            .clone()
            .ok_or_else(|| TrainerError::MissingFunction(vec![name]))?;
        let training_dir = self.input_channels.get(TRAINING_CHANNEL).cloned();
        let params = self.customer_params.clone();

        let adapter: InputFn<F::Input> = Box::new(move || {
            let dir = training_dir
                .as_deref()
                .ok_or_else(|| TrainerError::MissingChannel(TRAINING_CHANNEL.to_string()))?;
            input_fn(dir, &params.snapshot())
        });
        Ok(adapter)
    }
}

impl<F: Framework> std::fmt::Debug for Trainer<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trainer")
            .field("customer_script", &self.customer_script)
            .field("current_host", &self.current_host)
            .field("hosts", &self.hosts)
            .field("model_path", &self.model_path)
            .field("input_channels", &self.input_channels)
            .field("train_steps", &self.train_steps)
            .field("eval_steps", &self.eval_steps)
            .field("customer_params", &self.customer_params.snapshot())
            .field("task_type", &self.task_type)
            .finish()
    }
}
