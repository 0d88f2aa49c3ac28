#![allow(dead_code)]

use std::{cell::RefCell, sync::Arc};

use container_trainer::{
    storage::BucketLocator, EvalSpecArgs, Framework, Hyperparameters, InputFn, RunConfigArgs,
};
use parking_lot::Mutex;
use serde_json::Value;

pub const MODEL_PATH: &str = "a/mock/path";
pub const TRAIN_DIR: &str = "another/mock/path";

pub fn hosts() -> Vec<String> {
    vec!["algo-1".into(), "algo-2".into(), "algo-3".into()]
}

pub fn hyperparameters() -> Hyperparameters {
    let mut params = Hyperparameters::new();
    params.insert("strparam", "strval");
    params.insert("intparam", 789);
    params
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// What the mock framework's estimators are made of.
#[derive(Debug, Clone, PartialEq)]
pub enum MockEstimator {
    Custom(String),
    FromKeras {
        keras_model: String,
        config: RunConfigArgs,
    },
    Generic {
        model_fn: String,
        params: Hyperparameters,
        config: RunConfigArgs,
    },
}

pub struct MockExporter {
    pub name: String,
    pub serving_input_receiver_fn: InputFn<String>,
}

pub struct MockTrainSpec {
    pub input_fn: InputFn<Value>,
    pub max_steps: Option<u64>,
}

pub struct MockEvalSpec {
    pub input_fn: InputFn<Value>,
    pub steps: u64,
    pub exporters: Option<MockExporter>,
    pub tuning: Hyperparameters,
}

/// A framework that records what it was asked to build.
#[derive(Default)]
pub struct MockFramework {
    pub run_configs: RefCell<Vec<RunConfigArgs>>,
    pub trained: RefCell<Vec<(MockEstimator, Value, Value)>>,
}

impl Framework for MockFramework {
    type RunConfig = RunConfigArgs;
    type Estimator = MockEstimator;
    type KerasModel = String;
    type ModelFn = String;
    type Input = Value;
    type ServingReceiver = String;
    type Exporter = MockExporter;
    type TrainSpec = MockTrainSpec;
    type EvalSpec = MockEvalSpec;

    fn run_config(&self, args: RunConfigArgs) -> RunConfigArgs {
        self.run_configs.borrow_mut().push(args.clone());
        args
    }

    fn model_to_estimator(
        &self,
        keras_model: String,
        config: &RunConfigArgs,
    ) -> anyhow::Result<MockEstimator> {
        Ok(MockEstimator::FromKeras {
            keras_model,
            config: config.clone(),
        })
    }

    fn estimator(
        &self,
        model_fn: String,
        params: Hyperparameters,
        config: &RunConfigArgs,
    ) -> anyhow::Result<MockEstimator> {
        Ok(MockEstimator::Generic {
            model_fn,
            params,
            config: config.clone(),
        })
    }

    fn latest_exporter(
        &self,
        name: &str,
        serving_input_receiver_fn: InputFn<String>,
    ) -> MockExporter {
        MockExporter {
            name: name.to_string(),
            serving_input_receiver_fn,
        }
    }

    fn train_spec(&self, input_fn: InputFn<Value>, max_steps: Option<u64>) -> MockTrainSpec {
        MockTrainSpec {
            input_fn,
            max_steps,
        }
    }

    fn eval_spec(
        &self,
        input_fn: InputFn<Value>,
        args: EvalSpecArgs<MockExporter>,
    ) -> MockEvalSpec {
        MockEvalSpec {
            input_fn,
            steps: args.steps,
            exporters: args.exporters,
            tuning: args.tuning,
        }
    }

    fn train_and_evaluate(
        &self,
        estimator: &MockEstimator,
        train_spec: MockTrainSpec,
        eval_spec: MockEvalSpec,
    ) -> anyhow::Result<()> {
        let train_input = (train_spec.input_fn)()?;
        let eval_input = (eval_spec.input_fn)()?;
        self.trained
            .borrow_mut()
            .push((estimator.clone(), train_input, eval_input));
        Ok(())
    }
}

/// Answers a fixed location constraint and remembers which buckets it was
/// asked about.
#[derive(Clone, Default)]
pub struct RecordingLocator {
    pub constraint: Option<String>,
    pub asked: Arc<Mutex<Vec<String>>>,
}

impl RecordingLocator {
    pub fn new(constraint: &str) -> Self {
        Self {
            constraint: Some(constraint.to_string()),
            asked: Arc::default(),
        }
    }
}

impl BucketLocator for RecordingLocator {
    fn bucket_location(&self, bucket: &str) -> anyhow::Result<Option<String>> {
        self.asked.lock().push(bucket.to_string());
        Ok(self.constraint.clone())
    }
}
