//! The seam between the trainer and the distributed training framework.
//!
//! The framework owns the run configuration, estimators, exporters and the
//! train/eval specs; the trainer only decides what goes into them.

use crate::hyperparameters::Hyperparameters;

/// Name of the exporter wrapping the customer's serving input function.
pub const SERVING_EXPORTER_NAME: &str = "Servo";

/// A zero-argument input function handed to the framework.
///
/// The framework calls it whenever it needs input; customer code only runs
/// at that point.
pub type InputFn<T> = Box<dyn Fn() -> anyhow::Result<T> + Send + Sync>;

/// Arguments of the framework's run configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfigArgs {
    pub model_dir: String,
    /// Recognized run-configuration keys taken verbatim from the
    /// hyperparameters.
    pub options: Hyperparameters,
}

/// Arguments of the framework's evaluation spec, minus the input function.
pub struct EvalSpecArgs<E> {
    pub steps: u64,
    pub exporters: Option<E>,
    /// Evaluation-tuning keys present in the hyperparameters.
    pub tuning: Hyperparameters,
}

/// The distributed training framework, as seen by the trainer.
pub trait Framework {
    type RunConfig: Clone + 'static;
    type Estimator: 'static;
    /// A compiled, framework-native trainable model.
    type KerasModel: 'static;
    /// A raw model function in the framework's low-level signature.
    type ModelFn: Clone;
    /// Whatever the customer's train and eval input functions produce.
    type Input: 'static;
    /// Whatever the customer's serving input function produces.
    type ServingReceiver: 'static;
    type Exporter;
    type TrainSpec;
    type EvalSpec;

    fn run_config(&self, args: RunConfigArgs) -> Self::RunConfig;

    /// Wraps a compiled model into an estimator.
    fn model_to_estimator(
        &self,
        keras_model: Self::KerasModel,
        config: &Self::RunConfig,
    ) -> anyhow::Result<Self::Estimator>;

    /// Builds the generic estimator around a raw model function.
    fn estimator(
        &self,
        model_fn: Self::ModelFn,
        params: Hyperparameters,
        config: &Self::RunConfig,
    ) -> anyhow::Result<Self::Estimator>;

    fn latest_exporter(
        &self,
        name: &str,
        serving_input_receiver_fn: InputFn<Self::ServingReceiver>,
    ) -> Self::Exporter;

    fn train_spec(
        &self,
        input_fn: InputFn<Self::Input>,
        max_steps: Option<u64>,
    ) -> Self::TrainSpec;

    fn eval_spec(
        &self,
        input_fn: InputFn<Self::Input>,
        args: EvalSpecArgs<Self::Exporter>,
    ) -> Self::EvalSpec;

    /// Runs training and evaluation to completion.
    fn train_and_evaluate(
        &self,
        estimator: &Self::Estimator,
        train_spec: Self::TrainSpec,
        eval_spec: Self::EvalSpec,
    ) -> anyhow::Result<()>;
}
