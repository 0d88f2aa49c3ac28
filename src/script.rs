use std::{fmt, path::Path, sync::Arc};

use crate::{framework::Framework, hyperparameters::Hyperparameters};

/// Names of the functions that can produce an estimator, in the order they
/// are looked up.
pub const ESTIMATOR_FUNCTIONS: [&str; 3] = ["estimator_fn", "keras_model_fn", "model_fn"];

/// `estimator_fn(run_config, hyperparameters)`.
pub type EstimatorFn<F> = Box<
    dyn Fn(
            &<F as Framework>::RunConfig,
            &Hyperparameters,
        ) -> anyhow::Result<<F as Framework>::Estimator>
        + Send
        + Sync,
>;

/// `keras_model_fn(hyperparameters)`.
pub type KerasModelFn<F> =
    Box<dyn Fn(&Hyperparameters) -> anyhow::Result<<F as Framework>::KerasModel> + Send + Sync>;

/// `train_input_fn(training_dir, hyperparameters)` and `eval_input_fn(...)`.
pub type DataInputFn<F> =
    Arc<dyn Fn(&Path, &Hyperparameters) -> anyhow::Result<<F as Framework>::Input> + Send + Sync>;

/// `serving_input_fn(hyperparameters)`.
pub type ServingInputFn<F> = Arc<
    dyn Fn(&Hyperparameters) -> anyhow::Result<<F as Framework>::ServingReceiver> + Send + Sync,
>;

/// The functions a customer training script exposes.
///
/// The script loader fills in whichever functions the script defines; every
/// one of them is optional.
pub struct CustomerScript<F: Framework> {
    pub estimator_fn: Option<EstimatorFn<F>>,
    pub keras_model_fn: Option<KerasModelFn<F>>,
    pub model_fn: Option<F::ModelFn>,
    pub train_input_fn: Option<DataInputFn<F>>,
    pub eval_input_fn: Option<DataInputFn<F>>,
    pub serving_input_fn: Option<ServingInputFn<F>>,
}

/// The way a script asks for its estimator to be built, in precedence order.
pub enum EstimatorSource<'a, F: Framework> {
    EstimatorFn(&'a EstimatorFn<F>),
    KerasModelFn(&'a KerasModelFn<F>),
    ModelFn(&'a F::ModelFn),
}

impl<F: Framework> EstimatorSource<'_, F> {
    pub fn name(&self) -> &'static str {
        match self {
            Self::EstimatorFn(_) => "estimator_fn",
            Self::KerasModelFn(_) => "keras_model_fn",
            Self::ModelFn(_) => "model_fn",
        }
    }
}

impl<F: Framework> CustomerScript<F> {
    /// Creates a script that defines nothing.
    pub fn new() -> Self {
        Self {
            estimator_fn: None,
            keras_model_fn: None,
            model_fn: None,
            train_input_fn: None,
            eval_input_fn: None,
            serving_input_fn: None,
        }
    }

    pub fn with_estimator_fn<C>(mut self, f: C) -> Self
    where
        C: Fn(&F::RunConfig, &Hyperparameters) -> anyhow::Result<F::Estimator>
            + Send
            + Sync
            + 'static,
    {
        self.estimator_fn = Some(Box::new(f));
        self
    }

    pub fn with_keras_model_fn<C>(mut self, f: C) -> Self
    where
        C: Fn(&Hyperparameters) -> anyhow::Result<F::KerasModel> + Send + Sync + 'static,
    {
        self.keras_model_fn = Some(Box::new(f));
        self
    }

    pub fn with_model_fn(mut self, model_fn: F::ModelFn) -> Self {
        self.model_fn = Some(model_fn);
        self
    }

    pub fn with_train_input_fn<C>(mut self, f: C) -> Self
    where
        C: Fn(&Path, &Hyperparameters) -> anyhow::Result<F::Input> + Send + Sync + 'static,
    {
        self.train_input_fn = Some(Arc::new(f));
        self
    }

    pub fn with_eval_input_fn<C>(mut self, f: C) -> Self
    where
        C: Fn(&Path, &Hyperparameters) -> anyhow::Result<F::Input> + Send + Sync + 'static,
    {
        self.eval_input_fn = Some(Arc::new(f));
        self
    }

    pub fn with_serving_input_fn<C>(mut self, f: C) -> Self
    where
        C: Fn(&Hyperparameters) -> anyhow::Result<F::ServingReceiver> + Send + Sync + 'static,
    {
        self.serving_input_fn = Some(Arc::new(f));
        self
    }

    /// Picks the first estimator-producing function the script defines:
    /// `estimator_fn`, then `keras_model_fn`, then `model_fn`.
    pub fn estimator_source(&self) -> Option<EstimatorSource<'_, F>> {
        if let Some(f) = &self.estimator_fn {
            return Some(EstimatorSource::EstimatorFn(f));
        }
        if let Some(f) = &self.keras_model_fn {
            return Some(EstimatorSource::KerasModelFn(f));
        }
        self.model_fn.as_ref().map(EstimatorSource::ModelFn)
    }

    /// Names of the functions this script defines.
    pub fn defined_functions(&self) -> Vec<&'static str> {
        [
            ("estimator_fn", self.estimator_fn.is_some()),
            ("keras_model_fn", self.keras_model_fn.is_some()),
            ("model_fn", self.model_fn.is_some()),
            ("train_input_fn", self.train_input_fn.is_some()),
            ("eval_input_fn", self.eval_input_fn.is_some()),
            ("serving_input_fn", self.serving_input_fn.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, defined)| defined.then_some(name))
        .collect()
    }
}

impl<F: Framework> Default for CustomerScript<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Framework> fmt::Debug for CustomerScript<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomerScript")
            .field("defines", &self.defined_functions())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::{EvalSpecArgs, InputFn, RunConfigArgs};

    struct Unit;

    impl Framework for Unit {
        type RunConfig = ();
        type Estimator = &'static str;
        type KerasModel = ();
        type ModelFn = &'static str;
        type Input = ();
        type ServingReceiver = ();
        type Exporter = ();
        type TrainSpec = ();
        type EvalSpec = ();

        fn run_config(&self, _: RunConfigArgs) {}

        fn model_to_estimator(&self, _: (), _: &()) -> anyhow::Result<&'static str> {
            Ok("keras")
        }

        fn estimator(
            &self,
            f: &'static str,
            _: Hyperparameters,
            _: &(),
        ) -> anyhow::Result<&'static str> {
            Ok(f)
        }

        fn latest_exporter(&self, _: &str, _: InputFn<()>) {}

        fn train_spec(&self, _: InputFn<()>, _: Option<u64>) {}

        fn eval_spec(&self, _: InputFn<()>, _: EvalSpecArgs<()>) {}

        fn train_and_evaluate(&self, _: &&'static str, _: (), _: ()) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn empty_script_has_no_estimator_source() {
        let script = CustomerScript::<Unit>::new();
        assert!(script.estimator_source().is_none());
        assert!(script.defined_functions().is_empty());
    }

    #[test]
    fn estimator_source_follows_precedence() {
        let script = CustomerScript::<Unit>::new().with_model_fn("raw");
        assert_eq!(script.estimator_source().unwrap().name(), "model_fn");

        let script = script.with_keras_model_fn(|_| Ok(()));
        assert_eq!(script.estimator_source().unwrap().name(), "keras_model_fn");

        let script = script.with_estimator_fn(|_, _| Ok("custom"));
        assert_eq!(script.estimator_source().unwrap().name(), "estimator_fn");
    }

    #[test]
    fn debug_lists_defined_functions() {
        let script = CustomerScript::<Unit>::new()
            .with_train_input_fn(|_, _| Ok(()))
            .with_serving_input_fn(|_| Ok(()));
        assert_eq!(
            format!("{script:?}"),
            r#"CustomerScript { defines: ["train_input_fn", "serving_input_fn"] }"#
        );
    }
}
