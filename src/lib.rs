//! Training orchestration for a managed, distributed training container.
//!
//! Takes what the platform provides (hosts, the current host, the model
//! path, input channels and hyperparameters) and turns it into the pieces a
//! distributed training framework runs: a cluster descriptor, a run
//! configuration, an estimator built from the customer's script and the
//! train/eval specs wired to the customer's input functions.

pub mod cluster;
pub mod environment;
pub mod error;
pub mod framework;
pub mod hyperparameters;
pub mod script;
pub mod storage;
mod trainer;

pub use cluster::{ClusterSpec, TaskSpec, TaskType, TfConfig};
pub use environment::ContainerEnvironment;
pub use error::{Result, TrainerError};
pub use framework::{EvalSpecArgs, Framework, InputFn, RunConfigArgs};
pub use hyperparameters::{Hyperparameters, SharedHyperparameters};
pub use script::{CustomerScript, EstimatorSource};
pub use trainer::{Trainer, TrainerBuilder, DEFAULT_EVAL_STEPS, TF_CONFIG, TRAINING_CHANNEL};
