use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrainerError};

/// Port the master and the workers listen on.
pub const WORKER_PORT: u16 = 2222;
/// Port the parameter servers listen on.
pub const PS_PORT: u16 = 2223;

/// The role a host plays in the training cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Master,
    Ps,
    Worker,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Master => "master",
            Self::Ps => "ps",
            Self::Worker => "worker",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Addresses of every role in the cluster, as `host:port` strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSpec {
    pub master: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ps: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub worker: Vec<String>,
}

/// The current process's place in the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub index: usize,
    #[serde(rename = "type")]
    pub task_type: TaskType,
}

/// The distributed-training environment descriptor, serialized into
/// `TF_CONFIG`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TfConfig {
    pub environment: String,
    pub cluster: ClusterSpec,
    pub task: TaskSpec,
}

impl TfConfig {
    pub const ENVIRONMENT: &'static str = "cloud";

    /// Lays out the cluster for `hosts` and locates `current_host` in it.
    ///
    /// # Arguments
    /// * `hosts` - Every host of the job; the first one is the master.
    /// * `current_host` - The host this process runs on.
    ///
    /// # Returns
    /// The descriptor, or an error if `hosts` is empty or does not contain
    /// `current_host`.
    pub fn build<S: AsRef<str>>(hosts: &[S], current_host: &str) -> Result<Self> {
        let hosts: Vec<&str> = hosts.iter().map(AsRef::as_ref).collect();
        let Some((&master, workers)) = hosts.split_first() else {
            return Err(TrainerError::NoHosts);
        };

        let task = resolve_task(master, workers, current_host).ok_or_else(|| {
            TrainerError::UnknownHost {
                current_host: current_host.to_string(),
                hosts: hosts.iter().map(|h| h.to_string()).collect(),
            }
        })?;

        let cluster = if workers.is_empty() {
            ClusterSpec {
                master: vec![address(master, WORKER_PORT)],
                ps: Vec::new(),
                worker: Vec::new(),
            }
        } else {
            ClusterSpec {
                master: vec![address(master, WORKER_PORT)],
                ps: hosts.iter().map(|h| address(h, PS_PORT)).collect(),
                worker: workers.iter().map(|h| address(h, WORKER_PORT)).collect(),
            }
        };

        Ok(Self {
            environment: Self::ENVIRONMENT.to_string(),
            cluster,
            task,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

fn resolve_task(master: &str, workers: &[&str], current_host: &str) -> Option<TaskSpec> {
    if current_host == master {
        return Some(TaskSpec {
            index: 0,
            task_type: TaskType::Master,
        });
    }

    let index = workers.iter().position(|&h| h == current_host)?;
    Some(TaskSpec {
        index,
        task_type: TaskType::Worker,
    })
}

fn address(host: &str, port: u16) -> String {
    format!("{host}:{port}")
}
