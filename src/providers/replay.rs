//! Scripted metrics provider for dry runs and tests

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, trace};

use crate::provider::MetricsProvider;
use crate::types::MetricsSnapshot;
use crate::{LcdError, Result};

/// One scripted response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayStep {
    /// Return this snapshot.
    Snapshot(MetricsSnapshot),
    /// Fail with this reason.
    Fail(String),
    /// Never complete.
    Stall,
}

/// A script as stored in YAML.
///
/// ```yaml
/// loop: true
/// steps:
///   - snapshot:
///       hostname: fw01
///       cpu: 12.5
///   - fail: sysctl timed out
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayScript {
    #[serde(rename = "loop")]
    pub looping: bool,
    pub steps: Vec<ReplayStep>,
}

/// Plays back a fixed sequence of snapshots, failures and stalls.
///
/// Once a non-looping script is exhausted every call fails.
#[derive(Debug, Clone)]
pub struct ReplayMetrics {
    steps: Vec<ReplayStep>,
    position: usize,
    looping: bool,
    calls: u64,
}

impl ReplayMetrics {
    pub fn new(steps: Vec<ReplayStep>) -> Self {
        Self {
            steps,
            position: 0,
            looping: false,
            calls: 0,
        }
    }

    /// Return `snapshot` on every call.
    pub fn repeating(snapshot: MetricsSnapshot) -> Self {
        Self::new(vec![ReplayStep::Snapshot(snapshot)]).looping(true)
    }

    pub fn from_snapshots<I: IntoIterator<Item = MetricsSnapshot>>(snapshots: I) -> Self {
        Self::new(snapshots.into_iter().map(ReplayStep::Snapshot).collect())
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn from_script(script: ReplayScript) -> Self {
        Self::new(script.steps).looping(script.looping)
    }

    /// Load a [`ReplayScript`] from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            LcdError::config_error(path, format!("cannot read replay script: {}", e))
        })?;
        let script: ReplayScript = serde_yaml_ng::from_str(&content)
            .map_err(|e| LcdError::config_error(path, e.to_string()))?;
        info!("Loaded replay script {} ({} steps)", path.display(), script.steps.len());
        Ok(Self::from_script(script))
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let script: ReplayScript = serde_yaml_ng::from_str(yaml)
            .map_err(|e| LcdError::config_error("<replay>", e.to_string()))?;
        Ok(Self::from_script(script))
    }

    /// Calls made so far.
    pub fn calls(&self) -> u64 {
        self.calls
    }

    fn next_step(&mut self) -> Option<ReplayStep> {
        if self.position >= self.steps.len() {
            if !self.looping || self.steps.is_empty() {
                return None;
            }
            debug!("Replay script wrapped after {} steps", self.steps.len());
            self.position = 0;
        }
        let step = self.steps[self.position].clone();
        self.position += 1;
        Some(step)
    }
}

#[async_trait::async_trait]
impl MetricsProvider for ReplayMetrics {
    async fn get_metrics(&mut self) -> Result<MetricsSnapshot> {
        self.calls += 1;
        match self.next_step() {
            Some(ReplayStep::Snapshot(snapshot)) => {
                trace!("Replay step {}: snapshot", self.position);
                Ok(snapshot)
            }
            Some(ReplayStep::Fail(reason)) => Err(LcdError::metrics_failed(reason)),
            Some(ReplayStep::Stall) => {
                debug!("Replay step {}: stalling", self.position);
                std::future::pending().await
            }
            None => Err(LcdError::metrics_failed("replay script exhausted")),
        }
    }
}
