//! Tracker configuration.

use std::path::{Path, PathBuf};

/// Default agent name.
pub const DEFAULT_AGENT: &str = "agent";

/// Default state directory, relative to the working directory.
pub const DEFAULT_STATE_DIR: &str = ".cognitive";

/// Where and as whom events are recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Working directory; doubles as the working context of recorded events
    pub working_dir: PathBuf,
    /// Agent name stamped into every event
    pub agent_name: String,
    /// State directory name under `working_dir`
    pub state_dir_name: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            working_dir: PathBuf::from("."),
            agent_name: DEFAULT_AGENT.to_string(),
            state_dir_name: DEFAULT_STATE_DIR.to_string(),
        }
    }
}

impl TrackerConfig {
    /// Config for `working_dir` with default agent and state dir.
    pub fn new(working_dir: impl AsRef<Path>) -> Self {
        Self {
            working_dir: working_dir.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    /// Set the agent name.
    pub fn with_agent(mut self, agent_name: impl Into<String>) -> Self {
        self.agent_name = agent_name.into();
        self
    }

    /// Set the state directory name.
    pub fn with_state_dir(mut self, name: impl Into<String>) -> Self {
        self.state_dir_name = name.into();
        self
    }

    /// Full path of the state directory.
    pub fn state_dir(&self) -> PathBuf {
        self.working_dir.join(&self.state_dir_name)
    }

    /// Working context string stamped into events.
    pub fn working_context(&self) -> String {
        self.working_dir.display().to_string()
    }
}
