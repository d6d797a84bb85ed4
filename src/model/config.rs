use serde::{Deserialize, Serialize};

/// Configuration from `<root>/.workdesk.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub tasks: TasksConfig,
    #[serde(default)]
    pub agenda: AgendaConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Directory names skipped in addition to the built-in denylist
    #[serde(default)]
    pub skip: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TasksConfig {
    /// Target of `add` when no file is given
    #[serde(default = "default_task_file")]
    pub default_file: String,
    /// Target of `archive`
    #[serde(default = "default_done_file")]
    pub done_file: String,
}

impl Default for TasksConfig {
    fn default() -> Self {
        TasksConfig {
            default_file: default_task_file(),
            done_file: default_done_file(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgendaConfig {
    /// Default window length in days
    #[serde(default = "default_agenda_days")]
    pub days: u32,
}

impl Default for AgendaConfig {
    fn default() -> Self {
        AgendaConfig {
            days: default_agenda_days(),
        }
    }
}

fn default_task_file() -> String {
    "todo.txt".to_string()
}

fn default_done_file() -> String {
    "done.txt".to_string()
}

fn default_agenda_days() -> u32 {
    7
}
