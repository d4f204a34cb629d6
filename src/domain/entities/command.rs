use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};

/// Operation requested from the media processors of an entity type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessorCommand {
    Process,
    CleanUp,
}

impl ProcessorCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessorCommand::Process => "PROCESS",
            ProcessorCommand::CleanUp => "CLEAN_UP",
        }
    }
}

impl fmt::Display for ProcessorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessorCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace('-', "_").as_str() {
            "PROCESS" => Ok(ProcessorCommand::Process),
            "CLEAN_UP" | "CLEANUP" => Ok(ProcessorCommand::CleanUp),
            other => Err(format!("Unknown processor command: {}", other)),
        }
    }
}
