//! Ask command handler.
//!
//! Runs one question through the query agent and prints the JSON envelope.

use anyhow::Context;
use clap::Args;
use keepsake_archive::{ChatTurn, QueryAgent};
use keepsake_core::config::AppConfig;
use std::path::{Path, PathBuf};

/// Ask a question about a tenant's archive
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Tenant (organization) whose archive is searched
    #[arg(short, long, env = "KEEPSAKE_SCOPE")]
    pub scope: String,

    /// JSON file with prior conversation turns ([{"role": ..., "content": ...}])
    #[arg(long)]
    pub history: Option<PathBuf>,

    /// Pretty-print the JSON envelope
    #[arg(long)]
    pub pretty: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        tracing::info!(scope = %self.scope, "Executing ask command");

        let history = match self.history {
            Some(ref path) => Some(load_history(path)?),
            None => None,
        };

        let agent = QueryAgent::from_config(config).context("Failed to set up query agent")?;
        let response = agent
            .process_query(&self.scope, &self.question, history.as_deref())
            .await;

        let json = if self.pretty {
            serde_json::to_string_pretty(&response)?
        } else {
            serde_json::to_string(&response)?
        };
        println!("{}", json);

        Ok(())
    }
}

fn load_history(path: &Path) -> anyhow::Result<Vec<ChatTurn>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read history file {:?}", path))?;
    serde_json::from_str(&contents).with_context(|| format!("Invalid history file {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_history() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"role": "user", "content": "Show me Christmas cards"}}, {{"role": "assistant", "content": "Here they are."}}]"#
        )
        .unwrap();

        let turns = load_history(file.path()).unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].role, "assistant");
    }

    #[test]
    fn test_invalid_history_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(load_history(file.path()).is_err());
    }
}
