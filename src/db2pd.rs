//! Client for the interactive mode of `db2pd`.

use crate::engine::{Engine, EngineConfig, RequestOptions};
use crate::error::EngineError;
use crate::profile::Profile;
use crate::response::RawLines;

pub const DB2PD_PROMPT: &str = "db2pd> ";

/// True for the line db2pd prints when it does not understand an option.
pub fn is_invalid_command(line: &str) -> bool {
    line.starts_with("Invalid command")
}

pub fn profile() -> Profile {
    Profile::new("db2pd", "db2pd", DB2PD_PROMPT)
        .arg("-interactive")
        .error_start(is_invalid_command)
}

pub struct Db2Pd {
    engine: Engine,
}

impl Db2Pd {
    pub async fn spawn(config: EngineConfig) -> Result<Self, EngineError> {
        Self::with_profile(profile(), config).await
    }

    pub async fn with_profile(profile: Profile, config: EngineConfig) -> Result<Self, EngineError> {
        Ok(Self {
            engine: Engine::spawn(profile, config).await?,
        })
    }

    /// Run one db2pd option (e.g. `-osinfo`) and return its output lines.
    pub async fn run(&mut self, options: &str) -> Result<Vec<String>, EngineError> {
        self.run_with(options, &RequestOptions::new()).await
    }

    pub async fn run_with(
        &mut self,
        options: &str,
        request: &RequestOptions,
    ) -> Result<Vec<String>, EngineError> {
        self.engine
            .get_response(options, RawLines::new(), request)
            .await?
            .into_result()
    }

    pub fn close(&mut self) -> Result<(), EngineError> {
        self.engine.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_command() {
        assert!(is_invalid_command("Invalid command: -bogus"));
        assert!(!is_invalid_command("Operating System Information:"));
    }

    #[test]
    fn test_profile() {
        let p = profile();
        assert_eq!(p.command_line(), vec!["db2pd", "-interactive"]);
        assert_eq!(p.prompt(), "db2pd> ");
    }
}
