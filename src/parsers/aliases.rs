use super::snapshot::split_key_value;
use crate::response::ResponseParser;
use anyhow::Result;

const ALIAS_KEY: &str = "Database alias";

/// Collects the `Database alias` entries of `list database directory`.
#[derive(Debug, Default)]
pub struct DatabaseAliases(Vec<String>);

impl DatabaseAliases {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResponseParser for DatabaseAliases {
    type Output = Vec<String>;

    fn on_line(&mut self, line: &str) -> Result<()> {
        if let Some((ALIAS_KEY, alias)) = split_key_value(line) {
            self.0.push(alias.to_string());
        }
        Ok(())
    }

    fn finish(self) -> Result<Vec<String>> {
        Ok(self.0)
    }
}
