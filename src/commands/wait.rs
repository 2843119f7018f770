//! [`Wait`] command: pauses the script for a fixed duration.
//!
//! Script syntax: `wait 500ms` or `wait 1.5s`
//!
//! ```text
//! snapshot 42
//! wait 10s      # one monitor interval
//! snapshot 42
//! ```

use crate::command::{Context, ScriptCommand};
use crate::script::parse_duration;
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Pauses before the next command, e.g. to let a monitor interval elapse
/// between two snapshots.
pub struct Wait {
    pub duration: Duration,
}

impl Wait {
    pub const NAME: &'static str = "wait";
}

#[async_trait(?Send)]
impl ScriptCommand for Wait {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str) -> Result<Self> {
        Ok(Self {
            duration: parse_duration(args)?,
        })
    }

    async fn execute(&self, _ctx: &mut Context) -> Result<()> {
        tokio::time::sleep(self.duration).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seconds() {
        assert_eq!(Wait::parse("2s").unwrap().duration, Duration::from_secs(2));
    }

    #[test]
    fn test_parse_fractional() {
        assert_eq!(
            Wait::parse(" 0.25s ").unwrap().duration,
            Duration::from_millis(250)
        );
    }

    #[test]
    fn test_parse_missing_unit() {
        assert!(Wait::parse("30").is_err());
    }
}
