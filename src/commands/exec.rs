//! [`Exec`] command: runs a statement or CLP command and prints its messages.
//!
//! Script syntax: `exec "update stats set n = n + 1"`

use crate::command::{Context, ScriptCommand};
use crate::response::Outcome;
use crate::script::parse_quoted_string;
use anyhow::Result;
use async_trait::async_trait;

pub struct Exec {
    pub sql: String,
}

impl Exec {
    pub const NAME: &'static str = "exec";
}

#[async_trait(?Send)]
impl ScriptCommand for Exec {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str) -> Result<Self> {
        Ok(Self {
            sql: parse_quoted_string(args)?,
        })
    }

    async fn execute(&self, ctx: &mut Context) -> Result<()> {
        let options = ctx.statement_options();
        match ctx.db2.execute(&self.sql, &options).await? {
            Outcome::Success(lines) => {
                for line in lines.iter().filter(|l| !l.trim().is_empty()) {
                    ctx.emit_line(line)?;
                }
                Ok(())
            }
            Outcome::Failed(err) => ctx.report_failure(&err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(Exec::parse(r#""commit""#).unwrap().sql, "commit");
    }
}
