//! [`Aliases`] command: prints the catalogued database aliases, one per line.
//!
//! Script syntax: `aliases`

use crate::command::{Context, ScriptCommand};
use anyhow::{Result, anyhow};
use async_trait::async_trait;

pub struct Aliases;

impl Aliases {
    pub const NAME: &'static str = "aliases";
}

#[async_trait(?Send)]
impl ScriptCommand for Aliases {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str) -> Result<Self> {
        if !args.trim().is_empty() {
            return Err(anyhow!("'aliases' takes no arguments"));
        }
        Ok(Self)
    }

    async fn execute(&self, ctx: &mut Context) -> Result<()> {
        for alias in ctx.db2.database_aliases().await? {
            ctx.emit_line(&alias)?;
        }
        Ok(())
    }
}
