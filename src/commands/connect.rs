//! [`Connect`] command: connects the session to a database.
//!
//! Script syntax:
//! - `connect SAMPLE`
//! - `connect`: first alias in the database directory

use crate::command::{Context, ScriptCommand};
use crate::script::parse_quoted_string;
use anyhow::{Result, anyhow};
use async_trait::async_trait;

pub struct Connect {
    pub alias: Option<String>,
}

impl Connect {
    pub const NAME: &'static str = "connect";
}

#[async_trait(?Send)]
impl ScriptCommand for Connect {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str) -> Result<Self> {
        let args = args.trim();
        let alias = if args.is_empty() {
            None
        } else if args.starts_with('"') {
            Some(parse_quoted_string(args)?)
        } else if args.split_whitespace().count() == 1 {
            Some(args.to_string())
        } else {
            return Err(anyhow!("Expected a single database alias, got: {}", args));
        };
        Ok(Self { alias })
    }

    async fn execute(&self, ctx: &mut Context) -> Result<()> {
        ctx.db2.connect(self.alias.as_deref()).await?;
        Ok(())
    }
}
