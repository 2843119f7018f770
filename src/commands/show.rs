//! [`Show`] command: prints a note between results.
//!
//! Script syntax: `show "-- tables --"`

use crate::command::{Context, ScriptCommand};
use crate::script::parse_quoted_string;
use anyhow::Result;
use async_trait::async_trait;

/// Writes text to the output without sending anything to DB2.
pub struct Show {
    pub text: String,
}

impl Show {
    pub const NAME: &'static str = "show";
}

#[async_trait(?Send)]
impl ScriptCommand for Show {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str) -> Result<Self> {
        Ok(Self {
            text: parse_quoted_string(args)?,
        })
    }

    async fn execute(&self, ctx: &mut Context) -> Result<()> {
        ctx.emit_line(&self.text)
    }
}
