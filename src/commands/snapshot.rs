//! [`Snapshot`] command: prints application snapshots as `key = value` lines.
//!
//! Script syntax:
//! - `snapshot`: this session's own application
//! - `snapshot 42 57`: the given application handles

use crate::command::{Context, ScriptCommand};
use anyhow::{Result, anyhow};
use async_trait::async_trait;

pub struct Snapshot {
    pub handles: Vec<String>,
}

impl Snapshot {
    pub const NAME: &'static str = "snapshot";
}

#[async_trait(?Send)]
impl ScriptCommand for Snapshot {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str) -> Result<Self> {
        let handles: Vec<String> = args.split_whitespace().map(str::to_string).collect();
        if let Some(bad) = handles.iter().find(|h| h.parse::<u64>().is_err()) {
            return Err(anyhow!("Application handle must be a number, got: {}", bad));
        }
        Ok(Self { handles })
    }

    async fn execute(&self, ctx: &mut Context) -> Result<()> {
        let handles = if self.handles.is_empty() {
            let own = ctx
                .db2
                .application_handle()
                .await?
                .ok_or_else(|| anyhow!("Could not determine the application handle"))?;
            vec![own]
        } else {
            self.handles.clone()
        };

        let snapshots = ctx.db2.snapshots(&handles).await?;
        for (i, snapshot) in snapshots.iter().enumerate() {
            if i > 0 {
                ctx.emit_line("")?;
            }
            for (key, value) in snapshot {
                ctx.emit_line(&format!("{key} = {value}"))?;
            }
        }
        Ok(())
    }
}
