//! [`Query`] command: runs a statement that returns rows and prints them as CSV.
//!
//! Script syntax: `query "select tabname, card from syscat.tables"`

use crate::command::{Context, ScriptCommand};
use crate::script::parse_quoted_string;
use anyhow::Result;
use async_trait::async_trait;

/// Rows are streamed to the output as they are decoded, header first, so
/// result sets of any size can be exported.
pub struct Query {
    pub sql: String,
}

impl Query {
    pub const NAME: &'static str = "query";
}

#[async_trait(?Send)]
impl ScriptCommand for Query {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str) -> Result<Self> {
        Ok(Self {
            sql: parse_quoted_string(args)?,
        })
    }

    async fn execute(&self, ctx: &mut Context) -> Result<()> {
        let mut writer = csv::Writer::from_writer(&mut ctx.out);
        let result = ctx.db2.query_into(&self.sql, &mut writer).await;
        writer.flush()?;
        drop(writer);
        ctx.tolerate(result)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let cmd = Query::parse(r#""select * from \"My Table\"""#).unwrap();
        assert_eq!(cmd.sql, r#"select * from "My Table""#);
    }

    #[test]
    fn test_parse_requires_quotes() {
        assert!(Query::parse("select 1").is_err());
    }
}
