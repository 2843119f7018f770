//! Client for the DB2 command line processor (`db2 -td@`).

use crate::engine::{Engine, EngineConfig, RequestOptions};
use crate::error::EngineError;
use crate::parsers::{
    DatabaseAliases, RowSink, SnapshotDecoder, SqlErrorClassifier, Table, TabularDecoder,
    is_sql_error_start,
};
use crate::profile::Profile;
use crate::response::{Outcome, RawLines, ResponseParser};
use std::collections::BTreeMap;
use tracing::info;

pub const DB2_PROMPT: &str = "db2 => ";
pub const DEFAULT_DELIMITER: char = '@';

/// Launches `db2 -td<delimiter>`, ready at `db2 => `, with SQL error
/// messages on stdout treated as errors.
pub fn profile(delimiter: char) -> Profile {
    Profile::new("db2", "db2", DB2_PROMPT)
        .arg(format!("-td{delimiter}"))
        .error_start(is_sql_error_start)
        .classifier(SqlErrorClassifier)
}

/// A DB2 command line session. Every statement is sent with the statement
/// delimiter appended.
pub struct Db2Cli {
    engine: Engine,
    delimiter: char,
}

impl Db2Cli {
    pub async fn spawn(delimiter: char, config: EngineConfig) -> Result<Self, EngineError> {
        Self::with_profile(profile(delimiter), delimiter, config).await
    }

    /// Use a customised profile, e.g. another `db2` binary.
    pub async fn with_profile(
        profile: Profile,
        delimiter: char,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        let engine = Engine::spawn(profile, config).await?;
        Ok(Self { engine, delimiter })
    }

    fn statement(&self, sql: &str) -> String {
        format!("{}{}", sql.trim_end(), self.delimiter)
    }

    /// Connect to `alias`, or to the first catalogued database when none is given.
    /// Returns the alias used.
    pub async fn connect(&mut self, alias: Option<&str>) -> Result<String, EngineError> {
        let alias = match alias {
            Some(alias) => alias.to_string(),
            None => self
                .database_aliases()
                .await?
                .into_iter()
                .next()
                .ok_or(EngineError::NoDatabaseAlias)?,
        };
        self.execute(&format!("connect to {alias}"), &RequestOptions::new())
            .await?
            .into_result()?;
        info!("Connected to {}", alias);
        Ok(alias)
    }

    /// Run a statement that returns a result set and keep the rows in memory.
    pub async fn query(&mut self, sql: &str) -> Result<Table, EngineError> {
        self.execute_with(sql, TabularDecoder::new(), &RequestOptions::new())
            .await?
            .into_result()
    }

    /// Run a statement that returns a result set, streaming rows into `sink`.
    pub async fn query_into(&mut self, sql: &str, sink: &mut dyn RowSink) -> Result<Table, EngineError> {
        self.execute_with(sql, TabularDecoder::streaming(sink), &RequestOptions::new())
            .await?
            .into_result()
    }

    /// Run a statement or command and return its raw output lines.
    pub async fn execute(
        &mut self,
        sql: &str,
        options: &RequestOptions,
    ) -> Result<Outcome<Vec<String>>, EngineError> {
        self.execute_with(sql, RawLines::new(), options).await
    }

    pub async fn execute_with<P: ResponseParser>(
        &mut self,
        sql: &str,
        parser: P,
        options: &RequestOptions,
    ) -> Result<Outcome<P::Output>, EngineError> {
        let statement = self.statement(sql);
        self.engine.get_response(&statement, parser, options).await
    }

    /// Handle of this session's own application connection.
    pub async fn application_handle(&mut self) -> Result<Option<String>, EngineError> {
        let table = self.query("values mon_get_application_handle").await?;
        Ok(table.scalar().map(str::to_string))
    }

    pub async fn snapshot_for_application(
        &mut self,
        handle: &str,
    ) -> Result<BTreeMap<String, String>, EngineError> {
        self.execute_with(
            &format!("get snapshot for application agentid {handle}"),
            SnapshotDecoder::new(),
            &RequestOptions::new(),
        )
        .await?
        .into_result()
    }

    pub async fn snapshots(
        &mut self,
        handles: &[String],
    ) -> Result<Vec<BTreeMap<String, String>>, EngineError> {
        let mut all = Vec::with_capacity(handles.len());
        for handle in handles {
            all.push(self.snapshot_for_application(handle).await?);
        }
        Ok(all)
    }

    /// Aliases from `list database directory`, in catalogue order.
    pub async fn database_aliases(&mut self) -> Result<Vec<String>, EngineError> {
        self.execute_with(
            "list database directory",
            DatabaseAliases::new(),
            &RequestOptions::new(),
        )
        .await?
        .into_result()
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    pub fn close(&mut self) -> Result<(), EngineError> {
        self.engine.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile() {
        let p = profile('@');
        assert_eq!(p.command_line(), vec!["db2", "-td@"]);
        assert_eq!(p.prompt(), "db2 => ");
        assert!((p.is_error_start())("SQL0104N  An unexpected token"));
    }

    #[test]
    fn test_profile_other_delimiter() {
        assert_eq!(profile(';').command_line(), vec!["db2", "-td;"]);
    }
}
