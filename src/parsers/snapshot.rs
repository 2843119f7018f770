//! Decodes `get snapshot for application` output into a flat key/value map.
//!
//! Keys are qualified by the section they appear in. An
//! `Agent process/thread ID = 12` line opens the `agent[12]` section and a
//! `Memory Pool Type = Other Memory` line opens `Other_Memory` below the current
//! one; neither is emitted as a value itself.

use crate::response::ResponseParser;
use anyhow::Result;
use std::collections::BTreeMap;

/// Value DB2 prints for monitor elements whose switch is off.
pub const NOT_COLLECTED: &str = "Not Collected";

const AGENT_ID_KEY: &str = "Agent process/thread ID";
const POOL_TYPE_KEY: &str = "Memory Pool Type";

/// Split `key = value` at the first `=`, trimming both sides.
pub fn split_key_value(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key, value.trim()))
}

/// A new `Memory Pool Type` replaces the previous pool in the path rather than
/// nesting under it, so keys read `agent[12].mem.Application_Heap.<key>`.
#[derive(Debug, Default)]
pub struct SnapshotDecoder {
    path: Vec<String>,
    /// Depth at which the current memory pool component sits.
    pool_depth: Option<usize>,
    values: BTreeMap<String, String>,
}

impl SnapshotDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn reset_path(&mut self, section: Option<&str>) {
        self.path.clear();
        self.path.extend(section.map(str::to_string));
        self.pool_depth = None;
    }

    fn enter_pool(&mut self, pool: &str) {
        if let Some(depth) = self.pool_depth {
            self.path.truncate(depth);
        }
        self.pool_depth = Some(self.path.len());
        self.path.push(pool.replace(' ', "_"));
    }

    fn qualified(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.path.join("."), key)
        }
    }

    fn on_heading(&mut self, heading: &str) {
        if heading.starts_with("Application Snapshot") {
            self.reset_path(None);
        } else if heading.starts_with("Workspace Information") {
            self.reset_path(Some("wki"));
        } else if heading.starts_with("Memory usage for application") {
            self.reset_path(Some("mem"));
        } else if heading.starts_with("Memory usage for agent:") {
            self.path.push("mem".to_string());
            self.pool_depth = None;
        }
    }
}

impl ResponseParser for SnapshotDecoder {
    type Output = BTreeMap<String, String>;

    fn on_line(&mut self, line: &str) -> Result<()> {
        if line.trim().is_empty() {
            return Ok(());
        }
        match split_key_value(line) {
            Some((AGENT_ID_KEY, agent)) => self.reset_path(Some(format!("agent[{agent}]").as_str())),
            Some((POOL_TYPE_KEY, pool)) => self.enter_pool(pool),
            Some((key, value)) => {
                if !value.is_empty() && value != NOT_COLLECTED {
                    self.values.insert(self.qualified(key), value.to_string());
                }
            }
            None => self.on_heading(line.trim_start()),
        }
        Ok(())
    }

    fn finish(self) -> Result<Self::Output> {
        Ok(self.values)
    }
}
