//! Extracts the SQLCODE and SQLSTATE from DB2 error messages such as
//! `SQL0104N  An unexpected token ... SQLSTATE=42601`.

use crate::error::RemoteError;
use crate::response::ErrorClassifier;
use regex::Regex;
use std::sync::LazyLock;

static SQL_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bSQL(\d+)N\b").expect("SQLCODE pattern is valid"));
static SQL_STATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"SQLSTATE=(\w+)").expect("SQLSTATE pattern is valid"));
static ERROR_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^SQL\d+N\b").expect("error start pattern is valid"));

/// True for a stdout line that opens a DB2 error message.
pub fn is_sql_error_start(line: &str) -> bool {
    ERROR_START.is_match(line)
}

/// The code is the negated number of the first `SQL<digits>N` token. The state
/// is the first `SQLSTATE=` found on or after that token's line, so both
/// belong to the same message.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqlErrorClassifier;

impl ErrorClassifier for SqlErrorClassifier {
    fn classify(&self, lines: Vec<String>) -> RemoteError {
        let found = lines.iter().enumerate().find_map(|(i, line)| {
            SQL_CODE
                .captures(line)
                .map(|caps| (i, caps[1].parse::<i32>().ok().map(|n| -n)))
        });
        let (from, code) = match found {
            Some((i, code)) => (i, code),
            None => (0, None),
        };
        let state = lines[from..].iter().find_map(|line| {
            SQL_STATE
                .captures(line)
                .map(|caps| caps[1].to_string())
        });
        RemoteError { code, state, lines }
    }
}
