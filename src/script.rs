//! Parser for clidrive batch scripts.
//!
//! The top-level entry points are [`parse_str`] and [`parse_file`].

use crate::command::ScriptCommand;
use crate::commands::{Aliases, Connect, Exec, Query, Show, Snapshot, Wait};
use anyhow::{Context as _, Result, anyhow};
use std::path::Path;
use std::time::Duration;

/// Parse a script from a string slice and return the resulting commands.
///
/// Lines that are empty or start with `#` are ignored. Inline comments (` # …`)
/// are stripped while preserving `#` characters inside quoted strings.
///
/// # Errors
///
/// Returns an error if any line contains an unknown command, a malformed
/// argument, or an unclosed quoted string.
///
/// # Example
///
/// ```
/// use clidrive::parse_str;
///
/// let commands = parse_str("connect SAMPLE\nquery \"select * from syscat.tables\"\n").unwrap();
/// assert_eq!(commands.len(), 2);
/// ```
pub fn parse_str(content: &str) -> Result<Vec<Box<dyn ScriptCommand>>> {
    let mut commands = Vec::new();
    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = strip_inline_comment(line);
        let cmd = parse_line(line)
            .with_context(|| format!("Failed to parse line {}: {}", line_num + 1, line))?;
        commands.push(cmd);
    }
    Ok(commands)
}

/// Read a script file and delegate to [`parse_str`].
pub fn parse_file(path: impl AsRef<Path>) -> Result<Vec<Box<dyn ScriptCommand>>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script file: {}", path.display()))?;
    parse_str(&content)
}

type ParseFn = fn(&str) -> Result<Box<dyn ScriptCommand>>;

static REGISTRY: &[(&str, ParseFn)] = &[
    (Connect::NAME, Connect::parse_boxed),
    (Query::NAME, Query::parse_boxed),
    (Exec::NAME, Exec::parse_boxed),
    (Aliases::NAME, Aliases::parse_boxed),
    (Snapshot::NAME, Snapshot::parse_boxed),
    (Wait::NAME, Wait::parse_boxed),
    (Show::NAME, Show::parse_boxed),
];

fn parse_line(line: &str) -> Result<Box<dyn ScriptCommand>> {
    let (name, args) = line.split_once(' ').unwrap_or((line, ""));
    REGISTRY
        .iter()
        .find(|(cmd_name, _)| *cmd_name == name)
        .map(|(_, parse)| parse(args))
        .unwrap_or_else(|| Err(anyhow!("Unknown command: {}", line)))
}

/// Strip inline comments from a line, preserving `#` inside quoted strings.
fn strip_inline_comment(line: &str) -> &str {
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, ch) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '"' => in_quotes = !in_quotes,
            '#' if !in_quotes => return line[..i].trim(),
            _ => {}
        }
    }
    line
}

/// Parse a duration string: `1s`, `500ms`, `1.5s`.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    if let Some(ms_str) = s.strip_suffix("ms") {
        let ms: u64 = ms_str.trim().parse().context("Invalid milliseconds value")?;
        Ok(Duration::from_millis(ms))
    } else if let Some(s_str) = s.strip_suffix('s') {
        let secs: f64 = s_str.trim().parse().context("Invalid seconds value")?;
        Duration::try_from_secs_f64(secs).context("Invalid seconds value")
    } else {
        Err(anyhow!("Duration must end with 's' or 'ms', got: {}", s))
    }
}

/// Parse a double-quoted string, processing `\n`, `\t`, `\"` and `\\`.
pub(crate) fn parse_quoted_string(s: &str) -> Result<String> {
    let s = s.trim();
    let inner = s
        .strip_prefix('"')
        .ok_or_else(|| anyhow!("Expected string to start with '\"'"))?;

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                let rest = chars.as_str().trim();
                if !rest.is_empty() {
                    return Err(anyhow!("Unexpected text after closing quote: {}", rest));
                }
                return Ok(out);
            }
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => break,
            },
            _ => out.push(ch),
        }
    }
    Err(anyhow!("Unclosed quote"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("1s").unwrap(), Duration::from_secs(1));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_secs_f64(1.5));
        assert!(parse_duration("-1s").is_err());
        assert!(parse_duration("5minutes").is_err());
    }

    #[test]
    fn test_parse_quoted_string() {
        assert_eq!(parse_quoted_string("\"hello\"").unwrap(), "hello");
        assert_eq!(
            parse_quoted_string(r#""select \"Name\" from t""#).unwrap(),
            r#"select "Name" from t"#
        );
        assert_eq!(parse_quoted_string(r#""a\nb""#).unwrap(), "a\nb");
        assert_eq!(parse_quoted_string(r#""back\\slash""#).unwrap(), r"back\slash");
        assert!(parse_quoted_string("\"unclosed").is_err());
        assert!(parse_quoted_string("no quotes").is_err());
        assert!(parse_quoted_string("\"a\" trailing").is_err());
    }

    #[test]
    fn test_parse_all_commands() {
        let cmds = parse_str(
            "connect SAMPLE\nquery \"values 1\"\nexec \"commit\"\naliases\nsnapshot 42\nwait 500ms\nshow \"done\"\n",
        )
        .unwrap();
        let names: Vec<_> = cmds.iter().map(|c| c.name()).collect();
        assert_eq!(
            names,
            vec!["connect", "query", "exec", "aliases", "snapshot", "wait", "show"]
        );
    }

    #[test]
    fn test_parse_comments_and_blank_lines() {
        let cmds = parse_str("# setup\n\nconnect # default database\n\n# done\n").unwrap();
        assert_eq!(cmds.len(), 1);
    }

    #[test]
    fn test_parse_monitor_interval() {
        let cmds = parse_str("snapshot 42\nwait 10s # one monitor interval\nsnapshot 42\n").unwrap();
        let names: Vec<_> = cmds.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["snapshot", "wait", "snapshot"]);
    }

    #[test]
    fn test_parse_invalid_command() {
        let err = parse_str("select 1").err().unwrap();
        assert!(format!("{err:#}").contains("Unknown command"), "got: {err:#}");
    }

    #[test]
    fn test_error_reports_line_number() {
        let err = parse_str("connect\nquery \"unclosed\n").err().unwrap();
        assert!(err.to_string().contains("line 2"), "got: {err}");
    }

    #[test]
    fn test_strip_inline_comments() {
        assert_eq!(strip_inline_comment("wait 1s # comment"), "wait 1s");
        assert_eq!(
            strip_inline_comment("query \"select '#' from t\" # inline"),
            "query \"select '#' from t\""
        );
        assert_eq!(
            strip_inline_comment(r##"exec "x \"#\" y""##),
            r##"exec "x \"#\" y""##
        );
    }
}
