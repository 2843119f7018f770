//! # clidrive
//!
//! Drive prompt-based database shells such as the DB2 command line processor
//! (`db2`) and `db2pd` through their stdin, stdout and stderr, as if a person
//! were typing.
//!
//! Each [`Engine`] owns one child process and two reader threads. A request
//! writes one command, waits until the exact prompt string shows up again on
//! stdout, and hands the lines printed in between to a [`ResponseParser`].
//! Error output (stderr, or stdout lines after an error marker) goes to the
//! profile's [`ErrorClassifier`] instead.
//!
//! ## Quick start
//!
//! ```no_run
//! use clidrive::{Db2Cli, EngineConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut db2 = Db2Cli::spawn('@', EngineConfig::default()).await?;
//!     db2.connect(Some("SAMPLE")).await?;
//!
//!     let table = db2.query("select tabname, card from syscat.tables fetch first 10 rows only").await?;
//!     for row in &table.rows {
//!         println!("{}", row.join(", "));
//!     }
//!
//!     db2.close()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Continuing past failed statements
//!
//! By default a SQL error is raised as [`EngineError::Remote`]. Batch callers
//! can ask for it as a value instead:
//!
//! ```no_run
//! use clidrive::{Db2Cli, EngineConfig, Outcome, RequestOptions};
//!
//! # async fn run(db2: &mut Db2Cli) -> anyhow::Result<()> {
//! let options = RequestOptions::new().errors_as_values(true);
//! for sql in ["drop table scratch", "create table scratch (id int)"] {
//!     match db2.execute(sql, &options).await? {
//!         Outcome::Success(_) => {}
//!         Outcome::Failed(err) => eprintln!("{sql}: SQLCODE {:?}", err.code),
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Other targets
//!
//! A [`Profile`] describes any prompt-driven program: command line, prompt,
//! which stdout lines open an error block and how error lines are classified.
//!
//! ```no_run
//! use clidrive::{Engine, EngineConfig, Profile, RawLines, RequestOptions};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let profile = Profile::new("shell", "sh", "> ")
//!     .args(["-c", r#"printf '> '; while read -r l; do eval "$l"; printf '> '; done"#])
//!     .error_start(|line| line.starts_with("sh: "));
//! let mut engine = Engine::spawn(profile, EngineConfig::default()).await?;
//! let lines = engine
//!     .get_response("echo 42", RawLines::new(), &RequestOptions::new())
//!     .await?
//!     .into_result()?;
//! assert_eq!(lines, vec!["42"]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Batch scripts
//!
//! The `clidrive` binary runs scripts parsed by [`parse_str`] / [`parse_file`]:
//!
//! | Command | Description |
//! |---------|-------------|
//! | `connect [alias]` | Connect, to the first catalogued database by default |
//! | `query "sql"` | Run a query and print the rows as CSV |
//! | `exec "sql"` | Run a statement or CLP command and print its messages |
//! | `aliases` | Print the catalogued database aliases |
//! | `snapshot [handle ...]` | Print application snapshots |
//! | `wait 500ms` | Pause |
//! | `show "text"` | Print a note |
//! | `# comment` | Full-line or inline comment |

pub mod assembler;
pub mod command;
pub mod commands;
pub mod db2;
pub mod db2pd;
pub mod engine;
pub mod error;
pub mod logging;
pub mod parsers;
pub mod process;
pub mod profile;
pub mod response;
pub mod router;
pub mod script;

pub use command::{Context, ScriptCommand};
pub use db2::Db2Cli;
pub use db2pd::Db2Pd;
pub use engine::{Engine, EngineConfig, RequestOptions};
pub use error::{EngineError, RemoteError};
pub use parsers::{RowSink, Table};
pub use profile::Profile;
pub use response::{ErrorClassifier, Outcome, RawLines, ResponseParser};
pub use router::Stream;
pub use script::{parse_file, parse_str};
