//! Response parsers and error classifiers for DB2 command line output.

mod aliases;
mod snapshot;
mod sql_error;
mod tabular;

pub use aliases::DatabaseAliases;
pub use snapshot::{NOT_COLLECTED, SnapshotDecoder, split_key_value};
pub use sql_error::{SqlErrorClassifier, is_sql_error_start};
pub use tabular::{RowSink, Table, TabularDecoder};
