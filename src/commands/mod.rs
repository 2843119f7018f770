mod aliases;
mod connect;
mod exec;
mod query;
mod show;
mod snapshot;
mod wait;

pub use aliases::Aliases;
pub use connect::Connect;
pub use exec::Exec;
pub use query::Query;
pub use show::Show;
pub use snapshot::Snapshot;
pub use wait::Wait;
