// SQLite backend
//
// - config: connector for a database file
// - connection: the `Connection` implementation, blocking work on `spawn_blocking`
// - params: parameter conversion to rusqlite values
// - query: result extraction

pub mod config;
pub mod connection;
pub mod params;
pub mod query;

pub use config::SqliteConnector;
pub use connection::SqliteConnection;
pub use query::build_result_set;
