//! Executes named-parameter SQL requests read as JSON or NDJSON.
//!
//! A request names an action (`execute`, `executeBatch`, `stream`,
//! `streamBatch`), an SQL template using `:name` parameters, and the parameter
//! sources. The [`RequestDispatcher`] parses input, opens one connection per
//! request through a [`Connector`], and writes rows and error records through a
//! [`Reporter`].
//!
//! ```rust,no_run
//! use sql_request_runner::prelude::*;
//!
//! # fn main() -> Result<(), SqlRunnerError> {
//! let connector = AnyConnector::from_config(&ConnectionConfig::sqlite("app.db"))?;
//! let dispatcher = RequestDispatcher::new(connector);
//! let rt = tokio::runtime::Runtime::new()?;
//! let mut reporter = Reporter::stdio();
//! let status = rt.block_on(dispatcher.run(
//!     r#"{"action":"execute","sql":"select :n as n","params":{"n":1}}"#,
//!     &mut reporter,
//! ));
//! assert_eq!(status, ExitStatus::Success);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod prelude;
pub mod protocol;
pub mod report;
pub mod results;
pub mod translation;
pub mod types;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use config::ConnectionConfig;
pub use connection::{AnyConnector, Connection, Connector, RowSink};
pub use error::SqlRunnerError;
pub use executor::RequestDispatcher;
pub use protocol::{Action, ParsedInput, Request, parse_input};
pub use report::{ErrorRecord, ExitStatus, Reporter, RequestOutcome};
pub use results::{CustomDbRow, ResultSet};
pub use translation::{ParameterBinding, PlaceholderStyle, TranslatedQuery, translate_named};
pub use types::{DatabaseType, RowValues};
