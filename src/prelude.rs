//! Convenient imports for common functionality.

pub use crate::config::ConnectionConfig;
pub use crate::connection::{AnyConnector, Connection, Connector, RowSink};
pub use crate::error::SqlRunnerError;
pub use crate::executor::{
    RequestDispatcher, execute, execute_batch, execute_named, stream, stream_batch,
};
pub use crate::protocol::{Action, ParsedInput, Request, parse_input};
pub use crate::report::{ErrorRecord, ExitStatus, Reporter, RequestOutcome, strip_reserved};
pub use crate::results::{CustomDbRow, ResultSet};
pub use crate::translation::{
    ParameterBinding, PlaceholderStyle, TranslatedQuery, translate_named,
};
pub use crate::types::{DatabaseType, RowValues};

#[cfg(feature = "postgres")]
pub use crate::postgres::{PostgresConnection, PostgresConnector};
#[cfg(feature = "sqlite")]
pub use crate::sqlite::{SqliteConnection, SqliteConnector};
