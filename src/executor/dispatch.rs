use std::io::Write;

use super::{batch, single};
use crate::connection::{Connection, Connector};
use crate::error::SqlRunnerError;
use crate::protocol::{Action, Request, parse_input};
use crate::report::{ErrorRecord, ExitStatus, Reporter, RequestOutcome};

/// Top-level control: parses the input, opens one connection per request,
/// routes by action and folds the outcomes into an [`ExitStatus`].
#[derive(Debug, Clone)]
pub struct RequestDispatcher<C: Connector> {
    connector: C,
}

impl<C: Connector> RequestDispatcher<C> {
    pub fn new(connector: C) -> Self {
        Self { connector }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Run everything in `input`.
    ///
    /// Empty input writes nothing and yields [`ExitStatus::EmptyInput`].
    pub async fn run<O, E>(&self, input: &str, reporter: &mut Reporter<O, E>) -> ExitStatus
    where
        O: Write + Send,
        E: Write + Send,
    {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            tracing::debug!("empty input");
            return ExitStatus::EmptyInput;
        }

        let requests = match parse_input(trimmed) {
            Ok(parsed) => parsed.into_requests(),
            Err(e) => {
                let record = ErrorRecord::new(None, None, format!("Error parsing JSON input: {e}"));
                if let Err(write_err) = reporter.emit_error(&record) {
                    tracing::error!("failed to report parse error: {write_err}");
                }
                return ExitStatus::Failure;
            }
        };
        tracing::debug!(requests = requests.len(), "input parsed");

        self.run_requests(&requests, reporter).await
    }

    /// Run already-parsed requests in order, stopping at the first fatal one.
    pub async fn run_requests<O, E>(
        &self,
        requests: &[Request],
        reporter: &mut Reporter<O, E>,
    ) -> ExitStatus
    where
        O: Write + Send,
        E: Write + Send,
    {
        for (index, request) in requests.iter().enumerate() {
            if self.dispatch(request, reporter).await.is_fatal() {
                tracing::debug!(index, "fatal outcome, skipping remaining requests");
                return ExitStatus::Failure;
            }
        }
        ExitStatus::Success
    }

    /// Run one request on its own connection.
    ///
    /// A failure to write output is logged and treated as fatal.
    pub async fn dispatch<O, E>(
        &self,
        request: &Request,
        reporter: &mut Reporter<O, E>,
    ) -> RequestOutcome
    where
        O: Write + Send,
        E: Write + Send,
    {
        match self.run_request(request, reporter).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("failed to write output: {e}");
                RequestOutcome::Fatal
            }
        }
    }

    async fn run_request<O, E>(
        &self,
        request: &Request,
        reporter: &mut Reporter<O, E>,
    ) -> Result<RequestOutcome, SqlRunnerError>
    where
        O: Write + Send,
        E: Write + Send,
    {
        let mut conn = match self.connector.connect().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::debug!("connection failed: {e}");
                reporter.emit_error(&ErrorRecord::new(
                    Some(request.raw()),
                    Some(request.sql()),
                    e,
                ))?;
                return Ok(RequestOutcome::Fatal);
            }
        };

        let result = route(conn.as_mut(), request, reporter).await;
        if let Err(e) = conn.release().await {
            tracing::warn!("failed to release connection: {e}");
        }
        result
    }
}

async fn route<O, E>(
    conn: &mut dyn Connection,
    request: &Request,
    reporter: &mut Reporter<O, E>,
) -> Result<RequestOutcome, SqlRunnerError>
where
    O: Write + Send,
    E: Write + Send,
{
    tracing::debug!(action = request.action().as_str(), "dispatching request");
    match request.action() {
        Action::Execute => single::execute(conn, request, reporter).await,
        Action::Stream => single::stream(conn, request, reporter).await,
        Action::ExecuteBatch => match request.items() {
            Some(items) => batch::execute_batch(conn, request, items, reporter).await,
            None => reject(request, missing_items(request.action()), reporter),
        },
        Action::StreamBatch => match request.items() {
            Some(items) => batch::stream_batch(conn, request, items, reporter).await,
            None => reject(request, missing_items(request.action()), reporter),
        },
        Action::Unknown(name) => reject(
            request,
            SqlRunnerError::UnknownAction(name.clone()),
            reporter,
        ),
    }
}

fn missing_items(action: &Action) -> SqlRunnerError {
    SqlRunnerError::ProtocolError(format!(
        "Request must have an items array for {}",
        action.as_str()
    ))
}

/// Report a request-level failure against the whole request.
fn reject<O: Write, E: Write>(
    request: &Request,
    error: SqlRunnerError,
    reporter: &mut Reporter<O, E>,
) -> Result<RequestOutcome, SqlRunnerError> {
    reporter.emit_error(&ErrorRecord::new(
        Some(request.raw()),
        Some(request.sql()),
        error,
    ))?;
    Ok(RequestOutcome::Fatal)
}
