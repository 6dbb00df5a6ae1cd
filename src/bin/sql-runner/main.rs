mod args;
mod logging;

use std::process::ExitCode;

use clap::Parser;
use sql_request_runner::prelude::*;
use tokio::io::AsyncReadExt;

use crate::args::Args;
use crate::logging::LogWriter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    if let Some(path) = &args.log {
        let writer = LogWriter::create(path).unwrap_or_else(|err| {
            eprintln!("failed to open log file: {err}");
            std::process::exit(1);
        });
        tracing_subscriber::fmt()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(false)
            .with_max_level(tracing::Level::from(args.log_level))
            .init();
    }

    let mut reporter = Reporter::stdio();
    let status = run(&args, &mut reporter).await;
    tracing::debug!(code = status.code(), "exiting");
    ExitCode::from(status.code())
}

async fn run<O, E>(args: &Args, reporter: &mut Reporter<O, E>) -> ExitStatus
where
    O: std::io::Write + Send,
    E: std::io::Write + Send,
{
    let connector = match AnyConnector::from_config(&args.connection_config()) {
        Ok(connector) => connector,
        Err(e) => return report_failure(reporter, e.to_string()),
    };
    let dispatcher = RequestDispatcher::new(connector);

    if let Some(sql) = &args.sql {
        let request = Request::execute(sql.clone(), args.param_map());
        return dispatcher
            .run_requests(std::slice::from_ref(&request), reporter)
            .await;
    }

    let mut raw = Vec::new();
    if let Err(e) = tokio::io::stdin().read_to_end(&mut raw).await {
        return report_failure(reporter, format!("failed to read stdin: {e}"));
    }
    match String::from_utf8(raw) {
        Ok(input) => dispatcher.run(&input, reporter).await,
        Err(e) => report_failure(reporter, format!("Error parsing JSON input: {e}")),
    }
}

fn report_failure<O, E>(reporter: &mut Reporter<O, E>, message: String) -> ExitStatus
where
    O: std::io::Write,
    E: std::io::Write,
{
    if let Err(e) = reporter.emit_error(&ErrorRecord::new(None, None, message)) {
        tracing::error!("failed to report error: {e}");
    }
    ExitStatus::Failure
}
