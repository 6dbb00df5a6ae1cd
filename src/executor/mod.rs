//! Request execution: the per-action executors and the dispatcher that routes
//! parsed requests to them.

mod batch;
mod dispatch;
mod single;

pub use batch::{execute_batch, stream_batch};
pub use dispatch::RequestDispatcher;
pub use single::{execute, execute_named, stream};
