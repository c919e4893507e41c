// src/exec/mod.rs

//! Process execution engine.
//!
//! One child process per invocation, with three concurrent units of work:
//! a pump per output stream plus a wait for process exit.
//!
//! - [`invocation`] describes what to run.
//! - [`spawn`] starts the child and wires up its pipes.
//! - [`pump`] drains a pipe into an [`OutputSink`].
//! - [`exit`] produces exactly one [`ExitOutcome`] per child.
//! - [`cancel`] kills the child when the caller's token fires.
//! - [`runner`] composes the above into the public run shapes.

pub mod cancel;
pub mod exit;
pub mod invocation;
pub mod pump;
pub mod runner;
pub mod spawn;

pub use cancel::CancellationController;
pub use exit::{ExitLatch, ExitOutcome};
pub use invocation::Invocation;
pub use pump::{CaptureSink, NullSink, OutputSink, TeeSink, WriterSink};
pub use runner::{ProcessRunner, RunOutput};
pub use spawn::{RunningProcess, launch};

pub use tokio_util::sync::CancellationToken;
