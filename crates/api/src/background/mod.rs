//! Long-running maintenance tasks spawned by the binary.
//!
//! Each task takes a [`CancellationToken`](tokio_util::sync::CancellationToken)
//! and returns once it is cancelled.

pub mod token_cleanup;
