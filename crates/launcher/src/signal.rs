// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shutdown signal handling for the two binaries.

use tokio::signal::unix::{signal, SignalKind};

/// Resolve when the process receives SIGINT or SIGTERM. Both trigger
/// the same graceful shutdown path.
pub async fn wait_for_shutdown() {
    let ctrl_c = tokio::signal::ctrl_c();
    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = ctrl_c => tracing::info!("interrupt received"),
                _ = term.recv() => tracing::info!("terminate received"),
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "SIGTERM handler unavailable, interrupt only");
            if ctrl_c.await.is_err() {
                // Pend forever rather than spin: shutdown then comes
                // from the supervisor killing us.
                std::future::pending::<()>().await;
            }
        }
    }
}
