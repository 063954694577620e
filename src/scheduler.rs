//! Periodic execution of reconciliation passes.

use crate::detector::AddressObserver;
use crate::providers::UpdateClient;
use crate::reconcile::{CycleReport, Reconciler};
use crate::resolver::PublishedResolver;
use std::future::{poll_fn, Future};
use std::io;
use std::task::Poll;
use std::time::Duration;

/// Run a single pass and log its summary.
pub async fn run_once<O, R, U>(reconciler: &Reconciler<O, R>, client: &mut U) -> CycleReport
where
    O: AddressObserver,
    R: PublishedResolver,
    U: UpdateClient + ?Sized,
{
    let report = reconciler.reconcile(client).await;
    tracing::debug!(
        "Pass started at {} checked {} target(s): {} update(s) sent, {} failure(s)",
        report.started_at.format("%Y-%m-%d %H:%M:%S"),
        report.outcomes.len(),
        report.updates_attempted(),
        report.failures()
    );
    report
}

/// Start listening on `signal` now and return a future that resolves when it
/// fires.
///
/// Signal futures such as `tokio::signal::ctrl_c()` only install their handler
/// on first poll, so that poll happens here rather than after the first pass.
/// If listening fails the error is logged and the returned future never
/// resolves.
pub async fn listen_for_shutdown<S>(signal: S) -> impl Future<Output = ()>
where
    S: Future<Output = io::Result<()>>,
{
    let mut signal = Box::pin(signal);
    let first = poll_fn(|cx| Poll::Ready(signal.as_mut().poll(cx))).await;

    async move {
        let result = match first {
            Poll::Ready(result) => result,
            Poll::Pending => signal.await,
        };
        if let Err(e) = result {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

/// Reconcile, then sleep for `interval`, until `shutdown` resolves.
///
/// A pass in progress always completes; only the sleep is interrupted.
pub async fn run<O, R, U, F>(
    reconciler: &Reconciler<O, R>,
    client: &mut U,
    interval: Duration,
    shutdown: F,
) where
    O: AddressObserver,
    R: PublishedResolver,
    U: UpdateClient + ?Sized,
    F: Future<Output = ()>,
{
    tracing::info!(
        "Starting update loop (interval: {} min)",
        interval.as_secs() / 60
    );
    tokio::pin!(shutdown);

    loop {
        run_once(reconciler, client).await;

        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Shutdown signal received");
                break;
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
}
