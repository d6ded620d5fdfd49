use std::time::Duration;

use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::Trigger;

/// Sends [`Trigger::Scheduled`] immediately and then every `period`.
///
/// A tick is dropped while anything is still queued, so a slow cycle leaves
/// at most one tick behind and the remaining slots stay free for forced
/// refreshes.
pub fn spawn_ticker(period: Duration, tx: mpsc::Sender<Trigger>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            if tx.is_closed() {
                break;
            }
            if tx.capacity() < tx.max_capacity() {
                log::debug!("Discovery still pending, dropping tick");
                continue;
            }
            match tx.try_send(Trigger::Scheduled) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    log::debug!("Discovery still pending, dropping tick");
                }
                Err(TrySendError::Closed(_)) => break,
            }
        }
    })
}

/// Sends [`Trigger::Forced`] whenever the process receives `SIGUSR1`.
///
/// # Errors
///
/// Returns an error if the signal handler cannot be installed.
pub fn spawn_signal_listener(tx: mpsc::Sender<Trigger>) -> std::io::Result<JoinHandle<()>> {
    let mut usr1 = signal(SignalKind::user_defined1())?;

    Ok(tokio::spawn(async move {
        while usr1.recv().await.is_some() {
            log::info!("Received SIGUSR1, forcing discovery");
            if tx.send(Trigger::Forced).await.is_err() {
                break;
            }
        }
    }))
}

/// Resolves on `SIGINT` or `SIGTERM`.
pub async fn shutdown_signal() {
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                log::warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(err) = result {
                log::warn!("Failed to listen for SIGINT: {}", err);
                std::future::pending::<()>().await;
            }
        }
        () = terminate => {}
    }
}
