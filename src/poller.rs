//! Periodic repository polling.
//!
//! The poller runs as a tokio task and reports every result through a
//! channel. It stops when its [`PollerHandle`] is cancelled or dropped, or
//! when the receiving side goes away.

use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::client::{ClientError, RegistryClient};
use crate::repos::RepositoryIndex;

#[derive(Debug)]
pub enum PollEvent {
    Updated(RepositoryIndex),
    Failed(ClientError),
}

pub struct PollerHandle {
    token: CancellationToken,
    refresh: Arc<Notify>,
    join: Option<JoinHandle<()>>,
}

impl PollerHandle {
    /// Poll again without waiting for the next tick.
    pub fn refresh(&self) {
        self.refresh.notify_one();
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Cancel and wait for the task to finish.
    pub async fn shutdown(mut self) {
        self.token.cancel();
        if let Some(join) = self.join.take() {
            if let Err(e) = join.await {
                warn!(error = %e, "poller task ended abnormally");
            }
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Polls immediately, then once per `period`.
pub fn spawn_poller<T>(client: RegistryClient, period: Duration, tx: Sender<T>) -> PollerHandle
where
    T: From<PollEvent> + Send + 'static,
{
    let token = CancellationToken::new();
    let refresh = Arc::new(Notify::new());
    let task_token = token.clone();
    let task_refresh = refresh.clone();

    let join = tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = task_token.cancelled() => break,
                _ = ticker.tick() => {}
                _ = task_refresh.notified() => ticker.reset(),
            }
            let event = tokio::select! {
                _ = task_token.cancelled() => break,
                res = client.fetch_repos() => match res {
                    Ok(index) => PollEvent::Updated(index),
                    Err(e) => {
                        warn!(error = %e, "poll failed");
                        PollEvent::Failed(e)
                    }
                },
            };
            if tx.send(event.into()).is_err() {
                debug!("poll receiver dropped");
                break;
            }
        }
        debug!("poller stopped");
    });

    PollerHandle {
        token,
        refresh,
        join: Some(join),
    }
}
