// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, serving, shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use sift_core::SystemClock;
use sift_engine::{Bus, BusError, Coordinator};
use sift_storage::{Ring, Store, StoreError, TracedStore};
use thiserror::Error;
use tokio::io::AsyncBufRead;
use tokio::net::TcpListener;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::DaemonConfig;
use crate::ingest::ingest;
use crate::server::{router, AppState};

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("failed to bind {0}: {1}")]
    BindFailed(SocketAddr, std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("bus stopped: {0}")]
    Bus(#[from] BusError),

    #[error("task failed: {0}")]
    Task(#[from] JoinError),
}

/// A daemon that has opened its store and bound its listener but is not yet serving
pub struct Daemon {
    pub config: DaemonConfig,
    listener: TcpListener,
    bus: Bus,
    coordinator: Coordinator,
    store: Arc<dyn Store>,
    cancel: CancellationToken,
}

/// Open the store, build the bus and bind the HTTP listener
pub async fn startup(config: DaemonConfig) -> Result<Daemon, LifecycleError> {
    let cancel = CancellationToken::new();

    let store: Arc<dyn Store> = Arc::new(TracedStore::new(Ring::new(config.bus.ring_capacity)));
    store.open(&cancel).await?;

    // Bind last so a failed startup never accepts connections
    let listener = match TcpListener::bind(config.listen).await {
        Ok(listener) => listener,
        Err(e) => {
            cleanup_on_failure(store.as_ref()).await;
            return Err(LifecycleError::BindFailed(config.listen, e));
        }
    };

    let (bus, coordinator) = Bus::new(config.bus.clone(), Some(Arc::clone(&store)));

    info!(
        listen = %config.listen,
        ring_capacity = config.bus.ring_capacity,
        "daemon started"
    );

    Ok(Daemon {
        config,
        listener,
        bus,
        coordinator,
        store,
        cancel,
    })
}

async fn cleanup_on_failure(store: &dyn Store) {
    if let Err(e) = store.close(&CancellationToken::new()).await {
        warn!(error = %e, "failed to close store");
    }
}

impl Daemon {
    pub fn local_addr(&self) -> Result<SocketAddr, LifecycleError> {
        Ok(self.listener.local_addr()?)
    }

    /// Spawn the coordinator and the HTTP server
    pub fn start(self) -> Result<Running, LifecycleError> {
        let addr = self.local_addr()?;
        let Daemon {
            config,
            listener,
            bus,
            coordinator,
            store,
            cancel,
        } = self;

        let coordinator = tokio::spawn(coordinator.run(cancel.clone()));

        let app = router(AppState::new(bus.clone(), cancel.clone(), config.session_limit));
        let stop = cancel.clone();
        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(stop.cancelled_owned())
                .await
        });

        Ok(Running {
            addr,
            topic: config.topic,
            bus,
            store,
            cancel,
            coordinator: Some(coordinator),
            server,
        })
    }
}

/// A serving daemon
pub struct Running {
    addr: SocketAddr,
    topic: String,
    bus: Bus,
    store: Arc<dyn Store>,
    cancel: CancellationToken,
    coordinator: Option<JoinHandle<Result<(), BusError>>>,
    server: JoinHandle<std::io::Result<()>>,
}

impl Running {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Publish each line of `reader` under the configured topic
    pub fn ingest<R>(&self, reader: R) -> JoinHandle<Result<usize, BusError>>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        tokio::spawn(ingest(
            self.bus.clone(),
            self.cancel.clone(),
            reader,
            self.topic.clone(),
            SystemClock,
        ))
    }

    /// Resolves when the coordinator stops on its own
    ///
    /// Cancel-safe; pending forever once the outcome has been taken.
    pub async fn stopped(&mut self) -> Result<(), LifecycleError> {
        let Some(handle) = self.coordinator.as_mut() else {
            return std::future::pending().await;
        };
        let joined = handle.await;
        self.coordinator = None;
        coordinator_outcome(joined)
    }

    /// Cancel every task, wait for them and close the store
    pub async fn shutdown(mut self) -> Result<(), LifecycleError> {
        info!("shutting down");
        self.cancel.cancel();

        let outcome = match self.coordinator.take() {
            Some(handle) => coordinator_outcome(handle.await),
            None => Ok(()),
        };

        match self.server.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "http server failed"),
            Err(e) => warn!(error = %e, "http server task failed"),
        }

        if let Err(e) = self.store.close(&CancellationToken::new()).await {
            warn!(error = %e, "failed to close store");
        }

        info!("shutdown complete");
        outcome
    }
}

/// Cancellation is how the coordinator normally stops
fn coordinator_outcome(
    joined: Result<Result<(), BusError>, JoinError>,
) -> Result<(), LifecycleError> {
    match joined? {
        Ok(()) | Err(BusError::Canceled) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
