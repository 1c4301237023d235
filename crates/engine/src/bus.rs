// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bus handle and coordinator loop
//!
//! One coordinator task owns the consumer registry and processes publish,
//! subscribe and unsubscribe commands strictly one at a time. Fan-out and
//! replay run as background tasks gated by the [`WorkerPool`].

use crate::error::BusError;
use crate::pool::{WorkerPool, WorkerToken};
use futures_util::future::join_all;
use sift_core::{BusConfig, Event, Query};
use sift_storage::{Store, StoreError};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Commands queued for the coordinator
const COMMAND_BUFFER: usize = 64;

/// Unique identifier for a registered consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConsumerId(pub u64);

impl std::fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of one successful forward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Forwarded {
    /// This many events reached the consumer
    Delivered(usize),
    /// Nothing in the batch matched the consumer's filter
    Skipped,
}

enum Command {
    Publish(Vec<Event>),
    Subscribe {
        id: ConsumerId,
        query: Query,
        outgoing: mpsc::Sender<Vec<Event>>,
    },
    Unsubscribe(ConsumerId),
}

/// A registered subscriber as the coordinator sees it
#[derive(Clone)]
struct Consumer {
    id: ConsumerId,
    query: Arc<Query>,
    outgoing: mpsc::Sender<Vec<Event>>,
    /// Child of the bus token; cancelled on unsubscribe
    cancel: CancellationToken,
}

/// Cloneable handle for publishing and subscribing
#[derive(Clone)]
pub struct Bus {
    commands: mpsc::Sender<Command>,
    next_id: Arc<AtomicU64>,
}

/// The serialized event loop behind a [`Bus`]
pub struct Coordinator {
    commands: mpsc::Receiver<Command>,
    config: BusConfig,
    store: Option<Arc<dyn Store>>,
    pool: WorkerPool,
    consumers: BTreeMap<ConsumerId, Consumer>,
}

/// Live feed for one consumer
///
/// Dropping it unregisters the consumer.
pub struct Subscription {
    id: ConsumerId,
    incoming: mpsc::Receiver<Vec<Event>>,
    commands: mpsc::Sender<Command>,
}

impl Bus {
    /// Create a bus handle and the coordinator that must be run for it to make progress
    pub fn new(config: BusConfig, store: Option<Arc<dyn Store>>) -> (Bus, Coordinator) {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let bus = Bus {
            commands: tx,
            next_id: Arc::new(AtomicU64::new(1)),
        };
        let coordinator = Coordinator {
            commands: rx,
            pool: WorkerPool::new(config.workers),
            config,
            store,
            consumers: BTreeMap::new(),
        };
        (bus, coordinator)
    }

    /// Submit a batch for persistence and fan-out
    pub async fn publish(
        &self,
        cancel: &CancellationToken,
        batch: Vec<Event>,
    ) -> Result<(), BusError> {
        self.send(cancel, Command::Publish(batch)).await
    }

    /// Register a consumer whose feed holds up to `buffer` undelivered batches
    pub async fn subscribe(
        &self,
        cancel: &CancellationToken,
        query: Query,
        buffer: usize,
    ) -> Result<Subscription, BusError> {
        let id = ConsumerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(buffer.max(1));
        self.send(
            cancel,
            Command::Subscribe {
                id,
                query,
                outgoing: tx,
            },
        )
        .await?;
        Ok(Subscription {
            id,
            incoming: rx,
            commands: self.commands.clone(),
        })
    }

    /// Remove a consumer; unknown ids are ignored
    pub async fn unsubscribe(
        &self,
        cancel: &CancellationToken,
        id: ConsumerId,
    ) -> Result<(), BusError> {
        self.send(cancel, Command::Unsubscribe(id)).await
    }

    async fn send(&self, cancel: &CancellationToken, command: Command) -> Result<(), BusError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(BusError::Canceled),
            sent = self.commands.send(command) => sent.map_err(|_| BusError::Closed),
        }
    }
}

impl Subscription {
    pub fn id(&self) -> ConsumerId {
        self.id
    }

    /// Next delivered batch, or `None` once the consumer is unregistered and drained
    pub async fn recv(&mut self) -> Option<Vec<Event>> {
        self.incoming.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // Best effort; the coordinator also prunes closed consumers on publish
        let _ = self.commands.try_send(Command::Unsubscribe(self.id));
    }
}

impl Coordinator {
    /// Process commands until cancelled or every handle is gone
    ///
    /// Returns `Err(Canceled)` on shutdown, `Ok(())` when all [`Bus`] and
    /// [`Subscription`] handles have been dropped, and `Err(Store)` when a
    /// write fails.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<(), BusError> {
        info!(
            workers = self.pool.size(),
            max_replay = self.config.max_replay,
            store = self.store.is_some(),
            "bus started"
        );

        let result = self.serve(&cancel).await;

        for consumer in self.consumers.values() {
            consumer.cancel.cancel();
        }
        self.consumers.clear();

        match &result {
            Ok(()) => info!("bus stopped: all handles dropped"),
            Err(BusError::Canceled) => info!("bus stopped: canceled"),
            Err(e) => error!(error = %e, "bus stopped"),
        }
        result
    }

    async fn serve(&mut self, cancel: &CancellationToken) -> Result<(), BusError> {
        loop {
            let command = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(BusError::Canceled),
                command = self.commands.recv() => match command {
                    Some(command) => command,
                    None => return Ok(()),
                },
            };

            match command {
                Command::Publish(batch) => self.handle_publish(cancel, batch).await?,
                Command::Subscribe {
                    id,
                    query,
                    outgoing,
                } => self.handle_subscribe(cancel, id, query, outgoing).await,
                Command::Unsubscribe(id) => self.handle_unsubscribe(id),
            }
        }
    }

    async fn handle_publish(
        &mut self,
        cancel: &CancellationToken,
        batch: Vec<Event>,
    ) -> Result<(), BusError> {
        if let Some(store) = &self.store {
            match store.write(cancel, &batch).await {
                Ok(()) => {}
                Err(StoreError::Canceled) => return Err(BusError::Canceled),
                Err(e) => return Err(BusError::Store(e)),
            }
        }

        self.prune();
        if self.consumers.is_empty() || batch.is_empty() {
            return Ok(());
        }

        // Consumers registered after this point do not see this batch
        let targets: Vec<Consumer> = self.consumers.values().cloned().collect();
        let timeout = self.config.consumer_timeout;
        let bus_cancel = cancel.clone();
        self.spawn_worker(cancel, "fan-out", async move {
            fan_out(&bus_cancel, &targets, &batch, timeout).await;
        })
        .await
    }

    async fn handle_subscribe(
        &mut self,
        cancel: &CancellationToken,
        id: ConsumerId,
        query: Query,
        outgoing: mpsc::Sender<Vec<Event>>,
    ) {
        if self.consumers.contains_key(&id) {
            warn!(consumer = %id, "consumer already registered");
            return;
        }

        let consumer = Consumer {
            id,
            query: Arc::new(query.clamp_limit(self.config.max_replay)),
            outgoing,
            cancel: cancel.child_token(),
        };
        debug!(
            consumer = %id,
            replay = consumer.query.replay,
            limit = consumer.query.limit,
            filter = %consumer.query.filter,
            "consumer registered"
        );
        self.consumers.insert(id, consumer.clone());

        let Some(store) = self.store.clone() else {
            return;
        };
        if !consumer.query.replay || consumer.query.limit == 0 {
            return;
        }

        let timeout = self.config.consumer_timeout;
        // Replay failures are logged by the task; they never stop the bus
        let _ = self
            .spawn_worker(cancel, "replay", async move {
                replay(store.as_ref(), &consumer, timeout).await;
            })
            .await;
    }

    fn handle_unsubscribe(&mut self, id: ConsumerId) {
        if let Some(consumer) = self.consumers.remove(&id) {
            consumer.cancel.cancel();
            debug!(consumer = %id, "consumer unregistered");
        }
    }

    /// Drop consumers whose subscription is gone
    fn prune(&mut self) {
        self.consumers.retain(|id, consumer| {
            let closed = consumer.outgoing.is_closed();
            if closed {
                consumer.cancel.cancel();
                debug!(consumer = %id, "consumer pruned");
            }
            !closed
        });
    }

    /// Run `task` in the background once a worker token is free
    ///
    /// A token that cannot be had within the workers timeout drops the task.
    async fn spawn_worker<F>(
        &self,
        cancel: &CancellationToken,
        what: &'static str,
        task: F,
    ) -> Result<(), BusError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match self.pool.acquire(cancel, self.config.workers_timeout).await {
            Ok(token) => {
                tokio::spawn(run_with_token(token, task));
                Ok(())
            }
            Err(BusError::Canceled) => Err(BusError::Canceled),
            Err(e) => {
                warn!(task = what, error = %e, "no worker available, dropping");
                Ok(())
            }
        }
    }
}

async fn run_with_token<F: Future<Output = ()>>(token: WorkerToken, task: F) {
    task.await;
    drop(token);
}

/// Filter `batch` for one consumer and deliver what matches
///
/// Delivery is bounded by `timeout` and abandoned when the consumer is
/// unregistered or the bus shuts down.
async fn forward(
    consumer: &Consumer,
    batch: &[Event],
    timeout: Duration,
) -> Result<Forwarded, BusError> {
    let selected = consumer.query.select(batch);
    if selected.is_empty() {
        return Ok(Forwarded::Skipped);
    }
    let n = selected.len();

    tokio::select! {
        biased;
        _ = consumer.cancel.cancelled() => Err(BusError::Canceled),
        sent = tokio::time::timeout(timeout, consumer.outgoing.send(selected)) => match sent {
            Ok(Ok(())) => Ok(Forwarded::Delivered(n)),
            Ok(Err(_)) => Err(BusError::Closed),
            Err(_) => Err(BusError::Timeout),
        },
    }
}

async fn fan_out(
    bus_cancel: &CancellationToken,
    consumers: &[Consumer],
    batch: &[Event],
    timeout: Duration,
) {
    let results = join_all(consumers.iter().map(|c| forward(c, batch, timeout))).await;

    for (consumer, result) in consumers.iter().zip(results) {
        match result {
            Ok(Forwarded::Delivered(n)) => debug!(consumer = %consumer.id, events = n, "delivered"),
            Ok(Forwarded::Skipped) => {}
            Err(BusError::Canceled) if bus_cancel.is_cancelled() => return,
            Err(BusError::Timeout) => {
                warn!(consumer = %consumer.id, "delivery timed out, batch dropped")
            }
            Err(e) => debug!(consumer = %consumer.id, error = %e, "delivery abandoned"),
        }
    }
}

async fn replay(store: &dyn Store, consumer: &Consumer, timeout: Duration) {
    let mut batches = match store.read(&consumer.cancel, &consumer.query).await {
        Ok(rx) => rx,
        Err(StoreError::Canceled) => return,
        Err(e) => {
            warn!(consumer = %consumer.id, error = %e, "replay read failed");
            return;
        }
    };

    let limit = consumer.query.limit;
    let mut delivered = 0;
    while delivered < limit {
        let mut batch = tokio::select! {
            biased;
            _ = consumer.cancel.cancelled() => break,
            batch = batches.recv() => match batch {
                Some(batch) => batch,
                None => break,
            },
        };
        batch.truncate(limit - delivered);

        match forward(consumer, &batch, timeout).await {
            Ok(Forwarded::Delivered(n)) => delivered += n,
            Ok(Forwarded::Skipped) => {}
            Err(BusError::Timeout) => {
                warn!(consumer = %consumer.id, "replay delivery timed out, batch dropped")
            }
            Err(_) => break,
        }
    }
    debug!(consumer = %consumer.id, events = delivered, "replay finished");
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
