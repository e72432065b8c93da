//! In-process fan-out of committed change events.
//!
//! # Invariants
//! - Events are delivered in the order they are published.
//! - One broadcast channel per journal table; a table's channel is dropped
//!   once its last `Subscription` is gone.
//! - A subscriber that falls more than the buffer behind loses the oldest
//!   events and sees them counted in [`Subscription::missed`]; it recovers
//!   from the journal.

use super::ChangeEvent;
use log::{debug, warn};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

/// Events buffered per table before a slow subscriber starts missing them.
pub const FEED_BUFFER_CAPACITY: usize = 1024;

/// Selects which events a subscriber receives.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeFilter {
    pub table: String,
    /// Optional `column == value` match on the row image.
    pub column_eq: Option<(String, Value)>,
}

impl ChangeFilter {
    /// Every change on `table`.
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column_eq: None,
        }
    }

    /// Narrows the filter to rows whose `column` equals `value`.
    pub fn column_eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.column_eq = Some((column.into(), value.into()));
        self
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        event.table == self.table
            && event
                .current_row()
                .map_or(self.column_eq.is_none(), |row| self.matches_row(row))
    }

    /// Whether a row image passes the column condition. Ignores the table.
    pub fn matches_row(&self, row: &Value) -> bool {
        match &self.column_eq {
            None => true,
            Some((column, expected)) => row.get(column).is_some_and(|actual| actual == expected),
        }
    }
}

/// Shared subscriber registry. Clones publish to the same subscribers.
#[derive(Clone)]
pub struct ChangeFeed {
    senders: Arc<RwLock<HashMap<String, broadcast::Sender<ChangeEvent>>>>,
    capacity: usize,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::with_capacity(FEED_BUFFER_CAPACITY)
    }
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed whose per-table buffers hold `capacity` events (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            senders: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    pub fn subscribe(&self, filter: ChangeFilter) -> Subscription {
        let receiver = {
            let mut senders = self.write();
            let sender = senders.entry(filter.table.clone()).or_insert_with(|| {
                let (sender, _receiver) = broadcast::channel(self.capacity);
                sender
            });
            sender.subscribe()
        };
        debug!(
            "event=feed_subscribe module=realtime status=ok table={}",
            filter.table
        );
        Subscription {
            filter,
            receiver,
            missed: 0,
        }
    }

    /// Sends `events` to the subscribers of their tables.
    pub fn publish(&self, events: &[ChangeEvent]) {
        if events.is_empty() {
            return;
        }

        let mut delivered = 0usize;
        let mut idle_tables = Vec::new();
        {
            let senders = self.read();
            for event in events {
                match senders.get(&event.table) {
                    Some(sender) if sender.receiver_count() > 0 => {
                        if sender.send(event.clone()).is_ok() {
                            delivered += 1;
                        }
                    }
                    Some(_) => idle_tables.push(event.table.clone()),
                    None => {}
                }
            }
        }
        let pruned = self.prune(&idle_tables);

        debug!(
            "event=feed_publish module=realtime status=ok events={} delivered={} pruned_tables={}",
            events.len(),
            delivered,
            pruned
        );
    }

    /// Live subscriptions across all tables.
    pub fn subscriber_count(&self) -> usize {
        self.read()
            .values()
            .map(broadcast::Sender::receiver_count)
            .sum()
    }

    fn prune(&self, tables: &[String]) -> usize {
        if tables.is_empty() {
            return 0;
        }
        let mut senders = self.write();
        let before = senders.len();
        for table in tables {
            if senders
                .get(table)
                .is_some_and(|sender| sender.receiver_count() == 0)
            {
                senders.remove(table);
            }
        }
        before - senders.len()
    }

    // A panic while holding the lock leaves the map itself intact.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, broadcast::Sender<ChangeEvent>>> {
        self.senders
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, broadcast::Sender<ChangeEvent>>> {
        self.senders
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Receiving end of one subscription. Dropping it unsubscribes.
pub struct Subscription {
    filter: ChangeFilter,
    receiver: broadcast::Receiver<ChangeEvent>,
    missed: u64,
}

impl Subscription {
    pub fn filter(&self) -> &ChangeFilter {
        &self.filter
    }

    /// Next matching event already delivered, without blocking.
    pub fn try_next(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) => continue,
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(
                        "event=feed_lagged module=realtime status=degraded table={} skipped={skipped}",
                        self.filter.table
                    );
                    self.missed += skipped;
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Every matching event already delivered, without blocking.
    pub fn drain(&mut self) -> Vec<ChangeEvent> {
        std::iter::from_fn(|| self.try_next()).collect()
    }

    /// Events dropped because this subscriber fell behind the buffer.
    pub fn missed(&self) -> u64 {
        self.missed
    }
}
