//! Client-side mirrors kept current by change events.
//!
//! # Invariants
//! - Events with `seq <= last_seq()` are ignored, so replays are harmless.
//! - Inserts replace an existing row with the same id instead of duplicating it.
//! - Updates for unknown ids are ignored; deletes of unknown ids are no-ops.
//! - A filtered mirror follows rows across its column condition: an update
//!   whose old image failed the filter and whose new image passes adds the
//!   row, the reverse removes it.

use super::feed::{ChangeFeed, ChangeFilter, Subscription};
use super::journal::{latest_seq, read_after};
use super::{tables, ChangeEvent, ChangeKind};
use crate::model::invoice::Invoice;
use crate::model::menu::MenuItem;
use crate::model::notification::Notification;
use crate::model::order::{Order, OrderItem};
use crate::model::staff::StaffMember;
use crate::model::table::DiningTable;
use crate::repo::{RepoError, RepoResult};
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use std::error::Error;
use std::fmt::{Display, Formatter};

const CATCH_UP_BATCH: u32 = 500;

/// A model type that can be mirrored from journal row images.
pub trait LiveRow: DeserializeOwned {
    /// Journal table name the rows come from.
    const TABLE: &'static str;

    fn row_id(&self) -> String;
}

macro_rules! live_row {
    ($ty:ty, $table:expr) => {
        impl LiveRow for $ty {
            const TABLE: &'static str = $table;

            fn row_id(&self) -> String {
                self.id.to_string()
            }
        }
    };
}

live_row!(StaffMember, tables::STAFF);
live_row!(DiningTable, tables::DINING_TABLES);
live_row!(MenuItem, tables::MENU_ITEMS);
live_row!(Order, tables::ORDERS);
live_row!(OrderItem, tables::ORDER_ITEMS);
live_row!(Invoice, tables::INVOICES);
live_row!(Notification, tables::NOTIFICATIONS);

#[derive(Debug)]
pub enum LiveError {
    Journal(RepoError),
    /// An insert or update carried no `new` row image.
    MissingRowImage { seq: i64 },
    Decode {
        table: String,
        seq: i64,
        source: serde_json::Error,
    },
}

impl Display for LiveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Journal(err) => write!(f, "{err}"),
            Self::MissingRowImage { seq } => write!(f, "change {seq} has no row image"),
            Self::Decode { table, seq, source } => {
                write!(f, "cannot decode {table} row from change {seq}: {source}")
            }
        }
    }
}

impl Error for LiveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Journal(err) => Some(err),
            Self::Decode { source, .. } => Some(source),
            Self::MissingRowImage { .. } => None,
        }
    }
}

impl From<RepoError> for LiveError {
    fn from(value: RepoError) -> Self {
        Self::Journal(value)
    }
}

fn decode_new<T: LiveRow>(event: &ChangeEvent) -> Result<T, LiveError> {
    let image = event
        .new
        .clone()
        .ok_or(LiveError::MissingRowImage { seq: event.seq })?;
    serde_json::from_value(image).map_err(|source| LiveError::Decode {
        table: event.table.clone(),
        seq: event.seq,
        source,
    })
}

/// Mirror of the rows of one table that match a filter.
pub struct LiveTable<T: LiveRow> {
    filter: ChangeFilter,
    rows: Vec<T>,
    last_seq: i64,
}

impl<T: LiveRow> LiveTable<T> {
    /// Empty mirror of every row of `T::TABLE`.
    pub fn new() -> Self {
        Self::with_filter(ChangeFilter::table(T::TABLE))
    }

    /// Empty mirror restricted to `filter`. The filter's table is forced to `T::TABLE`.
    pub fn with_filter(mut filter: ChangeFilter) -> Self {
        filter.table = T::TABLE.to_string();
        Self {
            filter,
            rows: Vec::new(),
            last_seq: 0,
        }
    }

    /// Subscribes to `feed`, then loads the initial snapshot.
    ///
    /// Subscribing first guarantees nothing committed after the snapshot is
    /// missed; anything committed in between is either skipped by `seq` or
    /// re-applied idempotently.
    pub fn subscribe_and_load(
        feed: &ChangeFeed,
        conn: &Connection,
        filter: ChangeFilter,
        snapshot: impl FnOnce(&Connection) -> RepoResult<Vec<T>>,
    ) -> Result<(Self, Subscription), LiveError> {
        let mut table = Self::with_filter(filter);
        let subscription = feed.subscribe(table.filter.clone());
        let as_of_seq = latest_seq(conn)?;
        table.load(snapshot(conn)?, as_of_seq);
        Ok((table, subscription))
    }

    /// Replaces the mirror with `rows`, current as of journal `as_of_seq`.
    pub fn load(&mut self, rows: Vec<T>, as_of_seq: i64) {
        self.rows = rows;
        self.last_seq = as_of_seq;
    }

    /// Applies one event. Returns whether the mirror changed.
    pub fn apply(&mut self, event: &ChangeEvent) -> Result<bool, LiveError> {
        if event.seq <= self.last_seq || event.table != T::TABLE {
            return Ok(false);
        }

        let in_view = self.filter.matches(event);
        let was_in_view = event
            .old
            .as_ref()
            .is_some_and(|row| self.filter.matches_row(row));

        let changed = match event.kind {
            ChangeKind::Insert if in_view => {
                self.upsert(decode_new::<T>(event)?, &event.row_id);
                true
            }
            // The row moved into the filtered view.
            ChangeKind::Update if in_view && !was_in_view => {
                self.upsert(decode_new::<T>(event)?, &event.row_id);
                true
            }
            ChangeKind::Update if in_view => match self.position(&event.row_id) {
                Some(index) => {
                    self.rows[index] = decode_new::<T>(event)?;
                    true
                }
                None => false,
            },
            // The row moved out of the filtered view.
            ChangeKind::Update if was_in_view => self.remove(&event.row_id),
            ChangeKind::Delete => self.remove(&event.row_id),
            ChangeKind::Insert | ChangeKind::Update => false,
        };

        self.last_seq = event.seq;
        Ok(changed)
    }

    /// Applies everything waiting on `subscription`. Returns how many events changed the mirror.
    ///
    /// If the subscription reports [`Subscription::missed`] events, follow up
    /// with [`LiveTable::catch_up`].
    pub fn sync(&mut self, subscription: &mut Subscription) -> Result<usize, LiveError> {
        let mut changed = 0;
        for event in subscription.drain() {
            if self.apply(&event)? {
                changed += 1;
            }
        }
        Ok(changed)
    }

    /// Replays journal rows newer than `last_seq()`; used by consumers in
    /// another process that cannot share the in-memory feed.
    pub fn catch_up(&mut self, conn: &Connection) -> Result<usize, LiveError> {
        let mut changed = 0;
        loop {
            let batch = read_after(conn, self.last_seq, CATCH_UP_BATCH)?;
            if batch.is_empty() {
                return Ok(changed);
            }
            for event in &batch {
                if self.apply(event)? {
                    changed += 1;
                }
                self.last_seq = self.last_seq.max(event.seq);
            }
        }
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn get(&self, row_id: &str) -> Option<&T> {
        self.position(row_id).map(|index| &self.rows[index])
    }

    pub fn last_seq(&self) -> i64 {
        self.last_seq
    }

    fn position(&self, row_id: &str) -> Option<usize> {
        self.rows.iter().position(|row| row.row_id() == row_id)
    }

    fn upsert(&mut self, row: T, row_id: &str) {
        match self.position(row_id) {
            Some(index) => self.rows[index] = row,
            None => self.rows.push(row),
        }
    }

    fn remove(&mut self, row_id: &str) -> bool {
        match self.position(row_id) {
            Some(index) => {
                self.rows.remove(index);
                true
            }
            None => false,
        }
    }
}

impl<T: LiveRow> Default for LiveTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Mirror of a single row, e.g. the order a server is looking at.
pub struct LiveRecord<T: LiveRow> {
    row_id: String,
    value: Option<T>,
    last_seq: i64,
}

impl<T: LiveRow> LiveRecord<T> {
    pub fn new(row_id: impl Into<String>, initial: Option<T>, as_of_seq: i64) -> Self {
        Self {
            row_id: row_id.into(),
            value: initial,
            last_seq: as_of_seq,
        }
    }

    /// Filter that delivers only this row's changes.
    pub fn filter(&self) -> ChangeFilter {
        ChangeFilter::table(T::TABLE).column_eq("id", self.row_id.clone())
    }

    /// Applies one event. Returns whether the value changed.
    pub fn apply(&mut self, event: &ChangeEvent) -> Result<bool, LiveError> {
        if event.seq <= self.last_seq || event.table != T::TABLE || event.row_id != self.row_id {
            return Ok(false);
        }

        match event.kind {
            ChangeKind::Insert | ChangeKind::Update => {
                self.value = Some(decode_new::<T>(event)?);
            }
            ChangeKind::Delete => self.value = None,
        }
        self.last_seq = event.seq;
        Ok(true)
    }

    pub fn sync(&mut self, subscription: &mut Subscription) -> Result<usize, LiveError> {
        let mut changed = 0;
        for event in subscription.drain() {
            if self.apply(&event)? {
                changed += 1;
            }
        }
        Ok(changed)
    }

    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn last_seq(&self) -> i64 {
        self.last_seq
    }
}

#[cfg(test)]
mod tests {
    use super::{LiveRecord, LiveTable};
    use crate::model::table::{DiningTable, TableStatus};
    use crate::realtime::{tables, ChangeEvent, ChangeFilter, ChangeKind};
    use serde_json::to_value;
    use uuid::Uuid;

    fn change(seq: i64, kind: ChangeKind, old: Option<&DiningTable>, new: Option<&DiningTable>) -> ChangeEvent {
        let row_id = new.or(old).map(|t| t.id.to_string()).unwrap_or_default();
        ChangeEvent {
            seq,
            table: tables::DINING_TABLES.to_string(),
            kind,
            row_id,
            new: new.map(|t| to_value(t).expect("serialize")),
            old: old.map(|t| to_value(t).expect("serialize")),
            created_at: 0,
        }
    }

    fn seated(table: &DiningTable) -> DiningTable {
        let mut next = table.clone();
        next.status = TableStatus::Occupied;
        next.current_server_id = Some(Uuid::new_v4());
        next
    }

    #[test]
    fn applies_insert_update_delete_and_skips_replays() {
        let first = DiningTable::new(1);
        let second = DiningTable::new(2);
        let mut live = LiveTable::<DiningTable>::new();
        live.load(vec![first.clone()], 10);

        assert!(!live
            .apply(&change(10, ChangeKind::Insert, None, Some(&second)))
            .expect("replay"));
        assert!(live
            .apply(&change(11, ChangeKind::Insert, None, Some(&second)))
            .expect("insert"));
        assert!(live
            .apply(&change(12, ChangeKind::Insert, None, Some(&second)))
            .expect("duplicate insert"));
        assert_eq!(live.rows().len(), 2);

        let updated = seated(&first);
        assert!(live
            .apply(&change(13, ChangeKind::Update, Some(&first), Some(&updated)))
            .expect("update"));
        assert_eq!(
            live.get(&first.id.to_string()).map(|t| t.status),
            Some(TableStatus::Occupied)
        );

        let stranger = DiningTable::new(9);
        assert!(!live
            .apply(&change(14, ChangeKind::Update, Some(&stranger), Some(&seated(&stranger))))
            .expect("unknown update"));

        assert!(live
            .apply(&change(15, ChangeKind::Delete, Some(&second), None))
            .expect("delete"));
        assert_eq!(live.rows().len(), 1);
        assert_eq!(live.last_seq(), 15);
    }

    #[test]
    fn filtered_mirror_drops_rows_that_leave_the_view() {
        let table = DiningTable::new(4);
        let mut live = LiveTable::<DiningTable>::with_filter(
            ChangeFilter::table(tables::DINING_TABLES).column_eq("status", "free"),
        );
        live.load(vec![table.clone()], 0);

        assert!(live
            .apply(&change(1, ChangeKind::Update, Some(&table), Some(&seated(&table))))
            .expect("update"));
        assert!(live.rows().is_empty());
    }

    #[test]
    fn filtered_mirror_admits_rows_that_enter_the_view() {
        let free = DiningTable::new(7);
        let occupied = seated(&free);
        let mut live = LiveTable::<DiningTable>::with_filter(
            ChangeFilter::table(tables::DINING_TABLES).column_eq("status", "occupied"),
        );
        live.load(Vec::new(), 0);

        assert!(live
            .apply(&change(1, ChangeKind::Update, Some(&free), Some(&occupied)))
            .expect("entering update"));
        assert_eq!(
            live.get(&free.id.to_string()).map(|t| t.status),
            Some(TableStatus::Occupied)
        );

        let mut moved = occupied.clone();
        moved.current_server_id = Some(Uuid::new_v4());
        assert!(live
            .apply(&change(2, ChangeKind::Update, Some(&occupied), Some(&moved)))
            .expect("in-view update"));
        assert_eq!(live.rows().len(), 1);
        assert_eq!(live.rows()[0].current_server_id, moved.current_server_id);
    }

    #[test]
    fn record_tracks_one_row() {
        let table = DiningTable::new(5);
        let other = DiningTable::new(6);
        let mut record = LiveRecord::new(table.id.to_string(), Some(table.clone()), 0);

        assert!(!record
            .apply(&change(1, ChangeKind::Update, Some(&other), Some(&seated(&other))))
            .expect("other row"));
        assert!(record
            .apply(&change(2, ChangeKind::Update, Some(&table), Some(&seated(&table))))
            .expect("own row"));
        assert_eq!(record.value().map(|t| t.status), Some(TableStatus::Occupied));

        assert!(record
            .apply(&change(3, ChangeKind::Delete, Some(&table), None))
            .expect("delete"));
        assert!(record.value().is_none());
    }
}
