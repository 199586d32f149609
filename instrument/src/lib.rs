//! Columnar capture of simulation events.
//!
//! [`TableSubscriber`] turns every info-level `tracing` event into one row of
//! an [`EventTable`] named after the event's target. A field seen for the
//! first time opens a new column, back-filled with defaults so that every
//! column in a table has one cell per row.
//!
//! # Usage
//!
//! ```ignore
//! // In engine code:
//! tracing::info!(target: "period", seed, period, supply, reward);
//!
//! // In a test:
//! let (_, log) = instrument::capture(|| run_something());
//! let supply = log.table("period").unwrap().f64_column("supply").unwrap();
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

use polars::prelude::*;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Record};
use tracing::{Event, Id, Level, Metadata, Subscriber};

/// Cells of one column, typed by the first value recorded into it.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    U64(Vec<u64>),
    I64(Vec<i64>),
    F64(Vec<f64>),
    Bool(Vec<bool>),
    Str(Vec<String>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            Self::U64(cells) => cells.len(),
            Self::I64(cells) => cells.len(),
            Self::F64(cells) => cells.len(),
            Self::Bool(cells) => cells.len(),
            Self::Str(cells) => cells.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append default cells until the column holds `rows` cells.
    fn fill_to(&mut self, rows: usize) {
        let n = rows.saturating_sub(self.len());
        match self {
            Self::U64(cells) => cells.resize(cells.len() + n, 0),
            Self::I64(cells) => cells.resize(cells.len() + n, 0),
            Self::F64(cells) => cells.resize(cells.len() + n, 0.0),
            Self::Bool(cells) => cells.resize(cells.len() + n, false),
            Self::Str(cells) => cells.resize(cells.len() + n, String::new()),
        }
    }

    fn to_polars(&self, name: &str) -> Column {
        let name = PlSmallStr::from(name);
        match self {
            Self::U64(cells) => Column::new(name, cells),
            Self::I64(cells) => Column::new(name, cells),
            Self::F64(cells) => Column::new(name, cells),
            Self::Bool(cells) => Column::new(name, cells),
            Self::Str(cells) => Column::new(name, cells),
        }
    }
}

/// Rows of every event sharing one target.
#[derive(Debug, Clone, Default)]
pub struct EventTable {
    pub columns: HashMap<String, ColumnData>,
    pub row_count: usize,
}

impl EventTable {
    pub fn f64_column(&self, name: &str) -> Option<&[f64]> {
        match self.columns.get(name)? {
            ColumnData::F64(cells) => Some(cells),
            _ => None,
        }
    }

    pub fn u64_column(&self, name: &str) -> Option<&[u64]> {
        match self.columns.get(name)? {
            ColumnData::U64(cells) => Some(cells),
            _ => None,
        }
    }

    /// Append one event as a new row.
    fn push_row(&mut self, event: &Event<'_>) {
        let row = self.row_count;
        event.record(&mut RowWriter { table: self, row });
        self.row_count += 1;
        // Columns this event did not mention
        for column in self.columns.values_mut() {
            column.fill_to(self.row_count);
        }
    }

    /// Convert to a polars DataFrame, columns in name order.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let mut names: Vec<&String> = self.columns.keys().collect();
        names.sort();
        DataFrame::new(
            names
                .into_iter()
                .map(|name| self.columns[name].to_polars(name))
                .collect(),
        )
    }
}

/// Everything captured on one thread, keyed by event target.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    pub tables: HashMap<String, EventTable>,
}

impl EventLog {
    pub fn table(&self, target: &str) -> Option<&EventTable> {
        self.tables.get(target)
    }

    /// One DataFrame per table. Tables polars rejects are left out.
    pub fn to_dataframes(&self) -> HashMap<String, DataFrame> {
        self.tables
            .iter()
            .filter_map(|(target, table)| Some((target.clone(), table.to_dataframe().ok()?)))
            .collect()
    }
}

thread_local! {
    static LOG: RefCell<EventLog> = RefCell::default();
}

/// Writes the fields of one event into row `row` of a table.
struct RowWriter<'a> {
    table: &'a mut EventTable,
    row: usize,
}

impl RowWriter<'_> {
    /// The named column, created with `row` default cells if new.
    fn column(&mut self, field: &Field, open: fn(usize) -> ColumnData) -> &mut ColumnData {
        let row = self.row;
        self.table
            .columns
            .entry(field.name().to_owned())
            .or_insert_with(|| open(row))
    }
}

impl Visit for RowWriter<'_> {
    fn record_u64(&mut self, field: &Field, value: u64) {
        if let ColumnData::U64(cells) = self.column(field, |n| ColumnData::U64(vec![0; n])) {
            cells.push(value);
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        if let ColumnData::I64(cells) = self.column(field, |n| ColumnData::I64(vec![0; n])) {
            cells.push(value);
        }
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        if let ColumnData::F64(cells) = self.column(field, |n| ColumnData::F64(vec![0.0; n])) {
            cells.push(value);
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        if let ColumnData::Bool(cells) = self.column(field, |n| ColumnData::Bool(vec![false; n])) {
            cells.push(value);
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if let ColumnData::Str(cells) =
            self.column(field, |n| ColumnData::Str(vec![String::new(); n]))
        {
            cells.push(value.to_owned());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record_str(field, &format!("{:?}", value));
    }
}

/// Subscriber that appends info-level events to the thread-local [`EventLog`].
///
/// Spans are accepted but not recorded.
pub struct TableSubscriber;

impl Subscriber for TableSubscriber {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        // Per-run progress at debug stays out of the tables
        metadata.is_event() && *metadata.level() <= Level::INFO
    }

    fn new_span(&self, _span: &Attributes<'_>) -> Id {
        Id::from_u64(1)
    }

    fn record(&self, _span: &Id, _values: &Record<'_>) {}

    fn record_follows_from(&self, _span: &Id, _follows: &Id) {}

    fn event(&self, event: &Event<'_>) {
        let target = event.metadata().target();
        LOG.with_borrow_mut(|log| {
            log.tables
                .entry(target.to_owned())
                .or_default()
                .push_row(event)
        });
    }

    fn enter(&self, _span: &Id) {}

    fn exit(&self, _span: &Id) {}
}

/// Take everything captured so far on this thread.
pub fn drain() -> EventLog {
    LOG.with_borrow_mut(std::mem::take)
}

/// Discard everything captured so far on this thread.
pub fn clear() {
    LOG.with_borrow_mut(|log| log.tables.clear());
}

/// Run `f` with [`TableSubscriber`] as this thread's subscriber and return
/// what it captured.
///
/// Events emitted on other threads (a rayon pool, say) are not seen.
pub fn capture<R>(f: impl FnOnce() -> R) -> (R, EventLog) {
    clear();
    let out = tracing::subscriber::with_default(TableSubscriber, f);
    (out, drain())
}
