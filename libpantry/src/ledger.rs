use crate::{
    catalog::{Category, CountMethod},
    entry::Entry,
    error::PantryError,
    quantity::Quantity,
    table::Record,
};
use chrono::naive::NaiveDate;
use indexmap::{map::Entry as Slot, IndexMap};
use log::warn;
use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// What makes two submissions land on the same row of a given day.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryKey {
    pub category: Category,
    pub product: String,
    pub count_method: Option<CountMethod>,
}

impl EntryKey {
    pub fn new(
        category: Category,
        product: impl Into<String>,
        count_method: Option<CountMethod>,
    ) -> Self {
        Self {
            category,
            product: product.into(),
            count_method,
        }
    }
}

/// Running figures for one product on one day.
///
/// Until a remaining count is recorded `total_distributed == distributed`
/// and `remaining == 0`; afterwards `total_distributed == distributed -
/// remaining`, later distributions adding to both sides.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Tally {
    pub distributed: Quantity,
    pub remaining: Quantity,
    pub total_distributed: Quantity,
}

impl Tally {
    fn distribute(&mut self, quantity: Quantity) {
        self.distributed += quantity;
        self.total_distributed += quantity;
    }

    fn reconcile(&mut self, remaining: Quantity) {
        self.remaining = remaining;
        self.total_distributed = self.distributed - remaining;
    }

    fn merge(&mut self, other: &Tally) {
        self.distributed += other.distributed;
        self.remaining += other.remaining;
        self.total_distributed += other.total_distributed;
    }
}

/// One row of the distribution table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerRow {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Category")]
    pub category: Category,
    #[serde(rename = "Product")]
    pub product: String,
    #[serde(rename = "Count Method", default)]
    pub count_method: Option<CountMethod>,
    #[serde(rename = "Product Distributed")]
    pub distributed: Quantity,
    #[serde(rename = "Product Left", default)]
    pub remaining: Quantity,
    #[serde(rename = "Total Product Distributed")]
    pub total_distributed: Quantity,
}

impl LedgerRow {
    fn from_parts(date: NaiveDate, key: &EntryKey, tally: &Tally) -> Self {
        LedgerRow {
            date,
            category: key.category.clone(),
            product: key.product.clone(),
            count_method: key.count_method,
            distributed: tally.distributed,
            remaining: tally.remaining,
            total_distributed: tally.total_distributed,
        }
    }

    pub fn key(&self) -> EntryKey {
        EntryKey::new(self.category.clone(), self.product.clone(), self.count_method)
    }

    pub fn tally(&self) -> Tally {
        Tally {
            distributed: self.distributed,
            remaining: self.remaining,
            total_distributed: self.total_distributed,
        }
    }
}

impl Record for LedgerRow {
    const HEADERS: &'static [&'static str] = &[
        "Date",
        "Category",
        "Product",
        "Count Method",
        "Product Distributed",
        "Product Left",
        "Total Product Distributed",
    ];
}

/// How an end-of-day count that is larger than what was distributed is
/// handled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReconcilePolicy {
    /// Reject the count with [`PantryError::ExceedsDistributed`].
    #[default]
    Bounded,
    /// Store it anyway, leaving a negative total.
    Overwrite,
}

impl FromStr for ReconcilePolicy {
    type Err = PantryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bounded" => Ok(ReconcilePolicy::Bounded),
            "overwrite" => Ok(ReconcilePolicy::Overwrite),
            _ => Err(PantryError::InvalidPolicy(s.to_string())),
        }
    }
}

impl fmt::Display for ReconcilePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcilePolicy::Bounded => write!(f, "bounded"),
            ReconcilePolicy::Overwrite => write!(f, "overwrite"),
        }
    }
}

#[derive(Debug, Default)]
pub struct DayBook {
    entries: IndexMap<EntryKey, Tally>,
}

impl DayBook {
    pub fn new() -> DayBook {
        DayBook {
            entries: IndexMap::new(),
        }
    }

    pub fn get(&self, key: &EntryKey) -> Option<&Tally> {
        self.entries.get(key)
    }

    /// Rows of the day in the order they were first logged.
    pub fn entries(&self) -> &IndexMap<EntryKey, Tally> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Per-day index over the distribution table.
#[derive(Debug, Default)]
pub struct Ledger {
    bookings: BTreeMap<NaiveDate, DayBook>,
    policy: ReconcilePolicy,
}

impl Ledger {
    pub fn new(policy: ReconcilePolicy) -> Ledger {
        Ledger {
            bookings: BTreeMap::new(),
            policy,
        }
    }

    /// Index rows read back from a table. Rows sharing a key are summed
    /// column by column, so a table with duplicate rows collapses into one
    /// row per key.
    pub fn from_rows<I>(rows: I, policy: ReconcilePolicy) -> Ledger
    where
        I: IntoIterator<Item = LedgerRow>,
    {
        let mut ledger = Ledger::new(policy);
        for row in rows {
            let tally = row.tally();
            ledger
                .bookings
                .entry(row.date)
                .or_default()
                .entries
                .entry(row.key())
                .or_default()
                .merge(&tally);
        }
        ledger
    }

    pub fn policy(&self) -> ReconcilePolicy {
        self.policy
    }

    pub fn process_entry(&mut self, entry: &Entry) -> Result<LedgerRow, PantryError> {
        self.check(entry)?;
        Ok(self.apply(entry))
    }

    /// Validate `entry` against the current state without touching it.
    pub fn check(&self, entry: &Entry) -> Result<(), PantryError> {
        match entry {
            Entry::Distributed(..) => Ok(()),
            Entry::Remaining(date, key, remaining) => {
                if self.policy == ReconcilePolicy::Overwrite {
                    return Ok(());
                }
                match self.tally(date, key) {
                    Some(tally) if *remaining > tally.distributed => {
                        Err(PantryError::ExceedsDistributed {
                            remaining: remaining.value(),
                            distributed: tally.distributed.value(),
                        })
                    }
                    _ => Ok(()),
                }
            }
        }
    }

    /// Apply an entry that already passed [`Ledger::check`].
    pub fn apply(&mut self, entry: &Entry) -> LedgerRow {
        let date = entry.date();
        let book = self.bookings.entry(date).or_default();

        match entry {
            Entry::Distributed(_, key, quantity) => {
                let tally = book.entries.entry(key.clone()).or_default();
                tally.distribute(*quantity);
                LedgerRow::from_parts(date, key, tally)
            }
            Entry::Remaining(_, key, remaining) => {
                let tally = match book.entries.entry(key.clone()) {
                    Slot::Occupied(slot) => slot.into_mut(),
                    Slot::Vacant(slot) => {
                        warn!(
                            "{} left of '{}' ({}) on {} with nothing distributed, total goes negative",
                            remaining, key.product, key.category, date
                        );
                        slot.insert(Tally::default())
                    }
                };
                tally.reconcile(*remaining);
                LedgerRow::from_parts(date, key, tally)
            }
        }
    }

    pub fn record_distribution(
        &mut self,
        date: NaiveDate,
        category: Category,
        product: &str,
        count_method: Option<CountMethod>,
        quantity: Quantity,
    ) -> LedgerRow {
        let key = EntryKey::new(category, product, count_method);
        self.apply(&Entry::Distributed(date, key, quantity))
    }

    pub fn record_remaining(
        &mut self,
        date: NaiveDate,
        category: Category,
        product: &str,
        count_method: Option<CountMethod>,
        remaining: Quantity,
    ) -> Result<LedgerRow, PantryError> {
        let key = EntryKey::new(category, product, count_method);
        self.process_entry(&Entry::Remaining(date, key, remaining))
    }

    pub fn get_at(&self, date: &NaiveDate) -> Option<&DayBook> {
        self.bookings.get(date)
    }

    pub fn tally(&self, date: &NaiveDate, key: &EntryKey) -> Option<&Tally> {
        self.get_at(date).and_then(|book| book.get(key))
    }

    pub fn row(&self, date: &NaiveDate, key: &EntryKey) -> Option<LedgerRow> {
        self.tally(date, key)
            .map(|tally| LedgerRow::from_parts(*date, key, tally))
    }

    /// Every row, oldest day first.
    pub fn rows(&self) -> impl Iterator<Item = LedgerRow> + '_ {
        self.bookings.iter().flat_map(|(date, book)| {
            book.entries
                .iter()
                .map(move |(key, tally)| LedgerRow::from_parts(*date, key, tally))
        })
    }

    pub fn rows_on<'l>(&'l self, date: &NaiveDate) -> impl Iterator<Item = LedgerRow> + 'l {
        let date = *date;
        self.get_at(&date).into_iter().flat_map(move |book| {
            book.entries
                .iter()
                .map(move |(key, tally)| LedgerRow::from_parts(date, key, tally))
        })
    }

    pub fn len(&self) -> usize {
        self.bookings.values().map(DayBook::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
