use crate::{
    catalog::{Category, CountMethod},
    entry::{Entry, JournalRecord},
    ledger::{EntryKey, Ledger, LedgerRow, ReconcilePolicy},
    quantity::Quantity,
    table::{self, Record},
};
use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use log::{debug, info, warn};

use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StoreOptions {
    pub policy: ReconcilePolicy,
    /// Journaled entries that trigger a rewrite of the table. `1` rewrites
    /// the table on every write.
    pub compact_every: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        StoreOptions {
            policy: ReconcilePolicy::Bounded,
            compact_every: 50,
        }
    }
}

#[derive(Debug)]
struct StoreState {
    ledger: Ledger,
    pending: usize,
}

/// The distribution ledger on disk.
///
/// The table file is a compacted snapshot; entries accepted since the last
/// compaction live in a journal next to it (`<table>.journal`) and are
/// replayed on open. All reads and writes go through one lock, so writers
/// within the process never interleave. Separate processes sharing the same
/// files are not coordinated.
#[derive(Debug)]
pub struct LedgerStore {
    table: PathBuf,
    journal: PathBuf,
    options: StoreOptions,
    state: Mutex<StoreState>,
}

impl LedgerStore {
    pub fn open(table: impl Into<PathBuf>, options: StoreOptions) -> Result<LedgerStore> {
        let table = table.into();
        let journal = table::sibling(&table, ".journal");

        let rows: Vec<LedgerRow> = table::read_table(&table)?;
        let mut ledger = Ledger::from_rows(rows, options.policy);
        let replay = replay_journal(&journal, &mut ledger)?;
        debug!(
            "opened {} with {} rows, {} journaled entries",
            table.display(),
            ledger.len(),
            replay.applied
        );

        let store = LedgerStore {
            table,
            journal,
            options,
            state: Mutex::new(StoreState {
                ledger,
                pending: replay.applied,
            }),
        };
        // New records must not be appended after a damaged one.
        if replay.skipped > 0 {
            warn!(
                "{} unreadable journal records in {}, compacting",
                replay.skipped,
                store.journal.display()
            );
            store.compact()?;
        }
        Ok(store)
    }

    pub fn table_path(&self) -> &Path {
        &self.table
    }

    pub fn journal_path(&self) -> &Path {
        &self.journal
    }

    pub fn policy(&self) -> ReconcilePolicy {
        self.options.policy
    }

    pub fn record_distribution(
        &self,
        date: NaiveDate,
        category: Category,
        product: &str,
        count_method: Option<CountMethod>,
        quantity: Quantity,
    ) -> Result<LedgerRow> {
        let key = EntryKey::new(category, product, count_method);
        self.submit(Entry::Distributed(date, key, quantity))
    }

    pub fn record_remaining(
        &self,
        date: NaiveDate,
        category: Category,
        product: &str,
        count_method: Option<CountMethod>,
        remaining: Quantity,
    ) -> Result<LedgerRow> {
        let key = EntryKey::new(category, product, count_method);
        self.submit(Entry::Remaining(date, key, remaining))
    }

    /// Validate, journal and apply one entry. A rejected entry leaves both
    /// the files and the index untouched.
    pub fn submit(&self, entry: Entry) -> Result<LedgerRow> {
        let mut state = self.lock()?;
        state.ledger.check(&entry)?;
        append_journal(&self.journal, &entry)?;
        let row = state.ledger.apply(&entry);
        state.pending += 1;
        info!(
            "{:?} {} of '{}' ({}) on {}: distributed {}, left {}, total {}",
            entry.kind(),
            entry.quantity(),
            row.product,
            row.category,
            row.date,
            row.distributed,
            row.remaining,
            row.total_distributed
        );

        // The entry is durable in the journal by now, a failed compaction
        // is retried on the next write.
        if state.pending >= self.options.compact_every.max(1) {
            if let Err(err) = self.compact_locked(&mut state) {
                warn!(
                    "unable to compact {}, {} entries stay journaled: {:#}",
                    self.table.display(),
                    state.pending,
                    err
                );
            }
        }
        Ok(row)
    }

    pub fn row(&self, date: &NaiveDate, key: &EntryKey) -> Result<Option<LedgerRow>> {
        Ok(self.lock()?.ledger.row(date, key))
    }

    pub fn rows(&self) -> Result<Vec<LedgerRow>> {
        Ok(self.lock()?.ledger.rows().collect())
    }

    pub fn rows_on(&self, date: &NaiveDate) -> Result<Vec<LedgerRow>> {
        Ok(self.lock()?.ledger.rows_on(date).collect())
    }

    /// Number of journaled entries not yet folded into the table.
    pub fn pending(&self) -> Result<usize> {
        Ok(self.lock()?.pending)
    }

    /// Rewrite the table from the index and drop the journal.
    pub fn compact(&self) -> Result<()> {
        let mut state = self.lock()?;
        self.compact_locked(&mut state)
    }

    fn compact_locked(&self, state: &mut StoreState) -> Result<()> {
        let rows: Vec<LedgerRow> = state.ledger.rows().collect();
        table::write_table(&self.table, &rows)?;
        match fs::remove_file(&self.journal) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("unable to remove {}", self.journal.display()))
            }
        }
        info!(
            "compacted {} journaled entries into {}",
            state.pending,
            self.table.display()
        );
        state.pending = 0;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("ledger store lock poisoned"))
    }
}

fn append_journal(path: &Path, entry: &Entry) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("unable to open {}", path.display()))?;
    let fresh = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    if fresh {
        writer.write_record(JournalRecord::HEADERS)?;
    }
    writer.serialize(JournalRecord::from(entry))?;
    writer.flush()?;
    Ok(())
}

#[derive(Debug, Default)]
struct Replay {
    applied: usize,
    skipped: usize,
}

/// Apply every journaled entry to `ledger`. Entries were checked before they
/// were journaled, so they are applied as-is. A record that fails to decode
/// (typically a torn last line after a crash) is skipped and counted.
fn replay_journal(path: &Path, ledger: &mut Ledger) -> Result<Replay> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Replay::default()),
        Err(err) => {
            return Err(err).with_context(|| format!("unable to open {}", path.display()))
        }
    };

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(file);
    let mut replay = Replay::default();
    for (line, record) in reader.deserialize::<JournalRecord>().enumerate() {
        match record {
            Ok(record) => {
                ledger.apply(&Entry::from(record));
                replay.applied += 1;
            }
            Err(err) => {
                warn!(
                    "skipping journal record {} in {}: {}",
                    line + 1,
                    path.display(),
                    err
                );
                replay.skipped += 1;
            }
        }
    }
    Ok(replay)
}
