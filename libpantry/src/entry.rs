use crate::catalog::{Category, CountMethod};
use crate::ledger::EntryKey;
use crate::quantity::Quantity;
use crate::table::Record;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single submission against the distribution ledger.
#[derive(Clone, Debug, PartialEq)]
pub enum Entry {
    /// Quantity handed out, summed into the day's running total.
    Distributed(NaiveDate, EntryKey, Quantity),
    /// End-of-day count of what is left, overwrites the previous count.
    Remaining(NaiveDate, EntryKey, Quantity),
}

impl Entry {
    pub fn date(&self) -> NaiveDate {
        match self {
            Entry::Distributed(date, _, _) | Entry::Remaining(date, _, _) => *date,
        }
    }

    pub fn key(&self) -> &EntryKey {
        match self {
            Entry::Distributed(_, key, _) | Entry::Remaining(_, key, _) => key,
        }
    }

    pub fn quantity(&self) -> Quantity {
        match self {
            Entry::Distributed(_, _, quantity) | Entry::Remaining(_, _, quantity) => *quantity,
        }
    }

    pub fn kind(&self) -> EntryKind {
        match self {
            Entry::Distributed(..) => EntryKind::Distributed,
            Entry::Remaining(..) => EntryKind::Remaining,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    Distributed,
    Remaining,
}

/// On-disk form of an [`Entry`], one line of the ledger journal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JournalRecord {
    #[serde(rename = "Kind")]
    pub kind: EntryKind,
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Category")]
    pub category: Category,
    #[serde(rename = "Product")]
    pub product: String,
    #[serde(rename = "Count Method", default)]
    pub count_method: Option<CountMethod>,
    #[serde(rename = "Quantity")]
    pub quantity: Quantity,
}

impl Record for JournalRecord {
    const HEADERS: &'static [&'static str] = &[
        "Kind",
        "Date",
        "Category",
        "Product",
        "Count Method",
        "Quantity",
    ];
}

impl From<&Entry> for JournalRecord {
    fn from(entry: &Entry) -> Self {
        let key = entry.key();
        JournalRecord {
            kind: entry.kind(),
            date: entry.date(),
            category: key.category.clone(),
            product: key.product.clone(),
            count_method: key.count_method,
            quantity: entry.quantity(),
        }
    }
}

impl From<JournalRecord> for Entry {
    fn from(record: JournalRecord) -> Self {
        let key = EntryKey::new(record.category, record.product, record.count_method);
        match record.kind {
            EntryKind::Distributed => Entry::Distributed(record.date, key, record.quantity),
            EntryKind::Remaining => Entry::Remaining(record.date, key, record.quantity),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::catalog::{Category, CountMethod};
    use crate::entry::{Entry, EntryKind, JournalRecord};
    use crate::ledger::EntryKey;
    use crate::quantity::Quantity;
    use chrono::NaiveDate;

    use anyhow::{anyhow, Result};

    #[test]
    fn journal_record_carries_entry() -> Result<()> {
        let date = NaiveDate::from_ymd_opt(2024, 11, 1).ok_or(anyhow!("invalid date"))?;
        let entry = Entry::Remaining(
            date,
            EntryKey::new(Category::Produce, "Apples", Some(CountMethod::Crates)),
            Quantity::new(0.25),
        );

        let record = JournalRecord::from(&entry);
        assert_eq!(record.kind, EntryKind::Remaining);
        assert_eq!(record.category, Category::Produce);
        assert_eq!(record.count_method, Some(CountMethod::Crates));
        assert_eq!(Entry::from(record), entry);
        Ok(())
    }

    #[test]
    fn journal_line_layout() -> Result<()> {
        let date = NaiveDate::from_ymd_opt(2024, 11, 2).ok_or(anyhow!("invalid date"))?;
        let record = JournalRecord::from(&Entry::Distributed(
            date,
            EntryKey::new(Category::Other("Baby Supplies".into()), "Diapers", None),
            Quantity::new(12f64),
        ));

        let mut buf = Vec::new();
        let mut writer = csv::Writer::from_writer(&mut buf);
        writer.serialize(&record)?;
        writer.flush()?;
        drop(writer);
        let written = String::from_utf8(buf)?;
        assert_eq!(
            written,
            "Kind,Date,Category,Product,Count Method,Quantity\n\
             Distributed,2024-11-02,Baby Supplies,Diapers,,12.0\n"
        );
        Ok(())
    }
}
