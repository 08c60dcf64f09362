//! Pantry - Distribution ledger and intake logs for a campus food pantry
//! ---
//!
//! Staff log what they hand out during the day and how much is left at closing.
//! Each `(date, category, product, count method)` gets one row in the ledger,
//! where the running total handed out is reconciled against the end-of-day count.
//! Next to the ledger sit the donation, spoilage and menstrual-product logs, an
//! anonymous survey, and the walk-in menu.
//!
//! Quantities are typed freely: `3`, `2.5` and `3/4` are all fine.
//!

extern crate pest;
#[macro_use]
extern crate pest_derive;

/// Write capability and the gates that hand it out.
pub mod access;

/// Product categories, predefined product lists and custom products.
///
/// Products typed in through [`CUSTOM_PRODUCT_OPTION`][catalog::CUSTOM_PRODUCT_OPTION]
/// are remembered per category by the
/// [`CustomProductRegistry`][catalog::CustomProductRegistry] so the end-of-day
/// form can offer them.
pub mod catalog;

pub mod config;
mod entry;
pub mod error;

/// Ledger representation.
///
/// The main structure is [`Ledger`][ledger::Ledger], an index of
/// [`DayBook`][ledger::DayBook]s by date, each holding one
/// [`Tally`][ledger::Tally] per product key.
pub mod ledger;

pub mod logs;

/// Our main parser entrypoints, for quantities and configuration files.
pub mod parser;

pub mod quantity;
pub mod service;
pub mod snapshot;
pub mod store;
pub mod table;

pub use entry::{Entry, EntryKind};
pub use error::PantryError;
pub use parser::parse_quantity;
pub use quantity::Quantity;
pub use service::{Pantry, Recorded};
