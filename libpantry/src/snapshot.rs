use crate::catalog::Category;
use crate::table::{self, Record};
use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct ProductLine {
    #[serde(rename = "Product")]
    product: String,
}

impl Record for ProductLine {
    const HEADERS: &'static [&'static str] = &["Product"];
}

/// A single-column product list that is replaced whole, like the walk-in
/// menu or the products pulled off the shelf for today.
#[derive(Clone, Debug)]
pub struct Snapshot {
    path: PathBuf,
}

impl Snapshot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Snapshot { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Vec<String>> {
        let lines: Vec<ProductLine> = table::read_table(&self.path)?;
        Ok(lines.into_iter().map(|line| line.product).collect())
    }

    pub fn regenerate<I, S>(&self, products: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lines: Vec<ProductLine> = products
            .into_iter()
            .map(|product| ProductLine {
                product: product.into(),
            })
            .collect();
        table::write_table(&self.path, &lines)
    }

    /// Local date the snapshot was last written, `None` when it does not
    /// exist yet.
    pub fn written_on(&self) -> Result<Option<NaiveDate>> {
        let modified = match fs::metadata(&self.path) {
            Ok(meta) => meta
                .modified()
                .with_context(|| format!("no mtime for {}", self.path.display()))?,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("unable to stat {}", self.path.display()))
            }
        };
        Ok(Some(DateTime::<Local>::from(modified).date_naive()))
    }

    pub fn is_stale(&self, today: NaiveDate) -> Result<bool> {
        Ok(self.written_on()?.map_or(true, |date| date < today))
    }
}

/// Every predefined product across categories, sorted and without
/// duplicates, minus the ones pulled for the day.
pub fn walk_in_menu(removed: &[String]) -> Vec<String> {
    let removed: BTreeSet<&str> = removed.iter().map(|p| p.trim()).collect();
    Category::PREDEFINED
        .iter()
        .flat_map(|category| category.default_products().iter().copied())
        .filter(|product| !removed.contains(product))
        .collect::<BTreeSet<&str>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}
