//! Flat CSV tables with a header row, one record type per file.

use anyhow::{Context, Result};
use log::info;
use serde::de::DeserializeOwned;
use serde::Serialize;

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// A row type stored in a CSV table. `HEADERS` must list the columns in the
/// same order as the struct's fields.
pub trait Record: Serialize + DeserializeOwned {
    const HEADERS: &'static [&'static str];
}

/// Read every row. A table that does not exist yet is empty.
pub fn read_table<R: Record>(path: &Path) -> Result<Vec<R>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(err).with_context(|| format!("unable to open {}", path.display()))
        }
    };

    let mut reader = csv::Reader::from_reader(file);
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row.with_context(|| format!("malformed row in {}", path.display()))?);
    }
    Ok(rows)
}

/// Replace the whole table. The header row is always written, so an empty
/// table still carries its columns. The new content goes to a sibling
/// `.tmp` file first and is renamed over the old one.
pub fn write_table<'r, R, I>(path: &Path, rows: I) -> Result<()>
where
    R: Record + 'r,
    I: IntoIterator<Item = &'r R>,
{
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("unable to create {}", dir.display()))?;
    }

    let tmp = sibling(path, ".tmp");
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(&tmp)
        .with_context(|| format!("unable to create {}", tmp.display()))?;
    writer.write_record(R::HEADERS)?;
    let mut count = 0usize;
    for row in rows {
        writer.serialize(row)?;
        count += 1;
    }
    writer.flush()?;
    drop(writer);

    fs::rename(&tmp, path)
        .with_context(|| format!("unable to replace {}", path.display()))?;
    info!("wrote {} rows to {}", count, path.display());
    Ok(())
}

/// `path` with `suffix` appended to its file name.
pub(crate) fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// A table that only ever grows, rewritten whole on every append.
#[derive(Debug, Clone)]
pub struct Table<R> {
    path: PathBuf,
    _record: PhantomData<R>,
}

impl<R: Record> Table<R> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _record: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn headers(&self) -> &'static [&'static str] {
        R::HEADERS
    }

    pub fn load(&self) -> Result<Vec<R>> {
        read_table(&self.path)
    }

    /// Append one row; returns the number of rows now in the table.
    pub fn append(&self, row: R) -> Result<usize> {
        let mut rows = self.load()?;
        rows.push(row);
        write_table(&self.path, &rows)?;
        Ok(rows.len())
    }
}
