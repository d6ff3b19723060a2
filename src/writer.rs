use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::Result;

/// Default number of buffered rows across all labels before the writer
/// rotates to fresh files.
pub const DEFAULT_FLUSH_THRESHOLD: usize = 50_000;

/// Buffers rows per label and serializes each label to its own
/// semicolon-delimited file, named `<label>.<unix-timestamp>.csv`.
///
/// Columns are not known up front; each table accumulates the union of all
/// property keys it has seen and derives the header at flush time. Rows are
/// keyed so that repeated adds of the same entity merge instead of
/// duplicating (a non-"None" `url` wins over "None", everything else is
/// last-writer-wins).
pub struct RelationWriter {
    dir: PathBuf,
    flush_threshold: usize,
    entries_cnt: usize,
    tables: HashMap<String, Table>,
}

#[derive(Default)]
struct Table {
    /// Column names in first-seen order.
    columns: Vec<String>,
    /// Row keys in first-insertion order, for deterministic output.
    order: Vec<String>,
    rows: HashMap<String, HashMap<String, String>>,
}

impl Table {
    fn add(&mut self, key: &str, props: Vec<(String, String)>) {
        if !self.rows.contains_key(key) {
            self.order.push(key.to_string());
        }
        let row = self.rows.entry(key.to_string()).or_default();
        for (name, value) in props {
            if !self.columns.contains(&name) {
                self.columns.push(name.clone());
            }
            // A later event may know the url an earlier one did not; never
            // let a placeholder clobber a real value.
            if name == "url" && value == "None" {
                if let Some(existing) = row.get(&name) {
                    if existing != "None" {
                        continue;
                    }
                }
            }
            row.insert(name, value);
        }
    }

    fn write(&self, path: &Path) -> Result<()> {
        let mut out = csv::WriterBuilder::new().delimiter(b';').from_path(path)?;
        out.write_record(&self.columns)?;
        for key in &self.order {
            let row = &self.rows[key];
            let record: Vec<&str> = self
                .columns
                .iter()
                .map(|col| row.get(col).map(String::as_str).unwrap_or(""))
                .collect();
            out.write_record(&record)?;
        }
        out.flush()?;
        Ok(())
    }
}

impl RelationWriter {
    pub fn new(dir: impl Into<PathBuf>, flush_threshold: usize) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            flush_threshold,
            entries_cnt: 0,
            tables: HashMap::new(),
        })
    }

    /// Buffer one row under `label`, merging with any existing row of the
    /// same key. Rotates all files once the configured threshold is hit.
    pub fn add(&mut self, label: &str, key: &str, props: Vec<(String, String)>) -> Result<()> {
        self.tables
            .entry(label.to_string())
            .or_default()
            .add(key, props);

        if self.entries_cnt > self.flush_threshold {
            self.entries_cnt = 0;
            self.flush_all()?;
        } else {
            self.entries_cnt += 1;
        }
        Ok(())
    }

    /// Serialize every buffered table to disk and start fresh. Used both for
    /// rotation and for the final flush at shutdown.
    pub fn flush_all(&mut self) -> Result<()> {
        for (label, table) in &self.tables {
            if table.order.is_empty() {
                continue;
            }
            let path = self.next_path(label);
            tracing::debug!(%label, rows = table.order.len(), "flushing relation");
            table.write(&path)?;
        }
        self.tables.clear();
        Ok(())
    }

    /// `<label>.<unix-timestamp>.csv`; a rotation generation must never
    /// overwrite an earlier one, so nudge the timestamp on collision.
    fn next_path(&self, label: &str) -> PathBuf {
        let mut ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64();
        loop {
            let path = self.dir.join(format!("{label}.{ts:.6}.csv"));
            if !path.exists() {
                return path;
            }
            ts += 0.000_001;
        }
    }
}
