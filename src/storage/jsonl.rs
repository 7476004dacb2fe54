// src/storage/jsonl.rs - Line-delimited key/value stores
//
// Every line is a single JSON object holding one pair: {"<key>": <value>}.
// Loading never fails: a missing file is created empty and malformed lines
// are skipped. Saving rewrites the whole file through a temp file.

use anyhow::{Context, Result};
use log::{error, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::string::FromUtf8Error;
use tempfile::NamedTempFile;

/// Insertion-ordered key/value table held in memory for the length of a run.
/// Iteration order is first-insertion order; re-inserting a key keeps its slot.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedTable<V> {
    keys: Vec<String>,
    values: HashMap<String, V>,
}

impl<V> Default for OrderedTable<V> {
    fn default() -> Self {
        Self {
            keys: Vec::new(),
            values: HashMap::new(),
        }
    }
}

impl<V> OrderedTable<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.values.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        self.values.get_mut(key)
    }

    /// Inserts or replaces `key`, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        let key = key.into();
        if !self.values.contains_key(&key) {
            self.keys.push(key.clone());
        }
        self.values.insert(key, value)
    }

    pub fn get_or_insert_with(&mut self, key: &str, default: impl FnOnce() -> V) -> &mut V {
        if !self.values.contains_key(key) {
            self.keys.push(key.to_string());
        }
        self.values.entry(key.to_string()).or_insert_with(default)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.keys.iter().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.keys.iter().filter_map(move |k| self.values.get(k))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> + '_ {
        self.keys
            .iter()
            .filter_map(move |k| self.values.get(k).map(|v| (k.as_str(), v)))
    }
}

impl<V> FromIterator<(String, V)> for OrderedTable<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        let mut table = OrderedTable::new();
        for (key, value) in iter {
            table.insert(key, value);
        }
        table
    }
}

/// A single line-delimited key/value file.
#[derive(Debug, Clone)]
pub struct JsonlStore<V> {
    path: PathBuf,
    _value: PhantomData<V>,
}

impl<V> JsonlStore<V>
where
    V: Serialize + DeserializeOwned,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _value: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the whole file. Never fails: problems are logged and whatever
    /// could be read is returned. A duplicate key keeps its first position
    /// and its last value.
    pub fn load(&self) -> OrderedTable<V> {
        let mut table = OrderedTable::new();

        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.create_empty();
                return table;
            }
            Err(e) => {
                error!("Failed to read {}: {}", self.path.display(), e);
                return table;
            }
        };

        let mut skipped = 0usize;
        for (line_no, line) in raw_lines(BufReader::new(file)).enumerate() {
            let line = match line {
                Ok(Ok(line)) => line,
                Ok(Err(e)) => {
                    skipped += 1;
                    warn!(
                        "Skipping undecodable line {} in {}: {}",
                        line_no + 1,
                        self.path.display(),
                        e
                    );
                    continue;
                }
                Err(e) => {
                    error!(
                        "Failed to read {} at line {}: {}",
                        self.path.display(),
                        line_no + 1,
                        e
                    );
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match parse_pair::<V>(&line) {
                Ok((key, value)) => {
                    table.insert(key, value);
                }
                Err(e) => {
                    skipped += 1;
                    warn!(
                        "Skipping invalid line {} in {}: {}",
                        line_no + 1,
                        self.path.display(),
                        e
                    );
                }
            }
        }

        if table.is_empty() {
            warn!("{} is empty!", self.path.display());
        } else {
            info!(
                "Loaded {} entries from {} ({} lines skipped)",
                table.len(),
                self.path.display(),
                skipped
            );
        }
        table
    }

    /// Rewrites the file with every entry of `table`, in table order.
    pub fn save(&self, table: &OrderedTable<V>) -> Result<()> {
        info!("Saving {} entries to {}", table.len(), self.path.display());
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;

        let temp_file = NamedTempFile::new_in(parent)
            .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;
        {
            let mut writer = BufWriter::new(temp_file.as_file());
            for (key, value) in table.iter() {
                let mut line = serde_json::Map::with_capacity(1);
                line.insert(
                    key.to_string(),
                    serde_json::to_value(value)
                        .with_context(|| format!("Failed to serialize value for '{}'", key))?,
                );
                serde_json::to_writer(&mut writer, &line)
                    .with_context(|| format!("Failed to write entry '{}'", key))?;
                writer.write_all(b"\n")?;
            }
            writer.flush().context("Failed to flush store writer")?;
        }
        temp_file
            .persist(&self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }

    fn create_empty(&self) {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = fs::create_dir_all(parent) {
                    error!("Error while making directory {}: {}", parent.display(), e);
                    return;
                }
            }
        }
        match File::create(&self.path) {
            Ok(_) => info!("{} created!", self.path.display()),
            Err(e) => error!("Error while making this file {}: {}", self.path.display(), e),
        }
    }
}

/// Lines of `reader` split on `\n` (a trailing `\r` is dropped). The outer
/// error is an I/O failure; the inner one is a line that is not UTF-8, which
/// callers skip without stopping the read.
pub fn raw_lines<R: BufRead>(
    reader: R,
) -> impl Iterator<Item = io::Result<std::result::Result<String, FromUtf8Error>>> {
    reader.split(b'\n').map(|bytes| {
        bytes.map(|mut bytes| {
            if bytes.last() == Some(&b'\r') {
                bytes.pop();
            }
            String::from_utf8(bytes)
        })
    })
}

fn parse_pair<V: DeserializeOwned>(line: &str) -> Result<(String, V)> {
    let object: serde_json::Map<String, Value> =
        serde_json::from_str(line).context("not a JSON object")?;
    if object.len() > 1 {
        anyhow::bail!("expected one key, found {}", object.len());
    }
    let (key, value) = object
        .into_iter()
        .next()
        .context("object has no key")?;
    let value = serde_json::from_value(value)
        .with_context(|| format!("unexpected value type for key '{}'", key))?;
    Ok((key, value))
}
