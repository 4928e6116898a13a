use crate::error::{RecError, Result};
use crate::models::PosOnlyFeedback;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{info, warn};

pub mod predictions;

pub use predictions::PredictionWriter;

/// Maps external string ids to dense internal ids, in first-seen order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdMapping {
    to_internal: HashMap<String, usize>,
    to_original: Vec<String>,
}

impl IdMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Internal id of `original`, assigning the next free one if unseen.
    pub fn to_internal_id(&mut self, original: &str) -> usize {
        if let Some(&id) = self.to_internal.get(original) {
            return id;
        }
        let id = self.to_original.len();
        self.to_original.push(original.to_string());
        self.to_internal.insert(original.to_string(), id);
        id
    }

    /// Internal id of `original` without assigning one.
    pub fn get_internal_id(&self, original: &str) -> Option<usize> {
        self.to_internal.get(original).copied()
    }

    pub fn to_original_id(&self, internal: usize) -> Option<&str> {
        self.to_original.get(internal).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.to_original.len()
    }

    pub fn is_empty(&self) -> bool {
        self.to_original.is_empty()
    }
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || c == ','
}

/// Reads positive-only feedback, one `user item` pair per line.
///
/// Fields may be separated by spaces, tabs or commas; further columns such as
/// ratings or timestamps are ignored. Blank lines and lines starting with `#`
/// are skipped.
pub fn read_feedback<R: BufRead>(
    reader: R,
    user_mapping: &mut IdMapping,
    item_mapping: &mut IdMapping,
) -> Result<PosOnlyFeedback> {
    let mut feedback = PosOnlyFeedback::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut fields = line.split(is_separator).filter(|field| !field.is_empty());
        match (fields.next(), fields.next()) {
            (Some(user), Some(item)) => {
                let user_id = user_mapping.to_internal_id(user);
                let item_id = item_mapping.to_internal_id(item);
                feedback.add(user_id, item_id);
            }
            _ => {
                return Err(RecError::Parse {
                    line: index + 1,
                    message: format!("expected at least 2 fields, got '{}'", line),
                })
            }
        }
    }

    Ok(feedback)
}

/// Opens `path` and reads it with [`read_feedback`].
pub fn read_feedback_file<P: AsRef<Path>>(
    path: P,
    user_mapping: &mut IdMapping,
    item_mapping: &mut IdMapping,
) -> Result<PosOnlyFeedback> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let feedback = read_feedback(BufReader::new(file), user_mapping, item_mapping)?;
    info!(
        path = %path.display(),
        pairs = feedback.len(),
        users = user_mapping.len(),
        items = item_mapping.len(),
        "Loaded feedback"
    );
    Ok(feedback)
}

/// Reads one external id per line and maps it through `mapping`.
///
/// Only the first field of a line is used. Ids the mapping has never seen
/// are skipped, as are blank lines and `#` comments. Duplicates are kept.
pub fn read_id_list<R: BufRead>(reader: R, mapping: &IdMapping) -> Result<Vec<usize>> {
    let mut ids = Vec::new();
    let mut unknown = 0;

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let original = line.split(is_separator).next().unwrap_or(line);
        match mapping.get_internal_id(original) {
            Some(id) => ids.push(id),
            None => unknown += 1,
        }
    }

    if unknown > 0 {
        warn!(unknown, kept = ids.len(), "Skipped ids missing from the data");
    }
    Ok(ids)
}

/// Opens `path` and reads it with [`read_id_list`].
pub fn read_id_list_file<P: AsRef<Path>>(path: P, mapping: &IdMapping) -> Result<Vec<usize>> {
    let file = File::open(path.as_ref())?;
    read_id_list(BufReader::new(file), mapping)
}
