//! Non-destructive merge of the desired entry set into the registry
//!
//! `merge` only ever inserts names that are absent. A name that is already
//! registered keeps its value, whoever put it there. The result differs from
//! the input solely by those insertions, so merging twice changes nothing.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::error::Result;
use crate::store::Document;

/// What merge will do with one desired name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Absent from the registry; will be inserted
    Insert,
    /// Present and owned by a previous run; left as is, stays owned
    Retain,
    /// Present and not ours; left as is, recorded as preexisting
    Foreign,
}

impl Disposition {
    pub fn label(self) -> &'static str {
        match self {
            Disposition::Insert => "insert",
            Disposition::Retain => "keep (installed earlier)",
            Disposition::Foreign => "keep (already registered)",
        }
    }
}

/// Classify a desired name against the registry and the owned set
pub fn classify(existing: &Document, name: &str, owned: &BTreeSet<String>) -> Disposition {
    if !existing.contains(name) {
        Disposition::Insert
    } else if owned.contains(name) {
        Disposition::Retain
    } else {
        Disposition::Foreign
    }
}

/// Dispositions for every desired name, in catalog order
pub fn plan<'a>(
    existing: &Document,
    names: impl IntoIterator<Item = &'a str>,
    owned: &BTreeSet<String>,
) -> Vec<(String, Disposition)> {
    names
        .into_iter()
        .map(|name| (name.to_string(), classify(existing, name, owned)))
        .collect()
}

#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub document: Document,
    /// Names inserted by this merge
    pub inserted: BTreeSet<String>,
    /// Names already present and owned by a previous run
    pub retained: BTreeSet<String>,
    /// Names already present and registered by someone else
    pub preexisting: BTreeSet<String>,
}

/// Fold the desired entries into a copy of `existing`
///
/// `owned` is the tool-installed set from the previous manifest, if any.
pub fn merge(
    existing: &Document,
    desired: impl IntoIterator<Item = (String, Value)>,
    owned: &BTreeSet<String>,
) -> Result<MergeOutcome> {
    let mut document = existing.clone();
    let mut inserted = BTreeSet::new();
    let mut retained = BTreeSet::new();
    let mut preexisting = BTreeSet::new();

    for (name, value) in desired {
        if inserted.contains(&name) {
            continue;
        }
        match classify(existing, &name, owned) {
            Disposition::Insert => {
                document.insert_new(&name, value)?;
                tracing::debug!(entry = %name, "inserted registry entry");
                inserted.insert(name);
            }
            Disposition::Retain => {
                retained.insert(name);
            }
            Disposition::Foreign => {
                tracing::debug!(entry = %name, "entry already registered, leaving it alone");
                preexisting.insert(name);
            }
        }
    }

    Ok(MergeOutcome {
        document,
        inserted,
        retained,
        preexisting,
    })
}

#[derive(Debug, Clone)]
pub struct RemovalOutcome {
    pub document: Document,
    /// Names that were registered and have been removed
    pub removed: BTreeSet<String>,
    /// Names asked for that were not registered
    pub absent: BTreeSet<String>,
}

/// Remove exactly the given names that are registered
pub fn remove(existing: &Document, names: &BTreeSet<String>) -> RemovalOutcome {
    let mut document = existing.clone();
    let mut removed = BTreeSet::new();
    let mut absent = BTreeSet::new();

    for name in names {
        if document.remove(name).is_some() {
            removed.insert(name.clone());
        } else {
            absent.insert(name.clone());
        }
    }

    RemovalOutcome {
        document,
        removed,
        absent,
    }
}
