//! Term repository implementations

use std::collections::HashMap;

use crate::data::{StoreError, TermId, TermRecord};

mod file;
mod memory;

pub use file::JsonFileTermRepository;
pub use memory::InMemoryTermRepository;

/// Insertion-ordered record set shared by the repository implementations.
///
/// Enforces the repository invariants: non-empty term and definition, and a
/// single embedding dimension across all records.
#[derive(Debug, Clone, Default)]
pub(crate) struct Corpus {
    records: Vec<TermRecord>,
    positions: HashMap<TermId, usize>,
}

impl Corpus {
    pub(crate) fn from_records(records: Vec<TermRecord>) -> Result<Self, StoreError> {
        let mut positions = HashMap::with_capacity(records.len());
        let mut dimension: Option<usize> = None;

        for (position, record) in records.iter().enumerate() {
            validate_fields(record)?;
            if let Some(actual) = record.dimension() {
                match dimension {
                    Some(expected) if expected != actual => {
                        return Err(StoreError::DimensionMismatch {
                            term: record.term.clone(),
                            expected,
                            actual,
                        });
                    }
                    _ => dimension = Some(actual),
                }
            }
            if positions.insert(record.id, position).is_some() {
                return Err(StoreError::InvalidRecord(format!("duplicate id {}", record.id)));
            }
        }

        Ok(Self { records, positions })
    }

    pub(crate) fn records(&self) -> &[TermRecord] {
        &self.records
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn get_by_ids(&self, ids: &[TermId]) -> Vec<Option<TermRecord>> {
        ids.iter()
            .map(|id| self.positions.get(id).map(|&p| self.records[p].clone()))
            .collect()
    }

    /// Dimension of the stored embeddings, ignoring the record with `except`.
    fn dimension_except(&self, except: TermId) -> Option<usize> {
        self.records
            .iter()
            .filter(|r| r.id != except)
            .find_map(|r| r.dimension())
    }

    pub(crate) fn upsert(&mut self, record: TermRecord) -> Result<(), StoreError> {
        validate_fields(&record)?;
        if let (Some(expected), Some(actual)) = (self.dimension_except(record.id), record.dimension()) {
            if expected != actual {
                return Err(StoreError::DimensionMismatch {
                    term: record.term,
                    expected,
                    actual,
                });
            }
        }

        match self.positions.get(&record.id) {
            Some(&position) => self.records[position] = record,
            None => {
                self.positions.insert(record.id, self.records.len());
                self.records.push(record);
            }
        }
        Ok(())
    }
}

fn validate_fields(record: &TermRecord) -> Result<(), StoreError> {
    if record.term.trim().is_empty() {
        return Err(StoreError::InvalidRecord(format!("record {} has an empty term", record.id)));
    }
    if record.definition.trim().is_empty() {
        return Err(StoreError::InvalidRecord(format!(
            "term '{}' has an empty definition",
            record.term
        )));
    }
    Ok(())
}
