use chrono::{DateTime, Local};

use super::format::PlateFormat;

/// Where an accepted plate came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlateOrigin {
    Ocr,
    Manual,
}

/// A plate that passed format validation.
#[derive(Clone, Debug)]
pub struct PlateRecord {
    pub text: String,
    pub format: PlateFormat,
    pub origin: PlateOrigin,
    pub accepted_at: DateTime<Local>,
}

/// Ordered, append-only list of accepted plates.
///
/// No removal and no uniqueness constraint: the same plate may appear any
/// number of times.
#[derive(Debug, Default)]
pub struct PlateList {
    records: Vec<PlateRecord>,
}

impl PlateList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `text` if it matches a plate format.
    ///
    /// Returns the format it was accepted under, or `None` (list unchanged)
    /// when the text is not a valid plate.
    pub fn push(&mut self, text: &str, origin: PlateOrigin) -> Option<PlateFormat> {
        let format = PlateFormat::classify(text)?;
        self.records.push(PlateRecord {
            text: text.to_string(),
            format,
            origin,
            accepted_at: Local::now(),
        });
        Some(format)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[PlateRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&PlateRecord> {
        self.records.last()
    }

    /// Plate strings in insertion order.
    #[cfg(test)]
    pub fn texts(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.text.as_str()).collect()
    }
}
