//! Record Store - the immutable rows behind every card.
//!
//! Rows arrive in a fixed column order:
//!
//! ```text
//! [name, imageURL, age, country, interest, netWorth]
//! ```
//!
//! Records are ingested once per session and shared read-only (`Arc`)
//! between the store and the visual objects.

use crate::error::IngestError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Placeholder used when a row has no usable (https) image URL.
pub const FALLBACK_IMAGE_URL: &str = "https://via.placeholder.com/150?text=No+Image";

/// Number of cells in every ingested row.
pub const ROW_WIDTH: usize = 6;

/// Position of the image URL within a row.
const IMAGE_URL_COLUMN: usize = 1;

/// Net-worth thresholds (strictly greater than).
const HIGH_NET_WORTH: f64 = 200_000.0;
const MEDIUM_NET_WORTH: f64 = 100_000.0;

/// One entity per ingested row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub name: String,

    /// Always a secure-transport URL (fallback substituted at ingestion)
    pub image_url: String,

    /// Display text of the age cell (sheets may send a string or a number)
    pub age: String,

    pub country: String,

    pub interest: String,

    /// Raw currency-formatted text, e.g. `"$250,000"`
    pub net_worth: String,
}

impl Record {
    /// Builds a record from one six-cell row.
    ///
    /// Non-https image URLs are replaced by [`FALLBACK_IMAGE_URL`].
    pub fn from_row(row: usize, cells: &[String]) -> Result<Self, IngestError> {
        if cells.len() != ROW_WIDTH {
            return Err(IngestError::RowWidth {
                row,
                found: cells.len(),
            });
        }

        let image_url = if cells[IMAGE_URL_COLUMN].starts_with("https://") {
            cells[IMAGE_URL_COLUMN].clone()
        } else {
            tracing::warn!(row, url = %cells[IMAGE_URL_COLUMN], "Invalid image URL, using fallback");
            FALLBACK_IMAGE_URL.to_string()
        };

        Ok(Self {
            name: cells[0].clone(),
            image_url,
            age: cells[2].clone(),
            country: cells[3].clone(),
            interest: cells[4].clone(),
            net_worth: cells[5].clone(),
        })
    }

    /// Parsed net worth, `None` when the text holds no number.
    pub fn net_worth_value(&self) -> Option<f64> {
        parse_net_worth(&self.net_worth)
    }

    /// Net-worth bucket used by the card styling layer.
    pub fn tier(&self) -> NetWorthTier {
        NetWorthTier::classify(self.net_worth_value())
    }
}

/// Net-worth bucket of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetWorthTier {
    /// > 200,000
    High,
    /// > 100,000
    Medium,
    /// Everything else, including unparseable values
    Low,
}

impl NetWorthTier {
    /// Buckets a parsed net worth. `None` is never above a threshold.
    pub fn classify(value: Option<f64>) -> Self {
        match value {
            Some(v) if v > HIGH_NET_WORTH => NetWorthTier::High,
            Some(v) if v > MEDIUM_NET_WORTH => NetWorthTier::Medium,
            _ => NetWorthTier::Low,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            NetWorthTier::High => "high",
            NetWorthTier::Medium => "medium",
            NetWorthTier::Low => "low",
        }
    }
}

impl std::fmt::Display for NetWorthTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Parses a currency-formatted amount.
///
/// Every character other than `0-9`, `.` and `-` is dropped, then the
/// longest leading numeric prefix is parsed (`"1.2.3"` reads as `1.2`).
/// Returns `None` when no prefix is a number. Amounts too large for `f64`
/// read as infinity and land in the top tier.
pub fn parse_net_worth(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    (1..=cleaned.len())
        .rev()
        .find_map(|end| cleaned[..end].parse::<f64>().ok())
}

/// Shape of a Google-Sheets `values` response.
#[derive(Debug, Deserialize)]
struct SheetDocument {
    #[serde(default)]
    values: Option<Vec<Vec<Value>>>,
}

/// Ordered, immutable collection of ingested records.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: Vec<Arc<Record>>,
}

impl RecordStore {
    /// Builds a store from rows of string cells.
    ///
    /// An empty row list is accepted here; `Stage::new` refuses it.
    pub fn from_rows(rows: &[Vec<String>]) -> Result<Self, IngestError> {
        let records = rows
            .iter()
            .enumerate()
            .map(|(i, row)| Record::from_row(i, row).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { records })
    }

    /// Parses a sheet document of the form `{"values": [[...], ...]}`.
    ///
    /// A missing `values` key or an empty list is [`IngestError::NoData`].
    pub fn from_sheet_json(json: &str) -> Result<Self, IngestError> {
        let document: SheetDocument = serde_json::from_str(json)?;
        let values = match document.values {
            Some(values) if !values.is_empty() => values,
            _ => return Err(IngestError::NoData),
        };

        let mut rows = Vec::with_capacity(values.len());
        for (row, cells) in values.into_iter().enumerate() {
            let cells = cells
                .into_iter()
                .enumerate()
                .map(|(column, cell)| match cell {
                    Value::String(s) => Ok(s),
                    Value::Number(n) => Ok(n.to_string()),
                    // Missing image URL falls back like an empty cell
                    Value::Null if column == IMAGE_URL_COLUMN => Ok(String::new()),
                    _ => Err(IngestError::InvalidCell { row, column }),
                })
                .collect::<Result<Vec<_>, _>>()?;
            rows.push(cells);
        }

        Self::from_rows(&rows)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<Record>> {
        self.records.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Record>> {
        self.records.iter()
    }
}
