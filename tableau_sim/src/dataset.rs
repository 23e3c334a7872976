//! Record sources for simulation runs.
//!
//! The generator plays the part of the spreadsheet: it produces six-cell rows
//! the same way a sheet export would, including the dirty cases the stage has
//! to cope with (insecure or missing image URLs, unparseable net worth).

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use std::path::Path;
use tableau_core::{IngestError, RecordStore};
use thiserror::Error;

const FIRST_NAMES: &[&str] = &[
    "Ada", "Bram", "Chiara", "Dmitri", "Esme", "Farid", "Greta", "Hiro", "Ines", "Jonas", "Kemi",
    "Luca", "Maya", "Nils", "Oona", "Pavel", "Quinn", "Rosa", "Sami", "Tariq",
];

const LAST_NAMES: &[&str] = &[
    "Okafor", "Lindqvist", "Moreau", "Tanaka", "Alvarez", "Novak", "Haddad", "Kowalski", "Reyes",
    "Brandt", "Osei", "Marchetti",
];

const COUNTRIES: &[&str] = &[
    "Norway", "Japan", "Brazil", "Kenya", "Canada", "Italy", "India", "Chile", "Poland", "Vietnam",
];

const INTERESTS: &[&str] = &[
    "Sailing", "Chess", "Pottery", "Climbing", "Jazz", "Astronomy", "Cycling", "Baking", "Go",
    "Birdwatching",
];

/// Median synthetic net worth; the log-normal spread puts roughly a third of
/// the cards in each tier.
const NET_WORTH_MEDIAN: f64 = 140_000.0;
const NET_WORTH_SIGMA: f64 = 0.8;

/// Dataset loading failures.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Failed to read sheet file: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Ingest(#[from] IngestError),
}

/// Deterministic sheet-row generator.
pub struct DatasetGenerator {
    rng: ChaCha8Rng,
}

impl DatasetGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// One six-cell row: name, image URL, age, country, interest, net worth.
    pub fn row(&mut self, index: usize) -> Vec<String> {
        let name = format!("{} {}", self.pick(FIRST_NAMES), self.pick(LAST_NAMES));

        // Mostly secure URLs; the rest exercise the fallback path
        let image_url = match self.rng.gen_range(0..10) {
            0 => format!("http://images.example.org/{}.jpg", index),
            1 => String::new(),
            _ => format!("https://images.example.org/{}.jpg", index),
        };

        let age = self.rng.gen_range(18..=90).to_string();
        let country = self.pick(COUNTRIES).to_string();
        let interest = self.pick(INTERESTS).to_string();

        let net_worth = if self.rng.gen_bool(0.05) {
            "N/A".to_string()
        } else {
            let z: f64 = self.rng.sample(StandardNormal);
            format_currency(NET_WORTH_MEDIAN * (NET_WORTH_SIGMA * z).exp())
        };

        vec![name, image_url, age, country, interest, net_worth]
    }

    pub fn rows(&mut self, count: usize) -> Vec<Vec<String>> {
        (0..count).map(|i| self.row(i)).collect()
    }

    fn pick(&mut self, options: &[&'static str]) -> &'static str {
        options[self.rng.gen_range(0..options.len())]
    }
}

/// Dataset seed for a run seed, kept apart from the stage's RNG stream so
/// the records do not change when the stage draws differently.
pub fn data_seed(seed: u64) -> u64 {
    seed.wrapping_mul(0x9e3779b97f4a7c15)
}

/// `count` synthetic rows for `seed`.
pub fn synthetic_rows(seed: u64, count: usize) -> Vec<Vec<String>> {
    DatasetGenerator::new(seed).rows(count)
}

/// Synthetic rows ingested into a record store.
pub fn synthetic_store(seed: u64, count: usize) -> Result<RecordStore, IngestError> {
    RecordStore::from_rows(&synthetic_rows(seed, count))
}

/// Wraps rows in the sheet response shape `{"values": [...]}`.
pub fn to_sheet_json(rows: &[Vec<String>]) -> Result<String, serde_json::Error> {
    serde_json::to_string(&serde_json::json!({ "values": rows }))
}

/// Loads a sheet response saved to disk.
pub fn load_sheet<P: AsRef<Path>>(path: P) -> Result<RecordStore, DatasetError> {
    let content = std::fs::read_to_string(path)?;
    Ok(RecordStore::from_sheet_json(&content)?)
}

/// `1234567.8` → `"$1,234,568"`.
fn format_currency(amount: f64) -> String {
    let digits = (amount.max(0.0).round() as u64).to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("${}", grouped)
}
