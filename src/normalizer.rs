//! Normalizer - Cleans a raw shopping table into a NormalizedDataset
//!
//! Steps run in a fixed order because later ones rely on earlier invariants:
//! 1. Header canonicalization (trim, spaces to underscores, lower-case)
//! 2. Drop rows with a missing value in any column
//! 3. Trim and lower-case the categorical columns that are present
//! 4. Numeric coercion of purchase amount and review rating
//! 5. Range filtering: `0 < age < 100`, `purchase_amount > 0`
//! 6. Age bucketing

use crate::dataset::{columns, AgeGroup, NormalizedDataset, NormalizedRecord};
use crate::error::{KpiError, Result};
use crate::ingestion::{is_missing, RawTable};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// Row accounting for one normalization run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizationSummary {
    pub input_rows: usize,
    pub dropped_missing: usize,
    pub dropped_age: usize,
    pub dropped_amount: usize,
    pub kept_rows: usize,
}

/// Column positions resolved once from the canonical headers.
struct ColumnIndex {
    age: usize,
    item_purchased: usize,
    purchase_amount: usize,
    review_rating: usize,
    categorical: HashMap<&'static str, usize>,
}

impl ColumnIndex {
    fn resolve(headers: &[String]) -> Result<Self> {
        let mut positions: HashMap<&str, usize> = HashMap::new();
        for (idx, header) in headers.iter().enumerate() {
            if positions.insert(header.as_str(), idx).is_some() {
                return Err(KpiError::DataFormat(format!(
                    "duplicate column after canonicalization: {}",
                    header
                )));
            }
        }

        let purchase_amount = positions
            .get(columns::PURCHASE_AMOUNT_USD)
            .or_else(|| positions.get(columns::PURCHASE_AMOUNT))
            .copied();

        let mut missing = Vec::new();
        let mut required = |name: &'static str, found: Option<usize>| {
            if found.is_none() {
                missing.push(name);
            }
            found.unwrap_or_default()
        };
        let age = required(columns::AGE, positions.get(columns::AGE).copied());
        let item_purchased = required(
            columns::ITEM_PURCHASED,
            positions.get(columns::ITEM_PURCHASED).copied(),
        );
        let purchase_amount = required(columns::PURCHASE_AMOUNT, purchase_amount);
        let review_rating = required(
            columns::REVIEW_RATING,
            positions.get(columns::REVIEW_RATING).copied(),
        );

        if !missing.is_empty() {
            return Err(KpiError::DataFormat(format!(
                "missing required columns: {}",
                missing.join(", ")
            )));
        }

        let categorical = columns::CATEGORICAL
            .into_iter()
            .filter_map(|c| positions.get(c).map(|&idx| (c, idx)))
            .collect();

        Ok(Self {
            age,
            item_purchased,
            purchase_amount,
            review_rating,
            categorical,
        })
    }
}

pub struct Normalizer;

impl Normalizer {
    /// Trim, replace spaces with underscores, lower-case.
    pub fn canonical_column_name(header: &str) -> String {
        header.trim().replace(' ', "_").to_lowercase()
    }

    pub fn standardize_text(value: &str) -> String {
        value.trim().to_lowercase()
    }

    /// Numeric coercion that never fails: anything unparseable, NaN or
    /// infinite is missing.
    pub fn coerce_numeric(value: &str) -> Option<f64> {
        value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    }

    /// Ages must be whole numbers; `"35.0"` is accepted as 35.
    pub fn coerce_age(value: &str) -> Option<i64> {
        let trimmed = value.trim();
        trimmed.parse::<i64>().ok().or_else(|| {
            trimmed
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && v.fract() == 0.0)
                .map(|v| v as i64)
        })
    }

    pub fn normalize(raw: &RawTable) -> Result<NormalizedDataset> {
        Self::normalize_with_summary(raw).map(|(dataset, _)| dataset)
    }

    pub fn normalize_with_summary(raw: &RawTable) -> Result<(NormalizedDataset, NormalizationSummary)> {
        let headers: Vec<String> = raw
            .headers
            .iter()
            .map(|h| Self::canonical_column_name(h))
            .collect();
        let index = ColumnIndex::resolve(&headers)?;

        let mut summary = NormalizationSummary {
            input_rows: raw.rows.len(),
            ..Default::default()
        };
        let mut records = Vec::new();

        for row in &raw.rows {
            let complete: Option<Vec<&str>> = (0..headers.len())
                .map(|idx| {
                    row.get(idx)
                        .and_then(|c| c.as_deref())
                        .filter(|c| !is_missing(c))
                })
                .collect();
            let Some(cells) = complete else {
                summary.dropped_missing += 1;
                continue;
            };

            let text = |column: &str| {
                index
                    .categorical
                    .get(column)
                    .map(|&idx| Self::standardize_text(cells[idx]))
            };

            let purchase_amount = Self::coerce_numeric(cells[index.purchase_amount]);
            let review_rating = Self::coerce_numeric(cells[index.review_rating]);

            let Some((age, age_group)) = Self::coerce_age(cells[index.age])
                .filter(|&a| a > 0 && a < 100)
                .and_then(|a| AgeGroup::from_age(a).map(|g| (a, g)))
            else {
                summary.dropped_age += 1;
                continue;
            };

            let Some(purchase_amount) = purchase_amount.filter(|&a| a > 0.0) else {
                summary.dropped_amount += 1;
                continue;
            };

            records.push(NormalizedRecord {
                age: age as u8,
                age_group,
                item_purchased: cells[index.item_purchased].to_string(),
                purchase_amount,
                review_rating,
                gender: text(columns::GENDER),
                category: text(columns::CATEGORY),
                location: text(columns::LOCATION),
                season: text(columns::SEASON),
                payment_method: text(columns::PAYMENT_METHOD),
                shipping_type: text(columns::SHIPPING_TYPE),
                discount_applied: text(columns::DISCOUNT_APPLIED),
                promo_code_used: text(columns::PROMO_CODE_USED),
                frequency_of_purchases: text(columns::FREQUENCY_OF_PURCHASES),
                subscription_status: text(columns::SUBSCRIPTION_STATUS),
            });
        }

        summary.kept_rows = records.len();
        debug!(
            "Dropped rows: {} missing, {} age out of range, {} non-positive amount",
            summary.dropped_missing, summary.dropped_age, summary.dropped_amount
        );
        info!(
            "Normalized {} of {} rows ({} categorical columns present)",
            summary.kept_rows,
            summary.input_rows,
            index.categorical.len()
        );

        Ok((NormalizedDataset::from_records(records), summary))
    }
}

/// Normalize a raw table; see [`Normalizer`].
pub fn normalize(raw: &RawTable) -> Result<NormalizedDataset> {
    Normalizer::normalize(raw)
}
