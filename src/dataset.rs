//! Normalized Dataset - The canonical, query-ready form of the shopping snapshot
//!
//! Records are only ever produced by [`crate::normalizer::Normalizer`], so every
//! record in a [`NormalizedDataset`] already satisfies the field constraints
//! (age in 1..=99, strictly positive purchase amount, lower-cased categories).

use crate::error::{KpiError, Result};
use crate::ingestion::RawTable;
use polars::prelude::{CsvWriter, DataFrame, NamedFrom, SerWriter, Series};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;

/// Canonical column names, as they appear after header canonicalization.
pub mod columns {
    pub const AGE: &str = "age";
    pub const ITEM_PURCHASED: &str = "item_purchased";
    pub const PURCHASE_AMOUNT: &str = "purchase_amount";
    pub const PURCHASE_AMOUNT_USD: &str = "purchase_amount_(usd)";
    pub const REVIEW_RATING: &str = "review_rating";
    pub const AGE_GROUP: &str = "age_group";

    pub const GENDER: &str = "gender";
    pub const CATEGORY: &str = "category";
    pub const LOCATION: &str = "location";
    pub const SEASON: &str = "season";
    pub const PAYMENT_METHOD: &str = "payment_method";
    pub const SHIPPING_TYPE: &str = "shipping_type";
    pub const DISCOUNT_APPLIED: &str = "discount_applied";
    pub const PROMO_CODE_USED: &str = "promo_code_used";
    pub const FREQUENCY_OF_PURCHASES: &str = "frequency_of_purchases";
    pub const SUBSCRIPTION_STATUS: &str = "subscription_status";

    /// Free-text enumerations that get trimmed and lower-cased.
    pub const CATEGORICAL: [&str; 10] = [
        GENDER,
        CATEGORY,
        LOCATION,
        SEASON,
        PAYMENT_METHOD,
        SHIPPING_TYPE,
        DISCOUNT_APPLIED,
        PROMO_CODE_USED,
        FREQUENCY_OF_PURCHASES,
        SUBSCRIPTION_STATUS,
    ];
}

/// Text written for a rating that failed numeric coercion. It is neither blank
/// nor a null sentinel, so it reads back as a kept row with a missing rating.
pub const UNRATED: &str = "unrated";

/// Half-open age bucket. Left edge inclusive, right edge exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AgeGroup {
    #[serde(rename = "0-18")]
    From0To18,
    #[serde(rename = "18-30")]
    From18To30,
    #[serde(rename = "30-40")]
    From30To40,
    #[serde(rename = "40-50")]
    From40To50,
    #[serde(rename = "50-60")]
    From50To60,
    #[serde(rename = "60-70")]
    From60To70,
    #[serde(rename = "70-80")]
    From70To80,
    #[serde(rename = "80-90")]
    From80To90,
    #[serde(rename = "90-100")]
    From90To100,
}

impl AgeGroup {
    pub const ALL: [AgeGroup; 9] = [
        AgeGroup::From0To18,
        AgeGroup::From18To30,
        AgeGroup::From30To40,
        AgeGroup::From40To50,
        AgeGroup::From50To60,
        AgeGroup::From60To70,
        AgeGroup::From70To80,
        AgeGroup::From80To90,
        AgeGroup::From90To100,
    ];

    /// Bucket an age; `None` outside `[0, 100)`.
    pub fn from_age(age: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|g| {
            let (lo, hi) = g.bounds();
            age >= lo && age < hi
        })
    }

    pub fn bounds(self) -> (i64, i64) {
        match self {
            AgeGroup::From0To18 => (0, 18),
            AgeGroup::From18To30 => (18, 30),
            AgeGroup::From30To40 => (30, 40),
            AgeGroup::From40To50 => (40, 50),
            AgeGroup::From50To60 => (50, 60),
            AgeGroup::From60To70 => (60, 70),
            AgeGroup::From70To80 => (70, 80),
            AgeGroup::From80To90 => (80, 90),
            AgeGroup::From90To100 => (90, 100),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AgeGroup::From0To18 => "0-18",
            AgeGroup::From18To30 => "18-30",
            AgeGroup::From30To40 => "30-40",
            AgeGroup::From40To50 => "40-50",
            AgeGroup::From50To60 => "50-60",
            AgeGroup::From60To70 => "60-70",
            AgeGroup::From70To80 => "70-80",
            AgeGroup::From80To90 => "80-90",
            AgeGroup::From90To100 => "90-100",
        }
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One validated transaction.
///
/// Categorical fields are `None` only when the source table has no such column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub age: u8,
    pub age_group: AgeGroup,
    pub item_purchased: String,
    pub purchase_amount: f64,
    /// `None` when the source value failed numeric coercion.
    pub review_rating: Option<f64>,

    pub gender: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub season: Option<String>,
    pub payment_method: Option<String>,
    pub shipping_type: Option<String>,
    pub discount_applied: Option<String>,
    pub promo_code_used: Option<String>,
    pub frequency_of_purchases: Option<String>,
    pub subscription_status: Option<String>,
}

impl NormalizedRecord {
    /// Categorical value by canonical column name.
    pub fn categorical(&self, column: &str) -> Option<&str> {
        let value = match column {
            columns::GENDER => &self.gender,
            columns::CATEGORY => &self.category,
            columns::LOCATION => &self.location,
            columns::SEASON => &self.season,
            columns::PAYMENT_METHOD => &self.payment_method,
            columns::SHIPPING_TYPE => &self.shipping_type,
            columns::DISCOUNT_APPLIED => &self.discount_applied,
            columns::PROMO_CODE_USED => &self.promo_code_used,
            columns::FREQUENCY_OF_PURCHASES => &self.frequency_of_purchases,
            columns::SUBSCRIPTION_STATUS => &self.subscription_status,
            _ => return None,
        };
        value.as_deref()
    }
}

/// Immutable, fully normalized snapshot shared by every KPI query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedDataset {
    records: Vec<NormalizedRecord>,
}

impl NormalizedDataset {
    pub(crate) fn from_records(records: Vec<NormalizedRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[NormalizedRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NormalizedRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Categorical columns that carry values in this dataset.
    fn present_categoricals(&self) -> Vec<&'static str> {
        columns::CATEGORICAL
            .into_iter()
            .filter(|c| self.records.iter().any(|r| r.categorical(c).is_some()))
            .collect()
    }

    /// Columnar view for downstream consumers. Categorical columns absent from
    /// the source are left out.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let ages: Vec<i32> = self.records.iter().map(|r| i32::from(r.age)).collect();
        let groups: Vec<&str> = self.records.iter().map(|r| r.age_group.label()).collect();
        let items: Vec<&str> = self.records.iter().map(|r| r.item_purchased.as_str()).collect();
        let amounts: Vec<f64> = self.records.iter().map(|r| r.purchase_amount).collect();
        let ratings: Vec<Option<f64>> = self.records.iter().map(|r| r.review_rating).collect();

        let mut series = vec![
            Series::new(columns::AGE, ages),
            Series::new(columns::AGE_GROUP, groups),
            Series::new(columns::ITEM_PURCHASED, items),
            Series::new(columns::PURCHASE_AMOUNT, amounts),
            Series::new(columns::REVIEW_RATING, ratings),
        ];

        for column in self.present_categoricals() {
            let values: Vec<Option<&str>> =
                self.records.iter().map(|r| r.categorical(column)).collect();
            series.push(Series::new(column, values));
        }

        DataFrame::new(series).map_err(|e| KpiError::Polars(format!("Failed to build frame: {}", e)))
    }

    /// Write the columnar view as CSV with a header row. Missing ratings are
    /// written as [`UNRATED`] so the file normalizes back to this dataset.
    pub fn write_csv<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut frame = self.to_frame()?;
        CsvWriter::new(writer)
            .include_header(true)
            .with_null_value(UNRATED.to_string())
            .finish(&mut frame)
            .map_err(|e| KpiError::Polars(format!("Failed to write CSV: {}", e)))
    }

    /// Render back into raw text form with canonical headers.
    ///
    /// A missing rating is written as [`UNRATED`], so normalizing the result is
    /// a no-op.
    pub fn to_raw_table(&self) -> RawTable {
        let categoricals = self.present_categoricals();

        let mut headers = vec![
            columns::AGE.to_string(),
            columns::ITEM_PURCHASED.to_string(),
            columns::PURCHASE_AMOUNT.to_string(),
            columns::REVIEW_RATING.to_string(),
        ];
        headers.extend(categoricals.iter().map(|c| c.to_string()));

        let mut table = RawTable::new(headers);
        for record in &self.records {
            let mut row = vec![
                record.age.to_string(),
                record.item_purchased.clone(),
                record.purchase_amount.to_string(),
                record
                    .review_rating
                    .map(|r| r.to_string())
                    .unwrap_or_else(|| UNRATED.to_string()),
            ];
            row.extend(
                categoricals
                    .iter()
                    .map(|c| record.categorical(c).unwrap_or_default().to_string()),
            );
            table.push_row(row);
        }
        table
    }
}

impl<'a> IntoIterator for &'a NormalizedDataset {
    type Item = &'a NormalizedRecord;
    type IntoIter = std::slice::Iter<'a, NormalizedRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
