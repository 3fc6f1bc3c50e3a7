//! Metrics Engine
//!
//! Pure aggregate functions over a [`NormalizedDataset`]. Nothing here mutates
//! the dataset or caches results, so every function can be called from any
//! number of threads at once.
//!
//! Tie-breaking: item counts are accumulated in first-encountered order and
//! the first item to reach the maximal count wins.

pub mod kpi;
pub mod region;

pub use kpi::{ItemCount, Kpi, KpiResult};
pub use region::{region_code, region_code_translate, region_name};

use crate::dataset::{columns, AgeGroup, NormalizedDataset, NormalizedRecord};
use crate::error::{KpiError, Result};
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Purchase frequencies that count as a frequent shopper.
pub const FREQUENT_FREQUENCIES: [&str; 2] = ["weekly", "fortnightly"];

const YES: &str = "yes";

fn is_subscribed(r: &NormalizedRecord) -> bool {
    r.subscription_status.as_deref() == Some(YES)
}

fn is_frequent(r: &NormalizedRecord) -> bool {
    r.frequency_of_purchases
        .as_deref()
        .is_some_and(|f| FREQUENT_FREQUENCIES.contains(&f))
}

fn revenue_by(dataset: &NormalizedDataset, column: &str) -> BTreeMap<String, f64> {
    let mut out = BTreeMap::new();
    for r in dataset {
        if let Some(key) = r.categorical(column) {
            *out.entry(key.to_string()).or_insert(0.0) += r.purchase_amount;
        }
    }
    out
}

/// Percentage of records matching `pred`. Fails on an empty dataset.
fn percentage_of(
    dataset: &NormalizedDataset,
    kpi: &'static str,
    pred: impl Fn(&NormalizedRecord) -> bool,
) -> Result<f64> {
    if dataset.is_empty() {
        return Err(KpiError::EmptyDataset(kpi));
    }
    let hits = dataset.iter().filter(|r| pred(*r)).count();
    Ok(hits as f64 / dataset.len() as f64 * 100.0)
}

fn first_max(counts: &IndexMap<&str, u64>) -> Option<ItemCount> {
    let mut best: Option<(&str, u64)> = None;
    for (&item, &count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((item, count));
        }
    }
    best.map(|(item, count)| ItemCount {
        item: item.to_string(),
        count,
    })
}

pub fn total_revenue(dataset: &NormalizedDataset) -> f64 {
    dataset.iter().map(|r| r.purchase_amount).sum()
}

pub fn average_order_value(dataset: &NormalizedDataset) -> Result<f64> {
    if dataset.is_empty() {
        return Err(KpiError::EmptyDataset(Kpi::AverageOrderValue.name()));
    }
    Ok(total_revenue(dataset) / dataset.len() as f64)
}

pub fn revenue_by_category(dataset: &NormalizedDataset) -> BTreeMap<String, f64> {
    revenue_by(dataset, columns::CATEGORY)
}

pub fn most_purchased_item(dataset: &NormalizedDataset) -> Result<String> {
    let mut counts: IndexMap<&str, u64> = IndexMap::new();
    for r in dataset {
        *counts.entry(r.item_purchased.as_str()).or_insert(0) += 1;
    }
    first_max(&counts)
        .map(|best| best.item)
        .ok_or(KpiError::EmptyDataset(Kpi::MostPurchasedItem.name()))
}

/// Mean rating over records whose rating coerced to a number; missing
/// ratings are skipped, not counted as zero.
pub fn average_review_rating(dataset: &NormalizedDataset) -> Result<f64> {
    let (sum, n) = dataset
        .iter()
        .filter_map(|r| r.review_rating)
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 {
        return Err(KpiError::EmptyDataset(Kpi::AverageReviewRating.name()));
    }
    Ok(sum / n as f64)
}

pub fn revenue_by_season(dataset: &NormalizedDataset) -> BTreeMap<String, f64> {
    revenue_by(dataset, columns::SEASON)
}

pub fn subscription_percentage(dataset: &NormalizedDataset) -> Result<f64> {
    percentage_of(dataset, Kpi::SubscriptionPercentage.name(), is_subscribed)
}

pub fn promo_code_usage_rate(dataset: &NormalizedDataset) -> Result<f64> {
    percentage_of(dataset, Kpi::PromoCodeUsageRate.name(), |r| {
        r.promo_code_used.as_deref() == Some(YES)
    })
}

pub fn frequent_shopper_rate(dataset: &NormalizedDataset) -> Result<f64> {
    percentage_of(dataset, Kpi::FrequentShopperRate.name(), is_frequent)
}

pub fn revenue_by_location(dataset: &NormalizedDataset) -> BTreeMap<String, f64> {
    revenue_by(dataset, columns::LOCATION)
}

pub fn best_selling_item_by_category(dataset: &NormalizedDataset) -> BTreeMap<String, ItemCount> {
    let mut per_category: IndexMap<&str, IndexMap<&str, u64>> = IndexMap::new();
    for r in dataset {
        if let Some(category) = r.category.as_deref() {
            *per_category
                .entry(category)
                .or_default()
                .entry(r.item_purchased.as_str())
                .or_insert(0) += 1;
        }
    }
    per_category
        .iter()
        .filter_map(|(&category, counts)| first_max(counts).map(|best| (category.to_string(), best)))
        .collect()
}

/// Records per age bucket; empty buckets are omitted.
pub fn customer_age_rate(dataset: &NormalizedDataset) -> BTreeMap<AgeGroup, u64> {
    let mut out = BTreeMap::new();
    for r in dataset {
        *out.entry(r.age_group).or_insert(0) += 1;
    }
    out
}

pub const SUBSCRIBER_FREQUENT_KEY: &str = "frequent_subscriber_rate";

/// Share of subscribers who are also frequent shoppers, keyed by
/// [`SUBSCRIBER_FREQUENT_KEY`]. Zero subscribers yields 0.
pub fn subscriber_frequent_relation(dataset: &NormalizedDataset) -> BTreeMap<String, f64> {
    let (subscribed, frequent) = dataset
        .iter()
        .filter(|r| is_subscribed(r))
        .fold((0usize, 0usize), |(s, f), r| (s + 1, f + usize::from(is_frequent(r))));
    let rate = if subscribed == 0 {
        0.0
    } else {
        frequent as f64 / subscribed as f64 * 100.0
    };
    BTreeMap::from([(SUBSCRIBER_FREQUENT_KEY.to_string(), rate)])
}

pub fn revenue_by_region_code(dataset: &NormalizedDataset) -> BTreeMap<String, f64> {
    region_code_translate(revenue_by_location(dataset))
}

/// Shared, read-only handle used by the serving layers.
#[derive(Debug, Clone)]
pub struct MetricsEngine {
    dataset: Arc<NormalizedDataset>,
}

impl MetricsEngine {
    pub fn new(dataset: Arc<NormalizedDataset>) -> Self {
        Self { dataset }
    }

    pub fn dataset(&self) -> &NormalizedDataset {
        &self.dataset
    }

    pub fn compute(&self, kpi: Kpi) -> Result<KpiResult> {
        debug!("Computing {} over {} records", kpi, self.dataset.len());
        let ds = self.dataset.as_ref();
        let result = match kpi {
            Kpi::TotalRevenue => KpiResult::Scalar(total_revenue(ds)),
            Kpi::AverageOrderValue => KpiResult::Scalar(average_order_value(ds)?),
            Kpi::RevenueByCategory => KpiResult::Breakdown(revenue_by_category(ds)),
            Kpi::MostPurchasedItem => KpiResult::Label(most_purchased_item(ds)?),
            Kpi::AverageReviewRating => KpiResult::Scalar(average_review_rating(ds)?),
            Kpi::RevenueBySeason => KpiResult::Breakdown(revenue_by_season(ds)),
            Kpi::SubscriptionPercentage => KpiResult::Scalar(subscription_percentage(ds)?),
            Kpi::PromoCodeUsageRate => KpiResult::Scalar(promo_code_usage_rate(ds)?),
            Kpi::FrequentShopperRate => KpiResult::Scalar(frequent_shopper_rate(ds)?),
            Kpi::RevenueByLocation => KpiResult::Breakdown(revenue_by_location(ds)),
            Kpi::BestSellingItemByCategory => {
                KpiResult::BestSellers(best_selling_item_by_category(ds))
            }
            Kpi::CustomerAgeRate => KpiResult::Counts(
                customer_age_rate(ds)
                    .into_iter()
                    .map(|(group, n)| (group.label().to_string(), n))
                    .collect(),
            ),
            Kpi::SubscriberFrequentRelation => {
                KpiResult::Breakdown(subscriber_frequent_relation(ds))
            }
            Kpi::RevenueByRegionCode => KpiResult::Breakdown(revenue_by_region_code(ds)),
        };
        Ok(result)
    }

    /// Every KPI in catalogue order; a failing KPI does not stop the rest.
    pub fn compute_all(&self) -> Vec<(Kpi, Result<KpiResult>)> {
        Kpi::ALL.into_iter().map(|kpi| (kpi, self.compute(kpi))).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::RawTable;
    use crate::normalizer::normalize;

    const HEADERS: [&str; 9] = [
        "Age",
        "Item Purchased",
        "Category",
        "Purchase Amount (USD)",
        "Location",
        "Season",
        "Review Rating",
        "Subscription Status",
        "Frequency of Purchases",
    ];

    fn dataset(rows: &[[&str; 9]]) -> NormalizedDataset {
        let mut raw = RawTable::new(HEADERS.iter().map(|h| h.to_string()).collect());
        for row in rows {
            raw.push_row(row.iter().copied());
        }
        normalize(&raw).unwrap()
    }

    fn sample() -> NormalizedDataset {
        dataset(&[
            ["25", "Blouse", "Clothing", "50", "New York", "Winter", "4.0", "Yes", "Weekly"],
            ["35", "Hat", "Accessories", "20", "Texas", "Summer", "3.0", "No", "Annually"],
            ["45", "Hat", "Accessories", "30", "texas", "Summer", "junk", "Yes", "Monthly"],
            ["55", "Blouse", "Clothing", "100", "Gotham", "Winter", "5.0", "Yes", "Fortnightly"],
        ])
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_revenue_totals() {
        let ds = sample();
        assert!(approx(total_revenue(&ds), 200.0));
        assert!(approx(average_order_value(&ds).unwrap(), 50.0));

        let by_category = revenue_by_category(&ds);
        assert_eq!(by_category.len(), 2);
        assert!(approx(by_category["clothing"], 150.0));
        assert!(approx(by_category["accessories"], 50.0));
        assert!(approx(by_category.values().sum::<f64>(), total_revenue(&ds)));

        let by_season = revenue_by_season(&ds);
        assert!(approx(by_season["summer"], 50.0));
    }

    #[test]
    fn test_location_revenue_and_region_codes() {
        let ds = sample();
        let by_location = revenue_by_location(&ds);
        assert!(approx(by_location["texas"], 50.0));
        assert!(approx(by_location["gotham"], 100.0));

        let by_code = revenue_by_region_code(&ds);
        assert_eq!(by_code.len(), 2);
        assert!(approx(by_code["TX"], 50.0));
        assert!(approx(by_code["NY"], 50.0));
        assert!(!by_code.contains_key("gotham"));
    }

    #[test]
    fn test_most_purchased_item_breaks_ties_by_first_seen() {
        let ds = sample();
        // Blouse and Hat both appear twice; Blouse is seen first.
        assert_eq!(most_purchased_item(&ds).unwrap(), "Blouse");

        let ds = dataset(&[
            ["25", "Socks", "Clothing", "5", "Ohio", "Fall", "4", "No", "Weekly"],
            ["25", "Hat", "Accessories", "5", "Ohio", "Fall", "4", "No", "Weekly"],
            ["25", "Hat", "Accessories", "5", "Ohio", "Fall", "4", "No", "Weekly"],
            ["25", "Socks", "Clothing", "5", "Ohio", "Fall", "4", "No", "Weekly"],
            ["25", "Hat", "Accessories", "5", "Ohio", "Fall", "4", "No", "Weekly"],
        ]);
        assert_eq!(most_purchased_item(&ds).unwrap(), "Hat");
    }

    #[test]
    fn test_best_selling_item_by_category() {
        let ds = dataset(&[
            ["25", "Shirt", "Clothing", "5", "Ohio", "Fall", "4", "No", "Weekly"],
            ["25", "Pants", "Clothing", "5", "Ohio", "Fall", "4", "No", "Weekly"],
            ["25", "Pants", "Clothing", "5", "Ohio", "Fall", "4", "No", "Weekly"],
            ["25", "Belt", "Accessories", "5", "Ohio", "Fall", "4", "No", "Weekly"],
            ["25", "Hat", "Accessories", "5", "Ohio", "Fall", "4", "No", "Weekly"],
        ]);
        let best = best_selling_item_by_category(&ds);
        assert_eq!(best["clothing"], ItemCount { item: "Pants".to_string(), count: 2 });
        // Tie within accessories: first seen wins.
        assert_eq!(best["accessories"], ItemCount { item: "Belt".to_string(), count: 1 });
    }

    #[test]
    fn test_average_rating_skips_missing() {
        let ds = sample();
        assert_eq!(ds.iter().filter(|r| r.review_rating.is_none()).count(), 1);
        assert!(approx(average_review_rating(&ds).unwrap(), 4.0));
    }

    #[test]
    fn test_average_rating_with_no_numeric_ratings_fails() {
        let ds = dataset(&[["25", "Hat", "Accessories", "5", "Ohio", "Fall", "none", "No", "Weekly"]]);
        assert!(matches!(average_review_rating(&ds), Err(KpiError::EmptyDataset(_))));
    }

    #[test]
    fn test_infinite_rating_does_not_reach_the_average() {
        let ds = dataset(&[
            ["25", "Hat", "Accessories", "5", "Ohio", "Fall", "inf", "No", "Weekly"],
            ["25", "Hat", "Accessories", "5", "Ohio", "Fall", "-inf", "No", "Weekly"],
            ["25", "Hat", "Accessories", "5", "Ohio", "Fall", "3.5", "No", "Weekly"],
        ]);
        assert_eq!(ds.len(), 3);
        let avg = average_review_rating(&ds).unwrap();
        assert!(avg.is_finite());
        assert!(approx(avg, 3.5));

        let only_inf = dataset(&[["25", "Hat", "Accessories", "5", "Ohio", "Fall", "inf", "No", "Weekly"]]);
        assert!(matches!(average_review_rating(&only_inf), Err(KpiError::EmptyDataset(_))));
    }

    #[test]
    fn test_rates() {
        let ds = sample();
        let subscribed = subscription_percentage(&ds).unwrap();
        assert!(approx(subscribed, 75.0));
        assert_eq!(subscribed + (100.0 - subscribed), 100.0);
        assert!(approx(frequent_shopper_rate(&ds).unwrap(), 50.0));

        let relation = subscriber_frequent_relation(&ds);
        assert_eq!(relation.len(), 1);
        assert!(approx(relation[SUBSCRIBER_FREQUENT_KEY], 200.0 / 3.0));
    }

    #[test]
    fn test_promo_rate_without_promo_column_is_zero() {
        let ds = sample();
        assert_eq!(promo_code_usage_rate(&ds).unwrap(), 0.0);
    }

    #[test]
    fn test_subscriber_relation_without_subscribers_is_zero() {
        let ds = dataset(&[["25", "Hat", "Accessories", "5", "Ohio", "Fall", "4", "No", "Weekly"]]);
        assert_eq!(subscriber_frequent_relation(&ds)[SUBSCRIBER_FREQUENT_KEY], 0.0);
    }

    #[test]
    fn test_customer_age_rate_omits_empty_buckets() {
        let ds = sample();
        let rate = customer_age_rate(&ds);
        assert_eq!(rate.len(), 4);
        assert_eq!(rate[&AgeGroup::From30To40], 1);
        assert!(!rate.contains_key(&AgeGroup::From0To18));
        assert_eq!(rate.values().sum::<u64>(), ds.len() as u64);
    }

    #[test]
    fn test_empty_dataset_guards() {
        let ds = dataset(&[]);
        assert_eq!(total_revenue(&ds), 0.0);
        assert!(revenue_by_category(&ds).is_empty());
        assert!(customer_age_rate(&ds).is_empty());
        assert!(matches!(average_order_value(&ds), Err(KpiError::EmptyDataset(_))));
        assert!(matches!(most_purchased_item(&ds), Err(KpiError::EmptyDataset(_))));
        assert!(matches!(subscription_percentage(&ds), Err(KpiError::EmptyDataset(_))));
        assert!(matches!(promo_code_usage_rate(&ds), Err(KpiError::EmptyDataset(_))));
        assert!(matches!(frequent_shopper_rate(&ds), Err(KpiError::EmptyDataset(_))));
        assert_eq!(subscriber_frequent_relation(&ds)[SUBSCRIBER_FREQUENT_KEY], 0.0);
    }

    #[test]
    fn test_engine_compute_all_isolates_failures() {
        let engine = MetricsEngine::new(Arc::new(dataset(&[])));
        let results = engine.compute_all();
        assert_eq!(results.len(), Kpi::ALL.len());
        for (kpi, result) in results {
            match kpi {
                Kpi::TotalRevenue => assert_eq!(result.unwrap(), KpiResult::Scalar(0.0)),
                Kpi::AverageOrderValue | Kpi::SubscriptionPercentage => assert!(result.is_err()),
                _ => {}
            }
        }
    }

    #[test]
    fn test_engine_labels_age_groups() {
        let engine = MetricsEngine::new(Arc::new(sample()));
        let KpiResult::Counts(counts) = engine.compute(Kpi::CustomerAgeRate).unwrap() else {
            panic!("expected counts");
        };
        assert_eq!(counts.get("30-40"), Some(&1));
    }
}
