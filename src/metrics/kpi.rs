//! KPI catalogue and result shapes

use crate::error::KpiError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Best-selling item within a group, with its occurrence count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCount {
    pub item: String,
    pub count: u64,
}

/// Value of a single KPI query. Serializes to a bare JSON scalar or object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KpiResult {
    Scalar(f64),
    Label(String),
    Breakdown(BTreeMap<String, f64>),
    Counts(BTreeMap<String, u64>),
    BestSellers(BTreeMap<String, ItemCount>),
}

impl KpiResult {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            KpiResult::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_breakdown(&self) -> Option<&BTreeMap<String, f64>> {
        match self {
            KpiResult::Breakdown(map) => Some(map),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kpi {
    TotalRevenue,
    AverageOrderValue,
    RevenueByCategory,
    MostPurchasedItem,
    AverageReviewRating,
    RevenueBySeason,
    SubscriptionPercentage,
    PromoCodeUsageRate,
    FrequentShopperRate,
    RevenueByLocation,
    BestSellingItemByCategory,
    CustomerAgeRate,
    SubscriberFrequentRelation,
    RevenueByRegionCode,
}

impl Kpi {
    pub const ALL: [Kpi; 14] = [
        Kpi::TotalRevenue,
        Kpi::AverageOrderValue,
        Kpi::RevenueByCategory,
        Kpi::MostPurchasedItem,
        Kpi::AverageReviewRating,
        Kpi::RevenueBySeason,
        Kpi::SubscriptionPercentage,
        Kpi::PromoCodeUsageRate,
        Kpi::FrequentShopperRate,
        Kpi::RevenueByLocation,
        Kpi::BestSellingItemByCategory,
        Kpi::CustomerAgeRate,
        Kpi::SubscriberFrequentRelation,
        Kpi::RevenueByRegionCode,
    ];

    /// Route and JSON key name.
    pub fn name(self) -> &'static str {
        match self {
            Kpi::TotalRevenue => "total_revenue",
            Kpi::AverageOrderValue => "average_order_value",
            Kpi::RevenueByCategory => "revenue_by_category",
            Kpi::MostPurchasedItem => "most_purchased_item",
            Kpi::AverageReviewRating => "average_review_rating",
            Kpi::RevenueBySeason => "revenue_by_season",
            Kpi::SubscriptionPercentage => "subscription_percentage",
            Kpi::PromoCodeUsageRate => "promo_code_usage_rate",
            Kpi::FrequentShopperRate => "frequent_shopper_rate",
            Kpi::RevenueByLocation => "revenue_by_location",
            Kpi::BestSellingItemByCategory => "best_selling_item_by_category",
            Kpi::CustomerAgeRate => "customer_age_rate",
            Kpi::SubscriberFrequentRelation => "subscriber_frequent_relation",
            Kpi::RevenueByRegionCode => "revenue_by_region_code",
        }
    }
}

impl fmt::Display for Kpi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Kpi {
    type Err = KpiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Kpi::ALL
            .into_iter()
            .find(|k| k.name() == wanted)
            .ok_or_else(|| KpiError::UnknownKpi(s.to_string()))
    }
}
