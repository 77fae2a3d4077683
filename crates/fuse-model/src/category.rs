//! Type-safe enumerations for the consolidation pipeline.
//!
//! Categories are totally ordered; the derived order (billing < support <
//! usage) is the canonical processing order for intra-category joins.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A data category. Each uploaded table belongs to exactly one category,
/// and each category carries its own native date column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Billing extracts. Always the base of the inter-category join.
    Billing,
    /// Support ticket extracts.
    Support,
    /// Product/service usage extracts.
    Usage,
}

impl Category {
    /// All categories in canonical processing order.
    pub const ALL: [Category; 3] = [Category::Billing, Category::Support, Category::Usage];

    /// The base category for inter-category joins.
    pub const BASE: Category = Category::Billing;

    /// Secondary categories in canonical order.
    pub const SECONDARIES: [Category; 2] = [Category::Support, Category::Usage];

    /// Lowercase identifier as used in session keys and flag columns.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Billing => "billing",
            Category::Support => "support",
            Category::Usage => "usage",
        }
    }

    /// The category's native date column name.
    pub fn date_column(&self) -> &'static str {
        match self {
            Category::Billing => "BillingDate",
            Category::Support => "TicketOpenDate",
            Category::Usage => "UsageDate",
        }
    }

    /// Name of the presence-flag column added for this category
    /// during the inter-category join.
    pub fn flag_column(&self) -> String {
        format!("has_{}_data", self.as_str())
    }

    /// True for categories joined onto the billing base.
    pub fn is_secondary(&self) -> bool {
        !matches!(self, Category::Billing)
    }

    /// The category that follows this one in canonical order.
    pub fn next(&self) -> Option<Category> {
        match self {
            Category::Billing => Some(Category::Support),
            Category::Support => Some(Category::Usage),
            Category::Usage => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "billing" => Ok(Category::Billing),
            "support" => Ok(Category::Support),
            "usage" => Ok(Category::Usage),
            _ => Err(format!("Unknown category: {s}")),
        }
    }
}

/// Analysis granularity, selected by the operator before joining starts.
///
/// Determines whether `ProductID` participates in every join key set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Granularity {
    /// One row per customer and date.
    CustomerLevel,
    /// One row per customer, product and date. Requires `ProductID`
    /// in every uploaded table.
    ProductLevel,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::CustomerLevel => "Customer Level",
            Granularity::ProductLevel => "Product Level",
        }
    }

    pub fn is_product_level(&self) -> bool {
        matches!(self, Granularity::ProductLevel)
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "customer" | "customer level" => Ok(Granularity::CustomerLevel),
            "product" | "product level" => Ok(Granularity::ProductLevel),
            _ => Err(format!("Unknown granularity: {s}")),
        }
    }
}

/// Operator-chosen ordering of the secondary joins, required only when
/// both usage and support tables are available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinOrder {
    UsageFirst,
    SupportFirst,
}

impl JoinOrder {
    /// Secondary categories in the order they are joined onto the base.
    pub fn sequence(&self) -> [Category; 2] {
        match self {
            JoinOrder::UsageFirst => [Category::Usage, Category::Support],
            JoinOrder::SupportFirst => [Category::Support, Category::Usage],
        }
    }
}

impl fmt::Display for JoinOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinOrder::UsageFirst => write!(f, "usage-first"),
            JoinOrder::SupportFirst => write!(f, "support-first"),
        }
    }
}

impl FromStr for JoinOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "usage-first" | "usage" => Ok(JoinOrder::UsageFirst),
            "support-first" | "support" => Ok(JoinOrder::SupportFirst),
            _ => Err(format!("Unknown join order: {s}")),
        }
    }
}
