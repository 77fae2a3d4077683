//! Join key derivation.
//!
//! The join key set depends on the selected granularity and, for category
//! tables, on the category's native date column. Inter-category joins
//! always key on the base category's date column, with each secondary's
//! date column aliased to it beforehand.

use crate::category::{Category, Granularity};

/// Canonical customer identifier column.
pub const CUSTOMER_ID: &str = "CustomerID";

/// Canonical product identifier column (ProductLevel only).
pub const PRODUCT_ID: &str = "ProductID";

/// Join key set for intra-category joins within `category`.
pub fn join_keys(category: Category, granularity: Granularity) -> Vec<&'static str> {
    let mut keys = vec![CUSTOMER_ID];
    if granularity.is_product_level() {
        keys.push(PRODUCT_ID);
    }
    keys.push(category.date_column());
    keys
}

/// Join key set for inter-category joins, keyed on the base date column.
pub fn inter_join_keys(granularity: Granularity) -> Vec<&'static str> {
    join_keys(Category::BASE, granularity)
}

/// Key columns defining row identity for presence-flag membership.
/// Deliberately excludes the date column: a flag records whether the
/// customer (and product) appears in the category at all.
pub fn membership_keys(granularity: Granularity) -> Vec<&'static str> {
    let mut keys = vec![CUSTOMER_ID];
    if granularity.is_product_level() {
        keys.push(PRODUCT_ID);
    }
    keys
}
