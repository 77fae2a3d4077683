//! Inter-category joining.
//!
//! The billing base defines the population of interest, so secondaries
//! are attached with left joins: a customer with billing records but no
//! usage or support activity is still a valid row with nulls in the
//! secondary columns. Each secondary's native date column is aliased to
//! the base date column before the join; that is the only rename at this
//! stage, all other key columns are assumed standardized already.

use std::collections::BTreeMap;

use polars::prelude::{DataFrame, DataType, IntoLazy, JoinArgs, JoinType, NamedFrom, col};
use tracing::info;

use fuse_model::{
    Category, Granularity, JoinError, JoinOrder, PRODUCT_ID, Result, inter_join_keys,
    membership_keys,
};

use crate::consolidate::verify_join_keys;
use crate::frame_utils::{composite_key, frame_error, has_column, key_set};

/// A verified, type-aligned inter-category join awaiting execution.
///
/// Preparation performs all fallible checks (key presence, ProductID
/// coercion) against copies, so a failed preparation leaves the caller's
/// tables untouched.
pub struct PreparedInterJoin {
    pub base: DataFrame,
    pub secondary: DataFrame,
    pub secondary_category: Category,
    pub keys: Vec<&'static str>,
}

impl PreparedInterJoin {
    /// Left join of the prepared secondary onto the prepared base.
    /// Colliding non-key columns from the secondary receive a
    /// `_<category>` suffix.
    pub fn execute(&self) -> Result<DataFrame> {
        let on: Vec<_> = self.keys.iter().map(|key| col(*key)).collect();
        let suffix = format!("_{}", self.secondary_category.as_str());
        let joined = self
            .base
            .clone()
            .lazy()
            .join(
                self.secondary.clone().lazy(),
                on.clone(),
                on,
                JoinArgs::new(JoinType::Left).with_suffix(Some(suffix.into())),
            )
            .collect()
            .map_err(frame_error)?;
        info!(
            secondary = %self.secondary_category,
            base_rows = self.base.height(),
            secondary_rows = self.secondary.height(),
            result_rows = joined.height(),
            "committed left join"
        );
        Ok(joined)
    }
}

/// Prepares one secondary join: aliases the secondary's date column to
/// the base date column, coerces `ProductID` when the granularity
/// requires it, and verifies the join key set on both sides.
pub fn prepare_inter_join(
    base: &DataFrame,
    secondary_df: &DataFrame,
    secondary: Category,
    granularity: Granularity,
) -> Result<PreparedInterJoin> {
    let mut base = base.clone();
    let mut secondary_table = secondary_df.clone();
    alias_date_column(&mut secondary_table, secondary);
    if granularity.is_product_level() {
        align_product_id(&mut base, &mut secondary_table)?;
    }
    let keys = inter_join_keys(granularity);
    verify_join_keys(&base, &keys, Category::BASE, "billing consolidated")?;
    verify_join_keys(
        &secondary_table,
        &keys,
        secondary,
        &format!("{} consolidated", secondary.as_str()),
    )?;
    Ok(PreparedInterJoin {
        base,
        secondary: secondary_table,
        secondary_category: secondary,
        keys,
    })
}

/// Renames the secondary's native date column to the base date column.
/// Nothing happens when the secondary column is absent (surfaces later
/// as a join-key error) or the base name already exists.
fn alias_date_column(df: &mut DataFrame, secondary: Category) {
    let native = secondary.date_column();
    let base = Category::BASE.date_column();
    if has_column(df, native) && !has_column(df, base) {
        let _ = df.rename(native, base.into());
    }
}

/// Coerces `ProductID` to a common string representation on both sides.
/// The coercion is explicit and logged once per join; a failure is a
/// `TypeMismatch`, never a silent null.
fn align_product_id(base: &mut DataFrame, secondary: &mut DataFrame) -> Result<()> {
    if !has_column(base, PRODUCT_ID) || !has_column(secondary, PRODUCT_ID) {
        // Key verification reports the missing side.
        return Ok(());
    }
    let left_type = base
        .column(PRODUCT_ID)
        .map_err(frame_error)?
        .dtype()
        .clone();
    let right_type = secondary
        .column(PRODUCT_ID)
        .map_err(frame_error)?
        .dtype()
        .clone();
    if left_type != right_type {
        info!(%left_type, %right_type, "coercing ProductID to string for join");
    }
    for (df, side_type, other_type) in [
        (&mut *base, &left_type, &right_type),
        (&mut *secondary, &right_type, &left_type),
    ] {
        let cast = df
            .column(PRODUCT_ID)
            .map_err(frame_error)?
            .as_materialized_series()
            .cast(&DataType::String)
            .map_err(|_| JoinError::TypeMismatch {
                column: PRODUCT_ID.to_string(),
                left: side_type.to_string(),
                right: other_type.to_string(),
            })?;
        df.with_column(cast).map_err(frame_error)?;
    }
    Ok(())
}

/// Secondary categories with consolidated tables, in canonical order.
pub fn available_secondaries(tables: &BTreeMap<Category, DataFrame>) -> Vec<Category> {
    Category::SECONDARIES
        .into_iter()
        .filter(|category| tables.contains_key(category))
        .collect()
}

/// The secondary join sequence: exactly one available category joins
/// directly; two require the operator-chosen order.
pub fn resolve_sequence(
    available: &[Category],
    order: Option<JoinOrder>,
) -> Result<Vec<Category>> {
    match available {
        [] => Err(JoinError::InsufficientCategories),
        [single] => Ok(vec![*single]),
        _ => match order {
            Some(order) => Ok(order.sequence().to_vec()),
            None => Err(JoinError::Frame(
                "join order must be chosen when both usage and support are available".to_string(),
            )),
        },
    }
}

/// Adds one boolean `has_<category>_data` column per available secondary.
///
/// Membership is decided purely on (CustomerID[, ProductID]) appearing in
/// the secondary's consolidated table, independent of whether the join
/// matched any non-key columns.
pub fn add_presence_flags(
    final_table: &mut DataFrame,
    tables: &BTreeMap<Category, DataFrame>,
    granularity: Granularity,
) -> Result<()> {
    let keys = membership_keys(granularity);
    for secondary in available_secondaries(tables) {
        let members = key_set(&tables[&secondary], &keys)?;
        let mut flags = Vec::with_capacity(final_table.height());
        for idx in 0..final_table.height() {
            let key = composite_key(final_table, &keys, idx)?;
            flags.push(members.contains(&key));
        }
        let series = polars::prelude::Series::new(secondary.flag_column().into(), flags);
        final_table.with_column(series).map_err(frame_error)?;
    }
    Ok(())
}

/// Builds the final table in one call: every available secondary is
/// left-joined onto the billing base in sequence, then presence flags
/// are added. The interactive pipeline commits the same steps one
/// resumption at a time.
pub fn build_final_table(
    tables: &BTreeMap<Category, DataFrame>,
    granularity: Granularity,
    order: Option<JoinOrder>,
) -> Result<DataFrame> {
    let base = tables
        .get(&Category::BASE)
        .ok_or(JoinError::InsufficientCategories)?;
    let sequence = resolve_sequence(&available_secondaries(tables), order)?;
    let mut result = base.clone();
    for secondary in sequence {
        let prepared = prepare_inter_join(&result, &tables[&secondary], secondary, granularity)?;
        result = prepared.execute()?;
    }
    add_presence_flags(&mut result, tables, granularity)?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::df;

    fn billing() -> DataFrame {
        df!(
            "CustomerID" => ["C1", "C2", "C3"],
            "BillingDate" => ["2024-01-01", "2024-01-01", "2024-02-01"],
            "Amount" => [100.0, 200.0, 300.0]
        )
        .unwrap()
    }

    fn usage() -> DataFrame {
        df!(
            "CustomerID" => ["C1", "C3", "C9"],
            "UsageDate" => ["2024-01-01", "2024-02-01", "2024-03-01"],
            "Sessions" => [12i64, 7, 4]
        )
        .unwrap()
    }

    fn tables_with(entries: &[(Category, DataFrame)]) -> BTreeMap<Category, DataFrame> {
        entries.iter().cloned().collect()
    }

    #[test]
    fn left_join_preserves_every_base_row() {
        let tables = tables_with(&[(Category::Billing, billing()), (Category::Usage, usage())]);
        let result =
            build_final_table(&tables, Granularity::CustomerLevel, None).unwrap();
        assert_eq!(result.height(), billing().height());
        assert!(has_column(&result, "Sessions"));
    }

    #[test]
    fn presence_flags_follow_key_membership() {
        let tables = tables_with(&[(Category::Billing, billing()), (Category::Usage, usage())]);
        let result =
            build_final_table(&tables, Granularity::CustomerLevel, None).unwrap();
        let flags: Vec<bool> = (0..result.height())
            .map(|idx| {
                let value = result
                    .column("has_usage_data")
                    .unwrap()
                    .as_materialized_series()
                    .get(idx)
                    .unwrap();
                matches!(value, polars::prelude::AnyValue::Boolean(true))
            })
            .collect();
        // C1 and C3 appear in usage; C2 does not.
        assert_eq!(flags, vec![true, false, true]);
        assert_eq!(
            result.column("has_usage_data").unwrap().dtype(),
            &DataType::Boolean
        );
    }

    #[test]
    fn zero_secondaries_is_insufficient() {
        let tables = tables_with(&[(Category::Billing, billing())]);
        let error =
            build_final_table(&tables, Granularity::CustomerLevel, None).unwrap_err();
        assert!(matches!(error, JoinError::InsufficientCategories));
    }

    #[test]
    fn missing_base_is_insufficient() {
        let tables = tables_with(&[(Category::Usage, usage())]);
        let error =
            build_final_table(&tables, Granularity::CustomerLevel, None).unwrap_err();
        assert!(matches!(error, JoinError::InsufficientCategories));
    }

    #[test]
    fn product_id_is_coerced_across_types() {
        let base = df!(
            "CustomerID" => ["C1", "C2"],
            "ProductID" => ["1", "2"],
            "BillingDate" => ["2024-01-01", "2024-01-01"],
            "Amount" => [10.0, 20.0]
        )
        .unwrap();
        let secondary = df!(
            "CustomerID" => ["C1", "C2"],
            "ProductID" => [1i64, 3],
            "UsageDate" => ["2024-01-01", "2024-01-01"],
            "Sessions" => [5i64, 6]
        )
        .unwrap();
        let tables = tables_with(&[(Category::Billing, base), (Category::Usage, secondary)]);
        let result = build_final_table(&tables, Granularity::ProductLevel, None).unwrap();
        assert_eq!(result.height(), 2);
        // (C1, 1) matches after coercion; (C2, 2) vs (C2, 3) does not.
        let sessions_nulls = result
            .column("Sessions")
            .unwrap()
            .as_materialized_series()
            .null_count();
        assert_eq!(sessions_nulls, 1);
    }

    #[test]
    fn two_secondaries_require_an_order() {
        let support = df!(
            "CustomerID" => ["C1"],
            "TicketOpenDate" => ["2024-01-01"],
            "Tickets" => [2i64]
        )
        .unwrap();
        let tables = tables_with(&[
            (Category::Billing, billing()),
            (Category::Usage, usage()),
            (Category::Support, support),
        ]);
        assert!(build_final_table(&tables, Granularity::CustomerLevel, None).is_err());
        let result = build_final_table(
            &tables,
            Granularity::CustomerLevel,
            Some(JoinOrder::SupportFirst),
        )
        .unwrap();
        assert_eq!(result.height(), billing().height());
        assert!(has_column(&result, "has_usage_data"));
        assert!(has_column(&result, "has_support_data"));
    }
}
