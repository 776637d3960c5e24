use std::fmt;

use polars::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::schema::{
    require_all, string_values, CUSTOMER_ID, CUSTOMER_KEY, FACT_COLUMNS, PRODUCT_ID,
    PRODUCT_KEY, TRANSACTION_ID,
};

pub const CUSTOMER_TABLE: &str = "customer";
pub const PRODUCT_TABLE: &str = "products";
pub const FACT_TABLE: &str = "transaction_fact";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Customer,
    Product,
}

impl Dimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Customer => "customer",
            Dimension::Product => "product",
        }
    }
}

/// A cleaned row whose key tuple had no match in a dimension. The fact row is kept with a
/// null reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinIntegrityWarning {
    pub row: usize,
    pub transaction_id: Option<String>,
    pub dimension: Dimension,
}

impl fmt::Display for JoinIntegrityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "row {} (transaction {}) has no matching {} dimension row",
            self.row,
            self.transaction_id.as_deref().unwrap_or("<null>"),
            self.dimension.as_str()
        )
    }
}

#[derive(Debug, Clone)]
pub struct StarSchema {
    pub customers: DataFrame,
    pub products: DataFrame,
    pub facts: DataFrame,
    pub warnings: Vec<JoinIntegrityWarning>,
}

impl StarSchema {
    /// Output tables paired with the names they are persisted under.
    pub fn tables(&self) -> [(&'static str, &DataFrame); 3] {
        [
            (CUSTOMER_TABLE, &self.customers),
            (PRODUCT_TABLE, &self.products),
            (FACT_TABLE, &self.facts),
        ]
    }
}

/// Split the cleaned table into customer and product dimensions and a transaction fact.
pub fn decompose(cleaned: &DataFrame) -> Result<StarSchema> {
    let customers = distinct_rows(cleaned, &CUSTOMER_KEY)?;
    let products = distinct_rows(cleaned, &PRODUCT_KEY)?;
    let (facts, warnings) = build_facts(cleaned, &customers, &products)?;

    info!(
        customers = customers.height(),
        products = products.height(),
        facts = facts.height(),
        join_warnings = warnings.len(),
        "star schema built"
    );

    Ok(StarSchema {
        customers,
        products,
        facts,
        warnings,
    })
}

/// Project `key` and keep the first occurrence of every distinct tuple, in input order.
/// Null key parts compare equal.
pub fn distinct_rows(df: &DataFrame, key: &[&str]) -> Result<DataFrame> {
    require_all(df, key)?;
    let projected = df.select(key.iter().copied())?;
    Ok(projected.unique_stable(None, UniqueKeepStrategy::First, None)?)
}

/// Left join of every cleaned row against both dimensions on their full key tuples.
/// Output height always equals `cleaned.height()` when the dimensions are distinct.
pub fn build_facts(
    cleaned: &DataFrame,
    customers: &DataFrame,
    products: &DataFrame,
) -> Result<(DataFrame, Vec<JoinIntegrityWarning>)> {
    require_all(cleaned, &FACT_COLUMNS)?;
    require_all(cleaned, &CUSTOMER_KEY)?;
    require_all(cleaned, &PRODUCT_KEY)?;
    require_all(customers, &CUSTOMER_KEY)?;
    require_all(products, &PRODUCT_KEY)?;

    let customer = DimensionLookup::new(Dimension::Customer, &CUSTOMER_KEY, CUSTOMER_ID);
    let product = DimensionLookup::new(Dimension::Product, &PRODUCT_KEY, PRODUCT_ID);

    let indexed = cleaned.with_row_index(ROW_INDEX.into(), None)?.lazy();
    let joined = product
        .join(customer.join(indexed, customers), products)
        .collect()?;

    let mut warnings = Vec::new();
    customer.collect_misses(&joined, &mut warnings)?;
    product.collect_misses(&joined, &mut warnings)?;

    let facts = joined
        .lazy()
        .with_columns([
            col(customer.reference.as_str()).alias(CUSTOMER_ID),
            col(product.reference.as_str()).alias(PRODUCT_ID),
        ])
        .select(FACT_COLUMNS.iter().map(|name| col(*name)).collect::<Vec<_>>())
        .collect()?;

    Ok((facts, warnings))
}

const ROW_INDEX: &str = "__row";

/// Join plan for one dimension. The right side carries a copy of the ID column and a
/// `true` marker; a null marker after the join means the key tuple had no match.
struct DimensionLookup {
    dimension: Dimension,
    key: &'static [&'static str],
    id_column: &'static str,
    reference: String,
    matched: String,
}

impl DimensionLookup {
    fn new(dimension: Dimension, key: &'static [&'static str], id_column: &'static str) -> Self {
        Self {
            dimension,
            key,
            id_column,
            reference: format!("__{}_ref", dimension.as_str()),
            matched: format!("__{}_matched", dimension.as_str()),
        }
    }

    fn join(&self, facts: LazyFrame, dimension_rows: &DataFrame) -> LazyFrame {
        let on: Vec<Expr> = self.key.iter().map(|name| col(*name)).collect();
        let mut right = on.clone();
        right.push(col(self.id_column).alias(self.reference.as_str()));
        right.push(lit(true).alias(self.matched.as_str()));

        let mut args = JoinArgs::new(JoinType::Left);
        args.nulls_equal = true;
        args.maintain_order = MaintainOrderJoin::Left;

        facts.join(
            dimension_rows.clone().lazy().select(right),
            on.clone(),
            on,
            args,
        )
    }

    fn collect_misses(
        &self,
        joined: &DataFrame,
        warnings: &mut Vec<JoinIntegrityWarning>,
    ) -> Result<()> {
        let matched = joined.column(&self.matched)?.bool()?;
        if matched.null_count() == 0 {
            return Ok(());
        }
        let rows = joined.column(ROW_INDEX)?.idx()?;
        let transaction_ids = string_values(joined.column(TRANSACTION_ID)?)?;

        for (position, hit) in matched.into_iter().enumerate() {
            if hit.is_some() {
                continue;
            }
            let warning = JoinIntegrityWarning {
                row: rows.get(position).map_or(position, |row| row as usize),
                transaction_id: transaction_ids.get(position).map(str::to_string),
                dimension: self.dimension,
            };
            warn!(%warning, "join integrity warning");
            warnings.push(warning);
        }
        Ok(())
    }
}
