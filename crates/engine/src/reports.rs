//! Household reports: totals and per-category expense breakdown.
//!
//! Aggregation is done in memory over the rows returned by one query; see
//! `Engine::household_summary`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Category, Currency, Transaction, TransactionKind};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    /// `None` groups uncategorized expenses.
    pub category_id: Option<Uuid>,
    pub name: Option<String>,
    pub total_minor: i64,
    /// Share of total expenses, in percent with two decimals.
    pub percentage: f64,
    pub monthly_budget_minor: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub household_id: Uuid,
    pub currency: Currency,
    pub total_income_minor: i64,
    pub total_expenses_minor: i64,
    pub net_minor: i64,
    pub by_category: Vec<CategoryTotal>,
}

/// `part / whole` in percent, rounded to two decimals. Zero when `whole <= 0`.
pub fn percentage_of(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        return 0.0;
    }
    let raw = part as f64 * 100.0 / whole as f64;
    (raw * 100.0).round() / 100.0
}

/// Folds transactions into income/expense totals and an expense breakdown.
///
/// Rows are sorted by total descending, then by name (uncategorized last).
pub fn summarize(
    household_id: Uuid,
    currency: Currency,
    transactions: &[Transaction],
    categories: &[Category],
) -> Summary {
    let mut income = 0i64;
    let mut expenses = 0i64;
    let mut per_category: HashMap<Option<Uuid>, i64> = HashMap::new();

    for tx in transactions {
        match tx.kind {
            TransactionKind::Income => income = income.saturating_add(tx.amount_minor),
            TransactionKind::Expense => {
                expenses = expenses.saturating_add(tx.amount_minor);
                let slot = per_category.entry(tx.category_id).or_insert(0);
                *slot = slot.saturating_add(tx.amount_minor);
            }
        }
    }

    let by_id: HashMap<Uuid, &Category> = categories.iter().map(|c| (c.id, c)).collect();
    let mut by_category: Vec<CategoryTotal> = per_category
        .into_iter()
        .map(|(category_id, total_minor)| {
            let category = category_id.and_then(|id| by_id.get(&id));
            CategoryTotal {
                category_id,
                name: category.map(|c| c.name.clone()),
                total_minor,
                percentage: percentage_of(total_minor, expenses),
                monthly_budget_minor: category.and_then(|c| c.monthly_budget_minor),
            }
        })
        .collect();

    by_category.sort_by(|a, b| {
        b.total_minor
            .cmp(&a.total_minor)
            .then_with(|| match (&a.name, &b.name) {
                (Some(x), Some(y)) => x.cmp(y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            })
    });

    Summary {
        household_id,
        currency,
        total_income_minor: income,
        total_expenses_minor: expenses,
        net_minor: income - expenses,
        by_category,
    }
}
