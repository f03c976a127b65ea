//! Budgets: a spending limit over a period, optionally scoped to a category.

use chrono::{Datelike, NaiveDate};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, reports::percentage_of};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetPeriod {
    Monthly,
    Yearly,
    Custom,
}

impl BudgetPeriod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
            Self::Custom => "custom",
        }
    }
}

impl TryFrom<&str> for BudgetPeriod {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            "custom" => Ok(Self::Custom),
            other => Err(EngineError::InvalidDate(format!(
                "invalid budget period: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    pub id: Uuid,
    pub household_id: Uuid,
    pub name: String,
    pub amount_minor: i64,
    pub period: BudgetPeriod,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub category_id: Option<Uuid>,
    pub created_by: Uuid,
}

/// Input for creating a budget.
#[derive(Clone, Debug)]
pub struct NewBudget {
    pub name: String,
    pub amount_minor: i64,
    pub period: BudgetPeriod,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub category_id: Option<Uuid>,
}

#[derive(Clone, Debug, Default)]
pub struct BudgetChanges {
    pub name: Option<String>,
    pub amount_minor: Option<i64>,
    pub period: Option<BudgetPeriod>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub category_id: Option<Uuid>,
}

/// Spending against a budget for one window (both bounds inclusive).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BudgetProgress {
    pub budget_id: Uuid,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub amount_minor: i64,
    pub spent_minor: i64,
    pub remaining_minor: i64,
    pub percentage: f64,
}

pub(crate) fn validate_range(
    period: BudgetPeriod,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
) -> ResultEngine<()> {
    if period == BudgetPeriod::Custom && end_date.is_none() {
        return Err(EngineError::InvalidDate(
            "custom budgets require an end_date".to_string(),
        ));
    }
    if let Some(end) = end_date
        && end < start_date
    {
        return Err(EngineError::InvalidDate(
            "end_date must not be before start_date".to_string(),
        ));
    }
    Ok(())
}

fn month_bounds(at: NaiveDate) -> ResultEngine<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(at.year(), at.month(), 1);
    let next_first = if at.month() == 12 {
        NaiveDate::from_ymd_opt(at.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(at.year(), at.month() + 1, 1)
    };
    match (first, next_first.and_then(|d| d.pred_opt())) {
        (Some(first), Some(last)) => Ok((first, last)),
        _ => Err(EngineError::InvalidDate(format!("date out of range: {at}"))),
    }
}

fn year_bounds(at: NaiveDate) -> ResultEngine<(NaiveDate, NaiveDate)> {
    match (
        NaiveDate::from_ymd_opt(at.year(), 1, 1),
        NaiveDate::from_ymd_opt(at.year(), 12, 31),
    ) {
        (Some(first), Some(last)) => Ok((first, last)),
        _ => Err(EngineError::InvalidDate(format!("date out of range: {at}"))),
    }
}

impl Budget {
    /// The window containing `at`, clipped to `[start_date, end_date]`.
    ///
    /// Custom budgets always span their whole range.
    pub fn window(&self, at: NaiveDate) -> ResultEngine<(NaiveDate, NaiveDate)> {
        let (start, end) = match self.period {
            BudgetPeriod::Custom => {
                let end = self.end_date.ok_or_else(|| {
                    EngineError::InvalidDate("custom budget without end_date".to_string())
                })?;
                return Ok((self.start_date, end));
            }
            BudgetPeriod::Monthly => month_bounds(at)?,
            BudgetPeriod::Yearly => year_bounds(at)?,
        };

        if at < self.start_date || self.end_date.is_some_and(|end| at > end) {
            return Err(EngineError::InvalidDate(format!(
                "{at} is outside the budget range"
            )));
        }

        let start = start.max(self.start_date);
        let end = match self.end_date {
            Some(limit) => end.min(limit),
            None => end,
        };
        Ok((start, end))
    }

    pub fn progress(&self, window: (NaiveDate, NaiveDate), spent_minor: i64) -> BudgetProgress {
        BudgetProgress {
            budget_id: self.id,
            window_start: window.0,
            window_end: window.1,
            amount_minor: self.amount_minor,
            spent_minor,
            remaining_minor: self.amount_minor - spent_minor,
            percentage: percentage_of(spent_minor, self.amount_minor),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "budgets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub household_id: Uuid,
    pub name: String,
    pub amount_minor: i64,
    pub period: String,
    pub start_date: Date,
    pub end_date: Option<Date>,
    pub category_id: Option<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::households::Entity",
        from = "Column::HouseholdId",
        to = "super::households::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Household,
    #[sea_orm(
        belongs_to = "super::categories::Entity",
        from = "Column::CategoryId",
        to = "super::categories::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Category,
}

impl Related<super::households::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Household.def()
    }
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Budget {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: model.id,
            household_id: model.household_id,
            name: model.name,
            amount_minor: model.amount_minor,
            period: BudgetPeriod::try_from(model.period.as_str())?,
            start_date: model.start_date,
            end_date: model.end_date,
            category_id: model.category_id,
            created_by: model.created_by,
        })
    }
}
