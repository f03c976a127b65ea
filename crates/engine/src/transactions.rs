//! Transaction primitives.
//!
//! A `Transaction` is a single income or expense recorded in a household.
//! Receipts are expense transactions.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(EngineError::InvalidAmount(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub household_id: Uuid,
    pub kind: TransactionKind,
    pub amount_minor: i64,
    pub occurred_at: DateTime<Utc>,
    pub category_id: Option<Uuid>,
    pub description: Option<String>,
    pub merchant: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for recording a transaction.
#[derive(Clone, Debug)]
pub struct NewTransaction {
    pub kind: TransactionKind,
    pub amount_minor: i64,
    pub occurred_at: DateTime<Utc>,
    pub category_id: Option<Uuid>,
    pub description: Option<String>,
    pub merchant: Option<String>,
}

/// Partial update; `None` leaves a field untouched.
#[derive(Clone, Debug, Default)]
pub struct TransactionChanges {
    pub kind: Option<TransactionKind>,
    pub amount_minor: Option<i64>,
    pub occurred_at: Option<DateTime<Utc>>,
    /// `Some(None)` detaches the category.
    pub category_id: Option<Option<Uuid>>,
    pub description: Option<String>,
    pub merchant: Option<String>,
}

impl TransactionChanges {
    pub fn is_empty(&self) -> bool {
        self.kind.is_none()
            && self.amount_minor.is_none()
            && self.occurred_at.is_none()
            && self.category_id.is_none()
            && self.description.is_none()
            && self.merchant.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub household_id: Uuid,
    pub kind: String,
    pub amount_minor: i64,
    pub occurred_at: DateTimeUtc,
    pub category_id: Option<Uuid>,
    pub description: Option<String>,
    pub merchant: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
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
        on_delete = "SetNull"
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

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: model.id,
            household_id: model.household_id,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            amount_minor: model.amount_minor,
            occurred_at: model.occurred_at,
            category_id: model.category_id,
            description: model.description,
            merchant: model.merchant,
            created_by: model.created_by,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
