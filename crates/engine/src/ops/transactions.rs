use base64::Engine as _;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, Condition, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait, prelude::*,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, NewTransaction, Permission, ResultEngine, Role, Transaction, TransactionChanges,
    TransactionKind, household_members, transactions,
    util::{normalize_optional_text, require_positive_amount},
};

use super::{Engine, with_tx};

pub(super) const MAX_PAGE_SIZE: u64 = 200;

/// Filters for listing transactions.
///
/// `from` is inclusive and `to` is exclusive (`[from, to)`), both in UTC.
#[derive(Clone, Debug, Default)]
pub struct TransactionListFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub kind: Option<TransactionKind>,
    pub category_id: Option<Uuid>,
}

fn validate_list_filter(filter: &TransactionListFilter) -> ResultEngine<()> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from >= to
    {
        return Err(EngineError::InvalidDate(
            "invalid range: from must be < to".to_string(),
        ));
    }
    Ok(())
}

fn clamp_limit(limit: u64) -> u64 {
    limit.clamp(1, MAX_PAGE_SIZE)
}

trait ApplyTxFilters: QueryFilter + Sized {
    fn apply_tx_filters(self, filter: &TransactionListFilter) -> Self;
}

impl<T> ApplyTxFilters for T
where
    T: QueryFilter + Sized,
{
    fn apply_tx_filters(mut self, filter: &TransactionListFilter) -> Self {
        if let Some(from) = filter.from {
            self = self.filter(transactions::Column::OccurredAt.gte(from));
        }
        if let Some(to) = filter.to {
            self = self.filter(transactions::Column::OccurredAt.lt(to));
        }
        if let Some(kind) = filter.kind {
            self = self.filter(transactions::Column::Kind.eq(kind.as_str()));
        }
        if let Some(category_id) = filter.category_id {
            self = self.filter(transactions::Column::CategoryId.eq(category_id));
        }
        self
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct TransactionsCursor {
    occurred_at: DateTime<Utc>,
    transaction_id: Uuid,
}

impl TransactionsCursor {
    fn encode(&self) -> ResultEngine<String> {
        let bytes = serde_json::to_vec(self)
            .map_err(|_| EngineError::InvalidCursor("invalid transactions cursor".to_string()))?;
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    fn decode(input: &str) -> ResultEngine<Self> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(input.as_bytes())
            .map_err(|_| EngineError::InvalidCursor("invalid transactions cursor".to_string()))?;
        serde_json::from_slice::<Self>(&bytes)
            .map_err(|_| EngineError::InvalidCursor("invalid transactions cursor".to_string()))
    }
}

impl Engine {
    /// Checks that an optional category belongs to the household.
    async fn require_optional_category(
        &self,
        db_tx: &DatabaseTransaction,
        household_id: Uuid,
        category_id: Option<Uuid>,
    ) -> ResultEngine<()> {
        if let Some(category_id) = category_id {
            self.require_category_in_household(db_tx, household_id, category_id)
                .await?;
        }
        Ok(())
    }

    /// Authors need `CreateReceipts` to change their own transaction; anybody
    /// else needs `ManageFinances`.
    async fn require_transaction_write(
        &self,
        db_tx: &DatabaseTransaction,
        household_id: Uuid,
        transaction_id: Uuid,
        user_id: Uuid,
    ) -> ResultEngine<transactions::Model> {
        let role = self
            .require_permission(db_tx, household_id, user_id, Permission::ViewReceipts)
            .await?;
        let model = self
            .require_transaction_in_household(db_tx, household_id, transaction_id)
            .await?;
        let needed = if model.created_by == user_id {
            Permission::CreateReceipts
        } else {
            Permission::ManageFinances
        };
        if !role.has(needed) {
            return Err(EngineError::Forbidden(
                "not allowed to modify this transaction".to_string(),
            ));
        }
        Ok(model)
    }

    /// Records an income or expense.
    pub async fn create_transaction(
        &self,
        household_id: Uuid,
        user_id: Uuid,
        input: NewTransaction,
    ) -> ResultEngine<Transaction> {
        let amount_minor = require_positive_amount(input.amount_minor, "amount_minor")?;
        let description = normalize_optional_text(input.description.as_deref());
        let merchant = normalize_optional_text(input.merchant.as_deref());
        let now = Utc::now();

        with_tx!(self, |db_tx| {
            self.require_permission(&db_tx, household_id, user_id, Permission::CreateReceipts)
                .await?;
            self.require_optional_category(&db_tx, household_id, input.category_id)
                .await?;

            let model = transactions::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4()),
                household_id: ActiveValue::Set(household_id),
                kind: ActiveValue::Set(input.kind.as_str().to_string()),
                amount_minor: ActiveValue::Set(amount_minor),
                occurred_at: ActiveValue::Set(input.occurred_at),
                category_id: ActiveValue::Set(input.category_id),
                description: ActiveValue::Set(description.clone()),
                merchant: ActiveValue::Set(merchant.clone()),
                created_by: ActiveValue::Set(user_id),
                created_at: ActiveValue::Set(now),
                updated_at: ActiveValue::Set(now),
            }
            .insert(&db_tx)
            .await?;

            tracing::debug!(%household_id, transaction_id = %model.id, "transaction created");
            Transaction::try_from(model)
        })
    }

    pub async fn transaction(
        &self,
        household_id: Uuid,
        transaction_id: Uuid,
        user_id: Uuid,
    ) -> ResultEngine<Transaction> {
        with_tx!(self, |db_tx| {
            self.require_permission(&db_tx, household_id, user_id, Permission::ViewReceipts)
                .await?;
            let model = self
                .require_transaction_in_household(&db_tx, household_id, transaction_id)
                .await?;
            Transaction::try_from(model)
        })
    }

    /// Lists a household's transactions, newest first, with cursor-based
    /// pagination.
    ///
    /// Pagination is newest → older by `(occurred_at DESC, id DESC)`.
    pub async fn list_transactions(
        &self,
        household_id: Uuid,
        user_id: Uuid,
        limit: u64,
        cursor: Option<&str>,
        filter: &TransactionListFilter,
    ) -> ResultEngine<(Vec<Transaction>, Option<String>)> {
        validate_list_filter(filter)?;
        let cursor = cursor.map(TransactionsCursor::decode).transpose()?;
        let limit = clamp_limit(limit);

        with_tx!(self, |db_tx| {
            self.require_permission(&db_tx, household_id, user_id, Permission::ViewReceipts)
                .await?;

            let mut query = transactions::Entity::find()
                .filter(transactions::Column::HouseholdId.eq(household_id))
                .order_by_desc(transactions::Column::OccurredAt)
                .order_by_desc(transactions::Column::Id)
                .limit(limit + 1);

            if let Some(cursor) = &cursor {
                query = query.filter(
                    Condition::any()
                        .add(transactions::Column::OccurredAt.lt(cursor.occurred_at))
                        .add(
                            Condition::all()
                                .add(transactions::Column::OccurredAt.eq(cursor.occurred_at))
                                .add(transactions::Column::Id.lt(cursor.transaction_id)),
                        ),
                );
            }
            query = query.apply_tx_filters(filter);

            let rows: Vec<transactions::Model> = query.all(&db_tx).await?;
            let has_more = rows.len() as u64 > limit;

            let out = rows
                .into_iter()
                .take(limit as usize)
                .map(Transaction::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;

            let next_cursor = if has_more {
                out.last()
                    .map(|tx| TransactionsCursor {
                        occurred_at: tx.occurred_at,
                        transaction_id: tx.id,
                    })
                    .map(|c| c.encode())
                    .transpose()?
            } else {
                None
            };

            Ok((out, next_cursor))
        })
    }

    /// Applies a partial update to a transaction.
    pub async fn update_transaction(
        &self,
        household_id: Uuid,
        transaction_id: Uuid,
        user_id: Uuid,
        changes: TransactionChanges,
    ) -> ResultEngine<Transaction> {
        if changes.is_empty() {
            return Err(EngineError::InvalidAmount(
                "provide at least one field to update".to_string(),
            ));
        }
        let amount_minor = changes
            .amount_minor
            .map(|v| require_positive_amount(v, "amount_minor"))
            .transpose()?;

        with_tx!(self, |db_tx| {
            let model = self
                .require_transaction_write(&db_tx, household_id, transaction_id, user_id)
                .await?;
            if let Some(category_id) = changes.category_id {
                self.require_optional_category(&db_tx, household_id, category_id)
                    .await?;
            }

            let mut active: transactions::ActiveModel = model.into();
            if let Some(kind) = changes.kind {
                active.kind = ActiveValue::Set(kind.as_str().to_string());
            }
            if let Some(amount_minor) = amount_minor {
                active.amount_minor = ActiveValue::Set(amount_minor);
            }
            if let Some(occurred_at) = changes.occurred_at {
                active.occurred_at = ActiveValue::Set(occurred_at);
            }
            if let Some(category_id) = changes.category_id {
                active.category_id = ActiveValue::Set(category_id);
            }
            if let Some(description) = changes.description.as_deref() {
                active.description = ActiveValue::Set(normalize_optional_text(Some(description)));
            }
            if let Some(merchant) = changes.merchant.as_deref() {
                active.merchant = ActiveValue::Set(normalize_optional_text(Some(merchant)));
            }
            active.updated_at = ActiveValue::Set(Utc::now());

            let model = active.update(&db_tx).await?;
            Transaction::try_from(model)
        })
    }

    pub async fn delete_transaction(
        &self,
        household_id: Uuid,
        transaction_id: Uuid,
        user_id: Uuid,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_transaction_write(&db_tx, household_id, transaction_id, user_id)
                .await?;
            transactions::Entity::delete_by_id(model.id)
                .exec(&db_tx)
                .await?;
            Ok(())
        })
    }

    /// Households the user may read receipts from.
    ///
    /// With an explicit scope every listed household must be viewable,
    /// otherwise the call is `Forbidden`; without one, all active memberships
    /// are used.
    pub(super) async fn viewable_households(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: Uuid,
        scope: Option<&[Uuid]>,
    ) -> ResultEngine<Vec<Uuid>> {
        match scope {
            Some(ids) => {
                for household_id in ids {
                    self.require_permission(db_tx, *household_id, user_id, Permission::ViewReceipts)
                        .await?;
                }
                Ok(ids.to_vec())
            }
            None => {
                let rows = household_members::Entity::find()
                    .filter(household_members::Column::UserId.eq(user_id))
                    .filter(household_members::Column::Active.eq(true))
                    .all(db_tx)
                    .await?;
                let mut ids = Vec::with_capacity(rows.len());
                for row in rows {
                    if Role::try_from(row.role.as_str())?.has(Permission::ViewReceipts) {
                        ids.push(row.household_id);
                    }
                }
                Ok(ids)
            }
        }
    }

    /// Expenses across the user's households, newest first.
    pub async fn list_receipts(
        &self,
        user_id: Uuid,
        scope: Option<&[Uuid]>,
        limit: u64,
    ) -> ResultEngine<Vec<Transaction>> {
        let limit = clamp_limit(limit);
        with_tx!(self, |db_tx| {
            let households = self.viewable_households(&db_tx, user_id, scope).await?;
            if households.is_empty() {
                return Ok(Vec::new());
            }
            let rows = transactions::Entity::find()
                .filter(transactions::Column::HouseholdId.is_in(households))
                .filter(transactions::Column::Kind.eq(TransactionKind::Expense.as_str()))
                .order_by_desc(transactions::Column::OccurredAt)
                .order_by_desc(transactions::Column::Id)
                .limit(limit)
                .all(&db_tx)
                .await?;
            rows.into_iter().map(Transaction::try_from).collect()
        })
    }

    /// A single receipt by id, if it lives in a household the user can view.
    ///
    /// Receipts outside the caller's households are reported as missing.
    pub async fn receipt(&self, receipt_id: Uuid, user_id: Uuid) -> ResultEngine<Transaction> {
        with_tx!(self, |db_tx| {
            let not_found = || EngineError::KeyNotFound("receipt not exists".to_string());
            let model = transactions::Entity::find_by_id(receipt_id)
                .filter(transactions::Column::Kind.eq(TransactionKind::Expense.as_str()))
                .one(&db_tx)
                .await?
                .ok_or_else(not_found)?;
            let visible = self
                .active_role(&db_tx, model.household_id, user_id)
                .await?
                .is_some_and(|role| role.has(Permission::ViewReceipts));
            if !visible {
                return Err(not_found());
            }
            Transaction::try_from(model)
        })
    }

    /// Expenses of a household inside `[from, to)`; used by reports and
    /// budget progress.
    pub(super) async fn expenses_between(
        &self,
        db_tx: &DatabaseTransaction,
        household_id: Uuid,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        category_id: Option<Uuid>,
    ) -> ResultEngine<Vec<Transaction>> {
        let filter = TransactionListFilter {
            from,
            to,
            kind: Some(TransactionKind::Expense),
            category_id,
        };
        self.transactions_between(db_tx, household_id, &filter).await
    }

    pub(super) async fn transactions_between(
        &self,
        db_tx: &DatabaseTransaction,
        household_id: Uuid,
        filter: &TransactionListFilter,
    ) -> ResultEngine<Vec<Transaction>> {
        validate_list_filter(filter)?;
        let rows = transactions::Entity::find()
            .filter(transactions::Column::HouseholdId.eq(household_id))
            .apply_tx_filters(filter)
            .all(db_tx)
            .await?;
        rows.into_iter().map(Transaction::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_survives_encoding() {
        let cursor = TransactionsCursor {
            occurred_at: Utc::now(),
            transaction_id: Uuid::new_v4(),
        };
        let decoded = TransactionsCursor::decode(&cursor.encode().unwrap()).unwrap();
        assert_eq!(decoded.occurred_at, cursor.occurred_at);
        assert_eq!(decoded.transaction_id, cursor.transaction_id);
    }

    #[test]
    fn garbage_cursor_is_rejected() {
        assert!(matches!(
            TransactionsCursor::decode("not-a-cursor!"),
            Err(EngineError::InvalidCursor(_))
        ));
    }

    #[test]
    fn limit_is_clamped() {
        assert_eq!(clamp_limit(0), 1);
        assert_eq!(clamp_limit(50), 50);
        assert_eq!(clamp_limit(10_000), MAX_PAGE_SIZE);
    }

    #[test]
    fn inverted_range_is_rejected() {
        let now = Utc::now();
        let filter = TransactionListFilter {
            from: Some(now),
            to: Some(now),
            ..Default::default()
        };
        assert!(validate_list_filter(&filter).is_err());
    }
}
