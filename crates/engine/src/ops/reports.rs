use chrono::{DateTime, Utc};
use sea_orm::{QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    Category, Permission, ResultEngine, Summary, categories, reports::summarize,
};

use super::{Engine, TransactionListFilter, with_tx};

impl Engine {
    /// Income/expense totals of a household over `[from, to)`.
    pub async fn household_summary(
        &self,
        household_id: Uuid,
        user_id: Uuid,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> ResultEngine<Summary> {
        let filter = TransactionListFilter {
            from,
            to,
            ..Default::default()
        };

        with_tx!(self, |db_tx| {
            let (household, _) = self
                .require_household_with(&db_tx, household_id, user_id, Permission::ViewReceipts)
                .await?;
            let transactions = self
                .transactions_between(&db_tx, household_id, &filter)
                .await?;
            let categories: Vec<Category> = categories::Entity::find()
                .filter(categories::Column::HouseholdId.eq(household_id))
                .order_by_asc(categories::Column::NameNorm)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Category::from)
                .collect();

            Ok(summarize(
                household_id,
                household.currency,
                &transactions,
                &categories,
            ))
        })
    }
}
