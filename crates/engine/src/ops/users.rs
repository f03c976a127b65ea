use chrono::Utc;
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, Household, ResultEngine, Role, User, household_members, households, users,
    util::{normalize_email, normalize_required_name},
};

use super::{Engine, with_tx};

impl Engine {
    /// Registers a user and issues their API token.
    ///
    /// Returns the user and the token; the token is only ever returned here.
    pub async fn create_user(&self, email: &str, display_name: &str) -> ResultEngine<(User, String)> {
        let email = normalize_email(email)?;
        let display_name = normalize_required_name(display_name, "display")?;

        with_tx!(self, |db_tx| {
            let exists = users::Entity::find()
                .filter(users::Column::Email.eq(email.clone()))
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::ExistingKey(email));
            }

            let token = format!("hl_{}", Uuid::new_v4().simple());
            let model = users::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4()),
                email: ActiveValue::Set(email.clone()),
                display_name: ActiveValue::Set(display_name),
                auth_token: ActiveValue::Set(token.clone()),
                created_at: ActiveValue::Set(Utc::now()),
            }
            .insert(&db_tx)
            .await?;

            tracing::info!(user_id = %model.id, "user created");
            Ok((User::from(model), token))
        })
    }

    /// Resolves a bearer token to its user.
    pub async fn user_by_token(&self, token: &str) -> ResultEngine<Option<User>> {
        if token.trim().is_empty() {
            return Ok(None);
        }
        let model = users::Entity::find()
            .filter(users::Column::AuthToken.eq(token.to_string()))
            .one(&self.database)
            .await?;
        Ok(model.map(User::from))
    }

    pub async fn user(&self, user_id: Uuid) -> ResultEngine<User> {
        users::Entity::find_by_id(user_id)
            .one(&self.database)
            .await?
            .map(User::from)
            .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))
    }

    pub async fn user_by_email(&self, email: &str) -> ResultEngine<User> {
        let email = normalize_email(email)?;
        users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.database)
            .await?
            .map(User::from)
            .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))
    }

    pub async fn update_user(&self, user_id: Uuid, display_name: &str) -> ResultEngine<User> {
        let display_name = normalize_required_name(display_name, "display")?;
        with_tx!(self, |db_tx| {
            let model = users::Entity::find_by_id(user_id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))?;
            let mut active: users::ActiveModel = model.into();
            active.display_name = ActiveValue::Set(display_name);
            let model = active.update(&db_tx).await?;
            Ok(User::from(model))
        })
    }

    /// Households where the user is an active member, with their role.
    pub async fn user_households(&self, user_id: Uuid) -> ResultEngine<Vec<(Household, Role)>> {
        with_tx!(self, |db_tx| {
            let rows = household_members::Entity::find()
                .filter(household_members::Column::UserId.eq(user_id))
                .filter(household_members::Column::Active.eq(true))
                .find_also_related(households::Entity)
                .order_by_asc(households::Column::Name)
                .all(&db_tx)
                .await?;

            let mut out = Vec::with_capacity(rows.len());
            for (membership, household) in rows {
                let Some(household) = household else {
                    continue;
                };
                out.push((
                    Household::try_from(household)?,
                    Role::try_from(membership.role.as_str())?,
                ));
            }
            Ok(out)
        })
    }
}
