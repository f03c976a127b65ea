use chrono::Duration;
use sea_orm::DatabaseConnection;

use crate::ResultEngine;

mod access;
mod budgets;
mod categories;
mod households;
mod invitations;
mod members;
mod reports;
mod transactions;
mod users;

pub use categories::{CategoryChanges, NewCategory};
pub use transactions::TransactionListFilter;

/// Default lifetime of an invitation.
pub const DEFAULT_INVITATION_TTL_DAYS: i64 = 7;

/// Longest accepted invitation lifetime.
pub const MAX_INVITATION_TTL_DAYS: i64 = 3650;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    invitation_ttl: Duration,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn invitation_ttl(&self) -> Duration {
        self.invitation_ttl
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    invitation_ttl: Option<Duration>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// How long an invitation stays acceptable (default: 7 days).
    pub fn invitation_ttl(mut self, ttl: Duration) -> EngineBuilder {
        self.invitation_ttl = Some(ttl);
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        let invitation_ttl = self
            .invitation_ttl
            .unwrap_or_else(|| Duration::days(DEFAULT_INVITATION_TTL_DAYS));
        if invitation_ttl <= Duration::zero() {
            return Err(crate::EngineError::InvalidDate(
                "invitation ttl must be positive".to_string(),
            ));
        }
        if invitation_ttl > Duration::days(MAX_INVITATION_TTL_DAYS) {
            return Err(crate::EngineError::InvalidDate(format!(
                "invitation ttl must be at most {MAX_INVITATION_TTL_DAYS} days"
            )));
        }
        Ok(Engine {
            database: self.database,
            invitation_ttl,
        })
    }
}
