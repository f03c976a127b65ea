//! Household budgeting engine.
//!
//! The [`Engine`] owns the database connection and exposes every household
//! operation. Each operation checks the caller's membership against the
//! static role table in [`access`] before touching any row, and runs inside a
//! single database transaction.

pub use access::{Permission, Role, has_permission};
pub use budgets::{Budget, BudgetChanges, BudgetPeriod, BudgetProgress, NewBudget};
pub use categories::Category;
pub use currency::Currency;
pub use error::EngineError;
pub use household_members::Member;
pub use households::Household;
pub use invitations::Invitation;
pub use ops::{CategoryChanges, Engine, EngineBuilder, NewCategory, TransactionListFilter};
pub use reports::{CategoryTotal, Summary};
pub use transactions::{NewTransaction, Transaction, TransactionChanges, TransactionKind};
pub use users::User;

pub mod access;
mod budgets;
mod categories;
mod currency;
mod error;
mod household_members;
mod households;
mod invitations;
mod ops;
pub mod reports;
mod transactions;
mod users;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
