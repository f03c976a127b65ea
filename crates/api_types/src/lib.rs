use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Eur,
    Usd,
    Gbp,
    Chf,
}

pub mod user {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserView {
        pub id: Uuid,
        pub email: String,
        pub display_name: String,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserUpdate {
        pub display_name: String,
    }
}

pub mod membership {
    use super::*;

    /// Role of a user inside a household.
    ///
    /// - `owner`: everything, including household settings and deletion.
    /// - `admin`: manages categories, budgets, any transaction and members.
    /// - `member`: records transactions and edits their own.
    /// - `viewer`: read-only.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum MembershipRole {
        Owner,
        Admin,
        Member,
        Viewer,
    }

    /// Request body for changing a member's role.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberRoleUpdate {
        pub role: MembershipRole,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MembersResponse {
        pub members: Vec<MemberView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberView {
        pub user_id: Uuid,
        pub email: String,
        pub display_name: String,
        pub role: MembershipRole,
        pub joined_at: DateTime<Utc>,
    }
}

pub mod household {
    use super::*;
    use crate::membership::MembershipRole;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct HouseholdNew {
        pub name: String,
        pub currency: Option<Currency>,
        /// Free-form settings object. Defaults to `{}`.
        pub settings: Option<serde_json::Value>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct HouseholdUpdate {
        pub name: Option<String>,
        pub currency: Option<Currency>,
        pub settings: Option<serde_json::Value>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct HouseholdView {
        pub id: Uuid,
        pub name: String,
        pub currency: Currency,
        pub settings: serde_json::Value,
        pub created_by: Uuid,
        pub created_at: DateTime<Utc>,
        /// Role of the requesting user.
        pub role: MembershipRole,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct HouseholdListResponse {
        pub households: Vec<HouseholdView>,
    }
}

pub mod invitation {
    use super::*;
    use crate::membership::MembershipRole;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct InvitationNew {
        pub household_id: Uuid,
        pub email: String,
        pub role: MembershipRole,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct InvitationView {
        pub id: Uuid,
        pub household_id: Uuid,
        pub email: String,
        pub role: MembershipRole,
        pub invited_by: Uuid,
        pub created_at: DateTime<Utc>,
        pub expires_at: DateTime<Utc>,
        pub accepted: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct InvitationListResponse {
        pub invitations: Vec<InvitationView>,
    }
}

pub mod category {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryCreate {
        pub name: String,
        /// `#RRGGBB`.
        pub color: Option<String>,
        pub icon: Option<String>,
        pub monthly_budget_minor: Option<i64>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct CategoryUpdate {
        pub name: Option<String>,
        pub color: Option<String>,
        pub icon: Option<String>,
        pub monthly_budget_minor: Option<i64>,
        /// Removes the monthly budget. Ignored when `monthly_budget_minor` is set.
        #[serde(default)]
        pub clear_monthly_budget: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryView {
        pub id: Uuid,
        pub household_id: Uuid,
        pub name: String,
        pub color: Option<String>,
        pub icon: Option<String>,
        pub monthly_budget_minor: Option<i64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryListResponse {
        pub categories: Vec<CategoryView>,
    }
}

pub mod transaction {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionKind {
        Income,
        Expense,
    }

    /// Query string for listing a household's transactions.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionList {
        pub limit: Option<u64>,
        /// Opaque pagination cursor (base64), from `next_cursor`.
        ///
        /// Newest → older pagination.
        pub cursor: Option<String>,
        /// Inclusive lower bound.
        pub from: Option<DateTime<FixedOffset>>,
        /// Exclusive upper bound.
        pub to: Option<DateTime<FixedOffset>>,
        pub kind: Option<TransactionKind>,
        pub category_id: Option<Uuid>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionNew {
        pub kind: TransactionKind,
        /// Must be > 0. The kind defines the direction.
        pub amount_minor: i64,
        /// RFC3339 timestamp, including timezone offset (local user time).
        pub occurred_at: DateTime<FixedOffset>,
        pub category_id: Option<Uuid>,
        pub description: Option<String>,
        pub merchant: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionUpdate {
        pub kind: Option<TransactionKind>,
        pub amount_minor: Option<i64>,
        pub occurred_at: Option<DateTime<FixedOffset>>,
        pub category_id: Option<Uuid>,
        /// Detaches the transaction from its category.
        #[serde(default)]
        pub clear_category: bool,
        pub description: Option<String>,
        pub merchant: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: Uuid,
        pub household_id: Uuid,
        pub kind: TransactionKind,
        pub amount_minor: i64,
        pub occurred_at: DateTime<Utc>,
        pub category_id: Option<Uuid>,
        pub description: Option<String>,
        pub merchant: Option<String>,
        pub created_by: Uuid,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionListResponse {
        pub transactions: Vec<TransactionView>,
        /// Opaque cursor for fetching the next page (older items).
        pub next_cursor: Option<String>,
    }
}

pub mod receipt {
    use super::*;

    /// A receipt is an expense recorded against a household.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReceiptNew {
        pub household_id: Uuid,
        pub amount_minor: i64,
        pub occurred_at: DateTime<FixedOffset>,
        pub category_id: Option<Uuid>,
        pub description: Option<String>,
        pub merchant: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ReceiptList {
        pub limit: Option<u64>,
    }
}

pub mod budget {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum BudgetPeriod {
        Monthly,
        Yearly,
        Custom,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetNew {
        pub household_id: Uuid,
        pub name: String,
        pub amount_minor: i64,
        pub period: BudgetPeriod,
        pub start_date: NaiveDate,
        pub end_date: Option<NaiveDate>,
        pub category_id: Option<Uuid>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct BudgetUpdate {
        pub name: Option<String>,
        pub amount_minor: Option<i64>,
        pub period: Option<BudgetPeriod>,
        pub start_date: Option<NaiveDate>,
        pub end_date: Option<NaiveDate>,
        pub category_id: Option<Uuid>,
    }

    /// Query string for listing budgets when `x-household-ids` is absent.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct BudgetList {
        pub household_id: Option<Uuid>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetView {
        pub id: Uuid,
        pub household_id: Uuid,
        pub name: String,
        pub amount_minor: i64,
        pub period: BudgetPeriod,
        pub start_date: NaiveDate,
        pub end_date: Option<NaiveDate>,
        pub category_id: Option<Uuid>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetListResponse {
        pub budgets: Vec<BudgetView>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct BudgetProgressQuery {
        /// Reference day. Defaults to today (UTC).
        pub at: Option<NaiveDate>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetProgressView {
        pub budget_id: Uuid,
        pub window_start: NaiveDate,
        pub window_end: NaiveDate,
        pub amount_minor: i64,
        pub spent_minor: i64,
        pub remaining_minor: i64,
        pub percentage: f64,
    }
}

pub mod report {
    use super::*;

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct SummaryQuery {
        pub from: Option<DateTime<FixedOffset>>,
        pub to: Option<DateTime<FixedOffset>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryBreakdown {
        pub category_id: Option<Uuid>,
        pub name: Option<String>,
        pub total_minor: i64,
        pub percentage: f64,
        pub monthly_budget_minor: Option<i64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Summary {
        pub household_id: Uuid,
        pub currency: Currency,
        pub total_income_minor: i64,
        pub total_expenses_minor: i64,
        pub net_minor: i64,
        pub by_category: Vec<CategoryBreakdown>,
    }
}

/// Inputs of the `/trpc` procedures.
///
/// Household-scoped procedures carry the household id next to the same
/// payload the REST surface takes.
pub mod rpc {
    use super::*;
    use crate::{
        category::CategoryCreate,
        report::SummaryQuery,
        transaction::{TransactionList, TransactionNew},
    };

    #[derive(Debug, Serialize, Deserialize)]
    pub struct HouseholdRef {
        pub household_id: Uuid,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionListInput {
        pub household_id: Uuid,
        #[serde(flatten)]
        pub query: TransactionList,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionCreateInput {
        pub household_id: Uuid,
        #[serde(flatten)]
        pub transaction: TransactionNew,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryCreateInput {
        pub household_id: Uuid,
        #[serde(flatten)]
        pub category: CategoryCreate,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct BudgetListInput {
        pub household_ids: Option<Vec<Uuid>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SummaryInput {
        pub household_id: Uuid,
        #[serde(flatten)]
        pub query: SummaryQuery,
    }
}
