use chrono::{NaiveDate, TimeZone, Utc};
use engine::{
    BudgetChanges, BudgetPeriod, Engine, EngineError, NewBudget, NewCategory, NewTransaction,
    Role, TransactionKind, User,
};
use migration::MigratorTrait;
use sea_orm::Database;

async fn engine_with_db() -> Engine {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    Engine::builder().database(db).build().await.unwrap()
}

async fn user(engine: &Engine, email: &str) -> User {
    engine.create_user(email, email).await.unwrap().0
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn tx_on(
    kind: TransactionKind,
    amount_minor: i64,
    day: NaiveDate,
    category_id: Option<uuid::Uuid>,
) -> NewTransaction {
    NewTransaction {
        kind,
        amount_minor,
        occurred_at: Utc
            .from_utc_datetime(&day.and_hms_opt(10, 30, 0).unwrap()),
        category_id,
        description: None,
        merchant: None,
    }
}

#[tokio::test]
async fn monthly_budget_progress_counts_only_window_and_category() {
    let engine = engine_with_db().await;
    let owner = user(&engine, "owner@example.com").await;
    let home = engine
        .create_household(owner.id, "Home", None, None)
        .await
        .unwrap();
    let food = engine
        .create_category(
            home.id,
            NewCategory {
                name: "Food".to_string(),
                ..Default::default()
            },
            owner.id,
        )
        .await
        .unwrap();

    let budget = engine
        .create_budget(
            home.id,
            owner.id,
            NewBudget {
                name: "Groceries".to_string(),
                amount_minor: 40_000,
                period: BudgetPeriod::Monthly,
                start_date: date(2025, 1, 1),
                end_date: None,
                category_id: Some(food.id),
            },
        )
        .await
        .unwrap();

    for (amount, day, category) in [
        (10_000, date(2025, 2, 1), Some(food.id)),
        (5_000, date(2025, 2, 28), Some(food.id)),
        (7_000, date(2025, 2, 10), None),
        (9_999, date(2025, 3, 1), Some(food.id)),
    ] {
        engine
            .create_transaction(
                home.id,
                owner.id,
                tx_on(TransactionKind::Expense, amount, day, category),
            )
            .await
            .unwrap();
    }
    engine
        .create_transaction(
            home.id,
            owner.id,
            tx_on(TransactionKind::Income, 50_000, date(2025, 2, 5), Some(food.id)),
        )
        .await
        .unwrap();

    let progress = engine
        .budget_progress(budget.id, owner.id, date(2025, 2, 14))
        .await
        .unwrap();
    assert_eq!(progress.window_start, date(2025, 2, 1));
    assert_eq!(progress.window_end, date(2025, 2, 28));
    assert_eq!(progress.spent_minor, 15_000);
    assert_eq!(progress.remaining_minor, 25_000);
    assert_eq!(progress.percentage, 37.5);

    assert!(matches!(
        engine
            .budget_progress(budget.id, owner.id, date(2024, 12, 31))
            .await,
        Err(EngineError::InvalidDate(_))
    ));
}

#[tokio::test]
async fn budget_validation_and_permissions() {
    let engine = engine_with_db().await;
    let owner = user(&engine, "owner@example.com").await;
    let member = user(&engine, "member@example.com").await;
    let home = engine
        .create_household(owner.id, "Home", None, None)
        .await
        .unwrap();
    let inv = engine
        .create_invitation(home.id, &member.email, Role::Member, owner.id)
        .await
        .unwrap();
    engine.accept_invitation(inv.id, member.id).await.unwrap();

    let custom = NewBudget {
        name: "Holiday".to_string(),
        amount_minor: 100_000,
        period: BudgetPeriod::Custom,
        start_date: date(2025, 6, 1),
        end_date: None,
        category_id: None,
    };
    assert!(matches!(
        engine.create_budget(home.id, owner.id, custom.clone()).await,
        Err(EngineError::InvalidDate(_))
    ));

    let custom = NewBudget {
        end_date: Some(date(2025, 8, 31)),
        ..custom
    };
    assert!(matches!(
        engine.create_budget(home.id, member.id, custom.clone()).await,
        Err(EngineError::Forbidden(_))
    ));
    let budget = engine.create_budget(home.id, owner.id, custom).await.unwrap();

    // Members can read budgets but not change them.
    assert_eq!(engine.budget(budget.id, member.id).await.unwrap().id, budget.id);
    assert_eq!(engine.list_budgets(member.id, None).await.unwrap().len(), 1);
    assert!(matches!(
        engine.delete_budget(budget.id, member.id).await,
        Err(EngineError::Forbidden(_))
    ));

    assert!(matches!(
        engine
            .update_budget(
                budget.id,
                owner.id,
                BudgetChanges {
                    end_date: Some(date(2025, 5, 1)),
                    ..Default::default()
                },
            )
            .await,
        Err(EngineError::InvalidDate(_))
    ));
    let updated = engine
        .update_budget(
            budget.id,
            owner.id,
            BudgetChanges {
                amount_minor: Some(120_000),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.amount_minor, 120_000);

    engine.delete_budget(budget.id, owner.id).await.unwrap();
    assert!(matches!(
        engine.budget(budget.id, owner.id).await,
        Err(EngineError::KeyNotFound(_))
    ));
}

#[tokio::test]
async fn summary_breaks_expenses_down_by_category() {
    let engine = engine_with_db().await;
    let owner = user(&engine, "owner@example.com").await;
    let home = engine
        .create_household(owner.id, "Home", None, None)
        .await
        .unwrap();
    let rent = engine
        .create_category(
            home.id,
            NewCategory {
                name: "Rent".to_string(),
                monthly_budget_minor: Some(120_000),
                ..Default::default()
            },
            owner.id,
        )
        .await
        .unwrap();
    let food = engine
        .create_category(
            home.id,
            NewCategory {
                name: "Food".to_string(),
                ..Default::default()
            },
            owner.id,
        )
        .await
        .unwrap();

    let day = date(2025, 4, 10);
    for new in [
        tx_on(TransactionKind::Income, 300_000, day, None),
        tx_on(TransactionKind::Expense, 100_000, day, Some(rent.id)),
        tx_on(TransactionKind::Expense, 25_000, day, Some(food.id)),
        tx_on(TransactionKind::Expense, 25_000, day, None),
        tx_on(TransactionKind::Expense, 99_999, date(2025, 5, 1), Some(food.id)),
    ] {
        engine
            .create_transaction(home.id, owner.id, new)
            .await
            .unwrap();
    }

    let from = Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap();
    let to = Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap();
    let summary = engine
        .household_summary(home.id, owner.id, Some(from), Some(to))
        .await
        .unwrap();

    assert_eq!(summary.total_income_minor, 300_000);
    assert_eq!(summary.total_expenses_minor, 150_000);
    assert_eq!(summary.net_minor, 150_000);
    assert_eq!(summary.by_category.len(), 3);
    assert_eq!(summary.by_category[0].category_id, Some(rent.id));
    assert_eq!(summary.by_category[0].percentage, 66.67);
    assert_eq!(summary.by_category[0].monthly_budget_minor, Some(120_000));

    let total: f64 = summary.by_category.iter().map(|c| c.percentage).sum();
    assert!((total - 100.0).abs() < 0.05);

    assert!(matches!(
        engine
            .household_summary(home.id, owner.id, Some(to), Some(from))
            .await,
        Err(EngineError::InvalidDate(_))
    ));
}
