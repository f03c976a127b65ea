use chrono::{Duration, TimeZone, Utc};
use engine::{
    Engine, EngineError, Household, NewCategory, NewTransaction, Role, TransactionChanges,
    TransactionKind, TransactionListFilter, User,
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

async fn join(engine: &Engine, household: &Household, owner: &User, who: &User, role: Role) {
    let inv = engine
        .create_invitation(household.id, &who.email, role, owner.id)
        .await
        .unwrap();
    engine.accept_invitation(inv.id, who.id).await.unwrap();
}

fn expense(amount_minor: i64) -> NewTransaction {
    NewTransaction {
        kind: TransactionKind::Expense,
        amount_minor,
        occurred_at: Utc::now(),
        category_id: None,
        description: None,
        merchant: None,
    }
}

#[tokio::test]
async fn create_transaction_validates_amount_and_category() {
    let engine = engine_with_db().await;
    let owner = user(&engine, "owner@example.com").await;
    let home = engine
        .create_household(owner.id, "Home", None, None)
        .await
        .unwrap();
    let other = engine
        .create_household(owner.id, "Other", None, None)
        .await
        .unwrap();
    let foreign = engine
        .create_category(
            other.id,
            NewCategory {
                name: "Food".to_string(),
                ..Default::default()
            },
            owner.id,
        )
        .await
        .unwrap();

    let err = engine
        .create_transaction(home.id, owner.id, expense(0))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let err = engine
        .create_transaction(
            home.id,
            owner.id,
            NewTransaction {
                category_id: Some(foreign.id),
                ..expense(100)
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    let tx = engine
        .create_transaction(
            home.id,
            owner.id,
            NewTransaction {
                merchant: Some("  Migros ".to_string()),
                description: Some("   ".to_string()),
                ..expense(1250)
            },
        )
        .await
        .unwrap();
    assert_eq!(tx.merchant.as_deref(), Some("Migros"));
    assert_eq!(tx.description, None);
    assert_eq!(tx.created_by, owner.id);
}

#[tokio::test]
async fn viewer_cannot_record_transactions() {
    let engine = engine_with_db().await;
    let owner = user(&engine, "owner@example.com").await;
    let viewer = user(&engine, "viewer@example.com").await;
    let home = engine
        .create_household(owner.id, "Home", None, None)
        .await
        .unwrap();
    join(&engine, &home, &owner, &viewer, Role::Viewer).await;

    let err = engine
        .create_transaction(home.id, viewer.id, expense(100))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[tokio::test]
async fn members_edit_only_their_own_transactions() {
    let engine = engine_with_db().await;
    let owner = user(&engine, "owner@example.com").await;
    let admin = user(&engine, "admin@example.com").await;
    let alice = user(&engine, "alice@example.com").await;
    let bob = user(&engine, "bob@example.com").await;
    let home = engine
        .create_household(owner.id, "Home", None, None)
        .await
        .unwrap();
    join(&engine, &home, &owner, &admin, Role::Admin).await;
    join(&engine, &home, &owner, &alice, Role::Member).await;
    join(&engine, &home, &owner, &bob, Role::Member).await;

    let tx = engine
        .create_transaction(home.id, alice.id, expense(500))
        .await
        .unwrap();

    let changes = TransactionChanges {
        amount_minor: Some(700),
        ..Default::default()
    };
    let edited = engine
        .update_transaction(home.id, tx.id, alice.id, changes.clone())
        .await
        .unwrap();
    assert_eq!(edited.amount_minor, 700);

    let err = engine
        .update_transaction(home.id, tx.id, bob.id, changes.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
    assert!(matches!(
        engine.delete_transaction(home.id, tx.id, bob.id).await,
        Err(EngineError::Forbidden(_))
    ));

    let edited = engine
        .update_transaction(
            home.id,
            tx.id,
            admin.id,
            TransactionChanges {
                kind: Some(TransactionKind::Income),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(edited.kind, TransactionKind::Income);

    engine.delete_transaction(home.id, tx.id, admin.id).await.unwrap();
    assert!(matches!(
        engine.transaction(home.id, tx.id, owner.id).await,
        Err(EngineError::KeyNotFound(_))
    ));
}

#[tokio::test]
async fn list_transactions_paginates_newest_first() {
    let engine = engine_with_db().await;
    let owner = user(&engine, "owner@example.com").await;
    let home = engine
        .create_household(owner.id, "Home", None, None)
        .await
        .unwrap();

    let base = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
    for i in 0..5 {
        engine
            .create_transaction(
                home.id,
                owner.id,
                NewTransaction {
                    occurred_at: base + Duration::days(i),
                    ..expense(100 + i)
                },
            )
            .await
            .unwrap();
    }

    let filter = TransactionListFilter::default();
    let (page1, cursor) = engine
        .list_transactions(home.id, owner.id, 2, None, &filter)
        .await
        .unwrap();
    assert_eq!(
        page1.iter().map(|t| t.amount_minor).collect::<Vec<_>>(),
        vec![104, 103]
    );
    let cursor = cursor.unwrap();

    let (page2, cursor) = engine
        .list_transactions(home.id, owner.id, 2, Some(&cursor), &filter)
        .await
        .unwrap();
    assert_eq!(
        page2.iter().map(|t| t.amount_minor).collect::<Vec<_>>(),
        vec![102, 101]
    );

    let (page3, cursor) = engine
        .list_transactions(home.id, owner.id, 2, cursor.as_deref(), &filter)
        .await
        .unwrap();
    assert_eq!(page3.len(), 1);
    assert!(cursor.is_none());

    let ranged = TransactionListFilter {
        from: Some(base + Duration::days(1)),
        to: Some(base + Duration::days(3)),
        ..Default::default()
    };
    let (rows, _) = engine
        .list_transactions(home.id, owner.id, 50, None, &ranged)
        .await
        .unwrap();
    assert_eq!(
        rows.iter().map(|t| t.amount_minor).collect::<Vec<_>>(),
        vec![102, 101]
    );

    assert!(matches!(
        engine
            .list_transactions(home.id, owner.id, 2, Some("garbage"), &filter)
            .await,
        Err(EngineError::InvalidCursor(_))
    ));
}

#[tokio::test]
async fn receipts_span_households_and_respect_scope() {
    let engine = engine_with_db().await;
    let alice = user(&engine, "alice@example.com").await;
    let bob = user(&engine, "bob@example.com").await;
    let home = engine
        .create_household(alice.id, "Home", None, None)
        .await
        .unwrap();
    let office = engine
        .create_household(alice.id, "Office", None, None)
        .await
        .unwrap();
    let bobs = engine
        .create_household(bob.id, "Bob's", None, None)
        .await
        .unwrap();

    let r1 = engine
        .create_transaction(home.id, alice.id, expense(100))
        .await
        .unwrap();
    engine
        .create_transaction(office.id, alice.id, expense(200))
        .await
        .unwrap();
    engine
        .create_transaction(
            office.id,
            alice.id,
            NewTransaction {
                kind: TransactionKind::Income,
                ..expense(900)
            },
        )
        .await
        .unwrap();
    let foreign = engine
        .create_transaction(bobs.id, bob.id, expense(300))
        .await
        .unwrap();

    let all = engine.list_receipts(alice.id, None, 50).await.unwrap();
    assert_eq!(all.len(), 2);
    assert!(all.iter().all(|t| t.kind == TransactionKind::Expense));

    let scoped = engine
        .list_receipts(alice.id, Some([home.id].as_slice()), 50)
        .await
        .unwrap();
    assert_eq!(scoped.len(), 1);
    assert_eq!(scoped[0].id, r1.id);

    assert!(matches!(
        engine
            .list_receipts(alice.id, Some([home.id, bobs.id].as_slice()), 50)
            .await,
        Err(EngineError::Forbidden(_))
    ));

    assert_eq!(engine.receipt(r1.id, alice.id).await.unwrap().id, r1.id);
    assert!(matches!(
        engine.receipt(foreign.id, alice.id).await,
        Err(EngineError::KeyNotFound(_))
    ));
}

#[tokio::test]
async fn deleting_category_uncategorizes_transactions() {
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
                color: Some("#aabbcc".to_string()),
                ..Default::default()
            },
            owner.id,
        )
        .await
        .unwrap();
    assert_eq!(food.color.as_deref(), Some("#AABBCC"));

    let err = engine
        .create_category(
            home.id,
            NewCategory {
                name: "  FOOD ".to_string(),
                ..Default::default()
            },
            owner.id,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));

    let tx = engine
        .create_transaction(
            home.id,
            owner.id,
            NewTransaction {
                category_id: Some(food.id),
                ..expense(100)
            },
        )
        .await
        .unwrap();

    engine.delete_category(home.id, food.id, owner.id).await.unwrap();
    let tx = engine.transaction(home.id, tx.id, owner.id).await.unwrap();
    assert_eq!(tx.category_id, None);
    assert!(engine.list_categories(home.id, owner.id).await.unwrap().is_empty());
}
