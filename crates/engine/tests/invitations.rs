use chrono::Duration;
use engine::{Engine, EngineError, Role, User};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};

async fn connect() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    db
}

async fn engine_with_db() -> Engine {
    Engine::builder().database(connect().await).build().await.unwrap()
}

async fn user(engine: &Engine, email: &str) -> User {
    engine.create_user(email, email).await.unwrap().0
}

#[tokio::test]
async fn duplicate_and_member_invitations_conflict() {
    let engine = engine_with_db().await;
    let owner = user(&engine, "owner@example.com").await;
    let bob = user(&engine, "bob@example.com").await;
    let home = engine
        .create_household(owner.id, "Home", None, None)
        .await
        .unwrap();

    let inv = engine
        .create_invitation(home.id, "bob@example.com", Role::Member, owner.id)
        .await
        .unwrap();
    assert!(matches!(
        engine
            .create_invitation(home.id, " BOB@example.com", Role::Viewer, owner.id)
            .await,
        Err(EngineError::ExistingKey(_))
    ));

    engine.accept_invitation(inv.id, bob.id).await.unwrap();
    assert!(matches!(
        engine
            .create_invitation(home.id, "bob@example.com", Role::Member, owner.id)
            .await,
        Err(EngineError::ExistingKey(_))
    ));
    assert!(matches!(
        engine.accept_invitation(inv.id, bob.id).await,
        Err(EngineError::InvalidState(_))
    ));
    assert!(matches!(
        engine
            .create_invitation(home.id, "carol@example.com", Role::Owner, owner.id)
            .await,
        Err(EngineError::InvalidRole(_))
    ));
}

#[tokio::test]
async fn only_the_invitee_can_answer() {
    let engine = engine_with_db().await;
    let owner = user(&engine, "owner@example.com").await;
    let bob = user(&engine, "bob@example.com").await;
    let eve = user(&engine, "eve@example.com").await;
    let home = engine
        .create_household(owner.id, "Home", None, None)
        .await
        .unwrap();
    let inv = engine
        .create_invitation(home.id, &bob.email, Role::Member, owner.id)
        .await
        .unwrap();

    assert!(matches!(
        engine.accept_invitation(inv.id, eve.id).await,
        Err(EngineError::Forbidden(_))
    ));
    assert_eq!(engine.list_my_invitations(bob.id).await.unwrap().len(), 1);
    assert!(engine.list_my_invitations(eve.id).await.unwrap().is_empty());

    engine.decline_invitation(inv.id, bob.id).await.unwrap();
    assert!(engine.list_my_invitations(bob.id).await.unwrap().is_empty());
    assert!(matches!(
        engine.accept_invitation(inv.id, bob.id).await,
        Err(EngineError::InvalidState(_))
    ));
    assert_eq!(engine.member_role(home.id, bob.id).await.unwrap(), None);
}

#[tokio::test]
async fn expired_invitation_cannot_be_accepted() {
    let engine = Engine::builder()
        .database(connect().await)
        .invitation_ttl(Duration::milliseconds(1))
        .build()
        .await
        .unwrap();
    let owner = user(&engine, "owner@example.com").await;
    let bob = user(&engine, "bob@example.com").await;
    let home = engine
        .create_household(owner.id, "Home", None, None)
        .await
        .unwrap();
    let inv = engine
        .create_invitation(home.id, &bob.email, Role::Member, owner.id)
        .await
        .unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert!(matches!(
        engine.accept_invitation(inv.id, bob.id).await,
        Err(EngineError::Expired(_))
    ));
}

#[tokio::test]
async fn zero_ttl_is_rejected() {
    let err = Engine::builder()
        .database(connect().await)
        .invitation_ttl(Duration::zero())
        .build()
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidDate(_)));
}

#[tokio::test]
async fn oversized_ttl_is_rejected() {
    let err = Engine::builder()
        .database(connect().await)
        .invitation_ttl(Duration::days(200_000_000))
        .build()
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidDate(_)));
}

#[tokio::test]
async fn longest_ttl_still_creates_invitations() {
    let engine = Engine::builder()
        .database(connect().await)
        .invitation_ttl(Duration::days(3650))
        .build()
        .await
        .unwrap();
    let owner = user(&engine, "owner@example.com").await;
    let home = engine
        .create_household(owner.id, "Home", None, None)
        .await
        .unwrap();
    let inv = engine
        .create_invitation(home.id, "bob@example.com", Role::Member, owner.id)
        .await
        .unwrap();
    assert_eq!(inv.expires_at - inv.created_at, Duration::days(3650));
}

#[tokio::test]
async fn removed_member_rejoins_through_new_invitation() {
    let engine = engine_with_db().await;
    let owner = user(&engine, "owner@example.com").await;
    let bob = user(&engine, "bob@example.com").await;
    let home = engine
        .create_household(owner.id, "Home", None, None)
        .await
        .unwrap();
    let inv = engine
        .create_invitation(home.id, &bob.email, Role::Member, owner.id)
        .await
        .unwrap();
    engine.accept_invitation(inv.id, bob.id).await.unwrap();
    engine.remove_member(home.id, bob.id, owner.id).await.unwrap();

    let inv = engine
        .create_invitation(home.id, &bob.email, Role::Viewer, owner.id)
        .await
        .unwrap();
    assert_eq!(
        engine
            .list_household_invitations(home.id, owner.id)
            .await
            .unwrap()
            .len(),
        1
    );
    engine.accept_invitation(inv.id, bob.id).await.unwrap();
    assert_eq!(
        engine.member_role(home.id, bob.id).await.unwrap(),
        Some(Role::Viewer)
    );
}

#[tokio::test]
async fn revoke_removes_pending_invitation() {
    let engine = engine_with_db().await;
    let owner = user(&engine, "owner@example.com").await;
    let bob = user(&engine, "bob@example.com").await;
    let home = engine
        .create_household(owner.id, "Home", None, None)
        .await
        .unwrap();
    let inv = engine
        .create_invitation(home.id, &bob.email, Role::Member, owner.id)
        .await
        .unwrap();

    assert!(matches!(
        engine.revoke_invitation(inv.id, bob.id).await,
        Err(EngineError::Forbidden(_))
    ));
    engine.revoke_invitation(inv.id, owner.id).await.unwrap();
    assert!(matches!(
        engine.accept_invitation(inv.id, bob.id).await,
        Err(EngineError::KeyNotFound(_))
    ));
}

#[tokio::test]
async fn answered_invitation_cannot_be_revoked() {
    let engine = engine_with_db().await;
    let owner = user(&engine, "owner@example.com").await;
    let bob = user(&engine, "bob@example.com").await;
    let home = engine
        .create_household(owner.id, "Home", None, None)
        .await
        .unwrap();
    let inv = engine
        .create_invitation(home.id, &bob.email, Role::Member, owner.id)
        .await
        .unwrap();
    engine.decline_invitation(inv.id, bob.id).await.unwrap();

    assert!(matches!(
        engine.revoke_invitation(inv.id, owner.id).await,
        Err(EngineError::InvalidState(_))
    ));
}
