use super::DatabaseService;
use crate::database::{DatabaseError, InviteStatus, INVITE_CODE_TTL_SECS};

async fn test_db() -> DatabaseService {
    DatabaseService::open_in_memory().await.unwrap()
}

#[tokio::test]
async fn test_create_and_get_invite_code() {
    let db = test_db().await;
    let created = db.create_invite_code("code-1", 42).await.unwrap();

    let invite = db.get_invite_code("code-1").await.unwrap();
    assert_eq!(invite, created);
    assert_eq!(invite.status, InviteStatus::Unused);
    assert_eq!(invite.creator, 42);
    assert_eq!(invite.expire_time, invite.create_time + INVITE_CODE_TTL_SECS);
}

#[tokio::test]
async fn test_duplicate_invite_code_is_rejected() {
    let db = test_db().await;
    db.create_invite_code("code-1", 42).await.unwrap();

    let err = db.create_invite_code("code-1", 7).await.unwrap_err();
    assert!(matches!(err, DatabaseError::DuplicateKey(_)), "{err:?}");
}

#[tokio::test]
async fn test_missing_invite_code_is_not_found() {
    let db = test_db().await;
    assert!(matches!(
        db.get_invite_code("nope").await,
        Err(DatabaseError::NotFound(_))
    ));
    assert!(matches!(
        db.set_invite_code_status("nope", InviteStatus::Deleted).await,
        Err(DatabaseError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_set_invite_code_status() {
    let db = test_db().await;
    db.create_invite_code("code-1", 42).await.unwrap();

    db.set_invite_code_status("code-1", InviteStatus::Expired)
        .await
        .unwrap();
    let invite = db.get_invite_code("code-1").await.unwrap();
    assert_eq!(invite.status, InviteStatus::Expired);
}

#[tokio::test]
async fn test_list_invite_codes_includes_every_status() {
    let db = test_db().await;
    db.create_invite_code_at("a", 1, 100).await.unwrap();
    db.create_invite_code_at("b", 1, 200).await.unwrap();
    db.create_invite_code_at("c", 2, 300).await.unwrap();
    db.set_invite_code_status("b", InviteStatus::Deleted)
        .await
        .unwrap();
    db.set_invite_code_status("c", InviteStatus::Expired)
        .await
        .unwrap();

    let codes: Vec<String> = db
        .list_invite_codes()
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.code)
        .collect();
    assert_eq!(codes, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_create_and_get_user() {
    let db = test_db().await;
    db.create_user("web-1", 1001, None).await.unwrap();

    let by_telegram = db.get_user_by_telegram_id(1001).await.unwrap();
    assert_eq!(by_telegram.id, "web-1");
    assert_eq!(by_telegram.invite_code, None);

    let by_id = db.get_user_by_user_id("web-1").await.unwrap();
    assert_eq!(by_id, by_telegram);

    assert!(matches!(
        db.get_user_by_telegram_id(2002).await,
        Err(DatabaseError::NotFound(_))
    ));
    assert!(matches!(
        db.get_user_by_user_id("web-2").await,
        Err(DatabaseError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_one_user_per_telegram_id() {
    let db = test_db().await;
    db.create_user("web-1", 1001, None).await.unwrap();

    let err = db.create_user("web-2", 1001, None).await.unwrap_err();
    assert!(matches!(err, DatabaseError::DuplicateKey(_)), "{err:?}");
}

#[tokio::test]
async fn test_duplicate_user_id_is_rejected() {
    let db = test_db().await;
    db.create_user("web-1", 1001, None).await.unwrap();

    let err = db.create_user("web-1", 2002, None).await.unwrap_err();
    assert!(matches!(err, DatabaseError::DuplicateKey(_)), "{err:?}");
    assert_eq!(db.get_user_by_user_id("web-1").await.unwrap().telegram_id, 1001);
}

#[tokio::test]
async fn test_delete_user_by_telegram_id() {
    let db = test_db().await;
    db.create_user("web-1", 1001, None).await.unwrap();

    db.delete_user_by_telegram_id(1001).await.unwrap();
    assert!(db.get_user_by_telegram_id(1001).await.is_err());
    assert!(matches!(
        db.delete_user_by_telegram_id(1001).await,
        Err(DatabaseError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_create_user_with_invite_marks_invite_used() {
    let db = test_db().await;
    db.create_invite_code("code-1", 42).await.unwrap();

    let user = db
        .create_user_with_invite("web-1", 1001, "code-1")
        .await
        .unwrap();
    assert_eq!(user.invite_code.as_deref(), Some("code-1"));

    let invite = db.get_invite_code("code-1").await.unwrap();
    assert_eq!(invite.status, InviteStatus::Used);
    assert_eq!(db.get_user_by_telegram_id(1001).await.unwrap(), user);
}

#[tokio::test]
async fn test_create_user_with_spent_invite_writes_nothing() {
    let db = test_db().await;
    db.create_invite_code("code-1", 42).await.unwrap();
    db.set_invite_code_status("code-1", InviteStatus::Deleted)
        .await
        .unwrap();

    let err = db
        .create_user_with_invite("web-1", 1001, "code-1")
        .await
        .unwrap_err();
    assert!(matches!(err, DatabaseError::Conflict(_)), "{err:?}");
    assert!(db.get_user_by_telegram_id(1001).await.is_err());
}

#[tokio::test]
async fn test_failed_user_insert_rolls_back_invite_status() {
    let db = test_db().await;
    db.create_invite_code("code-1", 42).await.unwrap();
    db.create_user("web-0", 1001, None).await.unwrap();

    let err = db
        .create_user_with_invite("web-1", 1001, "code-1")
        .await
        .unwrap_err();
    assert!(matches!(err, DatabaseError::DuplicateKey(_)), "{err:?}");

    let invite = db.get_invite_code("code-1").await.unwrap();
    assert_eq!(invite.status, InviteStatus::Unused);
}
