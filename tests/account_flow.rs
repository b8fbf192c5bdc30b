mod common;

use chrono::Local;
use common::*;
use tokenseq::application_port::*;
use tokenseq::domain_model::*;

#[tokio::test]
async fn register_mints_todays_sequence() {
    let s = stack();
    let ctx = OpContext::background();

    let first = s.accounts.register(&ctx).await.unwrap();
    let second = s.accounts.register(&ctx).await.unwrap();

    let today = day_stamp(Local::now().date_naive());
    assert_eq!(first.as_str(), format!("{today}00000001"));
    assert_eq!(second.as_str(), format!("{today}00000002"));
}

#[tokio::test]
async fn login_authenticate_logout() {
    let s = stack();
    let ctx = OpContext::background();
    let subject = SubjectId::from("u1");

    let details = s.accounts.login(&ctx, &subject).await.unwrap();
    assert!(details.is_well_formed());

    let access = s
        .accounts
        .authenticate(&ctx, &details.access_token)
        .await
        .unwrap();
    assert_eq!(access.subject_id, subject);
    assert_eq!(access.refresh_id, details.refresh_id);

    s.accounts.logout(&ctx, &details.access_token).await.unwrap();
    assert_eq!(s.store.peek(&details.refresh_id), None);

    assert!(matches!(
        s.accounts.authenticate(&ctx, &details.access_token).await,
        Err(AccountError::Unauthorized)
    ));
    assert!(matches!(
        s.accounts.logout(&ctx, &details.access_token).await,
        Err(AccountError::Unauthorized)
    ));
}

#[tokio::test]
async fn refresh_rotates_the_pair_once() {
    let s = stack();
    let ctx = OpContext::background();
    let subject = SubjectId::from("u1");
    let details = s.accounts.login(&ctx, &subject).await.unwrap();

    let rotated = s
        .accounts
        .refresh(&ctx, &details.refresh_token)
        .await
        .unwrap();
    assert_ne!(rotated.refresh_id, details.refresh_id);
    assert_eq!(
        s.accounts
            .authenticate(&ctx, &rotated.access_token)
            .await
            .unwrap()
            .subject_id,
        subject
    );

    assert!(matches!(
        s.accounts.refresh(&ctx, &details.refresh_token).await,
        Err(AccountError::Unauthorized)
    ));
}

#[tokio::test]
async fn forged_subject_is_unauthorized() {
    let s = stack();
    let ctx = OpContext::background();
    let details = s.accounts.login(&ctx, &SubjectId::from("u1")).await.unwrap();

    let forged = details.access_token.replace(":u1", ":admin");
    assert!(matches!(
        s.accounts.authenticate(&ctx, &forged).await,
        Err(AccountError::Unauthorized)
    ));
}

#[tokio::test]
async fn garbage_token_is_unauthorized() {
    let s = stack();
    assert!(matches!(
        s.accounts
            .authenticate(&OpContext::background(), "not-a-token")
            .await,
        Err(AccountError::Unauthorized)
    ));
}

#[tokio::test]
async fn store_outage_surfaces_as_internal() {
    let s = stack();
    let ctx = OpContext::background();
    let details = s.accounts.login(&ctx, &SubjectId::from("u1")).await.unwrap();
    s.store.set_available(false);

    assert!(matches!(
        s.accounts.authenticate(&ctx, &details.access_token).await,
        Err(AccountError::Internal)
    ));
    assert!(matches!(
        s.accounts.register(&ctx).await,
        Err(AccountError::Internal)
    ));
    assert!(matches!(
        s.accounts.login(&ctx, &SubjectId::from("u2")).await,
        Err(AccountError::Internal)
    ));
}

#[test]
fn refresh_ttl_must_exceed_access_ttl() {
    use std::time::Duration;
    use tokenseq::application_impl::AccountConfig;

    assert!(AccountConfig::new(Duration::from_secs(60), Duration::from_secs(60)).is_err());
    assert!(AccountConfig::new(Duration::ZERO, Duration::from_secs(60)).is_err());
    assert!(AccountConfig::new(Duration::from_secs(60), Duration::from_secs(61)).is_ok());
}
