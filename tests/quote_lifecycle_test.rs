mod common;

use common::{customer, delhi_to_mumbai, staff, TestEnv};
use movers_backend::model::actor::Actor;
use movers_backend::model::quote::{PaymentMethod, PaymentStatus};
use movers_backend::model::quote_status::QuoteStatus;
use movers_backend::repository::quote_repo::QuoteRepository;
use movers_backend::service::feedback_service::FeedbackService;
use movers_backend::service::notification_service::LifecycleEvent;
use movers_backend::service::quote_service::QuoteService;
use movers_backend::util::error::ServiceError;

#[tokio::test]
async fn delhi_to_mumbai_move_runs_end_to_end() {
    let mut env = TestEnv::new();
    let ops = staff();

    // Anonymous visitor submits the request
    let quote = env
        .quotes
        .create_quote(delhi_to_mumbai("Asha@Example.com"), &Actor::Anonymous)
        .await
        .unwrap();
    assert!(quote.quote_id.starts_with("UP"));
    assert_eq!(quote.quote_id.len(), 10);
    assert!(quote.quote_id[2..].chars().all(|c| c.is_ascii_digit()));
    assert_eq!(quote.status, QuoteStatus::Pending);
    assert_eq!(quote.user, None);
    assert_eq!(quote.email, "asha@example.com");
    assert!(matches!(env.next_event().await, LifecycleEvent::QuoteSubmitted { .. }));

    let quoted = env
        .quotes
        .set_price(&quote.quote_id, 15_000.0, Some("Two trucks".to_string()), &ops)
        .await
        .unwrap();
    assert_eq!(quoted.status, QuoteStatus::Quoted);
    assert_eq!(quoted.estimated_cost, Some(15_000.0));
    assert!(quoted.quoted_at.is_some());
    assert!(matches!(env.next_event().await, LifecycleEvent::QuotePriced { .. }));

    // The visitor signs up with the same email and claims the quote
    let asha = customer("asha@example.com");
    assert_eq!(env.quotes.claim(&asha).await.unwrap(), 1);
    let mine = env.quotes.list_by_owner(&asha).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].user, asha.id());

    let accepted = env
        .quotes
        .accept(&quote.quote_id, Some(14_000.0), &asha)
        .await
        .unwrap();
    assert_eq!(accepted.status, QuoteStatus::Accepted);
    assert_eq!(accepted.final_cost, Some(14_000.0));
    assert!(accepted.responded_at.is_some());
    assert!(matches!(env.next_event().await, LifecycleEvent::QuoteAccepted { .. }));

    let receipt = env
        .quotes
        .submit_payment(&quote.quote_id, PaymentMethod::Upi, 14_000.0, &asha)
        .await
        .unwrap();
    assert!(receipt.transaction_id.starts_with("TXN-"));
    assert_eq!(receipt.quote.payment_status, PaymentStatus::Completed);
    assert_eq!(receipt.quote.status, QuoteStatus::Accepted);
    let details = receipt.quote.payment_details.as_ref().unwrap();
    assert_eq!(details.transaction_id, receipt.transaction_id);
    assert_eq!(details.method, PaymentMethod::Upi);
    match env.next_event().await {
        LifecycleEvent::PaymentReceived { transaction_id, amount, .. } => {
            assert_eq!(transaction_id, receipt.transaction_id);
            assert_eq!(amount, 14_000.0);
        }
        other => panic!("unexpected event {:?}", other),
    }

    let completed = env
        .quotes
        .update_status(&quote.quote_id, QuoteStatus::Completed, None, &ops)
        .await
        .unwrap();
    assert_eq!(completed.status, QuoteStatus::Completed);
    match env.next_event().await {
        LifecycleEvent::QuoteStatusChanged { previous, .. } => assert_eq!(previous, QuoteStatus::Accepted),
        other => panic!("unexpected event {:?}", other),
    }

    let feedback = env
        .feedback
        .submit_feedback(&quote.quote_id, 5, Some("  Careful packers  ".to_string()), &asha)
        .await
        .unwrap();
    assert_eq!(feedback.rating, 5);
    assert_eq!(feedback.comment.as_deref(), Some("Careful packers"));
    assert!(matches!(env.next_event().await, LifecycleEvent::FeedbackReceived { rating: 5, .. }));

    let revised = env
        .feedback
        .submit_feedback(&quote.quote_id, 3, None, &asha)
        .await
        .unwrap();
    assert_eq!(revised.id, feedback.id);
    assert_eq!(revised.rating, 3);
    assert_eq!(env.feedback_repo.len(), 1);

    // Terminal: nothing moves it any more
    let err = env
        .quotes
        .update_status(&quote.quote_id, QuoteStatus::Cancelled, None, &ops)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::PreconditionFailed { current: QuoteStatus::Completed, .. }));
}

#[tokio::test]
async fn signed_in_submission_is_owned_immediately() {
    let env = TestEnv::new();
    let asha = customer("asha@example.com");
    let quote = env
        .quotes
        .create_quote(delhi_to_mumbai("asha@example.com"), &asha)
        .await
        .unwrap();
    assert_eq!(quote.user, asha.id());

    let by_staff = env
        .quotes
        .create_quote(delhi_to_mumbai("walkin@example.com"), &staff())
        .await
        .unwrap();
    assert_eq!(by_staff.user, None);
}

#[tokio::test]
async fn invalid_move_date_is_rejected() {
    let env = TestEnv::new();
    let mut request = delhi_to_mumbai("asha@example.com");
    request.move_date = "2025-13-45".to_string();
    let err = env.quotes.create_quote(request, &Actor::Anonymous).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));
}

#[tokio::test]
async fn claim_only_binds_unowned_quotes_with_matching_email() {
    let env = TestEnv::new();
    let asha = customer("asha@example.com");
    let ravi = customer("ravi@example.com");

    env.quotes
        .create_quote(delhi_to_mumbai("asha@example.com"), &Actor::Anonymous)
        .await
        .unwrap();
    env.quotes
        .create_quote(delhi_to_mumbai("ASHA@example.com"), &Actor::Anonymous)
        .await
        .unwrap();
    env.quotes
        .create_quote(delhi_to_mumbai("asha@example.com"), &ravi)
        .await
        .unwrap();
    env.quotes
        .create_quote(delhi_to_mumbai("someone@example.com"), &Actor::Anonymous)
        .await
        .unwrap();

    assert_eq!(env.quotes.claim(&asha).await.unwrap(), 2);
    // Idempotent once claimed
    assert_eq!(env.quotes.claim(&asha).await.unwrap(), 0);
    assert_eq!(env.quotes.list_by_owner(&asha).await.unwrap().len(), 2);
    assert_eq!(env.quotes.list_by_owner(&ravi).await.unwrap().len(), 1);

    let err = env.quotes.claim(&Actor::Anonymous).await.unwrap_err();
    assert!(matches!(err, ServiceError::Unauthenticated(_)));
}

#[tokio::test]
async fn matching_account_claims_on_first_access() {
    let env = TestEnv::new();
    let quote = env
        .quotes
        .create_quote(delhi_to_mumbai("asha@example.com"), &Actor::Anonymous)
        .await
        .unwrap();

    let stranger = customer("ravi@example.com");
    let err = env.quotes.get_by_quote_id(&quote.quote_id, &stranger).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotAuthorized(_)));

    let err = env
        .quotes
        .get_by_quote_id(&quote.quote_id, &Actor::Anonymous)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Unauthenticated(_)));

    let asha = customer("asha@example.com");
    let seen = env.quotes.get_by_quote_id(&quote.quote_id, &asha).await.unwrap();
    assert_eq!(seen.user, asha.id());
    let stored = env.quote_repo.find_by_quote_id(&quote.quote_id).await.unwrap().unwrap();
    assert_eq!(stored.user, asha.id());
}

#[tokio::test]
async fn unknown_quote_is_not_found() {
    let env = TestEnv::new();
    let err = env
        .quotes
        .accept("UP99990000", None, &customer("asha@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
    let err = env.quotes.track_by_quote_id("UP99990000").await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

/// Creates a quote owned by `owner` and drives it into `target` through staff operations.
async fn quote_in_state(env: &TestEnv, owner: &Actor, target: QuoteStatus) -> String {
    let ops = staff();
    let quote_id = env
        .quotes
        .create_quote(delhi_to_mumbai("asha@example.com"), owner)
        .await
        .unwrap()
        .quote_id;
    match target {
        QuoteStatus::Pending => {}
        QuoteStatus::Quoted => {
            env.quotes.set_price(&quote_id, 100.0, None, &ops).await.unwrap();
        }
        QuoteStatus::Accepted => {
            env.quotes.set_price(&quote_id, 100.0, None, &ops).await.unwrap();
            env.quotes.accept(&quote_id, Some(90.0), owner).await.unwrap();
        }
        other => {
            env.quotes.update_status(&quote_id, other, None, &ops).await.unwrap();
        }
    }
    quote_id
}

#[tokio::test]
async fn accept_requires_a_price_first() {
    let env = TestEnv::new();
    let asha = customer("asha@example.com");
    let cases = [
        (QuoteStatus::Pending, None),
        (QuoteStatus::Reviewing, None),
        (QuoteStatus::Accepted, Some(90.0)),
        (QuoteStatus::Completed, None),
        (QuoteStatus::Rejected, None),
        (QuoteStatus::Cancelled, None),
    ];

    for (state, final_cost) in cases {
        let quote_id = quote_in_state(&env, &asha, state).await;
        let before = env.quote_repo.find_by_quote_id(&quote_id).await.unwrap().unwrap();
        assert_eq!(before.status, state);

        let err = env.quotes.accept(&quote_id, Some(50.0), &asha).await.unwrap_err();
        match err {
            ServiceError::PreconditionFailed { current, .. } => assert_eq!(current, state),
            other => panic!("accept from {state} gave {other:?}"),
        }

        let after = env.quote_repo.find_by_quote_id(&quote_id).await.unwrap().unwrap();
        assert_eq!(after.status, state, "status changed from {state}");
        assert_eq!(after.final_cost, final_cost, "final cost changed from {state}");
        assert_eq!(after.version, before.version);
    }

    // Staff are held to the same rule by default
    let quote_id = quote_in_state(&env, &asha, QuoteStatus::Pending).await;
    let err = env.quotes.accept(&quote_id, Some(50.0), &staff()).await.unwrap_err();
    assert!(matches!(err, ServiceError::PreconditionFailed { current: QuoteStatus::Pending, .. }));
}

#[tokio::test]
async fn accepted_quote_cannot_be_repriced() {
    let env = TestEnv::new();
    let asha = customer("asha@example.com");
    let quote_id = quote_in_state(&env, &asha, QuoteStatus::Accepted).await;

    let err = env
        .quotes
        .set_price(&quote_id, 120.0, None, &staff())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::PreconditionFailed { current: QuoteStatus::Accepted, .. }));

    let stored = env.quote_repo.find_by_quote_id(&quote_id).await.unwrap().unwrap();
    assert_eq!(stored.estimated_cost, Some(100.0));
    assert_eq!(stored.final_cost, Some(90.0));
}

#[tokio::test]
async fn concurrent_accepts_succeed_once() {
    let env = TestEnv::new();
    let asha = customer("asha@example.com");
    let quote = env
        .quotes
        .create_quote(delhi_to_mumbai("asha@example.com"), &asha)
        .await
        .unwrap();
    env.quotes
        .set_price(&quote.quote_id, 30_000.0, None, &staff())
        .await
        .unwrap();

    let (first, second) = tokio::join!(
        env.quotes.accept(&quote.quote_id, None, &asha),
        env.quotes.accept(&quote.quote_id, None, &asha)
    );
    let successes = [first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(successes, 1);
    let stored = env.quote_repo.find_by_quote_id(&quote.quote_id).await.unwrap().unwrap();
    assert_eq!(stored.status, QuoteStatus::Accepted);
}

#[tokio::test]
async fn payments_need_acceptance_and_get_fresh_transaction_ids() {
    let env = TestEnv::new();
    let asha = customer("asha@example.com");
    let quote = env
        .quotes
        .create_quote(delhi_to_mumbai("asha@example.com"), &asha)
        .await
        .unwrap();
    env.quotes
        .set_price(&quote.quote_id, 30_000.0, None, &staff())
        .await
        .unwrap();

    let err = env
        .quotes
        .submit_payment(&quote.quote_id, PaymentMethod::Card, 30_000.0, &asha)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::PreconditionFailed { current: QuoteStatus::Quoted, .. }));

    env.quotes.accept(&quote.quote_id, None, &asha).await.unwrap();

    let err = env
        .quotes
        .submit_payment(&quote.quote_id, PaymentMethod::Card, 0.0, &asha)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));

    let first = env
        .quotes
        .submit_payment(&quote.quote_id, PaymentMethod::Card, 10_000.0, &asha)
        .await
        .unwrap();
    let second = env
        .quotes
        .submit_payment(&quote.quote_id, PaymentMethod::Cash, 20_000.0, &asha)
        .await
        .unwrap();
    assert_ne!(first.transaction_id, second.transaction_id);
    let details = second.quote.payment_details.unwrap();
    assert_eq!(details.method, PaymentMethod::Cash);
    assert_eq!(details.amount, 20_000.0);
}

#[tokio::test]
async fn owner_may_cancel_until_accepted() {
    let env = TestEnv::new();
    let asha = customer("asha@example.com");
    let ops = staff();

    let open = env
        .quotes
        .create_quote(delhi_to_mumbai("asha@example.com"), &asha)
        .await
        .unwrap();
    env.quotes.set_price(&open.quote_id, 12_000.0, None, &ops).await.unwrap();
    let cancelled = env.quotes.cancel(&open.quote_id, &asha).await.unwrap();
    assert_eq!(cancelled.status, QuoteStatus::Cancelled);

    let booked = env
        .quotes
        .create_quote(delhi_to_mumbai("asha@example.com"), &asha)
        .await
        .unwrap();
    env.quotes.set_price(&booked.quote_id, 12_000.0, None, &ops).await.unwrap();
    env.quotes.accept(&booked.quote_id, None, &asha).await.unwrap();
    let err = env.quotes.cancel(&booked.quote_id, &asha).await.unwrap_err();
    assert!(matches!(err, ServiceError::PreconditionFailed { current: QuoteStatus::Accepted, .. }));

    // Staff can still cancel through a status update
    let by_staff = env
        .quotes
        .update_status(&booked.quote_id, QuoteStatus::Cancelled, Some("Customer called".to_string()), &ops)
        .await
        .unwrap();
    assert_eq!(by_staff.status, QuoteStatus::Cancelled);
    assert_eq!(by_staff.admin_notes.as_deref(), Some("Customer called"));
}

#[tokio::test]
async fn owner_deletes_only_early_quotes() {
    let mut env = TestEnv::new();
    let asha = customer("asha@example.com");

    let early = env
        .quotes
        .create_quote(delhi_to_mumbai("asha@example.com"), &asha)
        .await
        .unwrap();
    env.next_event().await;
    env.quotes.delete_own(&early.quote_id, &asha).await.unwrap();
    match env.next_event().await {
        LifecycleEvent::QuoteDeleted { snapshot } => assert_eq!(snapshot.quote_id, early.quote_id),
        other => panic!("unexpected event {:?}", other),
    }
    assert!(env.quote_repo.find_by_quote_id(&early.quote_id).await.unwrap().is_none());

    let priced = env
        .quotes
        .create_quote(delhi_to_mumbai("asha@example.com"), &asha)
        .await
        .unwrap();
    env.quotes
        .set_price(&priced.quote_id, 9_000.0, None, &staff())
        .await
        .unwrap();
    let err = env.quotes.delete_own(&priced.quote_id, &asha).await.unwrap_err();
    assert!(matches!(err, ServiceError::PreconditionFailed { current: QuoteStatus::Quoted, .. }));

    // Staff delete regardless of status
    env.quotes.delete_any(&priced.quote_id, &staff()).await.unwrap();
    let err = env.quotes.delete_any(&priced.quote_id, &staff()).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn staff_operations_reject_customers() {
    let env = TestEnv::new();
    let asha = customer("asha@example.com");
    let quote = env
        .quotes
        .create_quote(delhi_to_mumbai("asha@example.com"), &asha)
        .await
        .unwrap();

    let err = env
        .quotes
        .set_price(&quote.quote_id, 1.0, None, &asha)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotAuthorized(_)));
    let err = env.quotes.list_all(1, 20, &asha).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotAuthorized(_)));
    let err = env.quotes.list_all(1, 20, &Actor::Anonymous).await.unwrap_err();
    assert!(matches!(err, ServiceError::Unauthenticated(_)));
}

#[tokio::test]
async fn staff_workflow_moves_through_review() {
    let env = TestEnv::new();
    let ops = staff();
    let quote = env
        .quotes
        .create_quote(delhi_to_mumbai("asha@example.com"), &Actor::Anonymous)
        .await
        .unwrap();

    let reviewing = env
        .quotes
        .update_status(&quote.quote_id, QuoteStatus::Reviewing, None, &ops)
        .await
        .unwrap();
    assert_eq!(reviewing.status, QuoteStatus::Reviewing);

    let err = env
        .quotes
        .update_status(&quote.quote_id, QuoteStatus::Pending, None, &ops)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::PreconditionFailed { current: QuoteStatus::Reviewing, .. }));

    let err = env
        .quotes
        .update_status(&quote.quote_id, QuoteStatus::Quoted, None, &ops)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::PreconditionFailed { .. }));

    let assignee = bson::oid::ObjectId::new();
    let assigned = env
        .quotes
        .assign(&quote.quote_id, &assignee.to_hex(), &ops)
        .await
        .unwrap();
    assert_eq!(assigned.assigned_to, Some(assignee));

    let err = env.quotes.assign(&quote.quote_id, "nope", &ops).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));

    let (page, total) = env.quotes.list_all(1, 20, &ops).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(page[0].quote_id, quote.quote_id);
}

#[tokio::test]
async fn failing_notifications_do_not_affect_operations() {
    let env = TestEnv::failing();
    let ops = staff();
    let quote = env
        .quotes
        .create_quote(delhi_to_mumbai("asha@example.com"), &Actor::Anonymous)
        .await
        .unwrap();
    let priced = env
        .quotes
        .set_price(&quote.quote_id, 5_000.0, None, &ops)
        .await
        .unwrap();
    assert_eq!(priced.status, QuoteStatus::Quoted);
    // Give the spawned deliveries a chance to run and fail
    tokio::task::yield_now().await;
    let stored = env.quote_repo.find_by_quote_id(&quote.quote_id).await.unwrap().unwrap();
    assert_eq!(stored.status, QuoteStatus::Quoted);
}
