use claims::{assert_matches, assert_ok};
use newsletter_subscriptions::{
    context::RequestContext,
    domain::{MAX_LIMIT, Subscriber},
    lifecycle::SubscriptionLifecycle,
    listing::ListingError,
};

use crate::helpers::{EDITOR, NEWSLETTER, OTHER_EDITOR, OTHER_NEWSLETTER, TestCore};

async fn active_subscriber(
    core: &TestCore,
    lifecycle: &SubscriptionLifecycle,
    newsletter: &str,
    email: &str,
) -> Subscriber {
    let ctx = RequestContext::background();
    let subscriber = lifecycle
        .subscribe(&ctx, email.to_string(), newsletter)
        .await
        .unwrap();
    let token = core.last_confirmation().confirm_token;
    lifecycle.confirm(&ctx, token.as_ref()).await.unwrap();
    subscriber
}

#[tokio::test]
async fn only_active_subscribers_are_listed() {
    let core = TestCore::new();
    let lifecycle = core.lifecycle();
    let ctx = RequestContext::background();

    let active = active_subscriber(&core, &lifecycle, NEWSLETTER, "active@example.com").await;
    lifecycle
        .subscribe(&ctx, "pending@example.com".into(), NEWSLETTER)
        .await
        .unwrap();
    active_subscriber(&core, &lifecycle, NEWSLETTER, "gone@example.com").await;
    lifecycle
        .unsubscribe_by_identity(&ctx, "gone@example.com".into(), NEWSLETTER)
        .await
        .unwrap();
    active_subscriber(&core, &lifecycle, OTHER_NEWSLETTER, "elsewhere@example.com").await;

    let page = core
        .listing()
        .list_active_subscribers(&ctx, EDITOR, NEWSLETTER, None, None)
        .await
        .unwrap();

    assert_eq!(page.total, 1);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].id, active.id);
    assert_eq!((page.limit, page.offset), (10, 0));
}

#[tokio::test]
async fn total_is_independent_of_the_window_and_order_is_stable() {
    let core = TestCore::new();
    let lifecycle = core.lifecycle();
    let ctx = RequestContext::background();
    let mut expected = Vec::new();
    for i in 0..5 {
        let subscriber =
            active_subscriber(&core, &lifecycle, NEWSLETTER, &format!("reader{i}@example.com"))
                .await;
        expected.push(subscriber.id);
    }
    let listing = core.listing();

    let mut seen = Vec::new();
    for offset in ["0", "2", "4"] {
        let page = listing
            .list_active_subscribers(&ctx, EDITOR, NEWSLETTER, Some("2"), Some(offset))
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        seen.extend(page.items.into_iter().map(|s| s.id));
    }
    assert_eq!(seen, expected);

    let past_the_end = listing
        .list_active_subscribers(&ctx, EDITOR, NEWSLETTER, Some("2"), Some("10"))
        .await
        .unwrap();
    assert!(past_the_end.items.is_empty());
    assert_eq!(past_the_end.total, 5);
}

#[tokio::test]
async fn an_empty_newsletter_yields_an_empty_page() {
    let core = TestCore::new();

    let page = core
        .listing()
        .list_active_subscribers(&RequestContext::background(), EDITOR, NEWSLETTER, None, None)
        .await
        .unwrap();

    assert!(page.items.is_empty());
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn limits_are_clamped_and_bad_windows_rejected() {
    let core = TestCore::new();
    let listing = core.listing();
    let ctx = RequestContext::background();

    let clamped = listing
        .list_active_subscribers(&ctx, EDITOR, NEWSLETTER, Some("1000"), None)
        .await
        .unwrap();
    assert_eq!(clamped.limit, MAX_LIMIT);

    let test_cases = vec![
        (Some("0"), None, "zero limit"),
        (Some("-5"), None, "negative limit"),
        (Some("ten"), None, "non-numeric limit"),
        (None, Some("-1"), "negative offset"),
        (None, Some("1.5"), "fractional offset"),
    ];
    for (limit, offset, description) in test_cases {
        let outcome = listing
            .list_active_subscribers(&ctx, EDITOR, NEWSLETTER, limit, offset)
            .await;
        assert!(
            matches!(outcome, Err(ListingError::ValidationError(_))),
            "The listing did not reject a window with {description}."
        );
    }
}

#[tokio::test]
async fn editors_cannot_see_other_editors_newsletters() {
    let core = TestCore::new();
    let lifecycle = core.lifecycle();
    active_subscriber(&core, &lifecycle, OTHER_NEWSLETTER, "reader@example.com").await;
    let listing = core.listing();
    let ctx = RequestContext::background();

    let foreign = listing
        .list_active_subscribers(&ctx, EDITOR, OTHER_NEWSLETTER, None, None)
        .await;
    let missing = listing
        .list_active_subscribers(&ctx, EDITOR, "no-such-letter", None, None)
        .await;
    let malformed = listing
        .list_active_subscribers(&ctx, EDITOR, "not a newsletter!", None, None)
        .await;

    assert_matches!(foreign, Err(ListingError::NotFound));
    assert_matches!(missing, Err(ListingError::NotFound));
    assert_matches!(malformed, Err(ListingError::NotFound));

    assert_ok!(
        listing
            .list_active_subscribers(&ctx, OTHER_EDITOR, OTHER_NEWSLETTER, None, None)
            .await
    );
}

#[tokio::test]
async fn ownership_is_checked_before_the_window() {
    let core = TestCore::new();

    let outcome = core
        .listing()
        .list_active_subscribers(
            &RequestContext::background(),
            EDITOR,
            OTHER_NEWSLETTER,
            Some("0"),
            None,
        )
        .await;

    assert_matches!(outcome, Err(ListingError::NotFound));
}

#[tokio::test]
async fn unknown_or_empty_identities_are_unauthorized() {
    let core = TestCore::new();
    let listing = core.listing();
    let ctx = RequestContext::background();

    for identity in ["", "   ", "editor-nobody"] {
        let outcome = listing
            .list_active_subscribers(&ctx, identity, NEWSLETTER, None, None)
            .await;
        assert_matches!(outcome, Err(ListingError::Unauthorized));
    }
}
