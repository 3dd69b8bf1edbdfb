//! Tests for accounts and wallet arithmetic.

use super::*;
use chrono::{Duration, TimeZone};
use rstest::{fixture, rstest};

#[fixture]
fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

#[fixture]
fn learner(now: DateTime<Utc>) -> User {
    User {
        id: Uuid::new_v4(),
        external_id: "sub-1".to_owned(),
        email: None,
        display_name: DisplayName::default_name(),
        role: Role::Learner,
        subscription: None,
        created_at: now,
    }
}

#[rstest]
#[case("learner", Role::Learner)]
#[case(" ADMIN ", Role::Admin)]
#[case("user", Role::Learner)]
fn role_parses_known_names(#[case] raw: &str, #[case] expected: Role) {
    assert_eq!(raw.parse::<Role>(), Ok(expected));
}

#[rstest]
fn role_rejects_unknown_names() {
    assert!(matches!(
        "owner".parse::<Role>(),
        Err(UserValidationError::UnknownRole(_))
    ));
}

#[rstest]
#[case("", UserValidationError::EmptyDisplayName)]
#[case("bad\u{7}", UserValidationError::DisplayNameControlCharacters)]
fn display_name_rejects_invalid_input(#[case] raw: &str, #[case] expected: UserValidationError) {
    assert_eq!(DisplayName::new(raw), Err(expected));
}

#[rstest]
fn display_name_rejects_overlong_input() {
    let raw = "x".repeat(DISPLAY_NAME_MAX + 1);
    assert_eq!(
        DisplayName::new(raw),
        Err(UserValidationError::DisplayNameTooLong {
            max: DISPLAY_NAME_MAX
        })
    );
}

#[rstest]
fn subscription_is_active_within_window(now: DateTime<Utc>, mut learner: User) {
    learner.subscription = Some(Subscription {
        plan_id: Uuid::new_v4(),
        started_at: now - Duration::days(1),
        expires_at: now + Duration::days(1),
    });
    assert!(learner.has_active_subscription(now));
    assert!(!learner.has_active_subscription(now + Duration::days(2)));
}

#[rstest]
fn admins_and_subscribers_have_unlimited_hearts(now: DateTime<Utc>, mut learner: User) {
    assert!(!learner.has_unlimited_hearts(now));
    learner.role = Role::Admin;
    assert!(learner.has_unlimited_hearts(now));
}

#[rstest]
fn hearts_saturate_at_maximum() {
    let mut progress = UserProgress::new(Uuid::new_v4());
    progress.hearts = 2;
    progress.add_hearts(10);
    assert_eq!(progress.hearts, MAX_HEARTS);
}

#[rstest]
fn spending_more_coins_than_available_leaves_wallet_untouched() {
    let mut progress = UserProgress::new(Uuid::new_v4());
    progress.coins = 3;
    let err = progress.spend_coins(5).expect_err("insufficient");
    assert_eq!(
        err,
        WalletError::InsufficientCoins {
            needed: 5,
            available: 3
        }
    );
    assert_eq!(progress.coins, 3);
}

#[rstest]
fn adjustment_rejects_negative_results_atomically() {
    let mut progress = UserProgress::new(Uuid::new_v4());
    progress.xp = 10;
    progress.coins = 1;
    let err = progress
        .apply_adjustment(WalletAdjustment {
            xp: 5,
            coins: -2,
            hearts: 0,
        })
        .expect_err("coins would go negative");
    assert_eq!(err, WalletError::Negative { field: "coins" });
    assert_eq!(progress.xp, 10);
}

#[rstest]
fn mark_completed_is_idempotent() {
    let lesson = Uuid::new_v4();
    let mut progress = UserProgress::new(Uuid::new_v4());
    progress.mark_completed(lesson);
    progress.mark_completed(lesson);
    assert_eq!(progress.completed_lessons, vec![lesson]);
}

#[rstest]
fn user_serialises_camel_case(learner: User) {
    let value = serde_json::to_value(&learner).expect("serialise");
    assert_eq!(value["externalId"], "sub-1");
    assert_eq!(value["displayName"], DEFAULT_DISPLAY_NAME);
    assert_eq!(value["role"], "learner");
    assert!(value.get("subscription").is_none());
}
