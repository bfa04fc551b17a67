//! Integration tests for the plan, allocation, and user query modules.

use rust_decimal_macros::dec;
use sqlx::PgPool;

use impactree_db::models::{Charity, ImpactPlan, User};
use impactree_db::queries::charities::{self, CharityFields};
use impactree_db::queries::impact_plans::{self, NewImpactPlan};
use impactree_db::queries::users::{self, NewUser, UserChanges};
use impactree_db::queries::{allocations, auth_tokens};
use impactree_test_utils::{create_test_db, drop_test_db};

async fn seed_user(pool: &PgPool, username: &str) -> User {
    users::insert_user(
        pool,
        &NewUser {
            username,
            email: "someone@example.com",
            first_name: "Some",
            last_name: "One",
            password_hash: "not-a-real-hash",
            is_staff: false,
        },
    )
    .await
    .expect("insert_user should succeed")
}

async fn seed_charity(pool: &PgPool, name: &str) -> Charity {
    charities::insert_charity(
        pool,
        &CharityFields {
            name,
            description: "feeds people",
            impact_metric: "meals provided",
            impact_ratio: 1.5,
            website_url: "https://example.org",
            category_id: None,
            image_path: None,
        },
    )
    .await
    .expect("insert_charity should succeed")
}

async fn seed_plan(pool: &PgPool, user_id: i64) -> ImpactPlan {
    impact_plans::insert_plan(
        pool,
        &NewImpactPlan {
            user_id,
            annual_income: dec!(100000.00),
            philanthropy_percentage: dec!(5.00),
            total_annual_allocation: dec!(5000.00),
            current_milestone_id: None,
        },
    )
    .await
    .expect("insert_plan should succeed")
}

#[tokio::test]
async fn insert_and_get_plan() {
    let (pool, db_name) = create_test_db().await;
    let user = seed_user(&pool, "alice").await;

    let plan = seed_plan(&pool, user.id).await;
    assert_eq!(plan.user_id, user.id);
    assert_eq!(plan.annual_income.to_string(), "100000.00");
    assert!(plan.current_milestone_id.is_none());

    let fetched = impact_plans::get_plan(&pool, plan.id)
        .await
        .unwrap()
        .expect("plan should exist");
    assert_eq!(fetched, plan);

    let by_user = impact_plans::get_plan_for_user(&pool, user.id)
        .await
        .unwrap()
        .expect("user should own the plan");
    assert_eq!(by_user.id, plan.id);

    assert!(impact_plans::get_plan(&pool, plan.id + 1000).await.unwrap().is_none());

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn numeric_columns_round_to_two_places() {
    let (pool, db_name) = create_test_db().await;
    let user = seed_user(&pool, "rounding").await;

    let plan = impact_plans::insert_plan(
        &pool,
        &NewImpactPlan {
            user_id: user.id,
            annual_income: dec!(1234.567),
            philanthropy_percentage: dec!(7),
            total_annual_allocation: dec!(86.4),
            current_milestone_id: None,
        },
    )
    .await
    .unwrap();

    assert_eq!(plan.annual_income.to_string(), "1234.57");
    assert_eq!(plan.philanthropy_percentage.to_string(), "7.00");
    assert_eq!(plan.total_annual_allocation.to_string(), "86.40");

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn update_plan_keeps_owner() {
    let (pool, db_name) = create_test_db().await;
    let user = seed_user(&pool, "bob").await;
    let mut plan = seed_plan(&pool, user.id).await;

    plan.annual_income = dec!(75000.00);
    plan.user_id = user.id + 99;
    let updated = impact_plans::update_plan(&pool, &plan)
        .await
        .unwrap()
        .expect("plan should exist");

    assert_eq!(updated.annual_income, dec!(75000.00));
    assert_eq!(updated.user_id, user.id, "owner column must not change");

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn deleting_plan_cascades_to_allocations() {
    let (pool, db_name) = create_test_db().await;
    let user = seed_user(&pool, "carol").await;
    let charity = seed_charity(&pool, "Food Bank").await;
    let plan = seed_plan(&pool, user.id).await;

    allocations::insert_allocation(&pool, plan.id, charity.id, dec!(2500.00))
        .await
        .unwrap();
    allocations::insert_allocation(&pool, plan.id, charity.id, dec!(100.00))
        .await
        .expect("the schema allows duplicate pairs");
    assert_eq!(
        allocations::count_allocations_for_plan(&pool, plan.id).await.unwrap(),
        2
    );

    assert!(impact_plans::delete_plan(&pool, plan.id).await.unwrap());
    assert_eq!(
        allocations::count_allocations_for_plan(&pool, plan.id).await.unwrap(),
        0
    );
    assert!(!impact_plans::delete_plan(&pool, plan.id).await.unwrap());

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn deleting_charity_cascades_to_allocations() {
    let (pool, db_name) = create_test_db().await;
    let user = seed_user(&pool, "dave").await;
    let kept = seed_charity(&pool, "Kept").await;
    let removed = seed_charity(&pool, "Removed").await;
    let plan = seed_plan(&pool, user.id).await;

    allocations::insert_allocation(&pool, plan.id, kept.id, dec!(10.00))
        .await
        .unwrap();
    allocations::insert_allocation(&pool, plan.id, removed.id, dec!(20.00))
        .await
        .unwrap();

    assert!(charities::delete_charity(&pool, removed.id).await.unwrap());

    let remaining = allocations::list_allocations_for_plan(&pool, plan.id)
        .await
        .unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].charity_id, kept.id);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn allocation_pair_lookup_and_amount_update() {
    let (pool, db_name) = create_test_db().await;
    let user = seed_user(&pool, "erin").await;
    let charity = seed_charity(&pool, "Clean Water").await;
    let plan = seed_plan(&pool, user.id).await;

    assert!(
        allocations::find_allocation(&pool, plan.id, charity.id)
            .await
            .unwrap()
            .is_none()
    );

    let row = allocations::insert_allocation(&pool, plan.id, charity.id, dec!(50.00))
        .await
        .unwrap();
    let found = allocations::find_allocation(&pool, plan.id, charity.id)
        .await
        .unwrap()
        .expect("pair should be found");
    assert_eq!(found.id, row.id);

    let updated = allocations::update_allocation_amount(&pool, row.id, dec!(75.25))
        .await
        .unwrap()
        .expect("allocation should exist");
    assert_eq!(updated.allocation_amount, dec!(75.25));

    assert!(
        allocations::update_allocation_amount(&pool, row.id + 1000, dec!(1))
            .await
            .unwrap()
            .is_none()
    );

    assert_eq!(
        allocations::delete_allocations_for_plan(&pool, plan.id).await.unwrap(),
        1
    );

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn find_missing_charity_ids_preserves_order() {
    let (pool, db_name) = create_test_db().await;
    let a = seed_charity(&pool, "A").await;

    let missing = charities::find_missing_charity_ids(&pool, &[9001, a.id, 9000])
        .await
        .unwrap();
    assert_eq!(missing, vec![9001, 9000]);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn user_partial_update_and_cascade() {
    let (pool, db_name) = create_test_db().await;
    let user = seed_user(&pool, "frank").await;
    seed_plan(&pool, user.id).await;
    auth_tokens::insert_token(&pool, user.id, "deadbeef").await.unwrap();

    let updated = users::update_user(
        &pool,
        user.id,
        &UserChanges {
            first_name: Some("Francis"),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .expect("user should exist");
    assert_eq!(updated.first_name, "Francis");
    assert_eq!(updated.last_name, user.last_name);

    let owner = auth_tokens::find_user_by_token(&pool, "deadbeef")
        .await
        .unwrap()
        .expect("token should resolve");
    assert_eq!(owner.id, user.id);

    assert!(users::delete_user(&pool, user.id).await.unwrap());
    assert_eq!(impact_plans::count_plans_for_user(&pool, user.id).await.unwrap(), 0);
    assert_eq!(auth_tokens::count_tokens_for_user(&pool, user.id).await.unwrap(), 0);

    pool.close().await;
    drop_test_db(&db_name).await;
}
