//! Integration tests for plan creation, update and deletion.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::PgPool;

use impactree_core::ImpactError;
use impactree_core::milestone::{MilestoneInput, create_milestone, update_milestone};
use impactree_core::plan::service::{create_plan, delete_plan, get_plan, list_plans, update_plan};
use impactree_core::plan::{AllocationEntry, NewPlanRequest, PlanChanges};
use impactree_db::models::{Charity, Milestone, User};
use impactree_db::queries::charities::{self, CharityFields};
use impactree_db::queries::users::{self, NewUser};
use impactree_db::queries::{allocations, impact_plans};
use impactree_test_utils::{create_test_db, drop_test_db};

async fn seed_user(pool: &PgPool, username: &str, is_staff: bool) -> User {
    users::insert_user(
        pool,
        &NewUser {
            username,
            email: "member@example.com",
            first_name: "Mem",
            last_name: "Ber",
            password_hash: "unused",
            is_staff,
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
            description: "",
            impact_metric: "trees planted",
            impact_ratio: 0.25,
            website_url: "",
            category_id: None,
            image_path: None,
        },
    )
    .await
    .expect("insert_charity should succeed")
}

async fn seed_milestone(pool: &PgPool, name: &str, required: Decimal) -> Milestone {
    create_milestone(
        pool,
        &MilestoneInput {
            name: name.into(),
            description: String::new(),
            required_percentage: required,
            image_url: String::new(),
        },
    )
    .await
    .expect("create_milestone should succeed")
}

fn request(pct: Decimal, charities: Option<Vec<AllocationEntry>>) -> NewPlanRequest {
    NewPlanRequest {
        user: None,
        annual_income: dec!(80000.00),
        philanthropy_percentage: pct,
        total_annual_allocation: dec!(4000.00),
        charities,
    }
}

fn entry(charity: &Charity, amount: Decimal) -> AllocationEntry {
    AllocationEntry {
        charity_id: charity.id,
        allocation_amount: amount,
    }
}

#[tokio::test]
async fn create_resolves_milestone_by_threshold() {
    let (pool, db_name) = create_test_db().await;
    let bronze = seed_milestone(&pool, "Bronze", dec!(5.00)).await;
    let gold = seed_milestone(&pool, "Gold", dec!(75.00)).await;

    let at = seed_user(&pool, "at-threshold", false).await;
    let below = seed_user(&pool, "below", false).await;
    let above = seed_user(&pool, "above", false).await;

    let plan = create_plan(&pool, &at, &request(dec!(5.00), None)).await.unwrap();
    assert_eq!(plan.current_milestone.map(|m| m.id), Some(bronze.id));

    let plan = create_plan(&pool, &below, &request(dec!(4.99), None)).await.unwrap();
    assert!(plan.current_milestone.is_none());

    let plan = create_plan(&pool, &above, &request(dec!(100.00), None)).await.unwrap();
    assert_eq!(plan.current_milestone.map(|m| m.id), Some(gold.id));
    assert_eq!(plan.user.username, "above");

    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn second_plan_for_user_is_rejected() {
    let (pool, db_name) = create_test_db().await;
    let user = seed_user(&pool, "twice", false).await;

    create_plan(&pool, &user, &request(dec!(10), None)).await.unwrap();
    let err = create_plan(&pool, &user, &request(dec!(20), None)).await.unwrap_err();
    assert!(matches!(err, ImpactError::DuplicatePlan));
    assert_eq!(impact_plans::count_plans_for_user(&pool, user.id).await.unwrap(), 1);

    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn concurrent_creates_yield_one_plan() {
    let (pool, db_name) = create_test_db().await;
    let user = seed_user(&pool, "racer", false).await;

    let req = request(dec!(10), None);
    let (a, b) = tokio::join!(
        create_plan(&pool, &user, &req),
        create_plan(&pool, &user, &req)
    );
    assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
    assert_eq!(impact_plans::count_plans_for_user(&pool, user.id).await.unwrap(), 1);

    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn create_with_charities_persists_allocations_in_order() {
    let (pool, db_name) = create_test_db().await;
    let user = seed_user(&pool, "giver", false).await;
    let forest = seed_charity(&pool, "Forest Fund").await;
    let ocean = seed_charity(&pool, "Ocean Care").await;

    let plan = create_plan(
        &pool,
        &user,
        &request(
            dec!(10),
            Some(vec![entry(&ocean, dec!(1500.00)), entry(&forest, dec!(2500.00))]),
        ),
    )
    .await
    .unwrap();

    let names: Vec<&str> = plan.charities.iter().map(|a| a.charity.name.as_str()).collect();
    assert_eq!(names, ["Ocean Care", "Forest Fund"]);
    assert_eq!(plan.charities[1].allocation_amount, dec!(2500.00));

    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn nested_charities_may_repeat_a_charity() {
    let (pool, db_name) = create_test_db().await;
    let user = seed_user(&pool, "repeat", false).await;
    let forest = seed_charity(&pool, "Forest Fund").await;

    let plan = create_plan(
        &pool,
        &user,
        &request(
            dec!(10),
            Some(vec![entry(&forest, dec!(10)), entry(&forest, dec!(20))]),
        ),
    )
    .await
    .unwrap();
    assert_eq!(plan.charities.len(), 2);

    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn create_with_unknown_charity_leaves_nothing_behind() {
    let (pool, db_name) = create_test_db().await;
    let user = seed_user(&pool, "partial", false).await;
    let forest = seed_charity(&pool, "Forest Fund").await;

    let err = create_plan(
        &pool,
        &user,
        &request(
            dec!(10),
            Some(vec![entry(&forest, dec!(10)), AllocationEntry {
                charity_id: forest.id + 1000,
                allocation_amount: dec!(5),
            }]),
        ),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ImpactError::NotFound(_)));
    assert_eq!(impact_plans::count_plans_for_user(&pool, user.id).await.unwrap(), 0);

    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn creating_for_another_user_needs_staff() {
    let (pool, db_name) = create_test_db().await;
    let member = seed_user(&pool, "member", false).await;
    let other = seed_user(&pool, "other", false).await;
    let staff = seed_user(&pool, "staff", true).await;

    let mut req = request(dec!(10), None);
    req.user = Some(other.id);
    let err = create_plan(&pool, &member, &req).await.unwrap_err();
    assert!(matches!(err, ImpactError::Forbidden(_)));

    let plan = create_plan(&pool, &staff, &req).await.unwrap();
    assert_eq!(plan.user.id, other.id);

    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn milestone_changes_only_with_percentage() {
    let (pool, db_name) = create_test_db().await;
    let bronze = seed_milestone(&pool, "Bronze", dec!(5.00)).await;
    let silver = seed_milestone(&pool, "Silver", dec!(15.00)).await;
    let user = seed_user(&pool, "climber", false).await;

    let plan = create_plan(&pool, &user, &request(dec!(10), None)).await.unwrap();
    assert_eq!(plan.current_milestone.as_ref().map(|m| m.id), Some(bronze.id));

    // Lowering Silver below the plan's percentage does not move the plan
    // until the percentage itself is written again.
    update_milestone(
        &pool,
        silver.id,
        &MilestoneInput {
            name: "Silver".into(),
            description: String::new(),
            required_percentage: dec!(8.00),
            image_url: String::new(),
        },
    )
    .await
    .unwrap();

    let changes = PlanChanges {
        annual_income: Some(dec!(90000.00)),
        ..Default::default()
    };
    let plan = update_plan(&pool, &user, plan.id, &changes).await.unwrap();
    assert_eq!(plan.annual_income, dec!(90000.00));
    assert_eq!(plan.current_milestone.as_ref().map(|m| m.id), Some(bronze.id));

    let changes = PlanChanges {
        philanthropy_percentage: Some(dec!(10)),
        ..Default::default()
    };
    let plan = update_plan(&pool, &user, plan.id, &changes).await.unwrap();
    assert_eq!(plan.current_milestone.as_ref().map(|m| m.id), Some(silver.id));

    let changes = PlanChanges {
        philanthropy_percentage: Some(dec!(1)),
        ..Default::default()
    };
    let plan = update_plan(&pool, &user, plan.id, &changes).await.unwrap();
    assert!(plan.current_milestone.is_none());

    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn charities_payload_replaces_clears_or_leaves() {
    let (pool, db_name) = create_test_db().await;
    let user = seed_user(&pool, "reshuffle", false).await;
    let forest = seed_charity(&pool, "Forest Fund").await;
    let ocean = seed_charity(&pool, "Ocean Care").await;

    let plan = create_plan(&pool, &user, &request(dec!(10), Some(vec![entry(&forest, dec!(100))])))
        .await
        .unwrap();

    // Absent: untouched.
    let plan = update_plan(&pool, &user, plan.id, &PlanChanges::default()).await.unwrap();
    assert_eq!(plan.charities.len(), 1);

    // Present: replaced wholesale.
    let changes = PlanChanges {
        charities: Some(vec![entry(&ocean, dec!(40)), entry(&forest, dec!(60))]),
        ..Default::default()
    };
    let plan = update_plan(&pool, &user, plan.id, &changes).await.unwrap();
    let pairs: Vec<(i64, Decimal)> = plan
        .charities
        .iter()
        .map(|a| (a.charity.id, a.allocation_amount))
        .collect();
    assert_eq!(pairs, [(ocean.id, dec!(40)), (forest.id, dec!(60))]);

    // Empty: cleared.
    let changes = PlanChanges {
        charities: Some(Vec::new()),
        ..Default::default()
    };
    let plan = update_plan(&pool, &user, plan.id, &changes).await.unwrap();
    assert!(plan.charities.is_empty());
    assert_eq!(allocations::count_allocations_for_plan(&pool, plan.id).await.unwrap(), 0);

    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn failed_reconciliation_rolls_back_the_update() {
    let (pool, db_name) = create_test_db().await;
    let user = seed_user(&pool, "rollback", false).await;
    let forest = seed_charity(&pool, "Forest Fund").await;

    let plan = create_plan(&pool, &user, &request(dec!(10), Some(vec![entry(&forest, dec!(100))])))
        .await
        .unwrap();

    let changes = PlanChanges {
        annual_income: Some(dec!(1.00)),
        charities: Some(vec![AllocationEntry {
            charity_id: forest.id + 1000,
            allocation_amount: dec!(5),
        }]),
        ..Default::default()
    };
    let err = update_plan(&pool, &user, plan.id, &changes).await.unwrap_err();
    assert!(matches!(err, ImpactError::NotFound(_)));

    let after = get_plan(&pool, plan.id).await.unwrap();
    assert_eq!(after.annual_income, dec!(80000.00));
    assert_eq!(after.charities.len(), 1);
    assert_eq!(after.charities[0].charity.id, forest.id);

    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn owner_cannot_be_changed() {
    let (pool, db_name) = create_test_db().await;
    let user = seed_user(&pool, "owner", false).await;
    let other = seed_user(&pool, "someone-else", false).await;
    let plan = create_plan(&pool, &user, &request(dec!(10), None)).await.unwrap();

    let changes = PlanChanges {
        user: Some(Some(other.id)),
        annual_income: Some(dec!(1)),
        ..Default::default()
    };
    let err = update_plan(&pool, &user, plan.id, &changes).await.unwrap_err();
    assert!(matches!(err, ImpactError::ImmutableOwner));

    // An explicit null is an attempt to detach the owner.
    let changes = PlanChanges {
        user: Some(None),
        ..Default::default()
    };
    let err = update_plan(&pool, &user, plan.id, &changes).await.unwrap_err();
    assert!(matches!(err, ImpactError::ImmutableOwner));

    // Restating the current owner is allowed.
    let changes = PlanChanges {
        user: Some(Some(user.id)),
        ..Default::default()
    };
    let plan = update_plan(&pool, &user, plan.id, &changes).await.unwrap();
    assert_eq!(plan.user.id, user.id);
    assert_eq!(plan.annual_income, dec!(80000.00));

    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn only_owner_or_staff_may_modify() {
    let (pool, db_name) = create_test_db().await;
    let owner = seed_user(&pool, "owner", false).await;
    let stranger = seed_user(&pool, "stranger", false).await;
    let staff = seed_user(&pool, "staff", true).await;
    let plan = create_plan(&pool, &owner, &request(dec!(10), None)).await.unwrap();

    let changes = PlanChanges {
        annual_income: Some(dec!(5)),
        ..Default::default()
    };
    let err = update_plan(&pool, &stranger, plan.id, &changes).await.unwrap_err();
    assert!(matches!(err, ImpactError::Forbidden(_)));
    let err = delete_plan(&pool, &stranger, plan.id).await.unwrap_err();
    assert!(matches!(err, ImpactError::Forbidden(_)));

    update_plan(&pool, &staff, plan.id, &changes).await.unwrap();
    delete_plan(&pool, &owner, plan.id).await.unwrap();
    assert!(matches!(
        get_plan(&pool, plan.id).await.unwrap_err(),
        ImpactError::NotFound(_)
    ));

    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn missing_plan_is_not_found() {
    let (pool, db_name) = create_test_db().await;
    let user = seed_user(&pool, "nobody", false).await;

    let err = update_plan(&pool, &user, 999, &PlanChanges::default()).await.unwrap_err();
    assert!(matches!(err, ImpactError::NotFound(_)));
    // Lookup comes before field validation.
    let out_of_range = PlanChanges {
        philanthropy_percentage: Some(dec!(1000)),
        ..Default::default()
    };
    let err = update_plan(&pool, &user, 999, &out_of_range).await.unwrap_err();
    assert!(matches!(err, ImpactError::NotFound(_)));
    let err = delete_plan(&pool, &user, 999).await.unwrap_err();
    assert!(matches!(err, ImpactError::NotFound(_)));
    assert!(list_plans(&pool).await.unwrap().is_empty());

    drop_test_db(&db_name).await;
}
