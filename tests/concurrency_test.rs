mod common;

use common::{FaultyStore, Recorder, discount_reward, seed_customer};
use loyalty_ledger::application::loyalty::LoyaltyEngine;
use loyalty_ledger::application::redemption::RedemptionEngine;
use loyalty_ledger::application::retry::RetryPolicy;
use loyalty_ledger::domain::activity::{ActivityDetails, ActivityType};
use loyalty_ledger::domain::ports::LedgerStore;
use loyalty_ledger::domain::reward::RewardId;
use loyalty_ledger::error::LoyaltyError;
use loyalty_ledger::infrastructure::in_memory::InMemoryLedgerStore;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_redemptions_spend_points_once() {
    let store = Arc::new(InMemoryLedgerStore::new());
    store.put_reward(discount_reward("ten-off", 800)).await.unwrap();
    let customer = seed_customer(store.as_ref(), "ana@example.com", 800).await;
    let recorder = Arc::new(Recorder::default());
    let engine = RedemptionEngine::new(store.clone(), recorder.clone());

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let engine = engine.clone();
            tokio::spawn(async move { engine.redeem(customer.id, &RewardId::from("ten-off")).await })
        })
        .collect();
    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let failure = results.into_iter().find_map(|r| r.err()).unwrap();
    assert!(matches!(
        failure,
        LoyaltyError::InsufficientPoints { .. } | LoyaltyError::Conflict(_)
    ));

    let stored = store.get_customer(customer.id).await.unwrap().unwrap();
    assert_eq!(stored.points(), 0);
    assert_eq!(store.activities_for(customer.id).await.unwrap().len(), 1);
    assert_eq!(recorder.kinds().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_awards_are_all_applied() {
    let store = Arc::new(InMemoryLedgerStore::new());
    let customer = seed_customer(store.as_ref(), "ana@example.com", 0).await;
    let engine = LoyaltyEngine::new(store.clone(), Arc::new(Recorder::default()))
        .with_retry_policy(RetryPolicy::new(25, Duration::from_millis(1)));

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let engine = engine.clone();
            tokio::spawn(async move {
                engine
                    .award_points(
                        customer.id,
                        10,
                        ActivityDetails::new(ActivityType::Review, format!("Review {i}")),
                    )
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stored = store.get_customer(customer.id).await.unwrap().unwrap();
    assert_eq!(stored.points(), 200);
    assert_eq!(stored.version(), 20);
    assert_eq!(store.activities_for(customer.id).await.unwrap().len(), 20);
}

#[tokio::test]
async fn test_lost_race_is_retried() {
    let store = Arc::new(FaultyStore::new(InMemoryLedgerStore::new()).with_rival_writes(2));
    let customer = seed_customer(store.as_ref(), "ana@example.com", 100).await;
    let engine = LoyaltyEngine::new(store.clone(), Arc::new(Recorder::default()));

    let award = engine
        .award_points(customer.id, 50, ActivityDetails::new(ActivityType::Purchase, "Order #7"))
        .await
        .unwrap();

    assert_eq!(award.customer.points(), 150);
    // seed write, two rival writes, the award itself
    assert_eq!(award.customer.version(), 4);
}

#[tokio::test]
async fn test_conflict_after_exhausting_attempts() {
    let store = Arc::new(FaultyStore::new(InMemoryLedgerStore::new()).with_rival_writes(3));
    let customer = seed_customer(store.as_ref(), "ana@example.com", 100).await;
    let recorder = Arc::new(Recorder::default());
    let engine = LoyaltyEngine::new(store.clone(), recorder.clone())
        .with_retry_policy(RetryPolicy::new(3, Duration::ZERO));

    let result = engine
        .award_points(customer.id, 50, ActivityDetails::new(ActivityType::Purchase, "Order #7"))
        .await;

    assert!(matches!(result, Err(LoyaltyError::Conflict(id)) if id == customer.id));
    let stored = store.get_customer(customer.id).await.unwrap().unwrap();
    assert_eq!(stored.points(), 100);
    assert!(store.activities_for(customer.id).await.unwrap().is_empty());
    assert!(recorder.kinds().is_empty());
}

#[tokio::test]
async fn test_no_retry_policy_fails_fast() {
    let store = Arc::new(FaultyStore::new(InMemoryLedgerStore::new()).with_rival_writes(1));
    store.put_reward(discount_reward("ten-off", 800)).await.unwrap();
    let customer = seed_customer(store.as_ref(), "ana@example.com", 1000).await;
    let engine = RedemptionEngine::new(store.clone(), Arc::new(Recorder::default()))
        .with_retry_policy(RetryPolicy::no_retry());

    let result = engine.redeem(customer.id, &RewardId::from("ten-off")).await;

    assert!(matches!(result, Err(LoyaltyError::Conflict(_))));
    assert_eq!(
        store.get_customer(customer.id).await.unwrap().unwrap().points(),
        1000
    );
}
