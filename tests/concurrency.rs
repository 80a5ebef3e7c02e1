mod common;

use std::sync::Arc;

use chrono::Utc;
use common::{FlakyAdapter, Gate, GatedAdapter};
use rental_match::models::{Profile, Property, ProfileId};
use rental_match::storage::{Collection, Repository};
use rental_match::{AppError, LikeOutcome, Store};

#[tokio::test]
async fn stale_catalog_refresh_is_discarded() {
    let adapter = Arc::new(GatedAdapter::new());
    let store = Arc::new(Store::new(Arc::clone(&adapter), common::config()));

    adapter.arm(Gate::List(Collection::Properties));
    let slow = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.refresh_catalog().await })
    };
    // The slow refresh has read the (empty) catalog and is parked.
    adapter.entered.notified().await;

    let mut property = Property::from_input(common::listing("9 Oxford Rd"), ProfileId::new(), Utc::now());
    Repository::new(&*adapter).save(&mut property).await.unwrap();

    assert!(store.refresh_catalog().await.unwrap());
    assert_eq!(store.snapshot().properties.len(), 1);

    adapter.release.notify_one();
    let applied = slow.await.unwrap().unwrap();
    assert!(!applied);
    assert_eq!(store.snapshot().properties.len(), 1);
}

#[tokio::test]
async fn second_submission_while_first_is_pending_is_refused() {
    let adapter = Arc::new(GatedAdapter::new());
    let store = Arc::new(Store::new(Arc::clone(&adapter), common::config()));

    adapter.arm(Gate::Put(Collection::Credentials));
    let first = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            store
                .register(common::renter_form("sam@example.com", "Sam Carter"), common::PASSWORD)
                .await
        })
    };
    adapter.entered.notified().await;
    assert!(store.is_submitting("register:sam@example.com"));

    let second = store
        .register(common::renter_form("SAM@example.com", "Sam Carter"), common::PASSWORD)
        .await;
    assert!(matches!(second, Err(AppError::InFlight(_))));

    adapter.release.notify_one();
    let profile = first.await.unwrap().unwrap();
    assert!(!store.is_submitting("register:sam@example.com"));
    assert_eq!(store.current_user().await.unwrap(), profile);
}

#[tokio::test]
async fn failed_counterpart_lookup_does_not_abort_overviews() {
    let adapter = Arc::new(FlakyAdapter::new());
    let store = Store::new(Arc::clone(&adapter), common::config());
    let landlord = store
        .register(common::landlord_form("priya@example.com", "Priya Shah"), common::PASSWORD)
        .await
        .unwrap();
    let property_id = store
        .create_property(common::listing("9 Oxford Rd"), landlord.id())
        .await
        .unwrap();

    let mut renters = Vec::new();
    for (email, name) in [("sam@example.com", "Sam Carter"), ("alex@example.com", "Alex Reid")] {
        let renter = store
            .register(common::renter_form(email, name), common::PASSWORD)
            .await
            .unwrap();
        let outcome = store.handle_like(renter.id(), property_id).await.unwrap();
        assert!(matches!(outcome, LikeOutcome::Matched(_)));
        renters.push(renter.id());
    }

    adapter.fail_reads_of(renters[0]);
    let overviews = store.match_overviews(landlord.id()).await.unwrap();
    assert_eq!(overviews.len(), 2);

    let missing: Vec<_> = overviews
        .iter()
        .filter(|o| o.counterpart.is_none())
        .map(|o| o.record.renter_id)
        .collect();
    assert_eq!(missing, vec![renters[0]]);
    let found: Vec<_> = overviews
        .iter()
        .filter_map(|o| o.counterpart.as_ref().map(Profile::id))
        .collect();
    assert_eq!(found, vec![renters[1]]);
    assert!(overviews.iter().all(|o| o.property.is_some()));
}
