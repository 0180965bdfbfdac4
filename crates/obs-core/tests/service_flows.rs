//! End-to-end service behavior against real and mocked stores

use std::sync::Arc;
use std::time::Duration;

use mockall::mock;
use obs_core::error::SAVE_FAILED;
use obs_core::{
    ErrorClass, FixedClock, ObservationService, SequentialIds, ServiceConfig, ServiceError,
    StoreBackend, GENERIC_UPLOAD_PROCESS,
};
use obs_observation::{Filter, Observation, ObservationQuery};
use obs_store::{MemoryStore, ObservationStore, RequestContext, StoreError};
use obs_test_utils::*;
use pretty_assertions::assert_eq;
use serde_json::json;

mock! {
    pub Store {}

    #[async_trait::async_trait]
    impl ObservationStore for Store {
        async fn save(&self, observation: &Observation) -> Result<(), StoreError>;
        async fn find_by_id(&self, id: &str) -> Result<Observation, StoreError>;
        async fn find_many(&self, query: &ObservationQuery) -> Result<Vec<Observation>, StoreError>;
    }
}

/// Store whose every call takes `delay`
#[derive(Debug)]
struct SlowStore {
    delay: Duration,
    inner: MemoryStore,
}

#[async_trait::async_trait]
impl ObservationStore for SlowStore {
    async fn save(&self, observation: &Observation) -> Result<(), StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.save(observation).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Observation, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.find_by_id(id).await
    }

    async fn find_many(&self, query: &ObservationQuery) -> Result<Vec<Observation>, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.find_many(query).await
    }
}

fn builtin_service(store: Arc<dyn ObservationStore>) -> ObservationService {
    ObservationService::builder()
        .store(store)
        .clock(Arc::new(FixedClock(t0())))
        .ids(Arc::new(SequentialIds::new("obs")))
        .build()
        .unwrap()
}

fn garden_service(store: Arc<dyn ObservationStore>) -> ObservationService {
    ObservationService::builder()
        .registry(Arc::new(garden_registry()))
        .store(store)
        .clock(Arc::new(FixedClock(t0())))
        .ids(Arc::new(SequentialIds::new("obs")))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_record_textual_goal() {
    let service = builtin_service(Arc::new(MemoryStore::new()));
    let ctx = service.context();

    let obs = service
        .record(
            &ctx,
            "people",
            "goal",
            "textual",
            "urn:example:ada",
            json!({"goal": "Build an observation platform"}),
        )
        .await
        .unwrap();

    assert_eq!(obs.process_id(), GENERIC_UPLOAD_PROCESS);
    assert_eq!(obs.feature_id(), "urn:example:ada");
    assert_eq!(obs.feature_type_id(), "34edda82-0f22-4115-b5cf-406db1330436");
    assert_eq!(obs.property_id(), "4b46d2af-e908-4643-8060-3c85f991a8bf");
    assert_eq!(obs.property_type_id(), "717988a9-f139-4875-b7d7-ac132d7df75b");
    assert_eq!(obs.property_type().label.as_deref(), Some("Textual Goals"));

    let stored = service.find(&ctx, obs.id()).await.unwrap();
    assert_eq!(stored.result(), &json!({"goal": "Build an observation platform"}));
}

#[tokio::test]
async fn test_record_missing_required_field() {
    let service = builtin_service(Arc::new(MemoryStore::new()));

    let err = service
        .record(&service.context(), "people", "goal", "textual", "urn:example:ada", json!({}))
        .await
        .unwrap_err();

    assert_eq!(err.class(), ErrorClass::Invalid);
    let response = err.to_response();
    assert_eq!(response.error, "validation error");
    assert!(response.fields.iter().any(|f| f.field == "goal"));
}

#[tokio::test]
async fn test_record_through_schema_reference() {
    let service = builtin_service(Arc::new(MemoryStore::new()));
    let ctx = service.context();

    assert!(service
        .record(&ctx, "people", "goal", "textual-ref", "urn:example:ada", json!({"goal": "g"}))
        .await
        .is_ok());

    let err = service
        .record(&ctx, "people", "goal", "textual-ref", "urn:example:ada", json!({"goal": 3}))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 422);
}

#[tokio::test]
async fn test_record_unknown_segment() {
    let service = builtin_service(Arc::new(MemoryStore::new()));
    let ctx = service.context();

    let err = service
        .record(&ctx, "gardens", "goal", "textual", "urn:example:ada", json!({}))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 404);
    assert_eq!(err.to_response().error, "could not find feature type 'gardens'");

    let err = service
        .record(&ctx, "people", "goal", "haiku", "urn:example:ada", json!({}))
        .await
        .unwrap_err();
    assert_eq!(err.to_response().error, "could not find property type 'haiku'");
}

#[tokio::test]
async fn test_record_schemaless_passes_payload_through() {
    let service = builtin_service(Arc::new(MemoryStore::new()));
    let payload = json!({"type": "INTJ", "scores": [0.7, 0.2]});

    let obs = service
        .record(
            &service.context(),
            "people",
            "personality",
            "myers-briggs",
            "urn:example:ada",
            payload.clone(),
        )
        .await
        .unwrap();
    assert_eq!(obs.result(), &payload);
}

#[tokio::test]
async fn test_record_rejects_bad_feature_id() {
    let service = builtin_service(Arc::new(MemoryStore::new()));

    let err = service
        .record(&service.context(), "people", "goal", "textual", "ada lovelace", json!({"goal": "g"}))
        .await
        .unwrap_err();
    let ServiceError::Validation(err) = err else {
        panic!("expected validation failure, got {err}");
    };
    assert!(err.has_field("feature.id"));
}

#[tokio::test]
async fn test_record_raw_malformed_body() {
    let service = builtin_service(Arc::new(MemoryStore::new()));

    let err = service
        .record_raw(&service.context(), "people", "goal", "textual", "urn:example:ada", b"{goal")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::MalformedPayload(_)));
    assert_eq!(err.status_code(), 422);
}

#[tokio::test]
async fn test_create_checks_known_schema() {
    let service = garden_service(Arc::new(MemoryStore::new()));
    let mut new_obs = garden_submission();
    new_obs.result = json!({"tulips": 4});

    let err = service.create(&service.context(), new_obs).await.unwrap_err();
    let ServiceError::Validation(err) = err else {
        panic!("expected validation failure, got {err}");
    };
    assert!(err.has_field("result.wisteria"));
}

#[tokio::test]
async fn test_create_unknown_property_type_is_structural_only() {
    let service = garden_service(Arc::new(MemoryStore::new()));
    let mut new_obs = garden_submission();
    new_obs.property_type.id = "urn:example:unlisted".to_string();
    new_obs.result = json!("anything");

    assert!(service.create(&service.context(), new_obs).await.is_ok());
}

#[tokio::test]
async fn test_list_filters_most_recent_first() {
    let service = garden_service(Arc::new(MemoryStore::new()));
    let ctx = service.context();

    for (feature, minutes) in [(GARDEN_ID, 0), ("urn:example:allotment", 5), (GARDEN_ID, 10)] {
        let mut new_obs = submission_for(feature);
        new_obs.result_time = Some(at(minutes));
        service.create(&ctx, new_obs).await.unwrap();
    }

    let hits = service
        .list(&ctx, &[Filter::equals("featureId", GARDEN_ID)])
        .await
        .unwrap();
    let ids: Vec<&str> = hits.iter().map(Observation::id).collect();
    assert_eq!(ids, vec!["obs-3", "obs-1"]);

    let none = service
        .search(&ctx, r#"{"filters":[{"path":"processId","op":"=","match":"urn:example:none"}]}"#)
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_bad_filter_never_reaches_store() {
    let mut store = MockStore::new();
    store.expect_find_many().times(0);
    let service = garden_service(Arc::new(store));

    let err = service
        .list(
            &service.context(),
            &[Filter::equals("featureId", GARDEN_ID), Filter::equals("color", "red")],
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::Filter(_)));
    assert_eq!(err.status_code(), 422);
}

#[tokio::test]
async fn test_save_failure_is_not_success() {
    let mut store = MockStore::new();
    store
        .expect_save()
        .times(1)
        .returning(|_| Err(StoreError::Backend("connection refused on 10.0.0.7".into())));
    let service = garden_service(Arc::new(store));

    let err = service
        .create(&service.context(), garden_submission())
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 500);
    assert_eq!(err.to_response().error, SAVE_FAILED);
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_store_not_found_maps_to_404() {
    let mut store = MockStore::new();
    store
        .expect_find_by_id()
        .withf(|id| id == "missing")
        .returning(|id| Err(StoreError::NotFound(id.to_string())));
    let service = garden_service(Arc::new(store));

    let err = service.find(&service.context(), "missing").await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test(start_paused = true)]
async fn test_slow_store_times_out() {
    let store = SlowStore {
        delay: Duration::from_secs(30),
        inner: MemoryStore::new(),
    };
    let service = ObservationService::builder()
        .registry(Arc::new(garden_registry()))
        .store(Arc::new(store))
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();

    let err = service
        .create(&service.context(), garden_submission())
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(err.status_code(), 500);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_request_aborts_store_call() {
    let store = SlowStore {
        delay: Duration::from_secs(3),
        inner: MemoryStore::new(),
    };
    let service = garden_service(Arc::new(store));
    let (ctx, cancel) = RequestContext::cancellable(Duration::from_secs(5));

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
    });

    let err = service
        .list(&ctx, &[Filter::equals("featureId", GARDEN_ID)])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Storage {
            source: StoreError::Cancelled,
            ..
        }
    ));
}

#[tokio::test]
async fn test_file_backed_service_persists_across_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let config = ServiceConfig::new()
        .with_store_backend(StoreBackend::File)
        .with_store_directory(dir.path());

    let first = ObservationService::from_config(&config).await.unwrap();
    let obs = first
        .record(
            &first.context(),
            "people",
            "goal",
            "daily-goals",
            "urn:example:ada",
            json!({"goals": ["write", "run"], "day": "2020-03-23"}),
        )
        .await
        .unwrap();

    let second = ObservationService::from_config(&config).await.unwrap();
    let found = second.find(&second.context(), obs.id()).await.unwrap();
    assert_eq!(found, obs);
}
