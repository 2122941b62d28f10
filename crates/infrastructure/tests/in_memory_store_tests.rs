use care_scheduler_domain::{
    CareInstance, CareInstanceRepository, CareStatus, CareTaskInstance, CareTaskType,
    EscalationReason, InstanceRecord, ObservationFrequency, ObservationInstance, ObservationType,
    Priority, ScheduleDay, ScheduleDayRepository,
};
use care_scheduler_errors::CareError;
use care_scheduler_infrastructure::InMemoryCareStore;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};

fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, hour, 0, 0).unwrap()
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
}

async fn store_with_day() -> (InMemoryCareStore, ScheduleDay) {
    let store = InMemoryCareStore::new();
    let day = store
        .create_if_absent(&ScheduleDay::new("ward-a".to_string(), date(), at(0)))
        .await
        .unwrap();
    (store, day)
}

fn task(day_id: i64, hour: u32) -> CareInstance {
    CareTaskInstance::new(
        day_id,
        CareTaskType::PersonalCare,
        Priority::Medium,
        at(hour),
        30,
        at(0),
    )
    .unwrap()
    .into()
}

#[tokio::test]
async fn test_create_if_absent_is_idempotent() {
    let (store, day) = store_with_day().await;

    let again = store
        .create_if_absent(&ScheduleDay::new("ward-a".to_string(), date(), at(5)))
        .await
        .unwrap();

    assert_eq!(again.id, day.id);
    assert_eq!(again.created_at, at(0));
    assert_eq!(store.day_count().await, 1);

    let found = store
        .find_by_department_date("ward-a", date())
        .await
        .unwrap();
    assert_eq!(found, Some(day));
}

#[tokio::test]
async fn test_create_assigns_ids_and_lists_by_day() {
    let (store, day) = store_with_day().await;

    let late = CareInstanceRepository::create(&store, &task(day.id, 14))
        .await
        .unwrap();
    let early = CareInstanceRepository::create(&store, &task(day.id, 8))
        .await
        .unwrap();
    assert!(late.id() > 0);
    assert_ne!(late.id(), early.id());

    let listed = store.find_by_day(day.id).await.unwrap();
    assert_eq!(listed, vec![early.clone(), late]);

    let found = CareInstanceRepository::find_by_id(&store, early.id())
        .await
        .unwrap();
    assert_eq!(found, Some(early));
}

#[tokio::test]
async fn test_compare_and_swap_rejects_stale_version() {
    let (store, day) = store_with_day().await;
    let created = CareInstanceRepository::create(&store, &task(day.id, 9))
        .await
        .unwrap();

    let mut first = created.clone();
    first.lifecycle_mut().status = CareStatus::InProgress;
    first.lifecycle_mut().actual_start_time = Some(at(9));
    first.lifecycle_mut().version = 1;

    let mut second = created.clone();
    second.lifecycle_mut().status = CareStatus::Cancelled;
    second.lifecycle_mut().version = 1;

    assert!(store.compare_and_swap(0, &first).await.unwrap());
    assert!(!store.compare_and_swap(0, &second).await.unwrap());

    let stored = CareInstanceRepository::find_by_id(&store, created.id())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status(), CareStatus::InProgress);
}

#[tokio::test]
async fn test_concurrent_swaps_only_one_wins() {
    let (store, day) = store_with_day().await;
    let created = CareInstanceRepository::create(&store, &task(day.id, 9))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        let mut updated = created.clone();
        updated.lifecycle_mut().version = 1;
        handles.push(tokio::spawn(async move {
            store.compare_and_swap(0, &updated).await.unwrap()
        }));
    }

    let mut wins = 0;
    for handle in handles {
        if handle.await.unwrap() {
            wins += 1;
        }
    }
    assert_eq!(wins, 1);
}

#[tokio::test]
async fn test_escalation_marker_survives_lifecycle_swap() {
    let (store, day) = store_with_day().await;
    let created = CareInstanceRepository::create(&store, &task(day.id, 9))
        .await
        .unwrap();

    store
        .mark_escalated(created.id(), EscalationReason::CriticalOverdue, at(10))
        .await
        .unwrap();

    let mut updated = created.clone();
    updated.lifecycle_mut().status = CareStatus::InProgress;
    updated.lifecycle_mut().actual_start_time = Some(at(10));
    updated.lifecycle_mut().version = 1;
    assert!(store.compare_and_swap(0, &updated).await.unwrap());

    let stored = CareInstanceRepository::find_by_id(&store, created.id())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.lifecycle().last_escalated_at, Some(at(10)));
    assert_eq!(
        stored.lifecycle().last_escalation_reason,
        Some(EscalationReason::CriticalOverdue)
    );
}

#[tokio::test]
async fn test_missing_instance_errors() {
    let store = InMemoryCareStore::new();
    let err = store
        .mark_escalated(42, EscalationReason::MissingFollowUp, at(9))
        .await
        .unwrap_err();
    assert_eq!(err, CareError::InstanceNotFound { id: 42 });

    let err = store.compare_and_swap(0, &task(1, 9)).await.unwrap_err();
    assert!(matches!(err, CareError::InstanceNotFound { .. }));
}

#[tokio::test]
async fn test_undecodable_record_is_listed_but_fails_lookup() {
    let (store, day) = store_with_day().await;
    let obs: CareInstance = ObservationInstance::new(
        day.id,
        "resident-2".to_string(),
        ObservationType::Sleep,
        ObservationFrequency::Daily,
        at(22),
        at(0),
    )
    .into();
    let mut record = InstanceRecord::from(&obs);
    record.id = 77;
    record.frequency = Some("fortnightly".to_string());
    store.import_records(vec![record]).await;

    assert_eq!(store.list_records().await.unwrap().len(), 1);
    let err = CareInstanceRepository::find_by_id(&store, 77)
        .await
        .unwrap_err();
    assert_eq!(err, CareError::UnknownFrequency("fortnightly".to_string()));
}

#[tokio::test]
async fn test_day_update_with_version_check() {
    let (store, day) = store_with_day().await;

    let mut updated = day.clone();
    updated.total_tasks = 3;
    updated.version = 1;
    assert!(store.update(0, &updated).await.unwrap());
    assert!(!store.update(0, &updated).await.unwrap());

    let mut inactive = updated.clone();
    inactive.status = care_scheduler_domain::ScheduleDayStatus::Inactive;
    inactive.version = 2;
    assert!(store.update(1, &inactive).await.unwrap());
    assert!(store.list_active().await.unwrap().is_empty());
}
