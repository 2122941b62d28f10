use std::sync::Arc;
use std::time::Duration;

use care_scheduler_config::SweepConfig;
use care_scheduler_domain::{
    AlertSink, CareStatus, EscalationPolicy, EscalationReason, InstanceRecord, ObservationFrequency,
    ObservationType, Priority,
};
use care_scheduler_scheduling::{OverdueSweepService, OverdueSweeper, SWEEPER_ACTOR};
use care_scheduler_testing_utils::{
    fixed_time, CareTaskBuilder, FailingAlertSink, ObservationBuilder, RecordingAlertSink,
    ScheduleDayBuilder, SeededStore,
};
use tokio::sync::broadcast;

fn sweeper(seeded: &SeededStore, sink: Arc<dyn AlertSink>, config: SweepConfig) -> OverdueSweeper {
    OverdueSweeper::new(
        Arc::new(seeded.store.clone()),
        sink,
        EscalationPolicy::default(),
        config,
    )
}

async fn seeded() -> SeededStore {
    SeededStore::new(ScheduleDayBuilder::new().build()).await
}

#[tokio::test]
async fn test_critical_overdue_raises_single_alert() {
    let seeded = seeded().await;
    let task = seeded
        .add(CareTaskBuilder::new().with_priority(Priority::Critical).build())
        .await;
    let sink = RecordingAlertSink::new();
    let sweeper = sweeper(&seeded, Arc::new(sink.clone()), SweepConfig::default());

    let first = sweeper.sweep_once(fixed_time(8, 30)).await.unwrap();
    assert_eq!(first.evaluated, 1);
    assert_eq!(first.overdue, 1);
    assert_eq!(first.escalations_raised, 1);
    assert_eq!(first.alerts[0].instance_id, task.id());
    assert_eq!(first.alerts[0].reason, EscalationReason::CriticalOverdue);

    let second = sweeper.sweep_once(fixed_time(9, 0)).await.unwrap();
    assert_eq!(second.escalations_raised, 0);
    assert_eq!(second.escalations_suppressed, 1);
    assert_eq!(sink.count().await, 1);

    let stored = seeded.reload(task.id()).await.unwrap();
    assert_eq!(
        stored.lifecycle().last_escalation_reason,
        Some(EscalationReason::CriticalOverdue)
    );
    // 默认不写回逾期状态
    assert_eq!(stored.status(), CareStatus::Scheduled);
}

#[tokio::test]
async fn test_realert_after_window() {
    let seeded = seeded().await;
    seeded
        .add(CareTaskBuilder::new().with_priority(Priority::Urgent).build())
        .await;
    let sink = RecordingAlertSink::new();
    let config = SweepConfig {
        realert_after_minutes: Some(60),
        ..SweepConfig::default()
    };
    let sweeper = sweeper(&seeded, Arc::new(sink.clone()), config);

    sweeper.sweep_once(fixed_time(8, 30)).await.unwrap();
    let within = sweeper.sweep_once(fixed_time(9, 0)).await.unwrap();
    assert_eq!(within.escalations_suppressed, 1);

    let after = sweeper.sweep_once(fixed_time(9, 30)).await.unwrap();
    assert_eq!(after.escalations_raised, 1);
    assert_eq!(sink.count().await, 2);
}

#[tokio::test]
async fn test_unknown_frequency_is_isolated() {
    let seeded = seeded().await;
    let good = seeded
        .add(CareTaskBuilder::new().with_priority(Priority::Critical).build())
        .await;

    let mut broken = InstanceRecord::from(&ObservationBuilder::new().with_id(900).build());
    broken.schedule_day_id = seeded.day.id;
    broken.frequency = Some("every_full_moon".to_string());
    seeded.store.import_records(vec![broken]).await;

    let sink = RecordingAlertSink::new();
    let sweeper = sweeper(&seeded, Arc::new(sink.clone()), SweepConfig::default());
    let report = sweeper.sweep_once(fixed_time(9, 0)).await.unwrap();

    assert_eq!(report.evaluated, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].instance_id, 900);
    assert!(report.failures[0].error.contains("every_full_moon"));
    assert_eq!(report.alerts[0].instance_id, good.id());
}

#[tokio::test]
async fn test_missed_recurrence_for_sensitive_observation() {
    let seeded = seeded().await;
    let obs = seeded
        .add(
            ObservationBuilder::new()
                .with_observation_type(ObservationType::SafetyCheck)
                .with_frequency(ObservationFrequency::Hourly)
                .build(),
        )
        .await;
    let sink = RecordingAlertSink::new();
    let sweeper = sweeper(&seeded, Arc::new(sink.clone()), SweepConfig::default());

    let early = sweeper.sweep_once(fixed_time(8, 30)).await.unwrap();
    assert_eq!(early.overdue, 1);
    assert_eq!(early.escalations_raised, 0);

    let late = sweeper.sweep_once(fixed_time(9, 30)).await.unwrap();
    assert_eq!(late.escalations_raised, 1);
    assert_eq!(late.alerts[0].instance_id, obs.id());
    assert_eq!(late.alerts[0].reason, EscalationReason::MissedRecurrence);
}

#[tokio::test]
async fn test_missing_follow_up_on_completed_task() {
    let seeded = seeded().await;
    seeded
        .add(
            CareTaskBuilder::new()
                .with_status(CareStatus::Completed)
                .with_follow_up_required(true)
                .build(),
        )
        .await;
    let sink = RecordingAlertSink::new();
    let sweeper = sweeper(&seeded, Arc::new(sink.clone()), SweepConfig::default());

    let report = sweeper.sweep_once(fixed_time(12, 0)).await.unwrap();
    assert_eq!(report.overdue, 0);
    assert_eq!(report.alerts[0].reason, EscalationReason::MissingFollowUp);
}

#[tokio::test]
async fn test_persist_overdue_status() {
    let seeded = seeded().await;
    let task = seeded.add(CareTaskBuilder::new().build()).await;
    let sink = RecordingAlertSink::new();
    let config = SweepConfig {
        persist_overdue_status: true,
        ..SweepConfig::default()
    };
    let sweeper = sweeper(&seeded, Arc::new(sink.clone()), config);

    let report = sweeper.sweep_once(fixed_time(9, 0)).await.unwrap();
    assert_eq!(report.overdue_persisted, 1);

    let stored = seeded.reload(task.id()).await.unwrap();
    assert_eq!(stored.status(), CareStatus::Overdue);
    assert_eq!(stored.lifecycle().last_actor.as_deref(), Some(SWEEPER_ACTOR));
    assert_eq!(stored.version(), task.version() + 1);

    // 已是 overdue 的记录不再重复写回
    let again = sweeper.sweep_once(fixed_time(9, 30)).await.unwrap();
    assert_eq!(again.overdue, 1);
    assert_eq!(again.overdue_persisted, 0);
}

#[tokio::test]
async fn test_failed_delivery_is_retried_next_sweep() {
    let seeded = seeded().await;
    let task = seeded
        .add(CareTaskBuilder::new().with_priority(Priority::Critical).build())
        .await;
    let sink = FailingAlertSink::new();
    let sweeper = sweeper(&seeded, Arc::new(sink.clone()), SweepConfig::default());

    let first = sweeper.sweep_once(fixed_time(9, 0)).await.unwrap();
    assert_eq!(first.escalations_raised, 0);
    assert_eq!(first.failures.len(), 1);
    assert_eq!(first.failures[0].instance_id, task.id());

    let stored = seeded.reload(task.id()).await.unwrap();
    assert_eq!(stored.lifecycle().last_escalation_reason, None);

    sweeper.sweep_once(fixed_time(9, 5)).await.unwrap();
    assert_eq!(sink.attempts(), 2);
}

#[tokio::test]
async fn test_sweep_loop_stops_on_shutdown() {
    let seeded = seeded().await;
    let sink = RecordingAlertSink::new();
    let config = SweepConfig {
        interval_seconds: 1,
        ..SweepConfig::default()
    };
    let sweeper = Arc::new(sweeper(&seeded, Arc::new(sink), config));
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let handle = {
        let sweeper = sweeper.clone();
        tokio::spawn(async move { sweeper.start(shutdown_rx).await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown_tx.send(()).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("sweep loop did not stop");
    assert!(result.unwrap().is_ok());
}

#[tokio::test]
async fn test_disabled_sweeper_returns_immediately() {
    let seeded = seeded().await;
    let config = SweepConfig {
        enabled: false,
        ..SweepConfig::default()
    };
    let sweeper = sweeper(&seeded, Arc::new(RecordingAlertSink::new()), config);
    let (_tx, rx) = broadcast::channel(1);

    assert!(sweeper.start(rx).await.is_ok());
}

#[tokio::test]
async fn test_due_window_counts_upcoming_records() {
    let seeded = seeded().await;
    seeded.add(CareTaskBuilder::new().build()).await;
    let sweeper = sweeper(
        &seeded,
        Arc::new(RecordingAlertSink::new()),
        SweepConfig::default(),
    )
    .with_due_window(chrono::Duration::minutes(30));

    assert_eq!(sweeper.sweep_once(fixed_time(7, 0)).await.unwrap().due_soon, 0);

    let report = sweeper.sweep_once(fixed_time(7, 30)).await.unwrap();
    assert_eq!(report.due_soon, 1);
    assert_eq!(report.overdue, 0);
}

#[tokio::test]
async fn test_deferred_critical_task_still_escalates() {
    for persist in [false, true] {
        let seeded = seeded().await;
        let task = seeded
            .add(
                CareTaskBuilder::new()
                    .with_priority(Priority::Critical)
                    .with_status(CareStatus::Deferred)
                    .build(),
            )
            .await;
        let sink = RecordingAlertSink::new();
        let config = SweepConfig {
            persist_overdue_status: persist,
            ..SweepConfig::default()
        };
        let sweeper = sweeper(&seeded, Arc::new(sink.clone()), config);

        let report = sweeper.sweep_once(fixed_time(9, 0)).await.unwrap();
        assert_eq!(report.overdue, 1, "persist={persist}");
        assert!(report.failures.is_empty(), "persist={persist}");
        assert_eq!(report.overdue_persisted, 0);
        assert_eq!(report.escalations_raised, 1);
        assert_eq!(report.alerts[0].reason, EscalationReason::CriticalOverdue);

        // 延期状态不被改写
        let stored = seeded.reload(task.id()).await.unwrap();
        assert_eq!(stored.status(), CareStatus::Deferred);
    }
}

#[tokio::test]
async fn test_terminal_sensitive_observations_are_not_escalated() {
    for persist in [false, true] {
        let seeded = seeded().await;
        seeded
            .add(
                ObservationBuilder::new()
                    .with_observation_type(ObservationType::VitalSigns)
                    .with_frequency(ObservationFrequency::Hourly)
                    .with_status(CareStatus::Cancelled)
                    .build(),
            )
            .await;
        seeded
            .add(
                ObservationBuilder::new()
                    .with_observation_type(ObservationType::SafetyCheck)
                    .with_frequency(ObservationFrequency::Hourly)
                    .with_status(CareStatus::Completed)
                    .build(),
            )
            .await;
        let sink = RecordingAlertSink::new();
        let config = SweepConfig {
            persist_overdue_status: persist,
            ..SweepConfig::default()
        };
        let sweeper = sweeper(&seeded, Arc::new(sink.clone()), config);

        let report = sweeper.sweep_once(fixed_time(12, 0)).await.unwrap();
        assert_eq!(report.evaluated, 2, "persist={persist}");
        assert_eq!(report.overdue, 0);
        assert!(report.alerts.is_empty());
        assert!(report.failures.is_empty());
        assert_eq!(sink.count().await, 0);
    }
}
