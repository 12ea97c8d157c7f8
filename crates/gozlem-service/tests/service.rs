mod support;

use std::time::Duration;

use gozlem_aggregate::DigestFilter;
use gozlem_core::error::ValidationError;
use gozlem_core::models::assessment::Assessment;
use gozlem_core::models::domain::{Domain, RiskLevel};
use gozlem_core::models::media::PendingMedia;
use gozlem_core::models::observation::{Observation, ObservationPatch};
use gozlem_service::clock::Clock;
use gozlem_service::error::ServiceError;
use gozlem_service::events::ChangeEvent;
use gozlem_storage::memory::{Fault, Op};
use support::{Harness, is_assessment_for, wait_for};
use uuid::Uuid;

fn stored_observation(h: &Harness, child_id: Uuid, note: &str, at_second: i64) -> Observation {
    let at = jiff::Timestamp::from_second(at_second).unwrap();
    let observation = Observation {
        id: Uuid::new_v4(),
        child_id,
        author_id: h.author,
        note: note.to_string(),
        domains: vec![Domain::Math, Domain::Art],
        context: Default::default(),
        tags: vec![],
        media_ids: vec![],
        shared_with_family: false,
        created_at: at,
        updated_at: at,
        pending_sync: false,
    };
    h.store.seed_observation(observation.clone());
    observation
}

#[tokio::test]
async fn online_submit_stores_and_assesses_in_background() {
    let h = Harness::new(true);
    let mut events = h.service.feed().subscribe();
    let child = Uuid::new_v4();

    let obs = h
        .service
        .submit(h.draft(child, "Çocuk arkadaşıyla kavga etti ve vurdu", &[Domain::Social]))
        .await
        .unwrap();

    assert!(!obs.pending_sync);
    assert!(h.queue.is_empty().unwrap());
    assert_eq!(h.store.observations().len(), 1);

    match wait_for(&mut events, is_assessment_for(obs.id)).await {
        ChangeEvent::AssessmentUpdated { risk, .. } => assert_eq!(risk, RiskLevel::High),
        other => panic!("unexpected event {other:?}"),
    }
    let assessment = h.store.assessment(obs.id).unwrap();
    assert_eq!(assessment.risk, RiskLevel::High);
    assert!(!assessment.suggestions.is_empty());
}

#[tokio::test]
async fn offline_submit_queues_without_store_calls() {
    let h = Harness::new(false);
    let obs = h
        .service
        .submit(h.draft(Uuid::new_v4(), "Bağımsız şekilde başardı", &[Domain::Math]))
        .await
        .unwrap();

    assert!(obs.pending_sync);
    let queued = h.queue.list_all().unwrap();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].id(), obs.id);
    assert_eq!(queued[0].enqueued_at, h.clock.timestamp());
    assert_eq!(h.store.total_calls(), 0);
}

#[tokio::test]
async fn transient_insert_failure_falls_back_to_queue() {
    let h = Harness::new(true);
    h.store.fail(Op::Insert, Fault::Transient);

    let obs = h
        .service
        .submit(h.draft(Uuid::new_v4(), "Resim yaptı", &[Domain::Art]))
        .await
        .unwrap();

    assert!(obs.pending_sync);
    assert_eq!(h.queue.list_all().unwrap().len(), 1);
    assert_eq!(h.store.calls(Op::UpsertAssessment), 0);
}

#[tokio::test]
async fn rejected_insert_is_queued_not_surfaced() {
    let h = Harness::new(true);
    h.store.fail(Op::Insert, Fault::Rejected);

    let obs = h
        .service
        .submit(h.draft(Uuid::new_v4(), "Resim yaptı", &[Domain::Art]))
        .await
        .unwrap();

    assert!(obs.pending_sync);
    let queued = h.queue.list_all().unwrap();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].id(), obs.id);
    assert_eq!(h.store.calls(Op::UpsertAssessment), 0);
}

#[tokio::test]
async fn unreadable_media_is_queued_not_surfaced() {
    let dir = tempfile::tempdir().unwrap();
    let h = Harness::new(true);
    let mut draft = h.draft(Uuid::new_v4(), "Kolaj yaptı", &[Domain::Art]);
    draft.pending_media = vec![PendingMedia {
        local_path: dir.path().join("gone.jpg"),
        file_name: "gone.jpg".to_string(),
        content_type: None,
    }];

    let obs = h.service.submit(draft).await.unwrap();

    assert!(obs.pending_sync);
    let entry = h.queue.list_all().unwrap().remove(0);
    assert_eq!(entry.pending_media.len(), 1);
    assert_eq!(h.store.calls(Op::Insert), 0);
}

#[tokio::test]
async fn invalid_drafts_never_reach_store_or_queue() {
    let h = Harness::new(true);
    let child = Uuid::new_v4();

    let empty = h.service.submit(h.draft(child, "   ", &[Domain::Art])).await;
    assert!(matches!(
        empty,
        Err(ServiceError::Validation(ValidationError::EmptyNote))
    ));

    let no_domain = h.service.submit(h.draft(child, "Not", &[])).await;
    assert!(matches!(
        no_domain,
        Err(ServiceError::Validation(ValidationError::NoDomains))
    ));

    assert_eq!(h.store.total_calls(), 0);
    assert!(h.queue.is_empty().unwrap());
}

#[tokio::test]
async fn assessment_failure_does_not_fail_submit() {
    let h = Harness::new(true);
    h.store.fail(Op::UpsertAssessment, Fault::Transient);
    let mut events = h.service.feed().subscribe();

    let obs = h
        .service
        .submit(h.draft(Uuid::new_v4(), "Şarkı söyledi", &[Domain::Music]))
        .await
        .unwrap();
    assert!(!obs.pending_sync);

    let event = wait_for(&mut events, is_assessment_for(obs.id)).await;
    assert!(matches!(event, ChangeEvent::AssessmentFailed { .. }));
    assert!(h.store.assessment(obs.id).is_none());
    assert_eq!(h.store.observations().len(), 1);
}

#[tokio::test]
async fn update_note_recomputes_assessment() {
    let h = Harness::new(true);
    let mut events = h.service.feed().subscribe();
    let child = Uuid::new_v4();

    let obs = h
        .service
        .submit(h.draft(child, "Arkadaşına vurdu", &[Domain::Social]))
        .await
        .unwrap();
    wait_for(&mut events, is_assessment_for(obs.id)).await;

    let patch = ObservationPatch {
        note: Some("Bağımsız şekilde başardı".to_string()),
        ..Default::default()
    };
    h.advance_minutes(5);
    let updated = h.service.update(obs.id, patch).await.unwrap();
    assert_eq!(updated.note, "Bağımsız şekilde başardı");
    assert!(updated.updated_at > updated.created_at);

    match wait_for(&mut events, is_assessment_for(obs.id)).await {
        ChangeEvent::AssessmentUpdated { risk, .. } => assert_eq!(risk, RiskLevel::Low),
        other => panic!("unexpected event {other:?}"),
    }

    let listed = h.service.list_for_child(child).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].observation.note, "Bağımsız şekilde başardı");
    assert_eq!(listed[0].risk(), Some(RiskLevel::Low));
}

#[tokio::test]
async fn update_without_input_change_keeps_assessment() {
    let h = Harness::new(true);
    let mut events = h.service.feed().subscribe();

    let obs = h
        .service
        .submit(h.draft(Uuid::new_v4(), "Boya ile çalıştı", &[Domain::Art]))
        .await
        .unwrap();
    wait_for(&mut events, is_assessment_for(obs.id)).await;

    let patch = ObservationPatch {
        shared_with_family: Some(true),
        tags: Some(vec!["aile".to_string()]),
        ..Default::default()
    };
    let updated = h.service.update(obs.id, patch).await.unwrap();
    assert!(updated.shared_with_family);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.store.calls(Op::UpsertAssessment), 1);
}

#[tokio::test]
async fn update_rejections() {
    let h = Harness::new(false);
    let queued = h
        .service
        .submit(h.draft(Uuid::new_v4(), "Kuyrukta", &[Domain::Art]))
        .await
        .unwrap();
    let note = || ObservationPatch {
        note: Some("x".to_string()),
        ..Default::default()
    };

    let pending = h.service.update(queued.id, note()).await.unwrap_err();
    assert!(matches!(
        pending,
        ServiceError::Validation(ValidationError::PendingSync(id)) if id == queued.id
    ));

    let empty = h
        .service
        .update(queued.id, ObservationPatch::default())
        .await
        .unwrap_err();
    assert!(matches!(
        empty,
        ServiceError::Validation(ValidationError::EmptyPatch)
    ));

    let offline = h.service.update(Uuid::new_v4(), note()).await.unwrap_err();
    assert!(matches!(offline, ServiceError::Offline));
    assert!(offline.is_recoverable());

    h.connectivity.set_online(true);
    let missing_id = Uuid::new_v4();
    let missing = h.service.update(missing_id, note()).await.unwrap_err();
    assert!(matches!(
        missing,
        ServiceError::Validation(ValidationError::NotFound(id)) if id == missing_id
    ));
}

#[tokio::test]
async fn transient_update_failure_is_recoverable_and_not_queued() {
    let h = Harness::new(true);
    let obs = stored_observation(&h, Uuid::new_v4(), "Sayı saydı", 1_000);
    h.store.fail(Op::Update, Fault::Transient);

    let err = h
        .service
        .update(
            obs.id,
            ObservationPatch {
                note: Some("Sayıları sıraladı".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    assert!(err.is_recoverable());
    assert!(h.queue.is_empty().unwrap());
    assert_eq!(h.store.observations()[0].note, "Sayı saydı");
}

#[tokio::test]
async fn delete_aborts_when_assessment_delete_fails() {
    let h = Harness::new(true);
    let obs = stored_observation(&h, Uuid::new_v4(), "Dans etti", 1_000);
    h.store.fail(Op::DeleteAssessment, Fault::Transient);

    let err = h.service.delete(obs.id).await.unwrap_err();
    assert!(err.is_recoverable());
    assert_eq!(h.store.observations().len(), 1);
    assert_eq!(h.store.calls(Op::Delete), 0);

    h.store.clear_faults();
    h.service.delete(obs.id).await.unwrap();
    assert!(h.store.observations().is_empty());
}

#[tokio::test]
async fn deleted_ids_are_terminal() {
    let h = Harness::new(true);
    let obs = stored_observation(&h, Uuid::new_v4(), "Dans etti", 1_000);
    h.store.seed_assessment(Assessment {
        observation_id: obs.id,
        risk: RiskLevel::Low,
        domain_scores: Default::default(),
        suggestions: vec![],
        summary: String::new(),
        created_at: obs.created_at,
    });

    h.service.delete(obs.id).await.unwrap();
    assert!(h.store.assessment(obs.id).is_none());

    let again = h.service.delete(obs.id).await.unwrap_err();
    assert!(matches!(
        again,
        ServiceError::Validation(ValidationError::Deleted(_))
    ));
    let edit = h
        .service
        .update(
            obs.id,
            ObservationPatch {
                note: Some("x".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        edit,
        ServiceError::Validation(ValidationError::Deleted(_))
    ));
}

#[tokio::test]
async fn deleting_a_queued_observation_discards_it_locally() {
    let h = Harness::new(false);
    let obs = h
        .service
        .submit(h.draft(Uuid::new_v4(), "Taslak", &[Domain::Art]))
        .await
        .unwrap();

    h.service.delete(obs.id).await.unwrap();
    assert!(h.queue.is_empty().unwrap());
    assert_eq!(h.store.total_calls(), 0);
}

#[tokio::test]
async fn list_puts_queued_first_then_newest_stored() {
    let h = Harness::new(false);
    let child = Uuid::new_v4();
    stored_observation(&h, child, "ten", 10);
    stored_observation(&h, child, "thirty", 30);
    stored_observation(&h, child, "twenty", 20);
    stored_observation(&h, Uuid::new_v4(), "other child", 40);

    h.service
        .submit(h.draft(child, "queued first", &[Domain::Art]))
        .await
        .unwrap();
    h.advance_minutes(1);
    h.service
        .submit(h.draft(child, "queued second", &[Domain::Art]))
        .await
        .unwrap();

    let offline = h.service.list_for_child(child).await.unwrap();
    let notes: Vec<&str> = offline.iter().map(|r| r.observation.note.as_str()).collect();
    assert_eq!(notes, vec!["queued first", "queued second"]);

    h.connectivity.set_online(true);
    let online = h.service.list_for_child(child).await.unwrap();
    let notes: Vec<&str> = online.iter().map(|r| r.observation.note.as_str()).collect();
    assert_eq!(
        notes,
        vec!["queued first", "queued second", "thirty", "twenty", "ten"]
    );
    assert!(online[0].observation.pending_sync);
    assert!(!online[2].observation.pending_sync);
}

#[tokio::test]
async fn list_degrades_on_transient_failures() {
    let h = Harness::new(true);
    let child = Uuid::new_v4();
    let obs = stored_observation(&h, child, "stored", 10);
    h.store.seed_assessment(Assessment {
        observation_id: obs.id,
        risk: RiskLevel::Medium,
        domain_scores: Default::default(),
        suggestions: vec![],
        summary: String::new(),
        created_at: obs.created_at,
    });

    h.store.fail(Op::QueryAssessments, Fault::Transient);
    let without = h.service.list_for_child(child).await.unwrap();
    assert_eq!(without.len(), 1);
    assert!(without[0].assessment.is_none());

    h.store.clear_faults();
    let with = h.service.list_for_child(child).await.unwrap();
    assert_eq!(with[0].risk(), Some(RiskLevel::Medium));

    h.store.fail(Op::QueryByChild, Fault::Transient);
    assert!(h.service.list_for_child(child).await.unwrap().is_empty());

    h.store.fail(Op::QueryByChild, Fault::Rejected);
    assert!(h.service.list_for_child(child).await.is_err());
}

#[tokio::test]
async fn recompute_fills_missing_and_forces_all() {
    let h = Harness::new(true);
    let child = Uuid::new_v4();
    let assessed = stored_observation(&h, child, "Bugün sınıfta oynadı", 10);
    let bare = stored_observation(&h, child, "Kavga etti", 20);
    h.store.seed_assessment(Assessment {
        observation_id: assessed.id,
        risk: RiskLevel::Low,
        domain_scores: [(Domain::Math, 2), (Domain::Art, 2)].into(),
        suggestions: vec![],
        summary: String::new(),
        created_at: assessed.created_at,
    });

    let report = h.service.recompute_assessments(h.author, false).await.unwrap();
    assert_eq!(report.examined, 2);
    assert_eq!(report.recomputed, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(h.store.assessment(bare.id).unwrap().risk, RiskLevel::High);
    assert_eq!(h.store.assessment(assessed.id).unwrap().risk, RiskLevel::Low);

    let forced = h.service.recompute_assessments(h.author, true).await.unwrap();
    assert_eq!(forced.recomputed, 2);
    // No markers, so the stored average of 2.0 decides.
    assert_eq!(h.store.assessment(assessed.id).unwrap().risk, RiskLevel::High);

    h.store.fail(Op::UpsertAssessment, Fault::Transient);
    let failing = h.service.recompute_assessments(h.author, true).await.unwrap();
    assert_eq!(failing.failed, 2);

    let nobody = h.service.recompute_assessments(Uuid::new_v4(), true).await.unwrap();
    assert_eq!(nobody.examined, 0);
}

#[tokio::test]
async fn recompute_respects_limit() {
    let h = Harness::with_config(
        true,
        gozlem_service::config::ServiceConfig {
            recompute_limit: 2,
            ..Default::default()
        },
    );
    let child = Uuid::new_v4();
    for at in [10, 20, 30] {
        stored_observation(&h, child, "Oynadı", at);
    }
    let report = h.service.recompute_assessments(h.author, false).await.unwrap();
    assert_eq!(report.examined, 2);
}

#[tokio::test]
async fn child_overview_combines_queued_and_stored() {
    let h = Harness::new(true);
    let mut events = h.service.feed().subscribe();
    let child = Uuid::new_v4();

    let obs = h
        .service
        .submit(h.draft(child, "Kavga etti", &[Domain::Social]))
        .await
        .unwrap();
    wait_for(&mut events, is_assessment_for(obs.id)).await;

    h.connectivity.set_online(false);
    h.service
        .submit(h.draft(child, "Sakin oynadı", &[Domain::Social, Domain::Music]))
        .await
        .unwrap();
    h.connectivity.set_online(true);

    let report = h.service.child_overview(child).await.unwrap();
    assert_eq!(report.child_id, child);
    assert_eq!(report.overview.observation_count, 2);
    assert_eq!(report.overview.overall_risk, RiskLevel::High);
    assert_eq!(report.overview.top_domains[0], Domain::Social);
    assert_eq!(report.activity.len(), 7);
    assert_eq!(report.activity[6].observations, 2);
    assert_eq!(report.weekly_trend[&Domain::Social][0], 2);
}

#[tokio::test]
async fn class_digest_scopes_children() {
    let h = Harness::new(true);
    let now = h.clock.timestamp().as_second();
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    stored_observation(&h, a, "a1", now - 60);
    stored_observation(&h, a, "a2", now - 120);
    stored_observation(&h, b, "b1", now - 60);
    stored_observation(&h, b, "old", now - 90 * 86_400);

    let all = h
        .service
        .class_digest(vec![], DigestFilter::default())
        .await
        .unwrap();
    assert_eq!(all.digest.observation_count, 3);

    let only_a = h
        .service
        .class_digest(vec![a], DigestFilter::default())
        .await
        .unwrap();
    assert_eq!(only_a.digest.observation_count, 2);
    assert_eq!(only_a.digest.domain_counts.get(&Domain::Math), Some(&2));
}

#[tokio::test]
async fn pending_media_is_uploaded_online_and_queued_offline() {
    let dir = tempfile::tempdir().unwrap();
    let photo = dir.path().join("photo.jpg");
    std::fs::write(&photo, b"jpeg").unwrap();
    let pending = PendingMedia {
        local_path: photo,
        file_name: "photo.jpg".to_string(),
        content_type: Some("image/jpeg".to_string()),
    };

    let online = Harness::new(true);
    let mut draft = online.draft(Uuid::new_v4(), "Resim çizdi", &[Domain::Art]);
    draft.pending_media.push(pending.clone());
    let stored = online.service.submit(draft).await.unwrap();
    assert_eq!(stored.media_ids.len(), 1);
    assert_eq!(online.store.media_paths(), stored.media_ids);

    let url = online.service.media_url(&stored.media_ids[0]).await.unwrap();
    assert!(url.contains("expires_in=3600"));

    let offline = Harness::new(false);
    let mut draft = offline.draft(Uuid::new_v4(), "Resim çizdi", &[Domain::Art]);
    draft.pending_media.push(pending.clone());
    let queued = offline.service.submit(draft).await.unwrap();
    assert!(queued.media_ids.is_empty());
    assert_eq!(offline.queue.list_all().unwrap()[0].pending_media, vec![pending]);
}

#[tokio::test]
async fn explain_uses_stored_assessment() {
    let h = Harness::new(true);
    let mut events = h.service.feed().subscribe();
    let obs = h
        .service
        .submit(h.draft(Uuid::new_v4(), "Zorlandı, yardım istedi, huzursuzdu", &[Domain::Social]))
        .await
        .unwrap();

    assert!(h.service.explain(Uuid::new_v4()).await.is_err());

    wait_for(&mut events, is_assessment_for(obs.id)).await;
    let explanation = h.service.explain(obs.id).await.unwrap().unwrap();
    assert_eq!(explanation.risk, RiskLevel::Medium);
    assert_eq!(explanation.warn_markers, vec!["zorlan", "yardim", "huzursuz"]);
}
