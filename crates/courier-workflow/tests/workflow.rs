//! End-to-end workflow runs against the scripted fake page.

use courier_test_utils::{BannerScript, Behavior, FakeBrowser};
use courier_workflow::plan::AssetOutcome;
use courier_workflow::{
    DeliveryPlan, ErrorCode, NullListener, PageMap, Step, WorkflowConfig, WorkflowDriver,
    WorkflowReport,
};
use pretty_assertions::assert_eq;

fn plan() -> DeliveryPlan {
    DeliveryPlan {
        edit_url: "https://platform.example/listings/42/edit".to_string(),
        floorplan_urls: vec![
            "https://cdn.example.com/plans/ground.pdf".to_string(),
            "https://cdn.example.com/plans/upper.pdf".to_string(),
        ],
        file_urls: vec!["https://cdn.example.com/docs/brochure.pdf".to_string()],
        tour_url: Some("https://tours.example.com/42".to_string()),
        deliver_after_attach: true,
    }
}

async fn run(behavior: Behavior, plan: &DeliveryPlan) -> (FakeBrowser, WorkflowReport) {
    let browser = FakeBrowser::new(behavior);
    let driver = WorkflowDriver::new(PageMap::default(), WorkflowConfig::fast());
    let report = driver.execute(&browser, plan, &NullListener).await;
    (browser, report)
}

#[tokio::test(start_paused = true)]
async fn happy_path_attaches_everything_and_delivers() {
    let (browser, report) = run(Behavior::default(), &plan()).await;

    assert_eq!(report.error, None);
    assert!(report.succeeded());
    assert!(report.actions.imported_floorplans);
    assert!(report.actions.imported_files);
    assert!(report.actions.added_tour);
    assert!(report.actions.saved);
    assert!(report.actions.delivered);

    let floorplans = report.floorplans.expect("floorplan batch ran");
    assert_eq!(floorplans.imported, 2);
    assert_eq!(floorplans.failed, 0);

    assert_eq!(
        browser.committed(),
        vec![
            "brochure.pdf".to_string(),
            "ground.pdf".to_string(),
            "upper.pdf".to_string(),
        ]
    );
    assert_eq!(browser.tours(), vec!["3D Tour".to_string()]);
    assert_eq!(browser.save_clicks(), 1);
    assert_eq!(browser.deliver_clicks(), 1);
}

#[tokio::test(start_paused = true)]
async fn duplicates_are_removed_before_any_interaction() {
    let mut plan = plan();
    plan.floorplan_urls = vec![
        "https://cdn.example.com/plans/a.pdf".to_string(),
        "https://cdn.example.com/plans/A.pdf?x=1".to_string(),
    ];
    plan.file_urls.clear();
    plan.tour_url = None;
    plan.deliver_after_attach = false;

    let (browser, report) = run(Behavior::default(), &plan).await;

    assert!(report.succeeded());
    assert!(report.actions.imported_floorplans);
    let batch = report.floorplans.expect("batch ran");
    assert_eq!(batch.total, 1);
    assert_eq!(batch.duplicates_removed, 1);
    assert_eq!(
        batch.dropped[0].reason,
        courier_assets::DropReason::DuplicateFilename
    );
    // one import for two submitted URLs
    assert_eq!(browser.import_clicks(), 1);
}

#[tokio::test(start_paused = true)]
async fn preattached_asset_is_skipped_not_reimported() {
    let behavior = Behavior {
        preattached: vec!["ground.pdf".to_string()],
        ..Behavior::default()
    };
    let (browser, report) = run(behavior, &plan()).await;

    assert!(report.succeeded());
    let batch = report.floorplans.expect("batch ran");
    assert_eq!(batch.imported, 1);
    assert_eq!(batch.skipped, 1);
    assert!(batch.complete());
    assert!(report.actions.imported_floorplans);
    // upper.pdf and brochure.pdf only
    assert_eq!(browser.import_clicks(), 2);
}

#[tokio::test(start_paused = true)]
async fn garbled_fill_recovers_through_slow_typing() {
    let behavior = Behavior {
        garble_first_fill: true,
        ..Behavior::default()
    };
    let (_, report) = run(behavior, &plan()).await;

    assert!(report.succeeded());
    assert!(report.actions.added_tour);
}

#[tokio::test(start_paused = true)]
async fn commit_never_ready_exhausts_budget_and_fails_retryable() {
    let behavior = Behavior {
        commit_never_ready: true,
        ..Behavior::default()
    };
    let (browser, report) = run(behavior, &plan()).await;

    assert_eq!(report.failed_step, Some(Step::ImportFloorplans));
    let error = report.error.expect("run failed");
    assert_eq!(error.code, ErrorCode::ActionFailed);
    assert!(error.retryable);

    let batch = report.floorplans.expect("partial batch reported");
    let first = &batch.assets[0];
    assert!(matches!(
        first.outcome,
        AssetOutcome::Failed {
            retryable: true,
            ..
        }
    ));
    assert_eq!(first.attempts, 3);
    // both floorplans burn the full budget before the step fails
    assert_eq!(browser.import_clicks(), 6);
    // flag must stay false without a verified postcondition
    assert!(!report.actions.imported_floorplans);
}

#[tokio::test(start_paused = true)]
async fn error_banner_fails_the_asset_without_retry() {
    let behavior = Behavior {
        import_error_banner: Some("unsupported file format".to_string()),
        ..Behavior::default()
    };
    let (browser, report) = run(behavior, &plan()).await;

    assert_eq!(report.failed_step, Some(Step::ImportFloorplans));
    let error = report.error.expect("run failed");
    assert_eq!(error.code, ErrorCode::ActionFailed);
    assert!(!error.retryable);
    assert!(error.message.contains("unsupported file format"));

    let batch = report.floorplans.expect("partial batch reported");
    assert_eq!(batch.assets[0].attempts, 1);
    // one click per floorplan; a content error never consumes retries
    assert_eq!(browser.import_clicks(), 2);
}

#[tokio::test(start_paused = true)]
async fn verification_falls_back_to_reload() {
    let behavior = Behavior {
        hide_committed_until_reload: true,
        ..Behavior::default()
    };
    let (browser, report) = run(behavior, &plan()).await;

    assert!(report.succeeded());
    assert!(browser.reload_calls() >= 1);
    let batch = report.floorplans.expect("batch ran");
    assert_eq!(batch.assets[0].outcome, AssetOutcome::Imported);
    assert_eq!(batch.assets[0].attempts, 1);
}

#[tokio::test(start_paused = true)]
async fn sticky_modal_is_tolerated_when_verification_passes() {
    let behavior = Behavior {
        modal_sticks: true,
        ..Behavior::default()
    };
    let (_, report) = run(behavior, &plan()).await;
    assert!(report.succeeded());
}

#[tokio::test(start_paused = true)]
async fn tour_fields_reset_are_reapplied_before_commit() {
    let behavior = Behavior {
        tour_resets_fields_once: true,
        ..Behavior::default()
    };
    let (browser, report) = run(behavior, &plan()).await;

    assert!(report.succeeded());
    assert!(report.actions.added_tour);
    assert_eq!(browser.tours(), vec!["3D Tour".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn rejected_save_fails_without_retry() {
    let behavior = Behavior {
        save_banner: BannerScript::Error("listing locked by another user".to_string()),
        ..Behavior::default()
    };
    let (browser, report) = run(behavior, &plan()).await;

    assert_eq!(report.failed_step, Some(Step::Save));
    let error = report.error.expect("run failed");
    assert_eq!(error.code, ErrorCode::ActionFailed);
    assert!(!error.retryable);
    // imports happened and stay reported even though the run failed
    assert!(report.actions.imported_floorplans);
    assert!(!report.actions.saved);
    assert_eq!(browser.save_clicks(), 1);
    assert_eq!(browser.deliver_clicks(), 0);
}

#[tokio::test(start_paused = true)]
async fn transient_save_error_is_retried_to_success() {
    let behavior = Behavior {
        save_banner: BannerScript::TransientThenSuccess("gateway timeout".to_string()),
        ..Behavior::default()
    };
    let (browser, report) = run(behavior, &plan()).await;

    assert!(report.succeeded());
    assert!(report.actions.saved);
    assert_eq!(browser.save_clicks(), 2);
}

#[tokio::test(start_paused = true)]
async fn silent_save_counts_as_success() {
    let behavior = Behavior {
        save_banner: BannerScript::Silent,
        deliver_banner: BannerScript::Silent,
        ..Behavior::default()
    };
    let (_, report) = run(behavior, &plan()).await;

    assert!(report.succeeded());
    assert!(report.actions.saved);
    assert!(report.actions.delivered);
}

#[tokio::test(start_paused = true)]
async fn navigation_retries_within_budget() {
    let behavior = Behavior {
        goto_failures: 2,
        ..Behavior::default()
    };
    let (_, report) = run(behavior, &plan()).await;
    assert!(report.succeeded());
}

#[tokio::test(start_paused = true)]
async fn navigation_budget_exhaustion_is_navigation_failed() {
    let behavior = Behavior {
        goto_failures: 3,
        ..Behavior::default()
    };
    let (_, report) = run(behavior, &plan()).await;

    assert_eq!(report.failed_step, Some(Step::Nav));
    let error = report.error.expect("run failed");
    assert_eq!(error.code, ErrorCode::NavigationFailed);
    assert!(error.retryable);
}

#[tokio::test(start_paused = true)]
async fn page_that_never_settles_exhausts_into_timeout() {
    let behavior = Behavior {
        page_never_settles: true,
        ..Behavior::default()
    };
    let (browser, report) = run(behavior, &plan()).await;

    assert_eq!(report.failed_step, Some(Step::Nav));
    let error = report.error.expect("run failed");
    assert_eq!(error.code, ErrorCode::Timeout);
    assert!(error.retryable);
    // never got past navigation
    assert_eq!(browser.import_clicks(), 0);
}

#[tokio::test(start_paused = true)]
async fn empty_sections_are_skipped_with_flags_left_false() {
    let plan = DeliveryPlan {
        edit_url: "https://platform.example/listings/7/edit".to_string(),
        floorplan_urls: vec![],
        file_urls: vec![],
        tour_url: None,
        deliver_after_attach: false,
    };
    let (browser, report) = run(Behavior::default(), &plan).await;

    assert!(report.succeeded());
    assert!(!report.actions.imported_floorplans);
    assert!(!report.actions.imported_files);
    assert!(!report.actions.added_tour);
    assert!(report.actions.saved);
    assert!(!report.actions.delivered);
    assert_eq!(report.floorplans, None);
    assert_eq!(report.files, None);
    assert_eq!(browser.import_clicks(), 0);
    assert_eq!(browser.deliver_clicks(), 0);
}

#[tokio::test(start_paused = true)]
async fn evidence_is_captured_on_failure() {
    use courier_workflow::ProgressListener;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recording {
        evidence: Mutex<Vec<String>>,
        steps: Mutex<Vec<(Step, String)>>,
    }

    #[async_trait::async_trait]
    impl ProgressListener for Recording {
        async fn on_progress(&self, step: Step, detail: &str) {
            self.steps.lock().push((step, detail.to_string()));
        }
        async fn on_evidence(&self, label: &str, image_png: &[u8]) {
            assert!(!image_png.is_empty());
            self.evidence.lock().push(label.to_string());
        }
    }

    let browser = FakeBrowser::new(Behavior {
        commit_never_ready: true,
        ..Behavior::default()
    });
    let driver = WorkflowDriver::new(PageMap::default(), WorkflowConfig::fast());
    let listener = Recording::default();
    let report = driver.execute(&browser, &plan(), &listener).await;

    assert!(!report.succeeded());
    let evidence = listener.evidence.lock();
    assert!(!evidence.is_empty());
    assert!(evidence.iter().any(|label| label.contains("attempt")));
    let steps = listener.steps.lock();
    assert!(steps.iter().any(|(step, _)| *step == Step::Failed));
}
