//! End-to-end runs over an on-disk catalog with recording collaborators.

#[cfg(test)]
mod tests {
    use crate::catalog::{CatalogStore, JsonCatalogStore};
    use crate::core::Item;
    use crate::pipeline::{Collaborators, Orchestrator, RunOutcome, RunSettings};
    use crate::core::DayKey;
    use crate::propagation::{PropagationChecker, PropagationPolicy};
    use crate::publish::PagesHost;
    use crate::social::carousel_urls;
    use crate::testing::fixtures::items_for_day;
    use crate::testing::mocks::{
        CallLog, FailingCatalogStore, RecordingNotifier, RecordingPruner, RecordingRenderer,
        RecordingSiteGenerator, RecordingSleeper, RecordingSocialPublisher, ScriptedProbe,
        StaticFeed, StaticMonitor, StaticPublisher,
    };
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    const DAY: &str = "20250115";

    struct Harness {
        _dir: TempDir,
        log: CallLog,
        catalog: Arc<JsonCatalogStore>,
        feed: Arc<StaticFeed>,
        site: Arc<RecordingSiteGenerator>,
        social: Arc<RecordingSocialPublisher>,
        pruner: Arc<RecordingPruner>,
        probe: Arc<ScriptedProbe>,
        sleeper: Arc<RecordingSleeper>,
        notifier: Arc<RecordingNotifier>,
        publisher: Arc<StaticPublisher>,
        monitor: Arc<StaticMonitor>,
        catalog_override: Option<Arc<dyn CatalogStore>>,
        skipped_cards: Vec<u32>,
        settings: RunSettings,
    }

    impl Harness {
        fn new(items: Vec<Item>) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let log = CallLog::new();
            Self {
                catalog: Arc::new(JsonCatalogStore::new(dir.path().join("data/products.json"))),
                _dir: dir,
                feed: Arc::new(StaticFeed::new(items).with_log(log.clone())),
                site: Arc::new(RecordingSiteGenerator::new().with_log(log.clone())),
                social: Arc::new(RecordingSocialPublisher::new().with_log(log.clone())),
                pruner: Arc::new(RecordingPruner::new().with_log(log.clone())),
                probe: Arc::new(ScriptedProbe::found_on(1)),
                sleeper: Arc::new(RecordingSleeper::new()),
                notifier: Arc::new(RecordingNotifier::new().with_log(log.clone())),
                publisher: Arc::new(StaticPublisher::new(true).with_log(log.clone())),
                monitor: Arc::new(StaticMonitor::quiet().with_log(log.clone())),
                catalog_override: None,
                skipped_cards: Vec::new(),
                settings: RunSettings {
                    host_id: Some("octo".into()),
                    propagation: PropagationPolicy::new(4, Duration::from_secs(30)),
                    today: NaiveDate::from_ymd_opt(2025, 1, 15),
                    ..Default::default()
                },
                log,
            }
        }

        fn orchestrator(&self) -> Orchestrator {
            let catalog: Arc<dyn CatalogStore> = match &self.catalog_override {
                Some(store) => store.clone(),
                None => self.catalog.clone(),
            };
            let collaborators = Collaborators {
                feed: self.feed.clone(),
                renderer: Arc::new(
                    RecordingRenderer::skipping(&self.skipped_cards).with_log(self.log.clone()),
                ),
                catalog,
                site: self.site.clone(),
                publisher: self.publisher.clone(),
                propagation: PropagationChecker::with_sleeper(
                    self.probe.clone(),
                    self.sleeper.clone(),
                ),
                social: self.social.clone(),
                pruner: self.pruner.clone(),
                credentials: self.monitor.clone(),
                notifier: self.notifier.clone(),
            };
            Orchestrator::new(collaborators, self.settings.clone())
        }

        fn stored(&self) -> Vec<Item> {
            self.catalog.load().unwrap().into_items()
        }
    }

    fn failure_stage(outcome: &RunOutcome) -> &'static str {
        match outcome {
            RunOutcome::Failed(report) => report.stage_label(),
            RunOutcome::Succeeded(_) => panic!("expected the run to fail"),
        }
    }

    #[tokio::test]
    async fn test_full_run_succeeds_and_notifies_once() {
        let harness = Harness::new(items_for_day(DAY, 10));

        let outcome = harness.orchestrator().run().await;

        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(
            harness.log.calls(),
            vec![
                "collect",
                "render",
                "regenerate",
                "publish",
                "social",
                "prune",
                "credentials",
                "notify"
            ]
        );
        let messages = harness.notifier.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("작업 성공"));
        assert_eq!(harness.feed.limits(), vec![10]);
        assert_eq!(harness.pruner.windows(), vec![30]);
    }

    #[tokio::test]
    async fn test_shorter_rerun_replaces_the_day() {
        let harness = Harness::new(items_for_day(DAY, 10));

        assert!(harness.orchestrator().run().await.is_success());
        let first = harness.stored();
        assert_eq!(first.len(), 10);
        assert!(first.iter().all(|item| item.date == DAY));
        assert_eq!(
            first.iter().map(|item| item.rank).collect::<Vec<_>>(),
            (1..=10).collect::<Vec<u32>>()
        );

        harness.feed.set_items(items_for_day(DAY, 8));
        assert!(harness.orchestrator().run().await.is_success());

        assert_eq!(harness.stored(), items_for_day(DAY, 8));
        assert_eq!(harness.site.sizes(), vec![10, 8]);
    }

    #[tokio::test]
    async fn test_other_days_survive_in_order() {
        let harness = Harness::new(items_for_day(DAY, 3));
        let mut older = items_for_day("20250114", 2);
        older.extend(items_for_day("20250113", 2));
        harness.catalog.replace(&older).unwrap();

        assert!(harness.orchestrator().run().await.is_success());

        let mut expected = items_for_day(DAY, 3);
        expected.extend(older);
        assert_eq!(harness.stored(), expected);
    }

    #[tokio::test]
    async fn test_corrupt_catalog_is_repaired() {
        let harness = Harness::new(items_for_day(DAY, 2));
        std::fs::create_dir_all(harness.catalog.path().parent().unwrap()).unwrap();
        std::fs::write(harness.catalog.path(), "[{ broken").unwrap();

        assert!(harness.orchestrator().run().await.is_success());
        assert_eq!(harness.stored(), items_for_day(DAY, 2));
    }

    #[tokio::test]
    async fn test_persist_failure_stops_later_stages() {
        let mut harness = Harness::new(items_for_day(DAY, 10));
        harness.catalog_override =
            Some(Arc::new(FailingCatalogStore::new().with_log(harness.log.clone())));

        let outcome = harness.orchestrator().run().await;

        assert_eq!(outcome.exit_code(), 1);
        assert_eq!(failure_stage(&outcome), "3. persist");
        assert_eq!(
            harness.log.calls(),
            vec!["collect", "render", "load", "replace", "notify"]
        );
        assert_eq!(harness.probe.calls(), 0);
        assert!(harness.social.posts().is_empty());
        assert!(harness.pruner.windows().is_empty());

        let messages = harness.notifier.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("단계: 3. persist"));
        assert!(messages[0].contains("read-only store"));
    }

    #[tokio::test]
    async fn test_feed_failure_is_reported() {
        let mut harness = Harness::new(Vec::new());
        harness.feed =
            Arc::new(StaticFeed::failing("401 unauthorized").with_log(harness.log.clone()));

        let outcome = harness.orchestrator().run().await;

        assert_eq!(failure_stage(&outcome), "1. collect");
        assert_eq!(harness.log.calls(), vec!["collect", "notify"]);
        assert!(harness.notifier.messages()[0].contains("401 unauthorized"));
        assert!(!harness.catalog.path().exists());
    }

    #[tokio::test]
    async fn test_rejected_push_is_fatal() {
        let mut harness = Harness::new(items_for_day(DAY, 3));
        harness.publisher = Arc::new(StaticPublisher::new(false).with_log(harness.log.clone()));

        let outcome = harness.orchestrator().run().await;

        assert_eq!(failure_stage(&outcome), "4. publish");
        assert_eq!(harness.probe.calls(), 0);
        assert!(harness.social.posts().is_empty());
    }

    #[tokio::test]
    async fn test_propagation_timeout_blocks_social_post() {
        let mut harness = Harness::new(items_for_day(DAY, 3));
        harness.probe = Arc::new(ScriptedProbe::never_found());

        let outcome = harness.orchestrator().run().await;

        assert_eq!(failure_stage(&outcome), "5. propagation");
        assert_eq!(harness.probe.calls(), 4);
        assert_eq!(harness.sleeper.sleeps(), vec![Duration::from_secs(30); 3]);
        assert!(harness.social.posts().is_empty());
        assert!(harness.notifier.messages()[0].contains("00_cover.jpg"));
    }

    #[tokio::test]
    async fn test_missing_host_id_uses_fixed_delay() {
        let mut harness = Harness::new(items_for_day(DAY, 3));
        harness.settings.host_id = None;

        let outcome = harness.orchestrator().run().await;

        assert!(outcome.is_success());
        assert_eq!(harness.probe.calls(), 0);
        assert_eq!(harness.sleeper.sleeps(), vec![Duration::from_secs(120)]);
    }

    #[tokio::test]
    async fn test_best_effort_failures_do_not_fail_the_run() {
        let mut harness = Harness::new(items_for_day(DAY, 3));
        harness.pruner =
            Arc::new(RecordingPruner::failing("permission denied").with_log(harness.log.clone()));
        harness.monitor =
            Arc::new(StaticMonitor::failing("bad date").with_log(harness.log.clone()));

        let outcome = harness.orchestrator().run().await;

        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(harness.notifier.messages().len(), 1);
        assert!(harness.log.contains("prune"));
        assert!(harness.log.contains("credentials"));
    }

    #[tokio::test]
    async fn test_credential_warning_rides_on_success_report() {
        let mut harness = Harness::new(items_for_day(DAY, 3));
        harness.monitor =
            Arc::new(StaticMonitor::warning("토큰 만료까지 5일").with_log(harness.log.clone()));

        harness.orchestrator().run().await;

        let messages = harness.notifier.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("작업 성공"));
        assert!(messages[0].contains("토큰 만료까지 5일"));
    }

    #[tokio::test]
    async fn test_social_receives_collected_items() {
        let harness = Harness::new(items_for_day(DAY, 10));
        harness.orchestrator().run().await;
        assert_eq!(harness.social.posts(), vec![items_for_day(DAY, 10)]);
    }

    #[tokio::test]
    async fn test_skipped_card_stays_out_of_the_carousel() {
        let mut harness = Harness::new(items_for_day(DAY, 3));
        harness.skipped_cards = vec![2];

        let outcome = harness.orchestrator().run().await;

        assert!(outcome.is_success());
        let posts = harness.social.posts();
        assert_eq!(posts.len(), 1);
        let ranks: Vec<u32> = posts[0].iter().map(|item| item.rank).collect();
        assert_eq!(ranks, vec![1, 3]);

        let day = DayKey::parse(DAY).unwrap();
        let urls = carousel_urls(&PagesHost::new("octo"), &day, &posts[0], 8);
        assert_eq!(urls.len(), 4);
        assert!(urls.iter().all(|url| !url.ends_with("/02.jpg")));

        // The catalog still lists every collected item.
        assert_eq!(harness.stored(), items_for_day(DAY, 3));
        match outcome {
            RunOutcome::Succeeded(report) => assert_eq!(report.artifacts, 4),
            RunOutcome::Failed(report) => panic!("unexpected failure: {}", report.text()),
        }
    }
}
