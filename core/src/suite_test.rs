#[cfg(test)]
mod tests {
    use crate::engine::ReactiveEngine;
    use crate::error::BenchError;
    use crate::report::{SuiteOutcome, TrialResult};
    use crate::scenario::{self, Scenario, ScenarioKind};
    use crate::suite::{Suite, SuiteObserver, SuiteState};
    use crate::testing::{
        ProbeEngine, abandoning_scenario, as_engine, failing_scenario, mismatched_scenario, never_settling_scenario,
        quick_timing,
    };
    use std::rc::Rc;

    #[derive(Default)]
    struct Recorder {
        started: Vec<String>,
        cycles: Vec<String>,
        completions: usize,
    }

    impl SuiteObserver for Recorder {
        fn on_start(&mut self, scenario: &Scenario) {
            self.started.push(scenario.key().to_string());
        }

        fn on_cycle(&mut self, _scenario: &Scenario, result: &TrialResult) {
            self.cycles.push(result.candidate.clone());
        }

        fn on_complete(&mut self, _outcome: &SuiteOutcome) {
            self.completions += 1;
        }
    }

    fn suite(scenario: Scenario, engines: &[&Rc<ProbeEngine>]) -> Suite {
        let candidates = engines.iter().map(|e| as_engine(e)).collect();
        Suite::new(scenario, candidates, quick_timing()).unwrap()
    }

    async fn run(scenario: Scenario, engines: &[&Rc<ProbeEngine>]) -> (SuiteOutcome, Recorder) {
        let mut recorder = Recorder::default();
        let outcome = suite(scenario, engines).run(&mut recorder).await;
        (outcome, recorder)
    }

    #[tokio::test]
    async fn test_suite_completes_with_ranking() {
        let eager = ProbeEngine::eager("eager");
        let lazy = ProbeEngine::lazy("lazy");
        let mut s = suite(scenario::find("update_with_reaction").unwrap(), &[&eager, &lazy]);
        assert_eq!(s.state(), SuiteState::Idle);
        assert_eq!(s.candidate_names(), vec!["eager", "lazy"]);

        let mut recorder = Recorder::default();
        let outcome = s.run(&mut recorder).await;
        assert!(!outcome.is_errored());
        assert_eq!(s.state(), SuiteState::Complete);
        assert_eq!(recorder.started, vec!["update_with_reaction"]);
        assert_eq!(recorder.cycles, vec!["eager", "lazy"]);
        assert_eq!(recorder.completions, 1);

        let ranking = outcome.ranking().unwrap();
        assert_eq!(ranking.entries().len(), 2);
        assert!(!outcome.fastest().is_empty());
        assert!(outcome.summary().starts_with("Fastest is ["));
        for result in &outcome.results {
            assert!(result.sample_count >= 2);
            assert!(result.mean_ns > 0.0);
            assert_eq!(result.counters.reactions, result.counters.last_observed as u64);
        }
    }

    #[tokio::test]
    async fn test_error_is_attributed_and_stops_suite() {
        let first = ProbeEngine::eager("first");
        let second = ProbeEngine::eager("second");
        let third = ProbeEngine::eager("third");
        let (outcome, recorder) = run(failing_scenario("boom", "second", false), &[&first, &second, &third]).await;

        assert!(outcome.is_errored());
        assert_eq!(recorder.cycles, vec!["first"]);
        assert_eq!(recorder.completions, 1);
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].candidate, "first");
        assert_eq!(third.created(), 0);

        let error = outcome.error().unwrap();
        assert_eq!(error.kind(), "scenario");
        assert_eq!(error.candidate(), Some("second"));
        assert!(error.to_string().contains("mutation rejected"));
        assert!(outcome.summary().starts_with("Errored: second failed in 'boom'"));
        assert!(outcome.fastest().is_empty());
    }

    #[tokio::test]
    async fn test_failed_suite_ends_errored() {
        let ok = ProbeEngine::eager("ok");
        let bad = ProbeEngine::eager("bad");
        let mut s = suite(failing_scenario("boom", "bad", false), &[&ok, &bad]);
        let outcome = s.run(&mut Recorder::default()).await;
        assert!(outcome.is_errored());
        assert_eq!(s.state(), SuiteState::Errored);
    }

    #[tokio::test]
    async fn test_panic_becomes_scenario_error() {
        let ok = ProbeEngine::eager("ok");
        let bad = ProbeEngine::eager("bad");
        let (outcome, _) = run(failing_scenario("explode", "bad", true), &[&ok, &bad]).await;
        let error = outcome.error().unwrap();
        assert_eq!(error.candidate(), Some("bad"));
        assert!(error.to_string().contains("panicked: engine exploded"));
        assert_eq!(outcome.results.len(), 1);
    }

    #[tokio::test]
    async fn test_unsettled_trial_times_out() {
        let engine = ProbeEngine::eager("slow");
        let (outcome, recorder) = run(never_settling_scenario("hang"), &[&engine]).await;
        let error = outcome.error().unwrap();
        assert_eq!(error.kind(), "timeout");
        assert_eq!(error.candidate(), Some("slow"));
        assert!(recorder.cycles.is_empty());
        assert_eq!(recorder.completions, 1);
    }

    #[tokio::test]
    async fn test_dropped_completion_is_abandoned() {
        let engine = ProbeEngine::eager("quitter");
        let (outcome, _) = run(abandoning_scenario("abandon"), &[&engine]).await;
        assert!(matches!(
            outcome.error(),
            Some(BenchError::Abandoned { scenario, candidate }) if scenario == "abandon" && candidate == "quitter"
        ));
    }

    #[tokio::test]
    async fn test_outcome_kind_mismatch_is_contract_error() {
        let engine = ProbeEngine::eager("probe");
        for kind in [ScenarioKind::Sync, ScenarioKind::Async] {
            let (outcome, _) = run(mismatched_scenario("mismatch", kind), &[&engine]).await;
            let error = outcome.error().unwrap();
            assert_eq!(error.kind(), "contract");
            let expected = match kind {
                ScenarioKind::Sync => "returned a pending completion",
                ScenarioKind::Async => "returned without a completion",
            };
            assert!(error.to_string().contains(expected), "{}", error);
        }
    }

    #[tokio::test]
    async fn test_async_scenario_measures_every_candidate() {
        let eager = ProbeEngine::eager("eager");
        let lazy = ProbeEngine::lazy("lazy");
        let (outcome, recorder) = run(scenario::find("async_create_update_observe").unwrap(), &[&eager, &lazy]).await;
        assert!(!outcome.is_errored(), "{}", outcome.summary());
        assert_eq!(recorder.cycles, vec!["eager", "lazy"]);
        assert_eq!(eager.created() as u64, outcome.results[0].counters.creates);
        assert_eq!(lazy.created() as u64, outcome.results[1].counters.creates);
    }

    #[tokio::test]
    async fn test_candidate_counters_are_isolated() {
        let first = ProbeEngine::eager("first");
        let second = ProbeEngine::lazy("second");
        let (outcome, _) = run(scenario::find("update_read_unobserved").unwrap(), &[&first, &second]).await;
        for result in &outcome.results {
            assert!(result.counters.reads > 0);
            assert_eq!(result.counters.last_observed as u64, result.counters.reads, "{}", result.candidate);
        }
    }

    #[tokio::test]
    async fn test_timeline_is_ordered() {
        let engine = ProbeEngine::eager("probe");
        let (outcome, _) = run(scenario::find("create").unwrap(), &[&engine]).await;
        let timeline = outcome.timeline;
        let first = timeline.first_trial.unwrap();
        assert!(timeline.started <= first);
        assert!(first <= timeline.completed);
    }

    #[test]
    fn test_rejects_bad_candidate_lists() {
        let a = as_engine(&ProbeEngine::eager("same"));
        let b = as_engine(&ProbeEngine::lazy("same"));
        let dup = Suite::new(scenario::find("create").unwrap(), vec![a, b], quick_timing());
        assert!(matches!(dup, Err(BenchError::DuplicateCandidate(name)) if name == "same"));

        let empty: Vec<Rc<dyn ReactiveEngine>> = Vec::new();
        let none = Suite::new(scenario::find("create").unwrap(), empty, quick_timing());
        assert!(matches!(none, Err(BenchError::NoCandidates)));
    }
}
