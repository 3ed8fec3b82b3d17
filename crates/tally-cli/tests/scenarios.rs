//! Bundled scenarios run end to end.

use std::io::Write;
use std::path::PathBuf;
use tally_cli::{ScenarioFile, ScenarioRunner, Step, StepOutcome};
use tally_gossip::GossipError;

fn bundled(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("scenarios")
        .join(name)
}

#[tokio::test]
async fn partition_and_heal_converges() {
    let scenario = ScenarioFile::load(bundled("partition-and-heal.toml")).unwrap();
    let report = ScenarioRunner::boot(scenario).await.unwrap().run().await.unwrap();

    assert!(report.passed(), "{report}");
    assert!(report.converged(), "{report}");
    for replica in &report.replicas {
        assert_eq!(replica.accounts.get("alice"), Some(&100));
        assert_eq!(replica.accounts.get("broker"), Some(&900));
    }

    let ledger = report.records.last().unwrap();
    assert_eq!(ledger.outcome.to_string().lines().count(), 3);
}

#[tokio::test]
async fn account_lifecycle_passes() {
    let scenario = ScenarioFile::load(bundled("account-lifecycle.toml")).unwrap();
    let report = ScenarioRunner::boot(scenario).await.unwrap().run().await.unwrap();

    assert!(report.passed(), "{report}");
    assert!(report.converged(), "{report}");
    assert!(report.replicas.iter().all(|r| !r.accounts.contains_key("carol")));
}

#[tokio::test]
async fn wrong_expectation_is_reported() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
        name = "wrong"
        replicas = [{{ address = "h:1" }}]

        [[steps]]
        action = "balance"
        replica = "h:1"
        account = "broker"
        expect_balance = 5
        "#
    )
    .unwrap();

    let scenario = ScenarioFile::load(file.path()).unwrap();
    let report = ScenarioRunner::boot(scenario).await.unwrap().run().await.unwrap();

    assert!(!report.passed());
    assert_eq!(
        report.mismatches().collect::<Vec<_>>(),
        vec!["expected balance 5, got 1000"]
    );
}

#[tokio::test]
async fn sessions_carry_causal_clocks() {
    let scenario = ScenarioFile::from_toml_str(
        r#"
        name = "sessions"
        replicas = [{ address = "h:1" }, { address = "h:2", role = "B" }]
        "#,
    )
    .unwrap();
    let mut runner = ScenarioRunner::boot(scenario).await.unwrap();

    let create = Step::Create {
        replica: "h:1".to_string(),
        client: "ann".to_string(),
        account: "ann".to_string(),
        expect_error: None,
    };
    let outcome = runner.step(&create).await.unwrap();
    assert!(matches!(outcome, StepOutcome::Stamped(_)));
    assert_eq!(runner.session("ann").as_slice(), &[1, 0]);
    assert_eq!(runner.session("other").as_slice(), &[0, 0]);
    assert_eq!(runner.registry().lookup_servers("DistLedger", None).len(), 2);
}

#[tokio::test]
async fn leave_detaches_replica_from_network() {
    let scenario = ScenarioFile::from_toml_str(
        r#"
        name = "leave"
        replicas = [{ address = "h:1" }, { address = "h:2", role = "B" }]
        "#,
    )
    .unwrap();
    let mut runner = ScenarioRunner::boot(scenario).await.unwrap();

    let leave = Step::Leave {
        replica: "h:2".to_string(),
    };
    assert_eq!(runner.step(&leave).await.unwrap(), StepOutcome::Done);
    assert_eq!(runner.registry().lookup_servers("DistLedger", None), vec!["h:1"]);
    assert_eq!(
        runner.network().deliver("h:1", "h:2", vec![]).await,
        Err(GossipError::unreachable("h:2"))
    );
}
