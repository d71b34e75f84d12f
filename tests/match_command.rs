use approx::assert_relative_eq;
use geomatch_cli::{
    batch::BatchRunner,
    dataset::load_dataset,
    report::{write_reports, FeatureReport, Status},
};
use geomatch_config::Runtime;
use geomatch_decision::{CombinationRule, DecisionPolicy};
use geomatch_evidence::{
    Curve, EvidenceSource, Geometry, Matcher, MembershipBank, MembershipFunction,
    OutcomeBanks, Shape,
};
use std::{
    path::Path,
    process::Command,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

fn base() -> &'static Path {
    Path::new(file!()).parent().unwrap_or(Path::new("."))
}

async fn run_fixtures() -> Result<Vec<FeatureReport>, Box<dyn std::error::Error>> {
    let config = geomatch_config::toml::load_config(&base().join("fixtures/calibration.toml"))?;
    let runner = BatchRunner::new(config.matcher()?, &config.runtime);
    let tasks = load_dataset(base().join("fixtures/dataset.json"))?.tasks()?;
    Ok(runner.run(tasks).await)
}

#[tokio::test]
async fn test_match_dataset() -> Result<(), Box<dyn std::error::Error>> {
    let reports = run_fixtures().await?;
    let references: Vec<&str> = reports.iter().map(|r| r.reference.as_str()).collect();
    assert_eq!(references, vec!["road", "well", "orphan"]);

    let road = &reports[0];
    assert_eq!(road.status, Status::Evaluated);
    assert_eq!(road.verdict.as_deref(), Some("matched"));
    assert_eq!(road.candidate.as_deref(), Some("highway"));
    // Only the distance kernel's {track} mass conflicts with the orientation kernel.
    assert_relative_eq!(road.conflict.unwrap_or_default(), 0.1, epsilon = 1e-12);
    assert_eq!(road.supports.len(), 3);
    assert_eq!(road.supports[0].candidate.as_deref(), Some("highway"));
    assert_relative_eq!(road.supports[0].belief, 0.8 / 0.9, epsilon = 1e-12);
    assert_relative_eq!(road.supports[0].plausibility, 0.8 / 0.9, epsilon = 1e-12);
    assert_relative_eq!(road.supports[1].belief, 0.1 / 0.9, epsilon = 1e-12);
    assert_eq!(road.supports[2].candidate, None);
    assert_relative_eq!(road.supports[2].belief, 0.0);

    // The reference point is too far away and has no orientation.
    let well = &reports[1];
    assert_eq!(well.verdict.as_deref(), Some("no_match"));
    assert_eq!(well.candidate, None);
    assert_relative_eq!(well.conflict.unwrap_or_default(), 0.0);
    assert_relative_eq!(well.supports[1].belief, 0.9, epsilon = 1e-12);

    let orphan = &reports[2];
    assert_eq!(orphan.status, Status::Failed);
    assert!(orphan.verdict.is_none());
    assert!(orphan.error.is_some());
    Ok(())
}

#[tokio::test]
async fn test_write_reports() -> Result<(), Box<dyn std::error::Error>> {
    let reports = run_fixtures().await?;
    let mut buffer = Vec::new();
    write_reports(&mut buffer, &reports)?;
    let output = String::from_utf8(buffer)?;
    let parsed = output
        .lines()
        .map(serde_json::from_str::<FeatureReport>)
        .collect::<Result<Vec<_>, _>>()?;
    assert_eq!(parsed.len(), reports.len());
    for (parsed, report) in parsed.iter().zip(&reports) {
        assert_eq!(parsed.reference, report.reference);
        assert_eq!(parsed.status, report.status);
        assert_eq!(parsed.verdict, report.verdict);
        assert_eq!(parsed.candidate, report.candidate);
        assert_eq!(parsed.supports.len(), report.supports.len());
        assert_relative_eq!(
            parsed.conflict.unwrap_or_default(),
            report.conflict.unwrap_or_default(),
            epsilon = 1e-12
        );
    }
    Ok(())
}

/// A source that takes longer than any reasonable feature timeout.
#[derive(Debug)]
struct Slow(OutcomeBanks);

impl EvidenceSource<Shape> for Slow {
    fn name(&self) -> &str {
        "slow"
    }

    fn banks(&self) -> &OutcomeBanks {
        &self.0
    }

    fn measure(&self, reference: &Shape, candidate: &Shape) -> Option<f64> {
        std::thread::sleep(Duration::from_millis(300));
        Some(reference.distance(candidate))
    }
}

#[tokio::test]
async fn test_feature_timeout() -> Result<(), Box<dyn std::error::Error>> {
    let banks = OutcomeBanks {
        matched: Some(MembershipBank::new(vec![MembershipFunction::new(
            -1.0,
            10.0,
            Curve::Constant { value: 0.9 },
        )?])),
        ..Default::default()
    };
    let matcher = Matcher::<Shape>::new(
        vec![Box::new(Slow(banks))],
        DecisionPolicy::default(),
        CombinationRule::Dempster,
    )?;
    let runner = BatchRunner::new(
        matcher,
        &Runtime {
            max_concurrent_features: 1,
            feature_timeout_ms: Some(20),
        },
    );
    let tasks = load_dataset(base().join("fixtures/dataset.json"))?.tasks()?;
    let reports = runner.run(tasks[..1].to_vec()).await;
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].reference, "road");
    assert_eq!(reports[0].status, Status::TimedOut);
    assert!(reports[0].error.is_some());

    let unbounded = BatchRunner::new(
        Matcher::<Shape>::new(
            vec![Box::new(Slow(OutcomeBanks::default()))],
            DecisionPolicy::default(),
            CombinationRule::Dempster,
        )?,
        &Runtime {
            max_concurrent_features: 1,
            feature_timeout_ms: None,
        },
    );
    let reports = unbounded.run(tasks[..1].to_vec()).await;
    assert_eq!(reports[0].status, Status::Evaluated);
    assert_eq!(reports[0].verdict.as_deref(), Some("ambiguous"));
    Ok(())
}

/// Records the highest number of criterion measurements running at the same time.
#[derive(Debug, Default)]
struct Counting {
    banks: OutcomeBanks,
    running: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl EvidenceSource<Shape> for Counting {
    fn name(&self) -> &str {
        "counting"
    }

    fn banks(&self) -> &OutcomeBanks {
        &self.banks
    }

    fn measure(&self, reference: &Shape, candidate: &Shape) -> Option<f64> {
        let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(50));
        self.running.fetch_sub(1, Ordering::SeqCst);
        Some(reference.distance(candidate))
    }
}

#[tokio::test]
async fn test_timed_out_features_hold_their_permit() -> Result<(), Box<dyn std::error::Error>> {
    let peak = Arc::new(AtomicUsize::new(0));
    let source = Counting {
        peak: peak.clone(),
        ..Default::default()
    };
    let runner = BatchRunner::new(
        Matcher::<Shape>::new(
            vec![Box::new(source)],
            DecisionPolicy::default(),
            CombinationRule::Dempster,
        )?,
        &Runtime {
            max_concurrent_features: 1,
            feature_timeout_ms: Some(10),
        },
    );
    let tasks = load_dataset(base().join("fixtures/dataset.json"))?.tasks()?;
    let reports = runner.run(tasks[..2].to_vec()).await;
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.status == Status::TimedOut));

    // Let the abandoned evaluations finish before reading the peak.
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(peak.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn test_cli_commands() -> Result<(), Box<dyn std::error::Error>> {
    let geomatch = env!("CARGO_BIN_EXE_geomatch");

    let check = Command::new(geomatch)
        .args(["-l", "error", "check", "--config"])
        .arg(base().join("fixtures/calibration.toml"))
        .output()?;
    assert!(check.status.success());
    let stdout = String::from_utf8(check.stdout)?;
    assert!(stdout.contains("source distance: distance, weight 1, 3 membership functions"));
    assert!(stdout.contains("source orientation: orientation, weight 0.5, 2 membership functions"));

    let output = Command::new(geomatch)
        .args(["-l", "error", "match", "--config"])
        .arg(base().join("fixtures/calibration.toml"))
        .arg("--input")
        .arg(base().join("fixtures/dataset.json"))
        .output()?;
    assert!(output.status.success());
    let reports = String::from_utf8(output.stdout)?
        .lines()
        .map(serde_json::from_str::<FeatureReport>)
        .collect::<Result<Vec<_>, _>>()?;
    assert_eq!(reports.len(), 3);
    assert_eq!(reports[0].candidate.as_deref(), Some("highway"));

    let missing = Command::new(geomatch)
        .args(["-l", "error", "check", "--config"])
        .arg(base().join("fixtures/missing.toml"))
        .output()?;
    assert!(!missing.status.success());
    Ok(())
}
