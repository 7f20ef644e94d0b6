//! End-to-end pipeline tests: a whole session against the in-tree engine,
//! plus deliberately broken devices to prove the checkers catch them.

use std::time::Duration;

use async_trait::async_trait;
use modcheck_sim::{Device, RegPath, SerialDivider, TickInput, TickOutput};
use modcheck_verify::{Session, SessionConfig, StimulusPolicy, VerifyError};

fn config(divisor: u64, policy: StimulusPolicy, num_streams: u64) -> SessionConfig {
    SessionConfig {
        divisor,
        policy,
        num_streams,
        max_len: 16,
        seed: 0xD15EC7,
        timeout: Duration::from_secs(30),
        gap_probability: 0.3,
    }
}

#[tokio::test]
async fn clean_run_passes_with_full_accounting() {
    let session = Session::new(config(3, StimulusPolicy::Skewed, 200)).unwrap();
    let report = session.run().await.unwrap();

    assert!(report.passed);
    assert_eq!(report.streams_driven, 200);
    assert_eq!(report.matched, 200);
    assert!(report.mismatches.is_empty());
    assert!(report.leftovers.is_empty());
    assert!(report.consistency_failures.is_empty());
    // two register paths sampled after every stream
    assert_eq!(report.register_checks, 400);
    // skewed stimulus produces both verdicts
    assert!(report.coverage.verdict_covered);
    assert_eq!(report.coverage.streams_sampled, 200);
}

#[tokio::test]
async fn same_seed_reproduces_an_identical_report() {
    let cfg = config(7, StimulusPolicy::Uniform, 120);
    let first = Session::new(cfg.clone()).unwrap().run().await.unwrap();
    let second = Session::new(cfg).unwrap().run().await.unwrap();

    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[tokio::test]
async fn zero_length_streams_are_divisible() {
    let session = Session::new(SessionConfig {
        max_len: 0,
        gap_probability: 0.0,
        ..config(2, StimulusPolicy::Uniform, 3)
    })
    .unwrap();
    let report = session.run().await.unwrap();
    // every empty stream has value 0, so every verdict is "divisible"
    assert!(report.passed);
    assert_eq!(report.matched, 3);
}

#[tokio::test]
async fn rejects_invalid_configuration() {
    assert!(Session::new(SessionConfig {
        max_len: 64,
        ..SessionConfig::default()
    })
    .is_err());
    assert!(Session::new(SessionConfig {
        gap_probability: 1.5,
        ..SessionConfig::default()
    })
    .is_err());

    let session = Session::new(SessionConfig {
        divisor: 1,
        ..SessionConfig::default()
    })
    .unwrap();
    // divisor validation happens when the engine is built
    assert!(matches!(
        session.run().await,
        Err(VerifyError::Config(_))
    ));
}

/// Engine wrapper that inverts every verdict it emits.
struct InvertingDevice(SerialDivider);

#[async_trait]
impl Device for InvertingDevice {
    async fn reset(&mut self) {
        self.0.reset().await;
    }
    async fn start_stream(&mut self) {
        self.0.start_stream().await;
    }
    async fn tick(&mut self, input: TickInput) -> TickOutput {
        let mut out = self.0.tick(input).await;
        if out.valid {
            out.result = !out.result;
        }
        out
    }
    async fn read_count(&self, path: RegPath) -> u64 {
        self.0.read_count(path).await
    }
    fn divisor(&self) -> u64 {
        self.0.divisor()
    }
}

#[tokio::test]
async fn inverted_verdicts_are_all_caught() {
    let cfg = config(3, StimulusPolicy::Uniform, 50);
    let device = InvertingDevice(SerialDivider::new(cfg.divisor).unwrap());
    let report = Session::new(cfg)
        .unwrap()
        .run_with_device(device)
        .await
        .unwrap();

    assert!(!report.passed);
    assert_eq!(report.mismatches.len(), 50);
    assert_eq!(report.matched, 0);
    assert!(report.leftovers.is_empty());
}

/// Engine wrapper whose shadow register path reads one too high.
struct SkewedShadowDevice(SerialDivider);

#[async_trait]
impl Device for SkewedShadowDevice {
    async fn reset(&mut self) {
        self.0.reset().await;
    }
    async fn start_stream(&mut self) {
        self.0.start_stream().await;
    }
    async fn tick(&mut self, input: TickInput) -> TickOutput {
        self.0.tick(input).await
    }
    async fn read_count(&self, path: RegPath) -> u64 {
        let count = self.0.read_count(RegPath::Direct).await;
        match path {
            RegPath::Direct => count,
            RegPath::Shadow => count + 1,
        }
    }
    fn divisor(&self) -> u64 {
        self.0.divisor()
    }
}

#[tokio::test]
async fn dual_path_disagreement_is_a_consistency_error() {
    let cfg = config(3, StimulusPolicy::Skewed, 40);
    let device = SkewedShadowDevice(SerialDivider::new(cfg.divisor).unwrap());
    let report = Session::new(cfg)
        .unwrap()
        .run_with_device(device)
        .await
        .unwrap();

    assert!(!report.passed);
    assert!(report.mismatches.is_empty(), "verdicts themselves are fine");
    assert_eq!(report.consistency_failures.len(), 40);
    assert!(report
        .consistency_failures
        .iter()
        .all(|f| f.path == RegPath::Shadow && f.read_back == f.predicted + 1));
}

/// Engine that never answers.
struct SilentDevice(SerialDivider);

#[async_trait]
impl Device for SilentDevice {
    async fn reset(&mut self) {
        self.0.reset().await;
    }
    async fn start_stream(&mut self) {
        self.0.start_stream().await;
    }
    async fn tick(&mut self, input: TickInput) -> TickOutput {
        self.0.tick(input).await;
        TickOutput::default()
    }
    async fn read_count(&self, path: RegPath) -> u64 {
        self.0.read_count(path).await
    }
    fn divisor(&self) -> u64 {
        self.0.divisor()
    }
}

#[tokio::test]
async fn silent_device_trips_the_bounded_wait() {
    let cfg = config(5, StimulusPolicy::Uniform, 10);
    let device = SilentDevice(SerialDivider::new(cfg.divisor).unwrap());
    let result = Session::new(cfg).unwrap().run_with_device(device).await;
    assert!(matches!(result, Err(VerifyError::ResponseTimeout(_))));
}

/// Engine that stalls forever on its first tick.
struct StallingDevice;

#[async_trait]
impl Device for StallingDevice {
    async fn reset(&mut self) {}
    async fn start_stream(&mut self) {}
    async fn tick(&mut self, _input: TickInput) -> TickOutput {
        std::future::pending().await
    }
    async fn read_count(&self, _path: RegPath) -> u64 {
        0
    }
    fn divisor(&self) -> u64 {
        5
    }
}

#[tokio::test]
async fn session_timeout_is_fatal() {
    let cfg = SessionConfig {
        timeout: Duration::from_millis(50),
        ..config(5, StimulusPolicy::Uniform, 1)
    };
    let result = Session::new(cfg).unwrap().run_with_device(StallingDevice).await;
    assert!(matches!(result, Err(VerifyError::Timeout(_))));
}
