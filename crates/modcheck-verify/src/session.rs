//! Session orchestration: the concurrent verification pipeline.
//!
//! One driver loop owns the device and advances the shared time base, tick
//! by tick. Every tick's activity is broadcast on independent unbounded
//! channels to the stimulus observer, the result observer and the register
//! mirror, so observation never blocks driving. The stimulus observer fans
//! reconstructed streams out to the prediction path and to coverage; the
//! result observer fans verdicts out to the checking path and to coverage.
//! The scoreboard is the only state touched from two producers and sits
//! behind a mutex. The whole run is bounded by a session timeout, which is
//! the only fatal cancellation trigger.

use std::sync::Arc;
use std::time::Duration;

use modcheck_sim::{Device, RegPath, SerialDivider, TickInput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::time::timeout;
use tracing::{debug, info};

use crate::coverage::CoverageTracker;
use crate::error::{VerifyError, VerifyResult};
use crate::mirror::RegisterMirror;
use crate::model::ReferenceModel;
use crate::observer::{ResultObserver, StimulusObserver, TickEvent};
use crate::report::SessionReport;
use crate::scoreboard::SharedScoreboard;
use crate::stimulus::{StimulusPolicy, StimulusSource, StreamRecord};

/// Ticks the driver waits for a verdict after the eos strobe before the
/// bounded wait expires. The contract says one; a little slack keeps the
/// framework usable against devices with a slightly longer fixed latency.
const RESPONSE_WAIT_TICKS: u32 = 8;

/// Offset mixed into the seed for the gap-injection rng, so stimulus
/// values and gap positions come from decoupled sequences.
const GAP_RNG_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub divisor: u64,
    pub policy: StimulusPolicy,
    pub num_streams: u64,
    pub max_len: u32,
    pub seed: u64,
    pub timeout: Duration,
    /// Probability of inserting an idle tick before each payload bit.
    pub gap_probability: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            divisor: 5,
            policy: StimulusPolicy::Uniform,
            num_streams: 256,
            max_len: 32,
            seed: 1,
            timeout: Duration::from_secs(60),
            gap_probability: 0.25,
        }
    }
}

/// One verification session over one device.
pub struct Session {
    config: SessionConfig,
}

impl Session {
    pub fn new(config: SessionConfig) -> VerifyResult<Self> {
        if config.max_len > 63 {
            return Err(VerifyError::MaxLenTooLarge(config.max_len));
        }
        if !(0.0..1.0).contains(&config.gap_probability) {
            return Err(VerifyError::InvalidGapProbability(config.gap_probability));
        }
        Ok(Session { config })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Run against the in-tree engine.
    pub async fn run(&self) -> VerifyResult<SessionReport> {
        let device = SerialDivider::new(self.config.divisor)?;
        self.run_with_device(device).await
    }

    /// Run against any black-box device honoring the tick contract. A
    /// session timeout is fatal; every other error accumulates into the
    /// report and the run continues.
    pub async fn run_with_device<D: Device + 'static>(
        &self,
        device: D,
    ) -> VerifyResult<SessionReport> {
        match timeout(self.config.timeout, self.pipeline(device)).await {
            Ok(result) => result,
            Err(_) => Err(VerifyError::Timeout(self.config.timeout)),
        }
    }

    async fn pipeline<D: Device + 'static>(&self, mut device: D) -> VerifyResult<SessionReport> {
        let config = &self.config;
        info!(
            divisor = config.divisor,
            policy = ?config.policy,
            streams = config.num_streams,
            seed = config.seed,
            "starting verification session"
        );

        // Broadcast fan-out: one producer (the driver) per channel.
        let (stim_tx, mut stim_rx) = mpsc::unbounded_channel::<TickEvent>();
        let (res_tx, mut res_rx) = mpsc::unbounded_channel::<TickEvent>();
        let (mir_tx, mut mir_rx) = mpsc::unbounded_channel::<TickEvent>();

        // Observer fan-out: streams to prediction + coverage, verdicts to
        // checking + coverage.
        let (pred_tx, mut pred_rx) = mpsc::unbounded_channel::<StreamRecord>();
        let (cov_stream_tx, mut cov_stream_rx) = mpsc::unbounded_channel::<StreamRecord>();
        let (check_tx, mut check_rx) = mpsc::unbounded_channel();
        let (cov_verdict_tx, mut cov_verdict_rx) = mpsc::unbounded_channel();

        let scoreboard = Arc::new(SharedScoreboard::new());
        let model = ReferenceModel::new(config.divisor)?;

        let stim_observer = tokio::spawn(async move {
            let mut observer = StimulusObserver::new();
            while let Some(event) = stim_rx.recv().await {
                if let Some(record) = observer.observe(&event) {
                    if pred_tx.send(record).is_err() || cov_stream_tx.send(record).is_err() {
                        break;
                    }
                }
            }
        });

        let res_observer = tokio::spawn(async move {
            let mut observer = ResultObserver::new();
            while let Some(event) = res_rx.recv().await {
                if let Some(verdict) = observer.observe(&event) {
                    if check_tx.send(verdict).is_err() || cov_verdict_tx.send(verdict).is_err() {
                        break;
                    }
                }
            }
        });

        let predictor = {
            let scoreboard = Arc::clone(&scoreboard);
            tokio::spawn(async move {
                while let Some(stream) = pred_rx.recv().await {
                    let verdict = model.predict(&stream);
                    debug!(value = stream.value, bit_length = stream.bit_length,
                           predicted = verdict.result, "prediction");
                    scoreboard.push_expected(&stream, verdict).await;
                }
                scoreboard.close();
            })
        };

        let checker = {
            let scoreboard = Arc::clone(&scoreboard);
            tokio::spawn(async move {
                while let Some(verdict) = check_rx.recv().await {
                    scoreboard.check_observed(verdict).await;
                }
            })
        };

        let max_len = config.max_len;
        let coverage_task = tokio::spawn(async move {
            let mut tracker = CoverageTracker::new(max_len);
            // Channels are unbounded, so draining one dimension after the
            // other cannot deadlock the producers.
            while let Some(stream) = cov_stream_rx.recv().await {
                tracker.sample_stimulus(&stream);
            }
            while let Some(verdict) = cov_verdict_rx.recv().await {
                tracker.sample_result(&verdict);
            }
            tracker
        });

        let mirror_task = tokio::spawn(async move {
            let mut mirror = RegisterMirror::new();
            while let Some(event) = mir_rx.recv().await {
                match event {
                    TickEvent::Reset => mirror.on_reset(),
                    TickEvent::Tick { output, .. } if output.valid => {
                        mirror.on_verdict(output.result)
                    }
                    TickEvent::RegSample { direct, shadow } => {
                        mirror.check(RegPath::Direct, direct);
                        mirror.check(RegPath::Shadow, shadow);
                    }
                    _ => {}
                }
            }
            mirror
        });

        // Driver loop: owns the device and the time base.
        let drive_result = self
            .drive(&mut device, &[&stim_tx, &res_tx, &mir_tx], &mir_tx)
            .await;

        // Close the broadcast channels so the pipeline drains and joins.
        drop(stim_tx);
        drop(res_tx);
        drop(mir_tx);
        drive_result?;

        stim_observer
            .await
            .map_err(|_| VerifyError::TaskFailed("stimulus observer"))?;
        res_observer
            .await
            .map_err(|_| VerifyError::TaskFailed("result observer"))?;
        predictor
            .await
            .map_err(|_| VerifyError::TaskFailed("predictor"))?;
        checker
            .await
            .map_err(|_| VerifyError::TaskFailed("checker"))?;
        let coverage = coverage_task
            .await
            .map_err(|_| VerifyError::TaskFailed("coverage tracker"))?;
        let mut mirror = mirror_task
            .await
            .map_err(|_| VerifyError::TaskFailed("register mirror"))?;

        let mut scoreboard = scoreboard.lock().await;
        let leftovers = scoreboard.finish();
        let mismatches = scoreboard.take_mismatches();
        let matched = scoreboard.matched();
        let consistency_failures = mirror.take_failures();

        let passed =
            mismatches.is_empty() && leftovers.is_empty() && consistency_failures.is_empty();
        info!(
            passed,
            matched,
            mismatches = mismatches.len(),
            leftovers = leftovers.len(),
            consistency_failures = consistency_failures.len(),
            "session complete"
        );

        Ok(SessionReport {
            passed,
            config: self.config.clone(),
            streams_driven: self.config.num_streams,
            matched,
            mismatches,
            leftovers,
            consistency_failures,
            register_checks: mirror.checks_performed(),
            coverage: coverage.metrics(),
        })
    }

    /// Drive every stream into the device, broadcasting each tick's
    /// activity. Suspends between ticks; observation never blocks it.
    async fn drive<D: Device>(
        &self,
        device: &mut D,
        broadcast: &[&UnboundedSender<TickEvent>],
        mirror: &UnboundedSender<TickEvent>,
    ) -> VerifyResult<()> {
        let config = &self.config;
        let mut source = StimulusSource::new(
            config.divisor,
            config.max_len,
            config.policy,
            config.seed,
        )?;
        let mut gap_rng = StdRng::seed_from_u64(config.seed ^ GAP_RNG_SALT);

        device.reset().await;
        send_all(broadcast, TickEvent::Reset)?;

        for _ in 0..config.num_streams {
            let stream = source.next_stream();
            device.start_stream().await;
            send_all(broadcast, TickEvent::Start)?;

            for bit in stream.bits() {
                while config.gap_probability > 0.0 && gap_rng.gen_bool(config.gap_probability) {
                    let input = TickInput::gap();
                    let output = device.tick(input).await;
                    send_all(broadcast, TickEvent::Tick { input, output })?;
                }
                let input = TickInput::bit(bit);
                let output = device.tick(input).await;
                send_all(broadcast, TickEvent::Tick { input, output })?;
            }

            let input = TickInput::end();
            let output = device.tick(input).await;
            send_all(broadcast, TickEvent::Tick { input, output })?;

            // Bounded wait for the verdict tick.
            let mut answered = false;
            for _ in 0..RESPONSE_WAIT_TICKS {
                let input = TickInput::gap();
                let output = device.tick(input).await;
                send_all(broadcast, TickEvent::Tick { input, output })?;
                if output.valid {
                    answered = true;
                    break;
                }
            }
            if !answered {
                return Err(VerifyError::ResponseTimeout(RESPONSE_WAIT_TICKS));
            }

            // Quiesce point: nothing is in flight, so both register paths
            // are sampled against the same stable counter value.
            let direct = device.read_count(RegPath::Direct).await;
            let shadow = device.read_count(RegPath::Shadow).await;
            mirror
                .send(TickEvent::RegSample { direct, shadow })
                .map_err(|_| VerifyError::ChannelClosed("register mirror"))?;
        }

        Ok(())
    }
}

fn send_all(
    channels: &[&UnboundedSender<TickEvent>],
    event: TickEvent,
) -> VerifyResult<()> {
    for channel in channels {
        channel
            .send(event)
            .map_err(|_| VerifyError::ChannelClosed("tick broadcast"))?;
    }
    Ok(())
}
