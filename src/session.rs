//! # Session Control Module
//!
//! Orchestrates one acquisition session at a time:
//!
//! ```text
//! Idle -> Warmup -> Live -> Finalizing -> Result | Error -> Idle
//!   \-> History -> Idle
//! ```
//!
//! Phase changes go through the pure `transition` function; the controller
//! applies the side effects of entering a phase (starting or stopping the
//! sampler, resetting the pipeline, running the analysis).
//!
//! ## Main loop contract
//! `tick` is called once per main-loop iteration. It drains the event queue,
//! then the sample queue, in FIFO order, and returns a `Frame` describing
//! what the display should show. The only blocking work is the cloud reply
//! wait, which is bounded by the configured timeout.

use crate::cloud::{CloudAnalysisClient, Transport};
use crate::config::Config;
use crate::error::SessionFailure;
use crate::history::AnalysisResult;
use crate::hrv;
use crate::input::InputEvent;
use crate::pipeline::BeatPipeline;
use crate::queue::QueueReader;
use crate::sensor::{AcquisitionControl, Sample};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    HeartRate,
    LocalHrv,
    CloudHrv,
    History,
}

impl MenuItem {
    pub const ALL: [MenuItem; 4] = [
        MenuItem::HeartRate,
        MenuItem::LocalHrv,
        MenuItem::CloudHrv,
        MenuItem::History,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MenuItem::HeartRate => "Heart rate",
            MenuItem::LocalHrv => "Basic HRV analysis",
            MenuItem::CloudHrv => "Cloud HRV analysis",
            MenuItem::History => "History",
        }
    }

    pub fn position(&self) -> usize {
        Self::ALL.iter().position(|item| item == self).unwrap_or(0)
    }
}

/// Menu selection driven by rotary steps, clamped to the menu
#[derive(Debug, Clone, Default)]
pub struct MenuCursor {
    position: usize,
}

impl MenuCursor {
    pub fn step(&mut self, delta: i8) {
        let last = MenuItem::ALL.len() - 1;
        self.position = if delta < 0 {
            self.position.saturating_sub(1)
        } else if delta > 0 {
            (self.position + 1).min(last)
        } else {
            self.position
        };
    }

    pub fn selected(&self) -> MenuItem {
        MenuItem::ALL[self.position]
    }

    pub fn reset(&mut self) {
        self.position = 0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Warmup,
    Live,
    Finalizing,
    Result,
    Error,
    History,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Select(MenuItem),
    Stop,
    Acknowledge,
    ThresholdReady,
    BudgetElapsed,
    SensorStalled,
    Analyzed,
    Failed,
    Discarded,
}

/// Phase after `trigger` fires in `phase`. Triggers that mean nothing in a
/// phase leave it unchanged.
pub fn transition(phase: Phase, trigger: Trigger) -> Phase {
    use Phase::*;

    match (phase, trigger) {
        (Idle, Trigger::Select(MenuItem::History)) => History,
        (Idle, Trigger::Select(_)) => Warmup,
        (Warmup, Trigger::ThresholdReady) => Live,
        (Warmup, Trigger::SensorStalled) => Error,
        (Warmup, Trigger::Stop) => Idle,
        (Live, Trigger::Stop) | (Live, Trigger::BudgetElapsed) => Finalizing,
        (Finalizing, Trigger::Analyzed) => Result,
        (Finalizing, Trigger::Failed) => Error,
        (Finalizing, Trigger::Discarded) => Idle,
        (Result, Trigger::Acknowledge)
        | (Error, Trigger::Acknowledge)
        | (History, Trigger::Acknowledge) => Idle,
        (unchanged, _) => unchanged,
    }
}

/// Snapshot handed to the display every tick
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub phase: Phase,
    pub selected: MenuItem,
    pub live_bpm: Option<f64>,
    /// Set only on the tick a session produced its result
    pub completed: Option<AnalysisResult>,
    /// Set only on the tick a session failed
    pub failure: Option<SessionFailure>,
}

pub struct SessionController<'q, A, T, const S: usize, const E: usize>
where
    A: AcquisitionControl,
    T: Transport,
{
    config: Config,
    samples: QueueReader<'q, Sample, S>,
    events: QueueReader<'q, InputEvent, E>,
    acquisition: A,
    cloud: CloudAnalysisClient<T>,
    pipeline: BeatPipeline,
    menu: MenuCursor,
    phase: Phase,
    mode: MenuItem,
    warmup_started: Option<Instant>,
    live_samples: u32,
    results: u32,
    completed: Option<AnalysisResult>,
    failure: Option<SessionFailure>,
}

impl<'q, A, T, const S: usize, const E: usize> SessionController<'q, A, T, S, E>
where
    A: AcquisitionControl,
    T: Transport,
{
    pub fn new(
        config: &Config,
        samples: QueueReader<'q, Sample, S>,
        events: QueueReader<'q, InputEvent, E>,
        acquisition: A,
        cloud: CloudAnalysisClient<T>,
    ) -> Self {
        Self {
            config: config.clone(),
            samples,
            events,
            acquisition,
            cloud,
            pipeline: BeatPipeline::new(config),
            menu: MenuCursor::default(),
            phase: Phase::Idle,
            mode: MenuItem::HeartRate,
            warmup_started: None,
            live_samples: 0,
            results: 0,
            completed: None,
            failure: None,
        }
    }

    #[allow(dead_code)]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Menu entry that started the current or last session
    #[allow(dead_code)]
    pub fn mode(&self) -> MenuItem {
        self.mode
    }

    /// One main-loop iteration
    pub fn tick(&mut self, now: Instant) -> Frame {
        // Finalizing is shown for one frame before the analysis runs
        let finalize_now = self.phase == Phase::Finalizing;

        while let Some(event) = self.events.try_pop() {
            self.handle_input(event, now);
        }

        match self.phase {
            Phase::Warmup | Phase::Live => self.drain_samples(now),
            Phase::Finalizing if finalize_now => self.finalize(),
            _ => {}
        }

        Frame {
            phase: self.phase,
            selected: self.menu.selected(),
            live_bpm: self.pipeline.bpm(),
            completed: self.completed.take(),
            failure: self.failure.take(),
        }
    }

    fn handle_input(&mut self, event: InputEvent, now: Instant) {
        match event {
            InputEvent::RotaryStep(delta) => {
                if self.phase == Phase::Idle {
                    self.menu.step(delta);
                }
            }
            InputEvent::ButtonPress => {
                let trigger = match self.phase {
                    Phase::Idle => Trigger::Select(self.menu.selected()),
                    Phase::Warmup | Phase::Live => Trigger::Stop,
                    Phase::Result | Phase::Error | Phase::History => Trigger::Acknowledge,
                    Phase::Finalizing => return,
                };
                self.fire(trigger, now);
            }
        }
    }

    fn fire(&mut self, trigger: Trigger, now: Instant) {
        let next = transition(self.phase, trigger);
        if next == self.phase {
            return;
        }
        log::info!("Session: {:?} -> {:?} on {:?}", self.phase, next, trigger);
        self.phase = next;

        if let Trigger::Select(item) = trigger {
            self.mode = item;
        }

        match next {
            Phase::Warmup => self.enter_warmup(now),
            Phase::Live => self.live_samples = 0,
            Phase::Finalizing => self.enter_finalizing(),
            Phase::Idle => self.enter_idle(),
            Phase::Result | Phase::Error | Phase::History => self.acquisition.stop(),
        }
    }

    fn enter_warmup(&mut self, now: Instant) {
        self.pipeline.reset();
        let stale = self.samples.clear();
        if stale > 0 {
            log::debug!("Session: discarded {} stale samples", stale);
        }
        self.warmup_started = Some(now);
        self.live_samples = 0;
        self.acquisition.start();
    }

    fn enter_finalizing(&mut self) {
        self.acquisition.stop();
        let pending = self.samples.clear();
        log::info!(
            "Session: collected {} usable intervals ({} rejected), {} unread samples discarded",
            self.pipeline.session_intervals().len(),
            self.pipeline.rejected(),
            pending
        );
    }

    fn enter_idle(&mut self) {
        self.acquisition.stop();
        self.samples.clear();
        self.warmup_started = None;
        self.menu.reset();
    }

    fn live_budget(&self) -> Option<u32> {
        match self.mode {
            MenuItem::LocalHrv => Some(self.config.local_budget_samples()),
            MenuItem::CloudHrv => Some(self.config.cloud_budget_samples()),
            MenuItem::HeartRate | MenuItem::History => None,
        }
    }

    fn drain_samples(&mut self, now: Instant) {
        let budget = self.live_budget();

        while let Some(sample) = self.samples.try_pop() {
            let outcome = self.pipeline.process(sample);

            match self.phase {
                Phase::Warmup => {
                    if outcome.threshold.is_some() {
                        self.fire(Trigger::ThresholdReady, now);
                    }
                }
                Phase::Live => {
                    self.live_samples += 1;
                    if let Some(bpm) = outcome.bpm {
                        log::info!("Session: live rate {:.0} bpm", bpm);
                    }
                    if budget.map_or(false, |limit| self.live_samples >= limit) {
                        self.fire(Trigger::BudgetElapsed, now);
                        return;
                    }
                }
                _ => return,
            }
        }

        if self.phase == Phase::Warmup {
            self.check_stall(now);
        }
    }

    fn check_stall(&mut self, now: Instant) {
        let Some(started) = self.warmup_started else {
            return;
        };
        let waited = now.saturating_duration_since(started);
        if waited >= self.config.warmup_timeout() {
            let failure = SessionFailure::SensorStall(waited);
            log::error!("Session: {}", failure);
            self.failure = Some(failure);
            self.fire(Trigger::SensorStalled, now);
        }
    }

    fn finalize(&mut self) {
        let intervals_ms = hrv::intervals_to_ms(
            self.pipeline.session_intervals(),
            self.config.sample_interval_ms,
        );
        // Ids number completed results only
        let id = self.results.wrapping_add(1);

        let outcome = match self.mode {
            MenuItem::LocalHrv => Some(
                hrv::analyze(&intervals_ms, self.config.local_min_intervals)
                    .map(|summary| AnalysisResult::local(id, &summary))
                    .map_err(SessionFailure::from),
            ),
            MenuItem::CloudHrv => Some(
                self.cloud
                    .analyze(&intervals_ms)
                    .map(|analysis| AnalysisResult::cloud(id, analysis))
                    .map_err(SessionFailure::from),
            ),
            MenuItem::HeartRate | MenuItem::History => None,
        };

        let now = Instant::now();
        match outcome {
            Some(Ok(result)) => {
                log::info!("Session: result {}", result);
                self.results = id;
                self.completed = Some(result);
                self.fire(Trigger::Analyzed, now);
            }
            Some(Err(failure)) => {
                log::error!("Session: {}", failure);
                self.failure = Some(failure);
                self.fire(Trigger::Failed, now);
            }
            None => self.fire(Trigger::Discarded, now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::{AnalysisReply, AnalysisRequest, CloudAnalysis, ReplyData};
    use crate::error::CloudError;
    use crate::history::Origin;
    use crate::queue::{HandoffQueue, QueueWriter};
    use crate::sensor::SyntheticPpg;
    use std::collections::VecDeque;
    use std::time::Duration;

    const SLOTS: usize = 128;
    const EVENTS: usize = 8;

    #[derive(Default)]
    struct FakeTimer {
        running: bool,
        starts: u32,
    }

    impl AcquisitionControl for FakeTimer {
        fn start(&mut self) {
            self.running = true;
            self.starts += 1;
        }

        fn stop(&mut self) {
            self.running = false;
        }
    }

    /// Answers every request immediately with statistics of its intervals
    #[derive(Default)]
    struct FakeAnalyzer {
        replies: VecDeque<Vec<u8>>,
        offline: bool,
    }

    impl Transport for FakeAnalyzer {
        fn publish(&mut self, _topic: &str, payload: &[u8]) -> Result<(), CloudError> {
            if self.offline {
                return Err(CloudError::Transport("broker unreachable".into()));
            }
            let request: AnalysisRequest = serde_json::from_slice(payload).unwrap();
            let summary = hrv::analyze(&request.data, 1).unwrap();
            let reply = AnalysisReply {
                id: request.id,
                data: ReplyData {
                    analysis: CloudAnalysis {
                        mean_hr_bpm: summary.mean_hr,
                        mean_rr_ms: summary.mean_ppi,
                        rmssd_ms: summary.rmssd,
                        sdnn_ms: summary.sdnn,
                        sns_index: 0.5,
                        pns_index: -0.5,
                    },
                },
            };
            self.replies.push_back(serde_json::to_vec(&reply).unwrap());
            Ok(())
        }

        fn receive(&mut self, _topic: &str, _timeout: Duration) -> Result<Option<Vec<u8>>, CloudError> {
            Ok(self.replies.pop_front())
        }
    }

    type Controller<'q> = SessionController<'q, FakeTimer, FakeAnalyzer, SLOTS, EVENTS>;

    fn controller<'q>(
        config: &Config,
        samples: QueueReader<'q, Sample, SLOTS>,
        events: QueueReader<'q, InputEvent, EVENTS>,
        analyzer: FakeAnalyzer,
    ) -> Controller<'q> {
        let client = CloudAnalysisClient::new(analyzer, config);
        SessionController::new(config, samples, events, FakeTimer::default(), client)
    }

    fn select(events: &mut QueueWriter<'_, InputEvent, EVENTS>, item: MenuItem) {
        for _ in 0..item.position() {
            events.try_push(InputEvent::RotaryStep(1));
        }
        events.try_push(InputEvent::ButtonPress);
    }

    /// Feed samples in queue-sized batches while the session is acquiring
    fn acquire(
        samples: &mut QueueWriter<'_, Sample, SLOTS>,
        controller: &mut Controller<'_>,
        source: &mut impl FnMut() -> Sample,
        limit: usize,
    ) -> Vec<Frame> {
        let mut frames = Vec::new();
        let mut fed = 0;
        while fed < limit && matches!(controller.phase(), Phase::Warmup | Phase::Live) {
            for _ in 0..64 {
                samples.try_push(source());
            }
            fed += 64;
            frames.push(controller.tick(Instant::now()));
        }
        frames
    }

    #[test]
    fn test_transition_table() {
        assert_eq!(transition(Phase::Idle, Trigger::Select(MenuItem::LocalHrv)), Phase::Warmup);
        assert_eq!(transition(Phase::Idle, Trigger::Select(MenuItem::History)), Phase::History);
        assert_eq!(transition(Phase::Warmup, Trigger::ThresholdReady), Phase::Live);
        assert_eq!(transition(Phase::Warmup, Trigger::SensorStalled), Phase::Error);
        assert_eq!(transition(Phase::Live, Trigger::BudgetElapsed), Phase::Finalizing);
        assert_eq!(transition(Phase::Live, Trigger::Stop), Phase::Finalizing);
        assert_eq!(transition(Phase::Finalizing, Trigger::Analyzed), Phase::Result);
        assert_eq!(transition(Phase::Finalizing, Trigger::Failed), Phase::Error);
        assert_eq!(transition(Phase::Error, Trigger::Acknowledge), Phase::Idle);
    }

    #[test]
    fn test_irrelevant_triggers_keep_phase() {
        assert_eq!(transition(Phase::Idle, Trigger::Stop), Phase::Idle);
        assert_eq!(transition(Phase::Live, Trigger::ThresholdReady), Phase::Live);
        assert_eq!(transition(Phase::Finalizing, Trigger::Stop), Phase::Finalizing);
        assert_eq!(transition(Phase::Result, Trigger::Select(MenuItem::LocalHrv)), Phase::Result);
    }

    #[test]
    fn test_menu_cursor_clamps() {
        let mut cursor = MenuCursor::default();
        cursor.step(-1);
        assert_eq!(cursor.selected(), MenuItem::HeartRate);
        for _ in 0..10 {
            cursor.step(1);
        }
        assert_eq!(cursor.selected(), MenuItem::History);
        cursor.step(-1);
        assert_eq!(cursor.selected(), MenuItem::CloudHrv);
    }

    #[test]
    fn test_local_session_produces_result() {
        let config = Config::default();
        let mut sample_queue: HandoffQueue<Sample, SLOTS> = HandoffQueue::new();
        let mut event_queue: HandoffQueue<InputEvent, EVENTS> = HandoffQueue::new();
        let (mut samples, sample_reader) = sample_queue.split();
        let (mut events, event_reader) = event_queue.split();
        let mut controller = controller(&config, sample_reader, event_reader, FakeAnalyzer::default());

        select(&mut events, MenuItem::LocalHrv);
        let frame = controller.tick(Instant::now());
        assert_eq!(frame.phase, Phase::Warmup);
        assert!(controller.acquisition.running);

        let mut ppg = SyntheticPpg::new(config.sample_interval_ms, 75.0, 0.0);
        let frames = acquire(&mut samples, &mut controller, &mut || ppg.next_sample(), 10_000);
        assert!(frames.iter().any(|f| f.phase == Phase::Live));

        // Budget reached: shown as Finalizing, analysis not yet run
        let last = frames.last().unwrap();
        assert_eq!(last.phase, Phase::Finalizing);
        assert!(last.completed.is_none());
        assert!(!controller.acquisition.running);

        let frame = controller.tick(Instant::now());
        assert_eq!(frame.phase, Phase::Result);
        let result = frame.completed.expect("result on completion tick");
        assert_eq!(result.origin, Origin::Local);
        assert_eq!(result.id, 1);
        assert!((result.mean_hr - 75.0).abs() < 0.5, "mean_hr {}", result.mean_hr);
        assert!(result.sdnn < 1.0);

        // Reported once only
        assert!(controller.tick(Instant::now()).completed.is_none());

        events.try_push(InputEvent::ButtonPress);
        assert_eq!(controller.tick(Instant::now()).phase, Phase::Idle);
    }

    #[test]
    fn test_result_ids_count_completed_results_only() {
        let config = Config::default();
        let mut sample_queue: HandoffQueue<Sample, SLOTS> = HandoffQueue::new();
        let mut event_queue: HandoffQueue<InputEvent, EVENTS> = HandoffQueue::new();
        let (mut samples, sample_reader) = sample_queue.split();
        let (mut events, event_reader) = event_queue.split();
        let mut controller = controller(&config, sample_reader, event_reader, FakeAnalyzer::default());
        let mut ppg = SyntheticPpg::new(config.sample_interval_ms, 75.0, 0.0);

        // A heart rate view and an aborted warm-up produce no result
        select(&mut events, MenuItem::HeartRate);
        controller.tick(Instant::now());
        acquire(&mut samples, &mut controller, &mut || ppg.next_sample(), 640);
        events.try_push(InputEvent::ButtonPress);
        controller.tick(Instant::now());
        assert_eq!(controller.tick(Instant::now()).phase, Phase::Idle);

        select(&mut events, MenuItem::LocalHrv);
        controller.tick(Instant::now());
        events.try_push(InputEvent::ButtonPress);
        assert_eq!(controller.tick(Instant::now()).phase, Phase::Idle);

        for expected in [1, 2] {
            select(&mut events, MenuItem::LocalHrv);
            controller.tick(Instant::now());
            acquire(&mut samples, &mut controller, &mut || ppg.next_sample(), 10_000);
            let frame = controller.tick(Instant::now());
            assert_eq!(frame.completed.map(|result| result.id), Some(expected));

            events.try_push(InputEvent::ButtonPress);
            assert_eq!(controller.tick(Instant::now()).phase, Phase::Idle);
        }
    }

    #[test]
    fn test_flat_signal_is_insufficient_data() {
        let config = Config::default();
        let mut sample_queue: HandoffQueue<Sample, SLOTS> = HandoffQueue::new();
        let mut event_queue: HandoffQueue<InputEvent, EVENTS> = HandoffQueue::new();
        let (mut samples, sample_reader) = sample_queue.split();
        let (mut events, event_reader) = event_queue.split();
        let mut controller = controller(&config, sample_reader, event_reader, FakeAnalyzer::default());

        select(&mut events, MenuItem::LocalHrv);
        controller.tick(Instant::now());
        acquire(&mut samples, &mut controller, &mut || 2048, 10_000);
        assert_eq!(controller.phase(), Phase::Finalizing);

        let frame = controller.tick(Instant::now());
        assert_eq!(frame.phase, Phase::Error);
        assert_eq!(
            frame.failure,
            Some(SessionFailure::InsufficientData { required: 1, available: 0 })
        );

        events.try_push(InputEvent::ButtonPress);
        assert_eq!(controller.tick(Instant::now()).phase, Phase::Idle);
    }

    #[test]
    fn test_warmup_without_samples_stalls() {
        let config = Config::default();
        let mut sample_queue: HandoffQueue<Sample, SLOTS> = HandoffQueue::new();
        let mut event_queue: HandoffQueue<InputEvent, EVENTS> = HandoffQueue::new();
        let (_samples, sample_reader) = sample_queue.split();
        let (mut events, event_reader) = event_queue.split();
        let mut controller = controller(&config, sample_reader, event_reader, FakeAnalyzer::default());

        let start = Instant::now();
        select(&mut events, MenuItem::LocalHrv);
        assert_eq!(controller.tick(start).phase, Phase::Warmup);
        assert_eq!(controller.tick(start + Duration::from_secs(1)).phase, Phase::Warmup);

        let frame = controller.tick(start + Duration::from_secs(6));
        assert_eq!(frame.phase, Phase::Error);
        assert!(matches!(frame.failure, Some(SessionFailure::SensorStall(_))));
        assert!(!controller.acquisition.running);
    }

    #[test]
    fn test_stop_during_warmup_aborts() {
        let config = Config::default();
        let mut sample_queue: HandoffQueue<Sample, SLOTS> = HandoffQueue::new();
        let mut event_queue: HandoffQueue<InputEvent, EVENTS> = HandoffQueue::new();
        let (_samples, sample_reader) = sample_queue.split();
        let (mut events, event_reader) = event_queue.split();
        let mut controller = controller(&config, sample_reader, event_reader, FakeAnalyzer::default());

        select(&mut events, MenuItem::CloudHrv);
        controller.tick(Instant::now());
        events.try_push(InputEvent::ButtonPress);

        let frame = controller.tick(Instant::now());
        assert_eq!(frame.phase, Phase::Idle);
        assert!(frame.failure.is_none());
        assert!(!controller.acquisition.running);
    }

    #[test]
    fn test_heart_rate_mode_runs_until_stopped() {
        let config = Config::default();
        let mut sample_queue: HandoffQueue<Sample, SLOTS> = HandoffQueue::new();
        let mut event_queue: HandoffQueue<InputEvent, EVENTS> = HandoffQueue::new();
        let (mut samples, sample_reader) = sample_queue.split();
        let (mut events, event_reader) = event_queue.split();
        let mut controller = controller(&config, sample_reader, event_reader, FakeAnalyzer::default());

        select(&mut events, MenuItem::HeartRate);
        controller.tick(Instant::now());

        let mut ppg = SyntheticPpg::new(config.sample_interval_ms, 60.0, 0.0);
        // Far past any session budget
        let frames = acquire(&mut samples, &mut controller, &mut || ppg.next_sample(), 9_000);
        let last = frames.last().unwrap();
        assert_eq!(last.phase, Phase::Live);
        assert_eq!(last.live_bpm, Some(60.0));

        events.try_push(InputEvent::ButtonPress);
        assert_eq!(controller.tick(Instant::now()).phase, Phase::Finalizing);
        let frame = controller.tick(Instant::now());
        assert_eq!(frame.phase, Phase::Idle);
        assert!(frame.completed.is_none());
    }

    #[test]
    fn test_rotary_ignored_outside_idle() {
        let config = Config::default();
        let mut sample_queue: HandoffQueue<Sample, SLOTS> = HandoffQueue::new();
        let mut event_queue: HandoffQueue<InputEvent, EVENTS> = HandoffQueue::new();
        let (_samples, sample_reader) = sample_queue.split();
        let (mut events, event_reader) = event_queue.split();
        let mut controller = controller(&config, sample_reader, event_reader, FakeAnalyzer::default());

        select(&mut events, MenuItem::History);
        let frame = controller.tick(Instant::now());
        assert_eq!(frame.phase, Phase::History);

        events.try_push(InputEvent::RotaryStep(-1));
        let frame = controller.tick(Instant::now());
        assert_eq!(frame.selected, MenuItem::History);
        assert_eq!(controller.acquisition.starts, 0);

        // Back in Idle the cursor starts from the top again
        events.try_push(InputEvent::ButtonPress);
        let frame = controller.tick(Instant::now());
        assert_eq!(frame.phase, Phase::Idle);
        assert_eq!(frame.selected, MenuItem::HeartRate);
    }

    #[test]
    fn test_cloud_session_result_carries_indices() {
        let config = Config::default();
        let mut sample_queue: HandoffQueue<Sample, SLOTS> = HandoffQueue::new();
        let mut event_queue: HandoffQueue<InputEvent, EVENTS> = HandoffQueue::new();
        let (mut samples, sample_reader) = sample_queue.split();
        let (mut events, event_reader) = event_queue.split();
        let mut controller = controller(&config, sample_reader, event_reader, FakeAnalyzer::default());

        select(&mut events, MenuItem::CloudHrv);
        controller.tick(Instant::now());
        let mut ppg = SyntheticPpg::new(config.sample_interval_ms, 60.0, 20.0);
        acquire(&mut samples, &mut controller, &mut || ppg.next_sample(), 20_000);
        assert_eq!(controller.phase(), Phase::Finalizing);

        let frame = controller.tick(Instant::now());
        assert_eq!(frame.phase, Phase::Result);
        let result = frame.completed.unwrap();
        assert_eq!(result.origin, Origin::Cloud);
        assert_eq!(result.sns, Some(0.5));
        assert!((result.mean_hr - 60.0).abs() < 2.0, "mean_hr {}", result.mean_hr);
    }

    #[test]
    fn test_cloud_transport_failure_ends_in_error() {
        let config = Config::default();
        let mut sample_queue: HandoffQueue<Sample, SLOTS> = HandoffQueue::new();
        let mut event_queue: HandoffQueue<InputEvent, EVENTS> = HandoffQueue::new();
        let (mut samples, sample_reader) = sample_queue.split();
        let (mut events, event_reader) = event_queue.split();
        let analyzer = FakeAnalyzer {
            offline: true,
            ..FakeAnalyzer::default()
        };
        let mut controller = controller(&config, sample_reader, event_reader, analyzer);

        select(&mut events, MenuItem::CloudHrv);
        controller.tick(Instant::now());
        let mut ppg = SyntheticPpg::new(config.sample_interval_ms, 70.0, 0.0);
        acquire(&mut samples, &mut controller, &mut || ppg.next_sample(), 20_000);

        let frame = controller.tick(Instant::now());
        assert_eq!(frame.phase, Phase::Error);
        assert!(matches!(frame.failure, Some(SessionFailure::TransportFailure(_))));
    }

    #[test]
    fn test_short_cloud_session_is_insufficient() {
        let config = Config::default();
        let mut sample_queue: HandoffQueue<Sample, SLOTS> = HandoffQueue::new();
        let mut event_queue: HandoffQueue<InputEvent, EVENTS> = HandoffQueue::new();
        let (mut samples, sample_reader) = sample_queue.split();
        let (mut events, event_reader) = event_queue.split();
        let mut controller = controller(&config, sample_reader, event_reader, FakeAnalyzer::default());

        select(&mut events, MenuItem::CloudHrv);
        controller.tick(Instant::now());
        let mut ppg = SyntheticPpg::new(config.sample_interval_ms, 60.0, 0.0);
        // About three seconds of signal, then the user stops early
        acquire(&mut samples, &mut controller, &mut || ppg.next_sample(), 1_000);
        events.try_push(InputEvent::ButtonPress);
        assert_eq!(controller.tick(Instant::now()).phase, Phase::Finalizing);

        let frame = controller.tick(Instant::now());
        assert_eq!(frame.phase, Phase::Error);
        match frame.failure {
            Some(SessionFailure::InsufficientData { required, available }) => {
                assert_eq!(required, 10);
                assert!(available < 10);
            }
            other => panic!("expected insufficient data, got {:?}", other),
        }
    }
}
