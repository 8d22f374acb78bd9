mod cloud;
mod config;
mod error;
mod history;
mod hrv;
mod input;
mod intervals;
mod loopback;
mod operator;
mod peaks;
mod pipeline;
mod queue;
mod sensor;
mod session;
mod threshold;

use cloud::{CloudAnalysisClient, Transport};
use config::Config;
use history::History;
use input::{EdgeInputSource, InputEvent};
use loopback::LoopbackAnalyzer;
use operator::ScriptedOperator;
use queue::{HandoffQueue, EVENT_QUEUE_SLOTS, SAMPLE_QUEUE_SLOTS};
use sensor::{AcquisitionControl, Sample, Sampler, SyntheticPpg};
use session::{Frame, MenuItem, Phase, SessionController};
use std::time::{Duration, Instant};

// Main-loop period
const TICK: Duration = Duration::from_millis(20);

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            log::warn!("Falling back to default configuration: {}", e);
            Config::default()
        }
    };

    let mut sample_queue: HandoffQueue<Sample, SAMPLE_QUEUE_SLOTS> = HandoffQueue::new();
    let mut event_queue: HandoffQueue<InputEvent, EVENT_QUEUE_SLOTS> = HandoffQueue::new();
    let (sample_writer, sample_reader) = sample_queue.split();
    let (event_writer, event_reader) = event_queue.split();

    let ppg = SyntheticPpg::new(
        config.sample_interval_ms,
        config.simulated_heart_rate_bpm,
        config.simulated_variability_ms,
    );
    let (sampler, sampler_handle) = Sampler::new(ppg, config.sample_period());

    // Spawn the analysis service on its own thread
    let (analyzer, transport) = LoopbackAnalyzer::new(
        &config.request_topic,
        &config.response_topic,
        Duration::from_millis(config.simulated_analyzer_latency_ms),
    );
    let analyzer_thread = std::thread::spawn(move || analyzer.run());

    let history = std::thread::scope(|scope| {
        scope.spawn(move || sampler.run(sample_writer));

        let mut controller = SessionController::new(
            &config,
            sample_reader,
            event_reader,
            sampler_handle.clone(),
            CloudAnalysisClient::new(transport, &config),
        );
        let input = EdgeInputSource::new(event_writer, config.debounce_ms, 0);
        let plan = [
            MenuItem::HeartRate,
            MenuItem::LocalHrv,
            MenuItem::CloudHrv,
            MenuItem::History,
        ];

        let history = run(&mut controller, input, ScriptedOperator::new(plan, config.debounce_ms));
        sampler_handle.shutdown();
        history
    });

    if let Err(e) = analyzer_thread.join() {
        log::error!("Loopback analyzer thread panicked: {:?}", e);
    }

    println!("Session history ({} entries):", history.len());
    for result in history.iter() {
        println!("  {}", result);
    }
}

/// Main loop: tick the controller, render phase changes, feed operator input
fn run<A, T, const S: usize, const E: usize>(
    controller: &mut SessionController<'_, A, T, S, E>,
    mut input: EdgeInputSource<'_, E>,
    mut operator: ScriptedOperator,
) -> History
where
    A: AcquisitionControl,
    T: Transport,
{
    let mut history = History::new();
    let mut shown: Option<(Phase, MenuItem)> = None;

    loop {
        let frame = controller.tick(Instant::now());

        if let Some(result) = frame.completed.clone() {
            history.record(result);
        }
        if let Some(failure) = &frame.failure {
            log::warn!("Session ended without a result: {}", failure);
        }
        if shown != Some((frame.phase, frame.selected)) {
            render(&frame, &history);
            shown = Some((frame.phase, frame.selected));
        }

        if !operator.act(&frame, &mut input) {
            break;
        }
        std::thread::sleep(TICK);
    }

    history
}

fn render(frame: &Frame, history: &History) {
    match frame.phase {
        Phase::Idle => log::info!("Menu: > {}", frame.selected.label()),
        Phase::Warmup => log::info!("Place your finger on the sensor..."),
        Phase::Live => log::info!("Measuring, press to stop"),
        Phase::Finalizing => log::info!("Analyzing..."),
        Phase::Result => {
            if let Some(result) = history.latest() {
                log::info!("Result: {}", result);
            }
        }
        Phase::Error => log::info!("Measurement failed, press to return"),
        Phase::History => {
            if history.is_empty() {
                log::info!("History: no sessions yet");
            }
            for result in history.iter() {
                log::info!("History: {}", result);
            }
        }
    }
}
