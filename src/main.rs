use env_logger::Env;
use log::{info, warn};
use nalgebra::Vector3;
use patient_route::link::{Channel, ConnectionEstablisher, PresentationQueue, SensorServer, ServiceTable, TcpConnector};
use patient_route::navigation::{ScriptedActor, SequencerState, WaypointSequencer};
use patient_route::processing::ShiftingSeries;
use patient_route::utils::HarnessConfig;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Interval between lines written by a synthetic sensor
const SENSOR_PERIOD: Duration = Duration::from_millis(20);

/// How long a closed channel may take to wind down before it is left behind
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Where the patient is in the fall scenario
#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Walking,
    Fallen { at_s: f32 },
    Recovered,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let config = match args.get(1) {
        Some(path) => HarnessConfig::from_file(path)?,
        None => {
            let config = HarnessConfig::default();
            config.validate()?;
            config
        }
    };

    let table = Arc::new(ServiceTable::new());

    // sensors come online one poll interval apart, after the first lookups miss
    let poll = Duration::from_millis(config.discovery.poll_interval_ms);
    let mut servers = Vec::new();
    for (i, spec) in config.channels.iter().enumerate() {
        let delay = poll * (i as u32 + 1) + poll / 2;
        servers.push(SensorServer::spawn(spec.clone(), Arc::clone(&table), delay, SENSOR_PERIOD)?);
    }

    let queue = PresentationQueue::new();
    let establisher = ConnectionEstablisher::new(table.clone(), Arc::new(TcpConnector::new()), config.retry_policy());
    let mut displays = Vec::new();
    let mut channels = Vec::new();
    for spec in &config.channels {
        let series = Arc::new(
            ShiftingSeries::new(spec.title.clone(), config.presentation.window_size)
                .with_axis(config.presentation.unit.clone(), &config.presentation.axis_labels),
        );
        let channel = Channel::new(spec.clone(), establisher.clone(), Arc::new(queue.handle()), series.clone());
        channels.push(channel.spawn()?);
        displays.push(series);
    }

    let actor = ScriptedActor::new(config.route.actor_id.clone(), Vector3::zeros(), config.route.speed_m_s);
    let mut sequencer = WaypointSequencer::new(config.route.actor_id.clone(), config.route(), actor);
    let actor_id = config.route.actor_id.clone();
    sequencer.set_listener(Box::new(move |outcome: SequencerState| {
        info!("{}: route outcome {:?}", actor_id, outcome);
    }));
    sequencer.start();

    let scenario = &config.scenario;
    let tick = Duration::from_secs_f32(scenario.tick_s);
    let mut phase = Phase::Walking;
    let mut now_s = 0.0f32;

    while now_s < scenario.duration_s && !sequencer.state().is_terminal() {
        sequencer.actor_mut().tick(scenario.tick_s);
        sequencer.process_events();

        match phase {
            Phase::Walking if now_s >= scenario.fall_after_s => {
                info!("patient fell at {:.1}s, position {:?}", now_s, sequencer.actor().position());
                sequencer.actor_mut().preempt();
                sequencer.process_events();
                phase = Phase::Fallen { at_s: now_s };
            }
            Phase::Fallen { at_s } if now_s - at_s >= scenario.recover_after_s => {
                if sequencer.resume() {
                    info!("patient got up, resuming at step {}", sequencer.resumption_index());
                } else {
                    warn!("nothing to resume after recovery");
                }
                phase = Phase::Recovered;
            }
            _ => {}
        }

        queue.run_pending();
        thread::sleep(tick);
        now_s += scenario.tick_s;
    }

    info!(
        "walk ended in {:?} after {:.1}s, {} passes, at {:?}",
        sequencer.state(),
        now_s,
        sequencer.passes_completed(),
        sequencer.actor().position()
    );

    for handle in &channels {
        handle.close();
    }
    let deadline = Instant::now() + SHUTDOWN_GRACE;
    for handle in channels {
        let name = handle.name().to_string();
        while !handle.is_finished() && Instant::now() < deadline {
            thread::sleep(SENSOR_PERIOD);
        }
        if !handle.is_finished() {
            // still waiting on discovery or connect; the thread is detached
            warn!("{}: channel did not wind down, leaving it behind", name);
            continue;
        }
        match handle.join() {
            Ok(report) => info!(
                "{}: {} samples ({} malformed) from {} after {} empty polls and {} connect attempts",
                name,
                report.read.samples,
                report.read.malformed,
                report.endpoint,
                report.unresolved_polls,
                report.connect_attempts
            ),
            Err(e) => warn!("{}: {} (recovery: {:?})", name, e, e.recovery_strategy()),
        }
    }
    for server in servers {
        match server.stop_and_join() {
            Ok(written) => info!("sensor wrote {} lines", written),
            Err(e) => warn!("sensor failed: {}", e),
        }
    }

    queue.run_pending();
    for series in &displays {
        match series.latest() {
            Some(p) => info!(
                "{}: {} points shown of {} received, last {}={:.2} {}={:.2} {}={:.2} {}",
                series.title(),
                series.len(),
                series.received(),
                series.labels()[0],
                p.x,
                series.labels()[1],
                p.y,
                series.labels()[2],
                p.z,
                series.unit()
            ),
            None => info!("{}: no samples received", series.title()),
        }
    }

    Ok(())
}
