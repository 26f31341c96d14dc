//! Desktop simulator for the aerosol-core acquisition engine.
//!
//! Runs a synthetic nephelometer against a fast-forwarded clock. Samples are
//! pushed into an [`AverageRecord`] once per simulated second and each
//! completed average is logged as a JSON line. The impactor cut size is driven
//! by the [`CutSize`] scheduler loop, which flushes the averages every time the
//! size changes. Periodic zero checks suspend averaging while they run.
//!
//! # Usage
//!
//! ```text
//! RUST_LOG=info aerosol-simulator [config.json]
//! ```
//!
//! The optional configuration file may set any of:
//!
//! ```json
//! {
//!   "average": { "interval": "PT1M" },
//!   "cut_size": { "cycle_time": 3600, "entries": [
//!       { "offset": 0, "size": "PM10" },
//!       { "offset": "PT30M", "size": "PM1" } ] },
//!   "duration": "PT3H",
//!   "flush": 60,
//!   "sample_interval": 1
//! }
//! ```

use std::cell::RefCell;
use std::time::{SystemTime, UNIX_EPOCH};

use aerosol_core::average::{Array, AverageRecord, AverageResult, Flag, Handle, Variable, Vector};
use aerosol_core::clock::{Clock, ManualClock};
use aerosol_core::config::{
    AverageConfig, ConfigError, CutSizeConfig, ScheduleConfig, ScheduleEntryConfig,
};
use aerosol_core::cut_size::{CutSize, Size, SizeToken};
use aerosol_core::interval::IntervalSpec;
use aerosol_core::schedule::{Active, ActivationHandler};
use embassy_futures::block_on;
use embassy_futures::select::select;
use embassy_futures::yield_now;
use embedded_hal_async::delay::DelayNs;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(default)]
struct SimulatorConfig {
    average: AverageConfig,
    cut_size: CutSizeConfig,
    /// Simulated run time
    duration: IntervalSpec,
    /// Time discarded after each cut-size change
    flush: IntervalSpec,
    /// Time between synthetic samples
    sample_interval: IntervalSpec,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        let entry = |offset: Option<&str>, size: &str| ScheduleEntryConfig {
            offset: offset.map(IntervalSpec::from),
            payload: SizeToken::Text(size.to_string()),
        };

        Self {
            average: AverageConfig::default(),
            cut_size: CutSizeConfig::Schedule(ScheduleConfig {
                cycle_time: Some(IntervalSpec::from("PT1H")),
                entries: vec![entry(None, "PM10"), entry(Some("PT30M"), "PM1")],
                alternate: None,
            }),
            duration: IntervalSpec::from("PT3H"),
            flush: IntervalSpec::from(60.0),
            sample_interval: IntervalSpec::from(1.0),
        }
    }
}

fn load_config() -> Result<SimulatorConfig, String> {
    let Some(path) = std::env::args().nth(1) else {
        info!("No configuration given, using defaults");
        return Ok(SimulatorConfig::default());
    };

    info!("Loading configuration from {}", path);
    let text = std::fs::read_to_string(&path).map_err(|e| format!("{path}: {e}"))?;
    serde_json::from_str(&text).map_err(|e| format!("{path}: {e}"))
}

// ---------------------------------------------------------------------------
// Mock data generation
// ---------------------------------------------------------------------------

/// One synthetic reading from the instrument.
struct Reading {
    /// Total scattering in Mm⁻¹
    scattering: f64,
    /// Wind speed in m/s and direction in degrees
    wind: (f64, f64),
    /// Per-channel counts, one value per wavelength
    channels: Vec<f64>,
    lamp_fault: bool,
    /// Zero check in progress; data is not representative
    zeroing: bool,
}

/// Generates readings that vary smoothly over time.
struct MockNephelometer {
    start: f64,
}

impl MockNephelometer {
    fn new(start: f64) -> Self {
        Self { start }
    }

    /// Fraction of the whole-air signal passed by the impactor.
    fn transmission(size: Size) -> f64 {
        match size {
            Size::PM1 => 0.55,
            Size::PM2_5 => 0.75,
            Size::PM10 => 0.95,
            Size::Whole => 1.0,
        }
    }

    fn sample(&self, now: f64, size: Size) -> Reading {
        let t = now - self.start;

        // Scattering: 20–40 Mm⁻¹ with a slow diurnal-like swing
        let whole = 30.0 + 8.0 * (t / 2400.0).sin() + 2.0 * (t / 97.0).cos();
        let scattering = whole * Self::transmission(size);

        // Wind: veering around the north so averages cross 0°/360°
        let speed = 4.0 + 1.5 * (t / 300.0).sin();
        let direction = (360.0 + 25.0 * (t / 600.0).sin()) % 360.0;

        let channels = [450.0, 550.0, 700.0]
            .iter()
            .map(|wavelength| scattering * 550.0 / wavelength)
            .collect();

        // The lamp flickers for a few seconds every quarter hour
        let lamp_fault = t % 900.0 < 3.0;

        // Half-minute zero check every 20 minutes
        let zeroing = t % 1200.0 >= 1170.0;

        Reading {
            scattering,
            wind: (speed, direction),
            channels,
            lamp_fault,
            zeroing,
        }
    }
}

// ---------------------------------------------------------------------------
// Instrument
// ---------------------------------------------------------------------------

/// Averaged output line.
#[derive(Serialize)]
struct Report<'a> {
    #[serde(flatten)]
    result: AverageResult,
    size: Size,
    scattering: f64,
    wind_speed: f64,
    wind_direction: f64,
    channels: &'a [f64],
    lamp_fault: bool,
}

struct Instrument {
    generator: MockNephelometer,
    record: AverageRecord,
    scattering: Handle<Variable>,
    wind: Handle<Vector>,
    channels: Handle<Array>,
    lamp_fault: Handle<Flag>,
    size: Size,
    flush: f64,
    reports: usize,
}

impl Instrument {
    fn new(start: f64, mut record: AverageRecord, flush: f64) -> Result<Self, ConfigError> {
        Ok(Self {
            generator: MockNephelometer::new(start),
            scattering: record.variable("BsG")?,
            wind: record.vector("Wind")?,
            channels: record.array("Channels")?,
            lamp_fault: record.flag("LampFault")?,
            record,
            size: Size::Whole,
            flush,
            reports: 0,
        })
    }

    /// Take one sample at `now` and emit any completed average.
    fn acquire(&mut self, now: f64) {
        let reading = self.generator.sample(now, self.size);

        if reading.zeroing == self.record.is_averaging() {
            info!("Zero check {}", if reading.zeroing { "started" } else { "ended" });
            self.record.set_averaging(!reading.zeroing);
        }

        self.record[self.scattering].push(reading.scattering);
        self.record[self.wind].push(reading.wind.0, reading.wind.1);
        self.record[self.channels].push(&reading.channels);
        self.record[self.lamp_fault].push(reading.lamp_fault);

        if let Some(result) = self.record.tick(now) {
            self.report(result);
        }
    }

    fn change_size(&mut self, size: Size, now: f64) {
        if size != self.size {
            info!("Switching impactor {} -> {}", self.size, size);
        }
        self.size = size;
        self.record.start_flush(self.flush, now);
    }

    fn report(&mut self, result: AverageResult) {
        let report = Report {
            result,
            size: self.size,
            scattering: self.record[self.scattering].value(),
            wind_speed: self.record[self.wind].magnitude(),
            wind_direction: self.record[self.wind].direction(),
            channels: self.record[self.channels].value(),
            lamp_fault: self.record[self.lamp_fault].value(),
        };
        match serde_json::to_string(&report) {
            Ok(line) => info!("{}", line),
            Err(e) => error!("Failed to encode report: {}", e),
        }
        if result.total_samples == 0 {
            warn!("Average {} - {} had no data", result.start_time, result.end_time);
        }
        self.reports += 1;
    }
}

/// Activation hook that moves the impactor.
struct Impactor<'a> {
    instrument: &'a RefCell<Instrument>,
}

impl ActivationHandler<Size> for Impactor<'_> {
    async fn automatic_activation(&mut self, active: &Active<Size>, now: f64) {
        self.instrument
            .borrow_mut()
            .change_size(*active.payload(), now);
    }
}

// ---------------------------------------------------------------------------
// Simulated time
// ---------------------------------------------------------------------------

/// Delay that waits for the simulated clock instead of real time.
struct SimulatedDelay<'a> {
    clock: &'a ManualClock,
}

impl SimulatedDelay<'_> {
    async fn sleep(&mut self, seconds: f64) {
        let target = self.clock.now() + seconds;
        while self.clock.now() < target {
            yield_now().await;
        }
    }
}

impl DelayNs for SimulatedDelay<'_> {
    async fn delay_ns(&mut self, ns: u32) {
        self.sleep(f64::from(ns) * 1e-9).await;
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.sleep(f64::from(ms) / 1000.0).await;
    }
}

/// Advance the clock one sample at a time until `end`.
async fn acquisition(clock: &ManualClock, instrument: &RefCell<Instrument>, step: f64, end: f64) {
    while clock.now() < end {
        clock.advance(step);
        instrument.borrow_mut().acquire(clock.now());
        yield_now().await;
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn seconds(spec: &IntervalSpec, name: &str) -> Result<f64, String> {
    match spec.seconds(None) {
        Ok(value) if value > 0.0 => Ok(value),
        Ok(value) => Err(format!("{name} must be positive, got {value}")),
        Err(e) => Err(format!("{name}: {e}")),
    }
}

fn run() -> Result<(), String> {
    let config = load_config()?;

    let duration = seconds(&config.duration, "duration")?;
    let step = seconds(&config.sample_interval, "sample_interval")?;
    let flush = config
        .flush
        .seconds(None)
        .map_err(|e| format!("flush: {e}"))?;

    let record = AverageRecord::from_config(&config.average).map_err(|e| e.to_string())?;
    let mut cut_size = CutSize::from_config(&config.cut_size).map_err(|e| e.to_string())?;

    let start = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as f64;
    let end = start + duration;
    info!(
        "Simulating {} s from {} (average interval {:?}, flush {} s)",
        duration,
        start,
        record.interval(),
        flush
    );
    info!("Cut size now {:?}", cut_size.status(start));

    let clock = ManualClock::new(start);
    let instrument =
        RefCell::new(Instrument::new(start, record, flush).map_err(|e| e.to_string())?);
    let mut delay = SimulatedDelay { clock: &clock };
    let mut impactor = Impactor {
        instrument: &instrument,
    };

    block_on(select(
        cut_size.run(&clock, &mut delay, &mut impactor),
        acquisition(&clock, &instrument, step, end),
    ));

    let mut instrument = instrument.into_inner();
    if let Some(result) = instrument.record.complete(clock.now()) {
        instrument.report(result);
    }
    info!("Emitted {} averages", instrument.reports);
    Ok(())
}

fn main() {
    env_logger::init();
    info!("Starting aerosol simulator");

    if let Err(e) = run() {
        error!("{}", e);
        std::process::exit(1);
    }

    info!("Simulator exiting");
}
