//! Plain configuration structures
//!
//! These are deserialized by whatever loads the instrument configuration and
//! turned into engine types with the `from_config` constructors. Intervals and
//! offsets accept every form [`IntervalSpec`] understands.

use alloc::string::String;
use alloc::vec::Vec;

use serde::Deserialize;
use thiserror_no_std::Error;

use crate::average::RecordError;
use crate::cut_size::{CutSize, CutSizeError, DEFAULT_CYCLE_TIME, Size, SizeToken};
use crate::interval::{IntervalError, IntervalSpec, parse_interval};
use crate::schedule::{Alternate, Schedule, ScheduleError};

/// Averaging interval used when none is configured.
pub const DEFAULT_AVERAGE_INTERVAL: f64 = 60.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Interval error: {0}")]
    Interval(#[from] IntervalError),
    #[error("Averaging error: {0}")]
    Record(#[from] RecordError),
    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),
    #[error("Cut size error: {0}")]
    CutSize(#[from] CutSizeError),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AverageConfig {
    /// Averaging interval; `false` or zero disables averaging
    #[serde(default)]
    pub interval: Option<IntervalSpec>,
}

impl AverageConfig {
    /// Interval in seconds, `None` when averaging is disabled.
    pub fn interval(&self) -> Result<Option<f64>, IntervalError> {
        parse_interval(self.interval.as_ref(), Some(DEFAULT_AVERAGE_INTERVAL))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleEntryConfig<P> {
    /// Offset into the cycle, zero when omitted
    #[serde(default)]
    pub offset: Option<IntervalSpec>,
    #[serde(alias = "size")]
    pub payload: P,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlternateConfig<P> {
    #[serde(alias = "size")]
    pub payload: P,
    pub interval: IntervalSpec,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig<P> {
    #[serde(default, alias = "cycle")]
    pub cycle_time: Option<IntervalSpec>,
    #[serde(alias = "schedule")]
    pub entries: Vec<ScheduleEntryConfig<P>>,
    /// Payload interleaved between the configured entries
    pub alternate: Option<AlternateConfig<P>>,
}

impl<T> ScheduleConfig<T> {
    /// Build a schedule, converting each configured payload with `convert`.
    pub fn schedule_with<P, E>(
        &self,
        default_cycle_time: f64,
        mut convert: impl FnMut(&T) -> Result<P, E>,
    ) -> Result<Schedule<P>, ConfigError>
    where
        P: Clone,
        ConfigError: From<E>,
    {
        let cycle_time = match &self.cycle_time {
            Some(spec) => spec.seconds(Some(default_cycle_time))?,
            None => default_cycle_time,
        };

        let mut entries = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let offset = match &entry.offset {
                Some(spec) => spec.seconds(None)?,
                None => 0.0,
            };
            entries.push((offset, convert(&entry.payload)?));
        }

        let alternate = match &self.alternate {
            Some(alternate) => Some(Alternate {
                payload: convert(&alternate.payload)?,
                interval: alternate.interval.seconds(None)?,
            }),
            None => None,
        };

        Ok(Schedule::build(cycle_time, entries, alternate)?)
    }
}

impl<P: Clone> ScheduleConfig<P> {
    pub fn schedule(&self, default_cycle_time: f64) -> Result<Schedule<P>, ConfigError> {
        self.schedule_with(default_cycle_time, |payload| {
            Ok::<_, ConfigError>(payload.clone())
        })
    }
}

/// Either a single size or a cycling schedule of sizes
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CutSizeConfig {
    Constant(SizeToken),
    Schedule(ScheduleConfig<SizeToken>),
}

impl Default for CutSizeConfig {
    fn default() -> Self {
        Self::Constant(SizeToken::Text(String::from("Whole")))
    }
}

impl CutSize {
    pub fn from_config(config: &CutSizeConfig) -> Result<Self, ConfigError> {
        match config {
            CutSizeConfig::Constant(token) => Ok(Self::constant(Size::try_from(token)?)),
            CutSizeConfig::Schedule(schedule) => Ok(Self::from(
                schedule.schedule_with(DEFAULT_CYCLE_TIME, |token| Size::try_from(token))?,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_average_default_interval() {
        let config: AverageConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.interval().unwrap(), Some(DEFAULT_AVERAGE_INTERVAL));

        let config: AverageConfig = serde_json::from_str(r#"{"interval": true}"#).unwrap();
        assert_eq!(config.interval().unwrap(), Some(DEFAULT_AVERAGE_INTERVAL));

        let config: AverageConfig =
            serde_json::from_str(r#"{"interval": {"HOURS": 1}}"#).unwrap();
        assert_eq!(config.interval().unwrap(), Some(3600.0));
    }

    #[test]
    fn test_schedule_config() {
        let config: ScheduleConfig<String> = serde_json::from_str(
            r#"{
                "cycle_time": "PT10M",
                "entries": [
                    {"offset": "0:05:00", "payload": "sample"},
                    {"payload": "zero"}
                ]
            }"#,
        )
        .unwrap();
        let schedule = config.schedule(3600.0).unwrap();
        assert_eq!(schedule.cycle_time(), 600.0);
        let slots: Vec<(f64, &str)> = schedule
            .actives()
            .iter()
            .map(|a| (a.offset(), a.payload().as_str()))
            .collect();
        assert_eq!(slots, vec![(0.0, "zero"), (300.0, "sample")]);
    }

    #[test]
    fn test_schedule_config_alternate() {
        let config: ScheduleConfig<String> = serde_json::from_str(
            r#"{
                "cycle_time": 100,
                "entries": [{"offset": 0, "payload": "sample"}],
                "alternate": {"payload": "zero", "interval": 25}
            }"#,
        )
        .unwrap();
        let schedule = config.schedule(3600.0).unwrap();
        assert_eq!(schedule.len(), 4);
        assert_eq!(schedule.actives()[1].payload(), "zero");
    }

    #[test]
    fn test_schedule_config_errors() {
        let config: ScheduleConfig<String> =
            serde_json::from_str(r#"{"entries": []}"#).unwrap();
        assert!(matches!(
            config.schedule(3600.0),
            Err(ConfigError::Schedule(ScheduleError::EmptySchedule))
        ));

        let config: ScheduleConfig<String> = serde_json::from_str(
            r#"{"cycle_time": false, "entries": [{"payload": "a"}]}"#,
        )
        .unwrap();
        assert!(matches!(
            config.schedule(3600.0),
            Err(ConfigError::Schedule(ScheduleError::InvalidCycleTime { .. }))
        ));

        let config: ScheduleConfig<String> = serde_json::from_str(
            r#"{"entries": [{"offset": "soon", "payload": "a"}]}"#,
        )
        .unwrap();
        assert!(matches!(
            config.schedule(3600.0),
            Err(ConfigError::Interval(IntervalError::Malformed { .. }))
        ));
    }

    #[test]
    fn test_cut_size_config() {
        let config: CutSizeConfig = serde_json::from_str(r#""PM2.5""#).unwrap();
        let mut cut = CutSize::from_config(&config).unwrap();
        assert!(cut.is_constant());
        assert_eq!(cut.current(0.0), Size::PM2_5);

        let config: CutSizeConfig = serde_json::from_str(
            r#"{"entries": [{"offset": 0, "size": 10}, {"offset": "PT30M", "size": "PM1"}]}"#,
        )
        .unwrap();
        let mut cut = CutSize::from_config(&config).unwrap();
        assert!(!cut.is_constant());
        assert_eq!(cut.schedule().cycle_time(), DEFAULT_CYCLE_TIME);
        assert_eq!(cut.current(100.0), Size::PM10);
        assert_eq!(cut.current(1_900.0), Size::PM1);

        let mut cut = CutSize::from_config(&CutSizeConfig::default()).unwrap();
        assert_eq!(cut.current(0.0), Size::Whole);
    }

    #[test]
    fn test_cut_size_config_alternate() {
        let config: CutSizeConfig = serde_json::from_str(
            r#"{
                "cycle_time": 100,
                "entries": [{"size": "PM10"}],
                "alternate": {"size": "PM1", "interval": 25}
            }"#,
        )
        .unwrap();
        let cut = CutSize::from_config(&config).unwrap();
        let slots: Vec<(f64, Size)> = cut
            .schedule()
            .actives()
            .iter()
            .map(|a| (a.offset(), *a.payload()))
            .collect();
        assert_eq!(
            slots,
            vec![
                (0.0, Size::PM10),
                (25.0, Size::PM1),
                (50.0, Size::PM10),
                (75.0, Size::PM1),
            ]
        );
    }

    #[test]
    fn test_cut_size_config_rejects_unknown() {
        let config: CutSizeConfig = serde_json::from_str(r#""PM4""#).unwrap();
        assert!(matches!(
            CutSize::from_config(&config),
            Err(ConfigError::CutSize(CutSizeError::InvalidToken { .. }))
        ));

        let config: CutSizeConfig =
            serde_json::from_str(r#"{"entries": [{"size": 3}]}"#).unwrap();
        assert!(CutSize::from_config(&config).is_err());
    }
}
