//! Benchmark options
//!
//! [`Options`] is the per-scope record users hand to `add` and `suite`.
//! Scopes combine with [`Options::merge`]: child fields replace parent
//! fields wholesale, so an explicit `skip` list or hook is never combined
//! with the parent's.

use crate::error::{BoxError, ConfigError};
use crate::hooks::{BoxFuture, Setup, Teardown};
use faceoff_ipc::JobTuning;
use std::path::Path;
use std::time::Duration;

/// Fully-resolved sampler tuning for one benchmark
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TuningOptions {
    /// Time spent running single iterations before measuring
    pub warmup_time: Duration,
    /// Target duration of one timed batch
    pub min_time: Duration,
    /// Measurement budget
    pub max_time: Duration,
    /// Samples to collect even when the budget runs out
    pub min_samples: u64,
    /// Hard cap on collected samples
    pub max_samples: Option<u64>,
    /// Fixed-count mode: exactly this many one-iteration samples, no warmup
    pub samples: Option<u64>,
    /// Run each version in a separate worker process
    pub isolated: bool,
}

impl Default for TuningOptions {
    fn default() -> Self {
        Self {
            warmup_time: Duration::from_millis(100),
            min_time: Duration::from_millis(5),
            max_time: Duration::from_millis(500),
            min_samples: 10,
            max_samples: None,
            samples: None,
            isolated: false,
        }
    }
}

impl TuningOptions {
    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_time.is_zero() {
            return Err(ConfigError::invalid_option(
                "max_time",
                format!("{:?}", self.max_time),
                "must be > 0",
            ));
        }
        if self.min_time > self.max_time {
            return Err(ConfigError::invalid_option(
                "min_time",
                format!("{:?}", self.min_time),
                format!("must not exceed max_time ({:?})", self.max_time),
            ));
        }
        if self.min_samples == 0 {
            return Err(ConfigError::invalid_option("min_samples", 0, "must be > 0"));
        }
        if let Some(max) = self.max_samples {
            if max < self.min_samples {
                return Err(ConfigError::invalid_option(
                    "max_samples",
                    max,
                    format!("must be >= min_samples ({})", self.min_samples),
                ));
            }
        }
        if self.samples == Some(0) {
            return Err(ConfigError::invalid_option("samples", 0, "must be > 0"));
        }
        Ok(())
    }

    /// Wire form sent to isolated workers
    pub fn to_job(&self) -> JobTuning {
        JobTuning {
            warmup_time_ns: self.warmup_time.as_nanos() as u64,
            min_time_ns: self.min_time.as_nanos() as u64,
            max_time_ns: self.max_time.as_nanos() as u64,
            min_samples: self.min_samples,
            max_samples: self.max_samples,
            samples: self.samples,
        }
    }

    /// Rebuild from the wire form (workers never isolate further)
    pub fn from_job(job: &JobTuning) -> Self {
        Self {
            warmup_time: Duration::from_nanos(job.warmup_time_ns),
            min_time: Duration::from_nanos(job.min_time_ns),
            max_time: Duration::from_nanos(job.max_time_ns),
            min_samples: job.min_samples,
            max_samples: job.max_samples,
            samples: job.samples,
            isolated: false,
        }
    }
}

/// Partially-specified tuning, layered scope by scope
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TuningOverrides {
    pub warmup_time: Option<Duration>,
    pub min_time: Option<Duration>,
    pub max_time: Option<Duration>,
    pub min_samples: Option<u64>,
    pub max_samples: Option<u64>,
    pub samples: Option<u64>,
    pub isolated: Option<bool>,
}

impl TuningOverrides {
    /// Child values win field by field
    pub fn merge(parent: &Self, child: &Self) -> Self {
        Self {
            warmup_time: child.warmup_time.or(parent.warmup_time),
            min_time: child.min_time.or(parent.min_time),
            max_time: child.max_time.or(parent.max_time),
            min_samples: child.min_samples.or(parent.min_samples),
            max_samples: child.max_samples.or(parent.max_samples),
            samples: child.samples.or(parent.samples),
            isolated: child.isolated.or(parent.isolated),
        }
    }

    /// Fill unset fields from `base`
    pub fn resolve(&self, base: &TuningOptions) -> TuningOptions {
        TuningOptions {
            warmup_time: self.warmup_time.unwrap_or(base.warmup_time),
            min_time: self.min_time.unwrap_or(base.min_time),
            max_time: self.max_time.unwrap_or(base.max_time),
            min_samples: self.min_samples.unwrap_or(base.min_samples),
            max_samples: self.max_samples.or(base.max_samples),
            samples: self.samples.or(base.samples),
            isolated: self.isolated.unwrap_or(base.isolated),
        }
    }

    /// Set one option from its textual form.
    ///
    /// Durations accept `ns`, `us`, `ms`, `s` and `m` suffixes; a bare number
    /// is seconds.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let count = |value: &str| {
            value
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::invalid_option(key, value, "expected a non-negative integer"))
        };
        let duration = |value: &str| {
            parse_duration(value).map_err(|reason| ConfigError::invalid_option(key, value, reason))
        };

        match key {
            "warmup_time" => self.warmup_time = Some(duration(value)?),
            "min_time" => self.min_time = Some(duration(value)?),
            "max_time" => self.max_time = Some(duration(value)?),
            "min_samples" => self.min_samples = Some(count(value)?),
            "max_samples" => self.max_samples = Some(count(value)?),
            "samples" => self.samples = Some(count(value)?),
            "isolated" => {
                self.isolated = Some(value.trim().parse::<bool>().map_err(|_| {
                    ConfigError::invalid_option(key, value, "expected `true` or `false`")
                })?)
            }
            _ => return Err(ConfigError::invalid_option(key, value, "unknown option")),
        }
        Ok(())
    }
}

/// Parse a duration string such as `"500ms"`, `"1.5s"` or `"2m"`
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration".to_string());
    }

    let (number, unit) = s
        .char_indices()
        .find(|(_, c)| c.is_alphabetic() || *c == 'µ')
        .map(|(i, _)| s.split_at(i))
        .unwrap_or((s, "s"));

    let value: f64 = number
        .trim()
        .parse()
        .map_err(|_| format!("invalid duration number: {number}"))?;
    if !value.is_finite() || value < 0.0 {
        return Err(format!("duration must be a non-negative number: {number}"));
    }

    let nanos_per_unit: f64 = match unit.to_lowercase().as_str() {
        "ns" => 1.0,
        "us" | "µs" => 1e3,
        "ms" => 1e6,
        "s" => 1e9,
        "m" | "min" => 60e9,
        other => return Err(format!("unknown duration unit: {other}")),
    };

    Ok(Duration::from_nanos((value * nanos_per_unit) as u64))
}

/// Options accepted by `add` and `suite`
pub struct Options<M, C> {
    pub(crate) skip: Option<Vec<String>>,
    pub(crate) setup: Option<Setup<M, C>>,
    pub(crate) teardown: Option<Teardown<M, C>>,
    pub(crate) tuning: TuningOverrides,
    pub(crate) invalid: Option<ConfigError>,
}

impl<M, C> Default for Options<M, C> {
    fn default() -> Self {
        Self {
            skip: None,
            setup: None,
            teardown: None,
            tuning: TuningOverrides::default(),
            invalid: None,
        }
    }
}

impl<M, C> Clone for Options<M, C> {
    fn clone(&self) -> Self {
        Self {
            skip: self.skip.clone(),
            setup: self.setup.clone(),
            teardown: self.teardown.clone(),
            tuning: self.tuning.clone(),
            invalid: self.invalid.clone(),
        }
    }
}

impl<M, C> std::fmt::Debug for Options<M, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Options")
            .field("skip", &self.skip)
            .field("setup", &self.setup)
            .field("teardown", &self.teardown)
            .field("tuning", &self.tuning)
            .field("invalid", &self.invalid)
            .finish()
    }
}

impl<M, C> Options<M, C> {
    /// Empty options (inherit everything)
    pub fn new() -> Self {
        Self::default()
    }

    /// Pure shallow merge: every field set on `child` replaces the parent's
    pub fn merge(parent: &Self, child: &Self) -> Self {
        Self {
            skip: child.skip.clone().or_else(|| parent.skip.clone()),
            setup: child.setup.clone().or_else(|| parent.setup.clone()),
            teardown: child.teardown.clone().or_else(|| parent.teardown.clone()),
            tuning: TuningOverrides::merge(&parent.tuning, &child.tuning),
            invalid: child.invalid.clone().or_else(|| parent.invalid.clone()),
        }
    }

    /// Version labels this benchmark must not run against
    pub fn skip<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    /// Synchronous setup producing the per-execution context
    pub fn setup(mut self, f: impl Fn(&M, &Path) -> Result<C, BoxError> + 'static) -> Self {
        self.setup = Some(Setup::sync(f));
        self
    }

    /// Asynchronous setup producing the per-execution context
    pub fn setup_async(
        mut self,
        f: impl for<'a> Fn(&'a M, &'a Path) -> BoxFuture<'a, Result<C, BoxError>> + 'static,
    ) -> Self {
        self.setup = Some(Setup::future(f));
        self
    }

    /// Synchronous teardown, run after timing even when the body failed
    pub fn teardown(mut self, f: impl Fn(&M, C) -> Result<(), BoxError> + 'static) -> Self {
        self.teardown = Some(Teardown::sync(f));
        self
    }

    /// Asynchronous teardown, run after timing even when the body failed
    pub fn teardown_async(
        mut self,
        f: impl for<'a> Fn(&'a M, C) -> BoxFuture<'a, Result<(), BoxError>> + 'static,
    ) -> Self {
        self.teardown = Some(Teardown::future(f));
        self
    }

    /// Warmup budget
    pub fn warmup_time(mut self, value: std::time::Duration) -> Self {
        self.tuning.warmup_time = Some(value);
        self
    }

    /// Target duration of one timed batch
    pub fn min_time(mut self, value: std::time::Duration) -> Self {
        self.tuning.min_time = Some(value);
        self
    }

    /// Measurement budget
    pub fn max_time(mut self, value: std::time::Duration) -> Self {
        self.tuning.max_time = Some(value);
        self
    }

    /// Minimum number of samples
    pub fn min_samples(mut self, value: u64) -> Self {
        self.tuning.min_samples = Some(value);
        self
    }

    /// Maximum number of samples
    pub fn max_samples(mut self, value: u64) -> Self {
        self.tuning.max_samples = Some(value);
        self
    }

    /// Fixed number of one-iteration samples, no warmup
    pub fn samples(mut self, value: u64) -> Self {
        self.tuning.samples = Some(value);
        self
    }

    /// Run in an isolated worker process
    pub fn isolated(mut self, value: bool) -> Self {
        self.tuning.isolated = Some(value);
        self
    }

    /// Layer a whole set of tuning overrides on top of these options
    pub fn tuning(mut self, overrides: &TuningOverrides) -> Self {
        self.tuning = TuningOverrides::merge(&self.tuning, overrides);
        self
    }

    /// Set a tuning option from text, e.g. `("min_samples", "50")`.
    ///
    /// A value that does not parse is reported by the next `add` or `suite`
    /// receiving these options.
    pub fn set(mut self, key: &str, value: impl AsRef<str>) -> Self {
        if let Err(err) = self.tuning.set(key, value.as_ref()) {
            self.invalid.get_or_insert(err);
        }
        self
    }

    /// Surface the first invalid option, if any
    pub(crate) fn check(&self) -> Result<(), ConfigError> {
        match &self.invalid {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Skip list, if one was given
    pub fn skip_list(&self) -> Option<&[String]> {
        self.skip.as_deref()
    }

    /// Tuning overrides
    pub fn tuning_overrides(&self) -> &TuningOverrides {
        &self.tuning
    }

    /// Whether a setup hook is configured
    pub fn has_setup(&self) -> bool {
        self.setup.is_some()
    }

    /// Whether a teardown hook is configured
    pub fn has_teardown(&self) -> bool {
        self.teardown.is_some()
    }
}
