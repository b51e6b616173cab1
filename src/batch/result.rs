use std::fmt;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use serde::{Serialize, Serializer};

use crate::args::PositiveUsize;

use super::StatusHistogram;

const NANOS_PER_CENTI: u128 = 10_000_000;
const HALF_CENTI_NANOS: u128 = 5_000_000;

/// Wall-clock batch duration rounded to hundredths of a second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Latency {
    centis: u64,
}

impl Latency {
    #[must_use]
    pub const fn from_centis(centis: u64) -> Self {
        Self { centis }
    }

    /// Rounds half up to the nearest hundredth of a second.
    #[must_use]
    pub const fn from_duration(duration: Duration) -> Self {
        let centis = match duration
            .as_nanos()
            .saturating_add(HALF_CENTI_NANOS)
            .checked_div(NANOS_PER_CENTI)
        {
            Some(centis) => centis,
            None => 0,
        };
        Self {
            centis: if centis > u64::MAX as u128 {
                u64::MAX
            } else {
                centis as u64
            },
        }
    }

    /// Reverses [`Latency::as_secs_f64`]; negative or non-finite values yield `None`.
    #[must_use]
    pub fn from_secs_f64(seconds: f64) -> Option<Self> {
        match Duration::try_from_secs_f64(seconds) {
            Ok(duration) => Some(Self::from_duration(duration)),
            Err(_) => None,
        }
    }

    #[must_use]
    pub const fn centis(self) -> u64 {
        self.centis
    }

    #[must_use]
    pub fn as_secs_f64(self) -> f64 {
        Duration::from_millis(self.centis.saturating_mul(10)).as_secs_f64()
    }
}

impl fmt::Display for Latency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.centis / 100, self.centis % 100)
    }
}

impl Serialize for Latency {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(self.as_secs_f64())
    }
}

/// Measurement of one batch. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult {
    started_at: DateTime<FixedOffset>,
    elapsed: Latency,
    histogram: StatusHistogram,
    concurrency: PositiveUsize,
}

impl BatchResult {
    #[must_use]
    pub const fn new(
        started_at: DateTime<FixedOffset>,
        elapsed: Latency,
        histogram: StatusHistogram,
        concurrency: PositiveUsize,
    ) -> Self {
        Self {
            started_at,
            elapsed,
            histogram,
            concurrency,
        }
    }

    #[must_use]
    pub const fn started_at(&self) -> DateTime<FixedOffset> {
        self.started_at
    }

    #[must_use]
    pub const fn elapsed(&self) -> Latency {
        self.elapsed
    }

    #[must_use]
    pub const fn histogram(&self) -> &StatusHistogram {
        &self.histogram
    }

    #[must_use]
    pub const fn concurrency(&self) -> PositiveUsize {
        self.concurrency
    }
}
