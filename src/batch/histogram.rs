use serde::Serialize;

/// Outcome buckets persisted with every result row.
///
/// The set is part of the results table schema; adding a bucket needs a
/// matching store migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusBucket {
    Ok,
    InternalServerError,
    ServiceUnavailable,
    GatewayTimeout,
    Other,
}

impl StatusBucket {
    pub const ALL: [Self; 5] = [
        Self::Ok,
        Self::InternalServerError,
        Self::ServiceUnavailable,
        Self::GatewayTimeout,
        Self::Other,
    ];

    /// Any status without a dedicated bucket falls into [`StatusBucket::Other`].
    #[must_use]
    pub const fn classify(status: u16) -> Self {
        match status {
            200 => Self::Ok,
            500 => Self::InternalServerError,
            503 => Self::ServiceUnavailable,
            504 => Self::GatewayTimeout,
            _ => Self::Other,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ok => "200",
            Self::InternalServerError => "500",
            Self::ServiceUnavailable => "503",
            Self::GatewayTimeout => "504",
            Self::Other => "other",
        }
    }
}

/// Per-batch status counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusHistogram {
    #[serde(rename = "200")]
    ok: u64,
    #[serde(rename = "500")]
    internal_server_error: u64,
    #[serde(rename = "503")]
    service_unavailable: u64,
    #[serde(rename = "504")]
    gateway_timeout: u64,
    other: u64,
}

impl StatusHistogram {
    #[must_use]
    pub const fn from_counts(
        ok: u64,
        internal_server_error: u64,
        service_unavailable: u64,
        gateway_timeout: u64,
        other: u64,
    ) -> Self {
        Self {
            ok,
            internal_server_error,
            service_unavailable,
            gateway_timeout,
            other,
        }
    }

    /// Counts one response and returns the bucket it landed in.
    pub fn record(&mut self, status: u16) -> StatusBucket {
        let bucket = StatusBucket::classify(status);
        let slot = match bucket {
            StatusBucket::Ok => &mut self.ok,
            StatusBucket::InternalServerError => &mut self.internal_server_error,
            StatusBucket::ServiceUnavailable => &mut self.service_unavailable,
            StatusBucket::GatewayTimeout => &mut self.gateway_timeout,
            StatusBucket::Other => &mut self.other,
        };
        *slot = slot.saturating_add(1);
        bucket
    }

    #[must_use]
    pub const fn count(&self, bucket: StatusBucket) -> u64 {
        match bucket {
            StatusBucket::Ok => self.ok,
            StatusBucket::InternalServerError => self.internal_server_error,
            StatusBucket::ServiceUnavailable => self.service_unavailable,
            StatusBucket::GatewayTimeout => self.gateway_timeout,
            StatusBucket::Other => self.other,
        }
    }

    #[must_use]
    pub const fn total(&self) -> u64 {
        self.ok
            .saturating_add(self.internal_server_error)
            .saturating_add(self.service_unavailable)
            .saturating_add(self.gateway_timeout)
            .saturating_add(self.other)
    }
}
