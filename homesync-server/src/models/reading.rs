use homesync_api::models::*;
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub device_id: DeviceId,
    pub metric: Capability,
    pub value: Value,
    pub unit: String,
    pub captured_at: OffsetDateTime,
    pub source: Source,
}

impl Reading {
    pub fn with_source(mut self, source: Source) -> Self {
        self.source = source;
        self
    }

    pub fn into_response(self) -> ReadingResponse {
        ReadingResponse {
            device_id: self.device_id,
            metric: self.metric,
            value: self.value,
            unit: self.unit,
            source: self.source,
            timestamp: self.captured_at,
        }
    }
}

/// A cache hit together with its freshness at lookup time.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedReading {
    pub reading: Reading,
    pub fresh: bool,
}
