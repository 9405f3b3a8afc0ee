use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{Capability, DeviceId, Value};

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Fresh value from a healthy device
    Live,
    /// Last known value served past its freshness window
    Cached,
    /// Synthesized placeholder
    Mock,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingResponse {
    /// Device identifier
    pub device_id: DeviceId,
    /// Measured capability
    pub metric: Capability,
    /// Measured value
    pub value: Value,
    /// Unit of the value, empty for booleans
    pub unit: String,
    /// Provenance of the value
    pub source: Source,
    /// Capture time
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}
