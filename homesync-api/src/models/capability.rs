use std::fmt;

use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Switchable power state of a light or outlet
    OnOff,
    /// Ambient temperature in degrees Celsius
    Temperature,
    /// Relative humidity percentage
    Humidity,
    /// Barometric pressure in hPa
    Pressure,
    /// Ambient light level in lux
    Light,
    /// Presence detected by a PIR sensor
    Motion,
}

impl Capability {
    pub const ALL: [Capability; 6] = [
        Capability::OnOff,
        Capability::Temperature,
        Capability::Humidity,
        Capability::Pressure,
        Capability::Light,
        Capability::Motion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::OnOff => "on_off",
            Capability::Temperature => "temperature",
            Capability::Humidity => "humidity",
            Capability::Pressure => "pressure",
            Capability::Light => "light",
            Capability::Motion => "motion",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Capability::Temperature => "°C",
            Capability::Humidity => "%",
            Capability::Pressure => "hPa",
            Capability::Light => "lx",
            Capability::OnOff | Capability::Motion => "",
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Capability::OnOff | Capability::Motion => ValueKind::Boolean,
            _ => ValueKind::Numeric,
        }
    }

    /// Only actuator state can be commanded; measurements are read-only.
    pub fn is_writable(&self) -> bool {
        matches!(self, Capability::OnOff)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Boolean,
    Numeric,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Boolean => f.write_str("boolean"),
            ValueKind::Numeric => f.write_str("numeric"),
        }
    }
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Number(f64),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Bool(_) => ValueKind::Boolean,
            Value::Number(_) => ValueKind::Numeric,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            Value::Number(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(value) => Some(*value),
            Value::Bool(_) => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(value) => write!(f, "{value}"),
            Value::Number(value) => write!(f, "{value}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_wire_names() {
        for capability in Capability::ALL {
            let json = serde_json::to_string(&capability).unwrap();
            assert_eq!(json, format!("\"{}\"", capability.as_str()));
        }

        let parsed: Capability = serde_json::from_str("\"on_off\"").unwrap();
        assert_eq!(parsed, Capability::OnOff);
    }

    #[test]
    fn test_value_is_untagged() {
        assert_eq!(serde_json::from_str::<Value>("true").unwrap(), Value::Bool(true));
        assert_eq!(serde_json::from_str::<Value>("21.5").unwrap(), Value::Number(21.5));
        assert_eq!(serde_json::to_string(&Value::Bool(false)).unwrap(), "false");
    }

    #[test]
    fn test_only_on_off_is_writable() {
        let writable: Vec<_> = Capability::ALL
            .into_iter()
            .filter(Capability::is_writable)
            .collect();

        assert_eq!(writable, vec![Capability::OnOff]);
        assert_eq!(Capability::OnOff.kind(), ValueKind::Boolean);
        assert_eq!(Capability::Pressure.kind(), ValueKind::Numeric);
        assert_eq!(Capability::Pressure.unit(), "hPa");
    }
}
