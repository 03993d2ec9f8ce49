use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};

/// Lifecycle state of a car. Unknown states are kept verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum CarStatus {
    Available,
    Racing,
    Maintenance,
    Sold,
    Other(String),
}

impl CarStatus {
    pub fn as_str(&self) -> &str {
        match self {
            CarStatus::Available => "available",
            CarStatus::Racing => "racing",
            CarStatus::Maintenance => "maintenance",
            CarStatus::Sold => "sold",
            CarStatus::Other(other) => other,
        }
    }

    /// Available and racing cars count as in use.
    pub fn is_active(&self) -> bool {
        matches!(self, CarStatus::Available | CarStatus::Racing)
    }
}

impl From<String> for CarStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "available" => CarStatus::Available,
            "racing" => CarStatus::Racing,
            "maintenance" => CarStatus::Maintenance,
            "sold" => CarStatus::Sold,
            _ => CarStatus::Other(value),
        }
    }
}

impl From<CarStatus> for String {
    fn from(status: CarStatus) -> Self {
        match status {
            CarStatus::Other(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

/// A car as served by the garage store.
///
/// Every field the analytics read is required; fields the analytics do not
/// read are carried through to the complete report untouched. The store does
/// not enforce integers, so every numeric metric is read as `f64`.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Car {
    pub id: u64,
    pub manufacturer: String,
    pub model: String,
    #[serde(serialize_with = "number")]
    pub year: f64,
    #[serde(serialize_with = "number")]
    pub horsepower: f64,
    #[serde(serialize_with = "number")]
    pub top_speed: f64,
    /// Seconds from 0 to 60 mph
    pub acceleration: f64,
    #[serde(serialize_with = "number")]
    pub price: f64,
    pub status: CarStatus,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl Car {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.manufacturer, self.model)
    }
}

/// Writes whole values as JSON integers, so `986` is echoed as `986` and not
/// `986.0`. Anything else is written as a float.
pub fn number<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    const EXACT: f64 = 9_007_199_254_740_992.0;

    if value.fract() == 0.0 && value.abs() <= EXACT {
        if *value >= 0.0 {
            serializer.serialize_u64(*value as u64)
        } else {
            serializer.serialize_i64(*value as i64)
        }
    } else {
        serializer.serialize_f64(*value)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CarsEnvelope {
    pub cars: Vec<Car>,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn car(id: u64, horsepower: u32, price: u64, status: &str, category: &str) -> Car {
        Car {
            id,
            manufacturer: "Maker".into(),
            model: format!("M{id}"),
            year: 2023.0,
            horsepower: f64::from(horsepower),
            top_speed: 200.0,
            acceleration: 3.0,
            price: price as f64,
            status: CarStatus::from(status.to_string()),
            category: category.into(),
            added_at: None,
            extra: Map::new(),
        }
    }
}
