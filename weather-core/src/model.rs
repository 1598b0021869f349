use serde::{Deserialize, Serialize};

/// Simplified current-weather view returned to clients.
///
/// `temperature` and `humidity` already carry their units ("15.5°C", "70%").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub location: String,
    pub temperature: String,
    pub humidity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

/// Placeholder weather for a named city.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StaticLocationRecord {
    pub location: &'static str,
    pub temperature: &'static str,
    pub humidity: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GlobalAverageRecord {
    pub description: &'static str,
    pub temperature: &'static str,
    pub humidity: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_without_condition_omits_the_field() {
        let report = WeatherReport {
            location: "Oslo".into(),
            temperature: "3°C".into(),
            humidity: "81%".into(),
            condition: None,
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"location": "Oslo", "temperature": "3°C", "humidity": "81%"})
        );
    }
}
