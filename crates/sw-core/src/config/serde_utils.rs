//! Shared serialization/deserialization utilities
//!
//! Durations are stored as plain integers so both the TOML settings file and
//! hand-written profile stores stay readable.

/// Helper module for Duration serialization as seconds
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Settings {
///     #[serde(with = "sw_core::config::serde_utils::duration_secs")]
///     timeout: Duration,
/// }
/// ```
pub mod duration_secs {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    /// Serialize a Duration as seconds (u64)
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    /// Deserialize a Duration from seconds (u64)
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

/// Helper module for Duration serialization as milliseconds
///
/// Used for callback shell delays, which are written as `delay: 500`.
pub mod duration_millis {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Timeouts {
        #[serde(with = "duration_secs")]
        connect: Duration,
        #[serde(with = "duration_millis")]
        delay: Duration,
    }

    #[test]
    fn test_durations_serialize_as_integers() {
        let value = Timeouts {
            connect: Duration::from_secs(10),
            delay: Duration::from_millis(250),
        };
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"connect":10,"delay":250}"#);
    }

    #[test]
    fn test_durations_deserialize_from_integers() {
        let value: Timeouts = serde_json::from_str(r#"{"connect":3,"delay":1500}"#).unwrap();
        assert_eq!(value.connect, Duration::from_secs(3));
        assert_eq!(value.delay, Duration::from_millis(1500));
    }
}
