//! Serde helpers that keep times on the wire as `HH:MM`.

use chrono::NaiveTime;
use serde::{Deserialize, Deserializer, Serializer};

pub const FORMAT: &str = "%H:%M";

pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&time.format(FORMAT).to_string())
}

pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
    let raw = String::deserialize(d)?;
    NaiveTime::parse_from_str(&raw, FORMAT)
        .map_err(|_| serde::de::Error::custom(format!("invalid time (expected HH:MM): {raw}")))
}

pub mod option {
    use super::*;

    pub fn serialize<S: Serializer>(time: &Option<NaiveTime>, s: S) -> Result<S::Ok, S::Error> {
        match time {
            Some(t) => super::serialize(t, s),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveTime>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        raw.map(|r| {
            NaiveTime::parse_from_str(&r, FORMAT)
                .map_err(|_| serde::de::Error::custom(format!("invalid time (expected HH:MM): {r}")))
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Serialize, Deserialize)]
    struct Wrapper {
        #[serde(with = "super")]
        at: NaiveTime,
        #[serde(default, with = "super::option")]
        until: Option<NaiveTime>,
    }

    #[test]
    fn test_reads_and_writes_hhmm() {
        let w: Wrapper = serde_json::from_str(r#"{"at":"09:30"}"#).unwrap();
        assert_eq!(w.at, NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert!(w.until.is_none());
        assert_eq!(serde_json::to_string(&w).unwrap(), r#"{"at":"09:30","until":null}"#);
    }

    #[test]
    fn test_rejects_bad_time() {
        assert!(serde_json::from_str::<Wrapper>(r#"{"at":"25:00"}"#).is_err());
        assert!(serde_json::from_str::<Wrapper>(r#"{"at":"9"}"#).is_err());
    }
}
