//! Strict typed reading of the root-group attribute set. Every accessor
//! names the missing or mistyped key instead of silently defaulting.

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use rheedh5_format::{AttrValue, Group};

use crate::error::ExtractError;

/// Typed view over the decoded attributes of one group.
pub struct AttrReader {
    map: HashMap<String, AttrValue>,
}

impl AttrReader {
    pub fn new(map: HashMap<String, AttrValue>) -> AttrReader {
        AttrReader { map }
    }

    pub fn from_group(group: &Group<'_>) -> Result<AttrReader, ExtractError> {
        Ok(AttrReader::new(group.attrs()?))
    }

    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.map.get(key)
    }

    fn require(&self, key: &str) -> Result<&AttrValue, ExtractError> {
        self.map.get(key).ok_or_else(|| ExtractError::MissingKey(key.to_owned()))
    }

    pub fn require_str(&self, key: &str) -> Result<String, ExtractError> {
        match self.require(key)? {
            AttrValue::String(s) => Ok(s.clone()),
            other => Err(ExtractError::WrongType {
                key: key.to_owned(),
                expected: "string",
                found: other.type_name(),
            }),
        }
    }

    /// Integer value. Numeric attributes pass through (floats truncate);
    /// strings are parsed.
    pub fn require_i64(&self, key: &str) -> Result<i64, ExtractError> {
        match self.require(key)? {
            AttrValue::I64(v) => Ok(*v),
            AttrValue::U64(v) => {
                i64::try_from(*v).map_err(|_| ExtractError::BadNumber {
                    key: key.to_owned(),
                    value: v.to_string(),
                })
            }
            AttrValue::F64(v) => Ok(*v as i64),
            AttrValue::String(s) => s.trim().parse().map_err(|_| ExtractError::BadNumber {
                key: key.to_owned(),
                value: s.clone(),
            }),
            other => Err(ExtractError::WrongType {
                key: key.to_owned(),
                expected: "integer",
                found: other.type_name(),
            }),
        }
    }

    pub fn require_f64(&self, key: &str) -> Result<f64, ExtractError> {
        match self.require(key)? {
            AttrValue::F64(v) => Ok(*v),
            AttrValue::I64(v) => Ok(*v as f64),
            AttrValue::U64(v) => Ok(*v as f64),
            AttrValue::String(s) => s.trim().parse().map_err(|_| ExtractError::BadNumber {
                key: key.to_owned(),
                value: s.clone(),
            }),
            other => Err(ExtractError::WrongType {
                key: key.to_owned(),
                expected: "float",
                found: other.type_name(),
            }),
        }
    }

    /// Integer truthiness: `0` (or `"0"`) is false, any other integer
    /// value is true.
    pub fn require_bool(&self, key: &str) -> Result<bool, ExtractError> {
        Ok(self.require_i64(key)? != 0)
    }

    /// Millisecond UNIX timestamp, truncated to whole seconds UTC.
    pub fn require_millis_utc(&self, key: &str) -> Result<DateTime<Utc>, ExtractError> {
        let millis = self.require_i64(key)?;
        let secs = millis.div_euclid(1000);
        Utc.timestamp_opt(secs, 0).single().ok_or_else(|| ExtractError::BadTimestamp {
            key: key.to_owned(),
            value: millis.to_string(),
        })
    }

    pub fn optional_str(&self, key: &str) -> Result<Option<String>, ExtractError> {
        absent_ok(self.require_str(key))
    }

    pub fn optional_i64(&self, key: &str) -> Result<Option<i64>, ExtractError> {
        absent_ok(self.require_i64(key))
    }
}

/// Missing keys become `None`; every other error still propagates.
fn absent_ok<T>(result: Result<T, ExtractError>) -> Result<Option<T>, ExtractError> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(ExtractError::MissingKey(_)) => Ok(None),
        Err(err) => Err(err),
    }
}
