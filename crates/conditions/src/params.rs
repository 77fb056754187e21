use std::collections::BTreeMap;
use std::str::FromStr;

use crate::ConditionError;

/// A parameter value. Values without a decimal point are integers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
}

impl ParamValue {
    pub fn as_f64(self) -> f64 {
        match self {
            ParamValue::Int(v) => v as f64,
            ParamValue::Float(v) => v,
        }
    }
}

/// Named numeric indicator parameters parsed from `length=20, stddev=2`.
/// Keys are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(BTreeMap<String, ParamValue>);

impl FromStr for Params {
    type Err = ConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut values = BTreeMap::new();
        for pair in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, raw) = pair
                .split_once('=')
                .ok_or_else(|| ConditionError::MalformedParam(pair.to_string()))?;
            let key = key.trim().to_lowercase();
            let raw = raw.trim();
            if key.is_empty() {
                return Err(ConditionError::MalformedParam(pair.to_string()));
            }

            let value = if raw.contains('.') {
                raw.parse::<f64>().map(ParamValue::Float)
                    .map_err(|_| ConditionError::MalformedParam(pair.to_string()))?
            } else {
                raw.parse::<i64>().map(ParamValue::Int)
                    .map_err(|_| ConditionError::MalformedParam(pair.to_string()))?
            };
            values.insert(key, value);
        }
        Ok(Params(values))
    }
}

impl Params {
    pub fn get(&self, key: &str) -> Option<ParamValue> {
        self.0.get(key).copied()
    }

    /// First of `keys` present, as a window length of at least `min`.
    pub fn length(&self, keys: &[&str], default: usize, min: usize) -> Result<usize, ConditionError> {
        let Some((name, value)) = self.lookup(keys) else {
            return Ok(default);
        };
        match value {
            ParamValue::Int(v) if v >= min as i64 => Ok(v as usize),
            ParamValue::Int(_) => Err(ConditionError::InvalidParam {
                name: name.to_string(),
                reason: format!("must be at least {min}"),
            }),
            ParamValue::Float(_) => Err(ConditionError::InvalidParam {
                name: name.to_string(),
                reason: "must be a whole number".to_string(),
            }),
        }
    }

    /// First of `keys` present, as a finite non-negative number.
    pub fn number(&self, keys: &[&str], default: f64) -> Result<f64, ConditionError> {
        let Some((name, value)) = self.lookup(keys) else {
            return Ok(default);
        };
        let v = value.as_f64();
        if v.is_finite() && v >= 0.0 {
            Ok(v)
        } else {
            Err(ConditionError::InvalidParam {
                name: name.to_string(),
                reason: "must be a non-negative number".to_string(),
            })
        }
    }

    fn lookup<'a>(&self, keys: &[&'a str]) -> Option<(&'a str, ParamValue)> {
        keys.iter().find_map(|k| self.get(k).map(|v| (*k, v)))
    }
}
