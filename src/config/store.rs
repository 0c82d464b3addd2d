use indexmap::IndexMap;
use tracing::warn;

use crate::utils::{GmsecError, Result};

/// An ordered key/value option store.
///
/// Keys are matched case-insensitively; the spelling used when a key was
/// first added is kept for iteration and serialisation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub(crate) name: Option<String>,
    pub(crate) entries: IndexMap<String, String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a config from `key=value` pairs; pairs with an empty key are rejected.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Result<Self>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::new();
        for (key, value) in pairs {
            config.add_value(key.as_ref(), value.as_ref())?;
        }
        Ok(config)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    fn index_of(&self, key: &str) -> Option<usize> {
        self.entries.get_index_of(key).or_else(|| {
            self.entries
                .keys()
                .position(|existing| existing.eq_ignore_ascii_case(key))
        })
    }

    /// Adds or replaces a value.
    pub fn add_value(&mut self, key: &str, value: &str) -> Result<()> {
        if key.is_empty() {
            return Err(GmsecError::illegal_argument("Config key cannot be empty"));
        }
        match self.index_of(key) {
            Some(idx) => {
                if let Some((_, existing)) = self.entries.get_index_mut(idx) {
                    *existing = value.to_string();
                }
            }
            None => {
                self.entries.insert(key.to_string(), value.to_string());
            }
        }
        Ok(())
    }

    /// Removes a value. Returns false if the key was not present.
    pub fn clear_value(&mut self, key: &str) -> bool {
        match self.index_of(key) {
            Some(idx) => self.entries.shift_remove_index(idx).is_some(),
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn get_value(&self, key: &str) -> Option<&str> {
        self.index_of(key)
            .and_then(|idx| self.entries.get_index(idx))
            .map(|(_, value)| value.as_str())
    }

    pub fn get_value_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get_value(key).unwrap_or(default)
    }

    fn require(&self, key: &str) -> Result<&str> {
        self.get_value(key)
            .ok_or_else(|| GmsecError::NotFound(format!("Config has no value for '{key}'")))
    }

    /// Strict boolean lookup; accepts `true`/`false` in any case.
    pub fn get_boolean_value(&self, key: &str) -> Result<bool> {
        let value = self.require(key)?;
        parse_bool(value, false).ok_or_else(|| {
            GmsecError::TypeConversion(format!("'{key}' value '{value}' is not a boolean"))
        })
    }

    pub fn get_integer_value(&self, key: &str) -> Result<i64> {
        let value = self.require(key)?;
        value.trim().parse::<i64>().map_err(|_| {
            GmsecError::TypeConversion(format!("'{key}' value '{value}' is not an integer"))
        })
    }

    pub fn get_double_value(&self, key: &str) -> Result<f64> {
        let value = self.require(key)?;
        value.trim().parse::<f64>().map_err(|_| {
            GmsecError::TypeConversion(format!("'{key}' value '{value}' is not a number"))
        })
    }

    /// Boolean lookup with fallback; also accepts `1` and `0`.
    pub fn get_boolean_value_or(&self, key: &str, default: bool) -> bool {
        match self.get_value(key) {
            None => default,
            Some(value) => parse_bool(value, true).unwrap_or_else(|| {
                warn!("Config value for {} is not a boolean: {}", key, value);
                default
            }),
        }
    }

    pub fn get_integer_value_or(&self, key: &str, default: i64) -> i64 {
        match self.get_value(key) {
            None => default,
            Some(value) => value.trim().parse().unwrap_or_else(|_| {
                warn!("Config value for {} is not an integer: {}", key, value);
                default
            }),
        }
    }

    pub fn get_double_value_or(&self, key: &str, default: f64) -> f64 {
        match self.get_value(key) {
            None => default,
            Some(value) => value.trim().parse().unwrap_or_else(|_| {
                warn!("Config value for {} is not a number: {}", key, value);
                default
            }),
        }
    }

    /// Key-wise union with `other`. On conflict, `overwrite_existing`
    /// decides whether the value from `other` replaces ours.
    pub fn merge(&mut self, other: &Config, overwrite_existing: bool) {
        for (key, value) in other.iter() {
            match self.index_of(key) {
                Some(idx) if overwrite_existing => {
                    if let Some((_, existing)) = self.entries.get_index_mut(idx) {
                        *existing = value.to_string();
                    }
                }
                Some(_) => {}
                None => {
                    self.entries.insert(key.to_string(), value.to_string());
                }
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_bool(value: &str, allow_digits: bool) -> Option<bool> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else if allow_digits && value == "1" {
        Some(true)
    } else if allow_digits && value == "0" {
        Some(false)
    } else {
        None
    }
}
