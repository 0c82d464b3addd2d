//! Text forms of `Config`: command-line tokens, key/value strings, XML and
//! JSON.

use std::str::FromStr;

use serde_json::{Map, Value, json};

use super::Config;
use crate::utils::json::{get_ci, one_or_many, scalar_text};
use crate::utils::xml::{XmlElement, escape};
use crate::utils::{GmsecError, Result};

impl Config {
    /// Builds a config from command-line style `key=value` tokens.
    ///
    /// Tokens without `=` (such as the program name) are ignored, as are
    /// tokens with an empty key or value.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut config = Config::new();
        for arg in args {
            if let Some((key, value)) = arg.as_ref().split_once('=') {
                if !key.is_empty() && !value.is_empty() {
                    // key is known to be non-empty
                    let _ = config.add_value(key, value);
                }
            }
        }
        config
    }

    /// Parses XML, JSON or a whitespace-separated `key=value` string.
    pub fn from_data(data: &str) -> Result<Self> {
        let trimmed = data.trim_start();
        if trimmed.starts_with('<') {
            Self::from_xml(trimmed)
        } else if trimmed.starts_with('{') {
            Self::from_json(trimmed)
        } else {
            Self::from_key_values(trimmed)
        }
    }

    /// Parses `k1=v1 k2="a value"` strings. Double quotes group a value
    /// containing whitespace.
    pub fn from_key_values(data: &str) -> Result<Self> {
        let mut config = Config::new();
        for token in tokenize(data) {
            match token.split_once('=') {
                Some((key, value)) if !key.is_empty() => config.add_value(key, value)?,
                _ => {
                    return Err(GmsecError::parse(format!(
                        "Config token '{token}' is not a key=value pair"
                    )));
                }
            }
        }
        if config.is_empty() {
            return Err(GmsecError::parse("Config data contains no key=value pairs"));
        }
        Ok(config)
    }

    pub fn from_xml(data: &str) -> Result<Self> {
        let root = XmlElement::parse(data)?;
        Self::from_xml_element(&root)
    }

    pub(crate) fn from_xml_element(root: &XmlElement) -> Result<Self> {
        if !root.is("CONFIG") {
            return Err(GmsecError::parse(format!(
                "expected a CONFIG element, found {}",
                root.name
            )));
        }
        let mut config = Config::new();
        if let Some(name) = root.attr("NAME") {
            config.set_name(name);
        }
        for param in root.children_named("PARAMETER") {
            let key = param
                .attr("NAME")
                .ok_or_else(|| GmsecError::parse("PARAMETER element has no NAME attribute"))?;
            config
                .add_value(key, &param.text)
                .map_err(|e| GmsecError::parse(e.to_string()))?;
        }
        Ok(config)
    }

    pub fn from_json(data: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(data).map_err(|e| GmsecError::parse(e.to_string()))?;
        let root = value
            .as_object()
            .and_then(|obj| get_ci(obj, "CONFIG"))
            .and_then(Value::as_object)
            .ok_or_else(|| GmsecError::parse("JSON data has no CONFIG object"))?;

        Self::from_json_body(root)
    }

    /// Decodes the object held under the `CONFIG` key.
    pub(crate) fn from_json_body(root: &Map<String, Value>) -> Result<Self> {
        let mut config = Config::new();
        if let Some(name) = get_ci(root, "NAME").and_then(scalar_text) {
            config.set_name(name);
        }
        if let Some(params) = get_ci(root, "PARAMETER") {
            for param in one_or_many(params) {
                let param = param
                    .as_object()
                    .ok_or_else(|| GmsecError::parse("PARAMETER entry is not an object"))?;
                let key = get_ci(param, "NAME")
                    .and_then(scalar_text)
                    .ok_or_else(|| GmsecError::parse("PARAMETER entry has no NAME"))?;
                let value = get_ci(param, "VALUE").and_then(scalar_text).unwrap_or_default();
                config
                    .add_value(&key, &value)
                    .map_err(|e| GmsecError::parse(e.to_string()))?;
            }
        }
        Ok(config)
    }

    pub fn to_xml(&self) -> String {
        let mut out = match self.name() {
            Some(name) => format!("<CONFIG NAME=\"{}\">\n", escape(name)),
            None => "<CONFIG>\n".to_string(),
        };
        for (key, value) in self.iter() {
            out.push_str(&format!(
                "\t<PARAMETER NAME=\"{}\">{}</PARAMETER>\n",
                escape(key),
                escape(value)
            ));
        }
        out.push_str("</CONFIG>");
        out
    }

    pub fn to_json(&self) -> String {
        json!({ "CONFIG": self.json_body() }).to_string()
    }

    /// The object placed under the `CONFIG` key.
    pub(crate) fn json_body(&self) -> Value {
        let params: Vec<Value> = self
            .iter()
            .map(|(key, value)| json!({ "NAME": key, "VALUE": value }))
            .collect();
        let mut body = Map::new();
        if let Some(name) = self.name() {
            body.insert("NAME".to_string(), Value::String(name.to_string()));
        }
        body.insert("PARAMETER".to_string(), Value::Array(params));
        Value::Object(body)
    }
}

impl FromStr for Config {
    type Err = GmsecError;

    fn from_str(s: &str) -> Result<Self> {
        Config::from_data(s)
    }
}

fn tokenize(data: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for c in data.chars() {
        match c {
            '"' => quoted = !quoted,
            c if c.is_whitespace() && !quoted => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}
