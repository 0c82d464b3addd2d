//! Definitions files: one XML document holding named connection configs,
//! named messages and named subscription entries.
//!
//! ```xml
//! <DEFINITIONS>
//!     <CONFIG NAME="loopback">
//!         <PARAMETER NAME="mw-id">loopback</PARAMETER>
//!     </CONFIG>
//!     <MESSAGE NAME="hb" SUBJECT="GMSEC.TEST.HB" KIND="PUBLISH">
//!         <FIELD NAME="COUNTER" TYPE="U16">1</FIELD>
//!     </MESSAGE>
//!     <SUBSCRIPTION NAME="all" PATTERN="GMSEC.>">
//!         <EXCLUDE PATTERN="GMSEC.TEST.HB"/>
//!     </SUBSCRIPTION>
//! </DEFINITIONS>
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::debug;

use super::Config;
use crate::message::Message;
use crate::subject;
use crate::utils::xml::{XmlElement, escape};
use crate::utils::{GmsecError, Result};

/// A named subscription pattern with optional excluded sub-patterns.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionEntry {
    name: String,
    pattern: String,
    excluded: Vec<String>,
}

impl SubscriptionEntry {
    pub fn new(name: &str, pattern: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(GmsecError::illegal_argument("Subscription entry name cannot be empty"));
        }
        subject::validate_pattern(pattern, true)?;
        Ok(Self {
            name: name.to_string(),
            pattern: pattern.to_string(),
            excluded: Vec::new(),
        })
    }

    pub fn add_excluded_pattern(&mut self, pattern: &str) -> Result<()> {
        subject::validate_pattern(pattern, true)?;
        self.excluded.push(pattern.to_string());
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn excluded_patterns(&self) -> &[String] {
        &self.excluded
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    path: Option<PathBuf>,
    configs: IndexMap<String, Config>,
    messages: IndexMap<String, Message>,
    subscriptions: IndexMap<String, SubscriptionEntry>,
    loaded: bool,
}

impl ConfigFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads and parses a definitions file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)?;
        let mut file = Self::from_xml(&data)?;
        file.path = Some(path.to_path_buf());
        debug!("Loaded definitions file {}", path.display());
        Ok(file)
    }

    pub fn from_xml(data: &str) -> Result<Self> {
        let root = XmlElement::parse(data)?;
        if !root.is("DEFINITIONS") {
            return Err(GmsecError::parse(format!(
                "expected a DEFINITIONS element, found {}",
                root.name
            )));
        }

        let mut file = Self::new();
        for child in &root.children {
            if child.is("CONFIG") {
                let name = required_name(child)?;
                file.configs
                    .insert(name.to_string(), Config::from_xml_element(child)?);
            } else if child.is("MESSAGE") {
                let name = required_name(child)?;
                file.messages
                    .insert(name.to_string(), Message::from_xml_element(child)?);
            } else if child.is("SUBSCRIPTION") {
                let name = required_name(child)?;
                let pattern = child.attr("PATTERN").ok_or_else(|| {
                    GmsecError::parse(format!("SUBSCRIPTION {name} has no PATTERN"))
                })?;
                let mut entry = SubscriptionEntry::new(name, pattern)
                    .map_err(|e| GmsecError::parse(e.to_string()))?;
                for exclude in child.children_named("EXCLUDE") {
                    if let Some(pattern) = exclude.attr("PATTERN") {
                        entry
                            .add_excluded_pattern(pattern)
                            .map_err(|e| GmsecError::parse(e.to_string()))?;
                    }
                }
                file.subscriptions.insert(name.to_string(), entry);
            } else {
                debug!("Ignoring unknown definitions element {}", child.name);
            }
        }
        file.loaded = true;
        Ok(file)
    }

    pub fn to_xml(&self) -> String {
        let mut out = String::from("<DEFINITIONS>\n");
        for (name, config) in &self.configs {
            let mut named = config.clone();
            named.set_name(name.clone());
            push_block(&mut out, &named.to_xml());
        }
        for (name, msg) in &self.messages {
            push_block(&mut out, &msg.xml_with_name(Some(name)));
        }
        for entry in self.subscriptions.values() {
            if entry.excluded.is_empty() {
                out.push_str(&format!(
                    "\t<SUBSCRIPTION NAME=\"{}\" PATTERN=\"{}\"/>\n",
                    escape(&entry.name),
                    escape(&entry.pattern)
                ));
            } else {
                out.push_str(&format!(
                    "\t<SUBSCRIPTION NAME=\"{}\" PATTERN=\"{}\">\n",
                    escape(&entry.name),
                    escape(&entry.pattern)
                ));
                for excluded in &entry.excluded {
                    out.push_str(&format!("\t\t<EXCLUDE PATTERN=\"{}\"/>\n", escape(excluded)));
                }
                out.push_str("\t</SUBSCRIPTION>\n");
            }
        }
        out.push_str("</DEFINITIONS>");
        out
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_xml())?;
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn lookup_config(&self, name: &str) -> Result<Config> {
        self.configs
            .get(name)
            .cloned()
            .ok_or_else(|| GmsecError::NotFound(format!("Config {name} is not defined")))
    }

    pub fn lookup_message(&self, name: &str) -> Result<Message> {
        self.messages
            .get(name)
            .cloned()
            .ok_or_else(|| GmsecError::NotFound(format!("Message {name} is not defined")))
    }

    pub fn lookup_subscription(&self, name: &str) -> Result<&SubscriptionEntry> {
        self.subscriptions
            .get(name)
            .ok_or_else(|| GmsecError::NotFound(format!("Subscription {name} is not defined")))
    }

    pub fn add_config(&mut self, name: &str, config: Config) -> Result<()> {
        if name.is_empty() {
            return Err(GmsecError::illegal_argument("Config name cannot be empty"));
        }
        self.configs.insert(name.to_string(), config);
        Ok(())
    }

    pub fn remove_config(&mut self, name: &str) -> bool {
        self.configs.shift_remove(name).is_some()
    }

    pub fn add_message(&mut self, name: &str, msg: Message) -> Result<()> {
        if name.is_empty() {
            return Err(GmsecError::illegal_argument("Message name cannot be empty"));
        }
        self.messages.insert(name.to_string(), msg);
        Ok(())
    }

    pub fn remove_message(&mut self, name: &str) -> bool {
        self.messages.shift_remove(name).is_some()
    }

    pub fn add_subscription(&mut self, entry: SubscriptionEntry) {
        self.subscriptions.insert(entry.name.clone(), entry);
    }

    pub fn remove_subscription(&mut self, name: &str) -> bool {
        self.subscriptions.shift_remove(name).is_some()
    }

    pub fn configs(&self) -> impl Iterator<Item = (&str, &Config)> {
        self.configs.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn messages(&self) -> impl Iterator<Item = (&str, &Message)> {
        self.messages.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn subscriptions(&self) -> impl Iterator<Item = &SubscriptionEntry> {
        self.subscriptions.values()
    }
}

impl Config {
    /// Loads the named config from a definitions file.
    pub fn get_from_file(path: impl AsRef<Path>, name: &str) -> Result<Config> {
        ConfigFile::load(path)?.lookup_config(name)
    }
}

fn required_name(element: &XmlElement) -> Result<&str> {
    element
        .attr("NAME")
        .filter(|n| !n.is_empty())
        .ok_or_else(|| GmsecError::parse(format!("{} element has no NAME attribute", element.name)))
}

// Nested blocks are not re-indented so multi-line values survive a round trip.
fn push_block(out: &mut String, block: &str) {
    out.push_str(block);
    out.push('\n');
}
