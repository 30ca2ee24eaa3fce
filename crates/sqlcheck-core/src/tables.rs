//! Named-table registry and query templates.
//!
//! Queries reference tables through `{{IDENT}}` placeholders. Rendering
//! substitutes the registered physical name, which is restricted to a plain
//! SQL identifier so substitution can never change the statement's shape.

use crate::errors::HarnessError;
use crate::sqltext::blank_inert;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

fn ident_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex"))
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*([^{}]*?)\s*\}\}").expect("static regex"))
}

/// A validated physical table name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TableName(String);

impl TableName {
    pub fn parse(s: &str) -> Result<Self, HarnessError> {
        if ident_re().is_match(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(HarnessError::Template(format!(
                "'{}' is not a plain SQL identifier",
                s
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TableName {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        TableName::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Fixed mapping from logical identifiers (`MOVIES`, `GENRES`, ...) to tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TableRegistry {
    tables: BTreeMap<String, TableName>,
}

impl<'de> Deserialize<'de> for TableRegistry {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, String>::deserialize(d)?;
        let mut reg = TableRegistry::new();
        for (ident, table) in &raw {
            reg.insert(ident, table).map_err(serde::de::Error::custom)?;
        }
        Ok(reg)
    }
}

impl TableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, ident: &str, table: &str) -> Result<Self, HarnessError> {
        self.insert(ident, table)?;
        Ok(self)
    }

    pub fn insert(&mut self, ident: &str, table: &str) -> Result<(), HarnessError> {
        if !ident_re().is_match(ident) {
            return Err(HarnessError::Template(format!(
                "logical table identifier '{}' is not a plain identifier",
                ident
            )));
        }
        self.tables.insert(ident.to_string(), TableName::parse(table)?);
        Ok(())
    }

    pub fn resolve(&self, ident: &str) -> Result<&TableName, HarnessError> {
        self.tables.get(ident).ok_or_else(|| {
            let mut msg = format!("unknown table identifier '{}'", ident);
            if let Some(s) = self.suggest(ident) {
                msg.push_str(&format!(" (did you mean '{}'?)", s));
            }
            HarnessError::Template(msg)
        })
    }

    fn suggest(&self, ident: &str) -> Option<&str> {
        let wanted = ident.to_ascii_uppercase();
        self.tables
            .keys()
            .map(|k| (k, strsim::jaro_winkler(&wanted, &k.to_ascii_uppercase())))
            .filter(|(_, score)| *score >= 0.8)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TableName)> {
        self.tables.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Text(String),
    Table(String),
}

/// SQL text with `{{IDENT}}` table placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryTemplate {
    segments: Vec<Segment>,
}

impl QueryTemplate {
    /// Placeholders inside string literals, quoted identifiers and comments
    /// are left as written.
    pub fn parse(src: &str) -> Result<Self, HarnessError> {
        let code = blank_inert(src);
        let mut segments = Vec::new();
        let mut last = 0;
        for cap in placeholder_re().captures_iter(&code) {
            let whole = cap.get(0).expect("group 0 always present");
            let ident = cap.get(1).map(|m| m.as_str()).unwrap_or_default();
            if !ident_re().is_match(ident) {
                return Err(HarnessError::Template(format!(
                    "invalid placeholder '{}'",
                    whole.as_str()
                )));
            }
            if whole.start() > last {
                segments.push(Segment::Text(src[last..whole.start()].to_string()));
            }
            segments.push(Segment::Table(ident.to_string()));
            last = whole.end();
        }
        if last < src.len() {
            segments.push(Segment::Text(src[last..].to_string()));
        }
        Ok(Self { segments })
    }

    /// Logical identifiers referenced by this template, in order of use.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Table(t) => Some(t.as_str()),
            Segment::Text(_) => None,
        })
    }

    pub fn render(&self, registry: &TableRegistry) -> Result<String, HarnessError> {
        let mut out = String::new();
        for seg in &self.segments {
            match seg {
                Segment::Text(t) => out.push_str(t),
                Segment::Table(ident) => out.push_str(registry.resolve(ident)?.as_str()),
            }
        }
        Ok(out)
    }
}

/// Parses and renders in one step.
pub fn render_query(src: &str, registry: &TableRegistry) -> Result<String, HarnessError> {
    QueryTemplate::parse(src)?.render(registry)
}
