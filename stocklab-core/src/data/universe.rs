//! Symbol universe configuration — grouped ticker lists.
//!
//! Stored as TOML, one array of tickers per group (exchange, sector, ...):
//!
//! ```toml
//! [groups]
//! Shanghai = ["600000.SS", "600519.SS"]
//! Shenzhen = ["000001.SZ"]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UniverseError {
    #[error("read universe file: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse universe TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize universe: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("universe has no symbols")]
    Empty,

    #[error("unknown group '{group}' (available: {available})")]
    UnknownGroup { group: String, available: String },
}

/// The set of symbols under consideration for one analysis period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolUniverse {
    pub groups: BTreeMap<String, Vec<String>>,
}

impl SymbolUniverse {
    pub fn from_file(path: &Path) -> Result<Self, UniverseError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, UniverseError> {
        let universe: Self = toml::from_str(content)?;
        if universe.symbol_count() == 0 {
            return Err(UniverseError::Empty);
        }
        Ok(universe)
    }

    pub fn to_toml(&self) -> Result<String, UniverseError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// All symbols, group by group, first occurrence kept.
    pub fn all_symbols(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.groups
            .values()
            .flat_map(|symbols| symbols.iter().map(String::as_str))
            .filter(|s| seen.insert(*s))
            .collect()
    }

    pub fn group_symbols(&self, group: &str) -> Option<&[String]> {
        self.groups.get(group).map(Vec::as_slice)
    }

    pub fn group_names(&self) -> Vec<&str> {
        self.groups.keys().map(String::as_str).collect()
    }

    /// Symbols of one group, or of the whole universe when `group` is None.
    pub fn select(&self, group: Option<&str>) -> Result<Vec<&str>, UniverseError> {
        let Some(group) = group else {
            return Ok(self.all_symbols());
        };
        let symbols = self
            .group_symbols(group)
            .ok_or_else(|| UniverseError::UnknownGroup {
                group: group.to_string(),
                available: self.group_names().join(", "),
            })?;
        Ok(symbols.iter().map(String::as_str).collect())
    }

    /// Number of distinct symbols.
    pub fn symbol_count(&self) -> usize {
        self.all_symbols().len()
    }

    /// Heavyweight CSI 300 constituents, Yahoo-suffixed.
    pub fn default_csi300_sample() -> Self {
        let mut groups = BTreeMap::new();

        groups.insert(
            "Shanghai".into(),
            [
                "600000.SS", "600016.SS", "600028.SS", "600030.SS", "600036.SS", "600048.SS",
                "600050.SS", "600104.SS", "600276.SS", "600309.SS", "600519.SS", "600585.SS",
                "600887.SS", "600900.SS", "601012.SS", "601166.SS", "601288.SS", "601318.SS",
                "601398.SS", "601628.SS", "601668.SS", "601857.SS", "601888.SS", "601988.SS",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        );

        groups.insert(
            "Shenzhen".into(),
            [
                "000001.SZ", "000002.SZ", "000063.SZ", "000333.SZ", "000538.SZ", "000568.SZ",
                "000651.SZ", "000725.SZ", "000858.SZ", "002027.SZ", "002142.SZ", "002304.SZ",
                "002415.SZ", "002594.SZ", "300015.SZ", "300059.SZ", "300122.SZ", "300750.SZ",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        );

        Self { groups }
    }
}
