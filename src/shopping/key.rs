use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::normalize::fold_diacritics;

/// Identity of one shopping-list row: folded, lowercased, trimmed
/// (name, unit, category).
///
/// The string form joins the three parts with `|`, escaping `|` and `\`
/// inside parts, so names containing the separator cannot collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey {
    name: String,
    unit: String,
    category: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid group key: {0}")]
pub struct InvalidGroupKey(String);

fn fold_part(s: &str) -> String {
    fold_diacritics(s).to_lowercase().trim().to_string()
}

impl GroupKey {
    pub fn new(name: &str, unit: &str, category: &str) -> Self {
        Self {
            name: fold_part(name),
            unit: fold_part(unit),
            category: fold_part(category),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn category(&self) -> &str {
        &self.category
    }
}

fn write_escaped(f: &mut fmt::Formatter<'_>, part: &str) -> fmt::Result {
    for c in part.chars() {
        if c == '|' || c == '\\' {
            f.write_str("\\")?;
        }
        write!(f, "{}", c)?;
    }
    Ok(())
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_escaped(f, &self.name)?;
        f.write_str("|")?;
        write_escaped(f, &self.unit)?;
        f.write_str("|")?;
        write_escaped(f, &self.category)
    }
}

impl FromStr for GroupKey {
    type Err = InvalidGroupKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = Vec::with_capacity(3);
        let mut current = String::new();
        let mut chars = s.chars();
        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some(escaped) => current.push(escaped),
                    None => return Err(InvalidGroupKey(s.to_string())),
                },
                '|' => parts.push(std::mem::take(&mut current)),
                other => current.push(other),
            }
        }
        parts.push(current);

        match <[String; 3]>::try_from(parts) {
            Ok([name, unit, category]) => Ok(GroupKey::new(&name, &unit, &category)),
            Err(_) => Err(InvalidGroupKey(s.to_string())),
        }
    }
}

impl Serialize for GroupKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for GroupKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
