//! Derived names for indexes and foreign keys

use super::definition::{ForeignKey, IndexDefinition};
use crate::error::{Error, Result};
use std::collections::HashSet;

/// `<table>_<col1>_<col2>..._<suffix>`, lowercased, with `-` and `.`
/// turned into `_`.
pub fn derive_name(table: &str, columns: &[String], suffix: &str) -> String {
    let mut parts = Vec::with_capacity(columns.len() + 2);
    parts.push(table);
    parts.extend(columns.iter().map(String::as_str));
    parts.push(suffix);
    normalize(&parts.join("_"))
}

fn normalize(name: &str) -> String {
    name.to_lowercase().replace(['-', '.'], "_")
}

fn index_suffix(index: &IndexDefinition) -> &'static str {
    if index.unique { "unique" } else { "index" }
}

/// The name an index gets when nothing else in the batch competes for it.
pub fn default_index_name(index: &IndexDefinition) -> String {
    match &index.name {
        Some(name) => name.clone(),
        None => derive_name(&index.table, &index.columns, index_suffix(index)),
    }
}

pub fn default_foreign_key_name(table: &str, foreign_key: &ForeignKey) -> String {
    match &foreign_key.name {
        Some(name) => name.clone(),
        None => derive_name(table, &foreign_key.columns, "foreign"),
    }
}

/// Hands out index names within one synthesis run.
///
/// A derived name that is already taken gets the storing columns inserted
/// before its suffix, then a numeric suffix until it is free. The result
/// depends only on the order of requests.
#[derive(Debug, Default)]
pub struct IndexNamer {
    taken: HashSet<String>,
}

impl IndexNamer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name_for(&mut self, index: &IndexDefinition) -> Result<String> {
        if let Some(name) = &index.name {
            if !self.taken.insert(name.clone()) {
                return Err(Error::InvalidDefinition(format!(
                    "index name `{}` is used twice",
                    name
                )));
            }
            return Ok(name.clone());
        }

        let base = default_index_name(index);
        if self.taken.insert(base.clone()) {
            return Ok(base);
        }

        let candidate = if index.storing.is_empty() {
            base
        } else {
            let mut parts = index.columns.clone();
            parts.push("storing".into());
            parts.extend(index.storing.iter().cloned());
            let with_storing = derive_name(&index.table, &parts, index_suffix(index));
            if self.taken.insert(with_storing.clone()) {
                return Ok(with_storing);
            }
            with_storing
        };

        let mut n = 2;
        loop {
            let numbered = format!("{}_{}", candidate, n);
            if self.taken.insert(numbered.clone()) {
                return Ok(numbered);
            }
            n += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_names() {
        let index = IndexDefinition::new("UserItem", ["userId", "createdAt"]);
        assert_eq!(default_index_name(&index), "useritem_userid_createdat_index");

        let unique = IndexDefinition::new("User", ["name"]).unique();
        assert_eq!(default_index_name(&unique), "user_name_unique");

        let dotted = IndexDefinition::new("my-table", ["a.b"]);
        assert_eq!(default_index_name(&dotted), "my_table_a_b_index");

        let fk = ForeignKey::new(["userId"], "User", ["userId"]);
        assert_eq!(default_foreign_key_name("UserItem", &fk), "useritem_userid_foreign");
    }

    #[test]
    fn test_storing_variants_get_distinct_names() {
        let plain = IndexDefinition::new("UserItem", ["userId"]);
        let storing = IndexDefinition::new("UserItem", ["userId"]).storing(["count"]);

        let mut namer = IndexNamer::new();
        let first = namer.name_for(&plain).unwrap();
        let second = namer.name_for(&storing).unwrap();
        assert_eq!(first, "useritem_userid_index");
        assert_eq!(second, "useritem_userid_storing_count_index");

        // Stable across runs
        let mut again = IndexNamer::new();
        assert_eq!(again.name_for(&plain).unwrap(), first);
        assert_eq!(again.name_for(&storing).unwrap(), second);
    }

    #[test]
    fn test_numeric_suffix_when_still_taken() {
        let index = IndexDefinition::new("T", ["a"]);
        let mut namer = IndexNamer::new();
        assert_eq!(namer.name_for(&index).unwrap(), "t_a_index");
        assert_eq!(namer.name_for(&index).unwrap(), "t_a_index_2");
        assert_eq!(namer.name_for(&index).unwrap(), "t_a_index_3");
    }

    #[test]
    fn test_explicit_name_reuse_rejected() {
        let index = IndexDefinition::new("T", ["a"]).named("idx");
        let mut namer = IndexNamer::new();
        assert_eq!(namer.name_for(&index).unwrap(), "idx");
        assert!(matches!(
            namer.name_for(&index),
            Err(Error::InvalidDefinition(_))
        ));
    }
}
