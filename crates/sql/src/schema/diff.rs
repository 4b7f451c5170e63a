//! Derive blueprints from the difference between two schemas

use super::blueprint::{Blueprint, SchemaChange};
use super::definition::{IndexDefinition, TableDefinition};
use super::naming::IndexNamer;
use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// The changes that turn `existing` into `desired`.
///
/// Columns are added or altered in `desired` order, then dropped. The
/// primary key and interleaving can't be altered in place.
pub fn diff_tables(
    existing: Option<&TableDefinition>,
    desired: &TableDefinition,
) -> Result<Blueprint> {
    let mut blueprint = Blueprint::new(desired.name.clone());
    let Some(existing) = existing else {
        return Ok(blueprint.create(desired.clone()));
    };

    if existing.name != desired.name {
        return Err(Error::InvalidDefinition(format!(
            "cannot diff `{}` against `{}`",
            existing.name, desired.name
        )));
    }
    if existing.primary_key != desired.primary_key {
        return Err(Error::unsupported(format!(
            "changing the primary key of `{}`",
            desired.name
        )));
    }
    if existing.interleave != desired.interleave {
        return Err(Error::unsupported(format!(
            "changing the interleaving of `{}`",
            desired.name
        )));
    }

    let mut changes = Vec::new();
    for column in &desired.columns {
        match existing.get_column(&column.name) {
            None => changes.push(SchemaChange::AddColumn(column.clone())),
            Some(current) if current != column => {
                changes.push(SchemaChange::AlterColumn(column.clone()))
            }
            Some(_) => {}
        }
    }
    for column in &existing.columns {
        if desired.get_column(&column.name).is_none() {
            changes.push(SchemaChange::DropColumn(column.name.clone()));
        }
    }

    match (&existing.row_deletion_policy, &desired.row_deletion_policy) {
        (None, Some(policy)) => changes.push(SchemaChange::AddRowDeletionPolicy(policy.clone())),
        (Some(current), Some(policy)) if current != policy => {
            changes.push(SchemaChange::ReplaceRowDeletionPolicy(policy.clone()))
        }
        (Some(_), None) => changes.push(SchemaChange::DropRowDeletionPolicy),
        _ => {}
    }

    blueprint.extend(changes);
    Ok(blueprint)
}

/// Index changes that turn `existing` into `desired`, keyed by effective
/// name. A changed definition under the same name is dropped and created
/// again. Created indexes carry their effective name.
pub fn diff_indexes(
    existing: &[IndexDefinition],
    desired: &[IndexDefinition],
) -> Result<Vec<SchemaChange>> {
    let existing = by_name(existing)?;
    let desired = by_name(desired)?;

    let mut drops = Vec::new();
    for (name, index) in &existing {
        match desired.get(name) {
            Some(wanted) if same_index(index, wanted) => {}
            _ => drops.push(SchemaChange::DropIndex(name.clone())),
        }
    }

    let mut creates = Vec::new();
    for (name, &index) in &desired {
        match existing.get(name) {
            Some(current) if same_index(current, index) => {}
            _ => creates.push(SchemaChange::CreateIndex(index.clone().named(name.clone()))),
        }
    }

    drops.extend(creates);
    Ok(drops)
}

fn by_name(indexes: &[IndexDefinition]) -> Result<BTreeMap<String, &IndexDefinition>> {
    let mut namer = IndexNamer::new();
    indexes
        .iter()
        .map(|index| Ok((namer.name_for(index)?, index)))
        .collect()
}

// Whether two definitions describe the same index, ignoring how it is named
fn same_index(a: &IndexDefinition, b: &IndexDefinition) -> bool {
    a.table == b.table
        && a.columns == b.columns
        && a.unique == b.unique
        && a.null_filtered == b.null_filtered
        && a.storing == b.storing
        && a.interleave_in == b.interleave_in
}
