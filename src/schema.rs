//! Column schema resolution, renaming, and edge/node convention checks.
//!
//! A schema is an ordered sequence of unique column names plus a derived
//! name-to-index map. Writers carry two schemas: the *internal* schema used
//! for shuffle-list and named-map resolution, and the *output* schema whose
//! names are actually written to the header. Renaming changes the output
//! schema only.

use crate::error::{KgtabError, Result};
use std::collections::HashMap;

/// Alias set identifying the "from-node" column of an edge file.
pub const NODE1_ALIASES: &[&str] = &["node1", "from", "subject"];

/// Alias set identifying the relation-label column of an edge file.
pub const LABEL_ALIASES: &[&str] = &["label", "predicate", "relation", "relationship"];

/// Alias set identifying the "to-node" column of an edge file.
pub const NODE2_ALIASES: &[&str] = &["node2", "to", "object"];

/// Alias set identifying the id column of a node file.
pub const ID_ALIASES: &[&str] = &["id", "ID"];

/// Which required-column convention a file follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Enforce neither edge nor node required columns.
    None,
    /// Enforce edge-file required columns (a from-node and a relation label).
    Edge,
    /// Enforce node-file required columns (an id).
    Node,
    /// Classify by header: a node1-equivalent column makes it an edge file,
    /// absence makes it a node file.
    #[default]
    Auto,
}

/// What to do when a required column is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderErrorAction {
    /// Report the problem and continue best-effort.
    Error,
    /// Abort the whole operation.
    #[default]
    Exit,
}

/// An ordered, duplicate-free sequence of column names with a derived
/// name-to-index map. Constructed once at stream-open time and immutable
/// for the stream's lifetime.
#[derive(Debug, Clone)]
pub struct Schema {
    columns: Vec<String>,
    index: HashMap<String, usize>,
}

impl Schema {
    /// Build a schema, failing on duplicate column names.
    pub fn new(columns: Vec<String>) -> Result<Self> {
        let mut index = HashMap::with_capacity(columns.len());
        for (idx, name) in columns.iter().enumerate() {
            if index.insert(name.clone(), idx).is_some() {
                return Err(KgtabError::DuplicateColumn {
                    column: name.clone(),
                });
            }
        }
        Ok(Schema { columns, index })
    }

    /// The column names in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the schema has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Index of `name`, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Index of the first alias present in the schema, if any.
    pub fn alias_index(&self, aliases: &[&str]) -> Option<usize> {
        aliases.iter().find_map(|name| self.index_of(name))
    }
}

/// Resolve the internal and output schemas for a writer.
///
/// - With `output_columns`, all columns are renamed positionally; the list
///   must match `columns` in length.
/// - With `old_names`/`new_names`, selected columns are renamed in place;
///   the lists must pair up and every old name must exist in the current
///   output schema.
/// - Otherwise the output schema equals the input schema.
pub fn resolve(
    columns: &[String],
    output_columns: Option<&[String]>,
    old_names: Option<&[String]>,
    new_names: Option<&[String]>,
) -> Result<(Schema, Schema)> {
    let internal = Schema::new(columns.to_vec())?;

    let mut output_names: Vec<String> = match output_columns {
        Some(names) => {
            if names.len() != columns.len() {
                return Err(KgtabError::Schema(format!(
                    "{} column names but {} output column names",
                    columns.len(),
                    names.len()
                )));
            }
            names.to_vec()
        }
        None => columns.to_vec(),
    };

    if old_names.is_some() || new_names.is_some() {
        let (old_names, new_names) = match (old_names, new_names) {
            (Some(old), Some(new)) => (old, new),
            _ => {
                return Err(KgtabError::Schema(
                    "old/new column name lists must be given together".to_string(),
                ));
            }
        };
        if old_names.len() != new_names.len() {
            return Err(KgtabError::Schema(format!(
                "old/new column name length mismatch: {} != {}",
                old_names.len(),
                new_names.len()
            )));
        }
        for (old, new) in old_names.iter().zip(new_names) {
            match output_names.iter().position(|name| name == old) {
                Some(idx) => output_names[idx] = new.clone(),
                None => {
                    return Err(KgtabError::Schema(format!(
                        "old column name '{old}' not in the output column names"
                    )));
                }
            }
        }
    }

    let output = Schema::new(output_names)?;
    Ok((internal, output))
}

/// Names of the required columns `schema` is missing under `mode`.
///
/// In `Auto` mode the schema is classified first: presence of a
/// node1-equivalent column makes it an edge schema, absence a node schema.
/// This heuristic can misclassify edge schemas lacking a node1-like column;
/// downstream tooling depends on its exact behavior, so it is preserved.
pub fn missing_required_columns(schema: &Schema, mode: Mode) -> Vec<String> {
    let (is_edge, is_node) = match mode {
        Mode::None => (false, false),
        Mode::Edge => (true, false),
        Mode::Node => (false, true),
        Mode::Auto => {
            let is_edge = schema.alias_index(NODE1_ALIASES).is_some();
            (is_edge, !is_edge)
        }
    };

    let mut missing = Vec::new();
    if is_edge {
        if schema.alias_index(NODE1_ALIASES).is_none() {
            missing.push(NODE1_ALIASES[0].to_string());
        }
        if schema.alias_index(LABEL_ALIASES).is_none() {
            missing.push(LABEL_ALIASES[0].to_string());
        }
    }
    if is_node && schema.alias_index(ID_ALIASES).is_none() {
        missing.push(ID_ALIASES[0].to_string());
    }
    missing
}

/// Check the edge-file / node-file required-column convention.
///
/// This check never blocks correctly-shaped output, it only reports: with
/// [`HeaderErrorAction::Error`] the complaint goes to stderr and processing
/// continues; with [`HeaderErrorAction::Exit`] a schema error is returned.
pub fn check_required_columns(
    schema: &Schema,
    mode: Mode,
    action: HeaderErrorAction,
) -> Result<()> {
    let missing = missing_required_columns(schema, mode);
    if missing.is_empty() {
        return Ok(());
    }
    let complaint = format!("missing required column(s): {}", missing.join(", "));
    match action {
        HeaderErrorAction::Error => {
            eprintln!("header error: {complaint}");
            Ok(())
        }
        HeaderErrorAction::Exit => Err(KgtabError::Schema(complaint)),
    }
}
