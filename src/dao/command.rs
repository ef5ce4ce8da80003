//! DAO commands
//!
//! Commands travel as JSON objects tagged by `kind`:
//!
//! ```json
//! {"kind": "add-index", "fields": ["key", "name"], "unique": true}
//! ```
//!
//! Kinds this crate does not know deserialize to `Unrecognized` and are
//! declined rather than rejected.

use serde::{Deserialize, Serialize};

/// A management command addressed to a DAO
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DaoCommand {
    /// Create an ascending index over one or more fields
    AddIndex {
        fields: Vec<String>,
        #[serde(default)]
        unique: bool,
    },
    /// Drop any cached state
    ClearCache,
    /// Any other kind
    #[serde(other)]
    Unrecognized,
}

impl DaoCommand {
    /// Single or compound ascending index
    pub fn add_index<I, S>(fields: I, unique: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        DaoCommand::AddIndex {
            fields: fields.into_iter().map(Into::into).collect(),
            unique,
        }
    }

    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            DaoCommand::AddIndex { .. } => "add-index",
            DaoCommand::ClearCache => "clear-cache",
            DaoCommand::Unrecognized => "unrecognized",
        }
    }
}

/// Whether a DAO acted on a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Handled,
    Unhandled,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_add_index_wire_shape() {
        let cmd: DaoCommand =
            serde_json::from_value(json!({"kind": "add-index", "fields": ["a", "b"], "unique": true}))
                .unwrap();
        assert_eq!(cmd, DaoCommand::add_index(["a", "b"], true));

        let back = serde_json::to_value(&cmd).unwrap();
        assert_eq!(back["kind"], "add-index");
    }

    #[test]
    fn test_unique_defaults_to_false() {
        let cmd: DaoCommand =
            serde_json::from_value(json!({"kind": "add-index", "fields": ["a"]})).unwrap();
        assert_eq!(cmd, DaoCommand::add_index(["a"], false));
    }

    #[test]
    fn test_unknown_kind_is_unrecognized() {
        let cmd: DaoCommand = serde_json::from_value(json!({"kind": "drop-collection"})).unwrap();
        assert_eq!(cmd, DaoCommand::Unrecognized);
        assert_eq!(cmd.kind(), "unrecognized");
    }
}
