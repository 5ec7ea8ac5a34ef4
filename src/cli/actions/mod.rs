pub mod apply;
pub mod template;

use std::path::PathBuf;

/// Which objects a run operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Every object in the org.
    All,
    /// Only custom objects.
    CustomAll,
    /// Exactly the named objects, in the given order.
    Objects(Vec<String>),
}

#[derive(Debug)]
pub enum Action {
    /// Apply the YAML-declared permissions to the selected objects.
    Apply {
        selection: Selection,
        config_dir: PathBuf,
    },
    /// Write YAML configuration templates for the selected objects.
    Template {
        selection: Selection,
        config_dir: PathBuf,
    },
}
