use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Per-object permission declaration, one YAML file per object:
///
/// ```yaml
/// record_types:
///   - Master
/// fields:
///   read:
///     - Name
///     - Status__c
///   edit:
///     - Status__c
/// restricted_fields:
///   - Id
/// ```
///
/// `fields.read` and `fields.edit` are required (empty lists are fine);
/// `record_types` and `restricted_fields` default to empty. Unknown keys are
/// rejected at load time.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectConfig {
    #[serde(default)]
    pub record_types: Vec<String>,
    pub fields: FieldAccess,
    #[serde(default)]
    pub restricted_fields: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldAccess {
    pub read: Vec<String>,
    pub edit: Vec<String>,
}

impl ObjectConfig {
    /// Load and validate `{dir}/{object}.yaml`.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] when the file is missing, malformed,
    /// contains unknown keys, or lists a field as both restricted and
    /// accessible.
    pub fn load(dir: &Path, object: &str) -> Result<Self> {
        let path = dir.join(format!("{object}.yaml"));
        info!("loading configuration from {}", path.display());

        let raw = std::fs::read_to_string(&path).map_err(|e| Error::Configuration {
            object: object.to_string(),
            reason: format!("{}: {e}", path.display()),
        })?;

        let config: Self = serde_yaml::from_str(&raw).map_err(|e| Error::Configuration {
            object: object.to_string(),
            reason: e.to_string(),
        })?;

        config.validate(object)?;

        debug!(
            "configuration for {}: {} read, {} edit, {} restricted",
            object,
            config.fields.read.len(),
            config.fields.edit.len(),
            config.restricted_fields.len()
        );

        Ok(config)
    }

    fn validate(&self, object: &str) -> Result<()> {
        for field in self.fields.read.iter().chain(self.fields.edit.iter()) {
            if self.restricted_fields.contains(field) {
                return Err(Error::Configuration {
                    object: object.to_string(),
                    reason: format!("field {field} is listed as both restricted and accessible"),
                });
            }
        }
        Ok(())
    }

    /// True when `field` must never receive a permission.
    #[must_use]
    pub fn is_restricted(&self, field: &str) -> bool {
        self.restricted_fields.iter().any(|f| f == field)
    }
}
