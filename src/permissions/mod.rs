use crate::config::ObjectConfig;
use crate::errors::{Error, Result};
use crate::salesforce::api::{AccessLevel, PermissionSet, SalesforceApi};
use tracing::{debug, info, warn};

/// Suffix for the read-write permission set variant.
pub const EDIT_SUFFIX: &str = "_Edit";

/// Per-object result: which fields got their permission and which did not.
#[derive(Debug, Default)]
pub struct ObjectOutcome {
    pub object: String,
    pub granted: Vec<String>,
    pub failed: Vec<FieldFailure>,
}

#[derive(Debug)]
pub struct FieldFailure {
    pub field: String,
    pub reason: String,
}

impl ObjectOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Permission set API name for an object: the object name with the custom
/// suffix stripped and anything outside `[A-Za-z0-9_]` replaced, plus
/// `_Permissions`.
#[must_use]
pub fn permission_set_name(object: &str) -> String {
    let base = object.strip_suffix("__c").unwrap_or(object);

    let sanitized: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    format!("{sanitized}_Permissions")
}

async fn ensure_permission_set(
    api: &dyn SalesforceApi,
    name: &str,
    label: &str,
    description: &str,
) -> Result<PermissionSet> {
    if let Some(existing) = api.find_permission_set(name).await? {
        debug!("permission set {} already exists", name);
        return Ok(existing);
    }

    api.create_permission_set(name, label, description).await
}

async fn grant(
    api: &dyn SalesforceApi,
    set: &PermissionSet,
    object: &str,
    field: &str,
    access: AccessLevel,
    outcome: &mut ObjectOutcome,
) -> Result<()> {
    match api.set_field_permission(set, object, field, access).await {
        Ok(()) => {
            debug!("granted {:?} on {}.{}", access, object, field);
            outcome.granted.push(field.to_string());
            Ok(())
        }
        // Invalid session or vendor outage aborts the object.
        Err(err @ (Error::Authentication(_) | Error::VendorUnavailable(_))) => Err(err),
        Err(err) => {
            warn!("{}", err);
            outcome.failed.push(FieldFailure {
                field: field.to_string(),
                reason: err.to_string(),
            });
            Ok(())
        }
    }
}

async fn associate(
    api: &dyn SalesforceApi,
    set: &PermissionSet,
    object: &str,
    record_type: &str,
) -> Result<()> {
    match api.associate_record_type(set, object, record_type).await {
        Ok(()) => Ok(()),
        Err(err) if err.is_fatal() => Err(err),
        // Association is best-effort; a failed record type never fails the object.
        Err(err) => {
            warn!(
                "could not associate record type {} with {}: {}",
                record_type, set.name, err
            );
            Ok(())
        }
    }
}

/// Apply the configured field permissions for one object.
///
/// Creates the base permission set (and the `_Edit` variant when any edit
/// fields are configured) if they do not already exist, then sets read and
/// edit field permissions, skipping restricted fields. Individual field
/// failures are collected into the outcome; permission-set creation failures
/// and vendor outages abort the object.
///
/// # Errors
/// Returns [`Error::PermissionSetCreation`] when a set cannot be created,
/// [`Error::VendorUnavailable`] on a mid-object outage, and
/// [`Error::Authentication`] when the session is no longer valid.
pub async fn apply(
    api: &dyn SalesforceApi,
    object: &str,
    config: &ObjectConfig,
) -> Result<ObjectOutcome> {
    info!("processing object {}", object);

    let mut outcome = ObjectOutcome {
        object: object.to_string(),
        ..ObjectOutcome::default()
    };

    let base_name = permission_set_name(object);
    let base = ensure_permission_set(
        api,
        &base_name,
        object,
        &format!("Field read access for the {object} object"),
    )
    .await?;

    for field in &config.fields.read {
        if config.is_restricted(field) {
            debug!("skipping restricted field {}.{}", object, field);
            continue;
        }
        grant(api, &base, object, field, AccessLevel::Read, &mut outcome).await?;
    }

    let edit_set = if config.fields.edit.is_empty() {
        None
    } else {
        let edit_name = format!("{base_name}{EDIT_SUFFIX}");
        let set = ensure_permission_set(
            api,
            &edit_name,
            &format!("{object} Edit"),
            &format!("Field edit access for the {object} object"),
        )
        .await?;

        for field in &config.fields.edit {
            if config.is_restricted(field) {
                debug!("skipping restricted field {}.{}", object, field);
                continue;
            }
            grant(api, &set, object, field, AccessLevel::Edit, &mut outcome).await?;
        }

        Some(set)
    };

    for record_type in &config.record_types {
        associate(api, &base, object, record_type).await?;
        if let Some(set) = &edit_set {
            associate(api, set, object, record_type).await?;
        }
    }

    info!(
        "object {} processed: {} granted, {} failed",
        object,
        outcome.granted.len(),
        outcome.failed.len()
    );

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_set_name_standard_object() {
        assert_eq!(permission_set_name("Account"), "Account_Permissions");
    }

    #[test]
    fn test_permission_set_name_custom_object() {
        assert_eq!(permission_set_name("Order6__c"), "Order6_Permissions");
    }

    #[test]
    fn test_permission_set_name_sanitizes() {
        assert_eq!(permission_set_name("Weird Name-1"), "Weird_Name_1_Permissions");
    }

    #[test]
    fn test_edit_suffix() {
        let name = format!("{}{}", permission_set_name("Account"), EDIT_SUFFIX);
        assert_eq!(name, "Account_Permissions_Edit");
    }
}
