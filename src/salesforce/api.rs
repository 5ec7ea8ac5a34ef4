use crate::errors::Result;
use async_trait::async_trait;

/// Salesforce REST/SOAP API version used for every call.
pub const API_VERSION: &str = "59.0";

/// Access granted on a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessLevel {
    /// Field is visible but not writable.
    Read,
    /// Field is visible and writable.
    Edit,
}

/// A permission set as it exists in the org.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionSet {
    pub id: String,
    pub name: String,
}

/// The narrow vendor surface the rest of the program is allowed to touch.
///
/// Everything the orchestrator and the template generator need from
/// Salesforce goes through this trait, so tests can swap in a mock and the
/// vendor dependency stays isolated in one module.
#[async_trait]
pub trait SalesforceApi: Send + Sync {
    /// List object API names in the org, optionally restricted to custom
    /// objects. Consumes all result pages before returning.
    async fn list_objects(&self, custom_only: bool) -> Result<Vec<String>>;

    /// Look up a permission set by its API name.
    async fn find_permission_set(&self, name: &str) -> Result<Option<PermissionSet>>;

    /// Create a permission set. Callers are expected to have checked for an
    /// existing one first, see [`SalesforceApi::find_permission_set`].
    async fn create_permission_set(
        &self,
        name: &str,
        label: &str,
        description: &str,
    ) -> Result<PermissionSet>;

    /// Set or create the field permission for `object.field` on the given
    /// permission set.
    async fn set_field_permission(
        &self,
        set: &PermissionSet,
        object: &str,
        field: &str,
        access: AccessLevel,
    ) -> Result<()>;

    /// Associate a record type with a permission set. Association semantics
    /// are vendor-defined; callers treat failures as best-effort.
    async fn associate_record_type(
        &self,
        set: &PermissionSet,
        object: &str,
        record_type: &str,
    ) -> Result<()>;

    /// Field API names of an object, from the object describe.
    async fn describe_fields(&self, object: &str) -> Result<Vec<String>>;

    /// Record type developer names defined for an object.
    async fn record_types(&self, object: &str) -> Result<Vec<String>>;
}
