use crate::cli::actions::apply::resolve_selection;
use crate::cli::actions::Action;
use crate::cli::globals::GlobalArgs;
use crate::salesforce::{api::SalesforceApi, Session};
use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::path::Path;
use tracing::{error, info};

/// Standard audit fields that end up under `restricted_fields` in every
/// generated template.
pub const STANDARD_RESTRICTED: [&str; 9] = [
    "Id",
    "OwnerId",
    "IsDeleted",
    "SystemModstamp",
    "CreatedDate",
    "CreatedById",
    "LastModifiedDate",
    "LastModifiedById",
    "LastActivityDate",
];

// Serialized shape matches what config::ObjectConfig deserializes.
#[derive(Debug, Serialize)]
struct Template {
    record_types: Vec<String>,
    fields: TemplateFields,
    restricted_fields: Vec<String>,
}

#[derive(Debug, Serialize)]
struct TemplateFields {
    read: Vec<String>,
    edit: Vec<String>,
}

/// Handle the template action: write a starter YAML configuration for each
/// selected object.
///
/// # Errors
/// Returns an error when login fails or when any template could not be
/// written (non-zero exit).
pub async fn handle(action: Action, globals: &GlobalArgs) -> Result<()> {
    let Action::Template {
        selection,
        config_dir,
    } = action
    else {
        bail!("template handler invoked with a non-template action");
    };

    let session = Session::login(globals).await?;
    let objects = resolve_selection(&session, &selection).await?;

    let mut failed = 0usize;
    for object in &objects {
        if let Err(err) = write_template(&session, object, &config_dir).await {
            error!("template for {} failed: {}", object, err);
            failed += 1;
        }
    }

    if failed > 0 {
        bail!("{} of {} templates failed", failed, objects.len());
    }

    Ok(())
}

/// Describe the object and write `{config_dir}/{object}.yaml`: all
/// non-restricted fields readable, nothing editable, audit fields restricted.
pub async fn write_template(
    api: &dyn SalesforceApi,
    object: &str,
    config_dir: &Path,
) -> Result<()> {
    info!("creating configuration template for {}", object);

    let mut record_types = api.record_types(object).await?;
    if record_types.is_empty() {
        info!("no record types found for {}, using Master", object);
        record_types.push("Master".to_string());
    }

    let fields = api.describe_fields(object).await?;
    let read: Vec<String> = fields
        .into_iter()
        .filter(|field| !STANDARD_RESTRICTED.contains(&field.as_str()))
        .collect();

    let template = Template {
        record_types,
        fields: TemplateFields {
            read,
            edit: Vec::new(),
        },
        restricted_fields: STANDARD_RESTRICTED.iter().map(ToString::to_string).collect(),
    };

    std::fs::create_dir_all(config_dir)
        .with_context(|| format!("creating {}", config_dir.display()))?;

    let path = config_dir.join(format!("{object}.yaml"));
    let yaml = serde_yaml::to_string(&template)?;
    std::fs::write(&path, yaml).with_context(|| format!("writing {}", path.display()))?;

    info!("configuration template created at {}", path.display());

    Ok(())
}
