use crate::cli::actions::{Action, Selection};
use crate::cli::globals::GlobalArgs;
use crate::config::ObjectConfig;
use crate::errors::{Error, Result as DomainResult};
use crate::permissions;
use crate::salesforce::{api::SalesforceApi, Session};
use anyhow::{bail, Result};
use std::path::Path;
use tracing::{error, info, warn};

/// Counts reported at the end of a run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
}

/// Handle the apply action: log in, resolve the selection and run the
/// orchestrator once per object.
///
/// # Errors
/// Returns an error when login fails, when the selection cannot be resolved,
/// or when any object failed (so the process exits non-zero).
pub async fn handle(action: Action, globals: &GlobalArgs) -> Result<()> {
    let Action::Apply {
        selection,
        config_dir,
    } = action
    else {
        bail!("apply handler invoked with a non-apply action");
    };

    let session = Session::login(globals).await?;

    match session.api_usage().await {
        Ok((remaining, max)) => info!("API usage: {}/{} requests remaining", remaining, max),
        Err(err) => warn!("could not fetch API usage: {}", err),
    }

    let objects = resolve_selection(&session, &selection).await?;
    if objects.is_empty() {
        info!("no objects to process");
        return Ok(());
    }

    let summary = run(&session, &objects, &config_dir).await?;

    info!(
        "run finished: {} succeeded, {} failed",
        summary.succeeded, summary.failed
    );

    if summary.failed > 0 {
        bail!("{} of {} objects failed", summary.failed, objects.len());
    }

    Ok(())
}

/// Resolve a selection to concrete object names, in processing order.
pub async fn resolve_selection(
    api: &dyn SalesforceApi,
    selection: &Selection,
) -> DomainResult<Vec<String>> {
    match selection {
        Selection::All => api.list_objects(false).await,
        Selection::CustomAll => api.list_objects(true).await,
        Selection::Objects(names) => Ok(names.clone()),
    }
}

/// Process objects strictly in order, one at a time.
///
/// Configuration and orchestration errors are object-scoped: the object is
/// tallied as failed and the run continues. Only an invalid session stops
/// the loop.
pub async fn run(
    api: &dyn SalesforceApi,
    objects: &[String],
    config_dir: &Path,
) -> Result<RunSummary> {
    let mut summary = RunSummary::default();

    for object in objects {
        let config = match ObjectConfig::load(config_dir, object) {
            Ok(config) => config,
            Err(err) => {
                error!("skipping {}: {}", object, err);
                summary.failed += 1;
                continue;
            }
        };

        match permissions::apply(api, object, &config).await {
            Ok(outcome) if outcome.is_success() => summary.succeeded += 1,
            Ok(outcome) => {
                for failure in &outcome.failed {
                    error!(
                        "object {}: field {}: {}",
                        object, failure.field, failure.reason
                    );
                }
                summary.failed += 1;
            }
            Err(err) if err.is_fatal() => return Err(err.into()),
            Err(err @ Error::VendorUnavailable(_)) => {
                // Object-scoped: one unreachable object must not block the rest.
                error!("object {} aborted: {}", object, err);
                summary.failed += 1;
            }
            Err(err) => {
                error!("object {} failed: {}", object, err);
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}
