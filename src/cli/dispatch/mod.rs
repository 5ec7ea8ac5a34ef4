use crate::cli::actions::{Action, Selection};
use crate::cli::globals::GlobalArgs;
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::path::PathBuf;

/// Turn parsed arguments into an [`Action`] plus the run globals.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<(Action, GlobalArgs)> {
    let globals = GlobalArgs {
        username: matches
            .get_one::<String>("username")
            .cloned()
            .context("missing required argument: --username")?,
        password: SecretString::from(
            matches
                .get_one::<String>("password")
                .cloned()
                .context("missing required argument: --password")?,
        ),
        security_token: SecretString::from(
            matches
                .get_one::<String>("security-token")
                .cloned()
                .context("missing required argument: --security-token")?,
        ),
        domain: matches
            .get_one::<String>("domain")
            .cloned()
            .unwrap_or_else(|| "login".to_string()),
    };

    let selection = if matches.get_flag("all") {
        Selection::All
    } else if matches.get_flag("custom-all") {
        Selection::CustomAll
    } else {
        let objects = matches
            .get_many::<String>("objects")
            .context("missing required argument: --all, --custom-all or --objects")?
            .cloned()
            .collect();
        Selection::Objects(objects)
    };

    let config_dir = matches
        .get_one::<String>("config-dir")
        .map_or_else(|| PathBuf::from("config"), PathBuf::from);

    let action = if matches.get_flag("create-template") {
        Action::Template {
            selection,
            config_dir,
        }
    } else {
        Action::Apply {
            selection,
            config_dir,
        }
    };

    Ok((action, globals))
}
