use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ArgAction, ArgGroup, ColorChoice, Command,
};

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("pravator")
        .about("Salesforce permission set provisioning")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("all")
                .short('a')
                .long("all")
                .help("Process every object in the org")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("custom-all")
                .long("custom-all")
                .help("Process only custom objects")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("objects")
                .short('o')
                .long("objects")
                .help("Process exactly the named objects")
                .value_name("NAME")
                .num_args(1..),
        )
        .group(
            ArgGroup::new("selection")
                .args(["all", "custom-all", "objects"])
                .required(true)
                .multiple(false),
        )
        .arg(
            Arg::new("config-dir")
                .short('c')
                .long("config-dir")
                .help("Directory holding per-object YAML configuration")
                .default_value("config")
                .env("SF_CONFIG_DIR"),
        )
        .arg(
            Arg::new("create-template")
                .short('t')
                .long("create-template")
                .help("Write YAML configuration templates instead of applying permissions")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("username")
                .long("username")
                .help("Salesforce username")
                .env("SF_USERNAME")
                .required(true),
        )
        .arg(
            Arg::new("password")
                .long("password")
                .help("Salesforce password")
                .env("SF_PASSWORD")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new("security-token")
                .long("security-token")
                .help("Salesforce security token")
                .env("SF_SECURITY_TOKEN")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new("domain")
                .long("domain")
                .help("Salesforce login domain, e.g. login or test")
                .env("SF_DOMAIN")
                .default_value("login"),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("SF_LOG_LEVEL")
                .global(true)
                .action(ArgAction::Count)
                .value_parser(validator_log_level()),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential_args() -> Vec<&'static str> {
        vec![
            "--username",
            "user@example.com",
            "--password",
            "hunter2",
            "--security-token",
            "token",
        ]
    }

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "pravator");
        assert_eq!(
            command.get_about().map(ToString::to_string),
            Some("Salesforce permission set provisioning".to_string())
        );
        assert_eq!(
            command.get_version().map(ToString::to_string),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
    }

    #[test]
    fn test_objects_selection() {
        temp_env::with_vars(
            [("SF_DOMAIN", None::<&str>), ("SF_CONFIG_DIR", None)],
            || {
                let mut args = vec!["pravator", "--objects", "Account", "Contact"];
                args.extend(credential_args());

                let matches = new().get_matches_from(args);

                let objects: Vec<String> = matches
                    .get_many::<String>("objects")
                    .unwrap()
                    .cloned()
                    .collect();
                assert_eq!(objects, vec!["Account", "Contact"]);
                assert!(!matches.get_flag("all"));
                assert!(!matches.get_flag("custom-all"));
                assert_eq!(
                    matches.get_one::<String>("config-dir").cloned(),
                    Some("config".to_string())
                );
                assert_eq!(
                    matches.get_one::<String>("domain").cloned(),
                    Some("login".to_string())
                );
            },
        );
    }

    #[test]
    fn test_selection_is_required() {
        let mut args = vec!["pravator"];
        args.extend(credential_args());

        assert!(new().try_get_matches_from(args).is_err());
    }

    #[test]
    fn test_selection_modes_are_exclusive() {
        let mut args = vec!["pravator", "--all", "--custom-all"];
        args.extend(credential_args());

        assert!(new().try_get_matches_from(args).is_err());

        let mut args = vec!["pravator", "--all", "--objects", "Account"];
        args.extend(credential_args());

        assert!(new().try_get_matches_from(args).is_err());
    }

    #[test]
    fn test_missing_credentials_is_an_error() {
        temp_env::with_vars(
            [
                ("SF_USERNAME", None::<&str>),
                ("SF_PASSWORD", None),
                ("SF_SECURITY_TOKEN", None),
            ],
            || {
                assert!(new().try_get_matches_from(vec!["pravator", "--all"]).is_err());
            },
        );
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("SF_USERNAME", Some("user@example.com")),
                ("SF_PASSWORD", Some("hunter2")),
                ("SF_SECURITY_TOKEN", Some("token")),
                ("SF_DOMAIN", Some("test")),
                ("SF_CONFIG_DIR", Some("/etc/pravator")),
                ("SF_LOG_LEVEL", Some("info")),
            ],
            || {
                let matches = new().get_matches_from(vec!["pravator", "--all"]);

                assert!(matches.get_flag("all"));
                assert_eq!(
                    matches.get_one::<String>("username").cloned(),
                    Some("user@example.com".to_string())
                );
                assert_eq!(
                    matches.get_one::<String>("domain").cloned(),
                    Some("test".to_string())
                );
                assert_eq!(
                    matches.get_one::<String>("config-dir").cloned(),
                    Some("/etc/pravator".to_string())
                );
                assert_eq!(matches.get_one::<u8>("verbosity").copied(), Some(2));
            },
        );
    }

    #[test]
    fn test_check_log_level_env() {
        // loop cover all possible value_parse
        let levels = ["error", "warn", "info", "debug", "trace"];
        for (index, &level) in levels.iter().enumerate() {
            temp_env::with_vars(
                [
                    ("SF_LOG_LEVEL", Some(level)),
                    ("SF_USERNAME", Some("user@example.com")),
                    ("SF_PASSWORD", Some("hunter2")),
                    ("SF_SECURITY_TOKEN", Some("token")),
                ],
                || {
                    let matches = new().get_matches_from(vec!["pravator", "--all"]);
                    assert_eq!(
                        matches.get_one::<u8>("verbosity").copied(),
                        u8::try_from(index).ok()
                    );
                },
            );
        }
    }

    #[test]
    fn test_check_log_level_verbosity() {
        // loop cover all possible value_parse
        let levels = ["error", "warn", "info", "debug", "trace"];
        for (index, _) in levels.iter().enumerate() {
            temp_env::with_vars([("SF_LOG_LEVEL", None::<String>)], || {
                let mut args = vec!["pravator".to_string(), "--all".to_string()];
                for cred in [
                    "--username",
                    "user@example.com",
                    "--password",
                    "hunter2",
                    "--security-token",
                    "token",
                ] {
                    args.push(cred.to_string());
                }

                // Add the appropriate number of "-v" flags based on the index
                if index > 0 {
                    let v = format!("-{}", "v".repeat(index));
                    args.push(v);
                }

                let matches = new().get_matches_from(args);

                assert_eq!(
                    matches.get_one::<u8>("verbosity").copied(),
                    u8::try_from(index).ok()
                );
            });
        }
    }
}
