use secrecy::SecretString;

/// Credentials shared by every vendor call, built once at startup.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub username: String,
    pub password: SecretString,
    pub security_token: SecretString,
    pub domain: String,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(username: String, password: SecretString, security_token: SecretString) -> Self {
        Self {
            username,
            password,
            security_token,
            domain: "login".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_global_args() {
        let args = GlobalArgs::new(
            "user@example.com".to_string(),
            SecretString::from("hunter2".to_string()),
            SecretString::from("token".to_string()),
        );
        assert_eq!(args.username, "user@example.com");
        assert_eq!(args.password.expose_secret(), "hunter2");
        assert_eq!(args.domain, "login");
    }
}
