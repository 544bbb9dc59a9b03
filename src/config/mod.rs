use std::fmt;
use zeroize::Zeroize;

pub mod collector;
pub mod config_manager;

pub use config_manager::Settings;

/// A password held in memory only as long as needed.
///
/// Never printed: both `Debug` and `Display` render a mask. The buffer is
/// wiped when the value is dropped.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Secret(value.into())
    }

    /// Raw value, for handing to the command that consumes it.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("********")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("********")
    }
}

/// Run parameters gathered from the operator.
///
/// Only the collector builds one of these, and only after the summary has been
/// confirmed. Every step reads it; nothing mutates it afterwards.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub hostname: String,
    pub domain_admin: String,
    pub domain_name: String,
    pub it_admins: Vec<String>,
    pub main_user: String,
    /// `None` in demo mode, where the password is never asked for.
    pub emergency_password: Option<Secret>,
    pub demo_mode: bool,
}

impl RunConfig {
    /// Domain accounts that receive administrative rights, IT admins first.
    pub fn admin_users(&self) -> impl Iterator<Item = &str> {
        self.it_admins
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.main_user.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_is_masked() {
        let secret = Secret::new("hunter2");
        assert_eq!(format!("{}", secret), "********");
        assert_eq!(format!("{:?}", secret), "********");
        assert_eq!(secret.expose(), "hunter2");
    }

    #[test]
    fn test_run_config_debug_hides_password() {
        let config = RunConfig {
            hostname: "test01".into(),
            domain_admin: "itadmin@corp.local".into(),
            domain_name: "corp.local".into(),
            it_admins: vec!["jdoe@corp.local".into()],
            main_user: "asmith@corp.local".into(),
            emergency_password: Some(Secret::new("s3cret-pw")),
            demo_mode: false,
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("s3cret-pw"));
        assert!(rendered.contains("test01"));
    }

    #[test]
    fn test_admin_users_order() {
        let config = RunConfig {
            hostname: "h".into(),
            domain_admin: "a".into(),
            domain_name: "d".into(),
            it_admins: vec!["one".into(), "two".into(), "one".into()],
            main_user: "main".into(),
            emergency_password: None,
            demo_mode: true,
        };
        let users: Vec<&str> = config.admin_users().collect();
        assert_eq!(users, vec!["one", "two", "one", "main"]);
    }
}
