//! Local account lookups, read straight from the passwd database.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Whether `username` has an entry in the passwd file at `passwd_path`.
///
/// A missing file means no local accounts, not an error. A file that exists
/// but cannot be read is an error: guessing would risk a duplicate account.
pub fn user_exists(passwd_path: &Path, username: &str) -> Result<bool> {
    if !passwd_path.exists() {
        return Ok(false);
    }

    let content = fs::read_to_string(passwd_path)
        .with_context(|| format!("Failed to read passwd file at {}", passwd_path.display()))?;

    Ok(content
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .any(|line| line.split(':').next() == Some(username)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_user_exists() {
        let temp = TempDir::new().unwrap();
        let passwd = temp.path().join("passwd");
        fs::write(
            &passwd,
            "root:x:0:0:root:/root:/bin/bash\nlocaladmin:x:1000:1000::/home/localadmin:/bin/bash\n",
        )
        .unwrap();

        assert!(user_exists(&passwd, "localadmin").unwrap());
        assert!(user_exists(&passwd, "root").unwrap());
        assert!(!user_exists(&passwd, "local").unwrap());
        assert!(!user_exists(&passwd, "nobody").unwrap());
    }

    #[test]
    fn test_missing_passwd_file() {
        let temp = TempDir::new().unwrap();
        assert!(!user_exists(&temp.path().join("passwd"), "root").unwrap());
    }
}
