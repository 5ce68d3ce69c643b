use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct User {
    pub name: String,
    pub uid: Option<u32>,
    pub password_hash: Option<String>,
    #[serde(default)]
    pub ssh_authorized_keys: Vec<String>,
    pub gecos: Option<String>,
    pub home_dir: Option<String>,
    #[serde(default)]
    pub no_create_home: bool,
    pub primary_group: Option<String>,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub no_user_group: bool,
    #[serde(default)]
    pub system: bool,
    #[serde(default)]
    pub no_log_init: bool,
    pub shell: Option<String>,
    pub should_exist: Option<bool>,
}

impl User {
    pub fn should_exist(&self) -> bool {
        self.should_exist.unwrap_or(true)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Group {
    pub name: String,
    pub gid: Option<u32>,
    pub password_hash: Option<String>,
    #[serde(default)]
    pub system: bool,
    pub should_exist: Option<bool>,
}

impl Group {
    pub fn should_exist(&self) -> bool {
        self.should_exist.unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_should_exist_defaults_true() {
        let user: User = serde_json::from_str(r#"{"name":"core"}"#).unwrap();
        assert!(user.should_exist());
    }

    #[test]
    fn should_exist_false_is_explicit() {
        let user: User = serde_json::from_str(r#"{"name":"core","shouldExist":false}"#).unwrap();
        assert!(!user.should_exist());
    }
}
