use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SystemdUnit {
    pub name: String,
    pub enabled: Option<bool>,
    #[serde(default)]
    pub mask: bool,
    pub contents: Option<String>,
    #[serde(default)]
    pub dropins: Vec<Dropin>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NetworkdUnit {
    pub name: String,
    pub contents: Option<String>,
    #[serde(default)]
    pub dropins: Vec<Dropin>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Dropin {
    pub name: String,
    pub contents: Option<String>,
}
