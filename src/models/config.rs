use serde::Deserialize;
use crate::models::panel_models::Variant;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub token: String,
    pub cmd_prefix: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default)]
    pub variant: Variant,
    #[serde(default)]
    pub sql_server_ip: String,
    #[serde(default = "default_sql_port")]
    pub sql_server_port: u16,
    #[serde(default)]
    pub sql_server_username: String,
    #[serde(default)]
    pub sql_server_password: String,
    #[serde(default = "default_unregister")]
    pub unregister_on_shutdown: bool
}

fn default_namespace() -> String {
    "rppanel".to_string()
}

fn default_sql_port() -> u16 {
    1433
}

fn default_unregister() -> bool {
    true
}

impl Config {
    pub fn uses_sql_server(&self) -> bool {
        !self.sql_server_ip.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_falls_back_to_memory_panels() {
        let config: Config = serde_json::from_str(r#"{"token": "abc", "cmd_prefix": "!"}"#).unwrap();

        assert_eq!(config.namespace, "rppanel");
        assert_eq!(config.variant, Variant::Panel);
        assert_eq!(config.sql_server_port, 1433);
        assert!(config.unregister_on_shutdown);
        assert!(!config.uses_sql_server());
    }

    #[test]
    fn instance_variant_is_read_in_lowercase() {
        let config: Config = serde_json::from_str(
            r#"{"token": "abc", "cmd_prefix": "!", "variant": "instance", "sql_server_ip": "10.0.0.2"}"#
        ).unwrap();

        assert_eq!(config.variant, Variant::Instance);
        assert!(config.uses_sql_server());
    }
}
