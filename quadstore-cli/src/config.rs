//! A small `confy`-backed TOML config, scoped to just the handful of
//! fields the CLI needs (store path, key width, default map size) —
//! the environment-open options themselves live in `quadstore::StoreConfig`
//! and are built from this at startup.

use serde_derive::{Deserialize, Serialize};

use quadstore::KeyWidth;

pub const APP_NAME: &str = "quadstore-cli";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigLoad {
    /// Default store directory used when `--path` is omitted.
    pub store_path: Option<String>,

    /// One of 4, 5, 8. Only consulted by `bootstrap` on a fresh store.
    pub key_width: u8,

    /// Reserved virtual address space, in bytes.
    pub map_size: usize,

    pub log_level: String,
}

impl Default for ConfigLoad {
    fn default() -> Self {
        Self {
            store_path: None,
            key_width: 8,
            map_size: 1 << 30,
            log_level: "info".to_string(),
        }
    }
}

impl ConfigLoad {
    pub fn load() -> Self {
        confy::load(APP_NAME, None).unwrap_or_default()
    }

    pub fn resolved_key_width(&self) -> anyhow::Result<KeyWidth> {
        Ok(KeyWidth::from_u8(self.key_width)?)
    }
}
