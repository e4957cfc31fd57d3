pub const DEFAULT_API_BASE: &str = "http://localhost:8000";
pub const DEFAULT_BATTLE_API_BASE: &str = "http://localhost:8000/proxy";

// Persisted session keys; all four are cleared together on logout.
pub const STORAGE_KEY_TOKEN: &str = "pcrdb_token";
pub const STORAGE_KEY_USERNAME: &str = "pcrdb_username";
pub const STORAGE_KEY_ROLE: &str = "pcrdb_role";
pub const STORAGE_KEY_STATUS: &str = "pcrdb_status";
pub const SESSION_STORAGE_KEYS: [&str; 4] = [
    STORAGE_KEY_TOKEN,
    STORAGE_KEY_USERNAME,
    STORAGE_KEY_ROLE,
    STORAGE_KEY_STATUS,
];

pub const CLAN_BATTLE_PAGE_LIMIT: u32 = 10;
pub const CLAN_BATTLE_ERROR_DISPLAY_MS: u32 = 3000;
pub const CLAN_BATTLE_SERVER_ID: &str = "1";
pub const GRAND_DEFAULT_LIMIT: u32 = 100;
pub const PLAYER_SEARCH_LIMIT: u32 = 100;
pub const TOP_CLANS_DEFAULT_LIMIT: u32 = 30;

/// Stand-in value for capped numeric strings such as `"251+"`.
pub const CAPPED_VALUE_SENTINEL: i64 = 999;

/// Backend locations. Cloned into every module at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_base: String,
    pub battle_api_base: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            battle_api_base: DEFAULT_BATTLE_API_BASE.to_string(),
        }
    }
}

impl ClientConfig {
    /// Read `PCRDB_API_BASE` / `PCRDB_BATTLE_API_BASE`, falling back to the local defaults.
    pub fn from_env() -> Self {
        Self {
            api_base: env_base_url("PCRDB_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.into()),
            battle_api_base: env_base_url("PCRDB_BATTLE_API_BASE")
                .unwrap_or_else(|| DEFAULT_BATTLE_API_BASE.into()),
        }
    }

    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    pub fn battle_url(&self, path: &str) -> String {
        format!("{}{}", self.battle_api_base, path)
    }
}

fn env_base_url(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().trim_end_matches('/').to_string())
        .filter(|value| !value.is_empty())
}
