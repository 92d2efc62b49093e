use anchor_config::CasConfig;

use crate::{envy_load, FromEnv};

impl FromEnv for CasConfig {
    fn from_env() -> anyhow::Result<Self> {
        envy_load("cas", "ANCHOR_CAS_")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_fields_may_be_unset() {
        std::env::set_var("ANCHOR_CAS_REQUEST_TIMEOUT_SECS", "15");
        std::env::remove_var("ANCHOR_CAS_ENDPOINT");
        std::env::remove_var("ANCHOR_CAS_HINT");

        let config = CasConfig::from_env().unwrap();
        assert_eq!(config.request_timeout_secs, 15);
        assert_eq!(config.endpoint, None);
        assert_eq!(config.hint, None);
    }
}
