use log::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const DEFAULT_ENV_PREFIX: &str = "REQUEST_RESPONSE_PROCESSOR";

const STATUS_CODES_SUFFIX: &str = "STATUS_CODES";
const EXCLUDE_ONLY_SUFFIX: &str = "STATUS_CODES_EXCLUDE_ONLY";

/// Filter settings controlling which responses reach the registered callback.
///
/// An empty `status_codes` set matches every response. Otherwise the callback
/// runs for responses whose status is in the set, or outside the set when
/// `exclude_only` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorConfig {
    #[serde(default)]
    pub status_codes: HashSet<u16>,
    #[serde(default)]
    pub exclude_only: bool,
}

impl ProcessorConfig {
    pub fn new(status_codes: impl IntoIterator<Item = u16>, exclude_only: bool) -> Self {
        Self {
            status_codes: status_codes.into_iter().collect(),
            exclude_only,
        }
    }

    /// Load from `REQUEST_RESPONSE_PROCESSOR_STATUS_CODES` (comma-separated
    /// integers) and `REQUEST_RESPONSE_PROCESSOR_STATUS_CODES_EXCLUDE_ONLY`
    /// (`1` or `true`). Missing variables fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_env_with_prefix(DEFAULT_ENV_PREFIX)
    }

    /// Same as [`ProcessorConfig::from_env`] with a custom variable prefix.
    /// A blank prefix falls back to the default one.
    pub fn from_env_with_prefix(prefix: &str) -> Self {
        let prefix = match prefix.trim() {
            "" => DEFAULT_ENV_PREFIX,
            trimmed => trimmed,
        };

        let status_codes = match std::env::var(format!("{}_{}", prefix, STATUS_CODES_SUFFIX)) {
            Ok(val) => parse_status_codes(&val),
            Err(_) => HashSet::new(),
        };
        let exclude_only = std::env::var(format!("{}_{}", prefix, EXCLUDE_ONLY_SUFFIX))
            .map(|val| val == "1" || val.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Self {
            status_codes,
            exclude_only,
        }
    }

    /// The filter predicate. Evaluated fresh on every request; holds no
    /// state across requests.
    pub fn should_process(&self, status_code: u16) -> bool {
        if self.status_codes.is_empty() {
            return true;
        }
        self.status_codes.contains(&status_code) != self.exclude_only
    }
}

fn parse_status_codes(val: &str) -> HashSet<u16> {
    let mut codes = HashSet::new();
    for entry in val.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        match entry.parse::<u16>() {
            Ok(code) => {
                codes.insert(code);
            }
            Err(_) => {
                warn!("Skipping unparseable status code entry {:?}", entry);
            }
        }
    }
    codes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_process_empty_set() {
        let config = ProcessorConfig::default();
        assert!(config.should_process(200));
        assert!(config.should_process(503));
    }

    #[test]
    fn test_should_process_include() {
        let config = ProcessorConfig::new([500, 503], false);
        assert!(config.should_process(500));
        assert!(config.should_process(503));
        assert!(!config.should_process(200));
        assert!(!config.should_process(404));
    }

    #[test]
    fn test_should_process_exclude_only() {
        let config = ProcessorConfig::new([500, 503], true);
        assert!(!config.should_process(500));
        assert!(!config.should_process(503));
        assert!(config.should_process(200));
        assert!(config.should_process(404));
    }

    #[test]
    fn test_parse_status_codes() {
        let codes = parse_status_codes("500, 503,404");
        assert_eq!(codes, HashSet::from([500, 503, 404]));

        // bad entries are skipped, not fatal
        let codes = parse_status_codes("500,abc,,503");
        assert_eq!(codes, HashSet::from([500, 503]));
    }

    #[test]
    fn test_from_env_with_prefix() {
        // unique prefix so parallel tests don't race on the environment
        std::env::set_var("FRRP_TEST_A_STATUS_CODES", "500,503");
        std::env::set_var("FRRP_TEST_A_STATUS_CODES_EXCLUDE_ONLY", "true");
        let config = ProcessorConfig::from_env_with_prefix("FRRP_TEST_A");
        assert_eq!(config.status_codes, HashSet::from([500, 503]));
        assert!(config.exclude_only);
    }

    #[test]
    fn test_from_env_defaults_when_absent() {
        let config = ProcessorConfig::from_env_with_prefix("FRRP_TEST_UNSET");
        assert_eq!(config, ProcessorConfig::default());
    }

    #[test]
    fn test_blank_prefix_falls_back_to_default() {
        assert_eq!(
            ProcessorConfig::from_env_with_prefix("   "),
            ProcessorConfig::from_env()
        );
    }
}
