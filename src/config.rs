use std::path::PathBuf;

use crate::visit_sync::RefreshPolicy;

/// Application-level constants
pub const APP_NAME: &str = "Dermaclinic";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Local classification service started by the screening backend.
pub const DEFAULT_SCREENING_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_SCREENING_TIMEOUT_SECS: u64 = 60;

const ENV_DB: &str = "DERMACLINIC_DB";
const ENV_SCREENING_URL: &str = "DERMACLINIC_SCREENING_URL";
const ENV_SCREENING_TIMEOUT: &str = "DERMACLINIC_SCREENING_TIMEOUT_SECS";
const ENV_REFRESH_TRIGGERS: &str = "DERMACLINIC_REFRESH_TRIGGERS";

/// Get the application data directory (~/Dermaclinic/).
/// Falls back to the working directory when no home directory is known.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Default location of the clinic database.
pub fn database_path() -> PathBuf {
    app_data_dir().join("clinic.db")
}

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "dermaclinic_lib=info,warn"
}

/// Runtime configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct ClinicConfig {
    pub database_path: PathBuf,
    pub screening_url: String,
    pub screening_timeout_secs: u64,
    pub refresh_policy: RefreshPolicy,
}

impl Default for ClinicConfig {
    fn default() -> Self {
        Self {
            database_path: database_path(),
            screening_url: DEFAULT_SCREENING_URL.into(),
            screening_timeout_secs: DEFAULT_SCREENING_TIMEOUT_SECS,
            refresh_policy: RefreshPolicy::default(),
        }
    }
}

impl ClinicConfig {
    /// Read overrides from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unparseable values keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup(ENV_DB).filter(|p| !p.trim().is_empty()) {
            config.database_path = PathBuf::from(path);
        }

        if let Some(url) = lookup(ENV_SCREENING_URL).filter(|u| !u.trim().is_empty()) {
            config.screening_url = url.trim().to_string();
        }

        if let Some(raw) = lookup(ENV_SCREENING_TIMEOUT) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.screening_timeout_secs = secs,
                _ => tracing::warn!(
                    value = %raw,
                    "Ignoring invalid {ENV_SCREENING_TIMEOUT}"
                ),
            }
        }

        if let Some(raw) = lookup(ENV_REFRESH_TRIGGERS) {
            match RefreshPolicy::parse(&raw) {
                Ok(policy) => config.refresh_policy = policy,
                Err(e) => tracing::warn!(
                    value = %raw,
                    error = %e,
                    "Ignoring invalid {ENV_REFRESH_TRIGGERS}"
                ),
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::models::RefreshTrigger;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn database_under_app_data() {
        let db = database_path();
        assert!(db.starts_with(app_data_dir()));
        assert!(db.ends_with("clinic.db"));
    }

    #[test]
    fn app_name_is_dermaclinic() {
        assert_eq!(APP_NAME, "Dermaclinic");
        assert!(app_data_dir().ends_with("Dermaclinic"));
    }

    #[test]
    fn defaults_without_overrides() {
        let config = ClinicConfig::from_lookup(|_| None);
        assert_eq!(config.screening_url, DEFAULT_SCREENING_URL);
        assert_eq!(config.screening_timeout_secs, DEFAULT_SCREENING_TIMEOUT_SECS);
        assert_eq!(config.refresh_policy, RefreshPolicy::on_completion());
    }

    #[test]
    fn overrides_applied() {
        let config = ClinicConfig::from_lookup(lookup_from(&[
            ("DERMACLINIC_DB", "/var/lib/dermaclinic/test.db"),
            ("DERMACLINIC_SCREENING_URL", " https://screen.example.org "),
            ("DERMACLINIC_SCREENING_TIMEOUT_SECS", "15"),
            ("DERMACLINIC_REFRESH_TRIGGERS", "status_completed,date_edited,appointment_deleted"),
        ]));
        assert_eq!(config.database_path, PathBuf::from("/var/lib/dermaclinic/test.db"));
        assert_eq!(config.screening_url, "https://screen.example.org");
        assert_eq!(config.screening_timeout_secs, 15);
        assert!(config.refresh_policy.contains(RefreshTrigger::DateEdited));
        assert!(config.refresh_policy.contains(RefreshTrigger::AppointmentDeleted));
        assert!(!config.refresh_policy.contains(RefreshTrigger::StatusCancelled));
    }

    #[test]
    fn invalid_values_keep_defaults() {
        let config = ClinicConfig::from_lookup(lookup_from(&[
            ("DERMACLINIC_SCREENING_TIMEOUT_SECS", "soon"),
            ("DERMACLINIC_REFRESH_TRIGGERS", "status_completed,nightly"),
        ]));
        assert_eq!(config.screening_timeout_secs, DEFAULT_SCREENING_TIMEOUT_SECS);
        assert_eq!(config.refresh_policy, RefreshPolicy::default());
    }

    #[test]
    fn empty_trigger_list_still_refreshes_on_completion() {
        let config = ClinicConfig::from_lookup(lookup_from(&[
            ("DERMACLINIC_REFRESH_TRIGGERS", ""),
        ]));
        assert!(config.refresh_policy.contains(RefreshTrigger::StatusCompleted));
        assert_eq!(config.refresh_policy, RefreshPolicy::on_completion());

        let config = ClinicConfig::from_lookup(lookup_from(&[
            ("DERMACLINIC_REFRESH_TRIGGERS", "status_cancelled"),
        ]));
        assert!(config.refresh_policy.contains(RefreshTrigger::StatusCompleted));
        assert!(config.refresh_policy.contains(RefreshTrigger::StatusCancelled));
    }

    #[test]
    fn zero_timeout_rejected() {
        let config = ClinicConfig::from_lookup(lookup_from(&[
            ("DERMACLINIC_SCREENING_TIMEOUT_SECS", "0"),
        ]));
        assert_eq!(config.screening_timeout_secs, DEFAULT_SCREENING_TIMEOUT_SECS);
    }
}
