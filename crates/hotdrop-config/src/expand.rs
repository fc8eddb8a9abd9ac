//! Environment variable expansion for path settings.
//!
//! Supports:
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default

use crate::ConfigError;

/// Expand environment variable references in a configuration string.
///
/// Strings without `${` are returned unchanged, so bare `$` characters in
/// directory names survive.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    shellexpand::env_with_context(value, |var| -> Result<Option<String>, LookupError> {
        match std::env::var(var) {
            Ok(val) => Ok(Some(val)),
            Err(_) => Err(LookupError {
                var_name: var.to_owned(),
            }),
        }
    })
    .map(std::borrow::Cow::into_owned)
    .map_err(|e| ConfigError::EnvVar {
        field: field.to_owned(),
        message: format!("${{{0}}} not set", e.cause.var_name),
    })
}

/// Expand an optional string field in place.
pub(crate) fn expand_opt(value: &mut Option<String>, field: &str) -> Result<(), ConfigError> {
    if let Some(raw) = value.as_deref() {
        *value = Some(expand_env(raw, field)?);
    }
    Ok(())
}

/// Error returned when environment variable lookup fails.
struct LookupError {
    var_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_server_dir_var() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("HOTDROP_TEST_TOMCAT", "/opt/tomcat");
        }
        let result = expand_env("${HOTDROP_TEST_TOMCAT}/temp", "paths.server_dir").unwrap();
        assert_eq!(result, "/opt/tomcat/temp");
        unsafe {
            std::env::remove_var("HOTDROP_TEST_TOMCAT");
        }
    }

    #[test]
    fn test_expand_default_when_unset() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("HOTDROP_TEST_UNSET");
        }
        let result = expand_env("${HOTDROP_TEST_UNSET:-/srv/liferay}", "paths.server_dir").unwrap();
        assert_eq!(result, "/srv/liferay");
    }

    #[test]
    fn test_expand_missing_var_names_field() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("HOTDROP_TEST_MISSING");
        }
        let err = expand_env("${HOTDROP_TEST_MISSING}", "paths.workspace_dir").unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(err.to_string().contains("HOTDROP_TEST_MISSING"));
        assert!(err.to_string().contains("paths.workspace_dir"));
    }

    #[test]
    fn test_bare_dollar_left_alone() {
        let result = expand_env("/work/$legacy", "paths.workspace_dir").unwrap();
        assert_eq!(result, "/work/$legacy");
    }

    #[test]
    fn test_expand_opt_none_is_noop() {
        let mut value = None;
        expand_opt(&mut value, "paths.statics_dir").unwrap();
        assert!(value.is_none());
    }
}
