use crate::app::constants::DEFAULT_ENTRY_NAME;
use crate::app::errors::{AppError, AppResult};
use crate::app::logger::LOGGER;
use crate::app::registry::apps_guard;
use crate::app::types::{FirebaseApp, FirebaseAppConfig, FirebaseAppSettings, FirebaseOptions};

pub static SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

fn normalize_name(settings: &FirebaseAppSettings) -> AppResult<String> {
    let name = settings
        .name
        .clone()
        .unwrap_or_else(|| DEFAULT_ENTRY_NAME.to_string());
    if name.trim().is_empty() {
        return Err(AppError::BadAppName { app_name: name });
    }
    Ok(name)
}

/// Creates (or returns the identical, already registered) app named by `settings`.
///
/// # Errors
///
/// Returns [`AppError::DuplicateApp`] when an app with the same name exists with different
/// options or config, and [`AppError::NoOptions`] when every option is unset.
pub fn initialize_app(options: FirebaseOptions, settings: Option<FirebaseAppSettings>) -> AppResult<FirebaseApp> {
    let settings = settings.unwrap_or_default();
    let name = normalize_name(&settings)?;
    if !options.is_defined() {
        return Err(AppError::NoOptions);
    }

    let config = FirebaseAppConfig::new(name.clone(), settings.automatic_data_collection_enabled.unwrap_or(true));

    let mut apps = apps_guard();
    if let Some(existing) = apps.get(&name) {
        if existing.options() == options && existing.config() == config {
            return Ok(existing.clone());
        }
        return Err(AppError::DuplicateApp { app_name: name });
    }

    let app = FirebaseApp::new(options, config);
    apps.insert(name.clone(), app.clone());
    LOGGER.debug(format!("initialized Firebase app '{name}'"));
    Ok(app)
}

/// Looks up an initialized app by name, defaulting to [`DEFAULT_ENTRY_NAME`].
pub fn get_app(name: Option<&str>) -> AppResult<FirebaseApp> {
    let lookup = name.unwrap_or(DEFAULT_ENTRY_NAME);
    apps_guard().get(lookup).cloned().ok_or_else(|| AppError::NoApp {
        app_name: lookup.to_string(),
    })
}

pub fn get_apps() -> Vec<FirebaseApp> {
    apps_guard().values().cloned().collect()
}

/// Removes the app from the registry and marks every handle to it as deleted.
pub fn delete_app(app: &FirebaseApp) -> AppResult<()> {
    let name = app.name().to_string();
    let removed = {
        let mut apps = apps_guard();
        match apps.get(&name) {
            Some(existing) if existing.same_app(app) => apps.remove(&name),
            _ => None,
        }
    };

    if removed.is_some() {
        app.set_is_deleted(true);
        LOGGER.debug(format!("deleted Firebase app '{name}'"));
    }
    Ok(())
}

/// Returns true when `app` is live and is the instance registered under its name.
pub fn is_registered_app(app: &FirebaseApp) -> bool {
    if app.is_deleted() {
        return false;
    }
    apps_guard()
        .get(app.name())
        .is_some_and(|registered| registered.same_app(app))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static TEST_COUNTER: AtomicUsize = AtomicUsize::new(0);

    fn next_name(prefix: &str) -> String {
        format!("{prefix}-{}", TEST_COUNTER.fetch_add(1, Ordering::SeqCst))
    }

    fn settings(name: &str) -> FirebaseAppSettings {
        FirebaseAppSettings {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    fn test_options() -> FirebaseOptions {
        FirebaseOptions {
            api_key: Some("test-key".to_string()),
            project_id: Some("test-project".to_string()),
            storage_bucket: Some("test-project.appspot.com".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn initialize_app_creates_named_app() {
        let name = next_name("named-app");
        let app = initialize_app(test_options(), Some(settings(&name))).unwrap();
        assert_eq!(app.name(), name);
        assert!(app.automatic_data_collection_enabled());
        assert!(is_registered_app(&app));
    }

    #[test]
    fn initialize_app_with_same_options_returns_same_instance() {
        let name = next_name("same-app");
        let first = initialize_app(test_options(), Some(settings(&name))).unwrap();
        let second = initialize_app(test_options(), Some(settings(&name))).unwrap();
        assert!(first.same_app(&second));
    }

    #[test]
    fn initialize_app_duplicate_options_fails() {
        let name = next_name("dup-app");
        initialize_app(test_options(), Some(settings(&name))).unwrap();
        let mut other = test_options();
        other.api_key = Some("other-key".to_string());
        let result = initialize_app(other, Some(settings(&name)));
        assert!(matches!(result, Err(AppError::DuplicateApp { .. })));
    }

    #[test]
    fn initialize_app_rejects_blank_name_and_empty_options() {
        let blank = initialize_app(test_options(), Some(settings("  ")));
        assert!(matches!(blank, Err(AppError::BadAppName { .. })));

        let empty = initialize_app(FirebaseOptions::default(), Some(settings(&next_name("empty"))));
        assert_eq!(empty.unwrap_err(), AppError::NoOptions);
    }

    #[test]
    fn delete_app_marks_app_deleted_and_unregisters() {
        let name = next_name("delete-app");
        let app = initialize_app(test_options(), Some(settings(&name))).unwrap();
        delete_app(&app).unwrap();
        assert!(app.is_deleted());
        assert!(!is_registered_app(&app));
        assert_eq!(app.check_destroyed().unwrap_err().code_str(), "app/app-deleted");
        assert!(matches!(get_app(Some(&name)), Err(AppError::NoApp { .. })));
    }

    #[test]
    fn get_app_nonexistent_fails() {
        let result = get_app(Some("missing-app"));
        assert!(matches!(result, Err(AppError::NoApp { app_name }) if app_name == "missing-app"));
    }
}
