use std::fmt;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    NoApp { app_name: String },
    BadAppName { app_name: String },
    DuplicateApp { app_name: String },
    AppDeleted { app_name: String },
    NoOptions,
}

impl AppError {
    pub fn code_str(&self) -> &'static str {
        match self {
            AppError::NoApp { .. } => "app/no-app",
            AppError::BadAppName { .. } => "app/bad-app-name",
            AppError::DuplicateApp { .. } => "app/duplicate-app",
            AppError::AppDeleted { .. } => "app/app-deleted",
            AppError::NoOptions => "app/no-options",
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NoApp { app_name } => {
                write!(f, "No Firebase App '{app_name}' has been created - call initialize_app() first")
            }
            AppError::BadAppName { app_name } => write!(f, "Illegal App name: '{app_name}'"),
            AppError::DuplicateApp { app_name } => write!(
                f,
                "Firebase App named '{app_name}' already exists with different options or config"
            ),
            AppError::AppDeleted { app_name } => {
                write!(f, "Firebase App named '{app_name}' already deleted")
            }
            AppError::NoOptions => write!(f, "Need to provide options when initializing an app."),
        }
    }
}

impl std::error::Error for AppError {}
