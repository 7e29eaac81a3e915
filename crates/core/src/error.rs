use leon::{ParseError as TemplateParseError, RenderError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_GENERAL_ERROR: u8 = 1;
pub const EXIT_NO_MANIFEST: u8 = 2;
pub const EXIT_NO_SCRIPTS: u8 = 3;
pub const EXIT_SCRIPT_FAILED: u8 = 4;
pub const EXIT_INVALID_CONFIG: u8 = 5;
pub const EXIT_INTERRUPTED: u8 = 130;

/// Failures while turning a manifest's `scripts` section into a catalog.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("The `scripts` section is malformed: {}", .0)]
    Malformed(String),

    #[error("No scripts are defined in the manifest.")]
    NoScripts,

    #[error("Found a non-unique script name: `{}`", .0)]
    DuplicateScript(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("No package.json found in `{}` or any of its parent directories.", .start)]
    NoManifest { start: String },

    #[error("IO error with {} file at path `{}`: {}", .file_description, .path, .original)]
    Io {
        file_description: String,
        path: String,
        original: std::io::Error,
    },

    #[error("Error {} {} file at `{}`: {}", .action, .file_description, .path, .original)]
    Json {
        action: String,
        file_description: String,
        path: String,
        original: serde_json::Error,
    },

    #[error("{}", .0)]
    Catalog(#[from] ParseError),

    #[error("Script not found: `{}`{}", .name, suggestion_text(.suggestions))]
    ScriptNotFound {
        name: String,
        suggestions: Vec<String>,
    },

    #[error("No previous script recorded for this project.")]
    NoHistory,

    #[error("Script `{}` failed with exit code {}.", .script, .exit_code)]
    ExecutionFailed { script: String, exit_code: i32 },

    #[error("Interrupted.")]
    Interrupted,

    #[error("Invalid configuration in `{}`: {}", .path, .message)]
    ConfigError { path: String, message: String },

    #[error("Configuration file not found: `{}`", .0)]
    InvalidConfig(String),

    #[error("Workspace file `{}` is invalid: {}", .path, .message)]
    WorkspaceFile { path: String, message: String },

    #[error("History file `{}` is corrupt: {}", .path, .message)]
    HistoryCorrupt { path: String, message: String },

    #[error("Terminal too small ({}x{}), need at least {}x{}.", .width, .height, .min_width, .min_height)]
    TerminalTooSmall {
        width: u16,
        height: u16,
        min_width: u16,
        min_height: u16,
    },

    #[error("Script name `{}` can't be passed to a shell.", .0.escape_debug())]
    UnquotableScript(String),

    #[error("Error parsing runner template: {}", .0)]
    Parse(#[from] TemplateParseError),

    #[error("Error rendering runner template: {}", .0)]
    Render(#[from] RenderError),

    #[error("Terminal error: {}", .0)]
    Terminal(#[from] std::io::Error),
}

fn suggestion_text(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(". Did you mean: {}?", suggestions.join(", "))
    }
}

impl Error {
    pub fn io_error(file_description: &str, path: &str, original: std::io::Error) -> Self {
        Self::Io {
            file_description: file_description.to_string(),
            path: path.to_string(),
            original,
        }
    }

    pub fn json_error(
        action: &str,
        file_description: &str,
        path: &str,
        original: serde_json::Error,
    ) -> Self {
        Self::Json {
            action: action.to_string(),
            file_description: file_description.to_string(),
            path: path.to_string(),
            original,
        }
    }

    pub fn config_error(path: &str, message: impl Into<String>) -> Self {
        Self::ConfigError {
            path: path.to_string(),
            message: message.into(),
        }
    }

    /// Process exit code for this error when it ends the program.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::NoManifest { .. } | Error::Json { .. } => EXIT_NO_MANIFEST,
            Error::Catalog(ParseError::NoScripts) => EXIT_NO_SCRIPTS,
            Error::Catalog(_) => EXIT_NO_MANIFEST,
            Error::ExecutionFailed { .. } => EXIT_SCRIPT_FAILED,
            Error::InvalidConfig(_) | Error::ConfigError { .. } => EXIT_INVALID_CONFIG,
            Error::Interrupted => EXIT_INTERRUPTED,
            _ => EXIT_GENERAL_ERROR,
        }
    }
}
