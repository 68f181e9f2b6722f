use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigNotFound,
    ConfigParseError,
    ConfigInvalidValue,
    ConfigInterpolationMissing,
    ConfigInterpolationCycle,

    TaskUnknown,

    RegistryDuplicateTask,
    RegistryPluginFailed,

    InternalIoError,
    InternalJsonError,
    InternalUnexpected,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigNotFound => "config.not_found",
            ErrorCode::ConfigParseError => "config.parse_error",
            ErrorCode::ConfigInvalidValue => "config.invalid_value",
            ErrorCode::ConfigInterpolationMissing => "config.interpolation_missing",
            ErrorCode::ConfigInterpolationCycle => "config.interpolation_cycle",

            ErrorCode::TaskUnknown => "task.unknown",

            ErrorCode::RegistryDuplicateTask => "registry.duplicate_task",
            ErrorCode::RegistryPluginFailed => "registry.plugin_failed",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
            ErrorCode::InternalUnexpected => "internal.unexpected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigNotFoundDetails {
    pub path: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigParseErrorDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub line: usize,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidValueDetails {
    pub section: String,
    pub option: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterpolationDetails {
    pub section: String,
    pub option: String,
    pub reference: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub chain: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnknownTaskDetails {
    pub tag: String,
    pub task_type: String,
    pub known: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateTaskDetails {
    pub key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginFailedDetails {
    pub module: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalIoErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalJsonErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

fn to_details<T: Serialize>(details: T) -> Value {
    serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
        }
    }

    pub fn config_not_found(path: impl Into<String>) -> Self {
        let path = path.into();
        Self::new(
            ErrorCode::ConfigNotFound,
            format!("Config file not found: {}", path),
            to_details(ConfigNotFoundDetails { path }),
        )
        .with_hint("Run 'convoy --default-config > convoy.cfg' to create one")
    }

    pub fn config_parse(path: Option<String>, line: usize, problem: impl Into<String>) -> Self {
        let problem = problem.into();
        let message = match &path {
            Some(p) => format!("{}:{}: {}", p, line, problem),
            None => format!("line {}: {}", line, problem),
        };
        Self::new(
            ErrorCode::ConfigParseError,
            message,
            to_details(ConfigParseErrorDetails {
                path,
                line,
                problem,
            }),
        )
    }

    pub fn config_invalid_value(
        section: impl Into<String>,
        option: impl Into<String>,
        value: Option<String>,
        problem: impl Into<String>,
    ) -> Self {
        let section = section.into();
        let option = option.into();
        let problem = problem.into();
        Self::new(
            ErrorCode::ConfigInvalidValue,
            format!("Invalid value for {}.{}: {}", section, option, problem),
            to_details(ConfigInvalidValueDetails {
                section,
                option,
                value,
                problem,
            }),
        )
    }

    pub fn interpolation_missing(
        section: impl Into<String>,
        option: impl Into<String>,
        reference: impl Into<String>,
    ) -> Self {
        let section = section.into();
        let option = option.into();
        let reference = reference.into();
        Self::new(
            ErrorCode::ConfigInterpolationMissing,
            format!(
                "{}.{} references '{}', which is not configured",
                section, option, reference
            ),
            to_details(InterpolationDetails {
                section,
                option,
                reference,
                chain: Vec::new(),
            }),
        )
    }

    pub fn interpolation_cycle(
        section: impl Into<String>,
        option: impl Into<String>,
        chain: Vec<String>,
    ) -> Self {
        let section = section.into();
        let option = option.into();
        let reference = format!("{}:{}", section, option);
        Self::new(
            ErrorCode::ConfigInterpolationCycle,
            format!("Cyclic interpolation: {}", chain.join(" -> ")),
            to_details(InterpolationDetails {
                section,
                option,
                reference,
                chain,
            }),
        )
    }

    pub fn unknown_task(
        tag: impl Into<String>,
        task_type: impl Into<String>,
        known: Vec<String>,
    ) -> Self {
        let tag = tag.into();
        let task_type = task_type.into();
        let message = if tag == task_type {
            format!("Unknown task '{}'", tag)
        } else {
            format!("Unknown task type '{}' for section '{}'", task_type, tag)
        };
        Self::new(
            ErrorCode::TaskUnknown,
            message,
            to_details(UnknownTaskDetails {
                tag,
                task_type,
                known,
            }),
        )
        .with_hint("Run 'convoy --default-config' to see the available tasks")
    }

    pub fn duplicate_task(key: impl Into<String>) -> Self {
        let key = key.into();
        Self::new(
            ErrorCode::RegistryDuplicateTask,
            format!("Task '{}' is registered more than once", key),
            to_details(DuplicateTaskDetails { key }),
        )
    }

    pub fn plugin_failed(module: impl Into<String>, error: impl Into<String>) -> Self {
        let module = module.into();
        let error = error.into();
        Self::new(
            ErrorCode::RegistryPluginFailed,
            format!("Failed to load task module '{}': {}", module, error),
            to_details(PluginFailedDetails { module, error }),
        )
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        let error = error.into();
        let message = match &context {
            Some(ctx) => format!("IO error ({}): {}", ctx, error),
            None => format!("IO error: {}", error),
        };
        Self::new(
            ErrorCode::InternalIoError,
            message,
            to_details(InternalIoErrorDetails { error, context }),
        )
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        Self::new(
            ErrorCode::InternalJsonError,
            "JSON error",
            to_details(InternalJsonErrorDetails {
                error: error.into(),
                context,
            }),
        )
    }

    pub fn internal_unexpected(error: impl Into<String>) -> Self {
        let error = error.into();
        Self::new(
            ErrorCode::InternalUnexpected,
            error.clone(),
            serde_json::json!({ "error": error }),
        )
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::internal_unexpected(message)
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }
}
