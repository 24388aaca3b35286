use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("API key not found. Set QAGEN__LLM__API_KEY, API_KEY or EVOLUTION_API_KEY before running the generator")]
    MissingApiKey,

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("OpenAPI specification is neither valid YAML ({yaml}) nor valid JSON ({json})")]
    SpecParse { yaml: String, json: String },

    #[error("Could not build requirements: {0}")]
    RequirementsParse(String),

    #[error("LLM provider error: {0}")]
    Provider(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Template error: {0}")]
    Template(#[from] handlebars::TemplateError),

    #[error("Rendering error: {0}")]
    Render(#[from] handlebars::RenderError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Document error: {0}")]
    Document(String),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Refinement returned no code")]
    EmptyRefinement,
}

impl Error {
    /// Errors that stop a whole run instead of being absorbed per requirement.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::MissingApiKey
                | Error::Config(_)
                | Error::SpecParse { .. }
                | Error::RequirementsParse(_)
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Error::MissingApiKey => "missing_api_key",
            Error::Config(_) => "config",
            Error::SpecParse { .. } => "spec_parse",
            Error::RequirementsParse(_) => "requirements_parse",
            Error::Provider(_) => "provider",
            Error::Http(_) => "http",
            Error::Io(_) => "io",
            Error::Template(_) => "template",
            Error::Render(_) => "render",
            Error::Json(_) => "json",
            Error::Yaml(_) => "yaml",
            Error::Document(_) => "document",
            Error::Pattern(_) => "pattern",
            Error::EmptyRefinement => "empty_refinement",
        }
    }
}
