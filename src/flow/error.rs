//! Error types for the flow codec

use thiserror::Error;

/// Errors raised while serializing or reconstructing a flow
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("duplicate component identifier `{0}` in flow")]
    DuplicateComponent(String),

    #[error("step identifier `{0}` shadows an existing sub-flow")]
    ShadowedIdentifier(String),

    #[error("unknown component class `{0}`")]
    UnknownClass(String),

    #[error("unknown function `{0}`")]
    UnknownFunction(String),

    #[error("unknown scalar type `{0}`")]
    UnknownType(String),

    #[error("unknown serialized object kind `{0}`")]
    UnknownSerializedKind(String),

    #[error("malformed dependency line `{0}`")]
    MalformedDependency(String),

    #[error("dependency `{name}{operation}{required}` unsatisfied, `{installed}` installed")]
    DependencyUnsatisfied {
        name: String,
        operation: &'static str,
        required: String,
        installed: String,
    },

    #[error("package `{0}` is not installed")]
    MissingPackage(String),

    #[error("flow `{0}` was not produced by this crate")]
    ForeignFlow(String),

    #[error("flow references missing or already-consumed component `{0}`")]
    MissingComponent(String),

    #[error("class `{class}` is missing required parameter `{name}`")]
    MissingParameter { class: String, name: String },

    #[error("class `{class}`: parameter `{name}` has the wrong shape")]
    BadParameter { class: String, name: String },

    #[error("malformed step `{0}`")]
    MalformedStep(String),

    #[error("component in `{0}` was not hoisted into a sub-flow")]
    UnhoistedComponent(String),

    #[error("non-finite number {0} cannot be serialized")]
    NonFiniteNumber(f64),

    #[error("map key `{0}` collides with the serialized-object tag")]
    InvalidKey(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FlowError>;
