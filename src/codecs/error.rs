#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum EncodeError {
    #[error("field `{field}` cannot be represented: {reason}")]
    Unrepresentable { field: &'static str, reason: String },

    #[error("protobuf encoding failed: {0}")]
    Protobuf(#[from] prost::EncodeError),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DecodeError {
    #[error("protobuf decoding failed: {0}")]
    Protobuf(#[from] prost::DecodeError),

    #[error("JSON decoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown field `{field}` in {message}")]
    UnknownField {
        message: &'static str,
        field: String,
    },

    #[error("duplicate field `{field}` in {message}")]
    DuplicateField {
        message: &'static str,
        field: String,
    },

    #[error("field `{field}` expects {expected}, got {found}")]
    InvalidValue {
        field: String,
        expected: &'static str,
        found: String,
    },
}

impl DecodeError {
    pub(crate) fn invalid(field: &str, expected: &'static str, found: impl ToString) -> Self {
        Self::InvalidValue {
            field: field.to_owned(),
            expected,
            found: found.to_string(),
        }
    }
}
