use thiserror::Error;

#[derive(Error, Debug)]
pub enum CdeFormsError {
    #[error("unknown CDE code `{code}`")]
    UnknownCde { code: String },

    #[error("unknown form `{name}`")]
    UnknownForm { name: String },

    #[error("unsupported data type `{data_type}` for CDE `{code}`")]
    UnsupportedDataType { code: String, data_type: String },

    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("store unavailable: {message}")]
    StoreUnavailable { message: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CdeFormsError {
    pub fn unknown_cde(code: impl Into<String>) -> Self {
        Self::UnknownCde { code: code.into() }
    }

    pub fn unknown_form(name: impl Into<String>) -> Self {
        Self::UnknownForm { name: name.into() }
    }

    pub fn unsupported_data_type(code: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self::UnsupportedDataType {
            code: code.into(),
            data_type: data_type.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            message: message.into(),
        }
    }

    /// Configuration errors abort form building; everything else is
    /// reported to the caller as a value.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnknownCde { .. }
                | Self::UnknownForm { .. }
                | Self::UnsupportedDataType { .. }
                | Self::Configuration { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, CdeFormsError>;
