mod config;
mod environment;
pub mod error;
mod extractors;

pub use config::{Config, ConfigError};
pub use environment::Environment;
pub use error::{AppError, FieldError};
pub use extractors::{
    PendingUpload, RootSecret, UploadBody, UploadToken, ValidatedJson, ROOT_SECRET_HEADER,
    UPLOAD_FIELD, UPLOAD_TOKEN_HEADER,
};
