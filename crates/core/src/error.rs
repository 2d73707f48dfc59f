use thiserror::Error;

#[derive(Error, Debug)]
pub enum VitalsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(String),

    #[error("Invalid observation: {0}")]
    InvalidObservation(String),
}

impl From<serde_json::Error> for VitalsError {
    fn from(e: serde_json::Error) -> Self {
        VitalsError::Serialize(e.to_string())
    }
}
