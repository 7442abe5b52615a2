#[non_exhaustive]
#[derive(Debug)]
pub enum Error {
    /// The geometry of the system can not be used: non-positive cutoff,
    /// degenerate unit cell, or a cell smaller than the cutoff
    InvalidGeometry(String),
    /// A set of coordinates did not contain any particle
    EmptyInput(String),
    /// Dimensionality of some data does not match the expected one
    DimensionMismatch(String),
    /// Got an invalid parameter value in a function
    InvalidParameter(String),
    /// Error while serializing/deserializing data
    Json(serde_json::Error),
    /// Error returned by a user-provided callback
    Callback(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidGeometry(e) => write!(f, "invalid geometry: {}", e),
            Error::EmptyInput(e) => write!(f, "empty input: {}", e),
            Error::DimensionMismatch(e) => write!(f, "dimension mismatch: {}", e),
            Error::InvalidParameter(e) => write!(f, "invalid parameter: {}", e),
            Error::Json(e) => write!(f, "json error: {}", e),
            Error::Callback(e) => write!(f, "error in callback: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidGeometry(_) |
            Error::EmptyInput(_) |
            Error::DimensionMismatch(_) |
            Error::InvalidParameter(_) => None,
            Error::Json(e) => Some(e),
            Error::Callback(e) => Some(&**e),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Error {
        Error::Json(error)
    }
}
