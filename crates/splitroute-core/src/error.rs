use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Service error: {0}")]
    Service(String),

    #[error("Clipboard error: {0}")]
    Clipboard(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Timed out: {0}")]
    Timeout(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = Error::Io(io_err);
        assert!(err.to_string().contains("IO error"));
        assert!(err.to_string().contains("file missing"));
    }

    #[test]
    fn test_error_display_json() {
        let json_err = serde_json::from_str::<String>("not valid json").unwrap_err();
        let err = Error::Json(json_err);
        assert!(err.to_string().contains("JSON error"));
    }

    #[test]
    fn test_error_display_provider() {
        let err = Error::Provider("package manager died".to_string());
        assert_eq!(err.to_string(), "Provider error: package manager died");
    }

    #[test]
    fn test_error_display_store() {
        let err = Error::Store("read-only filesystem".to_string());
        assert_eq!(err.to_string(), "Store error: read-only filesystem");
    }

    #[test]
    fn test_error_display_service() {
        let err = Error::Service("exit status 3".to_string());
        assert_eq!(err.to_string(), "Service error: exit status 3");
    }

    #[test]
    fn test_error_display_clipboard() {
        let err = Error::Clipboard("no clipboard".to_string());
        assert_eq!(err.to_string(), "Clipboard error: no clipboard");
    }

    #[test]
    fn test_error_display_timeout() {
        let err = Error::Timeout("stop".to_string());
        assert_eq!(err.to_string(), "Timed out: stop");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("access denied"));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<i32>("\"not a number\"").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_error() -> Result<()> {
            Err(Error::Config("bad".to_string()))
        }
        assert!(returns_error().is_err());
    }
}
