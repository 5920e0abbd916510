use poise_util::errors::PoiseError;

#[test]
fn test_io_error_display() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
    let err = PoiseError::from(io_err);
    assert!(err.to_string().contains("I/O error"), "got: {err}");
}

#[test]
fn test_parse_error_display() {
    let err = PoiseError::Parse {
        message: "bad constraint".to_string(),
    };
    assert_eq!(err.to_string(), "Parse error: bad constraint");
}

#[test]
fn test_conflict_error_display() {
    let err = PoiseError::Conflict {
        message: "shared".to_string(),
    };
    assert_eq!(err.to_string(), "Version conflict: shared");
}

#[test]
fn test_not_found_error_display() {
    let err = PoiseError::NotFound {
        message: "package 'nope'".to_string(),
    };
    assert_eq!(err.to_string(), "Not found: package 'nope'");
}

#[test]
fn test_manifest_error_display() {
    let err = PoiseError::Manifest {
        message: "duplicate name".to_string(),
    };
    assert_eq!(err.to_string(), "Invalid manifest: duplicate name");
}

#[test]
fn test_generic_error_display() {
    let err = PoiseError::Generic {
        message: "something broke".to_string(),
    };
    assert_eq!(err.to_string(), "something broke");
}

#[test]
fn test_io_error_from_conversion() {
    let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let err: PoiseError = io_err.into();
    assert!(matches!(err, PoiseError::Io(_)));
}
