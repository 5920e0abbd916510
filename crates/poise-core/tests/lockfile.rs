use poise_core::lockfile::{
    LockMetadata, LockedDependencyRef, LockedPackage, Lockfile, LOCKFILE_NAME, LOCK_VERSION,
};
use poise_core::name::PackageName;
use poise_core::version::Version;

fn sample() -> Lockfile {
    Lockfile {
        package: vec![
            LockedPackage {
                name: PackageName::new("fastapi").unwrap(),
                version: Version::new(0, 95, 2),
                groups: vec!["main".to_string()],
                extras: vec![],
                dependencies: vec![LockedDependencyRef {
                    name: PackageName::new("starlette").unwrap(),
                    version: Version::new(0, 27, 0),
                }],
            },
            LockedPackage {
                name: PackageName::new("starlette").unwrap(),
                version: Version::new(0, 27, 0),
                groups: vec!["main".to_string()],
                extras: vec![],
                dependencies: vec![],
            },
        ],
        metadata: LockMetadata {
            lock_version: LOCK_VERSION.to_string(),
            content_hash: "abc123".to_string(),
            groups: vec!["main".to_string()],
        },
    }
}

#[test]
fn round_trip_serialize_deserialize() {
    let lockfile = sample();
    let serialized = lockfile.to_string_pretty().unwrap();
    let deserialized = Lockfile::from_str(&serialized).unwrap();

    assert_eq!(deserialized.package, lockfile.package);
    assert_eq!(deserialized.metadata, lockfile.metadata);
}

#[test]
fn serialized_uses_kebab_case_metadata() {
    let serialized = sample().to_string_pretty().unwrap();
    assert!(serialized.contains("[[package]]"));
    assert!(serialized.contains("lock-version = \"1\""));
    assert!(serialized.contains("content-hash = \"abc123\""));
}

#[test]
fn locked_version_lookup() {
    let lockfile = sample();
    assert_eq!(
        lockfile.locked_version("starlette"),
        Some(&Version::new(0, 27, 0))
    );
    assert!(lockfile.locked_version("pydantic").is_none());
}

#[test]
fn freshness_compares_content_hash() {
    let lockfile = sample();
    assert!(lockfile.is_fresh("abc123"));
    assert!(!lockfile.is_fresh("def456"));
}

#[test]
fn rejects_unknown_lock_version() {
    let serialized = sample()
        .to_string_pretty()
        .unwrap()
        .replace("lock-version = \"1\"", "lock-version = \"9\"");
    let err = Lockfile::from_str(&serialized).unwrap_err();
    assert!(err.to_string().contains("lock-version"));
}

#[test]
fn write_to_then_from_path() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join(LOCKFILE_NAME);
    sample().write_to(&path).unwrap();
    let loaded = Lockfile::from_path(&path).unwrap();
    assert_eq!(loaded.package.len(), 2);
}

#[test]
fn missing_file_is_lockfile_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let err = Lockfile::from_path(&dir.path().join(LOCKFILE_NAME)).unwrap_err();
    assert!(err.to_string().starts_with("Lock file error"));
}
