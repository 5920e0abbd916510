use poise_util::fs::{ensure_dir, find_ancestor_with, write_atomic};
use tempfile::TempDir;

#[test]
fn test_find_ancestor_with_direct() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("pyproject.toml"), "").unwrap();
    let result = find_ancestor_with(tmp.path(), "pyproject.toml");
    assert_eq!(result, Some(tmp.path().to_path_buf()));
}

#[test]
fn test_find_ancestor_with_nested() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("pyproject.toml"), "").unwrap();
    let nested = tmp.path().join("src").join("app").join("routes");
    std::fs::create_dir_all(&nested).unwrap();
    let result = find_ancestor_with(&nested, "pyproject.toml");
    assert_eq!(result, Some(tmp.path().to_path_buf()));
}

#[test]
fn test_find_ancestor_with_not_found() {
    let tmp = TempDir::new().unwrap();
    let result = find_ancestor_with(tmp.path(), "NonExistent.file");
    assert_eq!(result, None);
}

#[test]
fn test_ensure_dir_creates_nested() {
    let tmp = TempDir::new().unwrap();
    let deep = tmp.path().join("x").join("y").join("z");
    assert!(!deep.exists());
    ensure_dir(&deep).unwrap();
    assert!(deep.is_dir());
}

#[test]
fn test_write_atomic_replaces_contents() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("poise.lock");
    write_atomic(&path, b"first").unwrap();
    write_atomic(&path, b"second").unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
    let leftovers = std::fs::read_dir(tmp.path()).unwrap().count();
    assert_eq!(leftovers, 1);
}

#[test]
fn test_write_atomic_creates_parent() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("nested").join("out.toml");
    write_atomic(&path, b"x = 1").unwrap();
    assert!(path.is_file());
}
