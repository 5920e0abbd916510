use poise_util::hash::sha256_hex;

#[test]
fn test_sha256_empty() {
    assert_eq!(
        sha256_hex([b"".as_slice()]),
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
}

#[test]
fn test_sha256_parts_concatenate() {
    let whole = sha256_hex([b"hello".as_slice()]);
    assert_eq!(
        whole,
        "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
    );
    assert_eq!(sha256_hex([b"hel".as_slice(), b"lo".as_slice()]), whole);
}

#[test]
fn test_sha256_distinguishes_inputs() {
    assert_ne!(sha256_hex([b"^1.0".as_slice()]), sha256_hex([b"^2.0".as_slice()]));
}
