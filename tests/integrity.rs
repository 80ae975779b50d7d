mod common;

use sha2::{Digest, Sha512_224};
use std::io::Write;

use wrap::error::IntegrityError;
use wrap::kernel::integrity::{compute_digest, resolve_program, IntegrityGate};

#[tokio::test]
async fn test_digest_matches_sha512_224_of_contents() {
    // Larger than one read chunk so the streaming path is exercised
    let contents: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&contents).unwrap();

    let digest = compute_digest(file.path()).await.unwrap();
    let expected = format!("{:x}", Sha512_224::digest(&contents));

    assert_eq!(digest, expected);
    assert_eq!(digest.len(), 56, "224 bits as hex");
    assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
}

#[tokio::test]
async fn test_digest_of_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let err = compute_digest(&dir.path().join("nope")).await.unwrap_err();
    assert!(matches!(err, IntegrityError::Read { .. }));
}

#[test]
fn test_resolve_program_searches_path() {
    let sh = resolve_program("sh").unwrap();
    assert!(sh.is_absolute());
    assert!(sh.ends_with("sh"));

    let explicit = resolve_program("./relative/tool").unwrap();
    assert_eq!(explicit, std::path::PathBuf::from("./relative/tool"));

    let missing = resolve_program("surely-not-an-installed-command-4711");
    assert!(matches!(missing, Err(IntegrityError::NotFound(_))));
}

#[tokio::test]
async fn test_gate_maps_status_codes() {
    let (base, captured) = common::http_stub(|path| {
        if path.ends_with("/known") {
            200
        } else if path.ends_with("/unknown") {
            404
        } else {
            503
        }
    })
    .await;

    let gate = IntegrityGate::new(&format!("{}/", base)).unwrap();

    assert!(gate.is_recognized("known").await.unwrap());
    assert!(!gate.is_recognized("unknown").await.unwrap(), "404 is a normal negative");

    let err = gate.is_recognized("broken").await.unwrap_err();
    match err {
        IntegrityError::UnexpectedStatus(status) => assert_eq!(status.as_u16(), 503),
        other => panic!("expected unexpected-status error, got {:?}", other),
    }

    let requests = captured.lock().unwrap();
    let paths: Vec<&str> = requests.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(
        paths,
        vec!["/check_releases/known", "/check_releases/unknown", "/check_releases/broken"]
    );
    assert!(requests.iter().all(|r| r.method == "GET"));
}

#[tokio::test]
async fn test_gate_unreachable_is_an_error() {
    let gate = IntegrityGate::new("http://127.0.0.1:1").unwrap();
    let err = gate.is_recognized("abc").await.unwrap_err();
    assert!(matches!(err, IntegrityError::Request(_)));
}
