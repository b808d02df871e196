use std::process::Command;

#[test]
fn test_missing_configuration_reported_on_stdout() {
    let output = Command::new(env!("CARGO_BIN_EXE_provider-publisher"))
        .env_clear()
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("❌ Error"));
    assert!(stdout.contains("TF_TOKEN is not set"));
}

#[test]
fn test_dry_run_exits_zero_without_network() {
    let dist = tempfile::TempDir::new().unwrap();
    let archive = dist.path().join("acme_1.2.0_linux_amd64.zip");
    std::fs::write(&archive, b"zip").unwrap();
    // Digest of an archive from another build; ours is unlisted.
    let digest = "d9298a10d1b0735837dc4bd85dac641b0f3cef27a47e5d53a54f2f3f5b2fcffa";
    std::fs::write(
        dist.path().join("acme_1.2.0_SHA256SUMS"),
        format!("{}  other_1.2.0_linux_amd64.zip\n", digest),
    )
    .unwrap();
    std::fs::write(dist.path().join("acme_1.2.0_SHA256SUMS.sig"), b"sig").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_provider-publisher"))
        .env_clear()
        .env("TF_TOKEN", "test-token-123456")
        .env("KEY_ID", "34365D9472D7468F")
        .env("TF_API_URL", "http://127.0.0.1:9/api")
        .env("DIST_DIR", dist.path())
        .env("PUBLISH_DRY_RUN", "true")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Dry run completed"));
    assert!(stdout.contains("not listed in the checksum manifest"));
}
