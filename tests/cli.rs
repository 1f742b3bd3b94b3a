use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

const PASSWORD: &str = "correct-horse-battery";

fn bin() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("deadbolt"));
    cmd.env("DEADBOLT_ARGON2_TEST_PARAMS", "1")
        .env_remove("DEADBOLT_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn encrypt_and_decrypt_roundtrip() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("secret.txt");
    fs::write(&file, b"hello world").unwrap();

    // encrypt
    bin()
        .env("DEADBOLT_PASSWORD", PASSWORD)
        .arg("encrypt")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Successfully encrypted file"))
        .stdout(predicate::str::contains("secret.txt.deadbolt"));

    let encrypted = dir.path().join("secret.txt.deadbolt");
    assert!(encrypted.exists());
    fs::remove_file(&file).unwrap();

    // decrypt
    bin()
        .env("DEADBOLT_PASSWORD", PASSWORD)
        .arg("decrypt")
        .arg(&encrypted)
        .assert()
        .success()
        .stdout(predicate::str::contains("Successfully decrypted file"));

    assert_eq!(fs::read(&file).unwrap(), b"hello world");
}

#[test]
fn file_flag_and_password_flag_work() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("data.bin");
    fs::write(&file, [0u8, 1, 2, 3]).unwrap();

    bin()
        .arg("encrypt")
        .arg("--file")
        .arg(&file)
        .arg("--password")
        .arg(PASSWORD)
        .assert()
        .success();

    assert!(dir.path().join("data.bin.deadbolt").exists());
}

#[test]
fn piped_password_is_accepted() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("data.txt");
    fs::write(&file, b"piped").unwrap();

    bin()
        .arg("encrypt")
        .arg(&file)
        .write_stdin(format!("{PASSWORD}\n"))
        .assert()
        .success();

    assert!(dir.path().join("data.txt.deadbolt").exists());
}

#[test]
fn wrong_password_fails() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("secret.txt");
    fs::write(&file, b"hello world").unwrap();

    bin()
        .env("DEADBOLT_PASSWORD", PASSWORD)
        .arg("encrypt")
        .arg(&file)
        .assert()
        .success();

    bin()
        .env("DEADBOLT_PASSWORD", "wrong-password")
        .arg("decrypt")
        .arg(dir.path().join("secret.txt.deadbolt"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Decryption failed:"))
        .stderr(predicate::str::contains(
            "Is the password correct? The file may also be corrupted.",
        ));

    assert!(!dir.path().join("secret-1.txt").exists());
}

#[test]
fn short_password_fails() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("secret.txt");
    fs::write(&file, b"hello world").unwrap();

    bin()
        .env("DEADBOLT_PASSWORD", "short")
        .arg("encrypt")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Password must be at least 8 characters",
        ));

    assert!(!dir.path().join("secret.txt.deadbolt").exists());
}

#[test]
fn decrypt_rejects_unknown_extension() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("secret.txt");
    fs::write(&file, b"hello world").unwrap();

    bin()
        .env("DEADBOLT_PASSWORD", PASSWORD)
        .arg("decrypt")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("File is not an encrypted file"))
        .stderr(predicate::str::contains("Received: secret.txt"));
}

#[test]
fn missing_file_fails() {
    let dir = tempdir().unwrap();

    bin()
        .env("DEADBOLT_PASSWORD", PASSWORD)
        .arg("encrypt")
        .arg(dir.path().join("missing.txt"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("File not found"));
}

#[test]
fn folder_encryption_leaves_no_archive() {
    let dir = tempdir().unwrap();
    let folder = dir.path().join("docs");
    fs::create_dir(&folder).unwrap();
    fs::write(folder.join("a.txt"), b"alpha").unwrap();

    bin()
        .env("DEADBOLT_PASSWORD", PASSWORD)
        .arg("encrypt")
        .arg(&folder)
        .assert()
        .success()
        .stdout(predicate::str::contains("docs.zip.deadbolt"));

    assert!(dir.path().join("docs.zip.deadbolt").exists());
    assert!(!dir.path().join("docs.zip").exists());
}

#[test]
fn output_flag_moves_result() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("secret.txt");
    fs::write(&file, b"hello world").unwrap();
    let target = dir.path().join("elsewhere.deadbolt");

    bin()
        .env("DEADBOLT_PASSWORD", PASSWORD)
        .arg("encrypt")
        .arg(&file)
        .arg("-o")
        .arg(&target)
        .assert()
        .success();

    assert!(target.exists());
    assert!(!dir.path().join("secret.txt.deadbolt").exists());
}

#[test]
fn output_flag_requires_existing_directory() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("secret.txt");
    fs::write(&file, b"hello world").unwrap();

    bin()
        .env("DEADBOLT_PASSWORD", PASSWORD)
        .arg("encrypt")
        .arg(&file)
        .arg("-o")
        .arg(dir.path().join("missing").join("out.deadbolt"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Output directory does not exist"));
}

#[test]
fn unsupported_version_fails() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("future.txt.deadbolt");
    let mut data = b"DEADBOLT_V999".to_vec();
    data.resize(128, 0);
    fs::write(&file, data).unwrap();

    bin()
        .env("DEADBOLT_PASSWORD", PASSWORD)
        .arg("decrypt")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "is detected as being V999, which is not a supported value. Valid values: 001, 002.",
        ));
}

#[test]
fn truncated_file_reports_missing_metadata() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("short.txt.deadbolt");
    fs::write(&file, [7u8; 40]).unwrap();

    bin()
        .env("DEADBOLT_PASSWORD", PASSWORD)
        .arg("decrypt")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("is missing metadata."));
}
