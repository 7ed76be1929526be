use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn tubeframes() -> Command {
    let mut cmd = Command::cargo_bin("tubeframes").unwrap();
    cmd.env_remove("TUBEFRAMES_CONFIG").env("RUST_LOG", "off");
    cmd
}

/// Config file pointing every tool at a path that does not exist
fn offline_config(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("config.yaml");
    fs_err::write(
        &path,
        "tools:\n  yt_dlp: /nonexistent/yt-dlp\n  ffmpeg: /nonexistent/ffmpeg\n  ffprobe: /nonexistent/ffprobe\n",
    )
    .unwrap();
    path
}

#[test]
fn help_lists_subcommands() {
    tubeframes()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("transcript").and(predicate::str::contains("frames")));
}

#[test]
fn unsupported_url_is_an_invalid_reference() {
    let dir = TempDir::new().unwrap();
    tubeframes()
        .arg("--config")
        .arg(offline_config(&dir))
        .args(["transcript", "https://vimeo.com/123456"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid video reference"));
}

#[test]
fn missing_reference_is_an_invalid_reference() {
    let dir = TempDir::new().unwrap();
    tubeframes()
        .arg("--config")
        .arg(offline_config(&dir))
        .arg("frames")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid video reference"));
}

#[test]
fn zero_interval_is_rejected_before_download() {
    let dir = TempDir::new().unwrap();
    tubeframes()
        .arg("--config")
        .arg(offline_config(&dir))
        .args(["frames", "--id", "ABCDEFGHIJK", "--interval", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid parameters"));
}

#[test]
fn max_frames_above_limit_is_rejected() {
    let dir = TempDir::new().unwrap();
    tubeframes()
        .arg("--config")
        .arg(offline_config(&dir))
        .args(["frames", "https://youtu.be/ABCDEFGHIJK", "--max-frames", "501"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_frames must be between 1 and 500"));
}

#[test]
fn config_show_and_init() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("tubeframes.yaml");

    tubeframes()
        .arg("--config")
        .arg(&path)
        .args(["config", "--init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration written to"));
    assert!(path.exists());

    tubeframes()
        .arg("--config")
        .arg(&path)
        .args(["config", "--show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Current Configuration").and(predicate::str::contains("720p")));
}

#[test]
fn tools_reports_missing_binaries() {
    let dir = TempDir::new().unwrap();
    tubeframes()
        .arg("--config")
        .arg(offline_config(&dir))
        .arg("tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("missing"));
}
