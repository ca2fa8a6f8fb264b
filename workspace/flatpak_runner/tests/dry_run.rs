use std::fs;
use std::process::{Command, Output};
use tempfile::{TempDir, tempdir};

fn flatpak_runner(dir: &TempDir, args: &[&str], branch: Option<&str>) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_flatpak-runner"));
    command
        .args(args)
        .current_dir(dir.path())
        .env("RUST_LOG", "error")
        .env_remove("BRANCH");
    if let Some(branch) = branch {
        command.env("BRANCH", branch);
    }
    command.output().expect("Failed to run flatpak-runner")
}

#[test]
fn test_dry_run_prints_default_command() {
    let dir = tempdir().unwrap();
    let output = flatpak_runner(&dir, &["--dry-run"], None);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim(),
        "sudo -S --preserve-env=BUNDLE,MANIFEST_PATH,FLATPAK_MODULE,APP_ID,RUNTIME_REPO \
         flatpak-builder --keep-build-dirs --user --disable-rofiles-fuse flatpak_app \
         --repo=repo com.System76.CosmicAppLibrary.json --force-clean --install --system \
         --delete-build-dirs"
    );
}

#[test]
fn test_dry_run_with_branch() {
    let dir = tempdir().unwrap();
    let output = flatpak_runner(&dir, &["--dry-run"], Some("foo"));

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(" --repo=repo --default-branch=foo com.System76.CosmicAppLibrary.json "));
}

#[test]
fn test_dry_run_leaves_cache_alone() {
    let dir = tempdir().unwrap();
    let cache = dir.path().join(".flatpak-builder");
    fs::create_dir_all(&cache).unwrap();

    let output = flatpak_runner(&dir, &["--dry-run"], None);

    assert!(output.status.success());
    assert!(cache.exists());
}

#[test]
fn test_invalid_config_exits_with_one() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("flatpak-runner.toml"), "[build]\nbundle = 3\n").unwrap();

    let output = flatpak_runner(&dir, &["--dry-run"], None);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to run"));
}
