pub const CONFIG_FILE_NAME: &str = "flatpak-runner.toml";

pub const BUNDLE: &str = "com.System76.CosmicAppLibrary.flatpak";
pub const MANIFEST_PATH: &str = "com.System76.CosmicAppLibrary.json";
pub const FLATPAK_MODULE: &str = "cosmic-app-library";
pub const APP_ID: &str = "com.System76.CosmicAppLibrary";
pub const RUNTIME_REPO: &str = "https://flathub.org/repo/flathub.flatpakrepo";

pub const STATE_DIR: &str = ".flatpak-builder";
pub const BUILD_DIR: &str = "flatpak_app";
pub const REPO_DIR: &str = "repo";

/// Environment variable that overrides the configured branch.
pub const BRANCH_ENV: &str = "BRANCH";
