use std::path::Path;
use types::{config::BuildConfig, defaults};

use super::execute::{Invocation, Privilege};

pub const FLATPAK_BUILDER: &str = "flatpak-builder";

/// Builder for a `flatpak-builder` command line.
///
/// Flags are emitted in a fixed order: the pre-manifest options, the build
/// directory, `--repo`, the optional `--default-branch`, the manifest, then
/// the post-manifest options.
///
/// # Examples
///
/// ```
/// use flatpak::flatpak_builder::FlatpakBuilder;
/// let args = FlatpakBuilder::new()
///     .user()
///     .build_dir("flatpak_app")
///     .manifest("org.example.App.json")
///     .install()
///     .build_args();
/// assert_eq!(args, vec!["--user", "flatpak_app", "org.example.App.json", "--install"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatpakBuilder {
    keep_build_dirs: bool,
    user: bool,
    disable_rofiles_fuse: bool,
    state_dir: Option<String>,
    build_dir: Option<String>,
    repo: Option<String>,
    default_branch: Option<String>,
    manifest: Option<String>,
    force_clean: bool,
    install: bool,
    system: bool,
    delete_build_dirs: bool,
    env: Vec<(String, String)>,
}

impl FlatpakBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// `--keep-build-dirs`
    pub fn keep_build_dirs(mut self) -> Self {
        self.keep_build_dirs = true;
        self
    }

    /// `--user`
    pub fn user(mut self) -> Self {
        self.user = true;
        self
    }

    /// `--disable-rofiles-fuse`
    pub fn disable_rofiles_fuse(mut self) -> Self {
        self.disable_rofiles_fuse = true;
        self
    }

    /// `--state-dir=<dir>`
    pub fn state_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.state_dir = Some(dir.as_ref().to_string_lossy().into_owned());
        self
    }

    pub fn build_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.build_dir = Some(dir.as_ref().to_string_lossy().into_owned());
        self
    }

    /// `--repo=<dir>`
    pub fn repo<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.repo = Some(dir.as_ref().to_string_lossy().into_owned());
        self
    }

    /// `--default-branch=<branch>`, left out entirely when `None`.
    pub fn default_branch<S: AsRef<str>>(mut self, branch: Option<S>) -> Self {
        self.default_branch = branch.map(|b| b.as_ref().to_string());
        self
    }

    pub fn manifest<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.manifest = Some(path.as_ref().to_string_lossy().into_owned());
        self
    }

    /// `--force-clean`
    pub fn force_clean(mut self) -> Self {
        self.force_clean = true;
        self
    }

    /// `--install`
    pub fn install(mut self) -> Self {
        self.install = true;
        self
    }

    /// `--system`
    pub fn system(mut self) -> Self {
        self.system = true;
        self
    }

    /// `--delete-build-dirs`
    pub fn delete_build_dirs(mut self) -> Self {
        self.delete_build_dirs = true;
        self
    }

    /// Exports a variable to the builder process.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.keep_build_dirs {
            args.push("--keep-build-dirs".to_string());
        }
        if self.user {
            args.push("--user".to_string());
        }
        if self.disable_rofiles_fuse {
            args.push("--disable-rofiles-fuse".to_string());
        }
        if let Some(dir) = &self.state_dir {
            args.push(format!("--state-dir={}", dir));
        }
        if let Some(dir) = &self.build_dir {
            args.push(dir.clone());
        }
        if let Some(repo) = &self.repo {
            args.push(format!("--repo={}", repo));
        }
        if let Some(branch) = &self.default_branch {
            args.push(format!("--default-branch={}", branch));
        }
        if let Some(manifest) = &self.manifest {
            args.push(manifest.clone());
        }
        if self.force_clean {
            args.push("--force-clean".to_string());
        }
        if self.install {
            args.push("--install".to_string());
        }
        if self.system {
            args.push("--system".to_string());
        }
        if self.delete_build_dirs {
            args.push("--delete-build-dirs".to_string());
        }

        args
    }

    pub fn invocation(&self, privilege: Privilege) -> Invocation {
        self.env.iter().fold(
            Invocation::new(FLATPAK_BUILDER, self.build_args(), privilege),
            |invocation, (key, value)| invocation.env(key.as_str(), value.as_str()),
        )
    }
}

impl From<&BuildConfig> for FlatpakBuilder {
    /// The clean rebuild-and-install command for `config`.
    fn from(config: &BuildConfig) -> Self {
        let mut builder = FlatpakBuilder::new()
            .keep_build_dirs()
            .user()
            .disable_rofiles_fuse();
        // flatpak-builder already uses ./.flatpak-builder on its own
        if config.state_dir.as_path() != Path::new(defaults::STATE_DIR) {
            builder = builder.state_dir(&config.state_dir);
        }

        config.exported_env().into_iter().fold(
            builder
                .build_dir(&config.build_dir)
                .repo(&config.repo_dir)
                .default_branch(config.branch.as_deref())
                .manifest(&config.manifest_path)
                .force_clean()
                .install()
                .system()
                .delete_build_dirs(),
            |builder, (key, value)| builder.env(key, value),
        )
    }
}
