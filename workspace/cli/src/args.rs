use clap::Parser;

/// Clean rebuild of a Flatpak app with flatpak-builder, installed into the
/// system store. BRANCH in the environment overrides the default branch.
#[derive(Debug, Parser)]
#[clap(author, version, about)]
pub struct FlatpakRunnerArgs {
    /// location of flatpak-runner config_file, either full path
    /// or directory to flatpak-runner.toml is located
    /// if not given current directory is searched for flatpak-runner.toml,
    /// falling back to built-in defaults.
    /// relative paths in the file are resolved against its directory
    #[clap(long)]
    pub config: Option<String>,

    /// print the flatpak-builder command instead of running it
    #[clap(long)]
    pub dry_run: bool,
}
