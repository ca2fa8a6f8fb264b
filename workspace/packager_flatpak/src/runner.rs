use flatpak::{
    execute::{CommandRunner, Invocation, Privilege, SystemRunner},
    flatpak_builder::FlatpakBuilder,
};
use log::{error, info, warn};
use types::config::BuildConfig;

use crate::{
    build_pipeline::{BuildError, BuildStep},
    steps::clean_builder_cache::CleanBuilderCache,
};

/// Cleans the builder cache, runs flatpak-builder, cleans again, and hands
/// back the builder's exit code.
///
/// The second cleanup runs whatever the build did, including when the
/// process could not be spawned. Cleanup failures are logged and ignored.
pub struct BuildRunner<R, S> {
    config: BuildConfig,
    privilege: Privilege,
    runner: R,
    cleanup: S,
}

impl BuildRunner<SystemRunner, CleanBuilderCache> {
    /// Runner that spawns the real builder through sudo.
    pub fn system(config: BuildConfig) -> Self {
        let cleanup = CleanBuilderCache::from(&config);
        BuildRunner::new(config, SystemRunner::new(), cleanup)
    }
}

impl<R: CommandRunner, S: BuildStep> BuildRunner<R, S> {
    /// The install targets the system store, so the builder runs elevated
    /// unless [`BuildRunner::with_privilege`] says otherwise.
    pub fn new(config: BuildConfig, runner: R, cleanup: S) -> Self {
        BuildRunner {
            config,
            privilege: Privilege::Elevated,
            runner,
            cleanup,
        }
    }

    pub fn with_privilege(mut self, privilege: Privilege) -> Self {
        self.privilege = privilege;
        self
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn invocation(&self) -> Invocation {
        FlatpakBuilder::from(&self.config).invocation(self.privilege)
    }

    pub fn run(&self) -> Result<i32, BuildError> {
        self.clean_cache();

        let invocation = self.invocation();
        info!("Running: {}", invocation);
        let result = self.runner.run(&invocation);

        self.clean_cache();

        let code = result?;
        if code == 0 {
            info!("Built and installed {}", self.config.app_id);
        } else {
            error!("{} exited with code {}", invocation.program(), code);
        }
        Ok(code)
    }

    fn clean_cache(&self) {
        if let Err(err) = self.cleanup.step() {
            warn!("Ignoring failure to remove builder cache: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flatpak::execute::ExecuteError;
    use std::{cell::RefCell, fs, io, rc::Rc};
    use tempfile::tempdir;
    use test_case::test_case;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Clean,
        Build(Vec<String>),
    }

    type Events = Rc<RefCell<Vec<Event>>>;

    enum Outcome {
        Exit(i32),
        SpawnFailure,
    }

    struct MockRunner {
        events: Events,
        outcome: Outcome,
    }

    impl CommandRunner for MockRunner {
        fn run(&self, invocation: &Invocation) -> Result<i32, ExecuteError> {
            self.events
                .borrow_mut()
                .push(Event::Build(invocation.command_line()));
            match self.outcome {
                Outcome::Exit(code) => Ok(code),
                Outcome::SpawnFailure => Err(ExecuteError::Spawn(
                    "sudo".to_string(),
                    io::Error::new(io::ErrorKind::NotFound, "not found"),
                )),
            }
        }
    }

    struct MockCleanup {
        events: Events,
        fail: bool,
    }

    impl BuildStep for MockCleanup {
        fn step(&self) -> Result<(), BuildError> {
            self.events.borrow_mut().push(Event::Clean);
            if self.fail {
                Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied").into())
            } else {
                Ok(())
            }
        }
    }

    fn mock_runner(
        config: BuildConfig,
        outcome: Outcome,
        fail_cleanup: bool,
    ) -> (BuildRunner<MockRunner, MockCleanup>, Events) {
        let events = Events::default();
        let runner = BuildRunner::new(
            config,
            MockRunner {
                events: events.clone(),
                outcome,
            },
            MockCleanup {
                events: events.clone(),
                fail: fail_cleanup,
            },
        );
        (runner, events)
    }

    fn config() -> BuildConfig {
        BuildConfig::builtin().unwrap()
    }

    fn cleanups(events: &Events) -> usize {
        events
            .borrow()
            .iter()
            .filter(|event| **event == Event::Clean)
            .count()
    }

    #[test_case(0 ; "success")]
    #[test_case(1 ; "failure")]
    #[test_case(137 ; "killed")]
    fn test_exit_code_is_propagated(code: i32) {
        let (runner, _events) = mock_runner(config(), Outcome::Exit(code), false);
        assert_eq!(runner.run().unwrap(), code);
    }

    #[test_case(Outcome::Exit(0) ; "success")]
    #[test_case(Outcome::Exit(1) ; "failure")]
    #[test_case(Outcome::SpawnFailure ; "spawn failure")]
    fn test_cache_cleaned_twice(outcome: Outcome) {
        let (runner, events) = mock_runner(config(), outcome, false);
        let _ = runner.run();
        assert_eq!(cleanups(&events), 2);
    }

    #[test]
    fn test_clean_build_clean_order() {
        let (runner, events) = mock_runner(config(), Outcome::Exit(0), false);
        runner.run().unwrap();

        let events = events.borrow();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], Event::Clean);
        assert!(matches!(events[1], Event::Build(_)));
        assert_eq!(events[2], Event::Clean);
    }

    #[test]
    fn test_spawn_failure_is_an_error() {
        let (runner, _events) = mock_runner(config(), Outcome::SpawnFailure, false);
        assert!(matches!(
            runner.run(),
            Err(BuildError::ExecuteError(ExecuteError::Spawn(_, _)))
        ));
    }

    #[test]
    fn test_cleanup_failure_is_ignored() {
        let (runner, events) = mock_runner(config(), Outcome::Exit(3), true);
        assert_eq!(runner.run().unwrap(), 3);
        assert_eq!(cleanups(&events), 2);
    }

    #[test]
    fn test_branch_flag_only_when_set() {
        let (runner, events) = mock_runner(config(), Outcome::Exit(0), false);
        runner.run().unwrap();
        let (branched, branched_events) = mock_runner(
            config().with_branch_override(Some("foo".to_string())),
            Outcome::Exit(0),
            false,
        );
        branched.run().unwrap();

        let Event::Build(plain) = events.borrow()[1].clone() else {
            panic!("expected a build event");
        };
        let Event::Build(with_branch) = branched_events.borrow()[1].clone() else {
            panic!("expected a build event");
        };
        assert!(!plain.iter().any(|arg| arg.starts_with("--default-branch")));
        assert!(with_branch.contains(&"--default-branch=foo".to_string()));
    }

    #[test]
    fn test_repeated_runs_issue_same_command() {
        let (runner, events) = mock_runner(config(), Outcome::Exit(0), false);
        runner.run().unwrap();
        runner.run().unwrap();

        let events = events.borrow();
        assert_eq!(events.len(), 6);
        assert_eq!(events[1], events[4]);
    }

    #[test]
    fn test_runs_elevated_by_default() {
        let (runner, _events) = mock_runner(config(), Outcome::Exit(0), false);
        assert_eq!(runner.invocation().privilege(), Privilege::Elevated);
        assert_eq!(runner.invocation().command_line()[0], "sudo");

        let runner = runner.with_privilege(Privilege::Unprivileged);
        assert_eq!(runner.invocation().command_line()[0], "flatpak-builder");
    }

    struct ScriptRunner {
        state_dir_existed: RefCell<Option<bool>>,
        state_dir: std::path::PathBuf,
    }

    impl CommandRunner for ScriptRunner {
        fn run(&self, _invocation: &Invocation) -> Result<i32, ExecuteError> {
            *self.state_dir_existed.borrow_mut() = Some(self.state_dir.exists());
            fs::create_dir_all(self.state_dir.join("build")).map_err(|err| {
                ExecuteError::Spawn("flatpak-builder".to_string(), err)
            })?;
            Ok(1)
        }
    }

    #[test]
    fn test_real_cache_removed_around_build() {
        let dir = tempdir().unwrap();
        let mut config = config();
        config.state_dir = dir.path().join(".flatpak-builder");
        fs::create_dir_all(config.state_dir.join("downloads")).unwrap();

        let cleanup = CleanBuilderCache::from(&config);
        let script = ScriptRunner {
            state_dir_existed: RefCell::new(None),
            state_dir: config.state_dir.clone(),
        };
        let state_dir = config.state_dir.clone();
        let runner = BuildRunner::new(config, script, cleanup);

        assert_eq!(runner.run().unwrap(), 1);
        assert_eq!(*runner.runner.state_dir_existed.borrow(), Some(false));
        assert!(!state_dir.exists());
    }
}
