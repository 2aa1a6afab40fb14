//! Install orchestration: check converter, convert the package, install it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use super::error::{InstallError, JobFailure, Result};
use super::event::{JobEvent, LogLine};
use super::job::{InstallJob, JobState};
use super::lock::JobLock;
use super::paths;
use super::runner::{CommandRunner, CommandSpec, CommandStatus};
use crate::config::Config;

const TOTAL_STEPS: usize = 4;
const RULE_WIDTH: usize = 50;
const FAILURE_TAIL_LINES: usize = 10;
const WORKDIR_PREFIX: &str = "deb_installer_";

/// Runs one install job at a time through a [`CommandRunner`].
///
/// Every change to the job is also sent as a [`JobEvent`] when an event
/// channel is attached, so a display can follow along from another thread.
pub struct Orchestrator<R: CommandRunner> {
    config: Config,
    runner: R,
    events: Option<mpsc::Sender<JobEvent>>,
    lock_dir: Option<PathBuf>,
    work_root: Option<PathBuf>,
    job: Option<InstallJob>,
    workdir: Option<TempDir>,
}

impl<R: CommandRunner> Orchestrator<R> {
    pub fn new(config: Config, runner: R) -> Self {
        Self {
            config,
            runner,
            events: None,
            lock_dir: None,
            work_root: None,
            job: None,
            workdir: None,
        }
    }

    pub fn with_events(mut self, events: mpsc::Sender<JobEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Hold an exclusive lock in `dir` while a job runs.
    pub fn with_lock_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.lock_dir = Some(dir.into());
        self
    }

    /// Create work directories under `dir` instead of the system temp dir.
    pub fn with_work_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_root = Some(dir.into());
        self
    }

    pub fn job(&self) -> Option<&InstallJob> {
        self.job.as_ref()
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn into_job(self) -> Option<InstallJob> {
        self.job
    }

    /// Install the `.deb` at `path`. Replaces any previous job.
    pub fn run(&mut self, path: &Path) -> Result<()> {
        let job = InstallJob::new(path.to_path_buf());
        let id = job.id();
        self.job = Some(job);
        self.record(JobEvent::Started {
            id,
            source: path.to_path_buf(),
        });
        tracing::info!("Starting install job {} for {}", id, path.display());

        let started = Instant::now();
        let result = self.execute(path, started);
        self.cleanup_workdir();

        match &result {
            Ok(()) => {
                tracing::info!("Install job {} finished in {:.1}s", id, secs(started));
                self.transition(JobState::Done);
                self.record(JobEvent::Finished(None));
            }
            Err(e) => {
                tracing::error!("Install job {} failed: {}", id, e);
                self.system(format!("✗ {} (after {:.1}s)", e, secs(started)));
                let tail = self
                    .job
                    .as_ref()
                    .map(|j| j.process_tail(FAILURE_TAIL_LINES))
                    .unwrap_or_default();
                let failure = JobFailure {
                    kind: e.kind(),
                    message: e.to_string(),
                    tail,
                };
                self.transition(JobState::Failed(e.kind()));
                self.record(JobEvent::Finished(Some(failure)));
            }
        }

        result
    }

    fn execute(&mut self, path: &Path, started: Instant) -> Result<()> {
        let source = paths::validate_input(path)?;
        let _lock = self.lock_dir.as_deref().map(JobLock::acquire).transpose()?;
        self.log_header(&source)?;

        let converter = self.config.converter.clone();
        self.transition(JobState::CheckingConverter);
        self.step(1, &format!("Checking {}", converter));
        let step = Instant::now();
        self.ensure_converter()?;
        self.system(format!("✓ {} ready ({:.1}s)", converter, secs(step)));

        self.transition(JobState::Converting);
        self.step(2, "Preparing workspace");
        let local = self.prepare_workspace(&source)?;

        self.step(3, "Converting package");
        let step = Instant::now();
        let artifact = self.convert(&local)?;
        self.system(format!("✓ Conversion completed in {:.1}s", secs(step)));

        self.transition(JobState::Installing);
        self.step(4, "Installing package");
        let step = Instant::now();
        self.install_artifact(&artifact)?;
        self.system(format!("✓ Installation completed in {:.1}s", secs(step)));

        self.system(rule());
        self.system("SUCCESS");
        self.system(rule());
        self.system(format!("Total time: {:.1} seconds", secs(started)));
        Ok(())
    }

    fn log_header(&mut self, source: &Path) -> Result<()> {
        let bytes = fs::metadata(source)?.len();
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.system(format!("Package: {}", name));
        self.system(format!("Size: {:.1} MB", paths::size_mb(bytes)));
        self.system(format!(
            "Estimated time: ~{} seconds",
            paths::estimate_seconds(bytes)
        ));
        Ok(())
    }

    fn ensure_converter(&mut self) -> Result<()> {
        let converter = self.config.converter.clone();
        if let Some(found) = self.runner.resolve(&converter) {
            self.system(format!("✓ {} found at {}", converter, found.display()));
            return Ok(());
        }

        self.system(format!(
            "✗ {} not found, attempting auto-install",
            converter
        ));
        self.transition(JobState::InstallingConverter);

        let helper = self
            .config
            .aur_helpers
            .iter()
            .find(|h| self.runner.resolve(&h.name).is_some())
            .cloned();

        let Some(helper) = helper else {
            let tried: Vec<String> = self
                .config
                .aur_helpers
                .iter()
                .map(|h| h.name.clone())
                .collect();
            self.system("✗ No AUR helper available. Checked:");
            for name in &tried {
                self.system(format!("   ✗ {} - not found", name));
            }
            self.system(format!("Install {} manually:", converter));
            self.system(format!("   yay -S {}", converter));
            self.system(format!("   sudo {} -u", converter));
            return Err(InstallError::PrerequisiteMissing {
                converter,
                tried: tried.join(", "),
            });
        };

        self.system(format!("Found {}, installing {}...", helper.name, converter));
        let spec = CommandSpec::new(&helper.name)
            .args(helper.args.iter().cloned())
            .arg(&converter)
            .elevated();
        let status = self.stream(&spec).map_err(|e| InstallError::Setup {
            converter: converter.clone(),
            reason: format!("could not start {}: {}", helper.name, e),
        })?;
        cancelled(status)?;
        if !status.success() {
            return Err(InstallError::Setup {
                converter,
                reason: format!("{} failed with {}", helper.name, status),
            });
        }

        if self.runner.resolve(&converter).is_none() {
            return Err(InstallError::Setup {
                reason: format!(
                    "{} finished but {} is still not on PATH",
                    helper.name, converter
                ),
                converter,
            });
        }
        self.system(format!("✓ {} installed", converter));

        if self.config.update_converter_database {
            self.update_converter_database(&converter)?;
        }
        Ok(())
    }

    /// A failed database refresh leaves a usable converter, so it only warns.
    fn update_converter_database(&mut self, converter: &str) -> Result<()> {
        self.system(format!("Updating {} database...", converter));
        let spec = CommandSpec::new(converter).arg("-u").elevated();
        match self.stream(&spec) {
            Ok(status) if status.success() => {
                self.system(format!("✓ {} database updated", converter));
            }
            Ok(status) => {
                cancelled(status)?;
                self.system(format!(
                    "⚠ Database update failed with {}, continuing",
                    status
                ));
                self.system(format!("  Update it later with: sudo {} -u", converter));
            }
            Err(e) => {
                tracing::warn!("Could not start {} -u: {}", converter, e);
                self.system(format!("⚠ Could not update {} database: {}", converter, e));
            }
        }
        Ok(())
    }

    fn prepare_workspace(&mut self, source: &Path) -> Result<PathBuf> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKDIR_PREFIX);
        let dir = match &self.work_root {
            Some(root) => {
                fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        self.system(format!("Working directory: {}", dir.path().display()));

        let file_name = source.file_name().ok_or_else(|| {
            InstallError::InvalidInput(format!("{} has no file name", source.display()))
        })?;
        let local = dir.path().join(file_name);
        self.workdir = Some(dir);

        let step = Instant::now();
        fs::copy(source, &local)?;
        self.system(format!("✓ File copied in {:.1}s", secs(step)));
        Ok(local)
    }

    fn convert(&mut self, local: &Path) -> Result<PathBuf> {
        let converter = self.config.converter.clone();
        let workdir = local
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| InstallError::Conversion("package has no parent directory".into()))?;
        let file_name = local
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let package = paths::package_name(local);
        self.system(format!("Detected package name: {}", package));

        // Answers for debtap's prompts: package name, then empty maintainer and license.
        let mut spec = CommandSpec::new(&converter)
            .args(["-Q", file_name.as_str()])
            .cwd(&workdir)
            .env("DEBTAP_NOCOLOR", "1")
            .stdin(format!("{}\n\n\n", package));
        if self.config.conversion_timeout_secs > 0 {
            spec = spec.timeout(Duration::from_secs(self.config.conversion_timeout_secs));
        }

        let status = self.stream(&spec).map_err(|e| {
            InstallError::Conversion(format!("could not start {}: {}", converter, e))
        })?;
        cancelled(status)?;
        match status {
            CommandStatus::TimedOut => {
                return Err(InstallError::Conversion(format!(
                    "{} timed out after {} seconds",
                    converter, self.config.conversion_timeout_secs
                )));
            }
            s if !s.success() => {
                return Err(InstallError::Conversion(format!(
                    "{} failed with {}",
                    converter, s
                )));
            }
            _ => {}
        }

        let expected = paths::artifact_name(local, &self.config.artifact_extension)
            .ok_or_else(|| InstallError::Conversion("cannot derive package name".into()))?;
        match paths::find_artifact(&workdir, &expected)? {
            Some(artifact) => {
                let bytes = fs::metadata(&artifact)?.len();
                let name = artifact
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                self.system(format!(
                    "Generated: {} ({:.1} MB)",
                    name,
                    paths::size_mb(bytes)
                ));
                Ok(artifact)
            }
            None => {
                self.system("✗ No package file generated. Files in working directory:");
                for name in paths::list_dir(&workdir)? {
                    self.system(format!("  - {}", name));
                }
                Err(InstallError::Conversion(format!(
                    "{} produced no package file",
                    converter
                )))
            }
        }
    }

    fn install_artifact(&mut self, artifact: &Path) -> Result<()> {
        let manager = self.config.package_manager.clone();
        let spec = CommandSpec::new(&manager)
            .args(self.config.package_manager_args.iter().cloned())
            .arg(artifact.display().to_string())
            .elevated();

        let status = self
            .stream(&spec)
            .map_err(|e| InstallError::Install(format!("could not start {}: {}", manager, e)))?;
        cancelled(status)?;
        if !status.success() {
            return Err(InstallError::Install(format!(
                "{} failed with {}",
                manager, status
            )));
        }
        Ok(())
    }

    fn cleanup_workdir(&mut self) {
        let Some(dir) = self.workdir.take() else {
            return;
        };

        if self.config.keep_workdir {
            let path = dir.keep();
            self.system(format!("Keeping working directory {}", path.display()));
            return;
        }

        self.system("Cleaning up temporary files...");
        let path = dir.path().to_path_buf();
        match dir.close() {
            Ok(()) => self.system("✓ Cleanup complete"),
            Err(e) => {
                tracing::warn!("Failed to remove {}: {}", path.display(), e);
                self.system(format!("⚠ Could not remove {}: {}", path.display(), e));
            }
        }
    }

    /// Log the command line, then run it with each output line appended to
    /// the job log as it arrives.
    fn stream(&mut self, spec: &CommandSpec) -> io::Result<CommandStatus> {
        self.system(format!("$ {}", spec.display()));
        let Self {
            runner,
            job,
            events,
            ..
        } = self;
        let events = &*events;
        runner.run(spec, &mut |line| {
            record(job, events, JobEvent::Log(LogLine::process(line)));
        })
    }

    fn step(&mut self, index: usize, label: &str) {
        self.system(rule());
        self.system(format!("STEP {}/{}: {}", index, TOTAL_STEPS, label));
        self.system(rule());
    }

    fn transition(&mut self, state: JobState) {
        tracing::info!("Job state -> {:?}", state);
        self.record(JobEvent::StateChanged(state));
    }

    fn system(&mut self, text: impl Into<String>) {
        self.record(JobEvent::Log(LogLine::system(text)));
    }

    fn record(&mut self, event: JobEvent) {
        record(&mut self.job, &self.events, event);
    }
}

fn record(
    job: &mut Option<InstallJob>,
    events: &Option<mpsc::Sender<JobEvent>>,
    event: JobEvent,
) {
    if let Some(job) = job.as_mut() {
        job.apply(&event);
    }
    if let Some(tx) = events {
        // The display may already be gone; the job itself still runs to the end.
        let _ = tx.send(event);
    }
}

fn cancelled(status: CommandStatus) -> Result<()> {
    if status == CommandStatus::Aborted {
        return Err(InstallError::UserCancelled);
    }
    Ok(())
}

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

fn secs(since: Instant) -> f64 {
    since.elapsed().as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::install::error::FailureKind;
    use crate::install::event::LogSource;
    use std::collections::{HashMap, HashSet};

    const HELPERS: [&str; 3] = ["yay", "paru", "pamac"];

    #[derive(Default)]
    struct FakeRunner {
        available: HashSet<String>,
        exit_codes: HashMap<String, i32>,
        output: HashMap<String, Vec<String>>,
        skip_artifact: bool,
        fail_db_update: bool,
        invocations: Vec<CommandSpec>,
    }

    impl FakeRunner {
        fn with_programs(programs: &[&str]) -> Self {
            Self {
                available: programs.iter().map(|p| p.to_string()).collect(),
                ..Default::default()
            }
        }

        fn exit(mut self, program: &str, code: i32) -> Self {
            self.exit_codes.insert(program.to_string(), code);
            self
        }

        fn prints(mut self, program: &str, lines: &[&str]) -> Self {
            self.output.insert(
                program.to_string(),
                lines.iter().map(|l| l.to_string()).collect(),
            );
            self
        }

        fn count(&self, program: &str) -> usize {
            self.invocations.iter().filter(|s| s.program == program).count()
        }
    }

    impl CommandRunner for FakeRunner {
        fn resolve(&self, program: &str) -> Option<PathBuf> {
            self.available
                .contains(program)
                .then(|| PathBuf::from("/usr/bin").join(program))
        }

        fn run(
            &mut self,
            spec: &CommandSpec,
            on_line: &mut dyn FnMut(String),
        ) -> io::Result<CommandStatus> {
            self.invocations.push(spec.clone());
            for line in self.output.get(&spec.program).cloned().unwrap_or_default() {
                on_line(line);
            }

            let code = if self.fail_db_update && spec.args == ["-u"] {
                1
            } else {
                self.exit_codes.get(&spec.program).copied().unwrap_or(0)
            };
            if code == 0 {
                if spec.program == "debtap" && spec.args.first().map(String::as_str) == Some("-Q")
                {
                    if !self.skip_artifact {
                        let cwd = spec.cwd.clone().expect("conversion runs in the workdir");
                        let stem = spec.args[1].trim_end_matches(".deb");
                        fs::write(cwd.join(format!("{}.pkg.tar.zst", stem)), b"pkg")?;
                    }
                } else if HELPERS.contains(&spec.program.as_str()) {
                    self.available.insert("debtap".to_string());
                }
            }
            Ok(CommandStatus::Exited(code))
        }
    }

    fn write_deb(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"!<arch>\ndebian-binary").unwrap();
        path
    }

    fn orchestrator(runner: FakeRunner, work_root: &Path) -> Orchestrator<FakeRunner> {
        Orchestrator::new(Config::default(), runner).with_work_root(work_root)
    }

    fn texts(job: &InstallJob) -> Vec<String> {
        job.log().iter().map(|l| l.text.clone()).collect()
    }

    #[test]
    fn test_successful_install_with_converter_present() {
        let temp = tempfile::TempDir::new().unwrap();
        let deb = write_deb(temp.path(), "app.deb");
        let runner = FakeRunner::with_programs(&["debtap", "pacman"]);
        let mut orch = orchestrator(runner, &temp.path().join("work"));

        orch.run(&deb).unwrap();

        let job = orch.job().unwrap();
        assert_eq!(job.state(), JobState::Done);
        assert!(!job.log().is_empty());
        assert!(job.failure().is_none());

        let calls = &orch.runner().invocations;
        assert_eq!(calls.len(), 2);

        let convert = &calls[0];
        assert_eq!(convert.program, "debtap");
        assert_eq!(convert.args, ["-Q", "app.deb"]);
        assert_eq!(convert.stdin.as_deref(), Some("app\n\n\n"));
        assert!(!convert.elevated);
        assert!(convert
            .env
            .contains(&("DEBTAP_NOCOLOR".to_string(), "1".to_string())));
        assert_eq!(convert.timeout, Some(Duration::from_secs(300)));

        let install = &calls[1];
        assert_eq!(install.program, "pacman");
        assert!(install.elevated);
        assert_eq!(&install.args[..3], ["-U", "--noconfirm", "--needed"]);
        let artifact = PathBuf::from(&install.args[3]);
        assert_eq!(artifact.file_name().unwrap(), "app.pkg.tar.zst");
        assert_eq!(artifact.parent(), convert.cwd.as_deref());

        // Work directory is gone once the job ends.
        assert!(!convert.cwd.as_ref().unwrap().exists());
    }

    #[test]
    fn test_missing_converter_installed_with_first_available_helper() {
        let temp = tempfile::TempDir::new().unwrap();
        let deb = write_deb(temp.path(), "tool_2.0_amd64.deb");
        let runner = FakeRunner::with_programs(&["paru", "pamac", "pacman"]);
        let (tx, rx) = mpsc::channel();
        let mut orch = orchestrator(runner, temp.path()).with_events(tx);

        orch.run(&deb).unwrap();

        let programs: Vec<(String, Vec<String>, bool)> = orch
            .runner()
            .invocations
            .iter()
            .map(|s| (s.program.clone(), s.args.clone(), s.elevated))
            .collect();
        assert_eq!(
            programs[0],
            (
                "paru".to_string(),
                vec![
                    "-S".to_string(),
                    "--noconfirm".to_string(),
                    "debtap".to_string()
                ],
                true
            )
        );
        assert_eq!(
            programs[1],
            ("debtap".to_string(), vec!["-u".to_string()], true)
        );
        assert_eq!(programs[2].0, "debtap");
        assert_eq!(programs[2].1[0], "-Q");
        assert_eq!(orch.runner().invocations[2].stdin.as_deref(), Some("tool\n\n\n"));
        assert_eq!(programs[3].0, "pacman");
        assert_eq!(orch.runner().count("pamac"), 0);

        let states: Vec<JobState> = rx
            .try_iter()
            .filter_map(|e| match e {
                JobEvent::StateChanged(s) => Some(s),
                _ => None,
            })
            .collect();
        assert_eq!(
            states,
            [
                JobState::CheckingConverter,
                JobState::InstallingConverter,
                JobState::Converting,
                JobState::Installing,
                JobState::Done,
            ]
        );
    }

    #[test]
    fn test_no_helper_fails_before_conversion() {
        let temp = tempfile::TempDir::new().unwrap();
        let deb = write_deb(temp.path(), "app.deb");
        let runner = FakeRunner::with_programs(&["pacman"]);
        let mut orch = orchestrator(runner, temp.path());

        let err = orch.run(&deb).unwrap_err();

        assert_eq!(err.kind(), FailureKind::PrerequisiteMissing);
        assert!(err.to_string().contains("yay, paru, pamac"));
        assert_eq!(orch.runner().count("debtap"), 0);
        assert!(orch.runner().invocations.is_empty());

        let job = orch.job().unwrap();
        assert_eq!(job.state(), JobState::Failed(FailureKind::PrerequisiteMissing));
        assert!(texts(job).iter().any(|l| l.contains("yay - not found")));
    }

    #[test]
    fn test_helper_failure_is_setup_error() {
        let temp = tempfile::TempDir::new().unwrap();
        let deb = write_deb(temp.path(), "app.deb");
        let runner = FakeRunner::with_programs(&["yay", "pacman"])
            .exit("yay", 1)
            .prints("yay", &["error: target not found: debtap"]);
        let mut orch = orchestrator(runner, temp.path());

        let err = orch.run(&deb).unwrap_err();

        assert_eq!(err.kind(), FailureKind::SetupError);
        assert_eq!(orch.runner().count("debtap"), 0);
        assert_eq!(orch.runner().count("pacman"), 0);
        let failure = orch.job().unwrap().failure().unwrap();
        assert_eq!(failure.tail, ["error: target not found: debtap"]);
    }

    #[test]
    fn test_database_update_failure_only_warns() {
        let temp = tempfile::TempDir::new().unwrap();
        let deb = write_deb(temp.path(), "app.deb");
        let mut runner = FakeRunner::with_programs(&["yay", "pacman"]);
        runner.fail_db_update = true;
        let mut orch = orchestrator(runner, temp.path());

        orch.run(&deb).unwrap();

        let job = orch.job().unwrap();
        assert_eq!(job.state(), JobState::Done);
        assert!(texts(job)
            .iter()
            .any(|l| l.starts_with("⚠ Database update failed with exit code 1")));
    }

    #[test]
    fn test_database_update_can_be_disabled() {
        let temp = tempfile::TempDir::new().unwrap();
        let deb = write_deb(temp.path(), "app.deb");
        let config = Config {
            update_converter_database: false,
            ..Config::default()
        };
        let runner = FakeRunner::with_programs(&["yay", "pacman"]);
        let mut orch = Orchestrator::new(config, runner).with_work_root(temp.path());

        orch.run(&deb).unwrap();

        assert!(!orch
            .runner()
            .invocations
            .iter()
            .any(|s| s.args == ["-u"]));
    }

    #[test]
    fn test_conversion_failure_skips_install() {
        let temp = tempfile::TempDir::new().unwrap();
        let deb = write_deb(temp.path(), "app.deb");
        let runner = FakeRunner::with_programs(&["debtap", "pacman"])
            .exit("debtap", 2)
            .prints("debtap", &["==> Extracting package data...", "Error: bad archive"]);
        let mut orch = orchestrator(runner, temp.path());

        let err = orch.run(&deb).unwrap_err();

        assert_eq!(err.kind(), FailureKind::ConversionError);
        assert!(err.to_string().contains("exit code 2"));
        assert_eq!(orch.runner().count("pacman"), 0);

        let job = orch.job().unwrap();
        assert_eq!(job.state(), JobState::Failed(FailureKind::ConversionError));
        assert_eq!(
            job.failure().unwrap().tail,
            ["==> Extracting package data...", "Error: bad archive"]
        );
    }

    #[test]
    fn test_conversion_without_artifact_fails() {
        let temp = tempfile::TempDir::new().unwrap();
        let deb = write_deb(temp.path(), "app.deb");
        let mut runner = FakeRunner::with_programs(&["debtap", "pacman"]);
        runner.skip_artifact = true;
        let mut orch = orchestrator(runner, temp.path());

        let err = orch.run(&deb).unwrap_err();

        assert_eq!(err.kind(), FailureKind::ConversionError);
        assert!(err.to_string().contains("produced no package file"));
        assert_eq!(orch.runner().count("pacman"), 0);
        assert!(texts(orch.job().unwrap()).contains(&"  - app.deb".to_string()));
    }

    #[test]
    fn test_install_failure_surfaces_output_verbatim() {
        let temp = tempfile::TempDir::new().unwrap();
        let deb = write_deb(temp.path(), "app.deb");
        let conflict = "error: failed to commit transaction (conflicting files)";
        let runner = FakeRunner::with_programs(&["debtap", "pacman"])
            .exit("pacman", 1)
            .prints("pacman", &["loading packages...", conflict]);
        let mut orch = orchestrator(runner, temp.path());

        let err = orch.run(&deb).unwrap_err();

        assert_eq!(err.kind(), FailureKind::InstallError);
        assert_eq!(orch.runner().count("pacman"), 1);
        let job = orch.job().unwrap();
        assert!(job
            .log()
            .iter()
            .any(|l| l.source == LogSource::Process && l.text == conflict));
        assert_eq!(job.failure().unwrap().tail.last().unwrap(), conflict);
    }

    #[test]
    fn test_invalid_input_runs_nothing() {
        let temp = tempfile::TempDir::new().unwrap();
        let txt = temp.path().join("notes.txt");
        fs::write(&txt, b"hello").unwrap();

        for path in [temp.path().join("missing.deb"), txt] {
            let runner = FakeRunner::with_programs(&["debtap", "pacman"]);
            let mut orch = orchestrator(runner, temp.path());

            let err = orch.run(&path).unwrap_err();

            assert_eq!(err.kind(), FailureKind::InvalidInput);
            assert!(orch.runner().invocations.is_empty());
            assert_eq!(
                orch.job().unwrap().state(),
                JobState::Failed(FailureKind::InvalidInput)
            );
        }
    }

    #[test]
    fn test_log_preserves_process_order_between_markers() {
        let temp = tempfile::TempDir::new().unwrap();
        let deb = write_deb(temp.path(), "app.deb");
        let runner = FakeRunner::with_programs(&["debtap", "pacman"])
            .prints("debtap", &["first", "second", "third"])
            .prints("pacman", &["installing app..."]);
        let mut orch = orchestrator(runner, temp.path());

        orch.run(&deb).unwrap();

        let log = texts(orch.job().unwrap());
        let pos = |needle: &str| log.iter().position(|l| l == needle).unwrap();
        assert!(pos("STEP 3/4: Converting package") < pos("first"));
        assert!(pos("first") < pos("second"));
        assert!(pos("second") < pos("third"));
        assert!(pos("third") < pos("STEP 4/4: Installing package"));
        assert!(pos("STEP 4/4: Installing package") < pos("installing app..."));
    }

    #[test]
    fn test_events_replay_into_identical_job() {
        let temp = tempfile::TempDir::new().unwrap();
        let deb = write_deb(temp.path(), "app.deb");
        let runner = FakeRunner::with_programs(&["debtap", "pacman"])
            .exit("pacman", 1)
            .prints("pacman", &["nope"]);
        let (tx, rx) = mpsc::channel();
        let mut orch = orchestrator(runner, temp.path()).with_events(tx);
        let _ = orch.run(&deb);

        let mut replica = InstallJob::new(PathBuf::new());
        for event in rx.try_iter() {
            replica.apply(&event);
        }

        let job = orch.job().unwrap();
        assert_eq!(replica.id(), job.id());
        assert_eq!(replica.state(), job.state());
        assert_eq!(replica.log(), job.log());
        assert_eq!(replica.failure(), job.failure());
    }

    #[test]
    fn test_held_lock_reports_already_running() {
        let temp = tempfile::TempDir::new().unwrap();
        let deb = write_deb(temp.path(), "app.deb");
        let lock_dir = temp.path().join("run");
        let _held = JobLock::acquire(&lock_dir).unwrap();

        let runner = FakeRunner::with_programs(&["debtap", "pacman"]);
        let mut orch = orchestrator(runner, temp.path()).with_lock_dir(&lock_dir);
        let err = orch.run(&deb).unwrap_err();

        assert_eq!(err.kind(), FailureKind::AlreadyRunning);
        assert!(orch.runner().invocations.is_empty());
    }

    #[test]
    fn test_keep_workdir() {
        let temp = tempfile::TempDir::new().unwrap();
        let deb = write_deb(temp.path(), "app.deb");
        let config = Config {
            keep_workdir: true,
            ..Config::default()
        };
        let runner = FakeRunner::with_programs(&["debtap", "pacman"]);
        let mut orch = Orchestrator::new(config, runner).with_work_root(temp.path());

        orch.run(&deb).unwrap();

        let workdir = orch.runner().invocations[0].cwd.clone().unwrap();
        assert!(workdir.join("app.pkg.tar.zst").exists());
    }

    #[test]
    fn test_new_run_replaces_previous_job() {
        let temp = tempfile::TempDir::new().unwrap();
        let deb = write_deb(temp.path(), "app.deb");
        let runner = FakeRunner::with_programs(&["debtap", "pacman"]);
        let mut orch = orchestrator(runner, temp.path());

        let _ = orch.run(&temp.path().join("missing.deb"));
        let first = orch.job().unwrap().id();
        orch.run(&deb).unwrap();

        let job = orch.job().unwrap();
        assert_ne!(job.id(), first);
        assert_eq!(job.state(), JobState::Done);
        assert_eq!(job.source(), deb.as_path());
    }
}
