// src/system/decorators.rs

//! # Executor Decorator Chain
//!
//! A raw executor is wrapped into an [`ExecuteCommand`] by [`Timed`], then by an
//! ordered list of decorators composed at startup by [`ExecutorBuilder`]. The
//! standard chain, innermost first, is: timing, dry-run, variables, status file,
//! profile file, log file. Each decorator keeps the same signature, so the list is
//! folded over the base executor. Two chains are built (shell and expression) and a
//! [`CommandRouter`] picks one per command from the resolved command string.

use crate::constants::EXPRESSION_PREFIX;
use crate::models::{Project, ScriptInContext, ShellCommandDetails, ShellResult};
use crate::system::executor::{ExpressionExecutor, RawExecutor, ShellExecutor};
use chrono::SecondsFormat;
use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Everything needed to execute one materialized command for one project.
#[derive(Debug, Clone)]
pub struct CommandJob<'a> {
    pub context: &'a ScriptInContext<'a>,
    pub project: &'a Project,
    pub details: ShellCommandDetails,
}

impl CommandJob<'_> {
    fn timestamp(&self) -> String {
        self.context
            .timestamp
            .to_rfc3339_opts(SecondsFormat::Secs, false)
    }
}

/// Executes one command and always produces a result.
pub trait ExecuteCommand: Send + Sync {
    fn execute(&self, job: &CommandJob<'_>) -> ShellResult;
}

pub type BoxedExecutor = Box<dyn ExecuteCommand>;

/// Wraps an executor, returning an executor with the same signature.
pub type Decorator = Box<dyn Fn(BoxedExecutor) -> BoxedExecutor + Send + Sync>;

/// Measures wall-clock time around a raw executor.
#[derive(Debug)]
pub struct Timed<R> {
    raw: R,
}

impl<R: RawExecutor> Timed<R> {
    pub fn new(raw: R) -> Self {
        Self { raw }
    }
}

impl<R: RawExecutor> ExecuteCommand for Timed<R> {
    fn execute(&self, job: &CommandJob<'_>) -> ShellResult {
        let start = Instant::now();
        let raw = self.raw.execute(&job.details);
        ShellResult::from_raw(job.details.clone(), raw, start.elapsed())
    }
}

/// The stdout a dry run reports instead of executing.
pub fn dry_run_contents(details: &ShellCommandDetails) -> String {
    format!("{} {}", details.directory.display(), details.command_string)
}

/// Short-circuits to a zero-duration success when the run is a dry run.
pub struct DryRun {
    inner: BoxedExecutor,
}

impl fmt::Debug for DryRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DryRun").finish_non_exhaustive()
    }
}

impl ExecuteCommand for DryRun {
    fn execute(&self, job: &CommandJob<'_>) -> ShellResult {
        if !job.context.is_dryrun() {
            return self.inner.execute(job);
        }
        ShellResult {
            details: job.details.clone(),
            duration: Duration::ZERO,
            err: None,
            stdout: dry_run_contents(&job.details),
            stderr: String::new(),
        }
    }
}

/// Prints the dictionary a command was resolved against (`--variables`).
pub struct ShowVariables {
    inner: BoxedExecutor,
}

impl fmt::Debug for ShowVariables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShowVariables").finish_non_exhaustive()
    }
}

impl ExecuteCommand for ShowVariables {
    fn execute(&self, job: &CommandJob<'_>) -> ShellResult {
        if job.context.options.variables {
            println!(
                "{} {}\n{}",
                job.project.name(),
                job.details.command_string,
                job.details.dic.to_pretty_json()
            );
        }
        self.inner.execute(job)
    }
}

// --- File records ---

/// Appends text to a file. Abstracted so tests can observe writes.
pub trait AppendToFile: Send + Sync {
    fn append(&self, path: &Path, content: &str) -> io::Result<()>;
}

/// Appends to files on disk, creating them when needed.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsAppender;

impl AppendToFile for FsAppender {
    fn append(&self, path: &Path, content: &str) -> io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(content.as_bytes())
    }
}

/// Describes one per-project record file: when to write, where, and what.
pub trait FileRecord: Send + Sync {
    fn applies(&self, job: &CommandJob<'_>) -> bool;
    fn filename(&self, job: &CommandJob<'_>) -> PathBuf;
    fn content(&self, job: &CommandJob<'_>, result: &ShellResult) -> String;
}

/// `<timestamp> <command> <failed>` for commands flagged with `status = true`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StatusRecord;

impl FileRecord for StatusRecord {
    fn applies(&self, job: &CommandJob<'_>) -> bool {
        job.details.command.status
    }

    fn filename(&self, job: &CommandJob<'_>) -> PathBuf {
        job.project.file(&job.context.config.status)
    }

    fn content(&self, job: &CommandJob<'_>, result: &ShellResult) -> String {
        format!(
            "{} {} {}\n",
            job.timestamp(),
            job.details.command.name,
            result.has_error()
        )
    }
}

/// `<script> <command> <millis>` for every named command.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProfileRecord;

impl FileRecord for ProfileRecord {
    fn applies(&self, job: &CommandJob<'_>) -> bool {
        !job.details.command.name.is_empty()
    }

    fn filename(&self, job: &CommandJob<'_>) -> PathBuf {
        job.project.file(&job.context.config.profile)
    }

    fn content(&self, job: &CommandJob<'_>, result: &ShellResult) -> String {
        format!(
            "{} {} {}\n",
            job.context.details.name,
            job.details.command.name,
            result.duration.as_millis()
        )
    }
}

/// A timestamped block with the command's stdout and duration, for every command.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogRecord;

impl FileRecord for LogRecord {
    fn applies(&self, _job: &CommandJob<'_>) -> bool {
        true
    }

    fn filename(&self, job: &CommandJob<'_>) -> PathBuf {
        job.project.file(&job.context.config.log)
    }

    fn content(&self, job: &CommandJob<'_>, result: &ShellResult) -> String {
        format!(
            "{} {}\n{}\nTook {}\n\n",
            job.timestamp(),
            job.details.command.name,
            result.stdout,
            result.duration.as_millis()
        )
    }
}

/// Appends a record after the wrapped executor returns. Never writes during a dry run.
pub struct RecordToFile<R> {
    inner: BoxedExecutor,
    record: R,
    appender: Arc<dyn AppendToFile>,
}

impl<R: fmt::Debug> fmt::Debug for RecordToFile<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordToFile")
            .field("record", &self.record)
            .finish_non_exhaustive()
    }
}

impl<R: FileRecord> ExecuteCommand for RecordToFile<R> {
    fn execute(&self, job: &CommandJob<'_>) -> ShellResult {
        let result = self.inner.execute(job);
        if self.record.applies(job) && !job.context.is_dryrun() {
            let path = self.record.filename(job);
            let content = self.record.content(job, &result);
            if let Err(e) = self.appender.append(&path, &content) {
                log::warn!("Could not append to '{}': {}", path.display(), e);
            }
        }
        result
    }
}

// --- Decorator constructors ---

pub fn dry_run() -> Decorator {
    Box::new(|inner: BoxedExecutor| -> BoxedExecutor { Box::new(DryRun { inner }) })
}

pub fn show_variables() -> Decorator {
    Box::new(|inner: BoxedExecutor| -> BoxedExecutor { Box::new(ShowVariables { inner }) })
}

pub fn record<R>(record: R, appender: Arc<dyn AppendToFile>) -> Decorator
where
    R: FileRecord + Clone + 'static,
{
    Box::new(move |inner: BoxedExecutor| -> BoxedExecutor {
        Box::new(RecordToFile {
            inner,
            record: record.clone(),
            appender: Arc::clone(&appender),
        })
    })
}

// --- Builder and router ---

/// Collects decorators in order; the first added sits closest to the raw executor.
#[derive(Default)]
pub struct ExecutorBuilder {
    decorators: Vec<Decorator>,
}

impl fmt::Debug for ExecutorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorBuilder")
            .field("decorators", &self.decorators.len())
            .finish()
    }
}

impl ExecutorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dry-run, variables, then the status, profile and log records.
    pub fn standard(appender: Arc<dyn AppendToFile>) -> Self {
        Self::new()
            .with(dry_run())
            .with(show_variables())
            .with(record(StatusRecord, Arc::clone(&appender)))
            .with(record(ProfileRecord, Arc::clone(&appender)))
            .with(record(LogRecord, appender))
    }

    pub fn with(mut self, decorator: Decorator) -> Self {
        self.decorators.push(decorator);
        self
    }

    fn decorate(&self, base: BoxedExecutor) -> BoxedExecutor {
        self.decorators.iter().fold(base, |acc, decorator| decorator(acc))
    }

    pub fn build<S, E>(self, shell: S, expression: E) -> CommandRouter
    where
        S: RawExecutor + 'static,
        E: RawExecutor + 'static,
    {
        CommandRouter {
            shell: self.decorate(Box::new(Timed::new(shell))),
            expression: self.decorate(Box::new(Timed::new(expression))),
        }
    }
}

/// Sends `js:` commands to the expression chain and everything else to the shell chain.
pub struct CommandRouter {
    shell: BoxedExecutor,
    expression: BoxedExecutor,
}

impl fmt::Debug for CommandRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRouter").finish_non_exhaustive()
    }
}

impl ExecuteCommand for CommandRouter {
    fn execute(&self, job: &CommandJob<'_>) -> ShellResult {
        if job.details.command_string.starts_with(EXPRESSION_PREFIX) {
            self.expression.execute(job)
        } else {
            self.shell.execute(job)
        }
    }
}

/// The executor used by the CLI: real shell, in-process expressions, records on disk.
pub fn default_executor() -> CommandRouter {
    ExecutorBuilder::standard(Arc::new(FsAppender)).build(ShellExecutor, ExpressionExecutor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::handlers::run::adhoc_script;
    use crate::core::dictionary::Dictionary;
    use crate::core::profile::summarize_profile;
    use crate::core::status::compact_status;
    use crate::models::{
        CommandDefn, Config, ProjectDetails, RawShellResult, RunOptions, ScriptDetails,
    };
    use crate::system::executor::ExecutionError;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingRaw {
        label: &'static str,
        calls: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    impl RawExecutor for RecordingRaw {
        fn execute(&self, details: &ShellCommandDetails) -> RawShellResult {
            self.calls
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.label, details.command_string));
            RawShellResult {
                err: self.fail.then(|| ExecutionError::NonZeroExitStatus {
                    command: details.command_string.clone(),
                    code: Some(1),
                }),
                stdout: format!("ran {}", details.command_string),
                stderr: String::new(),
            }
        }
    }

    #[derive(Default)]
    struct RecordingAppender {
        writes: Mutex<Vec<(PathBuf, String)>>,
    }

    impl AppendToFile for RecordingAppender {
        fn append(&self, path: &Path, content: &str) -> io::Result<()> {
            self.writes
                .lock()
                .unwrap()
                .push((path.to_path_buf(), content.to_string()));
            Ok(())
        }
    }

    fn config() -> Config {
        Config {
            log: ".log".to_string(),
            status: ".status".to_string(),
            profile: ".profile".to_string(),
            ..Default::default()
        }
    }

    fn script() -> ScriptDetails {
        ScriptDetails {
            name: "test".to_string(),
            ..Default::default()
        }
    }

    fn project() -> Project {
        Project::new(
            "/tmp/P",
            ProjectDetails {
                name: "P".to_string(),
                ..Default::default()
            },
        )
    }

    fn details(name: &str, command_string: &str, status: bool) -> ShellCommandDetails {
        ShellCommandDetails {
            command: CommandDefn {
                name: name.to_string(),
                command: command_string.to_string(),
                directory: None,
                status,
            },
            dic: Dictionary::new(),
            env: None,
            directory: PathBuf::from("/tmp/P"),
            command_string: command_string.to_string(),
        }
    }

    struct Fixture {
        calls: Arc<Mutex<Vec<String>>>,
        appender: Arc<RecordingAppender>,
        router: CommandRouter,
    }

    fn fixture(fail: bool) -> Fixture {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let appender = Arc::new(RecordingAppender::default());
        let router = ExecutorBuilder::standard(appender.clone()).build(
            RecordingRaw {
                label: "shell",
                calls: calls.clone(),
                fail,
            },
            RecordingRaw {
                label: "js",
                calls: calls.clone(),
                fail,
            },
        );
        Fixture {
            calls,
            appender,
            router,
        }
    }

    #[test]
    fn test_router_picks_executor_by_prefix() {
        let f = fixture(false);
        let (config, script, project) = (config(), script(), project());
        let ctx = ScriptInContext::new(&config, &script, RunOptions::default());

        for command in ["js:1 + 1", "echo js:1", "npm test"] {
            let job = CommandJob {
                context: &ctx,
                project: &project,
                details: details("", command, false),
            };
            f.router.execute(&job);
        }
        assert_eq!(
            *f.calls.lock().unwrap(),
            vec!["js:js:1 + 1", "shell:echo js:1", "shell:npm test"]
        );
    }

    #[test]
    fn test_dry_run_has_no_side_effects() {
        let f = fixture(false);
        let (config, script, project) = (config(), script(), project());
        let options = RunOptions {
            dryrun: true,
            ..Default::default()
        };
        let ctx = ScriptInContext::new(&config, &script, options);
        let job = CommandJob {
            context: &ctx,
            project: &project,
            details: details("build", "npm run build", true),
        };

        let res = f.router.execute(&job);
        assert!(res.err.is_none());
        assert_eq!(res.duration, Duration::ZERO);
        assert_eq!(res.stdout, "/tmp/P npm run build");
        assert!(f.calls.lock().unwrap().is_empty());
        assert!(f.appender.writes.lock().unwrap().is_empty());
    }

    #[test]
    fn test_records_are_appended_in_chain_order() {
        let f = fixture(false);
        let (config, script, project) = (config(), script(), project());
        let ctx = ScriptInContext::new(&config, &script, RunOptions::default());
        let job = CommandJob {
            context: &ctx,
            project: &project,
            details: details("a", "echo hi", true),
        };

        let res = f.router.execute(&job);
        assert_eq!(res.stdout, "ran echo hi");

        let writes = f.appender.writes.lock().unwrap();
        let files: Vec<PathBuf> = writes.iter().map(|(p, _)| p.clone()).collect();
        assert_eq!(
            files,
            vec![
                PathBuf::from("/tmp/P/.status"),
                PathBuf::from("/tmp/P/.profile"),
                PathBuf::from("/tmp/P/.log"),
            ]
        );
        assert!(writes[0].1.ends_with(" a false\n"));
        assert!(writes[1].1.starts_with("test a "));
        assert!(writes[2].1.contains("\nran echo hi\nTook "));
    }

    #[test]
    fn test_status_records_failure_and_unnamed_commands_skip_profile() {
        let f = fixture(true);
        let (config, script, project) = (config(), script(), project());
        let ctx = ScriptInContext::new(&config, &script, RunOptions::default());

        let named = CommandJob {
            context: &ctx,
            project: &project,
            details: details("deploy", "./deploy.sh", true),
        };
        assert!(f.router.execute(&named).has_error());

        let unnamed = CommandJob {
            context: &ctx,
            project: &project,
            details: details("", "ls", false),
        };
        f.router.execute(&unnamed);

        let writes = f.appender.writes.lock().unwrap();
        let files: Vec<String> = writes
            .iter()
            .map(|(p, _)| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(files, vec![".status", ".profile", ".log", ".log"]);
        assert!(writes[0].1.ends_with(" deploy true\n"));
    }

    #[test]
    fn test_adhoc_run_profile_reads_back() {
        let f = fixture(false);
        let (config, project) = (config(), project());
        let script = adhoc_script("echo hi".to_string());
        let ctx = ScriptInContext::new(&config, &script, RunOptions::default());
        let job = CommandJob {
            context: &ctx,
            project: &project,
            details: ShellCommandDetails {
                command: script.commands[0].clone(),
                ..details("", "echo hi", false)
            },
        };
        f.router.execute(&job);

        let writes = f.appender.writes.lock().unwrap();
        assert_eq!(writes[0].0, PathBuf::from("/tmp/P/.profile"));
        let profile = summarize_profile(&writes[0].1);
        assert_eq!(profile["run run"].count, 1);
    }

    #[test]
    fn test_status_record_reads_back() {
        let f = fixture(true);
        let (config, script, project) = (config(), script(), project());
        let ctx = ScriptInContext::new(&config, &script, RunOptions::default());
        let job = CommandJob {
            context: &ctx,
            project: &project,
            details: details("compile", "tsc", true),
        };
        f.router.execute(&job);

        let writes = f.appender.writes.lock().unwrap();
        let status = compact_status(&writes[0].1);
        assert!(status["compile"].failed);
        let profile = summarize_profile(&writes[1].1);
        assert_eq!(profile["test compile"].count, 1);
    }

    #[test]
    fn test_decorators_are_debug() {
        let raw = || -> BoxedExecutor { Box::new(Timed::new(RecordingRaw::default())) };
        let dry = DryRun { inner: raw() };
        let vars = ShowVariables { inner: raw() };
        let status = RecordToFile {
            inner: raw(),
            record: StatusRecord,
            appender: Arc::new(FsAppender),
        };
        assert_eq!(format!("{:?}", dry), "DryRun { .. }");
        assert_eq!(format!("{:?}", vars), "ShowVariables { .. }");
        assert_eq!(
            format!("{:?}", status),
            "RecordToFile { record: StatusRecord, .. }"
        );
    }

    #[test]
    fn test_fs_appender_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".log");
        FsAppender.append(&path, "one\n").unwrap();
        FsAppender.append(&path, "two\n").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "one\ntwo\n");
    }
}
