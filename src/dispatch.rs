use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, info};

use crate::error::LaunchFailure;
use crate::platform::Platform;
use crate::target::{Browser, Launch, LaunchTarget};

/// A program and its argument list, spawned without a shell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(shell_quote)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LaunchPlan {
    /// A raw line for the platform shell. `args` of software targets are
    /// caller-quoted and go in unescaped.
    Shell(String),
    Direct(CommandSpec),
    /// Run in order, stopping at the first failure.
    Chain(Vec<CommandSpec>),
}

impl LaunchPlan {
    pub fn command_line(&self) -> String {
        match self {
            LaunchPlan::Shell(line) => line.clone(),
            LaunchPlan::Direct(spec) => spec.command_line(),
            LaunchPlan::Chain(specs) => chain_line(specs),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Opener {
    /// `start` a protocol handler for one URL, the executable for several.
    UrlScheme {
        scheme: &'static str,
        executable: &'static str,
    },
    Start(&'static str),
    AppBundle(&'static str),
    Binary(&'static str),
}

const fn opener(browser: Browser, platform: Platform) -> Opener {
    match (browser, platform) {
        (Browser::Edge, Platform::Windows) => Opener::UrlScheme {
            scheme: "microsoft-edge",
            executable: "msedge",
        },
        (Browser::Edge, Platform::MacOs) => Opener::AppBundle("Microsoft Edge"),
        (Browser::Edge, Platform::Linux) => Opener::Binary("microsoft-edge"),
        (Browser::Chrome, Platform::Windows) => Opener::Start("chrome"),
        (Browser::Chrome, Platform::MacOs) => Opener::AppBundle("Google Chrome"),
        (Browser::Chrome, Platform::Linux) => Opener::Binary("google-chrome"),
    }
}

impl Opener {
    fn plan(self, urls: &[String]) -> LaunchPlan {
        match self {
            Opener::UrlScheme { scheme, .. } if urls.len() == 1 => {
                let handler = format!("{scheme}:{}", urls[0]);
                LaunchPlan::Direct(CommandSpec::new("cmd", ["/C", "start", "", handler.as_str()]))
            }
            Opener::UrlScheme { executable, .. } | Opener::Start(executable) => {
                LaunchPlan::Direct(windows_start(executable, urls))
            }
            Opener::AppBundle(app) if urls.len() == 1 => {
                LaunchPlan::Direct(CommandSpec::new("open", ["-a", app, urls[0].as_str()]))
            }
            Opener::AppBundle(app) => LaunchPlan::Chain(
                urls.iter()
                    .map(|url| CommandSpec::new("open", ["-a", app, url.as_str()]))
                    .collect(),
            ),
            Opener::Binary(binary) => {
                LaunchPlan::Direct(CommandSpec::new(binary, urls.iter().cloned()))
            }
        }
    }
}

fn windows_start(executable: &str, urls: &[String]) -> CommandSpec {
    let mut args = vec!["/C".to_string(), "start".into(), String::new(), executable.into()];
    args.extend(urls.iter().cloned());
    CommandSpec {
        program: "cmd".into(),
        args,
    }
}

pub fn software_command_line(path: &str, args: &str) -> String {
    if args.trim().is_empty() {
        format!("\"{path}\"")
    } else {
        format!("\"{path}\" {args}")
    }
}

/// Resolves a target into what would be spawned on `platform`. Pure.
pub fn resolve(target: &LaunchTarget, platform: Platform) -> LaunchPlan {
    match &target.launch {
        Launch::Software { path, args } => LaunchPlan::Shell(software_command_line(path, args)),
        Launch::Browser { browser, url } => {
            opener(*browser, platform).plan(std::slice::from_ref(url))
        }
    }
}

pub fn resolve_urls(
    browser: Browser,
    urls: &[String],
    platform: Platform,
) -> Result<LaunchPlan, LaunchFailure> {
    if urls.is_empty() {
        return Err(LaunchFailure::new(
            format!("{browser} <no urls>"),
            platform,
            io::Error::new(io::ErrorKind::InvalidInput, "no URLs to open"),
        ));
    }
    Ok(opener(browser, platform).plan(urls))
}

/// Spawns launch plans as detached processes. Children are kept only so
/// exited ones can be reaped; nothing waits on a running child.
#[derive(Debug)]
pub struct Dispatcher {
    platform: Platform,
    children: Mutex<Vec<Child>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(Platform::current())
    }
}

impl Dispatcher {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            children: Mutex::new(Vec::new()),
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn launch(&self, target: &LaunchTarget) -> Result<(), LaunchFailure> {
        let plan = resolve(target, self.platform);
        if let Launch::Software { path, .. } = &target.launch {
            locate_executable(path)
                .map_err(|err| LaunchFailure::new(plan.command_line(), self.platform, err))?;
        }
        info!(id = %target.id, name = %target.name, "launching target");
        self.execute(&plan)
    }

    pub fn open_urls(&self, browser: Browser, urls: &[String]) -> Result<(), LaunchFailure> {
        let plan = resolve_urls(browser, urls, self.platform)?;
        info!(%browser, count = urls.len(), "opening urls");
        self.execute(&plan)
    }

    fn execute(&self, plan: &LaunchPlan) -> Result<(), LaunchFailure> {
        let line = plan.command_line();
        debug!(command = %line, platform = %self.platform, "spawning");
        let mut command = match plan {
            LaunchPlan::Shell(line) => self.shell(line),
            LaunchPlan::Direct(spec) => direct(spec),
            LaunchPlan::Chain(specs) => self.shell(&chain_line(specs)),
        };
        let child = spawn_detached(&mut command)
            .map_err(|err| LaunchFailure::new(line, self.platform, err))?;
        let mut children = self.children.lock().unwrap_or_else(PoisonError::into_inner);
        reap_exited(&mut children);
        children.push(child);
        Ok(())
    }

    /// Collects exit statuses of finished children and returns how many are
    /// still running.
    pub fn reap(&self) -> usize {
        let mut children = self.children.lock().unwrap_or_else(PoisonError::into_inner);
        reap_exited(&mut children);
        children.len()
    }

    fn shell(&self, line: &str) -> Command {
        match self.platform {
            Platform::Windows => {
                let mut command = Command::new("cmd");
                command.arg("/C");
                // cmd strips one pair of outer quotes from the line.
                push_raw_arg(&mut command, &format!("\"{line}\""));
                command
            }
            Platform::MacOs | Platform::Linux => {
                let mut command = Command::new("sh");
                command.arg("-c").arg(line);
                command
            }
        }
    }
}

fn direct(spec: &CommandSpec) -> Command {
    let mut command = Command::new(&spec.program);
    if spec.program == "cmd" {
        for arg in &spec.args {
            push_raw_arg(&mut command, &quote_for_cmd(arg));
        }
    } else {
        command.args(&spec.args);
    }
    command
}

#[cfg(windows)]
fn push_raw_arg(command: &mut Command, arg: &str) {
    use std::os::windows::process::CommandExt;
    command.raw_arg(arg);
}

#[cfg(not(windows))]
fn push_raw_arg(command: &mut Command, arg: &str) {
    command.arg(arg.trim_matches('"'));
}

fn spawn_detached(command: &mut Command) -> io::Result<Child> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    let child = command.spawn()?;
    debug!(pid = child.id(), "process started");
    Ok(child)
}

fn reap_exited(children: &mut Vec<Child>) {
    children.retain_mut(|child| match child.try_wait() {
        Ok(Some(status)) => {
            debug!(pid = child.id(), %status, "process exited");
            false
        }
        Ok(None) => true,
        Err(err) => {
            debug!(pid = child.id(), error = %err, "dropping unwaitable child");
            false
        }
    });
}

fn chain_line(specs: &[CommandSpec]) -> String {
    specs
        .iter()
        .map(CommandSpec::command_line)
        .collect::<Vec<_>>()
        .join(" && ")
}

fn shell_quote(value: &str) -> String {
    let safe = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@%+,".contains(c));
    if safe {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', "'\\''"))
    }
}

fn quote_for_cmd(value: &str) -> String {
    let special = value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || "&|<>^()%!\"".contains(c));
    if special {
        format!("\"{}\"", value.replace('"', ""))
    } else {
        value.to_string()
    }
}

fn locate_executable(path: &str) -> io::Result<PathBuf> {
    let candidate = Path::new(path);
    if candidate.is_absolute() || candidate.components().count() > 1 {
        check_runnable(candidate)?;
        return Ok(candidate.to_path_buf());
    }
    env::var_os("PATH")
        .and_then(|paths| {
            env::split_paths(&paths)
                .flat_map(|dir| executable_names(path).into_iter().map(move |name| dir.join(name)))
                .find(|full| check_runnable(full).is_ok())
        })
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{path} was not found on PATH"),
            )
        })
}

/// The OS would refuse anything that is not a regular file it may execute.
fn check_runnable(path: &Path) -> io::Result<()> {
    let metadata = fs::metadata(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} does not exist", path.display()),
        ),
        _ => err,
    })?;
    if !metadata.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            format!("{} is not a file", path.display()),
        ));
    }
    if !has_execute_permission(path, &metadata) {
        return Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            format!("{} is not executable", path.display()),
        ));
    }
    Ok(())
}

#[cfg(unix)]
fn has_execute_permission(_path: &Path, metadata: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn has_execute_permission(path: &Path, _metadata: &fs::Metadata) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            executable_extensions()
                .iter()
                .any(|known| known.trim_start_matches('.').eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// `PATHEXT` when set, otherwise the extensions cmd runs without it.
fn executable_extensions() -> Vec<String> {
    env::var("PATHEXT")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(|value| {
            value
                .split(';')
                .filter(|ext| !ext.is_empty())
                .map(|ext| ext.to_ascii_lowercase())
                .collect()
        })
        .unwrap_or_else(|| {
            [".exe", ".com", ".bat", ".cmd"]
                .iter()
                .map(|ext| ext.to_string())
                .collect()
        })
}

fn executable_names(name: &str) -> Vec<String> {
    let mut names = vec![name.to_string()];
    if cfg!(windows) && Path::new(name).extension().is_none() {
        names.extend(executable_extensions().iter().map(|ext| format!("{name}{ext}")));
    }
    names
}
