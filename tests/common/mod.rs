// Shared helpers for integration tests.
//
// Provides a simulated host that answers every command the phases issue
// from in-memory state, so the whole phase list can run end to end without
// touching the machine running the tests.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code, clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;

use dotfiles_bootstrap::config::{RunConfig, Settings};
use dotfiles_bootstrap::exec::{ExecResult, Executor, command_line};
use dotfiles_bootstrap::logging::{Log, Logger};
use dotfiles_bootstrap::operations::{Downloader, FileSystemOps};
use dotfiles_bootstrap::platform::{PackageManager, PlatformProfile};
use dotfiles_bootstrap::tasks::{self, Context, HostEnv, RunReport};

/// Home directory of the simulated account.
pub const HOME: &str = "/home/me";

/// Clone URL of the dotfiles repository served by the simulated host.
pub const DOTFILES_URL: &str = "https://example.com/me/dotfiles.git";

/// Mutable state of the simulated host.
#[derive(Debug, Default)]
struct HostState {
    files: BTreeMap<PathBuf, String>,
    dirs: BTreeSet<PathBuf>,
    path_programs: BTreeSet<String>,
    build_tools: bool,
    packages: BTreeSet<String>,
    plugins: BTreeSet<String>,
    versions: BTreeMap<String, BTreeSet<String>>,
    gems: BTreeSet<String>,
    npm: BTreeSet<String>,
    login_shell: String,
    /// Files materialized under the checkout when the dotfiles repo is cloned.
    repo_files: Vec<(String, String)>,
    failing: Vec<String>,
    calls: Vec<String>,
    mutations: Vec<String>,
}

impl HostState {
    fn add_dir(&mut self, path: &Path) {
        for ancestor in path.ancestors() {
            self.dirs.insert(ancestor.to_path_buf());
        }
    }

    fn add_file(&mut self, path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            self.add_dir(parent);
        }
        self.files.insert(path.to_path_buf(), content.to_string());
    }
}

/// A fresh or partially provisioned workstation held in memory.
///
/// Implements both [`Executor`] and [`FileSystemOps`]: every command
/// inspects or changes the same state the filesystem queries read.
#[derive(Debug)]
pub struct FakeHost {
    profile: PlatformProfile,
    state: Mutex<HostState>,
}

impl FakeHost {
    /// A host with nothing installed beyond the base system.
    pub fn fresh(profile: PlatformProfile) -> Self {
        let mut state = HostState {
            login_shell: "/bin/bash".to_string(),
            ..HostState::default()
        };
        state.add_dir(Path::new(HOME));
        state.add_file(Path::new("/bin/bash"), "");
        state.add_file(Path::new("/etc/shells"), "/bin/sh\n/bin/bash\n");
        state.path_programs.insert("bash".to_string());
        match profile.package_manager {
            PackageManager::Apt => {
                state.path_programs.insert("apt-get".to_string());
            }
            PackageManager::Pacman => {
                state.path_programs.insert("pacman".to_string());
            }
            PackageManager::Brew => {}
        }
        Self {
            profile,
            state: Mutex::new(state),
        }
    }

    fn state(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap()
    }

    /// Files the dotfiles repository contains, relative to its root.
    pub fn with_repo_file(self, relative: &str, content: &str) -> Self {
        self.state()
            .repo_files
            .push((relative.to_string(), content.to_string()));
        self
    }

    /// Make every command line starting with `prefix` fail.
    pub fn fail_on(self, prefix: &str) -> Self {
        self.state().failing.push(prefix.to_string());
        self
    }

    /// Remove `program` from `PATH`.
    pub fn without_program(self, program: &str) -> Self {
        self.state().path_programs.remove(program);
        self
    }

    /// asdf installed by a package manager: `asdf` on `PATH` and only a
    /// data directory, not a checkout, at `~/.asdf`.
    pub fn with_packaged_asdf(self) -> Self {
        {
            let mut state = self.state();
            state.add_dir(&self.asdf_root());
            state.path_programs.insert("asdf".to_string());
        }
        self
    }

    /// Write a file on the host.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.state().add_file(Path::new(path), content);
        self
    }

    /// Every command line issued so far.
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    /// Command lines that changed host state.
    pub fn mutations(&self) -> Vec<String> {
        self.state().mutations.clone()
    }

    /// Forget recorded calls and mutations, keeping the host state.
    pub fn reset_log(&self) {
        let mut state = self.state();
        state.calls.clear();
        state.mutations.clear();
    }

    pub fn packages(&self) -> BTreeSet<String> {
        self.state().packages.clone()
    }

    pub fn plugins(&self) -> BTreeSet<String> {
        self.state().plugins.clone()
    }

    pub fn versions(&self, tool: &str) -> BTreeSet<String> {
        self.state().versions.get(tool).cloned().unwrap_or_default()
    }

    pub fn gems(&self) -> BTreeSet<String> {
        self.state().gems.clone()
    }

    pub fn npm_packages(&self) -> BTreeSet<String> {
        self.state().npm.clone()
    }

    pub fn login_shell(&self) -> String {
        self.state().login_shell.clone()
    }

    pub fn has_build_tools(&self) -> bool {
        self.state().build_tools
    }

    pub fn file(&self, path: &str) -> Option<String> {
        self.state().files.get(Path::new(path)).cloned()
    }

    fn bin_dir(&self) -> PathBuf {
        self.profile.arch_prefix.join("bin")
    }

    fn asdf_root(&self) -> PathBuf {
        Path::new(HOME).join(".asdf")
    }

    fn install_package(&self, state: &mut HostState, name: &str) {
        state.packages.insert(name.to_string());
        state.add_file(&self.bin_dir().join(name), "");
    }

    fn clone_repo(&self, state: &mut HostState, url: &str, dir: &Path) -> ExecResult {
        if state.dirs.contains(dir) {
            return ExecResult::failed(128, format!("destination path '{}' already exists", dir.display()));
        }
        state.add_dir(&dir.join(".git"));
        if url == DOTFILES_URL {
            let files = state.repo_files.clone();
            for (relative, content) in files {
                state.add_file(&dir.join(relative), &content);
            }
        } else if dir == self.asdf_root().as_path() {
            state.add_file(&dir.join("bin/asdf"), "");
        }
        ExecResult::ok("")
    }

    fn asdf(&self, state: &mut HostState, args: &[&str]) -> Option<ExecResult> {
        let result = match args {
            ["plugin", "list"] if state.plugins.is_empty() => ExecResult::ok("No plugins installed\n"),
            ["plugin", "list"] => ExecResult::ok(lines(&state.plugins)),
            ["plugin", "add", name] => {
                state.plugins.insert((*name).to_string());
                state.mutations.push(format!("asdf plugin add {name}"));
                ExecResult::ok("")
            }
            ["plugin", "update", name] if state.plugins.contains(*name) => ExecResult::ok(""),
            ["list", tool] => match state.versions.get(*tool) {
                Some(versions) if !versions.is_empty() => ExecResult::ok(
                    versions.iter().map(|v| format!("  {v}\n")).collect::<String>(),
                ),
                _ => ExecResult::ok("No versions installed\n"),
            },
            ["install", tool, version] if state.plugins.contains(*tool) => {
                state
                    .versions
                    .entry((*tool).to_string())
                    .or_default()
                    .insert((*version).to_string());
                let shims = self.asdf_root().join("shims");
                match *tool {
                    "ruby" => state.add_file(&shims.join("gem"), ""),
                    "nodejs" => state.add_file(&shims.join("npm"), ""),
                    _ => {}
                }
                state.mutations.push(format!("asdf install {tool} {version}"));
                ExecResult::ok("")
            }
            _ => return None,
        };
        Some(result)
    }

    fn dispatch(&self, dir: Option<&Path>, program: &str, args: &[&str]) -> ExecResult {
        let line = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        let mut state = self.state();
        state.calls.push(line.clone());
        if state.failing.iter().any(|prefix| line.starts_with(prefix.as_str())) {
            return ExecResult::failed(1, "simulated failure");
        }

        let asdf = self.asdf_root().join("bin/asdf");
        if Path::new(program) == asdf.as_path()
            || (program == "asdf" && state.path_programs.contains("asdf"))
        {
            return self
                .asdf(&mut state, args)
                .unwrap_or_else(|| ExecResult::failed(1, "unknown asdf command"));
        }

        let brew = self.bin_dir().join("brew");
        let is_brew = Path::new(program) == brew.as_path() && state.files.contains_key(&brew);
        let program_name = Path::new(program)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        match (program_name.as_str(), args) {
            ("dpkg", ["-s", "build-essential"]) if state.build_tools => {
                ExecResult::ok("Status: install ok installed\n")
            }
            ("pacman", ["-Q", "base-devel"]) | ("xcode-select", ["-p"]) if state.build_tools => {
                ExecResult::ok("")
            }
            ("dpkg", ["-s", _]) | ("pacman", ["-Q", _]) | ("xcode-select", ["-p"]) => {
                ExecResult::failed(1, "not installed")
            }
            ("xcode-select", ["--install"]) => {
                state.build_tools = true;
                state.mutations.push(line);
                ExecResult::ok("")
            }
            ("dpkg-query", ["-W", _]) => ExecResult::ok(
                state
                    .packages
                    .iter()
                    .map(|p| format!("ii |{p}\n"))
                    .collect::<String>(),
            ),
            ("pacman", ["-Qq"]) => ExecResult::ok(lines(&state.packages)),
            ("brew", ["list", "-1"]) if is_brew => ExecResult::ok(lines(&state.packages)),
            ("brew", ["install", name]) if is_brew => {
                self.install_package(&mut state, name);
                state.mutations.push(line);
                ExecResult::ok("")
            }
            ("sudo", ["apt-get", "update", "-q"]) => ExecResult::ok(""),
            ("sudo", [.., "apt-get", "install", "-y", "-q", name])
            | ("sudo", ["pacman", "-S", "--needed", "--noconfirm", name]) => {
                if matches!(*name, "build-essential" | "base-devel") {
                    state.build_tools = true;
                } else {
                    self.install_package(&mut state, name);
                }
                state.mutations.push(line);
                ExecResult::ok("")
            }
            ("bash", ["-c", _]) if program == "/bin/bash" => {
                state.add_file(&brew, "");
                state.mutations.push("homebrew installer".to_string());
                ExecResult::ok("")
            }
            ("bash", [script, ..]) if state.files.contains_key(Path::new(script)) => {
                ExecResult::ok("")
            }
            ("git", ["clone", "--branch", _, url, target]) | ("git", ["clone", url, target]) => {
                let result = self.clone_repo(&mut state, url, Path::new(target));
                if result.success {
                    state.mutations.push(line);
                }
                result
            }
            ("git", ["pull", "--ff-only"]) if dir.is_some_and(|d| state.dirs.contains(&d.join(".git"))) => {
                ExecResult::ok("Already up to date.\n")
            }
            ("gem", ["list", "--no-versions"]) => {
                let listing: String = state.gems.iter().map(|g| format!("{g}\n")).collect();
                ExecResult::ok(format!("\n*** LOCAL GEMS ***\n\n{listing}"))
            }
            ("gem", ["install", "--no-document", name, ..]) => {
                state.gems.insert((*name).to_string());
                state.mutations.push(line);
                ExecResult::ok("")
            }
            ("npm", ["ls", "-g", "--depth=0", "--json"]) => {
                let deps: serde_json::Map<String, serde_json::Value> = state
                    .npm
                    .iter()
                    .map(|p| (p.clone(), serde_json::json!({})))
                    .collect();
                ExecResult::ok(serde_json::json!({ "dependencies": deps }).to_string())
            }
            ("npm", ["install", "-g", spec]) => {
                state.npm.insert(npm_name(spec));
                state.mutations.push(line);
                ExecResult::ok("")
            }
            ("getent", ["passwd", user]) => ExecResult::ok(format!(
                "{user}:x:1000:1000::{HOME}:{}\n",
                state.login_shell
            )),
            ("dscl", [".", "-read", _, "UserShell"]) => {
                ExecResult::ok(format!("UserShell: {}\n", state.login_shell))
            }
            ("sudo", ["sh", "-c", _, "sh", shell, registry]) => {
                let path = PathBuf::from(registry);
                let mut content = state.files.get(&path).cloned().unwrap_or_default();
                content.push_str(shell);
                content.push('\n');
                state.files.insert(path, content);
                state.mutations.push(line);
                ExecResult::ok("")
            }
            ("chsh", ["-s", shell]) => {
                state.login_shell = (*shell).to_string();
                state.mutations.push(line);
                ExecResult::ok("")
            }
            _ => ExecResult::failed(127, format!("{program}: command not found")),
        }
    }
}

fn lines(items: &BTreeSet<String>) -> String {
    items.iter().map(|i| format!("{i}\n")).collect()
}

/// Package name of an npm spec (`name@1.0`, `@scope/name@1.0`).
fn npm_name(spec: &str) -> String {
    let (scope, rest) = spec
        .strip_prefix('@')
        .map_or(("", spec), |rest| ("@", rest));
    let name = rest.split_once('@').map_or(rest, |(name, _)| name);
    format!("{scope}{name}")
}

impl Executor for FakeHost {
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        self.dispatch(None, program, args).check(&command_line(program, args))
    }

    fn run_in(&self, dir: &Path, program: &str, args: &[&str]) -> Result<ExecResult> {
        self.dispatch(Some(dir), program, args).check(&command_line(program, args))
    }

    fn run_with_env(
        &self,
        program: &str,
        args: &[&str],
        _env: &[(&str, &str)],
    ) -> Result<ExecResult> {
        self.dispatch(None, program, args).check(&command_line(program, args))
    }

    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        Ok(self.dispatch(None, program, args))
    }

    fn run_unchecked_with_env(
        &self,
        program: &str,
        args: &[&str],
        _env: &[(&str, &str)],
    ) -> Result<ExecResult> {
        Ok(self.dispatch(None, program, args))
    }

    fn run_interactive(
        &self,
        program: &str,
        args: &[&str],
        _env: &[(&str, &str)],
    ) -> Result<ExecResult> {
        self.dispatch(None, program, args).check(&command_line(program, args))
    }

    fn which(&self, program: &str) -> bool {
        let state = self.state();
        state.path_programs.contains(program)
            || state.files.contains_key(&self.bin_dir().join(program))
    }
}

impl FileSystemOps for FakeHost {
    fn exists(&self, path: &Path) -> bool {
        let state = self.state();
        state.files.contains_key(path) || state.dirs.contains(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.state().dirs.contains(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.state().files.contains_key(path)
    }

    fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
        self.state()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))
    }
}

/// Serves a canned Homebrew installer.
#[derive(Debug, Default)]
pub struct FakeDownloader {
    pub fetched: Mutex<Vec<String>>,
}

impl Downloader for FakeDownloader {
    fn fetch_text(&self, url: &str) -> Result<String> {
        self.fetched.lock().unwrap().push(url.to_string());
        Ok("#!/bin/bash\necho installing homebrew\n".to_string())
    }
}

/// Settings pointing at the simulated dotfiles repository.
pub fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.repository.url = DOTFILES_URL.to_string();
    settings
}

/// A context for `me` on `host`.
pub fn context(host: &Arc<FakeHost>, settings: Settings, run: RunConfig) -> (Context, Arc<Logger>) {
    let log = Arc::new(Logger::new(None));
    let ctx = Context {
        settings: Arc::new(settings),
        profile: Arc::new(host.profile.clone()),
        run,
        log: Arc::clone(&log) as Arc<dyn Log>,
        home: PathBuf::from(HOME),
        host: HostEnv {
            user: "me".to_string(),
            login_shell: Some("/bin/bash".to_string()),
            ci: false,
        },
        executor: Arc::clone(host) as Arc<dyn Executor>,
        fs_ops: Arc::clone(host) as Arc<dyn FileSystemOps>,
        downloader: Arc::new(FakeDownloader::default()),
    };
    (ctx, log)
}

/// Run the complete phase list on `host`.
pub fn bootstrap(host: &Arc<FakeHost>, settings: Settings, run: RunConfig) -> (RunReport, Arc<Logger>) {
    let (ctx, log) = context(host, settings, run);
    let phases = tasks::all_phases();
    tasks::validate_order(&phases).expect("phase list is consistent");
    (tasks::run_all(&phases, &ctx), log)
}

/// Final state of every phase, keyed by name.
pub fn states(report: &RunReport) -> HashMap<String, tasks::PhaseState> {
    report
        .results
        .iter()
        .map(|r| (r.name.clone(), r.state))
        .collect()
}

/// Default run options with dry-run set.
pub fn dry_run() -> RunConfig {
    RunConfig {
        dry_run: true,
        ..RunConfig::default()
    }
}
