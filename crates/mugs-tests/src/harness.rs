//! Shell fixture backed by a temporary data and extensions directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use walkdir::WalkDir;

use mugs_cli::config::Settings;
use mugs_cli::report::MemoryReporter;
use mugs_cli::shell::Shell;

/// Path to a directory under the repository's `golden/` tree.
pub fn golden_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(Path::parent)
        .expect("crate lives two levels below the repository root")
        .join("golden")
        .join(name)
}

/// A shell wired the way the binary wires it, with every path inside a
/// temporary directory and output captured in memory.
pub struct ShellFixture {
    pub root: TempDir,
    pub settings: Settings,
    pub reporter: Arc<MemoryReporter>,
    pub shell: Shell,
}

impl ShellFixture {
    /// Fixture with an empty extensions directory.
    pub fn empty() -> Self {
        let root = TempDir::new().expect("Failed to create temp dir");
        let settings = Settings {
            extensions_dir: root.path().join("extensions"),
            data_dir: root.path().join("data"),
            eval_timeout_seconds: 5,
            debug_output: false,
            enable_suggestions: true,
            verified_hashes_url: String::new(),
            store_url: String::new(),
        };
        settings.ensure_dirs().expect("Failed to create fixture dirs");
        Self::with_settings(root, settings)
    }

    /// Fixture seeded with a copy of `golden/extensions`.
    pub fn golden() -> Self {
        let fixture = Self::empty();
        copy_tree(&golden_path("extensions"), fixture.extensions_dir());
        fixture
    }

    fn with_settings(root: TempDir, settings: Settings) -> Self {
        let reporter = Arc::new(MemoryReporter::new());
        let shell = Shell::from_settings(&settings, reporter.clone());
        Self {
            root,
            settings,
            reporter,
            shell,
        }
    }

    pub fn extensions_dir(&self) -> &Path {
        &self.settings.extensions_dir
    }

    /// Writes an extension file and returns its path.
    pub fn add_extension(&self, name: &str, content: &str) -> PathBuf {
        let path = self.extensions_dir().join(name);
        fs::write(&path, content).expect("Failed to write extension");
        path
    }

    /// A second shell over the same directories, as a fresh process would
    /// see them.
    pub fn restart(&self) -> (Arc<MemoryReporter>, Shell) {
        let reporter = Arc::new(MemoryReporter::new());
        let shell = Shell::from_settings(&self.settings, reporter.clone());
        (reporter, shell)
    }

    /// Names of every distinct registered command, sorted.
    pub fn command_names(&self) -> Vec<String> {
        self.shell
            .registry()
            .list_all()
            .iter()
            .map(|c| c.info().name.clone())
            .collect()
    }

    /// Texts of the responses reported since the last clear.
    pub fn texts(&self) -> Vec<String> {
        self.reporter.responses().into_iter().map(|e| e.text).collect()
    }
}

/// Copies every file under `from` into `to`, keeping relative paths.
pub fn copy_tree(from: &Path, to: &Path) {
    for entry in WalkDir::new(from).into_iter().filter_map(Result::ok) {
        let rel = entry
            .path()
            .strip_prefix(from)
            .expect("walkdir yields paths under its root");
        let target = to.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).expect("Failed to create fixture dir");
        } else {
            fs::copy(entry.path(), &target).expect("Failed to copy fixture file");
        }
    }
}
