//! # Registry
//!
//! The registry owns the three definition trees (programs, libraries, runtime
//! definitions) kept under a base directory, and turns a program's indirect
//! references into a concrete process invocation:
//!
//! 1. The program's `runtime` link path is resolved in the runtime tree.
//! 2. Its comma-joined `libraries` link paths are resolved in the library tree.
//!    References that do not resolve to a library are dropped.
//! 3. A dependency path is built: `.`, every library path, the program archive,
//!    joined with the platform path-list separator and quoted as one argument.
//! 4. The runtime's argument template is tokenized on whitespace and its
//!    placeholders (`%c`, `%m`, `%a`) are substituted.

use crate::constants::{
    ARGUMENTS_PLACEHOLDER, CLASSPATH_PLACEHOLDER, CURRENT_DIR_MARKER, DEFAULT_RUNTIME_NAME,
    ENTRY_POINT_PLACEHOLDER, LIBRARIES_DIR, PATH_LIST_SEPARATOR, PROGRAMS_DIR, RUNTIMES_DIR,
};
use crate::core::commons::{wrap_if_needed, wrap_value};
use crate::core::data_source::DefinitionDataSource;
use crate::core::host_runtime;
use crate::core::node::{NodeError, NodeId};
use crate::models::{LeafKind, Library, NodeData, Program, RuntimeDefinition};
use crate::system::process::{ManagedProcess, split_command};
use crate::system::task::TaskError;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Represents errors that can occur while resolving definitions.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// A tree operation failed.
    #[error(transparent)]
    Node(#[from] NodeError),
    /// No program lives at the given link path.
    #[error("Program '{link}' not found.")]
    ProgramNotFound {
        /// The link path that was looked up.
        link: String,
    },
    /// The program's runtime link does not resolve to a runtime definition.
    #[error("Program '{program}' has no runnable definition: runtime '{link}' not found.")]
    RuntimeNotFound {
        /// Name of the program being resolved.
        program: String,
        /// The unresolved runtime link path.
        link: String,
    },
}

type RegistryResult<T> = Result<T, RegistryError>;

/// A resolved process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    /// `[runtime executable, expanded template tokens...]`.
    pub args: Vec<String>,
    /// Directory the process should start in, if the program names one.
    pub working_dir: Option<PathBuf>,
}

impl LaunchSpec {
    /// Renders the arguments as a single command line for
    /// [`RuntimeManager::run`](crate::system::runtime_manager::RuntimeManager::run).
    pub fn command_line(&self) -> String {
        command_line(&self.args)
    }

    /// Builds the process for this invocation, named `name`.
    ///
    /// The arguments are parsed back from [`command_line`](Self::command_line) so the
    /// quoting around the dependency path never reaches the runtime.
    pub fn to_process(&self, name: &str) -> Result<ManagedProcess, TaskError> {
        let argv = split_command(&self.command_line())?;
        ManagedProcess::new(name, &argv, self.working_dir.as_deref())
    }
}

/// Joins invocation arguments into one command line. Only the executable is
/// quoted on demand; the other tokens already carry their own quoting.
pub fn command_line(args: &[String]) -> String {
    let mut parts = args.iter();
    let mut line = parts.next().map(|exe| wrap_if_needed(exe)).unwrap_or_default();
    for arg in parts {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

/// The definition registry: three data sources under one base directory.
#[derive(Debug)]
pub struct Registry {
    base_dir: PathBuf,
    programs: DefinitionDataSource,
    libraries: DefinitionDataSource,
    runtimes: DefinitionDataSource,
}

impl Registry {
    /// Creates a registry rooted at `base_dir`. Nothing is read until [`load`](Self::load).
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            programs: DefinitionDataSource::new(base_dir.join(PROGRAMS_DIR), LeafKind::Program),
            libraries: DefinitionDataSource::new(base_dir.join(LIBRARIES_DIR), LeafKind::Library),
            runtimes: DefinitionDataSource::new(base_dir.join(RUNTIMES_DIR), LeafKind::Runtime),
            base_dir,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn programs(&self) -> &DefinitionDataSource {
        &self.programs
    }

    pub fn programs_mut(&mut self) -> &mut DefinitionDataSource {
        &mut self.programs
    }

    pub fn libraries(&self) -> &DefinitionDataSource {
        &self.libraries
    }

    pub fn libraries_mut(&mut self) -> &mut DefinitionDataSource {
        &mut self.libraries
    }

    pub fn runtimes(&self) -> &DefinitionDataSource {
        &self.runtimes
    }

    pub fn runtimes_mut(&mut self) -> &mut DefinitionDataSource {
        &mut self.runtimes
    }

    /// Returns the data source holding leaves of `kind`.
    pub fn source(&self, kind: LeafKind) -> &DefinitionDataSource {
        match kind {
            LeafKind::Program => &self.programs,
            LeafKind::Library => &self.libraries,
            LeafKind::Runtime => &self.runtimes,
        }
    }

    pub fn source_mut(&mut self, kind: LeafKind) -> &mut DefinitionDataSource {
        match kind {
            LeafKind::Program => &mut self.programs,
            LeafKind::Library => &mut self.libraries,
            LeafKind::Runtime => &mut self.runtimes,
        }
    }

    /// Finds the data source whose root name matches the first segment of `link`.
    pub fn source_for_link(&self, link: &str) -> Option<&DefinitionDataSource> {
        [&self.programs, &self.libraries, &self.runtimes]
            .into_iter()
            .find(|ds| ds.find_node(link).is_some())
    }

    /// Mutable counterpart of [`source_for_link`](Self::source_for_link).
    pub fn source_for_link_mut(&mut self, link: &str) -> Option<&mut DefinitionDataSource> {
        [&mut self.programs, &mut self.libraries, &mut self.runtimes]
            .into_iter()
            .find(|ds| ds.find_node(link).is_some())
    }

    // --- Loading ---

    /// Loads the three trees in parallel. A failing tree is logged and reported
    /// without aborting the others.
    ///
    /// If the runtime tree loaded but holds no definition, one describing the host
    /// environment is synthesized and persisted as `/runtimes/default`.
    pub fn load(&mut self) -> Vec<(LeafKind, NodeError)> {
        log::debug!("Loading registry from '{}'", self.base_dir.display());
        let (programs, (libraries, runtimes)) = rayon::join(
            || self.programs.load(),
            || rayon::join(|| self.libraries.load(), || self.runtimes.load()),
        );

        let mut failures = Vec::new();
        let runtimes_loaded = runtimes.is_ok();
        for (kind, result) in [
            (LeafKind::Program, programs),
            (LeafKind::Library, libraries),
            (LeafKind::Runtime, runtimes),
        ] {
            if let Err(e) = result {
                log::error!("Failed to load {:?} definitions: {}", kind, e);
                failures.push((kind, e));
            }
        }

        if runtimes_loaded && self.runtimes.leaves().is_empty() {
            log::warn!("No runtime definition found. Creating one for the host environment.");
            let root = self.runtimes.root();
            let host = NodeData::Runtime(host_runtime::describe_host());
            if let Err(e) = self.runtimes.create_leaf(root, DEFAULT_RUNTIME_NAME, host) {
                log::error!("Failed to persist the default runtime definition: {}", e);
                failures.push((LeafKind::Runtime, e));
            }
        }
        failures
    }

    // --- Lookup ---

    /// Resolves a program by link path.
    pub fn find_program(&self, link: &str) -> Option<&Program> {
        self.programs
            .find_node(link)
            .and_then(|id| self.programs.node(id))
            .and_then(|n| n.data().as_program())
    }

    /// Resolves a runtime definition by link path.
    pub fn find_runtime(&self, link: &str) -> Option<&RuntimeDefinition> {
        self.runtimes
            .find_node(link)
            .and_then(|id| self.runtimes.node(id))
            .and_then(|n| n.data().as_runtime())
    }

    /// Resolves a library by link path.
    pub fn find_library(&self, link: &str) -> Option<&Library> {
        self.libraries
            .find_node(link)
            .and_then(|id| self.libraries.node(id))
            .and_then(|n| n.data().as_library())
    }

    /// Resolves the program's library references.
    ///
    /// References that do not resolve to a library are dropped. Duplicates are
    /// collapsed, and the result follows the library tree's order.
    pub fn resolve_libraries(&self, program: &Program) -> Vec<&Library> {
        let wanted: HashSet<NodeId> = program
            .library_links()
            .into_iter()
            .filter_map(|link| {
                let id = self.library_id(link);
                if id.is_none() {
                    log::debug!("Dropping unresolved library reference '{}'", link);
                }
                id
            })
            .collect();

        self.libraries
            .leaves()
            .into_iter()
            .filter(|id| wanted.contains(id))
            .filter_map(|id| self.libraries.node(id).and_then(|n| n.data().as_library()))
            .collect()
    }

    /// The program's library references that do not name a library, each listed once.
    pub fn unresolved_libraries<'a>(&self, program: &'a Program) -> Vec<&'a str> {
        let mut seen = HashSet::new();
        program
            .library_links()
            .into_iter()
            .filter(|link| self.library_id(link).is_none() && seen.insert(*link))
            .collect()
    }

    fn library_id(&self, link: &str) -> Option<NodeId> {
        self.libraries.find_node(link).filter(|id| {
            self.libraries
                .node(*id)
                .is_some_and(|n| n.data().as_library().is_some())
        })
    }

    /// Resolves the program's runtime definition.
    pub fn resolve_runtime(&self, program: &Program) -> RegistryResult<&RuntimeDefinition> {
        self.find_runtime(&program.runtime)
            .ok_or_else(|| RegistryError::RuntimeNotFound {
                program: program.name.clone(),
                link: program.runtime.clone(),
            })
    }

    // --- Invocation ---

    /// Builds the quoted dependency path: `.`, each library path, then the archive.
    /// Empty entries are skipped.
    pub fn dependency_path(program: &Program, libraries: &[&Library]) -> String {
        let separator = PATH_LIST_SEPARATOR.to_string();
        let entries: Vec<&str> = std::iter::once(CURRENT_DIR_MARKER)
            .chain(libraries.iter().map(|l| l.path.as_str()))
            .chain(std::iter::once(program.archive.as_str()))
            .filter(|e| !e.is_empty())
            .collect();
        wrap_value(&entries.join(&separator))
    }

    /// Builds the invocation argument vector of `program`:
    /// `[runtime executable, expanded template tokens...]`.
    pub fn build_invocation_args(&self, program: &Program) -> RegistryResult<Vec<String>> {
        let runtime = self.resolve_runtime(program)?;
        let libraries = self.resolve_libraries(program);
        let dependency_path = Self::dependency_path(program, &libraries);

        let mut args = Vec::with_capacity(8);
        args.push(runtime.path.clone());
        for token in runtime.arguments.split_whitespace() {
            match token {
                CLASSPATH_PLACEHOLDER => args.push(dependency_path.clone()),
                ENTRY_POINT_PLACEHOLDER => args.push(program.main.clone()),
                ARGUMENTS_PLACEHOLDER => {
                    args.extend(program.arguments.split_whitespace().map(str::to_string));
                }
                literal => args.push(literal.to_string()),
            }
        }
        log::debug!("Invocation for '{}': {:?}", program.name, args);
        Ok(args)
    }

    /// Resolves the program at `link` into a launch spec.
    pub fn launch_spec(&self, link: &str) -> RegistryResult<LaunchSpec> {
        let program = self
            .find_program(link)
            .ok_or_else(|| RegistryError::ProgramNotFound {
                link: link.to_string(),
            })?;
        let args = self.build_invocation_args(program)?;
        let working_dir = match program.workdir.trim() {
            "" => None,
            dir => Some(self.base_dir.join(dir)),
        };
        Ok(LaunchSpec { args, working_dir })
    }

    /// The program at `link` as a single command line.
    pub fn command_line(&self, link: &str) -> RegistryResult<String> {
        Ok(self.launch_spec(link)?.command_line())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_ARGUMENT_TEMPLATE;
    use std::fs;
    use tempfile::TempDir;

    fn sep() -> String {
        PATH_LIST_SEPARATOR.to_string()
    }

    /// Registry with `/runtimes/default` and libraries `foo` and `bar`.
    fn fixture(dir: &TempDir) -> Registry {
        let mut registry = Registry::new(dir.path());
        registry.load();

        let runtimes = registry.runtimes_mut();
        let default = runtimes.find_node("/runtimes/default").unwrap();
        if let Some(NodeData::Runtime(rt)) = runtimes.node_mut(default).map(|n| n.data_mut()) {
            rt.path = "/opt/jdk/bin/java".to_string();
            rt.arguments = "-cp %c %m %a".to_string();
        }
        runtimes.save(default).unwrap();

        let libraries = registry.libraries_mut();
        let root = libraries.root();
        for name in ["foo", "bar"] {
            let lib = Library {
                name: name.to_string(),
                path: format!("/opt/{name}.jar"),
                ..Default::default()
            };
            libraries.create_leaf(root, name, NodeData::Library(lib)).unwrap();
        }
        registry
    }

    fn demo_program() -> Program {
        Program {
            name: "demo".to_string(),
            runtime: "/runtimes/default".to_string(),
            libraries: "/libs/foo,/libs/bar".to_string(),
            archive: "app.jar".to_string(),
            main: "com.Foo".to_string(),
            arguments: "--flag".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_load_creates_roots_and_default_runtime() {
        let dir = TempDir::new().unwrap();
        let mut registry = Registry::new(dir.path());
        let failures = registry.load();

        assert!(failures.is_empty());
        assert!(dir.path().join(PROGRAMS_DIR).is_dir());
        assert!(dir.path().join(LIBRARIES_DIR).is_dir());
        assert!(dir.path().join(RUNTIMES_DIR).join("default.cfg").is_file());
        let runtime = registry.find_runtime("/runtimes/default").unwrap();
        assert_eq!(runtime.arguments, DEFAULT_ARGUMENT_TEMPLATE);

        // A second load finds the persisted definition instead of creating another.
        let mut again = Registry::new(dir.path());
        assert!(again.load().is_empty());
        assert_eq!(again.runtimes().leaves().len(), 1);
    }

    #[test]
    fn test_existing_runtime_suppresses_default() {
        let dir = TempDir::new().unwrap();
        let runtimes = dir.path().join(RUNTIMES_DIR).join("jdk");
        fs::create_dir_all(&runtimes).unwrap();
        fs::write(runtimes.join("21.cfg"), "path=/opt/jdk21/bin/java\n").unwrap();

        let mut registry = Registry::new(dir.path());
        registry.load();
        assert!(registry.find_runtime("/runtimes/default").is_none());
        assert!(registry.find_runtime("/runtimes/jdk/21").is_some());
    }

    #[test]
    fn test_one_broken_tree_does_not_abort_the_others() {
        let dir = TempDir::new().unwrap();
        // A plain file where the programs directory should be.
        fs::write(dir.path().join(PROGRAMS_DIR), "not a directory").unwrap();

        let mut registry = Registry::new(dir.path());
        let failures = registry.load();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, LeafKind::Program);
        assert!(registry.find_runtime("/runtimes/default").is_some());
    }

    #[test]
    fn test_build_invocation_args_substitutes_placeholders() {
        let dir = TempDir::new().unwrap();
        let registry = fixture(&dir);

        let args = registry.build_invocation_args(&demo_program()).unwrap();
        let expected_path = format!(
            "\".{s}/opt/bar.jar{s}/opt/foo.jar{s}app.jar\"",
            s = sep()
        );
        assert_eq!(
            args,
            vec![
                "/opt/jdk/bin/java".to_string(),
                "-cp".to_string(),
                expected_path,
                "com.Foo".to_string(),
                "--flag".to_string(),
            ]
        );
    }

    #[test]
    fn test_arguments_placeholder_expands_to_one_arg_per_word() {
        let dir = TempDir::new().unwrap();
        let registry = fixture(&dir);
        let mut program = demo_program();
        program.arguments = "  --mode fast\t-v ".to_string();

        let args = registry.build_invocation_args(&program).unwrap();
        assert_eq!(&args[4..], &["--mode", "fast", "-v"]);
    }

    #[test]
    fn test_missing_runtime_is_an_explicit_error() {
        let dir = TempDir::new().unwrap();
        let registry = fixture(&dir);
        let mut program = demo_program();
        program.runtime = "/runtimes/nope".to_string();

        let err = registry.build_invocation_args(&program).unwrap_err();
        assert!(matches!(err, RegistryError::RuntimeNotFound { ref link, .. } if link == "/runtimes/nope"));
    }

    #[test]
    fn test_unresolved_and_duplicate_libraries_are_dropped() {
        let dir = TempDir::new().unwrap();
        let registry = fixture(&dir);
        let mut program = demo_program();
        program.libraries = "/libs/foo, /libs/missing, /runtimes/default, /libs/foo,/libs".to_string();

        let libs = registry.resolve_libraries(&program);
        assert_eq!(libs.len(), 1);
        assert_eq!(libs[0].name, "foo");
    }

    #[test]
    fn test_empty_dependency_path_degenerates_to_current_dir() {
        let program = Program::default();
        assert_eq!(Registry::dependency_path(&program, &[]), "\".\"");
    }

    #[test]
    fn test_launch_spec_resolves_program_and_workdir() {
        let dir = TempDir::new().unwrap();
        let mut registry = fixture(&dir);
        let mut program = demo_program();
        program.workdir = "work".to_string();
        let programs = registry.programs_mut();
        let root = programs.root();
        programs.create_leaf(root, "demo", NodeData::Program(program)).unwrap();

        let spec = registry.launch_spec("/programs/demo").unwrap();
        assert_eq!(spec.working_dir, Some(dir.path().join("work")));
        assert_eq!(spec.args.len(), 5);
        assert!(spec.command_line().starts_with("/opt/jdk/bin/java -cp \"."));
        assert_eq!(registry.command_line("/programs/demo").unwrap(), spec.command_line());

        assert!(matches!(
            registry.launch_spec("/programs/ghost"),
            Err(RegistryError::ProgramNotFound { .. })
        ));
    }

    #[test]
    fn test_duplicate_library_references_are_not_unresolved() {
        let dir = TempDir::new().unwrap();
        let registry = fixture(&dir);
        let mut program = demo_program();
        program.libraries = "/libs/foo,/libs/foo,/libs/ghost,/libs,/libs/ghost".to_string();

        assert_eq!(registry.resolve_libraries(&program).len(), 1);
        assert_eq!(registry.unresolved_libraries(&program), vec!["/libs/ghost", "/libs"]);

        program.libraries = "/libs/foo,/libs/foo".to_string();
        assert!(registry.unresolved_libraries(&program).is_empty());
    }

    #[test]
    fn test_command_line_quotes_executable_with_spaces() {
        let args = vec!["/opt/my jdk/java".to_string(), "-version".to_string()];
        assert_eq!(command_line(&args), "\"/opt/my jdk/java\" -version");
        assert_eq!(command_line(&[]), "");
    }

    #[test]
    fn test_source_for_link_picks_the_right_tree() {
        let dir = TempDir::new().unwrap();
        let registry = fixture(&dir);
        let ds = registry.source_for_link("/libs/foo").unwrap();
        assert_eq!(ds.leaf_kind(), LeafKind::Library);
        assert!(registry.source_for_link("/nowhere").is_none());
        assert_eq!(registry.source(LeafKind::Runtime).leaf_kind(), LeafKind::Runtime);
    }

    /// `fixture` with `/runtimes/default` pointing at `/bin/echo` and `/programs/demo` saved.
    #[cfg(unix)]
    fn echo_fixture(dir: &TempDir) -> Registry {
        let mut registry = fixture(dir);
        let runtimes = registry.runtimes_mut();
        let default = runtimes.find_node("/runtimes/default").unwrap();
        if let Some(NodeData::Runtime(rt)) = runtimes.node_mut(default).map(|n| n.data_mut()) {
            rt.path = "/bin/echo".to_string();
        }
        runtimes.save(default).unwrap();

        let programs = registry.programs_mut();
        let root = programs.root();
        programs
            .create_leaf(root, "demo", NodeData::Program(demo_program()))
            .unwrap();
        registry
    }

    #[cfg(unix)]
    #[test]
    fn test_launched_runtime_receives_unquoted_dependency_path() {
        use crate::system::task::{MemoryLog, Task};
        use std::sync::Arc;

        let dir = TempDir::new().unwrap();
        let registry = echo_fixture(&dir);
        let spec = registry.launch_spec("/programs/demo").unwrap();

        let log = Arc::new(MemoryLog::default());
        let process = spec.to_process("demo").unwrap().with_log(log.clone());
        let dependency_path = format!(".{s}/opt/bar.jar{s}/opt/foo.jar{s}app.jar", s = sep());
        assert_eq!(process.program(), "/bin/echo");
        assert_eq!(
            process.args(),
            &["-cp", dependency_path.as_str(), "com.Foo", "--flag"]
        );

        process.run().unwrap();
        let output = log.contents();
        assert!(
            output.contains(&format!(": -cp {dependency_path} com.Foo --flag\n")),
            "unexpected output: {output:?}"
        );
        assert!(!output.contains('"'));
    }

    #[cfg(unix)]
    #[test]
    fn test_runtime_manager_launches_a_resolved_program() {
        use crate::core::settings::PoolSettings;
        use crate::system::runtime_manager::RuntimeManager;
        use crate::system::task::Task;
        use std::time::Duration;

        let dir = TempDir::new().unwrap();
        let registry = echo_fixture(&dir);
        let spec = registry.launch_spec("/programs/demo").unwrap();

        let manager = RuntimeManager::new(&PoolSettings::default());
        let process = manager.launch("demo", &spec).unwrap();
        manager.shutdown();
        assert!(manager.await_termination(Duration::from_secs(10)));

        assert_eq!(process.exit_code(), Some(0));
        let output = format!("{:?}", process.log());
        assert!(output.contains("app.jar com.Foo --flag"), "unexpected output: {output}");
        assert!(!output.contains("\\\""));
    }
}
