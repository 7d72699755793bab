// src/constants.rs

/// Sub-directory of the base directory holding program definitions.
pub const PROGRAMS_DIR: &str = "programs";

/// Sub-directory of the base directory holding library definitions.
pub const LIBRARIES_DIR: &str = "libs";

/// Sub-directory of the base directory holding runtime definitions.
pub const RUNTIMES_DIR: &str = "runtimes";

/// Suffix of leaf definition files. Stripped to produce the node name.
pub const LEAF_SUFFIX: &str = ".cfg";

/// First line written to every leaf definition file.
pub const LEAF_HEADER: &str = "defreg definition file";

/// Name of the runtime definition synthesized when none exists.
pub const DEFAULT_RUNTIME_NAME: &str = "default";

/// Name of the settings file (inside the base directory).
pub const SETTINGS_FILENAME: &str = "defreg.toml";

/// Environment variable overriding the base directory.
pub const HOME_ENV_VAR: &str = "DEFREG_HOME";

/// Template placeholder replaced by the quoted dependency path.
pub const CLASSPATH_PLACEHOLDER: &str = "%c";

/// Template placeholder replaced by the program's entry point.
pub const ENTRY_POINT_PLACEHOLDER: &str = "%m";

/// Template placeholder replaced by the program's extra arguments.
pub const ARGUMENTS_PLACEHOLDER: &str = "%a";

/// Argument template given to a synthesized runtime definition.
pub const DEFAULT_ARGUMENT_TEMPLATE: &str = "-cp %c %m %a";

/// Marker for the current directory at the head of every dependency path.
pub const CURRENT_DIR_MARKER: &str = ".";

/// Separator of the platform's path lists (`PATH`, class paths, ...).
pub const PATH_LIST_SEPARATOR: char = if cfg!(windows) { ';' } else { ':' };

/// Event fired on a pool worker right before a task body runs.
pub const EVENT_BEFORE_EXECUTE: i32 = 1000;

/// Event fired on a pool worker right after a task body returns.
pub const EVENT_AFTER_EXECUTE: i32 = 1001;

/// Bytes read per iteration by a log reader.
pub const LOG_CHUNK_SIZE: usize = 360;
