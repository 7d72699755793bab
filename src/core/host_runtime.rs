// src/core/host_runtime.rs

//! Describes the runtime environment available to this process, used to
//! synthesize the default runtime definition of an empty registry.

use crate::constants::{DEFAULT_ARGUMENT_TEMPLATE, DEFAULT_RUNTIME_NAME};
use crate::models::RuntimeDefinition;
use std::env;
use std::path::PathBuf;

fn launcher_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "java.exe"
    } else {
        "java"
    }
}

/// Locates the runtime launcher: `$JAVA_HOME/bin` first, then every `PATH` entry.
/// Falls back to the bare launcher name, resolved by the OS at spawn time.
pub fn locate_launcher() -> PathBuf {
    let launcher = launcher_name();
    if let Some(home) = env::var_os("JAVA_HOME") {
        let candidate = PathBuf::from(home).join("bin").join(launcher);
        if candidate.is_file() {
            return dunce::simplified(&candidate).to_path_buf();
        }
    }
    if let Some(path_var) = env::var_os("PATH") {
        for dir in env::split_paths(&path_var) {
            let candidate = dir.join(launcher);
            if candidate.is_file() {
                return candidate;
            }
        }
    }
    PathBuf::from(launcher)
}

/// Builds the runtime definition describing the host environment.
pub fn describe_host() -> RuntimeDefinition {
    let path = locate_launcher();
    let version = env::var("JAVA_VERSION").unwrap_or_default();
    log::debug!(
        "Host runtime: '{}' (version '{}')",
        path.display(),
        version
    );
    RuntimeDefinition {
        name: DEFAULT_RUNTIME_NAME.to_string(),
        path: path.to_string_lossy().into_owned(),
        version,
        arguments: DEFAULT_ARGUMENT_TEMPLATE.to_string(),
        description: format!(
            "Detected on {} ({})",
            env::consts::OS,
            env::consts::ARCH
        ),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_description_uses_default_template() {
        let runtime = describe_host();
        assert_eq!(runtime.name, DEFAULT_RUNTIME_NAME);
        assert_eq!(runtime.arguments, DEFAULT_ARGUMENT_TEMPLATE);
        assert!(runtime.path.ends_with(launcher_name()));
    }
}
