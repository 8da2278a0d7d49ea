// SPDX-License-Identifier: MIT

//! Discovery Scanner: finds apps dropped into `<userAppData>/Ghost/Apps`
//! without an explicit `register` call.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ghost_core::{ProcessRecord, ProcessStatus, ProcessType};
use tracing::debug;

/// Platform-appropriate executable extension appended to the directory name
/// when looking for an app's entry point.
#[cfg(target_os = "windows")]
const EXE_SUFFIX: &str = ".exe";
#[cfg(not(target_os = "windows"))]
const EXE_SUFFIX: &str = "";

pub struct Discovery {
    apps_dir: PathBuf,
}

impl Discovery {
    pub fn new(apps_dir: PathBuf) -> Self {
        Self { apps_dir }
    }

    /// Treats each direct subdirectory of the apps root as an app, looking
    /// for an executable matching the directory's name. Directories with no
    /// matching executable are skipped silently; a missing apps root yields
    /// an empty result rather than an error (discovery is best-effort).
    pub fn scan(&self) -> Vec<ProcessRecord> {
        let entries = match std::fs::read_dir(&self.apps_dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(dir = %self.apps_dir.display(), error = %e, "discovery root unreadable");
                return Vec::new();
            }
        };

        let mut found = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else { continue };
            if let Some(executable) = find_executable(&path, name) {
                found.push(app_record(name, executable, &path));
            }
        }
        found
    }
}

fn find_executable(dir: &Path, name: &str) -> Option<PathBuf> {
    let candidate = dir.join(format!("{name}{EXE_SUFFIX}"));
    candidate.is_file().then_some(candidate)
}

fn app_record(name: &str, executable_path: PathBuf, working_directory: &Path) -> ProcessRecord {
    ProcessRecord {
        id: name.to_string(),
        name: name.to_string(),
        process_type: ProcessType::OneShot,
        version: "1.0.0".to_string(),
        executable_path,
        arguments: Vec::new(),
        working_directory: Some(working_directory.to_path_buf()),
        environment: HashMap::new(),
        configuration: HashMap::from([(ProcessRecord::APP_TYPE_KEY.to_string(), "app".to_string())]),
        status: ProcessStatus::Registered,
        pid: None,
        started_at: None,
        updated_at: 0,
        restart_count: 0,
    }
}

#[cfg(test)]
#[path = "discovery_tests.rs"]
mod tests;
