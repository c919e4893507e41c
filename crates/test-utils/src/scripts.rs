//! Throwaway shell scripts for exercising the engine against real processes.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Builds a `#!/bin/sh` script inside its own temp directory.
///
/// The directory (and script) is removed when the returned [`TestScript`]
/// is dropped.
pub struct ScriptBuilder {
    name: String,
    body: Vec<String>,
    executable: bool,
}

pub struct TestScript {
    _dir: TempDir,
    path: PathBuf,
}

impl TestScript {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ScriptBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            body: Vec::new(),
            executable: true,
        }
    }

    pub fn line(mut self, line: &str) -> Self {
        self.body.push(line.to_string());
        self
    }

    /// Leave the script without the executable bit.
    pub fn not_executable(mut self) -> Self {
        self.executable = false;
        self
    }

    pub fn build(self) -> TestScript {
        let dir = TempDir::new().expect("create temp dir for script");
        let path = dir.path().join(&self.name);

        let mut contents = String::from("#!/bin/sh\n");
        for line in &self.body {
            contents.push_str(line);
            contents.push('\n');
        }
        fs::write(&path, contents).expect("write script");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = if self.executable { 0o755 } else { 0o644 };
            fs::set_permissions(&path, fs::Permissions::from_mode(mode))
                .expect("set script permissions");
        }

        TestScript { _dir: dir, path }
    }
}
