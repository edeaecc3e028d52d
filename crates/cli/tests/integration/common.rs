//! Shared test helpers for CLI integration tests.

use std::collections::BTreeSet;
use std::fs::File;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

pub const BUILD_KEY: &str = "factory-test-key-7f3a";

/// Stand-in for the sealing tool, run through `/bin/sh`.
pub const SEAL_TOOL: &str = r#"#!/bin/sh
set -e
while [ $# -gt 0 ]; do
  case "$1" in
    --input) input="$2"; shift 2 ;;
    --output) output="$2"; shift 2 ;;
    --header) header="$2"; shift 2 ;;
    --key) key="$2"; shift 2 ;;
    *) exit 2 ;;
  esac
done
mkdir -p "$(dirname "$output")" "$(dirname "$header")"
cat "$input" > "$output"
printf '#define TENSORSEAL_KEY "%s"\n' "$key" > "$header"
"#;

pub const GRADLEW_OK: &str = r#"#!/bin/sh
set -e
mkdir -p app/build/outputs/aar
printf 'aar-bytes' > app/build/outputs/aar/app-release.aar
"#;

pub const GRADLEW_NO_OUTPUT: &str = "#!/bin/sh\necho 'BUILD SUCCESSFUL' >&2\nexit 0\n";

/// Isolated project root with a stand-in toolchain.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  pub fn new() -> Self {
    Self::with_gradlew(GRADLEW_OK)
  }

  pub fn with_gradlew(gradlew: &str) -> Self {
    let env = Self {
      temp: TempDir::new().unwrap(),
    };
    env.write_file("tools/tensorseal.py", SEAL_TOOL);
    env.write_file("gradlew", gradlew);
    env
  }

  pub fn root(&self) -> &Path {
    self.temp.path()
  }

  /// Write a file relative to the root.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  pub fn archive(&self, user: &str) -> PathBuf {
    self.root().join("dist").join(format!("tensorseal-{user}.zip"))
  }

  /// A `run` command for `user` with no upload configured.
  pub fn run_cmd(&self, user: &str) -> Command {
    let mut cmd = cargo_bin_cmd!("tensorseal-factory");
    for var in [
      "BUCKET_NAME",
      "FACTORY_ROOT",
      "FACTORY_STAGE_TIMEOUT",
      "FACTORY_REQUIRE_USER_ID",
      "STORAGE_EMULATOR_HOST",
      "GOOGLE_OAUTH_ACCESS_TOKEN",
      "RUST_LOG",
    ] {
      cmd.env_remove(var);
    }
    cmd
      .arg("run")
      .arg("--root")
      .arg(self.root())
      .env("BUILD_KEY", BUILD_KEY)
      .env("USER_ID", user)
      .env("FACTORY_PYTHON", "/bin/sh");
    cmd
  }
}

pub fn archive_entries(path: &Path) -> BTreeSet<String> {
  let archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
  archive.file_names().map(str::to_string).collect()
}
