//! Test utilities for tensorseal-lib.
//!
//! Provides a throwaway factory root populated with POSIX shell stand-ins
//! for the sealing tool and the Gradle wrapper.

use std::path::Path;

use tempfile::TempDir;

use crate::config::FactoryConfig;
use crate::layout::Layout;

/// Sealing tool stand-in. Run through `/bin/sh`, which takes the place of the
/// Python interpreter.
pub const FAKE_SEAL_TOOL: &str = r#"#!/bin/sh
set -e
while [ $# -gt 0 ]; do
  case "$1" in
    --input) input="$2"; shift 2 ;;
    --output) output="$2"; shift 2 ;;
    --header) header="$2"; shift 2 ;;
    --key) key="$2"; shift 2 ;;
    *) echo "unexpected argument: $1" >&2; exit 2 ;;
  esac
done
[ -f "$input" ] || exit 3
mkdir -p "$(dirname "$output")" "$(dirname "$header")"
cat "$input" > "$output"
printf '#define TENSORSEAL_KEY "%s"\n' "$key" > "$header"
"#;

/// Gradle wrapper that deposits the release library.
pub const GRADLEW_OK: &str = r#"#!/bin/sh
set -e
[ "$1" = ":app:assembleRelease" ] || exit 4
[ "$2" = "--no-daemon" ] || exit 5
mkdir -p app/build/outputs/aar
printf 'aar-bytes' > app/build/outputs/aar/app-release.aar
"#;

/// Gradle wrapper that exits zero without producing anything.
pub const GRADLEW_NO_OUTPUT: &str = "#!/bin/sh\nexit 0\n";

/// Gradle wrapper that fails.
pub const GRADLEW_FAIL: &str = "#!/bin/sh\necho 'BUILD FAILED' >&2\nexit 1\n";

pub struct FakeRoot {
  pub temp: TempDir,
}

impl FakeRoot {
  /// A root whose toolchain succeeds.
  pub fn new() -> Self {
    Self::with_gradlew(GRADLEW_OK)
  }

  pub fn with_gradlew(gradlew: &str) -> Self {
    let temp = TempDir::new().unwrap();
    let root = Self { temp };
    root.write_file("tools/tensorseal.py", FAKE_SEAL_TOOL);
    // Deliberately not executable: the build stage must fix that.
    root.write_file("gradlew", gradlew);
    root
  }

  pub fn path(&self) -> &Path {
    self.temp.path()
  }

  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  pub fn config(&self, user: Option<&str>, bucket: Option<&str>) -> FactoryConfig {
    FactoryConfig::new("test-key-0123456789", user, bucket, self.path())
      .unwrap()
      .with_python("/bin/sh")
  }

  pub fn layout(&self) -> Layout {
    Layout::new(dunce::canonicalize(self.path()).unwrap())
  }
}
