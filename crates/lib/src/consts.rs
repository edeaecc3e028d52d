//! Fixed names shared across the factory stages.

/// User identifier applied when `USER_ID` is not set.
pub const DEFAULT_USER_ID: &str = "local-test-user";

pub const DEFAULT_PYTHON: &str = "python3";

/// Bytes written to the placeholder model handed to the sealing tool.
pub const PLACEHOLDER_CONTENT: &[u8] = b"dummy content";

// Environment variables read by `FactoryConfig::from_env`.
pub const ENV_BUILD_KEY: &str = "BUILD_KEY";
pub const ENV_USER_ID: &str = "USER_ID";
pub const ENV_BUCKET_NAME: &str = "BUCKET_NAME";
pub const ENV_ROOT: &str = "FACTORY_ROOT";
pub const ENV_PYTHON: &str = "FACTORY_PYTHON";
pub const ENV_STAGE_TIMEOUT: &str = "FACTORY_STAGE_TIMEOUT";
pub const ENV_REQUIRE_USER_ID: &str = "FACTORY_REQUIRE_USER_ID";

// Layout, relative to the factory root.
pub const ASSETS_DIR: &str = "app/src/main/assets";
pub const PLACEHOLDER_FILENAME: &str = "dummy.tflite";
pub const SEALED_FILENAME: &str = "dummy.lock";
pub const HEADER_PATH: &str = "app/src/main/cpp/SecretKey.h";
pub const SEAL_TOOL_PATH: &str = "tools/tensorseal.py";
pub const GRADLE_WRAPPER: &str = "gradlew";
pub const GRADLE_TASK: &str = ":app:assembleRelease";
pub const AAR_PATH: &str = "app/build/outputs/aar/app-release.aar";
pub const STAGING_DIR: &str = "staging_temp";
pub const OUTPUT_DIR: &str = "dist";

// Archive naming.
pub const ARCHIVE_PREFIX: &str = "tensorseal-";
pub const ARCHIVE_EXTENSION: &str = "zip";
pub const STAGED_AAR_NAME: &str = "tensorseal.aar";
pub const STAGED_TOOL_NAME: &str = "packer.py";

/// Prefix of every remote object key: `builds/<user>/<archive>`.
pub const REMOTE_KEY_PREFIX: &str = "builds";
