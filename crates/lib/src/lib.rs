//! tensorseal-lib: the encrypted-model build factory.
//!
//! A factory run takes a secret key and a user identifier and turns a
//! checked-out Android project into a user-specific distributable:
//! - `inject`: seal a placeholder model and emit the key header
//! - `build`: compile the release library with Gradle
//! - `package`: stage the library and sealing tool and zip them
//! - `publish`: optionally upload the archive to object storage
//!
//! `pipeline` runs these in order and stops at the first failure.

pub mod build;
pub mod config;
pub mod consts;
pub mod inject;
pub mod layout;
pub mod package;
pub mod pipeline;
pub mod publish;
pub mod runner;
pub mod util;
