//! Host platform utility functions

use std::env;
use std::path::PathBuf;

/// Name of the environment variable pointing at the root of the software
/// checkout, which contains the `params` and `sessions` directories.
pub const SW_ROOT_ENV_VAR: &str = "RESCUE_SW_ROOT";

/// Get the software root directory from the environment.
pub fn get_sw_root() -> Result<PathBuf, env::VarError> {
    env::var(SW_ROOT_ENV_VAR).map(PathBuf::from)
}
