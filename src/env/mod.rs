//! Built-in environments
//!
//! Only the 1v1 high-value-target scenario ships with the crate; any other
//! simulator can be plugged into the pipeline through the `Environment` port.

pub mod hvt;

pub use hvt::{HvtConfig, HvtEnvironment};

use crate::{Error, Result, ports::Environment};

/// Scenario names accepted by [`make_env`]
pub const SCENARIOS: &[&str] = &["hvt_1v1", "simple_hvt_1v1"];

/// Build an environment by scenario name.
pub fn make_env(scenario: &str, config: HvtConfig) -> Result<Box<dyn Environment>> {
    let name = scenario.rsplit('/').next().unwrap_or(scenario);
    match name {
        "hvt_1v1" | "simple_hvt_1v1" | "simple_hvt_1v1_random" => {
            Ok(Box::new(HvtEnvironment::new(config)))
        }
        other => Err(Error::config(format!(
            "unknown scenario '{other}', expected one of {SCENARIOS:?}"
        ))),
    }
}
