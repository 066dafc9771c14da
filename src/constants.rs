//! # Dispatch Constants
//!
//! Literal tokens that define the argument contract and the compound module
//! naming scheme. These are part of the wire-level contract with callers and
//! are not configurable.

/// Token separating stager arguments from the stage name and its arguments
pub const STAGE_SEPARATOR: &str = "--";

/// Splits a compound stager name into `<wrapper>_<base>`
pub const COMPOSITE_SEPARATOR: char = '_';

/// Marks a disambiguation suffix on the wrapper part, e.g. `Spawn$2_Base`
pub const INSTANCE_MARKER: char = '$';

/// Prefix of the diagnostic line written when `prepare` rewrites the parameters
pub const PARAMETERS_CHANGED_PREFIX: &str = "Stager changed parameters:";

pub const USAGE: &str = "Usage: stager <stager> [stageroptions] -- <stage> [stageoptions]";

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "STAGER";

/// Default name of the background thread running a deferred stager
pub const DEFAULT_THREAD_NAME: &str = "stager-before";
