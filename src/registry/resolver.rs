//! # Composite Resolver
//!
//! Turns a stager name into a [`StagerNode`], composing wrappers for compound
//! names of the form `<wrapper>[$suffix]_<base>`.
//!
//! Resolution order:
//!
//! 1. A plain stager registered under the exact name wins.
//! 2. Otherwise the name is split at the first `_`. No `_` means the original
//!    lookup failure is returned.
//! 3. The wrapper part is truncated at `$`; the suffix only tells several
//!    instances of the same wrapper apart.
//! 4. The base part is resolved recursively, so wrappers nest:
//!    `Outer_Inner_Base` is `Outer(Inner(Base))`.
//!
//! A wrapper that cannot be found fails with its own lookup error, not the
//! error of the original plain lookup.

use super::ModuleRegistry;
use crate::constants::{COMPOSITE_SEPARATOR, INSTANCE_MARKER};
use crate::error::StagerResult;
use crate::handler::StagerNode;
use tracing::debug;

/// Parsed `<wrapper>_<base>` name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositeName<'a> {
    pub wrapper: &'a str,
    pub base: &'a str,
}

impl<'a> CompositeName<'a> {
    /// Split a compound name, or `None` if it has no composite separator
    pub fn parse(name: &'a str) -> Option<Self> {
        let (wrapper, base) = name.split_once(COMPOSITE_SEPARATOR)?;
        let wrapper = wrapper
            .split_once(INSTANCE_MARKER)
            .map_or(wrapper, |(kind, _suffix)| kind);
        Some(Self { wrapper, base })
    }
}

/// Resolve a stager name against the registry
pub fn resolve_stager(registry: &ModuleRegistry, name: &str) -> StagerResult<StagerNode> {
    let lookup_error = match registry.create_stager(name) {
        Ok(node) => {
            debug!(stager = name, "Resolved plain stager");
            return Ok(node);
        }
        Err(error) => error,
    };

    let Some(composite) = CompositeName::parse(name) else {
        return Err(lookup_error);
    };

    debug!(
        name = name,
        wrapper = composite.wrapper,
        base = composite.base,
        "Resolving compound stager name"
    );

    let wrapper = registry.create_wrapper(composite.wrapper)?;
    let delegate = resolve_stager(registry, composite.base)?;
    Ok(StagerNode::composite(composite.wrapper, wrapper, delegate))
}
