//! # Argument Parsing
//!
//! Single-pass parse of the raw argument vector
//! `<stager> [stager options...] -- <stage> [stage options...]`.
//!
//! Only the separator position and the two module names are captured. The
//! stager's `prepare` step may rewrite values in the vector afterwards, so the
//! stager/stage partitions are exposed as views over whatever vector the
//! caller currently holds rather than as copies.

use crate::constants::STAGE_SEPARATOR;
use crate::error::{StagerError, StagerResult};
use tracing::warn;

/// Structured view of one argument vector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedArgs {
    stager_name: String,
    stage_name: String,
    separator_index: usize,
    len: usize,
}

impl ParsedArgs {
    /// Parse an argument vector.
    ///
    /// The stage name is the element following the LAST separator. A
    /// separator in final position has nothing after it and does not count.
    pub fn parse(args: &[String]) -> StagerResult<Self> {
        let mut separators = 0usize;
        let mut last = None;
        for (index, arg) in args.iter().enumerate().take(args.len().saturating_sub(1)) {
            if arg == STAGE_SEPARATOR {
                separators += 1;
                last = Some(index);
            }
        }

        let separator_index = last.ok_or_else(|| {
            StagerError::InvalidConfiguration(format!(
                "No stage given: expected '{STAGE_SEPARATOR}' followed by a stage name"
            ))
        })?;

        if separator_index == 0 {
            return Err(StagerError::InvalidConfiguration(
                "No stager given before the stage separator".to_string(),
            ));
        }

        if separators > 1 {
            warn!(
                separators = separators,
                separator_index = separator_index,
                "Multiple stage separators found, using the last one"
            );
        }

        Ok(Self {
            stager_name: args[0].clone(),
            stage_name: args[separator_index + 1].clone(),
            separator_index,
            len: args.len(),
        })
    }

    pub fn stager_name(&self) -> &str {
        &self.stager_name
    }

    pub fn stage_name(&self) -> &str {
        &self.stage_name
    }

    pub fn separator_index(&self) -> usize {
        self.separator_index
    }

    /// Number of elements in the parsed vector
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Stager name and its options: everything before the separator
    pub fn stager_args<'a>(&self, args: &'a [String]) -> &'a [String] {
        &args[..self.separator_index.min(args.len())]
    }

    /// Options following the stage name
    pub fn stage_args<'a>(&self, args: &'a [String]) -> &'a [String] {
        let start = (self.separator_index + 2).min(args.len());
        &args[start..]
    }
}
