//! Conversion State Machine
//!
//! Every call to the converter owns a [`ConversionContext`] that records which
//! pipeline stage the call is in. Stages only move forward, one at a time;
//! any stage may fail, after which the call yields no documents.
//!
//! # Stage Flow
//!
//! ```text
//! Validating
//!     ↓
//! Mapping
//!     ↓
//! Building
//!     ↓
//! ResolvingDeps
//!     ↓
//! Tagging
//!     ↓
//! Expanded
//!
//! (Any stage can transition to Failed)
//! ```
//!
//! Prerequisite modules are converted recursively while the top-level call is
//! in `ResolvingDeps`; those nested conversions run below depth zero and do
//! not move the stage.

use std::fmt;
use tracing::{debug, warn};

use crate::error::ConvertError;
use crate::types::{PackageManager, Platform};

/// Maximum prerequisite nesting before a conversion is abandoned
pub const MAX_DEPTH: usize = 16;

/// Pipeline stages in sequential order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConversionStage {
    /// Checking module, parameters and platform
    Validating = 0,

    /// Renaming raw parameters to backend attributes
    Mapping = 1,

    /// Bucketing attributes by target state
    Building = 2,

    /// Generating prerequisite and trigger documents
    ResolvingDeps = 3,

    /// Assigning tags and assembling the document map
    Tagging = 4,

    /// Version pins split out; documents ready (terminal state)
    Expanded = 5,

    /// Conversion failed (terminal state)
    Failed = 255,
}

impl ConversionStage {
    /// Returns true if this is a terminal state (Expanded or Failed)
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Expanded | Self::Failed)
    }

    /// Returns the next stage in the sequence, or None if at a terminal state
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Validating => Some(Self::Mapping),
            Self::Mapping => Some(Self::Building),
            Self::Building => Some(Self::ResolvingDeps),
            Self::ResolvingDeps => Some(Self::Tagging),
            Self::Tagging => Some(Self::Expanded),
            Self::Expanded | Self::Failed => None,
        }
    }

    /// Returns a human-readable description of this stage
    pub const fn description(self) -> &'static str {
        match self {
            Self::Validating => "validating input",
            Self::Mapping => "mapping attributes",
            Self::Building => "building states",
            Self::ResolvingDeps => "resolving dependencies",
            Self::Tagging => "tagging documents",
            Self::Expanded => "expanded",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ConversionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Call-scoped conversion state.
///
/// Created at the start of a conversion and dropped at its end. Holds the
/// platform's package manager so prerequisite resolution can skip package
/// modules of other platforms.
#[derive(Debug, Clone)]
pub struct ConversionContext {
    platform: Platform,
    package_manager: PackageManager,
    stage: ConversionStage,
    failed_at: Option<ConversionStage>,
    depth: usize,
}

impl ConversionContext {
    /// Create a context in the Validating stage
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            package_manager: platform.package_manager(),
            stage: ConversionStage::Validating,
            failed_at: None,
            depth: 0,
        }
    }

    #[inline]
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// The platform's package manager
    #[inline]
    pub fn package_manager(&self) -> PackageManager {
        self.package_manager
    }

    /// Module id of the platform's package module
    #[inline]
    pub fn package_module(&self) -> &'static str {
        self.package_manager.package_module()
    }

    #[inline]
    pub fn stage(&self) -> ConversionStage {
        self.stage
    }

    /// Stage at which the conversion failed, if it did
    #[inline]
    pub fn failed_at(&self) -> Option<ConversionStage> {
        self.failed_at
    }

    /// Current prerequisite nesting depth
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Move to `stage`, which must be the next one in sequence.
    ///
    /// Nested prerequisite conversions do not move the stage.
    pub fn enter(&mut self, stage: ConversionStage) -> Result<(), ConvertError> {
        if self.depth > 0 {
            return Ok(());
        }
        if self.stage.next() != Some(stage) {
            return Err(ConvertError::Internal {
                stage: self.stage,
                reason: format!("invalid transition from {} to {}", self.stage, stage),
            });
        }
        debug!(from = %self.stage, to = %stage, "conversion stage");
        self.stage = stage;
        Ok(())
    }

    /// Mark the conversion failed at the current stage
    pub fn fail(&mut self) {
        if self.stage != ConversionStage::Failed {
            warn!(stage = %self.stage, "conversion failed");
            self.failed_at = Some(self.stage);
            self.stage = ConversionStage::Failed;
        }
    }

    /// Enter a nested prerequisite conversion
    pub fn descend(&mut self) -> Result<(), ConvertError> {
        if self.depth >= MAX_DEPTH {
            return Err(ConvertError::Internal {
                stage: self.stage,
                reason: format!("prerequisites nested deeper than {}", MAX_DEPTH),
            });
        }
        self.depth += 1;
        Ok(())
    }

    /// Leave a nested prerequisite conversion
    pub fn ascend(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_sequence() {
        let mut stage = ConversionStage::Validating;
        let mut seen = vec![stage];
        while let Some(next) = stage.next() {
            stage = next;
            seen.push(stage);
        }
        assert_eq!(seen.len(), 6);
        assert_eq!(stage, ConversionStage::Expanded);
        assert!(stage.is_terminal());
    }

    #[test]
    fn test_context_forward_only() {
        let mut ctx = ConversionContext::new(Platform::Ubuntu);
        assert!(ctx.enter(ConversionStage::Mapping).is_ok());
        assert!(ctx.enter(ConversionStage::Tagging).is_err());
        assert!(ctx.enter(ConversionStage::Mapping).is_err());
        assert_eq!(ctx.stage(), ConversionStage::Mapping);
    }

    #[test]
    fn test_nested_conversions_do_not_move_stage() {
        let mut ctx = ConversionContext::new(Platform::Centos);
        ctx.descend().unwrap();
        assert!(ctx.enter(ConversionStage::Tagging).is_ok());
        assert_eq!(ctx.stage(), ConversionStage::Validating);
        ctx.ascend();
        assert_eq!(ctx.depth(), 0);
    }

    #[test]
    fn test_depth_limit() {
        let mut ctx = ConversionContext::new(Platform::Debian);
        for _ in 0..MAX_DEPTH {
            ctx.descend().unwrap();
        }
        assert!(ctx.descend().is_err());
    }

    #[test]
    fn test_fail_records_stage() {
        let mut ctx = ConversionContext::new(Platform::Debian);
        ctx.enter(ConversionStage::Mapping).unwrap();
        ctx.fail();
        assert_eq!(ctx.stage(), ConversionStage::Failed);
        assert_eq!(ctx.failed_at(), Some(ConversionStage::Mapping));
        assert!(ctx.enter(ConversionStage::Building).is_err());
    }

    #[test]
    fn test_context_package_module() {
        assert_eq!(
            ConversionContext::new(Platform::Amazon).package_module(),
            "linux.yum.package"
        );
        assert_eq!(
            ConversionContext::new(Platform::Ubuntu).package_module(),
            "linux.apt.package"
        );
    }
}
