//! Error types for dungeon generation and tile placement

use glam::IVec2;

use crate::region::RegionId;
use crate::section::SectionId;

/// Errors that can occur while growing regions or placing tiles
///
/// Every variant is fatal for the current run. Nothing is retried: the caller
/// gets enough context to report which region, section or mask failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// Configuration validation failed
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The tile catalog is malformed (empty, bad rotation count, bad digit)
    #[error("invalid tile template: {0}")]
    InvalidTemplate(String),

    /// The frontier was empty and no owned section had room to expand
    #[error("region {region} has no available space to expand")]
    SpaceExhausted {
        /// Region whose growth stalled
        region: RegionId,
    },

    /// No owned section could be handed to a child region
    #[error("region {region} has no available section to start child region {child}")]
    HandoffFailed {
        /// Parent region performing the hand-off
        region: RegionId,
        /// Child region that could not be started
        child: RegionId,
    },

    /// No template, at any rotation, accepts a section's neighbour mask
    #[error("no tile matches section {section} (adjacency mask {mask:#010b})")]
    UnmatchedAdjacency {
        /// Section that could not be tiled
        section: SectionId,
        /// Its 8-direction presence mask
        mask: u8,
    },

    /// A section already sits at this grid position
    #[error("grid position {position} is already occupied")]
    PositionOccupied {
        /// The contested grid cell
        position: IVec2,
    },

    /// Requested section does not exist (never created, or cleared)
    #[error("section not found: {0}")]
    SectionNotFound(SectionId),

    /// Requested region is not part of the tree
    #[error("region not found: {0}")]
    RegionNotFound(RegionId),

    /// Tiles were requested before region growth finished
    #[error("region growth has not completed")]
    GrowthIncomplete,

    /// A run was driven before `generate` started one
    #[error("no generation run has been started")]
    NotStarted,

    /// A run that already failed was stepped again
    #[error("generation run was aborted by an earlier error")]
    RunAborted,
}

/// Result type alias for generation operations
pub type Result<T> = std::result::Result<T, GenerationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_culprit() {
        let err = GenerationError::UnmatchedAdjacency {
            section: SectionId(7),
            mask: 0b0000_0101,
        };
        assert_eq!(
            err.to_string(),
            "no tile matches section #7 (adjacency mask 0b00000101)"
        );

        let err = GenerationError::HandoffFailed {
            region: RegionId(0),
            child: RegionId(2),
        };
        assert!(err.to_string().contains("region R0"));
        assert!(err.to_string().contains("child region R2"));
    }
}
