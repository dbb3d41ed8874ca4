//! The eighteen Congress.gov resource families mirrored by the core.
//!
//! [`Family::ALL`] fixes the stable dispatch order the scheduler uses for
//! tie-breaking, so additions must go at the end.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Family {
    Bill,
    Amendment,
    Committee,
    Hearing,
    Nomination,
    Treaty,
    CommitteeReport,
    CommitteePrint,
    CommitteeMeeting,
    CongressionalRecord,
    DailyCongressionalRecord,
    BoundCongressionalRecord,
    HouseCommunication,
    HouseRequirement,
    SenateCommunication,
    Member,
    Summary,
    Congress,
}

impl Family {
    /// Every family, in stable dispatch order.
    pub const ALL: [Family; 18] = [
        Family::Bill,
        Family::Amendment,
        Family::Committee,
        Family::Hearing,
        Family::Nomination,
        Family::Treaty,
        Family::CommitteeReport,
        Family::CommitteePrint,
        Family::CommitteeMeeting,
        Family::CongressionalRecord,
        Family::DailyCongressionalRecord,
        Family::BoundCongressionalRecord,
        Family::HouseCommunication,
        Family::HouseRequirement,
        Family::SenateCommunication,
        Family::Member,
        Family::Summary,
        Family::Congress,
    ];

    /// The kebab-case tag stored in the canonical record's `type` field
    /// and used for per-family config keys.
    pub fn tag(self) -> &'static str {
        match self {
            Family::Bill => "bill",
            Family::Amendment => "amendment",
            Family::Committee => "committee",
            Family::Hearing => "hearing",
            Family::Nomination => "nomination",
            Family::Treaty => "treaty",
            Family::CommitteeReport => "committee-report",
            Family::CommitteePrint => "committee-print",
            Family::CommitteeMeeting => "committee-meeting",
            Family::CongressionalRecord => "congressional-record",
            Family::DailyCongressionalRecord => "daily-congressional-record",
            Family::BoundCongressionalRecord => "bound-congressional-record",
            Family::HouseCommunication => "house-communication",
            Family::HouseRequirement => "house-requirement",
            Family::SenateCommunication => "senate-communication",
            Family::Member => "member",
            Family::Summary => "summary",
            Family::Congress => "congress",
        }
    }

    /// The upstream list-endpoint path segment. Identical to [`tag`] for
    /// every family except summaries, whose endpoint is pluralized.
    pub fn endpoint_path(self) -> &'static str {
        match self {
            Family::Summary => "summaries",
            other => other.tag(),
        }
    }

    /// Position in [`Family::ALL`]; used for fixed-size per-family tables.
    pub fn index(self) -> usize {
        Family::ALL.iter().position(|f| *f == self).unwrap_or(0)
    }

    /// Parse a kebab-case tag as accepted on the CLI and in config keys.
    pub fn from_tag(tag: &str) -> Option<Family> {
        Family::ALL.iter().copied().find(|f| f.tag() == tag)
    }
}

impl std::fmt::Display for Family {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}
