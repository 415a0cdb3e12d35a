//! Vote codes as reported by the ledger and their display labels

use std::fmt;

/// Wire code of a ballot that is registered but not yet cast.
pub const REGISTERED_CODE: i64 = 0;

/// Candidates the ledger accepts votes for.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum Candidate {
    A,
    B,
}

impl Candidate {
    pub const ALL: [Candidate; 2] = [Candidate::A, Candidate::B];

    pub fn code(self) -> u16 {
        match self {
            Candidate::A => 1,
            Candidate::B => 2,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            1 => Some(Candidate::A),
            2 => Some(Candidate::B),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Candidate::A => "Candidate A",
            Candidate::B => "Candidate B",
        }
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One entry of a ballot's value or history, decoded from its raw code.
///
/// Decoding is total: codes outside the known set become `Invalid` and keep
/// the raw value so they can still be reported.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VoteCode {
    Registered,
    CastFor(Candidate),
    Invalid(i64),
}

impl VoteCode {
    /// Label used in audit transcripts.
    pub fn label(self) -> String {
        match self {
            VoteCode::Registered => "Registered".to_string(),
            VoteCode::CastFor(candidate) => format!("Cast for {}", candidate),
            VoteCode::Invalid(_) => "Invalid".to_string(),
        }
    }

    /// Label used for the current value of the voter's own ballot.
    pub fn status_label(self) -> String {
        match self {
            VoteCode::Registered => "Registered, not yet cast".to_string(),
            other => other.label(),
        }
    }
}

impl From<i64> for VoteCode {
    fn from(code: i64) -> Self {
        if code == REGISTERED_CODE {
            return VoteCode::Registered;
        }
        match u16::try_from(code).ok().and_then(Candidate::from_code) {
            Some(candidate) => VoteCode::CastFor(candidate),
            None => VoteCode::Invalid(code),
        }
    }
}

impl From<Candidate> for VoteCode {
    fn from(candidate: Candidate) -> Self {
        VoteCode::CastFor(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(VoteCode::from(0), VoteCode::Registered);
        assert_eq!(VoteCode::from(1), VoteCode::CastFor(Candidate::A));
        assert_eq!(VoteCode::from(2), VoteCode::CastFor(Candidate::B));
    }

    #[test]
    fn test_unknown_codes_are_invalid() {
        assert_eq!(VoteCode::from(3), VoteCode::Invalid(3));
        assert_eq!(VoteCode::from(-1), VoteCode::Invalid(-1));
        assert_eq!(VoteCode::from(99999), VoteCode::Invalid(99999));
        assert_eq!(VoteCode::from(i64::MAX), VoteCode::Invalid(i64::MAX));
        // Wraps to 1 as a u16; must not read as Candidate A.
        assert_eq!(VoteCode::from(65537), VoteCode::Invalid(65537));
        assert_eq!(VoteCode::from(42).label(), "Invalid");
    }

    #[test]
    fn test_labels() {
        assert_eq!(VoteCode::Registered.label(), "Registered");
        assert_eq!(VoteCode::from(2).label(), "Cast for Candidate B");
        assert_eq!(VoteCode::Registered.status_label(), "Registered, not yet cast");
        assert_eq!(VoteCode::from(1).status_label(), "Cast for Candidate A");
    }

    #[test]
    fn test_candidate_codes_round_trip() {
        for candidate in Candidate::ALL {
            assert_eq!(Candidate::from_code(candidate.code()), Some(candidate));
        }
        assert_eq!(Candidate::from_code(0), None);
    }
}
