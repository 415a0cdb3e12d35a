use ballot_verifier::Candidate;

pub fn parse_candidate(s: &str) -> Result<Candidate, String> {
    match s.trim().to_lowercase().as_str() {
        "1" | "a" => Ok(Candidate::A),
        "2" | "b" => Ok(Candidate::B),
        _ => Err(format!("invalid candidate: {} (expected 1, 2, a or b)", s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_candidate() {
        assert_eq!(parse_candidate("1"), Ok(Candidate::A));
        assert_eq!(parse_candidate("B"), Ok(Candidate::B));
        assert_eq!(parse_candidate(" a "), Ok(Candidate::A));
        assert!(parse_candidate("0").is_err());
        assert!(parse_candidate("3").is_err());
        assert!(parse_candidate("").is_err());
    }
}
