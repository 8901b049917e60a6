// Best-hit selection and match quality of alignment records
use std::fmt;

use serde::Serialize;

use crate::config::defs::{COVERAGE_COL, FULL_MATCH_PCT, IDENTITY_COL};
use crate::utils::tsv::{HitRecord, ResultSet};

/// Returns the record with the highest parseable value in `field`.
///
/// # Arguments
///
/// * `set` - Result rows, in file order.
/// * `field` - Numeric column to maximise, normally `Score`.
///
/// # Returns
/// The first record reaching the maximum, or None when the set is empty or
/// no record parses.
pub fn best_hit<'a>(set: &'a ResultSet, field: &str) -> Option<&'a HitRecord> {
    let mut max = f64::NEG_INFINITY;
    let mut best = None;
    for record in set {
        let Ok(value) = record.get_f64(field) else {
            continue;
        };
        if value > max {
            max = value;
            best = Some(record);
        }
    }
    best
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchQuality {
    Perfect,
    Good,
    Partial,
    Unknown,
}

impl MatchQuality {
    pub const TIERS: [MatchQuality; 4] = [
        MatchQuality::Perfect,
        MatchQuality::Good,
        MatchQuality::Partial,
        MatchQuality::Unknown,
    ];

    /// Both at 100% is perfect, one of the two is good, anything else partial.
    pub fn classify(identity: f64, coverage: f64) -> Self {
        match (identity >= FULL_MATCH_PCT, coverage >= FULL_MATCH_PCT) {
            (true, true) => MatchQuality::Perfect,
            (true, false) | (false, true) => MatchQuality::Good,
            (false, false) => MatchQuality::Partial,
        }
    }

    pub fn of_record(record: &HitRecord) -> Self {
        match (record.get_f64(IDENTITY_COL), record.get_f64(COVERAGE_COL)) {
            (Ok(identity), Ok(coverage)) => Self::classify(identity, coverage),
            _ => MatchQuality::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchQuality::Perfect => "perfect",
            MatchQuality::Good => "good",
            MatchQuality::Partial => "partial",
            MatchQuality::Unknown => "unknown",
        }
    }
}

impl fmt::Display for MatchQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn record(template: &str, score: &str) -> HitRecord {
        HitRecord::new(vec![
            ("#Template".to_string(), template.to_string()),
            ("Score".to_string(), score.to_string()),
        ])
    }

    fn set(records: Vec<HitRecord>) -> ResultSet {
        ResultSet {
            header: vec!["#Template".to_string(), "Score".to_string()],
            records,
        }
    }

    #[test]
    fn test_best_hit_max_score() {
        let rs = set(vec![record("a", "10"), record("b", "250.5"), record("c", "99")]);
        assert_eq!(best_hit(&rs, "Score").and_then(|r| r.template_id()), Some("b"));
    }

    #[test]
    fn test_best_hit_tie_keeps_first() {
        let rs = set(vec![record("a", "7"), record("b", "42"), record("c", "42")]);
        assert_eq!(best_hit(&rs, "Score").and_then(|r| r.template_id()), Some("b"));
    }

    #[test]
    fn test_best_hit_skips_unparseable() {
        let rs = set(vec![record("a", "x"), record("b", "-3"), record("c", "")]);
        assert_eq!(best_hit(&rs, "Score").and_then(|r| r.template_id()), Some("b"));
    }

    #[test]
    fn test_best_hit_none() {
        assert!(best_hit(&ResultSet::default(), "Score").is_none());
        let rs = set(vec![record("a", "x"), record("b", "")]);
        assert!(best_hit(&rs, "Score").is_none());
    }

    #[test]
    fn test_classify_tiers() {
        assert_eq!(MatchQuality::classify(100.0, 100.0), MatchQuality::Perfect);
        assert_eq!(MatchQuality::classify(100.0, 87.3), MatchQuality::Good);
        assert_eq!(MatchQuality::classify(87.3, 100.0), MatchQuality::Good);
        assert_eq!(MatchQuality::classify(92.0, 95.0), MatchQuality::Partial);
    }

    #[test]
    fn test_of_record_unknown() {
        let r = HitRecord::new(vec![
            ("Template_Identity".to_string(), "100.00".to_string()),
            ("Template_Coverage".to_string(), "".to_string()),
        ]);
        assert_eq!(MatchQuality::of_record(&r), MatchQuality::Unknown);
        let r = HitRecord::new(vec![
            ("Template_Identity".to_string(), "100.00".to_string()),
            ("Template_Coverage".to_string(), "100.00".to_string()),
        ]);
        assert_eq!(MatchQuality::of_record(&r), MatchQuality::Perfect);
    }
}
