// Defect statistics extraction.
// Pulls the total and per-analyzer defect counts out of a review bot comment.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{PhabStatsError, Result};

static TOTAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)found (\d+) defects?").unwrap_or_else(|e| panic!("invalid total pattern: {e}"))
});

static ANALYZER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+) defects? found by ([\w-]+)")
        .unwrap_or_else(|e| panic!("invalid analyzer pattern: {e}"))
});

/// Defect counts reported by one comment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefectStats {
    pub total: u64,
    pub analyzers: BTreeMap<String, u64>,
}

impl DefectStats {
    /// Count for `analyzer`, or `None` if the comment never mentions it.
    pub fn get(&self, analyzer: &str) -> Option<u64> {
        self.analyzers.get(analyzer).copied()
    }
}

/// Parse the defect counts out of a comment's raw text.
///
/// `comment_id` is only used to label errors. When an analyzer is mentioned
/// more than once the last count wins.
pub fn parse(comment_id: u64, text: &str) -> Result<DefectStats> {
    let captures = TOTAL.captures(text).ok_or_else(|| PhabStatsError::Parse {
        comment_id,
        reason: "no \"found N defects\" phrase".to_string(),
    })?;

    let total = parse_count(comment_id, &captures[1])?;

    let mut analyzers = BTreeMap::new();
    for captures in ANALYZER.captures_iter(text) {
        let count = parse_count(comment_id, &captures[1])?;
        analyzers.insert(captures[2].to_string(), count);
    }

    Ok(DefectStats { total, analyzers })
}

fn parse_count(comment_id: u64, digits: &str) -> Result<u64> {
    digits.parse().map_err(|_| PhabStatsError::Parse {
        comment_id,
        reason: format!("count {digits} is out of range"),
    })
}
