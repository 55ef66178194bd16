//! Section extraction from edit comments
//!
//! Edits made through a section link carry a `/* Section name */` prefix in
//! their comment. This is a convention, not a structured field: free-text
//! comments can contain the marker by accident, and renamed sections show up
//! under their old name.

use once_cell::sync::Lazy;
use regex::Regex;

static SECTION_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/\*\s*(.*?)\s*\*/").expect("section marker pattern is valid"));

/// Section named by the first `/* ... */` marker in `comment`, if any
pub fn extract_section(comment: &str) -> Option<&str> {
    let name = SECTION_MARKER.captures(comment)?.get(1)?.as_str();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Running tally of section mentions, in first-seen order
#[derive(Debug, Clone, Default)]
pub struct SectionTally {
    counts: Vec<(String, usize)>,
}

impl SectionTally {
    pub fn record(&mut self, comment: &str) {
        let Some(section) = extract_section(comment) else {
            return;
        };
        match self.counts.iter_mut().find(|(name, _)| name == section) {
            Some((_, count)) => *count += 1,
            None => self.counts.push((section.to_string(), 1)),
        }
    }

    /// Most mentioned section; ties go to the one seen first
    pub fn most_discussed(&self) -> Option<&str> {
        let mut best: Option<&(String, usize)> = None;
        for entry in &self.counts {
            if best.map_or(true, |(_, count)| entry.1 > *count) {
                best = Some(entry);
            }
        }
        best.map(|(name, _)| name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_trimmed_section_name() {
        assert_eq!(extract_section("/* History */ fix typo"), Some("History"));
        assert_eq!(extract_section("/*Early life*/"), Some("Early life"));
        assert_eq!(extract_section("/* הצעה לשינוי */ תגובה"), Some("הצעה לשינוי"));
    }

    #[test]
    fn test_no_marker_yields_none() {
        assert_eq!(extract_section("reverted vandalism"), None);
        assert_eq!(extract_section("/* */ empty"), None);
        assert_eq!(extract_section(""), None);
    }

    #[test]
    fn test_first_marker_wins() {
        assert_eq!(extract_section("/* A */ moved from /* B */"), Some("A"));
    }

    #[test]
    fn test_tally_picks_first_seen_maximum() {
        let mut tally = SectionTally::default();
        for comment in ["/* B */", "/* A */", "no marker", "/* A */", "/* B */"] {
            tally.record(comment);
        }
        // A and B both have 2; B was seen first
        assert_eq!(tally.most_discussed(), Some("B"));

        tally.record("/* A */");
        assert_eq!(tally.most_discussed(), Some("A"));
    }

    #[test]
    fn test_empty_tally() {
        assert_eq!(SectionTally::default().most_discussed(), None);
    }
}
