//! Accept/reject decisions for fetched posts.
//!
//! Three predicates are evaluated against each post: whether its UTC calendar
//! date falls inside an inclusive range, whether the author's self-reported
//! location contains a substring (case-insensitive), and whether the text
//! contains any of the keywords. How the three combine is a [`FilterPolicy`].

use crate::feeds::Post;
use chrono::NaiveDate;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Config files and the command line share one spelling, via [`FromStr`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum FilterPolicy {
    /// date AND keyword
    #[default]
    StrictAnd,
    /// date OR (location AND keyword)
    ///
    /// Any in-range post passes whatever its text says. Kept for parity with
    /// older exports; callers are warned when it is selected.
    MixedOrAnd,
    /// date AND location AND keyword
    AllOf,
}

impl FilterPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterPolicy::StrictAnd => "strict-and",
            FilterPolicy::MixedOrAnd => "mixed-or-and",
            FilterPolicy::AllOf => "all-of",
        }
    }
}

impl fmt::Display for FilterPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for FilterPolicy {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl FromStr for FilterPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict-and" | "strict" => Ok(FilterPolicy::StrictAnd),
            "mixed-or-and" | "mixed" => Ok(FilterPolicy::MixedOrAnd),
            "all-of" | "all" => Ok(FilterPolicy::AllOf),
            other => Err(format!(
                "unknown filter policy '{}' (expected strict-and, mixed-or-and or all-of)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterCriteria {
    pub since: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
    pub location: Option<String>,
    pub keywords: Vec<String>,
    pub case_sensitive: bool,
    pub policy: FilterPolicy,
}

impl FilterCriteria {
    pub fn accepts(&self, post: &Post) -> bool {
        let in_range = self.date_matches(post);
        match self.policy {
            FilterPolicy::StrictAnd => in_range && self.keyword_matches(post),
            FilterPolicy::MixedOrAnd => {
                in_range || (self.location_matches(post) && self.keyword_matches(post))
            }
            FilterPolicy::AllOf => {
                in_range && self.location_matches(post) && self.keyword_matches(post)
            }
        }
    }

    pub fn date_matches(&self, post: &Post) -> bool {
        let date = post.created_at.date_naive();
        self.since.map_or(true, |since| date >= since)
            && self.until.map_or(true, |until| date <= until)
    }

    /// An unset or blank location matches every post, including authors with no location.
    pub fn location_matches(&self, post: &Post) -> bool {
        match self.location.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(needle) => post
                .author_location
                .to_lowercase()
                .contains(&needle.to_lowercase()),
        }
    }

    pub fn keyword_matches(&self, post: &Post) -> bool {
        if self.case_sensitive {
            self.keywords.iter().any(|k| post.text.contains(k.as_str()))
        } else {
            let text = post.text.to_lowercase();
            self.keywords
                .iter()
                .any(|k| text.contains(&k.to_lowercase()))
        }
    }
}
