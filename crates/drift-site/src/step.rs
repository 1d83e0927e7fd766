//! Navigation steps
//!
//! One user action per command-line argument.

use drift_dom::ContentId;
use std::fmt;
use std::str::FromStr;

/// A scripted user action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Open a page, recording history
    Open(ContentId),
    Back,
    Forward,
    /// Type a page name into the search box
    Search(String),
    /// Follow the breadcrumb at an index
    Crumb(usize),
}

impl FromStr for Step {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(query) = s.strip_prefix("search:") {
            return Ok(Step::Search(query.to_string()));
        }
        if let Some(index) = s.strip_prefix("crumb:") {
            return index
                .trim()
                .parse()
                .map(Step::Crumb)
                .map_err(|_| format!("invalid breadcrumb index '{index}'"));
        }
        match s {
            "back" => Ok(Step::Back),
            "forward" => Ok(Step::Forward),
            _ => ContentId::parse(s)
                .map(Step::Open)
                .ok_or_else(|| "empty page name".to_string()),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Open(id) => write!(f, "{id}"),
            Step::Back => f.write_str("back"),
            Step::Forward => f.write_str("forward"),
            Step::Search(query) => write!(f, "search:{query}"),
            Step::Crumb(index) => write!(f, "crumb:{index}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_steps() {
        assert_eq!("Projects".parse(), Ok(Step::Open(ContentId::parse("projects").unwrap())));
        assert_eq!("back".parse(), Ok(Step::Back));
        assert_eq!("forward".parse(), Ok(Step::Forward));
        assert_eq!("search:time line".parse(), Ok(Step::Search("time line".into())));
        assert_eq!("crumb:1".parse(), Ok(Step::Crumb(1)));
    }

    #[test]
    fn test_parse_rejects_bad_steps() {
        assert!("crumb:x".parse::<Step>().is_err());
        assert!("  ".parse::<Step>().is_err());
    }
}
