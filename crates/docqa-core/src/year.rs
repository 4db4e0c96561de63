//! Publication year extraction from document filenames.
//!
//! The corpus contract is `YYYY_name.pdf`. Extraction is a chain of
//! [`YearStrategy`] implementations tried in order until one yields a
//! year; the default chain is [`LeadingYear`] then [`EmbeddedYear`].
//! A document with no recognisable year gets `None`: it stays searchable
//! without a filter but never matches a year-filtered query.
//!
//! Embedded PDF metadata is deliberately not a strategy; the filename is
//! the single source of truth for a document's year.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

static LEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})(?:[_\-\s.]|$)").expect("valid leading-year pattern"));
static DIGIT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("valid digit-run pattern"));

/// One way of deriving a year from a filename.
pub trait YearStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn extract(&self, filename: &str) -> Option<i32>;
}

/// `2021_sample.pdf`, `2021-sample.pdf`, `2021.pdf`.
pub struct LeadingYear;

impl YearStrategy for LeadingYear {
    fn name(&self) -> &'static str {
        "leading"
    }

    fn extract(&self, filename: &str) -> Option<i32> {
        let caps = LEADING.captures(stem(filename))?;
        plausible(caps.get(1)?.as_str())
    }
}

/// The first standalone 4-digit run anywhere in the stem, e.g.
/// `report_2019_final.pdf`. Longer digit runs (`20190101`) do not count.
pub struct EmbeddedYear;

impl YearStrategy for EmbeddedYear {
    fn name(&self) -> &'static str {
        "embedded"
    }

    fn extract(&self, filename: &str) -> Option<i32> {
        DIGIT_RUN
            .find_iter(stem(filename))
            .filter(|m| m.as_str().len() == 4)
            .find_map(|m| plausible(m.as_str()))
    }
}

/// Ordered chain of strategies.
pub struct YearExtractor {
    strategies: Vec<Box<dyn YearStrategy>>,
}

impl Default for YearExtractor {
    fn default() -> Self {
        Self::new(vec![Box::new(LeadingYear), Box::new(EmbeddedYear)])
    }
}

impl YearExtractor {
    pub fn new(strategies: Vec<Box<dyn YearStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn extract(&self, filename: &str) -> Option<i32> {
        self.strategies.iter().find_map(|s| {
            let year = s.extract(filename);
            if let Some(y) = year {
                tracing::trace!(filename, strategy = s.name(), year = y, "year extracted");
            }
            year
        })
    }
}

/// Any 4-digit token is a year except `0000`.
fn plausible(digits: &str) -> Option<i32> {
    digits.parse::<i32>().ok().filter(|y| *y > 0)
}

fn stem(filename: &str) -> &str {
    Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename)
}
