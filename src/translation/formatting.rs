/*!
 * Format preservation checks for translated text.
 *
 * Math and code spans must come back from the provider verbatim, and Markdown
 * markers must keep their count. Violations are reported, not repaired: the
 * translation is still used.
 */

use once_cell::sync::Lazy;
use regex::Regex;

/// Display math `$$...$$`, possibly spanning lines
static DISPLAY_MATH_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\$\$.+?\$\$").expect("display math pattern is valid"));

/// Inline math `$...$` on a single line
static INLINE_MATH_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$[^$\n]+?\$").expect("inline math pattern is valid"));

/// Inline code `` `...` ``
static INLINE_CODE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`[^`\n]+`").expect("inline code pattern is valid"));

/// Markdown markers whose count must not change
const COUNTED_MARKERS: &[&str] = &["```", "**"];

/// A formatting element lost or altered in translation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatViolation {
    /// A math or code span from the source is not in the translation verbatim
    MissingSpan(String),
    /// A Markdown marker occurs a different number of times
    MarkerCount {
        marker: &'static str,
        expected: usize,
        found: usize,
    },
}

impl std::fmt::Display for FormatViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingSpan(span) => write!(f, "span {} not preserved", span),
            Self::MarkerCount {
                marker,
                expected,
                found,
            } => write!(f, "'{}' appears {} times, expected {}", marker, found, expected),
        }
    }
}

/// Format preserver for checking text formatting after translation
pub struct FormatPreserver;

impl FormatPreserver {
    /// Math and inline code spans of `text`, in order of appearance
    pub fn protected_spans(text: &str) -> Vec<&str> {
        let mut spans: Vec<(usize, &str)> = DISPLAY_MATH_REGEX
            .find_iter(text)
            .map(|m| (m.start(), m.as_str()))
            .collect();

        let outside_display = |start: usize| {
            !DISPLAY_MATH_REGEX
                .find_iter(text)
                .any(|m| m.start() <= start && start < m.end())
        };

        spans.extend(
            INLINE_MATH_REGEX
                .find_iter(text)
                .filter(|m| outside_display(m.start()))
                .map(|m| (m.start(), m.as_str())),
        );
        spans.extend(INLINE_CODE_REGEX.find_iter(text).map(|m| (m.start(), m.as_str())));

        spans.sort_by_key(|(start, _)| *start);
        spans.into_iter().map(|(_, span)| span).collect()
    }

    /// Compare a translation against its source
    pub fn check(original: &str, translated: &str) -> Vec<FormatViolation> {
        let mut violations: Vec<FormatViolation> = Self::protected_spans(original)
            .into_iter()
            .filter(|span| !translated.contains(span))
            .map(|span| FormatViolation::MissingSpan(span.to_string()))
            .collect();

        for &marker in COUNTED_MARKERS {
            let expected = original.matches(marker).count();
            let found = translated.matches(marker).count();
            if expected != found {
                violations.push(FormatViolation::MarkerCount {
                    marker,
                    expected,
                    found,
                });
            }
        }

        violations
    }
}
