//! Commit Message Convention Matcher: classifies a commit message
//! into an optional bump component using ordered, regex-driven rules.

use indexmap::IndexMap;
use regex::Regex;

use crate::version::BumpComponent;

/// A single convention: a message-shape regex plus the bump-component
/// regexes evaluated against it.
pub struct Convention {
    /// Matches the overall commit message; expected to carry named groups
    /// including at least `type`, with optional `scope`, `title`, `breaking`.
    pub expression: Regex,

    /// Bump component → regex tested against the matched message. Order
    /// matters only for readability; the *result* is the highest-ranked
    /// component among all that matched (major > minor > patch).
    pub bump_expressions: IndexMap<BumpComponent, Regex>,
}

impl Convention {
    /// The built-in Conventional Commits (`feat:`, `fix:`, `!:` breaking)
    /// convention, matching the built-in `conventionalCommits` preset.
    #[must_use]
    pub fn conventional_commits() -> Self {
        let expression = Regex::new(
            r"(?xs)
            ^(?P<type>\w+)
            (?:\((?P<scope>[^)]+)\))?
            (?P<breaking>!)?
            :\s*(?P<title>.+)",
        )
        .expect("static pattern compiles");

        let mut bump_expressions = IndexMap::new();
        bump_expressions.insert(BumpComponent::Major, Regex::new(r"(?s)^.*!:|BREAKING CHANGE").unwrap());
        bump_expressions.insert(BumpComponent::Minor, Regex::new(r"^feat(\(|:)").unwrap());
        bump_expressions.insert(BumpComponent::Patch, Regex::new(r"^(fix|perf)(\(|:)").unwrap());

        Self { expression, bump_expressions }
    }
}

/// Classify `message` against the first convention (in order) whose
/// `expression` matches and whose `bump_expressions` produce a component.
/// When several `bump_expressions` entries match, the highest-ranked
/// component wins regardless of the map's declaration order.
#[must_use]
pub fn classify(conventions: &[Convention], message: &str) -> Option<BumpComponent> {
    let subject = message.lines().next().unwrap_or_default();
    conventions.iter().find_map(|convention| {
        if !convention.expression.is_match(subject) {
            return None;
        }
        convention
            .bump_expressions
            .iter()
            .filter(|(_, re)| re.is_match(subject) || re.is_match(message))
            .map(|(component, _)| component.clone())
            .max_by_key(|component| significance_rank(Some(component)))
    })
}

/// Significance rank of an optional bump component: major=3, minor=2,
/// patch=1, none=0. Higher is more significant.
#[must_use]
pub fn significance_rank(component: Option<&BumpComponent>) -> u8 {
    match component {
        Some(BumpComponent::Major) => 3,
        Some(BumpComponent::Minor) => 2,
        Some(BumpComponent::Patch | BumpComponent::Named(_)) => 1,
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_feat_as_minor() {
        let conventions = vec![Convention::conventional_commits()];
        assert_eq!(classify(&conventions, "feat: add widget"), Some(BumpComponent::Minor));
    }

    #[test]
    fn classifies_fix_as_patch() {
        let conventions = vec![Convention::conventional_commits()];
        assert_eq!(classify(&conventions, "fix: npe on empty list"), Some(BumpComponent::Patch));
    }

    #[test]
    fn classifies_breaking_bang_as_major() {
        let conventions = vec![Convention::conventional_commits()];
        assert_eq!(classify(&conventions, "feat!: drop legacy api"), Some(BumpComponent::Major));
    }

    #[test]
    fn classifies_breaking_footer_as_major() {
        let conventions = vec![Convention::conventional_commits()];
        let message = "feat: add widget\n\nBREAKING CHANGE: removes old widget";
        assert_eq!(classify(&conventions, message), Some(BumpComponent::Major));
    }

    #[test]
    fn unrelated_message_is_none() {
        let conventions = vec![Convention::conventional_commits()];
        assert_eq!(classify(&conventions, "update readme"), None);
    }

    #[test]
    fn classify_ignores_bump_expressions_declaration_order() {
        // A scoped breaking change matches both the patch-style `fix(...)`
        // regex and the major breaking-change regex; the latter must win
        // even though it is inserted last in the map.
        let mut bump_expressions = IndexMap::new();
        bump_expressions.insert(BumpComponent::Patch, Regex::new(r"^fix(\(|:)").unwrap());
        bump_expressions.insert(BumpComponent::Major, Regex::new(r"(?s)^.*!:|BREAKING CHANGE").unwrap());
        let convention = Convention {
            expression: Regex::new(r"(?xs)^(?P<type>\w+)(?:\((?P<scope>[^)]+)\))?(?P<breaking>!)?:\s*(?P<title>.+)").unwrap(),
            bump_expressions,
        };
        assert_eq!(classify(&[convention], "fix(api)!: remove deprecated field"), Some(BumpComponent::Major));
    }

    #[test]
    fn significance_rank_orders_major_over_minor_over_patch() {
        assert!(significance_rank(Some(&BumpComponent::Major)) > significance_rank(Some(&BumpComponent::Minor)));
        assert!(significance_rank(Some(&BumpComponent::Minor)) > significance_rank(Some(&BumpComponent::Patch)));
        assert!(significance_rank(Some(&BumpComponent::Patch)) > significance_rank(None));
    }
}
