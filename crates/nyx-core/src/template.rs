//! Mustache-style template interpolation against [`State`](crate::state::State).
//!
//! Supports plain `{{name}}` substitution, dotted paths into state
//! (`{{releaseScope.finalCommit}}`, `{{environment.variable}}`,
//! `{{configuration.releasePrefix}}`), and a fixed table of helper
//! functions invoked as `{{helper arg}}`. Undefined names render empty;
//! there is no plugin mechanism, matching the rest of this engine's
//! avoidance of a generic extension host.

use thiserror::Error;

use crate::state::State;

/// Errors raised while parsing a template. Helper misuse (e.g. calling
/// `short5` on a value that isn't a SHA) is intentionally *not* an error —
/// it renders empty, for compatibility with templates written against a
/// looser set of fields than are actually present.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// An opening `{{` was never closed.
    #[error("unterminated template tag starting at byte {0}")]
    Unterminated(usize),
}

/// Render `template` against `state`, resolving every `{{...}}` tag.
pub fn render(template: &str, state: &State) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    let mut consumed = 0usize;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("}}") else {
            return Err(TemplateError::Unterminated(consumed + start));
        };
        let tag = after_open[..end].trim();
        out.push_str(&resolve_tag(tag, state));
        let tag_len = start + 2 + end + 2;
        consumed += tag_len;
        rest = &after_open[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

fn resolve_tag(tag: &str, state: &State) -> String {
    let mut parts = tag.split_whitespace();
    let Some(head) = parts.next() else {
        return String::new();
    };
    let raw_arg = parts.next();
    // Helper arguments are themselves state paths (or literal text, when no
    // path resolves) — `{{short7 releaseScope.finalCommit}}` must shorten
    // the resolved SHA, not the literal path string.
    let arg = raw_arg.map(|a| resolve_arg(a, state));
    let arg = arg.as_deref();

    match head {
        "sanitize" => arg.map(sanitize).unwrap_or_default(),
        "sanitizeLower" => arg.map(|a| sanitize(a).to_lowercase()).unwrap_or_default(),
        "short5" => arg.map(|a| short(a, 5)).unwrap_or_default(),
        "short6" => arg.map(|a| short(a, 6)).unwrap_or_default(),
        "short7" => arg.map(|a| short(a, 7)).unwrap_or_default(),
        "lower" => arg.map(str::to_lowercase).unwrap_or_default(),
        "upper" => arg.map(str::to_uppercase).unwrap_or_default(),
        "capitalize" => arg.map(capitalize).unwrap_or_default(),
        "trim" => arg.map(|a| a.trim().to_string()).unwrap_or_default(),
        "first" => arg.and_then(|a| a.chars().next()).map(String::from).unwrap_or_default(),
        "last" => arg.and_then(|a| a.chars().next_back()).map(String::from).unwrap_or_default(),
        "replace" => replace_helper(parts.collect::<Vec<_>>().as_slice(), arg),
        "cutLeft" => cut_left(arg, parts.next()),
        "cutRight" => cut_right(arg, parts.next()),
        "timestampYYYYMMDDHHMMSS" => state.timestamp_compact(),
        "timestampISO8601" => state.timestamp.clone(),
        _ if head.starts_with("environment.") => resolve_environment(head),
        _ if head.starts_with("file.") => resolve_file(head, arg),
        _ => lookup_path(head, state).unwrap_or_default(),
    }
}

/// Resolve a helper argument as a dotted state path; falls back to the raw
/// token when nothing resolves, so helpers also accept literal text.
fn resolve_arg(arg: &str, state: &State) -> String {
    lookup_path(arg, state).unwrap_or_else(|| arg.to_string())
}

fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect()
}

fn short(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn replace_helper(rest: &[&str], arg: Option<&str>) -> String {
    let Some(value) = arg else { return String::new() };
    let (Some(from), Some(to)) = (rest.first(), rest.get(1)) else {
        return value.to_string();
    };
    value.replace(from, to)
}

fn cut_left(arg: Option<&str>, n: Option<&str>) -> String {
    let (Some(value), Some(n)) = (arg, n.and_then(|n| n.parse::<usize>().ok())) else {
        return arg.unwrap_or_default().to_string();
    };
    value.chars().skip(n).collect()
}

fn cut_right(arg: Option<&str>, n: Option<&str>) -> String {
    let (Some(value), Some(n)) = (arg, n.and_then(|n| n.parse::<usize>().ok())) else {
        return arg.unwrap_or_default().to_string();
    };
    let len = value.chars().count();
    value.chars().take(len.saturating_sub(n)).collect()
}

fn resolve_environment(head: &str) -> String {
    match head.strip_prefix("environment.") {
        Some("user") => std::env::var("USER").or_else(|_| std::env::var("USERNAME")).unwrap_or_default(),
        Some(var) => std::env::var(var).unwrap_or_default(),
        None => String::new(),
    }
}

fn resolve_file(head: &str, arg: Option<&str>) -> String {
    let Some(path) = arg else { return String::new() };
    match head.strip_prefix("file.") {
        Some("exists") => std::path::Path::new(path).exists().to_string(),
        Some("content") => std::fs::read_to_string(path).unwrap_or_default(),
        _ => String::new(),
    }
}

/// Resolve a dotted path (`releaseScope.finalCommit`, `configuration.releasePrefix`,
/// bare `version`, ...) against `state`. Returns `None` for unknown paths,
/// which [`resolve_tag`] turns into empty output.
fn lookup_path(path: &str, state: &State) -> Option<String> {
    let mut segments = path.split('.');
    let root = segments.next()?;
    let rest: Vec<&str> = segments.collect();
    state.lookup(root, &rest)
}

/// Current time as an ISO-8601 UTC timestamp (`YYYY-MM-DDTHH:MM:SSZ`),
/// for stamping `State.timestamp` at the start of a run. Uses the same
/// civil-calendar conversion the CLI's log layer uses, so this crate
/// never needs a `chrono` dependency just to read the clock.
#[must_use]
pub fn now_iso8601() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let secs = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
    let days = (secs / 86400) as i64;
    let time_of_day = secs % 86400;

    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };

    let (h, min, s) = (time_of_day / 3600, (time_of_day % 3600) / 60, time_of_day % 60);
    format!("{y:04}-{m:02}-{d:02}T{h:02}:{min:02}:{s:02}Z")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::State;

    #[test]
    fn plain_substitution() {
        let state = State::empty_for_test();
        let rendered = render("hello {{branch}}", &state).unwrap();
        assert_eq!(rendered, "hello main");
    }

    #[test]
    fn undefined_name_renders_empty() {
        let state = State::empty_for_test();
        let rendered = render("[{{nope}}]", &state).unwrap();
        assert_eq!(rendered, "[]");
    }

    #[test]
    fn dotted_path_into_state() {
        let state = State::empty_for_test();
        let rendered = render("{{releaseScope.finalCommit}}", &state).unwrap();
        assert_eq!(rendered, "deadbeef");
    }

    #[test]
    fn helper_short_sha() {
        let state = State::empty_for_test();
        let rendered = render("{{short7 releaseScope.finalCommit}}", &state).unwrap();
        assert_eq!(rendered, "deadbee");
    }

    #[test]
    fn helper_sanitize_replaces_non_alnum() {
        let state = State::empty_for_test();
        let rendered = render("{{sanitize branch}}", &state).unwrap();
        assert_eq!(rendered, "main");
    }

    #[test]
    fn unterminated_tag_is_an_error() {
        let state = State::empty_for_test();
        assert!(render("{{oops", &state).is_err());
    }

    #[test]
    #[allow(unsafe_code)]
    fn environment_variable_lookup() {
        unsafe { std::env::set_var("NYX_TEMPLATE_TEST", "present") };
        let state = State::empty_for_test();
        let rendered = render("{{environment.NYX_TEMPLATE_TEST}}", &state).unwrap();
        assert_eq!(rendered, "present");
        unsafe { std::env::remove_var("NYX_TEMPLATE_TEST") };
    }

    #[test]
    fn resolved_twice_is_identical() {
        let state = State::empty_for_test();
        let a = render("{{version}}-{{branch}}", &state).unwrap();
        let b = render("{{version}}-{{branch}}", &state).unwrap();
        assert_eq!(a, b);
    }
}
