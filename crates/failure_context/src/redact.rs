use std::sync::OnceLock;

use regex::{Captures, Regex};

const MASK: &str = "[REDACTED]";

fn assignment_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| {
        Regex::new(
            r#"(?i)\b((?:api[_-]?key|access[_-]?key|secret|password|passwd|token)\w*"?)(\s*[:=]\s*)("[^"]*"|'[^']*'|[^\s,;)]+)"#,
        )
        .expect("assignment regex must compile")
    })
}

fn bearer_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| {
        Regex::new(r"(?i)\b(bearer\s+)[A-Za-z0-9._~+/=-]{8,}").expect("bearer regex must compile")
    })
}

fn key_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| {
        Regex::new(r"\b(?:sk-[A-Za-z0-9_-]{16,}|gh[po]_[A-Za-z0-9]{20,}|AKIA[0-9A-Z]{16})\b")
            .expect("key regex must compile")
    })
}

fn email_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| {
        Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b")
            .expect("e-mail regex must compile")
    })
}

/// Masks likely credentials and e-mail addresses before text leaves the process.
///
/// Applying it twice gives the same result as applying it once.
#[derive(Debug, Clone, Copy, Default)]
pub struct Redactor;

impl Redactor {
    #[must_use]
    pub fn redact(&self, text: &str) -> String {
        let text = assignment_regex().replace_all(text, |caps: &Captures<'_>| {
            if caps[3].contains(MASK) {
                caps[0].to_string()
            } else {
                format!("{}{}{MASK}", &caps[1], &caps[2])
            }
        });
        let text = bearer_regex().replace_all(&text, format!("${{1}}{MASK}").as_str());
        let text = key_regex().replace_all(&text, MASK);
        email_regex().replace_all(&text, MASK).into_owned()
    }
}
