//! Command pattern construction - anchoring and compilation of listener regexes

use regex_lite::{Regex, RegexBuilder};

use crate::application::errors::BotError;

/// Anchor a `hear` pattern: matches at the start of the text, no addressing needed
pub fn hear_pattern(pattern: &str) -> String {
    format!("^(?:{})", pattern)
}

/// Anchor a `respond` pattern: the text must open by addressing the robot,
/// optionally with `@` and a trailing `:` or `,`
pub fn respond_pattern(robot_name: &str, pattern: &str) -> String {
    format!(
        r"^(?:@?{}[:,]?\s*(?:{}))",
        regex_lite::escape(robot_name),
        pattern
    )
}

/// Compile an anchored pattern case-insensitively.
///
/// Case folding, `\s` and `\w` are ASCII-only, so a non-ASCII robot name or
/// command only matches with the exact casing it was registered with.
pub fn compile(anchored: &str) -> Result<Regex, BotError> {
    RegexBuilder::new(anchored)
        .case_insensitive(true)
        .build()
        .map_err(|e| BotError::Pattern(format!("{}: {}", anchored, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_folding_is_ascii_only() {
        let re = compile(&hear_pattern("über")).unwrap();
        assert!(re.is_match("über alles"));
        assert!(!re.is_match("ÜBER alles"));
    }

    #[test]
    fn test_respond_requires_addressing() {
        let re = compile(&respond_pattern("mmbot", "ping")).unwrap();
        assert!(re.is_match("mmbot ping"));
        assert!(re.is_match("@mmbot: ping"));
        assert!(re.is_match("mmbot, ping"));
        assert!(re.is_match("MMBOT PING"));
        assert!(!re.is_match("xmmbot ping"));
        assert!(!re.is_match("ping"));
    }

    #[test]
    fn test_hear_is_anchored_only() {
        let re = compile(&hear_pattern("ping")).unwrap();
        assert!(re.is_match("ping"));
        assert!(re.is_match("Ping me later"));
        assert!(!re.is_match("say ping"));
    }

    #[test]
    fn test_alternation_stays_inside_anchor() {
        let re = compile(&respond_pattern("mmbot", "cat|dog")).unwrap();
        assert!(re.is_match("mmbot dog"));
        assert!(!re.is_match("hotdog"));
    }

    #[test]
    fn test_robot_name_is_literal() {
        let anchored = respond_pattern("bot.v2", "ping");
        let re = compile(&anchored).unwrap();
        assert!(re.is_match("bot.v2 ping"));
        assert!(!re.is_match("botxv2 ping"));
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        assert!(matches!(compile(&hear_pattern("(unclosed")), Err(BotError::Pattern(_))));
    }
}
