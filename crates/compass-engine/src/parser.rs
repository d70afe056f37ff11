//! Command parser — classifies raw utterances into structured intents.
//!
//! The parser keeps two rule sets and scans them in priority order:
//!
//! 1. **Custom commands** registered at runtime, checked first.
//! 2. A fixed, ordered table of built-in rules.
//!
//! The first rule whose pattern matches wins — there is no scoring across
//! rules, order *is* the tie-break. Built-in matches carry confidence 0.85,
//! custom matches 0.9, and text no rule matches falls out as `UNKNOWN` with
//! confidence 0.
//!
//! `parse` is a pure function of the utterance plus the registered rule
//! table: it never touches the page.

use regex::{Captures, Regex, RegexBuilder};
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::intent::{AuthMode, HistoryDirection, Intent, ParsedIntent, ScrollDirection};

/// Confidence attached to a built-in rule match.
const BUILTIN_CONFIDENCE: f64 = 0.85;

/// Confidence attached to a custom command match.
const CUSTOM_CONFIDENCE: f64 = 0.9;

type Extract = Box<dyn Fn(&Captures<'_>) -> Intent + Send + Sync>;

struct Rule {
    pattern: Regex,
    extract: Extract,
}

impl Rule {
    fn new(pattern: &str, extract: impl Fn(&Captures<'_>) -> Intent + Send + Sync + 'static) -> Self {
        Self {
            // Built-in patterns are fixed strings; a failure here is a
            // programming error caught by the rule-table test.
            pattern: compile(pattern).expect("built-in rule pattern must compile"),
            extract: Box::new(extract),
        }
    }
}

/// Rules match case-insensitively so capture groups can hand back the
/// user's original casing. Passwords and names must survive verbatim.
fn compile(pattern: &str) -> std::result::Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

/// A runtime-registered command.
struct CustomCommand {
    name: String,
    rule: Rule,
}

/// Pattern-based intent classifier.
pub struct CommandParser {
    custom: Vec<CustomCommand>,
    rules: Vec<Rule>,
}

impl CommandParser {
    pub fn new() -> Self {
        Self {
            custom: Vec::new(),
            rules: builtin_rules(),
        }
    }

    /// Register a custom command, checked before every built-in rule.
    ///
    /// Patterns match case-insensitively, like the built-ins.
    /// Re-registering a name replaces the previous command. Returns an error
    /// if the pattern does not compile.
    pub fn register_command(
        &mut self,
        name: impl Into<String>,
        pattern: &str,
        extract: impl Fn(&Captures<'_>) -> Intent + Send + Sync + 'static,
    ) -> Result<()> {
        let name = name.into();
        let compiled = compile(pattern).map_err(|e| EngineError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        debug!(name = %name, pattern = %pattern, "custom command registered");
        self.custom.retain(|c| c.name != name);
        self.custom.push(CustomCommand {
            name,
            rule: Rule {
                pattern: compiled,
                extract: Box::new(extract),
            },
        });
        Ok(())
    }

    /// Remove a custom command; returns whether it existed.
    pub fn unregister_command(&mut self, name: &str) -> bool {
        let before = self.custom.len();
        self.custom.retain(|c| c.name != name);
        self.custom.len() != before
    }

    /// Classify one utterance. First matching rule wins.
    pub fn parse(&self, text: &str) -> ParsedIntent {
        let normalized = normalize(text);
        if normalized.is_empty() {
            return ParsedIntent::unknown(text);
        }

        for command in &self.custom {
            if let Some(caps) = command.rule.pattern.captures(&normalized) {
                let intent = (command.rule.extract)(&caps);
                debug!(command = %command.name, intent = intent.tag(), "custom command matched");
                return ParsedIntent {
                    intent,
                    confidence: CUSTOM_CONFIDENCE,
                    raw_match: Some(caps[0].to_string()),
                };
            }
        }

        for rule in &self.rules {
            if let Some(caps) = rule.pattern.captures(&normalized) {
                let intent = (rule.extract)(&caps);
                debug!(intent = intent.tag(), matched = %&caps[0], "built-in rule matched");
                return ParsedIntent {
                    intent,
                    confidence: BUILTIN_CONFIDENCE,
                    raw_match: Some(caps[0].to_string()),
                };
            }
        }

        ParsedIntent::unknown(text)
    }
}

impl Default for CommandParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Trim and drop trailing punctuation. Case is left alone: rules match
/// case-insensitively, and captured values keep the user's casing.
fn normalize(text: &str) -> String {
    text.trim().trim_end_matches(['.', '?', '!']).trim().to_string()
}

fn capture(caps: &Captures<'_>, name: &str) -> String {
    caps.name(name)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

/// Map slot phrasings onto canonical slot names. Slot names are
/// identifiers, so the result is always lowercase.
fn canonical_slot(raw: &str) -> String {
    match raw.to_lowercase().as_str() {
        "full name" => "name".into(),
        "e-mail" => "email".into(),
        "verification code" | "code" => "otp".into(),
        other => other.to_string(),
    }
}

/// Map role phrasings onto the canonical role strings the app uses.
fn canonical_role(raw: &str) -> String {
    match raw.to_lowercase().as_str() {
        "counselor" => "counsellor".into(),
        other => other.to_string(),
    }
}

/// The fixed built-in rule table, most specific rules first.
fn builtin_rules() -> Vec<Rule> {
    vec![
        // -- Page movement ---------------------------------------------------
        Rule::new(r"^(?:scroll|page|go) down$", |_| Intent::Scroll {
            direction: ScrollDirection::Down,
        }),
        Rule::new(r"^(?:scroll|page|go) up$", |_| Intent::Scroll {
            direction: ScrollDirection::Up,
        }),
        Rule::new(
            r"^(?:scroll |go )?(?:to (?:the )?)?top(?: of (?:the )?page)?$",
            |_| Intent::Scroll {
                direction: ScrollDirection::Top,
            },
        ),
        Rule::new(
            r"^(?:scroll |go )?(?:to (?:the )?)?bottom(?: of (?:the )?page)?$",
            |_| Intent::Scroll {
                direction: ScrollDirection::Bottom,
            },
        ),
        Rule::new(r"^(?:go |navigate )?back$", |_| Intent::Navigate {
            direction: HistoryDirection::Back,
        }),
        Rule::new(r"^(?:go |navigate )?forward$", |_| Intent::Navigate {
            direction: HistoryDirection::Forward,
        }),
        Rule::new(r"^(?:next field|tab|next)$", |_| Intent::TabNavigate {
            backward: false,
        }),
        Rule::new(r"^(?:previous field|previous|shift tab)$", |_| {
            Intent::TabNavigate { backward: true }
        }),
        // -- Forms and auth --------------------------------------------------
        Rule::new(r"^submit(?: (?:the )?form)?$", |_| Intent::Submit),
        Rule::new(
            r"^(?:i(?: want to|'d like to) )?(?:sign ?up|sign me up|create (?:an )?account|register)$",
            |_| Intent::AuthStart {
                mode: AuthMode::SignUp,
            },
        ),
        Rule::new(
            r"^(?:i(?: want to|'d like to) )?(?:sign ?in|sign me in|log ?in|log me in)$",
            |_| Intent::AuthStart {
                mode: AuthMode::SignIn,
            },
        ),
        Rule::new(
            r"^my (?P<slot>full name|name|e-mail|email|password|phone) is (?P<value>.+)$",
            |caps| Intent::FillSlot {
                slot: canonical_slot(&capture(caps, "slot")),
                value: capture(caps, "value"),
            },
        ),
        Rule::new(
            r"^(?:the )?(?P<slot>otp|code|verification code) is (?P<value>.+)$",
            |caps| Intent::FillSlot {
                slot: canonical_slot(&capture(caps, "slot")),
                value: capture(caps, "value"),
            },
        ),
        Rule::new(
            r"^(?:(?:i(?:'m| am)(?: a| an)?)|(?:select|choose)(?: the)?|as a)? ?(?P<role>student|counsell?or)(?: role)?$",
            |caps| Intent::SelectRole {
                role: canonical_role(&capture(caps, "role")),
            },
        ),
        // -- Conversation control --------------------------------------------
        Rule::new(r"^(?:yes|yeah|yep|confirm|ok|okay|sure|proceed|continue)$", |_| {
            Intent::Confirm
        }),
        Rule::new(r"^(?:cancel|stop|abort|quit|exit|never ?mind)$", |_| Intent::Cancel),
        Rule::new(r"^(?:help|what can (?:i|you) (?:say|do))$", |_| Intent::Help),
        Rule::new(r"^(?:where am i|what page is this|current page)$", |_| {
            Intent::WhereAmI
        }),
        // -- Element operations ----------------------------------------------
        Rule::new(
            r"^(?:select|choose|pick) (?P<value>.+?) (?:from|in) (?:the )?(?P<target>.+)$",
            |caps| Intent::Select {
                target: capture(caps, "target"),
                value: capture(caps, "value"),
            },
        ),
        Rule::new(
            r"^(?:toggle|check|uncheck|tick|untick) (?:the )?(?P<target>.+)$",
            |caps| Intent::Toggle {
                target: capture(caps, "target"),
            },
        ),
        Rule::new(r"^clear (?:the )?(?P<target>.+)$", |caps| Intent::Clear {
            target: Some(capture(caps, "target")),
        }),
        Rule::new(r"^clear$", |_| Intent::Clear { target: None }),
        Rule::new(
            r"^(?:type|enter|write|fill(?: in)?|put) (?P<value>.+?) (?:in(?:to)?|on) (?:the )?(?P<target>.+)$",
            |caps| Intent::Fill {
                target: Some(capture(caps, "target")),
                value: capture(caps, "value"),
            },
        ),
        Rule::new(r"^(?:type|enter|write) (?P<value>.+)$", |caps| Intent::Fill {
            target: None,
            value: capture(caps, "value"),
        }),
        Rule::new(
            r"^(?:focus(?: on)?|go to) (?:the )?(?P<target>.+)$",
            |caps| Intent::Focus {
                target: capture(caps, "target"),
            },
        ),
        Rule::new(
            r"^(?:click|press|tap|hit)(?: on)?(?: the)? (?P<target>.+)$",
            |caps| Intent::Click {
                target: capture(caps, "target"),
            },
        ),
        Rule::new(r"^(?:read|describe) (?:this |the )?page$", |_| Intent::Read {
            target: None,
        }),
        Rule::new(
            r"^(?:read|describe|what does) (?:the )?(?P<target>.+?)(?: say)?$",
            |caps| Intent::Read {
                target: Some(capture(caps, "target")),
            },
        ),
    ]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> ParsedIntent {
        CommandParser::new().parse(text)
    }

    #[test]
    fn rule_table_compiles() {
        // Rule::new panics on an invalid pattern; constructing the parser
        // exercises every built-in rule.
        let parser = CommandParser::new();
        assert!(!parser.rules.is_empty());
    }

    #[test]
    fn click_extracts_target() {
        let parsed = parse("click sign up");
        assert_eq!(
            parsed.intent,
            Intent::Click {
                target: "sign up".into()
            }
        );
        assert_eq!(parsed.confidence, BUILTIN_CONFIDENCE);
    }

    #[test]
    fn click_strips_leading_article() {
        let parsed = parse("click on the submit button");
        assert_eq!(
            parsed.intent,
            Intent::Click {
                target: "submit button".into()
            }
        );
    }

    #[test]
    fn fill_slot_from_my_x_is() {
        let parsed = parse("my email is test@example.com");
        assert_eq!(
            parsed.intent,
            Intent::FillSlot {
                slot: "email".into(),
                value: "test@example.com".into()
            }
        );
    }

    #[test]
    fn slot_names_are_canonicalized() {
        assert_eq!(
            parse("my full name is Ada Lovelace").intent,
            Intent::FillSlot {
                slot: "name".into(),
                value: "Ada Lovelace".into()
            }
        );
        assert_eq!(
            parse("the verification code is 123456").intent,
            Intent::FillSlot {
                slot: "otp".into(),
                value: "123456".into()
            }
        );
    }

    #[test]
    fn captured_values_keep_their_casing() {
        // The verb and slot name match regardless of case, but the value
        // must come through untouched: it may be a password.
        assert_eq!(
            parse("My Password is Hunter2Secret").intent,
            Intent::FillSlot {
                slot: "password".into(),
                value: "Hunter2Secret".into()
            }
        );
        assert_eq!(
            parse("TYPE Dr. Grace INTO THE name field").intent,
            Intent::Fill {
                target: Some("name field".into()),
                value: "Dr. Grace".into()
            }
        );
    }

    #[test]
    fn role_phrasings_normalize() {
        for text in ["i am a student", "i'm a student", "student", "select student role"] {
            assert_eq!(
                parse(text).intent,
                Intent::SelectRole {
                    role: "student".into()
                },
                "phrase: {text}"
            );
        }
        assert_eq!(
            parse("i am a counselor").intent,
            Intent::SelectRole {
                role: "counsellor".into()
            }
        );
    }

    #[test]
    fn fill_with_target_and_focused_variants() {
        assert_eq!(
            parse("type john into the name field").intent,
            Intent::Fill {
                target: Some("name field".into()),
                value: "john".into()
            }
        );
        assert_eq!(
            parse("type hello world").intent,
            Intent::Fill {
                target: None,
                value: "hello world".into()
            }
        );
    }

    #[test]
    fn select_extracts_value_and_target() {
        assert_eq!(
            parse("select counsellor from the role dropdown").intent,
            Intent::Select {
                target: "role dropdown".into(),
                value: "counsellor".into()
            }
        );
    }

    #[test]
    fn movement_and_history() {
        assert_eq!(
            parse("scroll down").intent,
            Intent::Scroll {
                direction: ScrollDirection::Down
            }
        );
        assert_eq!(
            parse("go to the top of the page").intent,
            Intent::Scroll {
                direction: ScrollDirection::Top
            }
        );
        assert_eq!(
            parse("go back").intent,
            Intent::Navigate {
                direction: HistoryDirection::Back
            }
        );
        assert_eq!(parse("next field").intent, Intent::TabNavigate { backward: false });
    }

    #[test]
    fn auth_start_phrasings() {
        assert_eq!(
            parse("sign up").intent,
            Intent::AuthStart {
                mode: AuthMode::SignUp
            }
        );
        assert_eq!(
            parse("i want to create an account").intent,
            Intent::AuthStart {
                mode: AuthMode::SignUp
            }
        );
        assert_eq!(
            parse("log in").intent,
            Intent::AuthStart {
                mode: AuthMode::SignIn
            }
        );
    }

    #[test]
    fn click_sign_up_is_click_not_auth_start() {
        // The click verb binds tighter than the bare auth phrase.
        assert_eq!(
            parse("click sign up").intent,
            Intent::Click {
                target: "sign up".into()
            }
        );
    }

    #[test]
    fn conversation_control() {
        assert_eq!(parse("yes").intent, Intent::Confirm);
        assert_eq!(parse("never mind").intent, Intent::Cancel);
        assert_eq!(parse("help").intent, Intent::Help);
        assert_eq!(parse("where am i?").intent, Intent::WhereAmI);
    }

    #[test]
    fn unknown_has_zero_confidence() {
        let parsed = parse("xyzzy");
        assert!(matches!(parsed.intent, Intent::Unknown { .. }));
        assert_eq!(parsed.confidence, 0.0);
        assert!(parsed.raw_match.is_none());
    }

    #[test]
    fn parse_is_deterministic() {
        let parser = CommandParser::new();
        let first = parser.parse("click the dashboard link");
        let second = parser.parse("click the dashboard link");
        assert_eq!(first, second);
    }

    #[test]
    fn custom_commands_win_over_builtins() {
        let mut parser = CommandParser::new();
        parser
            .register_command("open-resume", r"^click resume$", |_| Intent::Click {
                target: "resume-builder".into(),
            })
            .unwrap();

        let parsed = parser.parse("click resume");
        assert_eq!(
            parsed.intent,
            Intent::Click {
                target: "resume-builder".into()
            }
        );
        assert_eq!(parsed.confidence, CUSTOM_CONFIDENCE);

        assert!(parser.unregister_command("open-resume"));
        assert_eq!(
            parser.parse("click resume").intent,
            Intent::Click {
                target: "resume".into()
            }
        );
    }

    #[test]
    fn invalid_custom_pattern_is_rejected() {
        let mut parser = CommandParser::new();
        let result = parser.register_command("broken", "[unclosed(", |_| Intent::Help);
        assert!(matches!(
            result,
            Err(EngineError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn empty_utterance_is_unknown() {
        assert!(matches!(parse("   ").intent, Intent::Unknown { .. }));
    }
}
