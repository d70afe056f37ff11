//! Element index and fuzzy resolver.
//!
//! The index is a point-in-time snapshot of the page's interactive controls,
//! rebuilt on demand and never cached across turns — the page may have
//! changed under us. Resolution walks a precision-first cascade: exact
//! action id, exact element id, the domain keyword table, fuzzy search-text
//! scoring, and finally a loose substring pass. Exact identifiers beating
//! semantic aliases beating fuzzy text keeps common words from misfiring.

use std::time::Duration;

use aho_corasick::AhoCorasick;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, trace};

use compass_surface::{NodeId, NodeKind, NodeSnapshot, Rect, UiSurface};

use crate::config::EngineConfig;

/// Inner text longer than this is truncated in the composed search text.
const SEARCH_TEXT_MAX: usize = 80;

/// Domain keyword table: a phrase found in the query maps to an ordered
/// list of canonical action ids to try. First alias present in the index
/// wins.
const KEYWORD_ALIASES: &[(&str, &[&str])] = &[
    ("create account", &["signup-submit", "signup-tab"]),
    ("sign up", &["signup-submit", "signup-tab"]),
    ("register", &["signup-submit", "signup-tab"]),
    ("sign in", &["signin-submit", "signin-tab"]),
    ("log in", &["signin-submit", "signin-tab"]),
    ("login", &["signin-submit", "signin-tab"]),
    ("full name", &["signup-name"]),
    ("name", &["signup-name"]),
    ("email", &["signup-email", "signin-email"]),
    ("password", &["signup-password", "signin-password"]),
    ("verification code", &["otp-input"]),
    ("otp", &["otp-input"]),
    ("verify", &["verify-submit"]),
    ("role", &["role-select"]),
    ("student", &["role-card-student", "role-select"]),
    ("counsellor", &["role-card-counsellor", "role-select"]),
    ("counselor", &["role-card-counsellor", "role-select"]),
    ("submit", &["signup-submit", "signin-submit", "verify-submit"]),
    ("dashboard", &["nav-dashboard"]),
    ("resume", &["nav-resume"]),
    ("messages", &["nav-messages"]),
];

/// Normalized, queryable snapshot of one interactive control.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementDescriptor {
    /// Canonical action id, if the element carries one.
    pub action_id: Option<String>,
    /// The element's own id attribute, if any.
    pub dom_id: Option<String>,
    pub kind: NodeKind,
    pub input_type: Option<String>,
    pub text: String,
    pub label: Option<String>,
    pub placeholder: Option<String>,
    pub aria_label: Option<String>,
    pub disabled: bool,
    pub visible: bool,
    pub in_viewport: bool,
    pub position: Rect,
    /// Lowercased haystack composed from every textual attribute.
    pub search_text: String,
    /// Non-owning reference into the UI surface.
    pub node: NodeId,
}

impl ElementDescriptor {
    fn from_snapshot(snapshot: &NodeSnapshot, in_viewport: bool) -> Self {
        Self {
            action_id: snapshot.action_id.clone(),
            dom_id: snapshot.dom_id.clone(),
            kind: snapshot.kind,
            input_type: snapshot.input_type.clone(),
            text: snapshot.text.clone(),
            label: snapshot.label.clone(),
            placeholder: snapshot.placeholder.clone(),
            aria_label: snapshot.aria_label.clone(),
            disabled: snapshot.disabled,
            visible: !snapshot.hidden && !snapshot.aria_hidden && !snapshot.rect.is_empty(),
            in_viewport,
            position: snapshot.rect,
            search_text: compose_search_text(snapshot),
            node: snapshot.id,
        }
    }

    /// Short human-readable handle for replies ("the Sign Up button").
    pub fn display_name(&self) -> String {
        if !self.text.is_empty() {
            return self.text.clone();
        }
        for candidate in [&self.label, &self.aria_label, &self.placeholder, &self.action_id] {
            if let Some(name) = candidate {
                return name.clone();
            }
        }
        format!("{} {}", kind_name(self.kind), self.node)
    }
}

fn kind_name(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Button => "button",
        NodeKind::Link => "link",
        NodeKind::TextInput => "input",
        NodeKind::Textarea => "text area",
        NodeKind::Select => "dropdown",
        NodeKind::Option => "option",
        NodeKind::Checkbox => "checkbox",
        NodeKind::Radio => "radio button",
        NodeKind::Toggle => "toggle",
        NodeKind::TaggedAction => "control",
        NodeKind::Other => "element",
    }
}

/// Compose the lowercased haystack the fuzzy matcher scores against.
fn compose_search_text(snapshot: &NodeSnapshot) -> String {
    let mut parts: Vec<&str> = Vec::new();
    let truncated_text = if snapshot.text.len() > SEARCH_TEXT_MAX {
        // Truncate on a char boundary.
        let mut end = SEARCH_TEXT_MAX;
        while !snapshot.text.is_char_boundary(end) {
            end -= 1;
        }
        &snapshot.text[..end]
    } else {
        &snapshot.text
    };

    for part in [
        snapshot.action_id.as_deref(),
        snapshot.dom_id.as_deref(),
        snapshot.name.as_deref(),
        Some(truncated_text),
        Some(snapshot.value.as_str()),
        snapshot.placeholder.as_deref(),
        snapshot.aria_label.as_deref(),
        snapshot.title.as_deref(),
        snapshot.label.as_deref(),
        snapshot.role.as_deref(),
    ]
    .into_iter()
    .flatten()
    {
        if !part.is_empty() {
            parts.push(part);
        }
    }

    parts.join(" ").to_lowercase()
}

/// Options for building the element index.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexOptions {
    /// Include nodes that are hidden or have no rendered size. Disabled
    /// nodes are always indexed (marked disabled) so callers can report
    /// "that control is disabled" rather than "not found".
    pub include_hidden: bool,
}

/// Snapshot of the page's interactive controls at one point in time.
#[derive(Debug, Clone, Default)]
pub struct ElementIndex {
    pub entries: Vec<ElementDescriptor>,
}

impl ElementIndex {
    /// Enumerate the surface and build a fresh index.
    pub async fn build(surface: &dyn UiSurface, options: IndexOptions) -> Self {
        let viewport = surface.viewport();
        let mut entries = Vec::new();

        for snapshot in surface.interactive_nodes().await {
            let visible =
                !snapshot.hidden && !snapshot.aria_hidden && !snapshot.rect.is_empty();
            if !visible && !options.include_hidden {
                continue;
            }
            let in_viewport = viewport.contains(&snapshot.rect);
            entries.push(ElementDescriptor::from_snapshot(&snapshot, in_viewport));
        }

        trace!(count = entries.len(), "element index built");
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Find an entry by exact (case-insensitive) action id.
    pub fn by_action_id(&self, action_id: &str) -> Option<&ElementDescriptor> {
        self.entries
            .iter()
            .find(|e| e.action_id.as_deref().is_some_and(|a| a.eq_ignore_ascii_case(action_id)))
    }

    /// Find an entry by node id.
    pub fn by_node(&self, node: NodeId) -> Option<&ElementDescriptor> {
        self.entries.iter().find(|e| e.node == node)
    }
}

/// Strip leading articles and a fixed set of trailing control nouns from a
/// free-text target.
///
/// A documented heuristic, not a guaranteed normalization: a control
/// literally labeled "Input" would be over-stripped, which is why the
/// resolver retries with the raw query when the cleaned one finds nothing.
pub fn clean_target_text(query: &str) -> String {
    let mut cleaned = query.trim().to_lowercase();

    for article in ["the ", "a ", "an "] {
        if let Some(rest) = cleaned.strip_prefix(article) {
            cleaned = rest.to_string();
            break;
        }
    }

    for noun in [" button", " link", " field", " input", " box", " dropdown", " tab"] {
        if let Some(rest) = cleaned.strip_suffix(noun) {
            cleaned = rest.to_string();
            break;
        }
    }

    let cleaned = cleaned.trim().to_string();
    if cleaned.is_empty() {
        query.trim().to_lowercase()
    } else {
        cleaned
    }
}

/// Cascading free-text element resolver.
pub struct Resolver {
    config: EngineConfig,
    keywords: AhoCorasick,
}

impl Resolver {
    pub fn new(config: EngineConfig) -> Self {
        let phrases: Vec<&str> = KEYWORD_ALIASES.iter().map(|(p, _)| *p).collect();
        let keywords =
            AhoCorasick::new(&phrases).expect("keyword table must build an automaton");
        Self { config, keywords }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Resolve a free-text target against the index. Cascade order:
    ///
    /// 1. exact action id
    /// 2. exact element id
    /// 3. domain keyword aliases
    /// 4. fuzzy search-text score above the configured threshold
    /// 5. substring on visible text
    pub fn resolve(&self, query: &str, index: &ElementIndex) -> Option<ElementDescriptor> {
        let raw = query.trim().to_lowercase();
        if raw.is_empty() {
            return None;
        }
        let cleaned = clean_target_text(query);

        // 1. Exact action id.
        if let Some(hit) = index.by_action_id(&raw) {
            debug!(query = %query, action = ?hit.action_id, "resolved by action id");
            return Some(hit.clone());
        }

        // 2. Exact element id.
        if let Some(hit) = index
            .entries
            .iter()
            .find(|e| e.dom_id.as_deref().is_some_and(|d| d.eq_ignore_ascii_case(&raw)))
        {
            debug!(query = %query, "resolved by element id");
            return Some(hit.clone());
        }

        // 3. Keyword table.
        if let Some(hit) = self.by_keyword(&raw, index) {
            debug!(query = %query, action = ?hit.action_id, "resolved by keyword alias");
            return Some(hit);
        }

        // 4. Fuzzy score, cleaned query first, raw as the fallback for
        //    targets the cleaner over-stripped.
        for candidate_query in queries(&cleaned, &raw) {
            if let Some(hit) = self.by_fuzzy(candidate_query, index) {
                debug!(query = %query, score_query = %candidate_query, "resolved by fuzzy score");
                return Some(hit);
            }
        }

        // 5. Visible-text substring, last resort.
        for candidate_query in queries(&cleaned, &raw) {
            if let Some(hit) = index
                .entries
                .iter()
                .find(|e| e.text.to_lowercase().contains(candidate_query))
            {
                debug!(query = %query, "resolved by text substring");
                return Some(hit.clone());
            }
        }

        debug!(query = %query, "no element resolved");
        None
    }

    /// Poll the surface until the query resolves or the timeout elapses.
    ///
    /// Resolves to `None` rather than hanging — content that never appears
    /// is an ordinary outcome, not an error.
    pub async fn wait_for(
        &self,
        surface: &dyn UiSurface,
        query: &str,
        timeout: Duration,
        interval: Duration,
    ) -> Option<ElementDescriptor> {
        let deadline = Instant::now() + timeout;
        loop {
            let index = ElementIndex::build(surface, IndexOptions::default()).await;
            if let Some(hit) = self.resolve(query, &index) {
                return Some(hit);
            }
            if Instant::now() >= deadline {
                debug!(query = %query, "wait_for timed out");
                return None;
            }
            tokio::time::sleep(interval).await;
        }
    }

    /// Poll with the configured default timeout and interval.
    pub async fn wait_for_default(
        &self,
        surface: &dyn UiSurface,
        query: &str,
    ) -> Option<ElementDescriptor> {
        self.wait_for(
            surface,
            query,
            Duration::from_millis(self.config.wait_timeout_ms),
            Duration::from_millis(self.config.poll_interval_ms),
        )
        .await
    }

    fn by_keyword(&self, raw: &str, index: &ElementIndex) -> Option<ElementDescriptor> {
        // Longest keyword found anywhere in the query wins, mirroring the
        // longest-phrase rule of the exact tier.
        let mut best: Option<usize> = None;
        let mut best_len = 0;
        for mat in self.keywords.find_overlapping_iter(raw) {
            let len = mat.end() - mat.start();
            if len > best_len {
                best = Some(mat.pattern().as_usize());
                best_len = len;
            }
        }

        let (_, aliases) = KEYWORD_ALIASES[best?];
        for alias in aliases {
            if let Some(hit) = index.by_action_id(alias) {
                return Some(hit.clone());
            }
        }
        None
    }

    fn by_fuzzy(&self, query: &str, index: &ElementIndex) -> Option<ElementDescriptor> {
        let mut best: Option<(&ElementDescriptor, f64)> = None;
        for entry in &index.entries {
            let score = self.score(&entry.search_text, query);
            trace!(element = %entry.display_name(), score, "fuzzy candidate");
            if score > best.map_or(0.0, |(_, s)| s) {
                best = Some((entry, score));
            }
        }
        best.filter(|(_, score)| *score >= self.config.fuzzy_threshold)
            .map(|(entry, _)| entry.clone())
    }

    /// Fuzzy score between an element's search text and a query.
    fn score(&self, search_text: &str, query: &str) -> f64 {
        if search_text == query {
            return 1.0;
        }
        if search_text.contains(query) {
            return self.config.score_element_contains_query;
        }
        if !search_text.is_empty() && query.contains(search_text) {
            return self.config.score_query_contains_element;
        }

        let words: Vec<&str> = query.split_whitespace().collect();
        if words.is_empty() {
            return 0.0;
        }
        let present = words
            .iter()
            .filter(|w| search_text.contains(**w))
            .count();
        (present as f64 / words.len() as f64) * self.config.score_word_overlap
    }
}

/// Cleaned query first, then the raw query if it differs.
fn queries<'a>(cleaned: &'a str, raw: &'a str) -> impl Iterator<Item = &'a str> {
    let retry = if cleaned != raw { Some(raw) } else { None };
    std::iter::once(cleaned).chain(retry)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use compass_surface::{MockSurface, NodeSpec};

    fn resolver() -> Resolver {
        Resolver::new(EngineConfig::default())
    }

    async fn auth_index(surface: &MockSurface) -> ElementIndex {
        ElementIndex::build(surface, IndexOptions::default()).await
    }

    fn auth_surface() -> MockSurface {
        let surface = MockSurface::new("/auth");
        surface.add(
            NodeSpec::button("Sign Up")
                .action_id("signup-tab")
                .at(100.0, 40.0),
        );
        surface.add(
            NodeSpec::text_input("email")
                .action_id("signup-email")
                .placeholder("Enter your email")
                .label("Email address")
                .input_type("email")
                .at(100.0, 120.0),
        );
        surface.add(
            NodeSpec::button("Create Account")
                .action_id("signup-submit")
                .at(100.0, 200.0),
        );
        surface
    }

    #[tokio::test]
    async fn hidden_nodes_are_filtered_unless_requested() {
        let surface = auth_surface();
        surface.add(NodeSpec::text_input("otp").action_id("otp-input").hidden());

        let index = auth_index(&surface).await;
        assert_eq!(index.len(), 3);

        let with_hidden =
            ElementIndex::build(&surface, IndexOptions { include_hidden: true }).await;
        assert_eq!(with_hidden.len(), 4);
        let otp = with_hidden.by_action_id("otp-input").unwrap();
        assert!(!otp.visible);
    }

    #[tokio::test]
    async fn exact_action_id_beats_fuzzy() {
        let surface = auth_surface();
        // A decoy whose text would fuzzy-match the query.
        surface.add(NodeSpec::button("signup-email help").at(100.0, 300.0));

        let index = auth_index(&surface).await;
        let hit = resolver().resolve("signup-email", &index).unwrap();
        assert_eq!(hit.action_id.as_deref(), Some("signup-email"));
        assert_eq!(hit.kind, NodeKind::TextInput);
    }

    #[tokio::test]
    async fn keyword_alias_finds_canonical_control() {
        let surface = auth_surface();
        let index = auth_index(&surface).await;

        let hit = resolver().resolve("create account", &index).unwrap();
        assert_eq!(hit.action_id.as_deref(), Some("signup-submit"));

        // "sign up" prefers the submit control, falling back to the tab.
        let hit = resolver().resolve("sign up", &index).unwrap();
        assert_eq!(hit.action_id.as_deref(), Some("signup-submit"));
    }

    #[tokio::test]
    async fn fuzzy_match_on_label_text() {
        let surface = auth_surface();
        let index = auth_index(&surface).await;

        // "address" avoids the keyword table, so this lands in the fuzzy tier.
        let hit = resolver().resolve("the address box", &index).unwrap();
        assert_eq!(hit.action_id.as_deref(), Some("signup-email"));
    }

    #[tokio::test]
    async fn unresolvable_query_is_none() {
        let surface = auth_surface();
        let index = auth_index(&surface).await;
        assert!(resolver().resolve("quarterly revenue chart", &index).is_none());
    }

    #[tokio::test]
    async fn cleaned_query_strips_articles_and_nouns() {
        let surface = MockSurface::new("/");
        surface.add(NodeSpec::button("Dashboard").at(0.0, 10.0));
        let index = auth_index(&surface).await;

        let hit = resolver().resolve("the dashboard button", &index).unwrap();
        assert_eq!(hit.text, "Dashboard");
    }

    #[test]
    fn clean_target_text_keeps_nonempty_residue() {
        assert_eq!(clean_target_text("the submit button"), "submit");
        assert_eq!(clean_target_text("an email field"), "email");
        // Over-strip guard: a target that *is* a stripped noun stays intact.
        assert_eq!(clean_target_text("input"), "input");
    }

    #[test]
    fn score_tiers() {
        let r = resolver();
        assert_eq!(r.score("sign up", "sign up"), 1.0);
        assert_eq!(r.score("sign up now", "sign up"), 0.9);
        assert_eq!(r.score("sign", "sign up"), 0.7);
        // One of two words present.
        let score = r.score("email address", "email box");
        assert!((score - 0.3).abs() < 1e-9);
    }

    #[tokio::test]
    async fn wait_for_sees_content_appearing_later() {
        let surface = std::sync::Arc::new(auth_surface());
        let otp = surface.add(NodeSpec::text_input("otp").action_id("otp-input").hidden());

        // Reveal the OTP card a few polls in, like a portal opening after an
        // earlier action.
        let delayed = surface.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(60)).await;
            delayed.with_page(|page| page.set_hidden(otp, false));
        });

        let r = resolver();
        let hit = r
            .wait_for(
                surface.as_ref(),
                "otp",
                Duration::from_millis(500),
                Duration::from_millis(20),
            )
            .await;
        assert!(hit.is_some());
    }

    #[tokio::test]
    async fn wait_for_times_out_to_none() {
        let surface = auth_surface();
        let r = resolver();
        let hit = r
            .wait_for(
                &surface,
                "otp",
                Duration::from_millis(80),
                Duration::from_millis(20),
            )
            .await;
        assert!(hit.is_none());
    }
}
