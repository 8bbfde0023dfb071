//! robots.txt parser
//!
//! Parses the subset of robots.txt the crawler honours: user-agent groups with
//! allow/disallow/host/crawl-delay directives, plus the flat sitemap list.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// The wildcard agent group
pub const WILDCARD_AGENT: &str = "*";

/// Longest crawl delay honoured; larger values are clamped to it
pub const MAX_CRAWL_DELAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Directives attached to one user-agent group
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Directives {
    /// Path patterns explicitly allowed
    pub allow: Vec<String>,

    /// Path patterns disallowed
    pub disallow: Vec<String>,

    /// Preferred host, if declared
    pub host: Option<String>,

    /// Minimum spacing between requests
    pub crawl_delay: Option<Duration>,
}

/// Rule keys accepted by [`RobotsRules::get_rule`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKey {
    Allow,
    Disallow,
    Host,
    CrawlDelay,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown robots.txt rule: {0}")]
pub struct UnknownRuleKey(pub String);

impl FromStr for RuleKey {
    type Err = UnknownRuleKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "allow" => Ok(Self::Allow),
            "disallow" => Ok(Self::Disallow),
            "host" => Ok(Self::Host),
            "crawl-delay" => Ok(Self::CrawlDelay),
            other => Err(UnknownRuleKey(other.to_string())),
        }
    }
}

/// A rule value returned by [`RobotsRules::get_rule`]
#[derive(Debug, Clone, PartialEq)]
pub enum Rule<'a> {
    Patterns(&'a [String]),
    Host(&'a str),
    CrawlDelay(Duration),
}

/// Parsed robots.txt for one domain
///
/// Agent tokens are stored lowercased; lookups are case-insensitive. A lookup
/// for an agent without its own group falls back to the `*` group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RobotsRules {
    groups: HashMap<String, Directives>,
    sitemaps: Vec<String>,
}

impl RobotsRules {
    /// Parses raw robots.txt content
    ///
    /// - `#` starts a comment that runs to the end of the line
    /// - a blank line closes the current group
    /// - consecutive `User-agent` lines share one group; a `User-agent` line
    ///   after a rule line starts a new group
    /// - `Allow`, `Disallow`, `Host` and `Crawl-delay` attach to the open group
    ///   and are ignored when no group is open
    /// - `Sitemap` is collected regardless of grouping
    ///
    /// Parsing never fails: unknown or malformed lines are skipped.
    pub fn parse(content: &str) -> Self {
        let mut rules = Self::default();
        let mut current: Vec<String> = Vec::new();
        let mut reading_agents = false;

        for raw in content.lines() {
            if raw.trim().is_empty() {
                current.clear();
                reading_agents = false;
                continue;
            }

            let line = match raw.find('#') {
                Some(idx) => &raw[..idx],
                None => raw,
            }
            .trim();

            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    if !reading_agents {
                        current.clear();
                    }
                    let agent = value.to_ascii_lowercase();
                    rules.groups.entry(agent.clone()).or_default();
                    current.push(agent);
                    reading_agents = true;
                }
                "allow" | "disallow" | "host" | "crawl-delay" => {
                    reading_agents = false;
                    for agent in &current {
                        let group = rules.groups.entry(agent.clone()).or_default();
                        apply_directive(group, &key, value);
                    }
                }
                "sitemap" => {
                    if !value.is_empty() {
                        rules.sitemaps.push(value.to_string());
                    }
                }
                _ => {}
            }
        }

        rules
    }

    /// Looks up a single rule for an agent
    ///
    /// The agent's own group is consulted if it exists; otherwise the wildcard
    /// group. Returns `None` if the selected group does not carry the key.
    pub fn get_rule(&self, agent: &str, key: RuleKey) -> Option<Rule<'_>> {
        let group = self.group_for(agent)?;
        match key {
            RuleKey::Allow if !group.allow.is_empty() => Some(Rule::Patterns(&group.allow)),
            RuleKey::Disallow if !group.disallow.is_empty() => {
                Some(Rule::Patterns(&group.disallow))
            }
            RuleKey::Host => group.host.as_deref().map(Rule::Host),
            RuleKey::CrawlDelay => group.crawl_delay.map(Rule::CrawlDelay),
            _ => None,
        }
    }

    /// Returns the directive group that applies to `agent`
    pub fn group_for(&self, agent: &str) -> Option<&Directives> {
        self.groups
            .get(&agent.to_ascii_lowercase())
            .or_else(|| self.groups.get(WILDCARD_AGENT))
    }

    /// Checks whether `path` (path plus optional query) may be fetched by `agent`
    ///
    /// The longest matching pattern decides; on a tie `Allow` wins. A path that
    /// matches nothing, or an agent with no applicable group, is allowed.
    pub fn is_allowed(&self, agent: &str, path: &str) -> bool {
        let Some(group) = self.group_for(agent) else {
            return true;
        };

        let longest = |patterns: &[String]| {
            patterns
                .iter()
                .filter(|pattern| pattern_matches(pattern, path))
                .map(String::len)
                .max()
        };

        match (longest(&group.allow), longest(&group.disallow)) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(allow), Some(disallow)) => allow >= disallow,
        }
    }

    /// Returns the crawl delay that applies to `agent`, if any
    pub fn crawl_delay(&self, agent: &str) -> Option<Duration> {
        self.group_for(agent).and_then(|group| group.crawl_delay)
    }

    /// Sitemap URLs declared anywhere in the file
    pub fn sitemaps(&self) -> &[String] {
        &self.sitemaps
    }

    /// Number of distinct agent groups
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}

fn apply_directive(group: &mut Directives, key: &str, value: &str) {
    match key {
        // An empty Allow/Disallow matches nothing
        "allow" if !value.is_empty() => group.allow.push(value.to_string()),
        "disallow" if !value.is_empty() => group.disallow.push(value.to_string()),
        "host" if !value.is_empty() => group.host = Some(value.to_string()),
        "crawl-delay" => {
            if let Ok(seconds) = value.parse::<f64>() {
                if seconds.is_finite() && seconds >= 0.0 {
                    let delay = Duration::try_from_secs_f64(seconds).unwrap_or(MAX_CRAWL_DELAY);
                    group.crawl_delay = Some(delay.min(MAX_CRAWL_DELAY));
                }
            }
        }
        _ => {}
    }
}

/// Matches a robots.txt path pattern against a path
///
/// Patterns are prefix matches; `*` matches any run of characters and a
/// trailing `$` anchors the pattern to the end of the path.
fn pattern_matches(pattern: &str, path: &str) -> bool {
    if pattern.is_empty() {
        return false;
    }

    let (pattern, anchored) = match pattern.strip_suffix('$') {
        Some(stripped) => (stripped, true),
        None => (pattern, false),
    };

    let mut pieces = pattern.split('*');
    let first = pieces.next().unwrap_or_default();
    let Some(mut rest) = path.strip_prefix(first) else {
        return false;
    };

    let pieces: Vec<&str> = pieces.collect();
    if pieces.is_empty() {
        return !anchored || rest.is_empty();
    }

    let last = pieces.len() - 1;
    for (i, piece) in pieces.iter().enumerate() {
        if i == last && anchored {
            return rest.ends_with(piece);
        }
        match rest.find(piece) {
            Some(idx) => rest = &rest[idx + piece.len()..],
            None => return false,
        }
    }

    true
}
