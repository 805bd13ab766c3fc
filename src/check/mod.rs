//! Check module for story quality checking
//!
//! Finds authoring problems a built graph can still carry:
//! - Ending conditions that do not parse
//! - Conditions naming variables the story never defines
//! - Rules shadowed by an earlier blank rule

use crate::domain::condition::Condition;
use crate::domain::entities::StoryGraph;
use crate::domain::services::ConditionalRule;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Check severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckLevel {
    /// Error: must be fixed
    Error,
    /// Warning: should be reviewed
    Warning,
    /// Info: for your information
    Info,
}

/// An issue found in a story
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckIssue {
    pub level: CheckLevel,
    pub message: String,
    /// Where the issue is, e.g. `episode e1, ending good`
    pub location: String,
    pub category: String,
}

/// Result of checking a story
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CheckResult {
    pub issues: Vec<CheckIssue>,
    pub error_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
}

impl CheckResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_issue(&mut self, issue: CheckIssue) {
        match issue.level {
            CheckLevel::Error => self.error_count += 1,
            CheckLevel::Warning => self.warning_count += 1,
            CheckLevel::Info => self.info_count += 1,
        }
        self.issues.push(issue);
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    fn push(&mut self, level: CheckLevel, category: &str, location: String, message: String) {
        self.add_issue(CheckIssue {
            level,
            message,
            location,
            category: category.to_string(),
        });
    }
}

/// Check every ending rule of a built story
pub fn check_story(graph: &StoryGraph) -> CheckResult {
    let mut result = CheckResult::new();

    let gauges: HashSet<&str> = graph.gauges().iter().map(|g| g.id.as_str()).collect();
    let tags = graph.tag_names();

    for episode in graph.episodes() {
        let endings = episode.endings();
        if endings.is_empty() {
            result.push(
                CheckLevel::Info,
                "quality",
                format!("episode {}", episode.id()),
                "episode has no ending rules; gauges stay unchanged".to_string(),
            );
        }
        check_default_rule(&mut result, endings, || format!("episode {}", episode.id()));

        for ending in endings {
            let location = format!("episode {}, ending {}", episode.id(), ending.id);
            check_condition(&mut result, ending, location, |name| {
                gauges.contains(name) || tags.contains(name)
            });
        }
    }

    check_default_rule(&mut result, graph.final_endings(), || "final endings".to_string());
    for ending in graph.final_endings() {
        let location = format!("final ending {}", ending.id);
        if let Ok(condition) = Condition::parse(&ending.condition) {
            for name in condition.variables() {
                if tags.contains(name.as_str()) && !gauges.contains(name.as_str()) {
                    result.push(
                        CheckLevel::Warning,
                        "references",
                        location.clone(),
                        format!("tag '{name}' is reset before final endings are chosen"),
                    );
                }
            }
        }
        check_condition(&mut result, ending, location, |name| {
            gauges.contains(name) || tags.contains(name)
        });
    }

    result
}

fn check_default_rule<R: ConditionalRule>(
    result: &mut CheckResult,
    rules: &[R],
    location: impl Fn() -> String,
) {
    if let Some(first) = rules.first()
        && !first.condition().trim().is_empty()
    {
        result.push(
            CheckLevel::Info,
            "quality",
            location(),
            format!(
                "first rule '{}' is also the fallback when nothing matches",
                first.condition().trim()
            ),
        );
    }

    if let Some(blank) = rules.iter().position(|r| r.condition().trim().is_empty())
        && blank + 1 < rules.len()
    {
        result.push(
            CheckLevel::Warning,
            "flow",
            location(),
            format!(
                "{} rule(s) after the blank rule at position {} can never match",
                rules.len() - blank - 1,
                blank + 1
            ),
        );
    }
}

fn check_condition<R: ConditionalRule>(
    result: &mut CheckResult,
    rule: &R,
    location: String,
    is_known: impl Fn(&str) -> bool,
) {
    match Condition::parse(rule.condition()) {
        Ok(condition) => {
            for name in condition.variables() {
                if !is_known(&name) {
                    result.push(
                        CheckLevel::Warning,
                        "references",
                        location.clone(),
                        format!("'{name}' is neither a gauge nor a tag of this story"),
                    );
                }
            }
        }
        Err(e) => result.push(
            CheckLevel::Error,
            "syntax",
            location,
            format!("condition '{}' does not parse: {e}", rule.condition()),
        ),
    }
}
