//! Static checking of a story file from the terminal

use crate::check::{CheckIssue, CheckLevel, CheckResult, check_story};
use crate::infrastructure::repositories::build_story;
use std::path::Path;

/// Build and check a story file, printing every issue
pub async fn run_check(story_path: &Path) -> anyhow::Result<CheckResult> {
    let json = tokio::fs::read_to_string(story_path).await?;
    let graph = build_story(&json)?;
    let result = check_story(&graph);

    for issue in &result.issues {
        println!("{}", format_issue(issue));
    }
    println!(
        "{}: {} error(s), {} warning(s), {} info",
        graph.id(),
        result.error_count,
        result.warning_count,
        result.info_count
    );

    Ok(result)
}

pub fn format_issue(issue: &CheckIssue) -> String {
    let level = match issue.level {
        CheckLevel::Error => "error",
        CheckLevel::Warning => "warning",
        CheckLevel::Info => "info",
    };
    format!(
        "{level}[{}] {}: {}",
        issue.category, issue.location, issue.message
    )
}
