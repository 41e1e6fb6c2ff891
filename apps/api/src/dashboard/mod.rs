//! Summary figures for the back-office home and the client portal.

pub mod handlers;

use std::collections::BTreeMap;

use crate::models::project::{ProjectRow, ProjectStatus};

/// Per-status counts with every known status present, zero when absent.
/// Rows with an unknown status are left out.
pub fn status_counts(rows: &[(String, i64)]) -> BTreeMap<&'static str, i64> {
    let mut counts: BTreeMap<&'static str, i64> =
        ProjectStatus::ALL.iter().map(|s| (s.as_str(), 0)).collect();
    for (status, count) in rows {
        if let Some(status) = ProjectStatus::parse(status) {
            *counts.entry(status.as_str()).or_insert(0) += count;
        }
    }
    counts
}

pub fn active_projects(projects: Vec<ProjectRow>) -> Vec<ProjectRow> {
    projects
        .into_iter()
        .filter(|p| ProjectStatus::parse(&p.status).is_some_and(|s| s.is_active()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn project(status: &str) -> ProjectRow {
        let now = Utc::now();
        ProjectRow {
            id: Uuid::new_v4(),
            name: "Loft".to_string(),
            client_id: None,
            client_name: "Ana".to_string(),
            status: status.to_string(),
            progress: 0,
            description: String::new(),
            started_on: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_status_counts_fill_missing_with_zero() {
        let counts = status_counts(&[("DESIGN".to_string(), 3), ("bogus".to_string(), 9)]);
        assert_eq!(counts.len(), ProjectStatus::ALL.len());
        assert_eq!(counts["DESIGN"], 3);
        assert_eq!(counts["LEAD"], 0);
    }

    #[test]
    fn test_active_projects_drop_finished_work() {
        let active = active_projects(vec![
            project("LEAD"),
            project("COMPLETED"),
            project("CANCELLED"),
            project("CONSTRUCTION"),
        ]);
        let statuses: Vec<&str> = active.iter().map(|p| p.status.as_str()).collect();
        assert_eq!(statuses, vec!["LEAD", "CONSTRUCTION"]);
    }
}
