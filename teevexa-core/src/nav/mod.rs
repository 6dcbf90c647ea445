//! Shell navigation
//!
//! Static navigation of both shells and the role-based narrowing of the admin
//! sections. Everything here is pure.

use crate::roles::Role;
use serde::Serialize;

/// Single navigation entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavItem {
    pub label: &'static str,
    pub path: &'static str,
    /// Set when the item matches the current path
    pub active: bool,
}

impl NavItem {
    pub const fn new(label: &'static str, path: &'static str) -> Self {
        Self { label, path, active: false }
    }
}

/// Labelled group of admin items
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavSection {
    pub label: &'static str,
    pub items: Vec<NavItem>,
}

impl NavSection {
    fn new(label: &'static str, items: &[NavItem]) -> Self {
        Self { label, items: items.to_vec() }
    }
}

const OVERVIEW: &str = "Overview";
const PROJECTS: &str = "Projects";
const SYSTEM: &str = "System";

/// Admin shell sections, unfiltered
pub fn admin_sections() -> Vec<NavSection> {
    vec![
        NavSection::new(OVERVIEW, &[NavItem::new("Dashboard", "/admin")]),
        NavSection::new(
            "Business",
            &[
                NavItem::new("Leads", "/admin/leads"),
                NavItem::new("Consultations", "/admin/consultations"),
            ],
        ),
        NavSection::new(
            PROJECTS,
            &[
                NavItem::new("Projects", "/admin/projects"),
                NavItem::new("Milestones", "/admin/milestones"),
            ],
        ),
        NavSection::new(
            "People",
            &[NavItem::new("Users", "/admin/users"), NavItem::new("Invoices", "/admin/invoices")],
        ),
        NavSection::new(
            "Content",
            &[
                NavItem::new("Blog", "/admin/blog"),
                NavItem::new("Portfolio", "/admin/portfolio"),
                NavItem::new("Careers", "/admin/careers"),
                NavItem::new("Waitlist", "/admin/waitlist"),
            ],
        ),
        NavSection::new(
            SYSTEM,
            &[
                NavItem::new("Audit Logs", "/admin/audit-logs"),
                NavItem::new("Settings", "/admin/settings"),
            ],
        ),
    ]
}

/// Client portal items
pub fn portal_items() -> Vec<NavItem> {
    vec![
        NavItem::new("Dashboard", "/client-portal"),
        NavItem::new("My Projects", "/client-portal/projects"),
        NavItem::new("Files", "/client-portal/files"),
        NavItem::new("Messages", "/client-portal/messages"),
        NavItem::new("Invoices", "/client-portal/invoices"),
        NavItem::new("Settings", "/client-portal/settings"),
    ]
}

/// Which admin sections a role may see
fn section_visible(role: Role, label: &str) -> bool {
    match role {
        Role::Developer => label == OVERVIEW || label == PROJECTS,
        Role::ProjectManager => label != SYSTEM,
        Role::Admin | Role::SuperAdmin => true,
        Role::Client => false,
    }
}

/// Narrow admin sections to what a role may see
///
/// Order is preserved and the result is stable under repeated filtering.
/// Roles without staff access (and no role at all) see nothing.
pub fn filter_sections(sections: &[NavSection], role: Option<Role>) -> Vec<NavSection> {
    let Some(role) = role else {
        return Vec::new();
    };
    sections.iter().filter(|section| section_visible(role, section.label)).cloned().collect()
}

/// Mark the item whose path equals `current` as active
///
/// A trailing slash on `current` is ignored. Nothing is marked when no path
/// matches.
pub fn mark_active(items: &mut [NavItem], current: &str) {
    let current = normalize(current);
    for item in items {
        item.active = item.path == current;
    }
}

/// [`mark_active`] across sections
pub fn mark_active_sections(sections: &mut [NavSection], current: &str) {
    for section in sections {
        mark_active(&mut section.items, current);
    }
}

fn normalize(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    match path.strip_suffix('/') {
        Some(trimmed) if !trimmed.is_empty() => trimmed,
        _ => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(sections: &[NavSection]) -> Vec<&'static str> {
        sections.iter().map(|s| s.label).collect()
    }

    #[test]
    fn test_developer_sees_overview_and_projects() {
        let visible = filter_sections(&admin_sections(), Some(Role::Developer));
        assert_eq!(labels(&visible), vec!["Overview", "Projects"]);
    }

    #[test]
    fn test_project_manager_loses_system_only() {
        let visible = filter_sections(&admin_sections(), Some(Role::ProjectManager));
        assert_eq!(labels(&visible), vec!["Overview", "Business", "Projects", "People", "Content"]);
    }

    #[test]
    fn test_unrestricted_roles_see_full_list() {
        for role in [Role::Admin, Role::SuperAdmin] {
            assert_eq!(filter_sections(&admin_sections(), Some(role)), admin_sections());
        }
    }

    #[test]
    fn test_non_staff_see_nothing() {
        assert!(filter_sections(&admin_sections(), None).is_empty());
        assert!(filter_sections(&admin_sections(), Some(Role::Client)).is_empty());
    }

    #[test]
    fn test_filter_is_idempotent() {
        for role in Role::ALL.into_iter().map(Some).chain([None]) {
            let once = filter_sections(&admin_sections(), role);
            let twice = filter_sections(&once, role);
            assert_eq!(once, twice, "role {:?}", role);
            assert_eq!(once, filter_sections(&admin_sections(), role));
        }
    }

    #[test]
    fn test_mark_active_exact_match() {
        let mut items = portal_items();
        mark_active(&mut items, "/client-portal/files/");
        let active: Vec<_> = items.iter().filter(|i| i.active).map(|i| i.label).collect();
        assert_eq!(active, vec!["Files"]);

        // Dashboard is a prefix of every item but only matches exactly.
        mark_active(&mut items, "/client-portal/files/report.pdf");
        assert!(items.iter().all(|i| !i.active));

        mark_active(&mut items, "/client-portal?tab=recent");
        assert!(items[0].active);
    }

    #[test]
    fn test_mark_active_sections() {
        let mut sections = admin_sections();
        mark_active_sections(&mut sections, "/admin/milestones");
        let active: Vec<_> = sections
            .iter()
            .flat_map(|s| s.items.iter())
            .filter(|i| i.active)
            .map(|i| i.path)
            .collect();
        assert_eq!(active, vec!["/admin/milestones"]);
    }
}
