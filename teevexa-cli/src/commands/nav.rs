use anyhow::{Context, Result};
use teevexa_core::nav::{admin_sections, filter_sections, NavSection};
use teevexa_core::Role;

fn parse_role(name: &str) -> Result<Option<Role>> {
    match name.trim() {
        "" | "none" => Ok(None),
        other => other.parse().map(Some).with_context(|| {
            let known: Vec<&str> = Role::ALL.iter().map(|r| r.as_str()).collect();
            format!("expected one of {} or \"none\"", known.join(", "))
        }),
    }
}

fn outline(sections: &[NavSection]) -> String {
    let mut out = String::new();
    for section in sections {
        out.push_str(section.label);
        out.push('\n');
        for item in &section.items {
            out.push_str(&format!("  {:<14} {}\n", item.label, item.path));
        }
    }
    out
}

/// Print the admin sections visible to `role`.
pub fn run(role: &str, json: bool) -> Result<()> {
    let sections = filter_sections(&admin_sections(), parse_role(role)?);

    if json {
        println!("{}", serde_json::to_string_pretty(&sections)?);
    } else if sections.is_empty() {
        println!("(no admin navigation)");
    } else {
        print!("{}", outline(&sections));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_names() {
        assert_eq!(parse_role("none").unwrap(), None);
        assert_eq!(parse_role("developer").unwrap(), Some(Role::Developer));
        assert!(parse_role("intern").is_err());
    }

    #[test]
    fn developer_outline() {
        let sections = filter_sections(&admin_sections(), Some(Role::Developer));
        let text = outline(&sections);
        assert!(text.starts_with("Overview\n"));
        assert!(text.contains("Projects\n"));
        assert!(!text.contains("System"));
    }
}
