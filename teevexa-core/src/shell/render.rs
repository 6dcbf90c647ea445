//! HTML skeletons for the shells

use super::{Navigation, ShellView};
use crate::nav::NavItem;
use std::fmt::Write;

/// Escape text for inclusion in HTML content or a quoted attribute
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Page shown while a gate is still resolving
pub fn loading_html(brand: &str) -> String {
    page(brand, "<main class=\"loading\" aria-busy=\"true\">Loading…</main>")
}

pub(super) fn shell_html(view: &ShellView) -> String {
    let mut body = String::new();

    let _ = write!(
        body,
        "<header><span class=\"brand\">{}</span>",
        escape_html(view.brand)
    );
    if let Some(email) = &view.email {
        let _ = write!(body, "<span class=\"user\">{}</span>", escape_html(email));
    }
    let _ = write!(
        body,
        "<form method=\"post\" action=\"{}\"><button type=\"submit\">Sign out</button></form></header>",
        escape_html(&view.sign_out_action)
    );

    body.push_str("<nav>");
    match &view.navigation {
        Navigation::Flat(items) => push_items(&mut body, items),
        Navigation::Sectioned(sections) => {
            for section in sections {
                let _ = write!(body, "<section><h2>{}</h2>", escape_html(section.label));
                push_items(&mut body, &section.items);
                body.push_str("</section>");
            }
        }
    }
    body.push_str("</nav>");

    let _ = write!(body, "<main data-outlet=\"{}\"></main>", escape_html(&view.outlet));

    page(view.brand, &body)
}

fn push_items(out: &mut String, items: &[NavItem]) {
    out.push_str("<ul>");
    for item in items {
        let current = if item.active { " aria-current=\"page\" class=\"active\"" } else { "" };
        let _ = write!(
            out,
            "<li><a href=\"{}\"{}>{}</a></li>",
            escape_html(item.path),
            current,
            escape_html(item.label)
        );
    }
    out.push_str("</ul>");
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>{}</title></head>\n<body>{}</body>\n</html>\n",
        escape_html(title),
        body
    )
}
