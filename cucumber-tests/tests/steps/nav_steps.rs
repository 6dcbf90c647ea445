use crate::world::GateWorld;
use cucumber::{then, when};
use teevexa_core::nav::{admin_sections, filter_sections};

#[when(expr = "the admin navigation is filtered for {string}")]
async fn when_filtered(world: &mut GateWorld, role_name: String) {
    let role = match role_name.as_str() {
        "nobody" => None,
        name => Some(name.parse().unwrap_or_else(|e| panic!("bad role in feature file: {}", e))),
    };
    world.sections = filter_sections(&admin_sections(), role);
}

#[then(expr = "the visible sections are {string}")]
async fn then_visible_sections(world: &mut GateWorld, expected: String) {
    let labels: Vec<&str> = world.sections.iter().map(|s| s.label).collect();
    let expected: Vec<&str> = match expected.as_str() {
        "" => Vec::new(),
        list => list.split(',').map(str::trim).collect(),
    };
    assert_eq!(labels, expected);
}
