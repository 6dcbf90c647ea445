pub mod gate_steps;
pub mod nav_steps;
pub mod portal_steps;
