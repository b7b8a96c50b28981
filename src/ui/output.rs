use crate::ui::{theme, Icons};
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    println!("{} {}", Icons::ROCKET, text.style(theme().header.clone()));
}

pub fn status(icon: &str, label: &str, value: &str) {
    println!("{} {}: {}", icon, label.style(theme().dim.clone()), value);
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(theme().error.clone()));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().warn.clone()));
}

pub fn section(title: &str) {
    println!();
    println!("━ {} ━", title.style(theme().header.clone()));
}

/// Heading line of a looked-up entity
pub fn entity_line(kind: &str, display_name: &str) {
    println!(
        "{} {} {}",
        Icons::SEARCH,
        format!("[{}]", kind).style(theme().kind.clone()),
        display_name
    );
}

/// Indented `role target` line under an entity
pub fn binding_row(role: &str, target: &str) {
    println!(
        "    {:<14} {}",
        role.style(theme().dim.clone()),
        target.style(theme().target.clone())
    );
}

/// A name no entity could bind
pub fn unresolved_row(name: &str) {
    println!("  {} {}", Icons::WARN, name.style(theme().warn.clone()));
}
