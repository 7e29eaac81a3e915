//! Plain listing of scripts for `--list`.

use std::io::Write;

use crossterm::style::Stylize;
use itertools::Itertools;
use nrs_core::catalog::{Catalog, ScriptEntry};
use nrs_core::runner::RunnerKind;

const LIFECYCLE_TAG: &str = "[lifecycle]";

fn detail(entry: &ScriptEntry) -> String {
    let mut parts = Vec::new();
    if let Some(description) = &entry.description {
        parts.push(description.clone());
    }
    if entry.is_lifecycle {
        parts.push(LIFECYCLE_TAG.to_string());
    }
    parts.join(" ")
}

/// Writes every entry, aligned in columns. `styled` adds terminal colors.
pub fn print_catalog(
    out: &mut impl Write,
    catalog: &Catalog,
    runner: RunnerKind,
    styled: bool,
) -> std::io::Result<()> {
    let name_width = catalog
        .entries()
        .iter()
        .map(|e| e.name.chars().count())
        .max()
        .unwrap_or(0);
    let command_width = catalog
        .entries()
        .iter()
        .map(|e| e.command.chars().count())
        .max()
        .unwrap_or(0);

    let heading = format!("{} scripts ({runner}):", catalog.len());
    if styled {
        writeln!(out, "{}", heading.bold())?;
    } else {
        writeln!(out, "{heading}")?;
    }

    for entry in catalog.entries().iter().sorted_by_key(|e| e.is_lifecycle) {
        let name = format!("{:<name_width$}", entry.name);
        let command = format!("{:<command_width$}", entry.command);
        let detail = detail(entry);

        let line = if styled {
            let name = if entry.is_lifecycle {
                name.dark_grey()
            } else {
                name.green().bold()
            };
            format!("  {name}  {}  {}", command.cyan(), detail.dark_grey())
        } else {
            format!("  {name}  {command}  {detail}")
        };
        writeln!(out, "{}", line.trim_end())?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_print_catalog_plain() {
        let mut dev = ScriptEntry::new("dev", "vite");
        dev.description = Some("Start dev server".to_string());
        let catalog = Catalog::from_entries(vec![
            ScriptEntry::new("postinstall", "husky"),
            dev,
            ScriptEntry::new("build", "vite build"),
        ])
        .unwrap();

        let mut out = Vec::new();
        print_catalog(&mut out, &catalog, RunnerKind::Pnpm, false).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(
            text,
            "3 scripts (pnpm):\n\
             \x20 dev          vite        Start dev server\n\
             \x20 build        vite build\n\
             \x20 postinstall  husky       [lifecycle]\n"
        );
    }
}
