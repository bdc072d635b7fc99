use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use dsu_core::{DiffKind, Difference, InventoryReport, Severity, UpdateEntry, UpdateReport};

fn level_color(level: Severity) -> Color {
    match level {
        Severity::Low => Color::Blue,
        Severity::Medium => Color::Yellow,
        Severity::High => Color::Red,
        Severity::Critical => Color::DarkRed,
    }
}

fn leveled(text: impl Into<String>, level: Severity) -> Cell {
    let cell = Cell::new(text.into()).fg(level_color(level));
    if level == Severity::Critical {
        cell.add_attribute(Attribute::Bold)
    } else {
        cell
    }
}

fn header(columns: &[&str]) -> Vec<Cell> {
    columns
        .iter()
        .map(|c| Cell::new(*c).add_attribute(Attribute::Bold))
        .collect()
}

/// One line of the preview's Changes column.
pub fn describe(difference: &Difference) -> String {
    let current = &difference.dependency;
    let update = difference.dependency_update.as_ref();
    let update_name = update.map(|u| u.license.display_name()).unwrap_or("unknown");
    let update_coordinate = update.map(|u| u.coordinate()).unwrap_or_default();

    match difference.kind {
        DiffKind::ModuleFetchError => format!("- Error fetching - {}", current),
        DiffKind::LicenseNotFound => format!("- License not found - {}", current),
        DiffKind::LicenseAdded => {
            format!("- License {} would be added in update of {}", update_name, current)
        }
        DiffKind::MinorChange => format!(
            "- Minor changes in license {} from {} to {}",
            update_name, current, update_coordinate
        ),
        DiffKind::NameChanged => format!(
            "- License would change from {} in {} to {} in {}",
            current.license.display_name(),
            current,
            update_name,
            update_coordinate
        ),
        DiffKind::LessStrict => format!(
            "- License would change to less restrictive, from {} in {} to {} in {}",
            current.license.display_name(),
            current,
            update_name,
            update_coordinate
        ),
        DiffKind::MoreStrict => format!(
            "- License would change to more restrictive, from {} in {} to {} in {}",
            current.license.display_name(),
            current,
            update_name,
            update_coordinate
        ),
        DiffKind::LicenseRemoved => format!(
            "- License {} would be removed in {}",
            current.license.display_name(),
            update_coordinate
        ),
        DiffKind::NewDependency => match current.license.name.as_deref() {
            Some(name) => format!("- Would be added new module {} with license {}", current, name),
            None => format!("- Would be added new module {} with unknown license", current),
        },
        DiffKind::NewVulnerability => match &difference.vulnerability {
            Some(vulnerability) => format!(
                "- Update of module {} has vulnerability {}, more info {}",
                current, vulnerability.title, vulnerability.reference
            ),
            None => format!("- Update of module {} has a new vulnerability", current),
        },
    }
}

fn new_version(entry: &UpdateEntry) -> &str {
    entry
        .update_coordinate
        .rsplit_once('@')
        .map(|(_, version)| version)
        .unwrap_or_default()
}

pub fn preview_table(report: &UpdateReport) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header(&["Direct Module", "Version", "New Version", "Changes"]));

    for entry in &report.entries {
        let path = &entry.dependency.path;
        let version = &entry.dependency.version;

        if let Some(err) = &entry.error {
            table.add_row(vec![
                Cell::new(path).fg(Color::Red),
                Cell::new(version),
                Cell::new(new_version(entry)),
                Cell::new(format!("- Analysis failed: {}", err)).fg(Color::Red),
            ]);
            continue;
        }

        if entry.ledger.is_empty() {
            table.add_row(vec![
                Cell::new(path).fg(Color::Green),
                Cell::new(version),
                Cell::new(new_version(entry)),
                Cell::new(""),
            ]);
            continue;
        }

        for difference in &entry.ledger {
            table.add_row(vec![
                leveled(path.as_str(), entry.highest_level),
                Cell::new(version),
                Cell::new(new_version(entry)),
                leveled(describe(difference), difference.level),
            ]);
        }
    }
    table
}

pub fn print_preview(report: &UpdateReport) {
    if report.entries.is_empty() {
        println!("{}", "All direct dependencies are up to date.".green());
        return;
    }

    println!("{}", preview_table(report));

    let summary = &report.summary;
    println!();
    println!(
        "Analyzed {} updates in {}ms: {} findings",
        summary.dependencies_analyzed, report.elapsed, summary.findings
    );
    if summary.critical > 0 {
        println!("  {}", format!("Critical: {}", summary.critical).red().bold());
    }
    if summary.high > 0 {
        println!("  {}", format!("High: {}", summary.high).red());
    }
    if summary.medium > 0 {
        println!("  {}", format!("Medium: {}", summary.medium).yellow());
    }
    if summary.low > 0 {
        println!("  {}", format!("Low: {}", summary.low).blue());
    }
    if summary.fetch_errors > 0 {
        println!("  {}", format!("Modules that could not be fetched: {}", summary.fetch_errors).yellow());
    }
    for error in &report.errors {
        println!("  {} {}", "error:".red(), error);
    }
    if report.entries.iter().all(|e| e.ledger.is_empty() && e.error.is_none()) {
        println!("{}", "No license or vulnerability changes found.".green());
    }
}

pub fn inventory_table(report: &InventoryReport) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header(&["Direct Module", "Submodule", "Version", "License", "Vulnerabilities"]));

    for entry in &report.entries {
        let root = &entry.dependency;
        let root_cell = |text: &str| match entry.highest_severity {
            Some(level) => leveled(text, level),
            None => Cell::new(text),
        };

        let license = match &entry.error {
            Some(err) => format!("error: {}", err),
            None => root.license.display_name().to_string(),
        };
        table.add_row(vec![
            root_cell(&root.path),
            Cell::new(""),
            Cell::new(&root.version),
            Cell::new(license),
            Cell::new(vulnerability_list(root)),
        ]);

        for submodule in &root.dependencies {
            let sub_cell = match submodule.vulnerabilities.highest_severity() {
                Some(level) => leveled(submodule.path.as_str(), level),
                None => Cell::new(&submodule.path),
            };
            table.add_row(vec![
                root_cell(&root.path),
                sub_cell,
                Cell::new(&submodule.version),
                Cell::new(submodule.license.display_name()),
                Cell::new(vulnerability_list(submodule)),
            ]);
        }
    }
    table
}

fn vulnerability_list(dependency: &dsu_core::Dependency) -> String {
    dependency
        .vulnerabilities
        .iter()
        .map(|v| format!("{} ({}) {}", v.id, v.severity(), v.title))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn print_inventory(report: &InventoryReport) {
    if report.entries.is_empty() {
        println!("No direct dependencies found.");
        return;
    }

    println!("{}", inventory_table(report));
    println!();
    match report.highest_severity() {
        Some(Severity::Critical) => println!("{}", "Critical vulnerabilities found!".red().bold()),
        Some(level) => println!("Highest vulnerability severity: {}", level),
        None => println!("{}", "No known vulnerabilities.".green()),
    }
    for error in &report.errors {
        println!("  {} {}", "error:".red(), error);
    }
}
