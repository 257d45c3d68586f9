//! Output rendering and formatting

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use relval_ops::{
    DispatchReport, OperationResult, PackageListing, QueueOutcome, QueueReport, ReconcileReport,
    ValidationListing,
};
use relval_types::{format_duration, PackageRecord, Timestamp, Validation, ValidationStatus};
use std::io;

/// Output renderer for CLI results
#[derive(Clone)]
pub struct OutputRenderer {
    /// Use JSON output format
    json_output: bool,
    /// Print full descriptions instead of tables
    extended: bool,
}

impl OutputRenderer {
    /// Create new output renderer
    pub fn new(json_output: bool, extended: bool) -> Self {
        Self {
            json_output,
            extended,
        }
    }

    /// Render operation result
    pub fn render_result(&self, result: &OperationResult) -> io::Result<()> {
        if self.json_output {
            self.render_json(result)
        } else {
            self.render_text(result)
        }
    }

    /// Render as JSON
    #[allow(clippy::unused_self)]
    fn render_json(&self, result: &OperationResult) -> io::Result<()> {
        let json = result.to_json().map_err(io::Error::other)?;
        println!("{json}");
        Ok(())
    }

    /// Render as formatted text
    fn render_text(&self, result: &OperationResult) -> io::Result<()> {
        match result {
            OperationResult::PackageList(listing) => self.render_package_list(listing),
            OperationResult::ValidationList(listing) => self.render_validation_list(listing),
            OperationResult::QueueReport(report) => render_queue_report(report),
            OperationResult::DispatchReport(report) => render_dispatch_report(report),
            OperationResult::ReconcileReport(report) => render_reconcile_report(report),
            OperationResult::Success(message) => {
                println!("{message}");
                Ok(())
            }
        }
    }

    /// Render package list
    fn render_package_list(&self, listing: &PackageListing) -> io::Result<()> {
        if listing.packages.is_empty() {
            println!("No packages found.");
            return Ok(());
        }

        if self.extended {
            for package in &listing.packages {
                println!("{}", package.describe(&listing.baseurl));
            }
        } else {
            println!("{}", package_table(&listing.packages));
        }

        if listing.skipped_lines > 0 {
            println!(
                "{} catalog line(s) could not be parsed and were skipped.",
                listing.skipped_lines
            );
        }
        Ok(())
    }

    /// Render validation list
    fn render_validation_list(&self, listing: &ValidationListing) -> io::Result<()> {
        if listing.validations.is_empty() {
            println!("No validations found.");
            return Ok(());
        }

        if self.extended {
            for validation in &listing.validations {
                println!("{}", validation.describe(&listing.baseurl));
            }
        } else {
            println!("{}", validation_table(&listing.validations, Timestamp::now()));
        }
        Ok(())
    }
}

fn header(names: &[&str]) -> Vec<Cell> {
    names
        .iter()
        .map(|name| Cell::new(name).add_attribute(Attribute::Bold))
        .collect()
}

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Table of package records
pub fn package_table(packages: &[PackageRecord]) -> Table {
    let mut table = new_table();
    table.set_header(header(&["Package", "Platform", "Arch", "Deps"]));

    for package in packages {
        table.add_row(vec![
            Cell::new(package.package_name()),
            Cell::new(package.platform.as_deref().unwrap_or("-")),
            Cell::new(package.arch.as_deref().unwrap_or("-")),
            Cell::new(if package.deps.is_empty() {
                "-".to_string()
            } else {
                package.deps.join(", ")
            }),
        ]);
    }
    table
}

/// Table of validations; running validations show time elapsed until `now`
pub fn validation_table(validations: &[Validation], now: Timestamp) -> Table {
    let mut table = new_table();
    table.set_header(header(&[
        "Software", "Version", "Platform", "Arch", "Status", "Started", "Ended", "Duration",
    ]));

    for validation in validations {
        let package = &validation.package;
        let fmt_opt =
            |ts: Option<Timestamp>| ts.map_or_else(|| "-".to_string(), |t| t.format_no_usec());
        let duration = match (validation.started, validation.ended) {
            (Some(started), Some(ended)) => format_duration(ended.since(&started)),
            (Some(started), None) if validation.status == ValidationStatus::Running => {
                format_duration(now.since(&started))
            }
            _ => "-".to_string(),
        };

        table.add_row(vec![
            Cell::new(&package.software),
            Cell::new(&package.version),
            Cell::new(package.platform.as_deref().unwrap_or("-")),
            Cell::new(package.arch.as_deref().unwrap_or("-")),
            status_cell(validation.status),
            Cell::new(fmt_opt(validation.started)),
            Cell::new(fmt_opt(validation.ended)),
            Cell::new(duration),
        ]);
    }
    table
}

fn status_cell(status: ValidationStatus) -> Cell {
    let color = match status {
        ValidationStatus::Queued => Color::Blue,
        ValidationStatus::Running => Color::Yellow,
        ValidationStatus::DoneOk => Color::Green,
        ValidationStatus::DoneFail | ValidationStatus::Disappeared => Color::Red,
    };
    Cell::new(status.name()).fg(color)
}

fn render_queue_report(report: &QueueReport) -> io::Result<()> {
    let name = report.package.package_name();
    match report.outcome {
        QueueOutcome::Enqueued(id) => println!("Queued validation {id} for {name}"),
        QueueOutcome::AlreadyQueued => {
            println!("A validation of {name} is already queued or running");
        }
        QueueOutcome::Skipped => println!("Dry run: {name} would be queued"),
    }
    Ok(())
}

fn render_dispatch_report(report: &DispatchReport) -> io::Result<()> {
    let Some(validation) = &report.validation else {
        println!("No queued validations.");
        return Ok(());
    };

    let prefix = if report.dry_run { "Dry run: would start" } else { "Started" };
    println!(
        "{prefix} validation {} ({})",
        validation.id,
        validation.session_tag()
    );
    if let Some(destdir) = &report.destdir {
        let state = if report.unpacked { "unpacked" } else { "reused" };
        println!("  Package dir : {destdir} ({state})");
    }
    if let Some(module_file) = &report.module_file {
        println!("  Module file : {module_file}");
    }
    if let Some(command) = &report.run_command {
        println!("  Command     : {command}");
    }
    if report.dry_run {
        if let Some(content) = &report.module_content {
            println!();
            println!("{content}");
        }
    }
    Ok(())
}

fn render_reconcile_report(report: &ReconcileReport) -> io::Result<()> {
    if report.checked == 0 {
        println!("No running validations.");
        return Ok(());
    }

    println!(
        "Checked {} running validation(s): {} still running, {} finished, {} unknown",
        report.checked,
        report.unchanged,
        report.transitions.len(),
        report.skipped.len()
    );

    if !report.transitions.is_empty() {
        let mut table = new_table();
        table.set_header(header(&["Session", "Status", "Results", "Notified"]));
        for transition in &report.transitions {
            table.add_row(vec![
                Cell::new(&transition.session_tag),
                status_cell(transition.status),
                Cell::new(&transition.results_url),
                Cell::new(if transition.notified { "yes" } else { "no" }),
            ]);
        }
        println!("{table}");
    }

    for skipped in &report.skipped {
        let code = skipped
            .exit_code
            .map_or_else(|| "signal".to_string(), |c| c.to_string());
        println!(
            "  {} left unchanged: unmapped status code {code}",
            skipped.session_tag
        );
    }
    Ok(())
}
