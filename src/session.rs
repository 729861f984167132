//! Operator-driven loop: pick a category, pick assets, pick an action,
//! confirm, report, repeat.

use std::io::{BufRead, Write};

use tracing::{debug, warn};

use crate::catalog::{Catalog, Listing, Scope};
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::executor::{Action, ActionExecutor, ItemOutcome, Plan, Report};
use crate::format::format_bytes;
use crate::notifier::{self, DaemonControl, RestartOutcome};
use crate::progress::ProgressReporter;
use crate::selection;
use crate::storage::{PresenceMap, StorageRoot};

const STATUS_WIDTH: usize = "downloaded".len();

pub struct Session<'a, R: BufRead, W: Write> {
    input: R,
    output: W,
    catalog: &'a Catalog,
    root: &'a StorageRoot,
    presence: PresenceMap,
    executor: ActionExecutor<'a>,
    daemon: &'a dyn DaemonControl,
    config: &'a AppConfig,
    reporter: &'a dyn ProgressReporter,
}

impl<'a, R: BufRead, W: Write> Session<'a, R, W> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        input: R,
        output: W,
        catalog: &'a Catalog,
        root: &'a StorageRoot,
        executor: ActionExecutor<'a>,
        daemon: &'a dyn DaemonControl,
        config: &'a AppConfig,
        reporter: &'a dyn ProgressReporter,
    ) -> Self {
        let presence = PresenceMap::probe(catalog, root);
        Self {
            input,
            output,
            catalog,
            root,
            presence,
            executor,
            daemon,
            config,
            reporter,
        }
    }

    pub fn presence(&self) -> &PresenceMap {
        &self.presence
    }

    /// Run until the operator leaves the category prompt empty.
    pub fn run(&mut self) -> Result<()> {
        while let Some(scope) = self.choose_scope()? {
            self.handle_scope(scope)?;
        }
        writeln!(self.output, "\nDone.")?;
        Ok(())
    }

    fn prompt(&mut self, text: &str) -> Result<Option<String>> {
        write!(self.output, "{text}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn confirm(&mut self, text: &str) -> Result<bool> {
        Ok(self
            .prompt(text)?
            .map(|answer| answer.eq_ignore_ascii_case("y"))
            .unwrap_or(false))
    }

    fn choose_scope(&mut self) -> Result<Option<Scope>> {
        loop {
            render_categories(&mut self.output, self.catalog)?;
            let answer = match self.prompt("\nCategory number? ")? {
                Some(answer) if !answer.is_empty() => answer,
                _ => {
                    writeln!(self.output, "\nNo category selected.")?;
                    return Ok(None);
                }
            };
            match parse_category(&answer, self.catalog.categories().len()) {
                Some(scope) => return Ok(Some(scope)),
                None => writeln!(self.output, "\nInvalid category '{answer}'.")?,
            }
        }
    }

    fn handle_scope(&mut self, scope: Scope) -> Result<()> {
        let listing = self.catalog.list_assets(scope);
        if listing.is_empty() {
            writeln!(self.output, "\nNo assets available for the selected category.")?;
            return Ok(());
        }
        self.presence
            .refresh(self.catalog, self.root, &listing.asset_refs());
        writeln!(self.output)?;
        render_listing(&mut self.output, self.catalog, &listing, &self.presence)?;

        let selection = loop {
            let answer = match self
                .prompt("\nAsset numbers? (ranges/comma-separated, e.g. 1-4,8 or all) ")?
            {
                Some(answer) if !answer.is_empty() => answer,
                _ => {
                    writeln!(self.output, "\nNo assets selected.")?;
                    return Ok(());
                }
            };
            match selection::parse(&answer, listing.max_index()) {
                Ok(indices) => break listing.resolve(&indices),
                Err(e) => writeln!(self.output, "Invalid selection: {e}. Try again.")?,
            }
        };

        let action = match self.prompt("\n(d)ownload or (x) delete? (d/x) ")? {
            Some(answer) => Action::from_key(&answer),
            None => None,
        };
        let Some(action) = action else {
            writeln!(self.output, "\nNo action selected.")?;
            return Ok(());
        };

        let plan = match self
            .executor
            .plan(action, &selection, self.catalog, &mut self.presence)
        {
            Ok(plan) => plan,
            Err(Error::InsufficientSpace {
                required,
                available,
            }) => {
                writeln!(
                    self.output,
                    "\nNot enough disk space: {} needed, {} available. Shrink the selection or free up space.",
                    format_bytes(required),
                    format_bytes(available)
                )?;
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        if plan.is_empty() {
            writeln!(
                self.output,
                "\nNothing to {} ({} already satisfied).",
                action.verb(),
                plan.skipped.len()
            )?;
            return Ok(());
        }

        self.describe_plan(&plan)?;
        let question = format!("{} files? (y/n) ", capitalize(action.verb()));
        if !self.confirm(&question)? {
            debug!("Operator declined {}", action);
            return Ok(());
        }

        writeln!(self.output)?;
        let report = self
            .executor
            .execute(&plan, self.catalog, &mut self.presence, self.reporter);
        self.render_report(&report)?;
        self.offer_restart()?;
        Ok(())
    }

    fn describe_plan(&mut self, plan: &Plan) -> Result<()> {
        writeln!(self.output)?;
        if let Some(available) = plan.available {
            writeln!(self.output, "Available space: {}", format_bytes(available))?;
        }
        if !plan.skipped.is_empty() {
            writeln!(
                self.output,
                "Skipping {} already {}.",
                plan.skipped.len(),
                match plan.action {
                    Action::Download => "downloaded",
                    Action::Delete => "absent",
                }
            )?;
        }
        writeln!(
            self.output,
            "Files to {} ({}): {}",
            plan.action.verb(),
            plan.targets.len(),
            format_bytes(plan.total_bytes)
        )?;
        Ok(())
    }

    fn render_report(&mut self, report: &Report) -> Result<()> {
        let past = match report.action {
            Action::Download => "Downloaded",
            Action::Delete => "Deleted",
        };
        for asset in &report.succeeded {
            writeln!(self.output, "  {} '{}'", past, self.catalog.asset(*asset).label)?;
        }
        for (asset, reason) in &report.failed {
            writeln!(
                self.output,
                "  Failed '{}': {}",
                self.catalog.asset(*asset).label,
                reason
            )?;
        }
        writeln!(
            self.output,
            "\n{} {} files ({}), {} skipped, {} failed.",
            past,
            report.succeeded.len(),
            format_bytes(report.total_bytes_processed),
            report.skipped.len(),
            report.failed.len()
        )?;
        Ok(())
    }

    fn offer_restart(&mut self) -> Result<()> {
        let mode = self.root.mode();
        if !notifier::restart_offered(mode) {
            return Ok(());
        }
        let name = self.config.daemon_name.clone();
        let consent = self.confirm(&format!(
            "\nKill {name} to update download status in Settings? (y/n) "
        ))?;
        match notifier::maybe_restart_daemon(mode, consent, self.daemon, &name) {
            Ok(RestartOutcome::Restarted) => writeln!(self.output, "Killed {name}.")?,
            Ok(_) => {}
            Err(e) => {
                warn!("Daemon restart failed: {}", e);
                writeln!(self.output, "Could not restart {name}: {e}")?;
            }
        }
        Ok(())
    }
}

/// `n` picks a category, `count + 1` or `all` picks everything.
pub fn parse_category(answer: &str, count: usize) -> Option<Scope> {
    let answer = answer.trim();
    if answer.eq_ignore_ascii_case("all") {
        return Some(Scope::All);
    }
    match answer.parse::<usize>().ok()? {
        0 => None,
        n if n <= count => Some(Scope::Category(n - 1)),
        n if n == count + 1 => Some(Scope::All),
        _ => None,
    }
}

pub fn render_categories(out: &mut impl Write, catalog: &Catalog) -> Result<()> {
    let categories = catalog.list_categories();
    let number_width = (categories.len() + 1).to_string().len();
    let name_width = categories
        .iter()
        .map(|(c, _)| c.name.chars().count())
        .chain(std::iter::once("All".len()))
        .max()
        .unwrap_or(3);

    for (i, (category, count)) in categories.iter().enumerate() {
        writeln!(
            out,
            "{:>nw$}. {:<w$}  ({})",
            i + 1,
            category.name,
            count,
            nw = number_width,
            w = name_width
        )?;
    }
    writeln!(
        out,
        "{:>nw$}. {:<w$}  ({})",
        categories.len() + 1,
        "All",
        catalog.len(),
        nw = number_width,
        w = name_width
    )?;
    Ok(())
}

pub fn render_listing(
    out: &mut impl Write,
    catalog: &Catalog,
    listing: &Listing,
    presence: &PresenceMap,
) -> Result<()> {
    let rows = listing.rows();
    let index_width = listing.max_index().to_string().len();
    let label_width = rows
        .iter()
        .map(|row| catalog.asset(row.asset).label.chars().count())
        .max()
        .unwrap_or(0);
    let sizes: Vec<String> = rows
        .iter()
        .map(|row| format_bytes(catalog.asset(row.asset).size))
        .collect();
    let size_width = sizes.iter().map(String::len).max().unwrap_or(0);

    let mut sizes = sizes.into_iter();
    for (n, (heading, group)) in listing.groups(catalog).into_iter().enumerate() {
        if n > 0 {
            writeln!(out)?;
        }
        writeln!(out, "{heading}")?;
        for row in group {
            let asset = catalog.asset(row.asset);
            let size = sizes.next().unwrap_or_default();
            writeln!(
                out,
                "{:>iw$}. {:<lw$}  {:<sw$}  {:>zw$}",
                row.index,
                asset.label,
                presence.get(row.asset).label(),
                size,
                iw = index_width,
                lw = label_width,
                sw = STATUS_WIDTH,
                zw = size_width
            )?;
        }
    }
    Ok(())
}

/// Label for an item outcome in progress output.
pub fn outcome_label(outcome: &ItemOutcome) -> &'static str {
    match outcome {
        ItemOutcome::Succeeded { .. } => "done",
        ItemOutcome::Skipped => "skipped",
        ItemOutcome::Failed(_) => "failed",
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Asset, Category};

    #[test]
    fn test_parse_category() {
        assert_eq!(parse_category("1", 2), Some(Scope::Category(0)));
        assert_eq!(parse_category("2", 2), Some(Scope::Category(1)));
        assert_eq!(parse_category("3", 2), Some(Scope::All));
        assert_eq!(parse_category("ALL", 2), Some(Scope::All));
        assert_eq!(parse_category("0", 2), None);
        assert_eq!(parse_category("4", 2), None);
        assert_eq!(parse_category("earth", 2), None);
    }

    #[test]
    fn test_render_categories_alignment() {
        let catalog = Catalog::new(
            vec![Category::new("e", "Earth"), Category::new("w", "Water")],
            vec![Asset {
                id: "a".to_string(),
                label: "A".to_string(),
                url: "https://cdn/a.mov".to_string(),
                file_name: "a.mov".to_string(),
                size: 1,
                category: 0,
            }],
        )
        .unwrap();
        let mut out = Vec::new();
        render_categories(&mut out, &catalog).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "1. Earth  (1)\n2. Water  (0)\n3. All    (1)\n");
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("download"), "Download");
        assert_eq!(capitalize(""), "");
    }
}
