//! `store` command: searches and installs extensions from the store catalog.

use async_trait::async_trait;
use std::sync::Arc;

use super::{builtin_info, BuiltinContext};
use crate::command::{Command, CommandInfo, ExecError, Flow, Invocation};
use crate::messages::render;
use crate::report::Reporter;
use crate::store::{Catalog, Store, StoreEntry};

pub struct StoreCommand {
    info: CommandInfo,
    reporter: Arc<dyn Reporter>,
    store: Arc<Store>,
}

impl StoreCommand {
    pub fn new(ctx: &BuiltinContext) -> Self {
        Self {
            info: builtin_info("store", "store_description")
                .with_aliases(&["market", "repo"])
                .with_usage(render("store_usage", &[])),
            reporter: Arc::clone(&ctx.reporter),
            store: Arc::clone(&ctx.store),
        }
    }

    async fn catalog(&self) -> Option<Catalog> {
        match self.store.catalog().await {
            Ok(catalog) => Some(catalog),
            Err(e) => {
                self.reporter.error("store_error", &[&e]);
                None
            }
        }
    }

    fn search(&self, catalog: &Catalog, query: &str) {
        let results = catalog.search(query);
        if results.is_empty() {
            self.reporter.response("store_no_results", &[]);
            return;
        }
        let mut lines = vec![render("store_search_results", &[])];
        for entry in results {
            lines.push(format!("- {} (v{})", entry.name, entry.version));
            lines.push(format!("  {}", entry.description));
            lines.push(format!("  store install {}", entry.name));
        }
        self.reporter.response(&lines.join("\n"), &[]);
    }

    fn list(&self, catalog: &Catalog) {
        if catalog.entries().is_empty() {
            self.reporter.response("store_empty", &[]);
            return;
        }
        let mut lines = vec![render("store_available", &[])];
        lines.extend(catalog.entries().iter().map(|e| {
            format!("- {} (v{}) - {}", e.name, e.version, e.description)
        }));
        self.reporter.response(&lines.join("\n"), &[]);
    }

    async fn install(&self, entry: &StoreEntry) -> Flow {
        self.reporter.response("store_installing", &[&entry.name]);
        match self.store.install(entry).await {
            Ok(path) => {
                let file = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                self.reporter.response("store_installed", &[&entry.name]);
                self.reporter.response("scan_hint", &[&file]);
                Flow::Reload
            }
            Err(e) => {
                self.reporter.error("download_error", &[&e]);
                Flow::Continue
            }
        }
    }
}

#[async_trait]
impl Command for StoreCommand {
    fn info(&self) -> &CommandInfo {
        &self.info
    }

    async fn execute(&self, invocation: Invocation<'_>) -> Result<Flow, ExecError> {
        let args: Vec<&str> = invocation.args.iter().map(String::as_str).collect();
        let Some(sub) = args.first().map(|s| s.to_lowercase()) else {
            self.reporter.response("store_subcommands", &[]);
            return Ok(Flow::Continue);
        };

        match (sub.as_str(), &args[1..]) {
            ("search", rest) => {
                if let Some(catalog) = self.catalog().await {
                    self.search(&catalog, &rest.join(" "));
                }
            }
            ("list", _) => {
                if let Some(catalog) = self.catalog().await {
                    self.list(&catalog);
                }
            }
            ("install", []) => self.reporter.error("store_missing_name", &[]),
            ("install", [name, ..]) => {
                let Some(catalog) = self.catalog().await else {
                    return Ok(Flow::Continue);
                };
                match catalog.find(name) {
                    Some(entry) => return Ok(self.install(entry).await),
                    None => self.reporter.error("store_not_found", &[name]),
                }
            }
            (other, _) => self.reporter.error("store_unknown_subcommand", &[&other]),
        }
        Ok(Flow::Continue)
    }
}
