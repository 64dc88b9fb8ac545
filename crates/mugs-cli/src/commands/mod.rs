//! Builtin command implementations
//!
//! Builtins are registered ahead of every extension, so an extension that
//! declares the same name shadows them.

pub mod alias;
pub mod debug;
pub mod extensions;
pub mod help;
pub mod info;
pub mod list;
pub mod new;
pub mod reload;
pub mod scan;
pub mod store;

use mugs_scan::Scanner;
use std::sync::Arc;

use crate::command::{Command, CommandInfo};
use crate::lifecycle::ExtensionManager;
use crate::messages;
use crate::report::Reporter;
use crate::store::Store;
use crate::verified::VerifiedExtensions;

/// Services shared by the builtins.
#[derive(Clone)]
pub struct BuiltinContext {
    pub reporter: Arc<dyn Reporter>,
    pub manager: Arc<ExtensionManager>,
    pub scanner: Arc<Scanner>,
    pub verified: Arc<VerifiedExtensions>,
    pub store: Arc<Store>,
}

impl BuiltinContext {
    /// Context over `manager`, with the verified table and store catalog
    /// fetched from the given URLs.
    pub fn new(
        reporter: Arc<dyn Reporter>,
        manager: Arc<ExtensionManager>,
        verified_url: &str,
        store_url: &str,
    ) -> Self {
        Self {
            verified: Arc::new(VerifiedExtensions::new(
                verified_url,
                Arc::clone(&manager),
                Arc::clone(&reporter),
            )),
            store: Arc::new(Store::new(store_url, Arc::clone(&manager))),
            scanner: Arc::new(Scanner::default()),
            reporter,
            manager,
        }
    }
}

/// Creates every builtin command.
pub fn builtins(ctx: &BuiltinContext) -> Vec<Arc<dyn Command>> {
    vec![
        Arc::new(help::HelpCommand::new(ctx)),
        Arc::new(list::ListCommand::new(ctx)),
        Arc::new(reload::ReloadCommand::new(ctx)),
        Arc::new(extensions::EnableCommand::new(ctx)),
        Arc::new(extensions::DisableCommand::new(ctx)),
        Arc::new(extensions::ImportCommand::new(ctx)),
        Arc::new(store::StoreCommand::new(ctx)),
        Arc::new(scan::ScanCommand::new(ctx)),
        Arc::new(alias::AliasCommand::new(ctx)),
        Arc::new(new::NewCommand::new(ctx)),
        Arc::new(info::VersionCommand::new(ctx)),
        Arc::new(info::TimeCommand::new(ctx)),
        Arc::new(debug::DebugCommand::new(ctx)),
    ]
}

/// True for commands that did not come from an extension file.
pub fn is_builtin(command: &Arc<dyn Command>) -> bool {
    command.source().is_none()
}

/// Builtin info with a description taken from the message table.
pub(crate) fn builtin_info(name: &str, description_key: &str) -> CommandInfo {
    CommandInfo::new(name, messages::render(description_key, &[]))
}
