//! English message catalog.
//!
//! Every user-visible line goes through [`render`]: a key is looked up in
//! [`MESSAGES`] and its `{0}`, `{1}`, ... placeholders are filled from the
//! arguments. Keys that are not in the table render verbatim, which lets
//! extension code pass free text through the same interface.

use std::fmt::Display;

/// Message key to template.
pub const MESSAGES: &[(&str, &str)] = &[
    ("app_title", "Mugs"),
    (
        "welcome_message",
        "Console application with dynamic command loading\nType 'help' for command list or 'exit' to quit",
    ),
    ("command_not_found", "Command '{0}' not found. Type 'help' for command list"),
    ("command_suggestion", "Did you mean '{0}'?"),
    ("command_error", "Command execution error: {0}"),
    ("compile_error", "Failed to load {0}: {1}"),
    ("cache_save_error", "Error saving metadata cache: {0}"),
    ("cache_cleared", "Metadata cache cleared"),
    ("table_discarded", "Ignoring unreadable {0}: {1}"),
    // help
    ("help_description", "Shows command help"),
    ("help_usage", "help\nhelp <command>"),
    ("builtin_commands", "Built-in commands:"),
    ("external_commands", "Third-party commands (use with caution):"),
    ("command_help", "For detailed help type: help <command>"),
    ("command", "Command"),
    ("description", "Description"),
    ("aliases", "Aliases"),
    ("author", "Author"),
    ("version", "Version"),
    ("source", "Source"),
    ("usage_examples", "Usage examples"),
    // list
    ("list_description", "Lists all available commands and their status"),
    ("available_commands", "Available commands:"),
    ("disabled_extensions", "Disabled extensions:"),
    ("enable_usage", "To enable use: enable <command_name>"),
    // reload
    ("reload_description", "Reloads all commands from files"),
    ("reloading_commands", "Reloading commands..."),
    ("commands_reloaded", "Commands successfully reloaded ({0} loaded, {1} failed)"),
    ("reload_usage", "To use execute: reload"),
    // enable / disable
    ("enable_description", "Enables a disabled extension"),
    ("disable_description", "Disables an extension"),
    (
        "missing_extension_name",
        "Specify command name or extension file (e.g.: enable mycommand or enable mycommand.star.disable)",
    ),
    ("extension_not_found", "File '{0}' not found"),
    ("multiple_extensions", "Found multiple extensions for '{0}':"),
    ("specify_filename", "Specify the exact filename"),
    ("no_disabled_extensions", "No disabled extensions found for command/file '{0}'"),
    ("command_not_found_disable", "Command/file '{0}' not found"),
    ("extension_enabled", "Extension '{0}' enabled"),
    ("extension_disabled", "Extension '{0}' disabled"),
    ("extension_exists", "File '{0}' already exists"),
    // import
    ("import_description", "Downloads and installs an extension from the specified URL"),
    (
        "missing_url",
        "Specify extension URL to download (e.g.: import https://example.com/extension.star)",
    ),
    ("downloading_extension", "Downloading extension from URL: {0}"),
    ("extension_downloaded", "Extension successfully downloaded: {0}"),
    ("download_error", "Error downloading extension: {0}"),
    ("scan_hint", "Review it before use: scan {0}"),
    // store
    ("store_description", "Searches and installs extensions from the official store"),
    ("store_usage", "store search <query>\nstore install <name>\nstore list"),
    (
        "store_subcommands",
        "Available subcommands:\n  search <query> - search extensions\n  install <name> - install an extension\n  list - list available extensions",
    ),
    ("store_missing_name", "Specify the name of the extension to install"),
    ("store_unknown_subcommand", "Unknown subcommand: {0}"),
    ("store_search_results", "Search results:"),
    ("store_no_results", "No extensions found"),
    ("store_available", "Available extensions:"),
    ("store_empty", "The extension store is empty"),
    ("store_not_found", "Extension '{0}' not found in the store"),
    ("store_installing", "Installing {0}..."),
    ("store_installed", "Extension {0} installed"),
    ("store_error", "Store error: {0}"),
    // verification
    ("verified_load_error", "Error loading verified hashes: {0}"),
    ("verified_commands", "Verified commands (✅ safe):"),
    ("verification", "Verification"),
    ("verified_safe", "This command is verified and safe"),
    // scan
    ("scan_description", "Scans an extension for potentially dangerous code"),
    ("scan_missing_file", "Specify file to scan (e.g.: scan mycommand.star)"),
    ("scan_file_not_found", "File '{0}' not found"),
    ("scan_issues_found", "Potential security issues found in {0}:"),
    ("scan_no_issues", "No dangerous code patterns found in {0}"),
    ("scan_total_issues", "Total issues found: {0}"),
    ("scan_error", "Scan error: {0}"),
    ("full_path_display", "Full path: {0}"),
    // alias
    ("alias_description", "Manage command aliases"),
    ("alias_usage", "alias add <command> <alias>\nalias remove <alias>\nalias list"),
    ("alias_no_aliases", "No custom aliases defined"),
    ("alias_header", "Custom aliases:"),
    ("alias_added", "Alias '{0}' added for command '{1}'"),
    ("alias_removed", "Alias '{0}' removed"),
    ("alias_not_found", "Alias not found"),
    ("alias_invalid_syntax", "Invalid alias command syntax"),
    ("alias_error", "Error saving aliases: {0}"),
    // new
    ("new_description", "Creates a new extension template in the extensions folder"),
    ("missing_command_name", "Specify command name (e.g.: new mycommand)"),
    ("file_exists", "File {0} already exists!"),
    ("template_created", "Command template created: {0}"),
    // version / time
    ("version_description", "Shows application version and information"),
    ("application", "Application"),
    ("commands", "Commands"),
    ("extensions", "Extensions"),
    ("loaded", "loaded"),
    ("time_description", "Shows current time"),
    ("current_time", "Current time: {0}"),
    // debug
    ("debug_description", "Runs a command in debug mode"),
    ("missing_debug_command", "Specify command to debug (e.g.: debug mycommand arg1 arg2)"),
    ("debug_start", "Running {0} with arguments: {1}"),
    ("debug_vars", "Variables: args = {0}"),
    ("debug_completed", "Command completed in {0} ms"),
    ("debug_error", "Execution error: {0}: {1}"),
];

/// Looks up a message template.
pub fn template(key: &str) -> Option<&'static str> {
    MESSAGES.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

/// Renders a message key with positional arguments.
pub fn render(key: &str, args: &[&dyn Display]) -> String {
    let Some(template) = template(key) else {
        return key.to_string();
    };
    if args.is_empty() {
        return template.to_string();
    }

    let mut out = template.to_string();
    for (i, arg) in args.iter().enumerate() {
        out = out.replace(&format!("{{{}}}", i), &arg.to_string());
    }
    out
}
