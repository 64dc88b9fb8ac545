//! Command declaration functions.
//!
//! Provides `command()`, which builds a command value, and `register()`,
//! which declaration-form extensions call once per command they define and
//! which running commands may call to add more.

use anyhow::bail;
use starlark::environment::GlobalsBuilder;
use starlark::eval::Evaluator;
use starlark::starlark_module;
use starlark::values::list::{AllocList, ListRef};
use starlark::values::{dict::Dict, dict::DictRef, none::NoneType, Heap, Value};

use super::{hashed_key, new_dict};
use crate::compiler::eval::eval_state;

/// Key marking a dict as a command value.
pub const COMMAND_MARKER: &str = "__mugs_command__";

/// Registers command functions into a GlobalsBuilder.
pub fn register(builder: &mut GlobalsBuilder) {
    register_command_functions(builder);
}

/// Looks up a string key in a dict value.
pub fn field<'v>(value: Value<'v>, key: &str) -> Option<Value<'v>> {
    let dict = DictRef::from_value(value)?;
    let found = dict
        .iter()
        .find(|(k, _)| k.unpack_str() == Some(key))
        .map(|(_, v)| v);
    found
}

/// Returns true if `value` was produced by `command()`.
pub fn is_command(value: Value) -> bool {
    field(value, COMMAND_MARKER).and_then(|v| v.unpack_bool()) == Some(true)
}

fn validate_word(value: &str, function: &str, param: &str) -> anyhow::Result<()> {
    if value.is_empty() || value.chars().any(char::is_whitespace) {
        bail!(
            "{}(): '{}' must be a non-empty word, got {:?}",
            function,
            param,
            value
        );
    }
    Ok(())
}

#[starlark_module]
fn register_command_functions(builder: &mut GlobalsBuilder) {
    /// Declares a command.
    ///
    /// # Arguments
    /// * `name` - Command name, matched case-insensitively
    /// * `execute` - Function called with the argument list
    /// * `description` - One-line description shown by `help`
    /// * `aliases` - Alternate names
    /// * `author` - Author shown by `help` (default: "unknown")
    /// * `version` - Version string (default: "1.0")
    /// * `usage` - Optional multi-line usage text
    ///
    /// # Example
    /// ```starlark
    /// def _run(args):
    ///     respond("Hello, " + " ".join(args))
    ///
    /// command(name = "greet", aliases = ["hi"], execute = _run)
    /// ```
    fn command<'v>(
        name: &str,
        execute: Value<'v>,
        #[starlark(default = "")] description: &str,
        #[starlark(default = NoneType)] aliases: Value<'v>,
        #[starlark(default = "unknown")] author: &str,
        #[starlark(default = "1.0")] version: &str,
        #[starlark(default = NoneType)] usage: Value<'v>,
        heap: &'v Heap,
    ) -> anyhow::Result<Dict<'v>> {
        validate_word(name, "command", "name")?;

        if execute.get_type() != "function" {
            bail!(
                "command(): 'execute' must be a function, got {}",
                execute.get_type()
            );
        }

        let mut alias_names = Vec::new();
        if !aliases.is_none() {
            let Some(list) = ListRef::from_value(aliases) else {
                bail!(
                    "command(): 'aliases' must be a list of strings, got {}",
                    aliases.get_type()
                );
            };
            for alias in list.iter() {
                let Some(alias) = alias.unpack_str() else {
                    bail!(
                        "command(): 'aliases' entries must be strings, got {}",
                        alias.get_type()
                    );
                };
                validate_word(alias, "command", "aliases")?;
                alias_names.push(alias.to_string());
            }
        }

        let mut dict = new_dict(heap);
        dict.insert_hashed(hashed_key(heap, COMMAND_MARKER), Value::new_bool(true));
        dict.insert_hashed(hashed_key(heap, "name"), heap.alloc_str(name).to_value());
        dict.insert_hashed(
            hashed_key(heap, "description"),
            heap.alloc_str(description).to_value(),
        );
        dict.insert_hashed(
            hashed_key(heap, "aliases"),
            heap.alloc(AllocList(alias_names.iter().map(String::as_str))),
        );
        dict.insert_hashed(hashed_key(heap, "author"), heap.alloc_str(author).to_value());
        dict.insert_hashed(hashed_key(heap, "version"), heap.alloc_str(version).to_value());

        if !usage.is_none() {
            let Some(text) = usage.unpack_str() else {
                bail!("command(): 'usage' must be a string, got {}", usage.get_type());
            };
            dict.insert_hashed(hashed_key(heap, "usage"), heap.alloc_str(text).to_value());
        }

        dict.insert_hashed(hashed_key(heap, "execute"), execute);
        Ok(dict)
    }

    /// Registers a command declared with `command()`.
    ///
    /// In a declaration-form module body this declares one of the file's
    /// commands. Called from a command's `execute`, it adds the command to
    /// the shell's registry once that call returns.
    ///
    /// # Example
    /// ```starlark
    /// register(command(name = "up", execute = _up))
    /// register(command(name = "down", execute = _down))
    /// ```
    fn register<'v>(command: Value<'v>, eval: &mut Evaluator<'v, '_>) -> anyhow::Result<NoneType> {
        if !is_command(command) {
            bail!(
                "register(): expected a command(...) value, got {}",
                command.get_type()
            );
        }
        let symbol = eval_state(eval)?.register_symbol()?;
        eval.module().set(&symbol, command);
        Ok(NoneType)
    }
}
