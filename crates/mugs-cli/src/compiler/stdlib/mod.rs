//! Host stdlib exposed to extension code.
//!
//! ## Function Categories
//!
//! - **Command**: `command()`, `register()` - declare commands
//! - **Host**: `respond()`, `error()`, `debug()`, `debug_var()` - reporting
//! - **Shared data**: `shared_set()`, `shared_get()`, `shared_has()`, `shared_update()`
//! - **Exports**: `export()`, `imported()` - cross-extension calls
//!
//! Nothing here touches the filesystem, processes or the network.

pub mod command;
pub mod host;

use starlark::collections::SmallMap;
use starlark::environment::GlobalsBuilder;
use starlark::values::{dict::Dict, Heap, Value};

/// Registers all host functions into a GlobalsBuilder.
///
/// # Example
///
/// ```ignore
/// use starlark::environment::GlobalsBuilder;
/// use mugs_cli::compiler::stdlib::register_stdlib;
///
/// let globals = GlobalsBuilder::standard()
///     .with(register_stdlib)
///     .build();
/// ```
pub fn register_stdlib(builder: &mut GlobalsBuilder) {
    command::register(builder);
    host::register(builder);
}

/// Helper to create a hashed key for dict insertion.
/// String hashing cannot fail, so we use expect.
pub(crate) fn hashed_key<'v>(heap: &'v Heap, key: &str) -> starlark::collections::Hashed<Value<'v>> {
    heap.alloc_str(key)
        .to_value()
        .get_hashed()
        .expect("string hashing cannot fail")
}

/// Helper to create an empty dict on the heap.
pub(crate) fn new_dict<'v>(_heap: &'v Heap) -> Dict<'v> {
    let map: SmallMap<Value<'v>, Value<'v>> = SmallMap::new();
    Dict::new(map)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::compiler::eval::{EvalState, Phase};
    use crate::host::HostContext;
    use crate::report::MemoryReporter;
    use starlark::environment::Module;
    use starlark::eval::Evaluator;
    use starlark::syntax::{AstModule, Dialect};
    use std::sync::Arc;

    /// Evaluates `source` in the load phase and returns the final value as
    /// JSON, or the error text.
    pub fn eval_with_host(
        source: &str,
        host: &Arc<HostContext>,
    ) -> Result<serde_json::Value, String> {
        let ast = AstModule::parse("test.star", source.to_string(), &Dialect::Standard)
            .map_err(|e| e.to_string())?;
        let module = Module::new();
        let globals = GlobalsBuilder::standard().with(register_stdlib).build();
        let state = EvalState::new(Arc::clone(host), Phase::Load);
        let mut eval = Evaluator::new(&module);
        eval.extra = Some(&state);
        let value = eval.eval_module(ast, &globals).map_err(|e| e.to_string())?;
        crate::compiler::convert::starlark_to_json(value).map_err(|e| e.to_string())
    }

    pub fn test_host() -> (Arc<MemoryReporter>, Arc<HostContext>) {
        let reporter = Arc::new(MemoryReporter::new());
        let host = Arc::new(HostContext::new(reporter.clone()));
        (reporter, host)
    }

    #[test]
    fn test_stdlib_registered() {
        let (_, host) = test_host();
        let result = eval_with_host("shared_has('x')", &host);
        assert_eq!(result, Ok(serde_json::json!(false)));

        let result = eval_with_host("imported('missing')", &host);
        assert_eq!(result, Ok(serde_json::Value::Null));
    }
}
