//! Host service functions.
//!
//! Each function reaches the host through the evaluation state attached to
//! the evaluator, never through process globals.

use starlark::environment::GlobalsBuilder;
use starlark::eval::Evaluator;
use starlark::starlark_module;
use starlark::values::{none::NoneType, Value};

use crate::compiler::convert::{json_to_starlark, starlark_to_json};
use crate::compiler::eval::eval_state;

/// Registers host functions into a GlobalsBuilder.
pub fn register(builder: &mut GlobalsBuilder) {
    register_host_functions(builder);
}

fn message_text(value: Value) -> String {
    match value.unpack_str() {
        Some(s) => s.to_string(),
        None => value.to_str(),
    }
}

#[starlark_module]
fn register_host_functions(builder: &mut GlobalsBuilder) {
    /// Writes a response line.
    fn respond<'v>(message: Value<'v>, eval: &mut Evaluator<'v, '_>) -> anyhow::Result<NoneType> {
        let state = eval_state(eval)?;
        state.host().reporter().response(&message_text(message), &[]);
        Ok(NoneType)
    }

    /// Writes an error line.
    fn error<'v>(message: Value<'v>, eval: &mut Evaluator<'v, '_>) -> anyhow::Result<NoneType> {
        let state = eval_state(eval)?;
        state.host().reporter().error(&message_text(message), &[]);
        Ok(NoneType)
    }

    /// Writes a debug line (shown only when debug output is on).
    fn debug<'v>(message: Value<'v>, eval: &mut Evaluator<'v, '_>) -> anyhow::Result<NoneType> {
        let state = eval_state(eval)?;
        state.host().reporter().debug(&message_text(message));
        Ok(NoneType)
    }

    /// Writes `name = repr(value)` as a debug line.
    fn debug_var<'v>(
        name: &str,
        value: Value<'v>,
        eval: &mut Evaluator<'v, '_>,
    ) -> anyhow::Result<NoneType> {
        let state = eval_state(eval)?;
        state
            .host()
            .reporter()
            .debug(&format!("{} = {}", name, value.to_repr()));
        Ok(NoneType)
    }

    /// Stores a JSON-compatible value in the process-wide store.
    fn shared_set<'v>(
        key: &str,
        value: Value<'v>,
        eval: &mut Evaluator<'v, '_>,
    ) -> anyhow::Result<NoneType> {
        let json = starlark_to_json(value)?;
        let state = eval_state(eval)?;
        state.check_store_access()?;
        state.host().shared().set(key, json);
        Ok(NoneType)
    }

    /// Reads a value from the process-wide store.
    fn shared_get<'v>(
        key: &str,
        #[starlark(default = NoneType)] default: Value<'v>,
        eval: &mut Evaluator<'v, '_>,
    ) -> anyhow::Result<Value<'v>> {
        let state = eval_state(eval)?;
        state.check_store_access()?;
        match state.host().shared().get(key) {
            Some(json) => json_to_starlark(&json, eval.heap()),
            None => Ok(default),
        }
    }

    /// Returns true if the key is present in the process-wide store.
    fn shared_has<'v>(key: &str, eval: &mut Evaluator<'v, '_>) -> anyhow::Result<bool> {
        let state = eval_state(eval)?;
        state.check_store_access()?;
        Ok(state.host().shared().contains(key))
    }

    /// Replaces a value in the process-wide store with `function(current)`
    /// atomically, and returns the new value.
    ///
    /// `current` is `default` when the key is absent. The store stays locked
    /// while `function` runs, so it must not call other `shared_*` functions.
    ///
    /// # Example
    /// ```starlark
    /// shared_update("hits", lambda n: n + 1, 0)
    /// ```
    fn shared_update<'v>(
        key: &str,
        function: Value<'v>,
        #[starlark(default = NoneType)] default: Value<'v>,
        eval: &mut Evaluator<'v, '_>,
    ) -> anyhow::Result<Value<'v>> {
        let state = eval_state(eval)?;
        let _guard = state.begin_update()?;
        let next = state.host().shared().update(key, |current| {
            let current = match current {
                Some(json) => json_to_starlark(json, eval.heap())?,
                None => default,
            };
            let next = eval
                .eval_function(function, &[current], &[])
                .map_err(|e| anyhow::anyhow!("shared_update(): {}", e))?;
            starlark_to_json(next)
        })?;
        json_to_starlark(&next, eval.heap())
    }

    /// Publishes a value for other extensions under `key`.
    ///
    /// Only valid while an extension loads; the value is frozen together with
    /// the extension's module.
    fn export<'v>(
        key: &str,
        value: Value<'v>,
        eval: &mut Evaluator<'v, '_>,
    ) -> anyhow::Result<NoneType> {
        let symbol = eval_state(eval)?.export_symbol(key)?;
        eval.module().set(&symbol, value);
        Ok(NoneType)
    }

    /// Fetches a value published with `export()`, or `None`.
    fn imported<'v>(key: &str, eval: &mut Evaluator<'v, '_>) -> anyhow::Result<Value<'v>> {
        let exported = eval_state(eval)?.host().exports().lookup(key);
        Ok(match exported {
            Some(value) => value.owned_value(eval.module().frozen_heap()),
            None => Value::new_none(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{eval_with_host, test_host};
    use crate::report::ReportLevel;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_respond_and_error() {
        let (reporter, host) = test_host();
        eval_with_host("respond('hello')\nerror('bad')\ndebug_var('n', [1])", &host).unwrap();

        let entries = reporter.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].level, ReportLevel::Response);
        assert_eq!(entries[0].text, "hello");
        assert_eq!(entries[1].level, ReportLevel::Error);
        assert_eq!(entries[2].text, "n = [1]");
    }

    #[test]
    fn test_shared_store_round_trip() {
        let (_, host) = test_host();
        eval_with_host("shared_set('cfg', {'depth': 2, 'tags': ['a']})", &host).unwrap();

        assert_eq!(host.shared().get("cfg"), Some(json!({"depth": 2, "tags": ["a"]})));
        let result = eval_with_host("shared_get('cfg')['depth']", &host).unwrap();
        assert_eq!(result, json!(2));
    }

    #[test]
    fn test_shared_get_default() {
        let (_, host) = test_host();
        let result = eval_with_host("shared_get('missing', 7)", &host).unwrap();
        assert_eq!(result, json!(7));
        let result = eval_with_host("shared_get('missing')", &host).unwrap();
        assert_eq!(result, json!(null));
    }

    #[test]
    fn test_shared_update() {
        let (_, host) = test_host();
        let result = eval_with_host(
            "shared_update('n', lambda v: v + 1, 0)\nshared_update('n', lambda v: v * 10)",
            &host,
        )
        .unwrap();
        assert_eq!(result, json!(10));
        assert_eq!(host.shared().get("n"), Some(json!(10)));
    }

    #[test]
    fn test_shared_update_failure_keeps_value() {
        let (_, host) = test_host();
        host.shared().set("n", json!(1));
        let err = eval_with_host("shared_update('n', lambda v: v + 'x')", &host).unwrap_err();
        assert!(err.contains("shared_update()"), "{}", err);
        assert_eq!(host.shared().get("n"), Some(json!(1)));
    }

    #[test]
    fn test_shared_update_cannot_reenter_store() {
        let (_, host) = test_host();
        let err = eval_with_host("shared_update('n', lambda v: shared_get('n'), 0)", &host)
            .unwrap_err();
        assert!(err.contains("cannot be used inside"), "{}", err);
        assert!(host.shared().get("n").is_none());

        // The guard is released after the failed update.
        eval_with_host("shared_set('n', 2)", &host).unwrap();
        assert_eq!(host.shared().get("n"), Some(json!(2)));
    }

    #[test]
    fn test_shared_set_rejects_functions() {
        let (_, host) = test_host();
        let err = eval_with_host("shared_set('f', len)", &host).unwrap_err();
        assert!(err.contains("unsupported"), "{}", err);
    }
}
