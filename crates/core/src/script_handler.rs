//! Named script handlers, invocable from code running in the page.
//!
//! A page calls a handler by name with an array of JSON arguments; the
//! remote context forwards that as `onCallJsHandler` and the owning peer
//! hands it to its [`ScriptHandlerMultiplexer`].

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::Value;
use webbridge_protocol::DecodeError;
use webbridge_runtime::{Error, Result};

/// Identifier returned by [`ScriptHandlerMultiplexer::register`].
///
/// Ids are counted per handler name from 0 and are never reused, so an id
/// stays valid after other handlers of the same name are removed.
pub type HandlerId = u64;

/// Callback invoked with the decoded argument array.
pub type ScriptCallback = Arc<dyn Fn(&[Value]) -> Result<()> + Send + Sync>;

#[derive(Default)]
struct HandlerList {
	next_id: HandlerId,
	callbacks: IndexMap<HandlerId, ScriptCallback>,
}

/// Table of script handlers for one peer, keyed by handler name.
///
/// Callbacks for a name run in registration order. Each callback is
/// isolated: an error or panic is logged and the remaining callbacks still
/// run.
#[derive(Default)]
pub struct ScriptHandlerMultiplexer {
	handlers: Mutex<HashMap<String, HandlerList>>,
}

impl ScriptHandlerMultiplexer {
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends `callback` to the handlers for `name`.
	pub fn register<F>(&self, name: impl Into<String>, callback: F) -> HandlerId
	where
		F: Fn(&[Value]) -> Result<()> + Send + Sync + 'static,
	{
		let name = name.into();
		let mut handlers = self.handlers.lock();
		let list = handlers.entry(name.clone()).or_default();
		let id = list.next_id;
		list.next_id += 1;
		list.callbacks.insert(id, Arc::new(callback));
		tracing::debug!(handler = %name, id, "script handler registered");
		id
	}

	/// Removes the handler `id` registered under `name`.
	///
	/// Returns false, leaving the table untouched, if there is no such handler.
	pub fn unregister(&self, name: &str, id: HandlerId) -> bool {
		let mut handlers = self.handlers.lock();
		let Some(list) = handlers.get_mut(name) else {
			return false;
		};
		let removed = list.callbacks.shift_remove(&id).is_some();
		if removed {
			tracing::debug!(handler = name, id, "script handler removed");
		}
		removed
	}

	/// Number of handlers registered under `name`.
	pub fn len(&self, name: &str) -> usize {
		self.handlers
			.lock()
			.get(name)
			.map_or(0, |list| list.callbacks.len())
	}

	/// Names that currently have at least one handler, sorted.
	pub fn names(&self) -> Vec<String> {
		let mut names: Vec<String> = self
			.handlers
			.lock()
			.iter()
			.filter(|(_, list)| !list.callbacks.is_empty())
			.map(|(name, _)| name.clone())
			.collect();
		names.sort();
		names
	}

	/// Removes every handler registered under `name`, returning how many
	/// were removed. Ids already handed out for `name` are not reissued.
	pub fn clear(&self, name: &str) -> usize {
		self.handlers
			.lock()
			.get_mut(name)
			.map_or(0, |list| list.callbacks.drain(..).count())
	}

	/// Invokes every handler registered under `name` with the arguments
	/// decoded from `raw_args`, which must be a JSON array.
	///
	/// Returns the number of callbacks invoked, including ones that failed.
	pub fn dispatch(&self, name: &str, raw_args: &str) -> Result<usize> {
		let args = parse_args(raw_args)?;

		// Snapshot so callbacks may register or unregister handlers.
		let callbacks: Vec<(HandlerId, ScriptCallback)> = self
			.handlers
			.lock()
			.get(name)
			.map(|list| {
				list.callbacks
					.iter()
					.map(|(id, callback)| (*id, Arc::clone(callback)))
					.collect()
			})
			.unwrap_or_default();

		if callbacks.is_empty() {
			tracing::debug!(handler = name, "no script handler registered");
			return Ok(0);
		}

		for (id, callback) in &callbacks {
			match catch_unwind(AssertUnwindSafe(|| callback(&args))) {
				Ok(Ok(())) => {}
				Ok(Err(e)) => {
					tracing::warn!(handler = name, id, "script handler failed: {}", e);
				}
				Err(panic) => {
					tracing::warn!(
						handler = name,
						id,
						"script handler panicked: {}",
						panic_message(panic.as_ref())
					);
				}
			}
		}

		Ok(callbacks.len())
	}
}

impl std::fmt::Debug for ScriptHandlerMultiplexer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ScriptHandlerMultiplexer")
			.field("names", &self.names())
			.finish()
	}
}

fn parse_args(raw_args: &str) -> Result<Vec<Value>> {
	match serde_json::from_str::<Value>(raw_args) {
		Ok(Value::Array(args)) => Ok(args),
		Ok(_) => Err(Error::Decode(DecodeError::new("args", "expected a JSON array"))),
		Err(e) => Err(Error::Decode(DecodeError::new(
			"args",
			format!("invalid JSON: {e}"),
		))),
	}
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
	if let Some(message) = panic.downcast_ref::<&str>() {
		message
	} else if let Some(message) = panic.downcast_ref::<String>() {
		message
	} else {
		"non-string panic payload"
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn recording(
		table: &ScriptHandlerMultiplexer,
		name: &str,
		tag: &'static str,
		log: &Arc<Mutex<Vec<(&'static str, Vec<Value>)>>>,
	) -> HandlerId {
		let log = Arc::clone(log);
		table.register(name, move |args| {
			log.lock().push((tag, args.to_vec()));
			Ok(())
		})
	}

	#[test]
	fn dispatch_runs_callbacks_in_registration_order() {
		let table = ScriptHandlerMultiplexer::new();
		let log = Arc::new(Mutex::new(Vec::new()));
		assert_eq!(recording(&table, "ping", "c1", &log), 0);
		assert_eq!(recording(&table, "ping", "c2", &log), 1);

		assert_eq!(table.dispatch("ping", "[1,2]").unwrap(), 2);
		assert_eq!(
			*log.lock(),
			vec![("c1", vec![json!(1), json!(2)]), ("c2", vec![json!(1), json!(2)])]
		);
	}

	#[test]
	fn removal_keeps_other_ids_valid() {
		let table = ScriptHandlerMultiplexer::new();
		let log = Arc::new(Mutex::new(Vec::new()));
		let a = recording(&table, "ping", "a", &log);
		let b = recording(&table, "ping", "b", &log);
		let c = recording(&table, "ping", "c", &log);

		assert!(table.unregister("ping", a));
		// b and c keep their ids after a is gone
		assert!(table.unregister("ping", c));
		assert_eq!(table.len("ping"), 1);

		table.dispatch("ping", "[3]").unwrap();
		assert_eq!(*log.lock(), vec![("b", vec![json!(3)])]);
		assert!(table.unregister("ping", b));
	}

	#[test]
	fn unknown_id_leaves_table_unchanged() {
		let table = ScriptHandlerMultiplexer::new();
		let log = Arc::new(Mutex::new(Vec::new()));
		recording(&table, "ping", "a", &log);

		assert!(!table.unregister("ping", 5));
		assert!(!table.unregister("pong", 0));
		assert_eq!(table.len("ping"), 1);
		assert_eq!(table.names(), vec!["ping"]);
	}

	#[test]
	fn ids_are_not_reused_after_clear() {
		let table = ScriptHandlerMultiplexer::new();
		table.register("x", |_| Ok(()));
		table.register("x", |_| Ok(()));
		assert_eq!(table.clear("x"), 2);
		assert_eq!(table.register("x", |_| Ok(())), 2);
		assert_eq!(table.register("y", |_| Ok(())), 0);
	}

	#[test]
	fn failing_and_panicking_callbacks_do_not_stop_siblings() {
		let table = ScriptHandlerMultiplexer::new();
		let log = Arc::new(Mutex::new(Vec::new()));
		table.register("ping", |_| Err(Error::UnsupportedOperation("boom".into())));
		table.register("ping", |_| panic!("callback exploded"));
		recording(&table, "ping", "last", &log);

		assert_eq!(table.dispatch("ping", "[]").unwrap(), 3);
		assert_eq!(log.lock().len(), 1);
	}

	#[test]
	fn non_array_args_are_a_decode_error() {
		let table = ScriptHandlerMultiplexer::new();
		let err = table.dispatch("ping", r#"{"a": 1}"#).unwrap_err();
		assert_eq!(err.decode_field(), Some("args"));
		let err = table.dispatch("ping", "[1,").unwrap_err();
		assert_eq!(err.decode_field(), Some("args"));
	}

	#[test]
	fn callbacks_may_unregister_during_dispatch() {
		let table = Arc::new(ScriptHandlerMultiplexer::new());
		let inner = Arc::clone(&table);
		let id = table.register("once", move |_| {
			inner.unregister("once", 0);
			Ok(())
		});
		assert_eq!(id, 0);

		assert_eq!(table.dispatch("once", "[]").unwrap(), 1);
		assert_eq!(table.dispatch("once", "[]").unwrap(), 0);
	}
}
