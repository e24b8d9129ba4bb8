//! Embedded Lua scripting for host applications.
//!
//! A host builds a [`TypeRegistry`] of native functions and object types,
//! then compiles named scripts against it. Scripts run inside a
//! whitelisted sandbox, can cooperatively `yield`, and pull in libraries
//! through a host-supplied loader via `require`. Script-level functions
//! are invoked with typed arguments ([`Script::call`]) or scheduled on a
//! [`CooperativeExecutor`] with the result observed through a one-shot
//! future ([`Script::call_async`]).
//!
//! ```no_run
//! use scripthost::{Script, TypeRegistry, Value};
//! use std::sync::Arc;
//!
//! let mut registry = TypeRegistry::new();
//! registry.add_free_function("greet", |name: String| format!("hello {name}"));
//!
//! let script = Script::with_registry(
//!     "demo",
//!     "function run(who) return greet(who) end",
//!     Arc::new(registry),
//! )?;
//! assert_eq!(script.call("run", ("world",))?, Value::String("hello world".into()));
//! # Ok::<(), scripthost::ScriptError>(())
//! ```

mod callback;
mod config;
mod error;
mod executor;
mod marshal;
mod object;
mod registry;
mod require;
mod sandbox;
mod script;
mod value;

pub use callback::{IntoScriptResult, ScriptFunction, ScriptMethod};
pub use config::Configuration;
pub use error::ScriptError;
pub use executor::{CooperativeExecutor, RunStatus, ScriptThread};
pub use marshal::{ArgReader, FromScript};
pub use registry::{ObjectTypeBuilder, TypeInfo, TypeRegistry};
pub use script::{IntoScriptArg, Script, ScriptArg, ScriptArgs};
pub use value::{ObjectRef, TypeIdent, Value, Variadic};

pub use promise::{BrokenPromise, Future, Promise};
