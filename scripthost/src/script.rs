//! The per-script execution environment.

use crate::config::Configuration;
use crate::error::{classify, ScriptError};
use crate::executor::{CooperativeExecutor, ScriptThread};
use crate::object::ObjectCell;
use crate::registry::TypeRegistry;
use crate::value::Value;
use crate::{require, sandbox};
use mlua::Lua;
use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::Arc;

/// Per-script bookkeeping published in the runtime's app-data slot so
/// native callbacks can find their environment from a bare state.
pub(crate) struct ScriptContext {
    pub(crate) registry: Arc<TypeRegistry>,
    pub(crate) configuration: Configuration,
    pub(crate) loaded: RefCell<HashSet<String>>,
}

pub(crate) fn registry_of(lua: &Lua) -> mlua::Result<Arc<TypeRegistry>> {
    let context = lua.app_data_ref::<ScriptContext>().ok_or_else(|| {
        mlua::Error::RuntimeError("script environment is not attached to this state".into())
    })?;
    Ok(context.registry.clone())
}

/// One argument of a script-level call: a primitive value or a shared
/// reference to a registered native object.
pub struct ScriptArg(pub(crate) ArgRepr);

pub(crate) enum ArgRepr {
    Value(Value),
    Object(ObjectCell),
}

/// Conversion into a single call argument.
pub trait IntoScriptArg {
    fn into_script_arg(self) -> ScriptArg;
}

macro_rules! into_script_arg_via_value {
    ($($ty:ty)*) => {$(
        impl IntoScriptArg for $ty {
            fn into_script_arg(self) -> ScriptArg {
                ScriptArg(ArgRepr::Value(Value::from(self)))
            }
        }
    )*};
}

into_script_arg_via_value!(i8 i16 i32 i64 u8 u16 u32 u64 isize usize f32 f64 bool String Value);

impl<'a> IntoScriptArg for &'a str {
    fn into_script_arg(self) -> ScriptArg {
        ScriptArg(ArgRepr::Value(Value::from(self)))
    }
}

impl<T> IntoScriptArg for Arc<T>
where
    T: ?Sized + Send + Sync + 'static,
{
    fn into_script_arg(self) -> ScriptArg {
        ScriptArg(ArgRepr::Object(ObjectCell::from_arc(self)))
    }
}

/// A tuple of call arguments.
pub trait ScriptArgs {
    fn into_args(self) -> Vec<ScriptArg>;
}

impl ScriptArgs for () {
    fn into_args(self) -> Vec<ScriptArg> {
        Vec::new()
    }
}

macro_rules! impl_script_args {
    ($($arg:ident),+) => {
        impl<$($arg: IntoScriptArg),+> ScriptArgs for ($($arg,)+) {
            #[allow(non_snake_case)]
            fn into_args(self) -> Vec<ScriptArg> {
                let ($($arg,)+) = self;
                vec![$($arg.into_script_arg()),+]
            }
        }
    };
}

impl_script_args!(A1);
impl_script_args!(A1, A2);
impl_script_args!(A1, A2, A3);
impl_script_args!(A1, A2, A3, A4);
impl_script_args!(A1, A2, A3, A4, A5);
impl_script_args!(A1, A2, A3, A4, A5, A6);
impl_script_args!(A1, A2, A3, A4, A5, A6, A7);
impl_script_args!(A1, A2, A3, A4, A5, A6, A7, A8);

/// A compiled script and its sandboxed runtime state.
///
/// Construction compiles the buffer under the given name (used only as a
/// diagnostic tag) and runs its top-level chunk; functions it defines are
/// then reachable through [`Script::call`] and [`Script::call_async`].
#[derive(Debug)]
pub struct Script {
    lua: Lua,
    name: String,
}

impl Script {
    /// Build a script with default configuration and an empty registry.
    pub fn new(name: &str, source: impl AsRef<[u8]>) -> Result<Self, ScriptError> {
        Self::with_options(
            name,
            source,
            Configuration::default(),
            Arc::new(TypeRegistry::new()),
        )
    }

    /// Build a script against a shared registry.
    pub fn with_registry(
        name: &str,
        source: impl AsRef<[u8]>,
        registry: Arc<TypeRegistry>,
    ) -> Result<Self, ScriptError> {
        Self::with_options(name, source, Configuration::default(), registry)
    }

    /// Build a script with a configuration and an empty registry.
    pub fn with_configuration(
        name: &str,
        source: impl AsRef<[u8]>,
        configuration: Configuration,
    ) -> Result<Self, ScriptError> {
        Self::with_options(name, source, configuration, Arc::new(TypeRegistry::new()))
    }

    pub fn with_options(
        name: &str,
        source: impl AsRef<[u8]>,
        configuration: Configuration,
        registry: Arc<TypeRegistry>,
    ) -> Result<Self, ScriptError> {
        let lua = sandbox::new_state().map_err(classify)?;
        if let Some(limit) = configuration.memory_limit {
            lua.set_memory_limit(limit).map_err(classify)?;
        }
        sandbox::apply(&lua).map_err(classify)?;
        lua.set_app_data(ScriptContext {
            registry: registry.clone(),
            configuration,
            loaded: RefCell::new(HashSet::new()),
        });
        require::install(&lua).map_err(classify)?;
        install_free_functions(&lua, &registry).map_err(classify)?;

        log::debug!("compiling script `{name}`");
        {
            let chunk = lua
                .load(source.as_ref())
                .set_name(name)
                .into_function()
                .map_err(classify)?;
            chunk.call::<_, ()>(()).map_err(classify)?;
        }

        Ok(Self {
            lua,
            name: name.to_string(),
        })
    }

    /// The diagnostic name the script was compiled under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Call a script-level function and drive it to completion,
    /// cooperative yields included. At most one return value comes back.
    pub fn call<Args: ScriptArgs>(&self, name: &str, args: Args) -> Result<Value, ScriptError> {
        let mut executor = CooperativeExecutor::new();
        let future = self.call_async(&mut executor, name, args)?;
        executor.run();
        smol::block_on(future).map_err(ScriptError::from_anyhow)
    }

    /// Schedule a call on a host-driven executor and hand back the future
    /// observing its result.
    pub fn call_async<'lua, Args: ScriptArgs>(
        &'lua self,
        executor: &mut CooperativeExecutor<'lua>,
        name: &str,
        args: Args,
    ) -> Result<promise::Future<Value>, ScriptError> {
        let function = match self
            .lua
            .globals()
            .get::<_, mlua::Value>(name)
            .map_err(classify)?
        {
            mlua::Value::Function(function) => function,
            _ => {
                return Err(ScriptError::Runtime(format!(
                    "{}: `{name}` is not a function",
                    self.name
                )))
            }
        };
        let mut thread =
            ScriptThread::new(&self.lua, function, args.into_args()).map_err(classify)?;
        let future = thread.future();
        executor.add_thread(thread);
        Ok(future)
    }

    /// Run a full garbage-collection cycle, releasing any unreferenced
    /// object handles.
    pub fn collect_garbage(&self) -> Result<(), ScriptError> {
        self.lua.gc_collect().map_err(classify)
    }
}

fn install_free_functions(lua: &Lua, registry: &Arc<TypeRegistry>) -> mlua::Result<()> {
    let globals = lua.globals();
    for (name, callback) in registry.free_functions() {
        let callback = callback.clone();
        let trampoline =
            lua.create_function(move |lua, args: mlua::MultiValue| callback.invoke(lua, args))?;
        globals.set(name, trampoline)?;
    }
    Ok(())
}
