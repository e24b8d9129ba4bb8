//! The at-most-once library loader behind the script-visible `require`.

use mlua::Lua;

pub(crate) fn install(lua: &Lua) -> mlua::Result<()> {
    let require = lua.create_function(require_impl)?;
    lua.globals().set("require", require)
}

fn require_impl(lua: &Lua, name: mlua::Value) -> mlua::Result<()> {
    // Recover the environment from the state; native callbacks have
    // nothing else to hang per-script bookkeeping on.
    let Some(context) = lua.app_data_ref::<crate::script::ScriptContext>() else {
        return Err(invalid_call());
    };

    let trimmed = match &name {
        mlua::Value::String(raw) => raw.to_str().map_err(|_| invalid_call())?.trim().to_string(),
        _ => return Err(invalid_call()),
    };
    if trimmed.is_empty() {
        return Err(invalid_call());
    }

    if context.loaded.borrow().contains(&trimmed) {
        return Ok(());
    }
    let load = context
        .configuration
        .load
        .clone()
        .ok_or_else(|| mlua::Error::RuntimeError("cannot load libraries".into()))?;

    // Mark the library loaded before running it so a recursive require of
    // the same name terminates without reloading.
    context.loaded.borrow_mut().insert(trimmed.clone());
    drop(context);

    log::debug!("require: loading library `{trimmed}`");
    let buffer = (load)(&trimmed).map_err(|err| mlua::Error::RuntimeError(err.to_string()))?;
    let chunk = lua
        .load(buffer.as_slice())
        .set_name(trimmed.as_str())
        .into_function()?;
    chunk.call::<_, ()>(())
}

fn invalid_call() -> mlua::Error {
    mlua::Error::RuntimeError("invalid call to require()".into())
}
