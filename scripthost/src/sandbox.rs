//! The whitelisted environment scripts run in.
//!
//! A fresh state opens only the table, string, math and utf8 libraries
//! (the base library always comes along; coroutine is opened for the
//! runtime's own use). Everything in the base library outside the
//! whitelist is removed before any script code runs, and the coroutine
//! table itself is hidden after its yield primitive has been re-exported
//! as the global `yield`.

use mlua::{Lua, LuaOptions, StdLib};

/// Base-library names scripts are allowed to see.
const BASE_WHITELIST: &[&str] = &[
    "assert", "pairs", "ipairs", "next", "select", "tonumber", "tostring", "type", "_G",
    "_VERSION",
];

/// Whole libraries imported for scripts.
const LIBRARIES: &[&str] = &["table", "string", "math", "utf8"];

pub(crate) fn new_state() -> mlua::Result<Lua> {
    Lua::new_with(
        StdLib::TABLE | StdLib::STRING | StdLib::MATH | StdLib::UTF8 | StdLib::COROUTINE,
        LuaOptions::default(),
    )
}

pub(crate) fn apply(lua: &Lua) -> mlua::Result<()> {
    let globals = lua.globals();

    // The cooperative yield point survives as a bare global; the rest of
    // the coroutine library is stripped with everything else below.
    let coroutine = globals.get::<_, mlua::Table>("coroutine")?;
    let yield_function = coroutine.get::<_, mlua::Function>("yield")?;

    let mut doomed = Vec::new();
    for pair in globals.clone().pairs::<mlua::Value, mlua::Value>() {
        let (key, _) = pair?;
        let keep = match &key {
            mlua::Value::String(name) => match name.to_str() {
                Ok(name) => BASE_WHITELIST.contains(&name) || LIBRARIES.contains(&name),
                Err(_) => false,
            },
            _ => false,
        };
        if !keep {
            doomed.push(key);
        }
    }
    for key in doomed {
        globals.raw_set(key, mlua::Value::Nil)?;
    }

    globals.set("yield", yield_function)?;
    Ok(())
}
