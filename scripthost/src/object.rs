//! Shared references to native objects inside the runtime.
//!
//! Each script-visible reference is a userdata block holding exactly one
//! strong handle to its referent. Method dispatch goes through an
//! `__index` metamethod that consults a per-type method table, built once
//! on first use and cached in the runtime's registry slot. When the
//! garbage collector reclaims the block, the handle is released exactly
//! once.

use crate::callback::MethodCallback;
use crate::error::wrong_arguments;
use crate::registry::{TypeInfo, TypeRegistry};
use crate::value::{ObjectRef, TypeIdent};
use mlua::{AnyUserData, Lua, MetaMethod, MultiValue, UserData, UserDataMethods};
use std::any::Any;
use std::sync::Arc;

const METHOD_TABLES_KEY: &str = "scripthost.method-tables";

/// Userdata payload: one shared-ownership handle plus the metadata needed
/// for dispatch and identity.
pub(crate) struct ObjectCell {
    ident: TypeIdent,
    address: usize,
    handle: Box<dyn Any + Send + Sync>,
}

impl ObjectCell {
    pub(crate) fn from_arc<T>(handle: Arc<T>) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let address = Arc::as_ptr(&handle).cast::<()>() as usize;
        Self {
            ident: TypeIdent::of::<T>(),
            address,
            handle: Box::new(handle),
        }
    }

    pub(crate) fn ident(&self) -> TypeIdent {
        self.ident
    }

    pub(crate) fn object_ref(&self) -> ObjectRef {
        ObjectRef::new(self.ident, self.address)
    }

    /// The strong handle, if this cell holds exactly a `T`.
    pub(crate) fn shared<T>(&self) -> Option<&Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.handle.downcast_ref::<Arc<T>>()
    }
}

impl UserData for ObjectCell {
    fn add_methods<'lua, M: UserDataMethods<'lua, Self>>(methods: &mut M) {
        methods.add_meta_function(
            MetaMethod::Index,
            |lua, (userdata, key): (AnyUserData, mlua::String)| {
                let cell = userdata.borrow::<ObjectCell>()?;
                method_lookup(lua, &cell, key)
            },
        );
    }
}

/// Push a shared reference, installing the method table for its type on
/// first use.
pub(crate) fn push_object<'lua>(
    lua: &'lua Lua,
    cell: ObjectCell,
) -> mlua::Result<AnyUserData<'lua>> {
    let registry = crate::script::registry_of(lua)?;
    let info = registry.object_type(cell.ident()).ok_or_else(|| {
        mlua::Error::RuntimeError(format!(
            "unregistered object type {}",
            cell.ident().name()
        ))
    })?;
    ensure_method_table(lua, &registry, info)?;
    lua.create_userdata(cell)
}

fn method_tables(lua: &Lua) -> mlua::Result<mlua::Table<'_>> {
    match lua.named_registry_value::<mlua::Value>(METHOD_TABLES_KEY)? {
        mlua::Value::Table(tables) => Ok(tables),
        _ => {
            let tables = lua.create_table()?;
            lua.set_named_registry_value(METHOD_TABLES_KEY, tables.clone())?;
            Ok(tables)
        }
    }
}

fn ensure_method_table(
    lua: &Lua,
    registry: &Arc<TypeRegistry>,
    info: &TypeInfo,
) -> mlua::Result<()> {
    let tables = method_tables(lua)?;
    let slot = info.slot() as i64 + 1;
    if tables.contains_key(slot)? {
        return Ok(());
    }
    let table = lua.create_table()?;
    for (name, callback) in info.methods() {
        table.set(
            name.as_str(),
            method_function(
                lua,
                registry.clone(),
                info.ident(),
                name.clone(),
                callback.clone(),
            )?,
        )?;
    }
    tables.set(slot, table)?;
    log::trace!("built method table for `{}`", info.ident().name());
    Ok(())
}

/// Bind one method adapter as a callable script function.
///
/// The first argument must be an object reference whose type is the
/// expected receiver or registered as deriving from it; in the latter
/// case dispatch is re-routed through the receiver's own flattened method
/// table so the handle is read at its concrete type.
fn method_function<'lua>(
    lua: &'lua Lua,
    registry: Arc<TypeRegistry>,
    expected: TypeIdent,
    name: String,
    callback: Arc<dyn MethodCallback>,
) -> mlua::Result<mlua::Function<'lua>> {
    lua.create_function(move |lua, args: MultiValue| {
        let mut values = args.into_vec().into_iter();
        let receiver = match values.next() {
            Some(mlua::Value::UserData(userdata)) => userdata,
            _ => return Err(wrong_arguments()),
        };
        let cell = receiver.borrow::<ObjectCell>().map_err(|_| wrong_arguments())?;
        let rest = MultiValue::from_vec(values.collect());
        if cell.ident() == expected {
            return callback.invoke(lua, &cell, rest);
        }
        if registry.derives_from(cell.ident(), expected) {
            let info = registry
                .object_type(cell.ident())
                .ok_or_else(wrong_arguments)?;
            if let Some(resolved) = info.method(&name) {
                return resolved.invoke(lua, &cell, rest);
            }
        }
        Err(wrong_arguments())
    })
}

fn method_lookup<'lua>(
    lua: &'lua Lua,
    cell: &ObjectCell,
    key: mlua::String<'lua>,
) -> mlua::Result<mlua::Value<'lua>> {
    let registry = crate::script::registry_of(lua)?;
    let Some(info) = registry.object_type(cell.ident()) else {
        return Ok(mlua::Value::Nil);
    };
    let tables = method_tables(lua)?;
    let table = tables.get::<_, mlua::Table>(info.slot() as i64 + 1)?;
    table.get::<_, mlua::Value>(key)
}
