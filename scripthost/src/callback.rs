//! Type-erased adapters bridging native callables into the script's
//! untyped calling convention.
//!
//! A typed closure is reflected through [`ScriptFunction`] (or
//! [`ScriptMethod`] for receivers) into an adapter that reads its declared
//! arguments from the stack, applies the callable and pushes the result
//! back. Native failures come out as script errors through the runtime's
//! error primitive; the adapter never panics across the boundary.

use crate::error::wrong_arguments;
use crate::marshal::{push_value, ArgReader, FromScript};
use crate::object::ObjectCell;
use crate::value::Value;
use mlua::{Lua, MultiValue};
use std::marker::PhantomData;
use std::sync::Arc;

/// Erased entry point for a free-function adapter.
pub(crate) trait Callback: Send + Sync + 'static {
    fn invoke<'lua>(
        &self,
        lua: &'lua Lua,
        args: MultiValue<'lua>,
    ) -> mlua::Result<MultiValue<'lua>>;
}

/// Erased entry point for a method adapter; the receiver has already been
/// taken off the stack and checked by the dispatcher.
pub(crate) trait MethodCallback: Send + Sync + 'static {
    fn invoke<'lua>(
        &self,
        lua: &'lua Lua,
        receiver: &ObjectCell,
        args: MultiValue<'lua>,
    ) -> mlua::Result<MultiValue<'lua>>;
}

/// Conversion of a native return into stack slots.
///
/// `()` produces no slot, a plain value produces one, and a fallible
/// `anyhow::Result` routes its error text through the runtime's error
/// primitive so the failure becomes script-visible.
pub trait IntoScriptResult {
    fn into_script_result<'lua>(self, lua: &'lua Lua) -> mlua::Result<MultiValue<'lua>>;
}

impl IntoScriptResult for () {
    fn into_script_result<'lua>(self, _lua: &'lua Lua) -> mlua::Result<MultiValue<'lua>> {
        Ok(MultiValue::new())
    }
}

macro_rules! into_script_result_via_value {
    ($($ty:ty)*) => {$(
        impl IntoScriptResult for $ty {
            fn into_script_result<'lua>(self, lua: &'lua Lua) -> mlua::Result<MultiValue<'lua>> {
                let value = push_value(lua, &Value::from(self))?;
                Ok(MultiValue::from_vec(vec![value]))
            }
        }
    )*};
}

into_script_result_via_value!(i8 i16 i32 i64 u8 u16 u32 u64 isize usize f32 f64 bool String Value);

impl<'a> IntoScriptResult for &'a str {
    fn into_script_result<'lua>(self, lua: &'lua Lua) -> mlua::Result<MultiValue<'lua>> {
        let value = push_value(lua, &Value::from(self))?;
        Ok(MultiValue::from_vec(vec![value]))
    }
}

impl<T: IntoScriptResult> IntoScriptResult for Result<T, anyhow::Error> {
    fn into_script_result<'lua>(self, lua: &'lua Lua) -> mlua::Result<MultiValue<'lua>> {
        match self {
            Ok(value) => value.into_script_result(lua),
            Err(err) => Err(mlua::Error::RuntimeError(err.to_string())),
        }
    }
}

/// A native callable with a statically known argument list.
///
/// Implemented for closures and functions of up to eight arguments whose
/// parameters implement [`FromScript`]; the open sequence tail
/// ([`crate::Variadic`]) may appear only in the last position.
pub trait ScriptFunction<Args>: Send + Sync + 'static {
    fn invoke<'lua>(
        &self,
        lua: &'lua Lua,
        args: MultiValue<'lua>,
    ) -> mlua::Result<MultiValue<'lua>>;

    #[doc(hidden)]
    fn check_signature(name: &str);
}

/// A native callable with an explicit receiver of type `T`.
pub trait ScriptMethod<T: ?Sized, Args>: Send + Sync + 'static {
    fn invoke<'lua>(
        &self,
        lua: &'lua Lua,
        receiver: &T,
        args: MultiValue<'lua>,
    ) -> mlua::Result<MultiValue<'lua>>;

    #[doc(hidden)]
    fn check_signature(name: &str);
}

pub(crate) fn ensure_variadic_last(name: &str, variadic: &[bool]) {
    for (position, is_variadic) in variadic.iter().enumerate() {
        if *is_variadic && position + 1 != variadic.len() {
            panic!("variadic arguments must be declared last in `{name}`");
        }
    }
}

macro_rules! impl_script_function {
    ($($arg:ident),*) => {
        impl<Func, Ret, $($arg,)*> ScriptFunction<($($arg,)*)> for Func
        where
            Func: Fn($($arg),*) -> Ret + Send + Sync + 'static,
            Ret: IntoScriptResult,
            $($arg: FromScript + 'static,)*
        {
            #[allow(non_snake_case)]
            fn invoke<'lua>(
                &self,
                lua: &'lua Lua,
                args: MultiValue<'lua>,
            ) -> mlua::Result<MultiValue<'lua>> {
                let mut reader = ArgReader::new(args);
                $(let $arg = <$arg as FromScript>::from_script(&mut reader)?;)*
                reader.finish()?;
                (self)($($arg),*).into_script_result(lua)
            }

            fn check_signature(name: &str) {
                let variadic: &[bool] = &[$(<$arg as FromScript>::is_variadic()),*];
                ensure_variadic_last(name, variadic);
            }
        }

        impl<Func, Ret, This, $($arg,)*> ScriptMethod<This, ($($arg,)*)> for Func
        where
            This: ?Sized + 'static,
            Func: Fn(&This, $($arg),*) -> Ret + Send + Sync + 'static,
            Ret: IntoScriptResult,
            $($arg: FromScript + 'static,)*
        {
            #[allow(non_snake_case)]
            fn invoke<'lua>(
                &self,
                lua: &'lua Lua,
                receiver: &This,
                args: MultiValue<'lua>,
            ) -> mlua::Result<MultiValue<'lua>> {
                let mut reader = ArgReader::new(args);
                $(let $arg = <$arg as FromScript>::from_script(&mut reader)?;)*
                reader.finish()?;
                (self)(receiver, $($arg),*).into_script_result(lua)
            }

            fn check_signature(name: &str) {
                let variadic: &[bool] = &[$(<$arg as FromScript>::is_variadic()),*];
                ensure_variadic_last(name, variadic);
            }
        }
    };
}

impl_script_function!();
impl_script_function!(A1);
impl_script_function!(A1, A2);
impl_script_function!(A1, A2, A3);
impl_script_function!(A1, A2, A3, A4);
impl_script_function!(A1, A2, A3, A4, A5);
impl_script_function!(A1, A2, A3, A4, A5, A6);
impl_script_function!(A1, A2, A3, A4, A5, A6, A7);
impl_script_function!(A1, A2, A3, A4, A5, A6, A7, A8);

/// Adapter wrapping a [`ScriptFunction`] behind the erased [`Callback`].
pub(crate) struct FunctionAdapter<F, Args> {
    function: F,
    args: PhantomData<fn(Args)>,
}

impl<F, Args> FunctionAdapter<F, Args>
where
    F: ScriptFunction<Args>,
    Args: 'static,
{
    pub(crate) fn new(function: F) -> Self {
        Self {
            function,
            args: PhantomData,
        }
    }
}

impl<F, Args> Callback for FunctionAdapter<F, Args>
where
    F: ScriptFunction<Args>,
    Args: 'static,
{
    fn invoke<'lua>(
        &self,
        lua: &'lua Lua,
        args: MultiValue<'lua>,
    ) -> mlua::Result<MultiValue<'lua>> {
        self.function.invoke(lua, args)
    }
}

/// Adapter binding a [`ScriptMethod`] to its concrete receiver type.
///
/// The receiver cell must hold a shared handle to exactly `T`; the
/// dispatcher routes base-typed adapters through the cell's own flattened
/// method table instead.
pub(crate) struct TypedMethod<T: ?Sized, F, Args> {
    method: F,
    marker: PhantomData<fn(&T, Args)>,
}

impl<T, F, Args> TypedMethod<T, F, Args>
where
    T: ?Sized + Send + Sync + 'static,
    F: ScriptMethod<T, Args>,
    Args: 'static,
{
    pub(crate) fn new(method: F) -> Self {
        Self {
            method,
            marker: PhantomData,
        }
    }
}

impl<T, F, Args> MethodCallback for TypedMethod<T, F, Args>
where
    T: ?Sized + Send + Sync + 'static,
    F: ScriptMethod<T, Args>,
    Args: 'static,
{
    fn invoke<'lua>(
        &self,
        lua: &'lua Lua,
        receiver: &ObjectCell,
        args: MultiValue<'lua>,
    ) -> mlua::Result<MultiValue<'lua>> {
        let shared = receiver.shared::<T>().ok_or_else(wrong_arguments)?;
        self.method.invoke(lua, &**shared, args)
    }
}

/// A base-type method inherited by a derived registration.
///
/// Reads the receiver as the derived type, re-views the shared handle as
/// the base through the registration's upcast, and delegates to the base
/// adapter.
pub(crate) struct RebasedMethod<T: ?Sized, U: ?Sized> {
    upcast: fn(&Arc<T>) -> Arc<U>,
    inner: Arc<dyn MethodCallback>,
}

impl<T, U> RebasedMethod<T, U>
where
    T: ?Sized + Send + Sync + 'static,
    U: ?Sized + Send + Sync + 'static,
{
    pub(crate) fn new(upcast: fn(&Arc<T>) -> Arc<U>, inner: Arc<dyn MethodCallback>) -> Self {
        Self { upcast, inner }
    }
}

impl<T, U> MethodCallback for RebasedMethod<T, U>
where
    T: ?Sized + Send + Sync + 'static,
    U: ?Sized + Send + Sync + 'static,
{
    fn invoke<'lua>(
        &self,
        lua: &'lua Lua,
        receiver: &ObjectCell,
        args: MultiValue<'lua>,
    ) -> mlua::Result<MultiValue<'lua>> {
        let shared = receiver.shared::<T>().ok_or_else(wrong_arguments)?;
        let base = ObjectCell::from_arc((self.upcast)(shared));
        self.inner.invoke(lua, &base, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Variadic;
    use std::sync::Mutex;

    #[test]
    fn zero_argument_function_produces_no_slots() {
        let lua = Lua::new();
        let adapter = FunctionAdapter::new(|| {});
        let out = adapter.invoke(&lua, MultiValue::new()).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn return_values_produce_one_slot() {
        let lua = Lua::new();
        let adapter = FunctionAdapter::new(|x: i64| x * 2);
        let out = adapter
            .invoke(&lua, MultiValue::from_vec(vec![mlua::Value::Integer(21)]))
            .unwrap();
        let values = out.into_vec();
        assert_eq!(values.len(), 1);
        assert!(matches!(values[0], mlua::Value::Integer(42)));
    }

    #[test]
    fn native_failures_surface_their_reason() {
        let lua = Lua::new();
        let adapter = FunctionAdapter::new(|| -> anyhow::Result<()> {
            Err(anyhow::anyhow!("native failure"))
        });
        let err = adapter.invoke(&lua, MultiValue::new()).unwrap_err();
        assert!(err.to_string().contains("native failure"));
    }

    #[test]
    fn arity_mismatch_never_reaches_the_body() {
        let lua = Lua::new();
        let reached = std::sync::Arc::new(Mutex::new(false));
        let flag = reached.clone();
        let adapter = FunctionAdapter::new(move |_: String| {
            *flag.lock().unwrap() = true;
        });
        let err = adapter
            .invoke(&lua, MultiValue::from_vec(vec![]))
            .unwrap_err();
        assert!(err.to_string().contains("insufficient arguments"));
        assert!(!*reached.lock().unwrap());
    }

    #[test]
    fn variadic_tail_collects_everything() {
        let lua = Lua::new();
        let seen = std::sync::Arc::new(Mutex::new(None));
        let sink = seen.clone();
        let adapter = FunctionAdapter::new(move |first: i64, rest: Variadic| {
            *sink.lock().unwrap() = Some((first, rest.0.clone()));
        });
        let hello = lua.create_string("Hi").unwrap();
        adapter
            .invoke(
                &lua,
                MultiValue::from_vec(vec![
                    mlua::Value::Integer(42),
                    mlua::Value::String(hello),
                    mlua::Value::Integer(2),
                    mlua::Value::Number(4.51),
                ]),
            )
            .unwrap();
        let seen = seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen.0, 42);
        assert_eq!(
            seen.1,
            vec![
                Value::String("Hi".into()),
                Value::Integer(2),
                Value::Float(4.51)
            ]
        );
    }

    #[test]
    #[should_panic(expected = "variadic arguments must be declared last")]
    fn variadic_anywhere_else_aborts() {
        fn takes(_rest: Variadic, _x: i64) {}
        <fn(Variadic, i64) as ScriptFunction<(Variadic, i64)>>::check_signature("takes");
        let _ = takes;
    }
}
