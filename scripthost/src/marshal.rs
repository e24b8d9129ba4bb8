//! Strict reads and writes between host values and runtime stack slots.
//!
//! Nothing here coerces: a number never reads as a string, a string never
//! reads as a number. The runtime distinguishes integer-shaped from
//! float-shaped number slots and the distinction is preserved.

use crate::error::{insufficient_arguments, wrong_arguments};
use crate::object::ObjectCell;
use crate::value::{Value, Variadic};
use mlua::{Lua, MultiValue};

/// Read one stack slot as a generic [`Value`].
///
/// Object references read as identity-only values. Any slot kind outside
/// the value model (tables, functions, threads) is a runtime error.
pub(crate) fn read_value(value: &mlua::Value) -> mlua::Result<Value> {
    match value {
        mlua::Value::Nil => Ok(Value::Nil),
        mlua::Value::Boolean(b) => Ok(Value::Boolean(*b)),
        mlua::Value::Integer(i) => Ok(Value::Integer(*i)),
        mlua::Value::Number(n) => Ok(Value::Float(*n)),
        mlua::Value::String(s) => Ok(Value::String(
            s.to_str().map_err(|_| wrong_arguments())?.to_owned(),
        )),
        mlua::Value::UserData(ud) => {
            let cell = ud.borrow::<ObjectCell>().map_err(|_| wrong_arguments())?;
            Ok(Value::Object(cell.object_ref()))
        }
        _ => Err(wrong_arguments()),
    }
}

/// Push a [`Value`] as one stack slot.
///
/// Integer values take the runtime's integer path so the script observes
/// an integer-shaped number. Object values are identity-only and cannot be
/// revived into a live reference.
pub(crate) fn push_value<'lua>(lua: &'lua Lua, value: &Value) -> mlua::Result<mlua::Value<'lua>> {
    Ok(match value {
        Value::Nil => mlua::Value::Nil,
        Value::Boolean(b) => mlua::Value::Boolean(*b),
        Value::Integer(i) => mlua::Value::Integer(*i),
        Value::Float(f) => mlua::Value::Number(*f),
        Value::String(s) => mlua::Value::String(lua.create_string(s)?),
        Value::Object(r) => {
            return Err(mlua::Error::RuntimeError(format!(
                "cannot marshal a detached reference to {}",
                r.type_name()
            )))
        }
    })
}

/// Cursor over the positional arguments of one call.
pub struct ArgReader<'lua> {
    values: std::vec::IntoIter<mlua::Value<'lua>>,
}

impl<'lua> ArgReader<'lua> {
    pub(crate) fn new(args: MultiValue<'lua>) -> Self {
        Self {
            values: args.into_vec().into_iter(),
        }
    }

    pub fn next_value(&mut self) -> Option<mlua::Value<'lua>> {
        self.values.next()
    }

    /// Every declared argument has been read; anything left on the stack
    /// means the caller passed too many.
    pub fn finish(mut self) -> mlua::Result<()> {
        if self.values.next().is_some() {
            return Err(wrong_arguments());
        }
        Ok(())
    }
}

/// Strictly-typed positional argument reads.
///
/// Integer and float targets accept only number-shaped slots (integer
/// targets truncate with a numeric cast); string targets only
/// string-shaped slots; boolean targets only booleans. A missing argument
/// reports the insufficient-argument wording.
pub trait FromScript: Sized {
    fn from_script(reader: &mut ArgReader<'_>) -> mlua::Result<Self>;

    #[doc(hidden)]
    fn is_variadic() -> bool {
        false
    }
}

macro_rules! integer_from_script {
    ($($ty:ty)*) => {$(
        impl FromScript for $ty {
            #[allow(clippy::unnecessary_cast)]
            fn from_script(reader: &mut ArgReader<'_>) -> mlua::Result<Self> {
                match reader.next_value().ok_or_else(insufficient_arguments)? {
                    mlua::Value::Integer(i) => Ok(i as $ty),
                    mlua::Value::Number(n) => Ok(n as $ty),
                    _ => Err(wrong_arguments()),
                }
            }
        }
    )*};
}

integer_from_script!(i8 i16 i32 i64 u8 u16 u32 u64 isize usize);

macro_rules! float_from_script {
    ($($ty:ty)*) => {$(
        impl FromScript for $ty {
            #[allow(clippy::unnecessary_cast)]
            fn from_script(reader: &mut ArgReader<'_>) -> mlua::Result<Self> {
                match reader.next_value().ok_or_else(insufficient_arguments)? {
                    mlua::Value::Integer(i) => Ok(i as $ty),
                    mlua::Value::Number(n) => Ok(n as $ty),
                    _ => Err(wrong_arguments()),
                }
            }
        }
    )*};
}

float_from_script!(f32 f64);

impl FromScript for bool {
    fn from_script(reader: &mut ArgReader<'_>) -> mlua::Result<Self> {
        match reader.next_value().ok_or_else(insufficient_arguments)? {
            mlua::Value::Boolean(b) => Ok(b),
            _ => Err(wrong_arguments()),
        }
    }
}

impl FromScript for String {
    fn from_script(reader: &mut ArgReader<'_>) -> mlua::Result<Self> {
        match reader.next_value().ok_or_else(insufficient_arguments)? {
            mlua::Value::String(s) => Ok(s.to_str().map_err(|_| wrong_arguments())?.to_owned()),
            _ => Err(wrong_arguments()),
        }
    }
}

impl FromScript for Value {
    fn from_script(reader: &mut ArgReader<'_>) -> mlua::Result<Self> {
        let value = reader.next_value().ok_or_else(insufficient_arguments)?;
        read_value(&value)
    }
}

impl FromScript for Variadic {
    fn from_script(reader: &mut ArgReader<'_>) -> mlua::Result<Self> {
        let mut values = Vec::new();
        while let Some(value) = reader.next_value() {
            values.push(read_value(&value)?);
        }
        Ok(Variadic(values))
    }

    fn is_variadic() -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader_of(values: Vec<mlua::Value>) -> ArgReader<'_> {
        ArgReader::new(MultiValue::from_vec(values))
    }

    #[test]
    fn generic_read_preserves_number_shape() {
        let lua = Lua::new();
        assert_eq!(
            read_value(&mlua::Value::Integer(2)).unwrap(),
            Value::Integer(2)
        );
        assert_eq!(
            read_value(&mlua::Value::Number(4.51)).unwrap(),
            Value::Float(4.51)
        );
        let s = lua.create_string("Hi").unwrap();
        assert_eq!(
            read_value(&mlua::Value::String(s)).unwrap(),
            Value::String("Hi".into())
        );
    }

    #[test]
    fn generic_read_rejects_tables() {
        let lua = Lua::new();
        let table = lua.create_table().unwrap();
        let err = read_value(&mlua::Value::Table(table)).unwrap_err();
        assert!(err.to_string().contains("wrong arguments to function"));
    }

    #[test]
    fn integer_push_takes_the_integer_path() {
        let lua = Lua::new();
        let pushed = push_value(&lua, &Value::Integer(42)).unwrap();
        assert!(matches!(pushed, mlua::Value::Integer(42)));
        let pushed = push_value(&lua, &Value::Float(42.0)).unwrap();
        assert!(matches!(pushed, mlua::Value::Number(_)));
    }

    #[test]
    fn strict_integer_rejects_strings() {
        let lua = Lua::new();
        let s = lua.create_string("2").unwrap();
        let mut reader = reader_of(vec![mlua::Value::String(s)]);
        assert!(i32::from_script(&mut reader).is_err());
    }

    #[test]
    fn strict_integer_truncates_floats() {
        let mut reader = reader_of(vec![mlua::Value::Number(4.9)]);
        assert_eq!(i32::from_script(&mut reader).unwrap(), 4);
    }

    #[test]
    fn strict_string_rejects_numbers() {
        let mut reader = reader_of(vec![mlua::Value::Integer(2)]);
        assert!(String::from_script(&mut reader).is_err());
    }

    #[test]
    fn missing_argument_reports_insufficient() {
        let mut reader = reader_of(vec![]);
        let err = i64::from_script(&mut reader).unwrap_err();
        assert!(err.to_string().contains("insufficient arguments"));
    }

    #[test]
    fn surplus_argument_reports_wrong_arguments() {
        let mut reader = reader_of(vec![mlua::Value::Integer(1), mlua::Value::Integer(2)]);
        let _ = i64::from_script(&mut reader).unwrap();
        let err = reader.finish().unwrap_err();
        assert!(err.to_string().contains("wrong arguments"));
    }

    #[test]
    fn variadic_drains_the_tail() {
        let lua = Lua::new();
        let s = lua.create_string("Hi").unwrap();
        let mut reader = reader_of(
            vec![
                mlua::Value::String(s),
                mlua::Value::Integer(2),
                mlua::Value::Number(4.51),
            ],
        );
        let tail = Variadic::from_script(&mut reader).unwrap();
        assert_eq!(
            tail.0,
            vec![
                Value::String("Hi".into()),
                Value::Integer(2),
                Value::Float(4.51)
            ]
        );
        reader.finish().unwrap();
    }
}
