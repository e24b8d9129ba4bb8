//! The host-side catalog of free functions and native object types.
//!
//! A registry is built up front, wrapped in an `Arc` and shared read-only
//! by every script that consumes it. Registration mistakes (duplicate
//! names, unknown base types, misplaced variadics) are programming errors
//! and abort immediately rather than surfacing at call time.

use crate::callback::{
    Callback, FunctionAdapter, MethodCallback, RebasedMethod, ScriptFunction, ScriptMethod,
    TypedMethod,
};
use crate::value::TypeIdent;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

/// Everything the bridge knows about one registered native type.
pub struct TypeInfo {
    ident: TypeIdent,
    slot: usize,
    bases: Vec<TypeIdent>,
    methods: HashMap<String, Arc<dyn MethodCallback>>,
}

impl TypeInfo {
    pub fn ident(&self) -> TypeIdent {
        self.ident
    }

    /// Direct base types, in registration order.
    pub fn bases(&self) -> &[TypeIdent] {
        &self.bases
    }

    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    /// Stable per-registry index used to key the runtime-side method
    /// table cache.
    pub(crate) fn slot(&self) -> usize {
        self.slot
    }

    pub(crate) fn method(&self, name: &str) -> Option<&Arc<dyn MethodCallback>> {
        self.methods.get(name)
    }

    pub(crate) fn methods(&self) -> impl Iterator<Item = (&String, &Arc<dyn MethodCallback>)> {
        self.methods.iter()
    }
}

/// Catalog of free functions and object types visible to scripts.
#[derive(Default)]
pub struct TypeRegistry {
    functions: HashMap<String, Arc<dyn Callback>>,
    types: HashMap<TypeIdent, TypeInfo>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a native callable under a global name.
    ///
    /// Accepts plain functions and closures; a bound method on a host
    /// object is expressed as a closure capturing that object.
    pub fn add_free_function<F, Args>(&mut self, name: impl Into<String>, function: F)
    where
        F: ScriptFunction<Args>,
        Args: 'static,
    {
        let name = name.into();
        F::check_signature(&name);
        log::trace!("registering free function `{name}`");
        let previous = self
            .functions
            .insert(name.clone(), Arc::new(FunctionAdapter::new(function)));
        if previous.is_some() {
            panic!("add_free_function: duplicate free function `{name}`");
        }
    }

    /// Register a native object type and return a builder for its methods
    /// and base relationships.
    pub fn add_object_type<T>(&mut self) -> ObjectTypeBuilder<'_, T>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let ident = TypeIdent::of::<T>();
        if self.types.contains_key(&ident) {
            panic!(
                "add_object_type: object type `{}` is already registered",
                ident.name()
            );
        }
        log::trace!("registering object type `{}`", ident.name());
        let slot = self.types.len();
        self.types.insert(
            ident,
            TypeInfo {
                ident,
                slot,
                bases: Vec::new(),
                methods: HashMap::new(),
            },
        );
        ObjectTypeBuilder {
            registry: self,
            ident,
            marker: PhantomData,
        }
    }

    pub fn object_type(&self, ident: TypeIdent) -> Option<&TypeInfo> {
        self.types.get(&ident)
    }

    pub fn free_function_names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    pub(crate) fn free_functions(&self) -> impl Iterator<Item = (&str, &Arc<dyn Callback>)> {
        self.functions
            .iter()
            .map(|(name, callback)| (name.as_str(), callback))
    }

    /// Whether `ident`'s registered base chain (transitively) includes
    /// `base`. A type is not considered its own base.
    pub(crate) fn derives_from(&self, ident: TypeIdent, base: TypeIdent) -> bool {
        let Some(info) = self.types.get(&ident) else {
            return false;
        };
        info.bases
            .iter()
            .any(|b| *b == base || self.derives_from(*b, base))
    }
}

/// Builder returned by [`TypeRegistry::add_object_type`].
pub struct ObjectTypeBuilder<'r, T: ?Sized> {
    registry: &'r mut TypeRegistry,
    ident: TypeIdent,
    marker: PhantomData<fn(&T)>,
}

impl<'r, T> ObjectTypeBuilder<'r, T>
where
    T: ?Sized + Send + Sync + 'static,
{
    /// Attach a method under `name`. The callable's first parameter is the
    /// shared receiver (`&T`); remaining parameters follow the same rules
    /// as free functions.
    pub fn with_method<F, Args>(self, name: impl Into<String>, method: F) -> Self
    where
        F: ScriptMethod<T, Args>,
        Args: 'static,
    {
        let name = name.into();
        F::check_signature(&name);
        let info = self
            .registry
            .types
            .get_mut(&self.ident)
            .expect("builder refers to a registered type");
        if info.methods.contains_key(&name) {
            panic!(
                "with_method: duplicate method `{}` on object type `{}`",
                name,
                self.ident.name()
            );
        }
        info.methods
            .insert(name, Arc::new(TypedMethod::<T, F, Args>::new(method)));
        self
    }

    /// Declare `U` as a base of `T` and inherit every method currently
    /// registered on `U`, each wrapped so its receiver is re-viewed as the
    /// base through `upcast`.
    ///
    /// `U` must already be registered. Trait-object upcasting is the usual
    /// shape: `.with_base::<dyn Shape>(|arc| arc.clone())`.
    pub fn with_base<U>(self, upcast: fn(&Arc<T>) -> Arc<U>) -> Self
    where
        U: ?Sized + Send + Sync + 'static,
    {
        let base_ident = TypeIdent::of::<U>();
        if base_ident == self.ident {
            panic!(
                "with_base: object type `{}` cannot be its own base",
                self.ident.name()
            );
        }
        let inherited: Vec<(String, Arc<dyn MethodCallback>)> = {
            let base = self.registry.types.get(&base_ident).unwrap_or_else(|| {
                panic!(
                    "with_base: base type `{}` is not registered",
                    base_ident.name()
                )
            });
            base.methods
                .iter()
                .map(|(name, callback)| (name.clone(), callback.clone()))
                .collect()
        };
        let info = self
            .registry
            .types
            .get_mut(&self.ident)
            .expect("builder refers to a registered type");
        if info.bases.contains(&base_ident) {
            panic!(
                "with_base: duplicate base `{}` on object type `{}`",
                base_ident.name(),
                self.ident.name()
            );
        }
        info.bases.push(base_ident);
        for (name, callback) in inherited {
            if info.methods.contains_key(&name) {
                panic!(
                    "with_base: duplicate method `{}` on object type `{}` (also provided by base `{}`)",
                    name,
                    self.ident.name(),
                    base_ident.name()
                );
            }
            info.methods
                .insert(name, Arc::new(RebasedMethod::<T, U>::new(upcast, callback)));
        }
        self
    }
}
