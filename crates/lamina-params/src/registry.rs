use crate::definition::ParameterDefinition;
use crate::error::{ParseFailure, ValidationFailure};
use crate::parse;
use crate::types::ParameterType;
use crate::value::{FileData, ParamValue, RawValue, Secret};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;

/// Parse, validate and zero-value rules for one parameter type.
///
/// Responsibilities:
/// - Turn a raw source contribution into a typed value (pure, total)
/// - Reject typed values that break type-level or definition-level rules
/// - Provide the zero value used when a caller asks for one
pub trait TypeHandler: Send + Sync {
    fn parse(
        &self,
        definition: &ParameterDefinition,
        raw: &RawValue,
    ) -> Result<ParamValue, ParseFailure>;

    fn validate(
        &self,
        definition: &ParameterDefinition,
        value: &ParamValue,
    ) -> Result<(), ValidationFailure> {
        definition.constraints.check(value)
    }

    fn zero(&self, definition: &ParameterDefinition) -> ParamValue;
}

/// Handler implementing the built-in grammar of each [`ParameterType`].
#[derive(Debug, Clone, Copy)]
pub struct BuiltinHandler(pub ParameterType);

impl TypeHandler for BuiltinHandler {
    fn parse(
        &self,
        _definition: &ParameterDefinition,
        raw: &RawValue,
    ) -> Result<ParamValue, ParseFailure> {
        parse::parse_raw(self.0, raw)
    }

    fn validate(
        &self,
        definition: &ParameterDefinition,
        value: &ParamValue,
    ) -> Result<(), ValidationFailure> {
        if !value.fits(self.0) {
            return Err(ValidationFailure::new(format!(
                "a {} value cannot be stored in a {} parameter",
                value.kind_name(),
                self.0
            )));
        }
        if self.0.is_choice() && definition.constraints.choices.is_empty() {
            return Err(ValidationFailure::new("no choices declared"));
        }
        definition.constraints.check(value)
    }

    fn zero(&self, _definition: &ParameterDefinition) -> ParamValue {
        use ParameterType as T;
        match self.0 {
            T::String | T::Choice | T::StringFromFile => ParamValue::String(String::new()),
            T::Secret => ParamValue::Secret(Secret::default()),
            T::Integer => ParamValue::Integer(0),
            T::Float => ParamValue::Float(0.0),
            T::Bool => ParamValue::Bool(false),
            T::Date => ParamValue::Date(DateTime::<Utc>::UNIX_EPOCH),
            T::StringList | T::ChoiceList | T::StringListFromFile => {
                ParamValue::StringList(Vec::new())
            }
            T::IntegerList => ParamValue::IntegerList(Vec::new()),
            T::FloatList => ParamValue::FloatList(Vec::new()),
            T::File => ParamValue::File(FileData::default()),
            T::FileList => ParamValue::FileList(Vec::new()),
            T::KeyValue => ParamValue::KeyValue(IndexMap::new()),
        }
    }
}

/// Explicit registry mapping each parameter type to its handler.
///
/// Built once at process start and passed to layer construction and to the
/// resolver; there is no global instance.
#[derive(Clone)]
pub struct TypeRegistry {
    handlers: HashMap<ParameterType, Arc<dyn TypeHandler>>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<_> = self.handlers.keys().collect();
        kinds.sort();
        f.debug_struct("TypeRegistry").field("types", &kinds).finish()
    }
}

impl TypeRegistry {
    /// Registry with no handlers
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registry with a [`BuiltinHandler`] for every parameter type
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        for ty in ParameterType::ALL {
            registry.register(ty, Arc::new(BuiltinHandler(ty)));
        }
        registry
    }

    /// Install a handler, returning the one it replaces
    pub fn register(
        &mut self,
        ty: ParameterType,
        handler: Arc<dyn TypeHandler>,
    ) -> Option<Arc<dyn TypeHandler>> {
        self.handlers.insert(ty, handler)
    }

    pub fn handler(&self, ty: ParameterType) -> Option<&dyn TypeHandler> {
        self.handlers.get(&ty).map(|h| h.as_ref())
    }

    pub fn contains(&self, ty: ParameterType) -> bool {
        self.handlers.contains_key(&ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct UpperCase;

    impl TypeHandler for UpperCase {
        fn parse(
            &self,
            _definition: &ParameterDefinition,
            raw: &RawValue,
        ) -> Result<ParamValue, ParseFailure> {
            match raw {
                RawValue::Text(s) => Ok(ParamValue::String(s.to_uppercase())),
                _ => Err(ParseFailure::new("text", "unsupported")),
            }
        }

        fn zero(&self, _definition: &ParameterDefinition) -> ParamValue {
            ParamValue::String(String::new())
        }
    }

    #[test]
    fn test_standard_registry_covers_all_types() {
        let registry = TypeRegistry::standard();
        for ty in ParameterType::ALL {
            assert!(registry.contains(ty), "missing handler for {}", ty);
        }
    }

    #[test]
    fn test_register_replaces_handler() {
        let mut registry = TypeRegistry::standard();
        let previous = registry.register(ParameterType::String, Arc::new(UpperCase));
        assert!(previous.is_some());

        let def = ParameterDefinition::new("name", ParameterType::String);
        let handler = registry.handler(ParameterType::String).expect("handler");
        assert_eq!(
            handler.parse(&def, &RawValue::from("abc")),
            Ok(ParamValue::from("ABC"))
        );
    }

    #[test]
    fn test_builtin_validate_rejects_wrong_shape() {
        let def = ParameterDefinition::new("n", ParameterType::Integer);
        let handler = BuiltinHandler(ParameterType::Integer);
        assert!(handler.validate(&def, &ParamValue::from("x")).is_err());
        assert!(handler.validate(&def, &ParamValue::Integer(1)).is_ok());
    }

    #[test]
    fn test_zero_values() {
        let def = ParameterDefinition::new("flag", ParameterType::Bool);
        assert_eq!(
            BuiltinHandler(ParameterType::Bool).zero(&def),
            ParamValue::Bool(false)
        );
        assert_eq!(
            BuiltinHandler(ParameterType::KeyValue).zero(&def),
            ParamValue::KeyValue(IndexMap::new())
        );
    }
}
