//! Built-in types per language

use std::collections::BTreeSet;

const PYTHON: &[&str] = &[
    "object", "type", "None", "bool", "int", "float", "complex", "str", "bytes", "bytearray",
    "list", "tuple", "dict", "set", "frozenset", "range", "slice", "property", "staticmethod",
    "classmethod", "super", "Exception", "BaseException", "ValueError", "TypeError", "KeyError",
    "IndexError", "AttributeError", "RuntimeError", "NotImplementedError", "StopIteration",
    "OSError", "IOError", "Any", "Optional", "Union", "List", "Dict", "Set", "Tuple", "Callable",
    "Iterable", "Iterator", "Sequence", "Mapping", "Generic", "Protocol", "TypeVar", "TypeAlias",
];

const GO: &[&str] = &[
    "bool", "string", "int", "int8", "int16", "int32", "int64", "uint", "uint8", "uint16",
    "uint32", "uint64", "uintptr", "byte", "rune", "float32", "float64", "complex64",
    "complex128", "error", "any", "comparable", "map", "chan", "func", "struct",
];

/// Names that resolve without a declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuiltInTypes {
    names: BTreeSet<String>,
}

impl BuiltInTypes {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn python() -> Self {
        Self::new(PYTHON.iter().copied())
    }

    pub fn go() -> Self {
        Self::new(GO.iter().copied())
    }

    /// Union of two tables, for runs over several languages.
    pub fn extend(&mut self, other: &BuiltInTypes) {
        self.names.extend(other.names.iter().cloned());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extend_merges_languages() {
        let mut built_ins = BuiltInTypes::python();
        built_ins.extend(&BuiltInTypes::go());

        assert!(built_ins.contains("str"));
        assert!(built_ins.contains("float64"));
        assert_eq!(
            built_ins.len(),
            BuiltInTypes::python().len() + BuiltInTypes::go().len() - 2
        );
    }
}
