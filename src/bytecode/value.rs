//! Runtime values for the Ash VM.

use std::fmt;
use std::hash::{BuildHasher, Hasher};
use std::rc::Rc;

use indexmap::IndexMap;

/// Hash entries preserve insertion order, so inspect output is stable.
pub type HashEntries = IndexMap<HashKey, HashPair, ahash::RandomState>;

/// A runtime value.
#[derive(Debug, Clone)]
pub enum Value {
    /// Integer value
    Int(i64),
    /// Boolean value
    Bool(bool),
    /// Null value
    Null,
    /// String value
    String(Rc<String>),
    /// Array value
    Array(Rc<Vec<Value>>),
    /// Hash value, keyed by the hashable subset of values
    Hash(Rc<HashEntries>),
    /// Compiled function value
    Function(Rc<CompiledFunction>),
}

/// The key type of a Hash: a type tag plus the value itself or, for
/// strings, a 64-bit content hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashKey {
    Int(i64),
    Bool(bool),
    Str(u64),
}

/// A hash entry retains the original key value for inspection.
#[derive(Debug, Clone)]
pub struct HashPair {
    pub key: Value,
    pub value: Value,
}

/// A function lowered to bytecode.
///
/// `num_locals` counts the parameters plus every let-bound name in the
/// body; the VM reserves exactly that many stack slots on entry.
#[derive(Debug)]
pub struct CompiledFunction {
    pub instructions: Vec<u8>,
    pub num_locals: usize,
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "INTEGER",
            Value::Bool(_) => "BOOLEAN",
            Value::Null => "NULL",
            Value::String(_) => "STRING",
            Value::Array(_) => "ARRAY",
            Value::Hash(_) => "HASH",
            Value::Function(_) => "COMPILED_FUNCTION",
        }
    }

    /// Only false and null are falsy; every other value (including 0 and
    /// empty containers) is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Null => false,
            _ => true,
        }
    }

    /// The hash key for this value, or None if the type is not hashable.
    pub fn hash_key(&self) -> Option<HashKey> {
        match self {
            Value::Int(n) => Some(HashKey::Int(*n)),
            Value::Bool(b) => Some(HashKey::Bool(*b)),
            Value::String(s) => Some(HashKey::Str(content_hash(s))),
            _ => None,
        }
    }
}

/// 64-bit content hash for string hash keys. The seeds are fixed so equal
/// strings map to the same key in every run.
fn content_hash(s: &str) -> u64 {
    let mut hasher = ahash::RandomState::with_seeds(
        0x9e37_79b9_7f4a_7c15,
        0x6a09_e667_f3bc_c909,
        0xbb67_ae85_84ca_a73b,
        0x3c6e_f372_fe94_f82b,
    )
    .build_hasher();
    hasher.write(s.as_bytes());
    hasher.finish()
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::String(a), Value::String(b)) => a == b,
            // Composites compare by identity only
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Hash(a), Value::Hash(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Null => write!(f, "null"),
            Value::String(s) => write!(f, "{}", s),
            Value::Array(elements) => {
                write!(f, "[")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, "]")
            }
            Value::Hash(entries) => {
                write!(f, "{{")?;
                for (i, pair) in entries.values().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", pair.key, pair.value)?;
                }
                write!(f, "}}")
            }
            Value::Function(func) => write!(f, "CompiledFunction[{:p}]", Rc::as_ptr(func)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inspect() {
        assert_eq!(Value::Int(-42).to_string(), "-42");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(
            Value::String(Rc::new("hello".to_string())).to_string(),
            "hello"
        );
        assert_eq!(
            Value::Array(Rc::new(vec![Value::Int(1), Value::Int(2)])).to_string(),
            "[1, 2]"
        );
    }

    #[test]
    fn test_hash_inspect_preserves_insertion_order() {
        let mut entries = HashEntries::default();
        for n in [3, 1, 2] {
            let key = Value::Int(n);
            entries.insert(
                key.hash_key().unwrap(),
                HashPair {
                    key,
                    value: Value::Int(n * 10),
                },
            );
        }
        assert_eq!(
            Value::Hash(Rc::new(entries)).to_string(),
            "{3: 30, 1: 10, 2: 20}"
        );
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::Null.is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Int(0).is_truthy());
        assert!(Value::String(Rc::new(String::new())).is_truthy());
        assert!(Value::Array(Rc::new(Vec::new())).is_truthy());
    }

    #[test]
    fn test_hash_keys() {
        let a = Value::String(Rc::new("name".to_string()));
        let b = Value::String(Rc::new("name".to_string()));
        assert_eq!(a.hash_key(), b.hash_key());

        assert_eq!(Value::Int(1).hash_key(), Some(HashKey::Int(1)));
        assert_ne!(Value::Int(1).hash_key(), Value::Bool(true).hash_key());
        assert_eq!(Value::Array(Rc::new(Vec::new())).hash_key(), None);
        assert_eq!(Value::Null.hash_key(), None);
    }

    #[test]
    fn test_value_equality() {
        assert_eq!(Value::Int(5), Value::Int(5));
        assert_ne!(Value::Int(5), Value::Int(6));
        assert_eq!(
            Value::String(Rc::new("a".to_string())),
            Value::String(Rc::new("a".to_string()))
        );
        assert_ne!(Value::Int(1), Value::Bool(true));
    }

    #[test]
    fn test_composites_compare_by_identity() {
        let arr = Rc::new(vec![Value::Int(1)]);
        assert_eq!(Value::Array(arr.clone()), Value::Array(arr.clone()));
        assert_ne!(
            Value::Array(Rc::new(vec![Value::Int(1)])),
            Value::Array(Rc::new(vec![Value::Int(1)]))
        );
    }
}
