// crates/admin-verify-core/src/shape.rs
// ============================================================================
// Module: Schema Assertion Engine
// Description: Structural validation of JSON bodies against shape descriptors.
// Purpose: Separate unparseable bodies from well-formed bodies of the wrong shape.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! A [`Shape`] is a structural expectation: value type, required keys, and
//! per-element shapes for arrays. Validation is not exact: extra keys are
//! tolerated, while presence and type of required keys are mandatory.
//! Unparseable bodies fail with [`VerifyError::MalformedBody`]; parsed bodies
//! that do not match fail with [`VerifyError::ShapeViolation`] carrying a
//! JSON pointer to the first mismatch.
//!
//! ## Invariants
//! - `numeric` accepts integer and floating-point representations alike.
//! - `integer` rejects floating-point representations, even `3.0`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;

use crate::error::VerifyError;
use crate::error::VerifyResult;

// ============================================================================
// SECTION: Descriptors
// ============================================================================

/// Structural expectation for a JSON value.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Any value, including null.
    Any,
    /// A JSON string.
    String,
    /// A JSON boolean.
    Boolean,
    /// An integer, optionally bounded below.
    Integer {
        /// Inclusive lower bound.
        min: Option<i64>,
    },
    /// Any JSON number.
    Numeric,
    /// A value equal to the given constant.
    Equals(Value),
    /// An array whose elements all match a shape.
    Array(ArrayShape),
    /// An object with required keys.
    Object(ObjectShape),
    /// Any one of the alternatives.
    OneOf(Vec<Shape>),
}

/// Array expectation.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayShape {
    /// Shape every element must match.
    pub items: Box<Shape>,
    /// Minimum number of elements.
    pub min_items: usize,
}

/// Key presence rule for an object field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Key must be present.
    Required,
    /// Key may be absent; if present it must match.
    Optional,
}

/// One keyed field of an object expectation.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Key name.
    pub name: String,
    /// Expected value shape.
    pub shape: Shape,
    /// Presence rule.
    pub presence: Presence,
    /// Whether `null` is accepted in place of the shape.
    pub nullable: bool,
}

/// Object expectation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectShape {
    /// Keyed field expectations.
    pub fields: Vec<Field>,
    /// At least one of these keys must be present (ignored when empty).
    pub any_of_keys: Vec<String>,
    /// Object must contain at least one key.
    pub non_empty: bool,
}

impl ObjectShape {
    /// Adds a required key.
    #[must_use]
    pub fn field(mut self, name: &str, shape: Shape) -> Self {
        self.fields.push(Field {
            name: name.to_string(),
            shape,
            presence: Presence::Required,
            nullable: false,
        });
        self
    }

    /// Adds an optional key that may also be null.
    #[must_use]
    pub fn optional(mut self, name: &str, shape: Shape) -> Self {
        self.fields.push(Field {
            name: name.to_string(),
            shape,
            presence: Presence::Optional,
            nullable: true,
        });
        self
    }

    /// Requires at least one of `keys` to be present.
    #[must_use]
    pub fn any_of_keys(mut self, keys: &[&str]) -> Self {
        self.any_of_keys = keys.iter().map(|key| (*key).to_string()).collect();
        self
    }

    /// Requires the object to contain at least one key.
    #[must_use]
    pub const fn non_empty(mut self) -> Self {
        self.non_empty = true;
        self
    }
}

impl From<ObjectShape> for Shape {
    fn from(object: ObjectShape) -> Self {
        Self::Object(object)
    }
}

impl Shape {
    /// Starts an object expectation.
    #[must_use]
    pub fn object() -> ObjectShape {
        ObjectShape::default()
    }

    /// Any integer.
    #[must_use]
    pub const fn integer() -> Self {
        Self::Integer {
            min: None,
        }
    }

    /// Integer greater than or equal to `min`.
    #[must_use]
    pub const fn integer_at_least(min: i64) -> Self {
        Self::Integer {
            min: Some(min),
        }
    }

    /// Array of `items`, possibly empty.
    #[must_use]
    pub fn array_of(items: Self) -> Self {
        Self::Array(ArrayShape {
            items: Box::new(items),
            min_items: 0,
        })
    }

    /// Array of `items` with at least one element.
    #[must_use]
    pub fn non_empty_array_of(items: Self) -> Self {
        Self::Array(ArrayShape {
            items: Box::new(items),
            min_items: 1,
        })
    }

    /// A bare array of `items` or an object wrapping it under `key`.
    #[must_use]
    pub fn list_or_envelope(key: &str, items: Self) -> Self {
        let list = Self::array_of(items);
        Self::OneOf(vec![list.clone(), Self::object().field(key, list).into()])
    }

    /// Human-readable description used in violation messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Any => "any value".to_string(),
            Self::String => "string".to_string(),
            Self::Boolean => "boolean".to_string(),
            Self::Integer {
                min: None,
            } => "integer".to_string(),
            Self::Integer {
                min: Some(min),
            } => format!("integer >= {min}"),
            Self::Numeric => "number".to_string(),
            Self::Equals(value) => format!("constant {value}"),
            Self::Array(array) if array.min_items > 0 => {
                format!("array with at least {} element(s)", array.min_items)
            }
            Self::Array(_) => "array".to_string(),
            Self::Object(_) => "object".to_string(),
            Self::OneOf(options) => {
                let labels: Vec<String> = options.iter().map(Self::describe).collect();
                format!("one of ({})", labels.join(" | "))
            }
        }
    }
}

// ============================================================================
// SECTION: Assertions
// ============================================================================

/// Parses `body` as JSON.
///
/// # Errors
///
/// Returns [`VerifyError::MalformedBody`] when the body is empty or not JSON.
pub fn parse_json(context: &str, body: &[u8]) -> VerifyResult<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(VerifyError::MalformedBody {
            context: context.to_string(),
            message: "empty body where JSON was required".to_string(),
        });
    }
    serde_json::from_slice(body).map_err(|err| VerifyError::MalformedBody {
        context: context.to_string(),
        message: err.to_string(),
    })
}

/// Parses `body` and checks it against `shape`, returning the parsed value.
///
/// # Errors
///
/// Returns [`VerifyError::MalformedBody`] or [`VerifyError::ShapeViolation`].
pub fn assert_body(context: &str, body: &[u8], shape: &Shape) -> VerifyResult<Value> {
    let value = parse_json(context, body)?;
    assert_shape(context, &value, shape)?;
    Ok(value)
}

/// Checks `value` against `shape`.
///
/// # Errors
///
/// Returns [`VerifyError::ShapeViolation`] describing the first mismatch.
pub fn assert_shape(context: &str, value: &Value, shape: &Shape) -> VerifyResult<()> {
    check(value, shape, "").map_err(|violation| VerifyError::ShapeViolation {
        context: context.to_string(),
        pointer: if violation.pointer.is_empty() { "/".to_string() } else { violation.pointer },
        expected: violation.expected,
        found: violation.found,
    })
}

/// Internal mismatch record before context is attached.
struct Violation {
    /// JSON pointer to the mismatch.
    pointer: String,
    /// Expected description.
    expected: String,
    /// Observed description.
    found: String,
}

impl Violation {
    /// Builds a violation for `value` not matching `shape`.
    fn mismatch(pointer: &str, shape: &Shape, value: &Value) -> Self {
        Self {
            pointer: pointer.to_string(),
            expected: shape.describe(),
            found: describe_value(value),
        }
    }
}

/// Recursive structural check.
fn check(value: &Value, shape: &Shape, pointer: &str) -> Result<(), Violation> {
    match shape {
        Shape::Any => Ok(()),
        Shape::String if value.is_string() => Ok(()),
        Shape::Boolean if value.is_boolean() => Ok(()),
        Shape::Numeric if value.is_number() => Ok(()),
        Shape::Integer {
            min,
        } if value.is_i64() || value.is_u64() => match (min, value.as_i64()) {
            (Some(min), Some(actual)) if actual < *min => Err(Violation {
                pointer: pointer.to_string(),
                expected: shape.describe(),
                found: actual.to_string(),
            }),
            _ => Ok(()),
        },
        Shape::Equals(expected) if json_equivalent(expected, value) => Ok(()),
        Shape::Array(array) => match value {
            Value::Array(items) => check_array(items, array, shape, pointer),
            _ => Err(Violation::mismatch(pointer, shape, value)),
        },
        Shape::Object(object) => match value {
            Value::Object(map) => check_object(map, object, pointer),
            _ => Err(Violation::mismatch(pointer, shape, value)),
        },
        Shape::OneOf(options) => {
            if options.iter().any(|option| check(value, option, pointer).is_ok()) {
                Ok(())
            } else {
                Err(Violation::mismatch(pointer, shape, value))
            }
        }
        _ => Err(Violation::mismatch(pointer, shape, value)),
    }
}

/// Checks array length and every element.
fn check_array(
    items: &[Value],
    array: &ArrayShape,
    shape: &Shape,
    pointer: &str,
) -> Result<(), Violation> {
    if items.len() < array.min_items {
        return Err(Violation {
            pointer: pointer.to_string(),
            expected: shape.describe(),
            found: format!("array with {} element(s)", items.len()),
        });
    }
    for (index, item) in items.iter().enumerate() {
        check(item, &array.items, &format!("{pointer}/{index}"))?;
    }
    Ok(())
}

/// Checks required keys, key groups, and non-emptiness.
fn check_object(
    map: &Map<String, Value>,
    object: &ObjectShape,
    pointer: &str,
) -> Result<(), Violation> {
    if object.non_empty && map.is_empty() {
        return Err(Violation {
            pointer: pointer.to_string(),
            expected: "non-empty object".to_string(),
            found: "empty object".to_string(),
        });
    }
    for field in &object.fields {
        let child = format!("{pointer}/{}", escape_pointer(&field.name));
        match map.get(&field.name) {
            None if field.presence == Presence::Optional => {}
            None => {
                return Err(Violation {
                    pointer: child,
                    expected: field.shape.describe(),
                    found: "missing".to_string(),
                });
            }
            Some(Value::Null) if field.nullable => {}
            Some(value) => check(value, &field.shape, &child)?,
        }
    }
    if !object.any_of_keys.is_empty()
        && !object.any_of_keys.iter().any(|key| map.contains_key(key))
    {
        return Err(Violation {
            pointer: pointer.to_string(),
            expected: format!("object with any of [{}]", object.any_of_keys.join(", ")),
            found: "none of those keys".to_string(),
        });
    }
    Ok(())
}

/// Escapes a key per RFC 6901.
fn escape_pointer(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

/// Short type description of a JSON value.
fn describe_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "boolean".to_string(),
        Value::Number(number) if number.is_f64() => format!("float {number}"),
        Value::Number(number) => format!("integer {number}"),
        Value::String(_) => "string".to_string(),
        Value::Array(items) => format!("array with {} element(s)", items.len()),
        Value::Object(_) => "object".to_string(),
    }
}

// ============================================================================
// SECTION: Equivalence
// ============================================================================

/// Structural equality that treats numerically equal numbers as equal.
///
/// `2999` and `2999.0` are equivalent; objects compare key by key.
#[must_use]
pub fn json_equivalent(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Number(left), Value::Number(right)) => {
            if left.is_f64() || right.is_f64() {
                left.as_f64() == right.as_f64()
            } else {
                left == right
            }
        }
        (Value::Array(left), Value::Array(right)) => {
            left.len() == right.len()
                && left.iter().zip(right).all(|(left, right)| json_equivalent(left, right))
        }
        (Value::Object(left), Value::Object(right)) => {
            left.len() == right.len()
                && left.iter().all(|(key, value)| {
                    right.get(key).is_some_and(|other| json_equivalent(value, other))
                })
        }
        _ => expected == actual,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
