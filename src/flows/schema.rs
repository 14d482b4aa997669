//! Declarative shape descriptors for prompt inputs and outputs.
//!
//! Each request/response struct carries a [`Shape`] constant next to its serde
//! definition. The same descriptor drives strict runtime validation and the
//! response schema sent to the model.

use serde_json::{json, Map, Value};

#[derive(Debug)]
pub enum Kind {
    String,
    Number { non_negative: bool },
    Enum(&'static [&'static str]),
    Object(&'static [Field]),
    Array(&'static Kind),
}

#[derive(Debug)]
pub struct Field {
    pub name: &'static str,
    pub kind: Kind,
    pub required: bool,
    pub description: &'static str,
}

#[derive(Debug)]
pub struct Shape {
    pub name: &'static str,
    pub fields: &'static [Field],
}

/// Ties a Rust type to the shape it is validated against.
pub trait Shaped {
    const SHAPE: &'static Shape;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: String,
    pub problem: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.problem)
        } else {
            write!(f, "{}: {}", self.path, self.problem)
        }
    }
}

pub fn describe(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl Shape {
    /// Checks `value` against the shape. Missing required fields, wrong
    /// primitive types, unknown fields and negative amounts are all reported.
    pub fn validate(&self, value: &Value) -> Result<(), Vec<Violation>> {
        let mut out = Vec::new();
        check_object(self.fields, value, "", &mut out);
        if out.is_empty() {
            Ok(())
        } else {
            Err(out)
        }
    }

    /// Response schema in the OpenAPI subset understood by the model API.
    pub fn response_schema(&self) -> Value {
        object_schema(self.fields)
    }
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", path, name)
    }
}

fn violation(out: &mut Vec<Violation>, path: &str, problem: impl Into<String>) {
    out.push(Violation {
        path: path.to_string(),
        problem: problem.into(),
    });
}

fn check_object(fields: &[Field], value: &Value, path: &str, out: &mut Vec<Violation>) {
    let Some(obj) = value.as_object() else {
        violation(out, path, "expected object");
        return;
    };
    for field in fields {
        let field_path = join(path, field.name);
        match obj.get(field.name) {
            None | Some(Value::Null) => {
                if field.required {
                    violation(out, &field_path, "required field is missing");
                }
            }
            Some(v) => check_kind(&field.kind, v, &field_path, out),
        }
    }
    for key in obj.keys() {
        if !fields.iter().any(|f| f.name == key) {
            violation(out, &join(path, key), "unexpected field");
        }
    }
}

fn check_kind(kind: &Kind, value: &Value, path: &str, out: &mut Vec<Violation>) {
    match kind {
        Kind::String => {
            if !value.is_string() {
                violation(out, path, "expected string");
            }
        }
        Kind::Number { non_negative } => match value.as_f64() {
            None => violation(out, path, "expected number"),
            Some(n) if !n.is_finite() => violation(out, path, "expected finite number"),
            Some(n) if *non_negative && n < 0.0 => {
                violation(out, path, format!("must not be negative (got {})", n))
            }
            Some(_) => {}
        },
        Kind::Enum(allowed) => match value.as_str() {
            Some(s) if allowed.contains(&s) => {}
            Some(s) => violation(
                out,
                path,
                format!("'{}' is not one of [{}]", s, allowed.join(", ")),
            ),
            None => violation(out, path, "expected string"),
        },
        Kind::Object(fields) => check_object(fields, value, path, out),
        Kind::Array(item) => match value.as_array() {
            Some(items) => {
                for (i, v) in items.iter().enumerate() {
                    check_kind(item, v, &format!("{}[{}]", path, i), out);
                }
            }
            None => violation(out, path, "expected array"),
        },
    }
}

fn object_schema(fields: &[Field]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for field in fields {
        let mut schema = kind_schema(&field.kind);
        if !field.description.is_empty() {
            schema["description"] = Value::from(field.description);
        }
        properties.insert(field.name.to_string(), schema);
        if field.required {
            required.push(Value::from(field.name));
        }
    }
    json!({
        "type": "OBJECT",
        "properties": properties,
        "required": required,
        "propertyOrdering": fields.iter().map(|f| f.name).collect::<Vec<_>>(),
    })
}

fn kind_schema(kind: &Kind) -> Value {
    match kind {
        Kind::String => json!({ "type": "STRING" }),
        Kind::Number { non_negative: true } => json!({ "type": "NUMBER", "minimum": 0 }),
        Kind::Number { non_negative: false } => json!({ "type": "NUMBER" }),
        Kind::Enum(allowed) => json!({ "type": "STRING", "format": "enum", "enum": allowed }),
        Kind::Object(fields) => object_schema(fields),
        Kind::Array(item) => json!({ "type": "ARRAY", "items": kind_schema(item) }),
    }
}
