//! Declared variables and the leaf uniforms they flatten into.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementType {
    Boolean,
    Integer,
    Unsigned,
    Float,
    Double,
}

impl ElementType {
    /// Scalar GLSL keyword for this element type.
    pub fn from_scalar_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "bool" => Some(ElementType::Boolean),
            "int" => Some(ElementType::Integer),
            "uint" => Some(ElementType::Unsigned),
            "float" => Some(ElementType::Float),
            "double" => Some(ElementType::Double),
            _ => None,
        }
    }

    /// Element type selected by the prefix of a `<prefix>vecN` spelling; plain `vecN` is float.
    pub fn from_vector_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "b" => Some(ElementType::Boolean),
            "i" => Some(ElementType::Integer),
            "u" => Some(ElementType::Unsigned),
            "" => Some(ElementType::Float),
            "d" => Some(ElementType::Double),
            _ => None,
        }
    }

    /// `count` zero (or `false`) values of this type.
    pub fn zeroed(self, count: usize) -> UniformValues {
        match self {
            ElementType::Boolean => UniformValues::Boolean(vec![false; count]),
            ElementType::Integer => UniformValues::Integer(vec![0; count]),
            ElementType::Unsigned => UniformValues::Unsigned(vec![0; count]),
            ElementType::Float => UniformValues::Float(vec![0.0; count]),
            ElementType::Double => UniformValues::Double(vec![0.0; count]),
        }
    }
}

/// Values of a scalar or vector uniform; one element per component.
#[derive(Clone, Debug, PartialEq)]
pub enum UniformValues {
    Boolean(Vec<bool>),
    Integer(Vec<i32>),
    Unsigned(Vec<u32>),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

impl UniformValues {
    pub fn element_type(&self) -> ElementType {
        match self {
            UniformValues::Boolean(_) => ElementType::Boolean,
            UniformValues::Integer(_) => ElementType::Integer,
            UniformValues::Unsigned(_) => ElementType::Unsigned,
            UniformValues::Float(_) => ElementType::Float,
            UniformValues::Double(_) => ElementType::Double,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            UniformValues::Boolean(v) => v.len(),
            UniformValues::Integer(v) => v.len(),
            UniformValues::Unsigned(v) => v.len(),
            UniformValues::Float(v) => v.len(),
            UniformValues::Double(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum VariableKind {
    Values(UniformValues),
    /// Fields of a struct instance, cloned from the registered struct type.
    Struct(Vec<Variable>),
}

/// A declared `uniform` or struct field.
#[derive(Clone, Debug, PartialEq)]
pub struct Variable {
    pub name: String,
    pub kind: VariableKind,
}

impl Variable {
    pub fn with_values(name: impl Into<String>, values: UniformValues) -> Self {
        Self {
            name: name.into(),
            kind: VariableKind::Values(values),
        }
    }

    /// Instantiates a struct; `fields` is the struct type's template and gets cloned.
    pub fn with_fields(name: impl Into<String>, fields: &[Variable]) -> Self {
        Self {
            name: name.into(),
            kind: VariableKind::Struct(fields.to_vec()),
        }
    }

    /// Flattens into leaf uniforms, naming nested fields with dotted paths below `prefix`.
    pub fn flatten(&self, prefix: &str) -> Vec<Uniform> {
        let name = if prefix.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", prefix, self.name)
        };

        match &self.kind {
            VariableKind::Values(values) => vec![Uniform {
                name,
                values: values.clone(),
            }],
            VariableKind::Struct(fields) => fields
                .iter()
                .flat_map(|field| field.flatten(&name))
                .collect(),
        }
    }
}

/// An externally settable scalar or vector input of the linked program.
#[derive(Clone, Debug, PartialEq)]
pub struct Uniform {
    /// Uniform name; fields of struct uniforms use dotted paths, e.g. `light.color`.
    pub name: String,
    pub values: UniformValues,
}

impl Uniform {
    pub fn new(name: impl Into<String>, values: UniformValues) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn element_type(&self) -> ElementType {
        self.values.element_type()
    }
}
