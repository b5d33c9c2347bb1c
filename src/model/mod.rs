//! Explicit ODE model descriptors
//!
//! A [`ModelDescriptor`] bundles the symbolic state, control and parameter
//! vectors of a model with its right-hand side `dx/dt = f_expl(x, u, p)`.
//! Descriptors are built by the caller and only read by the generator.

/// How the parameters of a model are supplied
#[derive(Debug, Clone)]
pub enum ParameterInput<M> {
    /// A symbolic parameter vector
    Symbolic(M),
    /// A plain ordered collection. Only an empty collection is accepted and
    /// stands for a model without parameters.
    List(Vec<M>),
}

impl<M> ParameterInput<M> {
    /// No parameters, given as an explicit empty collection
    pub fn none() -> Self {
        Self::List(Vec::new())
    }
}

impl<M> From<M> for ParameterInput<M> {
    fn from(p: M) -> Self {
        Self::Symbolic(p)
    }
}

/// Symbolic description of an explicit ODE model
#[derive(Debug, Clone)]
pub struct ModelDescriptor<M> {
    /// Model name, used as prefix of every generated function
    pub name: String,
    /// State vector, `nx x 1`
    pub x: M,
    /// Control vector, `nu x 1`
    pub u: M,
    /// Parameters, `np x 1`
    pub p: ParameterInput<M>,
    /// Right-hand side, `nx x 1`
    pub f_expl: M,
}

impl<M> ModelDescriptor<M> {
    pub fn new(
        name: impl Into<String>,
        x: M,
        u: M,
        p: impl Into<ParameterInput<M>>,
        f_expl: M,
    ) -> Self {
        Self {
            name: name.into(),
            x,
            u,
            p: p.into(),
            f_expl,
        }
    }

    /// Name of the per-model output directory
    pub fn model_dir_name(&self) -> String {
        format!("{}_model", self.name)
    }
}

/// True if `name` is a valid C identifier
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
