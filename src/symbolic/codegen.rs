//! C code generation for symbolic functions
//!
//! Each function is emitted as a self-contained C translation unit exposing
//! the evaluation entry point together with the usual metadata queries
//! (`_n_in`, `_n_out`, `_name_in`, `_name_out`, `_sparsity_in`,
//! `_sparsity_out`, `_work`). The text depends only on the function, never on
//! symbol identities or the time of generation, so generating twice yields
//! identical bytes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::symbolic::errors::SymbolicError;
use crate::symbolic::expr::{topological_order, Node, UnaryOp};
use crate::symbolic::function::Function;

const PREFIX: &str = "odesens";

/// Language interoperability layer appended to the generated code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteropTarget {
    #[default]
    None,
    /// MATLAB MEX gateway
    Mex,
}

/// Integer type used for dimensions and sparsity patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegerWidth {
    #[default]
    Int32,
    Int64,
}

impl IntegerWidth {
    pub fn c_type(&self) -> &'static str {
        match self {
            Self::Int32 => "int",
            Self::Int64 => "long long int",
        }
    }
}

/// Floating point type used for all numeric values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FloatWidth {
    Single,
    #[default]
    Double,
}

impl FloatWidth {
    pub fn c_type(&self) -> &'static str {
        match self {
            Self::Single => "float",
            Self::Double => "double",
        }
    }

    fn math_suffix(&self) -> &'static str {
        match self {
            Self::Single => "f",
            Self::Double => "",
        }
    }
}

/// Options controlling code generation
///
/// The defaults (no MEX interop, 32-bit integers, double precision, no header)
/// are what the solver runtime expects.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CodegenOptions {
    pub interop_target: InteropTarget,
    pub integer_width: IntegerWidth,
    pub float_width: FloatWidth,
    /// Also emit a header declaring the entry points
    pub with_header: bool,
}

impl CodegenOptions {
    /// Parse options from JSON, missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    fn validate(&self) -> Result<(), SymbolicError> {
        if self.interop_target == InteropTarget::Mex && self.float_width != FloatWidth::Double {
            return Err(SymbolicError::InvalidCodegenOptions {
                reason: "the MEX gateway requires double precision".to_string(),
            });
        }
        Ok(())
    }
}

/// Generated code for one function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSource {
    /// Function name, also the stem of the generated files
    pub name: String,
    /// C source text
    pub source: String,
    /// Header text, if requested
    pub header: Option<String>,
}

impl GeneratedSource {
    pub fn source_file_name(&self) -> String {
        format!("{}.c", self.name)
    }

    pub fn header_file_name(&self) -> String {
        format!("{}.h", self.name)
    }
}

/// Generate C code for `function`
pub fn generate(
    function: &Function,
    options: &CodegenOptions,
) -> Result<GeneratedSource, SymbolicError> {
    options.validate()?;
    let generator = CGenerator::new(function, options);
    let source = generator.source()?;
    let header = options.with_header.then(|| generator.header());
    Ok(GeneratedSource {
        name: function.name().to_string(),
        source,
        header,
    })
}

struct CGenerator<'a> {
    function: &'a Function,
    options: &'a CodegenOptions,
    /// Distinct matrix shapes, in order of first use
    patterns: Vec<(usize, usize)>,
}

impl<'a> CGenerator<'a> {
    fn new(function: &'a Function, options: &'a CodegenOptions) -> Self {
        let mut patterns = Vec::new();
        for m in function.inputs().iter().chain(function.outputs()) {
            if !patterns.contains(&m.size()) {
                patterns.push(m.size());
            }
        }
        Self {
            function,
            options,
            patterns,
        }
    }

    fn pattern_index(&self, size: (usize, usize)) -> usize {
        self.patterns.iter().position(|p| *p == size).unwrap_or(0)
    }

    fn real(&self) -> String {
        format!("{}_real", PREFIX)
    }

    fn int(&self) -> String {
        format!("{}_int", PREFIX)
    }

    fn signature(&self, name: &str) -> String {
        format!(
            "int {name}(const {real}** arg, {real}** res, {int}* iw, {real}* w, void* mem)",
            name = name,
            real = self.real(),
            int = self.int(),
        )
    }

    fn banner(&self) -> String {
        format!(
            "/* This file was automatically generated by {} {}. Do not edit. */\n",
            PREFIX,
            env!("CARGO_PKG_VERSION")
        )
    }

    fn type_macros(&self) -> String {
        format!(
            r#"#ifndef {real}
#define {real} {real_t}
#endif

#ifndef {int}
#define {int} {int_t}
#endif
"#,
            real = self.real(),
            real_t = self.options.float_width.c_type(),
            int = self.int(),
            int_t = self.options.integer_width.c_type(),
        )
    }

    fn literal(&self, v: f64) -> String {
        // C has no literal spelling for these, use the <math.h> macros
        if v.is_nan() {
            return "NAN".to_string();
        }
        if v.is_infinite() {
            return if v > 0.0 { "INFINITY" } else { "(-INFINITY)" }.to_string();
        }
        let mut s = format!("{:?}", v);
        if self.options.float_width == FloatWidth::Single {
            s.push('f');
        }
        if s.starts_with('-') {
            format!("({})", s)
        } else {
            s
        }
    }

    fn math(&self, name: &str) -> String {
        format!("{}{}", name, self.options.float_width.math_suffix())
    }

    /// Dense compressed column storage: `nrow, ncol, colind[ncol+1], row[nnz]`
    fn sparsity_patterns(&self) -> String {
        let mut out = String::new();
        for (k, (rows, cols)) in self.patterns.iter().enumerate() {
            let mut entries = vec![*rows, *cols];
            entries.extend((0..=*cols).map(|j| j * rows));
            for _ in 0..*cols {
                entries.extend(0..*rows);
            }
            let entries: Vec<String> = entries.iter().map(|e| e.to_string()).collect();
            out.push_str(&format!(
                "static const {int} {prefix}_s{k}[{n}] = {{{entries}}};\n",
                int = self.int(),
                prefix = PREFIX,
                k = k,
                n = entries.len(),
                entries = entries.join(", "),
            ));
        }
        out
    }

    fn description(&self) -> String {
        let shape = |(rows, cols): (usize, usize)| match (rows, cols) {
            (1, 1) => String::new(),
            (r, 1) => format!("[{}]", r),
            (0, 0) => "[]".to_string(),
            (r, c) => format!("[{}x{}]", r, c),
        };
        let inputs: Vec<String> = self
            .function
            .inputs()
            .iter()
            .enumerate()
            .map(|(i, m)| format!("{}{}", Function::name_in(i), shape(m.size())))
            .collect();
        let outputs: Vec<String> = self
            .function
            .outputs()
            .iter()
            .enumerate()
            .map(|(i, m)| format!("{}{}", Function::name_out(i), shape(m.size())))
            .collect();
        format!(
            "{}:({})->({})",
            self.function.name(),
            inputs.join(","),
            outputs.join(",")
        )
    }

    /// Body of the evaluation kernel
    fn kernel(&self) -> Result<String, SymbolicError> {
        let mut location: HashMap<usize, (usize, usize)> = HashMap::new();
        for (i, input) in self.function.inputs().iter().enumerate() {
            for (k, s) in input.elements().iter().enumerate() {
                if let Some(id) = s.symbol_id() {
                    location.insert(id, (i, k));
                }
            }
        }

        let roots: Vec<_> = self
            .function
            .outputs()
            .iter()
            .flat_map(|m| m.elements().iter().cloned())
            .collect();

        let mut names: HashMap<usize, String> = HashMap::new();
        let mut statements = Vec::new();
        let mut n_locals = 0;
        for node in topological_order(&roots) {
            let rhs = match node.node() {
                Node::Const(v) => {
                    names.insert(node.key(), self.literal(*v));
                    continue;
                }
                Node::Symbol { id, name } => {
                    let (i, k) =
                        location
                            .get(id)
                            .copied()
                            .ok_or_else(|| SymbolicError::FreeSymbols {
                                function: self.function.name().to_string(),
                                symbols: vec![name.clone()],
                            })?;
                    format!("arg[{i}] ? arg[{i}][{k}] : 0", i = i, k = k)
                }
                Node::Unary(UnaryOp::Neg, a) => format!("(-{})", names[&a.key()]),
                Node::Unary(op, a) => format!("{}({})", self.math(op.name()), names[&a.key()]),
                Node::Binary(op, a, b) => match op.infix() {
                    Some(c) => format!("({}{}{})", names[&a.key()], c, names[&b.key()]),
                    None => format!(
                        "{}({},{})",
                        self.math("pow"),
                        names[&a.key()],
                        names[&b.key()]
                    ),
                },
            };
            let local = format!("a{}", n_locals);
            n_locals += 1;
            statements.push(format!("  {}={};\n", local, rhs));
            names.insert(node.key(), local);
        }

        let mut body = String::new();
        if n_locals > 0 {
            let locals: Vec<String> = (0..n_locals).map(|k| format!("a{}", k)).collect();
            for chunk in locals.chunks(16) {
                body.push_str(&format!("  {} {};\n", self.real(), chunk.join(", ")));
            }
        }
        for statement in statements {
            body.push_str(&statement);
        }
        for (o, output) in self.function.outputs().iter().enumerate() {
            if output.is_empty() {
                continue;
            }
            body.push_str(&format!("  if (res[{o}]!=0) {{\n", o = o));
            for (k, e) in output.elements().iter().enumerate() {
                body.push_str(&format!("    res[{}][{}]={};\n", o, k, names[&e.key()]));
            }
            body.push_str("  }\n");
        }
        Ok(body)
    }

    fn switch(&self, items: &[String]) -> String {
        let mut out = String::from("  switch (i) {\n");
        for (i, item) in items.iter().enumerate() {
            out.push_str(&format!("    case {}: return {};\n", i, item));
        }
        out.push_str("    default: return 0;\n  }\n");
        out
    }

    fn metadata(&self) -> String {
        let name = self.function.name();
        let int = self.int();
        let n_in = self.function.n_in();
        let n_out = self.function.n_out();
        let names_in: Vec<String> = (0..n_in)
            .map(|i| format!("\"{}\"", Function::name_in(i)))
            .collect();
        let names_out: Vec<String> = (0..n_out)
            .map(|i| format!("\"{}\"", Function::name_out(i)))
            .collect();
        let sparsity_in: Vec<String> = self
            .function
            .inputs()
            .iter()
            .map(|m| format!("{}_s{}", PREFIX, self.pattern_index(m.size())))
            .collect();
        let sparsity_out: Vec<String> = self
            .function
            .outputs()
            .iter()
            .map(|m| format!("{}_s{}", PREFIX, self.pattern_index(m.size())))
            .collect();

        let mut out = String::new();
        out.push_str(&format!(
            "{int} {name}_n_in(void) {{ return {n_in}; }}\n\n",
            int = int,
            name = name,
            n_in = n_in
        ));
        out.push_str(&format!(
            "{int} {name}_n_out(void) {{ return {n_out}; }}\n\n",
            int = int,
            name = name,
            n_out = n_out
        ));
        out.push_str(&format!(
            "const char* {name}_name_in({int} i) {{\n{body}}}\n\n",
            name = name,
            int = int,
            body = self.switch(&names_in)
        ));
        out.push_str(&format!(
            "const char* {name}_name_out({int} i) {{\n{body}}}\n\n",
            name = name,
            int = int,
            body = self.switch(&names_out)
        ));
        out.push_str(&format!(
            "const {int}* {name}_sparsity_in({int} i) {{\n{body}}}\n\n",
            name = name,
            int = int,
            body = self.switch(&sparsity_in)
        ));
        out.push_str(&format!(
            "const {int}* {name}_sparsity_out({int} i) {{\n{body}}}\n\n",
            name = name,
            int = int,
            body = self.switch(&sparsity_out)
        ));
        out.push_str(&format!(
            r#"int {name}_work({int} *sz_arg, {int}* sz_res, {int} *sz_iw, {int} *sz_w) {{
  if (sz_arg) *sz_arg = {n_in};
  if (sz_res) *sz_res = {n_out};
  if (sz_iw) *sz_iw = 0;
  if (sz_w) *sz_w = 0;
  return 0;
}}
"#,
            name = name,
            int = int,
            n_in = n_in,
            n_out = n_out
        ));
        out
    }

    fn mex_gateway(&self) -> String {
        let name = self.function.name();
        let n_in = self.function.n_in();
        let n_out = self.function.n_out();
        let mut out = String::new();
        out.push_str("\n#ifdef MATLAB_MEX_FILE\n#include <mex.h>\n\n");
        out.push_str(
            "void mexFunction(int resc, mxArray *resv[], int argc, const mxArray *argv[]) {\n",
        );
        out.push_str(&format!(
            "  const {real}* arg[{n}];\n  {real}* res[{m}];\n",
            real = self.real(),
            n = n_in.max(1),
            m = n_out.max(1)
        ));
        out.push_str(&format!(
            "  if (argc>{n_in}) mexErrMsgIdAndTxt(\"{prefix}:mex\", \"Evaluation of \\\"{name}\\\" failed. Too many input arguments (%d, max {n_in})\", argc);\n",
            n_in = n_in,
            prefix = PREFIX,
            name = name
        ));
        out.push_str(&format!(
            "  if (resc>{n_out}) mexErrMsgIdAndTxt(\"{prefix}:mex\", \"Evaluation of \\\"{name}\\\" failed. Too many output arguments (%d, max {n_out})\", resc);\n",
            n_out = n_out,
            prefix = PREFIX,
            name = name
        ));
        for (i, m) in self.function.inputs().iter().enumerate() {
            out.push_str(&format!(
                r#"  if (argc>{i} && !mxIsEmpty(argv[{i}])) {{
    if (mxGetM(argv[{i}])*mxGetN(argv[{i}])!={numel}) mexErrMsgIdAndTxt("{prefix}:mex", "Input {i} of \"{name}\" must have {rows}x{cols} elements");
    arg[{i}] = mxGetPr(argv[{i}]);
  }} else {{
    arg[{i}] = 0;
  }}
"#,
                i = i,
                numel = m.numel(),
                rows = m.rows(),
                cols = m.cols(),
                prefix = PREFIX,
                name = name
            ));
        }
        for (i, m) in self.function.outputs().iter().enumerate() {
            out.push_str(&format!(
                r#"  if (resc>{i} || {i}==0) {{
    resv[{i}] = mxCreateDoubleMatrix({rows}, {cols}, mxREAL);
    res[{i}] = mxGetPr(resv[{i}]);
  }} else {{
    res[{i}] = 0;
  }}
"#,
                i = i,
                rows = m.rows(),
                cols = m.cols()
            ));
        }
        out.push_str(&format!(
            "  if ({name}(arg, res, 0, 0, 0)) mexErrMsgIdAndTxt(\"{prefix}:mex\", \"Evaluation of \\\"{name}\\\" failed.\");\n}}\n#endif\n",
            name = name,
            prefix = PREFIX
        ));
        out
    }

    fn source(&self) -> Result<String, SymbolicError> {
        let name = self.function.name();
        let mut out = self.banner();
        out.push_str("#ifdef __cplusplus\nextern \"C\" {\n#endif\n\n#include <math.h>\n\n");
        out.push_str(&self.type_macros());
        out.push('\n');
        out.push_str(&self.sparsity_patterns());
        out.push('\n');
        out.push_str(&format!("/* {} */\n", self.description()));
        out.push_str(&format!(
            "static {} {{\n",
            self.signature(&format!("{}_f0", PREFIX))
        ));
        out.push_str(&self.kernel()?);
        out.push_str("  return 0;\n}\n\n");
        out.push_str(&format!(
            "{} {{\n  return {}_f0(arg, res, iw, w, mem);\n}}\n\n",
            self.signature(name),
            PREFIX
        ));
        out.push_str(&self.metadata());
        if self.options.interop_target == InteropTarget::Mex {
            out.push_str(&self.mex_gateway());
        }
        out.push_str("\n#ifdef __cplusplus\n} /* extern \"C\" */\n#endif\n");
        Ok(out)
    }

    fn header(&self) -> String {
        let name = self.function.name();
        let int = self.int();
        let mut out = self.banner();
        out.push_str(&self.type_macros());
        out.push_str("\n#ifdef __cplusplus\nextern \"C\" {\n#endif\n\n");
        out.push_str(&format!("{};\n", self.signature(name)));
        out.push_str(&format!("{int} {name}_n_in(void);\n", int = int, name = name));
        out.push_str(&format!("{int} {name}_n_out(void);\n", int = int, name = name));
        out.push_str(&format!(
            "const char* {name}_name_in({int} i);\n",
            int = int,
            name = name
        ));
        out.push_str(&format!(
            "const char* {name}_name_out({int} i);\n",
            int = int,
            name = name
        ));
        out.push_str(&format!(
            "const {int}* {name}_sparsity_in({int} i);\n",
            int = int,
            name = name
        ));
        out.push_str(&format!(
            "const {int}* {name}_sparsity_out({int} i);\n",
            int = int,
            name = name
        ));
        out.push_str(&format!(
            "int {name}_work({int} *sz_arg, {int}* sz_res, {int} *sz_iw, {int} *sz_w);\n",
            int = int,
            name = name
        ));
        out.push_str("\n#ifdef __cplusplus\n} /* extern \"C\" */\n#endif\n");
        out
    }
}
