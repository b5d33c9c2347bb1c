//! Writing generated sources to disk
//!
//! Layout below the output base:
//!
//! ```text
//! <base>/c_generated_code/<name>_model/<name>_expl_ode_fun.c
//!                                     /<name>_expl_vde_forw.c
//!                                     /<name>_expl_vde_adj.c
//!                                     /<name>_expl_ode_hess.c
//! ```
//!
//! All paths are built from the base, the process working directory is never
//! changed.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::OdeGenError;
use crate::generator::sensitivity::SensitivityFunctions;
use crate::symbolic::{CodegenOptions, SymbolicEngine};

/// Name of the directory collecting all generated models
pub const GENERATED_CODE_DIR: &str = "c_generated_code";

/// Output directories rooted at a base path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    base: PathBuf,
}

impl OutputLayout {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// `<base>/c_generated_code`
    pub fn root_dir(&self) -> PathBuf {
        self.base.join(GENERATED_CODE_DIR)
    }

    /// `<base>/c_generated_code/<model>_model`
    pub fn model_dir(&self, model_name: &str) -> PathBuf {
        self.root_dir().join(format!("{}_model", model_name))
    }
}

/// Files written for one model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedModel {
    pub model_dir: PathBuf,
    /// Written files in emission order
    pub files: Vec<PathBuf>,
}

fn ensure_dir(path: &Path) -> Result<(), OdeGenError> {
    if path.is_dir() {
        tracing::debug!(dir = %path.display(), "reusing existing directory");
        return Ok(());
    }
    fs::create_dir_all(path).map_err(|e| OdeGenError::filesystem(path, e))
}

fn write_file(path: PathBuf, contents: &str) -> Result<PathBuf, OdeGenError> {
    fs::write(&path, contents).map_err(|e| OdeGenError::filesystem(&path, e))?;
    tracing::info!(file = %path.display(), bytes = contents.len(), "wrote generated code");
    Ok(path)
}

/// Generate and write the C sources of `functions`
///
/// Files are written one after the other. If a write fails, the files written
/// before it stay on disk.
pub fn emit<E: SymbolicEngine>(
    engine: &E,
    model_name: &str,
    functions: &SensitivityFunctions<E::Function>,
    layout: &OutputLayout,
    options: &CodegenOptions,
) -> Result<EmittedModel, OdeGenError> {
    ensure_dir(&layout.root_dir())?;
    let model_dir = layout.model_dir(model_name);
    ensure_dir(&model_dir)?;

    let mut files = Vec::new();
    for (kind, function) in functions.iter() {
        let generated = engine
            .generate(function, options)
            .map_err(OdeGenError::Codegen)?;
        tracing::debug!(
            kind = %kind,
            function = engine.function_name(function),
            "generated C code"
        );
        files.push(write_file(
            model_dir.join(generated.source_file_name()),
            &generated.source,
        )?);
        if let Some(header) = &generated.header {
            files.push(write_file(
                model_dir.join(generated.header_file_name()),
                header,
            )?);
        }
    }

    Ok(EmittedModel { model_dir, files })
}
