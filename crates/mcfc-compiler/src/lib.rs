//! mcfc compiler: orchestrates the full build.
//!
//! ```text
//! program → Compiler (codegen) → Generated → link components → data pack tree
//! ```
//!
//! The output tree holds `pack.mcmeta`, every generated and linked
//! procedure, copied component resources, the `minecraft:load` tag that
//! runs the initialization procedure, and an `mcfc-build.json` summary.

pub mod error;
pub mod pack;

pub use error::{CompilerError, CompilerResult};
pub use pack::{pack_format, BuildSummary, OutputFile};

use mcfc_codegen::{cmd, Compiler, Generated};
use mcfc_linker::{ComponentSource, DirDatabase, LinkOutput};
use mcfc_types::Config;
use std::path::Path;
use tracing::{debug, info};

/// Everything one build produced.
#[derive(Debug)]
pub struct BuildOutput {
    pub generated: Generated,
    pub linked: LinkOutput,
    /// Output files, summary last.
    pub files: Vec<OutputFile>,
    pub summary: BuildSummary,
}

impl BuildOutput {
    pub fn file(&self, path: &str) -> Option<&OutputFile> {
        self.files.iter().find(|f| f.path == path)
    }

    /// Signature and lines of every procedure in the pack, generated
    /// ones first.
    pub fn procedures(&self) -> impl Iterator<Item = (&str, &[String])> {
        let generated = self
            .generated
            .procedures
            .iter()
            .map(|p| (p.signature.as_str(), p.lines.as_slice()));
        let linked = self
            .linked
            .procedures
            .iter()
            .map(|p| (p.signature.as_str(), p.lines.as_slice()));
        generated.chain(linked)
    }

    /// Write the output tree under `root`.
    pub fn write_to(&self, root: &Path) -> CompilerResult<()> {
        for file in &self.files {
            let path = file.path.split('/').fold(root.to_path_buf(), |p, part| p.join(part));
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|source| CompilerError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            std::fs::write(&path, &file.contents)
                .map_err(|source| CompilerError::Io { path, source })?;
        }
        info!(root = %root.display(), files = self.files.len(), "data pack written");
        Ok(())
    }
}

/// Generate, link and lay out a data pack.
///
/// `program` drives the compiler; any error diagnostic it causes fails
/// the build with [`CompilerError::Compile`].
pub fn build(
    config: Config,
    source: &dyn ComponentSource,
    program: impl FnOnce(&mut Compiler),
) -> CompilerResult<BuildOutput> {
    config.validate()?;
    info!(namespace = %config.namespace, version = config.version, "build started");

    let mut compiler = Compiler::with_database(config, source)?;
    program(&mut compiler);
    let mut generated = compiler.finish()?;
    let linked = generated.components.link(source)?;
    append_init_calls(&mut generated, &linked);

    let mut files = layout_files(&generated, &linked);
    let summary = summarize(&generated, &linked, &files);
    files.push(summary.to_file());
    info!(
        procedures = generated.procedures.len(),
        library = linked.procedures.len(),
        fingerprint = %summary.fingerprint,
        "build finished"
    );
    Ok(BuildOutput {
        generated,
        linked,
        files,
        summary,
    })
}

/// [`build`] with the configuration file at `config_path` and the
/// component database under `libs/<version>`.
pub fn build_project(
    config_path: &Path,
    libs: &Path,
    program: impl FnOnce(&mut Compiler),
) -> CompilerResult<BuildOutput> {
    let config = Config::load(config_path)?;
    let database = DirDatabase::open(libs, config.version)?;
    build(config, &database, program)
}

/// Component initializers run after the runtime is set up, in
/// dependency order.
fn append_init_calls(generated: &mut Generated, linked: &LinkOutput) {
    let Some(init) = generated
        .procedures
        .iter_mut()
        .find(|p| p.signature == generated.init)
    else {
        return;
    };
    for signature in &linked.init_calls {
        debug!(initializer = %signature, "component initializer");
        init.lines.push(cmd::call(signature));
    }
    let lines = init.lines.len();
    if let Some(entry) = generated
        .procedure_map
        .entries
        .iter_mut()
        .find(|e| e.signature == generated.init)
    {
        entry.lines = lines;
    }
}

fn layout_files(generated: &Generated, linked: &LinkOutput) -> Vec<OutputFile> {
    let config = &generated.config;
    let ns = config.namespace.as_str();
    let fdir = config.function_dir();

    let mut files = vec![pack::pack_meta(ns, config.version)];
    for p in &generated.procedures {
        files.push(pack::procedure_file(ns, fdir, &p.path, &p.lines));
    }
    for p in &linked.procedures {
        files.push(pack::procedure_file(ns, fdir, &p.path, &p.lines));
    }
    for r in &linked.resources {
        files.push(OutputFile::new(r.path.clone(), r.contents.clone()));
    }
    files.push(pack::load_tag(fdir, &generated.init));
    files
}

fn summarize(generated: &Generated, linked: &LinkOutput, files: &[OutputFile]) -> BuildSummary {
    let config = &generated.config;
    BuildSummary {
        namespace: config.namespace.clone(),
        version: config.version,
        pack_format: pack_format(config.version),
        entries: generated.entries.clone(),
        init: generated.init.clone(),
        procedures: generated.procedures.len(),
        components: linked.order.clone(),
        library_procedures: linked.procedures.len(),
        resources: linked.resources.len(),
        warnings: generated.warnings.total_warnings,
        leaked: generated.leaked.iter().map(|id| id.to_string()).collect(),
        fingerprint: pack::fingerprint(files),
    }
}
