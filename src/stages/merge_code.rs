use crate::archive::extract_entry;
use crate::matcher::{self, find_merge_root_for, MatchError, PackageSegment};
use crate::mirror::mirror;
use crate::pipeline::{PipelineContext, Stage, StageError};
use crate::settings::CompileSettings;
use crate::tools::{Baksmali, D8};
use std::fs;
use std::path::{Path, PathBuf};

/// Compiled bytecode entry inside an AAR.
pub const CLASSES_JAR: &str = "classes.jar";
const CLASSES_DEX: &str = "classes.dex";
const LIBRARY_TREE_DIR: &str = "decompiled-aar";

/// Splices the code of every library archive into the decoded target.
///
/// Per archive: extract `classes.jar`, compile it to `classes.dex` with d8,
/// disassemble that with baksmali, then resolve a merge root for each of
/// the library's top-level packages. Nothing is copied until every package
/// of every archive has a merge root.
pub struct MergeCodeStage {
    d8: D8,
    baksmali: Baksmali,
    compile: CompileSettings,
}

/// One library package and where it is copied to.
struct Splice {
    source: PathBuf,
    destination: PathBuf,
}

impl MergeCodeStage {
    pub fn new(d8: D8, baksmali: Baksmali, compile: CompileSettings) -> Self {
        Self {
            d8,
            baksmali,
            compile,
        }
    }

    /// Extract, compile and disassemble one archive into `work`. Returns
    /// the library code tree.
    fn disassemble_library(
        &self,
        archive: &Path,
        work: &Path,
        progress: &mut dyn FnMut(&str),
    ) -> Result<PathBuf, StageError> {
        // baksmali adds to an existing output tree, so a kept workspace
        // would otherwise carry packages from an earlier library.
        if work.exists() {
            fs::remove_dir_all(work).map_err(|source| StageError::Io {
                path: work.to_path_buf(),
                source,
            })?;
        }

        progress("Decompressing AAR");
        let jar = extract_entry(archive, CLASSES_JAR, work)?;

        progress("Converting classes.jar to classes.dex");
        self.d8
            .compile(
                &jar,
                work,
                self.compile.flavor,
                self.compile.min_api,
                self.compile.proguard_config.as_deref(),
            )?
            .drain(|line| progress(line))?;

        progress("Disassembling classes.dex to retrieve Smali code files");
        let tree = work.join(LIBRARY_TREE_DIR);
        self.baksmali
            .disassemble(&work.join(CLASSES_DEX), &tree, self.compile.api_level)?
            .drain(|line| progress(line))?;

        Ok(tree)
    }
}

impl Stage for MergeCodeStage {
    fn title(&self) -> &str {
        "Merge code"
    }

    fn run(
        &self,
        ctx: &mut PipelineContext,
        progress: &mut dyn FnMut(&str),
    ) -> Result<(), StageError> {
        let decoded = ctx.require_decoded_target_dir()?.to_path_buf();
        let archives = ctx.require_library_archives()?.to_vec();

        let target_roots = matcher::disassembly_roots(&decoded)?;
        tracing::debug!(roots = target_roots.len(), "found disassembly roots");

        let mut trees = Vec::with_capacity(archives.len());
        let mut merge_roots = Vec::new();
        let mut splices = Vec::new();

        for (index, archive) in archives.iter().enumerate() {
            let work = ctx.working_dir.join(format!("library-{index}"));
            let tree = self.disassemble_library(archive, &work, progress)?;

            let segments: Vec<PackageSegment> = matcher::child_dirs(&tree)?
                .iter()
                .filter_map(|dir| PackageSegment::of(dir))
                .collect();
            if segments.is_empty() {
                return Err(MatchError::EmptyLibrary(tree).into());
            }

            for segment in &segments {
                let root = find_merge_root_for(&tree, segment, &target_roots)?;
                let (source, destination) = root.splice_paths(&tree);
                splices.push(Splice {
                    source,
                    destination,
                });
                merge_roots.push(root);
            }
            trees.push(tree);
        }

        progress("Merging packages");
        for splice in &splices {
            let stats = mirror(&splice.source, &splice.destination)?;
            progress(&format!(
                "Merged {} files into {}",
                stats.files,
                splice.destination.display()
            ));
        }

        ctx.library_tree_dirs = Some(trees);
        ctx.merge_roots = Some(merge_roots);
        Ok(())
    }
}
