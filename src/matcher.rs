//! Package tree reconciliation.
//!
//! A disassembled library is a tree of package directories (`com/`,
//! `com/example/`, ...). The decoded target APK has one or more
//! disassembly roots (`smali/`, `smali_classes2/`, ...), each holding its
//! own top-level packages. This module finds the directory in the target
//! where a library package continues an existing namespace.
//!
//! # Algorithm
//!
//! Starting from the library root and the target's top-level packages,
//! every library child directory is compared by name against the child
//! directories of all current target candidates:
//!
//! - exactly one target child shares the name: its parent is the merge
//!   root and the search stops;
//! - no target child shares the name: that library child is ignored;
//! - several target children share the name: the search descends one
//!   level, once per matching target child, and the first deeper result
//!   wins.
//!
//! Library children are visited in sorted name order so results do not
//! depend on the filesystem's listing order. When more than one deeper
//! location would match, the first one found is returned; nothing checks
//! that the match is the only valid one.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name prefix of disassembly roots inside a decoded APK.
pub const DISASSEMBLY_ROOT_PREFIX: &str = "smali";

#[derive(Error, Debug)]
pub enum MatchError {
    #[error("library tree has no packages: {0}")]
    EmptyLibrary(PathBuf),

    #[error("no merge target found for package(s) {packages}")]
    NoMergeTarget { packages: String },

    #[error("package '{segment}' matched {count} locations and no deeper package tells them apart")]
    Ambiguous { segment: PackageSegment, count: usize },

    #[error("failed to list {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Final component of a directory path, compared by exact string equality.
///
/// Only UTF-8 names are segments. Java package names always are, and a
/// lossy conversion would make distinct names compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageSegment(String);

impl PackageSegment {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Segment of `path`, or `None` for paths ending in `..`, a root, or a
    /// non-UTF-8 name.
    pub fn of(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        Some(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<Path> for PackageSegment {
    fn as_ref(&self) -> &Path {
        Path::new(&self.0)
    }
}

/// Where a library namespace lands in the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRoot {
    /// Target directory the library subtree is merged into.
    pub directory: PathBuf,
    /// Library directory matched against `directory`.
    pub library_dir: PathBuf,
    /// Library package whose name was unique among the target candidates.
    pub segment: PackageSegment,
}

impl MergeRoot {
    /// Source and destination for copying the matched library code into
    /// the target.
    ///
    /// When the match was found at the top level, `library_dir` is the
    /// library root and only the matched `segment` is copied, into
    /// `directory/segment`. Deeper matches copy `library_dir` itself,
    /// which already lies inside the library's top-level package.
    pub fn splice_paths(&self, library_root: &Path) -> (PathBuf, PathBuf) {
        if self.library_dir == library_root {
            (
                library_root.join(&self.segment),
                self.directory.join(&self.segment),
            )
        } else {
            (self.library_dir.clone(), self.directory.clone())
        }
    }
}

/// Immediate child directories of `dir`, sorted by name.
pub fn child_dirs(dir: &Path) -> Result<Vec<PathBuf>, MatchError> {
    let io_err = |source| MatchError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        if entry.file_type().map_err(io_err)?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Disassembly roots (`smali`, `smali_classes2`, ...) of a decoded APK.
pub fn disassembly_roots(decoded_dir: &Path) -> Result<Vec<PathBuf>, MatchError> {
    Ok(child_dirs(decoded_dir)?
        .into_iter()
        .filter(|dir| {
            PackageSegment::of(dir)
                .is_some_and(|segment| segment.as_str().starts_with(DISASSEMBLY_ROOT_PREFIX))
        })
        .collect())
}

/// Top-level package directories across all `roots`, in root order.
pub fn top_level_packages(roots: &[PathBuf]) -> Result<Vec<PathBuf>, MatchError> {
    let mut packages = Vec::new();
    for root in roots {
        packages.extend(child_dirs(root)?);
    }
    Ok(packages)
}

/// Find the merge root for the first library top-level package that has
/// a unique counterpart among `target_roots`.
pub fn find_merge_root(
    library_root: &Path,
    target_roots: &[PathBuf],
) -> Result<MergeRoot, MatchError> {
    let library_children = child_dirs(library_root)?;
    resolve(library_root, &library_children, target_roots)
}

/// Find the merge root for one library top-level package.
pub fn find_merge_root_for(
    library_root: &Path,
    segment: &PackageSegment,
    target_roots: &[PathBuf],
) -> Result<MergeRoot, MatchError> {
    resolve(library_root, &[library_root.join(segment)], target_roots)
}

fn resolve(
    library_root: &Path,
    library_children: &[PathBuf],
    target_roots: &[PathBuf],
) -> Result<MergeRoot, MatchError> {
    if library_children.is_empty() {
        return Err(MatchError::EmptyLibrary(library_root.to_path_buf()));
    }

    match search(library_root, library_children, target_roots)? {
        Search::Found(root) => {
            tracing::info!(
                directory = %root.directory.display(),
                library = %root.library_dir.display(),
                "resolved merge root"
            );
            Ok(root)
        }
        Search::Ambiguous { segment, count } => Err(MatchError::Ambiguous { segment, count }),
        Search::Absent => Err(MatchError::NoMergeTarget {
            packages: library_children
                .iter()
                .filter_map(|child| PackageSegment::of(child))
                .map(|segment| segment.to_string())
                .collect::<Vec<_>>()
                .join(", "),
        }),
    }
}

enum Search {
    Found(MergeRoot),
    Ambiguous { segment: PackageSegment, count: usize },
    Absent,
}

/// One level of the depth-first search. `candidates` are target
/// directories whose children are compared with `library_children`.
fn search(
    library_dir: &Path,
    library_children: &[PathBuf],
    candidates: &[PathBuf],
) -> Result<Search, MatchError> {
    let mut target_children: Vec<(&Path, PackageSegment, PathBuf)> = Vec::new();
    for candidate in candidates {
        for child in child_dirs(candidate)? {
            if let Some(segment) = PackageSegment::of(&child) {
                target_children.push((candidate.as_path(), segment, child));
            }
        }
    }

    let mut ambiguous = None;
    for library_child in library_children {
        let Some(segment) = PackageSegment::of(library_child) else {
            continue;
        };
        let matches: Vec<_> = target_children
            .iter()
            .filter(|(_, name, _)| *name == segment)
            .collect();

        match matches.as_slice() {
            [] => {}
            [(parent, _, _)] => {
                return Ok(Search::Found(MergeRoot {
                    directory: parent.to_path_buf(),
                    library_dir: library_dir.to_path_buf(),
                    segment,
                }));
            }
            _ => {
                tracing::debug!(%segment, count = matches.len(), "ambiguous package, descending");
                let grandchildren = child_dirs(library_child)?;
                for (_, _, target_child) in &matches {
                    let deeper = search(
                        library_child,
                        &grandchildren,
                        std::slice::from_ref(target_child),
                    )?;
                    match deeper {
                        Search::Found(root) => return Ok(Search::Found(root)),
                        Search::Ambiguous { segment, count } => {
                            if ambiguous.is_none() {
                                ambiguous = Some(Search::Ambiguous { segment, count });
                            }
                        }
                        Search::Absent => {}
                    }
                }
                if ambiguous.is_none() {
                    ambiguous = Some(Search::Ambiguous {
                        segment,
                        count: matches.len(),
                    });
                }
            }
        }
    }

    Ok(ambiguous.unwrap_or(Search::Absent))
}
