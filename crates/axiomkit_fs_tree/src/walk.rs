//! Depth-first traversal engine and the visitor contract.
//!
//! [`walk_tree`] visits a rooted tree one directory level at a time:
//! `pre_visit_directory` before a directory's children, `visit_file` for every
//! non-directory, `post_visit_directory` after the children, and
//! `visit_file_failed` whenever an entry cannot be inspected or listed.
//! The engine performs no mutation; all filesystem access goes through the
//! [`FsProvider`].

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::{debug, trace, warn};

use crate::provider::FsProvider;
use crate::spec::{
    EnumEntryKind, EnumFsErrorKind, EnumVisitControl, SpecEntryAttrs, SpecEntryIdentity,
    SpecFsError, SpecVisitEntry, SpecWalkOptions,
};

/// Callbacks invoked by [`walk_tree`].
///
/// Every method defaults to `Ok(Continue)`. Returning `Err` from a callback
/// hands the error to the enclosing directory's `post_visit_directory`
/// (or out of `walk_tree` when raised at the root).
pub trait TreeVisitor {
    /// Called for a directory before any of its children.
    fn pre_visit_directory(
        &mut self,
        entry: &SpecVisitEntry,
        attrs: &SpecEntryAttrs,
    ) -> Result<EnumVisitControl, SpecFsError> {
        let _ = (entry, attrs);
        Ok(EnumVisitControl::Continue)
    }

    /// Called for each file, unfollowed symlink, or special entry.
    fn visit_file(
        &mut self,
        entry: &SpecVisitEntry,
        attrs: &SpecEntryAttrs,
    ) -> Result<EnumVisitControl, SpecFsError> {
        let _ = (entry, attrs);
        Ok(EnumVisitControl::Continue)
    }

    /// Called instead of the visit when an entry cannot be inspected or listed,
    /// or when following it would close a symlink cycle.
    fn visit_file_failed(
        &mut self,
        entry: &SpecVisitEntry,
        error: SpecFsError,
    ) -> Result<EnumVisitControl, SpecFsError> {
        let _ = (entry, error);
        Ok(EnumVisitControl::Continue)
    }

    /// Called after a directory's children; `error` carries a failure a child
    /// callback did not recover from.
    fn post_visit_directory(
        &mut self,
        entry: &SpecVisitEntry,
        error: Option<SpecFsError>,
    ) -> Result<EnumVisitControl, SpecFsError> {
        let _ = (entry, error);
        Ok(EnumVisitControl::Continue)
    }
}

/// Result of one [`walk_tree`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpecWalkSummary {
    /// Entries handed to any callback (root included).
    pub cnt_visited: u64,
    /// A callback returned `Terminate`.
    pub if_terminated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnumFlow {
    Continue,
    SkipSiblings,
    Terminate,
}

impl EnumFlow {
    fn from_leaf(control: EnumVisitControl) -> Self {
        match control {
            EnumVisitControl::Continue | EnumVisitControl::SkipSubtree => Self::Continue,
            EnumVisitControl::SkipSiblings => Self::SkipSiblings,
            EnumVisitControl::Terminate => Self::Terminate,
        }
    }
}

struct WalkContext<'a, P: ?Sized, V: ?Sized> {
    provider: &'a P,
    visitor: &'a mut V,
    spec_walk_options: &'a SpecWalkOptions,
    set_ancestors: HashSet<SpecEntryIdentity>,
    cnt_visited: u64,
}

/// Walk the tree rooted at `path_root`, driving `visitor`.
///
/// Filesystem failures never escape as `Err`; they reach the visitor through
/// `visit_file_failed`. `Err` is returned only when the visitor itself
/// propagates an error out of the root entry.
pub fn walk_tree<P, V>(
    path_root: impl AsRef<Path>,
    spec_walk_options: &SpecWalkOptions,
    provider: &P,
    visitor: &mut V,
) -> Result<SpecWalkSummary, SpecFsError>
where
    P: FsProvider + ?Sized,
    V: TreeVisitor + ?Sized,
{
    let path_root = path_root.as_ref().to_path_buf();
    debug!(
        "Walking {} (follow_links={}, depth_max={:?})",
        path_root.display(),
        spec_walk_options.if_follow_links,
        spec_walk_options.depth_max
    );

    let mut walk_ctx = WalkContext {
        provider,
        visitor,
        spec_walk_options,
        set_ancestors: HashSet::new(),
        cnt_visited: 0,
    };
    let flow = walk_ctx.visit_entry(path_root, PathBuf::new(), 0)?;
    Ok(SpecWalkSummary {
        cnt_visited: walk_ctx.cnt_visited,
        if_terminated: flow == EnumFlow::Terminate,
    })
}

impl<P, V> WalkContext<'_, P, V>
where
    P: FsProvider + ?Sized,
    V: TreeVisitor + ?Sized,
{
    fn visit_entry(
        &mut self,
        path: PathBuf,
        path_relative: PathBuf,
        depth: usize,
    ) -> Result<EnumFlow, SpecFsError> {
        self.cnt_visited += 1;
        trace!("Visiting {}", path.display());

        let (attrs, if_is_symlink) = match self.read_attrs(&path) {
            Ok(v) => v,
            Err(error) => {
                let entry = SpecVisitEntry {
                    path,
                    path_relative,
                    depth,
                    if_is_symlink: false,
                };
                let control = self.visitor.visit_file_failed(&entry, error)?;
                return Ok(EnumFlow::from_leaf(control));
            }
        };

        let entry = SpecVisitEntry {
            path,
            path_relative,
            depth,
            if_is_symlink,
        };
        if attrs.is_dir() {
            return self.visit_directory(&entry, &attrs);
        }
        let control = self.visitor.visit_file(&entry, &attrs)?;
        Ok(EnumFlow::from_leaf(control))
    }

    /// Snapshot attributes; a broken followed link falls back to the link itself.
    fn read_attrs(&self, path: &Path) -> Result<(SpecEntryAttrs, bool), SpecFsError> {
        let attrs_link = self.provider.stat(path, false)?;
        let if_is_symlink = attrs_link.kind == EnumEntryKind::Symlink;
        if !if_is_symlink || !self.spec_walk_options.if_follow_links {
            return Ok((attrs_link, if_is_symlink));
        }
        match self.provider.stat(path, true) {
            Ok(attrs_target) => Ok((attrs_target, true)),
            Err(e) if e.kind == EnumFsErrorKind::NotFound => Ok((attrs_link, true)),
            Err(e) => Err(e),
        }
    }

    fn is_depth_exhausted(&self, depth: usize) -> bool {
        self.spec_walk_options
            .depth_max
            .is_some_and(|n_depth_max| depth >= n_depth_max)
    }

    fn visit_directory(
        &mut self,
        entry: &SpecVisitEntry,
        attrs: &SpecEntryAttrs,
    ) -> Result<EnumFlow, SpecFsError> {
        let identity = attrs.identity.clone();
        if self.spec_walk_options.if_follow_links
            && identity
                .as_ref()
                .is_some_and(|id| self.set_ancestors.contains(id))
        {
            warn!("Symlink loop detected: {}", entry.path.display());
            let control = self
                .visitor
                .visit_file_failed(entry, SpecFsError::cycle(&entry.path))?;
            return Ok(EnumFlow::from_leaf(control));
        }

        // Listed before the pre-visit: an unreadable directory is reported as
        // a failure and never pre-visited.
        let l_names = if self.is_depth_exhausted(entry.depth) {
            None
        } else {
            match self.provider.list_entries(&entry.path) {
                Ok(mut v) => {
                    v.sort();
                    Some(v)
                }
                Err(error) => return self.visit_unlisted_directory(entry, error),
            }
        };

        let control_pre = self.visitor.pre_visit_directory(entry, attrs)?;
        let mut error_child = None;
        match control_pre {
            EnumVisitControl::Terminate => return Ok(EnumFlow::Terminate),
            EnumVisitControl::SkipSubtree => {
                debug!("Subtree skipped: {}", entry.path.display());
            }
            EnumVisitControl::Continue | EnumVisitControl::SkipSiblings => {
                if let Some(l_names) = l_names {
                    let b_inserted = identity
                        .as_ref()
                        .is_some_and(|id| self.set_ancestors.insert(id.clone()));
                    let res_children = self.walk_children(entry, l_names);
                    if b_inserted && let Some(id) = identity.as_ref() {
                        self.set_ancestors.remove(id);
                    }
                    match res_children {
                        Ok(EnumFlow::Terminate) => return Ok(EnumFlow::Terminate),
                        Ok(_) => {}
                        Err(e) => error_child = Some(e),
                    }
                }
            }
        }

        let control_post = self.visitor.post_visit_directory(entry, error_child)?;
        if control_post == EnumVisitControl::Terminate {
            return Ok(EnumFlow::Terminate);
        }
        if control_pre == EnumVisitControl::SkipSiblings
            || control_post == EnumVisitControl::SkipSiblings
        {
            return Ok(EnumFlow::SkipSiblings);
        }
        Ok(EnumFlow::Continue)
    }

    /// A directory whose listing failed gets the failure callback and then its
    /// post-visit, with no pre-visit.
    fn visit_unlisted_directory(
        &mut self,
        entry: &SpecVisitEntry,
        error: SpecFsError,
    ) -> Result<EnumFlow, SpecFsError> {
        debug!("Cannot list {}: {}", entry.path.display(), error);
        let flow_failed = EnumFlow::from_leaf(self.visitor.visit_file_failed(entry, error)?);
        if flow_failed == EnumFlow::Terminate {
            return Ok(EnumFlow::Terminate);
        }

        let control_post = self.visitor.post_visit_directory(entry, None)?;
        if control_post == EnumVisitControl::Terminate {
            return Ok(EnumFlow::Terminate);
        }
        if flow_failed == EnumFlow::SkipSiblings || control_post == EnumVisitControl::SkipSiblings
        {
            return Ok(EnumFlow::SkipSiblings);
        }
        Ok(EnumFlow::Continue)
    }

    fn walk_children(
        &mut self,
        entry: &SpecVisitEntry,
        l_names: Vec<OsString>,
    ) -> Result<EnumFlow, SpecFsError> {
        debug!(
            "Entering directory {} ({} entries)",
            entry.path.display(),
            l_names.len()
        );

        for name in l_names {
            let path_child = entry.path.join(&name);
            let path_relative_child = entry.path_relative.join(&name);
            match self.visit_entry(path_child, path_relative_child, entry.depth + 1)? {
                EnumFlow::Continue => {}
                EnumFlow::SkipSiblings => break,
                EnumFlow::Terminate => return Ok(EnumFlow::Terminate),
            }
        }

        debug!("Leaving directory {}", entry.path.display());
        Ok(EnumFlow::Continue)
    }
}
