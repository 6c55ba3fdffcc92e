//! Tree Composer: composition plan → files under a destination root.
//!
//! Steps are applied strictly in plan order and a later step overwrites an
//! earlier step's file at the same path. After the steps, manifest
//! dependencies, `.env` declarations and config documents are merged into
//! whatever the steps wrote.
//!
//! Every write goes to `root.join(relative)` where `relative` is a
//! `RelativePath`, so nothing can land outside the root. There is no
//! rollback: the first failure is returned and partial output stays.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::{
    application::{
        CompositionError, EngineContext,
        ports::{Filesystem, FragmentLibrary, ManifestEditor},
    },
    domain::{CompositionPlan, EnvFile, FragmentContent, FragmentNode, RelativePath},
};

/// The output of one materialisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedTree {
    pub root: PathBuf,
    /// Every written file, relative to `root`, in first-write order.
    pub files: Vec<RelativePath>,
}

impl MaterializedTree {
    fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            files: Vec::new(),
        }
    }

    fn record(&mut self, path: RelativePath) {
        if !self.files.contains(&path) {
            self.files.push(path);
        }
    }

    /// Sorted, de-duplicated first path components of every written file.
    pub fn top_level_entries(&self) -> Vec<String> {
        let mut entries: Vec<String> = self
            .files
            .iter()
            .filter_map(|p| p.top_level().map(str::to_string))
            .collect();
        entries.sort();
        entries.dedup();
        entries
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.iter().any(|p| p.as_str() == path)
    }
}

/// Writes composition plans through the filesystem port.
#[derive(Clone)]
pub struct Composer {
    library: Arc<dyn FragmentLibrary>,
    filesystem: Arc<dyn Filesystem>,
    editor: Arc<dyn ManifestEditor>,
}

impl Composer {
    pub fn new(ctx: &EngineContext) -> Self {
        Self {
            library: Arc::clone(&ctx.library),
            filesystem: Arc::clone(&ctx.filesystem),
            editor: Arc::clone(&ctx.editor),
        }
    }

    /// Materialise `plan` under `root`.
    ///
    /// Precondition: `root` exists and is writable.
    #[instrument(skip_all, fields(root = %root.display(), steps = plan.steps.len()))]
    pub fn materialize(
        &self,
        plan: &CompositionPlan,
        root: &Path,
    ) -> Result<MaterializedTree, CompositionError> {
        let mut tree = MaterializedTree::new(root);

        for step in &plan.steps {
            let fragment = self.library.get(&step.fragment).ok_or_else(|| {
                CompositionError::FragmentNotFound {
                    key: step.fragment.to_string(),
                }
            })?;

            debug!(fragment = %step.fragment, destination = %step.destination, "Applying step");

            for node in &fragment.nodes {
                let relative = join(&step.destination, node.path())?;
                let target = root.join(relative.as_path());

                match node {
                    FragmentNode::Directory(_) => self.filesystem.create_dir_all(&target)?,
                    FragmentNode::File(file) => {
                        let bytes = match &file.content {
                            FragmentContent::Text(text) => step
                                .substitutions
                                .render(text)
                                .map_err(|unbound| CompositionError::UnboundPlaceholder {
                                    placeholder: unbound.0,
                                    fragment: step.fragment.to_string(),
                                    path: relative.to_string(),
                                })?
                                .into_bytes(),
                            FragmentContent::Binary(bytes) => bytes.clone(),
                        };
                        self.write(root, &relative, &bytes)?;
                        tree.record(relative);
                    }
                }
            }
        }

        for dir in &plan.manifest_patches.directories {
            debug!(directory = %dir, "Creating folder");
            self.filesystem.create_dir_all(&root.join(dir.as_path()))?;
        }

        self.merge_manifest(plan, root, &mut tree)?;
        self.merge_env(plan, root, &mut tree)?;
        self.write_documents(plan, root, &mut tree)?;

        info!(files = tree.files.len(), "Plan materialised");
        Ok(tree)
    }

    fn merge_manifest(
        &self,
        plan: &CompositionPlan,
        root: &Path,
        tree: &mut MaterializedTree,
    ) -> Result<(), CompositionError> {
        let patches = &plan.manifest_patches;
        if patches.dependencies.is_empty() {
            return Ok(());
        }

        let manifest = &patches.manifest;
        let existing = self.read_text(root, &manifest.path)?;
        let merged = self
            .editor
            .merge_dependencies(manifest, existing.as_deref(), &patches.dependencies)?;

        debug!(
            manifest = %manifest.path,
            dependencies = patches.dependencies.len(),
            created = existing.is_none(),
            "Merged dependencies"
        );
        self.write(root, &manifest.path, merged.as_bytes())?;
        tree.record(manifest.path.clone());
        Ok(())
    }

    fn merge_env(
        &self,
        plan: &CompositionPlan,
        root: &Path,
        tree: &mut MaterializedTree,
    ) -> Result<(), CompositionError> {
        let patches = &plan.manifest_patches;
        if patches.env.is_empty() {
            return Ok(());
        }

        let mut env = self
            .read_text(root, &patches.env_file)?
            .map(|text| EnvFile::parse(&text))
            .unwrap_or_default();
        for decl in &patches.env {
            env.declare(decl);
        }

        debug!(variables = env.len(), "Merged environment file");
        self.write(root, &patches.env_file, env.render().as_bytes())?;
        tree.record(patches.env_file.clone());
        Ok(())
    }

    fn write_documents(
        &self,
        plan: &CompositionPlan,
        root: &Path,
        tree: &mut MaterializedTree,
    ) -> Result<(), CompositionError> {
        for document in &plan.manifest_patches.documents {
            let existing = self.read_text(root, &document.path)?;
            let text = self.editor.render_document(document, existing.as_deref())?;
            self.write(root, &document.path, text.as_bytes())?;
            tree.record(document.path.clone());
        }
        Ok(())
    }

    fn write(&self, root: &Path, relative: &RelativePath, bytes: &[u8]) -> Result<(), CompositionError> {
        let target = root.join(relative.as_path());
        if let Some(parent) = target.parent() {
            self.filesystem.create_dir_all(parent)?;
        }
        self.filesystem.write_file(&target, bytes)
    }

    fn read_text(
        &self,
        root: &Path,
        relative: &RelativePath,
    ) -> Result<Option<String>, CompositionError> {
        let target = root.join(relative.as_path());
        if !self.filesystem.exists(&target) {
            return Ok(None);
        }
        let bytes = self.filesystem.read_file(&target)?;
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|e| CompositionError::merge(&target, e))
    }
}

fn join(destination: &RelativePath, path: &RelativePath) -> Result<RelativePath, CompositionError> {
    destination
        .join(path.as_path())
        .map_err(|e| CompositionError::write_failure(path.as_path(), e))
}
