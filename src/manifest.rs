//! Structured handoff of persisted QC artifacts.
//!
//! Downstream report aggregation receives an explicit manifest of what was
//! written where, instead of re-discovering artifacts by globbing output
//! directories for filename patterns.

use std::path::{Path, PathBuf};

/// The kinds of artifacts this crate's pipeline persists per subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Classified ribbon boundary volume.
    RibbonMap,
    /// Surface occupancy mask volume.
    SurfaceMask,
    /// Composed registration panel graphic.
    RegistrationPanel,
}

/// One persisted artifact, addressed by subject and optional session.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactEntry {
    pub subject_id: String,
    pub session_id: Option<String>,
    pub kind: ArtifactKind,
    pub path: PathBuf,
}

/// Manifest of persisted artifacts, filled as the pipeline runs and handed
/// to the report aggregator afterwards.
#[derive(Debug, Clone, Default)]
pub struct ArtifactManifest {
    entries: Vec<ArtifactEntry>,
}

impl ArtifactManifest {
    pub fn new() -> ArtifactManifest {
        ArtifactManifest::default()
    }

    pub fn record<P: AsRef<Path>>(
        &mut self,
        subject_id: &str,
        session_id: Option<&str>,
        kind: ArtifactKind,
        path: P,
    ) {
        self.entries.push(ArtifactEntry {
            subject_id: String::from(subject_id),
            session_id: session_id.map(String::from),
            kind,
            path: path.as_ref().to_path_buf(),
        });
    }

    pub fn entries(&self) -> &[ArtifactEntry] {
        &self.entries
    }

    /// All entries recorded for one subject, in recording order.
    pub fn for_subject(&self, subject_id: &str) -> Vec<&ArtifactEntry> {
        self.entries
            .iter()
            .filter(|e| e.subject_id == subject_id)
            .collect()
    }

    /// The first entry of the given kind for a subject, if any.
    pub fn find(&self, subject_id: &str, kind: ArtifactKind) -> Option<&ArtifactEntry> {
        self.entries
            .iter()
            .find(|e| e.subject_id == subject_id && e.kind == kind)
    }
}

/// Deterministic artifact file name from subject and session identifiers,
/// e.g. `sub-01_ses-1_desc-brainplot_T1w.svg`.
pub fn artifact_filename(
    subject_id: &str,
    session_id: Option<&str>,
    desc: &str,
    suffix: &str,
    extension: &str,
) -> String {
    match session_id {
        Some(ses) => format!(
            "sub-{}_ses-{}_desc-{}_{}.{}",
            subject_id, ses, desc, suffix, extension
        ),
        None => format!("sub-{}_desc-{}_{}.{}", subject_id, desc, suffix, extension),
    }
}
