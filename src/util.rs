//! Utility functions used in all other ribbonqc modules.

use std::path::Path;

/// Check whether the file name indicates GZip compression.
///
/// Both the generic ".gz" ending and the FreeSurfer ".mgz" volume ending
/// count as compressed.
pub fn is_gz_file<P>(path: P) -> bool
where
    P: AsRef<Path>,
{
    path.as_ref()
        .file_name()
        .map(|a| {
            let name = a.to_string_lossy();
            name.ends_with(".gz") || name.ends_with(".mgz")
        })
        .unwrap_or(false)
}
