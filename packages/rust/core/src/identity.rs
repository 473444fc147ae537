//! Deterministic notebook identity.

use nbindex_shared::Notebook;

/// Placeholder for a missing meme or signature component.
const UNDEFINED: &str = "undefined";
const UNKNOWN: &str = "unknown";

/// The last `/`-separated segment of `path`.
pub fn filename_of(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Derive the document id of a notebook stored at `path`.
///
/// | metadata                                  | id                               |
/// |-------------------------------------------|----------------------------------|
/// | no notebook meme                          | `unknown_undefined_{filename}`   |
/// | meme, no server `signature_id`            | `unknown_{current}_{filename}`   |
/// | meme and server `signature_id`            | `{signature_id}_{current}_{filename}` |
///
/// A meme without `current` contributes `undefined`. Never fails.
pub fn notebook_id(path: &str, notebook: &Notebook) -> String {
    let filename = filename_of(path);

    let Some(meme) = notebook.meme() else {
        return format!("{UNKNOWN}_{UNDEFINED}_{filename}");
    };
    let current = meme.current.as_deref().unwrap_or(UNDEFINED);

    match notebook.signature().and_then(|s| s.signature_id.as_deref()) {
        Some(signature_id) => format!("{signature_id}_{current}_{filename}"),
        None => format!("{UNKNOWN}_{current}_{filename}"),
    }
}
