//! Document tags.
//!
//! A tag is the document's identifier within its map. It is built from the
//! module id with dots replaced by underscores, prefixed by the step and uid
//! and suffixed by the name and state, every present part joined with `_`,
//! and the whole prefixed with a single `_`:
//!
//! ```text
//! make_tag("linux.apt.package", None, Some("1"), None, Some("installed"))
//!     == "_1_linux_apt_package_installed"
//! ```

/// Build a document tag. Empty parts are skipped.
pub fn make_tag(
    module: &str,
    uid: Option<&str>,
    step: Option<&str>,
    name: Option<&str>,
    state: Option<&str>,
) -> String {
    let mut tag = module.replace('.', "_");

    for prefix in [step, uid].into_iter().flatten() {
        if !prefix.is_empty() {
            tag = format!("{}_{}", prefix, tag);
        }
    }
    for suffix in [name, state].into_iter().flatten() {
        if !suffix.is_empty() {
            tag.push('_');
            tag.push_str(suffix);
        }
    }

    format!("_{}", tag)
}
