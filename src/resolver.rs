//! Version selection.
//!
//! Pure resolution logic: no I/O, no side effects — callers hand in the
//! candidate lists (a preference-ordered package listing, or tags from a
//! source repository) and get back a concrete version or an error carrying
//! every candidate for operator diagnosis.
//!
//! # Resolution rules
//!
//! | Requested              | Package listing            | Release tags             |
//! |------------------------|----------------------------|--------------------------|
//! | `latest`/`lts`/`stable`| first (tool's preference)  | maximum by version order |
//! | prefix (`1.2`)         | prefix component match     | `1.2` or `1.2.*`, newest |
//! | no match               | error with all candidates  | error with all candidates|
//!
//! Tie-break: always the newest version satisfying the constraint; never
//! average, interpolate, or guess.
//!
//! # What this explicitly refuses to do
//!
//! - Query apt or the network: callers own I/O (`apt`, `fetch`)
//! - Validate that a resolved version is installable: that surfaces at
//!   install time

use std::cmp::Ordering;

use crate::error::{ProvisionError, Result};
use crate::types::VersionSpec;

/// Compare two dotted version strings by numeric segment order.
///
/// `1.10.0` sorts above `1.9.0`; a missing segment sorts below a present
/// one (`1.2` < `1.2.0`). Non-numeric segments fall back to lexical order.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(nx), Ok(ny)) => nx.cmp(&ny),
                    _ => x.cmp(y),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

/// Strip a Debian epoch (`N:`) from a package version string.
fn strip_epoch(version: &str) -> &str {
    match version.split_once(':') {
        Some((epoch, rest)) if !epoch.is_empty() && epoch.bytes().all(|b| b.is_ascii_digit()) => {
            rest
        }
        _ => version,
    }
}

/// Whether `requested` matches `candidate` as a prefix component of a
/// Debian package version.
///
/// The epoch is ignored, and the character after the prefix must be a
/// component boundary (`.`, `+`, `-`, `~`) or end-of-string, so `20.10`
/// matches `20.10.5+azure-1` but not `20.100.1`.
fn debian_prefix_matches(requested: &str, candidate: &str) -> bool {
    let bare = strip_epoch(candidate);
    match bare.strip_prefix(requested) {
        Some(rest) => rest.is_empty() || matches!(rest.as_bytes()[0], b'.' | b'+' | b'-' | b'~'),
        None => false,
    }
}

/// Resolve a version request against a preference-ordered package listing.
///
/// `candidates` must be in the package tool's own preference order (most
/// preferred first), as produced by [`crate::apt::AptClient::available_versions`].
/// The returned string is the full candidate (epoch and revision included),
/// suitable for `pkg=version` pinning.
pub fn resolve_package_version(
    subject: &str,
    spec: &VersionSpec,
    candidates: &[String],
) -> Result<String> {
    if candidates.is_empty() {
        return Err(ProvisionError::resolution(subject, spec.to_string(), vec![]));
    }
    match spec {
        VersionSpec::Latest => Ok(candidates[0].clone()),
        VersionSpec::Pinned(requested) => candidates
            .iter()
            .find(|candidate| debian_prefix_matches(requested, candidate))
            .cloned()
            .ok_or_else(|| {
                ProvisionError::resolution(subject, requested.clone(), candidates.to_vec())
            }),
        VersionSpec::Skip => Err(ProvisionError::resolution(
            subject,
            spec.to_string(),
            candidates.to_vec(),
        )),
    }
}

/// Extract normalized version strings from raw `git ls-remote --tags` refs.
///
/// `prefix` is the tag prefix to strip (`"v"` for `v2.2.3`-style tags) and
/// `separator` is the digit-group separator used by the tag scheme, which is
/// normalized to `.`. Annotated-tag peel markers (`^{}`) and non-version
/// tags are dropped; the result is deduplicated and sorted newest-first.
pub fn extract_versions(tags: &[String], prefix: &str, separator: char) -> Vec<String> {
    let mut versions: Vec<String> = tags
        .iter()
        .filter_map(|tag| {
            let name = tag.rsplit('/').next().unwrap_or(tag);
            let name = name.strip_suffix("^{}").unwrap_or(name);
            let name = name.strip_prefix(prefix).unwrap_or(name);
            if name.is_empty() {
                return None;
            }
            let normalized: String = name
                .chars()
                .map(|c| if c == separator { '.' } else { c })
                .collect();
            if normalized.split('.').all(|seg| {
                !seg.is_empty() && seg.bytes().all(|b| b.is_ascii_digit())
            }) {
                Some(normalized)
            } else {
                None
            }
        })
        .collect();
    versions.sort_by(|a, b| compare_versions(b, a));
    versions.dedup();
    versions
}

/// Whether `requested` is `candidate` or a dot-boundary prefix of it
/// (`1.2` matches `1.2.3` but not `1.22.0`).
fn tag_prefix_matches(requested: &str, candidate: &str) -> bool {
    match candidate.strip_prefix(requested) {
        Some(rest) => rest.is_empty() || rest.starts_with('.'),
        None => false,
    }
}

/// Resolve a version request against release tags.
///
/// `candidates` is the output of [`extract_versions`] (normalized,
/// newest-first). After selection the chosen value is re-validated against
/// the candidate list; any miss — including a skip sentinel reaching this
/// far — fails loudly with the full list.
pub fn resolve_release_tag(
    subject: &str,
    spec: &VersionSpec,
    candidates: &[String],
) -> Result<String> {
    let chosen = match spec {
        VersionSpec::Latest => candidates.first().cloned(),
        VersionSpec::Pinned(requested) => candidates
            .iter()
            .find(|candidate| tag_prefix_matches(requested, candidate))
            .cloned(),
        VersionSpec::Skip => None,
    };
    match chosen {
        Some(version) if candidates.iter().any(|c| c == &version) => Ok(version),
        _ => Err(ProvisionError::resolution(
            subject,
            spec.to_string(),
            candidates.to_vec(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    // =========================================================================
    // Version ordering
    // =========================================================================

    #[test]
    fn test_compare_versions_is_numeric_not_lexical() {
        assert_eq!(compare_versions("1.10.0", "1.9.0"), Ordering::Greater);
        assert_eq!(compare_versions("1.2.0", "1.10.0"), Ordering::Less);
        assert_eq!(compare_versions("2.0.0", "2.0.0"), Ordering::Equal);
        assert_eq!(compare_versions("1.2", "1.2.0"), Ordering::Less);
    }

    #[test]
    fn test_latest_tag_selects_version_order_maximum() {
        let candidates = owned(&["1.9.0", "1.10.0", "1.2.0"]);
        let mut sorted = candidates.clone();
        sorted.sort_by(|a, b| compare_versions(b, a));
        assert_eq!(
            resolve_release_tag("compose", &VersionSpec::Latest, &sorted).unwrap(),
            "1.10.0"
        );
    }

    // =========================================================================
    // Package listing resolution
    // =========================================================================

    #[test]
    fn test_package_latest_takes_first_preferred() {
        let candidates = owned(&["5:20.10.6~3-0~ubuntu-focal", "5:20.10.5~3-0~ubuntu-focal"]);
        assert_eq!(
            resolve_package_version("docker-ce", &VersionSpec::Latest, &candidates).unwrap(),
            "5:20.10.6~3-0~ubuntu-focal"
        );
    }

    #[test]
    fn test_package_prefix_matches_through_epoch_and_revision() {
        let candidates = owned(&[
            "5:20.10.6~3-0~ubuntu-focal",
            "5:20.10.5~3-0~ubuntu-focal",
            "5:19.3.15~3-0~ubuntu-focal",
        ]);
        let spec = VersionSpec::Pinned("20.10.5".to_string());
        assert_eq!(
            resolve_package_version("docker-ce", &spec, &candidates).unwrap(),
            "5:20.10.5~3-0~ubuntu-focal"
        );

        // A shorter prefix takes the most preferred match
        let spec = VersionSpec::Pinned("20.10".to_string());
        assert_eq!(
            resolve_package_version("docker-ce", &spec, &candidates).unwrap(),
            "5:20.10.6~3-0~ubuntu-focal"
        );
    }

    #[test]
    fn test_package_prefix_respects_component_boundary() {
        let candidates = owned(&["20.100.1-1", "20.10.5-1"]);
        let spec = VersionSpec::Pinned("20.10".to_string());
        assert_eq!(
            resolve_package_version("moby-engine", &spec, &candidates).unwrap(),
            "20.10.5-1"
        );
    }

    #[test]
    fn test_package_no_match_lists_all_candidates() {
        let candidates = owned(&["20.10.5-1", "19.3.15-1"]);
        let spec = VersionSpec::Pinned("99.9".to_string());
        let err = resolve_package_version("moby-engine", &spec, &candidates).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("20.10.5-1"));
        assert!(msg.contains("19.3.15-1"));
    }

    // =========================================================================
    // Release tag extraction and resolution
    // =========================================================================

    #[test]
    fn test_extract_versions_from_ls_remote_refs() {
        let tags = owned(&[
            "refs/tags/v2.2.3",
            "refs/tags/v2.2.3^{}",
            "refs/tags/v2.10.0",
            "refs/tags/v2.9.1",
            "refs/tags/docs-update",
        ]);
        assert_eq!(
            extract_versions(&tags, "v", '.'),
            owned(&["2.10.0", "2.9.1", "2.2.3"])
        );
    }

    #[test]
    fn test_extract_versions_normalizes_separator() {
        let tags = owned(&["refs/tags/1_29_2", "refs/tags/1_28_0"]);
        assert_eq!(extract_versions(&tags, "", '_'), owned(&["1.29.2", "1.28.0"]));
    }

    #[test]
    fn test_tag_prefix_of_exactly_one_candidate() {
        let candidates = owned(&["2.10.0", "1.29.2", "1.28.0"]);
        let spec = VersionSpec::Pinned("1.29".to_string());
        assert_eq!(
            resolve_release_tag("compose", &spec, &candidates).unwrap(),
            "1.29.2"
        );
    }

    #[test]
    fn test_tag_prefix_does_not_match_across_boundary() {
        let candidates = owned(&["1.22.0", "1.2.1"]);
        let spec = VersionSpec::Pinned("1.2".to_string());
        assert_eq!(
            resolve_release_tag("compose", &spec, &candidates).unwrap(),
            "1.2.1"
        );
    }

    #[test]
    fn test_tag_no_match_fails_with_candidates() {
        let candidates = owned(&["2.10.0", "2.9.1"]);
        let spec = VersionSpec::Pinned("3".to_string());
        let err = resolve_release_tag("compose-switch", &spec, &candidates).unwrap_err();
        assert!(err.to_string().contains("2.10.0"));
        assert!(err.to_string().contains("2.9.1"));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_skip_sentinel_reaching_resolution_fails_loudly() {
        let candidates = owned(&["2.10.0"]);
        let err = resolve_release_tag("compose", &VersionSpec::Skip, &candidates).unwrap_err();
        assert!(matches!(err, ProvisionError::Resolution { .. }));
    }

    #[test]
    fn test_empty_candidate_list_is_an_error() {
        assert!(resolve_package_version("moby-cli", &VersionSpec::Latest, &[]).is_err());
        assert!(resolve_release_tag("compose", &VersionSpec::Latest, &[]).is_err());
    }
}
