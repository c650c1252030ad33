use bootplane::handle::{normalize_path, resolve_under, within_root, HandleTable};
use sha2::{Digest, Sha256};

#[test]
fn round_trip() {
    let table = HandleTable::new();
    let fh = table.handle_for_path("/tmp/some/path");
    assert_eq!(table.path_for_handle(&fh).as_deref(), Some("/tmp/some/path"));
}

#[test]
fn equivalent_paths_share_a_handle() {
    let table = HandleTable::new();
    let canonical = table.handle_for_path("/tmp/some/path");
    assert_eq!(table.handle_for_path("/tmp/some/./path"), canonical);
    assert_eq!(table.handle_for_path("/tmp//some/path"), canonical);
    assert_eq!(table.handle_for_path("/tmp/some/extra/../path"), canonical);
}

#[test]
fn handle_is_sha256_of_canonical_path() {
    let table = HandleTable::new();
    let fh = table.handle_for_path("/boot");
    let expected: [u8; 32] = Sha256::digest(b"/boot").into();
    assert_eq!(fh, expected);
}

#[test]
fn unknown_handles_are_not_found() {
    let table = HandleTable::new();
    table.handle_for_path("/known");
    assert!(table.path_for_handle(&[0_u8; 32]).is_none());

    // Almost-right is still unknown: lookups match the full 32 bytes.
    let mut close = table.handle_for_path("/known");
    close[31] ^= 1;
    assert!(table.path_for_handle(&close).is_none());
}

#[test]
fn normalization_is_lexical() {
    assert_eq!(normalize_path("/a/b/../c"), "/a/c");
    assert_eq!(normalize_path("/a//b///c/"), "/a/b/c");
    assert_eq!(normalize_path("/./a/./b"), "/a/b");
    assert_eq!(normalize_path("/.."), "/");
    assert_eq!(normalize_path("/"), "/");
    assert_eq!(normalize_path(""), ".");
    assert_eq!(normalize_path("a/../../b"), "../b");
}

#[test]
fn resolution_against_a_base() {
    assert_eq!(resolve_under("/", "/boot"), "/boot");
    assert_eq!(resolve_under("/export", "/boot"), "/export/boot");
    assert_eq!(resolve_under("/export", "boot/../kernel"), "/export/kernel");

    assert!(within_root("/export", "/export/boot"));
    assert!(within_root("/export", "/export"));
    assert!(!within_root("/export", "/exportable"));
    assert!(!within_root("/export", "/etc/passwd"));
    assert!(within_root("/", "/anything"));
}
