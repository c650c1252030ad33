use std::io::Write as _;
use std::sync::Arc;

use bootplane::tftp::{is_hex_ipv4_name, ReadHandler, SingleFileHandler};

/// Old boot PROMs request their image as their own IPv4 address spelled
/// out in exactly eight hex digits.
#[test]
fn hex_ipv4_names_are_recognized() {
    assert!(is_hex_ipv4_name("C0A8010A"));
    assert!(is_hex_ipv4_name("c0a8010a"));
    assert!(is_hex_ipv4_name("00000000"));
    assert!(is_hex_ipv4_name("DEADBEEF"));
}

#[test]
fn other_names_are_not_hex_ipv4() {
    assert!(!is_hex_ipv4_name("C0A8010"), "seven digits");
    assert!(!is_hex_ipv4_name("C0A8010AZ"), "trailing non-hex");
    assert!(!is_hex_ipv4_name("C0A8010G"), "non-hex digit");
    assert!(!is_hex_ipv4_name(".."));
    assert!(!is_hex_ipv4_name(""));
    assert!(!is_hex_ipv4_name("boot.img"));
}

/// Whatever the requested name, hex hint or not, the handler serves the
/// one configured file.
#[tokio::test]
async fn every_request_is_served_the_default_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(b"bootloader bytes").expect("write");

    let handler: Arc<dyn ReadHandler> =
        Arc::new(SingleFileHandler::new(file.path().to_path_buf()));

    for name in ["C0A8010A", "kernel", "/some/dir/C0A8010A", "anything.bin"] {
        let data = handler.read(name).await.expect("read");
        assert_eq!(data, b"bootloader bytes");
    }
}

#[tokio::test]
async fn a_missing_default_file_errors() {
    let handler = SingleFileHandler::new("/no/such/file/at/all".into());
    assert!(handler.read("C0A8010A").await.is_err());
}
