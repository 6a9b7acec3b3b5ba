//! Variant resolution tests against a parsed lockfile

use rstest::rstest;
use stitch_package::{Lockfile, PackageError, PlatformTarget, VariantResolver};

const LOCK: &str = r#"
version = 1

[[dependency]]
name = "gluegen-rt"
version = "2.5.0"
scope = "runtime"
file = "libs/gluegen-rt-2.5.0.jar"

[[dependency.native]]
platforms = ["linux-amd64"]
file = "libs/gluegen-rt-2.5.0-natives-linux-amd64.jar"

[[dependency.native]]
platforms = ["windows-amd64"]
file = "libs/gluegen-rt-2.5.0-natives-windows-amd64.jar"

[[dependency.native]]
platforms = ["macos-universal"]
file = "libs/gluegen-rt-2.5.0-natives-macosx-universal.jar"

[[dependency]]
name = "echosvg"
version = "0.3"
file = "libs/echosvg-0.3.jar"
"#;

fn lockfile() -> Lockfile {
    Lockfile::from_str(LOCK).unwrap()
}

#[rstest]
#[case("linux-amd64", "gluegen-rt-2.5.0-natives-linux-amd64.jar")]
#[case("windows-amd64", "gluegen-rt-2.5.0-natives-windows-amd64.jar")]
#[case("macos-universal", "gluegen-rt-2.5.0-natives-macosx-universal.jar")]
fn test_each_platform_gets_only_its_native(#[case] platform: &str, #[case] expected: &str) {
    let lock = lockfile();
    let resolver = VariantResolver::new("/work");
    let platform: PlatformTarget = platform.parse().unwrap();

    let artifacts = resolver
        .resolve(lock.get_dependency("gluegen-rt").unwrap(), platform)
        .unwrap();

    let natives: Vec<_> = artifacts
        .iter()
        .filter(|a| a.is_native())
        .map(|a| a.name.as_str())
        .collect();
    assert_eq!(natives, vec![expected]);
}

#[rstest]
#[case("linux-amd64")]
#[case("windows-amd64")]
#[case("macos-universal")]
fn test_platform_independent_dependency_has_no_natives(#[case] platform: &str) {
    let lock = lockfile();
    let resolver = VariantResolver::new("/work");

    let artifacts = resolver
        .resolve(
            lock.get_dependency("echosvg").unwrap(),
            platform.parse().unwrap(),
        )
        .unwrap();

    assert_eq!(artifacts.len(), 1);
    assert!(!artifacts[0].is_native());
}

#[test]
fn test_unknown_platform_is_fatal() {
    let err = "haiku-amd64".parse::<PlatformTarget>().unwrap_err();
    assert!(matches!(err, PackageError::UnknownPlatform(ref id) if id == "haiku-amd64"));
}

#[test]
fn test_known_platform_without_variant_is_fatal() {
    let lock = lockfile();
    let resolver = VariantResolver::new("/work");
    let err = resolver
        .resolve(
            lock.get_dependency("gluegen-rt").unwrap(),
            PlatformTarget::LINUX_AARCH64,
        )
        .unwrap_err();
    assert!(err.to_string().contains("linux-aarch64"));
}
