use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_ls_help_lists_layer_flags() {
    cargo_bin_cmd!("lamina")
        .args(["ls", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Output:"))
        .stdout(predicate::str::contains("Listing:"))
        .stdout(predicate::str::contains("--sort-by <VALUE>"))
        .stdout(predicate::str::contains("-o, --output <CHOICE>"))
        .stdout(predicate::str::contains("--recursive[=<BOOL>]"));
}

#[test]
fn test_version_has_no_layer_flags() {
    cargo_bin_cmd!("lamina")
        .args(["version", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--sort-by").not());
}

#[test]
fn test_unknown_flag_is_usage_error() {
    cargo_bin_cmd!("lamina")
        .args(["ls", "--no-such-flag"])
        .assert()
        .code(2);
}
