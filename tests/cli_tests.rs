use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_lists_subcommands() {
    Command::cargo_bin("contextor")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("query")
                .and(predicate::str::contains("load"))
                .and(predicate::str::contains("sources")),
        );
}

#[test]
fn sources_lists_supported_kinds() {
    Command::cargo_bin("contextor")
        .unwrap()
        .arg("sources")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("YouTube")
                .and(predicate::str::contains("AssemblyAI"))
                .and(predicate::str::contains("Web pages")),
        );
}

#[test]
fn query_without_sources_fails_before_loading_config() {
    Command::cargo_bin("contextor")
        .unwrap()
        .arg("query")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No sources given"));
}
