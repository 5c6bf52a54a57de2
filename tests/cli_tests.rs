#![allow(clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;

fn votable() -> Command {
    Command::cargo_bin("votable").unwrap()
}

#[test]
fn test_emit_to_stdout() {
    votable()
        .args([
            "emit",
            "--resource-type",
            "Detector",
            "--resource-name",
            "H1",
            "--param",
            "Freq:double:Hz=100.5",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("<VOTABLE"))
        .stdout(predicate::str::contains(
            r#"<PARAM name="Freq" unit="Hz" datatype="double" value="100.5"/>"#,
        ));
}

#[test]
fn test_emit_then_query_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.xml");

    votable()
        .args(["emit", "--resource-type", "Run", "--resource-name", "r1"])
        .args(["-p", "Tspan:double:s=3600", "-p", "Label:char=first"])
        .arg("-o")
        .arg(&path)
        .assert()
        .success();

    votable()
        .arg("query")
        .arg(&path)
        .args(["--resource-type", "Run", "--resource-name", "r1"])
        .args(["--param", "Tspan", "--attribute", "unit"])
        .assert()
        .success()
        .stdout("s\n");
}

#[test]
fn test_query_from_stdin_missing_param_fails() {
    let xml = r#"<VOTABLE xmlns="http://www.ivoa.net/xml/VOTable/v1.1">
  <RESOURCE utype="Run" name="r1">
    <PARAM name="Tspan" datatype="double" value="3600"/>
  </RESOURCE>
</VOTABLE>"#;

    votable()
        .args(["query", "--resource-type", "Run", "--resource-name", "r1"])
        .args(["--param", "Tspan"])
        .write_stdin(xml)
        .assert()
        .success()
        .stdout("3600\n");

    votable()
        .args(["query", "--resource-type", "Run", "--resource-name", "r1"])
        .args(["--param", "Nope"])
        .write_stdin(xml)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no value on PARAM 'Nope'"));
}

#[test]
fn test_bad_param_spec_rejected() {
    votable()
        .args(["emit", "--resource-type", "R", "--resource-name", "N"])
        .args(["--param", "Freq:real8=1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid datatype 'real8'"));
}
