use assert_cmd::Command;
use predicates::{
    prelude::PredicateBooleanExt,
    str::{contains, is_match},
};
use std::{fs, path::Path};
use tempfile::{tempdir, TempDir};

fn rhake() -> Command {
    Command::cargo_bin("rhake").expect("rhake binary build failed")
}

fn project(rakefile: &str) -> TempDir {
    let temp = tempdir().expect("create temp dir");
    fs::write(temp.path().join("rakefile.rhai"), rakefile).expect("write rakefile");
    temp
}

fn rhake_in(dir: &Path) -> Command {
    let mut cmd = rhake();
    cmd.current_dir(dir);
    cmd
}

const BUILD_SCRIPT: &str = r#"
desc("Compile everything");
task("build", ["prepare"], || print("[build] done"));

task("prepare", || print("[prepare] done"));

desc("Ship it");
task("release", ["build", "prepare"], || print("[release] done"));

task("default", ["build"]);
"#;

#[test]
fn runs_default_task_with_prerequisites() {
    let temp = project(BUILD_SCRIPT);
    rhake_in(temp.path())
        .assert()
        .success()
        .stdout(contains("(in "))
        .stdout(is_match(r"(?s)\[prepare\] done.*\[build\] done").expect("regex compile"));
}

#[test]
fn shared_prerequisite_runs_once() {
    let temp = project(BUILD_SCRIPT);
    let output = rhake_in(temp.path())
        .args(["-s", "release"])
        .output()
        .expect("run rhake");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.matches("[prepare] done").count(), 1);
    assert!(!stdout.contains("(in "));
    let order: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        order,
        vec!["[prepare] done", "[build] done", "[release] done"]
    );
}

#[test]
fn finds_rakefile_from_nested_directory() {
    let temp = project(BUILD_SCRIPT);
    let nested = temp.path().join("src").join("deep");
    fs::create_dir_all(&nested).expect("create nested dir");

    rhake_in(&nested)
        .arg("prepare")
        .assert()
        .success()
        .stdout(contains("[prepare] done"));
}

#[test]
fn nested_run_moves_into_rakefile_directory() {
    let temp = project(r#"task("default", ["lib_task"]);"#);
    let rakelib = temp.path().join("rakelib");
    fs::create_dir_all(&rakelib).expect("create rakelib");
    fs::write(
        rakelib.join("root.rake"),
        r#"task("lib_task", || print("[lib_task] loaded relative to root"));"#,
    )
    .expect("write rakelib file");
    let nested = temp.path().join("src").join("deep");
    fs::create_dir_all(&nested).expect("create nested dir");
    let root = temp.path().canonicalize().expect("canonicalize root");

    rhake_in(&nested)
        .assert()
        .success()
        .stdout(contains(format!("(in {})\n", root.display())))
        .stdout(contains("[lib_task] loaded relative to root"));
}

#[test]
fn nosearch_does_not_walk_up() {
    let temp = project(BUILD_SCRIPT);
    let nested = temp.path().join("sub");
    fs::create_dir_all(&nested).expect("create nested dir");

    rhake_in(&nested)
        .args(["--nosearch", "prepare"])
        .assert()
        .failure()
        .stderr(contains("No Rakefile found (looking for: rakefile, Rakefile"));
}

#[test]
fn explicit_rakefile_name() {
    let temp = tempdir().expect("create temp dir");
    fs::write(
        temp.path().join("build.rhai"),
        r#"task("default", || print("[custom] ran"));"#,
    )
    .expect("write rakefile");

    rhake_in(temp.path())
        .args(["-f", "build.rhai", "-s"])
        .assert()
        .success()
        .stdout(contains("[custom] ran"));
}

#[test]
fn lists_tasks_with_comments() {
    let temp = project(BUILD_SCRIPT);
    rhake_in(temp.path())
        .args(["-s", "-T"])
        .assert()
        .success()
        .stdout(contains("rhake build    # Compile everything"))
        .stdout(contains("rhake release  # Ship it"))
        .stdout(contains("[build] done").not());
}

#[test]
fn task_listing_filters_by_pattern() {
    let temp = project(BUILD_SCRIPT);
    rhake_in(temp.path())
        .args(["-s", "--tasks", "rel"])
        .assert()
        .success()
        .stdout(contains("rhake release"))
        .stdout(contains("rhake build").not());
}

#[test]
fn task_listing_pattern_is_a_regex() {
    let temp = project(BUILD_SCRIPT);
    rhake_in(temp.path())
        .args(["-s", "-T", "^(build|prepare)$"])
        .assert()
        .success()
        .stdout(contains("rhake build"))
        .stdout(contains("rhake prepare"))
        .stdout(contains("rhake release").not())
        .stdout(contains("rhake default").not());
}

#[test]
fn invalid_task_pattern_fails() {
    let temp = project(BUILD_SCRIPT);
    rhake_in(temp.path())
        .args(["-s", "-T", "(unclosed"])
        .assert()
        .failure()
        .stderr(contains("invalid value for option `--tasks'"));
}

#[test]
fn shows_prerequisite_tree() {
    let temp = project(BUILD_SCRIPT);
    rhake_in(temp.path())
        .args(["-s", "-P", "release"])
        .assert()
        .success()
        .stdout(contains(
            "rhake release\n    build\n        prepare\n    prepare\n",
        ))
        .stdout(contains("[release] done").not());
}

#[test]
fn failing_task_suggests_trace() {
    let temp = project(r#"task("default", || { throw "boom"; });"#);
    rhake_in(temp.path())
        .arg("-s")
        .assert()
        .failure()
        .stderr(contains("rhake aborted!"))
        .stderr(contains("boom"))
        .stderr(contains("(See full trace by running task with --trace)"));
}

#[test]
fn failing_task_with_trace_shows_causes() {
    let temp = project(r#"task("default", || { throw "boom"; });"#);
    rhake_in(temp.path())
        .args(["-s", "--trace"])
        .assert()
        .failure()
        .stderr(contains("** Invoke default (first_time)"))
        .stderr(contains("** Execute default"))
        .stderr(contains("caused by:"))
        .stderr(contains("See full trace").not());
}

#[test]
fn unknown_task_fails() {
    let temp = project(BUILD_SCRIPT);
    rhake_in(temp.path())
        .args(["-s", "missing"])
        .assert()
        .failure()
        .stderr(contains("Don't know how to build task 'missing'"));
}

#[test]
fn unknown_option_fails_before_running() {
    let temp = project(BUILD_SCRIPT);
    rhake_in(temp.path())
        .arg("--xyzzy")
        .assert()
        .failure()
        .stdout(contains("[build] done").not())
        .stderr(contains("--xyzzy"));
}

#[test]
fn dry_run_narrates_without_executing() {
    let temp = project(BUILD_SCRIPT);
    rhake_in(temp.path())
        .args(["-s", "-n", "build"])
        .assert()
        .success()
        .stdout(contains("[build] done").not())
        .stderr(contains("** Execute (dry run) prepare"))
        .stderr(contains("** Execute (dry run) build"));
}

#[test]
fn env_assignments_are_visible_to_tasks() {
    let temp = project(r#"task("show", || print("mode=" + env("MODE")));"#);
    rhake_in(temp.path())
        .args(["-s", "show", "MODE=fast"])
        .assert()
        .success()
        .stdout(contains("mode=fast"));
}

#[test]
fn script_imports_and_rakelib_files_are_loaded() {
    let temp = project(
        r#"
add_import("extra.rhai");
task("default", ["extra", "lib_task"]);
"#,
    );
    fs::write(
        temp.path().join("extra.rhai"),
        r#"task("extra", || print("[extra] imported"));"#,
    )
    .expect("write import");
    let rakelib = temp.path().join("rakelib");
    fs::create_dir_all(&rakelib).expect("create rakelib");
    fs::write(
        rakelib.join("more.rake"),
        r#"task("lib_task", || print("[lib_task] from rakelib"));"#,
    )
    .expect("write rakelib file");

    rhake_in(temp.path())
        .arg("-s")
        .assert()
        .success()
        .stdout(contains("[extra] imported"))
        .stdout(contains("[lib_task] from rakelib"));
}

#[test]
fn custom_loader_handles_imports() {
    let temp = project(
        r#"
add_loader("list", |file| print("[loader] " + file));
add_import("names.list");
task("default");
"#,
    );
    fs::write(temp.path().join("names.list"), "a\nb\n").expect("write import");

    rhake_in(temp.path())
        .arg("-s")
        .assert()
        .success()
        .stdout(contains("[loader] names.list"));
}

#[test]
fn missing_required_file_fails() {
    let temp = project(BUILD_SCRIPT);
    rhake_in(temp.path())
        .args(["-r", "no_such_helper"])
        .assert()
        .failure()
        .stderr(contains("no such file to load -- no_such_helper"));
}

#[test]
fn required_file_is_loaded_from_libdir() {
    let temp = project(r#"task("default", ["helper"]);"#);
    let lib = temp.path().join("lib");
    fs::create_dir_all(&lib).expect("create lib dir");
    fs::write(
        lib.join("helpers.rhai"),
        r#"task("helper", || print("[helper] required"));"#,
    )
    .expect("write helper");

    rhake_in(temp.path())
        .args(["-s", "-I", "lib", "-r", "helpers"])
        .assert()
        .success()
        .stdout(contains("[helper] required"));
}

#[test]
fn required_file_sees_dry_run_flags() {
    let temp = project(r#"task("default");"#);
    fs::write(
        temp.path().join("helper.rhai"),
        r#"print(`[helper] nowrite=${nowrite()}`);"#,
    )
    .expect("write helper");

    rhake_in(temp.path())
        .args(["-s", "-n", "-r", "helper"])
        .assert()
        .success()
        .stdout(contains("[helper] nowrite=true"));
}

#[test]
fn required_file_sees_classic_constants() {
    let temp = project(r#"task("default");"#);
    fs::write(
        temp.path().join("helper.rhai"),
        r#"if TRACE { print("[helper] trace on"); }"#,
    )
    .expect("write helper");

    rhake_in(temp.path())
        .args(["-s", "-C", "-t", "-r", "helper"])
        .assert()
        .success()
        .stdout(contains("[helper] trace on"));
}

#[test]
fn classic_namespace_exposes_option_constants() {
    let temp = project(
        r#"
task("default", || print("[default] ran"));
if TRACE { print("[classic] trace on"); }
"#,
    );
    rhake_in(temp.path())
        .args(["-s", "-C", "-t"])
        .assert()
        .success()
        .stdout(contains("[classic] trace on"))
        .stdout(contains("[default] ran"));
}

#[test]
fn version_banner() {
    rhake()
        .arg("--version")
        .assert()
        .success()
        .stdout(contains(format!(
            "rhake, version {}",
            env!("CARGO_PKG_VERSION")
        )));
}

#[test]
fn help_lists_options() {
    rhake()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("rhake [-f rakefile] {options} targets..."))
        .stdout(contains("--dry-run"))
        .stdout(contains("--rakelibdir"));
}

#[test]
fn completions_for_bash() {
    rhake()
        .args(["--completions", "bash"])
        .assert()
        .success()
        .stdout(contains("rhake"));
}
