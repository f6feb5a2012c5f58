//! End-to-end scenarios driven through the built binary.

use assert_cmd::Command;
use predicates::prelude::*;

fn sh() -> Command {
    Command::cargo_bin("oxsh").unwrap()
}

fn run(script: &str) -> assert_cmd::assert::Assert {
    sh().args(["-c", script]).assert()
}

#[test]
fn arithmetic_expansion() {
    run("echo $((2 + 3 * 4))").success().stdout("14\n");
}

#[test]
fn arithmetic_ternary_with_variables() {
    run("a=1; b=2; echo $((a<b ? a : b))").success().stdout("1\n");
}

#[test]
fn star_joins_with_ifs() {
    run("IFS=:; set -- x y z; printf '<%s>' \"$*\"")
        .success()
        .stdout("<x:y:z>");
}

#[test]
fn errexit_stops_script() {
    run("set -e\nfalse\necho nope").failure().stdout("");
}

#[test]
fn case_modification_upper() {
    run("v=abc; echo \"${v^^}\"").success().stdout("ABC\n");
}

#[test]
fn array_length_and_slice() {
    run("arr=(a b c); echo \"${#arr[@]} ${arr[@]:1:2}\"")
        .success()
        .stdout("3 b c\n");
}

#[test]
fn pipefail_toggles_pipeline_status() {
    run("set -o pipefail; false | true").failure();
    run("false | true").success();
}

#[test]
fn command_substitution_through_pipeline() {
    run("x=$(echo hello | tr a-z A-Z); echo $x")
        .success()
        .stdout("HELLO\n");
}

#[test]
fn function_locals_do_not_leak() {
    run("f(){ local x=inner; }; x=outer; f; echo $x")
        .success()
        .stdout("outer\n");
}

#[test]
fn here_string_feeds_read() {
    run("read a b <<< \"one two three\"; echo \"$a|$b\"")
        .success()
        .stdout("one|two three\n");
}

#[test]
fn c_style_for_loop() {
    run("for ((i=0;i<3;i++)); do echo $i; done")
        .success()
        .stdout("0\n1\n2\n");
}

#[test]
fn case_fallthrough() {
    run("case x in x) echo 1 ;& y) echo 2 ;; esac")
        .success()
        .stdout("1\n2\n");
}

// ---------------------------------------------------------------------------
// beyond the core scenarios
// ---------------------------------------------------------------------------

#[test]
fn exit_status_propagates() {
    sh().args(["-c", "exit 42"]).assert().code(42);
}

#[test]
fn word_splitting_default_ifs() {
    run("x='a b  c'; set -- $x; echo $#").success().stdout("3\n");
}

#[test]
fn quoted_expansion_does_not_split() {
    run("x='a b  c'; set -- \"$x\"; echo $#").success().stdout("1\n");
}

#[test]
fn quoted_at_preserves_arguments() {
    run("set -- 'a b' c; for w in \"$@\"; do echo \"[$w]\"; done")
        .success()
        .stdout("[a b]\n[c]\n");
}

#[test]
fn parameter_defaults() {
    run("unset v; echo ${v:-fallback}").success().stdout("fallback\n");
    run("v=set; echo ${v:-fallback}").success().stdout("set\n");
    run("unset v; echo ${v:=assigned}; echo $v")
        .success()
        .stdout("assigned\nassigned\n");
    run("v=word; echo ${v:+other}").success().stdout("other\n");
}

#[test]
fn parameter_error_if_unset() {
    run("unset v; echo ${v:?missing}; echo after")
        .failure()
        .stdout("")
        .stderr(predicate::str::contains("missing"));
}

#[test]
fn pattern_removal() {
    run("path=/usr/local/bin; echo ${path##*/} ${path%/*}")
        .success()
        .stdout("bin /usr/local\n");
    run("f=archive.tar.gz; echo ${f%.*} ${f%%.*}")
        .success()
        .stdout("archive.tar archive\n");
}

#[test]
fn pattern_replacement() {
    run("v=banana; echo ${v/an/AN} ${v//an/AN}")
        .success()
        .stdout("bANana bANANa\n");
    run("v=hello; echo ${v/#he/HE} ${v/%lo/LO}")
        .success()
        .stdout("HEllo helLO\n");
}

#[test]
fn substring_expansion() {
    run("v=abcdefg; echo ${v:2} ${v:1:3} ${v: -2}")
        .success()
        .stdout("cdefg bcd fg\n");
}

#[test]
fn string_length() {
    run("v=hello; echo ${#v}").success().stdout("5\n");
}

#[test]
fn indirect_expansion() {
    run("target=value; name=target; echo ${!name}")
        .success()
        .stdout("value\n");
}

#[test]
fn name_prefix_listing() {
    run("zqa=1; zqb=2; echo ${!zq*}").success().stdout("zqa zqb\n");
}

#[test]
fn array_keys_listing() {
    run("a=(x y z); unset 'a[1]'; echo ${!a[@]}")
        .success()
        .stdout("0 2\n");
}

#[test]
fn associative_arrays() {
    run("declare -A m; m[alpha]=1; m[beta]=2; echo ${m[alpha]} ${#m[@]}")
        .success()
        .stdout("1 2\n");
}

#[test]
fn array_append_and_negative_index() {
    run("a=(1 2); a+=(3); echo ${a[2]} ${a[-1]}")
        .success()
        .stdout("3 3\n");
}

#[test]
fn brace_expansion() {
    run("echo a{b,c}d").success().stdout("abd acd\n");
    run("echo {1..5}").success().stdout("1 2 3 4 5\n");
    run("echo {1..10..3}").success().stdout("1 4 7 10\n");
}

#[test]
fn tilde_expansion() {
    sh().args(["-c", "echo ~"])
        .env("HOME", "/home/probe")
        .assert()
        .success()
        .stdout("/home/probe\n");
}

#[test]
fn heredoc_basic_and_quoted() {
    run("cat <<EOF\nvalue: $((1+1))\nEOF")
        .success()
        .stdout("value: 2\n");
    run("cat <<'EOF'\nliteral: $((1+1))\nEOF")
        .success()
        .stdout("literal: $((1+1))\n");
}

#[test]
fn heredoc_dash_strips_tabs() {
    run("cat <<-EOF\n\tindented\n\tEOF")
        .success()
        .stdout("indented\n");
}

#[test]
fn redirections_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("out.txt");
    let script = format!(
        "echo first > {p}; echo second >> {p}; cat < {p}",
        p = file.display()
    );
    run(&script).success().stdout("first\nsecond\n");
}

#[test]
fn stderr_redirection() {
    run("{ echo out; echo err >&2; } 2>/dev/null").success().stdout("out\n");
}

#[test]
fn noclobber_refuses_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("locked.txt");
    std::fs::write(&file, "original\n").unwrap();
    let script = format!("set -C; echo new > {p}; cat {p}", p = file.display());
    run(&script)
        .stdout("original\n")
        .stderr(predicate::str::contains("cannot overwrite"));
}

#[test]
fn clobber_bypasses_noclobber() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("f.txt");
    std::fs::write(&file, "old\n").unwrap();
    let script = format!("set -C; echo new >| {p}; cat {p}", p = file.display());
    run(&script).success().stdout("new\n");
}

#[test]
fn fd_duplication() {
    run("echo visible 2>&1").success().stdout("visible\n");
}

#[test]
fn if_elif_else() {
    run("if false; then echo a; elif true; then echo b; else echo c; fi")
        .success()
        .stdout("b\n");
}

#[test]
fn while_loop_with_break_continue() {
    run("i=0; while true; do i=$((i+1)); [ $i -eq 2 ] && continue; [ $i -ge 4 ] && break; echo $i; done")
        .success()
        .stdout("1\n3\n");
}

#[test]
fn until_loop() {
    run("i=0; until [ $i -ge 3 ]; do echo $i; i=$((i+1)); done")
        .success()
        .stdout("0\n1\n2\n");
}

#[test]
fn nested_break_levels() {
    run("for a in 1 2; do for b in x y; do echo $a$b; break 2; done; done")
        .success()
        .stdout("1x\n");
}

#[test]
fn case_continue_matching() {
    run("case ab in a*) echo one ;;& *b) echo two ;; esac")
        .success()
        .stdout("one\ntwo\n");
}

#[test]
fn subshell_isolation() {
    run("x=outer; (x=inner; echo $x); echo $x")
        .success()
        .stdout("inner\nouter\n");
}

#[test]
fn brace_group_shares_state() {
    run("x=outer; { x=inner; }; echo $x").success().stdout("inner\n");
}

#[test]
fn functions_recursion() {
    run("fact() { local n=$1; if [ $n -le 1 ]; then echo 1; else local r; r=$(fact $((n-1))); echo $((n * r)); fi; }; fact 5")
        .success()
        .stdout("120\n");
}

#[test]
fn function_return_status() {
    run("f() { return 3; }; f; echo $?").success().stdout("3\n");
}

#[test]
fn positional_parameters_and_shift() {
    run("set -- a b c; shift; echo $1 $#").success().stdout("b 2\n");
}

#[test]
fn dollar_zero_and_args_in_script_mode() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("args.sh");
    std::fs::write(&script, "echo $0 $1 $2 $#\n").unwrap();
    sh().arg(script.to_str().unwrap())
        .args(["one", "two"])
        .assert()
        .success()
        .stdout(predicate::str::contains("args.sh one two 2"));
}

#[test]
fn and_or_lists() {
    run("true && echo yes || echo no").success().stdout("yes\n");
    run("false && echo yes || echo no").success().stdout("no\n");
}

#[test]
fn negation_inverts_status() {
    run("! false").success();
    run("! true").failure();
}

#[test]
fn conditional_command() {
    run("[[ -n hello && 3 -gt 1 ]]").success();
    run("[[ abc == a*c ]]").success();
    run("[[ abc == a?d ]]").failure();
    run("x=42; [[ $x =~ ^[0-9]+$ ]]").success();
}

#[test]
fn arithmetic_command_status() {
    run("((1 + 1))").success();
    run("((0))").failure();
    run("((x = 5)); echo $x").success().stdout("5\n");
}

#[test]
fn arithmetic_side_effects_and_sum() {
    run("((x = 3, y = 4)); echo $x $y $((x + y))")
        .success()
        .stdout("3 4 7\n");
}

#[test]
fn division_by_zero_reports_and_continues() {
    run("echo $((1/0)); echo after")
        .stdout(predicate::str::contains("after"))
        .stderr(predicate::str::contains("division by 0"));
}

#[test]
fn readonly_rejects_assignment() {
    run("readonly v=locked; v=changed; echo $v 1>&2; echo $v")
        .stdout("locked\n");
}

#[test]
fn nounset_flags_unset_variables() {
    run("set -u; echo $nosuchvar")
        .failure()
        .stderr(predicate::str::contains("unbound variable"));
}

#[test]
fn xtrace_prints_commands() {
    run("set -x; echo traced")
        .success()
        .stdout("traced\n")
        .stderr(predicate::str::contains("echo traced"));
}

#[test]
fn exit_trap_runs() {
    run("trap 'echo cleanup' EXIT; echo body")
        .success()
        .stdout("body\ncleanup\n");
}

#[test]
fn eval_reparses() {
    run("cmd='echo from-eval'; eval $cmd").success().stdout("from-eval\n");
}

#[test]
fn source_runs_in_current_shell() {
    let dir = tempfile::tempdir().unwrap();
    let lib = dir.path().join("lib.sh");
    std::fs::write(&lib, "sourced=yes\n").unwrap();
    let script = format!(". {}; echo $sourced", lib.display());
    run(&script).success().stdout("yes\n");
}

#[test]
fn getopts_loop() {
    run("while getopts 'ab:' opt -a -b val arg; do echo \"$opt:${OPTARG:-}\"; done")
        .success()
        .stdout("a:\nb:val\n");
}

#[test]
fn echo_escapes() {
    run("echo -e 'a\\tb'").success().stdout("a\tb\n");
    run("echo -n done").success().stdout("done");
}

#[test]
fn background_job_and_wait() {
    run("true & wait; echo done").success().stdout("done\n");
}

#[test]
fn command_not_found_is_127() {
    sh().args(["-c", "definitely-not-a-command-zzz 2>/dev/null"])
        .assert()
        .code(127);
}

#[test]
fn command_builtin_bypasses_functions() {
    run("echo() { builtin_echo_should_not_run; }; command echo direct")
        .success()
        .stdout("direct\n");
}

#[test]
fn type_identifies() {
    run("type cd").success().stdout(predicate::str::contains("builtin"));
    run("type if").success().stdout(predicate::str::contains("keyword"));
}

#[test]
fn glob_expansion_sorted() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["b.dat", "a.dat", "c.txt"] {
        std::fs::write(dir.path().join(name), "").unwrap();
    }
    let script = format!("cd {}; echo *.dat", dir.path().display());
    run(&script).success().stdout("a.dat b.dat\n");
}

#[test]
fn noglob_disables_expansion() {
    run("set -f; echo *.nothing-here").success().stdout("*.nothing-here\n");
}

#[test]
fn nullglob_drops_unmatched() {
    let dir = tempfile::tempdir().unwrap();
    let script = format!(
        "cd {}; shopt -s nullglob; echo start *.none end",
        dir.path().display()
    );
    run(&script).success().stdout("start end\n");
}

#[test]
fn quoting_protects_globs() {
    run("echo '*.rs'").success().stdout("*.rs\n");
}

#[test]
fn pipestatus_reflects_stages() {
    run("true | false | true; echo ${PIPESTATUS[0]} ${PIPESTATUS[1]} ${PIPESTATUS[2]}")
        .success()
        .stdout("0 1 0\n");
}

#[test]
fn temporary_assignment_scopes_to_command() {
    run("V=temp sh -c 'echo $V'; echo ${V:-unset}")
        .success()
        .stdout("temp\nunset\n");
}

#[test]
fn assignment_only_persists() {
    run("V=kept; echo $V").success().stdout("kept\n");
}

#[test]
fn ifs_word_splitting_custom() {
    run("IFS=,; v='a,b,c'; set -- $v; echo $# $2").success().stdout("3 b\n");
}

#[test]
fn process_substitution_read() {
    run("cat <(echo inner)").success().stdout("inner\n");
}

#[test]
fn select_reads_choice() {
    sh().args(["-c", "select o in alpha beta; do echo picked:$o; break; done"])
        .write_stdin("2\n")
        .assert()
        .success()
        .stdout("picked:beta\n");
}

#[test]
fn posix_mode_rejects_dbrack() {
    sh().args(["-o", "posix", "-c", "[[ -n x ]]"])
        .assert()
        .failure();
}

#[test]
fn integer_attribute_evaluates_assignments() {
    run("declare -i n; n=2+3; echo $n").success().stdout("5\n");
}

#[test]
fn unset_tombstone_in_function() {
    run("x=global; f() { unset x; echo in:${x:-hidden}; }; f; echo out:$x")
        .success()
        .stdout("in:hidden\nout:global\n");
}
