mod common;

use buildsnap_harness::normalize::{
    BUILD_FINISHED_IN, BUILD_STARTING_AT, FAKE_DURATION, FAKE_TIMESTAMP, PRETTY_STATUS_PREFIX,
};
use buildsnap_harness::{NormalizeMode, Normalizer};
use proptest::prelude::*;

use common::{FakeCompiler, LIVE_VERSION, args, sys_with};

fn normalizer() -> Normalizer {
    Normalizer::new(LIVE_VERSION, "FakeTSVersion")
}

#[test]
fn build_finished_line() {
    let n = normalizer();
    assert_eq!(
        n.normalize("build finished in 42ms", NormalizeMode::Record),
        "build finished in d.ddds"
    );
    assert_eq!(
        n.normalize("build finished in 42ms", NormalizeMode::Compare),
        ""
    );
}

#[test]
fn version_banner_in_help_output() {
    let n = normalizer();
    let raw = format!(
        "Version {LIVE_VERSION}\n\
         tsc: The TypeScript Compiler - Version {LIVE_VERSION}\n\
         \n\
         BUILD OPTIONS\n"
    );
    let expected = "Version FakeTSVersion\n\
                    tsc: The TypeScript Compiler - Version FakeTSVersion\n\
                    \n\
                    BUILD OPTIONS\n";
    assert_eq!(n.normalize(&raw, NormalizeMode::Record), expected);
}

#[test]
fn compiler_output_across_runs() {
    let mut sys = sys_with(&[("src/a.ts", "let a = 1;")]);
    let mut compiler = FakeCompiler::new();
    let run_args = args(&["-b", "--listEmittedFiles", "--version"]);

    sys.run_compiler(&mut compiler, &run_args);
    let recorded = sys.output(NormalizeMode::Record);
    assert_eq!(
        recorded,
        "Version FakeTSVersion\n\
         build starting at HH:MM:SS AM\n\
         TSFILE:  /home/src/workspaces/project/src/a.js\n\
         \n\
         build finished in d.ddds\n"
    );
    let first = sys.output_for_comparison();
    assert_eq!(first, "Version FakeTSVersion\n");

    sys.clear_output();
    sys.append_file("src/a.ts", "\nlet b = 2;");
    sys.run_compiler(&mut compiler, &run_args);
    assert_eq!(sys.output_for_comparison(), first);
    assert_ne!(
        sys.raw_output(),
        "",
        "raw output keeps the live values"
    );
}

#[test]
fn watch_mode_status_lines() {
    let mut sys = sys_with(&[("src/a.ts", "let a = 1;")]);
    let mut compiler = FakeCompiler::new();
    sys.run_compiler(&mut compiler, &args(&["-w"]));
    let expected = "[\u{1b}[90mHH:MM:SS AM\u{1b}[0m] Starting compilation in watch mode...\n\
                    \n\
                    HH:MM:SS AM - Found 0 errors. Watching for file changes.\n";
    assert_eq!(sys.output(NormalizeMode::Record), expected);
    assert_eq!(sys.output(NormalizeMode::Compare), expected);
}

#[test]
fn rule_hits_are_exclusive() {
    let n = normalizer();
    // A version line that also looks like a build marker only gets the
    // version substitution.
    let line = format!("build starting at Version {LIVE_VERSION}");
    assert_eq!(
        n.matching_rule(&line).map(|rule| rule.name),
        Some("version")
    );
    assert_eq!(
        n.normalize(&line, NormalizeMode::Compare),
        "build starting at Version FakeTSVersion"
    );
}

fn clock_value() -> impl Strategy<Value = String> {
    (1_u8..=12, 0_u8..60, 0_u8..60, prop::bool::ANY).prop_map(|(h, m, s, pm)| {
        format!("{h:02}:{m:02}:{s:02} {}", if pm { "PM" } else { "AM" })
    })
}

fn suffix() -> impl Strategy<Value = String> {
    "[ -~]{0,24}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn build_start_round_trip(time in clock_value()) {
        let n = normalizer();
        let recorded = n.normalize(&format!("{BUILD_STARTING_AT}{time}"), NormalizeMode::Record);
        prop_assert_eq!(&recorded, &format!("{BUILD_STARTING_AT}{FAKE_TIMESTAMP}"));
        let refilled = recorded.replace(FAKE_TIMESTAMP, &time);
        prop_assert_eq!(n.matching_rule(&refilled).map(|r| r.name), Some("build_start"));
    }

    #[test]
    fn build_finish_round_trip(ms in 0_u32..100_000) {
        let n = normalizer();
        let recorded = n.normalize(&format!("{BUILD_FINISHED_IN}{ms}ms"), NormalizeMode::Record);
        prop_assert_eq!(&recorded, &format!("{BUILD_FINISHED_IN}{FAKE_DURATION}"));
        let refilled = recorded.replace(FAKE_DURATION, &format!("{}.{:03}s", ms / 1000, ms % 1000));
        prop_assert_eq!(n.matching_rule(&refilled).map(|r| r.name), Some("build_finish"));
    }

    #[test]
    fn plain_timestamp_round_trip(time in clock_value(), rest in suffix()) {
        let n = normalizer();
        let raw = format!("{time} - {rest}");
        let recorded = n.normalize(&raw, NormalizeMode::Record);
        prop_assert_eq!(&recorded, &format!("{FAKE_TIMESTAMP} - {rest}"));
        let refilled = format!("{time}{}", &recorded[FAKE_TIMESTAMP.len()..]);
        prop_assert_eq!(&refilled, &raw);
        prop_assert_eq!(n.matching_rule(&refilled).map(|r| r.name), Some("plain_timestamp"));
    }

    #[test]
    fn pretty_timestamp_round_trip(time in clock_value(), rest in suffix()) {
        let n = normalizer();
        let raw = format!("{PRETTY_STATUS_PREFIX}{time}\u{1b}[0m] {rest}");
        let recorded = n.normalize(&raw, NormalizeMode::Record);
        prop_assert_eq!(&recorded, &n.normalize(&raw, NormalizeMode::Compare));
        let refilled = recorded.replacen(FAKE_TIMESTAMP, &time, 1);
        prop_assert_eq!(&refilled, &raw);
        prop_assert_eq!(
            n.matching_rule(&refilled).map(|r| r.name),
            Some("pretty_status_timestamp")
        );
    }

    #[test]
    fn unmatched_lines_pass_through(line in "[a-zA-Z0-9 ,.;()]{0,40}") {
        let n = normalizer();
        prop_assume!(n.matching_rule(&line).is_none());
        prop_assert_eq!(n.normalize(&line, NormalizeMode::Record), line.clone());
        prop_assert_eq!(n.normalize(&line, NormalizeMode::Compare), line);
    }
}
