use std::fs;
use std::path::Path;

use chat_session::Style;
use failure_context::{CapturedFrame, RaisedFailure};
use fincantatem::{parse_panic_report, FincantatemError, RenderMode, ReportOptions, Reporter};
use inference_api::Role;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

mod support;

use support::{RecordingInterface, ScriptedResponder};

const SOURCE: &str = "\
fn pick(values: &[i32], index: usize) -> i32 {
    values[index]
}

fn main() {
    let values = vec![1, 2, 3];
    println!(\"{}\", pick(&values, 5));
}
";

fn write_source(dir: &TempDir) -> String {
    let path = dir.path().join("main.rs");
    fs::write(&path, SOURCE).expect("write source");
    path.to_string_lossy().into_owned()
}

fn frames(path: &str) -> Vec<CapturedFrame> {
    vec![
        CapturedFrame::new("std::rt::lang_start", "/rustc/abc/library/std/src/rt.rs", 195),
        CapturedFrame::new("app::main", path, 7),
        CapturedFrame::new("fincantatem::hook::finite", "src/hook.rs", 95),
        CapturedFrame::new("app::pick", path, 2),
    ]
}

fn index_failure() -> RaisedFailure {
    RaisedFailure::new("panic", "index out of bounds: the len is 3 but the index is 5")
        .with_traceback("thread 'main' panicked at src/main.rs:2:5:\nindex out of bounds")
}

#[test]
fn report_streams_analysis_of_the_rendered_prompt() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_source(&dir);
    let responder = ScriptedResponder::replying(&[&["TL;DR: ", "index 5 is past the end."]]);
    let reporter = Reporter::with_responder(ReportOptions::default(), &responder);
    let mut ui = RecordingInterface::default();

    let report = reporter
        .report(index_failure(), &frames(&path), &mut ui)
        .expect("report succeeds");

    assert_eq!(report.analysis, "TL;DR: index 5 is past the end.");
    assert!(report
        .prompt
        .contains("The failure occurred in function: app::pick"));
    assert!(report.prompt.contains("Type: panic"));
    assert!(report.prompt.contains("values[index]"));
    assert!(report.prompt.contains("<environment>\n    rust "));
    assert!(!report.prompt.contains("fincantatem::hook"));
    assert!(!report.prompt.contains("std::rt::lang_start"));

    assert_eq!(ui.styled(Style::Header), vec!["✦ F. Incantatem ✦"]);
    assert_eq!(ui.styled(Style::Traceback).len(), 1);
    assert_eq!(
        ui.styled(Style::Analysis),
        vec!["TL;DR: index 5 is past the end."]
    );

    let seen = responder.seen.borrow();
    assert_eq!(seen.len(), 1);
    let roles = seen[0].iter().map(|message| message.role).collect::<Vec<_>>();
    assert_eq!(roles, vec![Role::System, Role::User]);
    assert_eq!(seen[0][1].content, report.prompt);
}

#[test]
fn full_source_mode_and_plain_display_shape_the_request() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_source(&dir);
    let responder = ScriptedResponder::replying(&[&["ok"], &["ok"]]);
    let mut ui = RecordingInterface::default();

    let snippet = Reporter::with_responder(ReportOptions::default(), &responder)
        .report(index_failure(), &frames(&path), &mut ui)
        .expect("snippet report succeeds");
    let options = ReportOptions::default()
        .with_render_mode(RenderMode::FullSource)
        .with_markdown(false);
    let full = Reporter::with_responder(options, &responder)
        .without_traceback_echo()
        .report(index_failure(), &frames(&path), &mut ui)
        .expect("full report succeeds");

    assert!(full.prompt.len() > snippet.prompt.len());
    assert_eq!(ui.styled(Style::Traceback).len(), 1);
    let seen = responder.seen.borrow();
    assert_ne!(seen[0][0].content, seen[1][0].content);
    assert_eq!(seen[1][0].content, prompt_renderer::system_prompt(false));
}

#[test]
fn cautious_mode_masks_secrets_before_sending() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_source(&dir);
    let responder = ScriptedResponder::replying(&[&["ok"]]);
    let reporter =
        Reporter::with_responder(ReportOptions::default().with_cautious(true), &responder);
    let failure =
        RaisedFailure::new("panic", "login failed for ops@example.com with password=hunter2");

    let report = reporter
        .report(failure, &frames(&path), &mut RecordingInterface::default())
        .expect("report succeeds");

    assert!(!report.prompt.contains("ops@example.com"));
    assert!(!report.prompt.contains("hunter2"));
    assert!(report.prompt.contains("[REDACTED]"));
}

#[test]
fn chat_mode_continues_and_saves_the_conversation() {
    let dir = TempDir::new().expect("tempdir");
    let exports = TempDir::new().expect("export dir");
    let path = write_source(&dir);
    let responder = ScriptedResponder::replying(&[&["analysis"], &["Because the index is 5."]]);
    let options = ReportOptions::default()
        .with_chat(true)
        .with_export_dir(exports.path());
    let reporter = Reporter::with_responder(options, &responder);
    let mut ui = RecordingInterface::with_inputs(&["why?", "/save", "/quit"]);

    reporter
        .report(index_failure(), &frames(&path), &mut ui)
        .expect("report succeeds");

    let seen = responder.seen.borrow();
    assert_eq!(seen.len(), 2);
    let roles = seen[1].iter().map(|message| message.role).collect::<Vec<_>>();
    assert_eq!(
        roles,
        vec![Role::System, Role::User, Role::Assistant, Role::User]
    );
    assert_eq!(seen[1][2].content, "analysis");

    let saved = fs::read_dir(exports.path())
        .expect("read exports")
        .map(|entry| entry.expect("entry").path())
        .collect::<Vec<_>>();
    assert_eq!(saved.len(), 1);
    let file_name = saved[0].file_name().and_then(|name| name.to_str()).unwrap_or_default();
    assert!(file_name.starts_with("fincantatem_chat_"));
    let document = fs::read_to_string(&saved[0]).expect("read export");
    assert!(document.contains("\"type\": \"panic\""));
    assert!(document.contains("Because the index is 5."));
}

#[test]
fn frames_that_are_all_infrastructure_are_rejected() {
    let responder = ScriptedResponder::default();
    let reporter = Reporter::with_responder(ReportOptions::default(), &responder);
    let frames = [CapturedFrame::new("fincantatem::report::Reporter::report", "src/report.rs", 1)];

    let error = reporter
        .report(index_failure(), &frames, &mut RecordingInterface::default())
        .expect_err("nothing to report");

    assert!(matches!(error, FincantatemError::Context(_)));
    assert!(responder.seen.borrow().is_empty());
}

#[test]
fn panic_output_reports_through_its_own_frames() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_source(&dir);
    let output = format!(
        "thread 'main' panicked at {path}:2:5:\n\
         index out of bounds: the len is 3 but the index is 5\n\
         stack backtrace:\n   \
         2: app::pick\n             at {path}:2:5\n   \
         3: app::main\n             at {path}:7:20\n"
    );
    let panic = parse_panic_report(&output).expect("panic parsed");
    let responder = ScriptedResponder::replying(&[&["ok"]]);
    let reporter = Reporter::with_responder(ReportOptions::default(), &responder);

    let report = reporter
        .report_panic(&panic, &mut RecordingInterface::default())
        .expect("report succeeds");

    assert!(report
        .prompt
        .contains("The failure occurred in function: app::pick"));
    assert!(report.prompt.contains("# Frame 0: app::main"));
    assert!(report.prompt.contains("\"thread\": \"main\""));
    assert!(Path::new(&path).exists());
}
