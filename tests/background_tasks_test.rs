//! Integration tests for delayed commands and background task waiting

mod common;

use cmdflow::env::Env;
use cmdflow::error::ErrorCode;
use common::Harness;

/// Background reports (`[bg-n] ...`) in the order they were printed
fn reports(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| line.starts_with("[bg-"))
        .map(String::from)
        .collect()
}

#[tokio::test]
async fn test_wait_all_reports_oldest_first() {
    let h = Harness::new("");
    h.run("cmd0 %delay=30ms : cmd1 %delay=5ms : cmd2 %delay=15ms : bg.wait")
        .await
        .unwrap();

    assert_eq!(
        reports(&h.output()),
        vec!["[bg-1] cmd0 done", "[bg-2] cmd1 done", "[bg-3] cmd2 done"]
    );
    assert!(h.ran("cmd0"));
    assert!(h.ran("cmd1"));
    assert!(h.ran("cmd2"));
}

#[tokio::test]
async fn test_wait_latest_takes_newest_task() {
    let h = Harness::new("");
    h.run(
        "cmd0 %delay=5ms : cmd1 %delay=5ms : cmd2 %delay=5ms : child1 %delay=5ms \
         : bg.wait.latest : bg.wait",
    )
    .await
    .unwrap();

    assert_eq!(
        reports(&h.output()),
        vec![
            "[bg-4] child1 done",
            "[bg-1] cmd0 done",
            "[bg-2] cmd1 done",
            "[bg-3] cmd2 done",
        ]
    );
}

#[tokio::test]
async fn test_wait_for_task_by_id() {
    let h = Harness::new("");
    h.run("cmd0 %delay=5ms : cmd1 %delay=5ms : bg.wait.task id=bg-2")
        .await
        .unwrap();
    assert_eq!(reports(&h.output()), vec!["[bg-2] cmd1 done"]);
    assert_eq!(h.executor.list_bg_tasks().len(), 1);

    let err = h.run("bg.wait.task id=bg-9").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::FLOW_BG_TASK_NOT_FOUND);
}

#[tokio::test]
async fn test_background_failure_reported_on_wait_only() {
    let h = Harness::new("");
    h.run("gate %delay=1ms : bg.wait : cmd2").await.unwrap();

    let reports = reports(&h.output());
    assert_eq!(reports.len(), 1);
    assert!(reports[0].starts_with("[bg-1] gate failed:"));
    assert!(reports[0].contains("gate is closed"));
    assert!(h.ran("cmd2"));
}

#[tokio::test]
async fn test_delay_inside_background_task_is_invariant_violation() {
    let h = Harness::new("");
    h.run("later %delay=1ms : bg.wait").await.unwrap();

    let reports = reports(&h.output());
    assert_eq!(reports.len(), 1);
    assert!(reports[0].starts_with("[bg-1] later failed:"));
    assert!(reports[0].contains("E6101"));
    assert!(!h.ran("cmd0"));
}

#[tokio::test]
async fn test_waiting_from_background_task_is_invariant_violation() {
    let h = Harness::new("");
    h.run("bg.wait %delay=1ms : bg.wait.latest").await.unwrap();

    let reports = reports(&h.output());
    assert_eq!(reports.len(), 1);
    assert!(reports[0].contains("E6102"));
}

#[tokio::test]
async fn test_background_task_gets_its_own_env() {
    let h = Harness::new("");
    let mut env = Env::new();
    h.run_in("env.set key=color value=red : env.show %delay=1ms : bg.wait", &mut env, &[])
        .await
        .unwrap();

    let output = h.output();
    assert!(output.contains("color = red"));
    assert!(output.contains("sys.in-bg-task = true"));
    assert!(!env.get_bool(cmdflow::env::keys::IN_BG_TASK));
}

#[tokio::test]
async fn test_delayed_command_breaks_only_in_its_task() {
    let h = Harness::new("c c");
    h.executor.breakpoints().add_before("cmd0");
    h.executor.breakpoints().add_after("cmd0");
    h.run("cmd0 %delay=1ms : bg.wait").await.unwrap();

    // The scheduling flow does not check cmd0; its task does, before and after
    let reasons = h.hook.reasons();
    assert_eq!(reasons.len(), 2, "{reasons:?}");
    assert!(reasons[0].contains("before command: cmd0"));
    assert!(reasons[1].contains("after command: cmd0"));
    assert!(h.ran("cmd0"));
}

#[tokio::test]
async fn test_background_sub_flow_hits_breakpoints() {
    let h = Harness::new("c");
    h.executor.breakpoints().add_before("child1");
    h.run("parent %delay=1ms : bg.wait").await.unwrap();

    let reasons = h.hook.reasons();
    assert_eq!(reasons.len(), 1, "{reasons:?}");
    assert!(reasons[0].contains("before command"));
    assert!(reasons[0].contains("child1"));
    assert!(h.ran("child2"));
}

#[tokio::test]
async fn test_quit_in_background_task_spares_the_main_flow() {
    let h = Harness::new("q");
    h.executor.breakpoints().add_before("cmd0");
    h.run("cmd0 %delay=1ms : bg.wait : cmd1").await.unwrap();

    assert!(!h.ran("cmd0"));
    assert!(h.ran("cmd1"));
    assert!(h.output().contains("aborted by user"));
}

#[tokio::test]
async fn test_list_shows_pending_tasks() {
    let h = Harness::new("");
    h.run("cmd0 %delay=300ms : bg.list : bg.wait").await.unwrap();
    assert!(h.output().contains("bg-1  scheduled  cmd0"));
}
