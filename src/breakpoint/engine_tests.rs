//! Tests for breakpoint decisions

#[cfg(test)]
mod tests {
    use crate::breakpoint::engine::*;
    use crate::breakpoint::{
        BreakPointAction, InvalidInputPolicy, ScriptedHook, SharedBreakPoints,
    };
    use crate::command::{parse_flow_str, Cmd, CmdKind, CmdRegistry, ParsedFlow};
    use crate::display::MemoryScreen;
    use crate::env::{keys, Env};
    use crate::error::Result;
    use crate::executor::mask::{ExecPolicy, ExecuteMask};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Interactor that counts sessions and optionally asks to leave
    #[derive(Default)]
    struct MockInteractor {
        calls: AtomicUsize,
        leave: bool,
    }

    impl MockInteractor {
        fn leaving() -> Self {
            Self {
                leave: true,
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl Interactor for MockInteractor {
        async fn interact(&self, env: &mut Env) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(env.flags().inside_interact());
            if self.leave {
                env.flags().request_leave();
            }
            Ok(())
        }
    }

    struct Fixture {
        engine: BreakpointEngine,
        hook: Arc<ScriptedHook>,
        screen: Arc<MemoryScreen>,
        breakpoints: SharedBreakPoints,
        flow: ParsedFlow,
    }

    fn registry() -> CmdRegistry {
        let mut registry = CmdRegistry::with_builtins();
        registry.register(Cmd::new(
            "build",
            "",
            CmdKind::Flow(vec!["echo".into(), ":".into(), "dummy".into()]),
        ));
        registry.register(
            Cmd::new(
                "sealed",
                "",
                CmdKind::Flow(vec!["echo".into()]),
            )
            .unbreak_file_and_flow(),
        );
        registry
    }

    fn fixture(script: &str) -> Fixture {
        let hook = Arc::new(ScriptedHook::from_script(script));
        let screen = Arc::new(MemoryScreen::new());
        let breakpoints = SharedBreakPoints::new();
        let engine = BreakpointEngine::new(breakpoints.clone(), hook.clone(), screen.clone());
        let flow = parse_flow_str(&registry(), "build : echo msg=hi : noop : sealed").unwrap();
        Fixture {
            engine,
            hook,
            screen,
            breakpoints,
            flow,
        }
    }

    fn target(flow: &ParsedFlow, index: usize) -> BreakTarget<'_> {
        BreakTarget::in_flow(flow, index, &flow.cmds[index])
    }

    #[tokio::test]
    async fn test_no_triggers_never_prompts() {
        let f = fixture("q");
        let mut env = Env::new();
        let interactor = MockInteractor::default();
        for i in 0..f.flow.len() {
            let action = f
                .engine
                .decide_before(&interactor, &mut env, &target(&f.flow, i), None, BreakCheck::default())
                .await
                .unwrap();
            assert_eq!(action, BreakPointAction::Continue);
        }
        assert_eq!(f.hook.prompt_count(), 0);
        assert_eq!(f.screen.contents(), "");
    }

    #[tokio::test]
    async fn test_quiet_wins_over_here_now_and_registry() {
        let f = fixture("q");
        f.breakpoints.add_before("noop");
        let mut env = Env::new();
        env.flags().arm_here_now();
        let action = f
            .engine
            .decide_before(
                &MockInteractor::default(),
                &mut env,
                &target(&f.flow, 2),
                None,
                BreakCheck::default(),
            )
            .await
            .unwrap();
        assert_eq!(action, BreakPointAction::Continue);
        assert_eq!(f.hook.prompt_count(), 0);
        // Not consumed by the quiet command
        assert!(env.flags().peek_here_now());
    }

    #[tokio::test]
    async fn test_here_now_is_consumed_once() {
        let f = fixture("c c");
        let mut env = Env::new();
        env.flags().arm_here_now();
        let interactor = MockInteractor::default();
        for _ in 0..2 {
            f.engine
                .decide_before(&interactor, &mut env, &target(&f.flow, 1), None, BreakCheck::default())
                .await
                .unwrap();
        }
        assert_eq!(f.hook.prompt_count(), 1);
        assert!(f.hook.reasons()[0].contains("before command"));
        assert!(!env.get_bool(keys::BREAKPOINT_HERE_NOW));
    }

    #[tokio::test]
    async fn test_step_in_offered_only_for_sub_flows() {
        let f = fixture("c c c");
        f.breakpoints.add_before("build");
        f.breakpoints.add_before("echo");
        f.breakpoints.add_before("sealed");
        let mut env = Env::new();
        let interactor = MockInteractor::default();
        for i in [0, 1, 3] {
            f.engine
                .decide_before(&interactor, &mut env, &target(&f.flow, i), None, BreakCheck::default())
                .await
                .unwrap();
        }
        let offered = f.hook.offered_keys();
        assert_eq!(offered[0][0], "t");
        assert!(!offered[1].contains(&"t".to_string()));
        // unbreak-file-flow commands never offer step-in
        assert!(!offered[2].contains(&"t".to_string()));
    }

    #[tokio::test]
    async fn test_step_in_not_offered_for_untracked_mask() {
        let f = fixture("c");
        f.breakpoints.add_before("build");
        let mut env = Env::new();
        let mask = ExecuteMask::new(ExecPolicy::Default);
        f.engine
            .decide_before(
                &MockInteractor::default(),
                &mut env,
                &target(&f.flow, 0),
                Some(&mask),
                BreakCheck::default(),
            )
            .await
            .unwrap();
        assert!(!f.hook.offered_keys()[0].contains(&"t".to_string()));
    }

    #[tokio::test]
    async fn test_step_in_normalizes_to_continue() {
        let f = fixture("T");
        f.breakpoints.add_before("build");
        let mut env = Env::new();
        let action = f
            .engine
            .decide_before(
                &MockInteractor::default(),
                &mut env,
                &target(&f.flow, 0),
                None,
                BreakCheck::default(),
            )
            .await
            .unwrap();
        assert_eq!(action, BreakPointAction::Continue);
        assert!(env.flags().peek_step_in());
    }

    #[tokio::test]
    async fn test_skip_arms_step_out_only_on_last() {
        let f = fixture("s s");
        f.breakpoints.add_before("echo");
        let interactor = MockInteractor::default();

        let mut env = Env::new();
        let action = f
            .engine
            .decide_before(&interactor, &mut env, &target(&f.flow, 1), None, BreakCheck::default())
            .await
            .unwrap();
        assert_eq!(action, BreakPointAction::Skip);
        assert!(!env.flags().peek_step_out());

        let check = BreakCheck {
            is_last_in_flow: true,
            ..Default::default()
        };
        f.engine
            .decide_before(&interactor, &mut env, &target(&f.flow, 1), None, check)
            .await
            .unwrap();
        assert!(env.flags().peek_step_out());
    }

    #[tokio::test]
    async fn test_exec_mask_runs_through_without_touching_flags() {
        let f = fixture("q");
        f.breakpoints.add_before("echo");
        let mut env = Env::new();
        env.flags().arm_step_in();
        env.flags().arm_at_next();
        let mask = ExecuteMask::new(ExecPolicy::Exec);
        let action = f
            .engine
            .decide_before(
                &MockInteractor::default(),
                &mut env,
                &target(&f.flow, 1),
                Some(&mask),
                BreakCheck::default(),
            )
            .await
            .unwrap();
        assert_eq!(action, BreakPointAction::Continue);
        assert_eq!(f.hook.prompt_count(), 0);
        assert!(env.flags().peek_step_in());
        // at-next is consumed on read even inside a step-over
        assert!(!env.flags().peek_at_next());
    }

    #[tokio::test]
    async fn test_reason_priority() {
        let f = fixture("c c c");
        let interactor = MockInteractor::default();
        let mut env = Env::new();

        env.flags().arm_step_in();
        f.engine
            .decide_before(&interactor, &mut env, &target(&f.flow, 1), None, BreakCheck::default())
            .await
            .unwrap();
        env.flags().arm_step_out();
        f.engine
            .decide_before(&interactor, &mut env, &target(&f.flow, 1), None, BreakCheck::default())
            .await
            .unwrap();
        let check = BreakCheck {
            break_by_prev: true,
            ..Default::default()
        };
        f.engine
            .decide_before(&interactor, &mut env, &target(&f.flow, 1), None, check)
            .await
            .unwrap();

        let reasons = f.hook.reasons();
        assert!(reasons[0].contains("just stepped in"));
        assert!(reasons[1].contains("just stepped out"));
        assert!(reasons[2].contains("previous choice"));
        assert!(!env.flags().peek_step_in());
        assert!(!env.flags().peek_step_out());
    }

    #[tokio::test]
    async fn test_registry_break_leaves_step_flags_armed() {
        let f = fixture("c c");
        f.breakpoints.add_before("echo");
        let interactor = MockInteractor::default();
        let mut env = Env::new();
        env.flags().arm_step_in();

        f.engine
            .decide_before(&interactor, &mut env, &target(&f.flow, 1), None, BreakCheck::default())
            .await
            .unwrap();
        assert!(env.flags().peek_step_in());

        f.engine
            .decide_before(&interactor, &mut env, &target(&f.flow, 0), None, BreakCheck::default())
            .await
            .unwrap();
        let reasons = f.hook.reasons();
        assert!(reasons[0].contains("before command"));
        assert!(reasons[1].contains("just stepped in"));
        assert!(!env.flags().peek_step_in());
    }

    #[tokio::test]
    async fn test_quit_is_abort_error() {
        let f = fixture("q");
        f.breakpoints.add_before("echo");
        let mut env = Env::new();
        let err = f
            .engine
            .decide_before(
                &MockInteractor::default(),
                &mut env,
                &target(&f.flow, 1),
                None,
                BreakCheck::default(),
            )
            .await
            .unwrap_err();
        assert!(err.is_abort());
        assert!(err.to_string().contains("abort"));
    }

    #[tokio::test]
    async fn test_invalid_input_continues_with_scripted_hook() {
        let f = fixture("x");
        f.breakpoints.add_before("echo");
        let mut env = Env::new();
        let action = f
            .engine
            .decide_before(
                &MockInteractor::default(),
                &mut env,
                &target(&f.flow, 1),
                None,
                BreakCheck::default(),
            )
            .await
            .unwrap();
        assert_eq!(action, BreakPointAction::Continue);
        assert_eq!(f.hook.prompt_count(), 1);
        assert!(f.screen.contains("'x' is not one of"));
    }

    #[tokio::test]
    async fn test_not_offered_step_in_reprompts_when_configured() {
        let hook = Arc::new(ScriptedHook::from_script("t s"));
        let screen = Arc::new(MemoryScreen::new());
        let breakpoints = SharedBreakPoints::new();
        breakpoints.add_before("echo");
        let engine = BreakpointEngine::new(breakpoints, hook.clone(), screen)
            .with_invalid_input(InvalidInputPolicy::Reprompt);
        let flow = parse_flow_str(&registry(), "echo").unwrap();

        let mut env = Env::new();
        let action = engine
            .decide_before(
                &MockInteractor::default(),
                &mut env,
                &target(&flow, 0),
                None,
                BreakCheck::default(),
            )
            .await
            .unwrap();
        assert_eq!(action, BreakPointAction::Skip);
        assert_eq!(hook.prompt_count(), 2);
        assert!(!env.flags().peek_step_in());
    }

    #[tokio::test]
    async fn test_interact_then_leave_continues() {
        let f = fixture("i");
        f.breakpoints.add_before("echo");
        let interactor = MockInteractor::leaving();
        let mut env = Env::new();
        let action = f
            .engine
            .decide_before(&interactor, &mut env, &target(&f.flow, 1), None, BreakCheck::default())
            .await
            .unwrap();
        assert_eq!(action, BreakPointAction::Continue);
        assert_eq!(interactor.calls.load(Ordering::SeqCst), 1);
        assert!(!env.flags().inside_interact());
        assert!(!env.get_bool(keys::INTERACT_LEAVING));
    }

    #[tokio::test]
    async fn test_interact_without_leave_reprompts() {
        let f = fixture("i s");
        f.breakpoints.add_before("echo");
        let interactor = MockInteractor::default();
        let mut env = Env::new();
        let action = f
            .engine
            .decide_before(&interactor, &mut env, &target(&f.flow, 1), None, BreakCheck::default())
            .await
            .unwrap();
        assert_eq!(action, BreakPointAction::Skip);
        assert_eq!(f.hook.prompt_count(), 2);
    }

    #[tokio::test]
    async fn test_inside_interact_never_prompts() {
        let f = fixture("q");
        f.breakpoints.add_before("echo");
        f.breakpoints.add_after("echo");
        let mut env = Env::new();
        env.flags().enter_interact();
        let interactor = MockInteractor::default();
        let t = target(&f.flow, 1);
        assert_eq!(
            f.engine
                .decide_before(&interactor, &mut env, &t, None, BreakCheck::default())
                .await
                .unwrap(),
            BreakPointAction::Continue
        );
        assert_eq!(
            f.engine
                .decide_after(&interactor, &mut env, &t, BreakCheck::default())
                .await
                .unwrap(),
            BreakPointAction::Continue
        );
        assert_eq!(f.hook.prompt_count(), 0);
    }

    #[tokio::test]
    async fn test_after_step_to_next_is_step_over() {
        let f = fixture("d d");
        f.breakpoints.add_after("echo");
        f.breakpoints.add_after("build");
        let interactor = MockInteractor::default();
        let last = BreakCheck {
            is_last_in_flow: true,
            ..Default::default()
        };

        let mut env = Env::new();
        let action = f
            .engine
            .decide_after(&interactor, &mut env, &target(&f.flow, 1), last)
            .await
            .unwrap();
        assert_eq!(action, BreakPointAction::StepOver);
        assert!(env.flags().consume_step_out());

        // A command with a sub-flow does not arm step-out
        f.engine
            .decide_after(&interactor, &mut env, &target(&f.flow, 0), last)
            .await
            .unwrap();
        assert!(!env.flags().peek_step_out());
        assert!(f.hook.reasons()[0].contains("after command"));
        assert!(f.hook.offered_keys()[0].contains(&"d".to_string()));
        assert!(!f.hook.offered_keys()[0].contains(&"s".to_string()));
    }

    #[tokio::test]
    async fn test_after_without_registry_entry_is_silent() {
        let f = fixture("q");
        f.breakpoints.add_before("echo");
        let mut env = Env::new();
        let action = f
            .engine
            .decide_after(
                &MockInteractor::default(),
                &mut env,
                &target(&f.flow, 1),
                BreakCheck::default(),
            )
            .await
            .unwrap();
        assert_eq!(action, BreakPointAction::Continue);
        assert_eq!(f.hook.prompt_count(), 0);
    }

    #[tokio::test]
    async fn test_wait_only_after_continue() {
        let f = fixture("");
        let mut env = Env::new();
        env.set(keys::EXECUTE_WAIT_SEC, "1");
        let interactor = MockInteractor::default();

        f.engine
            .decide_break_with_wait(
                BreakStage::Before,
                &interactor,
                &mut env,
                &target(&f.flow, 1),
                None,
                BreakCheck::default(),
            )
            .await
            .unwrap();
        assert_eq!(f.screen.contents(), "");

        f.engine
            .decide_break_with_wait(
                BreakStage::After,
                &interactor,
                &mut env,
                &target(&f.flow, 1),
                None,
                BreakCheck::default(),
            )
            .await
            .unwrap();
        assert_eq!(f.screen.contents(), ".\n");

        // Bootstrap and last-command (no at-end value) skip the pause
        let bootstrap = BreakCheck {
            is_bootstrap: true,
            ..Default::default()
        };
        let last = BreakCheck {
            is_last_in_flow: true,
            ..Default::default()
        };
        for check in [bootstrap, last] {
            f.engine
                .decide_break_with_wait(
                    BreakStage::After,
                    &interactor,
                    &mut env,
                    &target(&f.flow, 1),
                    None,
                    check,
                )
                .await
                .unwrap();
        }
        assert_eq!(f.screen.contents(), ".\n");
    }

    #[tokio::test]
    async fn test_at_end() {
        let f = fixture("q");
        let interactor = MockInteractor::default();
        let mut env = Env::new();
        assert_eq!(
            f.engine.decide_at_end(&interactor, &mut env).await.unwrap(),
            BreakPointAction::Continue
        );
        assert_eq!(f.hook.prompt_count(), 0);

        f.breakpoints.set_at_end(true);
        let err = f.engine.decide_at_end(&interactor, &mut env).await.unwrap_err();
        assert!(err.is_abort());
        assert_eq!(f.hook.offered_keys()[0], vec!["c", "i", "q"]);
        assert!(f.hook.reasons()[0].contains("at end"));
    }

    #[tokio::test]
    async fn test_inside_file_and_flow() {
        let interactor = MockInteractor::default();

        // Ignores the registry
        let f = fixture("s");
        f.breakpoints.add_before("build");
        let mut env = Env::new();
        assert!(f
            .engine
            .decide_inside_file_and_flow(&interactor, &mut env, &target(&f.flow, 0), false)
            .await
            .unwrap());
        assert_eq!(f.hook.prompt_count(), 0);

        // Skip drops the file part
        env.flags().arm_step_out();
        assert!(!f
            .engine
            .decide_inside_file_and_flow(&interactor, &mut env, &target(&f.flow, 0), false)
            .await
            .unwrap());
        assert!(f.hook.reasons()[0].contains("just stepped out"));

        // Continue consumes step-out
        let f = fixture("c");
        let mut env = Env::new();
        env.flags().arm_step_out();
        assert!(f
            .engine
            .decide_inside_file_and_flow(&interactor, &mut env, &target(&f.flow, 0), false)
            .await
            .unwrap());
        assert!(!env.flags().peek_step_out());

        // Step-over leaves step-out armed
        let f = fixture("d");
        let mut env = Env::new();
        env.flags().arm_step_out();
        assert!(f
            .engine
            .decide_inside_file_and_flow(&interactor, &mut env, &target(&f.flow, 0), false)
            .await
            .unwrap());
        assert!(env.flags().peek_step_out());
    }
}
