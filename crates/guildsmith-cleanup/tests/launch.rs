//! Advised launches: snapshot, advisor, then a session.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{ScriptedAdvisor, direct, engine, naming_plan};
use guildsmith_cleanup::{
    AnalysisDepth, CleanupError, CleanupPlan, Decision, LaunchOutcome, LaunchRequest,
    NoticeLevel, RenderRequest, SessionId, SessionStatus, Suggestion,
};
use guildsmith_test::{MockGuild, test_owner};

fn guild() -> MockGuild {
    MockGuild::new().with_text_channel("my channel")
}

fn request() -> LaunchRequest {
    LaunchRequest::new(test_owner(), "inv-1").with_depth(AnalysisDepth::Comprehensive)
}

#[tokio::test(start_paused = true)]
async fn test_launch_starts_session() {
    let (engine, mut screens) = engine(direct());
    let guild = guild();
    let advisor = ScriptedAdvisor::plan(naming_plan(&["my channel"]));

    let outcome = engine
        .launch(Arc::new(guild.clone()), &advisor, request())
        .await
        .unwrap();
    let LaunchOutcome::Started(id) = outcome else {
        panic!("expected a session, got {outcome:?}");
    };
    assert_eq!(id, SessionId::new(test_owner(), "inv-1"));

    screens.next_prompt().await;
    engine
        .submit_decision(&id, &test_owner(), Decision::Apply)
        .unwrap();
    let summary = screens.summary().await;
    assert_eq!(summary.status, SessionStatus::Completed);
    assert!(guild.channel_named("my-channel").is_some());
}

#[tokio::test(start_paused = true)]
async fn test_launch_parses_model_text() {
    let (engine, mut screens) = engine(direct());
    let advisor = ScriptedAdvisor::text(
        r#"```json
{"issues": [
  {"type": "naming_inconsistency", "severity": "high", "description": "Spaces", "affected_items": ["my channel"]},
  {"type": "naming_inconsistency"}
]}
```"#,
    );

    let outcome = engine
        .launch(Arc::new(guild()), &advisor, request())
        .await
        .unwrap();
    let LaunchOutcome::Started(id) = outcome else {
        panic!("expected a session, got {outcome:?}");
    };
    let prompt = screens.next_prompt().await;
    assert_eq!(prompt.step, Some((0, 1)));
    engine
        .submit_decision(&id, &test_owner(), Decision::Abort)
        .unwrap();
    assert_eq!(screens.summary().await.total, 1);
}

#[tokio::test(start_paused = true)]
async fn test_launch_with_nothing_to_fix() {
    let (engine, mut screens) = engine(direct());
    let plan = CleanupPlan::default().with_suggestions(vec![Suggestion {
        category: "structure".to_string(),
        suggestion: "Group voice channels".to_string(),
        benefits: "Easier navigation".to_string(),
        requires_confirmation: false,
    }]);

    let outcome = engine
        .launch(Arc::new(guild()), &ScriptedAdvisor::plan(plan), request())
        .await
        .unwrap();
    assert_eq!(outcome, LaunchOutcome::NoIssues { suggestions: 1 });
    assert!(matches!(
        screens.next().await,
        RenderRequest::Notice {
            level: NoticeLevel::Info,
            ..
        }
    ));
    let RenderRequest::DetailedReport(report) = screens.next().await else {
        panic!("expected the suggestions to be shown");
    };
    assert_eq!(report.sections.len(), 1);
    assert!(report.sections[0].value.contains("Group voice channels"));
    assert!(report.sections[0].value.contains("Easier navigation"));
    assert_eq!(engine.active_sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_launch_with_empty_plan_only_notifies() {
    let (engine, mut screens) = engine(direct());
    let outcome = engine
        .launch(
            Arc::new(guild()),
            &ScriptedAdvisor::plan(CleanupPlan::default()),
            request(),
        )
        .await
        .unwrap();
    assert_eq!(outcome, LaunchOutcome::NoIssues { suggestions: 0 });
    let RenderRequest::Notice { text, .. } = screens.next().await else {
        panic!("expected a notice");
    };
    assert_eq!(text, "No issues found! Your server structure looks good.");
    assert!(screens.try_next().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_launch_advisor_timeout() {
    let (engine, mut screens) = engine(direct());
    let advisor = ScriptedAdvisor::stalled(Duration::from_secs(3600));

    let outcome = engine
        .launch(Arc::new(guild()), &advisor, request())
        .await
        .unwrap();
    assert_eq!(
        outcome,
        LaunchOutcome::AdvisoryFailed("analysis timed out after 30s".to_string())
    );
    assert!(matches!(
        screens.next().await,
        RenderRequest::Notice {
            level: NoticeLevel::Error,
            ..
        }
    ));
    assert_eq!(engine.active_sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_launch_malformed_reply() {
    let (engine, _screens) = engine(direct());
    let advisor = ScriptedAdvisor::text("I could not analyse this server, sorry.");

    let outcome = engine
        .launch(Arc::new(guild()), &advisor, request())
        .await
        .unwrap();
    let LaunchOutcome::AdvisoryFailed(text) = outcome else {
        panic!("expected a failure, got {outcome:?}");
    };
    assert!(text.starts_with("malformed cleanup plan"));
}

#[tokio::test(start_paused = true)]
async fn test_launch_provider_failure() {
    let (engine, _screens) = engine(direct());
    let advisor = ScriptedAdvisor::failing("rate limited");

    let outcome = engine
        .launch(Arc::new(guild()), &advisor, request())
        .await
        .unwrap();
    assert_eq!(
        outcome,
        LaunchOutcome::AdvisoryFailed("analysis service failed: rate limited".to_string())
    );
}

#[tokio::test(start_paused = true)]
async fn test_launch_unreadable_guild() {
    let (engine, _screens) = engine(direct());
    let advisor = ScriptedAdvisor::plan(naming_plan(&["my channel"]));

    let outcome = engine
        .launch(Arc::new(guild().with_failing_reads()), &advisor, request())
        .await
        .unwrap();
    let LaunchOutcome::AdvisoryFailed(text) = outcome else {
        panic!("expected a failure, got {outcome:?}");
    };
    assert!(text.starts_with("failed to analyze server structure"));
}

#[tokio::test(start_paused = true)]
async fn test_launch_conflicts_with_running_session() {
    let (engine, mut screens) = engine(direct());
    let advisor = ScriptedAdvisor::plan(naming_plan(&["my channel"]));

    let first = engine
        .launch(Arc::new(guild()), &advisor, request())
        .await
        .unwrap();
    assert!(matches!(first, LaunchOutcome::Started(_)));

    let err = engine
        .launch(Arc::new(guild()), &advisor, request())
        .await
        .unwrap_err();
    assert!(matches!(err, CleanupError::Conflict(_)));

    screens.next_prompt().await;
    assert_eq!(engine.active_sessions(), 1);
}
