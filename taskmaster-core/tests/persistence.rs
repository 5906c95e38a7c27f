//! File-backed state and mission log through a live session.

use taskmaster_core::persist::{MissionLog, StateFile};
use taskmaster_core::testing::{assert_phase, TestHarness};
use taskmaster_core::{GameConfig, Phase};
use tempfile::tempdir;

#[tokio::test]
async fn test_state_survives_restart() {
    let dir = tempdir().unwrap();
    let state_path = dir.path().join("game_state.json");
    let config = GameConfig::default().with_state_file(&state_path);

    let mut harness = TestHarness::with_config(config.clone());
    harness.taskmaster.push_text("Choose.");
    harness.session.new_game().await.unwrap();
    harness.expect_mission_pick(3, "Oslo. A single lamp burned in the window.");
    harness.session.choose_option(3).await.unwrap();
    assert_phase(&harness, Phase::Briefing);

    let saved = StateFile::new(&state_path).load().await;
    assert_eq!(&saved, harness.session.state());

    let mut restarted = TestHarness::with_config(config);
    assert_phase(&restarted, Phase::Travel);
    restarted.session.restore().await;
    assert_phase(&restarted, Phase::Briefing);
    assert_eq!(restarted.session.state().current_mission.location, "Oslo");
    assert_eq!(restarted.session.state().current_mission.shift, Some(1));
}

#[tokio::test]
async fn test_restore_tolerates_corrupt_state() {
    let dir = tempdir().unwrap();
    let state_path = dir.path().join("game_state.json");
    tokio::fs::write(&state_path, "not json at all").await.unwrap();

    let mut harness = TestHarness::with_config(GameConfig::default().with_state_file(&state_path));
    harness.session.restore().await;
    assert!(!harness.is_active());
    assert_eq!(harness.session.welcome().actions[0].name, "new_game");
}

#[tokio::test]
async fn test_mission_log_records_each_turn() {
    let dir = tempdir().unwrap();
    let log_path = dir.path().join("mission_log.json");
    let mut harness =
        TestHarness::with_config(GameConfig::default().with_mission_log(&log_path));

    harness.quartermaster.push_text("Evening.");
    harness.session.send_message("Hello").await.unwrap();
    harness.taskmaster.push_text("Choose.");
    harness.session.new_game().await.unwrap();

    // Non-persona operations are not logged.
    harness.session.status();

    let record = MissionLog::new(&log_path).load().await;
    assert_eq!(record.conversation.len(), 2);
    assert_eq!(record.conversation[0].user, "Hello");
    assert_eq!(record.conversation[0].agent, "Evening.");
    assert_eq!(record.conversation[1].agent, "Choose.");
}

#[tokio::test]
async fn test_restored_shift_stays_crackable() {
    let dir = tempdir().unwrap();
    let state_path = dir.path().join("game_state.json");
    tokio::fs::write(
        &state_path,
        r#"{"current_mission": {"active": true, "phase": "crack_code", "location": "Oslo",
            "cipher": "NBSL", "shift": 9, "completed_phases": ["travel", "briefing"]}}"#,
    )
    .await
    .unwrap();

    let mut harness = TestHarness::with_config(GameConfig::default().with_state_file(&state_path));
    harness.session.restore().await;
    assert_eq!(harness.session.state().current_mission.shift, Some(5));

    harness.taskmaster.push_text("Good work.");
    let reply = harness.session.submit_shift(Some(5)).await.unwrap();
    assert!(reply.content.contains("DECRYPTION SUCCESSFUL"));
    assert_phase(&harness, Phase::Complete);
}
