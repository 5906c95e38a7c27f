//! End-to-end mission playthroughs against scripted personas.

use serde_json::json;
use taskmaster_core::testing::{
    assert_actions, assert_completed_phases, assert_phase, assert_shift_hidden, TestHarness,
};
use taskmaster_core::{ChatMessage, GameConfig, Phase, SessionError};

const CHOICES: [&str; 3] = ["choose_option"; 3];

#[tokio::test]
async fn test_full_playthrough() {
    let mut harness = TestHarness::new();

    // travel
    harness.taskmaster.push_text("Three destinations. Choose.");
    let reply = harness.session.new_game().await.unwrap();
    assert_eq!(reply.content, "Three destinations. Choose.");
    assert_phase(&harness, Phase::Travel);
    assert_actions(&reply, &CHOICES);
    assert_eq!(harness.session.state().mission_options.len(), 3);

    // travel -> briefing: pick Prague (shift 5)
    harness.expect_mission_pick(2, "Prague. Five black cars circled the square. Pick a cover.");
    let reply = harness.session.choose_option(2).await.unwrap();
    assert_phase(&harness, Phase::Briefing);
    assert_completed_phases(&harness, &[Phase::Travel]);
    assert_actions(
        &reply,
        &["choose_option", "choose_option", "choose_option", "get_weather"],
    );
    let mission = &harness.session.state().current_mission;
    assert_eq!(mission.location, "Prague");
    assert_eq!(mission.shift, Some(5));
    assert_eq!(mission.shift_hint, "Five black cars circled the square that night.");

    // weather intel does not consult a persona
    let calls_before = harness.taskmaster.call_count();
    let reply = harness.session.weather_intel().await.unwrap();
    assert!(reply.content.contains("Weather in Prague: light rain"));
    assert_eq!(harness.taskmaster.call_count(), calls_before);
    assert_eq!(harness.weather.lookups(), vec!["Prague".to_string()]);

    // briefing -> crack_code: the disguise pick advances before the model runs
    harness.taskmaster.push_text("Deliver this: the intercept.");
    let reply = harness.session.choose_option(1).await.unwrap();
    assert_phase(&harness, Phase::CrackCode);
    assert_completed_phases(&harness, &[Phase::Travel, Phase::Briefing]);
    assert_actions(&reply, &["use_decryptor"]);
    let seen = harness.taskmaster.states_seen();
    let last_seen = seen.last().unwrap().as_ref().unwrap();
    assert_eq!(last_seen.current_mission.phase, Phase::CrackCode);

    // wrong guesses are retryable and never reveal the key
    for guess in 1..=4 {
        let reply = harness.session.submit_shift(Some(guess)).await.unwrap();
        assert!(reply.content.contains("DECRYPTION FAILED"));
        assert_shift_hidden(&reply, 5);
        assert_actions(&reply, &["use_decryptor"]);
        assert_phase(&harness, Phase::CrackCode);
    }

    // unreadable selection
    let reply = harness.session.submit_shift(None).await.unwrap();
    assert!(reply.content.contains("signal lost"));
    assert_phase(&harness, Phase::CrackCode);

    // arm and crack
    let reply = harness.session.use_decryptor().unwrap();
    assert_actions(&reply, &["shift_1", "shift_2", "shift_3", "shift_4", "shift_5"]);

    harness.taskmaster.push_text("Well done, Agent. Rating: excellent.");
    let reply = harness.session.submit_shift(Some(5)).await.unwrap();
    assert!(reply
        .content
        .contains("Unencrypted message: THE EAGLE LANDS TONIGHT"));
    assert!(reply.content.ends_with("Well done, Agent. Rating: excellent."));
    assert_actions(&reply, &["new_game"]);

    assert_phase(&harness, Phase::Complete);
    assert!(!harness.is_active());
    assert_completed_phases(&harness, &[Phase::Travel, Phase::Briefing, Phase::CrackCode]);

    // the debrief turn was told about the decryption
    let last_log = harness.taskmaster.logs_seen().pop().unwrap();
    let told = last_log.messages().iter().any(|m| {
        matches!(m, ChatMessage::User { content } if content.contains("has been decrypted"))
    });
    assert!(told);
}

#[tokio::test]
async fn test_inactive_mission_routes_to_quartermaster() {
    let mut harness = TestHarness::new();
    harness.quartermaster.push_text("Good evening, Agent.");
    harness.quartermaster.push_text("Still here.");

    harness.session.send_message("Hello?").await.unwrap();
    let reply = harness.session.send_message("Anyone?").await.unwrap();

    assert_eq!(reply.content, "Still here.");
    assert_eq!(harness.taskmaster.call_count(), 0);
    assert_actions(&reply, &["new_game"]);

    let log = harness.session.conversation();
    let systems = log.messages().iter().filter(|m| m.role() == "system").count();
    assert_eq!(systems, 1);
    assert_eq!(log.messages()[0].role(), "system");

    // Quartermaster never receives game state
    assert!(harness.quartermaster.states_seen().iter().all(Option::is_none));
}

#[tokio::test]
async fn test_active_mission_routes_to_taskmaster() {
    let mut harness = TestHarness::new();
    harness.taskmaster.push_text("Choose.");
    harness.session.new_game().await.unwrap();

    harness.taskmaster.push_text("Focus, Agent.");
    let reply = harness.session.send_message("What's for lunch?").await.unwrap();
    assert_eq!(reply.content, "Focus, Agent.");
    assert_eq!(harness.quartermaster.call_count(), 0);
    assert!(harness.taskmaster.states_seen().iter().all(Option::is_some));
}

#[tokio::test]
async fn test_new_game_resets_conversation_and_state() {
    let mut harness = TestHarness::new();
    harness.quartermaster.push_text("Hello.");
    harness.session.send_message("hi").await.unwrap();

    harness.taskmaster.push_text("Choose.");
    harness.session.new_game().await.unwrap();

    let log = harness.session.conversation();
    assert_eq!(log.len(), 2);
    assert!(matches!(&log.messages()[0], ChatMessage::User { content } if content.starts_with("Start the mission")));
    assert!(harness.is_active());
    assert_completed_phases(&harness, &[]);
}

#[tokio::test]
async fn test_illegal_phase_jump_is_refused_inline() {
    let mut harness = TestHarness::new();
    harness.taskmaster.push_text("Choose.");
    harness.session.new_game().await.unwrap();

    harness
        .taskmaster
        .push_tools(vec![("update_game_phase", json!({ "phase": "complete" }))]);
    harness.taskmaster.push_text("Patience.");
    harness.session.send_message("Skip to the end").await.unwrap();

    assert_phase(&harness, Phase::Travel);
    assert!(harness.is_active());
    let refusal = harness
        .session
        .conversation()
        .messages()
        .iter()
        .find_map(|m| match m {
            ChatMessage::Tool { content, .. } => Some(content.clone()),
            _ => None,
        })
        .unwrap();
    assert!(refusal.contains("The next phase is briefing"));
}

#[tokio::test]
async fn test_unknown_tool_does_not_end_turn() {
    let mut harness = TestHarness::new();
    harness
        .quartermaster
        .push_tools(vec![("launch_satellite", json!({}))]);
    harness.quartermaster.push_text("That gadget is not in stock.");

    let reply = harness.session.send_message("Launch it").await.unwrap();
    assert_eq!(reply.content, "That gadget is not in stock.");
    assert!(harness
        .session
        .conversation()
        .messages()
        .contains(&ChatMessage::tool("call_1", "Unknown tool requested.")));
}

#[tokio::test]
async fn test_runaway_tool_loop_fails_turn() {
    let mut harness = TestHarness::with_config(GameConfig::default().with_max_tool_rounds(2));
    harness.taskmaster.push_text("Choose.");
    harness.session.new_game().await.unwrap();
    let calls_before = harness.taskmaster.call_count();

    for _ in 0..5 {
        harness
            .taskmaster
            .push_tools(vec![("weather", json!({ "city": "Lisbon" }))]);
    }
    let err = harness.session.send_message("Weather?").await.unwrap_err();

    assert!(matches!(err, SessionError::Turn(_)));
    assert!(!err.is_retryable());
    assert_eq!(harness.taskmaster.call_count() - calls_before, 3);
}

#[tokio::test]
async fn test_network_failure_is_retryable_and_keeps_progress() {
    let mut harness = TestHarness::new();
    harness.taskmaster.push_text("Choose.");
    harness.session.new_game().await.unwrap();

    let option = harness.session.state().option_at(1).cloned().unwrap();
    harness.taskmaster.push_tools(vec![
        (
            "select_mission",
            json!({ "location": option.location, "cipher": option.cipher, "shift": option.shift }),
        ),
        ("update_game_phase", json!({ "phase": "briefing" })),
    ]);
    harness.taskmaster.push(taskmaster_core::testing::ScriptedReply::Fail);

    let err = harness.session.choose_option(1).await.unwrap_err();
    assert!(err.is_retryable());
    assert_phase(&harness, Phase::Briefing);
    assert_eq!(harness.session.state().current_mission.location, "Lisbon");
    assert!(harness.session.has_pending_turn());
    assert_actions(&harness.session.status(), &["resume_turn"]);

    // Repeating the pick would read it as a disguise; it is held back instead.
    assert!(matches!(
        harness.session.choose_option(1).await,
        Err(SessionError::TurnPending)
    ));
    assert_phase(&harness, Phase::Briefing);

    harness
        .taskmaster
        .push_text("Lisbon. Two trams rattled past. Pick a cover.");
    let reply = harness.session.resume().await.unwrap();
    assert_eq!(reply.content, "Lisbon. Two trams rattled past. Pick a cover.");
    assert_phase(&harness, Phase::Briefing);
    assert_completed_phases(&harness, &[Phase::Travel]);
    assert_actions(
        &reply,
        &["choose_option", "choose_option", "choose_option", "get_weather"],
    );
    assert!(!harness.session.has_pending_turn());
    assert_eq!(
        user_messages(&harness),
        vec![
            "Start the mission. Present the available mission options.".to_string(),
            "I choose mission option 1: Lisbon.".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_resumed_message_is_not_repeated() {
    let mut harness = TestHarness::new();
    harness.quartermaster.push(taskmaster_core::testing::ScriptedReply::Fail);
    let err = harness.session.send_message("Got a pen?").await.unwrap_err();
    assert!(err.is_retryable());

    assert!(matches!(
        harness.session.send_message("Got a pen?").await,
        Err(SessionError::TurnPending)
    ));

    harness.quartermaster.push_text("The exploding kind.");
    let reply = harness.session.resume().await.unwrap();
    assert_eq!(reply.content, "The exploding kind.");
    assert_actions(&reply, &["new_game"]);
    assert_eq!(user_messages(&harness), vec!["Got a pen?".to_string()]);

    assert!(matches!(
        harness.session.resume().await,
        Err(SessionError::NothingToResume)
    ));
}

#[tokio::test]
async fn test_decryption_shown_when_debrief_fails() {
    let mut harness = TestHarness::new();
    harness.taskmaster.push_text("Choose.");
    harness.session.new_game().await.unwrap();
    harness.expect_mission_pick(2, "Prague. Pick a cover.");
    harness.session.choose_option(2).await.unwrap();
    harness.taskmaster.push_text("The intercept.");
    harness.session.choose_option(1).await.unwrap();
    assert_phase(&harness, Phase::CrackCode);

    harness.taskmaster.push(taskmaster_core::testing::ScriptedReply::Fail);
    let reply = harness.session.submit_shift(Some(5)).await.unwrap();
    assert!(reply
        .content
        .contains("Unencrypted message: THE EAGLE LANDS TONIGHT"));
    assert!(reply.content.contains("Reconnect to receive it."));
    assert_actions(&reply, &["resume_turn"]);
    assert_phase(&harness, Phase::Complete);

    harness.taskmaster.push_text("Well done, Agent.");
    let reply = harness.session.resume().await.unwrap();
    assert_eq!(reply.content, "Well done, Agent.");
    assert_actions(&reply, &["new_game"]);
}

fn user_messages(harness: &TestHarness) -> Vec<String> {
    harness
        .session
        .conversation()
        .messages()
        .iter()
        .filter_map(|m| match m {
            ChatMessage::User { content } => Some(content.clone()),
            _ => None,
        })
        .collect()
}
