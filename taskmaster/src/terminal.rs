//! Line-oriented terminal front end.
//!
//! Plain lines are sent to whichever persona is active. Lines starting with
//! `#` map onto the game's actions:
//! - `#new`, `#choose <n>`, `#weather`, `#decrypt`, `#shift <n>`
//! - `#retry` after an interrupted turn
//! - `#status`, `#actions`, `#help`, `#quit`

use std::io::{self, BufRead, Write};
use taskmaster_core::affordance::{
    parse_selected_shift, CHOOSE_OPTION, GET_WEATHER, NEW_GAME, RESUME_TURN, USE_DECRYPTOR,
};
use taskmaster_core::{
    Action, Command, DispatchError, Reply, SessionError, SessionId, SessionRegistry,
};

/// One parsed input line.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Empty,
    Game(Command),
    ShowActions,
    Help,
    Quit,
    Usage(&'static str),
    Unknown(String),
}

/// Parse a line of player input.
pub fn parse_line(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    let Some(command) = line.strip_prefix('#') else {
        return Input::Game(Command::Message(line.to_string()));
    };

    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let arg = parts.next();

    match name {
        "quit" | "exit" => Input::Quit,
        "help" => Input::Help,
        "actions" => Input::ShowActions,
        "new" => Input::Game(Command::NewGame),
        "status" => Input::Game(Command::Status),
        "weather" => Input::Game(Command::Weather),
        "decrypt" => Input::Game(Command::Decryptor),
        "retry" => Input::Game(Command::Resume),
        "choose" => match arg.and_then(|a| a.parse::<usize>().ok()) {
            Some(n) => Input::Game(Command::Choose(n)),
            None => Input::Usage("#choose <number>"),
        },
        "shift" => Input::Game(Command::Shift(parse_selected_shift(arg, None, None))),
        other => Input::Unknown(other.to_string()),
    }
}

/// How to trigger an action from the terminal.
pub fn action_hint(action: &Action) -> String {
    match action.name.as_str() {
        NEW_GAME => "#new".to_string(),
        CHOOSE_OPTION => format!("#choose {}", action.value),
        GET_WEATHER => "#weather".to_string(),
        USE_DECRYPTOR => "#decrypt".to_string(),
        RESUME_TURN => "#retry".to_string(),
        _ => format!("#shift {}", action.value),
    }
}

fn print_help() {
    println!("[HELP]");
    println!("  #new         - Start a new mission");
    println!("  #choose <n>  - Pick numbered option n");
    println!("  #weather     - Weather intel for your destination");
    println!("  #decrypt     - Arm the decryptor");
    println!("  #shift <n>   - Try shift n on the intercepted message");
    println!("  #retry       - Finish a turn the line dropped on");
    println!("  #status      - Show mission status");
    println!("  #actions     - Show the actions available now");
    println!("  #quit        - Exit the game");
    println!("  (anything else is sent to your handler)");
}

fn print_actions(actions: &[Action]) {
    if actions.is_empty() {
        return;
    }
    let hints: Vec<String> = actions.iter().map(action_hint).collect();
    println!("[ACTIONS] {}", hints.join(" | "));
}

fn print_reply(reply: &Reply) {
    println!("[HQ]");
    for para in reply.content.split("\n\n") {
        println!("{para}");
    }
    println!();
    print_actions(&reply.actions);
}

/// Run the protocol over stdin/stdout until `#quit` or end of input.
pub async fn run(registry: &SessionRegistry, id: SessionId) -> Result<(), DispatchError> {
    let welcome = registry.dispatch(id, Command::Welcome).await?;
    println!("=== Taskmaster ===");
    print_reply(&welcome);
    println!("Type #help for commands.");
    println!();

    let mut actions = welcome.actions;
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("Error reading input: {e}");
                break;
            }
        };

        let command = match parse_line(&line) {
            Input::Empty => continue,
            Input::Quit => {
                println!("Goodbye, Agent.");
                break;
            }
            Input::Help => {
                print_help();
                continue;
            }
            Input::ShowActions => {
                print_actions(&actions);
                continue;
            }
            Input::Usage(usage) => {
                println!("[ERROR] Usage: {usage}");
                continue;
            }
            Input::Unknown(name) => {
                println!("[ERROR] Unknown command #{name}. Type #help for help.");
                continue;
            }
            Input::Game(command) => command,
        };

        print!("[PROCESSING]");
        stdout.flush().ok();
        let result = registry.dispatch(id, command).await;
        print!("\r            \r");
        stdout.flush().ok();

        match result {
            Ok(reply) => {
                print_reply(&reply);
                actions = reply.actions;
            }
            Err(DispatchError::Session(e @ SessionError::Turn(_))) if e.is_retryable() => {
                println!("[ERROR] {e} (#retry to resume)");
                actions = vec![Action::resume_turn()];
            }
            Err(DispatchError::Session(e)) if e.is_retryable() => {
                println!("[ERROR] {e} (try again)");
            }
            Err(e) => println!("[ERROR] {e}"),
        }
    }

    Ok(())
}
