use std::io::{self, Write};
use std::path::PathBuf;

use tokio::io::{AsyncBufReadExt, BufReader};
use weft_engine::{RecorderHandle, SuccessKind};
use weft_gen::export_log;

const HELP: &str = "Commands:
  start                  Begin a new recording (clears the previous log)
  stop                   Stop recording and hand the log to the sink
  status                 Recording flag and action count
  log                    Print the current log as JSON
  last                   Show the last action and its locator candidates
  drop                   Remove the last action
  use <index>            Make candidate <index> the primary locator
  locator <xpath>        Overwrite the last action's primary locator
  check-equals [text]    Append an equals success condition from the selection
  check-contains [text]  Append a contains success condition from the selection
  export <path>          Write the current log to a JSON file
  help                   This list
  exit | quit            Leave; a live recording is stopped on the way out";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Start,
    Stop,
    Status,
    Log,
    Last,
    Drop,
    Use(usize),
    Locator(String),
    CheckEquals(Option<String>),
    CheckContains(Option<String>),
    Export(PathBuf),
    Help,
}

fn parse(line: &str) -> Result<Command, String> {
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };
    let argument = || {
        if rest.is_empty() {
            None
        } else {
            Some(rest.to_string())
        }
    };
    match head {
        "start" => Ok(Command::Start),
        "stop" => Ok(Command::Stop),
        "status" => Ok(Command::Status),
        "log" => Ok(Command::Log),
        "last" => Ok(Command::Last),
        "drop" => Ok(Command::Drop),
        "use" => rest
            .parse::<usize>()
            .map(Command::Use)
            .map_err(|_| "usage: use <index>".to_string()),
        "locator" => argument()
            .map(Command::Locator)
            .ok_or_else(|| "usage: locator <xpath>".to_string()),
        "check-equals" => Ok(Command::CheckEquals(argument())),
        "check-contains" => Ok(Command::CheckContains(argument())),
        "export" => argument()
            .map(|path| Command::Export(PathBuf::from(path)))
            .ok_or_else(|| "usage: export <path>".to_string()),
        "help" => Ok(Command::Help),
        other => Err(format!("unknown command '{other}', try 'help'")),
    }
}

async fn dispatch(handle: &RecorderHandle, command: Command) -> Result<String, String> {
    match command {
        Command::Start => Ok(if handle.start().await {
            "Recording started.".to_string()
        } else {
            "Already recording.".to_string()
        }),
        Command::Stop => match handle.stop().await {
            Some(log) => Ok(format!(
                "Recording stopped, {} action(s) captured.",
                log.len()
            )),
            None => Ok("Not recording.".to_string()),
        },
        Command::Status => {
            let context = handle.ui_context().await;
            let count = handle.log_snapshot().await.len();
            Ok(format!(
                "recording: {} | actions: {}",
                if context.recording { "yes" } else { "no" },
                count
            ))
        }
        Command::Log => {
            let log = handle.log_snapshot().await;
            if log.is_empty() {
                return Ok("Log is empty.".to_string());
            }
            serde_json::to_string_pretty(&log).map_err(|err| err.to_string())
        }
        Command::Last => {
            let context = handle.ui_context().await;
            match context.last {
                None => Ok("Log is empty.".to_string()),
                Some(last) => {
                    let mut out = last.kind;
                    for (index, locator) in last.locators.iter().enumerate() {
                        let marker = if index == 0 { " (primary)" } else { "" };
                        out.push_str(&format!("\n  [{index}] {locator}{marker}"));
                    }
                    Ok(out)
                }
            }
        }
        Command::Drop => match handle.remove_last().await.map_err(|err| err.to_string())? {
            Some(action) => Ok(format!("Removed {}.", action.kind())),
            None => Ok("Log is empty.".to_string()),
        },
        Command::Use(index) => {
            if handle.promote(index).await.map_err(|err| err.to_string())? {
                Ok(format!("Candidate [{index}] is now primary."))
            } else {
                Ok("Nothing changed.".to_string())
            }
        }
        Command::Locator(value) => {
            if handle
                .replace_primary(value)
                .await
                .map_err(|err| err.to_string())?
            {
                Ok("Primary locator replaced.".to_string())
            } else {
                Ok("Nothing to edit.".to_string())
            }
        }
        Command::CheckEquals(content) => {
            handle
                .add_success_condition(SuccessKind::Equals, content)
                .await
                .map_err(|err| err.to_string())?;
            Ok("Success condition appended.".to_string())
        }
        Command::CheckContains(content) => {
            handle
                .add_success_condition(SuccessKind::Contains, content)
                .await
                .map_err(|err| err.to_string())?;
            Ok("Success condition appended.".to_string())
        }
        Command::Export(path) => {
            let log = handle.log_snapshot().await;
            export_log(&path, &log)
                .await
                .map_err(|err| err.to_string())?;
            Ok(format!(
                "{} action(s) exported to {}",
                log.len(),
                path.display()
            ))
        }
        Command::Help => Ok(HELP.to_string()),
    }
}

async fn execute(handle: &RecorderHandle, line: &str) -> Result<String, String> {
    let command = parse(line)?;
    dispatch(handle, command).await
}

/// Interactive console. Prompts on stdout, reads stdin line by line, exits on
/// EOF or an exit command.
pub async fn run(handle: RecorderHandle) -> anyhow::Result<()> {
    let stdin = tokio::io::stdin();
    let mut reader = BufReader::new(stdin).lines();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let Some(input) = reader.next_line().await? else {
            break;
        };
        let line = input.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }
        match execute(&handle, line).await {
            Ok(output) => println!("{output}"),
            Err(err) => println!("Error: {err}"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_common::action::{ActionDetail, LocatorSet, Notification, Selection};
    use weft_common::config::RecorderConfig;

    fn handle() -> RecorderHandle {
        RecorderHandle::new(&RecorderConfig::default(), None)
    }

    fn locators(values: &[&str]) -> LocatorSet {
        LocatorSet::new(values.iter().map(|s| s.to_string()).collect())
    }

    async fn record_click(handle: &RecorderHandle, candidates: &[&str]) {
        handle
            .notify(Notification::new(
                ActionDetail::Click {
                    xpath: locators(candidates),
                    link: None,
                },
                None,
            ))
            .await;
    }

    #[test]
    fn parse_covers_every_command() {
        assert_eq!(parse("start"), Ok(Command::Start));
        assert_eq!(parse("stop"), Ok(Command::Stop));
        assert_eq!(parse("status"), Ok(Command::Status));
        assert_eq!(parse("log"), Ok(Command::Log));
        assert_eq!(parse("last"), Ok(Command::Last));
        assert_eq!(parse("drop"), Ok(Command::Drop));
        assert_eq!(parse("use 2"), Ok(Command::Use(2)));
        assert_eq!(
            parse("locator //div[@id='x']/a"),
            Ok(Command::Locator("//div[@id='x']/a".to_string()))
        );
        assert_eq!(parse("check-equals"), Ok(Command::CheckEquals(None)));
        assert_eq!(
            parse("check-contains all done"),
            Ok(Command::CheckContains(Some("all done".to_string())))
        );
        assert_eq!(
            parse("export /tmp/log.json"),
            Ok(Command::Export(PathBuf::from("/tmp/log.json")))
        );
        assert_eq!(parse("help"), Ok(Command::Help));
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!(parse("record").is_err());
        assert!(parse("use").is_err());
        assert!(parse("use two").is_err());
        assert!(parse("locator").is_err());
        assert!(parse("export").is_err());
    }

    #[tokio::test]
    async fn session_lifecycle_over_the_console() {
        let handle = handle();
        assert_eq!(
            execute(&handle, "status").await.unwrap(),
            "recording: no | actions: 0"
        );
        assert_eq!(execute(&handle, "stop").await.unwrap(), "Not recording.");
        assert_eq!(
            execute(&handle, "start").await.unwrap(),
            "Recording started."
        );
        assert_eq!(
            execute(&handle, "start").await.unwrap(),
            "Already recording."
        );

        record_click(&handle, &["//button[@id='go']"]).await;
        assert_eq!(
            execute(&handle, "status").await.unwrap(),
            "recording: yes | actions: 1"
        );
        assert_eq!(
            execute(&handle, "stop").await.unwrap(),
            "Recording stopped, 1 action(s) captured."
        );
    }

    #[tokio::test]
    async fn last_lists_candidates_and_use_promotes() {
        let handle = handle();
        handle.start().await;
        record_click(&handle, &["//button[@id='go']", "/html/body/button"]).await;

        let listing = execute(&handle, "last").await.unwrap();
        assert!(listing.starts_with("CLICK"));
        assert!(listing.contains("[0] //button[@id='go'] (primary)"));
        assert!(listing.contains("[1] /html/body/button"));

        assert_eq!(
            execute(&handle, "use 1").await.unwrap(),
            "Candidate [1] is now primary."
        );
        assert_eq!(execute(&handle, "use 7").await.unwrap(), "Nothing changed.");

        assert_eq!(
            execute(&handle, "locator //main/button").await.unwrap(),
            "Primary locator replaced."
        );
        let listing = execute(&handle, "last").await.unwrap();
        assert!(listing.contains("[0] //main/button (primary)"));
    }

    #[tokio::test]
    async fn edits_off_session_report_errors() {
        let handle = handle();
        let err = execute(&handle, "drop").await.unwrap_err();
        assert_eq!(err, "no recording in progress");
        let err = execute(&handle, "check-equals done").await.unwrap_err();
        assert_eq!(err, "no recording in progress");
    }

    #[tokio::test]
    async fn success_condition_round_trip() {
        let handle = handle();
        handle.start().await;
        record_click(&handle, &["//button[@id='go']"]).await;
        handle
            .set_selection(Selection {
                locators: locators(&["//p[@id='status']"]),
                content: "saved".to_string(),
            })
            .await;
        assert_eq!(
            execute(&handle, "check-contains").await.unwrap(),
            "Success condition appended."
        );
        let log = handle.log_snapshot().await;
        assert_eq!(log.last().unwrap().kind().name(), "SUCCESS_CONDITION_CONTAINS");

        // the tail already closes the log
        handle
            .set_selection(Selection {
                locators: locators(&["//p[@id='status']"]),
                content: "saved".to_string(),
            })
            .await;
        let err = execute(&handle, "check-equals").await.unwrap_err();
        assert_eq!(err, "a success condition already closes the log");
    }

    #[tokio::test]
    async fn export_writes_the_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.json");
        let handle = handle();
        handle.start().await;
        record_click(&handle, &["//button[@id='go']"]).await;

        let output = execute(&handle, &format!("export {}", path.display()))
            .await
            .unwrap();
        assert!(output.starts_with("1 action(s) exported to"));
        assert!(path.exists());
    }
}
