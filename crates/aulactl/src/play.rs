//! Interactive quiz loop
//!
//! Reads answers line by line: a number picks an option, `q` quits. Quitting or hitting
//! end of input before the last question discards the run without committing anything.

use anyhow::Result;
use aula_common::quiz::{AnswerFeedback, QuizArena};
use aula_common::sync::LevelCommit;
use aula_common::SyncController;
use owo_colors::OwoColorize;
use std::io::{BufRead, Write};

enum Input {
    Answer(usize),
    Quit,
    Invalid,
}

fn parse_answer(line: &str, options: usize) -> Input {
    let line = line.trim();
    if line.eq_ignore_ascii_case("q") {
        return Input::Quit;
    }
    match line.parse::<usize>() {
        Ok(n) if (1..=options).contains(&n) => Input::Answer(n - 1),
        _ => Input::Invalid,
    }
}

/// Read one line; `None` at end of input
fn read_line<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

/// Run one pass of the arena's session. `None` when the student quit early.
pub async fn run_quiz<R: BufRead, W: Write>(
    arena: &mut QuizArena,
    controller: &SyncController,
    input: &mut R,
    out: &mut W,
) -> Result<Option<LevelCommit>> {
    loop {
        let Some(question) = arena.session().current().cloned() else {
            return Ok(None);
        };

        writeln!(out)?;
        writeln!(
            out,
            "{} {}",
            format!(
                "[{}/{}]",
                arena.session().index() + 1,
                arena.session().total()
            )
            .dimmed(),
            question.prompt().bold()
        )?;
        for (i, option) in question.options().iter().enumerate() {
            writeln!(out, "  {}. {}", i + 1, option)?;
        }

        let choice = loop {
            write!(out, "answer (1-{}, q to quit): ", question.options().len())?;
            out.flush()?;
            let Some(line) = read_line(input)? else {
                return Ok(None);
            };
            match parse_answer(&line, question.options().len()) {
                Input::Answer(choice) => break choice,
                Input::Quit => return Ok(None),
                Input::Invalid => writeln!(out, "{}", "not an option".yellow())?,
            }
        };

        match arena.submit_answer(choice) {
            AnswerFeedback::Correct => writeln!(out, "{}", "correct".bright_green())?,
            AnswerFeedback::Incorrect { correct_option } => writeln!(
                out,
                "{} the answer was {}",
                "wrong:".bright_red(),
                question
                    .options()
                    .get(correct_option)
                    .map(String::as_str)
                    .unwrap_or("?")
            )?,
            AnswerFeedback::Ignored => {}
        }
        out.flush()?;

        if let Some(commit) = arena.reveal_then_advance(controller).await {
            return Ok(Some(commit));
        }
    }
}

/// Ask whether to go again; anything but y/yes (or end of input) means no
pub fn ask_replay<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> Result<bool> {
    write!(out, "play again? [y/N] ")?;
    out.flush()?;
    Ok(read_line(input)?
        .map(|line| matches!(line.trim().to_lowercase().as_str(), "y" | "yes"))
        .unwrap_or(false))
}
