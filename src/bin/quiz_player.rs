// src/bin/quiz_player.rs

//! Terminal quiz player.
//!
//! Usage: `quiz-player [QUIZ_ID] [--code CODE] [--reset]`
//! Without a quiz ID, lists the public quizzes.

use std::{io::Write, sync::Arc, time::Duration};

use quizhub::{
    attempt::{AttemptError, clock::SystemClock, storage::FileStorage},
    client::{
        AttemptSession, HttpBackend, PlayerConfig, QuizBackend, SessionContext,
        prompt::{self, Command},
    },
    models::attempt::SubmitAttemptResponse,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Default)]
struct Args {
    quiz_id: Option<i64>,
    code: Option<String>,
    reset: bool,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args::default();
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--reset" => args.reset = true,
            "--code" => args.code = Some(iter.next().ok_or("--code needs a value")?),
            other => {
                let id = other
                    .parse::<i64>()
                    .map_err(|_| format!("Unexpected argument '{}'", other))?;
                args.quiz_id = Some(id);
            }
        }
    }
    Ok(args)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = PlayerConfig::from_env()?;
    let args = parse_args()?;

    // Logs go to a file only; stdout belongs to the player.
    let file_appender = tracing_appender::rolling::daily("logs", "player.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    let (backend, login) = HttpBackend::login(&config.base_url, &config.username, &config.password).await?;

    let Some(quiz_id) = args.quiz_id else {
        return list_quizzes(&backend).await;
    };

    let ctx = SessionContext {
        user_id: login.user_id,
        storage: Arc::new(FileStorage::new(config.state_dir.clone())),
        clock: Arc::new(SystemClock),
    };
    play(&backend, &ctx, quiz_id, args).await
}

async fn list_quizzes(backend: &HttpBackend) -> Result<(), Box<dyn std::error::Error>> {
    let quizzes = backend.list_quizzes().await?;
    if quizzes.is_empty() {
        println!("No quizzes available.");
    }
    for quiz in quizzes {
        let limit = quiz
            .time_limit_minutes
            .map(|m| format!(", {} min", m))
            .unwrap_or_default();
        println!("{:>5}  {} ({} questions{})", quiz.id, quiz.title, quiz.question_count, limit);
    }
    Ok(())
}

fn ask(text: &str) -> std::io::Result<()> {
    print!("{}", text);
    std::io::stdout().flush()
}

async fn play<B: QuizBackend>(
    backend: &B,
    ctx: &SessionContext,
    quiz_id: i64,
    args: Args,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut code = args.code;

    let mut session = loop {
        match AttemptSession::start(backend, ctx, quiz_id, code.as_deref(), args.reset).await {
            Ok(session) => break session,
            Err(AttemptError::InvalidAccessCode) => {
                println!(
                    "{}",
                    if code.is_none() { "This quiz is private." } else { "Invalid access code." }
                );
                ask("Access code (blank to cancel): ")?;
                match lines.next_line().await? {
                    Some(line) if !line.trim().is_empty() => code = Some(line.trim().to_string()),
                    _ => return Ok(()),
                }
            }
            Err(e) => return Err(e.into()),
        }
    };

    println!("{}", session.quiz().title);
    if session.is_resumed() {
        println!(
            "Resuming: {} of {} answered, {}s elapsed.",
            session.answered_count(),
            session.questions().len(),
            session.elapsed_seconds()
        );
    }
    println!("Type :h for help.");

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    let mut expiry_reported = session.is_time_expired();
    let mut confirm_finish = false;
    let mut redraw = true;

    loop {
        if redraw {
            print!(
                "{}",
                prompt::render_question(
                    session.current_index(),
                    session.questions().len(),
                    session.current_question(),
                    session.current_answer(),
                    session.remaining_seconds(),
                )
            );
            ask("> ")?;
            redraw = false;
        }

        tokio::select! {
            _ = ticker.tick() => {
                session.tick();
                if !expiry_reported && session.is_time_expired() {
                    expiry_reported = true;
                    println!("\nTime is up. You can still finish with :f.");
                    ask("> ")?;
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    // stdin closed: keep progress for later.
                    return Ok(());
                };

                let command = match prompt::parse_command(session.current_question(), &line) {
                    Ok(command) => command,
                    Err(e) => {
                        println!("{}", e);
                        ask("> ")?;
                        continue;
                    }
                };
                if command != Command::Finish {
                    confirm_finish = false;
                }

                match command {
                    Command::Next => {
                        if session.is_last() {
                            println!("This is the last question. Use :f to finish.");
                        }
                        session.advance();
                    }
                    Command::Previous => {
                        session.retreat();
                    }
                    Command::Goto(index) => {
                        session.jump_to(index);
                    }
                    Command::Help => println!("{}", prompt::HELP),
                    Command::Quit => {
                        println!("Progress saved.");
                        return Ok(());
                    }
                    Command::Abandon => {
                        session.abandon();
                        println!("Attempt discarded.");
                        return Ok(());
                    }
                    Command::Answer(input) => match session.answer(input) {
                        Ok(()) if !session.is_last() => {
                            session.advance();
                        }
                        Ok(()) => println!("Last question answered. Use :f to finish."),
                        Err(e) => println!("{}", e),
                    },
                    Command::Finish => {
                        if let Err(e) = session.ensure_complete() {
                            if !confirm_finish {
                                println!("{}. Type :f again to submit anyway.", e);
                                confirm_finish = true;
                                ask("> ")?;
                                continue;
                            }
                        }
                        match session.finish().await {
                            Ok(response) => {
                                print_result(&response);
                                return Ok(());
                            }
                            Err((e, kept)) => {
                                println!("Submission failed: {}. Your answers are kept; try :f again.", e);
                                session = kept;
                                confirm_finish = true;
                            }
                        }
                    }
                }
                redraw = true;
            }
        }
    }
}

fn print_result(response: &SubmitAttemptResponse) {
    println!(
        "\nScore: {}/100  Correct: {}/{} ({}%)  Time: {}s",
        response.score,
        response.correct_answers,
        response.total_questions,
        response.percentage,
        response.time_taken
    );
    for (i, item) in response.review.iter().enumerate() {
        let verdict = if item.correct { "correct" } else { "wrong" };
        println!(
            "{:>3}. {} (yours: {}, expected: {})",
            i + 1,
            verdict,
            item.submitted.as_deref().unwrap_or("-"),
            item.correct_answer
        );
        if let Some(explanation) = &item.explanation {
            println!("     {}", explanation);
        }
    }
}
