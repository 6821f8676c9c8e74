use anyhow::{Context, Result};
use parlequiz::celebration::{Celebration, ConfettiBurst};
use parlequiz::integration::{EngineBuilder, EngineConfig, EngineHandle};
use parlequiz::quiz::{AnswerKey, OfflineQuizClient, Question, QuestionType, TopicSelection};
use parlequiz::session::{SessionView, StatusTag};
use parlequiz::speech::ScriptedPlatform;
use std::io::{self, BufRead};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How long to wait for the engine to react to one command
const SETTLE_TIMEOUT: Duration = Duration::from_secs(2);

/// Prints confetti in place of the graphical burst
struct ConsoleCelebration;

impl Celebration for ConsoleCelebration {
    fn fire(&self, burst: &ConfettiBurst) {
        println!("{}", "*".repeat((burst.particle_count / 4).max(1) as usize));
    }
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parlequiz=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load(&path)
            .with_context(|| format!("loading configuration from {}", path))?,
        None => EngineConfig::default().with_topic(TopicSelection::new("everyday-french", Vec::new())),
    };

    info!("Starting Parlequiz ({})", config.recognizer.language);

    // Typed lines stand in for speech
    let platform = Arc::new(ScriptedPlatform::new());
    let client = Arc::new(
        OfflineQuizClient::new(sample_bank())
            .with_monthly_limit(20)
            .with_questions_per_session(5),
    );

    let (engine, handle) = EngineBuilder::new(client, platform.clone())
        .with_config(config)
        .with_celebration(Arc::new(ConsoleCelebration))
        .build()?;
    let worker = engine.start()?;

    println!("Parlequiz: answer each question by typing what you would say.");
    println!("Commands: empty line skips, /say reads the question, /retry, /reset, /quit");

    let mut view = settle(&handle, &SessionView::default());
    print_view(&view);

    for line in io::stdin().lock().lines() {
        let line = line?;
        let input = line.trim();

        match (view.status, input) {
            (_, "/quit") => break,
            (_, "/reset") => handle.reset()?,
            (_, "/say") => {
                handle.speak_prompt()?;
                continue;
            }
            (_, "/retry") => handle.retry_submit()?,
            (StatusTag::Idle | StatusTag::Results, _) => handle.start()?,
            (StatusTag::Practice, "") => handle.skip()?,
            (StatusTag::Practice, answer) => {
                platform.say(answer);
                handle.toggle_mic()?;
                let heard = handle.wait_for(SETTLE_TIMEOUT, |v| {
                    v.status == StatusTag::Practice && v.transcript == answer
                });
                if heard.is_some() {
                    handle.validate()?;
                }
            }
            _ => {}
        }

        view = settle(&handle, &view);
        print_view(&view);
    }

    handle.shutdown()?;
    worker
        .join()
        .map_err(|_| anyhow::anyhow!("engine thread panicked"))?;

    info!("Parlequiz stopped");
    Ok(())
}

/// Wait until the view differs from `before` and no request is in flight
fn settle(handle: &EngineHandle, before: &SessionView) -> SessionView {
    handle
        .wait_for(SETTLE_TIMEOUT, |v| {
            v != before && !v.status.is_busy() && v.access != "checking"
        })
        .unwrap_or_else(|| handle.view())
}

fn print_view(view: &SessionView) {
    println!();
    if let Some(message) = view.error_message() {
        println!("! {}", message);
    }

    match view.status {
        StatusTag::Idle => {
            println!("Quota: {}", view.access);
            println!("Press Enter to start a quiz.");
        }
        StatusTag::Practice | StatusTag::Recording => {
            if let (Some(index), Some(question)) = (view.index, &view.question) {
                println!("Question {}/{} ({})", index + 1, view.total, question.kind);
                println!("  {}", question.text);
                if let Some(options) = &question.options {
                    println!("  Options: {}", options.join(" / "));
                }
                if let Some(hint) = &question.hint {
                    println!("  Hint: {}", hint);
                }
            }
            if view.can_retry_submit {
                println!("All answers recorded. Type /retry to submit again.");
            }
        }
        StatusTag::Results => {
            if let Some(feedback) = &view.feedback {
                print!("{}", feedback);
            }
            println!();
            println!("Press Enter for a new quiz.");
        }
        StatusTag::Loading | StatusTag::Submitting => println!("Please wait..."),
    }
}

fn sample_bank() -> Vec<AnswerKey> {
    vec![
        AnswerKey::new(
            Question::new("fr-1", QuestionType::FillBlank, "Je ___ un croissant tous les matins.")
                .with_hint("manger"),
            "mange",
        )
        .with_tip("Present tense of manger, first person: je mange."),
        AnswerKey::new(
            Question::new("fr-2", QuestionType::Conjugation, "Conjuguez « être » avec « nous ».")
                .with_hint("présent"),
            "nous sommes",
        ),
        AnswerKey::new(
            Question::new("fr-3", QuestionType::Vocabulary, "Comment dit-on « library » en français ?"),
            "bibliothèque",
        )
        .with_tip("« Librairie » is a bookshop."),
        AnswerKey::new(
            Question::new("fr-4", QuestionType::TrueFalse, "« Chat » est un mot féminin.")
                .with_options(vec!["vrai".to_string(), "faux".to_string()]),
            "faux",
        ),
        AnswerKey::new(
            Question::new(
                "fr-5",
                QuestionType::GrammarCorrection,
                "Corrigez : « Il a allé au marché. »",
            ),
            "il est allé au marché",
        )
        .with_tip("Aller takes être in the passé composé."),
        AnswerKey::new(
            Question::new("fr-6", QuestionType::MultipleChoice, "Quel est le pluriel de « cheval » ?")
                .with_options(vec![
                    "chevals".to_string(),
                    "chevaux".to_string(),
                    "chevales".to_string(),
                ]),
            "chevaux",
        ),
    ]
}
