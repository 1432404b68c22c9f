//! Twenty questions against a tiny animal knowledge base.
//!
//! Answer with `y`, `n` or `s` (skip). Set `PROBQA_KB` to a file path to keep
//! what the engine learns between runs. A `probqa.toml` with a matching
//! `knowledge_base` is used when `PROBQA_KB` is not set.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use probqa_core::config::load_config;
use probqa_core::{
    create_engine, load_engine, open_engine, AnsweredQuestion, EngineDefinition, PqaEngine,
    PqaError, TPqaId,
};

const QUESTIONS: [&str; 5] = [
    "Can it fly?",
    "Does it live in water?",
    "Is it a mammal?",
    "Is it bigger than a human?",
    "Is it kept as a pet?",
];

const ANIMALS: [(&str, [TPqaId; 5]); 6] = [
    ("eagle", [0, 1, 1, 1, 1]),
    ("shark", [1, 0, 1, 0, 1]),
    ("dolphin", [1, 0, 0, 0, 1]),
    ("dog", [1, 1, 0, 1, 0]),
    ("elephant", [1, 1, 0, 0, 1]),
    ("goldfish", [1, 0, 1, 1, 0]),
];

const YES: TPqaId = 0;
const NO: TPqaId = 1;

fn seeded_engine() -> Result<PqaEngine> {
    let def = EngineDefinition::new(2, QUESTIONS.len() as TPqaId, ANIMALS.len() as TPqaId);
    let engine = create_engine(&def)?;
    for (target, (_, answers)) in ANIMALS.iter().enumerate() {
        let aqs: Vec<AnsweredQuestion> = answers
            .iter()
            .enumerate()
            .map(|(q, &a)| AnsweredQuestion::new(q as TPqaId, a))
            .collect();
        engine.train(aqs.len() as TPqaId, &aqs, target as TPqaId, 10.0)?;
    }
    Ok(engine)
}

fn prompt(stdin: &mut impl BufRead, text: &str) -> Result<String> {
    print!("{text} ");
    io::stdout().flush()?;
    let mut line = String::new();
    stdin.read_line(&mut line).context("failed to read answer")?;
    Ok(line.trim().to_lowercase())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("probqa_core=info".parse()?),
        )
        .init();

    let config = load_config()?;
    let kb_path = std::env::var("PROBQA_KB")
        .ok()
        .map(PathBuf::from)
        .or_else(|| config.as_ref().and_then(|c| c.knowledge_base_path()));
    let engine = match (&kb_path, &config) {
        (Some(path), _) if path.exists() => load_engine(path, 16)?,
        (None, Some(config)) => open_engine(config)?,
        _ => seeded_engine()?,
    };
    let dims = engine.dims()?;
    if dims.n_questions != QUESTIONS.len() as TPqaId || dims.n_targets != ANIMALS.len() as TPqaId {
        anyhow::bail!(
            "knowledge base has {} questions and {} targets, expected {} and {}",
            dims.n_questions,
            dims.n_targets,
            QUESTIONS.len(),
            ANIMALS.len()
        );
    }

    println!("Think of one of these animals:");
    for (name, _) in &ANIMALS {
        println!("  - {name}");
    }

    let mut stdin = io::stdin().lock();
    let quiz = engine.start_quiz()?;
    loop {
        let question = match engine.next_question(quiz) {
            Ok(q) => q,
            Err(PqaError::QuestionsExhausted(_)) => break,
            Err(e) => return Err(e.into()),
        };
        let top = engine.list_top_targets(quiz, 1)?;
        if top.first().is_some_and(|t| t.probability > 0.9) {
            break;
        }
        match prompt(&mut stdin, QUESTIONS[question as usize])?.as_str() {
            "y" | "yes" => engine.record_answer(quiz, YES)?,
            "n" | "no" => engine.record_answer(quiz, NO)?,
            _ => continue,
        }
    }

    let top = engine.list_top_targets(quiz, 3)?;
    let Some(best) = top.first() else {
        println!("I have no idea.");
        return Ok(());
    };
    let name = ANIMALS[best.target as usize].0;
    println!("Is it a {name}? ({:.0}% sure)", best.probability * 100.0);
    if matches!(prompt(&mut stdin, "[y/n]")?.as_str(), "y" | "yes") {
        engine.record_quiz_target(quiz, best.target, 1.0)?;
        println!("Learned from this game.");
    } else {
        for runner_up in &top[1..] {
            println!(
                "  maybe a {} ({:.0}%)",
                ANIMALS[runner_up.target as usize].0,
                runner_up.probability * 100.0
            );
        }
    }
    engine.release_quiz(quiz)?;

    if let Some(path) = kb_path {
        engine.shutdown(Some(&path))?;
        println!("Knowledge base saved to {}", path.display());
    }
    Ok(())
}
