//! Command handlers for aulactl.

use crate::cli::{AdminCommands, Visibility};
use crate::output::{self, print_kv};
use crate::play;
use crate::portal::Portal;
use anyhow::{bail, Context, Result};
use aula_common::blob::BlobStore;
use aula_common::progress::{level_overview, resolve_active_level};
use aula_common::ranking::load_ranking;
use aula_common::store::collections;
use aula_common::{CatalogSeed, QuizArena, User};
use owo_colors::OwoColorize;
use std::io;
use tracing::info;

/// Handle login: look the student up and show their profile
pub async fn login(portal: &Portal, user: Option<&str>) -> Result<()> {
    let controller = portal.sign_in(user).await?;
    output::profile(&controller.user());
    Ok(())
}

pub async fn subjects(portal: &Portal) -> Result<()> {
    let subjects = portal.catalog.subjects().await?;
    output::header("Subjects");
    if subjects.is_empty() {
        println!("  no subjects yet");
    }
    for subject in subjects {
        let levels = portal.catalog.levels(&subject.id).await?;
        println!(
            "  {:<14} {:<24} {} levels",
            subject.id.cyan(),
            subject.name,
            levels.len()
        );
        if !subject.description.is_empty() {
            println!("  {:<14} {}", "", subject.description.dimmed());
        }
    }
    Ok(())
}

/// List lessons. With `--user`, completed ones are ticked.
pub async fn lessons(
    portal: &Portal,
    user: Option<&str>,
    subject: Option<String>,
    search: Option<String>,
) -> Result<()> {
    let mut lessons = match &search {
        Some(query) => portal.catalog.search_lessons(query).await?,
        None => portal.catalog.lessons(None).await?,
    };
    if let Some(subject) = &subject {
        lessons.retain(|l| &l.subject_id == subject);
    }

    let student = match user {
        Some(_) => Some(portal.sign_in(user).await?.user()),
        None => None,
    };

    output::header("Lessons");
    if lessons.is_empty() {
        println!("  no lessons found");
    }
    for lesson in lessons {
        let tick = match &student {
            Some(s) if s.has_completed(&lesson.id) => "[x]".bright_green().to_string(),
            Some(_) => "[ ]".to_string(),
            None => String::new(),
        };
        println!("  {} {:<12} {}", tick, lesson.id.cyan(), lesson.title);
        if !lesson.summary.is_empty() {
            println!("      {}", lesson.summary.dimmed());
        }
        if let Some(path) = &lesson.material_path {
            match portal.blobs.resolve_url(path).await? {
                Some(url) => println!("      {}", url.underline()),
                None => println!("      {}", format!("material missing: {}", path).yellow()),
            }
        }
    }
    Ok(())
}

/// Toggle a lesson's completion for the signed-in student
pub async fn complete(portal: &Portal, user: Option<&str>, lesson_id: &str) -> Result<()> {
    let controller = portal.sign_in(user).await?;
    let Some(lesson) = portal.catalog.lesson(lesson_id).await? else {
        bail!("no lesson with id {}", lesson_id);
    };

    let done = controller.toggle_lesson(&lesson.id);
    if done {
        output::success(&format!("completed {}", lesson.title));
    } else {
        output::success(&format!("{} marked as not completed", lesson.title));
    }
    report_sync(portal.settle(&controller).await);
    Ok(())
}

pub async fn rename(portal: &Portal, user: Option<&str>, name: &str) -> Result<()> {
    let controller = portal.sign_in(user).await?;
    controller.rename(name)?;
    output::success(&format!("name changed to {}", controller.user().name));
    report_sync(portal.settle(&controller).await);
    Ok(())
}

pub async fn color(portal: &Portal, user: Option<&str>, tag: &str) -> Result<()> {
    let controller = portal.sign_in(user).await?;
    controller.set_color(tag)?;
    output::success(&format!("color set to {}", controller.user().color));
    report_sync(portal.settle(&controller).await);
    Ok(())
}

pub async fn visibility(portal: &Portal, user: Option<&str>, state: Visibility) -> Result<()> {
    let controller = portal.sign_in(user).await?;
    controller.set_rank_visibility(state.is_visible());
    if state.is_visible() {
        output::success("you now appear in the ranking");
    } else {
        output::success("you are hidden from the ranking");
    }
    report_sync(portal.settle(&controller).await);
    Ok(())
}

pub async fn ranking(portal: &Portal, limit: Option<usize>) -> Result<()> {
    let entries = load_ranking(portal.store.as_ref(), limit).await?;
    output::ranking(&entries);
    Ok(())
}

pub async fn levels(portal: &Portal, user: Option<&str>, subject: &str) -> Result<()> {
    let controller = portal.sign_in(user).await?;
    let levels = portal.catalog.levels(subject).await?;
    let overview = level_overview(&levels, &controller.user().exercise_progress, subject);
    output::level_map(subject, &overview);
    Ok(())
}

/// Play a level interactively on stdin/stdout
pub async fn play(
    portal: &Portal,
    user: Option<&str>,
    subject: &str,
    level: Option<u32>,
) -> Result<()> {
    let controller = portal.sign_in(user).await?;
    let level = match level {
        Some(level) => level,
        None => {
            let levels = portal.catalog.levels(subject).await?;
            if levels.is_empty() {
                bail!("subject {} has no exercises", subject);
            }
            resolve_active_level(&levels, &controller.user().exercise_progress, subject)
        }
    };

    let quiz = &portal.config.quiz;
    let mut arena = QuizArena::enter(
        &portal.catalog,
        &controller,
        subject,
        level,
        quiz.effective_questions(),
        quiz.reveal_delay(),
    )
    .await
    .with_context(|| format!("cannot play {} level {}", subject, level))?;

    output::header(&format!("{} - level {}", subject, level));
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stdout();

    loop {
        match play::run_quiz(&mut arena, &controller, &mut input, &mut out).await? {
            Some(commit) => output::level_commit(&commit),
            None => {
                println!();
                output::warning("quiz abandoned, nothing recorded");
                break;
            }
        }
        if !play::ask_replay(&mut input, &mut out)? {
            break;
        }
        arena.restart();
    }

    report_sync(portal.settle(&controller).await);
    Ok(())
}

pub async fn library(portal: &Portal, subject: Option<String>) -> Result<()> {
    let books = portal.catalog.books(subject.as_deref()).await?;
    output::header("Library");
    if books.is_empty() {
        println!("  no books found");
    }
    for book in books {
        let author = if book.author.is_empty() {
            String::new()
        } else {
            format!(" - {}", book.author)
        };
        println!("  {}{}", book.title.bold(), author.dimmed());
        match portal.blobs.resolve_url(&book.file_path).await? {
            Some(url) => println!("      {}", url.underline()),
            None => println!("      {}", format!("file missing: {}", book.file_path).yellow()),
        }
    }
    Ok(())
}

pub async fn admin(portal: &Portal, action: AdminCommands) -> Result<()> {
    match action {
        AdminCommands::Seed { file } => {
            let content = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let mut seed: CatalogSeed = serde_json::from_str(&content)
                .with_context(|| format!("parsing {}", file.display()))?;
            let generated = seed.assign_missing_ids();
            let count = portal.catalog.import(&seed).await?;
            output::success(&format!("imported {} entries", count));
            if generated > 0 {
                print_kv("new ids", &generated.to_string());
            }
        }
        AdminCommands::AddUser { registration, name } => {
            if portal.users.find(&registration).await?.is_some() {
                bail!("registration number {} is already taken", registration);
            }
            portal.users.register(&User::new(registration.trim(), name.trim())).await?;
            output::success(&format!("registered {}", registration.trim()));
        }
        AdminCommands::Remove { collection, id } => {
            if !collections::ALL.contains(&collection.as_str()) {
                bail!(
                    "unknown collection {} (expected one of: {})",
                    collection,
                    collections::ALL.join(", ")
                );
            }
            if collection == collections::USERS {
                portal.users.remove(&id).await?;
                info!("removed user {}", id);
            } else {
                portal.catalog.remove(&collection, &id).await?;
            }
            output::success(&format!("removed {}/{}", collection, id));
        }
        AdminCommands::Upload { file, dest } => {
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let stored = portal.blobs.upload(&dest, bytes).await?;
            output::success(&format!("stored {} ({} bytes)", stored.path, stored.size));
            print_kv("url", &stored.url);
        }
    }
    Ok(())
}

fn report_sync(failed: usize) {
    if failed > 0 {
        output::warning(&format!(
            "{} change(s) kept locally but not saved to the portal; try again later",
            failed
        ));
    }
}
