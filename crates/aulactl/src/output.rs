//! Output formatting - plain ASCII terminal output with color accents

use aula_common::progress::LevelStatus;
use aula_common::ranking::RankingEntry;
use aula_common::sync::LevelCommit;
use aula_common::User;
use owo_colors::OwoColorize;

pub const SEPARATOR: &str = "----------------------------------------";

/// Section header
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", SEPARATOR.dimmed());
}

pub fn success(message: &str) {
    println!("{} {}", "[OK]".bright_green(), message);
}

pub fn warning(message: &str) {
    println!("{} {}", "[WARN]".yellow(), message);
}

/// "***" style stars, unearned ones dimmed
pub fn stars(count: u8) -> String {
    let earned = "*".repeat(count as usize);
    let missing = ".".repeat(3usize.saturating_sub(count as usize));
    format!("{}{}", earned.bright_yellow(), missing.dimmed())
}

pub fn profile(user: &User) {
    header(&format!("{} ({})", user.name, user.registration_number));
    print_kv("experience", &user.xp().to_string());
    print_kv("lessons done", &user.completed_lessons.len().to_string());
    print_kv(
        "color",
        if user.color.is_empty() { "-" } else { &user.color },
    );
    print_kv(
        "ranking",
        if user.is_visible_in_ranking() { "visible" } else { "hidden" },
    );
}

pub fn print_kv(key: &str, value: &str) {
    println!("  {:<14} {}", key.dimmed(), value);
}

pub fn ranking(entries: &[RankingEntry]) {
    header("Ranking");
    if entries.is_empty() {
        println!("  nobody ranked yet");
        return;
    }
    for entry in entries {
        let position = format!("{:>3}.", entry.position);
        let position = if entry.position == 1 {
            position.bright_yellow().to_string()
        } else {
            position
        };
        println!("  {} {:<24} {:>6} xp", position, entry.name, entry.total_xp);
    }
}

pub fn level_map(subject: &str, levels: &[LevelStatus]) {
    header(&format!("Levels - {}", subject));
    if levels.is_empty() {
        println!("  no exercises yet");
        return;
    }
    for status in levels {
        let marker = if status.is_active { ">" } else { " " };
        let line = match (&status.record, status.unlocked) {
            (Some(record), _) if record.is_played() => format!(
                "level {:<3} {}  best {:>3}%",
                status.level,
                stars(record.stars),
                record.score
            ),
            (_, true) => format!("level {:<3} {}  not played", status.level, stars(0)),
            (_, false) => format!("level {:<3} {}", status.level, "locked".dimmed()),
        };
        println!(" {} {}", marker.bright_cyan(), line);
    }
}

pub fn level_commit(commit: &LevelCommit) {
    header("Result");
    print_kv("score", &format!("{}%", commit.result.percentage));
    print_kv("stars", &stars(commit.result.stars));
    if commit.improved {
        print_kv("best", &format!("{}% (new best)", commit.record.score));
    } else {
        print_kv("best", &format!("{}%", commit.record.score));
    }
    print_kv("experience", &format!("+{}", commit.xp_gained));
    if commit.next_unlocked {
        println!();
        success(&format!("level {} unlocked", commit.result.level + 1));
    } else if !commit.result.passed() {
        println!();
        warning("score at least 50% to unlock the next level");
    }
}
