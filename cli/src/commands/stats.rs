use anyhow::Result;
use tabled::{Table, Tabled, settings::Style};

use chores_core::ChoreService;
use chores_core::models::{CompletionStats, UserCount};

use super::helpers::truncate;

#[derive(Tabled)]
struct TopUserRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Done")]
    count: i64,
}

#[derive(Tabled)]
struct RecentRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Chore")]
    chore: String,
    #[tabled(rename = "By")]
    by: String,
}

fn top_user_rows(users: &[UserCount]) -> Vec<TopUserRow> {
    users
        .iter()
        .enumerate()
        .map(|(i, u)| TopUserRow {
            rank: i + 1,
            name: truncate(&u.name, 30),
            count: u.count,
        })
        .collect()
}

fn print_stats(stats: &CompletionStats) {
    println!("Completions:      {}", stats.total_completions);
    println!("This week:        {}", stats.completions_this_week);
    println!("Active chores:    {}", stats.active_chores);
    println!("Completion rate:  {:.1}%", stats.completion_rate);

    if !stats.top_users.is_empty() {
        println!("\nTop helpers");
        println!(
            "{}",
            Table::new(top_user_rows(&stats.top_users)).with(Style::rounded())
        );
    }

    if !stats.recent_completions.is_empty() {
        let rows: Vec<RecentRow> = stats
            .recent_completions
            .iter()
            .map(|c| RecentRow {
                id: c.id,
                date: c.completed_on.format("%a %Y-%m-%d").to_string(),
                chore: truncate(c.chore_name.as_deref().unwrap_or(""), 30),
                by: c.user_name.clone().unwrap_or_default(),
            })
            .collect();
        println!("\nRecent");
        println!("{}", Table::new(&rows).with(Style::rounded()));
    }
}

pub(crate) fn cmd_stats(svc: &ChoreService, user_id: Option<i64>, json: bool) -> Result<()> {
    let stats = svc.completion_stats(user_id)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print_stats(&stats);
    }
    Ok(())
}
