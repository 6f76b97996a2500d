use anyhow::Result;
use tabled::{Table, Tabled, settings::Style};

use chores_core::ChoreService;
use chores_core::models::{DayInstance, Frequency, WeekGrid};
use chores_core::week::week_start;

use super::helpers::{parse_date, truncate};

#[derive(Tabled)]
struct GridRow {
    #[tabled(rename = "Day")]
    day: String,
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Chore")]
    chore: String,
    #[tabled(rename = "Assigned")]
    assigned: String,
    #[tabled(rename = "Status")]
    status: String,
}

fn status(instance: &DayInstance) -> String {
    match &instance.completion {
        Some(c) => match &c.completed_by_name {
            Some(name) => format!("done by {name} (#{})", c.completion_id),
            None => format!("done (#{})", c.completion_id),
        },
        None => "-".to_string(),
    }
}

fn grid_rows(grid: &WeekGrid) -> Vec<GridRow> {
    let mut rows = Vec::new();
    for bucket in &grid.days {
        for (i, instance) in bucket.instances.iter().enumerate() {
            rows.push(GridRow {
                day: if i == 0 {
                    format!("{} {}", bucket.name, bucket.date.format("%m/%d"))
                } else {
                    String::new()
                },
                id: instance.chore.id,
                chore: truncate(&instance.chore.name, 30),
                assigned: instance
                    .chore
                    .assigned_user_name
                    .clone()
                    .unwrap_or_default(),
                status: status(instance),
            });
        }
    }
    rows
}

pub(crate) fn cmd_week(
    svc: &ChoreService,
    week: Option<&str>,
    user_id: Option<i64>,
    frequency: Option<&str>,
    viewer_id: Option<i64>,
    json: bool,
) -> Result<()> {
    let monday = week_start(parse_date(week, svc.today())?);
    let frequency = frequency.map(str::parse::<Frequency>).transpose()?;
    let grid = svc.week_grid(monday, user_id, frequency, viewer_id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&grid)?);
        return Ok(());
    }

    println!("Week of {}", grid.label);
    let rows = grid_rows(&grid);
    if rows.is_empty() {
        println!("No chores this week.");
        return Ok(());
    }
    println!("{}", Table::new(&rows).with(Style::rounded()));

    println!("{} of {} done", grid.completed_chores, grid.total_chores);
    Ok(())
}
