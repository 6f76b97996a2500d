use anyhow::Result;
use tabled::{Table, Tabled, settings::Style};

use chores_core::models::{Chore, ChoreFilter, Frequency, NewChore};
use chores_core::week::parse_weekday;
use chores_core::{ChoreService, Error};

use super::helpers::{exit_not_found, format_days, truncate, yes_no};

#[derive(Tabled)]
struct ChoreRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Frequency")]
    frequency: String,
    #[tabled(rename = "Days")]
    days: String,
    #[tabled(rename = "Assigned")]
    assigned: String,
    #[tabled(rename = "Active")]
    active: &'static str,
}

impl From<&Chore> for ChoreRow {
    fn from(c: &Chore) -> Self {
        let frequency = if c.is_adhoc {
            "one-off".to_string()
        } else {
            c.frequency.to_string()
        };
        Self {
            id: c.id,
            name: truncate(&c.name, 30),
            frequency,
            days: if c.is_adhoc { String::new() } else { format_days(c) },
            assigned: c.assigned_user_name.clone().unwrap_or_default(),
            active: yes_no(c.is_active),
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_chore_add(
    svc: &ChoreService,
    name: String,
    frequency: &str,
    day: Option<&str>,
    day2: Option<&str>,
    assigned_user_id: Option<i64>,
    description: Option<String>,
    json: bool,
) -> Result<()> {
    let frequency: Frequency = frequency.parse()?;
    let day_of_week = day.map(parse_weekday).transpose()?.map(i64::from);
    let day_of_week_2 = day2.map(parse_weekday).transpose()?.map(i64::from);

    let chore = svc.create_chore(&NewChore {
        name,
        description,
        frequency,
        day_of_week,
        day_of_week_2,
        assigned_user_id,
        is_active: true,
        is_adhoc: false,
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&chore)?);
    } else {
        println!(
            "Added '{}' ({}, {}) with id {}",
            chore.name,
            chore.frequency,
            format_days(&chore),
            chore.id
        );
    }
    Ok(())
}

pub(crate) fn cmd_chore_list(
    svc: &ChoreService,
    all: bool,
    assigned_user_id: Option<i64>,
    include_adhoc: bool,
    json: bool,
) -> Result<()> {
    let chores = svc.list_chores(&ChoreFilter {
        is_active: if all { None } else { Some(true) },
        assigned_user_id,
        include_adhoc,
        ..ChoreFilter::default()
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&chores)?);
        return Ok(());
    }
    if chores.is_empty() {
        println!("No chores found.");
        return Ok(());
    }
    let rows: Vec<ChoreRow> = chores.iter().map(ChoreRow::from).collect();
    println!("{}", Table::new(&rows).with(Style::rounded()));
    Ok(())
}

pub(crate) fn cmd_chore_remove(svc: &ChoreService, id: i64, json: bool) -> Result<()> {
    match svc.delete_chore(id) {
        Ok(()) => {}
        Err(e @ Error::NotFound { .. }) => exit_not_found(&e.to_string(), json),
        Err(e) => return Err(e.into()),
    }

    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Removed chore {id}");
    }
    Ok(())
}
