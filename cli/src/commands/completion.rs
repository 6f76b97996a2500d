use anyhow::Result;

use chores_core::models::{Completion, NewAdhocCompletion, NewCompletion};
use chores_core::{ChoreService, Error};

use super::helpers::{exit_not_found, parse_date};

fn describe(completion: &Completion) -> String {
    format!(
        "'{}' done by {} on {} (completion {})",
        completion.chore_name.as_deref().unwrap_or("?"),
        completion.user_name.as_deref().unwrap_or("?"),
        completion.completed_on.format("%a %b %d"),
        completion.id
    )
}

fn print_completion(completion: &Completion, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(completion)?);
    } else {
        println!("Marked {}", describe(completion));
    }
    Ok(())
}

pub(crate) fn cmd_done(
    svc: &ChoreService,
    chore_id: i64,
    user_id: i64,
    date: Option<&str>,
    notes: Option<String>,
    json: bool,
) -> Result<()> {
    let completion_date = date.map(|d| parse_date(Some(d), svc.today())).transpose()?;
    let completion = svc.mark_complete(&NewCompletion {
        chore_id,
        user_id,
        week_start: None,
        completion_date,
        notes,
    })?;
    print_completion(&completion, json)
}

pub(crate) fn cmd_undo(svc: &ChoreService, completion_id: i64, json: bool) -> Result<()> {
    let completion = match svc.get_completion(completion_id) {
        Ok(c) => c,
        Err(e @ Error::NotFound { .. }) => exit_not_found(&e.to_string(), json),
        Err(e) => return Err(e.into()),
    };
    svc.delete_completion(completion_id)?;

    if json {
        println!("{}", serde_json::json!({ "deleted": completion_id }));
    } else {
        println!("Undid {}", describe(&completion));
    }
    Ok(())
}

pub(crate) fn cmd_adhoc(
    svc: &ChoreService,
    name: String,
    user_id: i64,
    date: Option<&str>,
    description: Option<String>,
    notes: Option<String>,
    json: bool,
) -> Result<()> {
    let completion_date = date.map(|d| parse_date(Some(d), svc.today())).transpose()?;
    let completion = svc.record_adhoc(&NewAdhocCompletion {
        name,
        description,
        user_id,
        completion_date,
        week_start: None,
        notes,
    })?;
    print_completion(&completion, json)
}
