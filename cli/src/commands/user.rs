use anyhow::Result;
use tabled::{Table, Tabled, settings::Style};

use chores_core::models::{NewUser, User, UserFilter};
use chores_core::{ChoreService, Error};

use super::helpers::{exit_not_found, truncate, yes_no};

#[derive(Tabled)]
struct UserRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Admin")]
    admin: &'static str,
    #[tabled(rename = "Active")]
    active: &'static str,
}

impl From<&User> for UserRow {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            name: truncate(&u.name, 30),
            email: u.email.clone().unwrap_or_default(),
            admin: yes_no(u.is_admin),
            active: yes_no(u.is_active),
        }
    }
}

pub(crate) fn cmd_user_add(
    svc: &ChoreService,
    name: String,
    email: Option<String>,
    is_admin: bool,
    json: bool,
) -> Result<()> {
    let user = svc.create_user(&NewUser {
        name,
        email,
        is_admin,
        is_active: true,
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&user)?);
    } else {
        let role = if user.is_admin { " (admin)" } else { "" };
        println!("Added {}{role} with id {}", user.name, user.id);
    }
    Ok(())
}

pub(crate) fn cmd_user_list(svc: &ChoreService, all: bool, json: bool) -> Result<()> {
    let users = svc.list_users(&UserFilter {
        is_active: if all { None } else { Some(true) },
        ..UserFilter::default()
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&users)?);
        return Ok(());
    }
    if users.is_empty() {
        println!("No users yet. Add one with: chores user add <name>");
        return Ok(());
    }
    let rows: Vec<UserRow> = users.iter().map(UserRow::from).collect();
    println!("{}", Table::new(&rows).with(Style::rounded()));
    Ok(())
}

pub(crate) fn cmd_user_remove(svc: &ChoreService, id: i64, json: bool) -> Result<()> {
    match svc.delete_user(id) {
        Ok(()) => {}
        Err(e @ Error::NotFound { .. }) => exit_not_found(&e.to_string(), json),
        Err(e) => return Err(e.into()),
    }

    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Removed user {id}");
    }
    Ok(())
}
