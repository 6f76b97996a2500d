use anyhow::Result;

use chores_core::ChoreService;

use crate::config::Config;

pub(crate) fn cmd_admin_init(svc: &ChoreService, config: &Config, json: bool) -> Result<()> {
    let (admin, created) = svc.ensure_admin(&config.admin_name, config.admin_email.as_deref())?;

    if json {
        println!(
            "{}",
            serde_json::json!({ "created": created, "user": admin })
        );
    } else if created {
        println!("Admin '{}' ready with id {}", admin.name, admin.id);
    } else {
        println!(
            "An admin already exists: '{}' (id {})",
            admin.name, admin.id
        );
    }
    Ok(())
}
