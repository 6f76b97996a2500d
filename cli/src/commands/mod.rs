mod admin;
mod chore;
mod completion;
mod helpers;
mod stats;
mod user;
mod week;

pub(crate) use admin::cmd_admin_init;
pub(crate) use chore::{cmd_chore_add, cmd_chore_list, cmd_chore_remove};
pub(crate) use completion::{cmd_adhoc, cmd_done, cmd_undo};
pub(crate) use stats::cmd_stats;
pub(crate) use user::{cmd_user_add, cmd_user_list, cmd_user_remove};
pub(crate) use week::cmd_week;
