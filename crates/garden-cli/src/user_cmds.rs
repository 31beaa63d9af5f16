//! Operator CLI handlers for `garden user` subcommands.
//!
//! - `garden user add <username> --role <role> --password <pw>`
//! - `garden user list`

use anyhow::{Context, Result, bail};
use sqlx::PgPool;

use garden_core::password::hash_password;
use garden_db::models::{Role, User};
use garden_db::queries::users;

use crate::UserCommands;

pub async fn run_user_command(command: UserCommands, pool: &PgPool) -> Result<()> {
    match command {
        UserCommands::Add {
            username,
            role,
            password,
        } => {
            let user = add_user(pool, &username, &role, &password).await?;
            println!("User created:");
            println!("  ID:   {}", user.id);
            println!("  Name: {}", user.username);
            println!("  Role: {}", user.role);
            Ok(())
        }
        UserCommands::List => cmd_list(pool).await,
    }
}

async fn add_user(pool: &PgPool, username: &str, role: &str, password: &str) -> Result<User> {
    let role: Role = role.parse().map_err(|_| {
        anyhow::anyhow!("invalid role {role:?}; expected one of: shelter, admin")
    })?;
    let username = username.trim();
    if username.is_empty() {
        bail!("username must not be empty");
    }
    if password.is_empty() {
        bail!("password must not be empty");
    }

    users::insert_user(pool, username, &hash_password(password), role)
        .await
        .with_context(|| format!("failed to add user {username:?} (is the name already taken?)"))
}

async fn cmd_list(pool: &PgPool) -> Result<()> {
    let all = users::list_users(pool).await?;
    if all.is_empty() {
        println!("No users found. Use `garden user add` to create one.");
        return Ok(());
    }

    let name_w = all.iter().map(|u| u.username.len()).max().unwrap_or(4).max(4);
    println!("{:<38} {:<name_w$} {:<8} CREATED", "ID", "NAME", "ROLE");
    println!("{}", "-".repeat(38 + name_w + 30));
    for user in &all {
        println!(
            "{:<38} {:<name_w$} {:<8} {}",
            user.id,
            user.username,
            user.role.to_string(),
            user.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}
