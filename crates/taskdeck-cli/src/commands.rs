//! Command handlers. Each one runs against a session whose stored
//! credential has already been checked.

use std::io::{self, BufRead, Write};

use anyhow::{anyhow, bail, Context, Result};
use chrono::Local;
use taskdeck_core::models::task::parse_due;
use taskdeck_core::tasks::{group_by_day, tasks_on, upcoming, MonthView, UPCOMING_LIMIT};
use taskdeck_core::{
    Config, NewTask, SessionController, SessionStatus, TaskCollection, TaskFilter, TaskId,
    TaskUpdate,
};
use tracing::{debug, warn};

use crate::format;

pub struct App {
    pub config: Config,
    pub session: SessionController,
}

impl App {
    pub fn new(config: Config, session: SessionController) -> Self {
        Self { config, session }
    }

    // ===== Session =====

    pub async fn login(&mut self, email: Option<String>) -> Result<()> {
        let email = self.resolve_email(email)?;
        let password = rpassword::prompt_password("Password: ")?;

        let user = self.session.login(&email, &password).await?;
        self.remember_email(email);
        println!("Signed in as {}", user.display_name());
        Ok(())
    }

    pub async fn register(&mut self, email: Option<String>, name: Option<String>) -> Result<()> {
        let email = self.resolve_email(email)?;
        let name = match name {
            Some(name) => Some(name),
            None => Some(prompt("Name (optional): ")?).filter(|n| !n.is_empty()),
        };
        let password = rpassword::prompt_password("Password: ")?;
        let confirm = rpassword::prompt_password("Confirm password: ")?;
        if password != confirm {
            bail!("Passwords do not match");
        }

        let user = self
            .session
            .register(&email, &password, name.as_deref())
            .await?;
        self.remember_email(email);
        println!("Account created. Signed in as {}", user.display_name());
        Ok(())
    }

    pub fn logout(&self) {
        self.session.logout();
        println!("Signed out");
    }

    pub fn whoami(&self) {
        match self.session.current_user() {
            Some(user) => match user.name.as_deref() {
                Some(name) if !name.is_empty() => println!("{} <{}>", name, user.email),
                _ => println!("{}", user.email),
            },
            None => println!("Not signed in"),
        }
    }

    // ===== Tasks =====

    pub async fn list(&self, filter: TaskFilter) -> Result<()> {
        let mut tasks = self.load_tasks().await?;
        tasks.set_filter(filter);

        println!("{}", format::counts_line(&tasks.counts()));
        let visible = tasks.visible();
        if visible.is_empty() {
            println!("{}", empty_message(filter));
        }
        for task in visible {
            println!("{}", format::task_detail(task));
        }
        Ok(())
    }

    pub async fn add(
        &self,
        title: String,
        description: Option<String>,
        due: Option<String>,
    ) -> Result<()> {
        self.require_session()?;
        let title = title.trim().to_string();
        if title.is_empty() {
            bail!("Title is required");
        }

        let mut task = NewTask::new(title);
        task.description = description.filter(|d| !d.trim().is_empty());
        task.due_date = due.map(|d| checked_due(&d)).transpose()?;

        let mut tasks = TaskCollection::new();
        let created = tasks.create(self.session.api(), &task).await?;
        println!("Created {}", format::task_line(&created));
        Ok(())
    }

    pub async fn edit(
        &self,
        id: TaskId,
        title: Option<String>,
        description: Option<String>,
        due: Option<String>,
    ) -> Result<()> {
        let mut update = TaskUpdate {
            title,
            description,
            due_date: due.map(|d| checked_due(&d)).transpose()?,
            ..TaskUpdate::default()
        };
        if update.is_empty() {
            bail!("Nothing to change. Pass --title, --description or --due");
        }
        if let Some(title) = update.title.as_mut() {
            *title = title.trim().to_string();
            if title.is_empty() {
                bail!("Title cannot be empty");
            }
        }

        let mut tasks = self.load_tasks().await?;
        ensure_exists(&tasks, id)?;
        let updated = tasks.update(self.session.api(), id, &update).await?;
        println!("Updated {}", format::task_line(&updated));
        Ok(())
    }

    pub async fn set_completed(&self, id: TaskId, completed: bool) -> Result<()> {
        let mut tasks = self.load_tasks().await?;
        let current = ensure_exists(&tasks, id)?.completed;
        if current == completed {
            debug!(task_id = id, completed, "Task already in requested state");
        }
        let task = tasks
            .toggle_complete(self.session.api(), id, completed)
            .await?;
        println!("{}", format::task_line(&task));
        Ok(())
    }

    pub async fn remove(&self, id: TaskId, yes: bool) -> Result<()> {
        let mut tasks = self.load_tasks().await?;
        let title = ensure_exists(&tasks, id)?.title.clone();

        if !yes && !confirm(&format!("Delete \"{}\"? [y/N] ", title))? {
            println!("Cancelled");
            return Ok(());
        }

        tasks.delete(self.session.api(), id).await?;
        println!("Deleted #{}", id);
        Ok(())
    }

    // ===== Calendar =====

    pub async fn calendar(&self, month: Option<String>) -> Result<()> {
        let today = Local::now().date_naive();
        let view = match month.as_deref() {
            Some(raw) => MonthView::parse(raw)
                .ok_or_else(|| anyhow!("Invalid month \"{}\", expected YYYY-MM", raw))?,
            None => MonthView::containing(today),
        };

        let tasks = self.load_tasks().await?;
        let groups = group_by_day(tasks.tasks(), &Local);
        println!("{}", format::month_grid(&view, &groups, today));

        for day in view.days() {
            let due = tasks_on(tasks.tasks(), day, &Local);
            if due.is_empty() {
                continue;
            }
            println!("{}", day.format("%a %b %d"));
            for task in due {
                println!("  {}", format::task_line(task));
            }
        }

        let next = upcoming(tasks.tasks(), &Local::now());
        if !next.is_empty() {
            println!("\nUpcoming");
            for task in next.into_iter().take(UPCOMING_LIMIT) {
                println!("  {}", format::task_line(task));
            }
        }
        Ok(())
    }

    pub async fn upcoming(&self, limit: usize) -> Result<()> {
        let tasks = self.load_tasks().await?;
        let due = upcoming(tasks.tasks(), &Local::now());
        if due.is_empty() {
            println!("Nothing due");
        }
        for task in due.into_iter().take(limit) {
            println!("{}", format::task_line(task));
        }
        Ok(())
    }

    // ===== Helpers =====

    fn require_session(&self) -> Result<()> {
        if self.session.status() != SessionStatus::Authenticated {
            bail!("Not signed in. Run `taskdeck login` first.");
        }
        Ok(())
    }

    async fn load_tasks(&self) -> Result<TaskCollection> {
        self.require_session()?;
        let mut tasks = TaskCollection::new();
        tasks
            .load(self.session.api())
            .await
            .context("Failed to load tasks")?;
        Ok(tasks)
    }

    fn resolve_email(&self, email: Option<String>) -> Result<String> {
        let email = match email {
            Some(email) => email,
            None => match self.config.last_email.as_deref() {
                Some(last) => {
                    let entered = prompt(&format!("Email [{}]: ", last))?;
                    if entered.is_empty() {
                        last.to_string()
                    } else {
                        entered
                    }
                }
                None => prompt("Email: ")?,
            },
        };
        let email = email.trim().to_string();
        if email.is_empty() {
            bail!("Email is required");
        }
        Ok(email)
    }

    fn remember_email(&mut self, email: String) {
        self.config.last_email = Some(email);
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }
    }
}

fn ensure_exists(tasks: &TaskCollection, id: TaskId) -> Result<&taskdeck_core::Task> {
    tasks.get(id).ok_or_else(|| anyhow!("No task with id {}", id))
}

/// Reject due dates that would never land on the calendar
fn checked_due(raw: &str) -> Result<String> {
    let raw = raw.trim();
    if parse_due(raw, &Local).is_none() {
        bail!(
            "Unrecognized due date \"{}\". Use YYYY-MM-DD or YYYY-MM-DDTHH:MM",
            raw
        );
    }
    Ok(raw.to_string())
}

fn empty_message(filter: TaskFilter) -> &'static str {
    match filter {
        TaskFilter::All => "No tasks yet. Add one with `taskdeck add <title>`",
        TaskFilter::Pending => "No pending tasks",
        TaskFilter::Completed => "No completed tasks",
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn confirm(label: &str) -> Result<bool> {
    let answer = prompt(label)?;
    Ok(matches!(answer.to_lowercase().as_str(), "y" | "yes"))
}
