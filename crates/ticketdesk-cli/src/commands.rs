use std::io::{self, Write};

use anyhow::{bail, Context, Result};
use tracing::warn;

use ticketdesk_core::models::{TicketDetail, TicketListItem, TicketTab, UserIdentity};
use ticketdesk_core::{ApiError, Config, LoginRequest, Route, SessionManager, View};

use crate::Command;

/// Maximum title width in ticket tables
const TITLE_WIDTH: usize = 48;

pub async fn run(session: &SessionManager, config: &mut Config, command: Command) -> Result<()> {
    match command {
        Command::Whoami => {
            let state = session.bootstrap().await;
            match state.identity {
                Some(user) => print_identity(&user),
                None => println!("Not signed in"),
            }
        }
        Command::Login { login, remember } => login_interactive(session, config, login, remember).await?,
        Command::Logout => {
            session.logout().await;
            println!("Signed out");
        }
        Command::Tickets { tab, query } => {
            let tab = TicketTab::from_param(&tab)
                .with_context(|| format!("Unknown tab '{}' (new, in_progress, closed, all)", tab))?;
            require_view(session, View::Admin).await?;
            let tickets = session
                .api()
                .list_tickets(tab, query.as_deref())
                .await
                .map_err(session_error)?;
            print_tickets(&tickets);
        }
        Command::MyTickets => {
            require_view(session, View::User).await?;
            let tickets = session.api().list_my_tickets().await.map_err(session_error)?;
            print_tickets(&tickets);
        }
        Command::Ticket { id } => {
            require_view(session, View::User).await?;
            let ticket = session.api().get_ticket(id).await.map_err(session_error)?;
            print_ticket(&ticket);
        }
        Command::Assign { id, assignee } => {
            require_view(session, View::Admin).await?;
            let ticket = session
                .api()
                .assign_ticket(id, assignee)
                .await
                .map_err(session_error)?;
            println!("{} assigned to {}", ticket.ticket_number, ticket.display_assignee());
        }
        Command::Reply { id, message } => {
            require_view(session, View::User).await?;
            let message = message.join(" ");
            session
                .api()
                .add_ticket_message(id, &message)
                .await
                .map_err(session_error)?;
            println!("Message added");
        }
        Command::Shell => bail!("The shell cannot be started from here"),
    }
    Ok(())
}

async fn login_interactive(
    session: &SessionManager,
    config: &mut Config,
    login: Option<String>,
    remember: bool,
) -> Result<()> {
    let login = match login {
        Some(login) => login,
        None => prompt_login(config.last_login.as_deref())?,
    };
    if login.is_empty() {
        bail!("Login is required");
    }
    let password = rpassword::prompt_password("Password: ")?;

    let request = LoginRequest {
        login: login.clone(),
        password,
        remember,
    };
    let user = match session.login(request).await {
        Ok(user) => user,
        Err(e) => bail!("{}", e.login_message()),
    };

    config.last_login = Some(login);
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }

    print_identity(&user);
    if !remember {
        println!("Signed in for this process only; use --remember to stay signed in");
    }
    Ok(())
}

fn prompt_login(last_login: Option<&str>) -> Result<String> {
    match last_login {
        Some(last) => print!("Login [{}]: ", last),
        None => print!("Login: "),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();

    Ok(match (input.is_empty(), last_login) {
        (true, Some(last)) => last.to_string(),
        _ => input.to_string(),
    })
}

/// Make sure the session may see `view` before calling the backend
async fn require_view(session: &SessionManager, view: View) -> Result<()> {
    session.bootstrap().await;
    match session.route(view) {
        Route::Show(_) => Ok(()),
        Route::Redirect(View::Login) | Route::Pending => {
            bail!("Not signed in. Run `ticketdesk login` first.")
        }
        Route::Redirect(_) => bail!("This command needs support access"),
    }
}

fn session_error(error: ApiError) -> anyhow::Error {
    if error.is_unauthorized() {
        anyhow::anyhow!("Session expired. Please sign in again.")
    } else {
        error.into()
    }
}

fn print_identity(user: &UserIdentity) {
    println!("Signed in as {} [{}]", user.display_name(), user.role.label());
    if let Some(email) = &user.email {
        println!("  {}", email);
    }
}

fn print_tickets(tickets: &[TicketListItem]) {
    if tickets.is_empty() {
        println!("No tickets");
        return;
    }

    println!(
        "{:<10} {:<18} {:<12} {:<7} {:<16} {}",
        "NUMBER", "CREATED", "STATUS", "PRIO", "ASSIGNEE", "TITLE"
    );
    for ticket in tickets {
        let title: String = ticket.title.chars().take(TITLE_WIDTH).collect();
        println!(
            "{:<10} {:<18} {:<12} {:<7} {:<16} {}",
            ticket.ticket_number,
            ticket.formatted_date(),
            ticket.status.to_string(),
            ticket.priority.to_string(),
            ticket.display_assignee(),
            title
        );
    }
}

fn print_ticket(ticket: &TicketDetail) {
    println!("{} - {}", ticket.ticket_number, ticket.title);
    println!("  Status:   {} ({} priority)", ticket.status, ticket.priority);
    println!("  Created:  {}", ticket.formatted_date());
    println!("  Topic:    {}", ticket.topic);
    println!("  From:     {}", ticket.from_name);
    if let Some(dept) = &ticket.dept {
        println!("  Dept:     {}", dept);
    }
    if let Some(phone) = &ticket.phone {
        println!("  Phone:    {}", phone);
    }
    println!("  Assignee: {}", ticket.display_assignee());
    if let Some(message) = &ticket.message {
        println!();
        println!("{}", message);
    }
}
