//! Welcome banner display for chat sessions.

use console::style;

use quotewire_types::session::UserContext;

/// Print the welcome banner at the start of a chat session.
///
/// Shows the company branding, the relay server in use, who the relay
/// thinks you are, and the session id, plus the slash-command hint.
pub fn print_welcome_banner(
    company_name: &str,
    server_url: &str,
    session_id: &str,
    user: Option<&UserContext>,
) {
    println!();
    println!("  * {}", style(company_name).cyan().bold());
    println!();
    println!(
        "  {}   {}",
        style("Server:").bold(),
        style(server_url).dim()
    );
    if let Some(user) = user {
        let who = match &user.role {
            Some(role) => format!("{} ({role})", user.handle),
            None => user.handle.clone(),
        };
        println!("  {}     {}", style("User:").bold(), style(who).dim());
    }
    println!(
        "  {}  {}",
        style("Session:").bold(),
        style(session_id).dim()
    );
    println!();
    println!(
        "  {}",
        style("Type /help for commands, Ctrl+D to exit").dim()
    );
    println!("  {}", style("---").dim());
    println!();
}
