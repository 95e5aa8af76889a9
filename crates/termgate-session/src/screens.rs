//! Fixed screens: banner, menus, listings.
//!
//! These only build frames. The session adds the prompt for its stage.

use chrono::{DateTime, Local, Utc};
use termgate_door::DoorCatalog;
use termgate_protocol::ServerFrame;
use termgate_store::{Message, User};

use crate::Area;

fn rule(width: usize) -> String {
    "=".repeat(width)
}

fn dashes(width: usize) -> String {
    "-".repeat(width)
}

/// Unix seconds as a local date and time, or `-` if out of range.
pub(crate) fn format_timestamp(secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .map(|utc| utc.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub(crate) fn banner(board_name: &str) -> ServerFrame {
    let connected = Local::now().format("%Y-%m-%d %H:%M:%S");
    ServerFrame::new()
        .clear()
        .line(rule(60))
        .line(format!("  {}", board_name.to_uppercase()))
        .line(format!("  Connected at {connected}"))
        .line(rule(60))
        .line("")
        .line("Welcome to a secure, text-only bulletin board system!")
        .line("All input is validated and logged for security.")
        .line("")
        .line("Enter username (3-20 chars, letters/numbers/underscore only).")
        .line("Unknown usernames can register a new account.")
}

pub(crate) fn main_menu(username: &str) -> ServerFrame {
    ServerFrame::new()
        .line("")
        .line(dashes(40))
        .line(format!("  MAIN MENU - User: {username}"))
        .line(dashes(40))
        .line("")
        .line("  [1] (M)essage Areas")
        .line("  [2] (D)oor Games")
        .line("  [3] (U)ser List")
        .line("  [4] (H)elp")
        .line("  [5] (T)ime")
        .line("  [Q]uit")
        .line("")
}

pub(crate) fn help(idle_minutes: u64) -> ServerFrame {
    ServerFrame::new()
        .clear()
        .line(dashes(50))
        .line("  HELP - BBS COMMANDS")
        .line(dashes(50))
        .line("")
        .line("  Navigation:")
        .line("    - Enter menu numbers (1, 2, 3...) or letters (M, D, U...)")
        .line("    - Commands are case-insensitive")
        .line("    - Type B or BACK to go back in menus")
        .line("")
        .line("  Security Features:")
        .line("    - All input is validated and sanitized")
        .line("    - Rate limiting prevents abuse")
        .line("    - Failed login attempts are logged")
        .line(format!(
            "    - Sessions time out after {idle_minutes} minutes of inactivity"
        ))
        .line("")
        .line("  Available Areas:")
        .line("    - Messages: Read and post messages")
        .line("    - Door Games: Play classic BBS games")
        .line("    - User List: See who's on the system")
        .line("")
}

pub(crate) fn time_screen() -> ServerFrame {
    let now = Local::now().format("%A, %B %d, %Y at %I:%M:%S %p");
    ServerFrame::new()
        .line("")
        .line(format!("Current system time: {now}"))
        .line("")
}

pub(crate) fn user_list(users: &[User]) -> ServerFrame {
    let mut frame = ServerFrame::new()
        .clear()
        .line("USER LIST")
        .line(dashes(60))
        .line(format!("{:<20} {:<20} {}", "Username", "Real name", "Last login"));
    if users.is_empty() {
        frame.push_line("No users yet.");
    }
    for user in users {
        let last = user
            .last_login_at
            .map(format_timestamp)
            .unwrap_or_else(|| "never".to_string());
        frame.push_line(format!(
            "{:<20} {:<20} {}",
            user.username,
            user.real_name.as_deref().unwrap_or("-"),
            last
        ));
    }
    frame.line("")
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

pub(crate) fn messages_menu(area: Area) -> ServerFrame {
    let mut frame = ServerFrame::new()
        .line("")
        .line(dashes(40))
        .line(format!("  MESSAGE AREA - {}", area.title()))
        .line(dashes(40))
        .line("  [L] List messages")
        .line("  [#] Read message number #");
    if !area.is_read_only() {
        frame.push_line("  [P] Post a message");
    }
    frame
        .line("  [A] Change area")
        .line("  [B] Back to main menu")
        .line("")
}

pub(crate) fn area_menu(current: Area) -> ServerFrame {
    let mut frame = ServerFrame::new().line("").line("MESSAGE AREAS");
    for (i, area) in Area::ALL.iter().enumerate() {
        let marker = if *area == current { "*" } else { " " };
        let note = if area.is_read_only() { " (read-only)" } else { "" };
        frame.push_line(format!("{marker} [{}] {}{note}", i + 1, area.title()));
    }
    frame.line("")
}

pub(crate) fn message_list(area: Area, messages: &[Message]) -> ServerFrame {
    let mut frame = ServerFrame::new()
        .line("")
        .line(format!("{} - newest first", area.title()))
        .line(format!("{:>5}  {:<16} {:<16} {}", "#", "Date", "From", "Subject"));
    if messages.is_empty() {
        frame.push_line("No messages in this area yet.");
    }
    for message in messages {
        frame.push_line(format!(
            "{:>5}  {:<16} {:<16} {}",
            message.id,
            format_timestamp(message.posted_at),
            message.from_user,
            message.subject
        ));
    }
    frame.line("")
}

pub(crate) fn message_detail(message: &Message) -> ServerFrame {
    ServerFrame::new()
        .line("")
        .line(format!("Message #{}", message.id))
        .line(format!("From: {}", message.from_user))
        .line(format!("To: {}", message.to_user))
        .line(format!("Date: {}", format_timestamp(message.posted_at)))
        .line(format!("Subject: {}", message.subject))
        .line(dashes(40))
        .line(message.body.as_str())
        .line(dashes(40))
}

// ---------------------------------------------------------------------------
// Doors
// ---------------------------------------------------------------------------

pub(crate) fn doors_menu(doors: &DoorCatalog) -> ServerFrame {
    let mut frame = ServerFrame::new()
        .line("")
        .line(dashes(40))
        .line("  DOOR GAMES")
        .line(dashes(40));
    if doors.is_empty() {
        frame.push_line("  No doors are installed.");
    }
    for (i, door) in doors.list().enumerate() {
        frame.push_line(format!("  [{}] {} - {}", i + 1, door.name, door.description));
    }
    frame.line("  [B] Back to main menu").line("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp_out_of_range_is_dash() {
        assert_eq!(format_timestamp(i64::MAX), "-");
    }

    #[test]
    fn test_messages_menu_hides_post_in_read_only_area() {
        let frame = messages_menu(Area::Announcements);
        assert!(!frame.lines.iter().any(|l| l.contains("[P]")));
        let frame = messages_menu(Area::General);
        assert!(frame.lines.iter().any(|l| l.contains("[P]")));
    }

    #[test]
    fn test_doors_menu_numbers_from_one() {
        let frame = doors_menu(&DoorCatalog::with_builtin());
        assert!(frame.lines.iter().any(|l| l.starts_with("  [1] Hi-Lo Casino")));
    }

    #[test]
    fn test_message_detail_splits_body_lines() {
        let message = Message {
            id: 3,
            area: "general".into(),
            from_user: "amy".into(),
            to_user: "All".into(),
            subject: "hi".into(),
            body: "one\ntwo".into(),
            posted_at: 0,
        };
        let frame = message_detail(&message);
        assert!(frame.lines.contains(&"one".to_string()));
        assert!(frame.lines.contains(&"two".to_string()));
    }
}
