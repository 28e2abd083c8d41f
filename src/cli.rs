use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::{Local, NaiveDate};

use court_book::{
    booking::{BookingPatch, DateWindow, SlotStatus, ToggleAction, UserBooking},
    notify::{Notification, NotificationLevel, ToastQueue},
    session::{BookingSession, DataSource},
    storage::config::Config,
    sync::{api::HttpBookingApi, auth::BearerAuthProvider},
};

pub const USAGE: &str = "Usage: court-book [COMMAND]

Commands:
  courts                              List courts
  slots [COURT] [YYYY-MM-DD]          Show time slots (default command)
  book <COURT> <YYYY-MM-DD> <SLOT>... Book one or more slots
  bookings                            List your bookings
  cancel <BOOKING_ID>                 Cancel a booking
  reschedule <BOOKING_ID> <YYYY-MM-DD> [SLOT]...
                                      Move a booking to another date or slots
  week [YYYY-MM-DD]                   Show the 7-day date window
  login | logout                      Manage sign-in";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Courts,
    Slots {
        court: Option<String>,
        date: Option<NaiveDate>,
    },
    Book {
        court: String,
        date: NaiveDate,
        slots: Vec<String>,
    },
    Bookings,
    Cancel {
        booking_id: String,
    },
    Reschedule {
        booking_id: String,
        date: NaiveDate,
        slots: Vec<String>,
    },
    Week {
        base: Option<NaiveDate>,
    },
    Login,
    Logout,
    Help,
}

impl Command {
    pub fn requires_auth(&self) -> bool {
        !matches!(self, Command::Week { .. } | Command::Help | Command::Login | Command::Logout)
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("Invalid date '{}'. Use YYYY-MM-DD.", value))
}

pub fn parse_command<I>(args: I) -> Result<Command, String>
where
    I: IntoIterator<Item = String>,
{
    let args: Vec<String> = args.into_iter().collect();
    let Some((name, rest)) = args.split_first() else {
        return Ok(Command::Slots { court: None, date: None });
    };

    match name.as_str() {
        "courts" => Ok(Command::Courts),
        "slots" => {
            let mut court = None;
            let mut date = None;
            for arg in rest {
                if let Ok(parsed) = NaiveDate::parse_from_str(arg, "%Y-%m-%d") {
                    date = Some(parsed);
                } else if court.is_none() {
                    court = Some(arg.clone());
                } else {
                    return Err(format!("Unexpected argument: {}", arg));
                }
            }
            Ok(Command::Slots { court, date })
        }
        "book" => match rest {
            [court, date, slots @ ..] if !slots.is_empty() => Ok(Command::Book {
                court: court.clone(),
                date: parse_date(date)?,
                slots: slots.to_vec(),
            }),
            _ => Err("book needs a court, a date and at least one slot".to_string()),
        },
        "bookings" => Ok(Command::Bookings),
        "cancel" => match rest {
            [booking_id] => Ok(Command::Cancel {
                booking_id: booking_id.clone(),
            }),
            _ => Err("cancel needs exactly one booking id".to_string()),
        },
        "reschedule" => match rest {
            [booking_id, date, slots @ ..] => Ok(Command::Reschedule {
                booking_id: booking_id.clone(),
                date: parse_date(date)?,
                slots: slots.to_vec(),
            }),
            _ => Err("reschedule needs a booking id and a date".to_string()),
        },
        "week" => match rest {
            [] => Ok(Command::Week { base: None }),
            [date] => Ok(Command::Week {
                base: Some(parse_date(date)?),
            }),
            _ => Err("week takes at most one date".to_string()),
        },
        "login" => Ok(Command::Login),
        "logout" => Ok(Command::Logout),
        "--help" | "-h" | "help" => Ok(Command::Help),
        other => Err(format!("Unknown argument: {}", other)),
    }
}

pub async fn run_command(
    command: Command,
    config: &Config,
    auth: Arc<BearerAuthProvider>,
) -> anyhow::Result<()> {
    let today = Local::now().date_naive();

    if let Command::Week { base } = &command {
        println!("{}", format_week(&DateWindow::new(base.unwrap_or(today))));
        return Ok(());
    }

    let toasts = Arc::new(ToastQueue::new());
    let api = Arc::new(HttpBookingApi::new(auth));
    let mut session = BookingSession::from_config(api, toasts.clone(), config, today);

    let result = match command {
        Command::Courts => {
            session.load_courts().await;
            println!("{}", format_courts(&session));
            Ok(())
        }
        Command::Slots { court, date } => {
            open_court(&mut session, court, date).await;
            println!("{}", format_slot_grid(&session));
            Ok(())
        }
        Command::Book { court, date, slots } => book(&mut session, court, date, &slots).await,
        Command::Bookings => {
            let bookings = session
                .user_bookings()
                .await
                .context("Could not load your bookings")?;
            println!("{}", format_bookings(&bookings));
            Ok(())
        }
        Command::Cancel { booking_id } => {
            session
                .cancel_booking(&booking_id)
                .await
                .with_context(|| format!("Could not cancel booking {}", booking_id))?;
            Ok(())
        }
        Command::Reschedule {
            booking_id,
            date,
            slots,
        } => {
            let mut patch = BookingPatch::new().with_date(date);
            if !slots.is_empty() {
                patch = patch.with_time_slots(slots);
            }
            session
                .update_booking(&booking_id, &patch)
                .await
                .with_context(|| format!("Could not reschedule booking {}", booking_id))?;
            Ok(())
        }
        Command::Week { .. } | Command::Login | Command::Logout | Command::Help => Ok(()),
    };

    print_toasts(toasts.drain());
    result
}

async fn open_court(session: &mut BookingSession, court: Option<String>, date: Option<NaiveDate>) {
    if let Some(date) = date {
        session.change_base_date(date);
    }

    if court.is_some() {
        session.set_default_court(court.clone());
    }
    session.load_courts().await;

    if let Some(court) = court
        && session.selected_court() != Some(court.as_str())
    {
        session.select_court(&court).await;
    }
}

async fn book(
    session: &mut BookingSession,
    court: String,
    date: NaiveDate,
    slots: &[String],
) -> anyhow::Result<()> {
    open_court(session, Some(court), Some(date)).await;

    if session.slots_source() != Some(DataSource::Live) {
        bail!("Time slots for this court could not be loaded");
    }

    for slot_id in slots {
        if session.toggle_slot(slot_id) != ToggleAction::Add {
            let status = session
                .slots()
                .iter()
                .find(|slot| &slot.id == slot_id)
                .map(|slot| slot.status.label())
                .unwrap_or("Unknown slot");
            println!("Skipping {} ({})", slot_id, status);
        }
    }

    let summary = session.summary();
    println!(
        "Booking {} on {}: {} ({} hour{})",
        summary.court_name.as_deref().unwrap_or("None selected"),
        summary.date.format("%a, %b %-d, %Y"),
        summary.slot_labels.join(", "),
        summary.total_hours,
        if summary.total_hours == 1 { "" } else { "s" }
    );

    let confirmation = session.submit().await.context("Booking was not completed")?;
    if let Some(id) = confirmation.booking_id {
        println!("Booking reference: {}", id);
    }
    Ok(())
}

fn format_courts(session: &BookingSession) -> String {
    let mut lines = Vec::new();
    if session.courts_source() == Some(DataSource::Fallback) {
        lines.push("(sample courts, server unavailable)".to_string());
    }
    if session.courts().is_empty() {
        lines.push("No courts available.".to_string());
    }
    for court in session.courts() {
        lines.push(format!("{:<10} {:<16} {}", court.id, court.name, court.description));
    }
    lines.join("\n")
}

fn format_week(window: &DateWindow) -> String {
    let mut lines = vec![format!(
        "Showing 7 days starting from {}",
        window.base().format("%A, %B %-d, %Y")
    )];
    for option in window.options() {
        let marker = if option.date == window.active() { "*" } else { " " };
        lines.push(format!("{} {}  {}", marker, option.value, option.label));
    }
    lines.join("\n")
}

fn status_mark(status: SlotStatus, selected: bool) -> char {
    match (status, selected) {
        (_, true) => '+',
        (SlotStatus::Available, false) => ' ',
        (SlotStatus::BookedOther, _) => 'x',
        (SlotStatus::BookedYou, _) => 'Y',
        (SlotStatus::OutsideHours, _) => '-',
    }
}

fn format_slot_grid(session: &BookingSession) -> String {
    let court = session
        .selected_court_info()
        .map(|court| court.name.clone())
        .or_else(|| session.selected_court().map(str::to_string))
        .unwrap_or_else(|| "None selected".to_string());

    let mut lines = vec![format!(
        "{} - {}",
        court,
        session.active_date().format("%A, %B %-d, %Y")
    )];

    if session.slots_source() == Some(DataSource::Fallback) {
        lines.push("(sample availability, booking disabled)".to_string());
    }
    if session.slots().is_empty() {
        lines.push("No time slots loaded.".to_string());
    }

    for slot in session.slots() {
        let mark = status_mark(slot.status, session.is_selected(&slot.id));
        let mut line = format!("[{}] {:<10} {}", mark, slot.label, slot.status.label());
        if let Some(owner) = &slot.owner {
            line.push_str(&format!(" ({})", owner));
        }
        lines.push(line);
    }

    lines.join("\n")
}

fn format_bookings(bookings: &[UserBooking]) -> String {
    if bookings.is_empty() {
        return "No bookings yet.".to_string();
    }

    bookings
        .iter()
        .map(|booking| {
            format!(
                "{:<12} {} {:<10} {}{}",
                booking.id.as_deref().unwrap_or("-"),
                booking.date.format("%Y-%m-%d"),
                booking.court_id,
                booking.time_slots.join(", "),
                booking
                    .state
                    .as_ref()
                    .map(|state| format!(" [{:?}]", state))
                    .unwrap_or_default()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn print_toasts(toasts: Vec<Notification>) {
    for toast in toasts {
        let prefix = match toast.level {
            NotificationLevel::Success => "✓",
            NotificationLevel::Error => "✗",
            NotificationLevel::Info => "i",
        };
        match toast.description {
            Some(description) => eprintln!("{} {} - {}", prefix, toast.title, description),
            None => eprintln!("{} {}", prefix, toast.title),
        }
    }
}
