//! Terminal view
//!
//! A renderer task prints a panel whenever its view channel changes while the
//! input loop turns stdin lines into commands. Searches and recommendation
//! refreshes run in their own tasks so a newer search can supersede an older
//! one still in flight.

pub mod render;

use crate::commands::{self, Panel, Selection, WatchlistChange};
use crate::error::{AppError, ErrorResponse, Result};
use crate::state::AppState;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub const HELP: &str = "\
Commands:
  <SYMBOL> | search <SYMBOL>   load quote, chart and news
  watch                        add or remove the loaded stock from the watchlist
  rm <SYMBOL>                  remove a stock from the watchlist
  recs                         get new AI stock recommendations
  open news|watch|rec <n>      open the n-th entry of a list
  signout                      sign out
  help                         show this help
  quit                         exit";

/// Parsed input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Search(String),
    Watch,
    Remove(String),
    Recommendations,
    Open(Panel, usize),
    SignOut,
    Help,
    Quit,
}

/// Parse one input line; blank lines yield `None`
pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let mut words = line.split_whitespace();
    let Some(first) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = words.collect();

    let command = match (first.to_ascii_lowercase().as_str(), rest.as_slice()) {
        ("search" | "s", [symbol]) => Command::Search(symbol.to_string()),
        ("search" | "s", _) => return Err(usage("search <SYMBOL>")),
        ("watch", []) => Command::Watch,
        ("rm" | "remove", [symbol]) => Command::Remove(symbol.to_string()),
        ("rm" | "remove", _) => return Err(usage("rm <SYMBOL>")),
        ("recs", []) => Command::Recommendations,
        ("open", [panel, index]) => {
            let index = index
                .parse::<usize>()
                .map_err(|_| usage("open news|watch|rec <n>"))?;
            Command::Open(panel.parse()?, index)
        }
        ("open", _) => return Err(usage("open news|watch|rec <n>")),
        ("signout" | "logout", []) => Command::SignOut,
        ("help" | "?", []) => Command::Help,
        ("quit" | "exit" | "q", []) => Command::Quit,
        (_, []) => Command::Search(first.to_string()),
        _ => {
            return Err(AppError::Validation(format!(
                "Unknown command: {}. Type `help` for a list.",
                line.trim()
            )))
        }
    };

    Ok(Some(command))
}

fn report(err: AppError) {
    let response = ErrorResponse::from(err);
    debug!("Command rejected: {}", response.code);
    println!("{}", response.message);
}

fn usage(text: &str) -> AppError {
    AppError::Validation(format!("Usage: {}", text))
}

/// Read commands from stdin until `quit` or end of input
pub async fn run(state: Arc<AppState>) -> Result<()> {
    state.register_task(spawn_renderer(state.clone()));
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Ok(None) => {}
            Ok(Some(Command::Quit)) => break,
            Ok(Some(command)) => {
                if let Err(e) = execute(&state, command).await {
                    report(e);
                }
            }
            Err(e) => report(e),
        }
    }

    debug!("Console input closed");
    Ok(())
}

async fn execute(state: &Arc<AppState>, command: Command) -> Result<()> {
    match command {
        Command::Search(input) => spawn_search(state, commands::normalize_symbol(&input)?),
        Command::Watch => match commands::watchlist::toggle_current(state)? {
            WatchlistChange::Added(symbol) => println!("Adding {} to the watchlist", symbol),
            WatchlistChange::Removed(symbol) => println!("Removing {} from the watchlist", symbol),
            WatchlistChange::Ignored(_) => println!("Sign in to use the watchlist"),
        },
        Command::Remove(input) => match commands::watchlist::remove(state, &input)? {
            WatchlistChange::Ignored(_) => println!("Sign in to use the watchlist"),
            change => debug!("{:?}", change),
        },
        Command::Recommendations => {
            let state = state.clone();
            tokio::spawn(async move {
                commands::insights::refresh_recommendations(&state).await;
            });
        }
        Command::Open(panel, index) => match commands::select(state, panel, index)? {
            Selection::Search(symbol) => spawn_search(state, symbol),
            Selection::Link(url) => println!("{}", url),
        },
        Command::SignOut => match commands::session::current_user(state) {
            Some(_) => commands::session::sign_out(state).await?,
            None => println!("Not signed in"),
        },
        Command::Help => println!("{}", HELP),
        Command::Quit => {}
    }
    Ok(())
}

fn spawn_search(state: &Arc<AppState>, symbol: String) {
    let state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = commands::search(&state, &symbol).await {
            warn!("Search for {} failed: {}", symbol, e);
        }
    });
}

/// Print each panel when its view state changes
fn spawn_renderer(state: Arc<AppState>) -> JoinHandle<()> {
    let mut market = state.market_view.subscribe();
    let mut news = state.news_view.subscribe();
    let mut summary = state.summary_view.subscribe();
    let mut recommendations = state.recommendations_view.subscribe();
    let mut watchlist = state.watchlist_view.subscribe();
    let mut user = state.user_id.subscribe();

    tokio::spawn(async move {
        loop {
            let panel = tokio::select! {
                r = market.changed() => r.map(|_| render::render_market(&market.borrow_and_update())),
                r = news.changed() => r.map(|_| render::render_news(&news.borrow_and_update())),
                r = summary.changed() => r.map(|_| render::render_summary(&summary.borrow_and_update())),
                r = recommendations.changed() => {
                    r.map(|_| render::render_recommendations(&recommendations.borrow_and_update()))
                }
                r = watchlist.changed() => r.map(|_| render::render_watchlist(&watchlist.borrow_and_update())),
                r = user.changed() => r.map(|_| match user.borrow_and_update().as_deref() {
                    Some(uid) => format!("Signed in as {}", uid),
                    None => "Signed out".to_string(),
                }),
            };

            match panel {
                Ok(text) => println!("\n{}\n", text),
                Err(_) => break,
            }
        }
    })
}
