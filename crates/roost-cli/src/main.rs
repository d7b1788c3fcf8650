mod output;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use log::{info, warn};
use roost::atoms::constants::DEFAULT_HISTORY_COUNT;
use roost::atoms::types::{Room, UserStatus};
use roost::engine::commands::{self, CommandInterpreter, Effect};
use roost::engine::insights::{self, InsightsOptions, TimeRange};
use roost::engine::notify::LogNotifier;
use roost::engine::pins::{self, PinFilter};
use roost::engine::poller::{PollEvent, Poller};
use roost::engine::prefs::{PrefsStore, SqliteBackend};
use roost::engine::rocketchat::NewChannel;
use roost::engine::{search, team, threads};
use roost::{ChatApi, ChatError, ChatResult, ClientConfig, HistoryQuery, RocketChat};

#[derive(Debug, Parser)]
#[command(name = "roost", version)]
#[command(about = "Rocket.Chat client: rooms, history, search, insights and live watching")]
struct Cli {
    /// Config file (default: <config_dir>/roost/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Server URL, overrides the config file
    #[arg(long, global = true, env = "ROOST_SERVER_URL")]
    server: Option<String>,

    /// Print results as JSON `{success, data, error}`
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Log in and remember the session
    Login {
        /// Username or email
        user: String,
        #[arg(long, env = "ROOST_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Log out and forget the session
    Logout,

    /// Create an account
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        #[arg(long, env = "ROOST_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// List subscribed rooms
    Rooms,

    /// Show recent messages in a room
    History {
        /// Room name or id
        room: String,
        #[arg(long, default_value_t = DEFAULT_HISTORY_COUNT)]
        count: u32,
    },

    /// Post a message
    Send { room: String, text: String },

    /// Edit one of your messages
    Edit { room: String, message_id: String, text: String },

    /// Delete a message
    Delete { room: String, message_id: String },

    /// Pin a message
    Pin { message_id: String },

    /// Unpin a message
    Unpin { message_id: String },

    /// Pinned messages across rooms
    Pins {
        #[arg(long)]
        room: Option<String>,
        /// Only pins you made
        #[arg(long)]
        mine: bool,
        #[arg(long, default_value = "")]
        query: String,
    },

    /// Thread roots across rooms
    Threads {
        #[arg(long)]
        room: Option<String>,
        #[arg(long, default_value = "")]
        query: String,
    },

    /// Replies in a thread
    Thread { tmid: String },

    /// Reply in a thread
    Reply { room: String, tmid: String, text: String },

    /// Search messages (all rooms unless --room)
    Search {
        text: String,
        #[arg(long)]
        room: Option<String>,
        #[arg(long, default_value_t = 0)]
        offset: u32,
        /// Summarize the results instead of listing them
        #[arg(long)]
        insights: bool,
    },

    /// Activity report for the workspace or one room
    Insights {
        /// 1d, 7d or 30d
        #[arg(long, default_value = "7d")]
        range: TimeRange,
        #[arg(long)]
        room: Option<String>,
    },

    /// Team roster with presence
    Team {
        #[arg(long)]
        room: Option<String>,
        /// online, away, busy or offline
        #[arg(long)]
        status: Option<String>,
    },

    /// Set your status
    Status {
        /// online, away, busy or offline
        status: String,
        #[arg(long, default_value = "")]
        message: String,
    },

    /// Toggle do-not-disturb
    Dnd,

    /// Create a channel or private group
    CreateChannel {
        name: String,
        #[arg(long)]
        private: bool,
        #[arg(long)]
        read_only: bool,
        /// Usernames to add (repeatable)
        #[arg(long = "member")]
        members: Vec<String>,
    },

    /// Run a slash command (/search, /status, /join)
    Run { input: String },

    /// Poll a room and print new messages until interrupted
    Watch { room: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    if let Err(e) = run(cli).await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

// ── Context ─────────────────────────────────────────────────────────────────

struct Ctx {
    config: ClientConfig,
    client: Arc<RocketChat>,
    prefs: Arc<PrefsStore>,
    json: bool,
}

impl Ctx {
    fn open(cli: &Cli) -> ChatResult<Self> {
        let mut config = ClientConfig::load(cli.config.as_deref())?;
        if let Some(server) = &cli.server {
            config.server_url = roost::engine::config::normalize_server_url(server)?;
        }
        let backend = Arc::new(SqliteBackend::open(&config.db_path())?);
        let prefs = Arc::new(PrefsStore::load(backend));
        let client = RocketChat::new(&config)?;
        if let Some(session) = prefs.session() {
            client.set_credentials(Some(session.credentials));
        }
        Ok(Ctx { config, client: Arc::new(client), prefs, json: cli.json })
    }

    fn api(&self) -> Arc<dyn ChatApi> {
        self.client.clone()
    }

    fn local_user_id(&self) -> ChatResult<String> {
        self.client
            .local_user_id()
            .ok_or_else(|| ChatError::Auth("Not logged in. Run `roost login` first.".into()))
    }

    async fn room(&self, key: &str) -> ChatResult<Room> {
        let rooms = self.client.rooms().await?;
        resolve_room(&rooms, key).cloned()
    }

    async fn optional_room(&self, key: Option<&str>) -> ChatResult<Option<Room>> {
        match key {
            Some(k) => Ok(Some(self.room(k).await?)),
            None => Ok(None),
        }
    }

    /// JSON mode prints an `Outcome`; text mode renders the value.
    fn emit<T: serde::Serialize>(&self, result: ChatResult<T>, render: impl FnOnce(&T)) -> ChatResult<()> {
        if self.json {
            let failed = result.is_err();
            output::print_json(&roost::Outcome::from(result));
            if failed {
                std::process::exit(1);
            }
            return Ok(());
        }
        let value = result?;
        render(&value);
        Ok(())
    }
}

/// Room by id, name or `#name`.
fn resolve_room<'a>(rooms: &'a [Room], key: &str) -> ChatResult<&'a Room> {
    let name = key.trim().trim_start_matches('#');
    rooms
        .iter()
        .find(|r| r.id == key)
        .or_else(|| commands::find_room(rooms, name))
        .ok_or_else(|| ChatError::NotFound(format!("room '{}'", key)))
}

fn parse_status(raw: &str) -> ChatResult<UserStatus> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "online" | "away" | "busy" | "offline" => Ok(UserStatus::parse(raw)),
        other => Err(ChatError::Other(format!(
            "Unknown status '{}' (expected online, away, busy or offline)",
            other
        ))),
    }
}

// ── Dispatch ────────────────────────────────────────────────────────────────

async fn run(cli: Cli) -> ChatResult<()> {
    let ctx = Ctx::open(&cli)?;

    match cli.cmd {
        Command::Login { user, password } => cmd_login(&ctx, &user, &password).await,
        Command::Logout => cmd_logout(&ctx).await,
        Command::Register { name, email, username, password } => {
            let result = ctx.client.register(&name, &email, &username, &password).await;
            ctx.emit(result, |u| println!("Registered {}", u.username.as_deref().unwrap_or(&u.id)))
        }
        Command::Rooms => {
            let result = ctx.client.rooms().await;
            ctx.emit(result, |rooms| output::print_rooms(rooms))
        }
        Command::History { room, count } => {
            let room = ctx.room(&room).await?;
            let mut result = ctx.client.history(&room, &HistoryQuery::latest(count)).await;
            if let Ok(messages) = result.as_mut() {
                messages.reverse();
            }
            ctx.emit(result, |msgs| output::print_messages(msgs))
        }
        Command::Send { room, text } => {
            let room = ctx.room(&room).await?;
            let result = ctx.client.send_message(&room.id, &text).await;
            ctx.emit(result, |m| println!("Sent {}", m.id))
        }
        Command::Edit { room, message_id, text } => {
            let room = ctx.room(&room).await?;
            let result = ctx.client.edit_message(&room.id, &message_id, &text).await;
            ctx.emit(result, |m| println!("Edited {}", m.id))
        }
        Command::Delete { room, message_id } => {
            let room = ctx.room(&room).await?;
            let result = ctx.client.delete_message(&room.id, &message_id).await;
            ctx.emit(result, |_| println!("Deleted {}", message_id))
        }
        Command::Pin { message_id } => {
            let result = ctx.client.pin_message(&message_id).await;
            ctx.emit(result, |_| println!("Pinned {}", message_id))
        }
        Command::Unpin { message_id } => {
            let result = ctx.client.unpin_message(&message_id).await;
            ctx.emit(result, |_| println!("Unpinned {}", message_id))
        }
        Command::Pins { room, mine, query } => cmd_pins(&ctx, room.as_deref(), mine, query).await,
        Command::Threads { room, query } => cmd_threads(&ctx, room.as_deref(), &query).await,
        Command::Thread { tmid } => {
            let result = threads::thread_messages(ctx.client.as_ref(), &tmid).await;
            ctx.emit(result, |msgs| output::print_messages(msgs))
        }
        Command::Reply { room, tmid, text } => {
            let room = ctx.room(&room).await?;
            let result = ctx.client.reply_in_thread(&room.id, &tmid, &text).await;
            ctx.emit(result, |m| println!("Replied {}", m.id))
        }
        Command::Search { text, room, offset, insights } => {
            cmd_search(&ctx, &text, room.as_deref(), offset, insights).await
        }
        Command::Insights { range, room } => cmd_insights(&ctx, range, room.as_deref()).await,
        Command::Team { room, status } => cmd_team(&ctx, room.as_deref(), status.as_deref()).await,
        Command::Status { status, message } => {
            let status = parse_status(&status)?;
            let result = ctx.client.set_status(status, &message).await;
            ctx.emit(result, |_| println!("Status set to {}", status))
        }
        Command::Dnd => {
            let result = commands::toggle_dnd(ctx.client.as_ref(), &ctx.prefs).await;
            ctx.emit(result, |on| println!("Do-not-disturb {}", if *on { "on" } else { "off" }))
        }
        Command::CreateChannel { name, private, read_only, members } => {
            let channel = NewChannel { name, private, read_only, members };
            let result = ctx.client.create_channel(&channel).await;
            ctx.emit(result, |r| println!("Created #{} ({})", r.label(), r.id))
        }
        Command::Run { input } => cmd_run(&ctx, &input).await,
        Command::Watch { room } => cmd_watch(&ctx, &room).await,
    }
}

// ── Commands ────────────────────────────────────────────────────────────────

async fn cmd_login(ctx: &Ctx, user: &str, password: &str) -> ChatResult<()> {
    let result = ctx.client.login(user, password).await;
    if let Ok(session) = &result {
        ctx.prefs.save_session(session)?;
    }
    let result = result.map(|s| s.me);
    ctx.emit(result, |me| {
        println!("Logged in as {}", me.username.as_deref().unwrap_or(&me.id));
    })
}

async fn cmd_logout(ctx: &Ctx) -> ChatResult<()> {
    let result = ctx.client.logout().await;
    // Forget the session even if the server call failed.
    ctx.prefs.clear_session()?;
    ctx.emit(result, |_| println!("Logged out"))
}

async fn cmd_pins(ctx: &Ctx, room: Option<&str>, mine: bool, query: String) -> ChatResult<()> {
    let rooms = ctx.client.rooms().await?;
    let room_id = match room {
        Some(key) => Some(resolve_room(&rooms, key)?.id.clone()),
        None => None,
    };
    let all = pins::load_pins(ctx.client.as_ref(), &rooms, room_id.as_deref()).await;
    let filter = PinFilter {
        query,
        pinned_by: if mine { Some(ctx.local_user_id()?) } else { None },
    };
    let shown: Vec<_> = pins::filter_pins(&all, &filter).into_iter().cloned().collect();
    ctx.emit(Ok(shown), |hits| output::print_hits(hits))
}

async fn cmd_threads(ctx: &Ctx, room: Option<&str>, query: &str) -> ChatResult<()> {
    let rooms = ctx.client.rooms().await?;
    let room_id = match room {
        Some(key) => Some(resolve_room(&rooms, key)?.id.clone()),
        None => None,
    };
    let all = threads::load_threads(ctx.client.as_ref(), &rooms, room_id.as_deref()).await;
    let shown: Vec<_> = all.into_iter().filter(|t| pins::matches_query(t, query)).collect();
    ctx.emit(Ok(shown), |hits| output::print_threads(hits))
}

async fn cmd_search(ctx: &Ctx, text: &str, room: Option<&str>, offset: u32, summarize: bool) -> ChatResult<()> {
    let hits = match ctx.optional_room(room).await? {
        Some(room) => search::room_search(ctx.client.as_ref(), &room, text, offset).await?,
        None => {
            let rooms = ctx.client.rooms().await?;
            search::global_search(ctx.client.as_ref(), &rooms, text, ctx.config.search_room_cap).await
        }
    };
    if summarize {
        let offset = InsightsOptions::from_config(&ctx.config).offset;
        let report = insights::search_insights(&hits, &offset)
            .ok_or_else(|| ChatError::NotFound("No search results to analyze".into()));
        return ctx.emit(report, |r| output::print_search_insights(r));
    }
    ctx.emit(Ok(hits), |hits| output::print_hits(hits))
}

async fn cmd_insights(ctx: &Ctx, range: TimeRange, room: Option<&str>) -> ChatResult<()> {
    let opts = InsightsOptions::from_config(&ctx.config);
    match ctx.optional_room(room).await? {
        Some(room) => {
            let result = insights::channel_insights(ctx.client.as_ref(), &room, range, &opts).await;
            ctx.emit(result, |r| output::print_channel_insights(r))
        }
        None => {
            let result = insights::aggregate(ctx.client.as_ref(), range, &opts).await;
            if let Ok(report) = &result {
                if !report.skipped.is_empty() {
                    warn!("Partial data: {} room(s) could not be analyzed", report.skipped.len());
                }
            }
            ctx.emit(result, |r| output::print_workspace_insights(r))
        }
    }
}

async fn cmd_team(ctx: &Ctx, room: Option<&str>, status: Option<&str>) -> ChatResult<()> {
    let status = status.map(parse_status).transpose()?;
    let me = ctx.local_user_id()?;
    let room = ctx.optional_room(room).await?;
    let roster = team::load_roster(ctx.client.as_ref(), room.as_ref(), &me).await?;
    let counts = team::StatusCounts::of(&roster);
    let shown: Vec<_> = team::filter_by_status(&roster, status).into_iter().cloned().collect();
    ctx.emit(Ok(shown), |members| output::print_team(members, &counts))
}

async fn cmd_run(ctx: &Ctx, input: &str) -> ChatResult<()> {
    let rooms = ctx.client.rooms().await?;
    let interpreter = CommandInterpreter::new(ctx.api(), ctx.prefs.clone());
    let effect = interpreter.run(input, &rooms).await?;
    match &effect {
        Effect::OpenSearch { query } if !ctx.json => {
            let hits = search::global_search(ctx.client.as_ref(), &rooms, query, ctx.config.search_room_cap).await;
            output::print_hits(&hits);
            Ok(())
        }
        Effect::SwitchRoom { room_id, .. } if !ctx.json => {
            let room = resolve_room(&rooms, room_id)?;
            let mut messages = ctx.client.history(room, &HistoryQuery::latest(ctx.config.history_count)).await?;
            messages.reverse();
            output::print_messages(&messages);
            Ok(())
        }
        _ => ctx.emit(Ok(effect.clone()), |e| output::print_effect(e)),
    }
}

async fn cmd_watch(ctx: &Ctx, key: &str) -> ChatResult<()> {
    let room = ctx.room(key).await?;
    let (mut poller, mut events) = Poller::new(
        ctx.api(),
        ctx.prefs.clone(),
        Arc::new(LogNotifier),
        ctx.client.local_user_id(),
        ctx.config.poll_interval(),
        ctx.config.history_count,
    );
    poller.subscribe(room.clone());
    info!("Watching #{} (Ctrl-C to stop)", room.label());

    let mut seeded = false;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Some(PollEvent::Messages { room_id, messages, added }) if room_id == room.id => {
                    if !seeded {
                        seeded = true;
                        output::print_messages(&messages);
                    } else {
                        output::print_messages(&added);
                    }
                }
                Some(PollEvent::Failed { room_id, error }) if room_id == room.id => {
                    eprintln!("poll failed: {}", error);
                }
                Some(_) => {}
                None => break,
            },
        }
    }
    poller.unsubscribe();
    Ok(())
}
