#[cfg(target_arch = "wasm32")]
mod web {
    use std::cell::RefCell;

    use pcrdb_client::{App, ClientConfig};

    thread_local! {
        static APP_HANDLE: RefCell<Option<App>> = const { RefCell::new(None) };
    }

    pub fn start() {
        console_error_panic_hook::set_once();
        APP_HANDLE.with(|slot| {
            // A re-entered start replaces the previous app so its stores stop receiving updates.
            let _old = slot.borrow_mut().take();
            let app = App::browser(ClientConfig::from_env());
            app.init();
            *slot.borrow_mut() = Some(app);
        });
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    web::start();
}

#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use std::process::ExitCode;
    use std::rc::Rc;

    use clap::{Args, Parser, Subcommand};
    use pcrdb_client::clan_battle::BattleMode;
    use pcrdb_client::config::{STORAGE_KEY_TOKEN, STORAGE_KEY_USERNAME};
    use pcrdb_client::storage::MemoryStore;
    use pcrdb_client::{App, ClientConfig};
    use serde_json::{Value, json};
    use tracing_subscriber::EnvFilter;

    /// Look up clan, clan battle, grand arena and player statistics from the command line.
    #[derive(Parser, Debug)]
    #[command(name = "pcrdb-lookup", version)]
    struct Cli {
        /// Main API base URL.
        #[arg(long, env = "PCRDB_API_BASE")]
        api_base: Option<String>,

        /// Clan battle proxy base URL.
        #[arg(long, env = "PCRDB_BATTLE_API_BASE")]
        battle_api_base: Option<String>,

        #[command(flatten)]
        auth: AuthArgs,

        #[command(subcommand)]
        command: Command,
    }

    #[derive(Args, Debug)]
    struct AuthArgs {
        /// Bearer token from a previous login.
        #[arg(long, env = "PCRDB_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Sign in with this login id before running the command.
        #[arg(long, env = "PCRDB_LOGIN_ID")]
        login_id: Option<String>,

        #[arg(long, env = "PCRDB_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    }

    #[derive(Subcommand, Debug)]
    enum Command {
        /// Sign in and print the issued token.
        Login,
        /// Show the current account's role and status.
        Me,
        /// Clan name and rank history.
        ClanHistory {
            #[arg(long)]
            clan_id: Option<String>,
            #[arg(long)]
            clan_name: Option<String>,
        },
        /// Clan members for a month.
        ClanMembers {
            #[arg(long)]
            clan_id: Option<String>,
            #[arg(long)]
            clan_name: Option<String>,
            #[arg(long)]
            period: Option<String>,
        },
        /// Top ranked clans for a month.
        TopClans {
            #[arg(long)]
            period: Option<String>,
            #[arg(long)]
            limit: Option<u32>,
        },
        /// Days with profile snapshots.
        ProfileDates,
        /// Player profiles for a day, sorted by a column (descending).
        Profiles {
            #[arg(long)]
            date: Option<String>,
            #[arg(long)]
            clan_id: Option<String>,
            #[arg(long)]
            sort: Option<String>,
        },
        /// Months with player data.
        PlayerPeriods,
        /// Clan membership history for one player.
        PlayerHistory { viewer_id: String },
        /// Search players by name.
        PlayerSearch {
            name: String,
            #[arg(long)]
            period: Option<String>,
        },
        /// Grand arena winning ranking.
        Grand {
            #[arg(long, default_value_t = 0)]
            group: u32,
            #[arg(long, default_value_t = pcrdb_client::config::GRAND_DEFAULT_LIMIT)]
            limit: u32,
        },
        /// Snapshot dates and times of the running clan battle.
        BattleTimes,
        /// Archived clan battle months.
        BattlePeriods,
        /// Clan battle ranking search. Uses the latest snapshot unless a month is given.
        Battle {
            /// Archived month to search instead of the running battle.
            #[arg(long)]
            history: Option<String>,
            #[arg(long)]
            date: Option<String>,
            #[arg(long)]
            time: Option<String>,
            #[arg(long, default_value = "")]
            search: String,
            #[arg(long, default_value_t = 0)]
            page: u32,
            /// Query score lines instead of the ranking.
            #[arg(long)]
            scoreline: bool,
        },
        /// List accounts (admin).
        AdminUsers,
        /// Approve a pending account (admin).
        AdminApprove { user_id: i64 },
        /// API call statistics, overall or for one user (admin).
        AdminStats {
            #[arg(long)]
            user_id: Option<i64>,
        },
    }

    pub async fn run() -> ExitCode {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
            .with_writer(std::io::stderr)
            .init();

        let cli = Cli::parse();
        let mut config = ClientConfig::from_env();
        if let Some(base) = cli.api_base {
            config.api_base = base;
        }
        if let Some(base) = cli.battle_api_base {
            config.battle_api_base = base;
        }

        let storage = match &cli.auth.token {
            Some(token) => MemoryStore::with_entries([
                (STORAGE_KEY_TOKEN, token.as_str()),
                (STORAGE_KEY_USERNAME, "cli"),
            ]),
            None => MemoryStore::new(),
        };
        let app = App::native(config, Rc::new(storage));

        if let Err(message) = sign_in(&app, &cli.auth).await {
            tracing::error!("{message}");
            return ExitCode::FAILURE;
        }

        match execute(&app, cli.command).await {
            Ok(output) => match serde_json::to_string_pretty(&output) {
                Ok(text) => {
                    println!("{text}");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to render output");
                    ExitCode::FAILURE
                }
            },
            Err(message) => {
                tracing::error!("{message}");
                ExitCode::FAILURE
            }
        }
    }

    async fn sign_in(app: &App, auth: &AuthArgs) -> Result<(), String> {
        if let (Some(login_id), Some(password)) = (&auth.login_id, &auth.password) {
            return app
                .login(login_id, password)
                .await
                .map_err(|_| app.session.snapshot().error);
        }
        if app.session.restore_from_storage() {
            app.session.refresh_status().await;
        }
        Ok(())
    }

    fn checked(error: String, output: Value) -> Result<Value, String> {
        if error.is_empty() { Ok(output) } else { Err(error) }
    }

    async fn execute(app: &App, command: Command) -> Result<Value, String> {
        let admin_only = matches!(
            command,
            Command::AdminUsers | Command::AdminApprove { .. } | Command::AdminStats { .. }
        );
        if admin_only && !app.session.is_admin() {
            return Err("administrator role required".into());
        }

        match command {
            Command::Login => {
                let session = app.session.snapshot();
                if !session.is_logged_in {
                    return Err("--login-id and --password are required".into());
                }
                Ok(json!({
                    "username": session.username,
                    "token": session.token,
                    "role": session.role,
                    "status": session.status,
                }))
            }
            Command::Me => {
                let session = app.session.snapshot();
                if !session.is_logged_in {
                    return Err("not signed in".into());
                }
                Ok(json!({
                    "username": session.username,
                    "role": session.role,
                    "status": session.status,
                }))
            }
            Command::ClanHistory { clan_id, clan_name } => {
                app.clan
                    .search_history(
                        clan_id.as_deref().unwrap_or_default(),
                        clan_name.as_deref().unwrap_or_default(),
                    )
                    .await;
                app.clan.state().with(|s| {
                    checked(s.error.clone(), s.history.clone().unwrap_or(Value::Null))
                })
            }
            Command::ClanMembers {
                clan_id,
                clan_name,
                period,
            } => {
                app.clan
                    .load_members(
                        clan_id.as_deref().unwrap_or_default(),
                        clan_name.as_deref().unwrap_or_default(),
                        period.as_deref(),
                    )
                    .await;
                app.clan.state().with(|s| {
                    checked(s.error.clone(), s.members.clone().unwrap_or(Value::Null))
                })
            }
            Command::TopClans { period, limit } => {
                app.clan.load_top_clans(period.as_deref(), limit).await;
                app.clan.state().with(|s| {
                    checked(s.error.clone(), s.top_clans.clone().unwrap_or(Value::Null))
                })
            }
            Command::ProfileDates => {
                app.clan.load_profile_dates().await;
                app.clan
                    .state()
                    .with(|s| checked(s.error.clone(), json!(s.profile_dates)))
            }
            Command::Profiles {
                date,
                clan_id,
                sort,
            } => {
                app.clan
                    .load_profiles(date.as_deref(), clan_id.as_deref())
                    .await;
                if let Some(column) = sort {
                    app.clan.sort_profiles(&column, true);
                }
                app.clan.state().with(|s| {
                    let mut output = s.profile_meta.clone().unwrap_or_else(|| json!({}));
                    if let Some(meta) = output.as_object_mut() {
                        meta.insert("players".into(), json!(s.profiles.entries));
                        meta.insert(
                            "duplicate_ids".into(),
                            json!(s.profiles.duplicate_count),
                        );
                    }
                    checked(s.error.clone(), output)
                })
            }
            Command::PlayerPeriods => {
                app.player.load_periods().await;
                app.player
                    .state()
                    .with(|s| checked(s.error.clone(), json!(s.period_options)))
            }
            Command::PlayerHistory { viewer_id } => {
                app.player.search_history(&viewer_id).await;
                app.player.state().with(|s| {
                    checked(s.error.clone(), s.history.clone().unwrap_or(Value::Null))
                })
            }
            Command::PlayerSearch { name, period } => {
                if let Some(period) = period {
                    app.player.select_period(&period);
                }
                app.player.search(&name).await;
                app.player
                    .state()
                    .with(|s| checked(s.error.clone(), json!(s.search_results)))
            }
            Command::Grand { group, limit } => {
                app.grand.set_filter(group, limit);
                app.grand.search_winning().await;
                app.grand
                    .state()
                    .with(|s| checked(s.error.clone(), json!(s.results)))
            }
            Command::BattleTimes => {
                app.clan_battle.load_current_times().await;
                Ok(app.clan_battle.state().with(|s| json!(s.time_data)))
            }
            Command::BattlePeriods => {
                app.clan_battle.load_history_periods().await;
                Ok(app.clan_battle.state().with(|s| json!(s.history_periods)))
            }
            Command::Battle {
                history,
                date,
                time,
                search,
                page,
                scoreline,
            } => {
                let battle = &app.clan_battle;
                match history {
                    Some(period) => {
                        battle.set_mode(BattleMode::History);
                        battle.select_history(&period);
                    }
                    None => {
                        battle.load_current_times().await;
                        if let Some(date) = date {
                            battle.select_date(&date);
                        }
                        if let Some(time) = time {
                            battle.select_time(&time);
                        }
                    }
                }
                battle.set_search_text(&search);
                if scoreline {
                    battle.search_scoreline().await;
                } else {
                    battle.search(page).await;
                }
                battle.state().with(|s| {
                    checked(
                        s.error.clone(),
                        json!({
                            "filename": s.filename(),
                            "page": s.page,
                            "max_page": s.max_page,
                            "results": s.results,
                        }),
                    )
                })
            }
            Command::AdminUsers => {
                app.select_tab(pcrdb_client::Tab::Admin).await;
                app.admin
                    .state()
                    .with(|s| checked(s.error.clone(), json!(s.users)))
            }
            Command::AdminApprove { user_id } => {
                app.admin
                    .approve_user(user_id)
                    .await
                    .map_err(|e| e.user_message())?;
                Ok(json!({ "approved": user_id }))
            }
            Command::AdminStats { user_id } => match user_id {
                Some(user_id) => {
                    app.admin.load_api_stats_for(user_id).await;
                    app.admin.state().with(|s| {
                        checked(s.error.clone(), s.api_detail.clone().unwrap_or(Value::Null))
                    })
                }
                None => {
                    app.admin.load_api_stats().await;
                    app.admin
                        .state()
                        .with(|s| checked(s.error.clone(), json!(s.api_stats)))
                }
            },
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[tokio::main(flavor = "current_thread")]
async fn main() -> std::process::ExitCode {
    tokio::task::LocalSet::new().run_until(cli::run()).await
}
