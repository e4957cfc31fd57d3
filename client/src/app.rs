use std::cell::Cell;
use std::rc::Rc;

use crate::admin::AdminPanel;
use crate::clan::ClanQuery;
use crate::clan_battle::ClanBattleQuery;
use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::grand::GrandQuery;
use crate::http::Transport;
use crate::player::PlayerQuery;
use crate::runtime;
use crate::session::SessionStore;
use crate::storage::KeyValueStore;
use crate::store::Store;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Tab {
    Login,
    #[default]
    ClanBattle,
    Clan,
    Grand,
    Player,
    Admin,
}

/// Composition root: owns the session and every query module, wired to one transport
/// and one storage backend. Views bind to the module stores and the current tab.
#[derive(Clone)]
pub struct App {
    pub config: ClientConfig,
    pub session: SessionStore,
    pub clan_battle: ClanBattleQuery,
    pub clan: ClanQuery,
    pub grand: GrandQuery,
    pub player: PlayerQuery,
    pub admin: AdminPanel,
    tab: Store<Tab>,
}

impl App {
    pub fn new(
        config: ClientConfig,
        transport: Rc<dyn Transport>,
        storage: Rc<dyn KeyValueStore>,
    ) -> Self {
        let session = SessionStore::new(config.clone(), Rc::clone(&transport), storage);
        let tab: Store<Tab> = Store::default();

        // Losing the session, by logout or by a 401 anywhere, lands on the login tab.
        let was_logged_in = Cell::new(false);
        let tab_on_logout = tab.clone();
        session.subscribe(move |state| {
            if was_logged_in.replace(state.is_logged_in) && !state.is_logged_in {
                tab_on_logout.update(|t| *t = Tab::Login);
            }
        });

        Self {
            clan_battle: ClanBattleQuery::new(config.clone(), transport),
            clan: ClanQuery::new(config.clone(), session.clone()),
            grand: GrandQuery::new(config.clone(), session.clone()),
            player: PlayerQuery::new(config.clone(), session.clone()),
            admin: AdminPanel::new(config.clone(), session.clone()),
            session,
            config,
            tab,
        }
    }

    #[cfg(target_arch = "wasm32")]
    pub fn browser(config: ClientConfig) -> Self {
        Self::new(
            config,
            Rc::new(crate::http::GlooTransport),
            Rc::new(crate::storage::BrowserStorage),
        )
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn native(config: ClientConfig, storage: Rc<dyn KeyValueStore>) -> Self {
        Self::new(
            config,
            Rc::new(crate::http::ReqwestTransport::default()),
            storage,
        )
    }

    pub fn tab(&self) -> Tab {
        self.tab.get()
    }

    pub fn tab_store(&self) -> &Store<Tab> {
        &self.tab
    }

    /// Startup: restore a persisted session, then refresh its status and load the
    /// clan battle calendar in the background.
    pub fn init(&self) {
        if self.session.restore_from_storage() {
            let session = self.session.clone();
            runtime::spawn_local(async move { session.refresh_status().await });
        }
        let clan_battle = self.clan_battle.clone();
        runtime::spawn_local(async move { clan_battle.load_current_times().await });
    }

    pub async fn login(&self, login_id: &str, password: &str) -> ClientResult<()> {
        self.session.login(login_id, password).await?;
        self.tab.update(|t| *t = Tab::Clan);
        Ok(())
    }

    pub async fn register(
        &self,
        username: &str,
        password: &str,
        contact_id: &str,
    ) -> ClientResult<()> {
        self.session.register(username, password, contact_id).await?;
        self.tab.update(|t| *t = Tab::Clan);
        Ok(())
    }

    pub fn logout(&self) {
        self.session.logout();
    }

    /// Switch tabs. Opening the admin tab as an admin loads the user list.
    pub async fn select_tab(&self, tab: Tab) {
        self.tab.update(|t| *t = tab);
        if tab == Tab::Admin && self.session.is_admin() {
            self.admin.load_users().await;
        }
    }
}
