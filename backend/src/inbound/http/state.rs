//! Shared HTTP adapter state.
//!
//! Handlers receive this through `web::Data` and only see driving ports, so
//! they can be exercised with mocks and fixtures without any I/O.

use std::sync::Arc;

use mockable::Clock;

use crate::domain::ports::{
    AccountCommand, AccountQuery, BillingAdminCommand, BillingQuery, CurriculumCommand,
    CurriculumQuery, DashboardQuery, IdentityProvider, PaymentCommand, ProgressCommand,
    ProgressQuery, QuestCommand, QuestEvents, QuestQuery, Repositories, ShopCommand, ShopQuery,
    SpeechCommand, TextToSpeechSource, UserQuestCommand,
};
use crate::domain::{
    AccountService, BillingService, CurriculumService, DashboardService, ProgressService,
    QuestService, ShopService, SpeechService,
};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub identity: Arc<dyn IdentityProvider>,
    pub accounts: Arc<dyn AccountCommand>,
    pub accounts_query: Arc<dyn AccountQuery>,
    pub curriculum: Arc<dyn CurriculumCommand>,
    pub curriculum_query: Arc<dyn CurriculumQuery>,
    pub progress: Arc<dyn ProgressCommand>,
    pub progress_query: Arc<dyn ProgressQuery>,
    pub quests: Arc<dyn QuestCommand>,
    pub quests_query: Arc<dyn QuestQuery>,
    pub user_quests: Arc<dyn UserQuestCommand>,
    pub shop: Arc<dyn ShopCommand>,
    pub shop_query: Arc<dyn ShopQuery>,
    pub billing_admin: Arc<dyn BillingAdminCommand>,
    pub payments: Arc<dyn PaymentCommand>,
    pub billing_query: Arc<dyn BillingQuery>,
    pub dashboard: Arc<dyn DashboardQuery>,
    pub speech: Arc<dyn SpeechCommand>,
}

impl HttpState {
    /// Wire the domain services over one set of repositories.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    ///
    /// use lingo::domain::ports::{FixtureTextToSpeechSource, Repositories};
    /// use lingo::inbound::http::state::HttpState;
    /// use lingo::outbound::identity::FixtureIdentityProvider;
    /// use mockable::DefaultClock;
    ///
    /// let state = HttpState::from_repositories(
    ///     Repositories::fixtures(),
    ///     Arc::new(FixtureIdentityProvider),
    ///     Arc::new(FixtureTextToSpeechSource),
    ///     Arc::new(DefaultClock),
    /// );
    /// let _speech = state.speech.clone();
    /// ```
    pub fn from_repositories(
        repos: Repositories,
        identity: Arc<dyn IdentityProvider>,
        speech_source: Arc<dyn TextToSpeechSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let accounts = Arc::new(AccountService::new(repos.clone(), Arc::clone(&clock)));
        let curriculum = Arc::new(CurriculumService::new(repos.clone()));
        let quests = Arc::new(QuestService::new(repos.clone(), Arc::clone(&clock)));
        let quest_events: Arc<dyn QuestEvents> = quests.clone();
        let progress = Arc::new(ProgressService::new(
            repos.clone(),
            Arc::clone(&clock),
            Arc::clone(&quest_events),
        ));
        let shop = Arc::new(ShopService::new(
            repos.clone(),
            Arc::clone(&clock),
            quest_events,
        ));
        let billing = Arc::new(BillingService::new(repos.clone(), Arc::clone(&clock)));
        let dashboard = Arc::new(DashboardService::new(repos, clock));

        Self {
            identity,
            accounts: accounts.clone(),
            accounts_query: accounts,
            curriculum: curriculum.clone(),
            curriculum_query: curriculum,
            progress: progress.clone(),
            progress_query: progress,
            quests: quests.clone(),
            quests_query: quests.clone(),
            user_quests: quests,
            shop: shop.clone(),
            shop_query: shop,
            billing_admin: billing.clone(),
            payments: billing.clone(),
            billing_query: billing,
            dashboard,
            speech: Arc::new(SpeechService::new(speech_source)),
        }
    }
}
