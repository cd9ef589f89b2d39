//! Application State
//!
//! Shared state handed to every HTTP handler, containing all services.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::RwLock;

use auraforming_llm::{create_provider, LlmProvider};

use crate::models::settings::{AppConfig, Secrets};
use crate::services::document::{AcroFormDocument, DocumentFiller, DocumentInspector};
use crate::services::interview::{
    InMemorySessionStore, InterviewManager, QuestionWriter, SessionFinalizer, SessionStore,
    TurnEvaluator,
};
use crate::services::speech::{ElevenLabsClient, SpeechToText, TextToSpeech};
use crate::storage::{ConfigService, Database};
use crate::utils::error::AppResult;
use crate::utils::paths::{database_path, ensure_data_layout};

/// Collaborators the state is assembled from
pub struct AppServices {
    pub config: ConfigService,
    pub database: Arc<Database>,
    pub provider: Arc<dyn LlmProvider>,
    pub inspector: Arc<dyn DocumentInspector>,
    pub filler: Arc<dyn DocumentFiller>,
    pub stt: Arc<dyn SpeechToText>,
    pub tts: Arc<dyn TextToSpeech>,
    pub oracle_configured: bool,
}

/// Application state shared by all handlers
pub struct AppState {
    /// Configuration service for app settings
    config: Arc<RwLock<ConfigService>>,
    /// SQLite database with connection pool
    database: Arc<Database>,
    interviews: Arc<InterviewManager>,
    oracle: Arc<dyn LlmProvider>,
    inspector: Arc<dyn DocumentInspector>,
    stt: Arc<dyn SpeechToText>,
    tts: Arc<dyn TextToSpeech>,
    data_dir: PathBuf,
    oracle_configured: bool,
}

impl AppState {
    /// Build the production state: SQLite under the data directory, the
    /// configured oracle, AcroForm documents and ElevenLabs speech.
    pub fn initialize(config: ConfigService, secrets: &Secrets) -> AppResult<Self> {
        let app_config = config.get_config_clone();
        ensure_data_layout(&app_config.data_dir)?;

        let database = Arc::new(Database::open(&database_path(&app_config.data_dir))?);
        let provider_config = app_config.provider_config(secrets);
        let oracle_configured = provider_config.api_key.is_some();
        let provider = create_provider(provider_config)?;

        let document = Arc::new(AcroFormDocument::new());
        let speech = Arc::new(ElevenLabsClient::new(
            secrets.elevenlabs_api_key.clone(),
            app_config.speech.clone(),
            app_config.proxy.as_ref(),
        )?);

        Ok(Self::from_services(AppServices {
            config,
            database,
            provider,
            inspector: document.clone(),
            filler: document,
            stt: speech.clone(),
            tts: speech,
            oracle_configured,
        }))
    }

    /// Assemble state from explicit collaborators
    pub fn from_services(services: AppServices) -> Self {
        let app_config = services.config.get_config_clone();
        let data_dir = app_config.data_dir.clone();
        let store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
        let finalizer = SessionFinalizer::new(services.database.clone(), services.filler, data_dir.clone());
        let interviews = InterviewManager::new(
            services.database.clone(),
            store,
            TurnEvaluator::new(services.provider.clone()),
            QuestionWriter::new(services.provider.clone()),
            services.inspector.clone(),
            finalizer,
            app_config.default_language,
        );

        Self {
            config: Arc::new(RwLock::new(services.config)),
            database: services.database,
            interviews: Arc::new(interviews),
            oracle: services.provider,
            inspector: services.inspector,
            stt: services.stt,
            tts: services.tts,
            data_dir,
            oracle_configured: services.oracle_configured,
        }
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.database
    }

    pub fn interviews(&self) -> &Arc<InterviewManager> {
        &self.interviews
    }

    pub fn oracle(&self) -> &Arc<dyn LlmProvider> {
        &self.oracle
    }

    pub fn inspector(&self) -> &Arc<dyn DocumentInspector> {
        &self.inspector
    }

    pub fn stt(&self) -> &Arc<dyn SpeechToText> {
        &self.stt
    }

    pub fn tts(&self) -> &Arc<dyn TextToSpeech> {
        &self.tts
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn is_oracle_configured(&self) -> bool {
        self.oracle_configured
    }

    /// Check if database is healthy
    pub fn is_database_healthy(&self) -> bool {
        self.database.is_healthy()
    }

    /// Check if config is healthy
    pub fn is_config_healthy(&self) -> bool {
        // Use try_read to avoid blocking
        match self.config.try_read() {
            Ok(guard) => guard.is_healthy(),
            Err(_) => false,
        }
    }

    /// Get the current configuration
    pub async fn get_config(&self) -> AppConfig {
        self.config.read().await.get_config_clone()
    }
}

