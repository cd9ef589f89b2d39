//! Test fixtures shared by the integration suites.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;

use auraforming::models::agent::{AgentRecord, AgentSchema, StoredField};
use auraforming::models::settings::SpeechSettings;
use auraforming::services::document::{
    DocumentFiller, DocumentInspector, FilledDocument, InspectedField,
};
use auraforming::services::ElevenLabsClient;
use auraforming::storage::{ConfigService, Database};
use auraforming::utils::paths::{ensure_data_layout, uploads_dir};
use auraforming::{AppError, AppResult, AppServices, AppState};
use auraforming_llm::{LlmError, LlmProvider, LlmRequestOptions, LlmResult, ProviderConfig};

// ============================================================================
// Scripted oracle
// ============================================================================

/// Oracle that replays queued replies in order.
///
/// Each call can be made to take a while, and the provider records how many
/// calls were running at once.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<LlmResult<Value>>>,
    prompts: Mutex<Vec<String>>,
    latency_ms: AtomicU64,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    reachable: AtomicBool,
    config: ProviderConfig,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
            latency_ms: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            reachable: AtomicBool::new(true),
            config: ProviderConfig::default(),
        }
    }

    /// Make every later call take `latency` before answering
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms.store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Most calls that were ever running at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn reply(&self, value: Value) {
        self.replies.lock().unwrap().push_back(Ok(value));
    }

    pub fn fail(&self, error: LlmError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn generate_json(
        &self,
        prompt: &str,
        _schema: &Value,
        _request_options: LlmRequestOptions,
    ) -> LlmResult<Value> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        tokio::task::yield_now().await;

        let reply = self.replies.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(LlmError::Other {
                message: "no scripted reply left".to_string(),
            })
        });
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        reply
    }

    async fn health_check(&self) -> LlmResult<()> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(LlmError::NetworkError {
                message: "connection refused".to_string(),
            })
        }
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

/// Oracle verdict with the given intent and adequacy
pub fn verdict(intent: &str, adequate: bool, value: &str, response: &str) -> Value {
    json!({
        "intent": intent,
        "is_answer_adequate": adequate,
        "normalized_value": value,
        "collected_values": [],
        "assistant_response": response,
    })
}

/// Adequate data verdict
pub fn data(value: &str) -> Value {
    verdict("data", true, value, "")
}

/// Questions reply for the question writer
pub fn questions(texts: &[&str]) -> Value {
    json!({ "questions": texts })
}

/// Adequate verdict for a field group
pub fn group_data(values: &[&str]) -> Value {
    json!({
        "intent": "data",
        "is_answer_adequate": true,
        "normalized_value": values.join(", "),
        "collected_values": values,
        "assistant_response": "",
    })
}

// ============================================================================
// Documents
// ============================================================================

/// Inspector that reports a fixed field list
pub struct StaticInspector {
    fields: Vec<StoredField>,
}

impl DocumentInspector for StaticInspector {
    fn inspect(&self, _bytes: &[u8]) -> AppResult<Vec<InspectedField>> {
        Ok(self
            .fields
            .iter()
            .map(|f| InspectedField {
                key: f.key.clone(),
                label: Some(f.label.clone()).filter(|l| !l.is_empty()),
                field_type: f.field_type.clone(),
                options: f.options.clone(),
                on_state: None,
            })
            .collect())
    }
}

/// Filler that writes the answers as JSON instead of a PDF
pub struct JsonFiller;

impl DocumentFiller for JsonFiller {
    fn fill(&self, _bytes: &[u8], values: &BTreeMap<String, String>) -> AppResult<FilledDocument> {
        Ok(FilledDocument {
            bytes: serde_json::to_vec(values)?,
            filled: values.keys().cloned().collect(),
            missing: Vec::new(),
        })
    }
}

/// Filler that always fails
pub struct BrokenFiller;

impl DocumentFiller for BrokenFiller {
    fn fill(&self, _bytes: &[u8], _values: &BTreeMap<String, String>) -> AppResult<FilledDocument> {
        Err(AppError::document("Document has no AcroForm"))
    }
}

// ============================================================================
// Harness
// ============================================================================

pub fn field(key: &str, label: &str, field_type: &str, options: &[&str]) -> StoredField {
    StoredField {
        key: key.to_string(),
        label: label.to_string(),
        field_type: field_type.to_string(),
        options: options.iter().map(|o| o.to_string()).collect(),
    }
}

/// `[name: Text, state: SingleChoice{CA,NY,TX}, subscribe: Boolean]`
pub fn contact_form() -> Vec<StoredField> {
    vec![
        field("name", "", "Text", &[]),
        field("state", "", "ComboBox", &["CA", "NY", "TX"]),
        field("subscribe", "", "CheckBox", &[]),
    ]
}

/// Checkbox group followed by a text field
pub fn ethnicity_form() -> Vec<StoredField> {
    vec![
        field("ethnicity[0]", "Hispanic", "CheckBox", &[]),
        field("ethnicity[1]", "Asian", "CheckBox", &[]),
        field("ethnicity[2]", "Other", "CheckBox", &[]),
        field("zip", "", "Text", &[]),
    ]
}

pub struct Harness {
    pub state: Arc<AppState>,
    pub provider: Arc<ScriptedProvider>,
    pub agent: AgentRecord,
    _temp: TempDir,
}

impl Harness {
    pub fn new(fields: Vec<StoredField>) -> Self {
        Self::with_filler(fields, Arc::new(JsonFiller))
    }

    pub fn with_filler(fields: Vec<StoredField>, filler: Arc<dyn DocumentFiller>) -> Self {
        let temp = tempfile::tempdir().unwrap();
        let data_dir = temp.path().join("data");
        let config = ConfigService::open(&data_dir).unwrap();
        let data_dir = config.get_config().data_dir.clone();
        ensure_data_layout(&data_dir).unwrap();

        let source = uploads_dir(&data_dir).join("source.pdf");
        std::fs::write(&source, b"%PDF-1.4 test source").unwrap();

        let database = Arc::new(Database::new_in_memory().unwrap());
        let agent = AgentRecord::create(
            "Contact intake",
            source.to_string_lossy().to_string(),
            AgentSchema::from_fields(&fields),
        );
        database.insert_agent(&agent).unwrap();

        let provider = Arc::new(ScriptedProvider::new());
        let speech = Arc::new(ElevenLabsClient::new(None, SpeechSettings::default(), None).unwrap());

        let state = Arc::new(AppState::from_services(AppServices {
            config,
            database,
            provider: provider.clone(),
            inspector: Arc::new(StaticInspector { fields }),
            filler,
            stt: speech.clone(),
            tts: speech,
            oracle_configured: true,
        }));

        Self {
            state,
            provider,
            agent,
            _temp: temp,
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.agent.agent_id
    }

    /// Start an interview and return its session id
    pub fn start(&self) -> String {
        self.state
            .interviews()
            .start_interview(self.agent_id(), None)
            .unwrap()
            .session_id
    }

    /// Queue `reply` and submit `utterance`
    pub async fn turn(
        &self,
        session_id: &str,
        utterance: &str,
        reply: Value,
    ) -> AppResult<auraforming::models::interview::TurnResponse> {
        self.provider.reply(reply);
        self.state
            .interviews()
            .submit_turn(self.agent_id(), session_id, utterance, false)
            .await
    }
}
