//! Scripted collaborators for unit tests

use crate::ai::{GenerateContentRequest, GenerateContentResponse, GenerativeModel};
use crate::backend::InMemoryBackend;
use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::market::types::{decode_news, Candle, NewsItem, Profile, Quote};
use crate::market::MarketDataProvider;
use crate::state::AppState;
use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::oneshot;

/// Quote with the given current price and previous close
pub fn quote(current: f64, previous_close: f64) -> Quote {
    Quote {
        current_price: Some(current),
        previous_close: Some(previous_close),
        change: Some(current - previous_close),
        ..Quote::default()
    }
}

/// Array payload of `count` articles titled "Headline N", newest first
pub fn news_payload(count: usize) -> Value {
    Value::Array(
        (0..count)
            .map(|i| {
                json!({
                    "id": i,
                    "headline": format!("Headline {}", i),
                    "source": "Reuters",
                    "datetime": 1_700_000_000 - i as i64 * 3600,
                    "url": format!("https://example.com/{}", i),
                    "related": "AAPL",
                })
            })
            .collect(),
    )
}

#[derive(Default)]
struct Script {
    quotes: HashMap<String, Quote>,
    profiles: HashMap<String, Profile>,
    candles: HashMap<String, Vec<Candle>>,
    news: HashMap<String, Value>,
    market_news: Option<Value>,
    candle_failures: HashMap<String, String>,
    news_failures: HashMap<String, String>,
    market_news_failure: Option<String>,
    quote_gates: HashMap<String, oneshot::Receiver<()>>,
    news_gates: HashMap<String, oneshot::Receiver<()>>,
    quote_calls: HashMap<String, usize>,
    news_calls: HashMap<String, usize>,
}

/// Market data provider answering from a script
#[derive(Default)]
pub struct ScriptedMarketData {
    script: Mutex<Script>,
}

impl ScriptedMarketData {
    pub fn set_quote(&self, symbol: &str, quote: Quote) {
        self.script.lock().quotes.insert(symbol.to_string(), quote);
    }

    pub fn set_profile(&self, symbol: &str, profile: Profile) {
        self.script.lock().profiles.insert(symbol.to_string(), profile);
    }

    pub fn set_candles(&self, symbol: &str, candles: Vec<Candle>) {
        self.script.lock().candles.insert(symbol.to_string(), candles);
    }

    /// Raw company news payload, decoded like a provider response
    pub fn set_news(&self, symbol: &str, payload: Value) {
        self.script.lock().news.insert(symbol.to_string(), payload);
    }

    pub fn set_market_news(&self, payload: Value) {
        let mut script = self.script.lock();
        script.market_news = Some(payload);
        script.market_news_failure = None;
    }

    pub fn fail_candles(&self, symbol: &str, message: &str) {
        self.script.lock().candle_failures.insert(symbol.to_string(), message.to_string());
    }

    pub fn fail_news(&self, symbol: &str, message: &str) {
        self.script.lock().news_failures.insert(symbol.to_string(), message.to_string());
    }

    pub fn fail_market_news(&self, message: &str) {
        self.script.lock().market_news_failure = Some(message.to_string());
    }

    /// Hold the next quote for `symbol` until the returned sender fires
    pub fn gate_quote(&self, symbol: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.script.lock().quote_gates.insert(symbol.to_string(), rx);
        tx
    }

    /// Hold the next company news for `symbol` until the returned sender fires
    pub fn gate_news(&self, symbol: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.script.lock().news_gates.insert(symbol.to_string(), rx);
        tx
    }

    pub fn quote_calls(&self, symbol: &str) -> usize {
        self.script.lock().quote_calls.get(symbol).copied().unwrap_or(0)
    }

    pub fn news_calls(&self, symbol: &str) -> usize {
        self.script.lock().news_calls.get(symbol).copied().unwrap_or(0)
    }
}

#[async_trait]
impl MarketDataProvider for ScriptedMarketData {
    fn id(&self) -> &'static str {
        "scripted"
    }

    async fn quote(&self, symbol: &str) -> Result<Quote> {
        let gate = {
            let mut script = self.script.lock();
            *script.quote_calls.entry(symbol.to_string()).or_default() += 1;
            script.quote_gates.remove(symbol)
        };
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        Ok(self.script.lock().quotes.get(symbol).cloned().unwrap_or_default())
    }

    async fn profile(&self, symbol: &str) -> Result<Option<Profile>> {
        Ok(self.script.lock().profiles.get(symbol).cloned())
    }

    async fn daily_candles(&self, symbol: &str, _from: i64, _to: i64) -> Result<Vec<Candle>> {
        let script = self.script.lock();
        if let Some(message) = script.candle_failures.get(symbol) {
            return Err(AppError::Provider(message.clone()));
        }
        Ok(script.candles.get(symbol).cloned().unwrap_or_default())
    }

    async fn company_news(
        &self,
        symbol: &str,
        _from: NaiveDate,
        _to: NaiveDate,
    ) -> Result<Vec<NewsItem>> {
        let gate = {
            let mut script = self.script.lock();
            *script.news_calls.entry(symbol.to_string()).or_default() += 1;
            script.news_gates.remove(symbol)
        };
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        let script = self.script.lock();
        if let Some(message) = script.news_failures.get(symbol) {
            return Err(AppError::Provider(message.clone()));
        }
        Ok(decode_news(script.news.get(symbol).cloned().unwrap_or(Value::Null)))
    }

    async fn market_news(&self, _category: &str) -> Result<Vec<NewsItem>> {
        let script = self.script.lock();
        if let Some(message) = &script.market_news_failure {
            return Err(AppError::Provider(message.clone()));
        }
        Ok(decode_news(script.market_news.clone().unwrap_or(Value::Null)))
    }
}

/// Generative model replaying queued responses and recording requests
#[derive(Default)]
pub struct ScriptedModel {
    responses: Mutex<VecDeque<Result<GenerateContentResponse>>>,
    requests: Mutex<Vec<GenerateContentRequest>>,
    gates: Mutex<Vec<(String, oneshot::Receiver<()>)>>,
}

impl ScriptedModel {
    pub fn push_text(&self, text: &str) {
        self.responses
            .lock()
            .push_back(Ok(GenerateContentResponse::from_text(text)));
    }

    pub fn push_error(&self, message: &str) {
        self.responses
            .lock()
            .push_back(Err(AppError::Ai(message.to_string())));
    }

    /// Hold the reply to the next prompt containing `needle` until the sender fires
    pub fn gate_prompt(&self, needle: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().push((needle.to_string(), rx));
        tx
    }

    pub fn requests(&self) -> Vec<GenerateContentRequest> {
        self.requests.lock().clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .iter()
            .filter_map(|r| r.prompt_text().map(str::to_string))
            .collect()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn generate_content(
        &self,
        request: GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let prompt = request.prompt_text().unwrap_or_default().to_string();
        self.requests.lock().push(request);
        let response = self
            .responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(GenerateContentResponse::default()));

        let gate = {
            let mut gates = self.gates.lock();
            let found = gates.iter().position(|(needle, _)| prompt.contains(needle.as_str()));
            found.map(|i| gates.remove(i).1)
        };
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        response
    }
}

/// State wired to scripted collaborators, with handles to each of them
pub struct TestHarness {
    pub state: Arc<AppState>,
    pub market: Arc<ScriptedMarketData>,
    pub model: Arc<ScriptedModel>,
    pub backend: Arc<InMemoryBackend>,
}

pub fn test_state() -> TestHarness {
    test_state_with(|_| {})
}

pub fn test_state_with(configure: impl FnOnce(&mut AppConfig)) -> TestHarness {
    let mut config = AppConfig::new_for_testing();
    configure(&mut config);

    let market = Arc::new(ScriptedMarketData::default());
    let model = Arc::new(ScriptedModel::default());
    let backend = Arc::new(InMemoryBackend::new());

    let state = Arc::new(AppState::with_providers(
        config,
        market.clone(),
        model.clone(),
        backend.clone(),
    ));

    TestHarness {
        state,
        market,
        model,
        backend,
    }
}
