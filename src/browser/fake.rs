//! Scripted in-memory page for tests

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{
    BrowserError, BrowserResult, ConsoleMessage, NetworkEntry, Page, PageFactory, Selector,
};

/// Side effect applied when an element is clicked
#[derive(Clone, Debug)]
pub enum Effect {
    Show(String, String),
    Hide(String),
    Url(String),
    Body(String),
    Close,
}

#[derive(Clone, Debug, Default)]
struct FakeElement {
    visible: bool,
    texts: VecDeque<String>,
}

#[derive(Default)]
struct FakeState {
    url: String,
    title: String,
    body: String,
    elements: HashMap<Selector, FakeElement>,
    click_effects: HashMap<Selector, Vec<Effect>>,
    goto_effects: Vec<Effect>,
    rows: HashMap<Selector, Vec<Vec<String>>>,
    console: Vec<ConsoleMessage>,
    clicks: Vec<Selector>,
    fills: Vec<(Selector, String)>,
    uploads: Vec<(Selector, PathBuf)>,
    visits: Vec<String>,
    closed: bool,
}

impl FakeState {
    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::Show(sel, text) => {
                let element = self.elements.entry(sel_of(&sel)).or_default();
                element.visible = true;
                element.texts = VecDeque::from([text]);
            }
            Effect::Hide(sel) => {
                if let Some(element) = self.elements.get_mut(&sel_of(&sel)) {
                    element.visible = false;
                }
            }
            Effect::Url(url) => self.url = url,
            Effect::Body(body) => self.body = body,
            Effect::Close => self.closed = true,
        }
    }

    fn visible(&self, selector: &Selector) -> bool {
        self.elements.get(selector).is_some_and(|e| e.visible)
    }
}

fn sel_of(raw: &str) -> Selector {
    Selector::parse(raw).expect("valid selector in test fixture")
}

/// In-memory page whose DOM is a map of selectors to visible elements
#[derive(Default)]
pub struct FakePage {
    state: Mutex<FakeState>,
}

impl FakePage {
    pub fn new(url: &str) -> Self {
        let page = Self::default();
        page.lock().url = url.to_string();
        page
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake page state")
    }

    /// Visible element with fixed text
    pub fn element(self, selector: &str, text: &str) -> Self {
        self.text_sequence(selector, &[text])
    }

    /// Visible element whose text advances on each read, the last one sticks
    pub fn text_sequence(self, selector: &str, texts: &[&str]) -> Self {
        self.lock().elements.insert(
            sel_of(selector),
            FakeElement {
                visible: true,
                texts: texts.iter().map(|t| t.to_string()).collect(),
            },
        );
        self
    }

    pub fn hidden(self, selector: &str) -> Self {
        self.lock()
            .elements
            .insert(sel_of(selector), FakeElement::default());
        self
    }

    pub fn on_click(self, selector: &str, effect: Effect) -> Self {
        self.lock()
            .click_effects
            .entry(sel_of(selector))
            .or_default()
            .push(effect);
        self
    }

    pub fn on_goto(self, effect: Effect) -> Self {
        self.lock().goto_effects.push(effect);
        self
    }

    pub fn rows(self, selector: &str, rows: &[&[&str]]) -> Self {
        self.lock().rows.insert(
            sel_of(selector),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        );
        self
    }

    pub fn body(self, body: &str) -> Self {
        self.lock().body = body.to_string();
        self
    }

    pub fn console(self, level: &str, message: &str) -> Self {
        self.lock().console.push(ConsoleMessage {
            level: level.to_string(),
            message: message.to_string(),
            timestamp: "2024-01-01T00:00:00Z".to_string(),
        });
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn clicks(&self) -> Vec<Selector> {
        self.lock().clicks.clone()
    }

    pub fn fills(&self) -> Vec<(Selector, String)> {
        self.lock().fills.clone()
    }

    pub fn uploads(&self) -> Vec<(Selector, PathBuf)> {
        self.lock().uploads.clone()
    }

    pub fn visits(&self) -> Vec<String> {
        self.lock().visits.clone()
    }

    pub fn clicked(&self, selector: &str) -> bool {
        self.lock().clicks.contains(&sel_of(selector))
    }

    pub fn value_of(&self, selector: &str) -> Option<String> {
        let sel = sel_of(selector);
        self.lock()
            .fills
            .iter()
            .rev()
            .find(|(s, _)| *s == sel)
            .map(|(_, v)| v.clone())
    }

    pub fn set_closed(&self) {
        self.lock().closed = true;
    }

    fn check_open(state: &FakeState) -> BrowserResult<()> {
        if state.closed {
            Err(BrowserError::SessionClosed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Page for FakePage {
    async fn goto(&self, url: &str) -> BrowserResult<()> {
        let mut state = self.lock();
        Self::check_open(&state)?;
        state.url = url.to_string();
        state.visits.push(url.to_string());
        let effects = state.goto_effects.clone();
        for effect in effects {
            state.apply(effect);
        }
        Ok(())
    }

    async fn current_url(&self) -> BrowserResult<String> {
        let state = self.lock();
        Self::check_open(&state)?;
        Ok(state.url.clone())
    }

    async fn title(&self) -> BrowserResult<String> {
        Ok(self.lock().title.clone())
    }

    async fn count_visible(&self, selector: &Selector) -> BrowserResult<usize> {
        let state = self.lock();
        Self::check_open(&state)?;
        Ok(usize::from(state.visible(selector)))
    }

    async fn click(&self, selector: &Selector) -> BrowserResult<()> {
        let mut state = self.lock();
        Self::check_open(&state)?;
        if !state.visible(selector) {
            return Err(BrowserError::not_found(selector));
        }
        state.clicks.push(selector.clone());
        let effects = state.click_effects.get(selector).cloned().unwrap_or_default();
        for effect in effects {
            state.apply(effect);
        }
        Ok(())
    }

    async fn fill(&self, selector: &Selector, value: &str) -> BrowserResult<()> {
        let mut state = self.lock();
        Self::check_open(&state)?;
        if !state.visible(selector) {
            return Err(BrowserError::not_found(selector));
        }
        state.fills.push((selector.clone(), value.to_string()));
        Ok(())
    }

    async fn upload(&self, selector: &Selector, path: &Path) -> BrowserResult<()> {
        let mut state = self.lock();
        Self::check_open(&state)?;
        if !state.elements.contains_key(selector) {
            return Err(BrowserError::not_found(selector));
        }
        state.uploads.push((selector.clone(), path.to_path_buf()));
        Ok(())
    }

    async fn texts(&self, selector: &Selector) -> BrowserResult<Vec<String>> {
        let mut state = self.lock();
        Self::check_open(&state)?;
        match state.elements.get_mut(selector) {
            Some(element) if element.visible => {
                let text = if element.texts.len() > 1 {
                    element.texts.pop_front().unwrap_or_default()
                } else {
                    element.texts.front().cloned().unwrap_or_default()
                };
                Ok(vec![text])
            }
            _ => Ok(Vec::new()),
        }
    }

    async fn row_cells(&self, rows: &Selector) -> BrowserResult<Vec<Vec<String>>> {
        let state = self.lock();
        Self::check_open(&state)?;
        Ok(state.rows.get(rows).cloned().unwrap_or_default())
    }

    async fn body_text(&self) -> BrowserResult<String> {
        let state = self.lock();
        Self::check_open(&state)?;
        Ok(state.body.clone())
    }

    async fn content(&self) -> BrowserResult<String> {
        let state = self.lock();
        Ok(format!("<html><body>{}</body></html>", state.body))
    }

    async fn screenshot(&self) -> BrowserResult<Vec<u8>> {
        let state = self.lock();
        Self::check_open(&state)?;
        Ok(b"\x89PNG\r\n\x1a\nfake".to_vec())
    }

    async fn console_messages(&self) -> BrowserResult<Vec<ConsoleMessage>> {
        Ok(self.lock().console.clone())
    }

    async fn network_entries(&self) -> BrowserResult<Vec<NetworkEntry>> {
        Ok(vec![NetworkEntry {
            name: format!("{}/api/ping", self.lock().url),
            initiator_type: "fetch".to_string(),
            duration_ms: 12.5,
            transfer_size: 128,
            start_time_ms: 3.0,
        }])
    }

    async fn is_closed(&self) -> bool {
        self.lock().closed
    }

    async fn close(&self) -> BrowserResult<()> {
        self.lock().closed = true;
        Ok(())
    }
}

/// Hands out pre-built pages in order, failing once they run out
pub struct FakeFactory {
    pages: Mutex<VecDeque<Arc<FakePage>>>,
}

impl FakeFactory {
    pub fn new(pages: Vec<Arc<FakePage>>) -> Self {
        Self {
            pages: Mutex::new(pages.into()),
        }
    }
}

#[async_trait]
impl PageFactory for FakeFactory {
    async fn open(&self) -> BrowserResult<Arc<dyn Page>> {
        let page = self
            .pages
            .lock()
            .expect("fake factory state")
            .pop_front()
            .ok_or_else(|| BrowserError::Launch("no more fake pages".to_string()))?;
        Ok(page)
    }
}
