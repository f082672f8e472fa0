//! Scripted stand-ins for the platform and network collaborators.

use crate::platform::{
    Dialogs, Downloader, FileHandle, FileSelector, PlatformError, SaveFilePicker,
    SavePickerOptions, SelectedFile, WritableFileStream,
};
use crate::worker::cache::{CacheError, CacheStorage, MemoryCacheStorage};
use crate::worker::fetch::{FetchError, Network, Request, Response};
use async_trait::async_trait;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

#[derive(Debug, Default)]
pub struct ScriptedDialogs {
    confirm_answers: VecDeque<bool>,
    prompt_answers: VecDeque<Option<String>>,
    confirms: Vec<String>,
    alerts: Vec<String>,
    prompts: Vec<String>,
}

impl ScriptedDialogs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_confirms(mut self, answers: impl IntoIterator<Item = bool>) -> Self {
        self.confirm_answers.extend(answers);
        self
    }

    pub fn with_prompts(mut self, answers: impl IntoIterator<Item = Option<String>>) -> Self {
        self.prompt_answers.extend(answers);
        self
    }

    pub fn confirms_asked(&self) -> Vec<String> {
        self.confirms.clone()
    }

    pub fn alerts(&self) -> Vec<String> {
        self.alerts.clone()
    }

    pub fn prompts_asked(&self) -> Vec<String> {
        self.prompts.clone()
    }
}

#[async_trait(?Send)]
impl Dialogs for ScriptedDialogs {
    async fn confirm(&mut self, message: &str) -> bool {
        self.confirms.push(message.to_string());
        self.confirm_answers
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected confirm: {message}"))
    }

    async fn alert(&mut self, message: &str) {
        self.alerts.push(message.to_string());
    }

    async fn prompt(&mut self, message: &str, _initial: &str) -> Option<String> {
        self.prompts.push(message.to_string());
        self.prompt_answers
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected prompt: {message}"))
    }
}

#[derive(Debug, Default)]
struct MemoryFileState {
    contents: Option<String>,
    writes: usize,
    revoked: bool,
    no_writable: bool,
}

/// In-memory file handle. Clones share the same backing file.
#[derive(Debug, Clone)]
pub struct MemoryFileHandle {
    name: String,
    state: Rc<RefCell<MemoryFileState>>,
}

impl MemoryFileHandle {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: Rc::default(),
        }
    }

    pub fn revoked(self) -> Self {
        self.revoke();
        self
    }

    pub fn revoke(&self) {
        self.state.borrow_mut().revoked = true;
    }

    pub fn disable_writable(&self) {
        self.state.borrow_mut().no_writable = true;
    }

    pub fn contents(&self) -> Option<String> {
        self.state.borrow().contents.clone()
    }

    pub fn writes(&self) -> usize {
        self.state.borrow().writes
    }
}

#[derive(Debug)]
struct MemoryStream {
    buffer: Vec<u8>,
    state: Rc<RefCell<MemoryFileState>>,
}

#[async_trait(?Send)]
impl WritableFileStream for MemoryStream {
    async fn write(&mut self, data: &[u8]) -> Result<(), PlatformError> {
        self.buffer.extend_from_slice(data);
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), PlatformError> {
        let mut state = self.state.borrow_mut();
        state.contents = Some(String::from_utf8_lossy(&self.buffer).into_owned());
        state.writes += 1;
        Ok(())
    }
}

#[async_trait(?Send)]
impl FileHandle for MemoryFileHandle {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports_writable(&self) -> bool {
        !self.state.borrow().no_writable
    }

    async fn create_writable(&self) -> Result<Box<dyn WritableFileStream>, PlatformError> {
        if self.state.borrow().revoked {
            return Err(PlatformError::PermissionDenied(self.name.clone()));
        }
        Ok(Box::new(MemoryStream {
            buffer: Vec::new(),
            state: Rc::clone(&self.state),
        }))
    }
}

#[derive(Debug, Clone)]
pub enum PickerScript {
    Handle(MemoryFileHandle),
    Cancel,
    Fail,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedPicker {
    script: Rc<RefCell<VecDeque<PickerScript>>>,
    requests: Rc<RefCell<Vec<SavePickerOptions>>>,
}

impl ScriptedPicker {
    pub fn new(script: Vec<PickerScript>) -> Self {
        Self {
            script: Rc::new(RefCell::new(script.into())),
            requests: Rc::default(),
        }
    }

    pub fn requests(&self) -> Vec<SavePickerOptions> {
        self.requests.borrow().clone()
    }
}

#[async_trait(?Send)]
impl SaveFilePicker for ScriptedPicker {
    async fn show_save_file_picker(
        &self,
        _dialogs: &mut dyn Dialogs,
        options: &SavePickerOptions,
    ) -> Result<Option<Box<dyn FileHandle>>, PlatformError> {
        self.requests.borrow_mut().push(options.clone());
        let next = self.script.borrow_mut().pop_front();
        match next {
            Some(PickerScript::Handle(handle)) => Ok(Some(Box::new(handle))),
            Some(PickerScript::Cancel) => Ok(None),
            Some(PickerScript::Fail) | None => Err(PlatformError::PermissionDenied(
                "picker unavailable".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingDownloader {
    downloads: Rc<RefCell<Vec<(String, Vec<u8>)>>>,
}

impl RecordingDownloader {
    pub fn downloads(&self) -> Vec<(String, Vec<u8>)> {
        self.downloads.borrow().clone()
    }
}

impl Downloader for RecordingDownloader {
    fn download(&self, blob: &[u8], file_name: &str) {
        self.downloads
            .borrow_mut()
            .push((file_name.to_string(), blob.to_vec()));
    }
}

#[derive(Debug, Clone)]
pub enum SelectorScript {
    File(SelectedFile),
    Cancel,
    Fail,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedSelector {
    script: Rc<RefCell<VecDeque<SelectorScript>>>,
    calls: Rc<RefCell<usize>>,
}

impl ScriptedSelector {
    pub fn new(script: Vec<SelectorScript>) -> Self {
        Self {
            script: Rc::new(RefCell::new(script.into())),
            calls: Rc::default(),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.borrow()
    }
}

#[async_trait(?Send)]
impl FileSelector for ScriptedSelector {
    async fn select(
        &self,
        _dialogs: &mut dyn Dialogs,
    ) -> Result<Option<SelectedFile>, PlatformError> {
        *self.calls.borrow_mut() += 1;
        let next = self.script.borrow_mut().pop_front();
        match next {
            Some(SelectorScript::File(file)) => Ok(Some(file)),
            Some(SelectorScript::Cancel) => Ok(None),
            Some(SelectorScript::Fail) | None => Err(PlatformError::Io(std::io::Error::other(
                "read failed",
            ))),
        }
    }
}

/// Network that answers from a fixed table and is offline for anything else.
#[derive(Debug, Clone, Default)]
pub struct ScriptedNetwork {
    responses: Rc<RefCell<HashMap<String, Response>>>,
    requests: Rc<RefCell<Vec<String>>>,
}

impl ScriptedNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(self, url: &str, body: &str) -> Self {
        let response = Response::new(url, 200, body.as_bytes().to_vec());
        self.respond(url, response)
    }

    pub fn respond(self, url: &str, response: Response) -> Self {
        self.responses.borrow_mut().insert(url.to_string(), response);
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

#[async_trait(?Send)]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        self.requests.borrow_mut().push(request.url.clone());
        self.responses
            .borrow()
            .get(&request.url)
            .cloned()
            .ok_or_else(|| FetchError::Offline(request.url.clone()))
    }
}

/// In-memory cache storage whose `delete` always fails.
#[derive(Debug, Default)]
pub struct UndeletableStorage {
    inner: MemoryCacheStorage,
}

impl UndeletableStorage {
    pub fn new(inner: MemoryCacheStorage) -> Self {
        Self { inner }
    }
}

#[async_trait(?Send)]
impl CacheStorage for UndeletableStorage {
    async fn open(&self, name: &str) -> Result<(), CacheError> {
        self.inner.open(name).await
    }

    async fn put_all(&self, name: &str, entries: Vec<Response>) -> Result<(), CacheError> {
        self.inner.put_all(name, entries).await
    }

    async fn match_url(&self, url: &str) -> Result<Option<Response>, CacheError> {
        self.inner.match_url(url).await
    }

    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        self.inner.keys().await
    }

    async fn delete(&self, _name: &str) -> Result<bool, CacheError> {
        Err(CacheError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "cache is locked",
        )))
    }

    async fn entries(&self, name: &str) -> Result<Vec<String>, CacheError> {
        self.inner.entries(name).await
    }
}
