#![allow(dead_code)]

use async_trait::async_trait;
use mockall::mock;
use rsp_runner::client::RspClient;
use rsp_runner::error::Result;
use rsp_runner::explorer::{self, InMemoryOutputWindow, ServerExplorer, SharedExplorer};
use rsp_runner::protocol::{RunMode, RunState, ServerHandle, ServerState, ServerType};
use rsp_runner::transport::Transport;
use rsp_runner::workflow::{InputBoxOptions, OpenDialogOptions, Prompter, WorkflowEngine};
use serde_json::Value;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// Define a mock for the Transport trait
mock! {
    pub TransportMock {}

    #[async_trait]
    impl Transport for TransportMock {
        async fn send_request(&self, method: &str, params: Value) -> Result<Value>;
        async fn send_notification(&self, method: &str, params: Value) -> Result<()>;
        async fn send_response(&self, id: Value, result: Value) -> Result<()>;
    }
}

/// Every request a scripted transport received, in order.
pub type RequestLog = Arc<Mutex<Vec<(String, Value)>>>;

/// A transport mock answering requests through `respond` and logging them.
///
/// Notifications and responses are accepted and ignored.
pub fn scripted_transport<F>(respond: F) -> (MockTransportMock, RequestLog)
where
    F: Fn(&str, &Value) -> Result<Value> + Send + Sync + 'static,
{
    let log: RequestLog = Arc::new(Mutex::new(Vec::new()));
    let requests = Arc::clone(&log);

    let mut transport = MockTransportMock::new();
    transport
        .expect_send_request()
        .returning(move |method, params| {
            requests
                .lock()
                .unwrap()
                .push((method.to_string(), params.clone()));
            respond(method, &params)
        });
    transport
        .expect_send_notification()
        .returning(|_, _| Ok(()));
    transport.expect_send_response().returning(|_, _| Ok(()));
    (transport, log)
}

/// Methods of the logged requests.
pub fn methods(log: &RequestLog) -> Vec<String> {
    log.lock()
        .unwrap()
        .iter()
        .map(|(method, _)| method.clone())
        .collect()
}

/// Params of the first logged request to `method`.
pub fn params_of(log: &RequestLog, method: &str) -> Option<Value> {
    log.lock()
        .unwrap()
        .iter()
        .find(|(logged, _)| logged == method)
        .map(|(_, params)| params.clone())
}

/// One scripted user reaction.
#[derive(Debug, Clone)]
pub enum Answer {
    Dialog(Option<Vec<PathBuf>>),
    Input(Option<String>),
    Pick(Option<String>),
}

impl Answer {
    pub fn folder(path: &str) -> Self {
        Answer::Dialog(Some(vec![PathBuf::from(path)]))
    }

    pub fn input(text: &str) -> Self {
        Answer::Input(Some(text.to_string()))
    }

    pub fn pick(item: &str) -> Self {
        Answer::Pick(Some(item.to_string()))
    }
}

/// A prompter replaying scripted answers and recording what it was asked.
#[derive(Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<Answer>>,
    pub dialogs: Mutex<Vec<OpenDialogOptions>>,
    pub inputs: Mutex<Vec<InputBoxOptions>>,
    pub picks: Mutex<Vec<(Vec<String>, String)>>,
    pub infos: Mutex<Vec<String>>,
    pub errors: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new(answers: Vec<Answer>) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(answers.into()),
            ..Self::default()
        })
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }

    pub fn infos(&self) -> Vec<String> {
        self.infos.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.answers.lock().unwrap().len()
    }

    fn next(&self) -> Option<Answer> {
        self.answers.lock().unwrap().pop_front()
    }
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn show_open_dialog(&self, options: &OpenDialogOptions) -> Option<Vec<PathBuf>> {
        self.dialogs.lock().unwrap().push(options.clone());
        match self.next() {
            Some(Answer::Dialog(answer)) => answer,
            other => panic!("expected a dialog answer, got {:?}", other),
        }
    }

    async fn show_input_box(&self, options: &InputBoxOptions) -> Option<String> {
        self.inputs.lock().unwrap().push(options.clone());
        match self.next() {
            Some(Answer::Input(answer)) => answer,
            other => panic!("expected an input answer, got {:?}", other),
        }
    }

    async fn show_quick_pick(&self, items: &[String], placeholder: &str) -> Option<String> {
        self.picks
            .lock()
            .unwrap()
            .push((items.to_vec(), placeholder.to_string()));
        match self.next() {
            Some(Answer::Pick(answer)) => answer,
            other => panic!("expected a quick pick answer, got {:?}", other),
        }
    }

    fn show_info(&self, message: &str) {
        self.infos.lock().unwrap().push(message.to_string());
    }

    fn show_error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}

pub fn handle(id: &str) -> ServerHandle {
    ServerHandle {
        id: id.to_string(),
        server_type: ServerType {
            id: "org.jboss.ide.eclipse.as.wildfly.260".to_string(),
            visible_name: "WildFly 26".to_string(),
            description: "A server adapter capable of discovering and controlling a WildFly 26 runtime instance.".to_string(),
        },
    }
}

pub fn state(id: &str, run_state: RunState) -> ServerState {
    ServerState {
        server: handle(id),
        state: run_state,
        publish_state: 1,
        run_mode: RunMode::Run,
        deployable_states: Vec::new(),
    }
}

/// An explorer already holding `servers`.
pub fn seeded_explorer(servers: &[ServerState]) -> (SharedExplorer, InMemoryOutputWindow) {
    let window = InMemoryOutputWindow::new();
    let explorer = ServerExplorer::new(Arc::new(window.clone()), true).into_shared();
    {
        let mut guard = explorer::lock(&explorer).unwrap();
        for server in servers {
            guard.insert_server(server.server.clone()).unwrap();
            guard.update_server(server.clone()).unwrap();
        }
    }
    (explorer, window)
}

/// A workflow engine over `transport` and an explorer holding `servers`.
pub fn workflow_engine(
    transport: MockTransportMock,
    prompter: Arc<ScriptedPrompter>,
    servers: &[ServerState],
) -> (WorkflowEngine, SharedExplorer) {
    let (explorer, _) = seeded_explorer(servers);
    let engine = WorkflowEngine::new(
        RspClient::new(transport),
        Arc::clone(&explorer),
        prompter,
        Duration::from_secs(2),
    );
    (engine, explorer)
}
