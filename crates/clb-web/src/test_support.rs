//! Fakes shared by the route tests.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use axum::response::Response;

use clb_core::{
    config::Config,
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{LinkKeyboard, MessagingCapabilities},
    },
    overlay::OverlayHub,
    ports::{CheckoutRequest, CheckoutSession, PaymentGateway},
    store::{ShowData, Store},
    Result,
};

use crate::WebState;

#[derive(Default)]
pub(crate) struct FakePayments {
    requests: Mutex<Vec<CheckoutRequest>>,
    fail: AtomicBool,
}

impl FakePayments {
    pub(crate) fn requests(&self) -> Vec<CheckoutRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn fail_next(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl PaymentGateway for FakePayments {
    async fn create_checkout(&self, req: &CheckoutRequest) -> Result<CheckoutSession> {
        if self.fail.swap(false, Ordering::SeqCst) {
            return Err(Error::External("card_error: declined".to_string()));
        }
        self.requests.lock().unwrap().push(req.clone());
        Ok(CheckoutSession {
            id: "cs_1".to_string(),
            url: "https://checkout.test/cs_1".to_string(),
        })
    }
}

#[derive(Default)]
pub(crate) struct FakeMessenger {
    sends: Mutex<Vec<(ChatId, String)>>,
}

impl FakeMessenger {
    pub(crate) fn sends(&self) -> Vec<(ChatId, String)> {
        self.sends.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessagingPort for FakeMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            supports_inline_keyboards: true,
        }
    }

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
        self.sends.lock().unwrap().push((chat_id, html.to_string()));
        Ok(MessageRef {
            chat_id,
            message_id: MessageId(1),
        })
    }

    async fn send_link_keyboard(
        &self,
        chat_id: ChatId,
        html: &str,
        _keyboard: LinkKeyboard,
    ) -> Result<MessageRef> {
        self.send_html(chat_id, html).await
    }
}

pub(crate) struct Harness {
    pub(crate) cfg: Config,
    pub(crate) store: Arc<Store>,
    pub(crate) overlay: OverlayHub,
    pub(crate) payments: Arc<FakePayments>,
    pub(crate) messenger: Arc<FakeMessenger>,
}

impl Harness {
    pub(crate) fn new() -> Self {
        let cfg = Config {
            public_base_url: "https://live.test".to_string(),
            ..Config::default()
        };
        let data = ShowData {
            model_name: "Luna".to_string(),
            ..ShowData::default()
        };
        Self {
            cfg,
            store: Arc::new(Store::with_data("/nonexistent/data.json", data)),
            overlay: OverlayHub::default(),
            payments: Arc::new(FakePayments::default()),
            messenger: Arc::new(FakeMessenger::default()),
        }
    }

    pub(crate) fn state(&self) -> WebState {
        WebState {
            cfg: Arc::new(self.cfg.clone()),
            store: self.store.clone(),
            overlay: self.overlay.clone(),
            payments: Some(self.payments.clone() as Arc<dyn PaymentGateway>),
            messenger: Some(self.messenger.clone() as Arc<dyn MessagingPort>),
        }
    }
}

pub(crate) async fn body_string(resp: Response) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
